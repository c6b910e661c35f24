use crate::judgment::Grade;

pub const ACC_SCORE_MAX: f32 = 900_000.0;
pub const COMBO_SCORE_MAX: f32 = 100_000.0;

/// Running totals mutated only from the judgment state machine.
#[derive(Clone, Debug, Default)]
pub struct ScoreState {
    pub combo: u32,
    pub max_combo: u32,
    pub acc_sum: f32,
    pub judged_count: u32,
    pub hit_total: u32,
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A non-failing judgment landed: extend the combo.
    pub fn bump(&mut self) {
        self.hit_total += 1;
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
    }

    pub fn break_combo(&mut self) {
        self.combo = 0;
    }

    /// Counts a finished judgment toward accuracy. Combo bookkeeping is
    /// separate: BAD and MISS callers break the combo themselves, holds
    /// bump at engage time but are counted here only when finalized.
    pub fn add_judged(&mut self, grade: Grade) {
        self.acc_sum += grade.weight();
        self.judged_count += 1;
    }

    pub fn accuracy(&self, total_notes: u32) -> f32 {
        if total_notes == 0 {
            return 0.0;
        }
        self.acc_sum / total_notes as f32
    }

    /// 900k accuracy part + 100k max-combo part, truncated.
    pub fn score(&self, total_notes: u32) -> u32 {
        if total_notes == 0 {
            return 0;
        }
        let total = total_notes as f32;
        let s = (self.acc_sum / total) * ACC_SCORE_MAX
            + (self.max_combo as f32 / total) * COMBO_SCORE_MAX;
        s.trunc() as u32
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_perfect_full_combo_is_one_million() {
        let mut s = ScoreState::new();
        for _ in 0..100 {
            s.bump();
            s.add_judged(Grade::Perfect);
        }
        assert_eq!(s.max_combo, 100);
        assert_eq!(s.score(100), 1_000_000);
    }

    #[test]
    fn zero_progress_is_zero() {
        let s = ScoreState::new();
        assert_eq!(s.score(100), 0);
        assert_eq!(s.score(0), 0);
        assert_eq!(s.accuracy(0), 0.0);
    }

    #[test]
    fn break_resets_combo_but_not_max() {
        let mut s = ScoreState::new();
        for _ in 0..5 {
            s.bump();
        }
        s.break_combo();
        assert_eq!(s.combo, 0);
        assert_eq!(s.max_combo, 5);
        s.bump();
        assert_eq!(s.combo, 1);
        assert_eq!(s.max_combo, 5);
    }

    #[test]
    fn good_grades_weigh_partial_accuracy() {
        let mut s = ScoreState::new();
        s.bump();
        s.add_judged(Grade::Good);
        assert!((s.accuracy(1) - 0.6).abs() <= 1e-6);
        // 0.6 * 900k + 1/1 * 100k
        assert_eq!(s.score(1), 640_000);
    }

    #[test]
    fn reset_returns_to_initial() {
        let mut s = ScoreState::new();
        s.bump();
        s.add_judged(Grade::Perfect);
        s.reset();
        assert_eq!(s.combo, 0);
        assert_eq!(s.max_combo, 0);
        assert_eq!(s.judged_count, 0);
        assert_eq!(s.acc_sum, 0.0);
    }
}
