use crate::chart::NoteKind;

pub const PERFECT_WINDOW: f32 = 0.045;
pub const GOOD_WINDOW: f32 = 0.090;
pub const BAD_WINDOW: f32 = 0.150;

/// Outcome of one judged note.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Grade {
    Perfect,
    Good,
    Bad,
    Miss,
}

impl Grade {
    /// Accuracy weight contributed to the score numerator.
    #[inline(always)]
    pub fn weight(self) -> f32 {
        match self {
            Grade::Perfect => 1.0,
            Grade::Good => 0.6,
            Grade::Bad | Grade::Miss => 0.0,
        }
    }

    /// Failing grades reset combo; the others extend it.
    #[inline(always)]
    pub fn breaks_combo(self) -> bool {
        matches!(self, Grade::Bad | Grade::Miss)
    }
}

/// Nested timing tolerances in seconds. The ordering
/// `perfect < good < bad` is the contract; the magnitudes are tunable.
#[derive(Copy, Clone, Debug)]
pub struct JudgeWindows {
    pub perfect: f32,
    pub good: f32,
    pub bad: f32,
}

impl Default for JudgeWindows {
    fn default() -> Self {
        Self { perfect: PERFECT_WINDOW, good: GOOD_WINDOW, bad: BAD_WINDOW }
    }
}

impl JudgeWindows {
    /// Tightest window containing `|now - t_hit|`, or None outside BAD.
    #[inline(always)]
    pub fn grade_window(&self, t_hit: f32, now: f32) -> Option<Grade> {
        let dt = (now - t_hit).abs();
        if dt <= self.perfect {
            Some(Grade::Perfect)
        } else if dt <= self.good {
            Some(Grade::Good)
        } else if dt <= self.bad {
            Some(Grade::Bad)
        } else {
            None
        }
    }
}

/// Per-kind grade adjustment applied to a raw window grade on press.
/// Taps take the window as-is; drags and flicks only ever land PERFECT;
/// hold heads accept PERFECT and GOOD. `None` means the press is ignored
/// and the note stays unjudged.
pub fn sanitize(kind: NoteKind, grade: Grade) -> Option<Grade> {
    match (kind, grade) {
        (NoteKind::Tap, g) => Some(g),
        (NoteKind::Drag | NoteKind::Flick, Grade::Perfect | Grade::Good) => Some(Grade::Perfect),
        (NoteKind::Drag | NoteKind::Flick, _) => None,
        (NoteKind::Hold, Grade::Perfect) => Some(Grade::Perfect),
        (NoteKind::Hold, Grade::Good) => Some(Grade::Good),
        (NoteKind::Hold, _) => None,
    }
}
