use crate::chart::{NoteKind, RuntimeChart};
use crate::config::{PlayConfig, RenderConfig};
use crate::judgment::{sanitize, Grade};
use crate::kinematics::{eval_line, note_world_pos};
use crate::scores::ScoreState;
use glam::Vec2;
use log::info;

/// Dispatch scans this many notes around the cursor on a press.
pub const DISPATCH_BACK: usize = 50;
pub const DISPATCH_AHEAD: usize = 500;
/// Maintenance, finalize, and miss sweeps cover a wider band so long
/// holds stay tracked after the cursor moves past them.
pub const SWEEP_BACK: usize = 200;
pub const SWEEP_AHEAD: usize = 800;

/// Judgment progress for one note. Terminal once `judged` is set; only a
/// full restart clears it.
#[derive(Clone, Debug, Default)]
pub struct NoteState {
    pub judged: bool,
    pub hit: bool,
    pub holding: bool,
    pub released_early: bool,
    pub hold_failed: bool,
    pub hold_finalized: bool,
    pub miss: bool,
    pub hold_grade: Option<Grade>,
    pub next_fx_ms: i64,
}

/// Single-pointer input snapshot for one tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct InputSample {
    pub press_edge: bool,
    pub held: bool,
}

impl InputSample {
    pub fn press() -> Self {
        Self { press_edge: true, held: true }
    }

    pub fn held() -> Self {
        Self { press_edge: false, held: true }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FeedbackKind {
    Hit(Grade),
    HoldTick,
    Miss,
}

/// Side-channel event for hit effects and sounds; never judgment input.
#[derive(Copy, Clone, Debug)]
pub struct FeedbackEvent {
    pub kind: FeedbackKind,
    pub note: u32,
    pub x: f32,
    pub y: f32,
    pub rot: f32,
    pub t: f32,
}

/// One play session: immutable runtime chart plus the mutable judgment
/// state. Sessions are self-contained; several may run in parallel.
pub struct Playback {
    chart: RuntimeChart,
    render: RenderConfig,
    play: PlayConfig,
    states: Vec<NoteState>,
    score: ScoreState,
    cursor: usize,
    feedback: Vec<FeedbackEvent>,
}

fn feedback_pos(
    chart: &RuntimeChart,
    render: &RenderConfig,
    idx: usize,
    t: f32,
    engaged: bool,
) -> (Vec2, f32) {
    let n = &chart.notes[idx];
    let ls = eval_line(&chart.lines[n.line], t, render);
    let target = if engaged { ls.scroll } else { n.scroll_hit };
    (note_world_pos(&ls, n, target, false, render), ls.rot)
}

impl Playback {
    pub fn new(chart: RuntimeChart, render: RenderConfig, play: PlayConfig) -> Self {
        let states = vec![NoteState::default(); chart.notes.len()];
        info!(
            "playback session: {} notes, autoplay={}, speed={}",
            chart.notes.len(),
            play.autoplay,
            play.chart_speed
        );
        Self { chart, render, play, states, score: ScoreState::new(), cursor: 0, feedback: Vec::new() }
    }

    pub fn chart(&self) -> &RuntimeChart {
        &self.chart
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    pub fn play_config(&self) -> &PlayConfig {
        &self.play
    }

    pub fn note_states(&self) -> &[NoteState] {
        &self.states
    }

    pub fn score_state(&self) -> &ScoreState {
        &self.score
    }

    pub fn score(&self) -> u32 {
        self.score.score(self.chart.total_notes())
    }

    pub fn accuracy(&self) -> f32 {
        self.score.accuracy(self.chart.total_notes())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain_feedback(&mut self) -> Vec<FeedbackEvent> {
        std::mem::take(&mut self.feedback)
    }

    /// One simulation tick at chart time `t`. Phases run in a fixed order:
    /// dispatch, hold maintenance, hold finalize, hold tick effects, miss
    /// sweep, cursor advance.
    pub fn tick(&mut self, t: f32, input: InputSample) {
        if self.play.autoplay {
            self.autoplay_dispatch(t);
        } else {
            self.manual_dispatch(t, input);
        }
        self.hold_maintenance(t, input.held || self.play.autoplay);
        self.hold_finalize(t);
        self.hold_tick_fx(t);
        self.miss_sweep(t);
        self.advance_cursor(t);
    }

    /// Clears all judgment state and rewinds the cursor. Idempotent; the
    /// only operation allowed to un-judge notes.
    pub fn restart(&mut self) {
        for s in &mut self.states {
            *s = NoteState::default();
        }
        self.score.reset();
        self.cursor = 0;
        self.feedback.clear();
        info!("playback restarted");
    }

    fn window(&self, back: usize, ahead: usize) -> std::ops::Range<usize> {
        let lo = self.cursor.saturating_sub(back);
        let hi = (self.cursor + ahead).min(self.states.len());
        lo..hi
    }

    fn push_feedback(&mut self, kind: FeedbackKind, idx: usize, t: f32, engaged: bool) {
        let (pos, rot) = feedback_pos(&self.chart, &self.render, idx, t, engaged);
        self.feedback.push(FeedbackEvent {
            kind,
            note: self.chart.notes[idx].id,
            x: pos.x,
            y: pos.y,
            rot,
            t,
        });
    }

    fn apply_grade(&mut self, idx: usize, grade: Grade, t: f32) {
        let s = &mut self.states[idx];
        s.judged = true;
        s.hit = true;
        if grade.breaks_combo() {
            self.score.break_combo();
        } else {
            self.score.bump();
        }
        self.score.add_judged(grade);
        self.push_feedback(FeedbackKind::Hit(grade), idx, t, false);
    }

    fn engage_hold(&mut self, idx: usize, grade: Grade, t: f32) {
        let next_fx = (t * 1000.0) as i64 + self.play.hold_fx_interval_ms;
        let s = &mut self.states[idx];
        s.hit = true;
        s.holding = true;
        s.hold_grade = Some(grade);
        s.next_fx_ms = next_fx;
        self.score.bump();
        self.push_feedback(FeedbackKind::Hit(grade), idx, t, false);
    }

    fn mark_miss(&mut self, idx: usize, t: f32) {
        let s = &mut self.states[idx];
        s.judged = true;
        s.miss = true;
        self.score.break_combo();
        self.score.add_judged(Grade::Miss);
        self.push_feedback(FeedbackKind::Miss, idx, t, false);
    }

    /// Nearest unjudged real note within the BAD window takes the press;
    /// the per-kind sanitize table may still reject it, in which case the
    /// press is consumed with no effect.
    fn manual_dispatch(&mut self, t: f32, input: InputSample) {
        if !input.press_edge {
            return;
        }
        let bad = self.play.windows.bad;
        let mut best: Option<usize> = None;
        let mut best_dt = f32::MAX;
        for i in self.window(DISPATCH_BACK, DISPATCH_AHEAD) {
            let s = &self.states[i];
            let n = &self.chart.notes[i];
            if s.judged || s.hit || n.fake {
                continue;
            }
            let dt = (t - n.t_hit).abs();
            if dt <= bad && dt < best_dt {
                best_dt = dt;
                best = Some(i);
            }
        }
        let Some(idx) = best else { return };
        let n = &self.chart.notes[idx];
        let Some(raw) = self.play.windows.grade_window(n.t_hit, t) else { return };
        let Some(grade) = sanitize(n.kind, raw) else { return };
        if n.kind == NoteKind::Hold {
            self.engage_hold(idx, grade, t);
        } else {
            self.apply_grade(idx, grade, t);
        }
    }

    /// Deterministic perfect play: every real note is taken inside the
    /// PERFECT window, holds are engaged and kept to their end.
    fn autoplay_dispatch(&mut self, t: f32) {
        let perfect = self.play.windows.perfect;
        for i in self.window(DISPATCH_BACK, DISPATCH_AHEAD) {
            let s = &self.states[i];
            let n = &self.chart.notes[i];
            if s.judged || n.fake {
                continue;
            }
            if (t - n.t_hit).abs() > perfect {
                continue;
            }
            if n.kind == NoteKind::Hold {
                if !s.hit {
                    self.engage_hold(i, Grade::Perfect, t);
                }
            } else {
                self.apply_grade(i, Grade::Perfect, t);
            }
        }
    }

    /// Manual only: an input release before the hold's end either fails it
    /// on the spot (progress below the tail tolerance) or leaves it for
    /// finalize to count as an early success.
    fn hold_maintenance(&mut self, t: f32, held: bool) {
        let tol = self.play.hold_tail_tolerance;
        for i in self.window(DISPATCH_BACK, DISPATCH_AHEAD) {
            let n = &self.chart.notes[i];
            let s = &self.states[i];
            if s.judged || n.fake || n.kind != NoteKind::Hold || !s.holding {
                continue;
            }
            if !held && t < n.t_end - 1e-6 {
                let dur = (n.t_end - n.t_hit).max(1e-6);
                let progress = ((t - n.t_hit) / dur).clamp(0.0, 1.0);
                let s = &mut self.states[i];
                s.released_early = true;
                s.holding = false;
                if progress < tol {
                    s.hold_failed = true;
                    s.hold_finalized = true;
                    self.mark_miss(i, t);
                }
            } else if t >= n.t_end {
                self.states[i].holding = false;
            }
        }
    }

    /// Runs every tick until each hold is finalized; all branches are
    /// guarded by `hold_finalized` so re-entry is a no-op.
    fn hold_finalize(&mut self, t: f32) {
        let bad = self.play.windows.bad;
        let tol = self.play.hold_tail_tolerance;
        for i in self.window(SWEEP_BACK, SWEEP_AHEAD) {
            let n = &self.chart.notes[i];
            if n.fake || n.kind != NoteKind::Hold || self.states[i].hold_finalized {
                continue;
            }

            // Never engaged: failed (and combo broken) as soon as the press
            // window closes, counted as a miss at the end time below.
            if !self.states[i].hit && !self.states[i].hold_failed && t > n.t_hit + bad {
                self.states[i].hold_failed = true;
                self.score.break_combo();
            }

            if self.states[i].released_early && !self.states[i].hold_finalized {
                let dur = (n.t_end - n.t_hit).max(1e-6);
                let progress = ((t - n.t_hit) / dur).clamp(0.0, 1.0);
                if progress < tol {
                    self.states[i].hold_failed = true;
                    self.score.break_combo();
                } else {
                    let grade = self.states[i].hold_grade.unwrap_or(Grade::Perfect);
                    self.score.add_judged(grade);
                    let s = &mut self.states[i];
                    s.hold_finalized = true;
                    s.judged = true;
                }
            }

            if t >= n.t_end && !self.states[i].hold_finalized {
                if self.states[i].hit && !self.states[i].hold_failed {
                    let grade = self.states[i].hold_grade.unwrap_or(Grade::Perfect);
                    self.score.add_judged(grade);
                } else {
                    self.mark_miss(i, t);
                }
                let s = &mut self.states[i];
                s.hold_finalized = true;
                s.judged = true;
            }
        }
    }

    /// Periodic feedback while a hold is being held, at the note's current
    /// position on the line.
    fn hold_tick_fx(&mut self, t: f32) {
        let interval = self.play.hold_fx_interval_ms;
        let now_ms = (t * 1000.0) as i64;
        for i in self.window(SWEEP_BACK, SWEEP_AHEAD) {
            let n = &self.chart.notes[i];
            let s = &self.states[i];
            if n.fake || n.kind != NoteKind::Hold || !s.holding || s.judged || t >= n.t_end {
                continue;
            }
            let t_end = n.t_end;
            if s.next_fx_ms <= 0 {
                self.states[i].next_fx_ms = now_ms + interval;
                continue;
            }
            while now_ms >= self.states[i].next_fx_ms && t < t_end {
                self.push_feedback(FeedbackKind::HoldTick, i, t, true);
                self.states[i].next_fx_ms += interval;
            }
        }
    }

    /// Unjudged non-holds past the BAD window become misses.
    fn miss_sweep(&mut self, t: f32) {
        let bad = self.play.windows.bad;
        for i in self.window(SWEEP_BACK, SWEEP_AHEAD) {
            let n = &self.chart.notes[i];
            let s = &self.states[i];
            if s.judged || n.fake || n.kind == NoteKind::Hold {
                continue;
            }
            if t > n.t_hit + bad {
                self.mark_miss(i, t);
            }
        }
    }

    /// The cursor only moves forward, past judged notes and expired fakes.
    fn advance_cursor(&mut self, t: f32) {
        let bad = self.play.windows.bad;
        while self.cursor < self.states.len() {
            let n = &self.chart.notes[self.cursor];
            let passable = self.states[self.cursor].judged || (n.fake && t > n.t_hit + bad);
            if !passable {
                break;
            }
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{build_runtime, BpmEvent, ChartDef, LineDef, NoteDef};
    use crate::judgment::JudgeWindows;

    fn note(kind: i32, start_beat: f32, end_beat: Option<f32>) -> NoteDef {
        NoteDef {
            kind,
            above: true,
            fake: false,
            start_beat,
            end_beat,
            x: 0.0,
            y_offset: 0.0,
            size: 1.0,
            speed: 1.0,
            alpha: 1.0,
            hitsound: None,
            line: None,
        }
    }

    fn session(notes: Vec<NoteDef>, play: PlayConfig) -> Playback {
        let _ = env_logger::builder().is_test(true).try_init();
        // 60 bpm: beats equal seconds.
        let def = ChartDef {
            offset: 0.0,
            bpm_events: vec![BpmEvent { beat: 0.0, bpm: 60.0 }],
            lines: vec![LineDef { name: String::new(), tempo_factor: 1.0, layers: vec![], notes }],
        };
        let render = RenderConfig::default();
        let chart = build_runtime(&def, &render, &play).unwrap();
        Playback::new(chart, render, play)
    }

    fn wide_windows() -> PlayConfig {
        PlayConfig {
            windows: JudgeWindows { perfect: 0.08, good: 0.16, bad: 0.18 },
            ..Default::default()
        }
    }

    #[test]
    fn tap_late_press_grades_good() {
        let mut p = session(vec![note(1, 1.0, None)], wide_windows());
        // 0.12 is inside GOOD (0.16) but outside PERFECT (0.08).
        p.tick(1.12, InputSample::press());
        let s = &p.note_states()[0];
        assert!(s.judged && s.hit && !s.miss);
        assert_eq!(p.score_state().combo, 1);
        assert!((p.score_state().acc_sum - 0.6).abs() <= 1e-6);
        let fb = p.drain_feedback();
        assert_eq!(fb.len(), 1);
        assert_eq!(fb[0].kind, FeedbackKind::Hit(Grade::Good));
    }

    #[test]
    fn press_outside_bad_is_ignored_then_missed() {
        let mut p = session(vec![note(1, 1.0, None)], wide_windows());
        p.tick(1.2, InputSample::press());
        let s = &p.note_states()[0];
        assert!(s.judged && s.miss && !s.hit, "0.2 > bad window, miss sweep takes it");
        assert_eq!(p.score_state().combo, 0);
        assert_eq!(p.drain_feedback()[0].kind, FeedbackKind::Miss);
    }

    #[test]
    fn tap_bad_counts_hit_but_breaks_combo() {
        let mut p = session(vec![note(1, 0.5, None), note(1, 1.0, None)], wide_windows());
        p.tick(0.5, InputSample::press());
        assert_eq!(p.score_state().combo, 1);
        p.tick(1.17, InputSample::press());
        let s = &p.note_states()[1];
        assert!(s.judged && s.hit);
        assert_eq!(p.score_state().combo, 0, "BAD breaks combo");
        assert_eq!(p.score_state().max_combo, 1);
    }

    #[test]
    fn drag_good_window_upgrades_to_perfect() {
        let mut p = session(vec![note(2, 1.0, None)], PlayConfig::default());
        // 0.07 is inside GOOD (0.09) but outside PERFECT (0.045).
        p.tick(1.07, InputSample::press());
        assert!(p.note_states()[0].judged);
        assert!((p.score_state().acc_sum - 1.0).abs() <= 1e-6);
        assert_eq!(p.drain_feedback()[0].kind, FeedbackKind::Hit(Grade::Perfect));
    }

    #[test]
    fn drag_bad_window_rejects_press() {
        let mut p = session(vec![note(2, 1.0, None)], PlayConfig::default());
        p.tick(1.12, InputSample::press());
        assert!(!p.note_states()[0].judged, "BAD press on a drag is rejected");
        p.tick(1.2, InputSample::default());
        assert!(p.note_states()[0].miss);
    }

    #[test]
    fn hold_early_release_fails() {
        let mut p = session(vec![note(3, 1.0, Some(2.0))], PlayConfig::default());
        p.tick(1.0, InputSample::press());
        assert!(p.note_states()[0].holding);
        assert_eq!(p.score_state().combo, 1);
        p.tick(1.3, InputSample::held());
        p.tick(1.7, InputSample::default());
        let s = &p.note_states()[0];
        assert!(s.judged && s.hold_failed && s.miss && !s.holding);
        assert_eq!(p.score_state().combo, 0, "progress 0.7 < 0.8 resets combo");
        assert_eq!(p.score_state().acc_sum, 0.0);
    }

    #[test]
    fn hold_late_release_succeeds() {
        let mut p = session(vec![note(3, 1.0, Some(2.0))], PlayConfig::default());
        p.tick(1.0, InputSample::press());
        p.tick(1.5, InputSample::held());
        p.tick(1.85, InputSample::default());
        let s = &p.note_states()[0];
        assert!(s.judged && s.hold_finalized && !s.hold_failed);
        assert_eq!(p.score_state().combo, 1, "progress 0.85 >= 0.8 keeps combo");
        assert!((p.score_state().acc_sum - 1.0).abs() <= 1e-6);
    }

    #[test]
    fn hold_kept_to_end_succeeds_with_stored_grade() {
        let mut p = session(vec![note(3, 1.0, Some(2.0))], PlayConfig::default());
        // Engage in the GOOD window: the stored grade is GOOD.
        p.tick(1.06, InputSample::press());
        assert_eq!(p.note_states()[0].hold_grade, Some(Grade::Good));
        let mut t = 1.1;
        while t < 2.05 {
            p.tick(t, InputSample::held());
            t += 0.05;
        }
        let s = &p.note_states()[0];
        assert!(s.judged && s.hold_finalized && !s.miss);
        assert!((p.score_state().acc_sum - 0.6).abs() <= 1e-6);
        assert_eq!(p.score_state().combo, 1);
    }

    #[test]
    fn hold_bad_window_press_is_rejected() {
        let mut p = session(vec![note(3, 1.0, Some(2.0))], PlayConfig::default());
        p.tick(1.12, InputSample::press());
        assert!(!p.note_states()[0].hit, "press in the BAD window does not engage");
    }

    #[test]
    fn unengaged_hold_becomes_miss_at_end() {
        let mut p = session(vec![note(3, 1.0, Some(2.0))], PlayConfig::default());
        p.tick(0.9, InputSample::default());
        p.tick(1.2, InputSample::default());
        assert!(p.note_states()[0].hold_failed, "failed once the press window closed");
        assert!(!p.note_states()[0].judged);
        p.tick(2.0, InputSample::default());
        let s = &p.note_states()[0];
        assert!(s.judged && s.miss && s.hold_finalized);
        let fb = p.drain_feedback();
        assert_eq!(fb.len(), 1);
        assert_eq!(fb[0].kind, FeedbackKind::Miss);
    }

    #[test]
    fn hold_ticks_fire_while_holding() {
        let mut p = session(vec![note(3, 1.0, Some(2.0))], PlayConfig::default());
        p.tick(1.0, InputSample::press());
        p.drain_feedback();
        let mut t = 1.0;
        let mut ticks = 0;
        while t < 2.1 {
            p.tick(t, InputSample::held());
            ticks += p
                .drain_feedback()
                .iter()
                .filter(|e| e.kind == FeedbackKind::HoldTick)
                .count();
            t += 1.0 / 60.0;
        }
        // 200 ms cadence across a one second hold.
        assert_eq!(ticks, 4);
    }

    #[test]
    fn autoplay_clears_chart_with_full_score() {
        let notes = vec![
            note(1, 1.0, None),
            note(4, 1.5, None),
            note(2, 2.0, None),
            note(3, 2.5, Some(3.0)),
        ];
        let play = PlayConfig { autoplay: true, ..Default::default() };
        let mut p = session(notes, play);
        let mut t = 0.0;
        while t < 3.5 {
            p.tick(t, InputSample::default());
            t += 1.0 / 60.0;
        }
        assert!(p.note_states().iter().all(|s| s.judged && !s.miss));
        assert_eq!(p.score_state().max_combo, 4);
        assert_eq!(p.score_state().combo, 4);
        assert_eq!(p.score(), 1_000_000);
        assert_eq!(p.cursor(), 4);
    }

    #[test]
    fn cursor_skips_expired_fakes() {
        let mut fake = note(1, 1.0, None);
        fake.fake = true;
        let mut p = session(vec![fake, note(1, 2.0, None)], PlayConfig::default());
        p.tick(1.5, InputSample::default());
        assert_eq!(p.cursor(), 1);
        assert!(!p.note_states()[0].judged, "fakes are never judged");
        p.tick(2.0, InputSample::press());
        assert!(p.note_states()[1].judged);
        assert_eq!(p.score_state().combo, 1);
    }

    #[test]
    fn restart_clears_everything_and_is_idempotent() {
        let mut p = session(vec![note(1, 1.0, None), note(3, 2.0, Some(3.0))], PlayConfig::default());
        p.tick(1.0, InputSample::press());
        p.tick(2.0, InputSample::press());
        p.tick(2.5, InputSample::held());
        assert!(p.score_state().combo > 0);
        p.restart();
        assert!(p.note_states().iter().all(|s| !s.judged && !s.hit && !s.holding));
        assert_eq!(p.score_state().combo, 0);
        assert_eq!(p.score_state().max_combo, 0);
        assert_eq!(p.cursor(), 0);
        assert!(p.drain_feedback().is_empty());
        p.restart();
        assert!(p.note_states().iter().all(|s| !s.judged));
        assert_eq!(p.cursor(), 0);
        // The session replays cleanly.
        p.tick(1.0, InputSample::press());
        assert!(p.note_states()[0].judged);
        assert_eq!(p.score_state().combo, 1);
    }
}
