use crate::config::{PlayConfig, RenderConfig};
use crate::easing::Easing;
use crate::timing::BeatTimeMap;
use crate::tracks::{EasedSegment, PiecewiseEasedTrack, RateSpan, ScrollIntegralTrack, SumTrack};
use crate::visibility;
use log::{info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Notes closer together than this share the multi-highlight flag.
pub const MH_EPSILON: f32 = 1e-4;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("note {note} references unknown line {line} (chart has {line_count} lines)")]
    UnknownLine { note: usize, line: usize, line_count: usize },
    #[error("chart json: {0}")]
    Parse(#[from] serde_json::Error),
}

// --- Normalized input intermediate (produced by a format-specific parser) ---

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChartDef {
    /// Audio offset in seconds.
    #[serde(default)]
    pub offset: f32,
    pub bpm_events: Vec<BpmEvent>,
    pub lines: Vec<LineDef>,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct BpmEvent {
    pub beat: f32,
    pub bpm: f32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineDef {
    #[serde(default)]
    pub name: String,
    #[serde(default = "one")]
    pub tempo_factor: f32,
    #[serde(default)]
    pub layers: Vec<EventLayer>,
    #[serde(default)]
    pub notes: Vec<NoteDef>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLayer {
    #[serde(default)]
    pub move_x: Vec<ChartEvent>,
    #[serde(default)]
    pub move_y: Vec<ChartEvent>,
    #[serde(default)]
    pub rotate: Vec<ChartEvent>,
    #[serde(default)]
    pub alpha: Vec<ChartEvent>,
    #[serde(default)]
    pub speed: Vec<ChartEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChartEvent {
    pub start_beat: f32,
    pub end_beat: f32,
    pub start: f32,
    #[serde(default)]
    pub end: f32,
    #[serde(default = "one_i32")]
    pub easing_type: i32,
    #[serde(default)]
    pub easing_left: f32,
    #[serde(default = "one")]
    pub easing_right: f32,
    /// Explicit control points override `easing_type` when present.
    #[serde(default)]
    pub bezier: Option<[f32; 4]>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteDef {
    pub kind: i32,
    #[serde(default = "yes")]
    pub above: bool,
    #[serde(default)]
    pub fake: bool,
    pub start_beat: f32,
    #[serde(default)]
    pub end_beat: Option<f32>,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y_offset: f32,
    #[serde(default = "one")]
    pub size: f32,
    #[serde(default = "one")]
    pub speed: f32,
    #[serde(default = "one")]
    pub alpha: f32,
    #[serde(default)]
    pub hitsound: Option<String>,
    /// Attach to another line by id instead of the owning one.
    #[serde(default)]
    pub line: Option<usize>,
}

fn one() -> f32 {
    1.0
}
fn one_i32() -> i32 {
    1
}
fn yes() -> bool {
    true
}

// --- Runtime model ---

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteKind {
    Tap,
    Drag,
    Hold,
    Flick,
}

impl NoteKind {
    /// Raw kind integers 1..=4; anything else degrades to Tap so a chart
    /// with one exotic note still plays.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => NoteKind::Tap,
            2 => NoteKind::Drag,
            3 => NoteKind::Hold,
            4 => NoteKind::Flick,
            other => {
                warn!("unknown note kind {other}, treating as tap");
                NoteKind::Tap
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EventCounts {
    pub move_x: usize,
    pub move_y: usize,
    pub rotate: usize,
    pub alpha: usize,
    pub speed: usize,
}

/// One judgment line with its channel tracks, in authored units.
/// Coordinate conversion to pixels happens at evaluation time.
#[derive(Clone, Debug)]
pub struct RuntimeLine {
    pub id: usize,
    pub x: SumTrack,
    pub y: SumTrack,
    pub rotate: SumTrack,
    pub alpha: SumTrack,
    pub scroll: ScrollIntegralTrack,
    pub color: [u8; 3],
    pub name: String,
    pub event_counts: EventCounts,
}

#[derive(Clone, Debug)]
pub struct RuntimeNote {
    pub id: u32,
    pub line: usize,
    pub kind: NoteKind,
    pub above: bool,
    pub fake: bool,
    pub t_hit: f32,
    /// Equals `t_hit` for everything but holds.
    pub t_end: f32,
    pub x_local: f32,
    pub y_offset: f32,
    pub size: f32,
    pub speed_mul: f32,
    pub alpha: f32,
    pub hitsound: Option<String>,
    pub scroll_hit: f32,
    pub scroll_end: f32,
    /// Earliest time the note can appear on screen; filled by the
    /// visibility precomputation.
    pub t_enter: f32,
    pub multi_highlight: bool,
}

#[derive(Clone, Debug)]
pub struct RuntimeChart {
    pub offset: f32,
    pub lines: Vec<RuntimeLine>,
    /// Sorted ascending by `t_hit`.
    pub notes: Vec<RuntimeNote>,
}

impl RuntimeChart {
    /// Fake notes never score and are excluded from the denominator.
    pub fn total_notes(&self) -> u32 {
        self.notes.iter().filter(|n| !n.fake).count() as u32
    }

    pub fn end_time(&self) -> f32 {
        self.notes.iter().map(|n| n.t_end).fold(0.0, f32::max)
    }
}

impl ChartDef {
    pub fn from_json_str(s: &str) -> Result<Self, ChartError> {
        Ok(serde_json::from_str(s)?)
    }
}

fn event_to_segment(
    e: &ChartEvent,
    map: &BeatTimeMap,
    tempo_factor: f32,
    easing_shift: i32,
) -> EasedSegment {
    let easing = match e.bezier {
        Some([x1, y1, x2, y2]) => Easing::Bezier { x1, y1, x2, y2 },
        None => Easing::from_rpe(e.easing_type + easing_shift),
    };
    let mut seg = EasedSegment::new(
        map.beat_to_seconds(e.start_beat, tempo_factor),
        map.beat_to_seconds(e.end_beat, tempo_factor),
        e.start,
        e.end,
        easing,
    );
    seg.left = e.easing_left;
    seg.right = e.easing_right;
    seg
}

fn build_channel(
    layers: &[EventLayer],
    pick: impl Fn(&EventLayer) -> &[ChartEvent],
    map: &BeatTimeMap,
    tempo_factor: f32,
    default: f32,
    easing_shift: i32,
) -> SumTrack {
    let tracks = layers.iter().filter(|l| !pick(l).is_empty()).map(|l| {
        let segs = pick(l)
            .iter()
            .map(|e| event_to_segment(e, map, tempo_factor, easing_shift))
            .collect();
        PiecewiseEasedTrack::new(segs, default)
    });
    SumTrack::new(tracks, default)
}

fn build_scroll(
    layers: &[EventLayer],
    map: &BeatTimeMap,
    tempo_factor: f32,
    px_per_unit: f32,
) -> ScrollIntegralTrack {
    let spans: Vec<Vec<RateSpan>> = layers
        .iter()
        .map(|l| {
            l.speed
                .iter()
                .map(|e| RateSpan {
                    t0: map.beat_to_seconds(e.start_beat, tempo_factor),
                    t1: map.beat_to_seconds(e.end_beat, tempo_factor),
                    rate0: e.start,
                    rate1: e.end,
                })
                .collect()
        })
        .collect();
    ScrollIntegralTrack::from_layered_events(&spans, px_per_unit)
}

pub(crate) fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let h = (h.rem_euclid(1.0)) * 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match i as i32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Flags groups of near-simultaneous notes for multi-highlight skins.
/// Notes within `eps` of a common press instant belong together, so a
/// group spans at most `2 * eps` of chart time. Purely visual.
pub fn flag_simultaneous(notes: &mut [RuntimeNote], eps: f32) {
    let mut i = 0;
    while i < notes.len() {
        let anchor = notes[i].t_hit;
        // Authored times round through f32, so a pair sitting exactly at the
        // 2*eps boundary can land one ulp outside it; the slack keeps the
        // comparison inclusive at that boundary.
        let slack = anchor.abs().max(1.0) * f32::EPSILON;
        let mut j = i + 1;
        while j < notes.len() && notes[j].t_hit - anchor <= 2.0 * eps + slack {
            j += 1;
        }
        if j - i >= 2 {
            for n in &mut notes[i..j] {
                n.multi_highlight = true;
            }
        }
        i = j;
    }
}

/// Builds the immutable runtime chart: per-line channel tracks through the
/// beat-time map, note geometry in pixel units, scroll samples at hit/end,
/// simultaneity flags, and entry-time precomputation.
pub fn build_runtime(
    def: &ChartDef,
    cfg: &RenderConfig,
    play: &PlayConfig,
) -> Result<RuntimeChart, ChartError> {
    let bpm_events: Vec<(f32, f32)> = def.bpm_events.iter().map(|e| (e.beat, e.bpm)).collect();
    if bpm_events.is_empty() {
        warn!("chart has no BPM events, all beats map to t=0");
    }
    let map = BeatTimeMap::build(&bpm_events);
    let px_per_unit = cfg.px_per_speed_unit();
    let line_count = def.lines.len();

    let mut lines = Vec::with_capacity(line_count);
    let mut notes: Vec<RuntimeNote> = Vec::new();

    for (i, ld) in def.lines.iter().enumerate() {
        let tf = ld.tempo_factor;
        let color = if cfg.multicolor_lines {
            hsv_to_rgb(i as f32 / line_count.max(1) as f32, 0.65, 0.95)
        } else {
            [255, 255, 255]
        };
        let counts = EventCounts {
            move_x: ld.layers.iter().map(|l| l.move_x.len()).sum(),
            move_y: ld.layers.iter().map(|l| l.move_y.len()).sum(),
            rotate: ld.layers.iter().map(|l| l.rotate.len()).sum(),
            alpha: ld.layers.iter().map(|l| l.alpha.len()).sum(),
            speed: ld.layers.iter().map(|l| l.speed.len()).sum(),
        };

        lines.push(RuntimeLine {
            id: i,
            x: build_channel(&ld.layers, |l| &l.move_x, &map, tf, 0.0, play.easing_shift),
            y: build_channel(&ld.layers, |l| &l.move_y, &map, tf, 0.0, play.easing_shift),
            rotate: build_channel(&ld.layers, |l| &l.rotate, &map, tf, 0.0, play.easing_shift),
            alpha: build_channel(&ld.layers, |l| &l.alpha, &map, tf, 255.0, play.easing_shift),
            scroll: build_scroll(&ld.layers, &map, tf, px_per_unit),
            color,
            name: ld.name.clone(),
            event_counts: counts,
        });

        for nd in &ld.notes {
            let target = nd.line.unwrap_or(i);
            if target >= line_count {
                return Err(ChartError::UnknownLine { note: notes.len(), line: target, line_count });
            }
            let t_hit = map.beat_to_seconds(nd.start_beat, tf);
            let t_raw_end = map.beat_to_seconds(nd.end_beat.unwrap_or(nd.start_beat), tf);
            let mut kind = NoteKind::from_raw(nd.kind);
            // Any authored duration means hold, whatever the kind id says.
            if t_raw_end > t_hit + 1e-9 {
                kind = NoteKind::Hold;
            }
            notes.push(RuntimeNote {
                id: 0, // assigned after the global sort
                line: target,
                kind,
                above: nd.above,
                fake: nd.fake,
                t_hit,
                t_end: if kind == NoteKind::Hold { t_raw_end } else { t_hit },
                x_local: nd.x * cfg.scale_x(),
                y_offset: nd.y_offset * cfg.scale_y(),
                size: nd.size,
                speed_mul: nd.speed,
                alpha: nd.alpha.clamp(0.0, 1.0),
                hitsound: nd.hitsound.clone(),
                scroll_hit: 0.0,
                scroll_end: 0.0,
                t_enter: visibility::NEVER_CULLED,
                multi_highlight: false,
            });
        }
    }

    notes.sort_by(|a, b| a.t_hit.partial_cmp(&b.t_hit).unwrap_or(Ordering::Less));
    for (id, n) in notes.iter_mut().enumerate() {
        n.id = id as u32;
        let ln = &lines[n.line];
        n.scroll_hit = ln.scroll.integral(n.t_hit);
        n.scroll_end = ln.scroll.integral(n.t_end);
    }

    flag_simultaneous(&mut notes, MH_EPSILON);
    visibility::precompute_entry_times(&lines, &mut notes, cfg);

    let mut hitsounds: FxHashMap<&str, u32> = FxHashMap::default();
    for n in &notes {
        if let Some(hs) = n.hitsound.as_deref() {
            *hitsounds.entry(hs).or_insert(0) += 1;
        }
    }
    info!(
        "chart built: {} lines, {} notes ({} real), {} custom hitsounds",
        lines.len(),
        notes.len(),
        notes.iter().filter(|n| !n.fake).count(),
        hitsounds.len()
    );

    Ok(RuntimeChart { offset: def.offset, lines, notes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn def_with_notes(notes: Vec<NoteDef>) -> ChartDef {
        ChartDef {
            offset: 0.0,
            bpm_events: vec![BpmEvent { beat: 0.0, bpm: 60.0 }],
            lines: vec![LineDef {
                name: "l0".into(),
                tempo_factor: 1.0,
                layers: vec![],
                notes,
            }],
        }
    }

    fn tap(start_beat: f32) -> NoteDef {
        NoteDef {
            kind: 1,
            above: true,
            fake: false,
            start_beat,
            end_beat: None,
            x: 0.0,
            y_offset: 0.0,
            size: 1.0,
            speed: 1.0,
            alpha: 1.0,
            hitsound: None,
            line: None,
        }
    }

    #[test]
    fn unknown_kind_degrades_to_tap() {
        assert_eq!(NoteKind::from_raw(1), NoteKind::Tap);
        assert_eq!(NoteKind::from_raw(2), NoteKind::Drag);
        assert_eq!(NoteKind::from_raw(3), NoteKind::Hold);
        assert_eq!(NoteKind::from_raw(4), NoteKind::Flick);
        assert_eq!(NoteKind::from_raw(0), NoteKind::Tap);
        assert_eq!(NoteKind::from_raw(99), NoteKind::Tap);
    }

    #[test]
    fn simultaneous_group_is_flagged() {
        let def = def_with_notes(vec![tap(1.0), tap(1.00005), tap(1.0002), tap(1.01)]);
        let rc = build_runtime(&def, &RenderConfig::default(), &PlayConfig::default()).unwrap();
        // bpm 60: one beat is one second.
        assert!(rc.notes[0].multi_highlight);
        assert!(rc.notes[1].multi_highlight);
        assert!(rc.notes[2].multi_highlight);
        assert!(!rc.notes[3].multi_highlight);
    }

    #[test]
    fn group_spanning_exactly_two_epsilon_is_flagged() {
        // 1.0002 rounds up in f32, putting the span one ulp past 2*eps.
        let def = def_with_notes(vec![tap(1.0), tap(1.0002)]);
        let rc = build_runtime(&def, &RenderConfig::default(), &PlayConfig::default()).unwrap();
        assert!(rc.notes[0].multi_highlight);
        assert!(rc.notes[1].multi_highlight);
    }

    #[test]
    fn unknown_line_aborts_load() {
        let mut n = tap(1.0);
        n.line = Some(7);
        let def = def_with_notes(vec![n]);
        let err = build_runtime(&def, &RenderConfig::default(), &PlayConfig::default());
        assert!(matches!(err, Err(ChartError::UnknownLine { line: 7, .. })));
    }

    #[test]
    fn fake_notes_excluded_from_total() {
        let mut fake = tap(2.0);
        fake.fake = true;
        let def = def_with_notes(vec![tap(1.0), fake]);
        let rc = build_runtime(&def, &RenderConfig::default(), &PlayConfig::default()).unwrap();
        assert_eq!(rc.notes.len(), 2);
        assert_eq!(rc.total_notes(), 1);
    }

    #[test]
    fn duration_forces_hold_kind() {
        let mut n = tap(1.0);
        n.end_beat = Some(2.0);
        let def = def_with_notes(vec![n, tap(0.5)]);
        let rc = build_runtime(&def, &RenderConfig::default(), &PlayConfig::default()).unwrap();
        let hold = rc.notes.iter().find(|n| n.kind == NoteKind::Hold).unwrap();
        assert!(hold.t_end > hold.t_hit);
        let tap = rc.notes.iter().find(|n| n.kind == NoteKind::Tap).unwrap();
        assert_eq!(tap.t_end, tap.t_hit);
    }

    #[test]
    fn notes_sorted_by_hit_time() {
        let def = def_with_notes(vec![tap(3.0), tap(1.0), tap(2.0)]);
        let rc = build_runtime(&def, &RenderConfig::default(), &PlayConfig::default()).unwrap();
        let times: Vec<f32> = rc.notes.iter().map(|n| n.t_hit).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(rc.notes[0].id, 0);
    }

    #[test]
    fn scroll_samples_precomputed() {
        let mut def = def_with_notes(vec![tap(2.0)]);
        def.lines[0].layers = vec![EventLayer {
            speed: vec![ChartEvent {
                start_beat: 0.0,
                end_beat: 100.0,
                start: 1.0,
                end: 1.0,
                easing_type: 1,
                easing_left: 0.0,
                easing_right: 1.0,
                bezier: None,
            }],
            ..Default::default()
        }];
        let cfg = RenderConfig::default();
        let rc = build_runtime(&def, &cfg, &PlayConfig::default()).unwrap();
        // 2 s at 1 unit/s, 120 px per unit at native scale.
        assert!((rc.notes[0].scroll_hit - 240.0).abs() <= 1e-3);
    }

    #[test]
    fn json_intermediate_parses_with_defaults() {
        let json = r#"{
            "bpm_events": [{"beat": 0.0, "bpm": 120.0}],
            "lines": [{"notes": [{"kind": 1, "start_beat": 4.0}]}]
        }"#;
        let def = ChartDef::from_json_str(json).unwrap();
        assert_eq!(def.lines[0].notes[0].size, 1.0);
        assert!(def.lines[0].notes[0].above);
        let rc = build_runtime(&def, &RenderConfig::default(), &PlayConfig::default()).unwrap();
        assert!((rc.notes[0].t_hit - 2.0).abs() <= 1e-6);
    }

    #[test]
    fn hsv_rainbow_is_stable() {
        assert_eq!(hsv_to_rgb(0.0, 0.0, 1.0), [255, 255, 255]);
        let [r, g, b] = hsv_to_rgb(0.0, 0.65, 0.95);
        assert!(r > g && r > b);
        let [r2, g2, b2] = hsv_to_rgb(1.0 / 3.0, 0.65, 0.95);
        assert!(g2 > r2 && g2 > b2);
    }
}
