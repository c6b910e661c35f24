use crate::chart::{NoteKind, RuntimeLine, RuntimeNote};
use crate::config::{LineAlphaRule, RenderConfig, VIRTUAL_H, VIRTUAL_W};
use glam::Vec2;

/// One line sampled at a query time. `alpha` is display-ready;
/// `raw_alpha` keeps the authored sign (negative values are an authoring
/// convention meaning "hide my notes", see [`note_alpha`]).
#[derive(Copy, Clone, Debug)]
pub struct LineState {
    pub x: f32,
    pub y: f32,
    pub rot: f32,
    pub alpha: f32,
    pub scroll: f32,
    pub raw_alpha: f32,
}

/// Authored alpha is usually 0..255 but some charts use 0..1 directly.
#[inline(always)]
fn normalize_alpha(v: f32) -> f32 {
    if v.abs() <= 1.000001 { v } else { v / 255.0 }
}

/// Samples a line's channels at `t`. Pure; O(log segments) per channel,
/// called once per visible note per frame.
pub fn eval_line(line: &RuntimeLine, t: f32, cfg: &RenderConfig) -> LineState {
    // Authored frame: x in [-675, 675], y in [-450, 450], y up.
    let x = (line.x.eval(t) + VIRTUAL_W * 0.5) * cfg.scale_x();
    let y = (VIRTUAL_H * 0.5 - line.y.eval(t)) * cfg.scale_y();
    let rot = line.rotate.eval(t).to_radians();
    let raw_alpha = normalize_alpha(line.alpha.eval(t));
    LineState {
        x,
        y,
        rot,
        alpha: raw_alpha.abs().clamp(0.0, 1.0),
        scroll: line.scroll.integral(t),
        raw_alpha,
    }
}

/// Maps a note into world space from its line's frame at the query time.
/// `scroll_target` is `scroll_hit` for an unengaged note or the current
/// scroll when actively held. The head of an unengaged hold is clamped to
/// the near side of the line; tails skip the clamp and scale travel by the
/// note's speed multiplier.
pub fn note_world_pos(
    ls: &LineState,
    note: &RuntimeNote,
    scroll_target: f32,
    for_tail: bool,
    cfg: &RenderConfig,
) -> Vec2 {
    let (tx, ty) = (ls.rot.cos(), ls.rot.sin());
    let (nx, ny) = (-ls.rot.sin(), ls.rot.cos());
    let sgn = if note.above { 1.0 } else { -1.0 };

    let mut dy = scroll_target - ls.scroll;
    if cfg.hold_keep_head && note.kind == NoteKind::Hold && !for_tail && dy < 0.0 {
        dy = 0.0;
    }
    let mult = if for_tail && note.kind == NoteKind::Hold {
        note.speed_mul.max(0.0)
    } else {
        1.0
    };
    let y_local = sgn * dy * mult + note.y_offset;

    Vec2::new(
        ls.x + tx * note.x_local + nx * y_local,
        ls.y + ty * note.x_local + ny * y_local,
    )
}

/// Display alpha for a note given its line's raw (signed) alpha.
pub fn note_alpha(note: &RuntimeNote, raw_line_alpha: f32, rule: LineAlphaRule) -> f32 {
    match rule {
        LineAlphaRule::Never => note.alpha,
        LineAlphaRule::NegativeOnly => {
            if raw_line_alpha < 0.0 {
                0.0
            } else {
                note.alpha
            }
        }
        LineAlphaRule::Always => note.alpha * raw_line_alpha.abs().clamp(0.0, 1.0),
    }
}
