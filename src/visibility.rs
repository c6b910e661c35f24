use crate::chart::{RuntimeLine, RuntimeNote};
use crate::config::RenderConfig;
use crate::kinematics::{eval_line, note_world_pos};
use log::debug;

/// Sentinel entry time for notes that are always drawn.
pub const NEVER_CULLED: f32 = -1e9;
/// How far before the hit time the backward scan reaches.
pub const LOOKBACK_DEFAULT: f32 = 256.0;
/// Stationary notes (zero speed multiplier or a near-still scroll track)
/// can sit on screen much longer before their hit.
pub const LOOKBACK_SLOW: f32 = 666.66;
pub const SCAN_DT: f32 = 1.0 / 30.0;
pub const MAX_SCAN_STEPS: usize = 12_000;
pub const REFINE_ITERS: u32 = 18;

/// Conservative bounding-box test against the (possibly expanded) screen
/// rect. Rotation is ignored; the margin absorbs it.
fn note_visible(lines: &[RuntimeLine], note: &RuntimeNote, t: f32, cfg: &RenderConfig) -> bool {
    let ln = &lines[note.line];
    let ls = eval_line(ln, t, cfg);
    let pos = note_world_pos(&ls, note, note.scroll_hit, false, cfg);

    let ex = cfg.expand.max(1.0);
    let sx = cfg.note_scale_x / ex;
    let sy = cfg.note_scale_y / ex;
    let w = 0.06 * cfg.width * note.size * sx;
    let h = 0.018 * cfg.height * note.size * sy;

    let half_w = cfg.width * ex * 0.5;
    let half_h = cfg.height * ex * 0.5;
    let cx = cfg.width * 0.5;
    let cy = cfg.height * 0.5;
    // When in doubt treat the note as visible earlier rather than cull it.
    let margin = (0.06 * cfg.width).max(0.18 * cfg.width.max(cfg.height) * ex);

    pos.x + w * 0.5 >= cx - half_w - margin
        && pos.x - w * 0.5 <= cx + half_w + margin
        && pos.y + h * 0.5 >= cy - half_h - margin
        && pos.y - h * 0.5 <= cy + half_h + margin
}

fn scroll_rate_near_hit(line: &RuntimeLine, t_hit: f32) -> f32 {
    line.scroll.rate_at(t_hit).abs()
}

/// Solves each note's earliest on-screen time by scanning backward from its
/// hit time in coarse steps and refining the invisible-to-visible boundary
/// by bisection. The scroll integral need not be monotonic, so this takes
/// the first boundary found walking back from the hit. Notes that never
/// leave the screen keep [`NEVER_CULLED`]; notes never seen in the window
/// get `t_hit - lookback`.
pub fn precompute_entry_times(
    lines: &[RuntimeLine],
    notes: &mut [RuntimeNote],
    cfg: &RenderConfig,
) {
    for n in notes.iter_mut() {
        let mut lookback = LOOKBACK_DEFAULT;
        if n.speed_mul == 0.0 || scroll_rate_near_hit(&lines[n.line], n.t_hit) <= 1e-3 {
            lookback = lookback.max(LOOKBACK_SLOW);
        }

        let mut dt_scan = SCAN_DT.max(1e-4);
        if lookback / dt_scan > MAX_SCAN_STEPS as f32 {
            dt_scan = lookback / MAX_SCAN_STEPS as f32;
        }

        let steps = (lookback / dt_scan) as usize;
        let mut t = n.t_hit;
        let mut earliest_visible = f32::NAN;
        let mut was_visible = false;
        let mut resolved = false;

        for _ in 0..steps {
            if note_visible(lines, n, t, cfg) {
                earliest_visible = t;
                was_visible = true;
            } else if was_visible {
                // Boundary lies in (t, earliest_visible]; refine it.
                let mut lo = t;
                let mut hi = earliest_visible;
                for _ in 0..REFINE_ITERS {
                    let mid = (lo + hi) * 0.5;
                    if note_visible(lines, n, mid, cfg) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
                n.t_enter = hi;
                resolved = true;
                break;
            }
            t -= dt_scan;
        }

        if !resolved && !was_visible {
            n.t_enter = n.t_hit - lookback;
        }
        // Visible through the whole window: keep NEVER_CULLED, always drawn.
    }
    debug!("entry times precomputed for {} notes", notes.len());
}
