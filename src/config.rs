use crate::judgment::JudgeWindows;

/// Authored charts position everything in a fixed virtual frame; render
/// targets of any size map through these.
pub const VIRTUAL_W: f32 = 1350.0;
pub const VIRTUAL_H: f32 = 900.0;
/// One authored speed unit is 120 px/s at the base 900p height.
pub const BASE_FLOW_PX_PER_SEC: f32 = 120.0;

/// How a line's authored alpha carries over to its notes. Charts signal
/// "hide my notes" by authoring a negative line alpha, so the default only
/// reacts to the sign.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LineAlphaRule {
    Never,
    #[default]
    NegativeOnly,
    Always,
}

/// Immutable per-session view parameters, passed explicitly to the
/// evaluator and mapper. Multiple sessions with different configs may
/// coexist in one process.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    /// Zoom-out factor; > 1 widens the world region treated as on-screen.
    pub expand: f32,
    pub note_scale_x: f32,
    pub note_scale_y: f32,
    /// Head of an unengaged hold never crosses to the far side of its line.
    pub hold_keep_head: bool,
    pub line_alpha_affects_notes: LineAlphaRule,
    /// Rainbow per-line colors; disabled renders every line white.
    pub multicolor_lines: bool,
}

impl RenderConfig {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            expand: 1.0,
            note_scale_x: 1.0,
            note_scale_y: 1.0,
            hold_keep_head: true,
            line_alpha_affects_notes: LineAlphaRule::default(),
            multicolor_lines: true,
        }
    }

    #[inline(always)]
    pub fn scale_x(&self) -> f32 {
        self.width / VIRTUAL_W
    }

    #[inline(always)]
    pub fn scale_y(&self) -> f32 {
        self.height / VIRTUAL_H
    }

    /// Authored speed units -> px/s at this resolution.
    #[inline(always)]
    pub fn px_per_speed_unit(&self) -> f32 {
        BASE_FLOW_PX_PER_SEC * self.scale_y()
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new(VIRTUAL_W, VIRTUAL_H)
    }
}

/// Session tunables for the judgment side.
#[derive(Clone, Debug)]
pub struct PlayConfig {
    pub chart_speed: f32,
    pub autoplay: bool,
    pub windows: JudgeWindows,
    /// Minimum hold progress at early release that still counts as success.
    pub hold_tail_tolerance: f32,
    pub hold_fx_interval_ms: i64,
    /// Seconds of approach used by consumers sizing the draw horizon.
    pub approach: f32,
    /// Some exporters number their easing table off by a constant.
    pub easing_shift: i32,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            chart_speed: 1.0,
            autoplay: false,
            windows: JudgeWindows::default(),
            hold_tail_tolerance: 0.8,
            hold_fx_interval_ms: 200,
            approach: 3.0,
            easing_shift: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_are_relative_to_virtual_frame() {
        let cfg = RenderConfig::new(2700.0, 1800.0);
        assert!((cfg.scale_x() - 2.0).abs() <= 1e-6);
        assert!((cfg.scale_y() - 2.0).abs() <= 1e-6);
        assert!((cfg.px_per_speed_unit() - 240.0).abs() <= 1e-6);
    }

    #[test]
    fn defaults_match_reference_tuning() {
        let play = PlayConfig::default();
        assert_eq!(play.hold_fx_interval_ms, 200);
        assert!((play.hold_tail_tolerance - 0.8).abs() <= 1e-6);
        assert!(play.chart_speed == 1.0 && !play.autoplay);
        assert_eq!(
            RenderConfig::default().line_alpha_affects_notes,
            LineAlphaRule::NegativeOnly
        );
    }
}
