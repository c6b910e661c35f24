/// Chart-time source over a caller-provided monotonic clock (audio
/// position or performance counter, in seconds). Pausing freezes the
/// basis so wall time spent paused never advances chart time.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    offset: f32,
    chart_speed: f32,
    origin: f32,
    paused_at: Option<f32>,
}

impl PlaybackClock {
    /// `offset` is the chart's audio offset; `now` is the current reading
    /// of the caller's monotonic clock.
    pub fn start(offset: f32, chart_speed: f32, now: f32) -> Self {
        Self { offset, chart_speed, origin: now, paused_at: None }
    }

    pub fn pause(&mut self, now: f32) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: f32) {
        if let Some(p) = self.paused_at.take() {
            self.origin += now - p;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Rebase to chart time zero.
    pub fn restart(&mut self, now: f32) {
        self.origin = now;
        self.paused_at = None;
    }

    #[inline(always)]
    pub fn chart_time(&self, now: f32) -> f32 {
        let eff = self.paused_at.unwrap_or(now);
        (eff - self.origin - self.offset) * self.chart_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_with_clock() {
        let c = PlaybackClock::start(0.5, 1.0, 10.0);
        assert!((c.chart_time(10.0) - -0.5).abs() <= 1e-6);
        assert!((c.chart_time(12.5) - 2.0).abs() <= 1e-6);
    }

    #[test]
    fn chart_speed_scales_time() {
        let c = PlaybackClock::start(0.0, 2.0, 0.0);
        assert!((c.chart_time(3.0) - 6.0).abs() <= 1e-6);
    }

    #[test]
    fn pause_freezes_chart_time() {
        let mut c = PlaybackClock::start(0.0, 1.0, 0.0);
        c.pause(5.0);
        assert!((c.chart_time(9.0) - 5.0).abs() <= 1e-6);
        c.resume(9.0);
        assert!((c.chart_time(9.0) - 5.0).abs() <= 1e-6);
        assert!((c.chart_time(10.0) - 6.0).abs() <= 1e-6);
    }

    #[test]
    fn double_pause_is_a_noop() {
        let mut c = PlaybackClock::start(0.0, 1.0, 0.0);
        c.pause(2.0);
        c.pause(4.0);
        c.resume(6.0);
        assert!((c.chart_time(6.0) - 2.0).abs() <= 1e-6);
    }

    #[test]
    fn restart_rebases() {
        let mut c = PlaybackClock::start(0.0, 1.0, 0.0);
        c.pause(3.0);
        c.restart(8.0);
        assert!(!c.is_paused());
        assert!((c.chart_time(8.0) - 0.0).abs() <= 1e-6);
    }
}
