use log::debug;
use std::cmp::Ordering;

/// One tempo region: everything from `beat` until the next segment's start
/// beat runs at `bpm`. `sec_prefix` is the accumulated seconds at `beat`.
#[derive(Copy, Clone, Debug)]
pub struct BpmSegment {
    pub beat: f32,
    pub bpm: f32,
    pub sec_prefix: f32,
}

/// Converts fractional musical-beat positions to absolute seconds under a
/// sequence of BPM changes. Built once per chart, queried by binary search.
#[derive(Clone, Debug, Default)]
pub struct BeatTimeMap {
    segs: Vec<BpmSegment>,
}

impl BeatTimeMap {
    pub fn build(events: &[(f32, f32)]) -> Self {
        let mut items: Vec<(f32, f32)> = events.to_vec();
        items.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Less));

        let mut segs = Vec::with_capacity(items.len());
        let mut sec_prefix = 0.0_f32;
        for (i, &(beat, bpm)) in items.iter().enumerate() {
            segs.push(BpmSegment { beat, bpm, sec_prefix });
            if let Some(&(next_beat, _)) = items.get(i + 1) {
                if bpm > 0.0 {
                    sec_prefix += (next_beat - beat) * 60.0 / bpm;
                }
            }
        }
        debug!("BeatTimeMap built with {} BPM segments", segs.len());
        Self { segs }
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    /// Seconds at `beat`. `tempo_factor` implements per-line local time
    /// dilation (authored `bpmfactor`): effective bpm = bpm / factor, so the
    /// whole result scales by the factor. An empty map yields 0.
    #[inline(always)]
    pub fn beat_to_seconds(&self, beat: f32, tempo_factor: f32) -> f32 {
        if self.segs.is_empty() {
            return 0.0;
        }
        // Last segment whose start beat <= beat; queries before the first
        // segment extrapolate backwards along it.
        let idx = self.segs.partition_point(|s| s.beat <= beat);
        let s = self.segs[idx.saturating_sub(1)];
        if s.bpm <= 0.0 {
            return s.sec_prefix * tempo_factor;
        }
        (s.sec_prefix + (beat - s.beat) * 60.0 / s.bpm) * tempo_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_returns_zero() {
        let map = BeatTimeMap::build(&[]);
        assert_eq!(map.beat_to_seconds(4.0, 1.0), 0.0);
    }

    #[test]
    fn single_segment_is_linear() {
        let map = BeatTimeMap::build(&[(0.0, 120.0)]);
        assert_eq!(map.beat_to_seconds(0.0, 1.0), 0.0);
        assert!((map.beat_to_seconds(2.0, 1.0) - 1.0).abs() <= 1e-6);
        assert!((map.beat_to_seconds(120.0, 1.0) - 60.0).abs() <= 1e-6);
    }

    #[test]
    fn unsorted_input_is_sorted_at_build() {
        let map = BeatTimeMap::build(&[(8.0, 240.0), (0.0, 120.0)]);
        // 8 beats at 120 bpm = 4s, then 240 bpm = 0.25 s/beat.
        assert!((map.beat_to_seconds(8.0, 1.0) - 4.0).abs() <= 1e-6);
        assert!((map.beat_to_seconds(12.0, 1.0) - 5.0).abs() <= 1e-6);
    }

    #[test]
    fn monotonic_in_beat() {
        let map = BeatTimeMap::build(&[(0.0, 90.0), (3.5, 200.0), (16.0, 45.0)]);
        let mut last = f32::MIN;
        for i in 0..200 {
            let t = map.beat_to_seconds(i as f32 * 0.25, 1.0);
            assert!(t >= last, "beat_to_seconds regressed at beat {}", i as f32 * 0.25);
            last = t;
        }
    }

    #[test]
    fn tempo_factor_scales_result() {
        let map = BeatTimeMap::build(&[(0.0, 120.0)]);
        let base = map.beat_to_seconds(7.0, 1.0);
        let dilated = map.beat_to_seconds(7.0, 2.0);
        assert!((dilated - base * 2.0).abs() <= 1e-6);
    }
}
