use crate::easing::Easing;
use smallvec::SmallVec;
use std::cmp::Ordering;

#[inline(always)]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline(always)]
pub(crate) fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// One authored transition: value moves from `v0` at `t0` to `v1` at `t1`
/// through `easing`. `left`/`right` rescale the normalized progress into
/// [left, right] before easing (asymmetric ease ranges).
#[derive(Copy, Clone, Debug)]
pub struct EasedSegment {
    pub t0: f32,
    pub t1: f32,
    pub v0: f32,
    pub v1: f32,
    pub easing: Easing,
    pub left: f32,
    pub right: f32,
}

impl EasedSegment {
    pub fn new(t0: f32, t1: f32, v0: f32, v1: f32, easing: Easing) -> Self {
        Self { t0, t1, v0, v1, easing, left: 0.0, right: 1.0 }
    }

    #[inline(always)]
    fn eval(&self, t: f32) -> f32 {
        if t <= self.t0 {
            return self.v0;
        }
        if t >= self.t1 {
            return self.v1;
        }
        let p_raw = (t - self.t0) / (self.t1 - self.t0);
        let p = if p_raw <= self.left {
            0.0
        } else if p_raw >= self.right {
            1.0
        } else {
            (p_raw - self.left) / (self.right - self.left).max(1e-9)
        };
        lerp(self.v0, self.v1, self.easing.apply(clamp01(p)))
    }
}

/// One channel's full timeline: ordered, gap-free eased segments. Flat-holds
/// the first value before the first segment and the last value after the
/// last; empty tracks return `default`.
#[derive(Clone, Debug)]
pub struct PiecewiseEasedTrack {
    segs: Vec<EasedSegment>,
    default: f32,
}

impl PiecewiseEasedTrack {
    pub fn new(mut segs: Vec<EasedSegment>, default: f32) -> Self {
        segs.sort_by(|a, b| a.t0.partial_cmp(&b.t0).unwrap_or(Ordering::Less));
        // Gap-free invariant: synthesize a flat leading segment when the
        // first authored segment starts after t=0.
        if let Some(first) = segs.first().copied() {
            if first.t0 > 0.0 {
                segs.insert(
                    0,
                    EasedSegment::new(0.0, first.t0, first.v0, first.v0, Easing::Linear),
                );
            }
        }
        Self { segs, default }
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    pub fn seg_count(&self) -> usize {
        self.segs.len()
    }

    /// O(log n): called once per channel per visible note per frame.
    #[inline(always)]
    pub fn eval(&self, t: f32) -> f32 {
        if self.segs.is_empty() {
            return self.default;
        }
        let idx = self.segs.partition_point(|s| s.t0 <= t);
        self.segs[idx.saturating_sub(1)].eval(t)
    }
}

/// Adds the evaluated values of layered tracks (multi-layer authoring).
#[derive(Clone, Debug)]
pub struct SumTrack {
    tracks: SmallVec<[PiecewiseEasedTrack; 4]>,
    default: f32,
}

impl SumTrack {
    pub fn new(tracks: impl IntoIterator<Item = PiecewiseEasedTrack>, default: f32) -> Self {
        Self { tracks: tracks.into_iter().collect(), default }
    }

    #[inline(always)]
    pub fn eval(&self, t: f32) -> f32 {
        if self.tracks.is_empty() {
            return self.default;
        }
        self.tracks.iter().map(|tr| tr.eval(t)).sum()
    }

    pub fn seg_count(&self) -> usize {
        self.tracks.iter().map(PiecewiseEasedTrack::seg_count).sum()
    }
}

/// One rate interval; rate varies linearly from `rate0` to `rate1` and
/// `prefix` is the integral from t=0 to `t0`.
#[derive(Copy, Clone, Debug)]
pub struct ScrollSegment {
    pub t0: f32,
    pub t1: f32,
    pub rate0: f32,
    pub rate1: f32,
    pub prefix: f32,
}

/// A rate interval before prefix integration, used to build a track.
#[derive(Copy, Clone, Debug)]
pub struct RateSpan {
    pub t0: f32,
    pub t1: f32,
    pub rate0: f32,
    pub rate1: f32,
}

/// Running antiderivative of a piecewise-linear rate function. Rates may be
/// negative (reverse scroll), so the integral is not monotonic; that is
/// authored behavior and callers must not assume otherwise.
#[derive(Clone, Debug, Default)]
pub struct ScrollIntegralTrack {
    segs: Vec<ScrollSegment>,
}

impl ScrollIntegralTrack {
    pub fn from_rates(mut spans: Vec<RateSpan>) -> Self {
        spans.sort_by(|a, b| a.t0.partial_cmp(&b.t0).unwrap_or(Ordering::Less));
        let mut segs = Vec::with_capacity(spans.len());
        let mut prefix = 0.0_f32;
        for r in spans {
            if r.t1 <= r.t0 {
                continue;
            }
            segs.push(ScrollSegment { t0: r.t0, t1: r.t1, rate0: r.rate0, rate1: r.rate1, prefix });
            prefix += 0.5 * (r.rate0 + r.rate1) * (r.t1 - r.t0);
        }
        Self { segs }
    }

    /// Builds from layered speed events: the timeline is cut at every event
    /// boundary and the layer sum is sampled at each interval's midpoint
    /// (each event interpolates linearly between its start and end values).
    /// A layer contributes only inside its events' `[t0, t1)` spans; no
    /// segment exists past the last boundary, so the integral is constant
    /// there. `scale` converts authored speed units to distance units per
    /// second.
    pub fn from_layered_events(layers: &[Vec<RateSpan>], scale: f32) -> Self {
        let mut cuts: Vec<f32> = vec![0.0];
        for layer in layers {
            for e in layer {
                cuts.push(e.t0);
                cuts.push(e.t1);
            }
        }
        cuts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Less));
        cuts.dedup_by(|a, b| (*a - *b).abs() <= 1e-9);
        if cuts.len() < 2 {
            return Self::default();
        }

        let sample = |t_mid: f32| -> f32 {
            let mut val = 0.0;
            for layer in layers {
                for e in layer {
                    if t_mid >= e.t0 && t_mid < e.t1 {
                        let u = (t_mid - e.t0) / (e.t1 - e.t0).max(1e-9);
                        val += lerp(e.rate0, e.rate1, clamp01(u));
                    }
                }
            }
            val
        };

        let mut spans = Vec::with_capacity(cuts.len() - 1);
        for w in cuts.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            if t1 <= t0 {
                continue;
            }
            let rate = sample((t0 + t1) * 0.5) * scale;
            spans.push(RateSpan { t0, t1, rate0: rate, rate1: rate });
        }
        Self::from_rates(spans)
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    pub fn seg_count(&self) -> usize {
        self.segs.len()
    }

    /// Rate at `t`, zero outside all segments. Used for visibility lookback
    /// heuristics, not for positioning.
    pub fn rate_at(&self, t: f32) -> f32 {
        if self.segs.is_empty() {
            return 0.0;
        }
        let idx = self.segs.partition_point(|s| s.t0 <= t);
        let s = &self.segs[idx.saturating_sub(1)];
        if t < s.t0 || t > s.t1 {
            return 0.0;
        }
        let u = (t - s.t0) / (s.t1 - s.t0).max(1e-9);
        lerp(s.rate0, s.rate1, clamp01(u))
    }

    /// Cumulative scroll distance at `t` (trapezoid closed form within the
    /// covering segment). O(log n).
    #[inline(always)]
    pub fn integral(&self, t: f32) -> f32 {
        if self.segs.is_empty() {
            return 0.0;
        }
        let idx = self.segs.partition_point(|s| s.t0 <= t);
        let s = &self.segs[idx.saturating_sub(1)];
        if t <= s.t0 {
            return s.prefix;
        }
        if t >= s.t1 {
            return s.prefix + 0.5 * (s.rate0 + s.rate1) * (s.t1 - s.t0);
        }
        let dt = t - s.t0;
        let u = dt / (s.t1 - s.t0).max(1e-9);
        let rate_t = lerp(s.rate0, s.rate1, u);
        s.prefix + 0.5 * (s.rate0 + rate_t) * dt
    }
}
