use std::f32::consts::PI;

/// Bisection depth for solving a cubic bezier's x(u) = p.
pub const BEZIER_SOLVE_ITERS: u32 = 18;

const BACK_C1: f32 = 1.70158;
const BACK_C3: f32 = 2.70158;
const BACK_C2: f32 = 2.5949095;
const ELASTIC_C4: f32 = (2.0 * PI) / 3.0;
const ELASTIC_C5: f32 = (2.0 * PI) / 4.5;

/// A named shape function mapping normalized progress [0,1] to eased
/// progress, or an explicit cubic bezier with control points
/// (0,0), (x1,y1), (x2,y2), (1,1).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Easing {
    Linear,
    SineOut,
    SineIn,
    SineInOut,
    QuadOut,
    QuadIn,
    QuadInOut,
    CubicOut,
    CubicIn,
    CubicInOut,
    QuartOut,
    QuartIn,
    QuartInOut,
    QuintOut,
    QuintIn,
    QuintInOut,
    ExpoOut,
    ExpoIn,
    ExpoInOut,
    CircOut,
    CircIn,
    CircInOut,
    BackOut,
    BackIn,
    BackInOut,
    ElasticOut,
    ElasticIn,
    ElasticInOut,
    BounceOut,
    BounceIn,
    BounceInOut,
    Bezier { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl Easing {
    /// Maps an authored RPE easing-type integer to a curve. The table is
    /// 1-based in most exports; callers apply any exporter shift before this.
    /// Unknown values fall back to Linear.
    pub fn from_rpe(tp: i32) -> Self {
        match tp {
            0 | 1 => Easing::Linear,
            2 => Easing::SineOut,
            3 => Easing::SineIn,
            4 => Easing::QuadOut,
            5 => Easing::QuadIn,
            6 => Easing::SineInOut,
            7 => Easing::QuadInOut,
            8 => Easing::CubicOut,
            9 => Easing::CubicIn,
            10 => Easing::QuartOut,
            11 => Easing::QuartIn,
            12 => Easing::CubicInOut,
            13 => Easing::QuartInOut,
            14 => Easing::QuintOut,
            15 => Easing::QuintIn,
            16 => Easing::ExpoOut,
            17 => Easing::ExpoIn,
            18 => Easing::CircOut,
            19 => Easing::CircIn,
            20 => Easing::BackOut,
            21 => Easing::BackIn,
            22 => Easing::CircInOut,
            23 => Easing::BackInOut,
            24 => Easing::ElasticOut,
            25 => Easing::ElasticIn,
            26 => Easing::BounceOut,
            27 => Easing::BounceIn,
            28 => Easing::BounceInOut,
            29 => Easing::ElasticInOut,
            _ => Easing::Linear,
        }
    }

    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::SineOut => (PI * t / 2.0).sin(),
            Easing::SineIn => 1.0 - (PI * t / 2.0).cos(),
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadIn => t * t,
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicIn => t.powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::QuartOut => 1.0 - (1.0 - t).powi(4),
            Easing::QuartIn => t.powi(4),
            Easing::QuartInOut => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::QuintOut => 1.0 - (1.0 - t).powi(5),
            Easing::QuintIn => t.powi(5),
            Easing::QuintInOut => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Easing::ExpoOut => {
                if t == 1.0 { 1.0 } else { 1.0 - (-10.0 * t).exp2() }
            }
            Easing::ExpoIn => {
                if t == 0.0 { 0.0 } else { (10.0 * t - 10.0).exp2() }
            }
            Easing::ExpoInOut => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    (20.0 * t - 10.0).exp2() / 2.0
                } else {
                    (2.0 - (-20.0 * t + 10.0).exp2()) / 2.0
                }
            }
            Easing::CircOut => (1.0 - (t - 1.0) * (t - 1.0)).max(0.0).sqrt(),
            Easing::CircIn => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Easing::CircInOut => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            Easing::BackOut => {
                let x = t - 1.0;
                1.0 + BACK_C3 * x.powi(3) + BACK_C1 * x * x
            }
            Easing::BackIn => BACK_C3 * t.powi(3) - BACK_C1 * t * t,
            Easing::BackInOut => {
                let s = BACK_C2;
                if t < 0.5 {
                    let x = 2.0 * t;
                    (x * x * ((s + 1.0) * x - s)) / 2.0
                } else {
                    let x = 2.0 * t - 2.0;
                    (x * x * ((s + 1.0) * x + s) + 2.0) / 2.0
                }
            }
            Easing::ElasticOut => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else {
                    (-10.0 * t).exp2() * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            Easing::ElasticIn => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else {
                    -((10.0 * t - 10.0).exp2()) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            Easing::ElasticInOut => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    -((20.0 * t - 10.0).exp2() * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                } else {
                    ((-20.0 * t + 10.0).exp2() * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                        + 1.0
                }
            }
            Easing::BounceOut => bounce_out(t),
            Easing::BounceIn => 1.0 - bounce_out(1.0 - t),
            Easing::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
            Easing::Bezier { x1, y1, x2, y2 } => {
                cubic_bezier_y_for_x(x1, y1, x2, y2, t, BEZIER_SOLVE_ITERS)
            }
        }
    }
}

#[inline(always)]
fn bounce_out(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let x = t - 1.5 / D;
        N * x * x + 0.75
    } else if t < 2.5 / D {
        let x = t - 2.25 / D;
        N * x * x + 0.9375
    } else {
        let x = t - 2.625 / D;
        N * x * x + 0.984375
    }
}

/// Solves u such that Bx(u) = x by binary search, then returns By(u).
/// Control points: (0,0), (x1,y1), (x2,y2), (1,1).
pub fn cubic_bezier_y_for_x(x1: f32, y1: f32, x2: f32, y2: f32, x: f32, iters: u32) -> f32 {
    let bx = |u: f32| {
        let a = 1.0 - u;
        3.0 * a * a * u * x1 + 3.0 * a * u * u * x2 + u * u * u
    };
    let by = |u: f32| {
        let a = 1.0 - u;
        3.0 * a * a * u * y1 + 3.0 * a * u * u * y2 + u * u * u
    };

    let mut lo = 0.0_f32;
    let mut hi = 1.0_f32;
    for _ in 0..iters {
        let mid = (lo + hi) * 0.5;
        if bx(mid) < x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    by((lo + hi) * 0.5)
}
