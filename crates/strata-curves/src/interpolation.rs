//! Interpolation of discount factors between calibrated pillars.

use serde::{Deserialize, Serialize};

/// How discount factors are interpolated between pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InterpolationMethod {
    /// Linear on `ln(DF)`: piecewise flat forwards. The last segment's
    /// forward is extended beyond the final pillar.
    #[default]
    LogLinearDiscount,

    /// Linear on continuously compounded zero rates, flat beyond both ends.
    LinearZero,
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LogLinearDiscount => "Log-Linear Discount",
            Self::LinearZero => "Linear Zero",
        };
        write!(f, "{name}")
    }
}

/// Index of the segment `[xs[i], xs[i + 1]]` used for `x`.
///
/// Points outside the grid map to the first or last segment. `xs` must hold
/// at least two strictly increasing values.
fn segment(xs: &[f64], x: f64) -> usize {
    match xs.partition_point(|&p| p <= x) {
        0 => 0,
        n if n >= xs.len() => xs.len() - 2,
        n => n - 1,
    }
}

fn lerp(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

impl InterpolationMethod {
    /// Discount factor at `t` from pillar times and discount factors.
    ///
    /// `times` must start at `0.0` with a discount factor of `1.0` and be
    /// strictly increasing; every discount factor must be positive.
    #[must_use]
    pub fn discount_factor(&self, times: &[f64], dfs: &[f64], t: f64) -> f64 {
        if times.len() < 2 {
            return 1.0;
        }
        match self {
            Self::LogLinearDiscount => {
                let i = segment(times, t);
                let ln_df = lerp(times[i], dfs[i].ln(), times[i + 1], dfs[i + 1].ln(), t);
                ln_df.exp()
            }
            Self::LinearZero => {
                let zero = |j: usize| -dfs[j].ln() / times[j];
                let last = times.len() - 1;
                let z = if t <= times[1] {
                    zero(1)
                } else if t >= times[last] {
                    zero(last)
                } else {
                    let i = segment(times, t);
                    lerp(times[i], zero(i), times[i + 1], zero(i + 1), t)
                };
                (-z * t).exp()
            }
        }
    }
}

/// Linear interpolation of `ys` over `xs`, flat beyond both ends.
///
/// Returns `0.0` for an empty grid.
#[must_use]
pub fn linear_flat(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    match xs.len() {
        0 => 0.0,
        1 => ys[0],
        n => {
            if x <= xs[0] {
                ys[0]
            } else if x >= xs[n - 1] {
                ys[n - 1]
            } else {
                let i = segment(xs, x);
                lerp(xs[i], ys[i], xs[i + 1], ys[i + 1], x)
            }
        }
    }
}
