//! Stored-Table Sigma Interpolation
//!
//! Piecewise-linear interpolation through the points
//! `(-2, w-2) (-1, w-1) (0, 1) (+1, w+1) (+2, w+2)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::ReweightVals;

/// Behaviour for `|sigma| > 2`, outside the stored points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaPolicy {
    /// Continue the outermost segment.
    #[default]
    Extrapolate,
    /// Limit sigma to `[-2, 2]` first.
    Clamp,
    /// Fail with [`InterpolationError::OutOfRange`].
    Reject,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpolationError {
    #[error("sigma {0} is not a finite number")]
    NonFiniteSigma(f64),

    #[error("sigma {0} lies outside the stored range [-2, 2]")]
    OutOfRange(f64),

    #[error("stored weight {value} needed at sigma {sigma} is not finite")]
    DegenerateValue { sigma: f64, value: f32 },
}

/// Weight at `sigma` from the four stored values.
///
/// Only the two stored values bracketing `sigma` are inspected, so an unset
/// slot elsewhere does not matter.
pub fn interpolate_stored(
    sigma: f64,
    vals: &ReweightVals,
    policy: SigmaPolicy,
) -> Result<f64, InterpolationError> {
    if !sigma.is_finite() {
        return Err(InterpolationError::NonFiniteSigma(sigma));
    }
    if sigma == 0.0 {
        return Ok(1.0);
    }

    let sigma = match policy {
        SigmaPolicy::Extrapolate => sigma,
        SigmaPolicy::Clamp => sigma.clamp(-2.0, 2.0),
        SigmaPolicy::Reject if sigma.abs() > 2.0 => {
            return Err(InterpolationError::OutOfRange(sigma))
        }
        SigmaPolicy::Reject => sigma,
    };

    // (x0, y0) and (x1, y1) bracket sigma.
    let (x0, y0, x1, y1) = if sigma >= 1.0 {
        (1.0, vals.plus1, 2.0, vals.plus2)
    } else if sigma > 0.0 {
        (0.0, 1.0, 1.0, vals.plus1)
    } else if sigma >= -1.0 {
        (-1.0, vals.minus1, 0.0, 1.0)
    } else {
        (-2.0, vals.minus2, -1.0, vals.minus1)
    };

    for y in [y0, y1] {
        if !y.is_finite() {
            return Err(InterpolationError::DegenerateValue { sigma, value: y });
        }
    }

    let t = (sigma - x0) / (x1 - x0);
    Ok(f64::from(y0) * (1.0 - t) + f64::from(y1) * t)
}
