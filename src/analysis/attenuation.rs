/// Power-law attenuation of displacement with distance: `D = A · d^-n`.
///
/// Fitted by ordinary least squares in log-log space,
/// `ln D = ln A - n · ln d`.

use serde::Serialize;

use crate::analysis::displacement::DistancePoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttenuationFit {
    /// Displacement at 1 km, metres.
    #[serde(rename = "A")]
    pub amplitude: f64,
    /// Decay exponent.
    pub n: f64,
    /// Points used in the fit.
    pub count: usize,
}

impl AttenuationFit {
    pub fn predict(&self, distance_km: f64) -> f64 {
        self.amplitude * distance_km.powf(-self.n)
    }
}

/// Fits `(distance_km, displacement)` pairs. Non-positive values are ignored.
///
/// Returns `None` with fewer than two usable points or when every usable
/// point sits at the same distance.
pub fn fit_power_law(pairs: impl IntoIterator<Item = (f64, f64)>) -> Option<AttenuationFit> {
    let logs: Vec<(f64, f64)> = pairs
        .into_iter()
        .filter(|(d, v)| *d > 0.0 && *v > 0.0 && d.is_finite() && v.is_finite())
        .map(|(d, v)| (d.ln(), v.ln()))
        .collect();

    if logs.len() < 2 {
        return None;
    }

    let n = logs.len() as f64;
    let mean_x = logs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = logs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let sxx: f64 = logs.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if sxx <= f64::EPSILON {
        return None;
    }
    let sxy: f64 = logs.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();

    let slope = sxy / sxx;
    Some(AttenuationFit {
        amplitude: (mean_y - slope * mean_x).exp(),
        n: -slope,
        count: logs.len(),
    })
}

pub fn fit_attenuation(points: &[DistancePoint]) -> Option<AttenuationFit> {
    fit_power_law(points.iter().map(|p| (p.distance_km, p.displacement_m)))
}
