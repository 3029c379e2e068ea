//! Mathematical helpers for correlation and angle handling.

/// Wraps an angle in degrees into the range [0, 360).
pub(crate) fn wrap_deg_360(angle_deg: f32) -> f32 {
    let mut wrapped = angle_deg % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    // -1e-4 % 360 can land exactly on 360.0 after the correction above.
    if wrapped >= 360.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Absolute circular distance between two angles in degrees, in [0, 180].
pub(crate) fn circular_diff_deg(a: f32, b: f32) -> f32 {
    let diff = wrap_deg_360(a - b);
    diff.min(360.0 - diff)
}

/// Sub-sample correction for a peak found on a unit grid.
///
/// `left`, `mid`, `right` are the scores one sample either side of the argmax.
/// A parabola through the three moves the vertex by
/// `(left - right) / (2 * (left - 2*mid + right))`; the correction is only
/// trusted when the fit is strictly concave and lands within one sample of
/// the grid point, otherwise `None`.
pub(crate) fn parabolic_peak_offset(left: f32, mid: f32, right: f32) -> Option<f32> {
    let curvature = left - 2.0 * mid + right;
    // Non-finite inputs (unscored shifts) poison the curvature and fall out
    // here along with valleys and flat fits.
    if !curvature.is_finite() || curvature > -1e-6 {
        return None;
    }
    let dx = 0.5 * (left - right) / curvature;
    (dx.is_finite() && dx.abs() <= 1.0).then_some(dx)
}
