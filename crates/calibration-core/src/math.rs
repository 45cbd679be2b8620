//! Numerically stable logistic transforms shared by fitting and application.

/// Bound used to keep logit inputs away from 0 and 1.
const LOGIT_EPS: f64 = 1e-12;

/// Logistic sigmoid, stable for large |x|.
///
/// Branches on the sign of x so the exponential argument is always
/// non-positive and cannot overflow.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of the sigmoid. Inputs are clamped away from 0 and 1 so the
/// result is always finite.
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    (p / (1.0 - p)).ln()
}
