//! Pure numeric kernels shared by the command builder/applier and by
//! `set_abcn`. No I/O, no allocation beyond what the caller already owns.

use protogonos_types::Parameters;

/// The reference substrate weight limit: every weight update is clamped to
/// `[-WEIGHT_LIMIT, +WEIGHT_LIMIT]`.
pub const WEIGHT_LIMIT: f64 = 3.1415;

/// The control-value nonlinearity's dead-zone boundary.
pub const CONTROL_THRESHOLD: f64 = 0.33;

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Clamps a weight delta to the reference substrate limit.
pub fn saturate(x: f64) -> f64 {
    clamp(x, -WEIGHT_LIMIT, WEIGHT_LIMIT)
}

/// `scale(v, max, min) = (2v - (max + min)) / (max - min)`, zero when
/// `max == min` (degenerate range).
pub fn scale_value(v: f64, max: f64, min: f64) -> f64 {
    let span = max - min;
    if span == 0.0 {
        return 0.0;
    }
    (2.0 * v - (max + min)) / span
}

/// The core nonlinearity used by `set_weight` and `delta_weight`/
/// `set_iterative`: clamps to `[-1, 1]`, maps the magnitude above the
/// dead-zone threshold into `[0, 1]` (signed), and applies an optional
/// `"scale"` multiplier from `params`.
pub fn control_value(delta: f64, params: &Parameters) -> f64 {
    let v = clamp(delta, -1.0, 1.0);
    let mut c = if v > CONTROL_THRESHOLD {
        (scale_value(v, 1.0, CONTROL_THRESHOLD) + 1.0) / 2.0
    } else if v < -CONTROL_THRESHOLD {
        (scale_value(v, -CONTROL_THRESHOLD, -1.0) - 1.0) / 2.0
    } else {
        0.0
    };
    if let Some(s) = params.scale() {
        c *= s;
    }
    c
}

/// The default `set_weight` CPP's scalar reduction: the arithmetic mean of
/// the input vector, or `0.0` for an empty input.
pub fn mean(inputs: &[f64]) -> f64 {
    if inputs.is_empty() {
        0.0
    } else {
        inputs.iter().sum::<f64>() / inputs.len() as f64
    }
}
