/// First radiation constant for spectral radiance, c1 = 2hc^2 (W·m^2).
pub const PLANCK_C1: f64 = 3.74177152e-16;
/// Second radiation constant, c2 = hc/k (m·K).
pub const PLANCK_C2: f64 = 1.43877696e-2;

/// sRGB transfer function: linear below 0.0031308, 1/2.4 power law with 0.055 offset above.
pub fn gamma_correct(value: f64) -> f64 {
    if value <= 0.0031308 {
        return 12.92 * value;
    }

    1.055 * value.powf(1.0 / 2.4) - 0.055
}

/// AdobeRGB (1998) transfer function, a pure power law of 256/563 (gamma 2.19921875).
pub fn adobe_gamma_correct(value: f64) -> f64 {
    value.powf(256.0 / 563.0)
}

/// Blackbody spectral power at `wavelength` nm for temperature `kelvin` (Planck's law).
pub fn blackbody(kelvin: f64, wavelength: f64) -> f64 {
    let wlm = wavelength * 1e-9;
    PLANCK_C1 / (wlm.powi(5) * ((PLANCK_C2 / (wlm * kelvin)).exp() - 1.0))
}

pub fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + (b - a) * t
}

/// Binary search for the last index `i` in `0..size - 1` where `pred(i)` holds, clamped so that
/// `i + 1` is always a valid index. `size` must be at least 2.
pub fn find_interval<T: Fn(usize) -> bool>(size: usize, pred: T) -> usize {
    let mut first = 0;
    let mut len = size;

    while len > 0 {
        let half = len >> 1;
        let middle = first + half;
        if pred(middle) {
            first = middle + 1;
            len -= half + 1;
        } else {
            len = half;
        }
    }

    first.saturating_sub(1).clamp(0, size - 2)
}
