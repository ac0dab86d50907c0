//! Colorimetric rendering of a single pixel spectrum: resampling onto a 1 nm grid, tristimulus
//! integration against the standard observer and an illuminant, conversion into the output color
//! space and quantization.

pub mod convert;
pub mod illuminant;
pub mod integrator;
pub mod observer;
pub mod quantize;
pub mod resample;

pub use convert::{ColorConverter, ColorSpace, ReferenceWhite};
pub use illuminant::{Illuminant, IlluminantSpectrum};
pub use integrator::{IntegrationStep, TristimulusIntegrator};
pub use observer::{ObserverTable, CIE_1931};
pub use quantize::{OutputFormat, Quantizer};
pub use resample::{Interpolation, PixelSpectrum, SpectralResampler, SplineScratch};

use std::ops::{Add, Mul, Sub};

/// Linearly interpolates a table tabulated every `pitch` nm onto a 1 nm grid with the same end
/// points.
fn expand_to_1nm<T>(rows: &[T], pitch: u32) -> Vec<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>,
{
    let Some(last) = rows.last() else {
        return Vec::new();
    };

    let mut dense = Vec::with_capacity((rows.len() - 1) * pitch as usize + 1);
    for pair in rows.windows(2) {
        for step in 0..pitch {
            let t = step as f64 / pitch as f64;
            dense.push(pair[0] + (pair[1] - pair[0]) * t);
        }
    }
    dense.push(*last);

    dense
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_to_1nm() {
        let dense = expand_to_1nm(&[0.0, 5.0, 0.0], 5);
        assert_eq!(dense.len(), 11);
        assert_eq!(dense[0], 0.0);
        assert_eq!(dense[3], 3.0);
        assert_eq!(dense[5], 5.0);
        assert_eq!(dense[7], 3.0);
        assert_eq!(dense[10], 0.0);
    }
}
