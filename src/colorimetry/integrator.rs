use super::{illuminant::IlluminantSpectrum, observer::ObserverTable, resample::ResampledSpectrum};
use crate::common::{spectrum::Tristimulus, RenderError, WavelengthRange, WavelengthTable};

/// Wavelength step of the tristimulus sums.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntegrationStep {
    /// Every nm.
    Full,
    /// Every 5 nm, for quick previews.
    Preview,
}

impl IntegrationStep {
    pub fn nm(&self) -> u32 {
        match self {
            IntegrationStep::Full => 1,
            IntegrationStep::Preview => 5,
        }
    }
}

impl Default for IntegrationStep {
    fn default() -> Self {
        IntegrationStep::Full
    }
}

/// Sums spectrum × observer × illuminant over the wavelengths the three tables share.
///
/// The result is normalized so that a perfect reflector has Y = 100 under the render
/// illuminant.
#[derive(Clone, Debug)]
pub struct TristimulusIntegrator<'a> {
    observer: &'a ObserverTable,
    illuminant: &'a IlluminantSpectrum,
    range: WavelengthRange,
    step: u32,
    normalization: f64,
}

impl<'a> TristimulusIntegrator<'a> {
    pub fn new(
        observer: &'a ObserverTable,
        illuminant: &'a IlluminantSpectrum,
        spectral_grid: WavelengthRange,
        step: IntegrationStep,
    ) -> anyhow::Result<Self> {
        let range = WavelengthRange::of(observer)
            .zip(WavelengthRange::of(illuminant))
            .and_then(|(o, i)| o.intersect(&i))
            .and_then(|shared| shared.intersect(&spectral_grid))
            .ok_or_else(|| {
                RenderError::NumericDegeneracy(format!(
                    "spectral range {}-{}nm does not overlap the observer and illuminant tables",
                    spectral_grid.first, spectral_grid.last
                ))
            })?;
        let step = step.nm();

        let normalization = range
            .iter(step)
            .filter_map(|nm| Some(observer.at(nm)?.y * illuminant.at(nm)?))
            .sum::<f64>();

        if !(normalization > 0.0) {
            anyhow::bail!(RenderError::NumericDegeneracy(format!(
                "normalization constant is {} over {}-{}nm",
                normalization, range.first, range.last
            )));
        }

        Ok(Self {
            observer,
            illuminant,
            range,
            step,
            normalization,
        })
    }

    /// Wavelengths actually summed over.
    pub fn range(&self) -> WavelengthRange {
        self.range
    }

    /// Σ ȳ(λ)·I(λ) over the integration range.
    pub fn normalization(&self) -> f64 {
        self.normalization
    }

    pub fn integrate(&self, spectrum: &ResampledSpectrum) -> Tristimulus {
        let mut xyz = na::Vector3::<f64>::zeros();

        for nm in self.range.iter(self.step) {
            if let (Some(s), Some(cmf), Some(power)) = (
                spectrum.at(nm),
                self.observer.at(nm),
                self.illuminant.at(nm),
            ) {
                xyz += cmf * s * power;
            }
        }

        Tristimulus(xyz * 100.0 / self.normalization)
    }
}
