use crate::common::{
    math::{find_interval, lerp},
    RenderError, WavelengthRange, WavelengthTable, LAST_WAVELENGTH,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Interpolation {
    Linear,
    /// Natural cubic spline. Falls back to linear below three bands.
    CubicSpline,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::CubicSpline
    }
}

/// Native band samples of one pixel: intensities normalized to [0, 1] at the cube's wavelengths.
#[derive(Clone, Copy, Debug)]
pub struct PixelSpectrum<'a> {
    wavelengths: &'a [f64],
    intensities: &'a [f64],
}

impl<'a> PixelSpectrum<'a> {
    pub fn new(wavelengths: &'a [f64], intensities: &'a [f64]) -> Self {
        debug_assert_eq!(wavelengths.len(), intensities.len());
        Self {
            wavelengths,
            intensities,
        }
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }
}

/// Working memory for fitting one spline. Each worker owns one and reuses it for every pixel it
/// processes.
#[derive(Clone, Debug, Default)]
pub struct SplineScratch {
    second_derivatives: Vec<f64>,
    c_prime: Vec<f64>,
    d_prime: Vec<f64>,
}

/// Fitted interpolant over a pixel's native samples.
struct Spline<'a> {
    xs: &'a [f64],
    ys: &'a [f64],
    second_derivatives: Option<&'a [f64]>,
}

impl<'a> Spline<'a> {
    fn fit(
        spectrum: &PixelSpectrum<'a>,
        interpolation: Interpolation,
        scratch: &'a mut SplineScratch,
    ) -> Self {
        let xs = spectrum.wavelengths;
        let ys = spectrum.intensities;
        let n = xs.len();

        if interpolation == Interpolation::Linear || n < 3 {
            return Self {
                xs,
                ys,
                second_derivatives: None,
            };
        }

        // Natural boundary conditions: M[0] = M[n - 1] = 0. The interior second derivatives solve
        // a tridiagonal system, done here with the Thomas algorithm.
        let m = &mut scratch.second_derivatives;
        let c_prime = &mut scratch.c_prime;
        let d_prime = &mut scratch.d_prime;
        m.clear();
        m.resize(n, 0.0);
        c_prime.clear();
        c_prime.resize(n, 0.0);
        d_prime.clear();
        d_prime.resize(n, 0.0);

        for i in 1..n - 1 {
            let h_prev = xs[i] - xs[i - 1];
            let h = xs[i + 1] - xs[i];
            let sub = h_prev;
            let diag = 2.0 * (h_prev + h);
            let rhs = 6.0 * ((ys[i + 1] - ys[i]) / h - (ys[i] - ys[i - 1]) / h_prev);

            let denom = diag - sub * c_prime[i - 1];
            c_prime[i] = h / denom;
            d_prime[i] = (rhs - sub * d_prime[i - 1]) / denom;
        }

        for i in (1..n - 1).rev() {
            m[i] = d_prime[i] - c_prime[i] * m[i + 1];
        }

        Self {
            xs,
            ys,
            second_derivatives: Some(&scratch.second_derivatives[..]),
        }
    }

    /// Evaluates the interpolant, holding the end values outside the native range.
    fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }

        let x = x.clamp(self.xs[0], self.xs[n - 1]);
        let k = find_interval(n, |i| self.xs[i] <= x);
        let h = self.xs[k + 1] - self.xs[k];
        let b = (x - self.xs[k]) / h;

        match self.second_derivatives {
            None => lerp(b, self.ys[k], self.ys[k + 1]),
            Some(m) => {
                let a = (self.xs[k + 1] - x) / h;
                a * self.ys[k]
                    + b * self.ys[k + 1]
                    + ((a * a * a - a) * m[k] + (b * b * b - b) * m[k + 1]) * h * h / 6.0
            }
        }
    }
}

/// Natural cubic spline through values tabulated every `pitch` nm, evaluated every 1 nm between
/// the same end points. Overshoot below zero is clamped.
pub(super) fn spline_to_1nm(values: &[f64], pitch: u32) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let knots = (0..values.len())
        .map(|i| (i as u32 * pitch) as f64)
        .collect::<Vec<_>>();
    let mut scratch = SplineScratch::default();
    let spline = Spline::fit(
        &PixelSpectrum::new(&knots, values),
        Interpolation::CubicSpline,
        &mut scratch,
    );

    let last = (values.len() - 1) as u32 * pitch;
    (0..=last).map(|x| spline.eval(x as f64).max(0.0)).collect()
}

/// A pixel spectrum on the 1 nm grid, values never negative.
#[derive(Clone, Debug, Default)]
pub struct ResampledSpectrum {
    first: u32,
    values: Vec<f64>,
}

impl ResampledSpectrum {
    pub fn at(&self, wavelength: u32) -> Option<f64> {
        self.index_of(wavelength).map(|i| self.values[i])
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl WavelengthTable for ResampledSpectrum {
    fn first_wavelength(&self) -> u32 {
        self.first
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

/// Interpolates native band samples onto the integer grid from the first native wavelength
/// (rounded up) to 830 nm.
#[derive(Clone, Debug)]
pub struct SpectralResampler {
    grid: WavelengthRange,
    interpolation: Interpolation,
}

impl SpectralResampler {
    pub fn new(native_wavelengths: &[f64], interpolation: Interpolation) -> anyhow::Result<Self> {
        let first = match native_wavelengths.first() {
            Some(first) => first.ceil().max(0.0),
            None => anyhow::bail!(RenderError::SourceFormat(String::from(
                "cube has no bands"
            ))),
        };

        if first > LAST_WAVELENGTH as f64 {
            anyhow::bail!(RenderError::NumericDegeneracy(format!(
                "first band at {}nm lies above the visible range",
                first
            )));
        }

        Ok(Self {
            grid: WavelengthRange::new(first as u32, LAST_WAVELENGTH),
            interpolation,
        })
    }

    pub fn grid(&self) -> WavelengthRange {
        self.grid
    }

    /// Interpolation actually used for a pixel with `band_count` samples.
    pub fn interpolation_for(&self, band_count: usize) -> Interpolation {
        if band_count < 3 {
            Interpolation::Linear
        } else {
            self.interpolation
        }
    }

    pub fn resample(
        &self,
        spectrum: &PixelSpectrum,
        scratch: &mut SplineScratch,
        out: &mut ResampledSpectrum,
    ) {
        out.first = self.grid.first;
        out.values.clear();
        if spectrum.is_empty() {
            out.values.resize(self.grid.len(), 0.0);
            return;
        }

        let spline = Spline::fit(spectrum, self.interpolation_for(spectrum.len()), scratch);
        out.values.extend(
            self.grid
                .iter(1)
                .map(|nm| spline.eval(nm as f64).max(0.0)),
        );
    }
}
