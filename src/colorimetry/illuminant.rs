use super::expand_to_1nm;
use crate::common::{math::blackbody, RenderError, WavelengthTable, LAST_WAVELENGTH};
use std::{fmt, str::FromStr};

const FIRST_WAVELENGTH: u32 = 300;
const D65_PITCH: u32 = 5;

/// Correlated color temperature of the tabulated D65 illuminant. Asking for this exact
/// temperature selects the table instead of a blackbody.
pub const D65_KELVIN: i64 = 6504;
/// Nominal temperature of CIE standard illuminant A.
pub const A_KELVIN: i64 = 2856;

/// CIE standard illuminant D65, relative spectral power at 5 nm from 300 to 830 nm.
#[rustfmt::skip]
const CIE_D65: [f64; 107] = [
    0.0341, 1.6643, 3.2945, 11.7652, 20.236, 28.6447,
    37.0535, 38.5011, 39.9488, 42.4302, 44.9117, 45.775,
    46.6383, 49.3637, 52.0891, 51.0323, 49.9755, 52.3118,
    54.6482, 68.7015, 82.7549, 87.1204, 91.486, 92.4589,
    93.4318, 90.057, 86.6823, 95.7736, 104.865, 110.936,
    117.008, 117.41, 117.812, 116.336, 114.861, 115.392,
    115.923, 112.367, 108.811, 109.082, 109.354, 108.578,
    107.802, 106.296, 104.79, 106.239, 107.689, 106.047,
    104.405, 104.225, 104.046, 102.023, 100.0, 98.1671,
    96.3342, 96.0611, 95.788, 92.2368, 88.6856, 89.3459,
    90.0062, 89.8026, 89.5991, 88.6489, 87.6987, 85.4936,
    83.2886, 83.4939, 83.6992, 81.863, 80.0268, 80.1207,
    80.2146, 81.2462, 82.2778, 80.281, 78.2842, 74.0027,
    69.7213, 70.6652, 71.6091, 72.979, 74.349, 67.9765,
    61.604, 65.7448, 69.8856, 72.4863, 75.087, 69.3398,
    63.5927, 55.0054, 46.4182, 56.6118, 66.8054, 65.0941,
    63.3828, 63.8434, 64.304, 61.8779, 59.4519, 55.7054,
    51.959, 54.6998, 57.4406, 58.8765, 60.3125,
];

/// Light source the scene is rendered under.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Illuminant {
    /// Tabulated CIE D65 daylight.
    D65,
    /// CIE standard illuminant A (incandescent tungsten).
    A,
    /// Planckian radiator at the given temperature in Kelvin.
    Blackbody(i64),
}

impl Illuminant {
    pub fn from_kelvin(kelvin: i64) -> Self {
        if kelvin == D65_KELVIN {
            Illuminant::D65
        } else {
            Illuminant::Blackbody(kelvin)
        }
    }

    pub fn temperature(&self) -> i64 {
        match self {
            Illuminant::D65 => D65_KELVIN,
            Illuminant::A => A_KELVIN,
            Illuminant::Blackbody(kelvin) => *kelvin,
        }
    }

    /// Builds the 1 nm power spectrum from 300 to 830 nm.
    pub fn spectrum(&self) -> anyhow::Result<IlluminantSpectrum> {
        let power = match *self {
            Illuminant::D65 => expand_to_1nm(&CIE_D65, D65_PITCH),
            Illuminant::A => (FIRST_WAVELENGTH..=LAST_WAVELENGTH)
                .map(|nm| illuminant_a(nm as f64))
                .collect(),
            Illuminant::Blackbody(kelvin) => {
                if kelvin <= 0 {
                    anyhow::bail!(RenderError::Configuration(format!(
                        "color temperature must be positive, got {}K",
                        kelvin
                    )));
                }
                (FIRST_WAVELENGTH..=LAST_WAVELENGTH)
                    .map(|nm| blackbody(kelvin as f64, nm as f64))
                    .collect()
            }
        };

        Ok(IlluminantSpectrum {
            first: FIRST_WAVELENGTH,
            power,
        })
    }
}

impl Default for Illuminant {
    fn default() -> Self {
        Illuminant::D65
    }
}

impl fmt::Display for Illuminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Illuminant::D65 => write!(f, "D65"),
            Illuminant::A => write!(f, "A"),
            Illuminant::Blackbody(kelvin) => write!(f, "{}K", kelvin),
        }
    }
}

impl FromStr for Illuminant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "D65" => Ok(Illuminant::D65),
            "D50" => Ok(Illuminant::Blackbody(5000)),
            "D75" => Ok(Illuminant::Blackbody(7500)),
            "D93" => Ok(Illuminant::Blackbody(9300)),
            "A" => Ok(Illuminant::A),
            _ => s.trim().parse::<i64>().map(Illuminant::from_kelvin).map_err(|_| {
                RenderError::Configuration(format!(
                    "unknown illuminant '{}': expected D65, D50, D75, D93, A or Kelvin",
                    s
                ))
                .into()
            }),
        }
    }
}

/// CIE illuminant A from its defining formula, normalized to 100 at 560 nm.
fn illuminant_a(wavelength: f64) -> f64 {
    const C2: f64 = 1.435e7;
    const T: f64 = 2848.0;
    100.0 * (560.0 / wavelength).powi(5) * ((C2 / (T * 560.0)).exp() - 1.0)
        / ((C2 / (T * wavelength)).exp() - 1.0)
}

/// Relative spectral power of an illuminant on a 1 nm grid. Built once per render and shared
/// read-only by every pixel.
#[derive(Debug, Clone)]
pub struct IlluminantSpectrum {
    first: u32,
    power: Vec<f64>,
}

impl IlluminantSpectrum {
    pub fn at(&self, wavelength: u32) -> Option<f64> {
        self.index_of(wavelength).map(|i| self.power[i])
    }
}

impl WavelengthTable for IlluminantSpectrum {
    fn first_wavelength(&self) -> u32 {
        self.first
    }

    fn len(&self) -> usize {
        self.power.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::classify;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_named_illuminants() {
        assert_eq!("D65".parse::<Illuminant>().unwrap(), Illuminant::D65);
        assert_eq!(
            "D50".parse::<Illuminant>().unwrap(),
            Illuminant::Blackbody(5000)
        );
        assert_eq!(
            "D93".parse::<Illuminant>().unwrap(),
            Illuminant::Blackbody(9300)
        );
        assert_eq!("A".parse::<Illuminant>().unwrap(), Illuminant::A);
        assert_eq!(
            "3200".parse::<Illuminant>().unwrap(),
            Illuminant::Blackbody(3200)
        );
        assert_eq!("6504".parse::<Illuminant>().unwrap(), Illuminant::D65);

        let err = "tungsten".parse::<Illuminant>().unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(RenderError::Configuration(_))
        ));
    }

    #[test]
    fn test_spectrum_covers_300_to_830() {
        for illuminant in &[Illuminant::D65, Illuminant::A, Illuminant::Blackbody(4000)] {
            let spectrum = illuminant.spectrum().unwrap();
            assert_eq!(spectrum.first_wavelength(), 300);
            assert_eq!(spectrum.last_wavelength(), Some(830));
            assert_eq!(spectrum.len(), 531);
        }
    }

    #[test]
    fn test_tabulated_values() {
        let d65 = Illuminant::D65.spectrum().unwrap();
        assert_relative_eq!(d65.at(560).unwrap(), 100.0);
        assert_relative_eq!(d65.at(300).unwrap(), 0.0341);
        assert_relative_eq!(d65.at(830).unwrap(), 60.3125);
        // halfway between 555 (102.023) and 560 (100.0) is interpolated
        let at_557 = d65.at(557).unwrap();
        assert!(at_557 < 102.023 && at_557 > 100.0);

        let a = Illuminant::A.spectrum().unwrap();
        assert_relative_eq!(a.at(560).unwrap(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(a.at(300).unwrap(), 0.930483, epsilon = 1e-4);
    }

    #[test]
    fn test_planck_power_5000k() {
        let spectrum = Illuminant::Blackbody(5000).spectrum().unwrap();
        let p = |nm| spectrum.at(nm).unwrap();
        assert!(p(500) < p(550));
        assert!(p(700) > p(800));
        assert_relative_eq!(p(550), blackbody(5000.0, 550.0));
    }

    #[test]
    fn test_non_positive_temperature_rejected() {
        for kelvin in &[0, -1, -5000] {
            let err = Illuminant::Blackbody(*kelvin).spectrum().unwrap_err();
            assert!(matches!(
                classify(&err),
                Some(RenderError::Configuration(_))
            ));
        }
    }
}
