use super::illuminant::Illuminant;
use crate::common::{
    math::{adobe_gamma_correct, gamma_correct},
    spectrum::{ColorSample, Tristimulus},
    RenderError,
};
use std::{fmt, str::FromStr};

/// CIE L*a*b* threshold between the cube-root and the linear segment of f(t).
const LAB_EPSILON: f64 = 0.008856;
const LAB_KAPPA: f64 = 7.787;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColorSpace {
    CieLab,
    Srgb,
    AdobeRgb,
}

impl ColorSpace {
    pub fn is_rgb(&self) -> bool {
        !matches!(self, ColorSpace::CieLab)
    }
}

impl Default for ColorSpace {
    fn default() -> Self {
        ColorSpace::Srgb
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpace::CieLab => write!(f, "CIE L*a*b*"),
            ColorSpace::Srgb => write!(f, "sRGB"),
            ColorSpace::AdobeRgb => write!(f, "AdobeRGB"),
        }
    }
}

impl FromStr for ColorSpace {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cielab" | "lab" => Ok(ColorSpace::CieLab),
            "srgb" => Ok(ColorSpace::Srgb),
            "adobergb" => Ok(ColorSpace::AdobeRgb),
            _ => Err(RenderError::Configuration(format!(
                "unknown color space '{}': expected CIELAB, sRGB or AdobeRGB",
                s
            ))
            .into()),
        }
    }
}

/// White point the RGB primaries are adapted to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReferenceWhite {
    D50,
    D65,
}

impl ReferenceWhite {
    /// D50 for a 5000 K render, D65 for everything else.
    pub fn for_illuminant(illuminant: &Illuminant) -> Self {
        if illuminant.temperature() == 5000 {
            ReferenceWhite::D50
        } else {
            ReferenceWhite::D65
        }
    }

    /// Tristimulus values of the white point for the 2° observer, Y = 100.
    pub fn xyz(&self) -> Tristimulus {
        match self {
            ReferenceWhite::D50 => Tristimulus::new(96.422, 100.0, 82.521),
            ReferenceWhite::D65 => Tristimulus::new(95.047, 100.0, 108.88),
        }
    }
}

/// XYZ to linear RGB for the given primaries and white, `None` for CIE L*a*b*.
pub fn xyz_to_rgb_matrix(space: ColorSpace, white: ReferenceWhite) -> Option<na::Matrix3<f64>> {
    #[rustfmt::skip]
    let matrix = match (space, white) {
        (ColorSpace::CieLab, _) => return None,
        (ColorSpace::Srgb, ReferenceWhite::D65) => na::Matrix3::new(
             3.240479, -1.537150, -0.498535,
            -0.969256,  1.875992,  0.041556,
             0.055648, -0.204043,  1.057311,
        ),
        (ColorSpace::Srgb, ReferenceWhite::D50) => na::Matrix3::new(
             3.1338561, -1.6168667, -0.4906146,
            -0.9787684,  1.9161415,  0.0334540,
             0.0719453, -0.2289914,  1.4052427,
        ),
        (ColorSpace::AdobeRgb, ReferenceWhite::D65) => na::Matrix3::new(
             2.0413690, -0.5649464, -0.3446944,
            -0.9692660,  1.8760108,  0.0415560,
             0.0134474, -0.1183897,  1.0154096,
        ),
        (ColorSpace::AdobeRgb, ReferenceWhite::D50) => na::Matrix3::new(
             1.9624274, -0.6105343, -0.3413404,
            -0.9787684,  1.9161415,  0.0334540,
             0.0286869, -0.1406752,  1.3487655,
        ),
    };

    Some(matrix)
}

fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + 16.0 / 116.0
    }
}

/// CIE XYZ to L*a*b* relative to `white`. L* is clipped to [0, 100].
pub fn xyz_to_lab(xyz: &Tristimulus, white: &Tristimulus) -> ColorSample {
    let fx = lab_f(xyz.x() / white.x());
    let fy = lab_f(xyz.y() / white.y());
    let fz = lab_f(xyz.z() / white.z());

    let l = (116.0 * fy - 16.0).max(0.0).min(100.0);
    ColorSample::lab(l, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// CIE XYZ (0-100) to linear RGB, each channel clipped to [0, 1]. NaN channels become 0.
pub fn xyz_to_rgb(matrix: &na::Matrix3<f64>, xyz: &Tristimulus) -> na::Vector3<f64> {
    (matrix * (xyz.0 / 100.0)).map(|c| c.max(0.0).min(1.0))
}

/// Maps integrated tristimulus values into the output color space.
#[derive(Clone, Debug)]
pub struct ColorConverter {
    space: ColorSpace,
    white: ReferenceWhite,
    matrix: Option<na::Matrix3<f64>>,
}

impl ColorConverter {
    pub fn new(space: ColorSpace, illuminant: &Illuminant) -> Self {
        let white = ReferenceWhite::for_illuminant(illuminant);
        Self {
            space,
            white,
            matrix: xyz_to_rgb_matrix(space, white),
        }
    }

    pub fn space(&self) -> ColorSpace {
        self.space
    }

    /// White point of the RGB primaries. L*a*b* output is always relative to D65.
    pub fn white(&self) -> ReferenceWhite {
        self.white
    }

    pub fn convert(&self, xyz: &Tristimulus) -> ColorSample {
        match (self.space, &self.matrix) {
            (ColorSpace::Srgb, Some(matrix)) => {
                ColorSample::Rgb(xyz_to_rgb(matrix, xyz).map(gamma_correct))
            }
            (ColorSpace::AdobeRgb, Some(matrix)) => {
                ColorSample::Rgb(xyz_to_rgb(matrix, xyz).map(adobe_gamma_correct))
            }
            _ => xyz_to_lab(xyz, &ReferenceWhite::D65.xyz()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lab_of_d65_white() {
        let lab = xyz_to_lab(&ReferenceWhite::D65.xyz(), &ReferenceWhite::D65.xyz());
        let c = lab.channels();
        assert_relative_eq!(c[0], 100.0, epsilon = 1e-3);
        assert_relative_eq!(c[1], 0.0, epsilon = 1e-3);
        assert_relative_eq!(c[2], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_lab_black_and_clipping() {
        let black = xyz_to_lab(&Tristimulus::zero(), &ReferenceWhite::D65.xyz());
        assert_relative_eq!(black.channels()[0], 0.0, epsilon = 1e-9);

        let too_bright = xyz_to_lab(
            &Tristimulus::new(190.0, 200.0, 217.0),
            &ReferenceWhite::D65.xyz(),
        );
        assert_eq!(too_bright.channels()[0], 100.0);
        assert!(too_bright.is_in_range());
    }

    #[test]
    fn test_srgb_of_d65_white_is_white() {
        let converter = ColorConverter::new(ColorSpace::Srgb, &Illuminant::D65);
        let rgb = converter.convert(&ReferenceWhite::D65.xyz());
        for c in rgb.channels().iter() {
            assert_relative_eq!(*c, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_d50_render_uses_d50_primaries() {
        let converter = ColorConverter::new(ColorSpace::AdobeRgb, &Illuminant::Blackbody(5000));
        assert_eq!(converter.white(), ReferenceWhite::D50);
        let rgb = converter.convert(&ReferenceWhite::D50.xyz());
        for c in rgb.channels().iter() {
            assert_relative_eq!(*c, 1.0, epsilon = 1e-3);
        }

        let daylight = ColorConverter::new(ColorSpace::Srgb, &Illuminant::Blackbody(5001));
        assert_eq!(daylight.white(), ReferenceWhite::D65);
        let tungsten = ColorConverter::new(ColorSpace::Srgb, &Illuminant::A);
        assert_eq!(tungsten.white(), ReferenceWhite::D65);
    }

    #[test]
    fn test_rgb_is_clipped() {
        let converter = ColorConverter::new(ColorSpace::Srgb, &Illuminant::D65);
        // saturated spectral green lies outside the sRGB gamut
        let rgb = converter.convert(&Tristimulus::new(2.0, 70.0, 5.0));
        assert!(rgb.is_in_range());
        assert_eq!(rgb.channels()[0], 0.0);

        let nan = converter.convert(&Tristimulus::new(f64::NAN, 50.0, 50.0));
        assert!(nan.is_in_range());
    }

    #[test]
    fn test_parse_color_space() {
        assert_eq!("CIELAB".parse::<ColorSpace>().unwrap(), ColorSpace::CieLab);
        assert_eq!("srgb".parse::<ColorSpace>().unwrap(), ColorSpace::Srgb);
        assert_eq!("AdobeRGB".parse::<ColorSpace>().unwrap(), ColorSpace::AdobeRgb);
        assert!("ProPhoto".parse::<ColorSpace>().is_err());
    }
}
