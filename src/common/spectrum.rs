/// CIE XYZ tristimulus values. After integration these are scaled so that a perfect reflector
/// under the render illuminant has Y = 100.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct Tristimulus(pub na::Vector3<f64>);

impl Tristimulus {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(na::Vector3::new(x, y, z))
    }

    pub fn zero() -> Self {
        Self(na::Vector3::zeros())
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }
    pub fn y(&self) -> f64 {
        self.0[1]
    }
    pub fn z(&self) -> f64 {
        self.0[2]
    }
}

/// One output color before quantization.
#[derive(Clone, Debug, Copy, PartialEq)]
pub enum ColorSample {
    /// L* in [0, 100], a* and b* roughly in [-128, 127].
    Lab(na::Vector3<f64>),
    /// Gamma-encoded R, G, B, each in [0, 1].
    Rgb(na::Vector3<f64>),
}

impl ColorSample {
    pub fn lab(l: f64, a: f64, b: f64) -> Self {
        ColorSample::Lab(na::Vector3::new(l, a, b))
    }

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        ColorSample::Rgb(na::Vector3::new(r, g, b))
    }

    pub fn channels(&self) -> &na::Vector3<f64> {
        match self {
            ColorSample::Lab(c) | ColorSample::Rgb(c) => c,
        }
    }

    pub fn is_in_range(&self) -> bool {
        match self {
            ColorSample::Lab(c) => (0.0..=100.0).contains(&c[0]),
            ColorSample::Rgb(c) => c.iter().all(|v| (0.0..=1.0).contains(v)),
        }
    }
}
