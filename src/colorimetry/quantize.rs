use crate::common::{spectrum::ColorSample, RenderError};

/// Storage of each output channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    Uint8,
    Uint16,
    Float32,
}

impl OutputFormat {
    pub fn from_bits(bits: u32) -> anyhow::Result<Self> {
        match bits {
            8 => Ok(OutputFormat::Uint8),
            16 => Ok(OutputFormat::Uint16),
            32 => Ok(OutputFormat::Float32),
            _ => anyhow::bail!(RenderError::Configuration(format!(
                "unsupported output bit depth {}: expected 8, 16 or 32",
                bits
            ))),
        }
    }

    pub fn bits(&self) -> u32 {
        self.bytes_per_sample() as u32 * 8
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            OutputFormat::Uint8 => 1,
            OutputFormat::Uint16 => 2,
            OutputFormat::Float32 => 4,
        }
    }

    /// Size of one packed scanline of `samples` pixels.
    pub fn row_bytes(&self, samples: usize) -> usize {
        samples * 3 * self.bytes_per_sample()
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Uint8
    }
}

fn quantize_u8(v: f64) -> u8 {
    v.round().max(0.0).min(u8::MAX as f64) as u8
}

fn quantize_i8(v: f64) -> i8 {
    v.round().max(i8::MIN as f64).min(i8::MAX as f64) as i8
}

fn quantize_u16(v: f64) -> u16 {
    v.round().max(0.0).min(u16::MAX as f64) as u16
}

fn quantize_i16(v: f64) -> i16 {
    v.round().max(i16::MIN as f64).min(i16::MAX as f64) as i16
}

/// Packs color samples into native-endian channel triples.
///
/// Integer channels are rounded to nearest and saturate at the limits of their type, so
/// out-of-gamut a*/b* never wrap around.
#[derive(Clone, Copy, Debug)]
pub struct Quantizer {
    format: OutputFormat,
}

impl Quantizer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn pixel_bytes(&self) -> usize {
        self.format.row_bytes(1)
    }

    /// Writes one pixel into `out`, which must be exactly `pixel_bytes()` long.
    pub fn pack(&self, sample: &ColorSample, out: &mut [u8]) {
        let c = sample.channels();

        match (self.format, sample) {
            (OutputFormat::Uint8, ColorSample::Rgb(_)) => {
                out.copy_from_slice(&[
                    quantize_u8(c[0] * 255.0),
                    quantize_u8(c[1] * 255.0),
                    quantize_u8(c[2] * 255.0),
                ]);
            }
            (OutputFormat::Uint8, ColorSample::Lab(_)) => {
                out.copy_from_slice(&[
                    quantize_u8(c[0] * 2.55),
                    quantize_i8(c[1]) as u8,
                    quantize_i8(c[2]) as u8,
                ]);
            }
            (OutputFormat::Uint16, ColorSample::Rgb(_)) => {
                let px = [
                    quantize_u16(c[0] * 65535.0),
                    quantize_u16(c[1] * 65535.0),
                    quantize_u16(c[2] * 65535.0),
                ];
                out.copy_from_slice(bytemuck::cast_slice(&px[..]));
            }
            (OutputFormat::Uint16, ColorSample::Lab(_)) => {
                let px = [
                    quantize_u16(c[0] * 655.35),
                    quantize_i16(c[1] * 255.0) as u16,
                    quantize_i16(c[2] * 255.0) as u16,
                ];
                out.copy_from_slice(bytemuck::cast_slice(&px[..]));
            }
            (OutputFormat::Float32, _) => {
                let px = [c[0] as f32, c[1] as f32, c[2] as f32];
                out.copy_from_slice(bytemuck::cast_slice(&px[..]));
            }
        }
    }
}
