//! Hyperspectral cube sources. A cube is read one scanline at a time in band-interleaved-by-line
//! order: all samples of band 0, then all samples of band 1, and so on.

pub mod hyspex;

pub use hyspex::{HyspexCube, ManualGeometry};

use crate::common::RenderError;
use itertools::Itertools;
use std::path::Path;

/// Checks that band centers are finite and strictly increasing.
pub fn validate_wavelengths(wavelengths: &[f64]) -> anyhow::Result<()> {
    if let Some(bad) = wavelengths.iter().find(|w| !w.is_finite()) {
        anyhow::bail!(RenderError::SourceFormat(format!(
            "invalid band wavelength {}",
            bad
        )));
    }

    if let Some((a, b)) = wavelengths.iter().tuple_windows().find(|(a, b)| a >= b) {
        anyhow::bail!(RenderError::SourceFormat(format!(
            "band wavelengths not strictly increasing: {} followed by {}",
            a, b
        )));
    }

    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct CubeMetadata {
    pub sample_count: usize,
    pub scanline_count: usize,
    pub band_count: usize,
    pub bits_per_band_sample: u32,
    /// Center wavelength of every band in nm, strictly increasing.
    pub wavelengths: Vec<f64>,
}

impl CubeMetadata {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.band_count == 0 || self.sample_count == 0 || self.scanline_count == 0 {
            anyhow::bail!(RenderError::SourceFormat(format!(
                "empty cube: {}x{} pixels, {} bands",
                self.sample_count, self.scanline_count, self.band_count
            )));
        }

        if self.wavelengths.len() != self.band_count {
            anyhow::bail!(RenderError::SourceFormat(format!(
                "{} bands but {} wavelengths",
                self.band_count,
                self.wavelengths.len()
            )));
        }

        if !(1..=16).contains(&self.bits_per_band_sample) {
            anyhow::bail!(RenderError::SourceFormat(format!(
                "unsupported sample depth of {} bits",
                self.bits_per_band_sample
            )));
        }

        validate_wavelengths(&self.wavelengths)
    }

    /// Raw value of a fully saturated sample.
    pub fn full_scale(&self) -> f64 {
        ((1u32 << self.bits_per_band_sample) - 1) as f64
    }

    /// Raw samples in one scanline.
    pub fn scanline_len(&self) -> usize {
        self.sample_count * self.band_count
    }
}

/// Raw samples of one scanline, band-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanlineRaw {
    sample_count: usize,
    band_count: usize,
    data: Vec<u16>,
}

impl ScanlineRaw {
    pub fn new(sample_count: usize, band_count: usize, data: Vec<u16>) -> anyhow::Result<Self> {
        if data.len() != sample_count * band_count {
            anyhow::bail!(RenderError::SourceFormat(format!(
                "scanline holds {} samples, expected {} pixels x {} bands",
                data.len(),
                sample_count,
                band_count
            )));
        }

        Ok(Self {
            sample_count,
            band_count,
            data,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn band(&self, band: usize) -> &[u16] {
        &self.data[band * self.sample_count..(band + 1) * self.sample_count]
    }

    /// Collects the normalized intensities of `pixel` across all bands into `out`. Raw values
    /// above `full_scale` saturate at 1.
    pub fn pixel_into(&self, pixel: usize, full_scale: f64, out: &mut Vec<f64>) {
        out.clear();
        out.extend((0..self.band_count).map(|k| {
            let raw = self.data[pixel + self.sample_count * k] as f64;
            (raw / full_scale).min(1.0)
        }));
    }
}

/// Yields the scanlines of a cube in increasing row order.
pub trait CubeSource {
    fn metadata(&self) -> &CubeMetadata;

    /// Reads the next scanline, `None` once every scanline has been read.
    fn next_scanline(&mut self) -> anyhow::Result<Option<ScanlineRaw>>;
}

/// A cube held entirely in memory, scanline after scanline.
#[derive(Clone, Debug)]
pub struct MemoryCube {
    metadata: CubeMetadata,
    data: Vec<u16>,
    next_row: usize,
}

impl MemoryCube {
    pub fn new(metadata: CubeMetadata, data: Vec<u16>) -> anyhow::Result<Self> {
        metadata.validate()?;

        let expected = metadata.scanline_len() * metadata.scanline_count;
        if data.len() != expected {
            anyhow::bail!(RenderError::SourceFormat(format!(
                "cube holds {} samples, expected {}",
                data.len(),
                expected
            )));
        }

        Ok(Self {
            metadata,
            data,
            next_row: 0,
        })
    }

    /// Starts reading from the first scanline again.
    pub fn rewind(&mut self) {
        self.next_row = 0;
    }
}

impl CubeSource for MemoryCube {
    fn metadata(&self) -> &CubeMetadata {
        &self.metadata
    }

    fn next_scanline(&mut self) -> anyhow::Result<Option<ScanlineRaw>> {
        if self.next_row >= self.metadata.scanline_count {
            return Ok(None);
        }

        let len = self.metadata.scanline_len();
        let start = self.next_row * len;
        self.next_row += 1;

        ScanlineRaw::new(
            self.metadata.sample_count,
            self.metadata.band_count,
            self.data[start..start + len].to_vec(),
        )
        .map(Some)
    }
}

/// Opens a cube file. Files without a HySpex header need a complete `geometry`.
pub fn open(
    log: &slog::Logger,
    path: &Path,
    geometry: ManualGeometry,
) -> anyhow::Result<Box<dyn CubeSource>> {
    Ok(Box::new(HyspexCube::open(log, path, geometry)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::classify;

    fn metadata(wavelengths: Vec<f64>) -> CubeMetadata {
        CubeMetadata {
            sample_count: 2,
            scanline_count: 2,
            band_count: wavelengths.len(),
            bits_per_band_sample: 16,
            wavelengths,
        }
    }

    fn is_source_format(result: anyhow::Result<()>) -> bool {
        matches!(
            result.as_ref().map_err(classify),
            Err(Some(RenderError::SourceFormat(_)))
        )
    }

    #[test]
    fn test_validate() {
        assert!(metadata(vec![450.0, 550.0]).validate().is_ok());
        assert!(is_source_format(metadata(vec![550.0, 450.0]).validate()));
        assert!(is_source_format(metadata(vec![450.0, 450.0]).validate()));
        assert!(is_source_format(metadata(vec![]).validate()));

        let mut mismatched = metadata(vec![450.0, 550.0]);
        mismatched.band_count = 3;
        assert!(is_source_format(mismatched.validate()));

        let mut empty = metadata(vec![450.0, 550.0]);
        empty.scanline_count = 0;
        assert!(is_source_format(empty.validate()));
    }

    #[test]
    fn test_pixel_is_gathered_across_bands() {
        // two pixels, three bands, band-major
        let scanline = ScanlineRaw::new(2, 3, vec![0, 65535, 100, 200, 300, 400]).unwrap();
        assert_eq!(scanline.band(1), &[100, 200]);

        let mut pixel = Vec::new();
        scanline.pixel_into(1, 65535.0, &mut pixel);
        assert_eq!(pixel, vec![1.0, 200.0 / 65535.0, 400.0 / 65535.0]);

        assert!(ScanlineRaw::new(2, 3, vec![0; 5]).is_err());
    }

    #[test]
    fn test_memory_cube_yields_rows_in_order() {
        let mut cube = MemoryCube::new(metadata(vec![450.0, 550.0]), (0..8).collect()).unwrap();

        let first = cube.next_scanline().unwrap().unwrap();
        assert_eq!(first.band(0), &[0, 1]);
        let second = cube.next_scanline().unwrap().unwrap();
        assert_eq!(second.band(1), &[6, 7]);
        assert!(cube.next_scanline().unwrap().is_none());

        cube.rewind();
        assert_eq!(cube.next_scanline().unwrap(), Some(first));
    }

    #[test]
    fn test_samples_above_bit_depth_saturate() {
        let mut m = metadata(vec![450.0, 550.0]);
        m.bits_per_band_sample = 12;
        let mut cube = MemoryCube::new(m.clone(), vec![65535, 4095, 2048, 0, 0, 0, 0, 0]).unwrap();

        let scanline = cube.next_scanline().unwrap().unwrap();
        let mut pixel = Vec::new();
        scanline.pixel_into(0, m.full_scale(), &mut pixel);
        assert_eq!(pixel, vec![1.0, 2048.0 / 4095.0]);
        scanline.pixel_into(1, m.full_scale(), &mut pixel);
        assert_eq!(pixel, vec![1.0, 0.0]);
    }

    #[test]
    fn test_validate_wavelengths() {
        assert!(validate_wavelengths(&[400.0, 500.0, 600.0]).is_ok());
        assert!(is_source_format(validate_wavelengths(&[600.0, 500.0, 400.0])));
        assert!(is_source_format(validate_wavelengths(&[500.0, 500.0, 600.0])));
        assert!(is_source_format(validate_wavelengths(&[500.0, f64::NAN, 600.0])));
    }

    #[test]
    fn test_full_scale() {
        let mut m = metadata(vec![500.0]);
        assert_eq!(m.full_scale(), 65535.0);
        m.bits_per_band_sample = 12;
        assert_eq!(m.full_scale(), 4095.0);
    }
}
