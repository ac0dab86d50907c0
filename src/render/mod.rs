pub mod film;
pub mod sink;

pub use film::Film;
pub use sink::{MemorySink, RawSink, ScanlineSink};

use crate::colorimetry::{
    resample::ResampledSpectrum, ColorConverter, ColorSpace, Illuminant, IlluminantSpectrum,
    IntegrationStep, Interpolation, OutputFormat, PixelSpectrum, Quantizer, SpectralResampler,
    SplineScratch, TristimulusIntegrator, CIE_1931,
};
use crate::common::{spectrum::ColorSample, RenderError};
use crate::cube::{validate_wavelengths, CubeMetadata, CubeSource, ScanlineRaw};
use indicatif::ProgressBar;
#[cfg(not(feature = "disable_rayon"))]
use rayon::prelude::*;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

/// Rendered rows allowed to wait for the writer before the render loop blocks.
const ROW_QUEUE_DEPTH: usize = 4;

#[derive(Clone, Debug, Default)]
pub struct RenderOptions {
    pub illuminant: Illuminant,
    pub color_space: ColorSpace,
    pub format: OutputFormat,
    pub interpolation: Interpolation,
    pub step: IntegrationStep,
    /// Draw a progress bar on the terminal.
    pub progress: bool,
}

/// Per-worker buffers reused from pixel to pixel.
#[derive(Clone, Debug, Default)]
pub struct PixelScratch {
    intensities: Vec<f64>,
    spline: SplineScratch,
    resampled: ResampledSpectrum,
}

/// The per-pixel pipeline for one band layout: resample, integrate, convert.
pub struct PixelPipeline<'a> {
    wavelengths: &'a [f64],
    resampler: SpectralResampler,
    integrator: TristimulusIntegrator<'a>,
    converter: &'a ColorConverter,
    quantizer: Quantizer,
}

impl<'a> PixelPipeline<'a> {
    pub fn integrator(&self) -> &TristimulusIntegrator<'a> {
        &self.integrator
    }

    /// Color of one pixel given its normalized band intensities.
    pub fn render_pixel(&self, intensities: &[f64], scratch: &mut PixelScratch) -> ColorSample {
        let spectrum = PixelSpectrum::new(self.wavelengths, intensities);
        self.resampler
            .resample(&spectrum, &mut scratch.spline, &mut scratch.resampled);
        let xyz = self.integrator.integrate(&scratch.resampled);
        self.converter.convert(&xyz)
    }

    fn pack_pixel(
        &self,
        scanline: &ScanlineRaw,
        pixel: usize,
        full_scale: f64,
        scratch: &mut PixelScratch,
        out: &mut [u8],
    ) {
        let mut intensities = std::mem::take(&mut scratch.intensities);
        scanline.pixel_into(pixel, full_scale, &mut intensities);
        let color = self.render_pixel(&intensities, scratch);
        scratch.intensities = intensities;
        self.quantizer.pack(&color, out);
    }

    /// Renders and packs a whole scanline into `out`. Pixels still pending when `stop` is
    /// raised are left untouched.
    pub fn render_scanline(
        &self,
        scanline: &ScanlineRaw,
        full_scale: f64,
        out: &mut [u8],
        stop: &AtomicBool,
    ) {
        let pixel_bytes = self.quantizer.pixel_bytes();

        #[cfg(not(feature = "disable_rayon"))]
        out.par_chunks_mut(pixel_bytes)
            .enumerate()
            .for_each_init(PixelScratch::default, |scratch, (i, px)| {
                if !stop.load(Ordering::Relaxed) {
                    self.pack_pixel(scanline, i, full_scale, scratch, px);
                }
            });

        #[cfg(feature = "disable_rayon")]
        {
            let mut scratch = PixelScratch::default();
            for (i, px) in out.chunks_mut(pixel_bytes).enumerate() {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                self.pack_pixel(scanline, i, full_scale, &mut scratch, px);
            }
        }
    }
}

pub struct Renderer {
    log: slog::Logger,
    options: RenderOptions,
    illuminant: IlluminantSpectrum,
    converter: ColorConverter,
}

impl Renderer {
    pub fn new(log: &slog::Logger, options: RenderOptions) -> anyhow::Result<Self> {
        let log = log.new(o!("module" => "renderer"));
        let illuminant = options.illuminant.spectrum()?;
        let converter = ColorConverter::new(options.color_space, &options.illuminant);

        debug!(
            log,
            "{} output under {} ({}K), {:?} reference white, {}-bit samples",
            options.color_space,
            options.illuminant,
            options.illuminant.temperature(),
            converter.white(),
            options.format.bits()
        );

        Ok(Self {
            log,
            options,
            illuminant,
            converter,
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Builds the pixel pipeline for a cube whose bands sit at `wavelengths`.
    pub fn pipeline<'a>(&'a self, wavelengths: &'a [f64]) -> anyhow::Result<PixelPipeline<'a>> {
        validate_wavelengths(wavelengths)?;
        let resampler = SpectralResampler::new(wavelengths, self.options.interpolation)?;
        let integrator = TristimulusIntegrator::new(
            &CIE_1931,
            &self.illuminant,
            resampler.grid(),
            self.options.step,
        )?;

        Ok(PixelPipeline {
            wavelengths,
            resampler,
            integrator,
            converter: &self.converter,
            quantizer: Quantizer::new(self.options.format),
        })
    }

    /// Color of a single pixel, for inspecting one spectrum outside a full render.
    pub fn render_pixel(
        &self,
        wavelengths: &[f64],
        intensities: &[f64],
    ) -> anyhow::Result<ColorSample> {
        if wavelengths.len() != intensities.len() {
            anyhow::bail!(RenderError::SourceFormat(format!(
                "{} intensities for {} bands",
                intensities.len(),
                wavelengths.len()
            )));
        }

        let pipeline = self.pipeline(wavelengths)?;
        let color = pipeline.render_pixel(intensities, &mut PixelScratch::default());
        trace!(self.log, "pixel {:?} -> {:?}", intensities, color);

        Ok(color)
    }

    /// Renders every scanline of `cube` into `sink`.
    ///
    /// Rows are computed in parallel one at a time and handed to a writer thread, so the sink
    /// sees row j only after all of its pixels are done and always before row j + 1. The first
    /// sink failure stops the render and is returned.
    pub fn render(
        &self,
        cube: &mut dyn CubeSource,
        sink: &mut dyn ScanlineSink,
    ) -> anyhow::Result<()> {
        let metadata = cube.metadata().clone();
        metadata.validate()?;
        let pipeline = self.pipeline(&metadata.wavelengths)?;

        let range = pipeline.integrator().range();
        info!(
            self.log,
            "rendering {}x{} pixels from {} bands",
            metadata.sample_count,
            metadata.scanline_count,
            metadata.band_count
        );
        debug!(
            self.log,
            "integrating {}-{}nm, normalization {}",
            range.first,
            range.last,
            pipeline.integrator().normalization()
        );

        let start = Instant::now();
        let progress = if self.options.progress {
            ProgressBar::new(metadata.scanline_count as u64)
        } else {
            ProgressBar::hidden()
        };

        let stop = AtomicBool::new(false);
        let (sender, receiver) = crossbeam::channel::bounded::<(usize, Vec<u8>)>(ROW_QUEUE_DEPTH);

        let scoped = crossbeam::scope(|s| {
            let stop = &stop;
            let sink = &mut *sink;
            let writer = s.spawn(move |_| -> anyhow::Result<()> {
                for (row, buffer) in receiver.iter() {
                    if let Err(e) = sink.write_scanline(row, &buffer) {
                        stop.store(true, Ordering::Relaxed);
                        return Err(e);
                    }
                }
                Ok(())
            });

            let rendered = self.render_rows(cube, &metadata, &pipeline, &sender, &progress, stop);
            drop(sender);

            let written = writer.join().unwrap_or_else(|_| {
                Err(RenderError::Io(String::from("scanline writer panicked")).into())
            });
            rendered.and(written)
        });

        let result = scoped.unwrap_or_else(|_| {
            Err(RenderError::Io(String::from("render thread panicked")).into())
        });
        progress.finish_and_clear();
        result?;

        sink.finish()?;
        info!(self.log, "rendering took: {:?}", start.elapsed());

        Ok(())
    }

    fn render_rows(
        &self,
        cube: &mut dyn CubeSource,
        metadata: &CubeMetadata,
        pipeline: &PixelPipeline,
        sender: &crossbeam::channel::Sender<(usize, Vec<u8>)>,
        progress: &ProgressBar,
        stop: &AtomicBool,
    ) -> anyhow::Result<()> {
        let full_scale = metadata.full_scale();
        let row_bytes = self.options.format.row_bytes(metadata.sample_count);

        for row in 0..metadata.scanline_count {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            let scanline = cube.next_scanline()?.ok_or_else(|| {
                RenderError::Io(format!(
                    "cube ended after {} of {} scanlines",
                    row, metadata.scanline_count
                ))
            })?;
            if scanline.sample_count() != metadata.sample_count
                || scanline.band_count() != metadata.band_count
            {
                anyhow::bail!(RenderError::SourceFormat(format!(
                    "scanline {} is {}x{} samples, expected {}x{}",
                    row,
                    scanline.sample_count(),
                    scanline.band_count(),
                    metadata.sample_count,
                    metadata.band_count
                )));
            }

            let mut buffer = vec![0u8; row_bytes];
            pipeline.render_scanline(&scanline, full_scale, &mut buffer, stop);

            // the writer only hangs up after a failure, which it reports itself
            if sender.send((row, buffer)).is_err() {
                break;
            }
            progress.inc(1);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::classify;
    use crate::cube::MemoryCube;
    use approx::assert_relative_eq;

    fn log() -> slog::Logger {
        slog::Logger::root(slog::Discard, o!())
    }

    fn two_band_cube(samples: usize, scanlines: usize, value: u16) -> MemoryCube {
        let metadata = CubeMetadata {
            sample_count: samples,
            scanline_count: scanlines,
            band_count: 2,
            bits_per_band_sample: 16,
            wavelengths: vec![500.0, 600.0],
        };
        MemoryCube::new(metadata, vec![value; samples * scanlines * 2]).unwrap()
    }

    fn render(options: RenderOptions, cube: &mut MemoryCube) -> anyhow::Result<Vec<u8>> {
        let renderer = Renderer::new(&log(), options)?;
        let row_bytes = renderer
            .options()
            .format
            .row_bytes(cube.metadata().sample_count);
        let mut sink = MemorySink::new(row_bytes);
        renderer.render(cube, &mut sink)?;
        Ok(sink.data().to_vec())
    }

    #[test]
    fn test_two_band_pixel_regression() {
        let renderer = Renderer::new(&log(), RenderOptions::default()).unwrap();
        let color = renderer.render_pixel(&[500.0, 600.0], &[0.5, 0.5]).unwrap();
        let c = color.channels();
        assert_relative_eq!(c[0], 0.778748, epsilon = 1e-5);
        assert_relative_eq!(c[1], 0.758203, epsilon = 1e-5);
        assert_relative_eq!(c[2], 0.0);

        let lab = Renderer::new(
            &log(),
            RenderOptions {
                color_space: ColorSpace::CieLab,
                ..Default::default()
            },
        )
        .unwrap()
        .render_pixel(&[500.0, 600.0], &[0.5, 0.5])
        .unwrap();
        assert_relative_eq!(lab.channels()[0], 76.0693, epsilon = 1e-3);
        assert_relative_eq!(lab.channels()[1], -17.0886, epsilon = 1e-3);
        assert_relative_eq!(lab.channels()[2], 101.8589, epsilon = 1e-3);
    }

    #[test]
    fn test_unordered_band_table_is_source_format_error() {
        let renderer = Renderer::new(&log(), RenderOptions::default()).unwrap();
        for wavelengths in [
            [600.0, 500.0, 400.0],
            [500.0, 500.0, 600.0],
            [500.0, f64::NAN, 600.0],
        ] {
            let err = renderer
                .render_pixel(&wavelengths, &[0.5, 0.2, 0.9])
                .unwrap_err();
            assert!(matches!(classify(&err), Some(RenderError::SourceFormat(_))));
        }
    }

    #[test]
    fn test_two_band_cube_renders_pinned_triple() {
        let out = render(RenderOptions::default(), &mut two_band_cube(1, 1, 32768)).unwrap();
        assert_eq!(out, vec![199, 193, 0]);
    }

    #[test]
    fn test_render_is_idempotent() {
        let options = RenderOptions {
            illuminant: Illuminant::Blackbody(5000),
            color_space: ColorSpace::AdobeRgb,
            format: OutputFormat::Uint16,
            ..Default::default()
        };

        let metadata = CubeMetadata {
            sample_count: 17,
            scanline_count: 5,
            band_count: 4,
            bits_per_band_sample: 16,
            wavelengths: vec![420.0, 520.0, 620.0, 720.0],
        };
        let data = (0..17 * 5 * 4)
            .map(|i| ((i * 7919) % 65536) as u16)
            .collect::<Vec<_>>();
        let mut cube = MemoryCube::new(metadata, data).unwrap();

        let first = render(options.clone(), &mut cube).unwrap();
        cube.rewind();
        let second = render(options, &mut cube).unwrap();

        assert_eq!(first.len(), 17 * 5 * 3 * 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rows_arrive_in_order() {
        // each row gets a distinct gray level, so a swapped row would show up in the output
        let metadata = CubeMetadata {
            sample_count: 3,
            scanline_count: 6,
            band_count: 3,
            bits_per_band_sample: 16,
            wavelengths: vec![400.0, 550.0, 700.0],
        };
        let data = (0..6u16)
            .flat_map(|row| std::iter::repeat(row * 10000).take(9))
            .collect::<Vec<_>>();
        let mut cube = MemoryCube::new(metadata, data).unwrap();

        let out = render(RenderOptions::default(), &mut cube).unwrap();
        let greens = out.chunks(9).map(|row| row[1]).collect::<Vec<_>>();
        assert!(greens.windows(2).all(|pair| pair[0] < pair[1]));
    }

    struct FailingSink {
        fail_at: usize,
        written: usize,
        finished: bool,
    }

    impl ScanlineSink for FailingSink {
        fn write_scanline(&mut self, row: usize, _buffer: &[u8]) -> anyhow::Result<()> {
            if row == self.fail_at {
                anyhow::bail!(RenderError::Io(String::from("disk full")));
            }
            self.written += 1;
            Ok(())
        }

        fn finish(&mut self) -> anyhow::Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_aborts_render() {
        let renderer = Renderer::new(&log(), RenderOptions::default()).unwrap();
        let mut sink = FailingSink {
            fail_at: 2,
            written: 0,
            finished: false,
        };

        let err = renderer
            .render(&mut two_band_cube(4, 50, 1000), &mut sink)
            .unwrap_err();
        assert!(matches!(classify(&err), Some(RenderError::Io(_))));
        assert_eq!(sink.written, 2);
        assert!(!sink.finished);
    }

    #[test]
    fn test_truncated_cube_is_io_error() {
        struct ShortCube(MemoryCube);

        impl CubeSource for ShortCube {
            fn metadata(&self) -> &CubeMetadata {
                self.0.metadata()
            }

            fn next_scanline(&mut self) -> anyhow::Result<Option<ScanlineRaw>> {
                let _ = self.0.next_scanline()?;
                Ok(None)
            }
        }

        let renderer = Renderer::new(&log(), RenderOptions::default()).unwrap();
        let mut sink = MemorySink::new(3);
        let err = renderer
            .render(&mut ShortCube(two_band_cube(1, 2, 0)), &mut sink)
            .unwrap_err();
        assert!(matches!(classify(&err), Some(RenderError::Io(_))));
    }

    #[test]
    fn test_non_positive_temperature_is_configuration_error() {
        let err = Renderer::new(
            &log(),
            RenderOptions {
                illuminant: Illuminant::Blackbody(0),
                ..Default::default()
            },
        )
        .err()
        .unwrap();
        assert!(matches!(classify(&err), Some(RenderError::Configuration(_))));
    }
}
