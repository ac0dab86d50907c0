use super::sink::{RowOrder, ScanlineSink};
use crate::colorimetry::{ColorSpace, OutputFormat};
use crate::common::RenderError;
use anyhow::Context;
use image::{ImageBuffer, Rgb};
use std::path::{Path, PathBuf};

/// Containers the image encoder can write for an output format.
fn supported_extensions(format: OutputFormat) -> &'static [&'static str] {
    match format {
        OutputFormat::Uint8 | OutputFormat::Uint16 => &["png", "tif", "tiff"],
        OutputFormat::Float32 => &["exr"],
    }
}

/// Accumulates the rendered scanlines and encodes them as an image once complete.
pub struct Film {
    log: slog::Logger,
    path: PathBuf,
    width: u32,
    height: u32,
    format: OutputFormat,
    order: RowOrder,
    pixels: Vec<u8>,
}

impl Film {
    pub fn new(
        log: &slog::Logger,
        path: &Path,
        resolution: (u32, u32),
        space: ColorSpace,
        format: OutputFormat,
    ) -> anyhow::Result<Self> {
        if !space.is_rgb() {
            anyhow::bail!(RenderError::Configuration(format!(
                "{} output cannot be stored in an image file, write raw samples instead",
                space
            )));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let supported = supported_extensions(format);
        if !supported.contains(&extension.as_str()) {
            anyhow::bail!(RenderError::Configuration(format!(
                "cannot store {}-bit samples in '{}', expected one of: {}",
                format.bits(),
                path.display(),
                supported.join(", ")
            )));
        }

        let (width, height) = resolution;
        let row_bytes = format.row_bytes(width as usize);

        Ok(Self {
            log: log.new(o!("module" => "film")),
            path: path.to_path_buf(),
            width,
            height,
            format,
            order: RowOrder::new(row_bytes),
            pixels: Vec::with_capacity(row_bytes * height as usize),
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if self.order.rows_written() != self.height as usize {
            anyhow::bail!(RenderError::Io(format!(
                "only {} of {} scanlines rendered",
                self.order.rows_written(),
                self.height
            )));
        }

        info!(self.log, "saving image to {:?}", path);
        let (w, h) = (self.width, self.height);
        let saved = match self.format {
            OutputFormat::Uint8 => {
                ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, self.pixels.clone()).map(|i| i.save(path))
            }
            OutputFormat::Uint16 => ImageBuffer::<Rgb<u16>, _>::from_raw(
                w,
                h,
                bytemuck::allocation::pod_collect_to_vec::<u8, u16>(&self.pixels),
            )
            .map(|i| i.save(path)),
            OutputFormat::Float32 => ImageBuffer::<Rgb<f32>, _>::from_raw(
                w,
                h,
                bytemuck::allocation::pod_collect_to_vec::<u8, f32>(&self.pixels),
            )
            .map(|i| i.save(path)),
        };

        saved
            .ok_or_else(|| {
                RenderError::Io(format!("pixel buffer does not match {}x{} image", w, h))
            })?
            .with_context(|| RenderError::Io(format!("could not save {}", path.display())))
    }
}

impl ScanlineSink for Film {
    fn write_scanline(&mut self, row: usize, buffer: &[u8]) -> anyhow::Result<()> {
        self.order.check(row, buffer)?;
        self.pixels.extend_from_slice(buffer);
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.save(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::classify;

    fn log() -> slog::Logger {
        slog::Logger::root(slog::Discard, o!())
    }

    fn film(name: &str, space: ColorSpace, format: OutputFormat) -> anyhow::Result<Film> {
        Film::new(&log(), Path::new(name), (2, 1), space, format)
    }

    #[test]
    fn test_container_combinations() {
        assert!(film("out.png", ColorSpace::Srgb, OutputFormat::Uint8).is_ok());
        assert!(film("out.TIF", ColorSpace::AdobeRgb, OutputFormat::Uint16).is_ok());
        assert!(film("out.exr", ColorSpace::Srgb, OutputFormat::Float32).is_ok());

        for (name, space, format) in [
            ("out.png", ColorSpace::CieLab, OutputFormat::Uint8),
            ("out.png", ColorSpace::Srgb, OutputFormat::Float32),
            ("out.exr", ColorSpace::Srgb, OutputFormat::Uint8),
            ("out", ColorSpace::Srgb, OutputFormat::Uint8),
        ] {
            let err = film(name, space, format).err().unwrap();
            assert!(matches!(classify(&err), Some(RenderError::Configuration(_))));
        }
    }

    #[test]
    fn test_save_png() {
        let path =
            std::env::temp_dir().join(format!("hyper2color-film-{}.png", std::process::id()));
        let mut film = Film::new(
            &log(),
            &path,
            (2, 1),
            ColorSpace::Srgb,
            OutputFormat::Uint16,
        )
        .unwrap();

        let row: Vec<u16> = vec![65535, 0, 0, 0, 32768, 65535];
        film.write_scanline(0, bytemuck::cast_slice(&row[..])).unwrap();
        film.finish().unwrap();

        let image = image::open(&path).unwrap().into_rgb16();
        assert_eq!(image.get_pixel(1, 0), &Rgb([0, 32768, 65535]));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_incomplete_film_is_not_saved() {
        let film = film("out.png", ColorSpace::Srgb, OutputFormat::Uint8).unwrap();
        let err = film.save(Path::new("out.png")).unwrap_err();
        assert!(matches!(classify(&err), Some(RenderError::Io(_))));
    }
}
