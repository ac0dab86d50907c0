use super::{CubeMetadata, CubeSource, ScanlineRaw};
use crate::common::RenderError;
use anyhow::Context;
use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

pub const HYSPEX_MAGIC: &[u8; 8] = b"HYSPEX\0\0";

const HEADER_SIZE_OFFSET: u64 = 8;
const BANDS_OFFSET: u64 = 1961;
const SAMPLES_OFFSET: u64 = 1965;
const SCANLINES_OFFSET: u64 = 2073;
const WAVELENGTHS_OFFSET: u64 = 2181;

/// HySpex sensors always store 16-bit little-endian samples.
const BYTES_PER_SAMPLE: usize = 2;

/// Cube dimensions given by the user. Each field set here replaces the header's value, and a
/// file without a header needs all three.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ManualGeometry {
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub bands: Option<usize>,
}

impl ManualGeometry {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.bands.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.width.is_some() && self.height.is_some() && self.bands.is_some()
    }

    /// Band centers of the sensor configurations with 40, 80 and 160 bands.
    pub fn preset_wavelengths(bands: usize) -> anyhow::Result<Vec<f64>> {
        let (start, pitch) = match bands {
            40 => (412.880826, 14.57377849),
            80 => (416.524261, 7.28689),
            160 => (414.702548, 3.64344462),
            n => anyhow::bail!(RenderError::Configuration(format!(
                "no wavelength table for {} bands: expected 40, 80 or 160",
                n
            ))),
        };

        Ok((0..bands).map(|i| start + i as f64 * pitch).collect())
    }

    fn apply(&self, metadata: &mut CubeMetadata) -> anyhow::Result<()> {
        if let Some(width) = self.width {
            metadata.sample_count = width;
        }
        if let Some(height) = self.height {
            metadata.scanline_count = height;
        }
        if let Some(bands) = self.bands {
            metadata.band_count = bands;
            metadata.wavelengths = Self::preset_wavelengths(bands)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HyspexHeader {
    /// Offset of the first scanline.
    pub size: u64,
    pub bands: usize,
    pub samples: usize,
    pub scanlines: usize,
    pub wavelengths: Vec<f64>,
}

fn read_array<R: Read + Seek, const N: usize>(
    reader: &mut R,
    offset: u64,
    field: &str,
) -> anyhow::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader
        .seek(SeekFrom::Start(offset))
        .and_then(|_| reader.read_exact(&mut buf))
        .with_context(|| {
            RenderError::SourceFormat(format!(
                "truncated header reading {} at byte {}",
                field, offset
            ))
        })?;

    Ok(buf)
}

fn read_u32<R: Read + Seek>(reader: &mut R, offset: u64, field: &str) -> anyhow::Result<usize> {
    Ok(u32::from_le_bytes(read_array(reader, offset, field)?) as usize)
}

/// Whether the stream starts with the HySpex magic. Streams shorter than the magic are not
/// HySpex files.
pub fn has_magic<R: Read + Seek>(reader: &mut R) -> anyhow::Result<bool> {
    let mut magic = [0u8; 8];
    reader
        .seek(SeekFrom::Start(0))
        .context(RenderError::Io(String::from("could not rewind cube")))?;

    match reader.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == HYSPEX_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e).context(RenderError::Io(String::from("could not read cube header"))),
    }
}

impl HyspexHeader {
    pub fn read<R: Read + Seek>(reader: &mut R) -> anyhow::Result<Self> {
        if !has_magic(reader)? {
            anyhow::bail!(RenderError::SourceFormat(String::from(
                "not a HySpex file: magic number mismatch"
            )));
        }

        let size = i32::from_le_bytes(read_array(reader, HEADER_SIZE_OFFSET, "header size")?);
        if size < 0 {
            anyhow::bail!(RenderError::SourceFormat(format!(
                "negative header size {}",
                size
            )));
        }

        let bands = read_u32(reader, BANDS_OFFSET, "band count")?;
        let samples = read_u32(reader, SAMPLES_OFFSET, "sample count")?;
        let scanlines = read_u32(reader, SCANLINES_OFFSET, "scanline count")?;

        let mut wavelengths = Vec::new();
        for band in 0..bands as u64 {
            let offset = WAVELENGTHS_OFFSET + band * 8;
            wavelengths.push(f64::from_le_bytes(read_array(reader, offset, "wavelength table")?));
        }

        Ok(Self {
            size: size as u64,
            bands,
            samples,
            scanlines,
            wavelengths,
        })
    }

    pub fn metadata(&self) -> CubeMetadata {
        CubeMetadata {
            sample_count: self.samples,
            scanline_count: self.scanlines,
            band_count: self.bands,
            bits_per_band_sample: (BYTES_PER_SAMPLE * 8) as u32,
            wavelengths: self.wavelengths.clone(),
        }
    }
}

/// Band-interleaved-by-line HySpex cube read scanline by scanline.
pub struct HyspexCube<R> {
    log: slog::Logger,
    reader: R,
    metadata: CubeMetadata,
    data_offset: u64,
    next_row: usize,
    buffer: Vec<u8>,
}

impl HyspexCube<BufReader<File>> {
    pub fn open(
        log: &slog::Logger,
        path: &Path,
        geometry: ManualGeometry,
    ) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| RenderError::Io(format!("could not open cube {}", path.display())))?;
        Self::from_reader(log, BufReader::new(file), geometry)
    }
}

impl<R: Read + Seek> HyspexCube<R> {
    /// Parses the header if there is one. Fields set in `geometry` replace the header's, and all
    /// of them are required when the header is missing.
    pub fn from_reader(
        log: &slog::Logger,
        mut reader: R,
        geometry: ManualGeometry,
    ) -> anyhow::Result<Self> {
        let log = log.new(o!("module" => "hyspex"));

        let (data_offset, mut metadata) = if has_magic(&mut reader)? {
            let header = HyspexHeader::read(&mut reader)?;
            debug!(
                log,
                "header of {} bytes: {}x{} pixels, {} bands",
                header.size,
                header.samples,
                header.scanlines,
                header.bands
            );
            (header.size, header.metadata())
        } else if geometry.is_complete() {
            warn!(log, "no HySpex header found, reading headerless samples");
            (
                0,
                CubeMetadata {
                    sample_count: 0,
                    scanline_count: 0,
                    band_count: 0,
                    bits_per_band_sample: (BYTES_PER_SAMPLE * 8) as u32,
                    wavelengths: Vec::new(),
                },
            )
        } else if geometry.is_empty() {
            anyhow::bail!(RenderError::SourceFormat(String::from(
                "not a HySpex file: magic number mismatch"
            )));
        } else {
            anyhow::bail!(RenderError::SourceFormat(String::from(
                "no HySpex header: width, height and band count are all needed"
            )));
        };

        if !geometry.is_empty() {
            debug!(log, "using manual geometry {:?}", geometry);
            geometry.apply(&mut metadata)?;
        }

        metadata.validate()?;

        Ok(Self {
            log,
            reader,
            buffer: Vec::new(),
            metadata,
            data_offset,
            next_row: 0,
        })
    }
}

impl<R: Read + Seek> CubeSource for HyspexCube<R> {
    fn metadata(&self) -> &CubeMetadata {
        &self.metadata
    }

    fn next_scanline(&mut self) -> anyhow::Result<Option<ScanlineRaw>> {
        let row = self.next_row;
        if row >= self.metadata.scanline_count {
            return Ok(None);
        }

        let len = self.metadata.scanline_len();
        let offset = self.data_offset + (row * len * BYTES_PER_SAMPLE) as u64;
        self.buffer.resize(len * BYTES_PER_SAMPLE, 0);

        self.reader
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.reader.read_exact(&mut self.buffer))
            .with_context(|| {
                RenderError::Io(format!("could not read scanline {} at byte {}", row, offset))
            })?;
        self.next_row += 1;
        trace!(self.log, "read scanline {}", row);

        let data = self
            .buffer
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();

        ScanlineRaw::new(self.metadata.sample_count, self.metadata.band_count, data).map(Some)
    }
}
