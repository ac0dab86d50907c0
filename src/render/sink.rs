use crate::common::RenderError;
use anyhow::Context;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Receives packed scanlines from the renderer, strictly in row order.
pub trait ScanlineSink: Send {
    fn write_scanline(&mut self, row: usize, buffer: &[u8]) -> anyhow::Result<()>;

    /// Called once after the last scanline has been written.
    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Rejects rows that arrive out of order or with the wrong length.
#[derive(Clone, Copy, Debug)]
pub struct RowOrder {
    row_bytes: usize,
    next_row: usize,
}

impl RowOrder {
    pub fn new(row_bytes: usize) -> Self {
        Self {
            row_bytes,
            next_row: 0,
        }
    }

    pub fn rows_written(&self) -> usize {
        self.next_row
    }

    pub fn check(&mut self, row: usize, buffer: &[u8]) -> anyhow::Result<()> {
        if row != self.next_row {
            anyhow::bail!(RenderError::Io(format!(
                "scanline {} written out of order, expected {}",
                row, self.next_row
            )));
        }

        if buffer.len() != self.row_bytes {
            anyhow::bail!(RenderError::Io(format!(
                "scanline {} is {} bytes, expected {}",
                row,
                buffer.len(),
                self.row_bytes
            )));
        }

        self.next_row += 1;
        Ok(())
    }
}

/// Keeps every packed row in memory.
#[derive(Clone, Debug)]
pub struct MemorySink {
    order: RowOrder,
    data: Vec<u8>,
}

impl MemorySink {
    pub fn new(row_bytes: usize) -> Self {
        Self {
            order: RowOrder::new(row_bytes),
            data: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.order.rows_written()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ScanlineSink for MemorySink {
    fn write_scanline(&mut self, row: usize, buffer: &[u8]) -> anyhow::Result<()> {
        self.order.check(row, buffer)?;
        self.data.extend_from_slice(buffer);
        Ok(())
    }
}

/// Streams packed rows, without any header, to a writer.
pub struct RawSink<W> {
    writer: W,
    order: RowOrder,
}

impl RawSink<BufWriter<File>> {
    pub fn create(path: &Path, row_bytes: usize) -> anyhow::Result<Self> {
        let file = File::create(path)
            .with_context(|| RenderError::Io(format!("could not create {}", path.display())))?;
        Ok(Self::new(BufWriter::new(file), row_bytes))
    }
}

impl<W: Write + Send> RawSink<W> {
    pub fn new(writer: W, row_bytes: usize) -> Self {
        Self {
            writer,
            order: RowOrder::new(row_bytes),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ScanlineSink for RawSink<W> {
    fn write_scanline(&mut self, row: usize, buffer: &[u8]) -> anyhow::Result<()> {
        self.order.check(row, buffer)?;
        self.writer
            .write_all(buffer)
            .with_context(|| RenderError::Io(format!("could not write scanline {}", row)))
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.writer
            .flush()
            .context(RenderError::Io(String::from("could not flush output")))
    }
}
