pub mod error;
pub mod math;
pub mod spectrum;

pub use error::RenderError;

/// Upper end (nm) of the visible range used by every table in the pipeline.
pub const LAST_WAVELENGTH: u32 = 830;

/// Values tabulated on an integer 1 nm grid starting at `first_wavelength`.
///
/// Tables with different start points are aligned through `index_of`, never by precomputed
/// offsets.
pub trait WavelengthTable {
    fn first_wavelength(&self) -> u32;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn last_wavelength(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.first_wavelength() + self.len() as u32 - 1)
        }
    }

    fn index_of(&self, wavelength: u32) -> Option<usize> {
        let last = self.last_wavelength()?;
        if wavelength < self.first_wavelength() || wavelength > last {
            None
        } else {
            Some((wavelength - self.first_wavelength()) as usize)
        }
    }
}

/// Inclusive integer wavelength range, in nm.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WavelengthRange {
    pub first: u32,
    pub last: u32,
}

impl WavelengthRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// Range covered by a table, `None` when the table is empty.
    pub fn of<T: WavelengthTable + ?Sized>(table: &T) -> Option<Self> {
        Some(Self::new(table.first_wavelength(), table.last_wavelength()?))
    }

    pub fn intersect(&self, other: &WavelengthRange) -> Option<WavelengthRange> {
        let first = self.first.max(other.first);
        let last = self.last.min(other.last);
        if first > last {
            None
        } else {
            Some(WavelengthRange::new(first, last))
        }
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    /// Wavelengths from `first` to `last` in steps of `step` nm.
    pub fn iter(&self, step: u32) -> impl Iterator<Item = u32> {
        (self.first..=self.last).step_by(step.max(1) as usize)
    }
}
