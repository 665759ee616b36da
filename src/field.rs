pub mod name;

pub use self::name::{FieldName, ParseNameError};
use crate::MaskedGrid;
use byteorder::ReadBytesExt;
use ndarray::{s, Array2, ShapeError};
use std::{
    cell::OnceCell,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Length of the longitude axis, the fast axis of the stored payload.
pub const X_SIZE: usize = 4320;
/// Length of the latitude axis.
pub const Y_SIZE: usize = 2160;
/// Values above this are "no data" and get masked.
pub const VALID_MAX: u8 = 100;
/// Fill value reported for masked cells.
///
/// The usual masked-array default of 999999 would wrap to 63 in a byte, which
/// is a plausible percentage.
pub const FILL_VALUE: u8 = 255;

/// Read the grid of the ABF/ABL file located at the specified path.
///
/// This is a convenience function for using `File::open` followed by
/// [`ReadAbfExt::read_abf`].
///
/// # Example
///
/// ```no_run
/// use abf::read_grid;
/// # use abf::ReadGridError;
///
/// let grid = read_grid("AVHRRBUVI01.1985feba.abl")?;
/// assert_eq!(grid.shape(), (2160, 4320));
/// # Ok::<_, ReadGridError>(())
/// ```
pub fn read_grid<P: AsRef<Path>>(path: P) -> Result<MaskedGrid, ReadGridError> {
    MaskedGrid::read_abf(io::BufReader::new(fs::File::open(path)?))
}

/// Extension trait for reading a grid from the raw ABF/ABL payload.
///
/// The payload is `X_SIZE * Y_SIZE` unsigned bytes with no header. It is
/// stored column by column (latitude varying fastest, north first); the
/// result is laid out as `(Y_SIZE, X_SIZE)` with row 0 the southernmost
/// latitude band.
pub trait ReadAbfExt: Sized {
    /// Reads exactly one payload from `reader`, failing if it is short or if
    /// any bytes remain afterwards.
    fn read_abf<R: io::Read>(reader: R) -> Result<Self, ReadGridError>;
}

impl ReadAbfExt for MaskedGrid {
    fn read_abf<R: io::Read>(mut reader: R) -> Result<Self, ReadGridError> {
        let len = X_SIZE * Y_SIZE;
        let mut buf = vec![0; len];
        reader.read_exact(&mut buf)?;
        match reader.read_u8() {
            Ok(_) => {
                let mut rest = Vec::new();
                let extra = 1 + reader.read_to_end(&mut rest)?;
                return Err(ReadGridError::ExtraBytes(extra));
            }
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {}
            Err(err) => return Err(ReadGridError::Io(err)),
        }

        // Bytes are big-endian u8, so no swapping is needed.
        let raw = Array2::from_shape_vec((X_SIZE, Y_SIZE), buf)?;
        // (x, y) -> (y, x), then flip y so latitude ascends with the row index.
        let data = raw
            .reversed_axes()
            .slice_move(s![..;-1, ..])
            .as_standard_layout()
            .into_owned();
        Ok(MaskedGrid::masked_greater(data, VALID_MAX, FILL_VALUE))
    }
}

/// An error reading the grid payload.
#[derive(Debug, Error)]
pub enum ReadGridError {
    /// An error caused by I/O.
    #[error("I/O error: {0}")]
    Io(io::Error),
    /// The file is shorter than one full grid.
    #[error("reached EOF before reading all data")]
    MissingData,
    /// Extra bytes are present after the grid.
    #[error("file had {0} extra bytes before EOF")]
    ExtraBytes(usize),
    /// The payload could not be shaped into a grid.
    #[error("array shape error: {0}")]
    Shape(#[from] ShapeError),
}

/// A short read means the payload is truncated.
impl From<io::Error> for ReadGridError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::MissingData,
            _ => Self::Io(err),
        }
    }
}

/// An error reading a whole field (file name and grid).
#[derive(Debug, Error)]
pub enum ReadFieldError {
    /// The file name does not carry valid metadata.
    #[error("invalid file name: {0}")]
    Name(#[from] ParseNameError),
    /// The grid payload could not be read.
    #[error("error reading grid: {0}")]
    Grid(#[from] ReadGridError),
}

/// A fully decoded ABF/ABL field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawField {
    /// The file the field came from.
    pub path: PathBuf,
    /// Product version.
    pub version: i32,
    /// Year of the period.
    pub year: i32,
    /// Month of the period, 1-12.
    pub month: u32,
    /// `'a'` for days 1-15, `'b'` for day 16 to month end.
    pub period: char,
    /// Format tag as found in the file name, e.g. `"abf"`.
    pub format: String,
    /// The `(Y_SIZE, X_SIZE)` masked grid.
    pub data: MaskedGrid,
}

impl RawField {
    /// Combines parsed file name metadata with a grid.
    pub fn new(path: PathBuf, name: FieldName, data: MaskedGrid) -> Self {
        let FieldName { version, year, month, period, format } = name;
        Self { path, version, year, month, period, format, data }
    }
}

/// A handle on one ABF/ABL file.
///
/// Creating the handle only checks that the base name is 24 characters long.
/// Parsing the name and reading the grid happen on the first call to
/// [`read`](Self::read), whose result is kept for later calls.
///
/// # Example
///
/// ```no_run
/// use abf::AbfField;
///
/// let field = AbfField::new("AVHRRBUVI01.1985feba.abl")?;
/// let raw = field.read()?;
/// println!("{} {:?}", raw.year, raw.data.shape());
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct AbfField {
    path: PathBuf,
    raw: OnceCell<RawField>,
}

impl AbfField {
    /// Creates a handle, failing only if the base name has the wrong length.
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self, ParseNameError> {
        let path = path.into();
        name::check_len(&path)?;
        Ok(Self { path, raw: OnceCell::new() })
    }

    /// The path the handle was created with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`read`](Self::read) has already succeeded.
    pub fn is_loaded(&self) -> bool {
        self.raw.get().is_some()
    }

    /// Parses the file name and reads the grid, once.
    ///
    /// A failed read is not cached; calling again retries.
    pub fn read(&self) -> Result<&RawField, ReadFieldError> {
        if let Some(raw) = self.raw.get() {
            return Ok(raw);
        }
        let raw = self.decode()?;
        Ok(self.raw.get_or_init(|| raw))
    }

    /// Consumes the handle, returning the decoded field.
    pub fn into_raw(self) -> Result<RawField, ReadFieldError> {
        match self.raw.into_inner() {
            Some(raw) => Ok(raw),
            None => Self::decode_path(self.path),
        }
    }

    fn decode(&self) -> Result<RawField, ReadFieldError> {
        Self::decode_path(self.path.clone())
    }

    fn decode_path(path: PathBuf) -> Result<RawField, ReadFieldError> {
        let name = FieldName::parse(&path)?;
        let data = read_grid(&path)?;
        tracing::debug!(
            path = %path.display(),
            year = name.year,
            month = name.month,
            period = %name.period,
            masked = data.count_masked(),
            "decoded ABF/ABL field"
        );
        Ok(RawField::new(path, name, data))
    }
}
