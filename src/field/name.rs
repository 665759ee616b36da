use std::{error::Error, fmt, num::ParseIntError, ops::Range, path::Path};

/// Number of characters in the base name of every ABF/ABL file.
pub const NAME_LEN: usize = 24;

const VERSION: Range<usize> = 9..11;
const YEAR: Range<usize> = 12..16;
const MONTH: Range<usize> = 16..19;
const PERIOD: usize = 19;
const FORMAT: Range<usize> = 21..24;

/// Month abbreviations as they appear in file names, in calendar order.
const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Maps a lowercase three-letter month abbreviation to its number (1-12).
pub fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|&m| m == token)
        .map(|i| i as u32 + 1)
}

/// An error parsing the metadata encoded in an ABF/ABL file name.
#[derive(Debug)]
pub enum ParseNameError {
    /// The base name is not exactly [`NAME_LEN`] characters long.
    Length {
        /// The offending base name.
        name: String,
    },
    /// A numeric field (version or year) is not an integer.
    Integer {
        /// Which field failed.
        field: &'static str,
        /// The characters found at the field's offsets.
        value: String,
        /// The underlying parse error.
        source: ParseIntError,
    },
    /// The month token is not one of the twelve known abbreviations.
    Month(String),
}

impl Error for ParseNameError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Length { .. } => None,
            Self::Integer { source, .. } => Some(source),
            Self::Month(_) => None,
        }
    }
}

impl fmt::Display for ParseNameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Length { name } => {
                write!(f, "expected a file name of {NAME_LEN} characters: {name}")
            }
            Self::Integer { field, value, .. } => write!(f, "invalid {field}: {value:?}"),
            Self::Month(token) => write!(f, "unknown month: {token:?}"),
        }
    }
}

/// Returns the final path component as text.
///
/// Every byte of an invalid UTF-8 sequence becomes its own U+FFFD, so the
/// character count matches a per-byte decoding of the name.
pub(crate) fn base_name(path: &Path) -> String {
    let Some(name) = path.file_name() else {
        return String::new();
    };
    let mut bytes = name.as_encoded_bytes();
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let bad = err.error_len().unwrap_or(rest.len());
                out.extend(std::iter::repeat(char::REPLACEMENT_CHARACTER).take(bad));
                bytes = &rest[bad..];
            }
        }
    }
}

/// Checks that the base name of `path` has the fixed length.
pub(crate) fn check_len(path: &Path) -> Result<(), ParseNameError> {
    let name = base_name(path);
    if name.chars().count() == NAME_LEN {
        Ok(())
    } else {
        Err(ParseNameError::Length { name })
    }
}

/// Metadata read from the fixed offsets of an ABF/ABL file name.
///
/// For `AVHRRBUVI01.1985feba.abl` this is version 1, year 1985, month 2,
/// period `'a'` and format `"abl"`.
///
/// The period and format are kept exactly as found; checking them is left to
/// [`RawField::to_cube`](crate::RawField::to_cube).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldName {
    /// Product version, offsets `[9, 11)`.
    pub version: i32,
    /// Four-digit year, offsets `[12, 16)`.
    pub year: i32,
    /// Month number 1-12, from the abbreviation at offsets `[16, 19)`.
    pub month: u32,
    /// Half-month period, offset `19`.
    pub period: char,
    /// Format tag, offsets `[21, 24)`.
    pub format: String,
}

impl FieldName {
    /// Parses the base name of `path`.
    ///
    /// # Example
    ///
    /// ```
    /// use abf::FieldName;
    ///
    /// let name = FieldName::parse("/data/AVHRRBUVI01.1985feba.abl")?;
    /// assert_eq!((name.year, name.month, name.period), (1985, 2, 'a'));
    /// assert_eq!(name.format, "abl");
    /// # Ok::<_, abf::ParseNameError>(())
    /// ```
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, ParseNameError> {
        let name = base_name(path.as_ref());
        let chars: Vec<char> = name.chars().collect();
        if chars.len() != NAME_LEN {
            return Err(ParseNameError::Length { name });
        }
        let slice = |range: Range<usize>| chars[range].iter().collect::<String>();

        let version = parse_int("version", slice(VERSION))?;
        let year = parse_int("year", slice(YEAR))?;
        let month_token = slice(MONTH);
        let month = month_number(&month_token).ok_or(ParseNameError::Month(month_token))?;
        Ok(Self {
            version,
            year,
            month,
            period: chars[PERIOD],
            format: slice(FORMAT),
        })
    }
}

fn parse_int<T>(field: &'static str, value: String) -> Result<T, ParseNameError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    match value.trim().parse() {
        Ok(n) => Ok(n),
        Err(source) => Err(ParseNameError::Integer { field, value, source }),
    }
}
