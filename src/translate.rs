//! Conversion of a decoded [`RawField`] into a [`Cube`].

use crate::{
    cube::{Coord, Cube, CubeError, GeogCs},
    RawField, X_SIZE, Y_SIZE,
};
use chrono::{Datelike, Months, NaiveDate};
use ndarray::Array1;
use thiserror::Error;

/// Grid spacing in degrees.
pub const STEP: f64 = 1.0 / 12.0;
/// Value of the `source` attribute on every cube.
pub const SOURCE: &str = "Boston University";
/// Units of the time coordinate.
pub const TIME_UNITS: &str = "days since 0001-01-01";

/// An error turning a field into a cube.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The format tag is neither `abf` nor `abl`.
    #[error("unknown ABF/ABL format: {0}")]
    UnknownFormat(String),
    /// The period is neither `a` nor `b`.
    #[error("unknown period: {0}")]
    UnknownPeriod(char),
    /// The year and month do not form a representable date.
    #[error("invalid date: year {year}, month {month}")]
    InvalidDate {
        /// Year.
        year: i32,
        /// Month.
        month: u32,
    },
    /// A coordinate could not be attached.
    #[error("error building cube: {0}")]
    Cube(#[from] CubeError),
}

/// The two products distinguished by the file name's format tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Fraction of absorbed photosynthetically active radiation.
    Abf,
    /// Leaf area index.
    Abl,
}

impl Format {
    /// Matches a tag case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "abf" => Some(Self::Abf),
            "abl" => Some(Self::Abl),
            _ => None,
        }
    }

    /// Name given to cubes of this product.
    pub const fn cube_name(self) -> &'static str {
        match self {
            Self::Abf => "FAPAR",
            Self::Abl => "leaf_area_index",
        }
    }
}

/// Half of a month.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Period {
    /// Days 1 to 15.
    A,
    /// Day 16 to the last day of the month.
    B,
}

impl Period {
    /// Parses `'a'` or `'b'`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a' => Some(Self::A),
            'b' => Some(Self::B),
            _ => None,
        }
    }

    /// First and last day (inclusive) of this period in `year`/`month`.
    ///
    /// Returns `None` for years before 1, where days since 0001-01-01 are
    /// undefined.
    ///
    /// ```
    /// use abf::Period;
    /// use chrono::NaiveDate;
    ///
    /// let (start, end) = Period::B.day_range(1988, 2).unwrap();
    /// assert_eq!(start, NaiveDate::from_ymd_opt(1988, 2, 16).unwrap());
    /// assert_eq!(end, NaiveDate::from_ymd_opt(1988, 2, 29).unwrap());
    /// ```
    pub fn day_range(self, year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
        if year < 1 {
            return None;
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        match self {
            Self::A => Some((first, first.with_day(15)?)),
            Self::B => {
                let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
                Some((first.with_day(16)?, last))
            }
        }
    }
}

/// Days since 0001-01-01 in the proleptic Gregorian calendar.
pub fn days_since_epoch(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - 1
}

/// Builds the scalar `time` coordinate for a half-month period.
///
/// The point is the first day; the bounds are the first and last day, both
/// inclusive.
pub fn time_coord(year: i32, month: u32, period: Period) -> Result<Coord, TranslateError> {
    let (start, end) = period
        .day_range(year, month)
        .ok_or(TranslateError::InvalidDate { year, month })?;
    let start = days_since_epoch(start) as f64;
    let end = days_since_epoch(end) as f64;
    Ok(Coord::scalar("time", TIME_UNITS, start, [start, end]))
}

/// Cell-centre coordinate of `len` cells of [`STEP`] degrees starting at
/// `origin`, with guessed bounds.
fn grid_coord(name: &str, len: usize, origin: f64) -> Result<Coord, CubeError> {
    let points = Array1::from_shape_fn(len, |i| i as f64 * STEP + STEP / 2.0 + origin);
    let mut coord = Coord::new(name, "degrees", points).with_coord_system(GeogCs::WGS84);
    coord.guess_bounds()?;
    Ok(coord)
}

/// Longitude axis, 4320 cells from -180.
pub fn longitude() -> Result<Coord, CubeError> {
    grid_coord("longitude", X_SIZE, -180.0)
}

/// Latitude axis, 2160 cells from -90.
pub fn latitude() -> Result<Coord, CubeError> {
    grid_coord("latitude", Y_SIZE, -90.0)
}

impl RawField {
    /// Returns a new [`Cube`] holding a copy of this field's grid.
    ///
    /// Fails without producing anything if the format tag or period is not
    /// recognised.
    pub fn to_cube(&self) -> Result<Cube, TranslateError> {
        let format = Format::from_tag(&self.format)
            .ok_or_else(|| TranslateError::UnknownFormat(self.format.clone()))?;
        let period =
            Period::from_char(self.period).ok_or(TranslateError::UnknownPeriod(self.period))?;
        let time = time_coord(self.year, self.month, period)?;

        let mut cube = Cube::new(self.data.clone());
        cube.rename(format.cube_name());
        cube.set_units("%");
        cube.add_dim_coord(longitude()?, 1)?;
        cube.add_dim_coord(latitude()?, 0)?;
        cube.add_aux_coord(time);
        cube.attributes_mut().insert("source".to_string(), SOURCE.to_string());

        tracing::debug!(
            path = %self.path.display(),
            name = cube.name(),
            "built cube"
        );
        Ok(cube)
    }
}
