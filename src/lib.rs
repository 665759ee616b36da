#![doc = include_str!("../README.md")]
//! ## Reading a single file
//!
//! - [`AbfField`] handle: cheap to create, decodes on first
//!   [`read`](AbfField::read)
//! - [`FieldName::parse`] for the metadata in the file name alone
//! - [`read_grid`] convenience function and [`ReadAbfExt`] extension trait for
//!   the grid alone
//! - [`RawField::to_cube`] to label a decoded field
//!
//! ## Reading many files
//!
//! - [`load_cubes`] expands glob patterns lazily and yields one [`Cube`] per
//!   file, optionally filtered or replaced by a callback
//!   ([`LoadCubes::with_callback`])
//! - [`FORMAT_SPECIFICATIONS`] and [`find_format`] describe the `.abf` and
//!   `.abl` extensions to a host that dispatches on file extension
//!
//! ## File layout
//!
//! The base name is always 24 characters, e.g. `AVHRRBUVI01.1985feba.abl`:
//!
//! | Offset     | Field                       | Example |
//! |------------|-----------------------------|---------|
//! | `[9, 11)`  | version                     | `01`    |
//! | `[12, 16)` | year                        | `1985`  |
//! | `[16, 19)` | month (lowercase)           | `feb`   |
//! | `19`       | period, `a` or `b`          | `a`     |
//! | `[21, 24)` | format, `abf` or `abl`      | `abl`   |
//!
//! The body is 4320 × 2160 unsigned bytes with no header. Values above 100
//! mean "no data".
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs)]

pub mod cube;
mod field;
mod load;
mod masked;
mod translate;

pub use crate::{
    cube::{Coord, Cube, CubeError, GeogCs},
    field::{
        name::{month_number, NAME_LEN},
        read_grid, AbfField, FieldName, ParseNameError, RawField, ReadAbfExt, ReadFieldError,
        ReadGridError, FILL_VALUE, VALID_MAX, X_SIZE, Y_SIZE,
    },
    load::{
        find_format, load_cubes, FileSpecs, FormatSpecification, LoadCubes, LoadError,
        FORMAT_SPECIFICATIONS,
    },
    masked::{MaskError, MaskedGrid},
    translate::{
        days_since_epoch, latitude, longitude, time_coord, Format, Period, TranslateError, SOURCE,
        STEP, TIME_UNITS,
    },
};
