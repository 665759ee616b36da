//! Lazy loading of cubes from file name patterns.

use crate::{
    field::{AbfField, ParseNameError, ReadFieldError},
    translate::TranslateError,
    Cube, RawField,
};
use std::{
    fmt, iter,
    path::{Path, PathBuf},
    vec,
};
use thiserror::Error;

/// An error produced while loading cubes.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The pattern is not a valid glob.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying error.
        source: glob::PatternError,
    },
    /// A path matched by a pattern could not be read.
    #[error("error expanding pattern: {0}")]
    Glob(#[from] glob::GlobError),
    /// The base name has the wrong length.
    #[error("{}: {source}", .path.display())]
    Filename {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: ParseNameError,
    },
    /// The file could not be decoded.
    #[error("{}: {source}", .path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: ReadFieldError,
    },
    /// The decoded field could not be turned into a cube.
    #[error("{}: {source}", .path.display())]
    Translate {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: TranslateError,
    },
}

/// One or more file name patterns.
///
/// Implemented for single strings as well as slices, arrays and vectors of
/// them, so a lone pattern need not be wrapped.
pub trait FileSpecs {
    /// The patterns, in order.
    fn into_specs(self) -> Vec<String>;
}

impl FileSpecs for &str {
    fn into_specs(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl FileSpecs for String {
    fn into_specs(self) -> Vec<String> {
        vec![self]
    }
}

impl FileSpecs for &String {
    fn into_specs(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<S: AsRef<str>> FileSpecs for &[S] {
    fn into_specs(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> FileSpecs for [S; N] {
    fn into_specs(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>> FileSpecs for Vec<S> {
    fn into_specs(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

type Callback<'a> = Box<dyn FnMut(Cube, &RawField, &Path) -> Option<Cube> + 'a>;

/// Loads cubes from every file matching `specs`.
///
/// Nothing is read until the returned iterator is advanced. Files are visited
/// pattern by pattern, each in the order the file system lists them. The
/// first error is returned in place of the file's cube and ends iteration.
///
/// # Example
///
/// ```no_run
/// let cubes = abf::load_cubes("data/*.abl")
///     .with_callback(|cube, field, _path| (field.year >= 1990).then_some(cube))
///     .collect::<Result<Vec<_>, _>>()?;
/// # Ok::<_, abf::LoadError>(())
/// ```
pub fn load_cubes<F: FileSpecs>(specs: F) -> LoadCubes<'static> {
    LoadCubes::new(specs)
}

/// Iterator returned by [`load_cubes`].
pub struct LoadCubes<'a> {
    specs: vec::IntoIter<String>,
    paths: Option<glob::Paths>,
    callback: Option<Callback<'a>>,
    done: bool,
}

impl<'a> LoadCubes<'a> {
    /// Creates the iterator without touching the file system.
    pub fn new<F: FileSpecs>(specs: F) -> Self {
        Self {
            specs: specs.into_specs().into_iter(),
            paths: None,
            callback: None,
            done: false,
        }
    }

    /// Passes every cube through `callback` before it is yielded.
    ///
    /// The callback receives the cube, the field it was built from and the
    /// file path. Returning `None` drops the cube; returning `Some` yields
    /// the returned cube instead.
    pub fn with_callback<'b, C>(self, callback: C) -> LoadCubes<'b>
    where
        C: FnMut(Cube, &RawField, &Path) -> Option<Cube> + 'b,
    {
        LoadCubes {
            specs: self.specs,
            paths: self.paths,
            callback: Some(Box::new(callback)),
            done: self.done,
        }
    }

    fn next_path(&mut self) -> Option<Result<PathBuf, LoadError>> {
        loop {
            if let Some(paths) = &mut self.paths {
                match paths.next() {
                    Some(entry) => return Some(entry.map_err(LoadError::from)),
                    None => self.paths = None,
                }
            }
            let pattern = self.specs.next()?;
            match glob::glob(&pattern) {
                Ok(paths) => self.paths = Some(paths),
                Err(source) => return Some(Err(LoadError::Pattern { pattern, source })),
            }
        }
    }

    fn load(&mut self, path: PathBuf) -> Result<Option<Cube>, LoadError> {
        let field = match AbfField::new(path.as_path()) {
            Ok(field) => field,
            Err(source) => return Err(LoadError::Filename { path, source }),
        };
        let raw = match field.into_raw() {
            Ok(raw) => raw,
            Err(source) => return Err(LoadError::Read { path, source }),
        };
        let cube = match raw.to_cube() {
            Ok(cube) => cube,
            Err(source) => return Err(LoadError::Translate { path, source }),
        };
        match &mut self.callback {
            Some(callback) => {
                let cube = callback(cube, &raw, &path);
                if cube.is_none() {
                    tracing::trace!(path = %path.display(), "callback dropped cube");
                }
                Ok(cube)
            }
            None => Ok(Some(cube)),
        }
    }
}

impl Iterator for LoadCubes<'_> {
    type Item = Result<Cube, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while let Some(path) = self.next_path() {
            match path.and_then(|path| self.load(path)) {
                Ok(Some(cube)) => return Some(Ok(cube)),
                Ok(None) => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        self.done = true;
        None
    }
}

impl iter::FusedIterator for LoadCubes<'_> {}

impl fmt::Debug for LoadCubes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LoadCubes")
            .field("specs", &self.specs.as_slice())
            .field("expanding", &self.paths.is_some())
            .field("callback", &self.callback.is_some())
            .field("done", &self.done)
            .finish()
    }
}

/// Describes a file format to a host that dispatches on file extension.
#[derive(Clone, Copy)]
pub struct FormatSpecification {
    /// Short format name.
    pub name: &'static str,
    /// File extension including the dot, e.g. `".abf"`.
    pub extension: &'static str,
    /// Rank among competing handlers.
    pub priority: u8,
    /// Entry point that loads files of this format.
    pub load: fn(Vec<String>) -> LoadCubes<'static>,
}

impl FormatSpecification {
    /// Whether the file name of `path` ends in this format's extension.
    pub fn matches<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref()
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(self.extension))
    }
}

impl fmt::Debug for FormatSpecification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FormatSpecification")
            .field("name", &self.name)
            .field("extension", &self.extension)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

fn load_specs(specs: Vec<String>) -> LoadCubes<'static> {
    load_cubes(specs)
}

/// The formats handled by this crate, both routed to [`load_cubes`].
pub static FORMAT_SPECIFICATIONS: [FormatSpecification; 2] = [
    FormatSpecification {
        name: "ABF",
        extension: ".abf",
        priority: 2,
        load: load_specs,
    },
    FormatSpecification {
        name: "ABL",
        extension: ".abl",
        priority: 2,
        load: load_specs,
    },
];

/// Looks up the format specification for `path` by extension.
pub fn find_format<P: AsRef<Path>>(path: P) -> Option<&'static FormatSpecification> {
    let path = path.as_ref();
    FORMAT_SPECIFICATIONS.iter().find(|spec| spec.matches(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specs_normalise() {
        assert_eq!("a*".into_specs(), vec!["a*"]);
        assert_eq!(String::from("b").into_specs(), vec!["b"]);
        assert_eq!(["x", "y"].into_specs(), vec!["x", "y"]);
        assert_eq!(vec![String::from("z")].into_specs(), vec!["z"]);
        assert_eq!((&["p", "q"][..]).into_specs(), vec!["p", "q"]);
    }

    #[test]
    fn lazy_until_pulled() {
        let cubes = load_cubes("/definitely/not/here/[");
        assert!(!cubes.done);
        assert!(cubes.paths.is_none());
    }

    #[test]
    fn bad_pattern_fails_once() {
        let mut cubes = load_cubes(["[", "*"]);
        assert!(matches!(cubes.next(), Some(Err(LoadError::Pattern { .. }))));
        assert!(cubes.next().is_none());
    }

    #[test]
    fn no_matches() {
        let mut cubes = load_cubes("/definitely/not/here/*.abf");
        assert!(cubes.next().is_none());
    }

    #[test]
    fn finds_formats() {
        assert_eq!(find_format("x/AVHRRBUVI01.1985feba.abf").unwrap().name, "ABF");
        assert_eq!(find_format("AVHRRBUVI01.1985feba.abl").unwrap().name, "ABL");
        assert!(find_format("AVHRRBUVI01.1985feba.nc").is_none());
        assert!(FORMAT_SPECIFICATIONS.iter().all(|s| s.priority == 2));
    }
}
