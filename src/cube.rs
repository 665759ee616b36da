//! A minimal labelled array: masked data with named, unit-bearing
//! coordinates and free-form attributes.

use crate::MaskedGrid;
use ndarray::{Array1, Array2};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// An error assembling a [`Cube`] or its coordinates.
#[derive(Debug, Error)]
pub enum CubeError {
    /// The cube has no dimension with this index.
    #[error("dimension {dim} out of range for a {ndim}-d cube")]
    NoSuchDimension {
        /// Requested dimension.
        dim: usize,
        /// Number of dimensions of the cube.
        ndim: usize,
    },
    /// A dimension coordinate is already attached to this dimension.
    #[error("dimension {0} already has a coordinate")]
    DimensionTaken(usize),
    /// The coordinate length does not match the dimension length.
    #[error("coordinate {name:?} has {len} points but dimension {dim} has length {expected}")]
    LengthMismatch {
        /// Coordinate name.
        name: String,
        /// Dimension index.
        dim: usize,
        /// Number of points of the coordinate.
        len: usize,
        /// Length of the dimension.
        expected: usize,
    },
    /// A dimension coordinate must be strictly monotonic.
    #[error("coordinate {0:?} is not strictly monotonic")]
    NotMonotonic(String),
    /// Bounds cannot be guessed from fewer than two points.
    #[error("cannot guess bounds of coordinate {0:?} with fewer than two points")]
    TooFewPoints(String),
    /// Bounds must have shape `(points, 2)`.
    #[error("bounds of coordinate {name:?} have shape {shape:?}, expected ({len}, 2)")]
    BoundsShape {
        /// Coordinate name.
        name: String,
        /// Shape of the bounds given.
        shape: [usize; 2],
        /// Number of points.
        len: usize,
    },
}

/// A geographic coordinate system on an ellipsoid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeogCs {
    /// Equatorial radius in metres.
    pub semi_major_axis: f64,
    /// Polar radius in metres.
    pub semi_minor_axis: f64,
}

impl GeogCs {
    /// The WGS 84 / GRS 80 ellipsoid used by ABF/ABL grids.
    pub const WGS84: GeogCs = GeogCs {
        semi_major_axis: 6378137.0,
        semi_minor_axis: 6356752.31424,
    };

    /// Creates a coordinate system from its two semi-axes.
    pub fn new(semi_major_axis: f64, semi_minor_axis: f64) -> Self {
        Self { semi_major_axis, semi_minor_axis }
    }

    /// `a / (a - b)`, infinite for a sphere.
    pub fn inverse_flattening(&self) -> f64 {
        let a = self.semi_major_axis;
        a / (a - self.semi_minor_axis)
    }
}

/// A coordinate: points, optional cell bounds and metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Coord {
    standard_name: String,
    units: String,
    points: Array1<f64>,
    bounds: Option<Array2<f64>>,
    coord_system: Option<GeogCs>,
}

impl Coord {
    /// Creates a coordinate with no bounds or coordinate system.
    pub fn new(
        standard_name: impl Into<String>,
        units: impl Into<String>,
        points: Array1<f64>,
    ) -> Self {
        Self {
            standard_name: standard_name.into(),
            units: units.into(),
            points,
            bounds: None,
            coord_system: None,
        }
    }

    /// Creates a single-point coordinate with the given bounds.
    pub fn scalar(
        standard_name: impl Into<String>,
        units: impl Into<String>,
        point: f64,
        bounds: [f64; 2],
    ) -> Self {
        Self {
            standard_name: standard_name.into(),
            units: units.into(),
            points: Array1::from_elem(1, point),
            bounds: Some(Array2::from_shape_fn((1, 2), |(_, j)| bounds[j])),
            coord_system: None,
        }
    }

    /// Attaches a coordinate system.
    pub fn with_coord_system(mut self, cs: GeogCs) -> Self {
        self.coord_system = Some(cs);
        self
    }

    /// Sets explicit bounds of shape `(points, 2)`.
    pub fn set_bounds(&mut self, bounds: Array2<f64>) -> Result<(), CubeError> {
        let (rows, cols) = bounds.dim();
        if rows != self.points.len() || cols != 2 {
            return Err(CubeError::BoundsShape {
                name: self.standard_name.clone(),
                shape: [rows, cols],
                len: self.points.len(),
            });
        }
        self.bounds = Some(bounds);
        Ok(())
    }

    /// Sets contiguous bounds half way between neighbouring points.
    ///
    /// The outer edges of the first and last cells are placed half a step
    /// beyond the end points.
    ///
    /// ```
    /// use abf::Coord;
    /// use ndarray::array;
    ///
    /// let mut c = Coord::new("latitude", "degrees", array![0.0, 1.0, 3.0]);
    /// c.guess_bounds()?;
    /// assert_eq!(c.bounds().unwrap(), array![[-0.5, 0.5], [0.5, 2.0], [2.0, 4.0]]);
    /// # Ok::<_, abf::CubeError>(())
    /// ```
    pub fn guess_bounds(&mut self) -> Result<(), CubeError> {
        let p = &self.points;
        let n = p.len();
        if n < 2 {
            return Err(CubeError::TooFewPoints(self.standard_name.clone()));
        }
        let mut edges = Array1::zeros(n + 1);
        edges[0] = p[0] - (p[1] - p[0]) / 2.0;
        edges[n] = p[n - 1] + (p[n - 1] - p[n - 2]) / 2.0;
        for i in 1..n {
            edges[i] = (p[i - 1] + p[i]) / 2.0;
        }
        self.bounds = Some(Array2::from_shape_fn((n, 2), |(i, j)| edges[i + j]));
        Ok(())
    }

    /// Standard name, e.g. `"latitude"`.
    pub fn name(&self) -> &str {
        &self.standard_name
    }

    /// Unit string.
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Point values.
    pub fn points(&self) -> &Array1<f64> {
        &self.points
    }

    /// Cell bounds, shape `(points, 2)`, if set.
    pub fn bounds(&self) -> Option<&Array2<f64>> {
        self.bounds.as_ref()
    }

    /// Coordinate system, if any.
    pub fn coord_system(&self) -> Option<&GeogCs> {
        self.coord_system.as_ref()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the coordinate has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn is_strictly_monotonic(&self) -> bool {
        let p = &self.points;
        let increasing = p.windows(2).into_iter().all(|w| w[0] < w[1]);
        increasing || p.windows(2).into_iter().all(|w| w[0] > w[1])
    }
}

/// A 2-D labelled array.
#[derive(Clone, Debug, PartialEq)]
pub struct Cube {
    data: MaskedGrid,
    name: Option<String>,
    units: Option<String>,
    dim_coords: Vec<(Coord, usize)>,
    aux_coords: Vec<Coord>,
    attributes: BTreeMap<String, String>,
}

impl Cube {
    /// Wraps `data` with no name, units, coordinates or attributes.
    pub fn new(data: MaskedGrid) -> Self {
        Self {
            data,
            name: None,
            units: None,
            dim_coords: Vec::new(),
            aux_coords: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// The masked data.
    pub fn data(&self) -> &MaskedGrid {
        &self.data
    }

    /// Consumes the cube, returning its data.
    pub fn into_data(self) -> MaskedGrid {
        self.data
    }

    /// Shape as `[rows, columns]`.
    pub fn shape(&self) -> [usize; 2] {
        let (rows, cols) = self.data.shape();
        [rows, cols]
    }

    /// The cube's name, or `"unknown"`.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    /// Sets the cube's name.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Unit string, if set.
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// Sets the unit string.
    pub fn set_units(&mut self, units: impl Into<String>) {
        self.units = Some(units.into());
    }

    /// Attaches `coord` as the coordinate describing dimension `dim`.
    pub fn add_dim_coord(&mut self, coord: Coord, dim: usize) -> Result<(), CubeError> {
        let shape = self.shape();
        let expected = *shape
            .get(dim)
            .ok_or(CubeError::NoSuchDimension { dim, ndim: shape.len() })?;
        if self.dim_coords.iter().any(|&(_, d)| d == dim) {
            return Err(CubeError::DimensionTaken(dim));
        }
        if coord.len() != expected {
            return Err(CubeError::LengthMismatch {
                name: coord.standard_name,
                dim,
                len: coord.points.len(),
                expected,
            });
        }
        if !coord.is_strictly_monotonic() {
            return Err(CubeError::NotMonotonic(coord.standard_name));
        }
        self.dim_coords.push((coord, dim));
        Ok(())
    }

    /// Attaches an auxiliary (here always scalar) coordinate.
    pub fn add_aux_coord(&mut self, coord: Coord) {
        self.aux_coords.push(coord);
    }

    /// Finds a coordinate by name, dimension coordinates first.
    pub fn coord(&self, name: &str) -> Option<&Coord> {
        self.dim_coords
            .iter()
            .map(|(c, _)| c)
            .chain(&self.aux_coords)
            .find(|c| c.standard_name == name)
    }

    /// The dimension coordinate on `dim`, if any.
    pub fn dim_coord(&self, dim: usize) -> Option<&Coord> {
        self.dim_coords.iter().find(|&&(_, d)| d == dim).map(|(c, _)| c)
    }

    /// Auxiliary coordinates in insertion order.
    pub fn aux_coords(&self) -> &[Coord] {
        &self.aux_coords
    }

    /// Free-form attributes.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Mutable access to the attributes.
    pub fn attributes_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.attributes
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [rows, cols] = self.shape();
        let dim_name = |d| self.dim_coord(d).map_or("-- ", Coord::name);
        write!(f, "{} / ({})", self.name(), self.units().unwrap_or("unknown"))?;
        writeln!(f, " ({}: {rows}; {}: {cols})", dim_name(0), dim_name(1))?;
        for c in &self.aux_coords {
            match c.bounds() {
                Some(b) if c.len() == 1 => {
                    let (lo, hi) = (b[[0, 0]], b[[0, 1]]);
                    writeln!(f, "    {}: {} [{lo}, {hi}] {}", c.name(), c.points[0], c.units())?;
                }
                _ => writeln!(f, "    {}: {} points", c.name(), c.len())?,
            }
        }
        for (k, v) in &self.attributes {
            writeln!(f, "    {k}: {v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn grid(rows: usize, cols: usize) -> MaskedGrid {
        MaskedGrid::masked_greater(Array2::zeros((rows, cols)), 100, 255)
    }

    #[test]
    fn guess_bounds_uniform() {
        let mut c = Coord::new("longitude", "degrees", array![10.0, 20.0, 30.0, 40.0]);
        c.guess_bounds().unwrap();
        assert_eq!(
            c.bounds().unwrap(),
            array![[5.0, 15.0], [15.0, 25.0], [25.0, 35.0], [35.0, 45.0]]
        );
    }

    #[test]
    fn guess_bounds_decreasing() {
        let mut c = Coord::new("latitude", "degrees", array![2.0, 0.0]);
        c.guess_bounds().unwrap();
        assert_eq!(c.bounds().unwrap(), array![[3.0, 1.0], [1.0, -1.0]]);
    }

    #[test]
    fn guess_bounds_needs_two_points() {
        let mut c = Coord::new("time", "days", array![1.0]);
        assert!(matches!(c.guess_bounds(), Err(CubeError::TooFewPoints(_))));
    }

    #[test]
    fn set_bounds_checks_shape() {
        let mut c = Coord::new("x", "1", array![1.0, 2.0]);
        assert!(c.set_bounds(Array2::zeros((2, 3))).is_err());
        c.set_bounds(array![[0.5, 1.5], [1.5, 2.5]]).unwrap();
        assert_eq!(c.bounds().unwrap()[[1, 1]], 2.5);
    }

    #[test]
    fn dim_coords_are_checked() {
        let mut cube = Cube::new(grid(2, 3));
        let x = Coord::new("longitude", "degrees", array![0.0, 1.0, 2.0]);
        let y = Coord::new("latitude", "degrees", array![0.0, 1.0]);

        assert!(matches!(
            cube.add_dim_coord(y.clone(), 1),
            Err(CubeError::LengthMismatch { dim: 1, len: 2, expected: 3, .. })
        ));
        assert!(matches!(
            cube.add_dim_coord(x.clone(), 2),
            Err(CubeError::NoSuchDimension { dim: 2, ndim: 2 })
        ));
        assert!(matches!(
            cube.add_dim_coord(Coord::new("latitude", "degrees", array![1.0, 1.0]), 0),
            Err(CubeError::NotMonotonic(_))
        ));

        cube.add_dim_coord(x.clone(), 1).unwrap();
        cube.add_dim_coord(y, 0).unwrap();
        assert!(matches!(cube.add_dim_coord(x, 1), Err(CubeError::DimensionTaken(1))));
        assert_eq!(cube.dim_coord(0).unwrap().name(), "latitude");
        assert_eq!(cube.coord("longitude").unwrap().len(), 3);
    }

    #[test]
    fn scalar_coord_and_display() {
        let mut cube = Cube::new(grid(1, 2));
        cube.rename("FAPAR");
        cube.set_units("%");
        cube.add_aux_coord(Coord::scalar("time", "days since 0001-01-01", 3.0, [3.0, 9.0]));
        cube.attributes_mut().insert("source".into(), "here".into());

        let time = cube.coord("time").unwrap();
        assert_eq!(time.points(), &array![3.0]);
        assert_eq!(time.bounds().unwrap(), array![[3.0, 9.0]]);

        let text = cube.to_string();
        assert!(text.starts_with("FAPAR / (%)"));
        assert!(text.contains("time: 3 [3, 9] days since 0001-01-01"));
        assert!(text.contains("source: here"));
    }

    #[test]
    fn inverse_flattening() {
        let f = GeogCs::WGS84.inverse_flattening();
        assert!((f - 298.257223563).abs() < 1e-3);
    }
}
