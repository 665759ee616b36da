use ndarray::{Array2, ArrayView2};
use thiserror::Error;

/// An error building a [`MaskedGrid`].
#[derive(Debug, Error)]
pub enum MaskError {
    /// Data and mask have different shapes.
    #[error("mask shape {mask:?} does not match data shape {data:?}")]
    ShapeMismatch {
        /// Shape of the data array.
        data: [usize; 2],
        /// Shape of the mask array.
        mask: [usize; 2],
    },
}

/// A 2-D byte array with a validity mask and a fill value.
///
/// A cell is invalid ("masked") where the mask is `true`. The stored byte of a
/// masked cell is kept untouched; [`filled`](Self::filled) substitutes the
/// fill value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskedGrid {
    data: Array2<u8>,
    mask: Array2<bool>,
    fill_value: u8,
}

impl MaskedGrid {
    /// Creates a grid from data and an explicit mask.
    pub fn new(data: Array2<u8>, mask: Array2<bool>, fill_value: u8) -> Result<Self, MaskError> {
        if data.dim() != mask.dim() {
            let (dr, dc) = data.dim();
            let (mr, mc) = mask.dim();
            return Err(MaskError::ShapeMismatch { data: [dr, dc], mask: [mr, mc] });
        }
        Ok(Self { data, mask, fill_value })
    }

    /// Masks every cell whose value is greater than `max`.
    ///
    /// ```
    /// use abf::MaskedGrid;
    /// use ndarray::array;
    ///
    /// let grid = MaskedGrid::masked_greater(array![[0, 100], [101, 255]], 100, 255);
    /// assert_eq!(grid.get([0, 1]), Some(100));
    /// assert_eq!(grid.get([1, 0]), None);
    /// assert_eq!(grid.count_masked(), 2);
    /// ```
    pub fn masked_greater(data: Array2<u8>, max: u8, fill_value: u8) -> Self {
        let mask = data.mapv(|v| v > max);
        Self { data, mask, fill_value }
    }

    /// Number of rows and columns.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Raw stored values, masked cells included.
    pub fn data(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }

    /// The mask; `true` marks an invalid cell.
    pub fn mask(&self) -> ArrayView2<'_, bool> {
        self.mask.view()
    }

    /// The value reported for masked cells by [`filled`](Self::filled).
    pub fn fill_value(&self) -> u8 {
        self.fill_value
    }

    /// Replaces the fill value.
    pub fn set_fill_value(&mut self, fill_value: u8) {
        self.fill_value = fill_value;
    }

    /// Returns the value at `index`, or `None` when the cell is masked or out
    /// of range.
    pub fn get(&self, index: [usize; 2]) -> Option<u8> {
        match self.mask.get(index).copied() {
            Some(false) => self.data.get(index).copied(),
            _ => None,
        }
    }

    /// Whether the cell at `index` is masked. Out-of-range indices are not.
    pub fn is_masked(&self, index: [usize; 2]) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }

    /// Number of masked cells.
    pub fn count_masked(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// A copy of the data with every masked cell set to the fill value.
    pub fn filled(&self) -> Array2<u8> {
        let mut out = self.data.clone();
        out.zip_mut_with(&self.mask, |v, &m| {
            if m {
                *v = self.fill_value;
            }
        });
        out
    }

    /// Consumes the grid, returning data, mask and fill value.
    pub fn into_parts(self) -> (Array2<u8>, Array2<bool>, u8) {
        (self.data, self.mask, self.fill_value)
    }
}
