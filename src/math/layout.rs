use ndarray::{Array2, ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{LossError, Result};

/// Where the class axis sits in a prediction tensor, and what a "unit" is.
///
/// - `Examples` — `[N]` (binary, one score per example) or `[N, C]`
/// - `Image`    — `[C, H, W]`, one unit per pixel
/// - `Batch`    — `[B, C, H, W]`, one unit per pixel of every image
///
/// Every loss in this crate works on *unit rows*: a `[U, C]` matrix holding
/// one class vector per unit. `unit_rows` and `from_rows` move between the
/// caller's layout and that matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Examples,
    Image,
    Batch,
}

impl Layout {
    /// Picks the layout conventionally used for a tensor of the given rank.
    pub fn infer(rank: usize) -> Result<Layout> {
        match rank {
            1 | 2 => Ok(Layout::Examples),
            3 => Ok(Layout::Image),
            4 => Ok(Layout::Batch),
            _ => Err(LossError::ShapeMismatch(format!(
                "cannot infer a layout for a rank-{rank} tensor (expected rank 1 to 4)"
            ))),
        }
    }

    pub fn check_rank(&self, rank: usize) -> Result<()> {
        let ok = match self {
            Layout::Examples => rank == 1 || rank == 2,
            Layout::Image => rank == 3,
            Layout::Batch => rank == 4,
        };
        if ok {
            Ok(())
        } else {
            Err(LossError::ShapeMismatch(format!(
                "{self:?} layout does not accept a rank-{rank} tensor"
            )))
        }
    }

    /// Class axis of a full-rank tensor in this layout. `None` for a rank-1
    /// `[N]` binary prediction, which has no explicit class axis.
    pub fn class_axis(&self, rank: usize) -> Option<usize> {
        match (self, rank) {
            (Layout::Examples, 1) => None,
            (Layout::Examples, _) => Some(1),
            (Layout::Image, _) => Some(0),
            (Layout::Batch, _) => Some(1),
        }
    }

    /// Shape of `shape` with its class axis removed.
    pub fn unit_shape(&self, shape: &[usize]) -> Result<Vec<usize>> {
        self.check_rank(shape.len())?;
        let mut units = shape.to_vec();
        if let Some(axis) = self.class_axis(shape.len()) {
            units.remove(axis);
        }
        Ok(units)
    }

    /// Full shape (class axis included) for the given unit shape.
    pub fn with_classes(&self, unit_shape: &[usize], classes: usize) -> Vec<usize> {
        let axis = match self {
            Layout::Examples => 1,
            Layout::Image => 0,
            Layout::Batch => 1,
        };
        let mut shape = unit_shape.to_vec();
        shape.insert(axis.min(shape.len()), classes);
        shape
    }

    /// Splits the units into `(groups, units_per_group)`.
    ///
    /// An image is one group; every example is its own group of one.
    pub fn groups(&self, unit_shape: &[usize]) -> (usize, usize) {
        let total: usize = unit_shape.iter().product();
        match self {
            Layout::Examples => (total, 1),
            Layout::Image => (1, total),
            Layout::Batch => {
                let images = unit_shape.first().copied().unwrap_or(0);
                let per_image: usize = unit_shape.iter().skip(1).product();
                (images, per_image)
            }
        }
    }

    /// Axis order that moves the class axis last.
    fn class_last(&self, rank: usize) -> Vec<usize> {
        match (self, rank) {
            (Layout::Image, _) => vec![1, 2, 0],
            (Layout::Batch, _) => vec![0, 2, 3, 1],
            _ => (0..rank).collect(),
        }
    }

    /// Inverse of `class_last`, applied to a tensor whose class axis is last.
    fn class_back(&self, rank: usize) -> Vec<usize> {
        match (self, rank) {
            (Layout::Image, _) => vec![2, 0, 1],
            (Layout::Batch, _) => vec![0, 3, 1, 2],
            _ => (0..rank).collect(),
        }
    }

    /// Flattens a tensor in this layout into `[units, classes]`, units in
    /// row-major order of the unit shape (image-major for `Batch`).
    pub fn unit_rows<A: Clone>(&self, values: ArrayViewD<'_, A>) -> Result<Array2<A>> {
        let rank = values.ndim();
        self.check_rank(rank)?;

        let channels = match self.class_axis(rank) {
            Some(axis) => values.shape()[axis],
            None => 1,
        };
        if channels == 0 {
            return Err(LossError::ShapeMismatch("class axis has length 0".into()));
        }
        let units = values.len() / channels;

        let moved = values.permuted_axes(self.class_last(rank).as_slice());
        let rows = moved
            .as_standard_layout()
            .into_owned()
            .into_shape((units, channels))?;
        Ok(rows)
    }

    /// Rebuilds a tensor in this layout from `[units, classes]` rows.
    pub fn from_rows<A: Clone>(&self, rows: Array2<A>, unit_shape: &[usize]) -> Result<ArrayD<A>> {
        let classes = rows.ncols();
        let mut class_last = unit_shape.to_vec();
        class_last.push(classes);
        let rank = class_last.len();
        self.check_rank(rank)?;

        let stacked = rows.into_shape(IxDyn(&class_last))?;
        let restored = stacked.permuted_axes(self.class_back(rank).as_slice());
        Ok(restored.as_standard_layout().into_owned())
    }
}
