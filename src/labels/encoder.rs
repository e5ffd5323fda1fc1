use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Axis, IxDyn};

use crate::error::{LossError, Result};
use crate::math::layout::Layout;

/// Ground truth for a prediction.
///
/// - `Indices` — one class id per unit; shape = prediction shape minus the
///   class axis.
/// - `OneHot`  — prediction shape with a class axis of length `classes`
///   (length 2 for binary predictions), exactly one `1` per unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Indices(ArrayD<usize>),
    OneHot(ArrayD<f64>),
}

impl Target {
    pub fn indices(values: ArrayD<usize>) -> Target {
        Target::Indices(values)
    }

    pub fn one_hot(values: ArrayD<f64>) -> Target {
        Target::OneHot(values)
    }

    /// Validates the target against the prediction's unit shape and class
    /// count, and returns the true class of every unit in unit-row order.
    pub fn true_classes(&self, layout: Layout, unit_shape: &[usize], classes: usize) -> Result<Array1<usize>> {
        match self {
            Target::Indices(ids) => {
                if ids.shape() != unit_shape {
                    return Err(LossError::ShapeMismatch(format!(
                        "index target has shape {:?}, prediction units are {:?}",
                        ids.shape(),
                        unit_shape
                    )));
                }
                let flat: Array1<usize> = ids.iter().copied().collect();
                check_range(flat.view(), classes)?;
                Ok(flat)
            }
            Target::OneHot(hot) => {
                let expected = layout.with_classes(unit_shape, classes);
                if hot.shape() != expected.as_slice() {
                    return Err(LossError::ShapeMismatch(format!(
                        "one-hot target has shape {:?}, expected {:?}",
                        hot.shape(),
                        expected
                    )));
                }
                let rows = layout.unit_rows(hot.view())?;
                validate_one_hot(rows.view())
            }
        }
    }
}

fn check_range(ids: ArrayView1<'_, usize>, classes: usize) -> Result<()> {
    match ids.iter().enumerate().find(|(_, id)| **id >= classes) {
        Some((unit, id)) => Err(LossError::InvalidLabel(format!(
            "unit {unit} has class {id}, outside [0, {}]",
            classes.saturating_sub(1)
        ))),
        None => Ok(()),
    }
}

/// One-hot encodes a class id per unit into `[units, classes]` rows.
pub fn encode(ids: ArrayView1<'_, usize>, classes: usize) -> Result<Array2<f64>> {
    check_range(ids, classes)?;
    let mut rows = Array2::zeros((ids.len(), classes));
    for (mut row, &id) in rows.axis_iter_mut(Axis(0)).zip(ids.iter()) {
        row[id] = 1.0;
    }
    Ok(rows)
}

/// Argmax along the class axis of each row; the first maximum wins.
pub fn decode(rows: ArrayView2<'_, f64>) -> Array1<usize> {
    rows.axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(best, max), (i, &v)| {
                    if v > max { (i, v) } else { (best, max) }
                })
                .0
        })
        .collect()
}

/// Checks that every row is exactly one `1` with `0` elsewhere and returns
/// the position of the `1`.
pub fn validate_one_hot(rows: ArrayView2<'_, f64>) -> Result<Array1<usize>> {
    let mut ids = Array1::zeros(rows.nrows());
    for (unit, row) in rows.axis_iter(Axis(0)).enumerate() {
        let mut hot = None;
        for (class, &v) in row.iter().enumerate() {
            if v == 1.0 && hot.is_none() {
                hot = Some(class);
            } else if v != 0.0 {
                return Err(LossError::InvalidLabel(format!(
                    "one-hot row for unit {unit} is not a single 1 among 0s: {row}"
                )));
            }
        }
        ids[unit] = hot.ok_or_else(|| {
            LossError::InvalidLabel(format!("one-hot row for unit {unit} has no 1"))
        })?;
    }
    Ok(ids)
}

/// Encodes an index target into a one-hot tensor in `layout`.
pub fn encode_target(ids: &ArrayD<usize>, layout: Layout, classes: usize) -> Result<ArrayD<f64>> {
    let flat: Array1<usize> = ids.iter().copied().collect();
    let rows = encode(flat.view(), classes)?;
    layout.from_rows(rows, ids.shape())
}

/// Argmax-decodes a one-hot (or probability) tensor in `layout` back to
/// class ids shaped like the units.
pub fn decode_target(hot: &ArrayD<f64>, layout: Layout) -> Result<ArrayD<usize>> {
    let unit_shape = layout.unit_shape(hot.shape())?;
    let rows = layout.unit_rows(hot.view())?;
    Ok(decode(rows.view()).into_shape(IxDyn(&unit_shape))?)
}
