use ndarray::{Array1, ArrayD, ArrayView1, ArrayViewD, Axis};

use crate::error::{LossError, Result};

/// Arithmetic mean over every unit. Never a sum: the scale of the loss does
/// not depend on image or batch size.
pub fn flat_mean(per_unit: ArrayViewD<'_, f64>) -> Result<f64> {
    per_unit
        .mean()
        .ok_or_else(|| LossError::ShapeMismatch("cannot average an empty loss tensor".into()))
}

/// Mean of each group of `units_per_group` consecutive units.
pub fn per_image_means(per_unit: ArrayView1<'_, f64>, groups: usize, units_per_group: usize) -> Result<Array1<f64>> {
    if groups * units_per_group != per_unit.len() || units_per_group == 0 {
        return Err(LossError::ShapeMismatch(format!(
            "{} unit losses cannot be split into {groups} groups of {units_per_group}",
            per_unit.len()
        )));
    }
    let grid = per_unit.into_shape((groups, units_per_group))?;
    grid.mean_axis(Axis(1))
        .ok_or_else(|| LossError::ShapeMismatch("no units per image".into()))
}

/// Mean over per-image means. Equals `flat_mean` when all images have the
/// same number of units.
pub fn batch_mean(per_image: ArrayView1<'_, f64>) -> Result<f64> {
    per_image
        .mean()
        .ok_or_else(|| LossError::ShapeMismatch("batch holds no images".into()))
}

/// Flat mean over images of different sizes.
///
/// This is the canonical reduction for ragged batches: every unit weighs the
/// same, whatever the size of the image it came from.
pub fn ragged_mean(images: &[ArrayD<f64>]) -> Result<f64> {
    let units: usize = images.iter().map(|img| img.len()).sum();
    if units == 0 {
        return Err(LossError::ShapeMismatch("ragged batch holds no units".into()));
    }
    let total: f64 = images.iter().map(|img| img.sum()).sum();
    Ok(total / units as f64)
}

/// Mean of per-image means over a ragged batch. Small images weigh as much
/// as large ones, so this differs from `ragged_mean`; kept for comparison.
pub fn mean_of_means(images: &[ArrayD<f64>]) -> Result<f64> {
    let means = images
        .iter()
        .map(|img| flat_mean(img.view()))
        .collect::<Result<Array1<f64>>>()?;
    batch_mean(means.view())
}

/// Share of the summed loss carried by each unit; all zeros when the sum is 0.
pub fn contributions(per_unit: ArrayViewD<'_, f64>) -> ArrayD<f64> {
    let total = per_unit.sum();
    if total == 0.0 {
        return ArrayD::zeros(per_unit.raw_dim());
    }
    per_unit.mapv(|l| l / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn nested_mean_equals_flat_mean_for_equal_images() {
        let per_unit = array![1.0, 2.0, 3.0, 4.0, 10.0, 0.0];
        let per_image = per_image_means(per_unit.view(), 2, 3).unwrap();
        assert_eq!(per_image, array![2.0, 14.0 / 3.0]);
        let nested = batch_mean(per_image.view()).unwrap();
        let flat = flat_mean(per_unit.view().into_dyn()).unwrap();
        assert!((nested - flat).abs() < 1e-12);
    }

    #[test]
    fn ragged_batches_use_the_flat_mean() {
        let images = vec![array![1.0].into_dyn(), array![3.0, 3.0, 3.0].into_dyn()];
        assert_eq!(ragged_mean(&images).unwrap(), 2.5);
        assert_eq!(mean_of_means(&images).unwrap(), 2.0);
        assert!(ragged_mean(&[]).is_err());
    }

    #[test]
    fn bad_grouping_is_rejected() {
        let per_unit = array![1.0, 2.0, 3.0];
        assert!(matches!(per_image_means(per_unit.view(), 2, 2), Err(LossError::ShapeMismatch(_))));
        assert!(flat_mean(ArrayD::<f64>::zeros(ndarray::IxDyn(&[0])).view()).is_err());
    }

    #[test]
    fn contributions_sum_to_one() {
        let shares = contributions(array![1.0, 3.0].into_dyn().view());
        assert_eq!(shares, array![0.25, 0.75].into_dyn());
        let none = contributions(array![0.0, 0.0].into_dyn().view());
        assert_eq!(none.sum(), 0.0);
    }
}
