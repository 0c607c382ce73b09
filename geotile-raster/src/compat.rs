//! Checks deciding whether datasets can be merged into one image.

use crate::Dataset;

/// True when both datasets share a projection. The same dataset is always
/// compatible with itself; a dataset without projection only matches
/// another without one.
pub fn compatible_dataset_projections(lhs: &Dataset, rhs: &Dataset) -> bool {
    if std::ptr::eq(lhs, rhs) {
        return true;
    }
    match (lhs.projection_ref(), rhs.projection_ref()) {
        (None, None) => true,
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => false,
    }
}

/// True when the datasets are pixel aligned: same projection, same size and
/// the same geo-transform, compared exactly. Datasets without transforms are
/// taken to be co-registered.
pub fn compatible_dataset_projections_transform_and_sizes(lhs: &Dataset, rhs: &Dataset) -> bool {
    if !compatible_dataset_projections(lhs, rhs) {
        return false;
    }
    if lhs.raster_x_size() != rhs.raster_x_size() || lhs.raster_y_size() != rhs.raster_y_size() {
        return false;
    }
    match (lhs.geo_transform(), rhs.geo_transform()) {
        (None, None) => true,
        #[allow(clippy::float_cmp)]
        (Some(lhs), Some(rhs)) => lhs.iter().zip(rhs.iter()).all(|(a, b)| a == b),
        _ => false,
    }
}

/// True when every element compares equal to the first under `compare`.
/// Empty and single element inputs are trivially equal.
pub fn all_equal<I, F>(items: I, mut compare: F) -> bool
where
    I: IntoIterator,
    F: FnMut(&I::Item, &I::Item) -> bool,
{
    let mut iter = items.into_iter();
    let Some(first) = iter.next() else {
        return true;
    };
    iter.all(|item| compare(&first, &item))
}
