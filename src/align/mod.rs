//! Aligners: pure transforms from raw records to fixed-axis-order tensors.
//!
//! Submodules:
//! - `daily`: daily weather rows → (month, day, grid, variable).
//! - `monthly`: bucketed monthly weather rows → (bucket, month, flattened).
//! - `imagery`: per-date tile grids → (time, grid, channel, height, width).
//! - `crop_yield`: yearly USDA rows → log-transformed measurement vector.
//!
//! Aligners hold no state and borrow their inputs; every call either returns
//! a fully shaped array or an error.

pub mod crop_yield;
pub mod daily;
pub mod imagery;
pub mod monthly;

pub use crop_yield::YieldAligner;
pub use daily::DailyWeatherAligner;
pub use imagery::{DateOrder, ImageryAligner, TileTransform};
pub use monthly::MonthlyWeatherAligner;

use ndarray::{Array, ArrayView, Axis, Dimension, RemoveAxis};

use crate::model::{AlignError, Result};

/// Stacks equally shaped blocks along a new leading axis.
///
/// Callers check cardinalities first so they can report which group was
/// ragged; the shape error here is a backstop.
pub(crate) fn stack_blocks<D>(context: &str, blocks: &[Array<f32, D>]) -> Result<Array<f32, D::Larger>>
where
    D: Dimension,
    D::Larger: RemoveAxis,
{
    if blocks.is_empty() {
        return Err(AlignError::ShapeMismatch {
            context: context.to_string(),
            detail: "nothing to stack".to_string(),
        });
    }
    let views: Vec<ArrayView<f32, D>> = blocks.iter().map(|b| b.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|e| AlignError::from_shape(context, e))
}

/// Returns `array` in row-major standard layout, copying only if needed.
pub(crate) fn into_standard_layout<D: Dimension>(array: Array<f32, D>) -> Array<f32, D> {
    if array.is_standard_layout() {
        array
    } else {
        array.as_standard_layout().into_owned()
    }
}
