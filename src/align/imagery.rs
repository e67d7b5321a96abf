//! Satellite imagery alignment.
//!
//! Reads one tile grid per date for a county from one or more imagery
//! stores and produces a tensor ordered (time, grid, channel, height, width).
//! An optional per-tile transform runs over the (time, grid) axes flattened
//! into a single batch axis.

use ndarray::{Array4, Array5, ArrayD, Axis, Ix4};

use super::{into_standard_layout, stack_blocks};
use crate::logging::{self, Modality};
use crate::model::{AlignError, GeoKey, Result};
use crate::store::ImageryStore;

/// Which date groups to read, and in what order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DateOrder {
    /// Every date of every store, stores in file order and dates in each
    /// store's native enumeration order.
    #[default]
    Native,
    /// Exactly these labels, in this order. Each is read from the first
    /// store that has it.
    Explicit(Vec<String>),
}

/// A transform over a batch of tiles shaped `(batch, channel, height, width)`.
///
/// The transform may change channel, height or width but must keep the batch
/// length. Closures `Fn(Array4<f32>) -> Array4<f32>` implement it directly.
pub trait TileTransform: Sync {
    fn apply(&self, tiles: Array4<f32>) -> Result<Array4<f32>>;
}

impl<F> TileTransform for F
where
    F: Fn(Array4<f32>) -> Array4<f32> + Sync,
{
    fn apply(&self, tiles: Array4<f32>) -> Result<Array4<f32>> {
        Ok(self(tiles))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageryAligner;

impl ImageryAligner {
    /// Aligns imagery for `geo_key` into `[time, grid, channel, height, width]`.
    ///
    /// Every store must hold a subtree for `geo_key` (`KeyNotFound`
    /// otherwise). All dates must share one (grid, height, width, channel)
    /// shape (`ShapeMismatch` otherwise).
    pub fn align<S: ImageryStore>(
        &self,
        stores: &[S],
        geo_key: &GeoKey,
        order: &DateOrder,
        transform: Option<&dyn TileTransform>,
    ) -> Result<Array5<f32>> {
        if let Some(store) = stores.iter().find(|s| !s.contains(geo_key)) {
            return Err(AlignError::KeyNotFound {
                key: geo_key.to_string(),
                origin: format!("imagery store '{}'", store.name()),
            });
        }

        let mut grids: Vec<Array4<f32>> = Vec::new();
        match order {
            DateOrder::Native => {
                for store in stores {
                    for date in store.date_labels(geo_key)? {
                        grids.push(read_tile_grid(store, geo_key, &date)?);
                    }
                }
            }
            DateOrder::Explicit(dates) => {
                for date in dates {
                    let mut holder = None;
                    for store in stores {
                        if store.has_date(geo_key, date)? {
                            holder = Some(store);
                            break;
                        }
                    }
                    let store = holder.ok_or_else(|| AlignError::KeyNotFound {
                        key: format!("{}/{}", geo_key, date),
                        origin: "imagery stores".to_string(),
                    })?;
                    grids.push(read_tile_grid(store, geo_key, date)?);
                }
            }
        }

        if let Some(first) = grids.first() {
            let expected = first.dim();
            if let Some((t, grid)) = grids.iter().enumerate().find(|(_, g)| g.dim() != expected) {
                return Err(AlignError::ShapeMismatch {
                    context: format!("imagery for {}, date index {}", geo_key, t),
                    detail: format!(
                        "expected (grid, height, width, channel) {:?}, got {:?}",
                        expected,
                        grid.dim()
                    ),
                });
            }
        }

        // (time, grid, height, width, channel) -> (time, grid, channel, height, width)
        let stacked = stack_blocks("imagery dates", &grids)?;
        let mut aligned = into_standard_layout(stacked.permuted_axes([0, 1, 4, 2, 3]));

        if let Some(transform) = transform {
            aligned = apply_tile_transform(aligned, transform)?;
        }

        logging::debug(
            Modality::Imagery,
            Some(geo_key.as_str()),
            &format!("aligned imagery to shape {:?}", aligned.shape()),
        );
        Ok(aligned)
    }
}

/// Reads one date and normalises it to (grid, height, width, channel).
/// A 3-D dataset is a single tile.
fn read_tile_grid<S: ImageryStore>(store: &S, geo_key: &GeoKey, date: &str) -> Result<Array4<f32>> {
    let raw: ArrayD<f32> = store.read_grid(geo_key, date)?;
    let raw = match raw.ndim() {
        3 => raw.insert_axis(Axis(0)),
        4 => raw,
        n => {
            return Err(AlignError::ShapeMismatch {
                context: format!("imagery for {}, date {}", geo_key, date),
                detail: format!("expected a 3-D or 4-D dataset, got {} dimensions", n),
            });
        }
    };
    raw.into_dimensionality::<Ix4>()
        .map_err(|e| AlignError::from_shape(format!("imagery for {}, date {}", geo_key, date), e))
}

/// Merges the (time, grid) axes into one batch axis: `(t*g, c, h, w)`.
///
/// This is a pure reshape of a row-major array; element order is unchanged.
pub fn flatten_time_grid(tiles: Array5<f32>) -> Result<Array4<f32>> {
    let (t, g, c, h, w) = tiles.dim();
    into_standard_layout(tiles)
        .into_shape((t * g, c, h, w))
        .map_err(|e| AlignError::from_shape("flattening (time, grid)", e))
}

/// Splits the batch axis back into `(time, grid)`. Fails if the batch length
/// is not `time * grid`.
pub fn restore_time_grid(tiles: Array4<f32>, time: usize, grid: usize) -> Result<Array5<f32>> {
    let (n, c, h, w) = tiles.dim();
    if n != time * grid {
        return Err(AlignError::ShapeMismatch {
            context: "restoring (time, grid)".to_string(),
            detail: format!("expected batch of {}x{}={}, got {}", time, grid, time * grid, n),
        });
    }
    into_standard_layout(tiles)
        .into_shape((time, grid, c, h, w))
        .map_err(|e| AlignError::from_shape("restoring (time, grid)", e))
}

/// Applies `transform` once to all tiles with (time, grid) flattened.
pub fn apply_tile_transform(tiles: Array5<f32>, transform: &dyn TileTransform) -> Result<Array5<f32>> {
    let (t, g, _, _, _) = tiles.dim();
    let batch = flatten_time_grid(tiles)?;
    let transformed = transform.apply(batch)?;
    restore_time_grid(transformed, t, g)
}
