//! Daily weather alignment.
//!
//! Daily HRRR rows arrive unordered, one per (month, grid cell, day). The
//! aligner groups them by month and grid cell, keeps the first 28 days of
//! each month so every month has the same day-axis length, and produces a
//! tensor ordered (month, day, grid, variable).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ndarray::{Array3, Array4, ArrayView1, s};

use super::{into_standard_layout, stack_blocks};
use crate::logging::{self, Modality};
use crate::model::{
    AlignError, DAY_WINDOW_LEN, GeoKey, GridCell, RawRecord, RawRecordTable, Result,
    TemporalGranularity, in_day_window,
};
use crate::schema::VariableSchema;

/// Orders rows by day-of-month with rows lacking a day placed first.
///
/// Used with a stable sort, so rows sharing a day keep their table order.
pub fn compare_days(a: Option<u8>, b: Option<u8>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DailyWeatherAligner;

impl DailyWeatherAligner {
    /// Aligns daily rows for `geo_key` into `[month, day(28), grid, variable]`.
    ///
    /// Months ascend; grid cells follow `GridCell` order; variables follow
    /// the caller's order. Every (month, grid) partition must hold exactly one
    /// row for each day 1..=28 and every month the same number of grid cells,
    /// otherwise the call fails with `ShapeMismatch`. Rows without a
    /// month or grid id cannot be placed and are dropped.
    pub fn align<S: AsRef<str>>(
        &self,
        table: &RawRecordTable,
        geo_key: &GeoKey,
        variables: &[S],
    ) -> Result<Array4<f32>> {
        let schema = VariableSchema::resolve(&table.columns, variables)?;

        let mut months: BTreeMap<u8, BTreeMap<&GridCell, Vec<&RawRecord>>> = BTreeMap::new();
        for record in table.rows_for(geo_key, TemporalGranularity::Daily) {
            let (Some(month), Some(grid)) = (record.month, record.grid.as_ref()) else {
                continue;
            };
            months
                .entry(month)
                .or_default()
                .entry(grid)
                .or_default()
                .push(record);
        }

        if months.is_empty() {
            return Err(AlignError::KeyNotFound {
                key: geo_key.to_string(),
                origin: "daily weather rows".to_string(),
            });
        }

        let grid_count = months.values().next().map_or(0, |grids| grids.len());
        let mut blocks = Vec::with_capacity(months.len());
        for (month, grids) in months {
            if grids.len() != grid_count {
                return Err(AlignError::ShapeMismatch {
                    context: format!("daily weather for {}, month {}", geo_key, month),
                    detail: format!("expected {} grid cells, got {}", grid_count, grids.len()),
                });
            }
            blocks.push(month_block(geo_key, month, grids, &schema)?);
        }

        // Grouping yields (month, grid, day, variable); swap day and grid.
        let stacked = stack_blocks("daily weather months", &blocks)?;
        let aligned = into_standard_layout(stacked.permuted_axes([0, 2, 1, 3]));

        logging::debug(
            Modality::Daily,
            Some(geo_key.as_str()),
            &format!("aligned daily weather to shape {:?}", aligned.shape()),
        );
        Ok(aligned)
    }
}

/// Builds the (grid, day, variable) block for one month.
fn month_block(
    geo_key: &GeoKey,
    month: u8,
    grids: BTreeMap<&GridCell, Vec<&RawRecord>>,
    schema: &VariableSchema,
) -> Result<Array3<f32>> {
    let mut block = Array3::<f32>::zeros((grids.len(), DAY_WINDOW_LEN, schema.len()));

    for (g, (grid, mut rows)) in grids.into_iter().enumerate() {
        rows.sort_by(|a, b| compare_days(a.day, b.day));
        let days: Vec<&RawRecord> = rows
            .into_iter()
            .filter(|r| r.day.is_some_and(in_day_window))
            .collect();

        if days.len() != DAY_WINDOW_LEN {
            return Err(AlignError::ShapeMismatch {
                context: format!("daily weather for {}, month {}, grid {}", geo_key, month, grid),
                detail: format!("expected {} days, got {}", DAY_WINDOW_LEN, days.len()),
            });
        }

        // Sorted and in-window, so slot d must hold day d+1.
        if let Some(d) = (0..days.len()).find(|&d| days[d].day != Some(d as u8 + 1)) {
            let detail = if d > 0 && days[d].day == days[d - 1].day {
                format!("duplicate day {}", days[d].day.unwrap_or_default())
            } else {
                format!("missing day {}", d + 1)
            };
            return Err(AlignError::ShapeMismatch {
                context: format!("daily weather for {}, month {}, grid {}", geo_key, month, grid),
                detail,
            });
        }

        for (d, record) in days.into_iter().enumerate() {
            let values = schema.project(record)?;
            block
                .slice_mut(s![g, d, ..])
                .assign(&ArrayView1::from(values.as_slice()));
        }
    }

    Ok(block)
}
