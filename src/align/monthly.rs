//! Monthly weather alignment.
//!
//! Long-term weather context is supplied as a sequence of buckets, each a
//! multi-year lookback window whose source files were concatenated into one
//! table. Every bucket becomes a (month, flattened-variable) block and the
//! blocks are stacked into (bucket, month, flattened-variable).

use std::collections::BTreeMap;

use ndarray::{Array2, Array3};

use super::stack_blocks;
use crate::logging::{self, Modality};
use crate::model::{AlignError, GeoKey, RawRecord, RawRecordTable, Result, TemporalGranularity};
use crate::schema::VariableSchema;

#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyWeatherAligner;

impl MonthlyWeatherAligner {
    /// Aligns bucketed monthly rows for `geo_key` into
    /// `[bucket, month, flattened-variable]`.
    ///
    /// All buckets must produce the same (month, flattened) shape.
    pub fn align<S: AsRef<str>>(
        &self,
        buckets: &[RawRecordTable],
        geo_key: &GeoKey,
        variables: &[S],
    ) -> Result<Array3<f32>> {
        let mut blocks: Vec<Array2<f32>> = Vec::with_capacity(buckets.len());
        for (b, table) in buckets.iter().enumerate() {
            let block = self.align_bucket(table, geo_key, variables)?;
            if let Some(first) = blocks.first() {
                if first.dim() != block.dim() {
                    return Err(AlignError::ShapeMismatch {
                        context: format!("monthly weather for {}, bucket {}", geo_key, b),
                        detail: format!("expected {:?}, got {:?}", first.dim(), block.dim()),
                    });
                }
            }
            blocks.push(block);
        }

        let aligned = stack_blocks("monthly weather buckets", &blocks)?;
        logging::debug(
            Modality::Monthly,
            Some(geo_key.as_str()),
            &format!("aligned monthly weather to shape {:?}", aligned.shape()),
        );
        Ok(aligned)
    }

    /// Aligns one bucket into `[month, flattened-variable]`.
    ///
    /// Months ascend. Within a month, rows are ordered by grid cell (rows
    /// without one first, ties in table order) and flattened row-major, so a
    /// month with `r` rows and `v` variables contributes `r * v` values.
    pub fn align_bucket<S: AsRef<str>>(
        &self,
        table: &RawRecordTable,
        geo_key: &GeoKey,
        variables: &[S],
    ) -> Result<Array2<f32>> {
        let schema = VariableSchema::resolve(&table.columns, variables)?;

        let mut months: BTreeMap<u8, Vec<&RawRecord>> = BTreeMap::new();
        for record in table.rows_for(geo_key, TemporalGranularity::Monthly) {
            if let Some(month) = record.month {
                months.entry(month).or_default().push(record);
            }
        }

        if months.is_empty() {
            return Err(AlignError::KeyNotFound {
                key: geo_key.to_string(),
                origin: "monthly weather rows".to_string(),
            });
        }

        let month_count = months.len();
        let mut width = None;
        let mut flat = Vec::new();
        for (month, mut rows) in months {
            rows.sort_by(|a, b| a.grid.cmp(&b.grid));

            let start = flat.len();
            for record in rows {
                schema.project_into(record, &mut flat)?;
            }
            let month_width = flat.len() - start;

            match width {
                None => width = Some(month_width),
                Some(expected) if expected != month_width => {
                    return Err(AlignError::ShapeMismatch {
                        context: format!("monthly weather for {}, month {}", geo_key, month),
                        detail: format!("expected {} values, got {}", expected, month_width),
                    });
                }
                Some(_) => {}
            }
        }

        let width = width.unwrap_or(0);
        Array2::from_shape_vec((month_count, width), flat)
            .map_err(|e| AlignError::from_shape("monthly weather bucket", e))
    }
}
