//! Crop yield alignment.
//!
//! Selects a county's yearly USDA rows by state and county ANSI code, takes
//! the crop's measurement columns and returns their natural logarithm as a
//! flat vector.

use ndarray::Array1;

use crate::logging::{self, Modality};
use crate::model::{
    AlignError, COUNTY_CODE_WIDTH, RawRecordTable, Result, STATE_CODE_WIDTH, TemporalGranularity,
    pad_code,
};
use crate::schema::VariableSchema;

/// Natural log of a strictly positive measurement, taken in `f64` and
/// narrowed afterwards.
///
/// Zero, negative, NaN and infinite inputs are `InvalidDomain`; no NaN or
/// infinity is ever produced.
pub fn log_positive(value: f64, column: &str) -> Result<f32> {
    if value > 0.0 && value.is_finite() {
        Ok(value.ln() as f32)
    } else {
        Err(AlignError::InvalidDomain {
            value,
            column: column.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YieldAligner;

impl YieldAligner {
    /// Aligns yield rows into a 1-D vector of `ln(value)`.
    ///
    /// `state_code` and `county_code` may arrive unpadded (`"6"`, `"37"`);
    /// both are zero-padded before comparison. Matching rows are flattened
    /// row-major over `measurement_columns`.
    pub fn align<S: AsRef<str>>(
        &self,
        table: &RawRecordTable,
        state_code: &str,
        county_code: &str,
        measurement_columns: &[S],
    ) -> Result<Array1<f32>> {
        let state = pad_code(state_code, STATE_CODE_WIDTH);
        let county = pad_code(county_code, COUNTY_CODE_WIDTH);
        let schema = VariableSchema::resolve(&table.columns, measurement_columns)?;

        let mut values = Vec::new();
        let mut matched = 0usize;
        for record in table.rows.iter().filter(|r| {
            r.granularity == TemporalGranularity::Yearly
                && r.geo_key.state_code() == state
                && r.geo_key.county_code() == county
        }) {
            matched += 1;
            for (column, value) in schema.names().iter().zip(schema.project_raw(record)?) {
                values.push(log_positive(value, column)?);
            }
        }

        let key = format!("{}{}", state, county);
        if matched == 0 {
            return Err(AlignError::KeyNotFound {
                key,
                origin: "yield rows".to_string(),
            });
        }

        logging::debug(
            Modality::Yield,
            Some(key.as_str()),
            &format!("aligned {} yield rows into {} values", matched, values.len()),
        );
        Ok(Array1::from(values))
    }
}
