/// Core data types for the CropNet alignment crate.
///
/// This module defines the shared domain model imported by all other modules:
/// geographic keys, the raw record table every tabular aligner consumes, and
/// the error type every aligner returns. It performs no I/O.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// County FIPS code column in the HRRR weather tables.
pub const COL_FIPS: &str = "FIPS Code";

/// Granularity discriminator column; values are `"Daily"` or `"Monthly"`.
pub const COL_GRANULARITY: &str = "Daily/Monthly";

pub const COL_MONTH: &str = "Month";
pub const COL_DAY: &str = "Day";
pub const COL_GRID: &str = "Grid Index";

/// State and county ANSI code columns in the USDA yield tables.
pub const COL_STATE_ANSI: &str = "state_ansi";
pub const COL_COUNTY_ANSI: &str = "county_ansi";

/// Name of the pixel dataset stored under each date group of an imagery store.
pub const IMAGERY_DATASET: &str = "data";

// ---------------------------------------------------------------------------
// Code widths and the day window
// ---------------------------------------------------------------------------

pub const GEO_KEY_WIDTH: usize = 5;
pub const STATE_CODE_WIDTH: usize = 2;
pub const COUNTY_CODE_WIDTH: usize = 3;

/// Length of the canonical day axis. Only days 1..=28 of each month are kept
/// so every month contributes the same number of daily rows.
pub const DAY_WINDOW_LEN: usize = 28;

/// Returns `true` if `day` lies inside the canonical day window (1..=28).
pub fn in_day_window(day: u8) -> bool {
    (1..=DAY_WINDOW_LEN as u8).contains(&day)
}

/// Left-pads a numeric code with zeros to `width` characters.
///
/// Source tables frequently store codes as integers, dropping leading zeros
/// (`3` instead of `"003"`). Padding is idempotent and never truncates:
/// codes already at or beyond `width` are returned trimmed but otherwise
/// unchanged.
pub fn pad_code(code: &str, width: usize) -> String {
    let trimmed = code.trim();
    format!("{:0>width$}", trimmed, width = width)
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A 5-character zero-padded county FIPS code, e.g. `"06037"`.
///
/// The first two characters are the state ANSI code and the last three the
/// county ANSI code. Equality is exact string equality on the padded form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoKey(String);

impl GeoKey {
    /// Builds a key from a possibly unpadded FIPS code (`"1003"` → `"01003"`).
    pub fn new(code: &str) -> Self {
        GeoKey(pad_code(code, GEO_KEY_WIDTH))
    }

    /// Builds a key from separate state and county codes, padding each.
    pub fn from_parts(state_code: &str, county_code: &str) -> Self {
        GeoKey(format!(
            "{}{}",
            pad_code(state_code, STATE_CODE_WIDTH),
            pad_code(county_code, COUNTY_CODE_WIDTH)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn state_code(&self) -> &str {
        self.0.get(..STATE_CODE_WIDTH).unwrap_or("")
    }

    pub fn county_code(&self) -> &str {
        self.0.get(STATE_CODE_WIDTH..).unwrap_or("")
    }
}

impl fmt::Display for GeoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sampling granularity of a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalGranularity {
    Daily,
    Monthly,
    Yearly,
}

impl TemporalGranularity {
    /// Parses the weather discriminator column. Matching is exact and
    /// case-sensitive; `"daily"` is not a daily row.
    pub fn from_discriminator(value: &str) -> Option<Self> {
        match value {
            "Daily" => Some(TemporalGranularity::Daily),
            "Monthly" => Some(TemporalGranularity::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for TemporalGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalGranularity::Daily => write!(f, "Daily"),
            TemporalGranularity::Monthly => write!(f, "Monthly"),
            TemporalGranularity::Yearly => write!(f, "Yearly"),
        }
    }
}

/// Identifier of one weather grid cell inside a county.
///
/// Cells order numerically when both ids are unsigned integers (`"2" < "10"`)
/// and lexically otherwise; numeric ids sort before non-numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridCell(String);

impl GridCell {
    pub fn new(id: &str) -> Self {
        GridCell(id.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for GridCell {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for GridCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One row of a raw weather or yield table.
///
/// `values` is parallel to the owning table's `columns`; `None` marks an
/// empty or non-numeric cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub geo_key: GeoKey,
    pub granularity: TemporalGranularity,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub grid: Option<GridCell>,
    pub values: Vec<Option<f64>>,
}

/// An unordered table of raw records sharing one set of variable columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecordTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawRecordTable {
    pub fn new(columns: Vec<String>) -> Self {
        RawRecordTable {
            columns: columns.into_iter().map(|c| c.trim().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a record, rejecting one whose value count does not match the
    /// table's columns.
    pub fn push(&mut self, record: RawRecord) -> Result<()> {
        if record.values.len() != self.columns.len() {
            return Err(AlignError::ShapeMismatch {
                context: format!("record for {}", record.geo_key),
                detail: format!(
                    "expected {} values, got {}",
                    self.columns.len(),
                    record.values.len()
                ),
            });
        }
        self.rows.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for one county at one granularity, in table order.
    pub fn rows_for<'a>(
        &'a self,
        geo_key: &'a GeoKey,
        granularity: TemporalGranularity,
    ) -> impl Iterator<Item = &'a RawRecord> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.granularity == granularity && &r.geo_key == geo_key)
    }

    /// Concatenates tables in order. The result carries the union of all
    /// columns in first-seen order; cells a source table lacks become `None`.
    pub fn concat(tables: Vec<RawRecordTable>) -> RawRecordTable {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.len()).sum());
        for table in tables {
            let mapping: Vec<Option<usize>> = columns
                .iter()
                .map(|c| table.columns.iter().position(|own| own == c))
                .collect();
            for mut record in table.rows {
                let values = mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| record.values.get(i).copied().flatten()))
                    .collect();
                record.values = values;
                rows.push(record);
            }
        }

        RawRecordTable { columns, rows }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while ingesting raw records or aligning them into tensors.
///
/// The first four variants are the alignment failures; the rest come from the
/// ingest and configuration layers. No variant is ever recovered internally.
#[derive(Debug, Error)]
pub enum AlignError {
    /// A requested variable column is absent, or empty in a selected row.
    #[error("missing variable '{variable}'")]
    MissingVariable { variable: String },

    /// Group cardinalities are inconsistent so the groups cannot be stacked.
    #[error("shape mismatch in {context}: {detail}")]
    ShapeMismatch { context: String, detail: String },

    /// The geographic key (or a date label under it) is absent from a source.
    #[error("key '{key}' not found in {origin}")]
    KeyNotFound { key: String, origin: String },

    /// Log transform applied to a non-positive value.
    #[error("value {value} in column '{column}' is outside the log domain")]
    InvalidDomain { value: f64, column: String },

    /// A cell or header could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// The imagery store backend failed.
    #[error("imagery store error: {0}")]
    Store(String),
}

impl AlignError {
    /// Wraps an ndarray shape error raised while stacking or reshaping.
    pub fn from_shape(context: impl Into<String>, err: ndarray::ShapeError) -> Self {
        AlignError::ShapeMismatch {
            context: context.into(),
            detail: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fips: &str, values: Vec<Option<f64>>) -> RawRecord {
        RawRecord {
            geo_key: GeoKey::new(fips),
            granularity: TemporalGranularity::Daily,
            month: Some(1),
            day: Some(1),
            grid: Some(GridCell::new("1")),
            values,
        }
    }

    #[test]
    fn test_pad_code_is_idempotent() {
        assert_eq!(pad_code("3", 3), "003");
        assert_eq!(pad_code("003", 3), "003");
        assert_eq!(pad_code(&pad_code("3", 3), 3), "003");
        assert_eq!(pad_code(" 17 ", 2), "17");
    }

    #[test]
    fn test_pad_code_never_truncates() {
        assert_eq!(pad_code("123456", 5), "123456");
    }

    #[test]
    fn test_geo_key_keeps_leading_zeros() {
        let key = GeoKey::new("1003");
        assert_eq!(key.as_str(), "01003");
        assert_eq!(key, GeoKey::new("01003"));
        assert_ne!(key.as_str(), "1003");
    }

    #[test]
    fn test_geo_key_parts() {
        let key = GeoKey::from_parts("6", "37");
        assert_eq!(key.as_str(), "06037");
        assert_eq!(key.state_code(), "06");
        assert_eq!(key.county_code(), "037");
    }

    #[test]
    fn test_granularity_discriminator_is_case_sensitive() {
        assert_eq!(
            TemporalGranularity::from_discriminator("Daily"),
            Some(TemporalGranularity::Daily)
        );
        assert_eq!(
            TemporalGranularity::from_discriminator("Monthly"),
            Some(TemporalGranularity::Monthly)
        );
        assert_eq!(TemporalGranularity::from_discriminator("daily"), None);
        assert_eq!(TemporalGranularity::from_discriminator("Daily "), None);
    }

    #[test]
    fn test_grid_cells_order_numerically() {
        let mut cells = vec![
            GridCell::new("10"),
            GridCell::new("B"),
            GridCell::new("2"),
            GridCell::new("A"),
        ];
        cells.sort();
        let ids: Vec<_> = cells.iter().map(|c| c.as_str()).collect();
        assert_eq!(ids, ["2", "10", "A", "B"]);
    }

    #[test]
    fn test_day_window_bounds() {
        assert!(!in_day_window(0));
        assert!(in_day_window(1));
        assert!(in_day_window(28));
        assert!(!in_day_window(29));
        assert!(!in_day_window(31));
    }

    #[test]
    fn test_push_rejects_wrong_value_count() {
        let mut table = RawRecordTable::new(vec!["T".into(), "P".into()]);
        assert!(table.push(record("06037", vec![Some(1.0), Some(2.0)])).is_ok());
        let err = table.push(record("06037", vec![Some(1.0)])).unwrap_err();
        assert!(matches!(err, AlignError::ShapeMismatch { .. }));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_concat_unions_columns_in_first_seen_order() {
        let mut first = RawRecordTable::new(vec![" T ".into(), "P".into()]);
        first.push(record("06037", vec![Some(1.0), Some(2.0)])).unwrap();
        let mut second = RawRecordTable::new(vec!["P".into(), "RH".into()]);
        second.push(record("06037", vec![Some(3.0), Some(4.0)])).unwrap();

        let merged = RawRecordTable::concat(vec![first, second]);
        assert_eq!(merged.columns, ["T", "P", "RH"]);
        assert_eq!(merged.rows[0].values, [Some(1.0), Some(2.0), None]);
        assert_eq!(merged.rows[1].values, [None, Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_rows_for_filters_key_and_granularity() {
        let mut table = RawRecordTable::new(vec!["T".into()]);
        table.push(record("06037", vec![Some(1.0)])).unwrap();
        table.push(record("06038", vec![Some(2.0)])).unwrap();
        let mut monthly = record("06037", vec![Some(3.0)]);
        monthly.granularity = TemporalGranularity::Monthly;
        table.push(monthly).unwrap();

        let key = GeoKey::new("06037");
        let daily: Vec<_> = table.rows_for(&key, TemporalGranularity::Daily).collect();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].values, [Some(1.0)]);
    }

    #[test]
    fn test_error_display() {
        let err = AlignError::KeyNotFound {
            key: "06037".into(),
            origin: "daily weather rows".into(),
        };
        assert_eq!(err.to_string(), "key '06037' not found in daily weather rows");
    }
}
