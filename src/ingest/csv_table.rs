/// Delimited-text readers for HRRR weather and USDA yield tables.
///
/// Both readers trim header whitespace before matching column names,
/// zero-pad geographic codes, and keep every non-key column as a variable
/// column. Cells that are empty or non-numeric (county names, commodity
/// descriptions) are stored as `None`; selecting one later fails with
/// `MissingVariable` rather than defaulting.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::logging::{self, Modality};
use crate::model::{
    AlignError, COL_COUNTY_ANSI, COL_DAY, COL_FIPS, COL_GRANULARITY, COL_GRID, COL_MONTH,
    COL_STATE_ANSI, GeoKey, GridCell, RawRecord, RawRecordTable, Result, TemporalGranularity,
};

// ============================================================================
// Header handling
// ============================================================================

/// Trimmed header names plus the positions of the key columns.
struct Header {
    names: Vec<String>,
}

impl Header {
    fn new(record: &StringRecord) -> Self {
        Header {
            names: record.iter().map(|h| h.trim().to_string()).collect(),
        }
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.names.iter().position(|n| n == column)
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.position(column)
            .ok_or_else(|| AlignError::Parse(format!("required column '{}' not found in header", column)))
    }

    /// Every column not listed in `keys`, with its position.
    fn variable_columns(&self, keys: &[Option<usize>]) -> Vec<(usize, String)> {
        self.names
            .iter()
            .enumerate()
            .filter(|(i, _)| !keys.contains(&Some(*i)))
            .map(|(i, n)| (i, n.clone()))
            .collect()
    }
}

// ============================================================================
// Cell parsing
// ============================================================================

fn cell<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
    record.get(idx).map(str::trim).unwrap_or("")
}

/// Parses a numeric cell; empty, `NaN` and non-numeric text become `None`.
fn parse_value(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parses a calendar field written as an integer or an integral float
/// (`"7"` or `"7.0"`). Empty cells are `None`; anything outside `range` is an
/// error.
fn parse_calendar(text: &str, column: &str, range: std::ops::RangeInclusive<u8>, line: u64) -> Result<Option<u8>> {
    if text.is_empty() {
        return Ok(None);
    }
    let value: f64 = text
        .parse()
        .map_err(|_| AlignError::Parse(format!("line {}: {} '{}' is not a number", line, column, text)))?;
    if value.fract() != 0.0 || value < *range.start() as f64 || value > *range.end() as f64 {
        return Err(AlignError::Parse(format!(
            "line {}: {} '{}' outside {}..={}",
            line,
            column,
            text,
            range.start(),
            range.end()
        )));
    }
    Ok(Some(value as u8))
}

/// Integer codes are sometimes exported as floats (`"19.0"`); strip the
/// zero fraction before padding.
fn normalise_code(text: &str) -> &str {
    text.strip_suffix(".0").unwrap_or(text)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

// ============================================================================
// Weather tables
// ============================================================================

/// Parses an HRRR weather table (daily and monthly rows mixed).
///
/// Rows whose `Daily/Monthly` value is not exactly `Daily` or `Monthly` are
/// skipped.
pub fn parse_weather_csv<R: Read>(reader: R) -> Result<RawRecordTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let header = Header::new(rdr.headers()?);
    let fips = header.require(COL_FIPS)?;
    let granularity = header.require(COL_GRANULARITY)?;
    let month = header.require(COL_MONTH)?;
    let day = header.position(COL_DAY);
    let grid = header.position(COL_GRID);

    let variables = header.variable_columns(&[Some(fips), Some(granularity), Some(month), day, grid]);
    let mut table = RawRecordTable::new(variables.iter().map(|(_, n)| n.clone()).collect());

    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let line = line_of(&record);

        // The discriminator is matched untrimmed: "Daily " is not a daily row.
        let raw_tag = record.get(granularity).unwrap_or("");
        let Some(tag) = TemporalGranularity::from_discriminator(raw_tag) else {
            skipped += 1;
            continue;
        };

        table.push(RawRecord {
            geo_key: GeoKey::new(normalise_code(cell(&record, fips))),
            granularity: tag,
            month: parse_calendar(cell(&record, month), COL_MONTH, 1..=12, line)?,
            day: match day {
                Some(idx) => parse_calendar(cell(&record, idx), COL_DAY, 1..=31, line)?,
                None => None,
            },
            grid: grid
                .map(|idx| cell(&record, idx))
                .filter(|id| !id.is_empty())
                .map(|id| GridCell::new(normalise_code(id))),
            values: variables
                .iter()
                .map(|(idx, _)| parse_value(cell(&record, *idx)))
                .collect(),
        })?;
    }

    if skipped > 0 {
        logging::debug(
            Modality::Ingest,
            None,
            &format!("skipped {} weather rows with an unrecognised granularity", skipped),
        );
    }
    Ok(table)
}

/// Reads one weather CSV file.
pub fn read_weather_csv(path: &Path) -> Result<RawRecordTable> {
    let file = File::open(path)
        .map_err(|e| AlignError::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))?;
    parse_weather_csv(file)
}

/// Reads and concatenates weather CSV files in the given order.
pub fn read_weather_files(paths: &[PathBuf]) -> Result<RawRecordTable> {
    let tables = paths
        .iter()
        .map(|p| read_weather_csv(p))
        .collect::<Result<Vec<_>>>()?;
    Ok(RawRecordTable::concat(tables))
}

// ============================================================================
// Yield tables
// ============================================================================

/// Parses a USDA yield table. Rows are tagged `Yearly` and keyed by the
/// padded `state_ansi` + `county_ansi` codes.
pub fn parse_yield_csv<R: Read>(reader: R) -> Result<RawRecordTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let header = Header::new(rdr.headers()?);
    let state = header.require(COL_STATE_ANSI)?;
    let county = header.require(COL_COUNTY_ANSI)?;

    let variables = header.variable_columns(&[Some(state), Some(county)]);
    let mut table = RawRecordTable::new(variables.iter().map(|(_, n)| n.clone()).collect());

    for result in rdr.records() {
        let record = result?;
        let state_code = normalise_code(cell(&record, state));
        let county_code = normalise_code(cell(&record, county));
        if state_code.is_empty() || county_code.is_empty() {
            return Err(AlignError::Parse(format!(
                "line {}: missing state or county code",
                line_of(&record)
            )));
        }

        table.push(RawRecord {
            geo_key: GeoKey::from_parts(state_code, county_code),
            granularity: TemporalGranularity::Yearly,
            month: None,
            day: None,
            grid: None,
            values: variables
                .iter()
                .map(|(idx, _)| parse_value(cell(&record, *idx)))
                .collect(),
        })?;
    }

    Ok(table)
}

/// Reads one USDA yield CSV file.
pub fn read_yield_csv(path: &Path) -> Result<RawRecordTable> {
    let file = File::open(path)
        .map_err(|e| AlignError::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))?;
    parse_yield_csv(file)
}

// ============================================================================
// Tests
// ============================================================================
