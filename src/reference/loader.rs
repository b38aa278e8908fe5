//! CSV loader for the five reference tables
//!
//! Every file except the hex-range table starts with a header row whose
//! column count is checked. Any failure aborts loading: a spotter with
//! half its reference data would silently under-report rarity.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{AircraftType, HexRange, OperatorRecord, ReferenceTables};
use crate::config::ReferenceConfig;

const TYPE_COLUMNS: usize = 4;
const OPERATOR_COLUMNS: usize = 4;
const HEX_RANGE_COLUMNS: usize = 3;
const REGISTRATION_PREFIX_COLUMNS: usize = 3;
const MILITARY_CODE_COLUMNS: usize = 2;

/// Significant length of an airline code.
const OPERATOR_CODE_LEN: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("failed to open reference table {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read reference table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unexpected header length in {}: expected {expected} columns, found {found}", path.display())]
    HeaderLength {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("record {line} in {} has {found} columns, expected {expected}", path.display())]
    ShortRecord {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("record {line} in {}: '{value}' is not a hexadecimal number", path.display())]
    InvalidHex {
        path: PathBuf,
        line: u64,
        value: String,
    },
}

/// Load all five tables from the configured data directory.
pub fn load_reference_tables(config: &ReferenceConfig) -> Result<ReferenceTables, ReferenceError> {
    let mut tables = ReferenceTables::new();

    read_types(&mut tables, open(&config.types_path())?, &config.types_path())?;
    read_operators(&mut tables, open(&config.operators_path())?, &config.operators_path())?;
    read_hex_ranges(&mut tables, open(&config.hex_ranges_path())?, &config.hex_ranges_path())?;
    read_registration_prefixes(
        &mut tables,
        open(&config.registration_prefixes_path())?,
        &config.registration_prefixes_path(),
    )?;
    read_military_codes(
        &mut tables,
        open(&config.military_codes_path())?,
        &config.military_codes_path(),
    )?;

    let sizes = tables.sizes();
    info!(
        data_dir = %config.data_dir.display(),
        types = sizes.types,
        operators = sizes.operators,
        hex_ranges = sizes.hex_ranges,
        registration_prefixes = sizes.registration_prefixes,
        military_codes = sizes.military_codes,
        "📚 Reference tables loaded"
    );

    Ok(tables)
}

fn open(path: &Path) -> Result<File, ReferenceError> {
    File::open(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Per-table Readers
// ============================================================================

/// `ICAOList.csv`: type-code, class, engine, "MANUFACTURER, model".
pub fn read_types<R: Read>(
    tables: &mut ReferenceTables,
    reader: R,
    path: &Path,
) -> Result<usize, ReferenceError> {
    let mut count = 0;
    for_each_record(reader, path, Some(TYPE_COLUMNS), TYPE_COLUMNS, |_, record| {
        let code = record[0].trim();
        if code.is_empty() {
            return Ok(());
        }
        tables.insert_type(
            code,
            AircraftType {
                class: record[1].trim().to_string(),
                engine: record[2].trim().to_string(),
                model: record[3].trim().trim_matches('"').trim().to_string(),
            },
        );
        count += 1;
        Ok(())
    })?;
    Ok(count)
}

/// `Airlines.csv`: company, country, telephony, code. Only the first three
/// characters of the code are significant.
pub fn read_operators<R: Read>(
    tables: &mut ReferenceTables,
    reader: R,
    path: &Path,
) -> Result<usize, ReferenceError> {
    let mut count = 0;
    for_each_record(reader, path, Some(OPERATOR_COLUMNS), OPERATOR_COLUMNS, |_, record| {
        let code: String = record[3].trim().chars().take(OPERATOR_CODE_LEN).collect();
        if code.is_empty() {
            return Ok(());
        }
        tables.insert_operator(
            code,
            OperatorRecord {
                company: record[0].trim().to_string(),
                country: record[1].trim().to_string(),
            },
        );
        count += 1;
        Ok(())
    })?;
    Ok(count)
}

/// `ICAOHexRange.csv` (no header): lower hex, upper hex, country.
pub fn read_hex_ranges<R: Read>(
    tables: &mut ReferenceTables,
    reader: R,
    path: &Path,
) -> Result<usize, ReferenceError> {
    let mut count = 0;
    for_each_record(reader, path, None, HEX_RANGE_COLUMNS, |line, record| {
        let lower = parse_hex(&record[0], path, line)?;
        let upper = parse_hex(&record[1], path, line)?;
        tables.push_hex_range(HexRange {
            lower,
            upper,
            country: record[2].trim().to_string(),
        });
        count += 1;
        Ok(())
    })?;
    Ok(count)
}

/// `RegPrefixList.csv`: country, prefix, comment.
pub fn read_registration_prefixes<R: Read>(
    tables: &mut ReferenceTables,
    reader: R,
    path: &Path,
) -> Result<usize, ReferenceError> {
    let mut count = 0;
    for_each_record(
        reader,
        path,
        Some(REGISTRATION_PREFIX_COLUMNS),
        REGISTRATION_PREFIX_COLUMNS - 1,
        |_, record| {
            let prefix = record[1].trim();
            if prefix.is_empty() {
                return Ok(());
            }
            tables.insert_registration_prefix(prefix, record[0].trim());
            count += 1;
            Ok(())
        },
    )?;
    Ok(count)
}

/// `MilICAOOperatorLookUp.csv`: operator, code. Rows without a code are skipped.
pub fn read_military_codes<R: Read>(
    tables: &mut ReferenceTables,
    reader: R,
    path: &Path,
) -> Result<usize, ReferenceError> {
    let mut count = 0;
    for_each_record(
        reader,
        path,
        Some(MILITARY_CODE_COLUMNS),
        MILITARY_CODE_COLUMNS,
        |_, record| {
            let code = record[1].trim();
            if code.is_empty() {
                return Ok(());
            }
            tables.insert_military_code(code, record[0].trim());
            count += 1;
            Ok(())
        },
    )?;
    Ok(count)
}

// ============================================================================
// Helpers
// ============================================================================

/// Drive a CSV reader, checking the header width (when the file has one)
/// and the minimum width of every record.
fn for_each_record<R, F>(
    reader: R,
    path: &Path,
    header_columns: Option<usize>,
    min_columns: usize,
    mut handle: F,
) -> Result<(), ReferenceError>
where
    R: Read,
    F: FnMut(u64, &csv::StringRecord) -> Result<(), ReferenceError>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(header_columns.is_some())
        .flexible(true)
        .from_reader(reader);

    let csv_error = |source| ReferenceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    if let Some(expected) = header_columns {
        let found = csv_reader.headers().map_err(csv_error)?.len();
        if found != expected {
            return Err(ReferenceError::HeaderLength {
                path: path.to_path_buf(),
                expected,
                found,
            });
        }
    }

    for result in csv_reader.records() {
        let record = result.map_err(csv_error)?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if record.len() < min_columns {
            return Err(ReferenceError::ShortRecord {
                path: path.to_path_buf(),
                line,
                expected: min_columns,
                found: record.len(),
            });
        }
        handle(line, &record)?;
    }

    Ok(())
}

fn parse_hex(value: &str, path: &Path, line: u64) -> Result<u64, ReferenceError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).map_err(|_| ReferenceError::InvalidHex {
        path: path.to_path_buf(),
        line,
        value: value.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
