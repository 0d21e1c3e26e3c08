//! Quote CSV ingest and normalization.
//!
//! Turns an exchange or vendor export into a `QuoteTable` the engine can
//! resolve contracts against.
//!
//! Design goals:
//! - **Tolerant headers**: case, BOM, spaces and common vendor aliases
//!   (`Symbol`, `Latest`, `Open Int`) are accepted
//! - **Row-level validation**: bad rows are skipped and reported, never fatal
//! - **Absence stays absence**: an empty volume cell is `None`, not zero
//! - **No engine logic here**: conversion and scoring happen downstream

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{ContractId, ContractQuote, QuoteTable};
use crate::error::AppError;

const CONTRACT_COLUMNS: [&str; 3] = ["contract", "contract_id", "symbol"];
const PRICE_COLUMNS: [&str; 4] = ["price", "latest", "last", "settle"];
const OPEN_INTEREST_COLUMNS: [&str; 3] = ["open_interest", "open_int", "oi"];
const VOLUME_COLUMNS: [&str; 2] = ["volume", "daily_volume"];
const BID_ASK_COLUMNS: [&str; 2] = ["bid_ask_spread_bp", "bid_ask_bp"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub contract: Option<String>,
    pub message: String,
}

/// Ingest output: the quote table plus what was skipped along the way.
#[derive(Debug, Clone)]
pub struct IngestedQuotes {
    pub table: QuoteTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Resolved column positions for one file.
#[derive(Debug, Clone, Copy)]
struct Columns {
    contract: usize,
    price: usize,
    open_interest: Option<usize>,
    volume: Option<usize>,
    bid_ask: Option<usize>,
}

pub fn load_quotes(path: &Path) -> Result<IngestedQuotes, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open quotes CSV '{}': {e}", path.display())))?;
    let ingested = read_quotes(file)
        .map_err(|e| AppError::new(e.exit_code(), format!("{} ({})", e.message(), path.display())))?;
    debug!(
        path = %path.display(),
        rows_read = ingested.rows_read,
        rows_used = ingested.rows_used,
        "loaded quotes"
    );
    Ok(ingested)
}

/// Parse quotes from any CSV source.
pub fn read_quotes<R: Read>(source: R) -> Result<IngestedQuotes, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = resolve_columns(&build_header_map(&headers))?;

    let mut quotes = Vec::new();
    let mut row_errors = Vec::new();
    let mut seen = HashSet::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    contract: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, columns) {
            Ok(quote) => {
                if !seen.insert(quote.contract_id.clone()) {
                    row_errors.push(RowError {
                        line,
                        contract: Some(quote.contract_id.to_string()),
                        message: "Duplicate contract; the first row is kept.".to_string(),
                    });
                    continue;
                }
                quotes.push(quote);
            }
            Err((contract, message)) => row_errors.push(RowError { line, contract, message }),
        }
    }

    for err in &row_errors {
        warn!(
            line = err.line,
            contract = err.contract.as_deref().unwrap_or("-"),
            "skipped quote row: {}",
            err.message
        );
    }

    let rows_used = quotes.len();
    if rows_used == 0 {
        return Err(AppError::new(2, "No usable quote rows in CSV."));
    }

    Ok(IngestedQuotes {
        table: QuoteTable::new(quotes),
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // Leftmost column wins if a normalized name repeats.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.to_ascii_lowercase().split_whitespace().collect::<Vec<_>>().join("_")
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|a| header_map.get(*a).copied())
}

fn resolve_columns(header_map: &HashMap<String, usize>) -> Result<Columns, AppError> {
    let contract = find_column(header_map, &CONTRACT_COLUMNS).ok_or_else(|| {
        AppError::new(2, "Missing required column: `contract` (or `symbol`)")
    })?;
    let price = find_column(header_map, &PRICE_COLUMNS)
        .ok_or_else(|| AppError::new(2, "Missing required column: `price` (or `latest`)"))?;
    Ok(Columns {
        contract,
        price,
        open_interest: find_column(header_map, &OPEN_INTEREST_COLUMNS),
        volume: find_column(header_map, &VOLUME_COLUMNS),
        bid_ask: find_column(header_map, &BID_ASK_COLUMNS),
    })
}

fn parse_row(record: &StringRecord, columns: Columns) -> Result<ContractQuote, (Option<String>, String)> {
    let contract = cell(record, Some(columns.contract))
        .map(str::to_ascii_uppercase)
        .ok_or_else(|| (None, "Missing contract identifier.".to_string()))?;

    let fail = |message: String| (Some(contract.clone()), message);

    let raw_price = cell(record, Some(columns.price)).ok_or_else(|| fail("Missing price.".to_string()))?;
    let price = parse_price(raw_price).ok_or_else(|| fail(format!("Invalid price '{raw_price}'.")))?;

    let open_interest = parse_count(record, columns.open_interest, "open interest").map_err(fail)?;
    let volume = parse_count(record, columns.volume, "volume").map_err(fail)?;

    let bid_ask_spread_bp = match cell(record, columns.bid_ask) {
        None => None,
        Some(raw) => match parse_number(raw) {
            Some(v) if v >= 0.0 => Some(v),
            _ => return Err(fail(format!("Invalid bid/ask spread '{raw}'."))),
        },
    };

    Ok(ContractQuote {
        contract_id: ContractId::new(contract.clone()),
        price,
        open_interest,
        volume,
        bid_ask_spread_bp,
    })
}

/// Trimmed cell value; placeholders for "no data" count as absent.
fn cell(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    let value = record.get(idx?)?.trim();
    let absent = value.is_empty()
        || value == "-"
        || value.eq_ignore_ascii_case("n/a")
        || value.eq_ignore_ascii_case("na");
    (!absent).then_some(value)
}

fn parse_number(s: &str) -> Option<f64> {
    let v = s.replace(',', "").parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn parse_price(s: &str) -> Option<f64> {
    // Settled prices carry a trailing `s` in some vendor exports (e.g. `95.6700s`).
    let s = s.strip_suffix(['s', 'S']).unwrap_or(s);
    parse_number(s)
}

fn parse_count(record: &StringRecord, idx: Option<usize>, what: &str) -> Result<Option<u64>, String> {
    let Some(raw) = cell(record, idx) else {
        return Ok(None);
    };
    match parse_number(raw) {
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(Some(v as u64)),
        _ => Err(format!("Invalid {what} '{raw}'.")),
    }
}
