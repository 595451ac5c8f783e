//! Row validation and normalization.
//!
//! Rows that cannot become a price record are skipped, never treated as
//! errors. Skips are logged and reported back to the caller so the import
//! diagnostics can count them.

use std::fmt;
use std::str::FromStr;

use log::debug;
use rust_decimal::Decimal;

use crate::models::PriceRecord;

/// Minimum number of fields a data row needs: id, name, category, price, date
pub const MIN_FIELDS: usize = 5;

/// Literal value in the first column that marks a header row
const HEADER_ID: &str = "id";

/// Why a row was left out of the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Fewer than [`MIN_FIELDS`] columns
    TooFewFields,
    /// First column is literally `id`
    HeaderRow,
    /// Price column is not a decimal number
    InvalidPrice,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewFields => write!(f, "too few fields"),
            SkipReason::HeaderRow => write!(f, "header row"),
            SkipReason::InvalidPrice => write!(f, "invalid price"),
        }
    }
}

/// Outcome of validating one CSV row
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRow {
    Record(PriceRecord),
    Skip(SkipReason),
}

/// Validate a raw CSV row.
///
/// Checks run in a fixed order: field count, header heuristic, price. The
/// header heuristic also drops a real data row whose id is literally `id`;
/// that is a known limitation of the upload format.
///
/// The date column is passed through untouched. The store decides whether
/// it is a valid date.
pub fn normalize(row: &[String]) -> NormalizedRow {
    if row.len() < MIN_FIELDS {
        debug!("Skipping row with {} fields: {:?}", row.len(), row);
        return NormalizedRow::Skip(SkipReason::TooFewFields);
    }

    if row[0] == HEADER_ID {
        debug!("Skipping header row");
        return NormalizedRow::Skip(SkipReason::HeaderRow);
    }

    let price = match parse_price(&row[3]) {
        Some(price) => price,
        None => {
            debug!("Skipping row {}: cannot parse price '{}'", row[0], row[3]);
            return NormalizedRow::Skip(SkipReason::InvalidPrice);
        }
    };

    NormalizedRow::Record(PriceRecord {
        id: row[0].clone(),
        name: row[1].clone(),
        category: row[2].clone(),
        price,
        create_date: row[4].clone(),
    })
}

/// Parse a price column as an exact decimal (`9.99`, `10`, `1.5e2`)
fn parse_price(raw: &str) -> Option<Decimal> {
    // rust_decimal treats '_' as a digit separator; plain decimal text never has one
    if raw.contains('_') {
        return None;
    }
    match Decimal::from_str(raw) {
        Ok(price) => Some(price),
        Err(_) if raw.contains(['e', 'E']) => Decimal::from_scientific(raw).ok(),
        Err(_) => None,
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
