//! Raw CSV decoding

use log::debug;

use crate::error::Result;

/// Decode every row of `csv_bytes` into its string fields.
///
/// All rows are materialized up front. There is no header handling and rows
/// may have differing lengths; both are left to the validator. Any decode
/// failure (bad quoting, invalid UTF-8) fails the whole payload.
pub fn parse_all(csv_bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_bytes);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!("Parsed {} CSV rows", rows.len());
    Ok(rows)
}
