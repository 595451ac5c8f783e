//! CSV encoding for exports

use crate::error::{PriceError, Result};
use crate::models::StoredPrice;

/// Encode stored prices as headerless CSV rows `id,name,category,price,date`
pub fn encode_prices(prices: &[StoredPrice]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for price in prices {
        writer
            .write_record(price.to_csv_fields())
            .map_err(PriceError::CsvWrite)?;
    }
    writer
        .into_inner()
        .map_err(|e| PriceError::Io(e.into_error()))
}
