//! CSV handling for price lists.
//!
//! # Module Structure
//!
//! - [`parser`] - decodes an extracted CSV payload into raw rows
//! - [`validator`] - turns raw rows into [`PriceRecord`]s or skip reasons
//! - [`writer`] - encodes stored prices back into CSV for export
//!
//! [`PriceRecord`]: crate::models::PriceRecord

pub mod parser;
pub mod validator;
pub mod writer;

pub use parser::parse_all;
pub use validator::{normalize, NormalizedRow, SkipReason, MIN_FIELDS};
pub use writer::encode_prices;
