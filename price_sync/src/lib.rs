//! Price Sync - ZIP/CSV price list import and export
//!
//! This service accepts ZIP-wrapped CSV price lists over HTTP, stores the rows
//! in a SQLite table and serves the table back as a ZIP-wrapped CSV.

pub mod archive;
pub mod config;
pub mod csv_processor;
pub mod database;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod web;

pub use config::{IdStrategy, ServiceConfig};
pub use database::{BatchOutcome, PriceStore, SqliteStore};
pub use error::{PriceError, Result};
pub use models::{PriceRecord, StatsSummary, StoredPrice};
pub use pipeline::{handle_export, handle_import, ImportDiagnostics, ImportReport};
