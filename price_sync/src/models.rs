//! Price record types shared by the pipelines and the store

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// A validated CSV row, ready to be handed to the store.
///
/// `create_date` is still the raw CSV text; the store's date column decides
/// whether it is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    /// Client-supplied id (field 0). Ignored when the store generates ids.
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub create_date: String,
}

/// A row read back from the `prices` table
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPrice {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Price in cents (fixed two-digit precision)
    pub price_cents: i64,
    pub create_date: NaiveDate,
}

impl StoredPrice {
    /// Price as an exact decimal with trailing zeros removed (`9.99`, `10`, `0.5`)
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_cents, 2).normalize()
    }

    /// CSV fields in export order: id, name, category, price, date
    pub fn to_csv_fields(&self) -> [String; 5] {
        [
            self.id.clone(),
            self.name.clone(),
            self.category.clone(),
            self.price().to_string(),
            self.create_date.format("%Y-%m-%d").to_string(),
        ]
    }
}

/// Whole-table statistics returned by a successful import
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_items: i64,
    pub total_categories: i64,
    pub total_price: f64,
}

impl StatsSummary {
    /// Build a summary from an exact cent total
    pub fn from_cents(total_items: i64, total_categories: i64, total_cents: i64) -> Self {
        // a single correctly rounded division keeps e.g. 2998 -> 29.98 exact
        Self {
            total_items,
            total_categories,
            total_price: total_cents as f64 / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(cents: i64) -> StoredPrice {
        StoredPrice {
            id: "7".to_string(),
            name: "Widget".to_string(),
            category: "Tools".to_string(),
            price_cents: cents,
            create_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    #[test]
    fn price_uses_shortest_decimal_form() {
        assert_eq!(stored(999).price().to_string(), "9.99");
        assert_eq!(stored(1000).price().to_string(), "10");
        assert_eq!(stored(50).price().to_string(), "0.5");
        assert_eq!(stored(0).price().to_string(), "0");
    }

    #[test]
    fn csv_fields_follow_export_column_order() {
        let fields = stored(1999).to_csv_fields();
        assert_eq!(fields, ["7", "Widget", "Tools", "19.99", "2024-01-15"]);
    }

    #[test]
    fn stats_from_cents_is_exact_for_two_decimals() {
        let stats = StatsSummary::from_cents(2, 1, 2998);
        assert_eq!(stats.total_price, 29.98);
    }

    #[test]
    fn stats_serialize_with_snake_case_keys() {
        let json = serde_json::to_string(&StatsSummary::from_cents(2, 1, 2998)).unwrap();
        assert_eq!(
            json,
            r#"{"total_items":2,"total_categories":1,"total_price":29.98}"#
        );
    }
}
