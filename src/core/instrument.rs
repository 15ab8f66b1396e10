//! Instrument records as decoded from the listing page.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trims and uppercases a ticker so `"hglg11 "` and `"HGLG11"` share one key.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_uppercase()
}

/// One row of the listing table, already decoded into numbers.
///
/// Numeric fields that were missing or unparseable are zero. Rows without an
/// identifier are dropped when records are built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingRow {
    pub identifier: Option<String>,
    pub category: String,
    pub price: Decimal,
    pub ffo_yield: Decimal,
    pub dividend_yield: Decimal,
    pub price_to_book: Decimal,
    pub market_value: Decimal,
    pub liquidity: Decimal,
    pub property_count: i64,
    pub price_per_m2: Decimal,
    pub rent_per_m2: Decimal,
    pub cap_rate: Decimal,
    pub vacancy: Decimal,
}

/// Snapshot of one listed fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub identifier: String,
    pub category: String,
    pub price: Decimal,
    pub ffo_yield: Decimal,
    pub dividend_yield: Decimal,
    pub price_to_book: Decimal,
    pub market_value: Decimal,
    pub liquidity: Decimal,
    pub property_count: i64,
    pub price_per_m2: Decimal,
    pub rent_per_m2: Decimal,
    pub cap_rate: Decimal,
    pub vacancy: Decimal,
    /// Trailing 12-month distribution per unit, only attached on direct lookups.
    pub distribution_12m: Option<Decimal>,
}

impl InstrumentRecord {
    /// Builds a record from a listing row, or `None` when the row has no identifier.
    pub fn from_row(row: ListingRow) -> Option<Self> {
        let identifier = row
            .identifier
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())?
            .to_string();

        Some(Self {
            identifier,
            category: row.category,
            price: row.price,
            ffo_yield: row.ffo_yield,
            dividend_yield: row.dividend_yield,
            price_to_book: row.price_to_book,
            market_value: row.market_value,
            liquidity: row.liquidity,
            property_count: row.property_count,
            price_per_m2: row.price_per_m2,
            rent_per_m2: row.rent_per_m2,
            cap_rate: row.cap_rate,
            vacancy: row.vacancy,
            distribution_12m: None,
        })
    }

    pub fn matches(&self, identifier: &str) -> bool {
        self.identifier.eq_ignore_ascii_case(identifier.trim())
    }

    pub fn with_distribution(self, distribution_12m: Option<Decimal>) -> Self {
        Self {
            distribution_12m,
            ..self
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rust_decimal_macros::dec;

    /// A liquid logistics fund that clears every property-class threshold.
    pub fn record(identifier: &str) -> InstrumentRecord {
        InstrumentRecord {
            identifier: identifier.to_string(),
            category: "Logística".to_string(),
            price: dec!(160.00),
            ffo_yield: dec!(9.5),
            dividend_yield: dec!(9.0),
            price_to_book: dec!(1.00),
            market_value: dec!(2_000_000_000),
            liquidity: dec!(2_000_000),
            property_count: 10,
            price_per_m2: dec!(5000),
            rent_per_m2: dec!(40),
            cap_rate: dec!(8.5),
            vacancy: dec!(5),
            distribution_12m: None,
        }
    }
}
