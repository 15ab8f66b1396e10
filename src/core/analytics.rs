//! Income figures derived from a fund's trailing 12-month distribution.
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Per-unit income estimates for one fund. Every figure is zero when the
/// inputs needed for it are missing or non-positive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncomeMetrics {
    pub distribution_12m: Decimal,
    pub monthly_distribution: Decimal,
    pub monthly_yield: Decimal,
    pub daily_distribution: Decimal,
    /// Units whose monthly income buys one more unit.
    pub magic_number_units: i64,
    pub magic_number_value: Decimal,
}

impl IncomeMetrics {
    pub fn compute(price: Decimal, distribution_12m: Option<Decimal>, today: NaiveDate) -> Self {
        let distribution_12m = distribution_12m.unwrap_or_default();
        let monthly_distribution = monthly_distribution(distribution_12m);
        let magic_number_units = magic_number_units(price, monthly_distribution);

        Self {
            distribution_12m,
            monthly_distribution,
            monthly_yield: monthly_yield(price, monthly_distribution),
            daily_distribution: daily_distribution(monthly_distribution, today),
            magic_number_units,
            magic_number_value: magic_number_value(magic_number_units, price),
        }
    }
}

fn monthly_distribution(distribution_12m: Decimal) -> Decimal {
    if distribution_12m <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (distribution_12m / dec!(12)).round_dp(2)
}

fn monthly_yield(price: Decimal, monthly: Decimal) -> Decimal {
    if price <= Decimal::ZERO || monthly <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (monthly / price * dec!(100)).round_dp(2)
}

fn daily_distribution(monthly: Decimal, today: NaiveDate) -> Decimal {
    let days = days_in_month(today);
    if days <= 0 || monthly <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (monthly / Decimal::from(days)).round_dp(6)
}

fn magic_number_units(price: Decimal, monthly: Decimal) -> i64 {
    if price <= Decimal::ZERO || monthly <= Decimal::ZERO {
        return 0;
    }
    (price / monthly).ceil().to_i64().unwrap_or(0)
}

fn magic_number_value(units: i64, price: Decimal) -> Decimal {
    if units <= 0 || price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (Decimal::from(units) * price).round_dp(2)
}

fn days_in_month(date: NaiveDate) -> i64 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    match (
        NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
        NaiveDate::from_ymd_opt(year, month, 1),
    ) {
        (Some(start), Some(end)) => end.signed_duration_since(start).num_days(),
        _ => 0,
    }
}
