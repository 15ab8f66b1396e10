//! Apportionment of counts and weights across portfolio buckets.

use crate::core::classifier::AssetClass;
use crate::core::error::{Error, Result};
use crate::core::profile::Profile;
use crate::core::scoring::{RiskTier, ScoredInstrument};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;

/// No single holding gets more than this share of a bucket split.
pub const MAX_WEIGHT_PER_INSTRUMENT: Decimal = dec!(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PortfolioTag {
    Class(AssetClass),
    Profile(Profile),
}

impl Display for PortfolioTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortfolioTag::Class(class) => write!(f, "{class}"),
            PortfolioTag::Profile(profile) => write!(f, "{profile}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioLineItem {
    pub identifier: String,
    pub tag: PortfolioTag,
    pub score: Decimal,
    pub risk: Option<RiskTier>,
    pub weight: Decimal,
    pub price: Decimal,
    pub dividend_yield: Decimal,
    pub price_to_book: Decimal,
    pub liquidity: Decimal,
    pub market_value: Decimal,
    pub category: String,
    pub reasons: Vec<String>,
}

/// Target weights for the property / paper / controlled-risk split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketWeights {
    pub property: Decimal,
    pub paper: Decimal,
    pub controlled_risk: Decimal,
}

impl BucketWeights {
    pub fn as_array(&self) -> [Decimal; 3] {
        [self.property, self.paper, self.controlled_risk]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub property: usize,
    pub paper: usize,
    pub controlled_risk: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.property + self.paper + self.controlled_risk
    }
}

/// How many instruments each bucket should hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    Counts(BucketCounts),
    /// Split automatically with largest-remainder apportionment.
    Total(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationRequest {
    pub weights: BucketWeights,
    pub sizing: Sizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileWeights {
    pub anchor: Decimal,
    pub potential: Decimal,
    pub controlled_risk: Decimal,
    pub high_risk: Decimal,
}

impl ProfileWeights {
    /// Weights in `Profile::ALL` order.
    pub fn as_array(&self) -> [Decimal; 4] {
        [
            self.anchor,
            self.potential,
            self.controlled_risk,
            self.high_risk,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    pub weights: Vec<(PortfolioTag, Decimal)>,
    pub total_assets: usize,
    pub items: Vec<PortfolioLineItem>,
}

impl Portfolio {
    pub fn total_weight(&self) -> Decimal {
        self.items.iter().map(|i| i.weight).sum()
    }
}

/// Weights must be non-negative and add up to exactly 100 at two decimals.
pub fn validate_weights(weights: &[Decimal]) -> Result<()> {
    if weights.iter().any(|w| w.is_sign_negative() && !w.is_zero()) {
        return Err(Error::validation("weights cannot be negative"));
    }

    let sum = weights.iter().copied().sum::<Decimal>().round_dp(2);
    if sum != dec!(100) {
        return Err(Error::validation(format!(
            "weights must sum to 100, got {sum}"
        )));
    }
    Ok(())
}

pub fn validate_counts(counts: &BucketCounts) -> Result<()> {
    if counts.total() == 0 {
        return Err(Error::validation("at least one asset required"));
    }
    Ok(())
}

pub fn validate_total(total: usize) -> Result<()> {
    if total == 0 {
        return Err(Error::validation("total must be greater than zero"));
    }
    Ok(())
}

/// Splits `total` into integer counts proportional to `weights`.
///
/// Each bucket first gets the floor of its exact share; the shortfall then goes
/// one unit at a time to the largest fractional remainders, earlier buckets
/// winning ties.
pub fn apportion(total: usize, weights: &[Decimal]) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }

    let n = Decimal::from(total);
    let exact: Vec<Decimal> = weights.iter().map(|w| *w / dec!(100) * n).collect();
    let mut counts: Vec<usize> = exact
        .iter()
        .map(|e| e.floor().to_usize().unwrap_or(0))
        .collect();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|a, b| {
        let ra = exact[*a] - exact[*a].floor();
        let rb = exact[*b] - exact[*b].floor();
        rb.cmp(&ra)
    });

    let shortfall = total.saturating_sub(counts.iter().sum());
    for i in 0..shortfall {
        counts[order[i % order.len()]] += 1;
    }
    counts
}

/// Splits a bucket weight evenly across its instruments, capped per instrument.
pub fn distribute_weight(
    selected: &[ScoredInstrument],
    tag: PortfolioTag,
    bucket_weight: Decimal,
    cap: Decimal,
) -> Vec<PortfolioLineItem> {
    if selected.is_empty() {
        return Vec::new();
    }

    let share = (bucket_weight / Decimal::from(selected.len()))
        .round_dp(2)
        .min(cap);

    selected
        .iter()
        .map(|s| PortfolioLineItem {
            identifier: s.record.identifier.clone(),
            tag,
            score: s.score,
            risk: s.risk,
            weight: share,
            price: s.record.price,
            dividend_yield: s.record.dividend_yield,
            price_to_book: s.record.price_to_book,
            liquidity: s.record.liquidity,
            market_value: s.record.market_value,
            category: s.record.category.clone(),
            reasons: s.reasons.clone(),
        })
        .collect()
}

/// Pushes any rounding drift onto the highest-scoring item so the total is 100.
pub fn normalize_to_hundred(items: &mut [PortfolioLineItem]) {
    if items.is_empty() {
        return;
    }

    let sum: Decimal = items.iter().map(|i| i.weight).sum();
    let diff = (dec!(100) - sum).round_dp(2);
    if diff.is_zero() {
        return;
    }

    let mut best = 0;
    for (index, item) in items.iter().enumerate() {
        if item.score > items[best].score {
            best = index;
        }
    }
    items[best].weight = (items[best].weight + diff).round_dp(2);
}

/// Takes up to `count` instruments whose identifiers were not used by an
/// earlier bucket.
pub fn pick_unique(
    source: &[ScoredInstrument],
    count: usize,
    used: &mut HashSet<String>,
) -> Vec<ScoredInstrument> {
    source
        .iter()
        .filter(|s| used.insert(s.record.identifier.to_uppercase()))
        .take(count)
        .cloned()
        .collect()
}

/// Assigns weights bucket by bucket and normalises the whole portfolio.
pub fn build_portfolio(buckets: Vec<(PortfolioTag, Decimal, Vec<ScoredInstrument>)>) -> Portfolio {
    let mut items = Vec::new();
    let mut weights = Vec::with_capacity(buckets.len());

    for (tag, weight, selected) in &buckets {
        weights.push((*tag, *weight));
        items.extend(distribute_weight(
            selected,
            *tag,
            *weight,
            MAX_WEIGHT_PER_INSTRUMENT,
        ));
    }

    normalize_to_hundred(&mut items);

    Portfolio {
        weights,
        total_assets: items.len(),
        items,
    }
}
