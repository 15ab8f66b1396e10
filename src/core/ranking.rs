//! Score-based and dual-criterion rankings.

use crate::core::classifier::{AssetClass, detect_asset_class};
use crate::core::instrument::InstrumentRecord;
use crate::core::scoring::{ScoredInstrument, score_as};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Lower bound on the per-class depth used when merging the two class rankings.
pub const MIXED_PER_CLASS_FLOOR: usize = 80;

/// Descending score, then descending liquidity.
pub fn by_score_then_liquidity(a: &ScoredInstrument, b: &ScoredInstrument) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.record.liquidity.cmp(&a.record.liquidity))
}

/// Ranks the instruments of one class, dropping the ones excluded by the pre-filter.
///
/// Hybrid funds have no scoring rules of their own and never rank.
pub fn rank_by_class(
    records: &[InstrumentRecord],
    class: AssetClass,
    limit: usize,
) -> Vec<ScoredInstrument> {
    if class == AssetClass::Hybrid {
        return Vec::new();
    }

    let mut ranked: Vec<ScoredInstrument> = records
        .iter()
        .filter(|r| detect_asset_class(Some(&r.category)) == class)
        .map(|r| score_as(r, class))
        .filter(|s| s.score > Decimal::ZERO)
        .collect();

    ranked.sort_by(by_score_then_liquidity);
    ranked.truncate(limit);
    ranked
}

/// Merges property and paper rankings under the same comparator.
pub fn rank_mixed(records: &[InstrumentRecord], limit: usize) -> Vec<ScoredInstrument> {
    let per_class = limit.max(MIXED_PER_CLASS_FLOOR);

    let mut merged = rank_by_class(records, AssetClass::Property, per_class);
    merged.extend(rank_by_class(records, AssetClass::Paper, per_class));

    merged.sort_by(by_score_then_liquidity);
    merged.truncate(limit);
    merged
}

/// Band applied before the dual-criterion ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterBand {
    pub benchmark_rate: Decimal,
    pub min_yield: Decimal,
    pub max_yield: Decimal,
    pub min_price_to_book: Decimal,
    pub max_price_to_book: Decimal,
    pub min_liquidity: Decimal,
    pub max_vacancy: Decimal,
}

impl FilterBand {
    pub fn for_benchmark(benchmark_rate: Decimal) -> Self {
        Self {
            benchmark_rate,
            min_yield: benchmark_rate - dec!(3),
            max_yield: dec!(20),
            min_price_to_book: dec!(0.50),
            max_price_to_book: dec!(1.00),
            min_liquidity: dec!(400_000),
            max_vacancy: dec!(100),
        }
    }

    pub fn admits(&self, f: &InstrumentRecord) -> bool {
        f.dividend_yield >= self.min_yield
            && f.dividend_yield <= self.max_yield
            && f.price_to_book >= self.min_price_to_book
            && f.price_to_book <= self.max_price_to_book
            && f.liquidity >= self.min_liquidity
            && f.vacancy <= self.max_vacancy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualRanked {
    pub record: InstrumentRecord,
    /// Position by ascending P/VP, starting at 1.
    pub valuation_rank: usize,
    /// Position by descending dividend yield, starting at 1.
    pub yield_rank: usize,
    pub combined_rank: Decimal,
}

/// Ranks the unfiltered list by the average of its valuation and yield positions.
pub fn filter_and_rank(
    records: &[InstrumentRecord],
    band: &FilterBand,
    limit: usize,
) -> Vec<DualRanked> {
    let admitted: Vec<&InstrumentRecord> = records.iter().filter(|f| band.admits(f)).collect();
    if admitted.is_empty() {
        return Vec::new();
    }

    let mut by_valuation = admitted.clone();
    by_valuation.sort_by(|a, b| a.price_to_book.cmp(&b.price_to_book));
    let valuation_ranks = positions(&by_valuation);

    let mut by_yield = admitted.clone();
    by_yield.sort_by(|a, b| b.dividend_yield.cmp(&a.dividend_yield));
    let yield_ranks = positions(&by_yield);

    let mut ranked: Vec<DualRanked> = admitted
        .into_iter()
        .map(|f| {
            let key = f.identifier.to_uppercase();
            let valuation_rank = valuation_ranks[&key];
            let yield_rank = yield_ranks[&key];
            DualRanked {
                record: f.clone(),
                valuation_rank,
                yield_rank,
                combined_rank: Decimal::from(valuation_rank + yield_rank) / dec!(2),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.combined_rank
            .cmp(&b.combined_rank)
            .then_with(|| a.valuation_rank.cmp(&b.valuation_rank))
            .then_with(|| a.yield_rank.cmp(&b.yield_rank))
    });
    ranked.truncate(limit);
    ranked
}

fn positions(sorted: &[&InstrumentRecord]) -> HashMap<String, usize> {
    let mut ranks = HashMap::with_capacity(sorted.len());
    for (index, f) in sorted.iter().enumerate() {
        ranks.entry(f.identifier.to_uppercase()).or_insert(index + 1);
    }
    ranks
}
