//! Read operations over the fund listing: views, rankings and portfolios.

use crate::core::{
    allocation::{
        AllocationRequest, BucketCounts, BucketWeights, Portfolio, PortfolioTag, ProfileWeights,
        Sizing, apportion, build_portfolio, pick_unique, validate_counts, validate_total,
        validate_weights,
    },
    analytics::IncomeMetrics,
    classifier::AssetClass,
    error::{Error, Result},
    instrument::InstrumentRecord,
    profile::{Explanation, Profile, classify_profile, explain, is_controlled_risk},
    ranking::{self, FilterBand, by_score_then_liquidity},
    scoring::ScoredInstrument,
    source::{BenchmarkRateProvider, InstrumentRepository},
};
use chrono::{Local, NaiveDate};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-class depth the fixed policy draws from.
const POLICY_DEPTH: usize = 120;
const MIN_PORTFOLIO_LIQUIDITY: Decimal = dec!(800_000);
const RISK_LIST_DEPTH: usize = 120;

const SUGGESTED_WEIGHTS: BucketWeights = BucketWeights {
    property: dec!(60),
    paper: dec!(35),
    controlled_risk: dec!(5),
};
const SUGGESTED_COUNTS: BucketCounts = BucketCounts {
    property: 6,
    paper: 5,
    controlled_risk: 2,
};

/// One fund with its detail value, profile and income figures attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentView {
    pub record: InstrumentRecord,
    pub explanation: Explanation,
    pub income: IncomeMetrics,
}

/// A fund admitted by the benchmark band with its dual-criterion ranks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredInstrument {
    pub view: InstrumentView,
    pub valuation_rank: usize,
    pub yield_rank: usize,
    pub combined_rank: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredListing {
    pub band: FilterBand,
    pub items: Vec<FilteredInstrument>,
}

pub struct FundService {
    repository: Arc<dyn InstrumentRepository>,
    benchmark: Arc<dyn BenchmarkRateProvider>,
    concurrency: usize,
    default_top: usize,
}

impl FundService {
    pub fn new(
        repository: Arc<dyn InstrumentRepository>,
        benchmark: Arc<dyn BenchmarkRateProvider>,
        concurrency: usize,
        default_top: usize,
    ) -> Self {
        FundService {
            repository,
            benchmark,
            concurrency: concurrency.max(1),
            default_top: default_top.max(1),
        }
    }

    fn top_or_default(&self, top: usize) -> usize {
        if top == 0 { self.default_top } else { top }
    }

    /// The first `top` funds by identifier, enriched.
    pub async fn list(&self, ctx: &CancellationToken, top: usize) -> Result<Vec<InstrumentView>> {
        let top = self.top_or_default(top);
        let mut records = self.repository.list_all(ctx).await?;
        records.sort_by_cached_key(|r| r.identifier.to_uppercase());
        records.truncate(top);
        self.enrich_all(ctx, records.into_iter().map(|r| (r, None)).collect())
            .await
    }

    pub async fn get(
        &self,
        ctx: &CancellationToken,
        identifier: &str,
    ) -> Result<Option<InstrumentView>> {
        let Some(record) = self.repository.get_by_identifier(ctx, identifier).await? else {
            return Ok(None);
        };
        Ok(Some(view(record, None, today())))
    }

    /// Dual-criterion ranking of the funds inside the benchmark band.
    pub async fn filtered(&self, ctx: &CancellationToken, top: usize) -> Result<FilteredListing> {
        let top = self.top_or_default(top);
        let rate = self.benchmark.current_benchmark_rate(ctx).await?;
        let band = FilterBand::for_benchmark(rate);
        info!("Benchmark rate {}, yield floor {}", rate, band.min_yield);

        let records = self.repository.list_all(ctx).await?;
        let ranked = ranking::filter_and_rank(&records, &band, top);

        let views = self
            .enrich_all(ctx, ranked.iter().map(|r| (r.record.clone(), None)).collect())
            .await?;
        let items = ranked
            .into_iter()
            .zip(views)
            .map(|(ranked, view)| FilteredInstrument {
                view,
                valuation_rank: ranked.valuation_rank,
                yield_rank: ranked.yield_rank,
                combined_rank: ranked.combined_rank,
            })
            .collect();
        Ok(FilteredListing { band, items })
    }

    /// Large, liquid, fairly priced funds with low vacancy, shopping malls excluded.
    pub async fn anchoring(&self, ctx: &CancellationToken) -> Result<Vec<InstrumentRecord>> {
        let mut records: Vec<InstrumentRecord> = self
            .repository
            .list_all(ctx)
            .await?
            .into_iter()
            .filter(|f| {
                f.liquidity >= dec!(1_500_000)
                    && f.market_value >= dec!(1_000_000_000)
                    && f.price_to_book >= dec!(0.98)
                    && f.vacancy <= dec!(10)
                    && !f.category.to_lowercase().contains("shopping")
            })
            .collect();
        records.sort_by_cached_key(|r| r.identifier.to_uppercase());
        Ok(records)
    }

    pub async fn rank_by_class(
        &self,
        ctx: &CancellationToken,
        class: AssetClass,
        top: usize,
    ) -> Result<Vec<ScoredInstrument>> {
        let records = self.repository.list_all(ctx).await?;
        Ok(ranking::rank_by_class(
            &records,
            class,
            self.top_or_default(top),
        ))
    }

    pub async fn rank_mixed(
        &self,
        ctx: &CancellationToken,
        top: usize,
    ) -> Result<Vec<ScoredInstrument>> {
        let records = self.repository.list_all(ctx).await?;
        Ok(ranking::rank_mixed(&records, self.top_or_default(top)))
    }

    pub async fn controlled_risk(
        &self,
        ctx: &CancellationToken,
        top: usize,
    ) -> Result<Vec<ScoredInstrument>> {
        let records = self.repository.list_all(ctx).await?;
        Ok(risk_list(&records, self.top_or_default(top), is_controlled_risk))
    }

    pub async fn high_risk(
        &self,
        ctx: &CancellationToken,
        top: usize,
    ) -> Result<Vec<ScoredInstrument>> {
        let records = self.repository.list_all(ctx).await?;
        Ok(risk_list(&records, self.top_or_default(top), |s| {
            classify_profile(Some(s)) == Profile::HighRisk
        }))
    }

    /// Fixed 60/35/5 policy with 6 property, 5 paper and 2 controlled-risk funds.
    pub async fn suggested_portfolio(&self, ctx: &CancellationToken) -> Result<Portfolio> {
        let records = self.repository.list_all(ctx).await?;
        Ok(allocate(
            &records,
            &SUGGESTED_WEIGHTS,
            &SUGGESTED_COUNTS,
            POLICY_DEPTH,
        ))
    }

    /// Caller-weighted allocation, sized by explicit counts or by a total.
    pub async fn custom_portfolio(
        &self,
        ctx: &CancellationToken,
        request: &AllocationRequest,
    ) -> Result<Portfolio> {
        validate_weights(&request.weights.as_array())?;
        let counts = match request.sizing {
            Sizing::Counts(counts) => counts,
            Sizing::Total(total) => {
                validate_total(total)?;
                let split = apportion(total, &request.weights.as_array());
                BucketCounts {
                    property: split[0],
                    paper: split[1],
                    controlled_risk: split[2],
                }
            }
        };
        validate_counts(&counts)?;
        debug!("Allocating with counts {:?}", counts);

        let records = self.repository.list_all(ctx).await?;
        let depth = POLICY_DEPTH.max(counts.total() * 10);
        Ok(allocate(&records, &request.weights, &counts, depth))
    }

    /// Portfolio split across the four profiles, each pick explained under its
    /// bucket's profile.
    pub async fn profile_portfolio(
        &self,
        ctx: &CancellationToken,
        weights: &ProfileWeights,
        total: usize,
    ) -> Result<Portfolio> {
        validate_total(total)?;
        let bucket_weights = weights.as_array();
        validate_weights(&bucket_weights)?;
        let counts = apportion(total, &bucket_weights);
        debug!("Profile counts {:?}", counts);

        let records = self.repository.list_all(ctx).await?;
        let ranked = ranking::rank_mixed(&records, 150usize.max(total * 12));

        let mut used = HashSet::new();
        let picks: Vec<(Profile, Vec<ScoredInstrument>)> = Profile::ALL
            .iter()
            .zip(&counts)
            .map(|(profile, count)| {
                let candidates: Vec<ScoredInstrument> = ranked
                    .iter()
                    .filter(|s| classify_profile(Some(s)) == *profile)
                    .cloned()
                    .collect();
                (*profile, pick_unique(&candidates, *count, &mut used))
            })
            .collect();

        let batch = picks
            .iter()
            .flat_map(|(profile, selected)| {
                selected.iter().map(|s| (s.record.clone(), Some(*profile)))
            })
            .collect();
        let views: HashMap<String, InstrumentView> = self
            .enrich_all(ctx, batch)
            .await?
            .into_iter()
            .map(|v| (v.record.identifier.to_uppercase(), v))
            .collect();

        let buckets = picks
            .into_iter()
            .zip(bucket_weights)
            .map(|((profile, selected), weight)| {
                let selected = selected
                    .into_iter()
                    .map(|s| match views.get(&s.record.identifier.to_uppercase()) {
                        Some(view) => ScoredInstrument {
                            record: view.record.clone(),
                            reasons: view.explanation.reasons.clone(),
                            ..s
                        },
                        None => s,
                    })
                    .collect();
                (PortfolioTag::Profile(profile), weight, selected)
            })
            .collect();

        Ok(build_portfolio(buckets))
    }

    /// Attaches detail values to a batch with at most `concurrency` lookups in
    /// flight. Output order follows input order.
    async fn enrich_all(
        &self,
        ctx: &CancellationToken,
        batch: Vec<(InstrumentRecord, Option<Profile>)>,
    ) -> Result<Vec<InstrumentView>> {
        let gate = Semaphore::new(self.concurrency);
        let today = today();

        let lookups = batch.into_iter().map(|(record, forced)| {
            let gate = &gate;
            async move {
                let _permit = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Err(Error::Cancelled),
                    permit = gate.acquire() => permit.map_err(|_| Error::Cancelled)?,
                };
                let detail = self
                    .repository
                    .get_detail_value(ctx, &record.identifier)
                    .await?;
                Ok(view(record.with_distribution(detail), forced, today))
            }
        });

        try_join_all(lookups).await
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn view(record: InstrumentRecord, forced: Option<Profile>, today: NaiveDate) -> InstrumentView {
    let explanation = explain(&record, forced);
    let income = IncomeMetrics::compute(record.price, record.distribution_12m, today);
    InstrumentView {
        record,
        explanation,
        income,
    }
}

fn risk_list<P>(records: &[InstrumentRecord], top: usize, keep: P) -> Vec<ScoredInstrument>
where
    P: Fn(&ScoredInstrument) -> bool,
{
    let mut list: Vec<ScoredInstrument> =
        ranking::rank_mixed(records, RISK_LIST_DEPTH.max(top * 8))
            .into_iter()
            .filter(|s| keep(s))
            .collect();
    list.sort_by(by_score_then_liquidity);
    list.truncate(top);
    list
}

/// Takes the top funds of each bucket independently, so a controlled-risk
/// fund can also hold a property slot.
fn allocate(
    records: &[InstrumentRecord],
    weights: &BucketWeights,
    counts: &BucketCounts,
    depth: usize,
) -> Portfolio {
    let liquid = |class| -> Vec<ScoredInstrument> {
        ranking::rank_by_class(records, class, depth)
            .into_iter()
            .filter(|s| s.record.liquidity >= MIN_PORTFOLIO_LIQUIDITY)
            .collect()
    };
    let property = liquid(AssetClass::Property);
    let paper = liquid(AssetClass::Paper);
    let controlled = risk_list(records, depth, is_controlled_risk);

    let top = |list: Vec<ScoredInstrument>, count: usize| -> Vec<ScoredInstrument> {
        list.into_iter().take(count).collect()
    };
    let property = top(property, counts.property);
    let paper = top(paper, counts.paper);
    let controlled = top(controlled, counts.controlled_risk);

    build_portfolio(vec![
        (
            PortfolioTag::Class(AssetClass::Property),
            weights.property,
            property,
        ),
        (
            PortfolioTag::Class(AssetClass::Paper),
            weights.paper,
            paper,
        ),
        (
            PortfolioTag::Profile(Profile::ControlledRisk),
            weights.controlled_risk,
            controlled,
        ),
    ])
}
