//! Explainable 0-10 scores for property and paper funds.
//!
//! Each score is a pre-filter followed by a weighted sum of step-function
//! sub-scores. Instruments failing the pre-filter score zero with no risk tier
//! and are never ranked.

use crate::core::classifier::{AssetClass, detect_asset_class};
use crate::core::instrument::InstrumentRecord;
use crate::core::text::normalize_label;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Conservative,
    Moderate,
    Aggressive,
}

impl Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RiskTier::Conservative => "Conservative",
                RiskTier::Moderate => "Moderate",
                RiskTier::Aggressive => "Aggressive",
            }
        )
    }
}

impl RiskTier {
    pub fn from_score(score: Decimal) -> Self {
        if score >= dec!(8.0) {
            RiskTier::Conservative
        } else if score >= dec!(6.5) {
            RiskTier::Moderate
        } else {
            RiskTier::Aggressive
        }
    }
}

/// Outcome of one scoring pass. `risk` is `None` for excluded instruments.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub value: Decimal,
    pub risk: Option<RiskTier>,
    pub reasons: Vec<String>,
}

impl Score {
    fn excluded(reason: &str) -> Self {
        Self {
            value: Decimal::ZERO,
            risk: None,
            reasons: vec![reason.to_string()],
        }
    }

    fn ranked(raw: Decimal, reasons: Vec<String>) -> Self {
        let clamped = raw.clamp(Decimal::ZERO, dec!(10));
        Self {
            value: clamped.round_dp(2),
            risk: Some(RiskTier::from_score(clamped)),
            reasons,
        }
    }

    pub fn is_excluded(&self) -> bool {
        self.value.is_zero()
    }
}

/// An instrument together with its class and score, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredInstrument {
    pub record: InstrumentRecord,
    pub class: AssetClass,
    pub score: Decimal,
    pub risk: Option<RiskTier>,
    pub reasons: Vec<String>,
}

impl ScoredInstrument {
    pub fn identifier(&self) -> &str {
        &self.record.identifier
    }

    pub fn risk_label(&self) -> String {
        self.risk.map_or("N/A".to_string(), |r| r.to_string())
    }
}

/// Scores a record under its detected class. Hybrid funds use the paper rules.
pub fn score_instrument(record: &InstrumentRecord) -> ScoredInstrument {
    let class = detect_asset_class(Some(&record.category));
    score_as(record, class)
}

pub fn score_as(record: &InstrumentRecord, class: AssetClass) -> ScoredInstrument {
    let score = match class {
        AssetClass::Property => score_property(record),
        AssetClass::Paper | AssetClass::Hybrid => score_paper(record),
    };
    ScoredInstrument {
        record: record.clone(),
        class,
        score: score.value,
        risk: score.risk,
        reasons: score.reasons,
    }
}

pub fn score_property(f: &InstrumentRecord) -> Score {
    if f.liquidity < dec!(500_000) {
        return Score::excluded("Liquidity < 500k (excluded from ranking).");
    }
    if f.dividend_yield < dec!(6) {
        return Score::excluded("Dividend yield < 6% (excluded from ranking).");
    }
    if f.vacancy > dec!(15) {
        return Score::excluded("Vacancy > 15% (excluded from ranking).");
    }

    let raw = vacancy_subscore(f.vacancy) * dec!(0.25)
        + liquidity_subscore(f.liquidity) * dec!(0.20)
        + market_value_subscore(f.market_value) * dec!(0.15)
        + property_yield_subscore(f.dividend_yield) * dec!(0.20)
        + price_to_book_subscore(f.price_to_book) * dec!(0.15)
        + property_count_subscore(f.property_count) * dec!(0.05)
        + segment_bonus(&f.category);

    let mut reasons = Vec::new();
    if f.vacancy > dec!(10) {
        reasons.push("Vacancy above 10%.".to_string());
    }
    if f.price_to_book > dec!(1.15) {
        reasons.push("Stretched P/VP.".to_string());
    }
    if f.market_value < dec!(1_000_000_000) {
        reasons.push("Smaller market value (more volatile).".to_string());
    }
    if f.liquidity < dec!(1_000_000) {
        reasons.push("Moderate/low liquidity.".to_string());
    }

    Score::ranked(raw, reasons)
}

pub fn score_paper(f: &InstrumentRecord) -> Score {
    if f.liquidity < dec!(400_000) {
        return Score::excluded("Liquidity < 400k (excluded from ranking).");
    }
    if f.dividend_yield < dec!(8) {
        return Score::excluded("Dividend yield < 8% (excluded from paper ranking).");
    }

    // A high vacancy on a paper fund usually means bad data or a misclassified fund.
    let vacancy_penalty = if f.vacancy > dec!(30) {
        dec!(-0.3)
    } else {
        Decimal::ZERO
    };

    let raw = paper_yield_subscore(f.dividend_yield) * dec!(0.35)
        + liquidity_subscore(f.liquidity) * dec!(0.25)
        + market_value_subscore(f.market_value) * dec!(0.20)
        + price_to_book_subscore(f.price_to_book) * dec!(0.20)
        + vacancy_penalty;

    let mut reasons = Vec::new();
    if f.price_to_book > dec!(1.15) {
        reasons.push("Stretched P/VP.".to_string());
    }
    if f.dividend_yield > dec!(16) {
        reasons.push("Very high dividend yield (may signal risk).".to_string());
    }
    if f.liquidity < dec!(800_000) {
        reasons.push("Moderate/low liquidity.".to_string());
    }

    Score::ranked(raw, reasons)
}

fn vacancy_subscore(vacancy: Decimal) -> Decimal {
    match vacancy {
        v if v <= dec!(5) => dec!(10),
        v if v <= dec!(10) => dec!(8),
        v if v <= dec!(15) => dec!(6),
        _ => dec!(0),
    }
}

fn liquidity_subscore(liquidity: Decimal) -> Decimal {
    match liquidity {
        l if l >= dec!(2_000_000) => dec!(10),
        l if l >= dec!(1_000_000) => dec!(8),
        l if l >= dec!(500_000) => dec!(6),
        _ => dec!(0),
    }
}

fn market_value_subscore(market_value: Decimal) -> Decimal {
    match market_value {
        v if v >= dec!(2_000_000_000) => dec!(10),
        v if v >= dec!(1_000_000_000) => dec!(8),
        v if v >= dec!(500_000_000) => dec!(6),
        _ => dec!(4),
    }
}

fn property_yield_subscore(dy: Decimal) -> Decimal {
    match dy {
        d if d >= dec!(8) && d <= dec!(11) => dec!(10),
        d if d >= dec!(7) && d < dec!(8) => dec!(8),
        d if d > dec!(11) && d <= dec!(13) => dec!(7),
        d if d >= dec!(6) && d < dec!(7) => dec!(6),
        _ => dec!(4),
    }
}

fn paper_yield_subscore(dy: Decimal) -> Decimal {
    match dy {
        d if d >= dec!(9) && d <= dec!(13.5) => dec!(10),
        d if d >= dec!(8) && d < dec!(9) => dec!(8),
        d if d > dec!(13.5) && d <= dec!(16) => dec!(7),
        _ => dec!(4),
    }
}

fn price_to_book_subscore(pvp: Decimal) -> Decimal {
    match pvp {
        p if p >= dec!(0.95) && p <= dec!(1.05) => dec!(10),
        p if p >= dec!(0.90) && p < dec!(0.95) => dec!(8),
        p if p > dec!(1.05) && p <= dec!(1.10) => dec!(8),
        p if p >= dec!(0.85) && p < dec!(0.90) => dec!(6),
        p if p > dec!(1.10) && p <= dec!(1.20) => dec!(6),
        _ => dec!(4),
    }
}

fn property_count_subscore(count: i64) -> Decimal {
    match count {
        c if c >= 10 => dec!(10),
        c if c >= 5 => dec!(8),
        c if c >= 3 => dec!(6),
        _ => dec!(4),
    }
}

fn segment_bonus(category: &str) -> Decimal {
    let s = normalize_label(Some(category));
    if s.contains("log") {
        dec!(0.3)
    } else if s.contains("hosp") || s.contains("saud") {
        dec!(0.3)
    } else if s.contains("laje") || s.contains("escr") {
        dec!(0.1)
    } else {
        Decimal::ZERO
    }
}
