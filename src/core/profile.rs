//! Portfolio profiles and the reasons attached to each.

use crate::core::classifier::{AssetClass, detect_asset_class};
use crate::core::instrument::InstrumentRecord;
use crate::core::scoring::{RiskTier, ScoredInstrument, score_as};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    Anchor,
    Potential,
    ControlledRisk,
    HighRisk,
}

impl Profile {
    /// Declaration order, also the order profile portfolios are assembled in.
    pub const ALL: [Profile; 4] = [
        Profile::Anchor,
        Profile::Potential,
        Profile::ControlledRisk,
        Profile::HighRisk,
    ];
}

impl Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Profile::Anchor => "Anchor",
                Profile::Potential => "Potential",
                Profile::ControlledRisk => "Controlled Risk",
                Profile::HighRisk => "High Risk",
            }
        )
    }
}

/// The "good risk" window: neither conservative nor a time bomb.
pub fn is_controlled_risk(s: &ScoredInstrument) -> bool {
    let f = &s.record;
    s.score >= dec!(6.5)
        && s.score <= dec!(7.7)
        && f.liquidity >= dec!(800_000)
        && f.market_value >= dec!(600_000_000)
        && f.dividend_yield >= dec!(9)
        && f.price_to_book <= dec!(1.10)
}

/// First match wins: controlled risk is checked before anchor on purpose, so an
/// instrument qualifying for both lands in controlled risk.
pub fn classify_profile(scored: Option<&ScoredInstrument>) -> Profile {
    let Some(s) = scored else {
        return Profile::HighRisk;
    };

    if is_controlled_risk(s) {
        return Profile::ControlledRisk;
    }

    if s.score >= dec!(8.0) && s.risk == Some(RiskTier::Conservative) {
        return Profile::Anchor;
    }

    if s.score >= dec!(7.0) && s.score < dec!(8.0) {
        return Profile::Potential;
    }

    Profile::HighRisk
}

/// Profile plus the combined scorer and profile reasons for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub class: AssetClass,
    pub profile: Profile,
    pub score: Decimal,
    pub risk: Option<RiskTier>,
    pub reasons: Vec<String>,
}

/// Scores a record and explains it. `forced` overrides the computed profile.
pub fn explain(record: &InstrumentRecord, forced: Option<Profile>) -> Explanation {
    let class = detect_asset_class(Some(&record.category));
    let scored = score_as(record, class);
    let profile = forced.unwrap_or_else(|| classify_profile(Some(&scored)));

    let mut seen = HashSet::new();
    let mut reasons: Vec<String> = scored
        .reasons
        .iter()
        .cloned()
        .chain(profile_reasons(&scored, profile))
        .filter(|r| !r.trim().is_empty())
        .filter(|r| seen.insert(r.to_lowercase()))
        .collect();

    if reasons.is_empty() {
        reasons.push(format!("Classified as '{profile}' by the rules."));
    }

    Explanation {
        class,
        profile,
        score: scored.score,
        risk: scored.risk,
        reasons,
    }
}

fn profile_reasons(s: &ScoredInstrument, profile: Profile) -> Vec<String> {
    let f = &s.record;
    let mut m = Vec::new();

    match profile {
        Profile::Anchor => {
            if f.market_value >= dec!(1_000_000_000) {
                m.push("Market value >= 1bn (anchor)".to_string());
            }
            if f.liquidity >= dec!(1_500_000) {
                m.push("High liquidity (>= 1.5M)".to_string());
            }
            if f.price_to_book >= dec!(0.98) && f.price_to_book <= dec!(1.05) {
                m.push("P/VP close to 1 (anchor band)".to_string());
            }
            if f.vacancy <= dec!(10) {
                m.push("Vacancy <= 10%".to_string());
            }
        }
        Profile::Potential => {
            if f.price_to_book < dec!(0.95) {
                m.push("P/VP below 1 (discount / potential)".to_string());
            }
            if f.dividend_yield >= dec!(10) {
                m.push("High dividend yield".to_string());
            }
            if f.ffo_yield >= dec!(9) {
                m.push("High FFO yield".to_string());
            }
        }
        Profile::ControlledRisk => {
            m.push("Intermediate score (controlled risk profile)".to_string());
            if f.liquidity >= dec!(800_000) {
                m.push("Reasonable liquidity (>= 800k)".to_string());
            }
        }
        Profile::HighRisk => {
            m.push("Classified as high risk by the rules".to_string());
            if f.liquidity < dec!(800_000) {
                m.push("Low liquidity".to_string());
            }
            if f.vacancy > dec!(15) {
                m.push("Vacancy above 15%".to_string());
            }
            if f.market_value < dec!(300_000_000) {
                m.push("Low market value".to_string());
            }
        }
    }

    if m.is_empty() {
        m.push(format!(
            "Classified as '{}' by the rules (class={}, risk={}, score={}).",
            profile,
            s.class,
            s.risk_label(),
            s.score
        ));
    }

    m
}
