use crate::core::text::normalize_label;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// Funds owning physical properties.
    Property,
    /// Funds holding receivables and real-estate credit paper.
    Paper,
    Hybrid,
}

impl Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AssetClass::Property => "PROPERTY",
                AssetClass::Paper => "PAPER",
                AssetClass::Hybrid => "HYBRID",
            }
        )
    }
}

/// Derives the asset class from the free-text category label.
///
/// Credit vocabulary wins over hybrid vocabulary; anything else is treated as a
/// property fund.
pub fn detect_asset_class(category: Option<&str>) -> AssetClass {
    let s = normalize_label(category);

    if s.contains("cri") || s.contains("receb") || s.contains("papel") {
        return AssetClass::Paper;
    }

    if s.contains("hibr") {
        return AssetClass::Hybrid;
    }

    AssetClass::Property
}
