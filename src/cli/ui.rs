use crate::core::profile::Profile;
use crate::core::scoring::RiskTier;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn number_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| number_cell(format_fn(v)),
    )
}

/// Bold green cell for headline figures such as weights.
pub fn format_percentage_cell(value: Decimal) -> Cell {
    Cell::new(format!("{value:.2}%"))
        .add_attribute(Attribute::Bold)
        .fg(Color::Green)
        .set_alignment(CellAlignment::Right)
}

/// Score cell colored by the tier the score falls in.
pub fn score_cell(score: Decimal) -> Cell {
    let color = if score.is_zero() {
        Color::DarkGrey
    } else {
        match RiskTier::from_score(score) {
            RiskTier::Conservative => Color::Green,
            RiskTier::Moderate => Color::Yellow,
            RiskTier::Aggressive => Color::Red,
        }
    };
    Cell::new(format!("{score:.2}"))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

pub fn risk_cell(risk: Option<RiskTier>) -> Cell {
    match risk {
        Some(RiskTier::Conservative) => Cell::new(risk_label(risk)).fg(Color::Green),
        Some(RiskTier::Moderate) => Cell::new(risk_label(risk)).fg(Color::Yellow),
        Some(RiskTier::Aggressive) => Cell::new(risk_label(risk)).fg(Color::Red),
        None => Cell::new(risk_label(risk)).fg(Color::DarkGrey),
    }
}

pub fn risk_label(risk: Option<RiskTier>) -> String {
    risk.map_or("N/A".to_string(), |r| r.to_string())
}

pub fn profile_cell(profile: Profile) -> Cell {
    let color = match profile {
        Profile::Anchor => Color::Green,
        Profile::Potential => Color::Cyan,
        Profile::ControlledRisk => Color::Yellow,
        Profile::HighRisk => Color::Red,
    };
    Cell::new(profile.to_string()).fg(color)
}

/// Shortens large amounts: 2_500_000_000 becomes "2.50B".
pub fn format_compact(value: Decimal) -> String {
    let abs = value.abs();
    if abs >= dec!(1_000_000_000) {
        format!("{:.2}B", value / dec!(1_000_000_000))
    } else if abs >= dec!(1_000_000) {
        format!("{:.2}M", value / dec!(1_000_000))
    } else if abs >= dec!(1_000) {
        format!("{:.1}k", value / dec!(1_000))
    } else {
        format!("{value:.2}")
    }
}

/// Creates a spinner shown on stderr while the listing is fetched.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(dec!(2_500_000_000)), "2.50B");
        assert_eq!(format_compact(dec!(1_250_000)), "1.25M");
        assert_eq!(format_compact(dec!(800_000)), "800.0k");
        assert_eq!(format_compact(dec!(12.5)), "12.50");
        assert_eq!(format_compact(Decimal::ZERO), "0.00");
    }

    #[test]
    fn test_risk_label() {
        assert_eq!(risk_label(None), "N/A");
        assert_eq!(risk_label(Some(RiskTier::Moderate)), "Moderate");
    }
}
