use super::ui;
use crate::core::scoring::ScoredInstrument;
use crate::core::service::FundService;
use crate::{RankScope, RiskKind};
use anyhow::Result;
use comfy_table::Cell;
use tokio_util::sync::CancellationToken;

pub async fn rank(
    service: &FundService,
    ctx: &CancellationToken,
    scope: RankScope,
    top: usize,
) -> Result<()> {
    let pb = ui::new_spinner("Scoring funds...");
    let (title, ranked) = match scope {
        RankScope::Class(class) => (
            format!("Ranking: {class}"),
            service.rank_by_class(ctx, class, top).await,
        ),
        RankScope::Mixed => ("Ranking: MIXED".to_string(), service.rank_mixed(ctx, top).await),
    };
    pb.finish_and_clear();

    println!("{}", scored_table(&title, &ranked?));
    Ok(())
}

pub async fn risk(
    service: &FundService,
    ctx: &CancellationToken,
    kind: RiskKind,
    top: usize,
) -> Result<()> {
    let pb = ui::new_spinner("Scoring funds...");
    let (title, ranked) = match kind {
        RiskKind::Controlled => (
            "Controlled risk",
            service.controlled_risk(ctx, top).await,
        ),
        RiskKind::High => ("High risk", service.high_risk(ctx, top).await),
    };
    pb.finish_and_clear();

    println!("{}", scored_table(title, &ranked?));
    Ok(())
}

fn scored_table(title: &str, ranked: &[ScoredInstrument]) -> String {
    let mut output = format!("{}\n\n", ui::style_text(title, ui::StyleType::Title));
    if ranked.is_empty() {
        output.push_str("No fund qualifies.");
        return output;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Fund"),
        ui::header_cell("Class"),
        ui::header_cell("Category"),
        ui::header_cell("Score"),
        ui::header_cell("Risk"),
        ui::header_cell("DY (%)"),
        ui::header_cell("P/VP"),
        ui::header_cell("Liquidity"),
        ui::header_cell("Reasons"),
    ]);

    for (position, s) in ranked.iter().enumerate() {
        let f = &s.record;
        table.add_row(vec![
            ui::number_cell((position + 1).to_string()),
            Cell::new(&f.identifier),
            Cell::new(s.class.to_string()),
            Cell::new(&f.category),
            ui::score_cell(s.score),
            ui::risk_cell(s.risk),
            ui::number_cell(format!("{:.2}", f.dividend_yield)),
            ui::number_cell(format!("{:.2}", f.price_to_book)),
            ui::number_cell(ui::format_compact(f.liquidity)),
            Cell::new(s.reasons.join("; ")),
        ]);
    }
    output.push_str(&table.to_string());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instrument::fixtures::record;
    use crate::core::scoring::score_instrument;

    #[test]
    fn test_scored_table_numbers_rows() {
        let ranked = vec![
            score_instrument(&record("HGLG11")),
            score_instrument(&record("KNRI11")),
        ];
        let output = scored_table("Ranking: PROPERTY", &ranked);

        assert!(output.contains("Ranking: PROPERTY"));
        assert!(output.contains("HGLG11"));
        assert!(output.contains("KNRI11"));
        assert!(output.contains("PROPERTY"));
    }

    #[test]
    fn test_empty_ranking() {
        assert!(scored_table("High risk", &[]).ends_with("No fund qualifies."));
    }
}
