use super::ui;
use crate::core::allocation::{AllocationRequest, Portfolio, ProfileWeights};
use crate::core::service::FundService;
use anyhow::Result;
use comfy_table::Cell;
use tokio_util::sync::CancellationToken;

pub async fn suggested(service: &FundService, ctx: &CancellationToken) -> Result<()> {
    let pb = ui::new_spinner("Building suggested portfolio...");
    let portfolio = service.suggested_portfolio(ctx).await;
    pb.finish_and_clear();

    println!("{}", portfolio?.display_as_table("Suggested portfolio"));
    Ok(())
}

pub async fn custom(
    service: &FundService,
    ctx: &CancellationToken,
    request: &AllocationRequest,
) -> Result<()> {
    let pb = ui::new_spinner("Building portfolio...");
    let portfolio = service.custom_portfolio(ctx, request).await;
    pb.finish_and_clear();

    println!("{}", portfolio?.display_as_table("Custom portfolio"));
    Ok(())
}

pub async fn profiles(
    service: &FundService,
    ctx: &CancellationToken,
    weights: &ProfileWeights,
    total: usize,
) -> Result<()> {
    let pb = ui::new_spinner("Building profile portfolio...");
    let portfolio = service.profile_portfolio(ctx, weights, total).await;
    pb.finish_and_clear();

    println!("{}", portfolio?.display_as_table("Profile portfolio"));
    Ok(())
}

impl Portfolio {
    pub fn display_as_table(&self, title: &str) -> String {
        let split = self
            .weights
            .iter()
            .map(|(tag, weight)| format!("{tag} {weight:.2}%"))
            .collect::<Vec<_>>()
            .join(" | ");

        let mut output = format!(
            "{}\n{}\n\n",
            ui::style_text(title, ui::StyleType::Title),
            ui::style_text(
                &format!("{split} | {} assets selected", self.total_assets),
                ui::StyleType::Subtle
            )
        );

        if self.items.is_empty() {
            output.push_str("No fund qualifies for this allocation.");
            return output;
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("#"),
            ui::header_cell("Fund"),
            ui::header_cell("Bucket"),
            ui::header_cell("Category"),
            ui::header_cell("Score"),
            ui::header_cell("Risk"),
            ui::header_cell("Weight"),
            ui::header_cell("Price"),
            ui::header_cell("DY (%)"),
            ui::header_cell("P/VP"),
            ui::header_cell("Liquidity"),
        ]);

        for (position, item) in self.items.iter().enumerate() {
            table.add_row(vec![
                ui::number_cell((position + 1).to_string()),
                Cell::new(&item.identifier),
                Cell::new(item.tag.to_string()),
                Cell::new(&item.category),
                ui::score_cell(item.score),
                ui::risk_cell(item.risk),
                ui::format_percentage_cell(item.weight),
                ui::number_cell(format!("{:.2}", item.price)),
                ui::number_cell(format!("{:.2}", item.dividend_yield)),
                ui::number_cell(format!("{:.2}", item.price_to_book)),
                ui::number_cell(ui::format_compact(item.liquidity)),
            ]);
        }
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\n{}: {}",
            ui::style_text("Total weight", ui::StyleType::TotalLabel),
            ui::style_text(
                &format!("{:.2}%", self.total_weight()),
                ui::StyleType::TotalValue
            )
        ));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocation::{PortfolioLineItem, PortfolioTag};
    use crate::core::classifier::AssetClass;
    use crate::core::scoring::RiskTier;
    use rust_decimal_macros::dec;

    fn item(identifier: &str, weight: rust_decimal::Decimal) -> PortfolioLineItem {
        PortfolioLineItem {
            identifier: identifier.to_string(),
            tag: PortfolioTag::Class(AssetClass::Property),
            score: dec!(8.4),
            risk: Some(RiskTier::Conservative),
            weight,
            price: dec!(160),
            dividend_yield: dec!(9),
            price_to_book: dec!(1),
            liquidity: dec!(2_000_000),
            market_value: dec!(2_000_000_000),
            category: "Logística".to_string(),
            reasons: vec![],
        }
    }

    #[test]
    fn test_portfolio_table_shows_split_and_total() {
        let portfolio = Portfolio {
            weights: vec![(PortfolioTag::Class(AssetClass::Property), dec!(100))],
            total_assets: 2,
            items: vec![item("HGLG11", dec!(50)), item("KNRI11", dec!(50))],
        };
        let output = portfolio.display_as_table("Custom portfolio");

        assert!(output.contains("PROPERTY 100.00%"));
        assert!(output.contains("2 assets selected"));
        assert!(output.contains("HGLG11"));
        assert!(output.contains("50.00%"));
        assert!(output.contains("100.00%"));
    }

    #[test]
    fn test_empty_portfolio() {
        let portfolio = Portfolio {
            weights: vec![],
            total_assets: 0,
            items: vec![],
        };
        assert!(
            portfolio
                .display_as_table("Suggested portfolio")
                .ends_with("No fund qualifies for this allocation.")
        );
    }
}
