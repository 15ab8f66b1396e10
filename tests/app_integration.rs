use fiirank::core::allocation::{AllocationRequest, BucketWeights, Sizing};
use fiirank::core::config::{AppConfig, DelayRange, FetchConfig};
use fiirank::core::error::Error;
use fiirank::{AppCommand, RankScope, RiskKind};
use rust_decimal_macros::dec;
use std::fs;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod test_utils {
    use fiirank::core::config::{AppConfig, DelayRange, FetchConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const LISTING: &str = r#"<html><body>
        <table id="tabelaResultado">
          <thead><tr>
            <th>Papel</th><th>Segmento</th><th>Cotação</th><th>FFO Yield</th>
            <th>Dividend Yield</th><th>P/VP</th><th>Valor de Mercado</th><th>Liquidez</th>
            <th>Qtd de imóveis</th><th>Preço do m2</th><th>Aluguel por m2</th>
            <th>Cap Rate</th><th>Vacância Média</th>
          </tr></thead>
          <tbody>
            <tr><td>KNRI11</td><td>Híbrido</td><td>150,00</td><td>8,90%</td><td>8,50%</td><td>0,99</td><td>4.000.000.000</td><td>3.000.000</td><td>20</td><td>6.000,00</td><td>45,00</td><td>8,00%</td><td>4,00%</td></tr>
            <tr><td>HGLG11</td><td>Logística</td><td>160,00</td><td>9,50%</td><td>9,00%</td><td>1,00</td><td>2.000.000.000</td><td>2.000.000</td><td>10</td><td>5.000,00</td><td>40,00</td><td>8,50%</td><td>5,00%</td></tr>
            <tr><td>BTLG11</td><td>Logística</td><td>100,00</td><td>9,20%</td><td>8,80%</td><td>1,02</td><td>3.500.000.000</td><td>2.500.000</td><td>15</td><td>4.000,00</td><td>30,00</td><td>8,00%</td><td>3,00%</td></tr>
            <tr><td>MXRF11</td><td>Recebíveis</td><td>9,80</td><td>12,00%</td><td>12,50%</td><td>0,98</td><td>3.000.000.000</td><td>5.000.000</td><td>0</td><td>-</td><td>-</td><td>-</td><td>0,00%</td></tr>
            <tr><td>VGIR11</td><td>Papel e CRI</td><td>9,50</td><td>12,50%</td><td>13,00%</td><td>0,95</td><td>1.200.000.000</td><td>1.800.000</td><td>0</td><td>-</td><td>-</td><td>-</td><td>0,00%</td></tr>
            <tr><td>THIN11</td><td>Lajes Corporativas</td><td>50,00</td><td>7,00%</td><td>11,00%</td><td>0,60</td><td>90.000.000</td><td>100.000</td><td>2</td><td>3.000,00</td><td>20,00</td><td>6,00%</td><td>35,00%</td></tr>
            <tr><td></td><td>Outros</td><td>1,00</td><td>1,00%</td><td>1,00%</td><td>1,00</td><td>1</td><td>1</td><td>1</td><td>1</td><td>1</td><td>1</td><td>1</td></tr>
          </tbody>
        </table>
        </body></html>"#;

    pub const DETAIL: &str = r#"<table>
        <tr><td class="label"><span class="txt">Div/Cota</span></td>
            <td class="data"><span class="txt">1,10</span></td></tr>
        </table>"#;

    pub const BENCHMARK: &str = r#"[{"data":"17/09/2025","valor":"15.00"}]"#;

    /// Serves the listing, every detail page and the benchmark series.
    pub async fn create_mock_server(listing_calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fii_resultado.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .expect(listing_calls)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/detalhes.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/sgs/ultimos/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BENCHMARK))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn config_for(server: &MockServer) -> AppConfig {
        let mut config = AppConfig::default();
        config.source.listing_url = format!("{}/fii_resultado.php", server.uri());
        config.source.detail_url = format!("{}/detalhes.php", server.uri());
        config.benchmark.url = format!("{}/sgs/ultimos/1?formato=json", server.uri());
        config.fetch = FetchConfig {
            max_attempts: 1,
            polite_delay_ms: DelayRange { min: 0, max: 0 },
            backoff_base_ms: 0,
            max_jitter_ms: 0,
        };
        config
    }
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let commands = vec![
        AppCommand::List { top: 3 },
        AppCommand::Show {
            identifier: "hglg11".to_string(),
        },
        AppCommand::Filtered { top: 5 },
        AppCommand::Anchoring,
        AppCommand::Rank {
            scope: RankScope::Mixed,
            top: 5,
        },
        AppCommand::Risk {
            kind: RiskKind::High,
            top: 5,
        },
        AppCommand::SuggestedPortfolio,
    ];

    // Every run builds its own cache, so each command fetches the listing once.
    let mock_server = test_utils::create_mock_server(commands.len() as u64).await;
    let config = test_utils::config_for(&mock_server);

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    fs::write(
        config_path,
        serde_yaml::to_string(&config).expect("Failed to serialize config"),
    )
    .expect("Failed to write config file");

    for command in commands {
        info!(?command, "Running command");
        let result =
            fiirank::run_command(command.clone(), Some(config_path.to_str().unwrap())).await;
        assert!(
            result.is_ok(),
            "{command:?} failed with: {:?}",
            result.err()
        );
    }
}

#[test_log::test(tokio::test)]
async fn test_show_unknown_fund_fails() {
    let mock_server = test_utils::create_mock_server(1).await;
    let config = test_utils::config_for(&mock_server);

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(
        config_file.path(),
        serde_yaml::to_string(&config).expect("Failed to serialize config"),
    )
    .expect("Failed to write config file");

    let result = fiirank::run_command(
        AppCommand::Show {
            identifier: "zzzz11".to_string(),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("unknown fund should fail");
    assert!(err.to_string().contains("ZZZZ11 not found"), "{err}");
}

#[test_log::test(tokio::test)]
async fn test_service_flows_share_one_listing_fetch() {
    let mock_server = test_utils::create_mock_server(1).await;
    let service = fiirank::build_service(&test_utils::config_for(&mock_server)).unwrap();
    let ctx = CancellationToken::new();

    let listed = service.list(&ctx, 2).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|v| v.record.identifier.as_str()).collect();
    assert_eq!(ids, vec!["BTLG11", "HGLG11"]);
    assert!(
        listed
            .iter()
            .all(|v| v.record.distribution_12m == Some(dec!(1.10)))
    );

    let view = service.get(&ctx, " hglg11").await.unwrap().unwrap();
    assert_eq!(view.record.identifier, "HGLG11");
    assert_eq!(view.income.monthly_distribution, dec!(0.09));

    assert!(service.get(&ctx, "ZZZZ11").await.unwrap().is_none());

    let filtered = service.filtered(&ctx, 10).await.unwrap();
    assert_eq!(filtered.band.min_yield, dec!(12.00));
    let ids: Vec<&str> = filtered
        .items
        .iter()
        .map(|i| i.view.record.identifier.as_str())
        .collect();
    assert_eq!(ids, vec!["VGIR11", "MXRF11"]);

    let anchoring = service.anchoring(&ctx).await.unwrap();
    let ids: Vec<&str> = anchoring.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(ids, vec!["BTLG11", "HGLG11", "KNRI11", "MXRF11"]);

    let mixed = service.rank_mixed(&ctx, 10).await.unwrap();
    assert!(!mixed.is_empty());
    assert!(mixed.iter().all(|s| !s.score.is_zero()));
    assert!(mixed.iter().all(|s| s.identifier() != "KNRI11"));

    let portfolio = service.suggested_portfolio(&ctx).await.unwrap();
    assert!(!portfolio.items.is_empty());
    assert_eq!(portfolio.total_weight(), dec!(100));
}

#[test_log::test(tokio::test)]
async fn test_invalid_allocation_is_rejected_before_fetching() {
    let mock_server = test_utils::create_mock_server(0).await;
    let service = fiirank::build_service(&test_utils::config_for(&mock_server)).unwrap();

    let request = AllocationRequest {
        weights: BucketWeights {
            property: dec!(50),
            paper: dec!(30),
            controlled_risk: dec!(10),
        },
        sizing: Sizing::Total(10),
    };
    let err = service
        .custom_portfolio(&CancellationToken::new(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test_log::test(tokio::test)]
async fn test_cancelled_request_does_not_fetch() {
    let mock_server = test_utils::create_mock_server(0).await;
    let service = fiirank::build_service(&test_utils::config_for(&mock_server)).unwrap();

    let ctx = CancellationToken::new();
    ctx.cancel();
    let err = service.list(&ctx, 5).await.unwrap_err();
    assert_eq!(err, Error::Cancelled);
}

#[test_log::test(tokio::test)]
async fn test_unreachable_source_reports_fetch_error() {
    let mut config = AppConfig::default();
    config.source.listing_url = "http://127.0.0.1:9/fii_resultado.php".to_string();
    config.fetch = FetchConfig {
        max_attempts: 2,
        polite_delay_ms: DelayRange { min: 0, max: 0 },
        backoff_base_ms: 0,
        max_jitter_ms: 0,
    };
    let service = fiirank::build_service(&config).unwrap();

    let err = service
        .rank_mixed(&CancellationToken::new(), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Fetch { .. }), "{err:?}");
}
