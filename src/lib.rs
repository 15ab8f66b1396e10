pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::allocation::{AllocationRequest, ProfileWeights};
use crate::core::classifier::AssetClass;
use crate::core::config::AppConfig;
use crate::core::service::FundService;
use crate::providers::{
    BcbBenchmarkProvider, FundamentusRepository, HtmlTableParser, HttpFetcher, util::RetryPolicy,
};
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankScope {
    Class(AssetClass),
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskKind {
    Controlled,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    List { top: usize },
    Show { identifier: String },
    Filtered { top: usize },
    Anchoring,
    Rank { scope: RankScope, top: usize },
    Risk { kind: RiskKind, top: usize },
    SuggestedPortfolio,
    CustomPortfolio(AllocationRequest),
    ProfilePortfolio { weights: ProfileWeights, total: usize },
}

/// Wires the cache store, fetcher, repository and benchmark client into a service.
pub fn build_service(config: &AppConfig) -> Result<FundService> {
    let store = KeyValueStore::new();
    let fetcher = Arc::new(
        HttpFetcher::new(&config.source.user_agent, RetryPolicy::from(&config.fetch))
            .context("Failed to create HTTP client")?,
    );

    let repository = FundamentusRepository::new(
        config,
        Arc::clone(&fetcher),
        Arc::new(HtmlTableParser),
        &store,
    )
    .context("Invalid source configuration")?;
    let benchmark = BcbBenchmarkProvider::new(&config.benchmark.url, fetcher)
        .context("Invalid benchmark configuration")?;

    Ok(FundService::new(
        Arc::new(repository),
        Arc::new(benchmark),
        config.concurrency,
        config.default_top,
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fiirank starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let service = build_service(&config)?;

    let ctx = CancellationToken::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling pending requests");
            interrupt.cancel();
        }
    });

    match command {
        AppCommand::List { top } => cli::instruments::list(&service, &ctx, top).await,
        AppCommand::Show { identifier } => {
            cli::instruments::show(&service, &ctx, &identifier).await
        }
        AppCommand::Filtered { top } => cli::instruments::filtered(&service, &ctx, top).await,
        AppCommand::Anchoring => cli::instruments::anchoring(&service, &ctx).await,
        AppCommand::Rank { scope, top } => cli::rankings::rank(&service, &ctx, scope, top).await,
        AppCommand::Risk { kind, top } => cli::rankings::risk(&service, &ctx, kind, top).await,
        AppCommand::SuggestedPortfolio => cli::portfolio::suggested(&service, &ctx).await,
        AppCommand::CustomPortfolio(request) => {
            cli::portfolio::custom(&service, &ctx, &request).await
        }
        AppCommand::ProfilePortfolio { weights, total } => {
            cli::portfolio::profiles(&service, &ctx, &weights, total).await
        }
    }
}
