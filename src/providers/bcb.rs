use super::fetcher::HttpFetcher;
use crate::core::error::{Error, Result};
use crate::core::source::BenchmarkRateProvider;
use async_trait::async_trait;
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One observation of a central bank SGS time series.
#[derive(Debug, Deserialize)]
struct SgsObservation {
    #[serde(default)]
    data: String,
    #[serde(default)]
    valor: String,
}

/// Reads the latest value of the SGS benchmark series.
pub struct BcbBenchmarkProvider {
    fetcher: Arc<HttpFetcher>,
    url: Url,
}

impl BcbBenchmarkProvider {
    pub fn new(url: &str, fetcher: Arc<HttpFetcher>) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::validation(format!("invalid benchmark url {url}: {e}")))?;
        Ok(BcbBenchmarkProvider { fetcher, url })
    }
}

#[async_trait]
impl BenchmarkRateProvider for BcbBenchmarkProvider {
    async fn current_benchmark_rate(&self, ctx: &CancellationToken) -> Result<Decimal> {
        let body = self.fetcher.fetch(ctx, &self.url).await?;

        let observations: Vec<SgsObservation> = serde_json::from_str(&body)
            .map_err(|e| Error::parse(format!("invalid benchmark response: {e}")))?;
        let observation = observations
            .first()
            .filter(|o| !o.valor.trim().is_empty())
            .ok_or_else(|| Error::parse("benchmark response has no value"))?;

        let rate = Decimal::from_str(observation.valor.trim()).map_err(|e| {
            Error::parse(format!("invalid benchmark value {}: {e}", observation.valor))
        })?;
        debug!("Benchmark rate {} observed on {}", rate, observation.data);
        Ok(rate)
    }
}
