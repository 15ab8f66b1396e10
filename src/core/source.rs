use crate::core::error::Result;
use crate::core::instrument::{InstrumentRecord, ListingRow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

/// Read access to the fund listing and per-fund detail values.
#[async_trait]
pub trait InstrumentRepository: Send + Sync {
    /// Every well-formed listing row, served from the snapshot cache when fresh.
    async fn list_all(&self, ctx: &CancellationToken) -> Result<Vec<InstrumentRecord>>;

    /// Case-insensitive lookup with the detail value attached. `Ok(None)` when
    /// the identifier is not listed.
    async fn get_by_identifier(
        &self,
        ctx: &CancellationToken,
        identifier: &str,
    ) -> Result<Option<InstrumentRecord>>;

    /// Trailing 12-month distribution per unit.
    async fn get_detail_value(
        &self,
        ctx: &CancellationToken,
        identifier: &str,
    ) -> Result<Option<Decimal>>;
}

/// Decodes raw source documents.
pub trait DocumentParser: Send + Sync {
    fn parse_listing(&self, document: &str) -> Result<Vec<ListingRow>>;

    fn parse_detail(&self, document: &str) -> Result<Option<Decimal>>;
}

#[async_trait]
pub trait BenchmarkRateProvider: Send + Sync {
    /// Latest annualised benchmark rate, in percent.
    async fn current_benchmark_rate(&self, ctx: &CancellationToken) -> Result<Decimal>;
}
