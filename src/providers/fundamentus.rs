use super::fetcher::HttpFetcher;
use crate::core::{
    cache::keys,
    config::AppConfig,
    error::{Error, Result},
    instrument::{InstrumentRecord, normalize_identifier},
    source::{DocumentParser, InstrumentRepository},
};
use crate::store::{CacheStore, KeyValueStore};
use async_trait::async_trait;
use reqwest::Url;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

type Listing = Arc<Vec<InstrumentRecord>>;

/// Fund listing scraped from the source site, cached per namespace.
pub struct FundamentusRepository {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<HttpFetcher>,
    parser: Arc<dyn DocumentParser>,
    listing_url: Url,
    detail_url: Url,
    detail_param: String,
    listing_ttl: Duration,
    detail_ttl: Duration,
    listings: Arc<CacheStore<Listing>>,
    instruments: Arc<CacheStore<Option<InstrumentRecord>>>,
    details: Arc<CacheStore<Option<Decimal>>>,
}

impl FundamentusRepository {
    pub fn new(
        config: &AppConfig,
        fetcher: Arc<HttpFetcher>,
        parser: Arc<dyn DocumentParser>,
        store: &KeyValueStore,
    ) -> Result<Self> {
        let listing_url = Url::parse(&config.source.listing_url).map_err(|e| {
            Error::validation(format!(
                "invalid listing url {}: {e}",
                config.source.listing_url
            ))
        })?;
        let detail_url = Url::parse(&config.source.detail_url).map_err(|e| {
            Error::validation(format!("invalid detail url {}: {e}", config.source.detail_url))
        })?;

        Ok(FundamentusRepository {
            inner: Arc::new(Inner {
                fetcher,
                parser,
                listing_url,
                detail_url,
                detail_param: config.source.detail_param.clone(),
                listing_ttl: config.cache.listing_ttl(),
                detail_ttl: config.cache.detail_ttl(),
                listings: store.collection("instruments"),
                instruments: store.collection(keys::INSTRUMENT_NAMESPACE),
                details: store.collection(keys::DETAIL_NAMESPACE),
            }),
        })
    }
}

impl Inner {
    async fn list_all(self: &Arc<Self>, ctx: &CancellationToken) -> Result<Listing> {
        let inner = Arc::clone(self);
        let token = ctx.clone();
        self.listings
            .get_or_load(ctx, keys::LISTING, self.listing_ttl, move || {
                let inner = Arc::clone(&inner);
                let ctx = token.clone();
                async move { inner.load_listing(&ctx).await }
            })
            .await
    }

    #[instrument(name = "LoadListing", skip(self, ctx))]
    async fn load_listing(&self, ctx: &CancellationToken) -> Result<Listing> {
        let html = self.fetcher.fetch(ctx, &self.listing_url).await?;
        let rows = self.parser.parse_listing(&html)?;
        let total = rows.len();
        let records: Vec<InstrumentRecord> = rows
            .into_iter()
            .filter_map(InstrumentRecord::from_row)
            .collect();
        info!(
            "Loaded {} instruments ({} rows without identifier skipped)",
            records.len(),
            total - records.len()
        );
        Ok(Arc::new(records))
    }

    async fn detail_value(
        self: &Arc<Self>,
        ctx: &CancellationToken,
        identifier: &str,
    ) -> Result<Option<Decimal>> {
        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() {
            return Ok(None);
        }

        let inner = Arc::clone(self);
        let token = ctx.clone();
        let key = keys::detail(&identifier);
        self.details
            .get_or_load(ctx, &key, self.detail_ttl, move || {
                let inner = Arc::clone(&inner);
                let ctx = token.clone();
                let identifier = identifier.clone();
                async move { inner.load_detail(&ctx, &identifier).await }
            })
            .await
    }

    #[instrument(name = "LoadDetail", skip(self, ctx))]
    async fn load_detail(&self, ctx: &CancellationToken, identifier: &str) -> Result<Option<Decimal>> {
        let mut url = self.detail_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.detail_param, identifier);

        let html = self.fetcher.fetch(ctx, &url).await?;
        let value = self.parser.parse_detail(&html)?;
        debug!("Detail value for {}: {:?}", identifier, value);
        Ok(value)
    }

    async fn by_identifier(
        self: &Arc<Self>,
        ctx: &CancellationToken,
        identifier: &str,
    ) -> Result<Option<InstrumentRecord>> {
        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() {
            return Ok(None);
        }

        let inner = Arc::clone(self);
        let token = ctx.clone();
        let key = keys::instrument(&identifier);
        self.instruments
            .get_or_load(ctx, &key, self.detail_ttl, move || {
                let inner = Arc::clone(&inner);
                let ctx = token.clone();
                let identifier = identifier.clone();
                async move {
                    let listing = inner.list_all(&ctx).await?;
                    let Some(record) = listing.iter().find(|r| r.matches(&identifier)).cloned()
                    else {
                        debug!("{} is not listed", identifier);
                        return Ok(None);
                    };
                    let detail = inner.detail_value(&ctx, &identifier).await?;
                    Ok(Some(record.with_distribution(detail)))
                }
            })
            .await
    }
}

#[async_trait]
impl InstrumentRepository for FundamentusRepository {
    async fn list_all(&self, ctx: &CancellationToken) -> Result<Vec<InstrumentRecord>> {
        let listing = self.inner.list_all(ctx).await?;
        Ok(listing.as_ref().clone())
    }

    async fn get_by_identifier(
        &self,
        ctx: &CancellationToken,
        identifier: &str,
    ) -> Result<Option<InstrumentRecord>> {
        self.inner.by_identifier(ctx, identifier).await
    }

    async fn get_detail_value(
        &self,
        ctx: &CancellationToken,
        identifier: &str,
    ) -> Result<Option<Decimal>> {
        self.inner.detail_value(ctx, identifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{DelayRange, FetchConfig};
    use crate::providers::table_parser::HtmlTableParser;
    use crate::providers::util::RetryPolicy;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = "<table>\
        <tr><th>Papel</th><th>Segmento</th><th>Cotação</th><th>Dividend Yield</th></tr>\
        <tr><td>HGLG11</td><td>Logística</td><td>160,00</td><td>9,00%</td></tr>\
        <tr><td>KNCR11</td><td>Títulos e Val. Mob.</td><td>104,00</td><td>12,00%</td></tr>\
        <tr><td></td><td>Outros</td><td>1,00</td><td>1,00%</td></tr>\
        </table>";

    fn detail_page(value: &str) -> String {
        format!("<table><tr><td>Dividendo/cota</td><td>{value}</td></tr></table>")
    }

    fn repository(server: &MockServer, store: &KeyValueStore) -> FundamentusRepository {
        let mut config = AppConfig::default();
        config.source.listing_url = format!("{}/fii_resultado.php", server.uri());
        config.source.detail_url = format!("{}/detalhes.php", server.uri());
        config.fetch = FetchConfig {
            max_attempts: 2,
            polite_delay_ms: DelayRange { min: 0, max: 0 },
            backoff_base_ms: 0,
            max_jitter_ms: 0,
        };
        let fetcher = HttpFetcher::new("fiirank-test", RetryPolicy::from(&config.fetch)).unwrap();
        FundamentusRepository::new(&config, Arc::new(fetcher), Arc::new(HtmlTableParser), store)
            .unwrap()
    }

    async fn mount_listing(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/fii_resultado.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_all_is_cached_and_skips_rows_without_identifier() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        let store = KeyValueStore::new();
        let repo = repository(&server, &store);
        let ctx = CancellationToken::new();

        let records = repo.list_all(&ctx).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, "HGLG11");
        assert_eq!(records[0].dividend_yield, dec!(9.00));
        assert!(records.iter().all(|r| r.distribution_12m.is_none()));

        let again = repo.list_all(&ctx).await.unwrap();
        assert_eq!(again, records);
    }

    #[tokio::test]
    async fn test_get_by_identifier_attaches_detail_value() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/detalhes.php"))
            .and(query_param("papel", "HGLG11"))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("10,80")))
            .expect(1)
            .mount(&server)
            .await;

        let store = KeyValueStore::new();
        let repo = repository(&server, &store);
        let ctx = CancellationToken::new();

        let record = repo
            .get_by_identifier(&ctx, " hglg11 ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.identifier, "HGLG11");
        assert_eq!(record.distribution_12m, Some(dec!(10.80)));

        // Detail value shares the same cache entry.
        let value = repo.get_detail_value(&ctx, "HGLG11").await.unwrap();
        assert_eq!(value, Some(dec!(10.80)));
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_none() {
        let server = MockServer::start().await;
        mount_listing(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/detalhes.php"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = KeyValueStore::new();
        let repo = repository(&server, &store);
        let ctx = CancellationToken::new();

        assert!(repo.get_by_identifier(&ctx, "XXXX11").await.unwrap().is_none());
        assert!(repo.get_by_identifier(&ctx, "  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_detail_lookups_fetch_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/detalhes.php"))
            .and(query_param("papel", "KNCR11"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail_page("12,48"))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = KeyValueStore::new();
        let repo = Arc::new(repository(&server, &store));
        let ctx = CancellationToken::new();

        let lookups = (0..10).map(|i| {
            let repo = Arc::clone(&repo);
            let ctx = ctx.clone();
            let id = if i % 2 == 0 { "kncr11" } else { "KNCR11 " };
            async move { repo.get_detail_value(&ctx, id).await }
        });
        for value in futures::future::join_all(lookups).await {
            assert_eq!(value.unwrap(), Some(dec!(12.48)));
        }
    }

    #[tokio::test]
    async fn test_listing_failure_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fii_resultado.php"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        mount_listing(&server, 1).await;

        let store = KeyValueStore::new();
        let repo = repository(&server, &store);
        let ctx = CancellationToken::new();

        let err = repo.list_all(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));

        let records = repo.list_all(&ctx).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_parse_failure_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fii_resultado.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>down</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let store = KeyValueStore::new();
        let repo = repository(&server, &store);
        let err = repo.list_all(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
