use super::util::{Failure, RetryPolicy, with_retry};
use crate::core::error::{Error, Result};
use reqwest::{
    StatusCode, Url,
    header::{ACCEPT, ACCEPT_LANGUAGE},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Downloads raw documents with the polite delay and retry policy applied.
pub struct HttpFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::rejected("http client", e))?;
        Ok(HttpFetcher { client, policy })
    }

    #[instrument(name = "Fetch", skip(self, ctx), fields(url = %url))]
    pub async fn fetch(&self, ctx: &CancellationToken, url: &Url) -> Result<String> {
        with_retry(ctx, &self.policy, url.as_str(), || async {
            debug!("Requesting {}", url);
            let response = self
                .client
                .get(url.clone())
                .header(ACCEPT, "text/html,application/json;q=0.9,*/*;q=0.8")
                .header(ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9,en;q=0.8")
                .send()
                .await
                .map_err(|e| Failure::Retry(format!("request error: {e}")))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .text()
                    .await
                    .map_err(|e| Failure::Retry(format!("body error: {e}")));
            }
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Err(Failure::Retry(format!("HTTP {status}")));
            }
            Err(Failure::Abort(Error::rejected(
                url.as_str(),
                format!("HTTP {status}"),
            )))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("fiirank-test", RetryPolicy::immediate(4)).unwrap()
    }

    fn url(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fii_resultado.php"))
            .and(header("user-agent", "fiirank-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch(&CancellationToken::new(), &url(&server, "/fii_resultado.php"))
            .await
            .unwrap();
        assert_eq!(body, "<html></html>");
    }

    #[tokio::test]
    async fn test_retries_on_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fii_resultado.php"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fii_resultado.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch(&CancellationToken::new(), &url(&server, "/fii_resultado.php"))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_retries_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch(&CancellationToken::new(), &url(&server, "/"))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&CancellationToken::new(), &url(&server, "/missing"))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        match err {
            Error::Fetch { cause, .. } => assert!(cause.contains("404")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_with_last_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4)
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&CancellationToken::new(), &url(&server, "/fii_resultado.php"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        match err {
            Error::Fetch { cause, .. } => assert!(cause.contains("500")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = fetcher().fetch(&ctx, &url(&server, "/")).await.unwrap_err();
        assert_eq!(err, Error::Cancelled);
    }
}
