use crate::error::{BulletinError, Result};
use crate::readers::response::{parse_records, RawRecord};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed number of attempts with exponentially growing pauses in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// Pause after the given failed attempt (1-based): base, 2×base, 4×base...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Runs `op` until it succeeds, fails permanently, or attempts run out.
///
/// Only transient errors (see [`BulletinError::is_transient`]) are retried.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt >= policy.attempts => {
                return Err(BulletinError::RetriesExhausted {
                    attempts: attempt,
                    last_error: e.to_string(),
                });
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    target_label = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[derive(Serialize)]
struct SqlRequest<'a> {
    sql: &'a str,
}

/// Records together with the body they were parsed from
#[derive(Debug, Clone)]
pub struct FetchedRecords {
    pub records: Vec<RawRecord>,
    pub raw_body: String,
}

pub struct DatastoreClient {
    http: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl DatastoreClient {
    pub fn new(endpoint: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            retry,
        })
    }

    /// POSTs `{"sql": ...}` and returns the parsed records, retrying
    /// transient failures.
    pub async fn fetch_records(&self, sql: &str, label: &str) -> Result<FetchedRecords> {
        debug!(endpoint = %self.endpoint, sql, "Querying datastore");

        let raw_body = with_retry(&self.retry, label, |attempt| async move {
            debug!(attempt, "Sending datastore request");
            self.post_sql(sql).await
        })
        .await?;

        let records = parse_records(&raw_body)?;
        info!(target_label = label, rows = records.len(), "Datastore returned records");

        Ok(FetchedRecords { records, raw_body })
    }

    async fn post_sql(&self, sql: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&SqlRequest { sql })
            .send()
            .await?;

        let status = response.status();
        // CKAN reports bad SQL as 409 with a JSON body carrying the reason
        if !status.is_success() && status != reqwest::StatusCode::CONFLICT {
            return Err(BulletinError::HttpStatus {
                url: self.endpoint.clone(),
                status,
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    fn server_error() -> BulletinError {
        BulletinError::HttpStatus {
            url: "https://example.org".to_string(),
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_policy_needs_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result = with_retry(&fast_policy(3), "test", |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(server_error())
                } else {
                    Ok("body")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_configured_attempts() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(&fast_policy(2), "test", |_| {
            calls.set(calls.get() + 1);
            async { Err(server_error()) }
        })
        .await;

        assert_eq!(calls.get(), 2);
        match result {
            Err(BulletinError::RetriesExhausted { attempts, last_error }) => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("503"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(&fast_policy(5), "test", |_| {
            calls.set(calls.get() + 1);
            async { Err(BulletinError::Api("bad sql".to_string())) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(BulletinError::Api(_))));
    }

    const SQL_PATH: &str = "/api/3/action/datastore_search_sql";
    const SQL: &str = "SELECT \"value\" FROM \"t\" WHERE \"station_id\" IN ('4000022')";

    async fn client_for(server: &MockServer, attempts: u32) -> DatastoreClient {
        DatastoreClient::new(
            &format!("{}{}", server.uri(), SQL_PATH),
            Duration::from_secs(5),
            fast_policy(attempts),
        )
        .unwrap()
    }

    fn sql_request() -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path(SQL_PATH))
            .and(body_json(json!({ "sql": SQL })))
    }

    #[tokio::test]
    async fn test_fetch_posts_sql_and_parses_records() {
        let server = MockServer::start().await;
        let body = json!({
            "success": true,
            "result": { "records": [{
                "station_id": "4000022",
                "variable_id": 8,
                "reftime": "2024-01-15T08:00:00",
                "value": 215.0
            }] }
        })
        .to_string();
        sql_request()
            .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let fetched = client_for(&server, 3).await.fetch_records(SQL, "BO").await.unwrap();

        assert_eq!(fetched.records.len(), 1);
        assert_eq!(fetched.records[0].value, json!(215.0));
        assert_eq!(fetched.raw_body, body);
    }

    #[tokio::test]
    async fn test_conflict_body_reaches_response_parser() {
        let server = MockServer::start().await;
        let body = json!({
            "success": false,
            "error": { "__type": "Validation Error", "query": ["column does not exist"] }
        });
        sql_request()
            .respond_with(ResponseTemplate::new(409).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 3).await.fetch_records(SQL, "BO").await;

        match result {
            Err(BulletinError::Api(message)) => {
                assert!(message.contains("Validation Error"));
                assert!(message.contains("column does not exist"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_success() {
        let server = MockServer::start().await;
        sql_request()
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        sql_request()
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"success": true, "result": {"records": []}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetched = client_for(&server, 3).await.fetch_records(SQL, "BO").await.unwrap();
        assert!(fetched.records.is_empty());
    }

    #[tokio::test]
    async fn test_persistent_server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        sql_request()
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let result = client_for(&server, 2).await.fetch_records(SQL, "BO").await;

        match result {
            Err(BulletinError::RetriesExhausted { attempts, last_error }) => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("503"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        sql_request()
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, 3).await.fetch_records(SQL, "BO").await;

        match result {
            Err(BulletinError::HttpStatus { status, .. }) => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
