use std::time::Duration;

use log::info;
use reqwest::{
    blocking::Client,
    header::{ACCEPT, USER_AGENT},
};
use serde_json::Value;
use thiserror::Error;

use super::_api_elia_core::{export_query, export_url, truncate_body, DateFilter, MAX_ERROR_BODY};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("expected a list or an object with a `results` list, got {0}")]
    UnexpectedShape(&'static str),
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Request(reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e)
        }
    }
}

/// Something that can return all the records of a catalog dataset.
pub trait ExportSource {
    fn fetch_export(
        &self,
        dataset_id: &str,
        filter: Option<&DateFilter>,
    ) -> Result<Vec<Value>, FetchError>;
}

pub struct EliaExportClient {
    pub base_url: String,
    client: Client,
}

impl EliaExportClient {
    /// `timeout` bounds the whole request, reading the body included.
    pub fn new(base_url: &str, timeout: Duration) -> Result<EliaExportClient, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(EliaExportClient::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: Client) -> EliaExportClient {
        EliaExportClient {
            base_url: base_url.to_string(),
            client,
        }
    }
}

impl ExportSource for EliaExportClient {
    /// One unpaginated request for the whole dataset.
    fn fetch_export(
        &self,
        dataset_id: &str,
        filter: Option<&DateFilter>,
    ) -> Result<Vec<Value>, FetchError> {
        let url = export_url(&self.base_url, dataset_id);
        let query = export_query(filter);
        info!("  URL: {}", url);
        info!("  Params: {:?}", query);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, concat!("elia-grid/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/json")
            .query(&query)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body, MAX_ERROR_BODY),
            });
        }
        let body = response.text()?;
        records_from_body(serde_json::from_str(&body)?)
    }
}

/// The export endpoint usually returns a bare list, some deployments wrap it
/// in `{"results": [...]}`.  Both are accepted.
pub fn records_from_body(body: Value) -> Result<Vec<Value>, FetchError> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(records)) => Ok(records),
            Some(other) => Err(FetchError::UnexpectedShape(kind(&other))),
            None => Err(FetchError::UnexpectedShape("an object without `results`")),
        },
        other => Err(FetchError::UnexpectedShape(kind(&other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use jiff::civil::date;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Run the blocking client off the async runtime.  It is built and dropped on
    /// the blocking thread.
    async fn fetch(
        base_url: String,
        dataset_id: &'static str,
        filter: Option<DateFilter>,
        timeout: Duration,
    ) -> Result<Vec<Value>, FetchError> {
        tokio::task::spawn_blocking(move || {
            let client = Client::builder()
                .timeout(timeout)
                .no_proxy()
                .build()?;
            EliaExportClient::with_client(&base_url, client).fetch_export(dataset_id, filter.as_ref())
        })
        .await
        .expect("fetch task panicked")
    }

    fn catalog(server: &MockServer) -> String {
        format!("{}/catalog/datasets", server.uri())
    }

    #[test]
    fn body_shapes() {
        let records = records_from_body(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(records.len(), 2);

        let records = records_from_body(json!({"total_count": 1, "results": [{"a": 1}]})).unwrap();
        assert_eq!(records, vec![json!({"a": 1})]);

        assert!(matches!(
            records_from_body(json!({"error": "nope"})),
            Err(FetchError::UnexpectedShape(_))
        ));
        assert!(matches!(
            records_from_body(json!({"results": 3})),
            Err(FetchError::UnexpectedShape("a number"))
        ));
        assert!(matches!(
            records_from_body(json!("text")),
            Err(FetchError::UnexpectedShape("a string"))
        ));
    }

    #[tokio::test]
    async fn fetch_with_filter() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/catalog/datasets/ods031/exports/json"))
            .and(query_param("limit", "-1"))
            .and(query_param(
                "where",
                "datetime >= '2024-01-01' AND datetime <= '2024-01-31'",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"datetime": "2024-01-01T00:00:00+00:00", "measured": 12.5}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let filter = DateFilter::new(date(2024, 1, 1), date(2024, 1, 31))?;
        let records = fetch(catalog(&server), "ods031", Some(filter), Duration::from_secs(10)).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["measured"], json!(12.5));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            requests[0].url.query(),
            Some("limit=-1&where=datetime+%3E%3D+%272024-01-01%27+AND+datetime+%3C%3D+%272024-01-31%27")
        );
        Ok(())
    }

    #[tokio::test]
    async fn fetch_wrapped_results() -> Result<(), Box<dyn Error>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/catalog/datasets/ods001/exports/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [{"a": 1}, {"a": 2}, {"a": 3}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let records = fetch(catalog(&server), "ods001", None, Duration::from_secs(10)).await?;
        assert_eq!(records.len(), 3);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), Some("limit=-1"));
        Ok(())
    }

    #[tokio::test]
    async fn unexpected_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error_code": "x"})))
            .mount(&server)
            .await;
        let err = fetch(catalog(&server), "ods032", None, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedShape(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn non_success_status_is_truncated() {
        let server = MockServer::start().await;
        let body = format!("{{\"error\": \"{}\"}}", "z".repeat(400));
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string(body))
            .mount(&server)
            .await;

        let err = fetch(catalog(&server), "ods032", None, Duration::from_secs(10))
            .await
            .unwrap_err();
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body.chars().count(), 200);
                assert!(body.starts_with("{\"error\""));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&server)
            .await;
        let err = fetch(catalog(&server), "ods031", None, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout), "got {:?}", err);
    }

    #[ignore]
    #[test]
    fn fetch_wind_power_live() -> Result<(), Box<dyn Error>> {
        let client = EliaExportClient::new(crate::config::DEFAULT_API_BASE, Duration::from_secs(120))?;
        let filter = DateFilter::new(date(2024, 1, 1), date(2024, 1, 1))?;
        let records = client.fetch_export("ods031", Some(&filter))?;
        assert!(!records.is_empty());
        Ok(())
    }
}
