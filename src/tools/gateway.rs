//! Database gateway - the external collaborator behind the schema tools
//!
//! The HQ database API accepts raw queries over JSON and answers with
//! `{reply, error}` where `error == "OK"` denotes success. Answers to the
//! task go to a separate report endpoint. The trait keeps HTTP out of the
//! loop's tests; MockDbGateway serves scripted schema and rows.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{Result, SleuthError};

/// Task identifier used by the HQ database API
const GATEWAY_TASK: &str = "database";

/// External database collaborator
#[async_trait]
pub trait DbGateway: Send + Sync {
    /// Run a raw query; returns the `{reply, error}` object verbatim
    async fn query(&self, sql: &str) -> Result<Value>;

    /// Submit the final answer; returns the `{code, message}` acknowledgement
    async fn report(&self, answer: &[String]) -> Result<Value>;
}

/// HTTP implementation against the HQ endpoints
pub struct HttpDbGateway {
    client: Client,
    api_url: String,
    report_url: String,
    api_key: String,
}

impl HttpDbGateway {
    pub fn new(
        api_url: impl Into<String>,
        report_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SleuthError::Gateway(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            report_url: report_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn post_json(&self, url: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SleuthError::Gateway(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SleuthError::Gateway(format!(
                "{} returned {}: {}",
                url, status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SleuthError::Gateway(format!("invalid JSON from {}: {}", url, e)))
    }
}

#[async_trait]
impl DbGateway for HttpDbGateway {
    async fn query(&self, sql: &str) -> Result<Value> {
        tracing::debug!(query = %sql, "Querying database gateway");
        self.post_json(
            &self.api_url,
            json!({
                "task": GATEWAY_TASK,
                "apikey": self.api_key,
                "query": sql
            }),
        )
        .await
    }

    async fn report(&self, answer: &[String]) -> Result<Value> {
        tracing::info!(?answer, "Reporting answer to central system");
        self.post_json(
            &self.report_url,
            json!({
                "task": GATEWAY_TASK,
                "apikey": self.api_key,
                "answer": answer
            }),
        )
        .await
    }
}

/// Mock gateway serving scripted schema, rows, and acknowledgements
///
/// `show tables` and `show create table` are answered from the configured
/// tables and structures; any other query pops the next scripted result.
#[derive(Default)]
pub struct MockDbGateway {
    tables: Vec<String>,
    structures: HashMap<String, String>,
    query_results: Mutex<VecDeque<Value>>,
    report_code: i64,
    queries: Mutex<Vec<String>>,
    reported: Mutex<Vec<Vec<String>>>,
}

impl MockDbGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table listing
    pub fn with_tables(mut self, tables: &[&str]) -> Self {
        self.tables = tables.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a create statement for a table
    pub fn with_structure(mut self, table: &str, create: &str) -> Self {
        self.structures.insert(table.to_string(), create.to_string());
        self
    }

    /// Queue a `{reply, error}` object for the next non-introspection query
    pub fn with_query_result(self, result: Value) -> Self {
        self.query_results.lock().unwrap().push_back(result);
        self
    }

    /// Set the acknowledgement code returned by report (0 = accepted)
    pub fn with_report_code(mut self, code: i64) -> Self {
        self.report_code = code;
        self
    }

    /// Every query received, in order
    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Every reported answer, in order
    pub fn recorded_answers(&self) -> Vec<Vec<String>> {
        self.reported.lock().unwrap().clone()
    }
}

#[async_trait]
impl DbGateway for MockDbGateway {
    async fn query(&self, sql: &str) -> Result<Value> {
        self.queries.lock().unwrap().push(sql.to_string());

        if sql.eq_ignore_ascii_case("show tables") {
            let rows: Vec<Value> = self
                .tables
                .iter()
                .map(|t| json!({ "table_name": t }))
                .collect();
            return Ok(json!({ "reply": rows, "error": "OK" }));
        }

        if let Some(table) = sql
            .strip_prefix("show create table ")
            .or_else(|| sql.strip_prefix("SHOW CREATE TABLE "))
        {
            let table = table.trim().trim_end_matches(';');
            return match self.structures.get(table) {
                Some(create) => Ok(json!({
                    "reply": [{ "Table": table, "Create Table": create }],
                    "error": "OK"
                })),
                None => Ok(json!({
                    "reply": [],
                    "error": format!("unknown table: {}", table)
                })),
            };
        }

        match self.query_results.lock().unwrap().pop_front() {
            Some(result) => Ok(result),
            None => Ok(json!({
                "reply": [],
                "error": "no scripted result for query"
            })),
        }
    }

    async fn report(&self, answer: &[String]) -> Result<Value> {
        self.reported.lock().unwrap().push(answer.to_vec());
        Ok(json!({
            "code": self.report_code,
            "message": if self.report_code == 0 { "accepted" } else { "rejected" }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_gateway() -> MockDbGateway {
        MockDbGateway::new()
            .with_tables(&["datacenters", "users"])
            .with_structure("datacenters", "CREATE TABLE datacenters (dc_id int, manager int)")
    }

    #[tokio::test]
    async fn test_mock_show_tables() {
        let gateway = scenario_gateway();
        let reply = gateway.query("show tables").await.unwrap();
        assert_eq!(reply["error"], "OK");
        assert_eq!(reply["reply"][0]["table_name"], "datacenters");
        assert_eq!(reply["reply"][1]["table_name"], "users");
    }

    #[tokio::test]
    async fn test_mock_show_create_table() {
        let gateway = scenario_gateway();
        let reply = gateway.query("show create table datacenters").await.unwrap();
        assert_eq!(reply["error"], "OK");
        assert_eq!(reply["reply"][0]["Table"], "datacenters");
        assert!(
            reply["reply"][0]["Create Table"]
                .as_str()
                .unwrap()
                .starts_with("CREATE TABLE")
        );
    }

    #[tokio::test]
    async fn test_mock_show_create_unknown_table() {
        let gateway = scenario_gateway();
        let reply = gateway.query("show create table nope").await.unwrap();
        assert_ne!(reply["error"], "OK");
        assert!(reply["error"].as_str().unwrap().contains("unknown table"));
    }

    #[tokio::test]
    async fn test_mock_scripted_query_results_in_order() {
        let gateway = MockDbGateway::new()
            .with_query_result(json!({"reply": [{"dc_id": "4278"}], "error": "OK"}))
            .with_query_result(json!({"reply": [], "error": "syntax error"}));

        let first = gateway.query("SELECT 1").await.unwrap();
        let second = gateway.query("SELECT 2").await.unwrap();
        assert_eq!(first["error"], "OK");
        assert_eq!(second["error"], "syntax error");
    }

    #[tokio::test]
    async fn test_mock_unscripted_query_is_gateway_error_reply() {
        let gateway = MockDbGateway::new();
        let reply = gateway.query("SELECT 1").await.unwrap();
        assert_ne!(reply["error"], "OK");
    }

    #[tokio::test]
    async fn test_mock_records_queries() {
        let gateway = scenario_gateway();
        gateway.query("show tables").await.unwrap();
        gateway.query("SELECT 1").await.unwrap();
        assert_eq!(gateway.recorded_queries(), vec!["show tables", "SELECT 1"]);
    }

    #[tokio::test]
    async fn test_mock_report_accepted() {
        let gateway = MockDbGateway::new();
        let ack = gateway
            .report(&["4278".to_string(), "9294".to_string()])
            .await
            .unwrap();
        assert_eq!(ack["code"], 0);
        assert_eq!(gateway.recorded_answers(), vec![vec!["4278", "9294"]]);
    }

    #[tokio::test]
    async fn test_mock_report_rejected_code() {
        let gateway = MockDbGateway::new().with_report_code(-1);
        let ack = gateway.report(&["wrong".to_string()]).await.unwrap();
        assert_eq!(ack["code"], -1);
    }

    #[test]
    fn test_http_gateway_construction() {
        let gateway = HttpDbGateway::new(
            "https://hq.example/apidb",
            "https://hq.example/report",
            "key",
            Duration::from_secs(30),
        );
        assert!(gateway.is_ok());
    }
}
