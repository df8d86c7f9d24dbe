//! execute_query tool - run a SQL query against the database

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SleuthError};
use crate::tools::gateway::DbGateway;
use crate::tools::{EXECUTE_QUERY, Tool};

pub struct ExecuteQueryTool {
    gateway: Arc<dyn DbGateway>,
}

impl ExecuteQueryTool {
    pub fn new(gateway: Arc<dyn DbGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for ExecuteQueryTool {
    fn name(&self) -> &'static str {
        EXECUTE_QUERY
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let query = input["query"]
            .as_str()
            .ok_or_else(|| SleuthError::Tool("missing 'query' parameter".into()))?;

        self.gateway.query(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::gateway::MockDbGateway;
    use serde_json::json;

    #[tokio::test]
    async fn test_executes_query() {
        let gateway = Arc::new(MockDbGateway::new().with_query_result(json!({
            "reply": [{"dc_id": "4278"}, {"dc_id": "9294"}],
            "error": "OK"
        })));
        let tool = ExecuteQueryTool::new(gateway.clone());

        let reply = tool
            .execute(json!({"query": "SELECT dc_id FROM datacenters"}))
            .await
            .unwrap();
        assert_eq!(reply["error"], "OK");
        assert_eq!(reply["reply"].as_array().unwrap().len(), 2);
        assert_eq!(
            gateway.recorded_queries(),
            vec!["SELECT dc_id FROM datacenters"]
        );
    }

    #[tokio::test]
    async fn test_syntax_error_is_gateway_error_reply() {
        let gateway = Arc::new(
            MockDbGateway::new()
                .with_query_result(json!({"reply": [], "error": "syntax error"})),
        );
        let tool = ExecuteQueryTool::new(gateway);

        let reply = tool.execute(json!({"query": "SELEC"})).await.unwrap();
        assert_eq!(reply["error"], "syntax error");
    }

    #[tokio::test]
    async fn test_missing_query_is_error() {
        let gateway = Arc::new(MockDbGateway::new());
        let tool = ExecuteQueryTool::new(gateway.clone());

        let result = tool.execute(json!({})).await;
        assert!(matches!(result, Err(SleuthError::Tool(_))));
        // No collaborator call happened
        assert!(gateway.recorded_queries().is_empty());
    }
}
