//! get_table_structure tool - fetch the create statement for one table

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SleuthError};
use crate::tools::gateway::DbGateway;
use crate::tools::{GET_TABLE_STRUCTURE, Tool};

pub struct TableStructureTool {
    gateway: Arc<dyn DbGateway>,
}

impl TableStructureTool {
    pub fn new(gateway: Arc<dyn DbGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for TableStructureTool {
    fn name(&self) -> &'static str {
        GET_TABLE_STRUCTURE
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let table_name = input["table_name"]
            .as_str()
            .ok_or_else(|| SleuthError::Tool("missing 'table_name' parameter".into()))?;

        self.gateway
            .query(&format!("show create table {}", table_name))
            .await
    }
}
