//! get_tables tool - list all tables in the database

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::tools::gateway::DbGateway;
use crate::tools::{GET_TABLES, Tool};

pub struct GetTablesTool {
    gateway: Arc<dyn DbGateway>,
}

impl GetTablesTool {
    pub fn new(gateway: Arc<dyn DbGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for GetTablesTool {
    fn name(&self) -> &'static str {
        GET_TABLES
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        self.gateway.query("show tables").await
    }
}
