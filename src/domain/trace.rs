//! The trace: append-only record of everything the loop did
//!
//! The trace is the sole persistent record the reasoning component may
//! condition on. Entries are never mutated after being appended; read helpers
//! expose the discovered schema facts the Decider and Describer need.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::action::{Action, ExecutionResult};
use crate::domain::plan::Plan;
use crate::tools::{GET_TABLE_STRUCTURE, GET_TABLES};

/// One completed cycle: plan snapshot, action, result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// The plan as it stood when the cycle started
    pub plan: Plan,
    pub action: Action,
    pub result: ExecutionResult,
    /// Post-hoc reflection from the reasoning component, diagnostic only
    pub reflection: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TraceEntry {
    pub fn new(
        plan: Plan,
        action: Action,
        result: ExecutionResult,
        reflection: Option<String>,
    ) -> Self {
        Self {
            plan,
            action,
            result,
            reflection,
            created_at: Utc::now(),
        }
    }
}

/// Append-only ordered sequence of trace entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; there is deliberately no way to remove or edit one
    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.last()
    }

    /// Number of entries dispatching the given tool
    pub fn count_tool(&self, tool_name: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action.tool_name == tool_name)
            .count()
    }

    /// Whether the given tool has at least one successful entry
    pub fn has_succeeded(&self, tool_name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.action.tool_name == tool_name && e.result.is_ok())
    }

    /// Payload of the most recent successful entry for the given tool
    pub fn latest_ok_payload(&self, tool_name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.action.tool_name == tool_name && e.result.is_ok())
            .map(|e| &e.result.payload)
    }

    /// Table names discovered by the most recent successful listing
    ///
    /// Rows carry a `table_name` field; as a fallback the first string value
    /// of each row is taken.
    pub fn listed_tables(&self) -> Vec<String> {
        let Some(rows) = self.latest_ok_payload(GET_TABLES).and_then(|p| p.as_array()) else {
            return Vec::new();
        };

        rows.iter()
            .filter_map(|row| {
                let obj = row.as_object()?;
                obj.get("table_name")
                    .and_then(|v| v.as_str())
                    .or_else(|| obj.values().find_map(|v| v.as_str()))
                    .map(String::from)
            })
            .collect()
    }

    /// Every table structure fetched so far, keyed by table name
    pub fn table_structures(&self) -> BTreeMap<String, String> {
        let mut structures = BTreeMap::new();
        for entry in &self.entries {
            if entry.action.tool_name != GET_TABLE_STRUCTURE || !entry.result.is_ok() {
                continue;
            }
            let Some(rows) = entry.result.payload.as_array() else {
                continue;
            };
            for row in rows {
                if let (Some(table), Some(create)) = (
                    row.get("Table").and_then(|v| v.as_str()),
                    row.get("Create Table").and_then(|v| v.as_str()),
                ) {
                    structures.insert(table.to_string(), create.to_string());
                }
            }
        }
        structures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::Plan;
    use serde_json::json;

    fn plan() -> Plan {
        Plan::parse("- get_tables: list", &["get_tables"]).unwrap()
    }

    fn entry(tool: &str, result: ExecutionResult) -> TraceEntry {
        TraceEntry::new(plan(), Action::new(tool, "", json!({})), result, None)
    }

    #[test]
    fn test_trace_starts_empty() {
        let trace = Trace::new();
        assert!(trace.is_empty());
        assert_eq!(trace.len(), 0);
        assert!(trace.last().is_none());
    }

    #[test]
    fn test_push_grows_monotonically() {
        let mut trace = Trace::new();
        trace.push(entry("get_tables", ExecutionResult::ok(json!([]))));
        assert_eq!(trace.len(), 1);
        trace.push(entry("execute_query", ExecutionResult::error("boom")));
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.last().unwrap().action.tool_name, "execute_query");
    }

    #[test]
    fn test_count_tool() {
        let mut trace = Trace::new();
        trace.push(entry("get_tables", ExecutionResult::ok(json!([]))));
        trace.push(entry("get_tables", ExecutionResult::error("down")));
        assert_eq!(trace.count_tool("get_tables"), 2);
        assert_eq!(trace.count_tool("final_answer"), 0);
    }

    #[test]
    fn test_has_succeeded_ignores_failures() {
        let mut trace = Trace::new();
        trace.push(entry("execute_query", ExecutionResult::error("syntax error")));
        assert!(!trace.has_succeeded("execute_query"));
        trace.push(entry("execute_query", ExecutionResult::ok(json!([]))));
        assert!(trace.has_succeeded("execute_query"));
    }

    #[test]
    fn test_latest_ok_payload_picks_most_recent() {
        let mut trace = Trace::new();
        trace.push(entry("analyze_structure", ExecutionResult::ok(json!("SELECT 1"))));
        trace.push(entry("analyze_structure", ExecutionResult::ok(json!("SELECT 2"))));
        trace.push(entry("analyze_structure", ExecutionResult::error("empty")));
        assert_eq!(
            trace.latest_ok_payload("analyze_structure").unwrap(),
            &json!("SELECT 2")
        );
    }

    #[test]
    fn test_listed_tables() {
        let mut trace = Trace::new();
        trace.push(entry(
            GET_TABLES,
            ExecutionResult::ok(json!([
                {"table_name": "datacenters"},
                {"table_name": "users"}
            ])),
        ));
        assert_eq!(trace.listed_tables(), vec!["datacenters", "users"]);
    }

    #[test]
    fn test_listed_tables_fallback_field() {
        let mut trace = Trace::new();
        trace.push(entry(
            GET_TABLES,
            ExecutionResult::ok(json!([{"Tables_in_db": "users"}])),
        ));
        assert_eq!(trace.listed_tables(), vec!["users"]);
    }

    #[test]
    fn test_listed_tables_empty_without_listing() {
        let trace = Trace::new();
        assert!(trace.listed_tables().is_empty());
    }

    #[test]
    fn test_table_structures_accumulate() {
        let mut trace = Trace::new();
        trace.push(entry(
            GET_TABLE_STRUCTURE,
            ExecutionResult::ok(json!([
                {"Table": "datacenters", "Create Table": "CREATE TABLE datacenters (...)"}
            ])),
        ));
        trace.push(entry(
            GET_TABLE_STRUCTURE,
            ExecutionResult::ok(json!([
                {"Table": "users", "Create Table": "CREATE TABLE users (...)"}
            ])),
        ));

        let structures = trace.table_structures();
        assert_eq!(structures.len(), 2);
        assert!(structures["datacenters"].starts_with("CREATE TABLE datacenters"));
        assert!(structures["users"].starts_with("CREATE TABLE users"));
    }

    #[test]
    fn test_table_structures_skip_failed_entries() {
        let mut trace = Trace::new();
        trace.push(entry(GET_TABLE_STRUCTURE, ExecutionResult::error("unknown table")));
        assert!(trace.table_structures().is_empty());
    }
}
