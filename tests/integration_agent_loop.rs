//! Agent loop integration tests
//!
//! Drives the full controller against a scripted reasoning component and a
//! mock database gateway: the datacenter scenario end to end, budget
//! exhaustion, and recovery from collaborator errors.

use std::sync::Arc;

use serde_json::json;

use dbsleuth::agent::{
    ControllerConfig, Decider, Describer, LoopController, Planner, TaskOutcome, TaskReport,
    ToolDispatcher,
};
use dbsleuth::domain::Task;
use dbsleuth::llm::{LlmClient, MockLlmClient};
use dbsleuth::tools::{
    AnalyzeStructureTool, ExecuteQueryTool, FINAL_ANSWER, FinalAnswerTool, GetTablesTool,
    MockDbGateway, TableStructureTool, ToolRegistry,
};

const GOAL: &str = "list dc_id of active datacenters whose manager is an inactive user";

const DATACENTERS_DDL: &str =
    "CREATE TABLE datacenters (dc_id int, location varchar(30), manager int, is_active int)";
const USERS_DDL: &str = "CREATE TABLE users (id int, username varchar(20), is_active int)";

fn build_controller(
    responses: Vec<&str>,
    gateway: Arc<MockDbGateway>,
    max_cycles: u32,
) -> (LoopController, Arc<MockLlmClient>) {
    let llm = Arc::new(MockLlmClient::new(responses));
    let llm_dyn: Arc<dyn LlmClient> = llm.clone();
    let registry = Arc::new(ToolRegistry::builtin());

    let mut dispatcher = ToolDispatcher::new(registry.clone());
    dispatcher.register(Box::new(GetTablesTool::new(gateway.clone())));
    dispatcher.register(Box::new(TableStructureTool::new(gateway.clone())));
    dispatcher.register(Box::new(ExecuteQueryTool::new(gateway.clone())));
    dispatcher.register(Box::new(AnalyzeStructureTool::new(llm_dyn.clone())));
    dispatcher.register(Box::new(FinalAnswerTool::new(gateway)));

    let controller = LoopController::new(
        registry.clone(),
        Planner::new(llm_dyn.clone(), registry.clone()),
        Decider::new(llm_dyn.clone(), registry),
        Describer::new(llm_dyn),
        dispatcher,
    )
    .with_config(ControllerConfig {
        max_cycles,
        ..Default::default()
    });

    (controller, llm)
}

fn scenario_gateway() -> MockDbGateway {
    MockDbGateway::new()
        .with_tables(&["datacenters", "users"])
        .with_structure("datacenters", DATACENTERS_DDL)
        .with_structure("users", USERS_DDL)
}

/// The full script for the happy path: seed plan, then per cycle a decision,
/// any reasoning-backed argument payloads, and a revision (except after the
/// terminal dispatch).
fn happy_path_script() -> Vec<&'static str> {
    vec![
        // seed plan
        "*thinking* Discover the schema first, then build and run the query.\n\n\
         - get_tables: list all tables\n\
         - get_table_structure: inspect datacenters and users\n\
         - analyze_structure: build the query\n\
         - execute_query: run it\n\
         - final_answer: report the dc ids",
        // cycle 1: list tables
        r#"{"_thoughts": "no listing yet", "tool": "get_tables"}"#,
        "- get_table_structure: inspect datacenters and users\n\
         - analyze_structure: build the query\n\
         - execute_query: run it\n\
         - final_answer: report the dc ids",
        // cycle 2: datacenters structure
        r#"{"_thoughts": "datacenters schema first", "tool": "get_table_structure"}"#,
        r#"{"_thoughts": "datacenters is central here", "table_name": "datacenters"}"#,
        "- get_table_structure: users is still missing\n\
         - analyze_structure: build the query\n\
         - execute_query: run it\n\
         - final_answer: report the dc ids",
        // cycle 3: users structure
        r#"{"_thoughts": "users schema next", "tool": "get_table_structure"}"#,
        r#"{"_thoughts": "only users is missing", "table_name": "users"}"#,
        "- analyze_structure: both schemas known, build the query\n\
         - execute_query: run it\n\
         - final_answer: report the dc ids",
        // cycle 4: synthesize the query (decision, then the SQL expert reply)
        r#"{"_thoughts": "schemas complete, build SQL", "tool": "analyze_structure"}"#,
        "SELECT d.dc_id FROM datacenters d JOIN users u ON d.manager = u.id \
         WHERE d.is_active = 1 AND u.is_active = 0",
        "- execute_query: run the built query\n\
         - final_answer: report the dc ids",
        // cycle 5: run it
        r#"{"_thoughts": "query is ready", "tool": "execute_query"}"#,
        "- final_answer: rows are in, report them",
        // cycle 6: report
        r#"{"_thoughts": "results obtained, submit", "tool": "final_answer"}"#,
    ]
}

async fn run_happy_path() -> (TaskReport, Arc<MockDbGateway>) {
    let gateway = Arc::new(scenario_gateway().with_query_result(json!({
        "reply": [{"dc_id": "4278"}, {"dc_id": "9294"}],
        "error": "OK"
    })));
    let (controller, _) = build_controller(happy_path_script(), gateway.clone(), 10);
    let report = controller.run(&Task::new(GOAL)).await;
    (report, gateway)
}

#[tokio::test]
async fn test_datacenter_scenario_completes_within_six_cycles() {
    let (report, gateway) = run_happy_path().await;

    assert_eq!(
        report.outcome,
        TaskOutcome::Completed {
            answer: vec!["4278".to_string(), "9294".to_string()]
        }
    );
    assert!(report.cycles <= 6);
    assert_eq!(report.trace.len(), 6);
    assert_eq!(gateway.recorded_answers(), vec![vec!["4278", "9294"]]);
}

#[tokio::test]
async fn test_terminal_tool_appears_once_and_last() {
    let (report, _) = run_happy_path().await;

    assert_eq!(report.trace.count_tool(FINAL_ANSWER), 1);
    let entries = report.trace.entries();
    assert_eq!(entries.last().unwrap().action.tool_name, FINAL_ANSWER);
    assert!(entries.last().unwrap().result.is_ok());
    for entry in &entries[..entries.len() - 1] {
        assert_ne!(entry.action.tool_name, FINAL_ANSWER);
    }
}

#[tokio::test]
async fn test_executed_query_comes_from_synthesized_sql() {
    let (report, gateway) = run_happy_path().await;

    let queries = gateway.recorded_queries();
    // listing, two structure fetches, then the synthesized query
    assert_eq!(queries[0], "show tables");
    assert!(queries[3].starts_with("SELECT d.dc_id"));
    assert_eq!(report.trace.entries()[4].action.arguments["query"], queries[3]);
}

#[tokio::test]
async fn test_every_plan_revision_is_preserved() {
    let (report, _) = run_happy_path().await;

    // seed plus one revision per non-terminal cycle
    assert_eq!(report.plans.len(), 6);
    for (i, plan) in report.plans.iter().enumerate() {
        assert_eq!(plan.revision, i as u32);
    }
    // each trace entry carries the plan snapshot of its cycle
    for (i, entry) in report.trace.entries().iter().enumerate() {
        assert_eq!(entry.plan.revision, i as u32);
    }
}

#[tokio::test]
async fn test_plan_revision_is_deterministic_at_tool_level() {
    let (first, _) = run_happy_path().await;
    let (second, _) = run_happy_path().await;

    let pending = |report: &TaskReport| -> Vec<Vec<String>> {
        report
            .plans
            .iter()
            .map(|p| p.pending_tools().iter().map(|t| t.to_string()).collect())
            .collect()
    };
    assert_eq!(pending(&first), pending(&second));
}

#[tokio::test]
async fn test_budget_of_two_exhausts_without_fabricated_answer() {
    let gateway = Arc::new(scenario_gateway());
    // Only the first two cycles of the script are reachable
    let (controller, _) = build_controller(happy_path_script(), gateway.clone(), 2);

    let report = controller.run(&Task::new(GOAL)).await;

    assert_eq!(report.outcome, TaskOutcome::Exhausted);
    assert_eq!(report.cycles, 2);
    assert_eq!(report.trace.len(), 2);
    assert_eq!(report.trace.count_tool(FINAL_ANSWER), 0);
    assert!(gateway.recorded_answers().is_empty());
}

#[tokio::test]
async fn test_query_error_keeps_query_steps_in_next_plan() {
    // The gateway answers the synthesized query with a syntax error; the
    // revision after that failure must still plan analyze_structure or
    // execute_query rather than giving up.
    let gateway = Arc::new(
        scenario_gateway().with_query_result(json!({"reply": [], "error": "syntax error"})),
    );

    let mut script = happy_path_script();
    script.truncate(14); // up to and including the revision after cycle 5
    script[13] = "- analyze_structure: rebuild the query after the syntax error\n\
                  - execute_query: retry\n\
                  - final_answer: report the dc ids";

    let (controller, _) = build_controller(script, gateway, 5);
    let report = controller.run(&Task::new(GOAL)).await;

    assert_eq!(report.outcome, TaskOutcome::Exhausted);

    let failed = report.trace.last().unwrap();
    assert_eq!(failed.action.tool_name, "execute_query");
    assert_eq!(failed.result.error_detail.as_deref(), Some("syntax error"));

    let last_plan = report.plans.last().unwrap();
    let tools: Vec<&str> = last_plan
        .steps
        .iter()
        .map(|s| s.tool_name.as_str())
        .collect();
    assert!(tools.contains(&"analyze_structure") || tools.contains(&"execute_query"));
    assert!(last_plan.has_pending("execute_query"));
}

#[tokio::test]
async fn test_trace_grows_by_exactly_one_entry_per_executed_cycle() {
    let (report, _) = run_happy_path().await;

    assert_eq!(report.trace.len() as u32, report.cycles);
    // Entries are in dispatch order
    let tools: Vec<&str> = report
        .trace
        .entries()
        .iter()
        .map(|e| e.action.tool_name.as_str())
        .collect();
    assert_eq!(
        tools,
        vec![
            "get_tables",
            "get_table_structure",
            "get_table_structure",
            "analyze_structure",
            "execute_query",
            "final_answer"
        ]
    );
}
