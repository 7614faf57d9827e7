//! Assistant agents taking turns against a mock completion client.

mod common;

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::MockProvider;
use parley::agent::AssistantAgent;
use parley::error::{ErrorCategory, ParleyError};
use parley::team::*;
use parley::tools::{FnTool, ParamKind, Tool, ToolSchema};
use parley::types::Role;

/// A `write_file` tool that records what it was asked to write.
fn write_file_tool(written: Arc<Mutex<Vec<(String, String)>>>) -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "write_file",
        "Write content to a file",
        ToolSchema::object()
            .required("path", ParamKind::String, "Target path")
            .required("content", ParamKind::String, "File content")
            .build(),
        move |args, _ctx| {
            let written = Arc::clone(&written);
            async move {
                let path = args.get_str("path")?.to_string();
                let content = args.get_str("content")?.to_string();
                let len = content.len();
                written.lock().unwrap().push((path.clone(), content));
                Ok(json!(format!("Wrote {len} bytes to {path}")))
            }
        },
    ))
}

#[tokio::test]
async fn assistants_see_each_other_as_named_users() {
    let provider = Arc::new(MockProvider::new("gpt-4o"));
    provider.queue_response("hello from one");
    provider.queue_response("hello from two");

    let mut team = RoundRobinTeam::builder()
        .participant(AssistantAgent::new("one", provider.clone()))
        .participant(AssistantAgent::new("two", provider.clone()))
        .termination(MaxMessages::new(3))
        .build()
        .unwrap();

    let result = team.run("say hello", &CancellationToken::new()).await.unwrap();
    assert_eq!(result.last_content(), Some("hello from two"));

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);

    let first = &requests[0].messages;
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].role, Role::System);
    assert_eq!(first[1].role, Role::User);
    assert_eq!(first[1].text(), "say hello");
    assert!(requests[0].tools.is_none());

    let second = &requests[1].messages;
    assert_eq!(second.len(), 3);
    assert_eq!(second[2].role, Role::User);
    assert_eq!(second[2].name.as_deref(), Some("one"));
    assert_eq!(second[2].text(), "hello from one");
}

#[tokio::test]
async fn usage_is_recorded_on_messages() {
    let provider = Arc::new(MockProvider::new("gpt-4o"));
    provider.queue_response("a");
    provider.queue_response("b");

    let mut team = RoundRobinTeam::builder()
        .participant(AssistantAgent::new("one", provider.clone()))
        .termination(AnyOf::default().or(TokenUsage::new(60)).or(MaxMessages::new(10)))
        .build()
        .unwrap();

    let result = team.run("go", &CancellationToken::new()).await.unwrap();

    assert_eq!(result.transcript.len(), 3);
    assert_eq!(result.transcript.total_usage().total_tokens, 60);
    match result.stop_reason {
        StopReason::Condition(reason) => assert_eq!(reason.condition, ConditionKind::TokenUsage),
        other => panic!("expected token budget stop, got {other:?}"),
    }
}

#[tokio::test]
async fn reflecting_assistant_writes_file_then_reports() {
    let written = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(MockProvider::new("gpt-4o"));
    provider.queue_tool_call(
        "call_1",
        "write_file",
        json!({"path": "/tmp/task/summary.md", "content": "# Summary"}),
    );
    provider.queue_response("The summary was successfully written.");

    let writer = AssistantAgent::new("ai_assistant_1", provider.clone())
        .with_tools([write_file_tool(Arc::clone(&written))])
        .unwrap()
        .with_reflect_on_tool_use(true);
    let reviewer = AssistantAgent::new("ai_assistant_2", provider.clone());

    let mut team = RoundRobinTeam::builder()
        .participant(writer)
        .participant(reviewer)
        .termination(
            AnyOf::default()
                .or(TextMention::new("successfully written"))
                .or(MaxMessages::new(10)),
        )
        .build()
        .unwrap();

    let result = team.run("summarise and save", &CancellationToken::new()).await.unwrap();

    assert_eq!(result.transcript.len(), 2);
    assert_eq!(
        result.last_content(),
        Some("The summary was successfully written.")
    );
    assert_eq!(
        written.lock().unwrap().clone(),
        vec![("/tmp/task/summary.md".to_string(), "# Summary".to_string())]
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let tools = requests[0].tools.as_ref().expect("tools advertised");
    assert_eq!(tools[0].name, "write_file");
    let reflection = &requests[1].messages;
    assert_eq!(reflection.last().unwrap().role, Role::Tool);

    let usage = result.transcript.get(1).unwrap().usage.unwrap();
    assert_eq!(usage.total_tokens, 45);
}

#[tokio::test]
async fn without_reflection_the_tool_output_is_the_reply() {
    let written = Arc::new(Mutex::new(Vec::new()));
    let provider = Arc::new(MockProvider::new("gpt-4o"));
    provider.queue_tool_call(
        "call_1",
        "write_file",
        json!({"path": "out.md", "content": "hello"}),
    );

    let mut team = RoundRobinTeam::builder()
        .participant(
            AssistantAgent::new("writer", provider.clone())
                .with_tools([write_file_tool(written)])
                .unwrap(),
        )
        .termination(MaxMessages::new(2))
        .build()
        .unwrap();

    let result = team.run("write it", &CancellationToken::new()).await.unwrap();

    assert_eq!(result.last_content(), Some("Wrote 5 bytes to out.md"));
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn undeclared_tool_is_reported_back_to_the_model() {
    let provider = Arc::new(MockProvider::new("gpt-4o"));
    provider.queue_tool_call("call_1", "delete_everything", json!({}));
    provider.queue_response("I cannot do that.");

    let agent = AssistantAgent::new("careful", provider.clone()).with_reflect_on_tool_use(true);
    let result = agent.ask("clean up").await.unwrap();

    assert_eq!(result.text, "I cannot do that.");
    let tool_result = &result.steps[0].tool_results[0];
    assert!(tool_result.is_error);
    assert!(tool_result.result["error"]
        .as_str()
        .unwrap()
        .contains("delete_everything"));
}

#[tokio::test]
async fn completion_failure_surfaces_as_participant_failure() {
    let provider = Arc::new(MockProvider::new("gpt-4o"));

    let mut team = RoundRobinTeam::builder()
        .participant(AssistantAgent::new("assistant", provider))
        .max_turns(3)
        .build()
        .unwrap();

    let err = team.run("hello", &CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.failed_participant(), Some("assistant"));
    assert_eq!(err.category(), ErrorCategory::Network);
    assert!(matches!(err.root_cause(), ParleyError::Stream(_)));
    assert_eq!(team.transcript().len(), 1);
    assert_eq!(team.state(), TeamState::Failed);
}

#[test]
fn duplicate_tool_names_are_rejected() {
    let provider = Arc::new(MockProvider::new("gpt-4o"));
    let written = Arc::new(Mutex::new(Vec::new()));
    let result = AssistantAgent::new("a", provider).with_tools([
        write_file_tool(Arc::clone(&written)),
        write_file_tool(written),
    ]);
    assert!(matches!(result, Err(ParleyError::Configuration(_))));
}
