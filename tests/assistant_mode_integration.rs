//! Assistant mode: the orchestrator agent delegating to its sub-agents

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sahayi::agents::{assistant_orchestrator, MEDICAL_TOOL, USER_TOOL};
use sahayi::config::{AgentConfig, SearchConfig};
use sahayi::providers::{Message, ToolCall};
use sahayi::toolbox::ToolboxClient;
use sahayi::tools::web_search::WEB_SEARCH_TOOL_NAME;
use sahayi::tools::{ToolRegistry, ToolboxTool, WebSearchTool};

mod common;
use common::{ScriptedProvider, CONTACT_TOOL};

async fn base_tools(server: &MockServer) -> ToolRegistry {
    let search = WebSearchTool::new(SearchConfig {
        api_base: format!("{}/customsearch/v1", server.uri()),
        api_key: Some("search-key".to_string()),
        engine_id: Some("engine-1".to_string()),
        ..SearchConfig::default()
    })
    .unwrap();
    let client = ToolboxClient::new(&common::toolbox_config(server)).unwrap();
    let contact = ToolboxTool::load(client, CONTACT_TOOL).await.unwrap();

    let mut tools = ToolRegistry::new();
    tools.register(WEB_SEARCH_TOOL_NAME, Arc::new(search));
    tools.register(CONTACT_TOOL, Arc::new(contact));
    tools
}

#[tokio::test]
async fn test_orchestrator_looks_up_profile_through_user_tool() {
    let server = MockServer::start().await;
    common::mount_manifest(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/api/tool/{}/invoke", CONTACT_TOOL)))
        .and(body_json(json!({"name": "John Smith"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": common::john_smith_rows()})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(ScriptedProvider::new(vec![
        Message::assistant_with_tools(vec![ToolCall::new(
            "call_parent",
            USER_TOOL,
            &json!({"request": "Look up the profile for John Smith"}),
        )]),
        Message::assistant_with_tools(vec![ToolCall::new(
            "call_child",
            CONTACT_TOOL,
            &json!({"name": "John Smith"}),
        )]),
        Message::assistant("John Smith lives at 12 Elm St and has hypertension."),
        Message::assistant(
            "Thank you, John Smith. Just to make sure, are you currently at 12 Elm St?",
        ),
    ]));

    let tools = base_tools(&server).await;
    let mut agent =
        assistant_orchestrator(provider.clone(), &tools, CONTACT_TOOL, AgentConfig::default())
            .unwrap();
    assert_eq!(agent.num_tools(), 3);

    let answer = agent.execute("Hello, my name is John Smith").await.unwrap();
    assert!(answer.contains("12 Elm St"));
    assert_eq!(provider.calls(), 4);

    // The parent's second turn sees the sub-agent's answer as a tool result
    let seen = provider.seen.lock().unwrap();
    let last = seen.last().unwrap();
    let tool_message = last
        .iter()
        .find(|m| m.role == "tool")
        .expect("tool result should be in the parent's conversation");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_parent"));
    assert!(tool_message
        .content
        .as_deref()
        .unwrap_or_default()
        .contains("John Smith lives at 12 Elm St"));

    // The child ran with the profiler instruction and its own conversation
    let child_first = &seen[1];
    assert_eq!(child_first[0].role, "system");
    assert!(child_first
        .iter()
        .any(|m| m.content.as_deref() == Some("Look up the profile for John Smith")));
}

#[tokio::test]
async fn test_orchestrator_routes_medical_request_to_locator() {
    let server = MockServer::start().await;
    common::mount_manifest(&server).await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "title": "Elm Street Clinic",
                "link": "https://example.org/elm-clinic",
                "snippet": "20 Elm St. Phone 555-0142"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(ScriptedProvider::new(vec![
        Message::assistant_with_tools(vec![ToolCall::new(
            "call_parent",
            MEDICAL_TOOL,
            &json!({"request": "Location: 12 Elm St. The citizen has chest pain."}),
        )]),
        Message::assistant_with_tools(vec![ToolCall::new(
            "call_search",
            WEB_SEARCH_TOOL_NAME,
            &json!({"query": "hospital near 12 Elm St"}),
        )]),
        Message::assistant("Elm Street Clinic, 20 Elm St, phone 555-0142."),
        Message::assistant(
            "I'm finding the nearest hospital for you. Elm Street Clinic, 20 Elm St, phone 555-0142.",
        ),
    ]));

    let tools = base_tools(&server).await;
    let mut agent =
        assistant_orchestrator(provider.clone(), &tools, CONTACT_TOOL, AgentConfig::default())
            .unwrap();
    let answer = agent.execute("I have chest pain").await.unwrap();

    assert!(answer.contains("Elm Street Clinic"));
    assert_eq!(provider.calls(), 4);

    let seen = provider.seen.lock().unwrap();
    let search_result = seen[2]
        .iter()
        .find(|m| m.role == "tool")
        .and_then(|m| m.content.clone())
        .unwrap_or_default();
    assert!(search_result.contains("1. Elm Street Clinic"));
}

#[tokio::test]
async fn test_orchestrator_requires_contact_tool() {
    let server = MockServer::start().await;
    let provider = Arc::new(ScriptedProvider::new(Vec::new()));

    let mut tools = ToolRegistry::new();
    tools.register(
        WEB_SEARCH_TOOL_NAME,
        Arc::new(
            WebSearchTool::new(SearchConfig {
                api_base: server.uri(),
                api_key: Some("k".to_string()),
                engine_id: Some("cx".to_string()),
                ..SearchConfig::default()
            })
            .unwrap(),
        ),
    );

    let result = assistant_orchestrator(provider, &tools, CONTACT_TOOL, AgentConfig::default());
    assert!(result.is_err());
    assert!(result.err().unwrap().to_string().contains(CONTACT_TOOL));
}
