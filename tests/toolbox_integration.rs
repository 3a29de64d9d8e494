//! Integration tests for the toolbox client, contact lookup and toolbox tools
//!
//! The remote toolbox is replaced by a wiremock server speaking the same
//! HTTP protocol.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sahayi::config::ToolboxConfig;
use sahayi::error::SahayiError;
use sahayi::profile::{LookupOutcome, ProfileLookup, ToolboxProfileLookup};
use sahayi::toolbox::ToolboxClient;
use sahayi::tools::{ToolExecutor, ToolboxTool};

mod common;
use common::CONTACT_TOOL;

fn invoke_path() -> String {
    format!("/api/tool/{}/invoke", CONTACT_TOOL)
}

#[tokio::test]
async fn test_load_tool_parses_manifest() {
    let server = MockServer::start().await;
    common::mount_manifest(&server).await;

    let client = ToolboxClient::new(&common::toolbox_config(&server)).unwrap();
    let manifest = client.load_tool(CONTACT_TOOL).await.unwrap();

    assert_eq!(manifest.server_version, "0.7.0");
    let schema = &manifest.tools[CONTACT_TOOL];
    assert_eq!(schema.parameters[0].name, "name");
    assert_eq!(schema.parameters_schema()["required"][0], "name");
}

#[tokio::test]
async fn test_load_tool_rejects_manifest_for_other_tool() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tool/other-tool"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::contact_manifest()))
        .mount(&server)
        .await;

    let client = ToolboxClient::new(&common::toolbox_config(&server)).unwrap();
    let err = client.load_tool("other-tool").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SahayiError>(),
        Some(SahayiError::Toolbox(_))
    ));
}

#[tokio::test]
async fn test_invoke_sends_arguments_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(invoke_path()))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(json!({"name": "John Smith"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "[]"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ToolboxConfig {
        auth_token: Some("secret-token".to_string()),
        ..common::toolbox_config(&server)
    };
    let client = ToolboxClient::new(&config).unwrap();
    let result = client
        .invoke(CONTACT_TOOL, &json!({"name": "John Smith"}))
        .await
        .unwrap();
    assert_eq!(result, "[]");
}

#[tokio::test]
async fn test_invoke_error_status_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(invoke_path()))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "parameter \"name\" is required"})),
        )
        .mount(&server)
        .await;

    let client = ToolboxClient::new(&common::toolbox_config(&server)).unwrap();
    let err = client.invoke(CONTACT_TOOL, &json!({})).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("400"));
    assert!(message.contains("is required"));
}

#[tokio::test]
async fn test_lookup_known_name_returns_home_address() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(invoke_path()))
        .and(body_json(json!({"name": "John Smith"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": common::john_smith_rows()})),
        )
        .mount(&server)
        .await;

    let lookup = ToolboxProfileLookup::new(&common::toolbox_config(&server)).unwrap();
    let outcome = lookup.lookup("John Smith").await.unwrap();

    let profile = outcome.profile().expect("profile should be found");
    assert_eq!(profile.home_address.as_deref(), Some("12 Elm St"));
    assert_eq!(profile.medical_conditions, vec!["hypertension", "diabetes"]);
    assert_eq!(profile.emergency_contacts.len(), 1);
}

#[tokio::test]
async fn test_lookup_sends_name_under_manifest_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/tool/{}", CONTACT_TOOL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "serverVersion": "0.7.0",
            "tools": {
                CONTACT_TOOL: {
                    "description": "Search a contact by full name",
                    "parameters": [
                        {"name": "full_name", "type": "string", "description": "Full name"}
                    ],
                    "authRequired": []
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(invoke_path()))
        .and(body_json(json!({"full_name": "John Smith"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": common::john_smith_rows()})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let lookup = ToolboxProfileLookup::new(&common::toolbox_config(&server)).unwrap();
    for _ in 0..2 {
        let outcome = lookup.lookup("John Smith").await.unwrap();
        assert!(outcome.profile().is_some());
    }
}

#[tokio::test]
async fn test_lookup_unknown_name_is_not_found() {
    let server = MockServer::start().await;
    for result in [json!("[]"), json!(null), json!("")] {
        server.reset().await;
        Mock::given(method("POST"))
            .and(path(invoke_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": result })))
            .mount(&server)
            .await;

        let lookup = ToolboxProfileLookup::new(&common::toolbox_config(&server)).unwrap();
        let outcome = lookup.lookup("Nobody Known").await.unwrap();
        assert_eq!(outcome, LookupOutcome::NotFound);
    }
}

#[tokio::test]
async fn test_lookup_unreachable_toolbox_is_an_error() {
    let config = ToolboxConfig {
        url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 2,
        ..ToolboxConfig::default()
    };
    let lookup = ToolboxProfileLookup::new(&config).unwrap();
    let err = lookup.lookup("John Smith").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SahayiError>(),
        Some(SahayiError::Toolbox(_))
    ));
}

#[tokio::test]
async fn test_toolbox_tool_loads_and_executes() {
    let server = MockServer::start().await;
    common::mount_manifest(&server).await;
    Mock::given(method("POST"))
        .and(path(invoke_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": common::john_smith_rows()})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ToolboxClient::new(&common::toolbox_config(&server)).unwrap();
    let tool = ToolboxTool::load(client, CONTACT_TOOL).await.unwrap();

    let definition = tool.tool_definition();
    assert_eq!(definition["name"], CONTACT_TOOL);
    assert_eq!(definition["parameters"]["properties"]["name"]["type"], "string");

    let result = tool.execute(json!({"name": "John Smith"})).await.unwrap();
    assert!(result.success);
    assert!(result.output.contains("12 Elm St"));
}

#[tokio::test]
async fn test_toolbox_tool_reports_invoke_failure_as_tool_error() {
    let server = MockServer::start().await;
    common::mount_manifest(&server).await;
    Mock::given(method("POST"))
        .and(path(invoke_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = ToolboxClient::new(&common::toolbox_config(&server)).unwrap();
    let tool = ToolboxTool::load(client, CONTACT_TOOL).await.unwrap();
    let result = tool.execute(json!({"name": "John Smith"})).await.unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap_or_default().contains("500"));
}
