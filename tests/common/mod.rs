use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sahayi::config::ToolboxConfig;
use sahayi::error::Result;
use sahayi::providers::{CompletionResponse, Message, Provider};

pub const CONTACT_TOOL: &str = "search-contact-by-name";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn toolbox_config(server: &MockServer) -> ToolboxConfig {
    ToolboxConfig {
        url: server.uri(),
        ..ToolboxConfig::default()
    }
}

#[allow(dead_code)]
pub fn contact_manifest() -> Value {
    json!({
        "serverVersion": "0.7.0",
        "tools": {
            CONTACT_TOOL: {
                "description": "Search a contact by name",
                "parameters": [
                    {"name": "name", "type": "string", "description": "Name of the contact"}
                ],
                "authRequired": []
            }
        }
    })
}

/// Mount the manifest endpoint for the contact tool
#[allow(dead_code)]
pub async fn mount_manifest(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/api/tool/{}", CONTACT_TOOL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(contact_manifest()))
        .mount(server)
        .await;
}

/// Row stored for John Smith in the fake contact database
#[allow(dead_code)]
pub fn john_smith_rows() -> String {
    json!([{
        "name": "John Smith",
        "address": "12 Elm St",
        "emergency_contacts": [{"name": "Mary Smith", "phone": "555-0100"}],
        "medical_conditions": "hypertension, diabetes"
    }])
    .to_string()
}

/// Provider that replays a fixed script and records what it was sent
#[allow(dead_code)]
pub struct ScriptedProvider {
    responses: Mutex<Vec<Message>>,
    pub seen: Mutex<Vec<Vec<Message>>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Mutex::new(responses),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, messages: &[Message], _tools: &[Value]) -> Result<CompletionResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        let message = if responses.is_empty() {
            Message::assistant("(script exhausted)")
        } else {
            responses.remove(0)
        };
        Ok(CompletionResponse::new(message))
    }
}
