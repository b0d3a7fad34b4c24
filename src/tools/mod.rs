//! Agent tool boundary.
//!
//! Two operations are exposed to an LLM orchestrator: `instagram_login` and
//! `instagram_messages`. The browser session is owned by the dispatching
//! caller and passed in by `&mut` — tool calls never touch process-wide
//! state, so overlapping invocations cannot trample each other's browser.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::core::{Credentials, DmConfig, DmError};
use crate::extract;
use crate::report::ReportWriter;
use crate::session::steps::{run_step, Step, StepAction};
use crate::session::Session;

/// How long `instagram_messages` may run before giving up.
const MESSAGES_TIMEOUT: Duration = Duration::from_secs(30);

/// Tool definition
#[derive(Debug, Clone)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool execution result
#[derive(Debug, Clone)]
pub struct ToolExecResult {
    pub success: bool,
    pub output: String,
    pub metadata: HashMap<String, Value>,
}

impl ToolExecResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Available tools registry
pub struct ToolRegistry {
    tools: HashMap<String, ToolDef>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };
        registry.register_instagram_tools();
        registry
    }

    fn register_instagram_tools(&mut self) {
        self.tools.insert(
            "instagram_login".into(),
            ToolDef {
                name: "instagram_login".into(),
                description:
                    "Logs into Instagram with username and password using browser automation."
                        .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "username": {"type": "string", "description": "Instagram username"},
                        "password": {"type": "string", "description": "Instagram password"}
                    },
                    "required": []
                }),
            },
        );

        self.tools.insert(
            "instagram_messages".into(),
            ToolDef {
                name: "instagram_messages".into(),
                description: "Gets and summarizes Instagram direct messages.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
        );
    }

    pub fn get_tool(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    pub fn list_tools(&self) -> Vec<&ToolDef> {
        self.tools.values().collect()
    }

    /// OpenAI-style function-calling definitions.
    pub fn get_tools_json(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .values()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters
                    }
                })
            })
            .collect();
        json!(tools)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute a tool against the caller-owned session slot.
pub async fn execute_tool(
    name: &str,
    args: &Value,
    session: &mut Option<Session>,
    config: &DmConfig,
) -> ToolExecResult {
    match name {
        "instagram_login" => exec_login(args, session, config).await,
        "instagram_messages" => exec_messages(session, config).await,
        _ => ToolExecResult::failure(format!("Unknown tool: {}", name)),
    }
}

async fn exec_login(
    args: &Value,
    session: &mut Option<Session>,
    config: &DmConfig,
) -> ToolExecResult {
    let credentials = match credentials_from(args) {
        Ok(credentials) => credentials,
        Err(e) => return ToolExecResult::failure(e.to_string()),
    };

    // Reuse a live session when the agent logs in twice
    if session.is_none() {
        match Session::launch(config).await {
            Ok(launched) => *session = Some(launched),
            Err(e) => {
                error!("browser launch failed: {}", e);
                return ToolExecResult::failure(format!("Browser launch failed: {}", e));
            }
        }
    }
    let Some(live) = session.as_mut() else {
        return ToolExecResult::failure("Browser session unavailable");
    };

    match live.login(&credentials).await {
        Ok(report) => {
            let mut metadata = HashMap::new();
            metadata.insert("success".into(), json!(true));
            metadata.insert(
                "message".into(),
                json!(format!("Authenticated as {}", credentials.username)),
            );
            metadata.insert("screenshot".into(), json!(crate::session::SCREEN_LOGIN));
            metadata.insert(
                "verification_required".into(),
                json!(report.verification_required),
            );
            ToolExecResult {
                success: true,
                output: format!("Logged into Instagram as {}", credentials.username),
                metadata,
            }
        }
        Err(e) => {
            error!("authentication failed: {}", e);
            let screenshot = live.error_screenshot().await;
            let mut result = ToolExecResult::failure(e.to_string());
            if let Some(path) = screenshot {
                result
                    .metadata
                    .insert("screenshot".into(), json!(path.display().to_string()));
            }
            result
        }
    }
}

async fn exec_messages(session: &mut Option<Session>, config: &DmConfig) -> ToolExecResult {
    let live = match session.as_mut() {
        Some(live) => live,
        None => {
            return ToolExecResult::failure("Not authenticated. Please login first.");
        }
    };

    match tokio::time::timeout(MESSAGES_TIMEOUT, fetch_messages(live, config)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!("failed to get Instagram messages: {}", e);
            let _ = live.screenshot("instagram_error.png").await;
            let mut result = ToolExecResult::failure(format!("Failed to get messages: {}", e));
            result
                .metadata
                .insert("screenshot".into(), json!("instagram_error.png"));
            result
        }
        Err(_) => {
            let e = DmError::Timeout(MESSAGES_TIMEOUT.as_secs());
            error!("Instagram message fetching gave up: {}", e);
            let _ = live.screenshot("instagram_timeout_error.png").await;
            let mut result =
                ToolExecResult::failure(format!("Instagram message fetching failed: {}", e));
            result
                .metadata
                .insert("screenshot".into(), json!("instagram_timeout_error.png"));
            result
        }
    }
}

async fn fetch_messages(
    session: &mut Session,
    config: &DmConfig,
) -> crate::core::Result<ToolExecResult> {
    info!("navigating to Instagram Direct Messages");
    session.screenshot("before_navigation.png").await?;

    // Direct icon first, URL second
    let clicked = run_step(
        session.page(),
        &Step::new(
            "direct_icon",
            &["svg[aria-label=\"Direct\"]"],
            StepAction::Click,
            config.timeouts.popup_ms,
        ),
    )
    .await?;
    if !clicked.completed() {
        session
            .page()
            .goto_builder("https://www.instagram.com/direct/inbox/")
            .timeout(config.timeouts.navigation_ms as f64)
            .goto()
            .await
            .map_err(|e| DmError::Navigation(e.to_string()))?;
    }
    tokio::time::sleep(Duration::from_millis(config.timeouts.settle_ms)).await;

    info!(url = %session.current_url(), "arrived after navigation");
    session.screenshot("instagram_dm_page.png").await?;

    let scan = extract::scan_previews(session.page()).await;
    let previews = extract::filter_previews(&scan.potential_message_texts);

    let writer = ReportWriter::new(config.output_dir.clone(), "agent");
    writer.write_tool_summary(&scan, &previews)?;

    let mut metadata = HashMap::new();
    metadata.insert("unread_count".into(), json!(scan.unread_count));
    metadata.insert("message_previews".into(), json!(previews));
    metadata.insert("is_dm_page".into(), json!(scan.is_dm_page));

    Ok(ToolExecResult {
        success: true,
        output: format!(
            "{} unread, {} previews extracted (dm page: {})",
            scan.unread_count,
            previews.len(),
            scan.is_dm_page
        ),
        metadata,
    })
}

fn credentials_from(args: &Value) -> crate::core::Result<Credentials> {
    let username = args.get("username").and_then(|v| v.as_str());
    let password = args.get("password").and_then(|v| v.as_str());
    match (username, password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            Ok(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        // The agent usually leaves credentials to the environment
        _ => Credentials::from_env()
            .map_err(|_| DmError::Config("Username and password are required".into())),
    }
}
