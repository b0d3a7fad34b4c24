//! LLM agent glue.
//!
//! A bounded conversation loop against an OpenAI-compatible chat endpoint.
//! The model gets the two Instagram tools as function definitions and this
//! loop dispatches its calls against one owned browser session. No planning
//! layer lives here; the model drives, the loop executes.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cli;
use crate::core::{DmConfig, DmError, Result};
use crate::session::Session;
use crate::tools::{execute_tool, ToolRegistry};

const SYSTEM_PROMPT: &str = "You are an assistant that manages the user's Instagram direct \
messages through browser automation tools. Use instagram_login before \
instagram_messages. Credentials come from the environment; call \
instagram_login with no arguments unless the user supplies credentials. \
Summarize unread messages concisely when asked.";

pub struct AgentRunner {
    config: DmConfig,
    registry: ToolRegistry,
    /// Owned here, threaded through every tool call
    session: Option<Session>,
    messages: Vec<Value>,
    client: reqwest::Client,
}

impl AgentRunner {
    pub fn new(config: DmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DmError::Agent(e.to_string()))?;

        Ok(Self {
            config,
            registry: ToolRegistry::new(),
            session: None,
            messages: vec![json!({"role": "system", "content": SYSTEM_PROMPT})],
            client,
        })
    }

    /// Run one task to completion. Returns the model's final text response.
    pub async fn run_task(&mut self, task: &str) -> Result<String> {
        info!(task, "running agent task");
        self.messages
            .push(json!({"role": "user", "content": task}));

        let mut final_text = String::from("Task completed.");

        for turn in 0..self.config.agent.max_turns {
            debug!(turn, "agent turn");
            let message = self.call_llm().await?;

            let tool_calls = message
                .get("tool_calls")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();

            if tool_calls.is_empty() {
                if let Some(content) = message.get("content").and_then(|v| v.as_str()) {
                    final_text = content.to_string();
                }
                self.messages.push(message);
                break;
            }

            self.messages.push(message.clone());

            for call in &tool_calls {
                let id = call["id"].as_str().unwrap_or_default().to_string();
                let name = call["function"]["name"].as_str().unwrap_or_default();
                let arguments: Value = call["function"]["arguments"]
                    .as_str()
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_else(|| json!({}));

                cli::print_info(&format!("▶ {}", name));
                let result =
                    execute_tool(name, &arguments, &mut self.session, &self.config).await;

                if result.success {
                    cli::print_success(&result.output);
                } else {
                    cli::print_error(&result.output);
                }

                self.messages.push(json!({
                    "role": "tool",
                    "tool_call_id": id,
                    "content": json!({
                        "success": result.success,
                        "output": result.output,
                        "data": result.metadata,
                    })
                    .to_string(),
                }));
            }
        }

        Ok(final_text)
    }

    /// Close the browser if any tool opened one.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            session.close().await?;
        }
        Ok(())
    }

    async fn call_llm(&self) -> Result<Value> {
        let endpoint = format!(
            "{}/v1/chat/completions",
            self.config.agent.endpoint.trim_end_matches('/')
        );

        let request = json!({
            "model": self.config.agent.model,
            "messages": self.messages,
            "tools": self.registry.get_tools_json(),
            "temperature": 0.3,
        });

        let mut req = self.client.post(&endpoint).json(&request);
        if let Some(key) = self.config.agent.api_key() {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| DmError::Agent(format!("LLM request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DmError::Agent(format!("LLM API error {}: {}", status, body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DmError::Agent(format!("bad LLM response: {}", e)))?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .cloned()
            .ok_or_else(|| DmError::Agent("LLM response had no message".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_starts_with_system_prompt_and_no_session() {
        let runner = AgentRunner::new(DmConfig::default()).unwrap();
        assert!(runner.session.is_none());
        assert_eq!(runner.messages.len(), 1);
        assert_eq!(runner.messages[0]["role"], "system");
    }

    #[test]
    fn system_prompt_orders_the_tools() {
        let login = SYSTEM_PROMPT.find("instagram_login").unwrap();
        let messages = SYSTEM_PROMPT.find("instagram_messages").unwrap();
        assert!(login < messages);
    }
}
