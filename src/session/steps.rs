//! Declarative navigation steps.
//!
//! The login/navigation flow is a long chain of "try selector A, else B,
//! else give up" blocks, each with its own timeout. Instead of duplicating
//! try/catch ladders per step, each step is data: an ordered selector list,
//! one action, one timeout, and a required flag. A single interpreter walks
//! the list with a uniform fallback policy.

use playwright::api::Page;
use tracing::{debug, info};

use crate::core::{DmError, Result};

#[derive(Debug, Clone)]
pub enum StepAction {
    /// Click the first selector that appears
    Click,
    /// Fill the first selector that appears with a value
    Fill(String),
    /// Just wait for the first selector to appear
    WaitVisible,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub name: &'static str,
    pub selectors: Vec<String>,
    pub action: StepAction,
    pub timeout_ms: u64,
    /// Required steps abort the run when no selector matches;
    /// optional steps are skipped silently.
    pub required: bool,
}

impl Step {
    pub fn new(name: &'static str, selectors: &[&str], action: StepAction, timeout_ms: u64) -> Self {
        Self {
            name,
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            action,
            timeout_ms,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A selector matched and the action ran
    Completed { matched: String },
    /// Optional step, nothing matched
    Skipped,
}

impl StepOutcome {
    pub fn completed(&self) -> bool {
        matches!(self, StepOutcome::Completed { .. })
    }
}

/// Run one step: try each selector in order, perform the action on the first
/// hit. Per-selector failures (timeout, detached element) fall through to the
/// next selector.
pub async fn run_step(page: &Page, step: &Step) -> Result<StepOutcome> {
    for selector in &step.selectors {
        let handle = match page
            .wait_for_selector_builder(selector)
            .timeout(step.timeout_ms as f64)
            .wait_for_selector()
            .await
        {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                debug!(step = step.name, %selector, "selector not found");
                continue;
            }
            Err(e) => {
                debug!(step = step.name, %selector, "selector wait failed: {}", e);
                continue;
            }
        };

        let acted = match &step.action {
            StepAction::Click => handle.click_builder().click().await.is_ok(),
            StepAction::Fill(value) => page.fill_builder(selector, value).fill().await.is_ok(),
            StepAction::WaitVisible => true,
        };

        if acted {
            info!(step = step.name, %selector, "step completed");
            return Ok(StepOutcome::Completed {
                matched: selector.clone(),
            });
        }
        debug!(step = step.name, %selector, "action failed, trying next selector");
    }

    if step.required {
        Err(DmError::Navigation(format!(
            "required step '{}' matched no selector",
            step.name
        )))
    } else {
        info!(step = step.name, "optional step skipped");
        Ok(StepOutcome::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_default_to_optional() {
        let step = Step::new(
            "cookie_consent",
            &["button:has-text(\"Decline\")"],
            StepAction::Click,
            5_000,
        );
        assert!(!step.required);
        assert_eq!(step.selectors.len(), 1);
    }

    #[test]
    fn required_marks_step() {
        let step = Step::new(
            "login_form",
            &["input[name=\"username\"]"],
            StepAction::WaitVisible,
            30_000,
        )
        .required();
        assert!(step.required);
    }

    #[test]
    fn outcome_completed_predicate() {
        let done = StepOutcome::Completed {
            matched: "button".into(),
        };
        assert!(done.completed());
        assert!(!StepOutcome::Skipped.completed());
    }
}
