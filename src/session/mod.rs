//! Browser session driver.
//!
//! One `Session` owns the Playwright handle, browser, context and page and is
//! passed by `&mut` to every operation. The login and navigation flows are
//! strictly sequential: each step either matters (login form, reaching the
//! inbox) and aborts the run on failure, or is a dismissible popup that gets
//! skipped when absent.

pub mod steps;

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use playwright::api::{Browser, BrowserContext, DocumentLoadState, Page, Viewport};
use playwright::Playwright;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::cli;
use crate::core::{Credentials, DmConfig, DmError, Result};
use crate::extract::{self, PageInfo};
use steps::{run_step, Step, StepAction, StepOutcome};

pub const SCREEN_LOGIN: &str = "1_login_page.png";
pub const SCREEN_VERIFICATION: &str = "2_verification_page.png";
pub const SCREEN_DM: &str = "3_dm_page.png";
pub const SCREEN_MESSAGES: &str = "4_messages_page.png";
pub const SCREEN_CONVERSATION: &str = "5_conversation_page.png";
pub const SCREEN_CONVERSATION_MESSAGES: &str = "conversation_messages.png";
pub const SCREEN_ERROR: &str = "error_state.png";

const INSTAGRAM_URL: &str = "https://www.instagram.com/";
const INBOX_URL: &str = "https://www.instagram.com/direct/inbox/";
const INBOX_URL_MOBILE: &str = "https://www.instagram.com/direct/inbox/?__d=y";

/// Selectors that only render for a logged-in account.
const LOGIN_INDICATORS: [&str; 5] = [
    "svg[aria-label=\"Direct\"]",
    "svg[aria-label=\"Home\"]",
    "a[href=\"/direct/inbox/\"]",
    "a[href=\"/explore/\"]",
    "nav[role=\"navigation\"]",
];

/// Generic row shapes that tend to be conversation list items.
const CONVERSATION_ROW_SELECTORS: [&str; 6] = [
    "div[role=\"listitem\"]",
    "div[role=\"row\"]",
    "a[href*=\"/direct/t/\"]",
    "div[data-testid=\"thread-item\"]",
    "div.rOtsg",
    "div[style*=\"height\"][role=\"button\"]",
];

/// What happened during login.
#[derive(Debug, Clone, Default)]
pub struct LoginReport {
    pub verification_required: bool,
    /// Which indicator confirmed the logged-in state, when any did
    pub confirmed_by: Option<String>,
}

/// Outcome of trying to open one target's conversation.
#[derive(Debug, Clone)]
pub struct TargetAttempt {
    pub username: String,
    pub clicked: bool,
    pub matched_selector: Option<String>,
    pub url: Option<String>,
}

pub struct Session {
    // Keeps the driver process alive for the lifetime of the session
    _playwright: Playwright,
    browser: Browser,
    context: BrowserContext,
    page: Page,
    config: DmConfig,
    output_dir: PathBuf,
}

impl Session {
    /// Start Playwright, launch Chromium and open one tab.
    pub async fn launch(config: &DmConfig) -> Result<Self> {
        info!("starting browser");
        let playwright = Playwright::initialize().await?;
        playwright.install_chromium()?;

        let chromium = playwright.chromium();
        let browser = chromium
            .launcher()
            .headless(config.browser.headless)
            .launch()
            .await?;

        let context = browser
            .context_builder()
            .user_agent(&config.browser.user_agent)
            .viewport(Some(Viewport {
                width: config.browser.viewport_width,
                height: config.browser.viewport_height,
            }))
            .build()
            .await?;
        let page = context.new_page().await?;

        std::fs::create_dir_all(&config.output_dir)?;

        Ok(Self {
            _playwright: playwright,
            browser,
            context,
            page,
            config: config.clone(),
            output_dir: config.output_dir.clone(),
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn current_url(&self) -> String {
        self.page.url().unwrap_or_default()
    }

    pub fn in_conversation(&self) -> bool {
        self.current_url().contains("/direct/t/")
    }

    /// Log into Instagram: cookie dialog, credentials, submit, optional
    /// verification pause, then popup dismissals.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<LoginReport> {
        let timeouts = self.config.timeouts.clone();
        let mut report = LoginReport::default();

        self.page.goto_builder(INSTAGRAM_URL).goto().await?;

        run_step(
            &self.page,
            &Step::new(
                "cookie_consent",
                &[
                    "button:has-text(\"Decline optional cookies\")",
                    "button:has-text(\"Reject\")",
                    "button:has-text(\"Decline\")",
                ],
                StepAction::Click,
                timeouts.popup_ms,
            ),
        )
        .await?;
        sleep(Duration::from_millis(1_000)).await;

        // The login form is mandatory; everything around it is dismissible.
        run_step(
            &self.page,
            &Step::new(
                "username_fill",
                &["input[name=\"username\"]"],
                StepAction::Fill(credentials.username.clone()),
                timeouts.login_form_ms,
            )
            .required(),
        )
        .await
        .map_err(|_| DmError::LoginFailed("login form not found".into()))?;
        run_step(
            &self.page,
            &Step::new(
                "password_fill",
                &["input[name=\"password\"]"],
                StepAction::Fill(credentials.password.clone()),
                timeouts.login_form_ms,
            )
            .required(),
        )
        .await
        .map_err(|_| DmError::LoginFailed("password field not found".into()))?;
        self.screenshot(SCREEN_LOGIN).await?;

        self.page
            .click_builder("button[type=\"submit\"]")
            .click()
            .await?;
        info!("clicked login button, waiting for home page");

        report.verification_required = self.handle_verification(&timeouts).await?;

        // Post-login interstitials; absence is the common case.
        for name in [
            "save_login_info",
            "turn_on_notifications",
            "professional_account_upsell",
        ] {
            run_step(
                &self.page,
                &Step::new(
                    name,
                    &[
                        "button:has-text(\"Not Now\")",
                        "button:has-text(\"Not now\")",
                        "button:has-text(\"Skip\")",
                    ],
                    StepAction::Click,
                    timeouts.popup_ms,
                ),
            )
            .await?;
            sleep(Duration::from_millis(1_500)).await;
        }

        // Best-effort confirmation; Instagram sometimes lands on screens with
        // none of these, so proceed either way.
        let confirm = run_step(
            &self.page,
            &Step::new(
                "login_confirmation",
                &LOGIN_INDICATORS,
                StepAction::WaitVisible,
                timeouts.popup_ms,
            ),
        )
        .await?;
        match confirm {
            StepOutcome::Completed { matched } => {
                cli::print_success(&format!("Login confirmed via indicator: {}", matched));
                report.confirmed_by = Some(matched);
            }
            StepOutcome::Skipped => {
                cli::print_warning("Can't confirm login status, proceeding anyway...");
            }
        }

        Ok(report)
    }

    /// Detect the security-code screen and, when present, wait for the human
    /// to type the emailed code into the visible browser.
    async fn handle_verification(
        &mut self,
        timeouts: &crate::core::config::TimeoutConfig,
    ) -> Result<bool> {
        let detected = run_step(
            &self.page,
            &Step::new(
                "verification_detect",
                &[
                    "input[name=\"verificationCode\"]",
                    "input[placeholder*=\"code\"]",
                    "h2:has-text(\"Enter security code\")",
                    "h2:has-text(\"Enter the code\")",
                ],
                StepAction::WaitVisible,
                timeouts.verification_detect_ms,
            ),
        )
        .await?;

        if !detected.completed() {
            info!("no verification needed, continuing");
            return Ok(false);
        }

        self.screenshot(SCREEN_VERIFICATION).await?;
        cli::print_warning("Verification required!");
        cli::print_info("Please check your email for a code and enter it in the browser");

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Waiting for you to complete verification (60 seconds)...");
        spinner.enable_steady_tick(Duration::from_millis(120));

        let outcome = run_step(
            &self.page,
            &Step::new(
                "verification_complete",
                &["svg[aria-label=\"Home\"]", "a[href=\"/direct/inbox/\"]"],
                StepAction::WaitVisible,
                timeouts.verification_wait_ms,
            )
            .required(),
        )
        .await;
        spinner.finish_and_clear();

        outcome.map_err(|_| {
            DmError::LoginFailed("verification was not completed in time".into())
        })?;
        cli::print_success("Login successful after verification!");
        Ok(true)
    }

    /// Reach the DM inbox: Direct icon click, else the inbox URL, else the
    /// mobile-optimized URL. All three failing aborts the run.
    pub async fn goto_inbox(&mut self) -> Result<()> {
        let timeouts = self.config.timeouts.clone();

        let clicked = run_step(
            &self.page,
            &Step::new(
                "direct_icon",
                &["svg[aria-label=\"Direct\"]"],
                StepAction::Click,
                timeouts.popup_ms,
            ),
        )
        .await?;

        if clicked.completed() {
            sleep(Duration::from_millis(timeouts.settle_ms)).await;
        } else {
            info!("Direct icon not clickable, falling back to URL navigation");
            let direct = self
                .page
                .goto_builder(INBOX_URL)
                .timeout(timeouts.navigation_ms as f64)
                .wait_until(DocumentLoadState::NetworkIdle)
                .goto()
                .await;

            if let Err(e) = direct {
                warn!("direct navigation to inbox failed: {}", e);
                self.page
                    .goto_builder(INBOX_URL_MOBILE)
                    .timeout(timeouts.navigation_ms as f64)
                    .wait_until(DocumentLoadState::NetworkIdle)
                    .goto()
                    .await
                    .map_err(|_| {
                        DmError::Navigation(
                            "could not navigate to DMs page after login".into(),
                        )
                    })?;
                cli::print_success("Navigated to mobile optimized inbox URL");
            } else {
                cli::print_success("Navigated directly to inbox URL");
            }
        }

        let on_dm_page: bool = self
            .page
            .eval(extract::js::DM_PAGE_CHECK)
            .await
            .unwrap_or(false);
        if on_dm_page {
            cli::print_success("Successfully logged in and accessed DMs");
        } else {
            cli::print_warning("On DMs page but login status unclear, proceeding anyway");
        }

        self.screenshot(SCREEN_DM).await?;

        // A notification popup sometimes trails the navigation
        run_step(
            &self.page,
            &Step::new(
                "post_navigation_popup",
                &[
                    "button:has-text(\"Not Now\")",
                    "button:has-text(\"Not now\")",
                ],
                StepAction::Click,
                2_000,
            ),
        )
        .await?;
        sleep(Duration::from_millis(1_000)).await;

        self.screenshot(SCREEN_MESSAGES).await?;
        Ok(())
    }

    /// Click the first thing that looks like a conversation row. Non-fatal:
    /// returns whether a conversation actually opened.
    pub async fn open_first_conversation(&mut self) -> Result<bool> {
        for selector in CONVERSATION_ROW_SELECTORS {
            let rows = match self.page.query_selector_all(selector).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(selector, "row query failed: {}", e);
                    continue;
                }
            };
            if rows.is_empty() {
                continue;
            }
            info!(
                selector,
                count = rows.len(),
                "found potential conversations"
            );

            if let Err(e) = rows[0].click_builder().click().await {
                warn!(selector, "row click failed: {}", e);
                continue;
            }
            sleep(Duration::from_millis(self.config.timeouts.settle_ms)).await;

            if self.in_conversation() {
                cli::print_success(&format!(
                    "Successfully opened conversation: {}",
                    self.current_url()
                ));
                return Ok(true);
            }
        }
        cli::print_warning("Could not click on any conversation");
        Ok(false)
    }

    /// Try each target username's selector chain until a conversation opens.
    /// Every attempt is recorded for the multi-target report.
    pub async fn open_target_conversations(
        &mut self,
        targets: &[String],
    ) -> Result<Vec<TargetAttempt>> {
        let mut attempts = Vec::with_capacity(targets.len());
        let mut opened = false;

        for username in targets {
            if opened {
                attempts.push(TargetAttempt {
                    username: username.clone(),
                    clicked: false,
                    matched_selector: None,
                    url: None,
                });
                continue;
            }

            info!(%username, "looking for conversation");
            let mut attempt = TargetAttempt {
                username: username.clone(),
                clicked: false,
                matched_selector: None,
                url: None,
            };

            for selector in target_selectors(username) {
                let found = self
                    .page
                    .wait_for_selector_builder(&selector)
                    .timeout(3_000.0)
                    .wait_for_selector()
                    .await;
                if !matches!(found, Ok(Some(_))) {
                    continue;
                }

                // The span is just a label; the clickable container is a few
                // ancestors up.
                let clicked: bool = self
                    .page
                    .eval(&climb_click_js(&selector))
                    .await
                    .unwrap_or(false);
                if !clicked {
                    continue;
                }
                sleep(Duration::from_millis(self.config.timeouts.settle_ms)).await;

                if self.in_conversation() {
                    let url = self.current_url();
                    cli::print_success(&format!(
                        "Successfully opened conversation for {}: {}",
                        username, url
                    ));
                    attempt.clicked = true;
                    attempt.matched_selector = Some(selector);
                    attempt.url = Some(url);
                    opened = true;
                    break;
                }
            }

            if !attempt.clicked {
                warn!(%username, "no selector opened a conversation");
            }
            attempts.push(attempt);
        }

        if !opened {
            cli::print_warning("Could not click on any of the target usernames' conversations");
        }
        Ok(attempts)
    }

    pub async fn page_info(&self) -> PageInfo {
        extract::page_info(&self.page).await
    }

    pub async fn screenshot(&self, name: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        self.page
            .screenshot_builder()
            .path(path.clone())
            .screenshot()
            .await?;
        cli::print_success(&format!("Screenshot saved: {}", name));
        Ok(path)
    }

    /// Best-effort screenshot of whatever state the failure left behind.
    pub async fn error_screenshot(&self) -> Option<PathBuf> {
        match self.screenshot(SCREEN_ERROR).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("could not save error screenshot: {}", e);
                None
            }
        }
    }

    pub async fn close(self) -> Result<()> {
        self.context.close().await?;
        self.browser.close().await?;
        Ok(())
    }
}

/// Selector chain for a specific username, most specific first. The class
/// names are a snapshot of Instagram's obfuscated CSS and rot over time; the
/// later entries are the generic fallbacks.
fn target_selectors(username: &str) -> Vec<String> {
    vec![
        format!("div.x9f619 div.x78zum5 span:has-text(\"{}\")", username),
        format!(
            "div[class*=\"x9f619\"] div[class*=\"x78zum5\"] span:has-text(\"{}\")",
            username
        ),
        format!("span[dir=\"auto\"]:has-text(\"{}\")", username),
        format!("div[role=\"listbox\"] div span:has-text(\"{}\")", username),
    ]
}

/// Climb from a matched label element to the enclosing clickable row
/// (a DIV taller than 40px and wider than 200px, at most 4 levels up) and
/// click it.
fn climb_click_js(selector: &str) -> String {
    let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".into());
    format!(
        r#"() => {{
    const element = document.querySelector({quoted});
    if (!element) return false;
    let clickTarget = element;
    for (let i = 0; i < 4 && clickTarget; i++) {{
        if (clickTarget.tagName === 'DIV' &&
            clickTarget.clientHeight > 40 && clickTarget.clientWidth > 200) {{
            break;
        }}
        clickTarget = clickTarget.parentElement;
    }}
    if (clickTarget) {{
        clickTarget.click();
        return true;
    }}
    return false;
}}"#
    )
}

/// Pull the thread id out of a `/direct/t/<id>` URL.
pub fn conversation_id_from_url(url: &str) -> Option<String> {
    let rest = url.split("/direct/t/").nth(1)?;
    let id = rest.split(['/', '?']).next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_parsing() {
        assert_eq!(
            conversation_id_from_url("https://www.instagram.com/direct/t/3412345/"),
            Some("3412345".to_string())
        );
        assert_eq!(
            conversation_id_from_url("https://www.instagram.com/direct/t/abc?x=1"),
            Some("abc".to_string())
        );
        assert_eq!(
            conversation_id_from_url("https://www.instagram.com/direct/inbox/"),
            None
        );
        assert_eq!(conversation_id_from_url(""), None);
    }

    #[test]
    fn target_selector_chain_embeds_username() {
        let selectors = target_selectors("divit");
        assert_eq!(selectors.len(), 4);
        assert!(selectors.iter().all(|s| s.contains("divit")));
        // Most specific first, generic fallback last
        assert!(selectors[0].starts_with("div.x9f619"));
        assert!(selectors[3].starts_with("div[role=\"listbox\"]"));
    }

    #[test]
    fn climb_click_escapes_selector() {
        let js = climb_click_js("span:has-text(\"S.A.M\")");
        assert!(js.contains("querySelector(\"span:has-text(\\\"S.A.M\\\")\")"));
        assert!(js.contains("clickTarget.click()"));
    }
}
