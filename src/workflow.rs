//! The full check-my-DMs run: login, inbox, heuristic scan, reports,
//! then a best-effort dive into one conversation.

use tracing::info;

use crate::cli;
use crate::core::config::Credentials;
use crate::core::{DmConfig, Result};
use crate::extract;
use crate::report::ReportWriter;
use crate::session::{
    self, Session, SCREEN_CONVERSATION, SCREEN_CONVERSATION_MESSAGES,
};

/// What a completed run produced, for callers that post-process (monitor).
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub unread_count: u32,
    pub conversations_found: usize,
    pub opened_conversation: bool,
    pub verification_required: bool,
}

/// Run the whole workflow against one account. `keep_open` skips the
/// interactive prompt and leaves the browser up until Enter is pressed.
pub async fn run(config: &DmConfig, keep_open: bool) -> Result<RunOutcome> {
    let credentials = Credentials::from_env()?;
    let reports = ReportWriter::new(&config.output_dir, &credentials.username);

    let mut session = Session::launch(config).await?;

    let outcome = match drive(&mut session, config, &credentials, &reports).await {
        Ok(outcome) => outcome,
        Err(e) => {
            session.error_screenshot().await;
            session.close().await?;
            return Err(e);
        }
    };

    if keep_open || (!config.browser.headless && cli::confirm_keep_open()) {
        cli::print_info("Press Enter to close the browser...");
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
    }

    session.close().await?;
    Ok(outcome)
}

async fn drive(
    session: &mut Session,
    config: &DmConfig,
    credentials: &Credentials,
    reports: &ReportWriter,
) -> Result<RunOutcome> {
    let login = session.login(credentials).await?;
    if login.verification_required {
        cli::print_warning("Login required manual verification this run");
    }

    session.goto_inbox().await?;

    cli::print_section("Scanning conversations");
    let scan = extract::scan_conversations(session.page()).await;
    info!(
        candidates = scan.all_candidates,
        unique = scan.unique_candidates,
        kept = scan.conversations.len(),
        unread = scan.unread_count,
        "inbox scan complete"
    );
    print_conversations(&scan);

    let info = session.page_info().await;
    let access_path = reports.write_access_report(&info)?;
    cli::print_success(&format!("Report saved: {}", access_path.display()));
    let text_path = reports.write_text_report(&scan)?;
    cli::print_success(&format!("Text report saved: {}", text_path.display()));

    // Targets first; fall back to whatever row will take a click.
    let attempts = session
        .open_target_conversations(&config.target_usernames)
        .await?;
    let mut opened = attempts.iter().any(|a| a.clicked);
    if !opened {
        opened = session.open_first_conversation().await?;
    }
    reports.write_multi_report(&attempts)?;

    if opened && session.in_conversation() {
        session.screenshot(SCREEN_CONVERSATION_MESSAGES).await?;
        let mut messages = extract::scan_messages(session.page()).await;
        if messages.conversation_id.is_empty() {
            // The in-page URL parse can miss; recover the id from the session
            messages.conversation_id =
                session::conversation_id_from_url(&session.current_url()).unwrap_or_default();
        }
        let summary_path = reports.write_conversation_summary(&messages)?;
        cli::print_success(&format!(
            "Conversation summary saved: {}",
            summary_path.display()
        ));
    }
    session.screenshot(SCREEN_CONVERSATION).await?;

    cli::print_section("Done");
    cli::print_info(&format!(
        "Found {} conversations, {} unread",
        scan.conversations.len(),
        scan.unread_count
    ));

    Ok(RunOutcome {
        unread_count: scan.unread_count,
        conversations_found: scan.conversations.len(),
        opened_conversation: opened,
        verification_required: login.verification_required,
    })
}

fn print_conversations(scan: &extract::ConversationScan) {
    if scan.conversations.is_empty() {
        cli::print_warning("No conversations could be extracted");
        return;
    }
    for (i, conv) in scan.conversations.iter().enumerate() {
        let marker = if conv.unread { "UNREAD" } else { "read" };
        println!(
            "  #{}: {} [{}] (score {}/10)",
            i + 1,
            conv.username,
            marker,
            conv.score
        );
        if !conv.preview.is_empty() {
            println!("      {}", conv.preview);
        }
    }
}
