//! Text report writing.
//!
//! Every scrape flattens into plain-text files next to the screenshots; the
//! wording doubles as user guidance when extraction comes back empty, since
//! the screenshots are then the only useful artifact.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::core::Result;
use crate::extract::{ConversationScan, MessagePreview, MessageScan, PageInfo, PreviewScan};
use crate::session::TargetAttempt;

pub const ACCESS_REPORT: &str = "instagram_dm_report.txt";
pub const TEXT_REPORT: &str = "instagram_dm_text_report.txt";
pub const MULTI_REPORT: &str = "instagram_dm_multi_report.txt";
pub const TOOL_SUMMARY_REPORT: &str = "personal_messages_summary_report.txt";

pub struct ReportWriter {
    output_dir: PathBuf,
    account: String,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, account: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            account: account.into(),
        }
    }

    fn stamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn write(&self, name: &str, content: String) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// High-level access report: where we ended up and what to look at.
    pub fn write_access_report(&self, info: &PageInfo) -> Result<PathBuf> {
        let mut out = String::new();
        out.push_str("INSTAGRAM DM ACCESS REPORT\n");
        out.push_str("=========================\n\n");
        out.push_str(&format!("Date: {}\n", Self::stamp()));
        out.push_str(&format!("Username: {}\n", self.account));
        out.push_str(&format!("Current URL: {}\n", info.url));
        out.push_str(&format!("Page Title: {}\n", info.title));
        out.push_str(&format!("Page Text Length: {} characters\n", info.text_length));
        out.push_str(&format!(
            "DM Indicators Found: {}\n",
            yes_no(info.has_dm_indicators)
        ));
        out.push_str(&format!(
            "Conversation View: {}\n\n",
            yes_no(info.has_conversation_view)
        ));
        out.push_str("Page Analysis:\n");
        out.push_str("Check the screenshots to see your messages:\n");
        out.push_str("- 4_messages_page.png: Shows your DM inbox with all conversations\n");
        out.push_str(
            "- 5_conversation_page.png: Shows an individual conversation if we could open one\n\n",
        );
        out.push_str("Note: Instagram has protections against automated message extraction,\n");
        out.push_str("but you can see your messages in the screenshots.\n");

        self.write(ACCESS_REPORT, out)
    }

    /// Ranked conversation guesses from the heuristic scan.
    pub fn write_text_report(&self, scan: &ConversationScan) -> Result<PathBuf> {
        let mut out = String::new();
        out.push_str("INSTAGRAM DM TEXT REPORT\n");
        out.push_str("=======================\n\n");
        out.push_str(&format!("Date: {}\n", Self::stamp()));
        out.push_str(&format!("Username: {}\n", self.account));
        out.push_str(&format!(
            "Detected Conversations: {}\n",
            scan.conversations.len()
        ));
        out.push_str(&format!("Unread Count: {}\n\n", scan.unread_count));

        if scan.conversations.is_empty() {
            out.push_str("No conversations could be extracted.\n");
            out.push_str("This is likely due to Instagram's anti-scraping measures.\n");
            out.push_str(
                "Please check the screenshot at 4_messages_page.png to view your messages.\n",
            );
        } else {
            out.push_str("CONVERSATIONS (Sorted by likelihood):\n");
            out.push_str("----------------------------------\n\n");

            for (i, conv) in scan.conversations.iter().enumerate() {
                out.push_str(&format!("#{}: {} ", i + 1, conv.username));
                if !conv.time.is_empty() {
                    out.push_str(&format!("• {} ", conv.time));
                }
                out.push_str(&format!(
                    "[{}]\n",
                    if conv.unread { "UNREAD" } else { "read" }
                ));

                if !conv.preview.is_empty() {
                    out.push_str(&format!("Message: {}\n", conv.preview));
                } else {
                    out.push_str(&format!("Full text: {}\n", conv.full_text));
                }
                out.push_str(&format!("Confidence score: {}/10\n\n", conv.score));
            }
        }

        self.write(TEXT_REPORT, out)
    }

    /// One section per target username with the conversation-open outcome.
    pub fn write_multi_report(&self, attempts: &[TargetAttempt]) -> Result<PathBuf> {
        let mut out = String::new();
        out.push_str("INSTAGRAM DM MULTI-TARGET REPORT\n");
        out.push_str("================================\n\n");
        out.push_str(&format!("Date: {}\n", Self::stamp()));
        out.push_str(&format!("Username: {}\n", self.account));
        out.push_str(&format!("Targets Tried: {}\n\n", attempts.len()));

        for attempt in attempts {
            out.push_str(&format!("Target: {}\n", attempt.username));
            if attempt.clicked {
                out.push_str("Result: conversation opened\n");
                if let Some(selector) = &attempt.matched_selector {
                    out.push_str(&format!("Matched selector: {}\n", selector));
                }
                if let Some(url) = &attempt.url {
                    out.push_str(&format!("Conversation URL: {}\n", url));
                }
            } else {
                out.push_str("Result: not found\n");
            }
            out.push('\n');
        }

        self.write(MULTI_REPORT, out)
    }

    /// Transcript summary for an opened conversation.
    pub fn write_conversation_summary(&self, scan: &MessageScan) -> Result<PathBuf> {
        let id = if scan.conversation_id.is_empty() {
            "unknown"
        } else {
            &scan.conversation_id
        };
        let name = format!("conversation_{}_summary.txt", id);

        let mut out = String::new();
        out.push_str("INSTAGRAM DM CONVERSATION SUMMARY\n");
        out.push_str("================================\n\n");
        out.push_str(&format!("Date: {}\n", Self::stamp()));
        out.push_str(&format!("Username: {}\n", self.account));
        out.push_str(&format!("Conversation URL: {}\n", scan.url));
        out.push_str(&format!("Messages Found: {}\n\n", scan.messages.len()));

        if scan.messages.is_empty() {
            out.push_str("No message content could be extracted.\n");
            out.push_str("This is likely due to Instagram's protections against scraping.\n");
            out.push_str("Please check the screenshot at conversation_messages.png\n");
        } else {
            out.push_str("MESSAGES:\n");
            out.push_str("--------\n\n");
            for msg in &scan.messages {
                let sender = if msg.is_mine { "Me" } else { "Them" };
                match &msg.timestamp {
                    Some(ts) => out.push_str(&format!("{} ({}): {}\n\n", sender, ts, msg.text)),
                    None => out.push_str(&format!("{}: {}\n\n", sender, msg.text)),
                }
            }
        }

        self.write(&name, out)
    }

    /// Flat summary the `instagram_messages` tool writes alongside its JSON
    /// result.
    pub fn write_tool_summary(
        &self,
        scan: &PreviewScan,
        previews: &[MessagePreview],
    ) -> Result<PathBuf> {
        let mut out = String::new();
        out.push_str("INSTAGRAM DM SUMMARY\n");
        out.push_str(&format!("URL: {}\n", scan.current_url));
        out.push_str(&format!("Page title: {}\n", scan.page_title));
        out.push_str(&format!("Is DM page: {}\n", scan.is_dm_page));
        out.push_str(&format!(
            "Estimated unread messages: {}\n\n",
            scan.unread_count
        ));
        out.push_str("CONVERSATION PREVIEWS:\n");
        for (i, preview) in previews.iter().enumerate() {
            let status = if preview.unread { "UNREAD" } else { "read" };
            out.push_str(&format!("{}. {} [{}]\n", i + 1, preview.text, status));
        }

        self.write(TOOL_SUMMARY_REPORT, out)
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

/// Parse `Unread Count: N` back out of a written text report. The monitor
/// uses this to diff runs without holding structured state.
pub fn read_unread_count(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("Unread Count:") {
            if let Ok(n) = rest.trim().parse() {
                return Some(n);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ConversationGuess;

    fn scan_with(conversations: Vec<ConversationGuess>, unread: u32) -> ConversationScan {
        ConversationScan {
            unread_count: unread,
            all_candidates: conversations.len(),
            unique_candidates: conversations.len(),
            conversations,
        }
    }

    fn guess(username: &str, preview: &str, score: u8) -> ConversationGuess {
        ConversationGuess {
            username: username.into(),
            preview: preview.into(),
            time: String::new(),
            unread: false,
            score,
            full_text: format!("{}\n{}", username, preview),
        }
    }

    #[test]
    fn text_report_lists_ranked_conversations() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), "testuser");

        let path = writer
            .write_text_report(&scan_with(
                vec![guess("divit", "see you tomorrow", 10), guess("bob", "", 5)],
                2,
            ))
            .unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Detected Conversations: 2"));
        assert!(content.contains("Unread Count: 2"));
        assert!(content.contains("#1: divit [read]"));
        assert!(content.contains("Message: see you tomorrow"));
        assert!(content.contains("Confidence score: 10/10"));
        // No preview falls back to the full text line
        assert!(content.contains("Full text: bob\n"));
    }

    #[test]
    fn empty_scan_points_at_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), "testuser");

        let path = writer.write_text_report(&scan_with(vec![], 0)).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("No conversations could be extracted."));
        assert!(content.contains("4_messages_page.png"));
    }

    #[test]
    fn unread_count_roundtrips_through_report() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), "testuser");

        let path = writer.write_text_report(&scan_with(vec![], 7)).unwrap();
        assert_eq!(read_unread_count(&path), Some(7));
        assert_eq!(read_unread_count(Path::new("/nonexistent.txt")), None);
    }

    #[test]
    fn conversation_summary_labels_senders() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), "testuser");

        let scan = MessageScan {
            url: "https://www.instagram.com/direct/t/991/".into(),
            conversation_id: "991".into(),
            messages: vec![
                crate::extract::MessageGuess {
                    text: "hey".into(),
                    is_mine: false,
                    timestamp: None,
                },
                crate::extract::MessageGuess {
                    text: "hi back".into(),
                    is_mine: true,
                    timestamp: None,
                },
            ],
        };

        let path = writer.write_conversation_summary(&scan).unwrap();
        assert!(path.ends_with("conversation_991_summary.txt"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Them: hey"));
        assert!(content.contains("Me: hi back"));
    }

    #[test]
    fn multi_report_records_every_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), "testuser");

        let attempts = vec![
            TargetAttempt {
                username: "divit".into(),
                clicked: true,
                matched_selector: Some("span[dir=\"auto\"]:has-text(\"divit\")".into()),
                url: Some("https://www.instagram.com/direct/t/5/".into()),
            },
            TargetAttempt {
                username: "S.A.M".into(),
                clicked: false,
                matched_selector: None,
                url: None,
            },
        ];

        let path = writer.write_multi_report(&attempts).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Targets Tried: 2"));
        assert!(content.contains("Target: divit\nResult: conversation opened"));
        assert!(content.contains("Target: S.A.M\nResult: not found"));
    }
}
