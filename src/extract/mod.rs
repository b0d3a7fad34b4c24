//! Heuristic DOM extraction.
//!
//! The in-page payloads in [`js`] union four brittle detection strategies and
//! hand back raw candidates; everything after that point is pure Rust so the
//! interesting parts stay testable: de-duplication by exact text, stable
//! descending rank, username/preview splitting, and time-phrase matching.
//!
//! Any evaluation failure degrades to an empty scan. Callers always proceed
//! to screenshots and report writing; an empty report is a valid outcome.

pub mod js;

use once_cell::sync::Lazy;
use playwright::api::Page;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Maximum ranked conversations kept per scan.
pub const MAX_CONVERSATIONS: usize = 10;
/// Maximum messages kept per conversation scan.
pub const MAX_MESSAGES: usize = 50;
/// Maximum inbox preview texts kept per scan.
pub const MAX_PREVIEWS: usize = 20;

static TIME_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"((\d{1,2}:?\d{2} ?[AP]M)|(a few|\d+) (seconds|minutes|hours|days|weeks) ago|[Yy]esterday|[Tt]oday)",
    )
    .expect("time phrase regex")
});

/// A candidate element as reported by the in-page scan. Ephemeral; recomputed
/// on every scrape, no identity across runs.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCandidate {
    pub text: String,
    pub score: u8,
    pub width: f64,
    pub height: f64,
    pub unread: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawConversationScan {
    unread_count: u32,
    all_candidates_count: usize,
    candidates: Vec<RawCandidate>,
}

/// A ranked conversation guess derived from one raw candidate.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationGuess {
    pub username: String,
    pub preview: String,
    pub time: String,
    pub unread: bool,
    pub score: u8,
    pub full_text: String,
}

/// Result of one inbox scan.
#[derive(Debug, Default)]
pub struct ConversationScan {
    pub unread_count: u32,
    pub all_candidates: usize,
    pub unique_candidates: usize,
    pub conversations: Vec<ConversationGuess>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageGuess {
    pub text: String,
    pub is_mine: bool,
    /// Usually absent; Instagram rarely renders one per bubble
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageScan {
    pub url: String,
    pub conversation_id: String,
    pub messages: Vec<MessageGuess>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewScan {
    pub page_title: String,
    pub current_url: String,
    pub is_dm_page: bool,
    pub potential_message_texts: Vec<String>,
    pub unread_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePreview {
    pub text: String,
    pub unread: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
    pub text_length: u64,
    pub has_dm_indicators: bool,
    pub has_conversation_view: bool,
}

/// Scan the inbox page for likely conversations.
pub async fn scan_conversations(page: &Page) -> ConversationScan {
    let raw: RawConversationScan = match page.eval(js::CONVERSATION_SCAN).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("conversation scan failed, degrading to empty: {}", e);
            RawConversationScan::default()
        }
    };
    post_process(raw)
}

/// Scan an open conversation for message bubbles.
pub async fn scan_messages(page: &Page) -> MessageScan {
    let mut scan: MessageScan = match page.eval(js::MESSAGE_SCAN).await {
        Ok(scan) => scan,
        Err(e) => {
            warn!("message scan failed, degrading to empty: {}", e);
            MessageScan::default()
        }
    };
    scan.messages.truncate(MAX_MESSAGES);
    scan
}

/// Lightweight text-node scan for the tool boundary.
pub async fn scan_previews(page: &Page) -> PreviewScan {
    match page.eval(js::PREVIEW_SCAN).await {
        Ok(scan) => scan,
        Err(e) => {
            warn!("preview scan failed, degrading to empty: {}", e);
            PreviewScan::default()
        }
    }
}

/// Coarse page identification for the access report.
pub async fn page_info(page: &Page) -> PageInfo {
    match page.eval(js::PAGE_INFO).await {
        Ok(info) => info,
        Err(e) => {
            warn!("page info eval failed: {}", e);
            PageInfo::default()
        }
    }
}

fn post_process(raw: RawConversationScan) -> ConversationScan {
    let all_candidates = raw.all_candidates_count;
    let unique = dedupe(raw.candidates);
    let unique_candidates = unique.len();
    let ranked = rank(unique);

    debug!(all_candidates, unique_candidates, "conversation candidates");

    let conversations = ranked
        .into_iter()
        .take(MAX_CONVERSATIONS)
        .map(guess_from_candidate)
        .collect();

    ConversationScan {
        unread_count: raw.unread_count,
        all_candidates,
        unique_candidates,
        conversations,
    }
}

/// De-duplicate by exact text equality; the first occurrence wins.
pub fn dedupe(candidates: Vec<RawCandidate>) -> Vec<RawCandidate> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !c.text.is_empty() && seen.insert(c.text.clone()))
        .collect()
}

/// Sort descending by score. Stable: ties keep discovery order.
pub fn rank(mut candidates: Vec<RawCandidate>) -> Vec<RawCandidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

fn guess_from_candidate(candidate: RawCandidate) -> ConversationGuess {
    let (username, preview) = split_username_preview(&candidate.text);
    let time = match_time_phrase(&candidate.text);
    ConversationGuess {
        username,
        preview,
        time,
        unread: candidate.unread,
        score: candidate.score,
        full_text: candidate.text,
    }
}

/// First non-empty line is the username; the rest, joined by spaces, is the
/// preview. Single-line input yields an empty preview.
pub fn split_username_preview(text: &str) -> (String, String) {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let username = lines.first().copied().unwrap_or("Unknown").to_string();
    let preview = if lines.len() > 1 {
        lines[1..].join(" ").trim().to_string()
    } else {
        String::new()
    };
    (username, preview)
}

/// Match a time phrase like "3:45 PM", "2 hours ago" or "Yesterday".
/// Returns the empty string when nothing matches.
pub fn match_time_phrase(text: &str) -> String {
    TIME_PHRASE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Turn raw preview texts into tool-boundary message previews, dropping
/// navigation chrome.
pub fn filter_previews(texts: &[String]) -> Vec<MessagePreview> {
    const CHROME: [&str; 5] = ["home", "search", "explore", "settings", "profile"];

    texts
        .iter()
        .filter(|text| {
            let lower = text.to_lowercase();
            !CHROME.iter().any(|skip| lower.contains(skip))
        })
        .take(MAX_PREVIEWS)
        .map(|text| {
            let lower = text.to_lowercase();
            MessagePreview {
                text: text.clone(),
                unread: lower.contains("new") || lower.contains("unread"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, score: u8) -> RawCandidate {
        RawCandidate {
            text: text.into(),
            score,
            width: 400.0,
            height: 72.0,
            unread: false,
        }
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let deduped = dedupe(vec![
            candidate("alice\nhey", 5),
            candidate("bob\nyo", 10),
            candidate("alice\nhey", 8),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].score, 5);
        assert_eq!(deduped[1].text, "bob\nyo");
    }

    #[test]
    fn dedupe_drops_empty_text() {
        let deduped = dedupe(vec![candidate("", 10), candidate("alice", 5)]);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn rank_is_descending_and_stable_on_ties() {
        let ranked = rank(vec![
            candidate("first-seven", 7),
            candidate("ten", 10),
            candidate("second-seven", 7),
            candidate("five", 5),
        ]);
        let order: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(order, vec!["ten", "first-seven", "second-seven", "five"]);
    }

    #[test]
    fn username_preview_split() {
        let (user, preview) = split_username_preview("alice\nhey there");
        assert_eq!(user, "alice");
        assert_eq!(preview, "hey there");

        let (user, preview) = split_username_preview("alice");
        assert_eq!(user, "alice");
        assert_eq!(preview, "");

        let (user, preview) = split_username_preview("bob\nsent a photo\n2h");
        assert_eq!(user, "bob");
        assert_eq!(preview, "sent a photo 2h");
    }

    #[test]
    fn time_phrase_canonical_forms() {
        assert_eq!(match_time_phrase("seen 3:45 PM"), "3:45 PM");
        assert_eq!(match_time_phrase("active 2 hours ago"), "2 hours ago");
        assert_eq!(match_time_phrase("Yesterday at noon"), "Yesterday");
        assert_eq!(match_time_phrase("a few seconds ago"), "a few seconds ago");
        assert_eq!(match_time_phrase("no time here"), "");
    }

    #[test]
    fn post_process_truncates_to_top_ten() {
        let candidates = (0..25)
            .map(|i| candidate(&format!("user{}\nmsg", i), (i % 11) as u8))
            .collect();
        let scan = post_process(RawConversationScan {
            unread_count: 3,
            all_candidates_count: 25,
            candidates,
        });
        assert_eq!(scan.conversations.len(), MAX_CONVERSATIONS);
        assert_eq!(scan.unread_count, 3);
        assert_eq!(scan.all_candidates, 25);
        // Highest score first
        assert_eq!(scan.conversations[0].score, 10);
    }

    #[test]
    fn guesses_carry_username_time_and_unread() {
        let mut raw = candidate("divit\nsee you at 3:45 PM", 8);
        raw.unread = true;
        let scan = post_process(RawConversationScan {
            unread_count: 1,
            all_candidates_count: 1,
            candidates: vec![raw],
        });
        let guess = &scan.conversations[0];
        assert_eq!(guess.username, "divit");
        assert_eq!(guess.preview, "see you at 3:45 PM");
        assert_eq!(guess.time, "3:45 PM");
        assert!(guess.unread);
    }

    #[test]
    fn preview_filter_drops_navigation_chrome() {
        let texts = vec![
            "Home".to_string(),
            "divit sent you a new message".to_string(),
            "Search".to_string(),
            "bob: see you tomorrow".to_string(),
        ];
        let previews = filter_previews(&texts);
        assert_eq!(previews.len(), 2);
        assert!(previews[0].unread); // "new" substring
        assert!(!previews[1].unread);
    }
}
