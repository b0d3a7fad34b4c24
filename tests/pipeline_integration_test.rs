//! End-to-end coverage of the browserless half of the pipeline: raw DOM
//! candidates through dedupe/rank/split into reports, and back out via the
//! monitor's report parser.

use downinthedm::extract::{
    dedupe, filter_previews, rank, split_username_preview, ConversationGuess,
    ConversationScan, MessageGuess, MessageScan, RawCandidate,
};
use downinthedm::report::{read_unread_count, ReportWriter, TEXT_REPORT};
use downinthedm::tools::ToolRegistry;

fn candidate(text: &str, score: u8, unread: bool) -> RawCandidate {
    RawCandidate {
        text: text.into(),
        score,
        width: 320.0,
        height: 72.0,
        unread,
    }
}

#[test]
fn raw_candidates_flow_into_a_ranked_report() {
    let raw = vec![
        candidate("divit\nsee you tomorrow\n2h ago", 5, false),
        candidate("divit\nsee you tomorrow\n2h ago", 10, true),
        candidate("cheesepizzalover911\nlol\nYesterday", 7, true),
        candidate("", 8, false),
    ];

    let unique = dedupe(raw);
    // Duplicate text collapses to its first occurrence; empty text is dropped.
    assert_eq!(unique.len(), 2);
    assert_eq!(unique[0].score, 5);

    let ranked = rank(unique);
    assert_eq!(ranked[0].score, 7);
    assert_eq!(ranked[1].score, 5);

    let conversations: Vec<ConversationGuess> = ranked
        .into_iter()
        .map(|c| {
            let (username, preview) = split_username_preview(&c.text);
            ConversationGuess {
                username,
                preview,
                time: String::new(),
                unread: c.unread,
                score: c.score,
                full_text: c.text,
            }
        })
        .collect();
    assert_eq!(conversations[0].username, "cheesepizzalover911");
    assert_eq!(conversations[1].preview, "see you tomorrow 2h ago");

    let scan = ConversationScan {
        unread_count: 3,
        all_candidates: 4,
        unique_candidates: 2,
        conversations,
    };

    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path(), "testuser");
    let path = writer.write_text_report(&scan).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("INSTAGRAM DM TEXT REPORT"));
    assert!(content.contains("CONVERSATIONS (Sorted by likelihood):"));
    assert!(content.contains("#1: cheesepizzalover911"));
    assert!(content.contains("Confidence score: 7/10"));

    // The monitor reads the unread count back out of the same file.
    assert_eq!(read_unread_count(&dir.path().join(TEXT_REPORT)), Some(3));
}

#[test]
fn empty_scan_still_writes_a_useful_report() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path(), "testuser");
    let path = writer
        .write_text_report(&ConversationScan::default())
        .unwrap();

    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("No conversations could be extracted."));
    assert!(content.contains("4_messages_page.png"));
}

#[test]
fn conversation_summary_names_the_file_after_the_thread() {
    let scan = MessageScan {
        url: "https://www.instagram.com/direct/t/34012345/".into(),
        conversation_id: "34012345".into(),
        messages: vec![
            MessageGuess {
                text: "hey, you around?".into(),
                is_mine: false,
                timestamp: None,
            },
            MessageGuess {
                text: "yeah give me 5".into(),
                is_mine: true,
                timestamp: Some("2:14 PM".into()),
            },
        ],
    };

    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path(), "testuser");
    let path = writer.write_conversation_summary(&scan).unwrap();

    assert!(path.ends_with("conversation_34012345_summary.txt"));
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("Them: hey, you around?"));
    assert!(content.contains("Me (2:14 PM): yeah give me 5"));
}

#[test]
fn preview_filter_mirrors_the_tool_output() {
    let texts: Vec<String> = vec![
        "Go to your Home feed".into(),
        "see you at the thing tomorrow".into(),
        "Search Instagram".into(),
        "2 unread messages from your friend".into(),
    ];
    let previews = filter_previews(&texts);
    // Navigation chrome is dropped, real previews survive.
    assert_eq!(previews.len(), 2);
    assert!(!previews[0].unread);
    assert!(previews[1].unread);
}

#[test]
fn registry_exposes_both_tools_as_openai_functions() {
    let registry = ToolRegistry::new();
    let tools = registry.get_tools_json();
    let tools = tools.as_array().unwrap();
    assert_eq!(tools.len(), 2);

    let names: Vec<&str> = tools
        .iter()
        .map(|t| t["function"]["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"instagram_login"));
    assert!(names.contains(&"instagram_messages"));

    for tool in tools {
        assert_eq!(tool["type"], "function");
        assert!(tool["function"]["parameters"]["type"] == "object");
    }
}
