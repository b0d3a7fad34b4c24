//! In-page scan payloads.
//!
//! Everything that must run against the live DOM lives here as zero-argument
//! arrow functions for `page.eval`. The payloads only *collect* candidates;
//! de-duplication, ranking and text post-processing happen on the Rust side
//! where they can be tested.

/// Conversation candidate scan for the inbox page.
///
/// Four independent detection strategies, each with a fixed confidence score:
/// 1. size/shape filter (5)
/// 2. known-container lookup (10)
/// 3. row-stacking alignment (7)
/// 4. avatar adjacency (8)
pub const CONVERSATION_SCAN: &str = r#"
() => {
    const candidates = [];

    const push = (el, score) => {
        const rect = el.getBoundingClientRect();
        candidates.push({
            text: el.innerText || '',
            score: score,
            width: rect.width,
            height: rect.height,
            unread:
                el.querySelector('circle') !== null ||
                el.innerHTML.includes('unread') ||
                Boolean(el.querySelector('[style*="color:rgb(0, 149, 246)"]'))
        });
    };

    // Method 1: elements that contain both text and images (likely DM items)
    document.querySelectorAll('div').forEach(div => {
        if (div.clientHeight > 50 && div.clientHeight < 100 &&
            div.clientWidth > 200 &&
            div.querySelectorAll('img, svg').length &&
            div.innerText.length > 10) {
            push(div, 5);
        }
    });

    // Method 2: direct children of the known inbox container
    const inboxContainer = document.querySelector('div[role="listbox"]') ||
                           document.querySelector('div[aria-label*="inbox"]') ||
                           document.querySelector('div[data-pagelet*="direct"]');
    if (inboxContainer) {
        inboxContainer.childNodes.forEach(child => {
            if (child.nodeType === 1 && child.innerText) {
                push(child, 10);
            }
        });
    }

    // Method 3: vertically stacked rows with consistent heights
    const potentialRows = [];
    document.querySelectorAll('div').forEach(div => {
        const rect = div.getBoundingClientRect();
        if (rect.width > window.innerWidth * 0.5 &&
            rect.height > 40 && rect.height < 120) {
            potentialRows.push({ element: div, y: rect.y, height: rect.height });
        }
    });
    potentialRows.sort((a, b) => a.y - b.y);
    for (let i = 0; i < potentialRows.length - 1; i++) {
        const current = potentialRows[i];
        const next = potentialRows[i + 1];
        if (Math.abs(current.height - next.height) < 20 &&
            next.y - (current.y + current.height) < 20) {
            push(current.element, 7);
        }
    }

    // Method 4: avatar adjacency - small square images inside a plausible row
    document.querySelectorAll('img').forEach(img => {
        const rect = img.getBoundingClientRect();
        if (rect.width > 20 && rect.width < 60 &&
            Math.abs(rect.width - rect.height) < 5) {
            let parent = img.parentElement;
            for (let i = 0; i < 5 && parent; i++) {
                if (parent.innerText &&
                    parent.clientWidth > window.innerWidth * 0.5 &&
                    parent.clientHeight > 40 &&
                    parent.clientHeight < 120) {
                    push(parent, 8);
                    break;
                }
                parent = parent.parentElement;
            }
        }
    });

    // Unread count from the page title, e.g. "(3) Inbox ..."
    const unreadMatch = document.title.match(/\((\d+)\)/);

    return {
        unread_count: unreadMatch ? parseInt(unreadMatch[1]) : 0,
        all_candidates_count: candidates.length,
        candidates: candidates.filter(c => c.text.length > 0)
    };
}
"#;

/// Message scan for an open conversation (`/direct/t/...`).
pub const MESSAGE_SCAN: &str = r#"
() => {
    const messages = [];

    // Method 1: standard message row containers
    document.querySelectorAll('div[role="row"]').forEach(row => {
        if (row.innerText && row.innerText.length > 0) {
            messages.push({
                text: row.innerText,
                is_mine: row.classList.contains('xdl72j9') ||
                         row.querySelector('[style*="margin-left: auto"]') !== null
            });
        }
    });

    // Method 2: styled bubbles, scored by structural features
    const possible = [];
    document.querySelectorAll('div').forEach(div => {
        if (div.clientHeight > 20 && div.clientHeight < 300 &&
            div.clientWidth > 50 && div.clientWidth < 500 &&
            div.innerText && div.innerText.length > 0) {
            const style = window.getComputedStyle(div);
            const hasStyle = style.padding !== '0px' ||
                             style.border !== '' ||
                             style.borderRadius !== '0px' ||
                             style.background !== 'none';
            if (hasStyle) {
                possible.push({ element: div, text: div.innerText, score: 0 });
            }
        }
    });

    possible.forEach(msg => {
        // Messages are often grouped by sender
        if (msg.element.parentElement &&
            msg.element.parentElement.childElementCount > 1) {
            msg.score += 3;
        }
        // Avatars nearby
        if (msg.element.querySelector('img') ||
            msg.element.parentElement.querySelector('img')) {
            msg.score += 2;
        }
        // Timestamp-looking text
        if (msg.text.match(/\d{1,2}:\d{2}/) ||
            msg.text.match(/yesterday|today|now|min|hour/i)) {
            msg.score += 2;
        }
    });

    possible
        .filter(msg => msg.score >= 3)
        .forEach(msg => {
            messages.push({
                text: msg.text,
                is_mine: msg.element.style.marginLeft === 'auto'
            });
        });

    return {
        url: window.location.href,
        conversation_id: window.location.href.match(/\/t\/(.*?)(\/|$)/)?.[1] || '',
        messages: messages
    };
}
"#;

/// Lightweight text-node scan used by the `instagram_messages` tool.
pub const PREVIEW_SCAN: &str = r#"
() => {
    const isDMPage = window.location.href.includes('direct') ||
                     document.title.toLowerCase().includes('inbox') ||
                     document.body.innerHTML.includes('inbox');

    const textNodes = Array.from(document.querySelectorAll('div, span, p'))
        .filter(el => {
            const text = el.textContent.trim();
            return text.length > 5 && text.length < 200;
        })
        .map(el => el.textContent.trim())
        .slice(0, 20);

    return {
        page_title: document.title,
        current_url: window.location.href,
        is_dm_page: isDMPage,
        potential_message_texts: textNodes,
        unread_count: document.querySelectorAll('[class*="unread"], [aria-label*="unread"]').length || 0
    };
}
"#;

/// Coarse page identification used for the access report.
pub const PAGE_INFO: &str = r#"
() => {
    return {
        url: window.location.href,
        title: document.title,
        text_length: document.body.innerText.length,
        has_dm_indicators: document.body.innerHTML.includes('inbox') ||
                           document.body.innerHTML.includes('direct') ||
                           document.body.innerHTML.includes('message'),
        has_conversation_view: window.location.href.includes('/direct/t/') ||
                               document.body.innerHTML.includes('messageEntry')
    };
}
"#;

/// Quick logged-in / on-DM-page check after inbox navigation.
pub const DM_PAGE_CHECK: &str = r#"
() => {
    return document.body.innerText.includes("Messages") ||
        document.querySelectorAll('div[aria-label="Chats"]').length > 0 ||
        document.querySelectorAll('div[role="listbox"]').length > 0;
}
"#;
