//! Markdown rendering for message content.
//!
//! Model output is untrusted: raw HTML blocks and inline HTML are dropped
//! before rendering, and link or image targets with a scheme other than
//! `http`, `https` or `mailto` are replaced with `#`.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

use crate::state::ChatMessage;

/// Render one message body as an HTML fragment.
#[must_use]
pub fn render(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => {
            Some(Event::Start(Tag::Link { link_type, dest_url: safe_url(dest_url), title, id }))
        }
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
            Some(Event::Start(Tag::Image { link_type, dest_url: safe_url(dest_url), title, id }))
        }
        other => Some(other),
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) { url } else { CowStr::Borrowed("#") }
}

/// Relative targets and allowlisted schemes pass. Browsers ignore ASCII
/// whitespace and control characters inside a scheme, so they are ignored here too.
fn is_safe_url(url: &str) -> bool {
    let cleaned: String = url.chars().filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control()).collect();
    let Some(colon) = cleaned.find(':') else {
        return true;
    };
    if cleaned[..colon].contains(['/', '?', '#']) {
        return true;
    }
    let scheme = cleaned[..colon].to_ascii_lowercase();
    SAFE_SCHEMES.contains(&scheme.as_str())
}

/// Standalone HTML page with every message in order.
#[must_use]
pub fn render_transcript(messages: &[ChatMessage]) -> String {
    let mut out = String::from("<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>Chat transcript</title></head>\n<body>\n");
    for message in messages {
        let role = message.role.as_str();
        out.push_str(&format!("<div class=\"chat-message chat-message--{role}\">\n"));
        out.push_str(&render(&message.content));
        out.push_str("</div>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}
