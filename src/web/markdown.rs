// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Markdown to HTML for answer cards
//!
//! Raw HTML in the source is shown as text, never passed through.

use pulldown_cmark::{html, Event, Options, Parser};

/// Render a markdown fragment to HTML
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        // answers are written line by line
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_heading_and_time() {
        let html = render_markdown("## Screenshot: shot.png\n**Time:** 2025-01-01 10:00:00\n\nAnswer");
        assert!(html.contains("<h2>Screenshot: shot.png</h2>"));
        assert!(html.contains("<p><strong>Time:</strong> 2025-01-01 10:00:00</p>"));
        assert!(html.contains("<p>Answer</p>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render_markdown("<script>alert(1)</script>\n\nSee <b>this</b> & more");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("See &lt;b&gt;this&lt;/b&gt; &amp; more"));
    }

    #[test]
    fn test_tables() {
        let html = render_markdown("| Q | A |\n|---|---|\n| 2+2 | 4 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>Q</th>"));
        assert!(html.contains("<td>2+2</td>"));
        assert!(html.contains("<td>4</td>"));
        assert!(!html.contains("|"));
    }

    #[test]
    fn test_code_fence() {
        let html = render_markdown("Look:\n\n```rust\nlet a = 1 < 2;\n```\n\nDone");
        assert!(html.contains("<pre><code"));
        assert!(html.contains("let a = 1 &lt; 2;"));
        assert!(html.contains("<p>Done</p>"));
    }

    #[test]
    fn test_rule() {
        assert!(render_markdown("above\n\n---\n\nbelow").contains("<hr />"));
    }

    #[test]
    fn test_line_breaks_within_paragraph() {
        let html = render_markdown("A. one\nB. two");
        assert!(html.contains("A. one<br />"));
        assert!(html.contains("B. two</p>"));
    }
}
