use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

/// Rendering capability for bot messages. The widget works without rich
/// rendering; `PlainText` is a deliberate fallback mode, not an error.
pub trait MarkdownRenderer {
    fn render(&self, text: &str) -> Text<'static>;
}

/// Renders every line verbatim.
pub struct PlainText;

impl MarkdownRenderer for PlainText {
    fn render(&self, text: &str) -> Text<'static> {
        Text::from(text.lines().map(|l| Line::from(l.to_string())).collect::<Vec<_>>())
    }
}

/// Lightweight Markdown styling: headings, bullets, fenced code blocks,
/// `inline code` and **bold**. Anything it does not recognize passes
/// through as plain text.
pub struct StyledMarkdown;

impl MarkdownRenderer for StyledMarkdown {
    fn render(&self, text: &str) -> Text<'static> {
        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut in_code_block = false;

        for line in text.lines() {
            if line.trim_start().starts_with("```") {
                in_code_block = !in_code_block;
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::DarkGray),
                )));
                continue;
            }

            if in_code_block {
                lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Green),
                )));
            } else if let Some(heading) = line
                .strip_prefix("### ")
                .or_else(|| line.strip_prefix("## "))
                .or_else(|| line.strip_prefix("# "))
            {
                lines.push(Line::from(Span::styled(
                    heading.to_string(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            } else if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
                let mut spans = vec![Span::styled("• ", Style::default().fg(Color::DarkGray))];
                spans.extend(parse_inline(item).spans);
                lines.push(Line::from(spans));
            } else {
                lines.push(parse_inline(line));
            }
        }

        Text::from(lines)
    }
}

/// Convert `**bold**` and `` `code` `` runs in a single line to styled spans.
fn parse_inline(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            let mut bold = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold.push(c);
            }

            if found_close && !bold.is_empty() {
                if !current.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current)));
                }
                spans.push(Span::styled(bold, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current.push_str("**");
                current.push_str(&bold);
            }
        } else if c == '`' {
            let mut code = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '`' {
                    found_close = true;
                    break;
                }
                code.push(c);
            }

            if found_close && !code.is_empty() {
                if !current.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current)));
                }
                spans.push(Span::styled(code, Style::default().fg(Color::Yellow)));
            } else {
                current.push('`');
                current.push_str(&code);
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        spans.push(Span::raw(current));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Collect the contents of fenced code blocks, in document order. These are
/// the units the copy action operates on. An unclosed trailing fence still
/// yields a block so partial answers stay copyable.
pub fn extract_code_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            match current.take() {
                Some(lines) => blocks.push(lines.join("\n")),
                None => current = Some(Vec::new()),
            }
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some(lines) = current {
        if !lines.is_empty() {
            blocks.push(lines.join("\n"));
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_runs_become_styled_spans() {
        let line = parse_inline("this is **important** text");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "important");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unterminated_bold_is_literal() {
        let line = parse_inline("just **literal stars");
        let joined: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(joined, "just **literal stars");
    }

    #[test]
    fn inline_code_is_highlighted() {
        let line = parse_inline("run `cargo build` first");
        assert_eq!(line.spans[1].content, "cargo build");
        assert_eq!(line.spans[1].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn headings_and_bullets_are_styled() {
        let text = StyledMarkdown.render("## Setup\n- step one");
        assert_eq!(text.lines.len(), 2);
        assert_eq!(text.lines[0].spans[0].content, "Setup");
        assert_eq!(text.lines[1].spans[0].content, "• ");
    }

    #[test]
    fn plain_text_renderer_keeps_markup_verbatim() {
        let text = PlainText.render("## Setup\n**bold** and `code`");
        assert_eq!(text.lines.len(), 2);
        assert_eq!(text.lines[0].spans[0].content, "## Setup");
        assert_eq!(text.lines[1].spans[0].content, "**bold** and `code`");
    }

    #[test]
    fn extracts_fenced_code_blocks_in_order() {
        let text = "intro\n```bash\necho one\n```\nmiddle\n```\nlet x = 2;\nlet y = 3;\n```\n";
        assert_eq!(extract_code_blocks(text), vec!["echo one", "let x = 2;\nlet y = 3;"]);
    }

    #[test]
    fn unclosed_fence_yields_trailing_block() {
        let text = "```python\nprint('hi')";
        assert_eq!(extract_code_blocks(text), vec!["print('hi')"]);
    }

    #[test]
    fn no_fences_means_no_blocks() {
        assert!(extract_code_blocks("plain `inline` only").is_empty());
    }
}
