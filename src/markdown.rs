use std::panic::{AssertUnwindSafe, catch_unwind};

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const FENCE: &str = "```";

/// Markdown rendering failed on a fragment. Never leaves this module: the
/// fragment is re-emitted verbatim instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatError;

/// Formats one streamed fragment into owned display lines. Fragments with
/// no markdown-looking syntax are emitted verbatim, which keeps the common
/// log-line case cheap.
pub fn format_fragment(text: &str) -> Vec<Line<'static>> {
    if text.is_empty() {
        return Vec::new();
    }
    if !looks_like_markdown(text) {
        return plain_lines(text);
    }
    let prepared = if text.contains(FENCE) {
        rewrite_fences(text)
    } else {
        text.to_string()
    };
    rendered_or_verbatim(&prepared, render_markdown(&prepared))
}

/// Cheap syntax sniff. A bare `*` also covers `**`; a single underscore
/// does not count, only the doubled emphasis form.
pub fn looks_like_markdown(text: &str) -> bool {
    text.contains('*') || text.contains("__") || text.contains(FENCE)
}

/// Rewrites fenced code blocks into labeled plain blocks before markdown
/// parsing: `Code (<language>):` (or `Code:` with no tag) followed by the
/// inner text unchanged, fence markers dropped. Line-oriented, two states:
/// outside a block, a line whose trimmed form starts with the marker opens
/// one; inside, such a line closes it. An opening marker with no close is
/// left as literal text to the end of the fragment.
pub fn rewrite_fences(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        if !is_fence_line(line) {
            out.push(line.to_string());
            idx += 1;
            continue;
        }
        match find_fence_close(&lines, idx + 1) {
            Some(close) => {
                out.push(fence_label(line));
                for body in &lines[idx + 1..close] {
                    out.push((*body).to_string());
                }
                idx = close + 1;
            }
            None => {
                for rest in &lines[idx..] {
                    out.push((*rest).to_string());
                }
                idx = lines.len();
            }
        }
    }
    out.join("\n")
}

fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

fn find_fence_close(lines: &[&str], from: usize) -> Option<usize> {
    lines[from..]
        .iter()
        .position(|line| is_fence_line(line))
        .map(|offset| from + offset)
}

fn fence_label(opening: &str) -> String {
    let tag = opening.trim_start().trim_start_matches('`');
    match tag.split_whitespace().next() {
        Some(language) => format!("Code ({language}):"),
        None => "Code:".to_string(),
    }
}

// tui_markdown has no error return, so "fails in any way" means a panic out
// of the parser; contain it and let the caller fall back.
fn render_markdown(text: &str) -> Result<Vec<Line<'static>>, FormatError> {
    catch_unwind(AssertUnwindSafe(|| {
        let rendered = tui_markdown::from_str(text);
        owned_lines(rendered.lines)
    }))
    .map_err(|_| FormatError)
}

fn rendered_or_verbatim(
    prepared: &str,
    rendered: Result<Vec<Line<'static>>, FormatError>,
) -> Vec<Line<'static>> {
    match rendered {
        Ok(lines) => lines,
        Err(FormatError) => plain_lines(prepared),
    }
}

// One display line per text line. A single trailing newline is the fragment
// boundary, not an extra blank line.
fn plain_lines(text: &str) -> Vec<Line<'static>> {
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    trimmed
        .split('\n')
        .map(|line| Line::from(line.to_string()))
        .collect()
}

// tui_markdown renders into ratatui-core types; the rest of the crate draws
// with ratatui 0.29's own. The enums match variant for variant, so the
// conversion is mechanical.
fn owned_lines(lines: Vec<ratatui_core::text::Line<'_>>) -> Vec<Line<'static>> {
    lines
        .into_iter()
        .map(|line| {
            let style = convert_style(line.style);
            let spans: Vec<Span<'static>> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.into_owned(), convert_style(span.style)))
                .collect();
            Line::from(spans).style(style)
        })
        .collect()
}

fn convert_style(style: ratatui_core::style::Style) -> Style {
    let mut out = Style::new()
        .remove_modifier(convert_modifier(style.sub_modifier))
        .add_modifier(convert_modifier(style.add_modifier));
    if let Some(color) = style.fg {
        out = out.fg(convert_color(color));
    }
    if let Some(color) = style.bg {
        out = out.bg(convert_color(color));
    }
    out
}

fn convert_modifier(modifier: ratatui_core::style::Modifier) -> Modifier {
    Modifier::from_bits_truncate(modifier.bits())
}

fn convert_color(color: ratatui_core::style::Color) -> Color {
    use ratatui_core::style::Color as CoreColor;
    match color {
        CoreColor::Reset => Color::Reset,
        CoreColor::Black => Color::Black,
        CoreColor::Red => Color::Red,
        CoreColor::Green => Color::Green,
        CoreColor::Yellow => Color::Yellow,
        CoreColor::Blue => Color::Blue,
        CoreColor::Magenta => Color::Magenta,
        CoreColor::Cyan => Color::Cyan,
        CoreColor::Gray => Color::Gray,
        CoreColor::DarkGray => Color::DarkGray,
        CoreColor::LightRed => Color::LightRed,
        CoreColor::LightGreen => Color::LightGreen,
        CoreColor::LightYellow => Color::LightYellow,
        CoreColor::LightBlue => Color::LightBlue,
        CoreColor::LightMagenta => Color::LightMagenta,
        CoreColor::LightCyan => Color::LightCyan,
        CoreColor::White => Color::White,
        CoreColor::Rgb(r, g, b) => Color::Rgb(r, g, b),
        CoreColor::Indexed(index) => Color::Indexed(index),
    }
}

#[cfg(test)]
#[path = "../tests/unit/markdown_tests.rs"]
mod tests;
