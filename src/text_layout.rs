/// Word-aware wrap of an input region's text, with the screen cell of every
/// caret slot. `carets.len()` is always the char count plus one; index `i`
/// is where the caret sits after `i` chars.
#[derive(Debug, Clone)]
pub struct WrapLayout {
    pub text: String,
    pub carets: Vec<(u16, u16)>,
    pub line_count: u16,
}

pub fn wrap_with_carets(text: &str, width: u16) -> WrapLayout {
    let width = width.max(1);
    let mut out = String::with_capacity(text.len());
    let mut carets = Vec::with_capacity(text.chars().count() + 1);
    let mut row = 0u16;
    let mut col = 0u16;
    carets.push((row, col));

    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        if ch == '\n' {
            out.push('\n');
            row = row.saturating_add(1);
            col = 0;
            carets.push((row, col));
            rest = &rest[ch.len_utf8()..];
            continue;
        }
        if ch.is_whitespace() {
            place_char(&mut out, &mut carets, &mut row, &mut col, width, ch);
            rest = &rest[ch.len_utf8()..];
            continue;
        }

        let end = rest
            .find(|c: char| c.is_whitespace())
            .unwrap_or(rest.len());
        let word = &rest[..end];
        let word_cols = word.chars().count().min(u16::MAX as usize) as u16;
        if col > 0 && word_cols <= width && col.saturating_add(word_cols) > width {
            out.push('\n');
            row = row.saturating_add(1);
            col = 0;
        }
        for word_ch in word.chars() {
            place_char(&mut out, &mut carets, &mut row, &mut col, width, word_ch);
        }
        rest = &rest[end..];
    }

    let line_count = row.saturating_add(1);
    WrapLayout {
        text: out,
        carets,
        line_count,
    }
}

// Hard break eagerly when a char fills the row, so the caret slot after it
// already sits on the next row.
fn place_char(
    out: &mut String,
    carets: &mut Vec<(u16, u16)>,
    row: &mut u16,
    col: &mut u16,
    width: u16,
    ch: char,
) {
    out.push(ch);
    *col = col.saturating_add(1);
    if *col >= width {
        out.push('\n');
        *row = row.saturating_add(1);
        *col = 0;
    }
    carets.push((*row, *col));
}
