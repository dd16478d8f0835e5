use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Column width used when rendering abstracts into plain-text messages.
pub const LINE_WIDTH: usize = 80;

/// Calculates the display width of a string in terminal columns.
///
/// CJK characters and most emoji count as two columns, combining marks as zero.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Decodes HTML entities left in feed text after XML unescaping.
///
/// The talks feed double-escapes markup, so `&amp;#39;` in the raw document
/// arrives here as `&#39;` and leaves as `'`. Returns `Cow::Borrowed` when the
/// text contains no entities.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(s)
}

/// Wraps text so that no line exceeds `width` display columns.
///
/// Every input line is wrapped on its own and the wrapped blocks are joined
/// with a single `\n`, so blank lines between paragraphs survive untouched.
/// Lines that already fit are copied verbatim, which makes wrapping a no-op
/// for text whose longest line is within `width`.
///
/// # Examples
///
/// ```
/// use talkbot::util::wrap_text;
///
/// assert_eq!(wrap_text("short line\n\nsecond paragraph", 80), "short line\n\nsecond paragraph");
/// assert_eq!(wrap_text("aaa bbb ccc", 7), "aaa bbb\nccc");
/// ```
pub fn wrap_text(text: &str, width: usize) -> String {
    text.split('\n')
        .map(|line| wrap_line(line, width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greedy word wrap of a single line.
///
/// Runs of whitespace between words collapse to one space once a line has to
/// be re-flowed. Words wider than `width` are broken across lines.
fn wrap_line(line: &str, width: usize) -> Cow<'_, str> {
    if width == 0 || display_width(line) <= width {
        return Cow::Borrowed(line);
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in line.split_whitespace() {
        let word_width = display_width(word);

        if word_width > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut chunks = break_word(word, width);
            // The tail of a broken word can still take following words
            if let Some(last) = chunks.pop() {
                lines.extend(chunks);
                current_width = display_width(&last);
                current = last;
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    Cow::Owned(lines.join("\n"))
}

/// Splits a single word into chunks of at most `width` columns.
///
/// A character wider than `width` on its own still gets a chunk so the loop
/// always makes progress.
fn break_word(word: &str, width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut chunk_width = 0;

    for c in word.chars() {
        let char_width = UnicodeWidthChar::width(c).unwrap_or(0);
        if chunk_width + char_width > width && !chunk.is_empty() {
            chunks.push(std::mem::take(&mut chunk));
            chunk_width = 0;
        }
        chunk.push(c);
        chunk_width += char_width;
    }

    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}
