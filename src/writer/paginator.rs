//! Line wrapping and page splitting.
//!
//! Every line is greedily word-wrapped to the configured width, except that
//! [`paginate_tables`] leaves complete table rows and separators untouched so
//! their columns stay aligned.

/// Lines of one page, top to bottom.
pub type Page = Vec<String>;

/// Wrap `lines` to `max_chars` and group them into pages of `max_lines`.
///
/// Zero limits are treated as one. An empty input yields one empty page.
///
/// ```
/// use pdf_courier::writer::paginate;
///
/// let pages = paginate(&["Hello world".to_string()], 5, 10);
/// assert_eq!(pages, vec![vec!["Hello".to_string(), "world".to_string()]]);
/// ```
pub fn paginate(lines: &[String], max_chars: usize, max_lines: usize) -> Vec<Page> {
    split_pages(lines, max_chars, max_lines, false)
}

/// Like [`paginate`], but lines shaped as table rows are kept whole.
///
/// Only for text rendered by a table extractor; prose that merely starts
/// with `|` is still wrapped by [`paginate`].
pub fn paginate_tables(lines: &[String], max_chars: usize, max_lines: usize) -> Vec<Page> {
    split_pages(lines, max_chars, max_lines, true)
}

fn split_pages(lines: &[String], max_chars: usize, max_lines: usize, keep_tables: bool) -> Vec<Page> {
    let max_chars = max_chars.max(1);
    let max_lines = max_lines.max(1);

    let mut wrapped = Vec::with_capacity(lines.len());
    for line in lines {
        if keep_tables && is_tabular(line) {
            wrapped.push(line.clone());
        } else {
            wrap_line(line, max_chars, &mut wrapped);
        }
    }

    if wrapped.is_empty() {
        return vec![Page::new()];
    }
    wrapped.chunks(max_lines).map(|chunk| chunk.to_vec()).collect()
}

/// True for a whole table row (`| .. |`) or separator (`+---+--+`).
pub fn is_tabular(line: &str) -> bool {
    let row = line.len() >= 2 && line.starts_with('|') && line.ends_with('|');
    let separator = line.len() >= 3
        && line.starts_with('+')
        && line.ends_with('+')
        && line[1..line.len() - 1]
            .split('+')
            .all(|cell| !cell.is_empty() && cell.bytes().all(|b| b == b'-'));
    row || separator
}

/// Greedy word wrap. Words longer than `max_chars` are cut to `max_chars`.
fn wrap_line(line: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0;
    let mut any_word = false;

    for word in line.split_whitespace() {
        any_word = true;
        let word: String = word.chars().take(max_chars).collect();
        let word_len = word.chars().count();

        if current_len == 0 {
            current = word;
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(&word);
            current_len += 1 + word_len;
        } else {
            out.push(std::mem::replace(&mut current, word));
            current_len = word_len;
        }
    }

    if any_word {
        out.push(current);
    } else {
        out.push(String::new());
    }
}
