//! Fits row names into a fixed number of terminal cells.
//!
//! Widths are measured in rendered cells, so wide CJK glyphs count as two
//! and combining marks as zero.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Returns `name` unchanged when it fits, otherwise abbreviates leading path
/// segments and finally falls back to a middle ellipsis.
pub fn compact_name(name: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if display_width(name) <= width {
        return name.to_string();
    }
    let abbreviated = abbreviate_path(name, width);
    if display_width(&abbreviated) <= width {
        return abbreviated;
    }
    ellipsize_middle(&abbreviated, width)
}

fn path_separator(s: &str) -> Option<char> {
    if s.contains('/') {
        Some('/')
    } else if s.contains('.') {
        Some('.')
    } else {
        None
    }
}

/// Shortens leading segments to their first character, leftmost first, until
/// the joined result fits. The final segment is never shortened.
pub fn abbreviate_path(s: &str, width: usize) -> String {
    let Some(sep) = path_separator(s) else {
        return s.to_string();
    };
    let mut parts = s.split(sep).map(str::to_string).collect::<Vec<_>>();
    if parts.len() <= 1 {
        return s.to_string();
    }
    let sep_str = sep.to_string();
    let last = parts.len() - 1;
    for i in 0..last {
        if display_width(&parts.join(&sep_str)) <= width {
            break;
        }
        if let Some(first) = parts[i].chars().next() {
            parts[i] = first.to_string();
        }
    }
    parts.join(&sep_str)
}

/// Keeps a prefix and a suffix of `s` around `...` so the result is at most
/// `width` cells wide.
pub fn ellipsize_middle(s: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if display_width(s) <= width {
        return s.to_string();
    }
    if width <= ELLIPSIS.len() {
        return ".".repeat(width);
    }

    let target = width - display_width(ELLIPSIS);
    let left_target = target / 2 + target % 2;
    let right_target = target / 2;

    let mut left = String::new();
    let mut left_width = 0;
    for c in s.chars() {
        let w = char_width(c);
        if left_width + w > left_target {
            break;
        }
        left.push(c);
        left_width += w;
    }

    let mut right_chars = Vec::new();
    let mut right_width = 0;
    for c in s.chars().rev() {
        let w = char_width(c);
        if right_width + w > right_target {
            break;
        }
        right_chars.push(c);
        right_width += w;
    }
    right_chars.reverse();

    // Char widths do not always sum to the string width (emoji variation
    // selectors), so trim until the joined result really fits.
    let mut right = right_chars;
    loop {
        let out = format!("{left}{ELLIPSIS}{}", right.iter().collect::<String>());
        if display_width(&out) <= width {
            return out;
        }
        if !right.is_empty() {
            right.remove(0);
        } else if left.pop().is_none() {
            return ELLIPSIS.to_string();
        }
    }
}

/// Pads with spaces on the right up to `width` cells.
pub fn pad_right(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - current))
}
