//! Line-numbered rendering of file contents for model prompts.

use std::path::Path;

const BANNER: &str = "================";

/// Placeholder used when the file has no known path.
pub const UNNAMED_FILE: &str = "<file>";

/// Render `content` with a banner and right-aligned 1-based line numbers.
///
/// Every line is rendered as `<n> | <line>`, with `<n>` padded to the width
/// of the largest line number.
pub fn format_file(content: &str, rel_path: Option<&Path>) -> String {
    let name = rel_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| UNNAMED_FILE.to_string());
    let lines = split_lines(content);

    if lines.is_empty() {
        return format!("{BANNER}\n{name} (empty)\n{BANNER}\n\n\n");
    }

    let width = digits(lines.len());
    let numbered = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$} | {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{BANNER}\n{name} (line numbers added)\n{BANNER}\n\n{numbered}\n\n\n")
}

/// The source line a model-reported 1-based line number refers to.
pub fn source_line(content: &str, line_number: u64) -> Option<&str> {
    let index = usize::try_from(line_number).ok()?.checked_sub(1)?;
    split_lines(content).get(index).copied()
}

/// Resolve a line number against text produced by [`format_file`].
///
/// Returns the original source text of that line, with the number prefix
/// and separator stripped.
pub fn formatted_line(formatted: &str, line_number: u64) -> Option<&str> {
    formatted.lines().find_map(|line| {
        let (number, rest) = line.split_once(" | ")?;
        let parsed = number.trim_start().parse::<u64>().ok()?;
        (parsed == line_number).then_some(rest)
    })
}

/// Split on every line boundary a text editor would show, not only `\n`.
///
/// Recognised breaks are `\r\n`, `\n`, `\r`, vertical tab, form feed,
/// the file/group/record separators, NEL and the Unicode line and paragraph
/// separators. A trailing break does not start an extra empty line.
pub fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = content.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&content[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && chars.next_if(|&(_, next)| next == '\n').is_some() {
            start += 1;
        }
    }
    if start < content.len() {
        lines.push(&content[start..]);
    }
    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn digits(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TWELVE: &str = "fn one() {}\n\
        // two\n\
        \n\
        /// Theorem: four\n\
        /// Proof: five\n\
        six\n\
        seven | with a pipe\n\
        eight\n\
        nine\n\
        ten\n\
        eleven\n\
        twelve";

    #[test]
    fn twelve_line_file_round_trips_every_line() {
        let formatted = format_file(TWELVE, Some(Path::new("src/lib.rs")));
        for (i, original) in TWELVE.lines().enumerate() {
            let n = i as u64 + 1;
            assert_eq!(formatted_line(&formatted, n), Some(original), "line {n}");
            assert_eq!(source_line(TWELVE, n), Some(original));
        }
        assert_eq!(source_line(TWELVE, 0), None);
        assert_eq!(source_line(TWELVE, 13), None);
    }

    #[test]
    fn numbers_are_padded_to_uniform_width() {
        let formatted = format_file(TWELVE, None);
        assert!(formatted.contains("\n 1 | fn one() {}\n"));
        assert!(formatted.contains("\n12 | twelve\n"));
        assert!(formatted.starts_with("================\n<file> (line numbers added)\n"));
    }

    #[test]
    fn empty_file_gets_empty_banner() {
        let formatted = format_file("", Some(Path::new("empty.txt")));
        assert_eq!(formatted, "================\nempty.txt (empty)\n================\n\n\n");
    }

    #[test]
    fn carriage_return_only_file_is_numbered_per_line() {
        let content = "first\rsecond\r\nthird\u{2028}fourth\r";
        assert_eq!(split_lines(content), ["first", "second", "third", "fourth"]);

        let formatted = format_file(content, Some(Path::new("mac.txt")));
        assert_eq!(formatted_line(&formatted, 2), Some("second"));
        assert_eq!(formatted_line(&formatted, 4), Some("fourth"));
        assert_eq!(source_line(content, 3), Some("third"));
        assert_eq!(source_line(content, 5), None);
    }

    #[test]
    fn split_lines_keeps_blank_lines_and_drops_trailing_break() {
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("a\n"), ["a"]);
        assert_eq!(split_lines("a\n\nb"), ["a", "", "b"]);
        assert_eq!(split_lines("\n"), [""]);
        assert_eq!(split_lines("a\x0cb\x0bc"), ["a", "b", "c"]);
    }

    #[test]
    fn digit_widths() {
        assert_eq!(digits(1), 1);
        assert_eq!(digits(9), 1);
        assert_eq!(digits(10), 2);
        assert_eq!(digits(100), 3);
    }

    proptest! {
        #[test]
        fn any_line_maps_back_to_source(
            lines in proptest::collection::vec("[a-z |]{1,20}", 1..150),
            pick in any::<prop::sample::Index>(),
        ) {
            let content = lines.join("\n");
            let formatted = format_file(&content, Some(Path::new("f.txt")));
            let i = pick.index(lines.len());
            let n = i as u64 + 1;
            prop_assert_eq!(formatted_line(&formatted, n), Some(lines[i].as_str()));
        }
    }
}
