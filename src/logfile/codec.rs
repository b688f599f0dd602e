//! Minimal CSV codec for run log bodies
//!
//! Writing quotes a field only when it contains a delimiter, a quote or a
//! line break, or starts with `#` (an unquoted one would read back as a
//! metadata comment line). Reading accepts quoted fields spanning several lines, doubled
//! quotes inside quoted fields, and `\r\n` line endings.

use std::borrow::Cow;

const DELIMITER: char = ',';
const QUOTE: char = '"';
const COMMENT: char = '#';

/// Quote `field` if it needs it.
#[must_use]
pub fn encode_field(field: &str) -> Cow<'_, str> {
    if field.starts_with(COMMENT) || field.contains(&[DELIMITER, QUOTE, '\n', '\r'][..]) {
        Cow::Owned(format!("{QUOTE}{}{QUOTE}", field.replace(QUOTE, "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Encode one row, newline-terminated.
pub fn encode_row<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = fields
        .into_iter()
        .map(|f| encode_field(f.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Split a CSV body into rows of unquoted fields.
///
/// Blank lines are skipped. An unterminated quote swallows the rest of the
/// input into its field.
#[must_use]
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // Whether the current line carried anything at all (even an empty quoted field)
    let mut line_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    field.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            QUOTE if field.is_empty() => {
                in_quotes = true;
                line_started = true;
            }
            DELIMITER => {
                row.push(std::mem::take(&mut field));
                line_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                if line_started || !field.is_empty() {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                line_started = false;
            }
            _ => {
                field.push(c);
                line_started = true;
            }
        }
    }

    if line_started || !field.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields_are_not_quoted() {
        assert_eq!(encode_row(["loss", "step"]), "loss,step\n");
    }

    #[test]
    fn test_special_fields_are_quoted() {
        assert_eq!(encode_field("a,b"), "\"a,b\"");
        assert_eq!(encode_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(encode_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_leading_hash_is_quoted() {
        assert_eq!(encode_field("#params"), "\"#params\"");
        assert_eq!(encode_field("n#"), "n#");

        let text = encode_row(["#params", "loss"]);
        assert!(!text.starts_with('#'));
        assert_eq!(parse_rows(&text), vec![vec!["#params", "loss"]]);
    }

    #[test]
    fn test_parse_quoted_and_multiline() {
        let text = "name,note\n\"a,b\",\"line1\nline2\"\nplain,\"say \"\"hi\"\"\"\n";
        let rows = parse_rows(text);
        assert_eq!(
            rows,
            vec![
                vec!["name", "note"],
                vec!["a,b", "line1\nline2"],
                vec!["plain", "say \"hi\""],
            ]
        );
    }

    #[test]
    fn test_parse_skips_blank_lines_and_crlf() {
        let rows = parse_rows("a,b\r\n\r\n1,2\r\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_parse_keeps_empty_cells() {
        let rows = parse_rows("a,b,c\n1,,3\n,,\n");
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1", "", "3"], vec!["", "", ""]]);
    }

    #[test]
    fn test_parse_without_trailing_newline() {
        assert_eq!(parse_rows("x,y\n1,2"), vec![vec!["x", "y"], vec!["1", "2"]]);
    }
}
