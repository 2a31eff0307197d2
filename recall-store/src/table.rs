//! Minimal CSV codec: comma separated, `"` quoting with doubled quotes,
//! CRLF or LF line ends, optional UTF-8 byte-order mark.

use crate::TableError;

pub const BOM: &str = "\u{feff}";

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r']) || field.starts_with(' ') || field.ends_with(' ')
}

pub fn encode_field(field: &str, out: &mut String) {
    if needs_quotes(field) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// One record terminated by `\n`.
pub fn encode_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        encode_field(field.as_ref(), &mut out);
    }
    out.push('\n');
    out
}

pub fn encode<S: AsRef<str>>(rows: &[Vec<S>], bom: bool) -> String {
    let mut out = String::new();
    if bom {
        out.push_str(BOM);
    }
    for row in rows {
        out.push_str(&encode_row(row));
    }
    out
}

/// Parses a whole document. A blank line yields an empty record so that
/// callers can tell a sheet whose first row is blank from an empty one.
pub fn parse(text: &str) -> Result<Vec<Vec<String>>, TableError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut any = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
                any = true;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                any = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                line += 1;
                if any || !field.is_empty() {
                    row.push(std::mem::take(&mut field));
                }
                rows.push(std::mem::take(&mut row));
                any = false;
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(TableError::UnterminatedQuote(quote_line));
    }
    if any || !field.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}
