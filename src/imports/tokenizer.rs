//! Record-aware CSV tokenizer.
//!
//! Fields are comma separated and may be wrapped in double quotes. Inside a
//! quoted field commas and line breaks are literal and `""` is an escaped quote.
//! `\n`, `\r\n` and lone `\r` all end a record.

use thiserror::Error;

/// One CSV record and the line it starts on (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

impl Record {
    pub fn field(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(String::as_str)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("Unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),
}

#[derive(Default)]
struct Builder {
    records: Vec<Record>,
    fields: Vec<String>,
    field: String,
    record_line: usize,
}

impl Builder {
    fn end_field(&mut self) {
        self.fields.push(std::mem::take(&mut self.field));
    }

    fn end_record(&mut self, next_line: usize) {
        self.end_field();
        let fields = std::mem::take(&mut self.fields);
        let blank = fields.len() == 1 && fields[0].trim().is_empty();
        if !blank {
            self.records.push(Record {
                line: self.record_line,
                fields,
            });
        }
        self.record_line = next_line;
    }
}

/// Split CSV text into records. Blank lines are skipped.
pub fn parse_records(text: &str) -> Result<Vec<Record>, TokenizeError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut b = Builder {
        record_line: 1,
        ..Default::default()
    };
    let mut line = 1;
    let mut in_quotes = false;
    let mut quote_line = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    b.field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    b.field.push(c);
                }
                _ => b.field.push(c),
            }
            continue;
        }

        match c {
            ',' => b.end_field(),
            '"' if b.field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => {
                line += 1;
                b.end_record(line);
            }
            _ => b.field.push(c),
        }
    }

    if in_quotes {
        return Err(TokenizeError::UnterminatedQuote(quote_line));
    }
    if !b.field.is_empty() || !b.fields.is_empty() {
        b.end_record(line);
    }
    Ok(b.records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(records: &[Record]) -> Vec<Vec<&str>> {
        records
            .iter()
            .map(|r| r.fields.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn splits_plain_lines() {
        let records = parse_records("name,postal\nAna,12345\n").unwrap();
        assert_eq!(fields(&records), vec![vec!["name", "postal"], vec!["Ana", "12345"]]);
        assert_eq!(records[1].line, 2);
    }

    #[test]
    fn quoted_field_keeps_commas() {
        let records = parse_records("name\n\"Silva, Ana\",x").unwrap();
        assert_eq!(records[1].fields, vec!["Silva, Ana", "x"]);
    }

    #[test]
    fn doubled_quote_is_escaped() {
        let records = parse_records(r#""say ""hi""",b"#).unwrap();
        assert_eq!(records[0].fields, vec![r#"say "hi""#, "b"]);
    }

    #[test]
    fn quoted_newline_stays_in_field_and_advances_line() {
        let records = parse_records("a\n\"multi\nline\",b\nc").unwrap();
        assert_eq!(records[1].fields, vec!["multi\nline", "b"]);
        assert_eq!(records[1].line, 2);
        assert_eq!(records[2].line, 4);
    }

    #[test]
    fn crlf_and_blank_lines() {
        let records = parse_records("a,b\r\n\r\n  \r\nc,d\r\n").unwrap();
        assert_eq!(fields(&records), vec![vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(records[1].line, 4);
    }

    #[test]
    fn lone_cr_ends_a_record() {
        let records = parse_records("a,b\rc,d\re").unwrap();
        assert_eq!(fields(&records), vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);
        assert_eq!(records[2].line, 3);
    }

    #[test]
    fn bom_is_ignored() {
        let records = parse_records("\u{feff}name,zip").unwrap();
        assert_eq!(records[0].fields, vec!["name", "zip"]);
    }

    #[test]
    fn empty_trailing_field_is_kept() {
        let records = parse_records("a,b,").unwrap();
        assert_eq!(records[0].fields, vec!["a", "b", ""]);
    }

    #[test]
    fn unterminated_quote_reports_start_line() {
        let err = parse_records("a,b\nc,\"open\nmore").unwrap_err();
        assert_eq!(err, TokenizeError::UnterminatedQuote(2));
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(parse_records("").unwrap().is_empty());
        assert!(parse_records("\n\n").unwrap().is_empty());
    }
}
