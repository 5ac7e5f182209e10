//! Header resolution, sanitization and per-row checks.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use time::{macros::format_description, Date};
use tracing::debug;

use super::credentials::email_local_part;
use super::error::ImportError;
use super::tokenizer::{parse_records, Record};
use crate::config::ImportConfig;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_POSTAL_CHARS: usize = 20;
pub const MIN_BIRTH_YEAR: i32 = 1900;

const NAME_KEYWORDS: &[&str] = &["name", "nome", "full"];
const POSTAL_KEYWORDS: &[&str] = &["postal", "zip", "cep", "postcode"];
const BIRTHDAY_KEYWORDS: &[&str] = &["birth", "nasc", "dob"];

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^[\p{L}\p{M} '.\-]+$").unwrap();
    static ref POSTAL_RE: Regex = Regex::new(r"^[A-Za-z0-9 \-]+$").unwrap();
    static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

/// A data row that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRow {
    pub line: usize,
    pub name: String,
    pub postal_code: String,
    pub birthday: Date,
}

/// A skipped row and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Default)]
pub struct Validated {
    pub rows: Vec<ValidRow>,
    pub errors: Vec<RowError>,
}

/// Column positions of the required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub name: usize,
    pub postal_code: usize,
    pub birthday: usize,
}

impl Columns {
    fn width(&self) -> usize {
        self.name.max(self.postal_code).max(self.birthday) + 1
    }
}

fn find_column(header: &[String], keywords: &[&str], taken: &[usize]) -> Option<usize> {
    header.iter().enumerate().find_map(|(idx, cell)| {
        let cell = cell.trim().to_lowercase();
        let hit = !taken.contains(&idx) && keywords.iter().any(|k| cell.contains(k));
        hit.then_some(idx)
    })
}

/// Map header cells onto the fixed schema by case-insensitive substring match.
pub fn resolve_columns(header: &Record) -> Result<Columns, ImportError> {
    let mut taken = Vec::with_capacity(3);
    let mut missing = Vec::new();

    let mut claim = |keywords: &[&str], label: &'static str| {
        let found = find_column(&header.fields, keywords, &taken);
        match found {
            Some(idx) => taken.push(idx),
            None => missing.push(label),
        }
        found
    };

    // birthday and postal first so a "birth name" style header is not eaten by name
    let birthday = claim(BIRTHDAY_KEYWORDS, "birthday");
    let postal_code = claim(POSTAL_KEYWORDS, "postal_code");
    let name = claim(NAME_KEYWORDS, "name");

    match (name, postal_code, birthday) {
        (Some(name), Some(postal_code), Some(birthday)) => Ok(Columns {
            name,
            postal_code,
            birthday,
        }),
        _ => {
            missing.sort_by_key(|m| ["name", "postal_code", "birthday"].iter().position(|x| x == m));
            Err(ImportError::MissingColumns(missing))
        }
    }
}

/// Drop control characters, then trim and collapse whitespace runs.
pub fn sanitize(raw: &str) -> String {
    let visible: String = raw.chars().filter(|c| c.is_whitespace() || !c.is_control()).collect();
    visible.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is required".into());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("name exceeds {MAX_NAME_CHARS} characters"));
    }
    if !NAME_RE.is_match(name) {
        return Err(format!("name '{name}' contains invalid characters"));
    }
    if email_local_part(name).is_empty() {
        return Err(format!("name '{name}' has no letters usable in an email"));
    }
    Ok(())
}

pub fn validate_postal_code(postal: &str) -> Result<(), String> {
    if postal.is_empty() {
        return Err("postal code is required".into());
    }
    if postal.chars().count() > MAX_POSTAL_CHARS {
        return Err(format!("postal code exceeds {MAX_POSTAL_CHARS} characters"));
    }
    if !POSTAL_RE.is_match(postal) {
        return Err(format!("postal code '{postal}' contains invalid characters"));
    }
    Ok(())
}

/// Strict `YYYY-MM-DD`, a real calendar date, year in `[1900, current_year]`.
pub fn validate_birthday(value: &str, current_year: i32) -> Result<Date, String> {
    if !DATE_RE.is_match(value) {
        return Err(format!("birthday '{value}' must be formatted as YYYY-MM-DD"));
    }
    let date = Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| format!("birthday '{value}' is not a valid date"))?;
    if !(MIN_BIRTH_YEAR..=current_year).contains(&date.year()) {
        return Err(format!(
            "birthday '{value}' must be between {MIN_BIRTH_YEAR} and {current_year}"
        ));
    }
    Ok(date)
}

fn validate_record(record: &Record, cols: Columns, current_year: i32) -> Result<ValidRow, String> {
    if record.fields.len() < cols.width() {
        return Err(format!(
            "expected at least {} fields, found {}",
            cols.width(),
            record.fields.len()
        ));
    }
    let field = |idx: usize| sanitize(record.field(idx).unwrap_or_default());

    let name = field(cols.name);
    let postal_code = field(cols.postal_code);
    let birthday = field(cols.birthday);

    validate_name(&name)?;
    validate_postal_code(&postal_code)?;
    let birthday = validate_birthday(&birthday, current_year)?;

    Ok(ValidRow {
        line: record.line,
        name,
        postal_code,
        birthday,
    })
}

/// Run the whole batch: size limits, tokenizing, header resolution, row checks.
///
/// Batch-level problems fail the call. Row-level problems skip the row and are
/// reported in [`Validated::errors`]; the call fails only when no row survives.
pub fn validate_csv(
    text: &str,
    limits: &ImportConfig,
    today: Date,
) -> Result<Validated, ImportError> {
    if text.len() > limits.max_bytes {
        return Err(ImportError::TooLarge {
            max_bytes: limits.max_bytes,
        });
    }

    let records = parse_records(text)?;
    let (header, data) = match records.split_first() {
        Some((header, data)) if !data.is_empty() => (header, data),
        _ => return Err(ImportError::MissingData),
    };

    if data.len() > limits.max_rows {
        return Err(ImportError::TooManyRows {
            rows: data.len(),
            max_rows: limits.max_rows,
        });
    }

    let cols = resolve_columns(header)?;
    debug!(?cols, rows = data.len(), "csv header resolved");

    let mut out = Validated::default();
    for record in data {
        match validate_record(record, cols, today.year()) {
            Ok(row) => out.rows.push(row),
            Err(message) => out.errors.push(RowError {
                line: record.line,
                message,
            }),
        }
    }

    if out.rows.is_empty() {
        return Err(ImportError::NoValidRows(out.errors));
    }
    Ok(out)
}
