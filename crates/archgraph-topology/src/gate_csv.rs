// ABOUTME: RFC 4180 reader and writer for the coverage-gate CSV exchange
// ABOUTME: Pulls the CSV out of fenced or bare completion text and turns rows into gate verdicts

use archgraph_core::Confidence;
use serde::Serialize;
use std::str::FromStr;

pub const GATE_CSV_HEADER: &str = "from_module_path,to_module_path,action,reason";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateAction {
    Confirm,
    Skip,
}

impl FromStr for GateAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONFIRM" => Ok(GateAction::Confirm),
            "SKIP" => Ok(GateAction::Skip),
            other => Err(format!("unknown gate action: {}", other)),
        }
    }
}

/// One parsed verdict row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateRow {
    pub from_module_path: String,
    pub to_module_path: String,
    pub action: GateAction,
    pub reason: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateParseResult {
    pub rows: Vec<GateRow>,
    pub parse_errors: usize,
}

/// The CSV payload inside a completion: the first fenced block if any, else the whole text.
pub fn extract_csv_block(response: &str) -> &str {
    let Some(open) = response.find("```") else {
        return response.trim();
    };
    let after_fence = &response[open + 3..];
    // Skip the info string (```csv) up to the end of the fence line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(after_fence.len());
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Parse RFC 4180 records. Quoted fields may hold commas, newlines and `""` escapes.
/// A quote inside an unquoted field is kept literally; an unterminated quote
/// runs to the end of input.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => {
                field.push(ch);
                field_started = true;
            }
        }
    }

    if field_started || !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

/// Quote a field when it contains a delimiter, quote or line break.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn write_record(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a gate-loop response. Header rows are ignored; rows with the wrong
/// column count, an unknown action or an empty path are counted, never fatal.
pub fn parse_gate_response(response: &str) -> GateParseResult {
    let mut result = GateParseResult::default();

    for record in parse_records(extract_csv_block(response)) {
        if record
            .first()
            .is_some_and(|f| f.trim().eq_ignore_ascii_case("from_module_path"))
        {
            continue;
        }
        match parse_row(&record) {
            Some(row) => result.rows.push(row),
            None => result.parse_errors += 1,
        }
    }
    result
}

fn parse_row(record: &[String]) -> Option<GateRow> {
    if record.len() != 4 && record.len() != 5 {
        return None;
    }
    let from_module_path = record[0].trim().to_string();
    let to_module_path = record[1].trim().to_string();
    if from_module_path.is_empty() || to_module_path.is_empty() {
        return None;
    }
    let action = record[2].parse::<GateAction>().ok()?;
    let confidence = record
        .get(4)
        .and_then(|c| c.parse::<Confidence>().ok())
        .unwrap_or(Confidence::Medium);

    Some(GateRow {
        from_module_path,
        to_module_path,
        action,
        reason: record[3].trim().to_string(),
        confidence,
    })
}
