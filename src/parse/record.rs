//! Decoding of a single log record.
//!
//! Two layouts are accepted:
//!
//! ```text
//! {"type":"assistant","uuid":"..","timestamp":"..","message":{"role":"assistant","content":[..],"usage":{..}}}
//! {"role":"user","content":"..","timestamp":".."}
//! ```
//!
//! `content` is either a string or an array of typed parts (`text`, `thinking`,
//! `tool_use`, `tool_result`). Unknown fields are ignored.

use crate::error::ParseError;
use crate::model::{Block, BlockContent, Role};
use bstr::ByteSlice;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

const FENCE: &str = "```";

/// Decode one non-empty line. `line` is 1-based.
pub fn decode_line(line: usize, bytes: &[u8]) -> Result<Block, ParseError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| ParseError::MalformedJson {
            line,
            message: err.to_string(),
        })?;
    let record = value
        .as_object()
        .ok_or(ParseError::NotAnObject { line })?;

    let timestamp = parse_timestamp(line, record)?;
    let message = record.get("message").and_then(Value::as_object);
    let record_type = record.get("type").and_then(Value::as_str);

    let role_label = message
        .and_then(|m| m.get("role"))
        .or_else(|| record.get("role"))
        .and_then(Value::as_str)
        .or(record_type);
    let content = message
        .and_then(|m| m.get("content"))
        .or_else(|| record.get("content"));

    let (role, content) = classify(record, record_type, role_label, content, bytes);

    let size_estimate = message
        .and_then(|m| m.get("usage"))
        .and_then(|u| u.get("output_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or_else(|| content.text().chars().count() as u64);
    let language = detect_language(content.text());

    let id = record
        .get("uuid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("line-{line}"));

    Ok(Block {
        id,
        line,
        timestamp,
        role,
        content,
        size_estimate,
        language,
    })
}

fn parse_timestamp(line: usize, record: &Map<String, Value>) -> Result<DateTime<Utc>, ParseError> {
    let raw = record.get("timestamp").ok_or(ParseError::MissingField {
        line,
        field: "timestamp",
    })?;
    let text = raw.as_str().ok_or_else(|| ParseError::InvalidTimestamp {
        line,
        value: raw.to_string(),
    })?;
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ParseError::InvalidTimestamp {
            line,
            value: text.to_string(),
        })
}

fn classify(
    record: &Map<String, Value>,
    record_type: Option<&str>,
    role_label: Option<&str>,
    content: Option<&Value>,
    raw: &[u8],
) -> (Role, BlockContent) {
    let role = role_label.and_then(Role::from_label);

    if record_type == Some("system") || role == Some(Role::System) {
        let kind = record
            .get("subtype")
            .and_then(Value::as_str)
            .unwrap_or("system")
            .to_string();
        let detail = content.map(flatten_text).unwrap_or_default();
        return (Role::System, BlockContent::SystemEvent { kind, detail });
    }

    match (role, content) {
        (Some(role), Some(Value::String(text))) => (role, BlockContent::Text(text.clone())),
        (Some(role), Some(Value::Array(parts))) => classify_parts(role, parts),
        _ => {
            let kind = record_type.or(role_label).unwrap_or("record").to_string();
            let raw = raw.trim().to_str_lossy().into_owned();
            (Role::System, BlockContent::Unknown { kind, raw })
        }
    }
}

fn classify_parts(role: Role, parts: &[Value]) -> (Role, BlockContent) {
    let mut texts: Vec<String> = Vec::new();
    let mut tool_use: Option<(String, String)> = None;
    let mut tool_results: Vec<String> = Vec::new();

    for part in parts {
        match part.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    texts.push(text.to_string());
                }
            }
            Some("thinking") => {
                if let Some(text) = part.get("thinking").and_then(Value::as_str) {
                    texts.push(text.to_string());
                }
            }
            Some("tool_use") if tool_use.is_none() => {
                let name = part
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("tool")
                    .to_string();
                let input = part
                    .get("input")
                    .map(Value::to_string)
                    .unwrap_or_default();
                tool_use = Some((name, input));
            }
            Some("tool_result") => {
                if let Some(content) = part.get("content") {
                    tool_results.push(flatten_text(content));
                }
            }
            _ => {}
        }
    }

    if !texts.is_empty() {
        (role, BlockContent::Text(texts.join("\n")))
    } else if let Some((name, input)) = tool_use {
        (role, BlockContent::tool_invocation(name, &input))
    } else if !tool_results.is_empty() {
        (Role::Tool, BlockContent::Text(tool_results.join("\n")))
    } else {
        (role, BlockContent::Text(String::new()))
    }
}

/// Text of a string or of the `text` parts of an array.
fn flatten_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                other => other.get("text").and_then(Value::as_str),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Language of the first fenced code block that names one.
pub fn detect_language(text: &str) -> Option<String> {
    let mut rest = text;
    while let Some(pos) = rest.find(FENCE) {
        let after = &rest[pos + FENCE.len()..];
        let hint = after
            .split(|c: char| c == '\n' || c.is_whitespace())
            .next()
            .unwrap_or("");
        if !hint.is_empty() {
            return Some(normalize_language(hint));
        }
        // closing fence or bare opening fence; skip past the block body
        rest = match after.find(FENCE) {
            Some(close) => &after[close + FENCE.len()..],
            None => return None,
        };
    }
    None
}

fn normalize_language(hint: &str) -> String {
    let lower = hint.to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "c++" => "cpp",
        "rb" => "ruby",
        "sh" | "shell" | "zsh" => "bash",
        "md" => "markdown",
        "yml" => "yaml",
        other => other,
    };
    canonical.to_string()
}
