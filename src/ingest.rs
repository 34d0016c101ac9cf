//! Triple ingestion from files.
//!
//! Two formats:
//! - `.txt`: one quoted tuple per line, `("Subject", "PREDICATE", "Object")`,
//!   single or double quotes; anything else on the line is ignored
//! - `.json`: an array of objects with `subject`, `predicate`, `object`
//!   string fields (extra fields are kept as triple metadata)
//!
//! Predicate canonicalization happens on construction, so `lives in` and
//! `LIVES_IN` ingest identically. Duplicate records are preserved.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::error::IngestError;
use crate::triple::Triple;

/// Result alias for ingestion operations.
pub type IngestResult<T> = std::result::Result<T, IngestError>;

// Single-quoted fields may contain double quotes and vice versa, so the
// two quoting styles get separate patterns tried in order.
fn single_quoted_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\(\s*'([^']+)'\s*,\s*'([^']+)'\s*,\s*'([^']+)'\s*\)").unwrap()
    })
}

fn double_quoted_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\(\s*"([^"]+)"\s*,\s*"([^"]+)"\s*,\s*"([^"]+)"\s*\)"#).unwrap()
    })
}

#[derive(Deserialize)]
struct TripleRecord {
    subject: String,
    predicate: String,
    object: String,
    #[serde(flatten)]
    extra: std::collections::BTreeMap<String, serde_json::Value>,
}

/// Load triples from a file, dispatching on extension.
pub fn load_file(path: &Path) -> IngestResult<Vec<Triple>> {
    let triples = match path.extension().and_then(|e| e.to_str()) {
        Some("txt") => load_txt(path)?,
        Some("json") => load_json(path)?,
        _ => {
            return Err(IngestError::UnsupportedFormat {
                path: path.display().to_string(),
            });
        }
    };

    if triples.is_empty() {
        return Err(IngestError::Empty {
            path: path.display().to_string(),
        });
    }
    info!(path = %path.display(), count = triples.len(), "ingested triples");
    Ok(triples)
}

fn read(path: &Path) -> IngestResult<String> {
    std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parse the quoted-tuple format, one triple per line.
fn load_txt(path: &Path) -> IngestResult<Vec<Triple>> {
    let content = read(path)?;
    let mut triples = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let caps = single_quoted_pattern()
            .captures(line)
            .or_else(|| double_quoted_pattern().captures(line));
        if let Some(caps) = caps {
            triples.push(Triple::new(
                caps[1].trim(),
                caps[2].trim(),
                caps[3].trim(),
            ));
        }
    }
    Ok(triples)
}

/// Parse a JSON array of triple records.
fn load_json(path: &Path) -> IngestResult<Vec<Triple>> {
    let content = read(path)?;
    let records: Vec<TripleRecord> =
        serde_json::from_str(&content).map_err(|e| IngestError::Json {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    Ok(records
        .into_iter()
        .map(|r| {
            let mut triple = Triple::new(r.subject.trim(), r.predicate.as_str(), r.object.trim());
            for (key, value) in r.extra {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                triple = triple.with_metadata(key, value);
            }
            triple
        })
        .collect())
}
