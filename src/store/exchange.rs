//! Export to JSON or CSV and bulk import of externally produced records.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{screen, ReflectionStore};
use crate::error::{EngineError, EngineResult};
use crate::model::{Category, Reflection, ReflectionDraft};
use crate::query::{self, ReflectionFilter, SortKey, SortSpec};

/// Output format for [`ReflectionStore::export`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Result of a bulk import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Records written to the store.
    pub accepted: usize,
    /// Records whose id already existed.
    pub duplicates: usize,
    /// Index and reason for each malformed record.
    pub rejected: Vec<(usize, EngineError)>,
}

const CSV_HEADER: [&str; 13] = [
    "id",
    "title",
    "content",
    "category",
    "mood",
    "tags",
    "is_private",
    "created_at",
    "updated_at",
    "word_count",
    "reading_time",
    "therapeutic_value",
    "crisis_safe",
];

impl ReflectionStore {
    /// Export reflections, oldest first, optionally restricted by a filter.
    pub fn export(
        &self,
        format: ExportFormat,
        filter: Option<&ReflectionFilter>,
    ) -> EngineResult<Vec<u8>> {
        let all = ReflectionFilter::default();
        let selected = query::query_reflections(
            self.reflections.values(),
            filter.unwrap_or(&all),
            &SortSpec::ascending(SortKey::Timestamp),
        );
        debug!(format = %format, count = selected.len(), "Exporting reflections");

        match format {
            ExportFormat::Json => serde_json::to_vec_pretty(&selected).map_err(EngineError::from),
            ExportFormat::Csv => Ok(to_csv(&selected).into_bytes()),
        }
    }

    /// Import loosely-typed records.
    ///
    /// Each record needs `id`, `title`, `content`, `category` and a timestamp
    /// (`created_at`, `createdAt` or `timestamp`). Malformed records and ids
    /// already in the store are skipped. Imported text is run through the
    /// crisis screen, but escalation is not triggered for historical data.
    pub fn import_records(&mut self, records: &[Value]) -> ImportReport {
        let mut report = ImportReport::default();
        let mut touched = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let mut reflection = match parse_record(record) {
                Ok(r) => r,
                Err(e) => {
                    debug!(index, error = %e, "Skipping malformed import record");
                    report.rejected.push((index, e));
                    continue;
                }
            };
            if self.reflections.contains_key(&reflection.id) {
                debug!(index, reflection_id = %reflection.id, "Skipping duplicate import record");
                report.duplicates += 1;
                continue;
            }
            if screen(&reflection) {
                reflection.metadata.crisis_safe = false;
            }
            touched.push(reflection.category);
            self.reflections.insert(reflection.id.clone(), reflection);
            report.accepted += 1;
        }

        info!(
            accepted = report.accepted,
            duplicates = report.duplicates,
            rejected = report.rejected.len(),
            "Import finished"
        );
        if report.accepted > 0 {
            self.after_reflection_change(&touched);
        }
        report
    }

    /// Import from a JSON array.
    pub fn import_json(&mut self, bytes: &[u8]) -> EngineResult<ImportReport> {
        let records: Vec<Value> = match serde_json::from_slice(bytes) {
            Ok(v) => v,
            Err(e) => return Err(self.record(e.into())),
        };
        Ok(self.import_records(&records))
    }
}

fn parse_record(record: &Value) -> EngineResult<Reflection> {
    let Some(obj) = record.as_object() else {
        return Err(EngineError::validation("record", "must be an object"));
    };

    let id = required_str(record, "id")?;
    let title = required_str(record, "title")?;
    let content = required_str(record, "content")?;
    let category: Category = required_str(record, "category")?
        .parse()
        .map_err(|e: String| EngineError::validation("category", e))?;

    let raw_ts = ["created_at", "createdAt", "timestamp"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .ok_or_else(|| EngineError::validation("created_at", "missing"))?;
    let created_at = parse_timestamp("created_at", raw_ts)?;

    let mut draft = ReflectionDraft::new(title, content, category).at(created_at);
    if let Some(mood) = obj.get("mood").filter(|v| !v.is_null()) {
        let mood = mood
            .as_u64()
            .and_then(|m| u8::try_from(m).ok())
            .ok_or_else(|| EngineError::validation("mood", "must be an integer 1-10"))?;
        draft = draft.with_mood(mood);
    }
    if let Some(tags) = obj.get("tags").and_then(Value::as_array) {
        draft = draft.with_tags(tags.iter().filter_map(Value::as_str));
    }
    if flag(obj.get("is_private").or_else(|| obj.get("isPrivate"))) {
        draft = draft.private();
    }
    if let Some(metadata) = obj.get("metadata").and_then(Value::as_object) {
        let states = metadata
            .get("emotional_state")
            .or_else(|| metadata.get("emotionalState"))
            .and_then(Value::as_array);
        if let Some(states) = states {
            draft = draft.with_emotional_state(states.iter().filter_map(Value::as_str));
        }
        if let Some(notes) = metadata.get("insights").and_then(Value::as_array) {
            for note in notes.iter().filter_map(Value::as_str) {
                draft = draft.with_insight(note);
            }
        }
    }
    draft.prompt = obj
        .get("prompt")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut reflection = Reflection::from_draft(draft, created_at)?;
    reflection.id = id.to_string();

    let raw_updated = obj
        .get("updated_at")
        .or_else(|| obj.get("updatedAt"))
        .and_then(Value::as_str);
    if let Some(raw) = raw_updated {
        reflection.updated_at = parse_timestamp("updated_at", raw)?.max(created_at);
    }
    Ok(reflection)
}

fn required_str<'a>(record: &'a Value, field: &str) -> EngineResult<&'a str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| EngineError::validation(field, "missing or empty"))
}

fn parse_timestamp(field: &str, raw: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::validation(field, format!("invalid timestamp: {}", e)))
}

fn flag(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

fn to_csv(reflections: &[&Reflection]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for r in reflections {
        let tags = r.tags.iter().cloned().collect::<Vec<_>>().join(";");
        let fields = [
            r.id.clone(),
            r.title.clone(),
            r.content.clone(),
            r.category.to_string(),
            r.mood.map(|m| m.to_string()).unwrap_or_default(),
            tags,
            r.is_private.to_string(),
            r.created_at.to_rfc3339(),
            r.updated_at.to_rfc3339(),
            r.word_count.to_string(),
            r.reading_time.to_string(),
            r.metadata.therapeutic_value.to_string(),
            r.metadata.crisis_safe.to_string(),
        ];
        let line = fields
            .iter()
            .map(|f| escape_csv(f))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(out, "{}", line);
    }
    out
}

/// Quote a field when it holds a delimiter, quote or line break.
fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
