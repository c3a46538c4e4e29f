use crate::config::PipelineConfig;
use crate::record::Project;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

#[derive(Debug, Clone, PartialEq)]
pub struct StageBucket {
    pub stage: String,
    pub records: Vec<Project>,
}

/// One bucket per known stage, in stage order. Empty stages are present.
#[derive(Debug, Clone, PartialEq)]
pub struct StageBucketMap {
    pub buckets: Vec<StageBucket>,
}

impl StageBucketMap {
    pub fn get(&self, stage: &str) -> Option<&[Project]> {
        self.buckets
            .iter()
            .find(|b| b.stage == stage)
            .map(|b| b.records.as_slice())
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.records.len()).sum()
    }
}

/// Resolves the bucket a record belongs to. Unknown or empty stage values
/// land in the first known stage.
pub fn bucket_key<'a>(stage: &str, known_stages: &'a [String]) -> Option<&'a str> {
    known_stages
        .iter()
        .find(|s| s.as_str() == stage)
        .or_else(|| known_stages.first())
        .map(String::as_str)
}

pub fn derive_buckets(records: &[Project], known_stages: &[String]) -> StageBucketMap {
    let mut buckets: Vec<StageBucket> = known_stages
        .iter()
        .map(|stage| StageBucket {
            stage: stage.clone(),
            records: Vec::new(),
        })
        .collect();

    for record in records {
        let Some(key) = bucket_key(&record.stage, known_stages) else {
            continue;
        };
        if let Some(bucket) = buckets.iter_mut().find(|b| b.stage == key) {
            bucket.records.push(record.clone());
        }
    }

    StageBucketMap { buckets }
}

fn contains_folded(field: &str, needle: &str) -> bool {
    field.to_lowercase().contains(needle)
}

/// Case-insensitive substring search over name, type and contact name.
/// A blank query returns the input unchanged; otherwise surrounding
/// whitespace is part of the needle.
pub fn filter_records(records: &[Project], query: &str) -> Vec<Project> {
    if query.trim().is_empty() {
        return records.to_vec();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|p| {
            contains_folded(&p.name, &needle)
                || contains_folded(&p.project_type, &needle)
                || p.contact
                    .as_ref()
                    .map(|c| contains_folded(&c.name, &needle))
                    .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCard {
    pub project: Project,
    pub draggable: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub stage: String,
    pub color: String,
    pub count: usize,
    pub cards: Vec<BoardCard>,
}

/// Filter, bucket and decorate a record list for rendering.
pub fn board_view(records: &[Project], query: &str, pipeline: &PipelineConfig) -> JsonValue {
    let visible = filter_records(records, query);
    let map = derive_buckets(&visible, &pipeline.stages);
    let total = map.total();
    let columns: Vec<BoardColumn> = map
        .buckets
        .into_iter()
        .map(|b| BoardColumn {
            color: pipeline.color_for(&b.stage).to_string(),
            count: b.records.len(),
            cards: b
                .records
                .into_iter()
                .map(|p| BoardCard {
                    draggable: p.has_stable_id(),
                    project: p,
                })
                .collect(),
            stage: b.stage,
        })
        .collect();
    json!({
        "query": query,
        "total": total,
        "columns": columns,
    })
}

/// Per-stage tab counts for the project list, keyed with the same fallback
/// the board uses. `all` counts every record.
pub fn stage_counts(records: &[Project], known_stages: &[String]) -> Vec<(String, usize)> {
    let map = derive_buckets(records, known_stages);
    let mut out = Vec::with_capacity(map.buckets.len() + 1);
    out.push(("all".to_string(), records.len()));
    for b in map.buckets {
        out.push((b.stage, b.records.len()));
    }
    out
}
