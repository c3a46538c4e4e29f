use crate::db;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};

pub const SECTION_PIPELINE: &str = "setup.pipeline";
pub const SECTION_CALENDAR: &str = "setup.calendar";

const DEFAULT_STAGES: [(&str, &str); 11] = [
    ("Inquiry", "#1976d2"),
    ("Questionnaire Sent", "#ff9800"),
    ("Follow Up", "#d81b60"),
    ("Brochure sent", "#43a047"),
    ("Consult", "#7e57c2"),
    ("Proposal Sent", "#8e24aa"),
    ("Proposal Signed", "#cddc39"),
    ("Retainer Paid", "#009688"),
    ("Planning", "#ff7043"),
    ("Completed", "#689f38"),
    ("Archived", "#90a4ae"),
];

const FALLBACK_STAGE_COLOR: &str = "#1976d2";

const DEFAULT_PALETTE: [&str; 7] = [
    "#00AB55", "#1890FF", "#54D62C", "#FFC107", "#FF4842", "#04297A", "#7A0C2E",
];

/// Ordered stage labels plus their accent colors. Index 0 is the default
/// bucket for records whose stage is not recognised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub stages: Vec<String>,
    pub stage_colors: Map<String, JsonValue>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut stage_colors = Map::new();
        for (stage, color) in DEFAULT_STAGES {
            stage_colors.insert(stage.to_string(), json!(color));
        }
        Self {
            stages: DEFAULT_STAGES.iter().map(|(s, _)| s.to_string()).collect(),
            stage_colors,
        }
    }
}

impl PipelineConfig {
    pub fn default_stage(&self) -> &str {
        // stages is never empty: parse_pipeline falls back to the defaults.
        self.stages.first().map(String::as_str).unwrap_or("Inquiry")
    }

    pub fn is_known_stage(&self, stage: &str) -> bool {
        self.stages.iter().any(|s| s == stage)
    }

    pub fn color_for(&self, stage: &str) -> &str {
        self.stage_colors
            .get(stage)
            .and_then(|v| v.as_str())
            .unwrap_or(FALLBACK_STAGE_COLOR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConfig {
    pub palette: Vec<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

pub fn clean_string_list(v: Option<&JsonValue>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in v.and_then(|v| v.as_array()).into_iter().flatten() {
        let Some(s) = item.as_str().map(str::trim) else {
            continue;
        };
        if !s.is_empty() && !out.iter().any(|o| o == s) {
            out.push(s.to_string());
        }
    }
    out
}

pub fn parse_pipeline(obj: &Map<String, JsonValue>) -> PipelineConfig {
    let defaults = PipelineConfig::default();
    let stages = clean_string_list(obj.get("stages"));
    let stages = if stages.is_empty() {
        defaults.stages
    } else {
        stages
    };
    let mut stage_colors = defaults.stage_colors;
    if let Some(custom) = obj.get("stageColors").and_then(|v| v.as_object()) {
        for (stage, color) in custom {
            if let Some(c) = color.as_str().map(str::trim).filter(|c| !c.is_empty()) {
                stage_colors.insert(stage.clone(), json!(c));
            }
        }
    }
    PipelineConfig {
        stages,
        stage_colors,
    }
}

pub fn parse_calendar(obj: &Map<String, JsonValue>) -> CalendarConfig {
    let palette = clean_string_list(obj.get("palette"));
    if palette.is_empty() {
        CalendarConfig::default()
    } else {
        CalendarConfig { palette }
    }
}

fn load_section(conn: &Connection, key: &str) -> Map<String, JsonValue> {
    db::settings_get_json(conn, key)
        .ok()
        .flatten()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default()
}

pub fn load_pipeline(conn: &Connection) -> PipelineConfig {
    parse_pipeline(&load_section(conn, SECTION_PIPELINE))
}

pub fn load_calendar(conn: &Connection) -> CalendarConfig {
    parse_calendar(&load_section(conn, SECTION_CALENDAR))
}
