use crate::config::{self, clean_string_list, SECTION_CALENDAR, SECTION_PIPELINE};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Pipeline,
    Calendar,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "pipeline" => Some(Self::Pipeline),
            "calendar" => Some(Self::Calendar),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Pipeline => SECTION_PIPELINE,
            Self::Calendar => SECTION_CALENDAR,
        }
    }
}

fn parse_non_empty_list(v: &Value, key: &str) -> Result<Value, String> {
    if !v.is_array() {
        return Err(format!("{} must be an array of strings", key));
    }
    let list = clean_string_list(Some(v));
    if list.is_empty() {
        return Err(format!("{} must contain at least one value", key));
    }
    Ok(json!(list))
}

fn parse_color_map(v: &Value) -> Result<Value, String> {
    let obj = v
        .as_object()
        .ok_or_else(|| "stageColors must be an object".to_string())?;
    let mut out = Map::new();
    for (stage, color) in obj {
        let c = color
            .as_str()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| format!("stageColors.{} must be a non-empty string", stage))?;
        out.insert(stage.clone(), json!(c));
    }
    Ok(Value::Object(out))
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Map<String, Value>,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    for (k, v) in patch {
        let parsed = match (section, k.as_str()) {
            (SetupSection::Pipeline, "stages") => parse_non_empty_list(v, k)?,
            (SetupSection::Pipeline, "stageColors") => parse_color_map(v)?,
            (SetupSection::Pipeline, _) => return Err(format!("unknown pipeline field: {}", k)),
            (SetupSection::Calendar, "palette") => parse_non_empty_list(v, k)?,
            (SetupSection::Calendar, _) => return Err(format!("unknown calendar field: {}", k)),
        };
        current.insert(k.clone(), parsed);
    }
    Ok(())
}

fn effective_section(conn: &rusqlite::Connection, section: SetupSection) -> Value {
    match section {
        SetupSection::Pipeline => json!(config::load_pipeline(conn)),
        SetupSection::Calendar => json!(config::load_calendar(conn)),
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!({
            "pipeline": effective_section(conn, SetupSection::Pipeline),
            "calendar": effective_section(conn, SetupSection::Calendar),
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match db::settings_get_json(conn, section.key()) {
        Ok(v) => v.and_then(|v| v.as_object().cloned()).unwrap_or_default(),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &Value::Object(current)) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    let mut result = Map::new();
    result.insert(section_raw.to_string(), effective_section(conn, section));
    ok(&req.id, Value::Object(result))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
