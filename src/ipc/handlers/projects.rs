use crate::board::{derive_buckets, filter_records, stage_counts};
use crate::config::{self, PipelineConfig};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, parse_opt_date, parse_opt_string, patch_param, query_param, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::reconciler::Notification;
use crate::record::Project;
use rusqlite::Connection;
use serde_json::{json, Map, Value as JsonValue};

fn required_text(v: &JsonValue, key: &str) -> Result<String, (&'static str, String)> {
    v.as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ("bad_params", format!("{} must be a non-empty string", key)))
}

/// Applies editable fields onto `project`. Shared by create and update so
/// both enforce the same stage and contact rules.
fn apply_project_patch(
    conn: &Connection,
    pipeline: &PipelineConfig,
    project: &mut Project,
    patch: &Map<String, JsonValue>,
) -> Result<(), (&'static str, String)> {
    for (k, v) in patch {
        match k.as_str() {
            "name" => project.name = required_text(v, k)?,
            "type" => project.project_type = required_text(v, k)?,
            "stage" => {
                let stage = required_text(v, k)?;
                if !pipeline.is_known_stage(&stage) {
                    return Err(("bad_params", format!("unknown stage: {}", stage)));
                }
                project.stage = stage;
            }
            "leadSource" | "timezone" => {
                let s = parse_opt_string(Some(v))
                    .map_err(|m| ("bad_params", format!("{} {}", k, m)))?;
                if k == "leadSource" {
                    project.lead_source = s;
                } else {
                    project.timezone = s;
                }
            }
            "startDate" => {
                project.start_date = parse_opt_date(Some(v), k).map_err(|m| ("bad_params", m))?
            }
            "endDate" => {
                project.end_date = parse_opt_date(Some(v), k).map_err(|m| ("bad_params", m))?
            }
            "contactId" => {
                let id = parse_opt_string(Some(v))
                    .map_err(|m| ("bad_params", format!("{} {}", k, m)))?;
                project.contact = match id {
                    None => None,
                    Some(id) => match db::contact_get(conn, &id) {
                        Ok(Some(c)) => Some(c),
                        Ok(None) => return Err(("not_found", "contact not found".to_string())),
                        Err(e) => return Err(("db_query_failed", e.to_string())),
                    },
                };
            }
            _ => return Err(("bad_params", format!("unknown project field: {}", k))),
        }
    }
    Ok(())
}

fn handle_projects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let query = match query_param(req) {
        Ok(q) => q,
        Err(e) => return e,
    };
    let pipeline = config::load_pipeline(conn);
    let stage = match parse_opt_string(req.params.get("stage")) {
        Ok(v) => v.unwrap_or_else(|| "all".to_string()),
        Err(m) => return err(&req.id, "bad_params", format!("stage {}", m), None),
    };
    if stage != "all" && !pipeline.is_known_stage(&stage) {
        return err(&req.id, "bad_params", format!("unknown stage: {}", stage), None);
    }

    let projects = match db::projects_list(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let matching = filter_records(&projects, &query);
    let counts: Vec<JsonValue> = stage_counts(&matching, &pipeline.stages)
        .into_iter()
        .map(|(stage, count)| json!({ "stage": stage, "count": count }))
        .collect();
    let rows: Vec<Project> = if stage == "all" {
        matching
    } else {
        derive_buckets(&matching, &pipeline.stages)
            .get(&stage)
            .map(<[Project]>::to_vec)
            .unwrap_or_default()
    };

    ok(
        &req.id,
        json!({
            "projects": rows,
            "stageCounts": counts,
        }),
    )
}

fn handle_projects_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let project_id = match required_str(req, "projectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::project_get(conn, &project_id) {
        Ok(Some(p)) => ok(&req.id, json!({ "project": p })),
        Ok(None) => err(&req.id, "not_found", "project not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_projects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(params) = req.params.as_object() else {
        return err(&req.id, "bad_params", "params must be an object", None);
    };
    for key in ["name", "type"] {
        if !params.contains_key(key) {
            return err(&req.id, "bad_params", format!("missing {}", key), None);
        }
    }
    let pipeline = config::load_pipeline(conn);
    let mut project = Project {
        stage: pipeline.default_stage().to_string(),
        ..Default::default()
    };
    if let Err((code, msg)) = apply_project_patch(conn, &pipeline, &mut project, params) {
        return err(&req.id, code, msg, None);
    }

    match db::project_insert(conn, &project) {
        Ok(id) => {
            project.id = id.clone();
            ok(
                &req.id,
                json!({
                    "projectId": id,
                    "project": project,
                    "notification": Notification::success("Project created successfully!"),
                }),
            )
        }
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_projects_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let project_id = match required_str(req, "projectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match patch_param(req) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let mut project = match db::project_get(conn, &project_id) {
        Ok(Some(p)) => p,
        Ok(None) => return err(&req.id, "not_found", "project not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let pipeline = config::load_pipeline(conn);
    if let Err((code, msg)) = apply_project_patch(conn, &pipeline, &mut project, patch) {
        return err(&req.id, code, msg, None);
    }

    match db::project_update(conn, &project) {
        Ok(true) => ok(
            &req.id,
            json!({
                "project": project,
                "notification": Notification::success("Project updated successfully!"),
            }),
        ),
        Ok(false) => err(&req.id, "not_found", "project not found", None),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_projects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let project_id = match required_str(req, "projectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::project_delete(conn, &project_id) {
        Ok(true) => ok(&req.id, json!({ "deleted": true })),
        Ok(false) => err(&req.id, "not_found", "project not found", None),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "projects.list" => Some(handle_projects_list(state, req)),
        "projects.open" => Some(handle_projects_open(state, req)),
        "projects.create" => Some(handle_projects_create(state, req)),
        "projects.update" => Some(handle_projects_update(state, req)),
        "projects.delete" => Some(handle_projects_delete(state, req)),
        _ => None,
    }
}
