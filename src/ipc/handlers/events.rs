use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, parse_bool, parse_opt_date, parse_opt_string, patch_param, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::reconciler::Notification;
use crate::record::CalendarEvent;
use serde_json::{json, Map, Value as JsonValue};

fn apply_event_patch(event: &mut CalendarEvent, patch: &Map<String, JsonValue>) -> Result<(), String> {
    for (k, v) in patch {
        match k.as_str() {
            "title" => {
                event.title = parse_opt_string(Some(v))
                    .map_err(|m| format!("title {}", m))?
                    .ok_or_else(|| "title must be a non-empty string".to_string())?;
            }
            "start" => {
                event.start = parse_opt_date(Some(v), k)?
                    .ok_or_else(|| "start must be an ISO date".to_string())?;
            }
            "end" => event.end = parse_opt_date(Some(v), k)?,
            "color" => event.color = parse_opt_string(Some(v)).map_err(|m| format!("color {}", m))?,
            "allDay" => event.all_day = parse_bool(Some(v), false).map_err(|m| format!("allDay {}", m))?,
            "description" => {
                event.description =
                    parse_opt_string(Some(v)).map_err(|m| format!("description {}", m))?
            }
            _ => return Err(format!("unknown event field: {}", k)),
        }
    }
    Ok(())
}

fn handle_events_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match db::events_list(conn) {
        Ok(events) => ok(&req.id, json!({ "events": events })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_events_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(params) = req.params.as_object() else {
        return err(&req.id, "bad_params", "params must be an object", None);
    };
    for key in ["title", "start"] {
        if !params.contains_key(key) {
            return err(&req.id, "bad_params", format!("missing {}", key), None);
        }
    }
    let mut event = CalendarEvent::default();
    if let Err(msg) = apply_event_patch(&mut event, params) {
        return err(&req.id, "bad_params", msg, None);
    }

    match db::event_insert(conn, &event) {
        Ok(id) => {
            event.id = id.clone();
            ok(
                &req.id,
                json!({
                    "eventId": id,
                    "event": event,
                    "notification": Notification::success("Event created successfully!"),
                }),
            )
        }
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_events_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let event_id = match required_str(req, "eventId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match patch_param(req) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let mut event = match db::event_get(conn, &event_id) {
        Ok(Some(e)) => e,
        Ok(None) => return err(&req.id, "not_found", "event not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = apply_event_patch(&mut event, patch) {
        return err(&req.id, "bad_params", msg, None);
    }

    match db::event_update(conn, &event) {
        Ok(true) => ok(
            &req.id,
            json!({
                "event": event,
                "notification": Notification::success("Event updated successfully!"),
            }),
        ),
        Ok(false) => err(&req.id, "not_found", "event not found", None),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_events_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let event_id = match required_str(req, "eventId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::event_delete(conn, &event_id) {
        Ok(true) => ok(&req.id, json!({ "deleted": true })),
        Ok(false) => err(&req.id, "not_found", "event not found", None),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "events.list" => Some(handle_events_list(state, req)),
        "events.create" => Some(handle_events_create(state, req)),
        "events.update" => Some(handle_events_update(state, req)),
        "events.delete" => Some(handle_events_delete(state, req)),
        _ => None,
    }
}
