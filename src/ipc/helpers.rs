use crate::calendar::parse_day;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::reconciler::BoardReconciler;
use rusqlite::Connection;
use serde_json::{Map, Value as JsonValue};

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, JsonValue> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Disjoint borrows of the connection and the board so handlers can read
/// the store while mutating board state.
pub fn workspace_board<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<(&'a Connection, &'a mut BoardReconciler), JsonValue> {
    let AppState { db, board, .. } = state;
    let conn = db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))?;
    Ok((conn, board))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, JsonValue> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn parse_opt_string(v: Option<&JsonValue>) -> Result<Option<String>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let s = v.as_str().ok_or("must be string or null")?.trim().to_string();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(s))
            }
        }
    }
}

pub fn parse_bool(v: Option<&JsonValue>, default: bool) -> Result<bool, &'static str> {
    match v {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v.as_bool().ok_or("must be boolean"),
    }
}

/// Optional ISO date / date-time. Blank or null clears the value.
pub fn parse_opt_date(v: Option<&JsonValue>, key: &str) -> Result<Option<String>, String> {
    let raw = parse_opt_string(v).map_err(|m| format!("{} {}", key, m))?;
    match raw {
        None => Ok(None),
        Some(s) if parse_day(&s).is_some() => Ok(Some(s)),
        Some(_) => Err(format!("{} must be an ISO date", key)),
    }
}

/// Search text exactly as typed. Only blankness is judged after trimming,
/// in `filter_records`.
pub fn query_param(req: &Request) -> Result<String, JsonValue> {
    match req.params.get("query") {
        None => Ok(String::new()),
        Some(v) if v.is_null() => Ok(String::new()),
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| err(&req.id, "bad_params", "query must be string or null", None)),
    }
}

pub fn patch_param<'a>(req: &'a Request) -> Result<&'a Map<String, JsonValue>, JsonValue> {
    req.params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| err(&req.id, "bad_params", "patch must be an object", None))
}
