use crate::calendar::{apply_filter, merge_sources, parse_day, resolve_click_target, CalendarEntry, CalendarFilter};
use crate::config;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, parse_opt_string};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value as JsonValue};

fn parse_filter_day(v: Option<&JsonValue>, key: &str) -> Result<Option<chrono::NaiveDate>, String> {
    match parse_opt_string(v).map_err(|m| format!("filters.{} {}", key, m))? {
        None => Ok(None),
        Some(s) => parse_day(&s)
            .map(Some)
            .ok_or_else(|| format!("filters.{} must be an ISO date", key)),
    }
}

fn parse_filters(v: Option<&JsonValue>) -> Result<CalendarFilter, String> {
    let Some(raw) = v.filter(|v| !v.is_null()) else {
        return Ok(CalendarFilter::default());
    };
    let obj = raw
        .as_object()
        .ok_or_else(|| "filters must be an object".to_string())?;

    let mut colors: Vec<String> = Vec::new();
    if let Some(list) = obj.get("colors").filter(|v| !v.is_null()) {
        let arr = list
            .as_array()
            .ok_or_else(|| "filters.colors must be an array of strings".to_string())?;
        for item in arr {
            let c = item
                .as_str()
                .ok_or_else(|| "filters.colors must be an array of strings".to_string())?;
            if !colors.iter().any(|x| x == c) {
                colors.push(c.to_string());
            }
        }
    }

    Ok(CalendarFilter {
        colors,
        start_date: parse_filter_day(obj.get("startDate"), "startDate")?,
        end_date: parse_filter_day(obj.get("endDate"), "endDate")?,
    })
}

fn handle_calendar_entries(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let filter = match parse_filters(req.params.get("filters")) {
        Ok(f) => f,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let events = match db::events_list(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let projects = match db::projects_list(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let palette = config::load_calendar(conn).palette;

    let merged = merge_sources(&events, &projects, &palette);
    let filtered = apply_filter(&merged, &filter);
    ok(
        &req.id,
        json!({
            "total": merged.len(),
            "results": filtered.len(),
            "entries": filtered,
            "canReset": filter.can_reset(),
            "dateError": filter.date_error(),
        }),
    )
}

fn handle_calendar_click(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("entry") else {
        return err(&req.id, "bad_params", "missing entry", None);
    };
    let entry: CalendarEntry = match serde_json::from_value(raw.clone()) {
        Ok(e) => e,
        Err(e) => return err(&req.id, "bad_params", format!("invalid entry: {}", e), None),
    };
    ok(&req.id, json!({ "intent": resolve_click_target(&entry) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calendar.entries" => Some(handle_calendar_entries(state, req)),
        "calendar.click" => Some(handle_calendar_click(state, req)),
        _ => None,
    }
}
