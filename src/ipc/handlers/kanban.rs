use crate::board::board_view;
use crate::config::{self, PipelineConfig};
use crate::db::{self, SqliteStore};
use crate::ipc::error::{board_err, err, ok};
use crate::ipc::helpers::{parse_opt_string, query_param, required_str, workspace_board};
use crate::ipc::types::{AppState, Request};
use crate::reconciler::BoardReconciler;
use serde_json::json;

fn board_json(board: &BoardReconciler, query: &str, pipeline: &PipelineConfig) -> serde_json::Value {
    let mut view = board_view(board.records(), query, pipeline);
    view["state"] = json!(board.state_name());
    view
}

/// Fetch from the store and render. `reset_drag` abandons a gesture left
/// open by a previous screen.
fn load_board(state: &mut AppState, req: &Request, reset_drag: bool) -> serde_json::Value {
    let query = match query_param(req) {
        Ok(q) => q,
        Err(e) => return e,
    };
    let (conn, board) = match workspace_board(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if reset_drag {
        if let Err(e) = board.cancel_drag() {
            return board_err(&req.id, &e);
        }
    }
    if let Err(e) = board.refresh(&SqliteStore::new(conn)) {
        return err(&req.id, "db_query_failed", e.to_string(), None);
    }
    let pipeline = config::load_pipeline(conn);
    ok(&req.id, board_json(board, &query, &pipeline))
}

fn handle_kanban_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    load_board(state, req, true)
}

fn handle_kanban_refresh(state: &mut AppState, req: &Request) -> serde_json::Value {
    load_board(state, req, false)
}

fn handle_kanban_board(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = match query_param(req) {
        Ok(q) => q,
        Err(e) => return e,
    };
    let (conn, board) = match workspace_board(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let pipeline = config::load_pipeline(conn);
    ok(&req.id, board_json(board, &query, &pipeline))
}

fn handle_kanban_drag_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    let project_id = match required_str(req, "projectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (_conn, board) = match workspace_board(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match board.start_drag(&project_id) {
        Ok(()) => ok(
            &req.id,
            json!({ "state": board.state_name(), "projectId": project_id }),
        ),
        Err(e) => board_err(&req.id, &e),
    }
}

fn handle_kanban_drag_cancel(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (_conn, board) = match workspace_board(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match board.cancel_drag() {
        Ok(()) => ok(&req.id, json!({ "state": board.state_name() })),
        Err(e) => board_err(&req.id, &e),
    }
}

fn handle_kanban_drop(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = match query_param(req) {
        Ok(q) => q,
        Err(e) => return e,
    };
    // Missing or null stage: released outside every column.
    let destination = match parse_opt_string(req.params.get("stage")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("stage {}", m), None),
    };
    let (conn, board) = match workspace_board(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let pipeline = config::load_pipeline(conn);
    let store = SqliteStore::new(conn);
    let report = match board.drop_and_commit(destination.as_deref(), &pipeline.stages, &store) {
        Ok(r) => r,
        Err(e) => return board_err(&req.id, &e),
    };

    let mut result = json!(report);
    result["board"] = board_json(board, &query, &pipeline);
    ok(&req.id, result)
}

fn handle_kanban_assign_contact(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = match query_param(req) {
        Ok(q) => q,
        Err(e) => return e,
    };
    let project_id = match required_str(req, "projectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let contact_id = match required_str(req, "contactId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (conn, board) = match workspace_board(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let contact = match db::contact_get(conn, &contact_id) {
        Ok(Some(c)) => c,
        Ok(None) => return err(&req.id, "not_found", "contact not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let notification = match board.assign_contact(&project_id, contact, &SqliteStore::new(conn)) {
        Ok(n) => n,
        Err(e) => return board_err(&req.id, &e),
    };
    let pipeline = config::load_pipeline(conn);
    ok(
        &req.id,
        json!({
            "updated": notification.is_none(),
            "notification": notification,
            "board": board_json(board, &query, &pipeline),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "kanban.open" => Some(handle_kanban_open(state, req)),
        "kanban.board" => Some(handle_kanban_board(state, req)),
        "kanban.refresh" => Some(handle_kanban_refresh(state, req)),
        "kanban.dragStart" => Some(handle_kanban_drag_start(state, req)),
        "kanban.dragCancel" => Some(handle_kanban_drag_cancel(state, req)),
        "kanban.drop" => Some(handle_kanban_drop(state, req)),
        "kanban.assignContact" => Some(handle_kanban_assign_contact(state, req)),
        _ => None,
    }
}
