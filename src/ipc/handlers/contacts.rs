use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, parse_opt_string, required_str};
use crate::ipc::types::{AppState, Request};
use crate::record::ContactRef;
use serde_json::json;

fn handle_contacts_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match db::contacts_list(conn) {
        Ok(contacts) => ok(&req.id, json!({ "contacts": contacts })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_contacts_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut contact = ContactRef {
        name,
        ..Default::default()
    };
    for key in ["email", "phone", "status"] {
        let v = match parse_opt_string(req.params.get(key)) {
            Ok(v) => v,
            Err(m) => return err(&req.id, "bad_params", format!("{} {}", key, m), None),
        };
        match key {
            "email" => contact.email = v,
            "phone" => contact.phone = v,
            _ => contact.status = v,
        }
    }

    match db::contact_insert(conn, &contact) {
        Ok(id) => {
            contact.id = id.clone();
            ok(&req.id, json!({ "contactId": id, "contact": contact }))
        }
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_contacts_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let contact_id = match required_str(req, "contactId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::contact_delete(conn, &contact_id) {
        Ok(true) => ok(&req.id, json!({ "deleted": true })),
        Ok(false) => err(&req.id, "not_found", "contact not found", None),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "contacts.list" => Some(handle_contacts_list(state, req)),
        "contacts.create" => Some(handle_contacts_create(state, req)),
        "contacts.delete" => Some(handle_contacts_delete(state, req)),
        _ => None,
    }
}
