mod test_support;

use serde_json::json;
use test_support::{create_project, error_code, request, request_ok, spawn_sidecar, temp_dir};

fn count_for(result: &serde_json::Value, stage: &str) -> Option<u64> {
    result
        .get("stageCounts")
        .and_then(|v| v.as_array())
        .and_then(|counts| {
            counts
                .iter()
                .find(|c| c.get("stage").and_then(|v| v.as_str()) == Some(stage))
        })
        .and_then(|c| c.get("count"))
        .and_then(|v| v.as_u64())
}

fn names(result: &serde_json::Value) -> Vec<String> {
    result
        .get("projects")
        .and_then(|v| v.as_array())
        .map(|rows| {
            rows.iter()
                .filter_map(|p| p.get("name").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn list_supports_stage_tabs_and_search() {
    let workspace = temp_dir("crmd-projects-list");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let contact = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "contacts.create",
        json!({ "name": "Grace Hopper" }),
    );
    let contact_id = contact
        .get("contactId")
        .and_then(|v| v.as_str())
        .expect("contactId")
        .to_string();
    let _ = create_project(
        &mut stdin,
        &mut reader,
        "3",
        json!({ "name": "Smith Wedding", "type": "Wedding", "stage": "Inquiry" }),
    );
    let _ = create_project(
        &mut stdin,
        &mut reader,
        "4",
        json!({ "name": "Offsite", "type": "Corporate", "stage": "Consult", "contactId": contact_id }),
    );
    let _ = create_project(
        &mut stdin,
        &mut reader,
        "5",
        json!({ "name": "Jones Wedding", "type": "Wedding", "stage": "Consult" }),
    );

    let all = request_ok(&mut stdin, &mut reader, "6", "projects.list", json!({}));
    assert_eq!(names(&all).len(), 3);
    assert_eq!(count_for(&all, "all"), Some(3));
    assert_eq!(count_for(&all, "Consult"), Some(2));
    assert_eq!(count_for(&all, "Archived"), Some(0));

    let consult = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "projects.list",
        json!({ "stage": "Consult" }),
    );
    assert_eq!(
        names(&consult),
        vec!["Offsite".to_string(), "Jones Wedding".to_string()]
    );

    let weddings = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "projects.list",
        json!({ "query": "WEDDING" }),
    );
    assert_eq!(names(&weddings).len(), 2);
    assert_eq!(count_for(&weddings, "all"), Some(2));

    let by_contact = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "projects.list",
        json!({ "query": "hopper" }),
    );
    assert_eq!(names(&by_contact), vec!["Offsite".to_string()]);

    let board = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "kanban.open",
        json!({ "query": "  " }),
    );
    assert_eq!(board.get("total").and_then(|v| v.as_u64()), Some(3));

    let bad_stage = request(
        &mut stdin,
        &mut reader,
        "11",
        "projects.list",
        json!({ "stage": "Nope" }),
    );
    assert_eq!(error_code(&bad_stage), Some("bad_params"));
}

#[test]
fn update_patch_validates_fields() {
    let workspace = temp_dir("crmd-projects-update");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let p1 = create_project(
        &mut stdin,
        &mut reader,
        "2",
        json!({ "name": "Gala", "type": "Wedding" }),
    );
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "projects.open",
        json!({ "projectId": p1 }),
    );
    assert_eq!(opened.pointer("/project/stage").and_then(|v| v.as_str()), Some("Inquiry"));

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "projects.update",
        json!({
            "projectId": p1,
            "patch": { "leadSource": "Referral", "startDate": "2025-06-01", "stage": "Planning" }
        }),
    );
    assert_eq!(
        updated.pointer("/project/leadSource").and_then(|v| v.as_str()),
        Some("Referral")
    );
    assert_eq!(updated.pointer("/project/stage").and_then(|v| v.as_str()), Some("Planning"));

    let cases = [
        json!({ "stage": "Elsewhere" }),
        json!({ "startDate": "whenever" }),
        json!({ "name": "" }),
        json!({ "budget": 10 }),
    ];
    for (i, patch) in cases.into_iter().enumerate() {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("bad{}", i),
            "projects.update",
            json!({ "projectId": p1, "patch": patch }),
        );
        assert_eq!(error_code(&resp), Some("bad_params"), "patch {}", i);
    }

    let missing_contact = request(
        &mut stdin,
        &mut reader,
        "5",
        "projects.update",
        json!({ "projectId": p1, "patch": { "contactId": "ghost" } }),
    );
    assert_eq!(error_code(&missing_contact), Some("not_found"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "projects.delete",
        json!({ "projectId": p1 }),
    );
    let gone = request(
        &mut stdin,
        &mut reader,
        "7",
        "projects.open",
        json!({ "projectId": p1 }),
    );
    assert_eq!(error_code(&gone), Some("not_found"));
}

#[test]
fn deleting_a_contact_unlinks_its_projects() {
    let workspace = temp_dir("crmd-contacts-delete");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let contact = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "contacts.create",
        json!({ "name": "Ada" }),
    );
    let contact_id = contact
        .get("contactId")
        .and_then(|v| v.as_str())
        .expect("contactId")
        .to_string();
    let p1 = create_project(
        &mut stdin,
        &mut reader,
        "3",
        json!({ "name": "Gala", "type": "Wedding", "contactId": contact_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "contacts.delete",
        json!({ "contactId": contact_id }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "5", "contacts.list", json!({}));
    assert_eq!(
        listed.get("contacts").and_then(|v| v.as_array()).map(|c| c.len()),
        Some(0)
    );
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "projects.open",
        json!({ "projectId": p1 }),
    );
    assert!(opened
        .pointer("/project/contact")
        .map(|v| v.is_null())
        .unwrap_or(true));
}

#[test]
fn search_text_is_not_trimmed() {
    let workspace = temp_dir("crmd-projects-padded-query");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let _ = create_project(
        &mut stdin,
        &mut reader,
        "2",
        json!({ "name": "Gala", "type": "Wedding" }),
    );
    let spring = create_project(
        &mut stdin,
        &mut reader,
        "3",
        json!({ "name": "Spring Gala", "type": "Wedding" }),
    );

    let padded = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "projects.list",
        json!({ "query": " Gala" }),
    );
    assert_eq!(names(&padded), vec!["Spring Gala".to_string()]);

    let board = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "kanban.open",
        json!({ "query": " Gala" }),
    );
    assert_eq!(board.get("total").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(board.get("query").and_then(|v| v.as_str()), Some(" Gala"));
    assert_eq!(
        board.pointer("/columns/0/cards/0/project/id").and_then(|v| v.as_str()),
        Some(spring.as_str())
    );
}
