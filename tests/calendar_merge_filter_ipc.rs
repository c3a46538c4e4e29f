mod test_support;

use serde_json::json;
use test_support::{create_project, error_code, request, request_ok, spawn_sidecar, temp_dir};

fn entry_ids(result: &serde_json::Value) -> Vec<String> {
    result
        .get("entries")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("id").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn projects_become_all_day_entries_after_raw_events() {
    let workspace = temp_dir("crmd-calendar-merge");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let event = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "events.create",
        json!({
            "title": "Tasting",
            "start": "2025-05-20T14:00:00",
            "end": "2025-05-20T15:00:00",
            "color": "#FF4842"
        }),
    );
    let event_id = event
        .get("eventId")
        .and_then(|v| v.as_str())
        .expect("eventId")
        .to_string();
    let p1 = create_project(
        &mut stdin,
        &mut reader,
        "3",
        json!({ "name": "Gala", "type": "Wedding", "startDate": "2025-06-01" }),
    );
    let p2 = create_project(
        &mut stdin,
        &mut reader,
        "4",
        json!({
            "name": "Retreat",
            "type": "Corporate",
            "startDate": "2025-09-10",
            "endDate": "2025-09-12"
        }),
    );

    let all = request_ok(&mut stdin, &mut reader, "5", "calendar.entries", json!({}));
    assert_eq!(all.get("total").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(all.get("results").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(all.get("canReset").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        entry_ids(&all),
        vec![event_id.clone(), format!("project-{}", p1), format!("project-{}", p2)]
    );

    let gala = all.pointer("/entries/1").expect("gala entry");
    assert_eq!(gala.get("title").and_then(|v| v.as_str()), Some("Gala"));
    assert_eq!(gala.get("start").and_then(|v| v.as_str()), Some("2025-06-01"));
    assert_eq!(gala.get("end").and_then(|v| v.as_str()), Some("2025-06-01"));
    assert_eq!(gala.get("allDay").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(gala.get("color").and_then(|v| v.as_str()), Some("#00AB55"));
    let retreat = all.pointer("/entries/2").expect("retreat entry");
    assert_eq!(retreat.get("color").and_then(|v| v.as_str()), Some("#1890FF"));
    assert_eq!(retreat.get("end").and_then(|v| v.as_str()), Some("2025-09-12"));

    let clicked = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "calendar.click",
        json!({ "entry": gala }),
    );
    assert_eq!(clicked.pointer("/intent/kind").and_then(|v| v.as_str()), Some("openProject"));
    assert_eq!(
        clicked.pointer("/intent/projectId").and_then(|v| v.as_str()),
        Some(p1.as_str())
    );

    let tasting = all.pointer("/entries/0").expect("event entry");
    let clicked = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "calendar.click",
        json!({ "entry": tasting }),
    );
    assert_eq!(clicked.pointer("/intent/kind").and_then(|v| v.as_str()), Some("editEvent"));
    assert_eq!(
        clicked.pointer("/intent/eventId").and_then(|v| v.as_str()),
        Some(event_id.as_str())
    );
}

#[test]
fn color_and_date_filters_compose() {
    let workspace = temp_dir("crmd-calendar-filter");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    for (i, (title, start, color)) in [
        ("May", "2025-05-31", "#FFC107"),
        ("June", "2025-06-15T09:00:00", "#FFC107"),
        ("June other", "2025-06-20", "#04297A"),
        ("July", "2025-07-01", "#FFC107"),
    ]
    .into_iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("e{}", i),
            "events.create",
            json!({ "title": title, "start": start, "color": color }),
        );
    }

    let titles = |v: &serde_json::Value| -> Vec<String> {
        v.get("entries")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.get("title").and_then(|v| v.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let june = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "calendar.entries",
        json!({ "filters": { "startDate": "2025-06-01", "endDate": "2025-06-30" } }),
    );
    assert_eq!(titles(&june), vec!["June".to_string(), "June other".to_string()]);
    assert_eq!(june.get("canReset").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(june.get("dateError").and_then(|v| v.as_bool()), Some(false));

    let june_amber = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "calendar.entries",
        json!({ "filters": {
            "colors": ["#FFC107"],
            "startDate": "2025-06-01",
            "endDate": "2025-06-30"
        } }),
    );
    assert_eq!(titles(&june_amber), vec!["June".to_string()]);

    // Inverted range: flagged, not applied.
    let inverted = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "calendar.entries",
        json!({ "filters": {
            "colors": ["#FFC107"],
            "startDate": "2025-12-31",
            "endDate": "2025-01-01"
        } }),
    );
    assert_eq!(inverted.get("dateError").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        titles(&inverted),
        vec!["May".to_string(), "June".to_string(), "July".to_string()]
    );

    let half_open = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "calendar.entries",
        json!({ "filters": { "startDate": "2025-07-01" } }),
    );
    assert_eq!(half_open.get("results").and_then(|v| v.as_u64()), Some(4));
    assert_eq!(half_open.get("canReset").and_then(|v| v.as_bool()), Some(false));

    let bad = request(
        &mut stdin,
        &mut reader,
        "6",
        "calendar.entries",
        json!({ "filters": { "startDate": "next tuesday" } }),
    );
    assert_eq!(error_code(&bad), Some("bad_params"));
}

#[test]
fn custom_palette_drives_project_colors() {
    let workspace = temp_dir("crmd-calendar-palette");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "setup.update",
        json!({ "section": "calendar", "patch": { "palette": ["#111111", "#222222"] } }),
    );
    for i in 0..3 {
        let _ = create_project(
            &mut stdin,
            &mut reader,
            &format!("p{}", i),
            json!({ "name": format!("P{}", i), "type": "Wedding", "startDate": "2025-01-01" }),
        );
    }
    let all = request_ok(&mut stdin, &mut reader, "3", "calendar.entries", json!({}));
    let colors: Vec<&str> = all
        .get("entries")
        .and_then(|v| v.as_array())
        .expect("entries")
        .iter()
        .filter_map(|e| e.get("color").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(colors, vec!["#111111", "#222222", "#111111"]);
}
