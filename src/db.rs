use crate::reconciler::{ProjectStore, StoreError};
use crate::record::{CalendarEvent, ContactRef, Project};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("crm.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS contacts(
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            status TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS projects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            project_type TEXT NOT NULL,
            stage TEXT NOT NULL,
            lead_source TEXT,
            timezone TEXT,
            start_date TEXT,
            end_date TEXT,
            contact_id TEXT,
            FOREIGN KEY(contact_id) REFERENCES contacts(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_projects_contact ON projects(contact_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            start TEXT NOT NULL,
            end TEXT,
            color TEXT,
            all_day INTEGER NOT NULL DEFAULT 0,
            description TEXT
        )",
        [],
    )?;

    Ok(conn)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        params![key, serde_json::to_string(value)?],
    )?;
    Ok(())
}

fn contact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContactRef> {
    Ok(ContactRef {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        status: row.get(4)?,
    })
}

pub fn contacts_list(conn: &Connection) -> anyhow::Result<Vec<ContactRef>> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, email, phone, status FROM contacts ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], contact_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn contact_get(conn: &Connection, contact_id: &str) -> anyhow::Result<Option<ContactRef>> {
    let c = conn
        .query_row(
            "SELECT id, full_name, email, phone, status FROM contacts WHERE id = ?",
            [contact_id],
            contact_from_row,
        )
        .optional()?;
    Ok(c)
}

pub fn contact_insert(conn: &Connection, contact: &ContactRef) -> anyhow::Result<String> {
    let id = if contact.id.trim().is_empty() {
        new_id()
    } else {
        contact.id.clone()
    };
    conn.execute(
        "INSERT INTO contacts(id, full_name, email, phone, status) VALUES(?, ?, ?, ?, ?)",
        params![id, contact.name, contact.email, contact.phone, contact.status],
    )?;
    Ok(id)
}

/// Deletes a contact and unlinks every project that referenced it.
pub fn contact_delete(conn: &Connection, contact_id: &str) -> anyhow::Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE projects SET contact_id = NULL WHERE contact_id = ?",
        [contact_id],
    )?;
    let n = tx.execute("DELETE FROM contacts WHERE id = ?", [contact_id])?;
    tx.commit()?;
    Ok(n > 0)
}

const PROJECT_SELECT: &str = "SELECT p.id, p.name, p.project_type, p.stage, p.lead_source,
        p.timezone, p.start_date, p.end_date,
        c.id, c.full_name, c.email, c.phone, c.status
    FROM projects p
    LEFT JOIN contacts c ON c.id = p.contact_id";

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let contact_id: Option<String> = row.get(8)?;
    let contact = match contact_id {
        Some(id) => Some(ContactRef {
            id,
            name: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            email: row.get(10)?,
            phone: row.get(11)?,
            status: row.get(12)?,
        }),
        None => None,
    };
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        project_type: row.get(2)?,
        stage: row.get(3)?,
        lead_source: row.get(4)?,
        timezone: row.get(5)?,
        start_date: row.get(6)?,
        end_date: row.get(7)?,
        contact,
    })
}

fn query_projects(conn: &Connection) -> rusqlite::Result<Vec<Project>> {
    let sql = format!("{} ORDER BY p.rowid", PROJECT_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], project_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn projects_list(conn: &Connection) -> anyhow::Result<Vec<Project>> {
    Ok(query_projects(conn)?)
}

pub fn project_get(conn: &Connection, project_id: &str) -> anyhow::Result<Option<Project>> {
    let sql = format!("{} WHERE p.id = ?", PROJECT_SELECT);
    let p = conn
        .query_row(&sql, [project_id], project_from_row)
        .optional()?;
    Ok(p)
}

fn contact_id_of(project: &Project) -> Option<&str> {
    project
        .contact
        .as_ref()
        .map(|c| c.id.as_str())
        .filter(|id| !id.trim().is_empty())
}

pub fn project_insert(conn: &Connection, project: &Project) -> anyhow::Result<String> {
    let id = if project.has_stable_id() {
        project.id.clone()
    } else {
        new_id()
    };
    conn.execute(
        "INSERT INTO projects(id, name, project_type, stage, lead_source, timezone,
            start_date, end_date, contact_id)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            project.name,
            project.project_type,
            project.stage,
            project.lead_source,
            project.timezone,
            project.start_date,
            project.end_date,
            contact_id_of(project),
        ],
    )?;
    Ok(id)
}

/// Overwrites every column from the given payload. Returns false when no
/// row carries that id. A contact reference that no longer resolves is
/// stored as NULL, matching what `contact_delete` leaves behind.
pub fn project_update(conn: &Connection, project: &Project) -> rusqlite::Result<bool> {
    let n = conn.execute(
        "UPDATE projects SET name = ?, project_type = ?, stage = ?, lead_source = ?,
            timezone = ?, start_date = ?, end_date = ?,
            contact_id = (SELECT id FROM contacts WHERE id = ?)
         WHERE id = ?",
        params![
            project.name,
            project.project_type,
            project.stage,
            project.lead_source,
            project.timezone,
            project.start_date,
            project.end_date,
            contact_id_of(project),
            project.id,
        ],
    )?;
    Ok(n > 0)
}

pub fn project_delete(conn: &Connection, project_id: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM projects WHERE id = ?", [project_id])?;
    Ok(n > 0)
}

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CalendarEvent> {
    Ok(CalendarEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        start: row.get(2)?,
        end: row.get(3)?,
        color: row.get(4)?,
        all_day: row.get::<_, i64>(5)? != 0,
        description: row.get(6)?,
    })
}

const EVENT_SELECT: &str =
    "SELECT id, title, start, end, color, all_day, description FROM events";

pub fn events_list(conn: &Connection) -> anyhow::Result<Vec<CalendarEvent>> {
    let sql = format!("{} ORDER BY rowid", EVENT_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn event_get(conn: &Connection, event_id: &str) -> anyhow::Result<Option<CalendarEvent>> {
    let sql = format!("{} WHERE id = ?", EVENT_SELECT);
    let e = conn
        .query_row(&sql, [event_id], event_from_row)
        .optional()?;
    Ok(e)
}

pub fn event_insert(conn: &Connection, event: &CalendarEvent) -> anyhow::Result<String> {
    let id = if event.id.trim().is_empty() {
        new_id()
    } else {
        event.id.clone()
    };
    conn.execute(
        "INSERT INTO events(id, title, start, end, color, all_day, description)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            event.title,
            event.start,
            event.end,
            event.color,
            event.all_day as i64,
            event.description,
        ],
    )?;
    Ok(id)
}

pub fn event_update(conn: &Connection, event: &CalendarEvent) -> anyhow::Result<bool> {
    let n = conn.execute(
        "UPDATE events SET title = ?, start = ?, end = ?, color = ?, all_day = ?,
            description = ?
         WHERE id = ?",
        params![
            event.title,
            event.start,
            event.end,
            event.color,
            event.all_day as i64,
            event.description,
            event.id,
        ],
    )?;
    Ok(n > 0)
}

pub fn event_delete(conn: &Connection, event_id: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM events WHERE id = ?", [event_id])?;
    Ok(n > 0)
}

/// The workspace database acting as the board's system of record.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

/// Busy and locked databases are transient; everything else is a hard failure.
fn store_err(e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            StoreError::Unavailable(e.to_string())
        }
        _ => StoreError::Db(e),
    }
}

impl ProjectStore for SqliteStore<'_> {
    fn fetch_projects(&self) -> Result<Vec<Project>, StoreError> {
        query_projects(self.conn).map_err(store_err)
    }

    fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        if project_update(self.conn, project).map_err(store_err)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(project.id.clone()))
        }
    }
}
