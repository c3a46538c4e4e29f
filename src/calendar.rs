use crate::record::{CalendarEvent, Project};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const PROJECT_ENTRY_PREFIX: &str = "project-";

/// Where a calendar entry came from. Click routing reads this, never the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntrySource {
    #[serde(rename_all = "camelCase")]
    Event { event_id: String },
    #[serde(rename_all = "camelCase")]
    Project { project_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    pub source: EntrySource,
}

impl CalendarEntry {
    fn from_event(event: &CalendarEvent) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            start: event.start.clone(),
            end: event.end.clone(),
            color: event.color.clone(),
            all_day: event.all_day,
            source: EntrySource::Event {
                event_id: event.id.clone(),
            },
        }
    }

    fn from_project(project: &Project, color: Option<&String>) -> Self {
        let start = project.start_date.clone().unwrap_or_default();
        Self {
            id: format!("{}{}", PROJECT_ENTRY_PREFIX, project.id),
            title: project.name.clone(),
            end: project.end_date.clone().or_else(|| project.start_date.clone()),
            start,
            color: color.cloned(),
            all_day: true,
            source: EntrySource::Project {
                project_id: project.id.clone(),
            },
        }
    }
}

/// Raw events first, then one all-day entry per project. Project colors
/// cycle through `palette` by the project's index in `projects`.
/// No de-duplication across the two sources.
pub fn merge_sources(
    raw_events: &[CalendarEvent],
    projects: &[Project],
    palette: &[String],
) -> Vec<CalendarEntry> {
    let mut out: Vec<CalendarEntry> = raw_events.iter().map(CalendarEntry::from_event).collect();
    out.extend(projects.iter().enumerate().map(|(idx, project)| {
        let color = if palette.is_empty() {
            None
        } else {
            palette.get(idx % palette.len())
        };
        CalendarEntry::from_project(project, color)
    }));
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarFilter {
    pub colors: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CalendarFilter {
    /// Start after end: the range is reported as an error and not applied.
    pub fn date_error(&self) -> bool {
        matches!((self.start_date, self.end_date), (Some(s), Some(e)) if s > e)
    }

    pub fn can_reset(&self) -> bool {
        !self.colors.is_empty() || (self.start_date.is_some() && self.end_date.is_some())
    }

    fn active_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(s), Some(e)) if s <= e => Some((s, e)),
            _ => None,
        }
    }
}

/// Calendar day of an ISO date or date-time string.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

pub fn apply_filter(entries: &[CalendarEntry], filter: &CalendarFilter) -> Vec<CalendarEntry> {
    let range = filter.active_range();
    entries
        .iter()
        .filter(|e| {
            filter.colors.is_empty()
                || e.color
                    .as_ref()
                    .map(|c| filter.colors.contains(c))
                    .unwrap_or(false)
        })
        .filter(|e| match range {
            None => true,
            Some((from, to)) => parse_day(&e.start)
                .map(|d| d >= from && d <= to)
                .unwrap_or(false),
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NavigationIntent {
    #[serde(rename_all = "camelCase")]
    OpenProject { project_id: String },
    #[serde(rename_all = "camelCase")]
    EditEvent { event_id: String },
}

pub fn resolve_click_target(entry: &CalendarEntry) -> NavigationIntent {
    match &entry.source {
        EntrySource::Project { project_id } => NavigationIntent::OpenProject {
            project_id: project_id.clone(),
        },
        EntrySource::Event { event_id } => NavigationIntent::EditEvent {
            event_id: event_id.clone(),
        },
    }
}
