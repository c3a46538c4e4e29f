//! Board state reconciliation for drag-initiated stage changes.
//!
//! The reconciler owns the local project list. A drop applies the stage
//! change locally first, then the caller writes the full payload to the
//! store and hands the result back through [`BoardReconciler::resolve`]:
//! success re-fetches the authoritative list, failure restores the
//! snapshot taken at drop time.

use crate::board::bucket_key;
use crate::record::{ContactRef, Project};
use serde::Serialize;
use tracing::{info, warn};

/// Remote system of record for projects. Fetches are full replaces and
/// writes carry the whole record.
pub trait ProjectStore {
    fn fetch_projects(&self) -> Result<Vec<Project>, StoreError>;
    fn update_project(&self, project: &Project) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("a stage change is already in flight")]
    DragInProgress,
    #[error("no drag in progress")]
    NoActiveDrag,
    #[error("unknown project: {0}")]
    UnknownRecord(String),
    #[error("project has no stable identifier")]
    MissingIdentifier,
    #[error("unknown stage: {0}")]
    UnknownStage(String),
}

impl BoardError {
    pub fn code(&self) -> &'static str {
        match self {
            BoardError::DragInProgress => "drag_in_progress",
            BoardError::NoActiveDrag => "no_active_drag",
            BoardError::UnknownRecord(_) => "not_found",
            BoardError::MissingIdentifier => "missing_id",
            BoardError::UnknownStage(_) => "bad_params",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Success,
    Error,
}

/// Fire-and-forget message for the UI's snackbar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

pub const STAGE_UPDATE_FAILED: &str = "Failed to update project stage";
pub const CONTACT_UPDATE_FAILED: &str = "Failed to update contact";

#[derive(Debug, Clone, PartialEq)]
struct PendingCommit {
    project_id: String,
    from_stage: String,
    to_stage: String,
    /// Local list as it was before the optimistic change.
    snapshot: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq)]
enum DragState {
    Idle,
    Dragging { project_id: String },
    Committing(PendingCommit),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Dropped outside the board or back onto the source column.
    NoOp,
    /// Local state already shows the move; this payload must be written.
    Commit(Project),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Committed { revalidated: bool },
    RolledBack(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DropStatus {
    Noop,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropReport {
    pub outcome: DropStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

#[derive(Debug, Clone)]
pub struct BoardReconciler {
    records: Vec<Project>,
    state: DragState,
}

impl Default for BoardReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardReconciler {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            state: DragState::Idle,
        }
    }

    pub fn records(&self) -> &[Project] {
        &self.records
    }

    pub fn state_name(&self) -> &'static str {
        match self.state {
            DragState::Idle => "idle",
            DragState::Dragging { .. } => "dragging",
            DragState::Committing(_) => "committing",
        }
    }

    /// Full replace with freshly fetched data.
    pub fn load(&mut self, records: Vec<Project>) {
        self.records = records;
    }

    pub fn refresh<S: ProjectStore + ?Sized>(&mut self, store: &S) -> Result<(), StoreError> {
        let fresh = store.fetch_projects()?;
        self.load(fresh);
        Ok(())
    }

    fn find(&self, project_id: &str) -> Option<&Project> {
        self.records
            .iter()
            .find(|p| p.has_stable_id() && p.id == project_id)
    }

    pub fn start_drag(&mut self, project_id: &str) -> Result<(), BoardError> {
        if !matches!(self.state, DragState::Idle) {
            return Err(BoardError::DragInProgress);
        }
        if project_id.trim().is_empty() {
            return Err(BoardError::MissingIdentifier);
        }
        if self.find(project_id).is_none() {
            return Err(BoardError::UnknownRecord(project_id.to_string()));
        }
        self.state = DragState::Dragging {
            project_id: project_id.to_string(),
        };
        Ok(())
    }

    pub fn cancel_drag(&mut self) -> Result<(), BoardError> {
        match self.state {
            DragState::Committing(_) => Err(BoardError::DragInProgress),
            _ => {
                self.state = DragState::Idle;
                Ok(())
            }
        }
    }

    /// Ends the gesture. `destination` is `None` when the card was released
    /// outside every column. The source column is read from the current
    /// records, so a refresh during the drag is taken into account.
    pub fn drop_on(
        &mut self,
        destination: Option<&str>,
        known_stages: &[String],
    ) -> Result<DropOutcome, BoardError> {
        let project_id = match &self.state {
            DragState::Idle => return Err(BoardError::NoActiveDrag),
            DragState::Committing(_) => return Err(BoardError::DragInProgress),
            DragState::Dragging { project_id } => project_id.clone(),
        };
        self.state = DragState::Idle;

        let Some(destination) = destination else {
            return Ok(DropOutcome::NoOp);
        };
        if !known_stages.iter().any(|s| s == destination) {
            return Err(BoardError::UnknownStage(destination.to_string()));
        }
        let current = self
            .find(&project_id)
            .ok_or_else(|| BoardError::UnknownRecord(project_id.clone()))?;
        let source_stage = bucket_key(&current.stage, known_stages)
            .unwrap_or_default()
            .to_string();
        if destination == source_stage {
            return Ok(DropOutcome::NoOp);
        }
        let payload = current.with_stage(destination);

        let snapshot = self.records.clone();
        self.records = self
            .records
            .iter()
            .map(|p| {
                if p.has_stable_id() && p.id == project_id {
                    p.with_stage(destination)
                } else {
                    p.clone()
                }
            })
            .collect();
        self.state = DragState::Committing(PendingCommit {
            project_id,
            from_stage: source_stage,
            to_stage: destination.to_string(),
            snapshot,
        });
        Ok(DropOutcome::Commit(payload))
    }

    /// Settles the in-flight write. Always returns to idle.
    pub fn resolve<S: ProjectStore + ?Sized>(
        &mut self,
        write: Result<(), StoreError>,
        store: &S,
    ) -> Result<Resolution, BoardError> {
        let pending = match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Committing(p) => p,
            other => {
                self.state = other;
                return Err(BoardError::NoActiveDrag);
            }
        };

        match write {
            Ok(()) => {
                info!(
                    project_id = %pending.project_id,
                    from = %pending.from_stage,
                    to = %pending.to_stage,
                    "stage change committed"
                );
                let revalidated = match self.refresh(store) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "revalidation after stage change failed");
                        false
                    }
                };
                Ok(Resolution::Committed { revalidated })
            }
            Err(e) => {
                warn!(
                    project_id = %pending.project_id,
                    from = %pending.from_stage,
                    to = %pending.to_stage,
                    error = %e,
                    "stage change rejected, rolling back"
                );
                self.records = pending.snapshot;
                Ok(Resolution::RolledBack(Notification::error(STAGE_UPDATE_FAILED)))
            }
        }
    }

    /// Drop, write, resolve in one go. Used by the IPC layer where the
    /// store call is synchronous.
    pub fn drop_and_commit<S: ProjectStore + ?Sized>(
        &mut self,
        destination: Option<&str>,
        known_stages: &[String],
        store: &S,
    ) -> Result<DropReport, BoardError> {
        let payload = match self.drop_on(destination, known_stages)? {
            DropOutcome::NoOp => {
                return Ok(DropReport {
                    outcome: DropStatus::Noop,
                    notification: None,
                })
            }
            DropOutcome::Commit(payload) => payload,
        };
        let write = store.update_project(&payload);
        match self.resolve(write, store)? {
            Resolution::Committed { .. } => Ok(DropReport {
                outcome: DropStatus::Committed,
                notification: None,
            }),
            Resolution::RolledBack(n) => Ok(DropReport {
                outcome: DropStatus::RolledBack,
                notification: Some(n),
            }),
        }
    }

    /// Card-level contact reassignment. Not optimistic: the local list only
    /// changes through the revalidation that follows a successful write.
    pub fn assign_contact<S: ProjectStore + ?Sized>(
        &mut self,
        project_id: &str,
        contact: ContactRef,
        store: &S,
    ) -> Result<Option<Notification>, BoardError> {
        if matches!(self.state, DragState::Committing(_)) {
            return Err(BoardError::DragInProgress);
        }
        let mut payload = self
            .find(project_id)
            .cloned()
            .ok_or_else(|| BoardError::UnknownRecord(project_id.to_string()))?;
        payload.contact = Some(contact);

        if let Err(e) = store.update_project(&payload) {
            warn!(project_id = %project_id, error = %e, "contact assignment rejected");
            return Ok(Some(Notification::error(CONTACT_UPDATE_FAILED)));
        }
        if let Err(e) = self.refresh(store) {
            warn!(error = %e, "revalidation after contact assignment failed");
            if let Some(p) = self
                .records
                .iter_mut()
                .find(|p| p.has_stable_id() && p.id == project_id)
            {
                *p = payload;
            }
        }
        Ok(None)
    }
}
