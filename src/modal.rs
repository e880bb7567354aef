//! Add/edit modal state machine.
//!
//! The controller owns a working draft that is always a copy of the task
//! being edited, never a reference into the store. Submitting hands the
//! draft to the store on its own task and closes the modal right away.

use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::store::TaskStore;
use crate::task::{parse_due_date, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    Closed,
    Add,
    Edit,
}

/// Modal state. Only `Edit` carries an active task.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalState {
    Closed,
    Add,
    Edit { active: Task },
}

impl ModalState {
    pub fn mode(&self) -> ModalMode {
        match self {
            ModalState::Closed => ModalMode::Closed,
            ModalState::Add => ModalMode::Add,
            ModalState::Edit { .. } => ModalMode::Edit,
        }
    }

    pub fn active_task(&self) -> Option<&Task> {
        match self {
            ModalState::Edit { active } => Some(active),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Description,
    Priority,
    DueDate,
    Completed,
}

/// Result of a submit: which store call was issued, and its handle.
#[derive(Debug)]
pub enum Submission {
    Created(JoinHandle<Result<Task>>),
    Updated(JoinHandle<Result<Task>>),
    /// Submitted while closed; nothing was sent.
    Nothing,
}

impl Submission {
    /// Wait for the store call, if one was issued.
    pub async fn outcome(self) -> Option<Result<Task>> {
        let handle = match self {
            Submission::Created(handle) | Submission::Updated(handle) => handle,
            Submission::Nothing => return None,
        };
        Some(match handle.await {
            Ok(result) => result,
            Err(err) => Err(Error::OperationFailed(format!("submit task failed: {err}"))),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ModalController {
    state: ModalState,
    draft: Task,
    profile_open: bool,
}

impl Default for ModalController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModalController {
    pub fn new() -> Self {
        Self {
            state: ModalState::Closed,
            draft: Task::draft(),
            profile_open: false,
        }
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn mode(&self) -> ModalMode {
        self.state.mode()
    }

    pub fn is_open(&self) -> bool {
        self.mode() != ModalMode::Closed
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.state.active_task()
    }

    pub fn draft(&self) -> &Task {
        &self.draft
    }

    pub fn open_for_add(&mut self) {
        self.state = ModalState::Add;
        self.draft = Task::draft();
    }

    /// Enter edit mode. The draft is filled from the active task before this
    /// returns, so no submit can observe the previous draft.
    pub fn open_for_edit(&mut self, task: Task) {
        self.state = ModalState::Edit { active: task };
        self.sync_draft();
    }

    fn sync_draft(&mut self) {
        if let ModalState::Edit { active } = &self.state {
            self.draft = active.clone();
        }
    }

    pub fn close_modal(&mut self) {
        self.state = ModalState::Closed;
        self.draft = Task::draft();
        self.profile_open = false;
    }

    /// Outside clicks close the modal only while it is open.
    pub fn on_outside_click(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.close_modal();
        true
    }

    pub fn open_profile(&mut self) {
        self.profile_open = true;
    }

    pub fn profile_open(&self) -> bool {
        self.profile_open
    }

    /// Set one draft field from form input. Bad values leave the draft as is.
    pub fn set_field(&mut self, field: DraftField, raw: &str) -> Result<()> {
        match field {
            DraftField::Title => self.draft.title = raw.to_string(),
            DraftField::Description => self.draft.description = raw.to_string(),
            DraftField::Priority => self.draft.priority = raw.parse()?,
            DraftField::DueDate => {
                self.draft.due_date = if raw.trim().is_empty() {
                    None
                } else {
                    Some(parse_due_date(raw)?)
                };
            }
            DraftField::Completed => {
                self.draft.completed = match raw.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" => true,
                    "false" | "no" => false,
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "invalid completed value '{other}' (expected true|false)"
                        )))
                    }
                };
            }
        }
        Ok(())
    }

    /// Replace the whole draft.
    pub fn set_draft(&mut self, draft: Task) {
        self.draft = draft;
    }

    /// Hand the draft to the store and close. The store call keeps running
    /// after the modal closes; the returned [`Submission`] tracks it.
    pub fn submit(&mut self, store: &TaskStore) -> Submission {
        let draft = self.draft.clone();
        let submission = match self.mode() {
            ModalMode::Edit => {
                let store = store.clone();
                Submission::Updated(tokio::spawn(async move { store.update(draft).await }))
            }
            ModalMode::Add => {
                let store = store.clone();
                Submission::Created(tokio::spawn(async move { store.create(draft).await }))
            }
            ModalMode::Closed => Submission::Nothing,
        };
        self.close_modal();
        submission
    }
}
