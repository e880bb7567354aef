//! Local task collection kept in sync with the server.
//!
//! Two producers write into the collection: responses to the store's own
//! REST calls and events arriving on the push channel. Both go through
//! [`TaskStore::apply`], which takes the state lock for the duration of one
//! update, so updates never interleave. Their relative order is whatever
//! order the network completes them in.
//!
//! A mutation made by this session normally comes back on the push channel
//! as well. With [`MergePolicy::Replay`] (the default) a created task is
//! therefore appended twice; [`MergePolicy::DedupeById`] upserts instead.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::api::TaskApi;
use crate::error::{Error, Result};
use crate::feedback::Feedback;
use crate::push::{PushEvent, PushEventKind, Subscription};
use crate::task::{partition, PriorityFilter, Task, TaskStatusAggregate};

const CREATED_MESSAGE: &str = "Task created successfully";
const UPDATED_MESSAGE: &str = "Task updated successfully";
const CREATE_FAILED_MESSAGE: &str = "Failed to create task";
const PUSH_CREATED_MESSAGE: &str = "New task added!";
const PUSH_UPDATED_MESSAGE: &str = "Task updated!";
const PUSH_DELETED_MESSAGE: &str = "Task deleted!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Apply every producer's update as it arrives; self-originated pushes
    /// double-apply.
    #[default]
    Replay,
    /// Treat a "created" task whose id is already present as a replacement.
    DedupeById,
}

/// One change to the store's state.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUpdate {
    Replace(Vec<Task>),
    Created(Task),
    Updated(Task),
    Deleted(String),
    Current(Task),
    Status(TaskStatusAggregate),
}

impl From<PushEvent> for StoreUpdate {
    fn from(event: PushEvent) -> Self {
        match event {
            PushEvent::TaskCreated(task) => StoreUpdate::Created(task),
            PushEvent::TaskUpdated(task) => StoreUpdate::Updated(task),
            PushEvent::TaskDeleted { task_id, .. } => StoreUpdate::Deleted(task_id),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tasks: Vec<Task>,
    current: Option<Task>,
    status: TaskStatusAggregate,
}

impl State {
    fn apply(&mut self, update: StoreUpdate, policy: MergePolicy) {
        match update {
            StoreUpdate::Replace(tasks) => {
                let before = tasks.len();
                self.tasks = tasks.into_iter().filter(|task| !task.is_draft()).collect();
                if self.tasks.len() != before {
                    tracing::warn!(
                        dropped = before - self.tasks.len(),
                        "ignoring tasks without id in task list"
                    );
                }
            }
            StoreUpdate::Created(task) => {
                let Some(id) = task.id.clone() else {
                    tracing::warn!(title = %task.title, "ignoring created task without id");
                    return;
                };
                if policy == MergePolicy::DedupeById {
                    if let Some(existing) = self.tasks.iter_mut().find(|t| t.has_id(&id)) {
                        *existing = task;
                        return;
                    }
                }
                self.tasks.push(task);
            }
            StoreUpdate::Updated(task) => {
                let Some(id) = task.id.clone() else {
                    tracing::warn!(title = %task.title, "ignoring updated task without id");
                    return;
                };
                for existing in self.tasks.iter_mut().filter(|t| t.has_id(&id)) {
                    *existing = task.clone();
                }
            }
            StoreUpdate::Deleted(id) => {
                self.tasks.retain(|task| !task.has_id(&id));
            }
            StoreUpdate::Current(task) => {
                self.current = Some(task);
            }
            StoreUpdate::Status(status) => {
                self.status = status;
            }
        }
    }
}

/// Counts a call as in flight until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Session-scoped task store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TaskStore {
    api: Arc<dyn TaskApi>,
    feedback: Arc<dyn Feedback>,
    state: Arc<Mutex<State>>,
    in_flight: Arc<AtomicUsize>,
    policy: MergePolicy,
}

impl TaskStore {
    pub fn new(api: Arc<dyn TaskApi>, feedback: Arc<dyn Feedback>, policy: MergePolicy) -> Self {
        Self {
            api,
            feedback,
            state: Arc::new(Mutex::new(State::default())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            policy,
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Replace the collection with the server's task list.
    pub async fn fetch_all(&self) -> Result<()> {
        let _guard = InFlight::start(&self.in_flight);
        match self.api.list_tasks().await {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "fetched tasks");
                self.apply(StoreUpdate::Replace(tasks));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "error getting tasks");
                Err(err)
            }
        }
    }

    /// Load one task into the current-task slot (not the collection).
    pub async fn fetch_one(&self, id: &str) -> Result<Task> {
        let _guard = InFlight::start(&self.in_flight);
        match self.api.get_task(id).await {
            Ok(task) => {
                self.apply(StoreUpdate::Current(task.clone()));
                Ok(task)
            }
            Err(err) => {
                tracing::warn!(error = %err, task_id = id, "error getting task");
                Err(err)
            }
        }
    }

    /// Create `draft` on the server and append the returned task. The only
    /// operation whose failure is reported to the user.
    pub async fn create(&self, draft: Task) -> Result<Task> {
        let _guard = InFlight::start(&self.in_flight);
        match self.api.create_task(&draft).await {
            Ok(task) => {
                tracing::info!(task_id = ?task.id, title = %task.title, "task created");
                self.apply(StoreUpdate::Created(task.clone()));
                let _ = self.refresh_status().await;
                self.feedback.success(CREATED_MESSAGE);
                Ok(task)
            }
            Err(err) => {
                tracing::warn!(error = %err, "error creating task");
                let message = err.server_message().unwrap_or(CREATE_FAILED_MESSAGE);
                self.feedback.error(message);
                Err(err)
            }
        }
    }

    /// Send the full task and replace the local entry with the server copy.
    pub async fn update(&self, task: Task) -> Result<Task> {
        let _guard = InFlight::start(&self.in_flight);
        match self.api.update_task(&task).await {
            Ok(updated) => {
                tracing::info!(task_id = ?updated.id, "task updated");
                self.feedback.success(UPDATED_MESSAGE);
                self.apply(StoreUpdate::Updated(updated.clone()));
                let _ = self.refresh_status().await;
                Ok(updated)
            }
            Err(err) => {
                tracing::warn!(error = %err, task_id = ?task.id, "error updating task");
                Err(err)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = InFlight::start(&self.in_flight);
        match self.api.delete_task(id).await {
            Ok(()) => {
                tracing::info!(task_id = id, "task deleted");
                self.apply(StoreUpdate::Deleted(id.to_string()));
                let _ = self.refresh_status().await;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, task_id = id, "error deleting task");
                Err(err)
            }
        }
    }

    /// Re-read the server's aggregate. Independent of the local collection.
    pub async fn refresh_status(&self) -> Result<TaskStatusAggregate> {
        let _guard = InFlight::start(&self.in_flight);
        match self.api.task_status().await {
            Ok(status) => {
                self.apply(StoreUpdate::Status(status.clone()));
                Ok(status)
            }
            Err(err) => {
                tracing::warn!(error = %err, "error getting task status");
                Err(err)
            }
        }
    }

    /// Single entry point for every state change.
    pub fn apply(&self, update: StoreUpdate) {
        self.lock().apply(update, self.policy);
    }

    /// Merge a push event, then announce it through the feedback channel.
    pub fn apply_push(&self, event: PushEvent) {
        let kind = event.kind();
        tracing::debug!(event = kind.wire_name(), "merging push event");
        self.apply(event.into());
        self.feedback.success(match kind {
            PushEventKind::TaskCreated => PUSH_CREATED_MESSAGE,
            PushEventKind::TaskUpdated => PUSH_UPDATED_MESSAGE,
            PushEventKind::TaskDeleted => PUSH_DELETED_MESSAGE,
        });
    }

    /// Merge events from `subscription` until it ends.
    pub async fn run_push(&self, mut subscription: Subscription) -> usize {
        let mut applied = 0;
        while let Some(event) = subscription.recv().await {
            self.apply_push(event);
            applied += 1;
        }
        applied
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    pub fn find(&self, id: &str) -> Result<Task> {
        self.lock()
            .tasks
            .iter()
            .find(|task| task.has_id(id))
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    pub fn active_tasks(&self) -> Vec<Task> {
        partition(&self.lock().tasks).0
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        partition(&self.lock().tasks).1
    }

    pub fn tasks_by_priority(&self, filter: PriorityFilter) -> Vec<Task> {
        self.lock()
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn current_task(&self) -> Option<Task> {
        self.lock().current.clone()
    }

    pub fn status(&self) -> TaskStatusAggregate {
        self.lock().status.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight() > 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
