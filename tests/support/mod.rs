#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tasksync::api::TaskApi;
use tasksync::error::{Error, Result};
use tasksync::push::{PushEvent, PushSender};
use tasksync::task::{Task, TaskStatusAggregate};
use tokio::sync::watch;

/// A call the fake server received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Get(String),
    Create(Task),
    Update(Task),
    Delete(String),
    Status,
}

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    next_id: u64,
    calls: Vec<Call>,
    fail_next: Option<(u16, Option<String>)>,
    push: Option<PushSender>,
}

/// In-memory task server. Assigns ids `t1`, `t2`, ... and, when given a
/// [`PushSender`], broadcasts every mutation like the real server does.
#[derive(Clone)]
pub struct FakeServer {
    inner: Arc<Mutex<Inner>>,
    gate: watch::Sender<bool>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            gate,
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let server = Self::new();
        server.lock().tasks = tasks;
        server
    }

    pub fn api(&self) -> Arc<dyn TaskApi> {
        Arc::new(self.clone())
    }

    /// Echo mutations to `sender`.
    pub fn broadcast_to(&self, sender: PushSender) {
        self.lock().push = Some(sender);
    }

    /// Fail the next call with a server error.
    pub fn fail_next(&self, status: u16, message: Option<&str>) {
        self.lock().fail_next = Some((status, message.map(str::to_string)));
    }

    /// Park every call until [`FakeServer::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake server lock")
    }

    async fn enter(&self, call: Call) -> Result<()> {
        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .map_err(|err| Error::OperationFailed(err.to_string()))?;

        let mut inner = self.lock();
        inner.calls.push(call);
        if let Some((status, message)) = inner.fail_next.take() {
            return Err(Error::Server { status, message });
        }
        Ok(())
    }

    fn broadcast(&self, event: PushEvent) {
        let sender = self.lock().push.clone();
        if let Some(sender) = sender {
            sender.send(event);
        }
    }
}

pub fn task(id: &str, title: &str) -> Task {
    Task {
        id: Some(id.to_string()),
        title: title.to_string(),
        ..Task::draft()
    }
}

pub fn draft(title: &str) -> Task {
    Task {
        title: title.to_string(),
        ..Task::draft()
    }
}

#[async_trait]
impl TaskApi for FakeServer {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.enter(Call::List).await?;
        Ok(self.tasks())
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        self.enter(Call::Get(id.to_string())).await?;
        self.tasks()
            .into_iter()
            .find(|task| task.has_id(id))
            .ok_or(Error::Server {
                status: 404,
                message: Some("Task not found".to_string()),
            })
    }

    async fn create_task(&self, draft: &Task) -> Result<Task> {
        self.enter(Call::Create(draft.clone())).await?;
        let created = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let created = Task {
                id: Some(format!("t{}", inner.next_id)),
                ..draft.clone()
            };
            inner.tasks.push(created.clone());
            created
        };
        self.broadcast(PushEvent::TaskCreated(created.clone()));
        Ok(created)
    }

    async fn update_task(&self, task: &Task) -> Result<Task> {
        self.enter(Call::Update(task.clone())).await?;
        let id = task.id.clone().unwrap_or_default();
        let updated = {
            let mut inner = self.lock();
            let existing = inner
                .tasks
                .iter_mut()
                .find(|existing| existing.has_id(&id))
                .ok_or(Error::Server {
                    status: 404,
                    message: Some("Task not found".to_string()),
                })?;
            *existing = task.clone();
            task.clone()
        };
        self.broadcast(PushEvent::TaskUpdated(updated.clone()));
        Ok(updated)
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.enter(Call::Delete(id.to_string())).await?;
        let removed = {
            let mut inner = self.lock();
            let index = inner
                .tasks
                .iter()
                .position(|task| task.has_id(id))
                .ok_or(Error::Server {
                    status: 404,
                    message: Some("Task not found".to_string()),
                })?;
            inner.tasks.remove(index)
        };
        self.broadcast(PushEvent::TaskDeleted {
            task_id: id.to_string(),
            task: Some(removed),
        });
        Ok(())
    }

    async fn task_status(&self) -> Result<TaskStatusAggregate> {
        self.enter(Call::Status).await?;
        let tasks = self.tasks();
        let completed = tasks.iter().filter(|task| task.completed).count() as u64;
        let total = tasks.len() as u64;
        Ok(TaskStatusAggregate {
            completed_count: completed,
            pending_count: total - completed,
            tasks_created_last_30_days: total,
            completion_rate: if total == 0 {
                0.0
            } else {
                completed as f64 * 100.0 / total as f64
            },
            average_completion_time: 0.0,
        })
    }
}
