//! tasksync task commands: list, show, add, edit, done, rm.
//!
//! Add and edit go through the [`ModalController`] so the CLI fills and
//! submits a draft the same way an interactive form would.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::feedback::FeedbackMessage;
use crate::modal::{DraftField, ModalController};
use crate::output::{emit_success, format_task_line, HumanOutput};
use crate::task::{format_due_date, partition, PriorityFilter, Task};

use super::{attach_feedback, report_failed_feedback, Context, StatusFilter};

/// Draft fields given on the command line. `None` keeps the current value.
#[derive(Debug, Default)]
pub struct TaskFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub completed: Option<String>,
}

impl TaskFields {
    fn apply(&self, modal: &mut ModalController) -> Result<()> {
        let fields = [
            (DraftField::Title, &self.title),
            (DraftField::Description, &self.description),
            (DraftField::Priority, &self.priority),
            (DraftField::DueDate, &self.due),
            (DraftField::Completed, &self.completed),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                modal.set_field(field, value)?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ListReport {
    tasks: Vec<Task>,
    active: usize,
    completed: usize,
}

#[derive(Serialize)]
struct TaskReport {
    task: Task,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    feedback: Vec<FeedbackMessage>,
}

#[derive(Serialize)]
struct DeleteReport {
    id: String,
    remaining: usize,
}

pub async fn run_list(ctx: &Context, priority: PriorityFilter, status: StatusFilter) -> Result<()> {
    let (store, _feedback) = ctx.store()?;
    store.fetch_all().await?;

    let tasks: Vec<Task> = store
        .tasks_by_priority(priority)
        .into_iter()
        .filter(|task| match status {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        })
        .collect();
    let (active, completed) = partition(&tasks);

    let mut human = HumanOutput::new(format!("tasksync list: {} task(s)", tasks.len()));
    human.push_summary("active", active.len().to_string());
    human.push_summary("completed", completed.len().to_string());
    for task in &tasks {
        human.push_detail(format_task_line(task));
    }
    if tasks.is_empty() {
        human.push_next_step("tasksync add --title <title>");
    }

    let report = ListReport {
        active: active.len(),
        completed: completed.len(),
        tasks,
    };
    emit_success(ctx.output(), "list", &report, Some(&human))
}

pub async fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let (store, _feedback) = ctx.store()?;
    let task = store.fetch_one(id).await?;

    let human = describe("tasksync show", &task, &[]);
    let report = TaskReport {
        task,
        feedback: Vec::new(),
    };
    emit_success(ctx.output(), "show", &report, Some(&human))
}

pub async fn run_add(ctx: &Context, fields: TaskFields) -> Result<()> {
    let (store, feedback) = ctx.store()?;
    let mut modal = ModalController::new();
    modal.open_for_add();
    fields.apply(&mut modal)?;

    let outcome = modal.submit(&store).outcome().await;
    let messages = feedback.take();
    let task = settle(ctx, outcome, &messages)?;

    let human = describe("tasksync add: created task", &task, &messages);
    let report = TaskReport {
        task,
        feedback: messages,
    };
    emit_success(ctx.output(), "add", &report, Some(&human))
}

pub async fn run_edit(ctx: &Context, id: &str, fields: TaskFields) -> Result<()> {
    let (store, feedback) = ctx.store()?;
    let current = store.fetch_one(id).await?;

    let mut modal = ModalController::new();
    modal.open_for_edit(current);
    fields.apply(&mut modal)?;

    let outcome = modal.submit(&store).outcome().await;
    let messages = feedback.take();
    let task = settle(ctx, outcome, &messages)?;

    let human = describe("tasksync edit: updated task", &task, &messages);
    let report = TaskReport {
        task,
        feedback: messages,
    };
    emit_success(ctx.output(), "edit", &report, Some(&human))
}

pub async fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let (store, _feedback) = ctx.store()?;
    store.fetch_all().await?;
    store.delete(id).await?;

    let mut human = HumanOutput::new(format!("tasksync rm: deleted {id}"));
    human.push_summary("remaining", store.len().to_string());
    let report = DeleteReport {
        id: id.to_string(),
        remaining: store.len(),
    };
    emit_success(ctx.output(), "rm", &report, Some(&human))
}

fn describe(header: &str, task: &Task, messages: &[FeedbackMessage]) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id.clone().unwrap_or_default());
    human.push_summary("title", task.title.clone());
    if !task.description.is_empty() {
        human.push_summary("description", task.description.clone());
    }
    human.push_summary("priority", task.priority.to_string());
    if let Some(due) = &task.due_date {
        human.push_summary("due", format_due_date(due));
    }
    human.push_summary("completed", task.completed.to_string());
    attach_feedback(&mut human, messages);
    human
}

fn settle(
    ctx: &Context,
    outcome: Option<Result<Task>>,
    messages: &[FeedbackMessage],
) -> Result<Task> {
    match outcome {
        Some(Ok(task)) => Ok(task),
        Some(Err(err)) => {
            report_failed_feedback(ctx, messages);
            Err(err)
        }
        None => Err(Error::OperationFailed("nothing was submitted".to_string())),
    }
}
