//! tasksync status command implementation
//!
//! Shows the server-computed task statistics.

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::TaskStatusAggregate;

use super::Context;

#[derive(serde::Serialize)]
struct StatusReport {
    server: String,
    #[serde(flatten)]
    status: TaskStatusAggregate,
}

pub async fn run(ctx: &Context) -> Result<()> {
    let (store, _feedback) = ctx.store()?;
    let status = store.refresh_status().await?;

    let mut human = HumanOutput::new("tasksync status");
    human.push_summary("server", ctx.config.server.base_url.clone());
    human.push_summary("completed", status.completed_count.to_string());
    human.push_summary("pending", status.pending_count.to_string());
    human.push_summary(
        "created (last 30 days)",
        status.tasks_created_last_30_days.to_string(),
    );
    human.push_summary("completion rate", format!("{:.1}%", status.completion_rate));
    human.push_summary(
        "average completion time",
        format!("{:.1}", status.average_completion_time),
    );

    let report = StatusReport {
        server: ctx.config.server.base_url.clone(),
        status,
    };
    emit_success(ctx.output(), "status", &report, Some(&human))
}
