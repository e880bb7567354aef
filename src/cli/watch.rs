//! tasksync watch command implementation
//!
//! Opens a session, connects the push transport and prints notifications as
//! they arrive. With `--events`, each notification is also written as a JSONL
//! event.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::feedback::TracingFeedback;
use crate::output::{emit_success, HumanOutput};
use crate::push::PushChannel;
use crate::session::{new_session_id, Session};
use crate::transport;

use super::Context;

#[derive(serde::Serialize)]
struct WatchReport {
    session: String,
    received: usize,
    unread: usize,
    tasks: usize,
}

pub async fn run(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let user = ctx.user.clone().ok_or_else(|| {
        Error::InvalidArgument("watch needs a user id (--user or TASKSYNC_USER)".to_string())
    })?;
    if !ctx.config.push.enabled {
        return Err(Error::InvalidConfig(
            "push.enabled is false; enable it to watch".to_string(),
        ));
    }

    let mut sink = match EventDestination::parse(ctx.events.as_deref()) {
        Some(destination) => Some(destination.open()?),
        None => None,
    };
    let print = !ctx.json && !ctx.quiet && !matches!(
        EventDestination::parse(ctx.events.as_deref()),
        Some(EventDestination::Stdout)
    );

    let (handle, sender) = PushChannel::connect(new_session_id());
    let closer = handle.clone();
    let mut session = Session::start(
        user,
        ctx.api()?,
        Arc::new(TracingFeedback),
        handle,
        ctx.config.sync.merge_policy(),
    )
    .await?;

    // Subscribers exist now, so nothing the transport reads is dropped.
    let addr = ctx.config.push.addr.clone();
    let transport = tokio::spawn(async move {
        let result = transport::run_tcp(&addr, sender).await;
        closer.close();
        result
    });

    let session_id = session.session_id().to_string();
    emit(&mut sink, Event::new(EventKind::SessionStarted, Some(session_id.clone())))?;
    if print {
        println!(
            "watching {} ({} task(s) loaded)",
            ctx.config.push.addr,
            session.store().len()
        );
    }

    let mut feed = session
        .take_notification_feed()
        .ok_or_else(|| Error::OperationFailed("notification feed unavailable".to_string()))?;
    let mut received = 0;
    while limit.map_or(true, |limit| received < limit) {
        let entry = tokio::select! {
            entry = feed.recv() => entry,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(entry) = entry else {
            break;
        };
        received += 1;
        if print {
            println!("{}", entry.message);
        }
        emit(
            &mut sink,
            Event::from_notification(&entry, Some(session_id.clone()))?,
        )?;
    }

    let report = WatchReport {
        session: session_id.clone(),
        received,
        unread: session.unread_count(),
        tasks: session.store().len(),
    };
    session.shutdown().await?;
    emit(&mut sink, Event::new(EventKind::SessionEnded, Some(session_id)))?;

    transport.abort();
    if let Ok(Err(err)) = transport.await {
        return Err(err);
    }

    let mut human = HumanOutput::new(format!("tasksync watch: {received} notification(s)"));
    human.push_summary("session", report.session.clone());
    human.push_summary("unread", report.unread.to_string());
    human.push_summary("tasks", report.tasks.to_string());
    emit_success(ctx.output(), "watch", &report, Some(&human))
}

fn emit(sink: &mut Option<EventSink>, event: Event) -> Result<()> {
    if let Some(sink) = sink.as_mut() {
        sink.emit(&event)?;
    }
    Ok(())
}
