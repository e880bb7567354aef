//! One signed-in user's sync session.
//!
//! A session wires a [`TaskStore`] and a [`NotificationLog`] to the same push
//! channel, each through its own subscription, and loads the initial task
//! list and status. [`Session::shutdown`] closes the channel and waits for
//! both consumers to drain.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::TaskApi;
use crate::error::{Error, Result};
use crate::feedback::Feedback;
use crate::notifications::{NotificationEntry, NotificationLog};
use crate::push::PushHandle;
use crate::store::{MergePolicy, TaskStore};

/// Fresh id for [`crate::push::PushChannel::connect`].
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct Session {
    user_id: String,
    store: TaskStore,
    notifications: Arc<Mutex<NotificationLog>>,
    feed: Option<mpsc::UnboundedReceiver<NotificationEntry>>,
    push: PushHandle,
    workers: Vec<JoinHandle<()>>,
}

impl Session {
    pub async fn start(
        user_id: impl Into<String>,
        api: Arc<dyn TaskApi>,
        feedback: Arc<dyn Feedback>,
        push: PushHandle,
        policy: MergePolicy,
    ) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(Error::InvalidArgument("user id cannot be empty".to_string()));
        }

        let store = TaskStore::new(api, feedback, policy);
        let notifications = Arc::new(Mutex::new(NotificationLog::new()));
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();

        let store_sub = push.subscribe()?;
        let log_sub = push.subscribe()?;

        let merge_worker = {
            let store = store.clone();
            tokio::spawn(async move {
                let applied = store.run_push(store_sub).await;
                tracing::debug!(applied, "store push consumer finished");
            })
        };

        let log_worker = {
            let notifications = notifications.clone();
            let mut log_sub = log_sub;
            tokio::spawn(async move {
                while let Some(event) = log_sub.recv().await {
                    let entry = lock_log(&notifications).on_event(event).clone();
                    let _ = feed_tx.send(entry);
                }
                tracing::debug!("notification consumer finished");
            })
        };

        tracing::info!(user = %user_id, session = %push.session_id(), "session started");

        let session = Self {
            user_id,
            store,
            notifications,
            feed: Some(feed_rx),
            push,
            workers: vec![merge_worker, log_worker],
        };

        let _ = session.store.fetch_all().await;
        let _ = session.store.refresh_status().await;

        Ok(session)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        self.push.session_id()
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn push(&self) -> &PushHandle {
        &self.push
    }

    /// Lock the notification log for reading or acknowledging entries.
    pub fn notifications(&self) -> MutexGuard<'_, NotificationLog> {
        lock_log(&self.notifications)
    }

    pub fn unread_count(&self) -> usize {
        self.notifications().unread_count()
    }

    /// Stream of entries as they are appended. Can be taken once.
    pub fn take_notification_feed(&mut self) -> Option<mpsc::UnboundedReceiver<NotificationEntry>> {
        self.feed.take()
    }

    /// Close the push channel and wait for the consumers to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.push.close();
        for worker in self.workers {
            worker
                .await
                .map_err(|err| Error::OperationFailed(format!("push consumer failed: {err}")))?;
        }
        tracing::info!(user = %self.user_id, "session ended");
        Ok(())
    }
}

fn lock_log(log: &Mutex<NotificationLog>) -> MutexGuard<'_, NotificationLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
