//! In-memory notification log fed by push events.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::push::{PushEvent, PushEventKind};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedTask {
    Task(Task),
    Deleted {
        task_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        task: Option<Task>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEntry {
    pub kind: PushEventKind,
    pub message: String,
    pub related: RelatedTask,
    pub status: NotificationStatus,
    pub received_at: DateTime<Utc>,
}

impl NotificationEntry {
    pub fn from_event(event: PushEvent) -> Self {
        let kind = event.kind();
        let (message, related) = match event {
            PushEvent::TaskCreated(task) => {
                (format!("New task added: {}", task.title), RelatedTask::Task(task))
            }
            PushEvent::TaskUpdated(task) => {
                (format!("Task updated: {}", task.title), RelatedTask::Task(task))
            }
            PushEvent::TaskDeleted { task_id, task } => {
                let label = task
                    .as_ref()
                    .map(|task| task.title.clone())
                    .unwrap_or_else(|| task_id.clone());
                (
                    format!("Task deleted: {label}"),
                    RelatedTask::Deleted { task_id, task },
                )
            }
        };
        Self {
            kind,
            message,
            related,
            status: NotificationStatus::Unread,
            received_at: Utc::now(),
        }
    }

    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }
}

/// Append-only (FIFO) log. Reading an entry removes it.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Vec<NotificationEntry>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&mut self, event: PushEvent) -> &NotificationEntry {
        let entry = NotificationEntry::from_event(event);
        tracing::debug!(message = %entry.message, "notification received");
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Remove the entry at `index`; later entries shift down by one.
    pub fn mark_as_read(&mut self, index: usize) -> Option<NotificationEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let mut entry = self.entries.remove(index);
        entry.status = NotificationStatus::Read;
        Some(entry)
    }

    pub fn mark_all_as_read(&mut self) {
        self.entries.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_unread()).count()
    }

    pub fn entries(&self) -> &[NotificationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: Some(id.to_string()),
            title: title.to_string(),
            ..Task::draft()
        }
    }

    #[test]
    fn messages_follow_event_kind() {
        let mut log = NotificationLog::new();
        log.on_event(PushEvent::TaskCreated(task("a", "Alpha")));
        log.on_event(PushEvent::TaskUpdated(task("a", "Alpha 2")));
        log.on_event(PushEvent::TaskDeleted {
            task_id: "t9".to_string(),
            task: Some(task("t9", "Old")),
        });
        let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["New task added: Alpha", "Task updated: Alpha 2", "Task deleted: Old"]
        );
        assert_eq!(log.unread_count(), 3);
    }

    #[test]
    fn delete_without_payload_falls_back_to_id() {
        let mut log = NotificationLog::new();
        let entry = log.on_event(PushEvent::TaskDeleted {
            task_id: "t9".to_string(),
            task: None,
        });
        assert_eq!(entry.message, "Task deleted: t9");
        assert_eq!(
            entry.related,
            RelatedTask::Deleted {
                task_id: "t9".to_string(),
                task: None
            }
        );
    }

    #[test]
    fn mark_as_read_removes_and_shifts() {
        let mut log = NotificationLog::new();
        for title in ["one", "two", "three"] {
            log.on_event(PushEvent::TaskCreated(task(title, title)));
        }
        let removed = log.mark_as_read(1).expect("entry");
        assert_eq!(removed.message, "New task added: two");
        assert_eq!(removed.status, NotificationStatus::Read);
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].message, "New task added: three");
        assert_eq!(log.unread_count(), 2);
    }

    #[test]
    fn mark_as_read_out_of_range_is_noop() {
        let mut log = NotificationLog::new();
        log.on_event(PushEvent::TaskCreated(task("a", "A")));
        assert!(log.mark_as_read(5).is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn mark_all_as_read_clears() {
        let mut log = NotificationLog::new();
        log.on_event(PushEvent::TaskCreated(task("a", "A")));
        log.on_event(PushEvent::TaskCreated(task("b", "B")));
        log.mark_all_as_read();
        assert!(log.is_empty());
        assert_eq!(log.unread_count(), 0);
    }

    #[test]
    fn unread_count_tracks_any_sequence() {
        let mut log = NotificationLog::new();
        let ops: [(u8, usize); 9] = [
            (0, 0),
            (0, 0),
            (1, 0),
            (0, 0),
            (1, 7),
            (0, 0),
            (2, 0),
            (0, 0),
            (1, 0),
        ];
        for (step, (op, index)) in ops.into_iter().enumerate() {
            match op {
                0 => {
                    log.on_event(PushEvent::TaskCreated(task(&step.to_string(), "x")));
                }
                1 => {
                    log.mark_as_read(index);
                }
                _ => log.mark_all_as_read(),
            }
            let expected = log.entries().iter().filter(|e| e.is_unread()).count();
            assert_eq!(log.unread_count(), expected);
            assert_eq!(log.unread_count(), log.len());
        }
    }

    #[test]
    fn entries_keep_delivery_order() {
        let mut log = NotificationLog::new();
        let titles: Vec<String> = (0..20).map(|i| format!("task {i}")).collect();
        for title in &titles {
            log.on_event(PushEvent::TaskUpdated(task(title, title)));
        }
        let seen: Vec<String> = log
            .entries()
            .iter()
            .map(|e| e.message.trim_start_matches("Task updated: ").to_string())
            .collect();
        assert_eq!(seen, titles);
    }
}
