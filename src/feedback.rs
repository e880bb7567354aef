//! User-visible feedback (the "toast" channel), kept apart from logging.

use std::sync::{Arc, Mutex};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackMessage {
    pub level: FeedbackLevel,
    pub message: String,
}

pub trait Feedback: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards feedback to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFeedback;

impl Feedback for TracingFeedback {
    fn success(&self, message: &str) {
        tracing::info!(feedback = "success", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(feedback = "error", "{message}");
    }
}

/// Keeps every message so a caller can show or inspect them later.
#[derive(Debug, Clone, Default)]
pub struct RecordingFeedback {
    messages: Arc<Mutex<Vec<FeedbackMessage>>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<FeedbackMessage> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<FeedbackMessage> {
        std::mem::take(&mut *self.lock())
    }

    fn push(&self, level: FeedbackLevel, message: &str) {
        self.lock().push(FeedbackMessage {
            level,
            message: message.to_string(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FeedbackMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Feedback for RecordingFeedback {
    fn success(&self, message: &str) {
        self.push(FeedbackLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.push(FeedbackLevel::Error, message);
    }
}
