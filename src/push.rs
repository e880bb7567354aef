//! Push channel: server-broadcast task mutations fanned out to subscribers.
//!
//! A channel is opened per session with [`PushChannel::connect`], which
//! returns the subscriber-facing [`PushHandle`] and the inbound
//! [`PushSender`] a transport feeds. Each [`Subscription`] owns its own
//! queue, so every subscriber sees every matching event once and in the
//! order it was sent. Nothing is buffered for subscribers that attach later,
//! and nothing is delivered after [`PushHandle::close`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushEventKind {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
}

impl PushEventKind {
    pub const ALL: [PushEventKind; 3] = [
        PushEventKind::TaskCreated,
        PushEventKind::TaskUpdated,
        PushEventKind::TaskDeleted,
    ];

    /// Event name as emitted by the server.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PushEventKind::TaskCreated => "taskCreated",
            PushEventKind::TaskUpdated => "taskUpdated",
            PushEventKind::TaskDeleted => "taskDeleted",
        }
    }

    fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    TaskCreated(Task),
    TaskUpdated(Task),
    /// The server sends the id and, usually, the deleted task.
    TaskDeleted { task_id: String, task: Option<Task> },
}

impl PushEvent {
    pub fn kind(&self) -> PushEventKind {
        match self {
            PushEvent::TaskCreated(_) => PushEventKind::TaskCreated,
            PushEvent::TaskUpdated(_) => PushEventKind::TaskUpdated,
            PushEvent::TaskDeleted { .. } => PushEventKind::TaskDeleted,
        }
    }

    /// Decode one frame: a JSON array of the event name followed by its
    /// arguments, e.g. `["taskDeleted", "t9", {"title": "Old"}]`.
    pub fn from_frame(frame: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(frame)?;
        let Value::Array(mut parts) = value else {
            return Err(Error::Decode("frame is not an array".to_string()));
        };
        if parts.is_empty() {
            return Err(Error::Decode("frame is empty".to_string()));
        }
        let name = match parts.remove(0) {
            Value::String(name) => name,
            other => return Err(Error::Decode(format!("event name must be a string, got {other}"))),
        };
        let kind = PushEventKind::from_wire_name(&name)
            .ok_or_else(|| Error::Decode(format!("unknown event '{name}'")))?;
        let mut args = parts.into_iter();

        match kind {
            PushEventKind::TaskCreated | PushEventKind::TaskUpdated => {
                let payload = args
                    .next()
                    .ok_or_else(|| Error::Decode(format!("{name} without task payload")))?;
                let task: Task = serde_json::from_value(payload)?;
                if kind == PushEventKind::TaskCreated {
                    Ok(PushEvent::TaskCreated(task))
                } else {
                    Ok(PushEvent::TaskUpdated(task))
                }
            }
            PushEventKind::TaskDeleted => {
                let task_id = match args.next() {
                    Some(Value::String(id)) => id,
                    _ => return Err(Error::Decode("taskDeleted without task id".to_string())),
                };
                let task = match args.next() {
                    None | Some(Value::Null) => None,
                    Some(payload) => Some(serde_json::from_value(payload)?),
                };
                Ok(PushEvent::TaskDeleted { task_id, task })
            }
        }
    }

    /// Encode back into the frame shape read by [`PushEvent::from_frame`].
    pub fn to_frame(&self) -> Result<String> {
        let name = Value::String(self.kind().wire_name().to_string());
        let parts = match self {
            PushEvent::TaskCreated(task) | PushEvent::TaskUpdated(task) => {
                vec![name, serde_json::to_value(task)?]
            }
            PushEvent::TaskDeleted { task_id, task } => {
                let mut parts = vec![name, Value::String(task_id.clone())];
                if let Some(task) = task {
                    parts.push(serde_json::to_value(task)?);
                }
                parts
            }
        };
        Ok(serde_json::to_string(&parts)?)
    }
}

struct Subscriber {
    id: u64,
    kinds: Vec<PushEventKind>,
    tx: mpsc::UnboundedSender<PushEvent>,
}

struct Shared {
    session_id: String,
    closed: AtomicBool,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Shared {
    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct PushChannel;

impl PushChannel {
    /// Open the channel for one session.
    pub fn connect(session_id: impl Into<String>) -> (PushHandle, PushSender) {
        let shared = Arc::new(Shared {
            session_id: session_id.into(),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        });
        tracing::info!(session = %shared.session_id, "push channel connected");
        (
            PushHandle {
                shared: shared.clone(),
            },
            PushSender { shared },
        )
    }
}

/// Subscriber-facing side of a push channel.
#[derive(Clone)]
pub struct PushHandle {
    shared: Arc<Shared>,
}

impl PushHandle {
    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Subscribe to every event kind.
    pub fn subscribe(&self) -> Result<Subscription> {
        self.subscribe_to(&PushEventKind::ALL)
    }

    /// Subscribe to the given kinds only.
    pub fn subscribe_to(&self, kinds: &[PushEventKind]) -> Result<Subscription> {
        let mut subscribers = self.shared.subscribers();
        if self.is_closed() {
            return Err(Error::ChannelClosed(self.shared.session_id.clone()));
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        subscribers.push(Subscriber {
            id,
            kinds: kinds.to_vec(),
            tx,
        });
        tracing::debug!(session = %self.shared.session_id, subscription = id, "subscribed");
        Ok(Subscription {
            id,
            shared: self.shared.clone(),
            rx,
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers().len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Tear the channel down. Subscribers drain what was already queued and
    /// then see end of stream. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let mut subscribers = self.shared.subscribers();
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        subscribers.clear();
        tracing::info!(session = %self.shared.session_id, "push channel closed");
        true
    }
}

/// Inbound side of a push channel, fed by a transport.
#[derive(Clone)]
pub struct PushSender {
    shared: Arc<Shared>,
}

impl PushSender {
    /// Deliver `event` to every matching subscriber. Returns how many
    /// subscribers received it; zero once the channel is closed.
    pub fn send(&self, event: PushEvent) -> usize {
        let mut subscribers = self.shared.subscribers();
        if self.shared.closed.load(Ordering::SeqCst) {
            tracing::debug!(session = %self.shared.session_id, "dropping event on closed channel");
            return 0;
        }
        let kind = event.kind();
        let mut delivered = 0;
        subscribers.retain(|subscriber| {
            if !subscriber.kinds.contains(&kind) {
                return !subscriber.tx.is_closed();
            }
            match subscriber.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        tracing::debug!(
            session = %self.shared.session_id,
            event = kind.wire_name(),
            delivered,
            "push event dispatched"
        );
        delivered
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

/// One subscriber's ordered inbound queue.
pub struct Subscription {
    id: u64,
    shared: Arc<Shared>,
    rx: mpsc::UnboundedReceiver<PushEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next event, or `None` once the subscription is cancelled or the
    /// channel is closed and the queue is drained.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<PushEvent> {
        self.rx.try_recv().ok()
    }

    /// Detach from the channel. Queued events are discarded.
    pub fn cancel(self) {
        let id = self.id;
        self.shared.subscribers().retain(|subscriber| subscriber.id != id);
        tracing::debug!(session = %self.shared.session_id, subscription = id, "subscription cancelled");
    }
}
