//! tasksync - client-side task synchronization
//!
//! Keeps a local task collection in step with a task server through two
//! producers: responses to the client's own REST calls and server-pushed
//! mutation events.
//!
//! # Core Concepts
//!
//! - **Task store**: the local collection, current task and status aggregate
//! - **Push channel**: per-session fan-out of server events to subscribers
//! - **Notification log**: human-readable entries derived from push events
//! - **Modal controller**: add/edit form state and draft submission
//!
//! # Module Organization
//!
//! - `api`: REST seam (`TaskApi`) and its reqwest implementation
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.tasksync.toml`
//! - `error`: Error types and result aliases
//! - `events`: JSONL event output
//! - `feedback`: User-visible success/error messages
//! - `modal`: Add/edit modal state machine
//! - `notifications`: Notification log
//! - `output`: Human and JSON output envelopes
//! - `push`: Push channel and subscriptions
//! - `session`: Wiring of store, log and push channel for one user
//! - `store`: Task store and merge policy
//! - `task`: Task model and wire types
//! - `transport`: Line-oriented push transport over TCP

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod feedback;
pub mod modal;
pub mod notifications;
pub mod output;
pub mod push;
pub mod session;
pub mod store;
pub mod task;
pub mod transport;

pub use error::{Error, Result};
