//! Task model shared by the store, the push channel and the modal.
//!
//! Field names follow the server's JSON: the id travels as `_id` and the due
//! date as `dueDate`. Fields the client does not use are ignored on decode.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::InvalidArgument(format!(
                "invalid priority '{other}' (expected low|medium|high)"
            ))),
        }
    }
}

/// Priority filter applied to list views. `All` is the initial selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(priority) => task.priority == *priority,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }
        raw.parse().map(PriorityFilter::Only)
    }
}

/// A task as the server knows it. `id` is `None` for drafts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,
    #[serde(
        rename = "dueDate",
        default,
        skip_serializing_if = "Option::is_none",
        with = "due_date"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
}

impl Task {
    /// Empty draft, the shape the add form starts from.
    pub fn draft() -> Self {
        Self::default()
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_none()
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

pub fn parse_due_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DUE_DATE_FORMAT).map_err(|err| {
        Error::InvalidArgument(format!(
            "invalid due date '{}': {err} (expected YYYY-MM-DD)",
            raw.trim()
        ))
    })
}

pub fn format_due_date(date: &NaiveDate) -> String {
    date.format(DUE_DATE_FORMAT).to_string()
}

/// Server-computed summary over the user's tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskStatusAggregate {
    pub completed_count: u64,
    pub pending_count: u64,
    pub tasks_created_last_30_days: u64,
    pub completion_rate: f64,
    pub average_completion_time: f64,
}

/// `/tasks/status` response body. `avgCompletionTime` is renamed on the way in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskStatusResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub completed: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub pending: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub tasks_created_last_30_days: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub completion_rate: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_completion_time: f64,
}

impl From<TaskStatusResponse> for TaskStatusAggregate {
    fn from(raw: TaskStatusResponse) -> Self {
        Self {
            completed_count: raw.completed,
            pending_count: raw.pending,
            tasks_created_last_30_days: raw.tasks_created_last_30_days,
            completion_rate: raw.completion_rate,
            average_completion_time: raw.avg_completion_time,
        }
    }
}

/// `/tasks` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListResponse {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Decode `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Split tasks into (active, completed). Every task lands in exactly one side.
pub fn partition(tasks: &[Task]) -> (Vec<Task>, Vec<Task>) {
    tasks.iter().cloned().partition(|task| !task.completed)
}

mod due_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&super::format_due_date(date)),
            None => serializer.serialize_none(),
        }
    }

    // Servers often send full timestamps ("2024-06-01T00:00:00.000Z"); only the
    // date part is kept. Empty strings mean "no due date".
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let date_part = trimmed.get(..10).unwrap_or(trimmed);
        super::parse_due_date(date_part)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
