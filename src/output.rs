//! Human and JSON rendering for tasksync CLI commands.
//!
//! JSON output is one envelope per invocation:
//! `{"schema_version": "tasksync.v1", "command": "list", "status": "success", "data": ...}`.
//! Errors use the same envelope with `"status": "error"` and an `error` object.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::task::{format_due_date, Task};

pub const SCHEMA_VERSION: &str = "tasksync.v1";

/// Global flags that take a value, so their value is not a command name.
const VALUE_FLAGS: [&str; 3] = ["--server", "--user", "--events"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text report for a command: a header line, then optional sections.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        if !self.summary.is_empty() {
            f.write_str("\n\nSummary:")?;
            for (key, value) in &self.summary {
                if value.is_empty() {
                    write!(f, "\n- {key}")?;
                } else {
                    write!(f, "\n- {key}: {value}")?;
                }
            }
        }

        for (title, items) in [
            ("Details", &self.details),
            ("Warnings", &self.warnings),
            ("Next steps", &self.next_steps),
        ] {
            if items.is_empty() {
                continue;
            }
            write!(f, "\n\n{title}:")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

pub fn format_human(output: &HumanOutput) -> String {
    output.to_string()
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome<'a, T: Serialize> {
    Success {
        data: &'a T,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        next_steps: Vec<String>,
    },
    Error {
        error: ErrorBody,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        next_steps: Vec<String>,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<T: Serialize>(command: &str, outcome: Outcome<'_, T>) -> Result<()> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        outcome,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let (warnings, next_steps) = human
            .map(|h| (h.warnings.clone(), h.next_steps.clone()))
            .unwrap_or_default();
        return print_envelope(
            command,
            Outcome::Success {
                data,
                warnings,
                next_steps,
            },
        );
    }

    match human {
        Some(human) if !options.quiet => println!("{human}"),
        _ => {}
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        let error = ErrorBody {
            message: err.to_string(),
            code: err.exit_code(),
            kind: error_kind(err),
            details: err.details(),
        };
        return print_envelope::<()>(command, Outcome::Error { error, next_steps });
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// One list line: `[x] t1  Title  (high, due 2024-06-01)`.
pub fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let id = task.id.as_deref().unwrap_or("-");
    let mut meta = vec![task.priority.to_string()];
    if let Some(due) = &task.due_date {
        meta.push(format!("due {}", format_due_date(due)));
    }
    format!("[{mark}] {id}  {}  ({})", task.title, meta.join(", "))
}

/// Command name for error envelopes, recovered from the raw arguments when
/// clap never got to run.
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg);
        // Only `config` has subcommands.
        if words.len() == 2 || words[0] != "config" {
            break;
        }
    }
    if words.is_empty() {
        "tasksync".to_string()
    } else {
        words.join(" ")
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::InvalidConfig(_) => "fix .tasksync.toml then retry",
        Error::TaskNotFound(_) => "tasksync list",
        Error::Transport(_) => "check server.base_url or pass --server",
        Error::ChannelClosed(_) => "restart `tasksync watch`",
        _ => return Vec::new(),
    };
    vec![step.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn command_name_skips_global_flag_values() {
        assert_eq!(command_name(args(&["--server", "http://x", "list"])), "list");
        assert_eq!(command_name(args(&["--json", "show", "t1"])), "show");
        assert_eq!(command_name(args(&["config", "--json", "init"])), "config init");
        assert_eq!(command_name(args(&["--quiet"])), "tasksync");
    }

    #[test]
    fn error_envelope_shape() {
        let envelope: Envelope<'_, ()> = Envelope {
            schema_version: SCHEMA_VERSION,
            command: "show",
            outcome: Outcome::Error {
                error: ErrorBody {
                    message: "Task not found: t9".to_string(),
                    code: 2,
                    kind: error_kind(&Error::TaskNotFound("t9".to_string())),
                    details: None,
                },
                next_steps: vec!["tasksync list".to_string()],
            },
        };
        let value = serde_json::to_value(&envelope).expect("encode");
        assert_eq!(value["status"], "error");
        assert_eq!(value["command"], "show");
        assert_eq!(value["error"]["kind"], "user_error");
        assert_eq!(value["next_steps"][0], "tasksync list");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn success_envelope_omits_empty_lists() {
        let data = serde_json::json!({"tasks": 0});
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command: "list",
            outcome: Outcome::Success {
                data: &data,
                warnings: Vec::new(),
                next_steps: Vec::new(),
            },
        };
        let value = serde_json::to_value(&envelope).expect("encode");
        assert_eq!(value["schema_version"], "tasksync.v1");
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["tasks"], 0);
        assert!(value.get("warnings").is_none());
    }

    #[test]
    fn server_errors_are_operation_failures() {
        let err = Error::Server {
            status: 500,
            message: None,
        };
        assert_eq!(error_kind(&err), "operation_failed");
        assert!(error_next_steps(&err).is_empty());
    }
}
