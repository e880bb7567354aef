//! REST seam between the task store and the server.
//!
//! [`TaskApi`] is what the store talks to; [`HttpTaskApi`] is the reqwest
//! implementation against the server's `/tasks` and `/task/{id}` routes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::task::{Task, TaskListResponse, TaskStatusAggregate, TaskStatusResponse};

#[async_trait]
pub trait TaskApi: Send + Sync {
    /// GET `/tasks`
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// GET `/task/{id}`
    async fn get_task(&self, id: &str) -> Result<Task>;

    /// POST `/task/create`
    async fn create_task(&self, draft: &Task) -> Result<Task>;

    /// PATCH `/task/{id}`
    async fn update_task(&self, task: &Task) -> Result<Task>;

    /// DELETE `/task/{id}`
    async fn delete_task(&self, id: &str) -> Result<()>;

    /// GET `/tasks/status`
    async fn task_status(&self) -> Result<TaskStatusAggregate>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base: Url,
    base_url: String,
}

impl HttpTaskApi {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|err| Error::InvalidConfig(format!("invalid server url '{base_url}': {err}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "server url '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self {
            client: builder.build()?,
            base,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL plus `segments`, each percent-encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Turn a non-success response into [`Error::Server`], keeping the body's
/// `message` when it has one.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message);
    tracing::debug!(status = status.as_u16(), body = %body, "server returned error");
    Err(Error::Server {
        status: status.as_u16(),
        message,
    })
}

fn require_id(task: &Task) -> Result<&str> {
    task.id
        .as_deref()
        .ok_or_else(|| Error::InvalidArgument("task has no id".to_string()))
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let response = self.client.get(self.url(&["tasks"])).send().await?;
        let body: TaskListResponse = check(response).await?.json().await?;
        Ok(body.tasks)
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        let response = self
            .client
            .get(self.url(&["task", id]))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn create_task(&self, draft: &Task) -> Result<Task> {
        let response = self
            .client
            .post(self.url(&["task", "create"]))
            .json(draft)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn update_task(&self, task: &Task) -> Result<Task> {
        let id = require_id(task)?;
        let response = self
            .client
            .patch(self.url(&["task", id]))
            .json(task)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&["task", id]))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn task_status(&self) -> Result<TaskStatusAggregate> {
        let response = self.client.get(self.url(&["tasks", "status"])).send().await?;
        let body: TaskStatusResponse = check(response).await?.json().await?;
        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let api = HttpTaskApi::new("http://localhost:8000/api/v1/", None).expect("client");
        assert_eq!(api.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(
            api.url(&["tasks"]).as_str(),
            "http://localhost:8000/api/v1/tasks"
        );
    }

    #[test]
    fn task_ids_stay_in_one_path_segment() {
        let api = HttpTaskApi::new("http://localhost:8000/api/v1", None).expect("client");
        assert_eq!(
            api.url(&["task", "a/b?c"]).as_str(),
            "http://localhost:8000/api/v1/task/a%2Fb%3Fc"
        );
    }

    #[test]
    fn unparseable_base_url_is_config_error() {
        let err = HttpTaskApi::new("not a url", None).expect_err("invalid");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn update_requires_id() {
        let err = require_id(&Task::draft()).expect_err("draft has no id");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn error_body_message_is_optional() {
        let body: ErrorBody = serde_json::from_str(r#"{"message":"Title is required"}"#)
            .expect("decode");
        assert_eq!(body.message.as_deref(), Some("Title is required"));
        let body: ErrorBody = serde_json::from_str("{}").expect("decode");
        assert!(body.message.is_none());
    }
}
