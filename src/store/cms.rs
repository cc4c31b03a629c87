use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;

use super::{decode_tasks, CreatedResponse, ListResponse, TaskStore, TASK_FIELDS};
use crate::error::StoreError;
use crate::task::{NewTask, Task, TaskPatch};

/// Header carrying the content store credential.
pub const API_KEY_HEADER: &str = "X-MICROCMS-API-KEY";

/// HTTP client for the `/todo` endpoint of a headless content store.
///
/// The same wire format is served by `todoboard serve`, so pointing the
/// client at the proxy without a key works the same way.
#[derive(Debug, Clone)]
pub struct CmsClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    limit: u32,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl CmsClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        limit: u32,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        let parsed =
            Url::parse(&base_url).map_err(|_| StoreError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StoreError::InvalidEndpoint(endpoint.to_string()));
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|key| !key.is_empty()),
            limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `segments` appended to the base URL, each one percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let invalid = || StoreError::InvalidEndpoint(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, StoreError> {
        let builder = self.http.request(method, self.url(segments)?);
        Ok(match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        })
    }
}

/// Turn a non-2xx response into `StoreError::Status`, pulling `message` out of a JSON body.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => err.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TaskStore for CmsClient {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        tracing::debug!(base_url = %self.base_url, "listing tasks");
        let response = self
            .request(Method::GET, &["todo"])?
            .query(&[("fields", TASK_FIELDS.to_string()), ("limit", self.limit.to_string())])
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let envelope: ListResponse<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(decode_tasks(envelope.contents))
    }

    async fn create(&self, task: &NewTask) -> Result<String, StoreError> {
        tracing::debug!(title = %task.task, "creating task");
        let response = self
            .request(Method::POST, &["todo"])?
            .json(task)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let created: CreatedResponse = serde_json::from_str(&body)?;
        Ok(created.id)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<(), StoreError> {
        tracing::debug!(id, ?patch, "updating task");
        let response = self
            .request(Method::PATCH, &["todo", id])?
            .json(patch)
            .send()
            .await?;
        check_status(response).await.map_err(|err| not_found(err, id))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        tracing::debug!(id, "deleting task");
        let response = self
            .request(Method::DELETE, &["todo", id])?
            .send()
            .await?;
        check_status(response).await.map_err(|err| not_found(err, id))?;
        Ok(())
    }
}

fn not_found(err: StoreError, id: &str) -> StoreError {
    if err.is_not_found() {
        StoreError::NotFound { id: id.to_string() }
    } else {
        err
    }
}
