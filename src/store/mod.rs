//! Task persistence: the `TaskStore` seam and its implementations.
//!
//! - `CmsClient` talks to the headless content store (or to `todoboard serve`)
//! - `MemoryStore` keeps tasks in process, for the local proxy and tests

mod cms;
mod memory;

pub use cms::{CmsClient, API_KEY_HEADER};
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::task::{NewTask, Task, TaskPatch};

/// Fields requested on list calls.
pub const TASK_FIELDS: &str = "id,task,status,explanation,createDate";

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks, in store order.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Create a task and return the id the store assigned.
    async fn create(&self, task: &NewTask) -> Result<String, StoreError>;

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: TaskStore + ?Sized> TaskStore for Arc<S> {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        (**self).list().await
    }

    async fn create(&self, task: &NewTask) -> Result<String, StoreError> {
        (**self).create(task).await
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<(), StoreError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete(id).await
    }
}

/// List envelope used by the content store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub contents: Vec<T>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
}

/// Body returned by create and update calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Decode list entries one by one, skipping records that don't fit the task shape.
pub fn decode_tasks(contents: Vec<serde_json::Value>) -> Vec<Task> {
    contents
        .into_iter()
        .filter_map(|value| {
            let id = value
                .get("id")
                .and_then(|id| id.as_str())
                .unwrap_or("<missing>")
                .to_string();
            match serde_json::from_value::<Task>(value) {
                Ok(task) => Some(task),
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "skipping malformed task record");
                    None
                }
            }
        })
        .collect()
}
