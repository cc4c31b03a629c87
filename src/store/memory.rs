use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::TaskStore;
use crate::error::StoreError;
use crate::task::{NewTask, Task, TaskPatch};

/// In-process task store. Backs `todoboard serve --in-memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.lock().clone())
    }

    async fn create(&self, task: &NewTask) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.lock().push(Task {
            id: id.clone(),
            task: task.task.clone(),
            create_date: task.create_date.clone(),
            status: task.status,
            explanation: None,
        });
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<(), StoreError> {
        let mut tasks = self.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        patch.apply(task);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}
