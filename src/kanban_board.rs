use crate::error::StoreError;
use crate::input::TextInput;
use crate::store::TaskStore;
use crate::task::{NewTask, Status, Task, TaskPatch};

/// Field focused in the edit modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Explanation,
}

/// Edit modal state, seeded from one task.
#[derive(Debug, Clone)]
pub struct TaskEditor {
    pub id: String,
    pub title: TextInput,
    pub explanation: TextInput,
    pub focus: EditorField,
}

impl TaskEditor {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: TextInput::with_value(task.task.clone()),
            explanation: TextInput::with_value(task.explanation.clone().unwrap_or_default()),
            focus: EditorField::Title,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            EditorField::Title => EditorField::Explanation,
            EditorField::Explanation => EditorField::Title,
        };
    }

    pub fn focused_mut(&mut self) -> &mut TextInput {
        match self.focus {
            EditorField::Title => &mut self.title,
            EditorField::Explanation => &mut self.explanation,
        }
    }
}

/// Local mirror of the store plus the board's view state.
///
/// Every operation talks to the store first and then updates the mirror:
/// creates re-fetch the whole list, edits and deletes patch it in place,
/// drops update it optimistically and reconcile on failure.
#[derive(Debug)]
pub struct KanbanBoard<S> {
    store: S,
    tasks: Vec<Task>,
    pub new_task: TextInput,
    editor: Option<TaskEditor>,
    pub selected_status: usize,
    pub selected_task: usize,
}

impl<S: TaskStore> KanbanBoard<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            tasks: Vec::new(),
            new_task: TextInput::new(),
            editor: None,
            selected_status: 0,
            selected_task: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_tasks_by_status(&self, status: Status) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    pub fn selected_column(&self) -> Status {
        Status::from_index(self.selected_status).unwrap_or(Status::Todo)
    }

    pub fn selected(&self) -> Option<&Task> {
        self.get_tasks_by_status(self.selected_column())
            .get(self.selected_task)
            .copied()
    }

    pub fn move_column(&mut self, delta: isize) {
        let last = Status::ALL.len() as isize - 1;
        self.selected_status = (self.selected_status as isize + delta).clamp(0, last) as usize;
        self.clamp_selection();
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.get_tasks_by_status(self.selected_column()).len();
        if len == 0 {
            self.selected_task = 0;
            return;
        }
        self.selected_task =
            (self.selected_task as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    /// Point the selection at `id`, wherever it lives.
    pub fn select_task(&mut self, id: &str) {
        let Some(status) = self.task(id).map(|t| t.status) else {
            return;
        };
        self.selected_status = status.index();
        self.selected_task = self
            .get_tasks_by_status(status)
            .iter()
            .position(|t| t.id == id)
            .unwrap_or(0);
    }

    fn clamp_selection(&mut self) {
        let len = self.get_tasks_by_status(self.selected_column()).len();
        self.selected_task = self.selected_task.min(len.saturating_sub(1));
    }

    /// Replace local state with the store's full list.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        self.tasks = self.store.list().await?;
        self.clamp_selection();
        tracing::info!(count = self.tasks.len(), "tasks loaded");
        Ok(())
    }

    /// Create a task from the input field. Empty input does nothing and returns false.
    ///
    /// The input is cleared as soon as the store accepts the task, so a
    /// failed resync afterwards can't lead to a duplicate on retry.
    pub async fn add_task(&mut self) -> Result<bool, StoreError> {
        if self.new_task.is_empty() {
            return Ok(false);
        }

        let new_task = NewTask::todo(self.new_task.value());
        let id = self.store.create(&new_task).await?;
        tracing::info!(id = %id, "task created");
        self.new_task.clear();

        self.load().await?;
        Ok(true)
    }

    pub async fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id).await?;
        self.tasks.retain(|t| t.id != id);
        self.clamp_selection();
        tracing::info!(id, "task deleted");
        Ok(())
    }

    pub fn editor(&self) -> Option<&TaskEditor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut TaskEditor> {
        self.editor.as_mut()
    }

    /// Open the edit modal for `id`. Returns false if the task isn't on the board.
    pub fn open_editor(&mut self, id: &str) -> bool {
        match self.task(id) {
            Some(task) => {
                self.editor = Some(TaskEditor::from_task(task));
                true
            }
            None => false,
        }
    }

    /// Close the modal, dropping any edits.
    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Send the modal's title and explanation, patch the local entry and close.
    /// On failure the modal stays open with the edits intact.
    pub async fn save_editor(&mut self) -> Result<bool, StoreError> {
        let Some(editor) = &self.editor else {
            return Ok(false);
        };

        let id = editor.id.clone();
        let patch = TaskPatch::fields(editor.title.value(), editor.explanation.value());
        self.store.update(&id, &patch).await?;

        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            patch.apply(task);
        }
        self.editor = None;
        tracing::info!(id = %id, "task edited");
        Ok(true)
    }

    /// Drop task `id` on `target`. A drop with no target does nothing and returns false.
    ///
    /// The status is changed locally before the store confirms it. If the
    /// store rejects the update the whole list is re-fetched; if that fails
    /// too, the previous status is put back.
    pub async fn drop_task(&mut self, id: &str, target: Option<Status>) -> Result<bool, StoreError> {
        let Some(target) = target else {
            return Ok(false);
        };
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };

        let previous = task.status;
        task.status = target;
        self.select_task(id);

        if let Err(err) = self.store.update(id, &TaskPatch::status(target)).await {
            tracing::warn!(id, error = %err, "status update rejected, reconciling");
            if let Err(reload_err) = self.load().await {
                tracing::warn!(error = %reload_err, "reconcile fetch failed, restoring status");
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    task.status = previous;
                }
            }
            self.clamp_selection();
            return Err(err);
        }

        tracing::info!(id, from = %previous, to = %target, "task moved");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        List,
        Create(NewTask),
        Update(String, TaskPatch),
        Delete(String),
    }

    /// Memory store that records every call and can be told to fail.
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        calls: Mutex<Vec<Call>>,
        fail_updates: AtomicBool,
        fail_lists: AtomicBool,
    }

    impl RecordingStore {
        fn with_tasks(tasks: Vec<Task>) -> Self {
            Self {
                inner: MemoryStore::with_tasks(tasks),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn unavailable() -> StoreError {
            StoreError::Status {
                status: 503,
                message: "unavailable".into(),
            }
        }
    }

    #[async_trait]
    impl TaskStore for RecordingStore {
        async fn list(&self) -> Result<Vec<Task>, StoreError> {
            self.record(Call::List);
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.inner.list().await
        }

        async fn create(&self, task: &NewTask) -> Result<String, StoreError> {
            self.record(Call::Create(task.clone()));
            self.inner.create(task).await
        }

        async fn update(&self, id: &str, patch: &TaskPatch) -> Result<(), StoreError> {
            self.record(Call::Update(id.to_string(), patch.clone()));
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(Self::unavailable());
            }
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            self.record(Call::Delete(id.to_string()));
            self.inner.delete(id).await
        }
    }

    fn task(id: &str, title: &str, status: Status) -> Task {
        Task {
            id: id.to_string(),
            task: title.to_string(),
            create_date: "2024-05-01T09:30:00.000Z".to_string(),
            status,
            explanation: None,
        }
    }

    async fn loaded(tasks: Vec<Task>) -> KanbanBoard<RecordingStore> {
        let mut board = KanbanBoard::new(RecordingStore::with_tasks(tasks));
        board.load().await.unwrap();
        board.store().calls.lock().unwrap().clear();
        board
    }

    #[tokio::test]
    async fn load_replaces_local_state() {
        let mut board = loaded(vec![task("1", "a", Status::Todo)]).await;
        board
            .store()
            .inner
            .create(&NewTask::todo("b"))
            .await
            .unwrap();

        board.load().await.unwrap();
        let titles: Vec<_> = board.tasks().iter().map(|t| t.task.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let mut board = loaded(vec![task("1", "a", Status::Todo)]).await;
        let before = board.tasks().to_vec();

        assert!(!board.add_task().await.unwrap());

        assert!(board.store().calls().is_empty());
        assert_eq!(board.tasks(), before.as_slice());
    }

    #[tokio::test]
    async fn whitespace_title_is_still_created() {
        let mut board = loaded(vec![]).await;
        board.new_task = TextInput::with_value("   ");

        assert!(board.add_task().await.unwrap());

        assert_eq!(board.tasks().len(), 1);
        assert_eq!(board.tasks()[0].task, "   ");
        assert_eq!(board.new_task.value(), "");
    }

    #[tokio::test]
    async fn failed_resync_after_create_clears_the_input() {
        let mut board = loaded(vec![]).await;
        board.store().fail_lists.store(true, Ordering::SeqCst);
        board.new_task = TextInput::with_value("buy milk");

        assert!(board.add_task().await.is_err());
        assert_eq!(board.new_task.value(), "");

        assert!(!board.add_task().await.unwrap());
        let created = board
            .store()
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::Create(_)))
            .count();
        assert_eq!(created, 1);
        assert_eq!(board.store().inner.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_creates_resyncs_and_clears_input() {
        let mut board = loaded(vec![task("1", "a", Status::Done)]).await;
        board.new_task = TextInput::with_value("buy milk");

        assert!(board.add_task().await.unwrap());

        let calls = board.store().calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            Call::Create(new_task) => {
                assert_eq!(new_task.task, "buy milk");
                assert_eq!(new_task.status, Status::Todo);
            }
            other => panic!("expected create, got {other:?}"),
        }
        assert_eq!(calls[1], Call::List);

        assert_eq!(board.new_task.value(), "");
        assert_eq!(board.tasks().len(), 2);
        assert_eq!(board.get_tasks_by_status(Status::Todo)[0].task, "buy milk");
    }

    #[tokio::test]
    async fn delete_removes_exactly_that_entry() {
        let mut board = loaded(vec![
            task("1", "a", Status::Todo),
            task("2", "b", Status::Todo),
            task("3", "c", Status::Done),
        ])
        .await;

        board.delete_task("2").await.unwrap();

        let ids: Vec<_> = board.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(board.store().calls(), vec![Call::Delete("2".into())]);
    }

    #[tokio::test]
    async fn editor_prefills_and_close_discards() {
        let mut original = task("1", "buy milk", Status::Todo);
        original.explanation = Some("2 litres".into());
        let mut board = loaded(vec![original.clone()]).await;

        assert!(board.open_editor("1"));
        let editor = board.editor().unwrap();
        assert_eq!(editor.title.value(), "buy milk");
        assert_eq!(editor.explanation.value(), "2 litres");

        board.editor_mut().unwrap().title.insert('!');
        board.close_editor();

        assert!(board.editor().is_none());
        assert_eq!(board.tasks(), &[original]);
        assert!(board.store().calls().is_empty());
        assert!(!board.open_editor("missing"));
    }

    #[tokio::test]
    async fn save_patches_fields_without_resync() {
        let mut board = loaded(vec![task("1", "buy milk", Status::InProgress)]).await;
        board.open_editor("1");
        {
            let editor = board.editor_mut().unwrap();
            editor.title = TextInput::with_value("buy oat milk");
            editor.explanation = TextInput::with_value("the barista kind");
        }

        assert!(board.save_editor().await.unwrap());

        assert_eq!(
            board.store().calls(),
            vec![Call::Update(
                "1".into(),
                TaskPatch::fields("buy oat milk", "the barista kind")
            )]
        );
        let saved = board.task("1").unwrap();
        assert_eq!(saved.task, "buy oat milk");
        assert_eq!(saved.explanation.as_deref(), Some("the barista kind"));
        assert_eq!(saved.status, Status::InProgress);
        assert!(board.editor().is_none());
    }

    #[tokio::test]
    async fn failed_save_keeps_the_modal_open() {
        let mut board = loaded(vec![task("1", "a", Status::Todo)]).await;
        board.store().fail_updates.store(true, Ordering::SeqCst);
        board.open_editor("1");
        board.editor_mut().unwrap().title.insert('b');

        assert!(board.save_editor().await.is_err());
        assert_eq!(board.editor().unwrap().title.value(), "ab");
        assert_eq!(board.task("1").unwrap().task, "a");
    }

    #[tokio::test]
    async fn drop_moves_only_the_dragged_task() {
        let mut board = loaded(vec![
            task("1", "buy milk", Status::Todo),
            task("2", "walk dog", Status::Todo),
        ])
        .await;

        assert!(board.drop_task("1", Some(Status::Done)).await.unwrap());

        assert_eq!(board.task("1").unwrap().status, Status::Done);
        assert_eq!(board.task("1").unwrap().task, "buy milk");
        assert_eq!(board.task("2").unwrap().status, Status::Todo);
        assert_eq!(
            board.store().calls(),
            vec![Call::Update("1".into(), TaskPatch::status(Status::Done))]
        );
        assert_eq!(board.selected_column(), Status::Done);
        assert_eq!(board.selected().unwrap().id, "1");
    }

    #[tokio::test]
    async fn drop_without_target_is_a_no_op() {
        let mut board = loaded(vec![task("1", "a", Status::InProgress)]).await;

        assert!(!board.drop_task("1", None).await.unwrap());
        assert!(!board.drop_task("missing", Some(Status::Done)).await.unwrap());

        assert_eq!(board.task("1").unwrap().status, Status::InProgress);
        assert!(board.store().calls().is_empty());
    }

    #[tokio::test]
    async fn same_column_drop_is_still_sent() {
        let mut board = loaded(vec![task("1", "a", Status::Done)]).await;
        assert!(board.drop_task("1", Some(Status::Done)).await.unwrap());
        assert_eq!(board.store().calls().len(), 1);
    }

    #[tokio::test]
    async fn rejected_drop_reconciles_from_the_store() {
        let mut board = loaded(vec![task("1", "a", Status::Todo)]).await;
        board.store().fail_updates.store(true, Ordering::SeqCst);

        assert!(board.drop_task("1", Some(Status::Done)).await.is_err());

        assert_eq!(board.task("1").unwrap().status, Status::Todo);
        assert_eq!(board.store().calls().last(), Some(&Call::List));
    }

    #[tokio::test]
    async fn rejected_drop_restores_status_when_store_is_down() {
        let mut board = loaded(vec![task("1", "a", Status::InProgress)]).await;
        board.store().fail_updates.store(true, Ordering::SeqCst);
        board.store().fail_lists.store(true, Ordering::SeqCst);

        assert!(board.drop_task("1", Some(Status::Todo)).await.is_err());
        assert_eq!(board.task("1").unwrap().status, Status::InProgress);
    }

    #[tokio::test]
    async fn selection_is_clamped_to_the_column() {
        let mut board = loaded(vec![
            task("1", "a", Status::Todo),
            task("2", "b", Status::Todo),
        ])
        .await;
        board.move_selection(5);
        assert_eq!(board.selected().unwrap().id, "2");

        board.delete_task("2").await.unwrap();
        assert_eq!(board.selected().unwrap().id, "1");

        board.move_column(1);
        assert!(board.selected().is_none());
        board.move_column(10);
        assert_eq!(board.selected_column(), Status::Done);
    }
}
