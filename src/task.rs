use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which column a task lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

impl Status {
    /// Board order, left to right.
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn index(self) -> usize {
        match self {
            Status::Todo => 0,
            Status::InProgress => 1,
            Status::Done => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Status> {
        Self::ALL.get(index).copied()
    }

    /// Label used on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "inProgress",
            Status::Done => "done",
        }
    }

    /// Column heading.
    pub fn title(self) -> &'static str {
        match self {
            Status::Todo => "ToDo",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Status::Todo),
            "inProgress" | "in-progress" | "in_progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            other => Err(format!(
                "unknown status '{other}' (expected todo, in-progress or done)"
            )),
        }
    }
}

/// A task record as mirrored from the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task: String,
    #[serde(rename = "createDate", default)]
    pub create_date: String,
    #[serde(with = "status_list")]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Task {
    /// Creation timestamp in local time, or the raw value if it doesn't parse.
    pub fn created_local(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.create_date) {
            Ok(ts) => ts
                .with_timezone(&Local)
                .format("%Y/%m/%d %H:%M:%S")
                .to_string(),
            Err(_) => self.create_date.clone(),
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub task: String,
    #[serde(with = "status_list")]
    pub status: Status,
    #[serde(rename = "createDate")]
    pub create_date: String,
}

impl NewTask {
    /// A new task in the first column, stamped with the current time.
    pub fn todo(title: impl Into<String>) -> Self {
        Self {
            task: title.into(),
            status: Status::Todo,
            create_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Body of an update request. Absent fields are left alone by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "status_list::option"
    )]
    pub status: Option<Status>,
}

impl TaskPatch {
    pub fn fields(task: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            task: Some(task.into()),
            explanation: Some(explanation.into()),
            status: None,
        }
    }

    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.task.is_none() && self.explanation.is_none() && self.status.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.task {
            task.task = title.clone();
        }
        if let Some(explanation) = &self.explanation {
            task.explanation = Some(explanation.clone());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

/// The store keeps status as a one-item list of labels.
mod status_list {
    use super::Status;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &Status, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(std::iter::once(status))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Status, D::Error> {
        let labels = Vec::<Status>::deserialize(deserializer)?;
        labels
            .into_iter()
            .next()
            .ok_or_else(|| D::Error::custom("status list is empty"))
    }

    pub mod option {
        use super::Status;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            status: &Option<Status>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match status {
                Some(status) => super::serialize(status, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Status>, D::Error> {
            let labels = Option::<Vec<Status>>::deserialize(deserializer)?;
            Ok(labels.and_then(|labels| labels.into_iter().next()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_is_a_single_item_list_on_the_wire() {
        let task: Task = serde_json::from_value(json!({
            "id": "1",
            "task": "buy milk",
            "createDate": "2024-05-01T09:30:00.000Z",
            "status": ["inProgress"],
        }))
        .unwrap();
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.explanation, None);

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["status"], json!(["inProgress"]));
        assert!(value.get("explanation").is_none());
    }

    #[test]
    fn first_label_wins_and_empty_list_is_rejected() {
        let task: Task = serde_json::from_value(json!({
            "id": "1", "task": "t", "status": ["done", "todo"],
        }))
        .unwrap();
        assert_eq!(task.status, Status::Done);
        assert_eq!(task.create_date, "");

        let err = serde_json::from_value::<Task>(json!({
            "id": "1", "task": "t", "status": [],
        }));
        assert!(err.is_err());

        let err = serde_json::from_value::<Task>(json!({
            "id": "1", "task": "t", "status": ["archived"],
        }));
        assert!(err.is_err());
    }

    #[test]
    fn status_patch_only_carries_status() {
        let body = serde_json::to_value(TaskPatch::status(Status::Done)).unwrap();
        assert_eq!(body, json!({ "status": ["done"] }));

        let body = serde_json::to_value(TaskPatch::fields("t", "why")).unwrap();
        assert_eq!(body, json!({ "task": "t", "explanation": "why" }));
    }

    #[test]
    fn new_task_starts_in_todo_with_iso_timestamp() {
        let task = NewTask::todo("write report");
        let body = serde_json::to_value(&task).unwrap();
        assert_eq!(body["status"], json!(["todo"]));
        assert_eq!(body["task"], "write report");

        let stamp = body["createDate"].as_str().unwrap();
        assert!(stamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn patch_apply_touches_only_present_fields() {
        let mut task = Task {
            id: "7".into(),
            task: "old".into(),
            create_date: String::new(),
            status: Status::Todo,
            explanation: None,
        };
        TaskPatch::status(Status::Done).apply(&mut task);
        assert_eq!(task.task, "old");
        assert_eq!(task.status, Status::Done);

        TaskPatch::fields("new", "").apply(&mut task);
        assert_eq!(task.task, "new");
        assert_eq!(task.explanation.as_deref(), Some(""));
        assert_eq!(task.status, Status::Done);
    }

    #[test]
    fn status_parses_cli_spellings() {
        assert_eq!("in-progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("inProgress".parse::<Status>(), Ok(Status::InProgress));
        assert!("later".parse::<Status>().is_err());
        assert_eq!(Status::from_index(2), Some(Status::Done));
        assert_eq!(Status::from_index(3), None);
    }

    #[test]
    fn unparseable_timestamp_is_shown_raw() {
        let task = Task {
            id: "1".into(),
            task: "t".into(),
            create_date: "yesterday".into(),
            status: Status::Todo,
            explanation: None,
        };
        assert_eq!(task.created_local(), "yesterday");
    }
}
