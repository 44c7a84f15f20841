use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    /// Reference by category name, not id.
    pub category: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub recurring: Option<Recurrence>,
}

/// Client-supplied draft for `POST /todos`. The id, creation time and owner
/// are assigned server-side.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurring: Option<Recurrence>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_wire_shape() {
        let todo = Todo {
            id: Uuid::nil(),
            title: String::from("Buy milk"),
            description: None,
            completed: false,
            priority: Priority::Medium,
            category: Some(String::from("groceries")),
            due_date: None,
            created_at: "2026-01-02T03:04:05Z".parse().unwrap(),
            recurring: None,
        };

        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["title"], "Buy milk");
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["createdAt"], "2026-01-02T03:04:05Z");
        assert!(json["dueDate"].is_null());
        assert!(json["description"].is_null());
        assert!(json["recurring"].is_null());
    }

    #[test]
    fn new_todo_defaults() {
        let draft: NewTodo = serde_json::from_str(r#"{"title":"Test"}"#).unwrap();
        assert_eq!(draft.title, "Test");
        assert_eq!(draft.priority, Priority::Medium);
        assert!(draft.due_date.is_none());
    }

    #[test]
    fn recurrence_is_lowercase() {
        let json = serde_json::to_string(&Recurrence::Weekly).unwrap();
        assert_eq!(json, r#""weekly""#);
    }
}
