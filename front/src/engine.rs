use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use ripple_api::v1::{Category, NewTodo, Todo};
use uuid::Uuid;

/// What the caller must do after staging a delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// The entry was server-confirmed; issue a delete for this id.
    Remote(Uuid),
    /// The entry's create is still in flight; nothing to send yet. The
    /// matching [`Engine::commit_create`] cleans up the server side.
    Pending,
}

#[derive(Clone, Debug)]
struct Entry {
    todo: Todo,
    /// Correlation key while the create is in flight.
    pending: Option<Uuid>,
}

/// In-memory todo state with optimistic mutation and server reconciliation.
///
/// The engine is pure and synchronous; the network layer above it applies
/// one result at a time, so no two mutations ever interleave.
#[derive(Debug, Default)]
pub struct Engine {
    entries: Vec<Entry>,
    categories: Vec<Category>,
    search: String,
    due: Option<NaiveDate>,
    /// Correlation keys of optimistic entries deleted before their create
    /// resolved.
    cancelled: HashSet<Uuid>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replacement from List or a push message. The last message
    /// wins; there is no merging.
    pub fn replace_all(&mut self, todos: Vec<Todo>) {
        self.entries = todos
            .into_iter()
            .map(|todo| Entry { todo, pending: None })
            .collect();
    }

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Optimistically inserts a synthesized todo and returns its correlation
    /// key. The key doubles as the temporary id until the server assigns the
    /// real one.
    pub fn stage_create(&mut self, draft: NewTodo) -> Uuid {
        let key = Uuid::new_v4();

        let todo = Todo {
            id: key,
            title: draft.title,
            description: draft.description,
            completed: false,
            priority: draft.priority,
            category: draft.category,
            due_date: draft.due_date,
            created_at: Utc::now(),
            recurring: draft.recurring,
        };

        // the list is newest first
        let entry = Entry {
            todo,
            pending: Some(key),
        };
        self.entries.insert(0, entry);

        key
    }

    /// Reconciles a confirmed create. Matching is by correlation key, never
    /// by title. Returns the server id when the entry was deleted while the
    /// create was in flight, so the caller can remove the orphaned row.
    pub fn commit_create(&mut self, key: Uuid, todo: Todo) -> Option<Uuid> {
        if self.cancelled.remove(&key) {
            return Some(todo.id);
        }

        let staged = (self.entries.iter_mut()).find(|entry| entry.pending == Some(key));

        if let Some(entry) = staged {
            *entry = Entry { todo, pending: None };
        }
        // else a push already delivered the authoritative state

        None
    }

    /// Rolls back an optimistic entry after a failed create.
    pub fn abort_create(&mut self, key: Uuid) {
        self.entries.retain(|entry| entry.pending != Some(key));
        self.cancelled.remove(&key);
    }

    /// Authoritative merge of a server-returned todo, matched by id.
    pub fn apply_update(&mut self, todo: Todo) {
        let entry = (self.entries.iter_mut()).find(|entry| entry.todo.id == todo.id);

        if let Some(entry) = entry {
            entry.todo = todo;
            entry.pending = None;
        }
    }

    /// Removes an entry locally and reports what the caller owes the server.
    /// Returns `None` for an unknown id.
    pub fn stage_delete(&mut self, id: Uuid) -> Option<Removal> {
        let index = (self.entries.iter()).position(|entry| entry.todo.id == id)?;
        let entry = self.entries.remove(index);

        match entry.pending {
            Some(key) => {
                self.cancelled.insert(key);
                Some(Removal::Pending)
            }
            None => Some(Removal::Remote(id)),
        }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn set_due_filter(&mut self, due: Option<NaiveDate>) {
        self.due = due;
    }

    /// All todos in display order, unfiltered.
    pub fn todos(&self) -> impl Iterator<Item = &Todo> {
        self.entries.iter().map(|entry| &entry.todo)
    }

    /// The todos passing the current filters, in unchanged order.
    pub fn visible(&self) -> Vec<&Todo> {
        self.todos().filter(|todo| self.matches(todo)).collect()
    }

    fn matches(&self, todo: &Todo) -> bool {
        let search = self.search.to_lowercase();

        if !todo.title.to_lowercase().contains(&search) {
            return false;
        }

        match self.due {
            // a todo without a due date never matches a set date filter
            Some(day) => todo.due_date.is_some_and(|due| due.date_naive() == day),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn todo(title: &str) -> Todo {
        Todo {
            id: Uuid::new_v4(),
            title: String::from(title),
            description: None,
            completed: false,
            priority: Default::default(),
            category: None,
            due_date: None,
            created_at: Utc::now(),
            recurring: None,
        }
    }

    fn draft(title: &str) -> NewTodo {
        NewTodo {
            title: String::from(title),
            ..Default::default()
        }
    }

    fn titles(todos: &[&Todo]) -> Vec<String> {
        todos.iter().map(|todo| todo.title.clone()).collect()
    }

    #[test]
    fn create_reconciles_by_correlation_key() {
        let mut engine = Engine::new();
        engine.replace_all(vec![todo("existing")]);

        let key = engine.stage_create(draft("new"));

        // optimistic entry is visible immediately, at the front
        assert_eq!(titles(&engine.visible()), ["new", "existing"]);

        let confirmed = todo("new");
        let server_id = confirmed.id;
        assert_eq!(engine.commit_create(key, confirmed), None);

        let visible = engine.visible();
        assert_eq!(visible[0].id, server_id);
        assert_eq!(titles(&visible), ["new", "existing"]);
    }

    #[test]
    fn failed_create_rolls_back() {
        let mut engine = Engine::new();

        let key = engine.stage_create(draft("doomed"));
        assert_eq!(engine.visible().len(), 1);

        engine.abort_create(key);
        assert!(engine.visible().is_empty());
    }

    #[test]
    fn delete_before_commit_cancels_and_reports_the_orphan() {
        let mut engine = Engine::new();

        let key = engine.stage_create(draft("racy"));
        let temp_id = engine.visible()[0].id;

        // the create has not resolved yet, so only local removal happens
        assert_eq!(engine.stage_delete(temp_id), Some(Removal::Pending));
        assert!(engine.visible().is_empty());

        // once the server confirms, the caller is told to delete the row
        let confirmed = todo("racy");
        let server_id = confirmed.id;
        assert_eq!(engine.commit_create(key, confirmed), Some(server_id));
        assert!(engine.visible().is_empty());
    }

    #[test]
    fn delete_of_confirmed_entry_is_remote() {
        let mut engine = Engine::new();
        let existing = todo("existing");
        let id = existing.id;
        engine.replace_all(vec![existing]);

        assert_eq!(engine.stage_delete(id), Some(Removal::Remote(id)));
        assert_eq!(engine.stage_delete(id), None);
    }

    #[test]
    fn toggle_merges_the_server_state() {
        let mut engine = Engine::new();
        let mut existing = todo("existing");
        let id = existing.id;
        engine.replace_all(vec![existing.clone()]);

        existing.completed = true;
        engine.apply_update(existing);

        assert!(engine.visible()[0].completed);
        assert_eq!(engine.visible()[0].id, id);
    }

    #[test]
    fn commit_after_push_replacement_is_a_no_op() {
        let mut engine = Engine::new();

        let key = engine.stage_create(draft("new"));

        // a push delivered the authoritative list before the create resolved
        let confirmed = todo("new");
        engine.replace_all(vec![confirmed.clone()]);

        assert_eq!(engine.commit_create(key, confirmed.clone()), None);
        assert_eq!(engine.visible().len(), 1);
        assert_eq!(engine.visible()[0].id, confirmed.id);
    }

    #[test]
    fn empty_filter_is_the_identity() {
        let mut engine = Engine::new();
        engine.replace_all(vec![todo("c"), todo("a"), todo("b")]);

        assert_eq!(titles(&engine.visible()), ["c", "a", "b"]);
    }

    #[test]
    fn search_matches_case_insensitive_substrings() {
        let mut engine = Engine::new();
        engine.replace_all(vec![todo("Buy milk"), todo("Buy bread")]);

        engine.set_search("milk");
        assert_eq!(titles(&engine.visible()), ["Buy milk"]);

        engine.set_search("BUY");
        assert_eq!(titles(&engine.visible()), ["Buy milk", "Buy bread"]);
    }

    #[test]
    fn date_filter_matches_the_calendar_day() {
        let mut engine = Engine::new();

        let mut due_today = todo("due today");
        due_today.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 0).unwrap());

        let mut due_later = todo("due later");
        due_later.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 15, 0, 1, 0).unwrap());

        let undated = todo("undated");

        engine.replace_all(vec![due_today, due_later, undated]);
        engine.set_due_filter(NaiveDate::from_ymd_opt(2026, 3, 14));

        assert_eq!(titles(&engine.visible()), ["due today"]);

        engine.set_due_filter(None);
        assert_eq!(engine.visible().len(), 3);
    }
}
