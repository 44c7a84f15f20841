use chrono::NaiveDate;
use ripple_api::v1::{Category, NewTodo, Todo};
use tracing::warn;
use uuid::Uuid;

use crate::{
    api::{Client, Subscription},
    engine::{Engine, Removal},
    voice::{self, VoiceCommand},
};

/// Ties the reconciliation engine to the network client. All mutation goes
/// through `&mut self`, so state changes apply one at a time.
pub struct Session {
    client: Client,
    engine: Engine,
    updates: Option<Subscription>,
}

impl Session {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            engine: Engine::new(),
            updates: None,
        }
    }

    /// Fetches the initial state wholesale and opens the push subscription.
    pub async fn initialize(&mut self) -> eyre::Result<()> {
        let todos = self.client.todos().await?;
        self.engine.replace_all(todos);

        let categories = self.client.categories().await?;
        self.engine.set_categories(categories);

        self.updates = Some(self.client.subscribe());

        Ok(())
    }

    /// Hands the subscription to the caller, for driving it from a select
    /// loop alongside other input.
    pub fn take_updates(&mut self) -> Option<Subscription> {
        self.updates.take()
    }

    /// Replaces local state with a pushed snapshot. Last message wins.
    pub fn apply_push(&mut self, todos: Vec<Todo>) {
        self.engine.replace_all(todos);
    }

    /// Optimistically inserts the draft, then reconciles it with the server
    /// response. On failure the optimistic entry is rolled back.
    pub async fn add_todo(&mut self, draft: NewTodo) -> eyre::Result<()> {
        let key = self.engine.stage_create(draft.clone());

        match self.client.create_todo(&draft).await {
            Ok(todo) => {
                if let Some(orphan) = self.engine.commit_create(key, todo) {
                    // the entry was deleted while the create was in flight
                    self.client.delete_todo(orphan).await?;
                }

                Ok(())
            }
            Err(err) => {
                self.engine.abort_create(key);
                warn!("create failed, rolled back optimistic entry: {err}");
                Err(err)
            }
        }
    }

    /// Toggles on the server and merges the authoritative result. Never a
    /// local flip, so a rejected or concurrently deleted entry cannot
    /// diverge.
    pub async fn toggle_todo(&mut self, id: Uuid) -> eyre::Result<()> {
        let todo = self.client.toggle_todo(id).await?;
        self.engine.apply_update(todo);

        Ok(())
    }

    pub async fn delete_todo(&mut self, id: Uuid) -> eyre::Result<()> {
        match self.engine.stage_delete(id) {
            Some(Removal::Remote(id)) => match self.client.delete_todo(id).await {
                Ok(_) => Ok(()),
                Err(err) => {
                    warn!("delete failed: {err}");
                    Err(err)
                }
            },
            // create still in flight; commit_create cleans up the server
            Some(Removal::Pending) => Ok(()),
            None => Ok(()),
        }
    }

    /// Parses and executes a voice transcript. The recognized command is
    /// returned either way so the caller can give feedback, including for
    /// [`VoiceCommand::Unrecognized`].
    pub async fn voice_command(&mut self, transcript: &str) -> eyre::Result<VoiceCommand> {
        let todos: Vec<Todo> = self.engine.todos().cloned().collect();
        let command = voice::parse(transcript, &todos);

        match &command {
            VoiceCommand::Add { title } => {
                let draft = NewTodo {
                    title: title.clone(),
                    ..Default::default()
                };

                self.add_todo(draft).await?;
            }
            VoiceCommand::Complete { id } => self.toggle_todo(*id).await?,
            VoiceCommand::Unrecognized => {}
        }

        Ok(command)
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.engine.set_search(search);
    }

    pub fn set_due_filter(&mut self, due: Option<NaiveDate>) {
        self.engine.set_due_filter(due);
    }

    /// The todos passing the current filters, in server order.
    pub fn visible(&self) -> Vec<&Todo> {
        self.engine.visible()
    }

    pub fn categories(&self) -> &[Category] {
        self.engine.categories()
    }
}
