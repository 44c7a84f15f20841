use futures::StreamExt;
use ripple_api::v1::{Category, NewTodo, Todo};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

/// HTTP client for the todo service. Non-2xx responses become errors via
/// `error_for_status`.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl Client {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into(),
            token: token.into(),
        }
    }

    pub async fn todos(&self) -> eyre::Result<Vec<Todo>> {
        let response = self
            .http
            .get(format!("{}/todos", self.base))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    pub async fn create_todo(&self, draft: &NewTodo) -> eyre::Result<Todo> {
        let response = self
            .http
            .post(format!("{}/todos", self.base))
            .bearer_auth(&self.token)
            .json(draft)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    pub async fn toggle_todo(&self, id: Uuid) -> eyre::Result<Todo> {
        let response = self
            .http
            .patch(format!("{}/todos/{}", self.base, id))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    pub async fn delete_todo(&self, id: Uuid) -> eyre::Result<Todo> {
        let response = self
            .http
            .delete(format!("{}/todos/{}", self.base, id))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    pub async fn categories(&self) -> eyre::Result<Vec<Category>> {
        let response = self
            .http
            .get(format!("{}/categories", self.base))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Opens the server push stream. Every message is the caller's full todo
    /// list; the local state is replaced wholesale with each one.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let http = self.http.clone();
        let url = format!("{}/todos/events", self.base);
        let token = self.token.clone();

        let task = tokio::spawn(async move {
            if let Err(err) = run_events(http, url, token, tx).await {
                tracing::warn!("push subscription ended: {err}");
            }
        });

        Subscription { rx, task }
    }
}

/// A live push subscription. Dropping it closes the connection.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Vec<Todo>>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// The next pushed snapshot, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Vec<Todo>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_events(
    http: reqwest::Client,
    url: String,
    token: String,
    tx: mpsc::UnboundedSender<Vec<Todo>>,
) -> eyre::Result<()> {
    let response = http
        .get(url)
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?;

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        // events are separated by a blank line
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();

            for line in frame.lines() {
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };

                match serde_json::from_str(data.trim_start()) {
                    Ok(todos) => {
                        if tx.send(todos).is_err() {
                            return Ok(());
                        }
                    }
                    Err(err) => tracing::warn!("malformed push frame: {err}"),
                }
            }
        }
    }

    Ok(())
}
