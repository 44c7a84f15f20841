mod auth;
mod v1;

use std::{collections::HashMap, fs, io, net::SocketAddr, path::PathBuf, sync::Arc};

use ripple_api::v1::{Category, Todo};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, Mutex},
    time,
};
use uuid::Uuid;

#[derive(Parser, Debug)]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0:7890")]
    addr: SocketAddr,

    /// Path to the data file.
    #[arg(long, default_value = "data.ron")]
    data: PathBuf,

    /// TLS certificate in PEM format. Served over plain HTTP when absent.
    #[arg(long, requires = "key")]
    cert: Option<PathBuf>,

    /// TLS private key in PEM format.
    #[arg(long, requires = "cert")]
    key: Option<PathBuf>,

    /// Session entry as TOKEN:USER_UUID, may be repeated.
    #[arg(long = "session", value_parser = parse_session)]
    sessions: Vec<(String, Uuid)>,
}

fn parse_session(arg: &str) -> Result<(String, Uuid), String> {
    let (token, user) = arg
        .split_once(':')
        .ok_or_else(|| String::from("expected TOKEN:USER_UUID"))?;

    let user = user.parse().map_err(|err| format!("invalid user id: {err}"))?;

    Ok((token.to_string(), user))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let sessions = args.sessions.into_iter().collect();
    let state = Arc::new(AppState::load(args.data, sessions)?);

    tokio::spawn({
        let state = state.clone();
        async move {
            loop {
                time::sleep(time::Duration::from_secs(300)).await;
                if let Err(err) = state.flush().await {
                    tracing::error!("Failed to store data: {:?}", err);
                }
            }
        }
    });

    let app = Router::new()
        .nest("/api/v1", v1::router())
        .with_state(state);

    match (args.cert, args.key) {
        (Some(cert), Some(key)) => {
            let config = RustlsConfig::from_pem_file(cert, key).await?;

            axum_server::bind_rustls(args.addr, config)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            axum_server::bind(args.addr)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}

/// A stored todo together with its owning user. The owner never leaves the
/// server; only the inner [`Todo`] goes on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnedTodo {
    pub owner: Uuid,
    pub todo: Todo,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnedCategory {
    pub owner: Uuid,
    pub category: Category,
}

#[derive(Default, Debug)]
pub struct Store {
    pub todos: HashMap<Uuid, OwnedTodo>,
    pub categories: HashMap<Uuid, OwnedCategory>,
}

#[derive(Debug)]
pub struct AppState {
    /// Bearer token to user id, fixed at startup.
    pub sessions: HashMap<String, Uuid>,
    /// Fired after every store mutation, drives the event streams.
    pub changes: broadcast::Sender<()>,
    pub store: Mutex<Store>,
    data_file: PathBuf,
}

impl AppState {
    pub fn load(data_file: PathBuf, sessions: HashMap<String, Uuid>) -> eyre::Result<Self> {
        let (changes, _) = broadcast::channel(16);

        let store = match fs::File::open(&data_file) {
            Ok(file) => {
                let data: DataOwned = ron::de::from_reader(file)?;

                match data {
                    DataOwned::V1 { todos, categories } => Store { todos, categories },
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Store::default(),
            Err(err) => eyre::bail!(err),
        };

        Ok(Self {
            sessions,
            changes,
            store: Mutex::new(store),
            data_file,
        })
    }

    pub fn notify(&self) {
        // nobody listening is fine
        let _ = self.changes.send(());
    }

    pub async fn flush(&self) -> eyre::Result<()> {
        let store = self.store.lock().await;
        let data = DataBorrowed::V1 {
            todos: &store.todos,
            categories: &store.categories,
        };

        let file = fs::File::create(&self.data_file)?;
        let mut ser = ron::Serializer::new(file, Some(Default::default()))?;
        data.serialize(&mut ser)?;

        Ok(())
    }
}

#[derive(Serialize)]
enum DataBorrowed<'a> {
    V1 {
        todos: &'a HashMap<Uuid, OwnedTodo>,
        categories: &'a HashMap<Uuid, OwnedCategory>,
    },
}

#[derive(Deserialize)]
enum DataOwned {
    V1 {
        todos: HashMap<Uuid, OwnedTodo>,
        categories: HashMap<Uuid, OwnedCategory>,
    },
}
