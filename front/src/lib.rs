pub mod api;
pub mod engine;
pub mod session;
pub mod voice;

pub use api::{Client, Subscription};
pub use session::Session;
pub use voice::VoiceCommand;
