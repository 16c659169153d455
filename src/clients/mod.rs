/// Liked songs scraped from the web client in a local browser
pub mod browser;
/// App credentials, their file store and interactive prompting
pub mod credentials;
/// Song records and collections
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// CSV output files
pub mod local_storage;
/// Spotify Web API client
pub mod spotify;

pub use browser::BrowserClient;
pub use credentials::{DotEnvStore, StdinPrompter};
pub use spotify::SpotifyClient;
