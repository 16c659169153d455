use rspotify::ClientError;
use thiserror::Error;

/// Everything that can go wrong while extracting or saving songs
#[derive(Error, Debug)]
pub enum Error {
    /// Page data (browser rows) was not the expected JSON
    #[error("Failed to parse page data, error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Web API or OAuth failure
    #[error("Spotify error: {0}")]
    SpotifyError(#[from] ClientError),

    /// Missing or unusable settings or input
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The credentials file could not be parsed
    #[error("Credentials file error: {0}")]
    CredentialsError(#[from] dotenvy::Error),

    /// No browser installation or profile to reuse
    #[error("No usable browser: {0}")]
    NoUsableBrowser(String),

    /// Browser launch or DevTools failure
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// CSV serialization failure
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// File or console I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The source returned no songs where some were required
    #[error("No songs extracted")]
    NoSongsExtracted,
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
