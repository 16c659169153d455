//! Rliked - Export Spotify liked songs to CSV
//!
//! Songs are read either through the Spotify Web API (OAuth, offset
//! pagination) or by driving the web client in a local browser, then written
//! to CSV files.

/// Client modules for the Web API, the browser, credentials and CSV output
pub mod clients;
/// Fetch-then-write pipeline shared by every song source
pub mod export;
