use log::{error, info};
use rliked::clients::{
    BrowserClient, DotEnvStore, SpotifyClient,
    browser::{ScrollSettings, locate_profile},
    credentials::{Prompter, acquire_credentials},
    errors::{Error, Result},
    local_storage::{CsvLayout, CsvTarget},
};
use rliked::export::{ExportPlan, export};
use std::path::PathBuf;

const BROWSER_OUTPUT: &str = "spotify_liked_songs.csv";
const API_BASIC_OUTPUT: &str = "spotify_liked_songs_api.csv";
const API_DETAILED_OUTPUT: &str = "spotify_liked_songs_detailed.csv";

// Configuration for both extraction paths
pub struct Config {
    pub credentials_path: PathBuf,
    pub token_cache_path: PathBuf,
    pub api_output_dir: PathBuf,
    pub browser_output: PathBuf,
    pub scroll: ScrollSettings,
}

pub struct ConfigBuilder {
    api_output_dir: Option<PathBuf>,
    max_scrolls: Option<usize>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            api_output_dir: None, // Current working directory
            max_scrolls: None,
        }
    }

    pub fn api_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.api_output_dir = dir;
        self
    }

    pub fn max_scrolls(mut self, max_scrolls: Option<usize>) -> Self {
        self.max_scrolls = max_scrolls;
        self
    }

    pub fn build(self) -> Result<Config> {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::ConfigurationError("Could not determine the home directory".into())
        })?;

        let mut scroll = ScrollSettings::default();
        if let Some(max) = self.max_scrolls {
            scroll.max_iterations = max;
        }

        Ok(Config {
            credentials_path: PathBuf::from(".env"),
            token_cache_path: PathBuf::from(".spotify_cache"),
            api_output_dir: self.api_output_dir.unwrap_or_default(),
            browser_output: home.join("Downloads").join(BROWSER_OUTPUT),
            scroll,
        })
    }
}

// Credentials -> authorized client -> songs -> CSV files.
// Returns false on any fatal step, after logging why.
pub async fn run_api<P: Prompter>(config: &Config, prompter: &mut P) -> bool {
    info!("Setting up Spotify API credentials ...");
    let store = DotEnvStore::new(&config.credentials_path);
    let credentials = match acquire_credentials(&store, prompter) {
        Ok(c) => c,
        Err(e) => {
            error!("Error setting up credentials: {e}");
            return false;
        }
    };

    info!("Authenticating with Spotify ...");
    let spotify = SpotifyClient::from_credentials(&credentials, config.token_cache_path.clone());
    if let Err(e) = spotify.authorize_client().await {
        error!("Authentication failed: {e}");
        error!("Make sure your Client ID and Client Secret are correct and try again");
        return false;
    }

    let plan = ExportPlan {
        targets: vec![
            CsvTarget::new(config.api_output_dir.join(API_BASIC_OUTPUT), CsvLayout::Basic),
            CsvTarget::new(
                config.api_output_dir.join(API_DETAILED_OUTPUT),
                CsvLayout::Detailed,
            ),
        ],
        allow_empty: false,
    };

    match export(&spotify, &plan).await {
        Ok(report) if report.succeeded() => {
            for path in &report.written {
                info!("Saved: {}", absolute(path).display());
            }
            info!("Total songs extracted: {}", report.songs);
            true
        }
        Ok(_) => {
            error!("Failed to save songs!");
            false
        }
        Err(e) => {
            error!("Extraction failed: {e}");
            false
        }
    }
}

// Profile lookup -> browser scrape -> one CSV in ~/Downloads.
// An empty list still produces a header-only file.
pub async fn run_browser(config: &Config) -> bool {
    let profile = match locate_profile() {
        Ok(p) => p,
        Err(e) => {
            error!("{e}");
            return false;
        }
    };

    let browser = BrowserClient::new(profile, config.scroll.clone());
    info!("Using browser profile in {:?}", browser.user_data_dir());

    let plan = ExportPlan {
        targets: vec![CsvTarget::new(&config.browser_output, CsvLayout::Basic)],
        allow_empty: true,
    };

    match export(&browser, &plan).await {
        Ok(report) if report.succeeded() => {
            info!(
                "Saved {} liked songs to: {}",
                report.songs,
                config.browser_output.display()
            );
            true
        }
        Ok(_) => {
            error!("Failed to save songs!");
            false
        }
        Err(e) => {
            error!("Extraction failed: {e}");
            false
        }
    }
}

fn absolute(path: &std::path::Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
