use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::clients::errors::{Error, Result};

/// Redirect URI the Spotify app must have registered
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
/// Read-only access to the saved tracks library
pub const LIBRARY_READ_SCOPE: &str = "user-library-read";

const CLIENT_ID_KEY: &str = "SPOTIPY_CLIENT_ID";
const CLIENT_SECRET_KEY: &str = "SPOTIPY_CLIENT_SECRET";
const REDIRECT_URI_KEY: &str = "SPOTIPY_REDIRECT_URI";

const SETUP_INSTRUCTIONS: &str = "\
To use the Spotify Web API you need a (free) Spotify app:
  1. Go to https://developer.spotify.com/dashboard and log in
  2. Click 'Create App'
  3. Add the redirect URI http://127.0.0.1:8080/callback
  4. Check 'Web API', agree to the terms and save
  5. Open the app settings and copy the Client ID and Client Secret
";

/// OAuth application credentials, used once per run to obtain a token
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Spotify app client id
    pub client_id: String,
    /// Spotify app client secret
    pub client_secret: String,
    /// Redirect URI registered for the app
    pub redirect_uri: String,
    /// Space separated OAuth scopes
    pub scope: String,
}

impl Credentials {
    /// Credentials with the default redirect URI and the library read scope
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Credentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scope: LIBRARY_READ_SCOPE.to_string(),
        }
    }
}

// Keep the secret out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Where credentials are cached between runs
pub trait CredentialStore {
    /// Saved credentials, `None` if nothing usable is stored
    fn load(&self) -> Result<Option<Credentials>>;
    /// Persist credentials for the next run
    fn save(&self, credentials: &Credentials) -> Result<()>;
}

/// Interactive side of credential setup
pub trait Prompter {
    /// Display informational text to the user
    fn show(&mut self, text: &str);
    /// Ask for a value, returning the trimmed answer
    fn prompt(&mut self, label: &str) -> Result<String>;
}

/// Plaintext `KEY=value` file, `.env` by default
pub struct DotEnvStore {
    path: PathBuf,
}

impl DotEnvStore {
    /// Store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DotEnvStore { path: path.into() }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for DotEnvStore {
    fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            debug!("No credentials file found in {:?}", self.path);
            return Ok(None);
        }

        let mut client_id = String::new();
        let mut client_secret = String::new();
        let mut redirect_uri = None;
        for item in dotenvy::from_path_iter(&self.path)? {
            let (key, value) = item?;
            match key.as_str() {
                CLIENT_ID_KEY => client_id = value.trim().to_string(),
                CLIENT_SECRET_KEY => client_secret = value.trim().to_string(),
                REDIRECT_URI_KEY => redirect_uri = Some(value.trim().to_string()),
                _ => {}
            }
        }

        if client_id.is_empty() || client_secret.is_empty() {
            debug!("Credentials file {:?} is missing the client id or secret", self.path);
            return Ok(None);
        }

        let mut credentials = Credentials::new(client_id, client_secret);
        if let Some(uri) = redirect_uri.filter(|u| !u.is_empty()) {
            credentials.redirect_uri = uri;
        }
        Ok(Some(credentials))
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        let contents = format!(
            "{CLIENT_ID_KEY}={}\n{CLIENT_SECRET_KEY}={}\n{REDIRECT_URI_KEY}={}\n",
            credentials.client_id, credentials.client_secret, credentials.redirect_uri
        );
        std::fs::write(&self.path, contents)?;
        debug!("Stored credentials in {:?}", self.path);
        Ok(())
    }
}

/// Prompts on stdout and reads answers from stdin
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn show(&mut self, text: &str) {
        println!("{text}");
    }

    fn prompt(&mut self, label: &str) -> Result<String> {
        print!("{label}: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(Error::ConfigurationError(format!(
                "input closed while waiting for {label}"
            )));
        }
        Ok(line.trim().to_string())
    }
}

fn prompt_non_empty<P: Prompter>(prompter: &mut P, label: &str) -> Result<String> {
    loop {
        let answer = prompter.prompt(label)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
        prompter.show(&format!("{label} cannot be empty. Please try again."));
    }
}

/// Reuse stored credentials, or ask for them and store them before returning
pub fn acquire_credentials<S, P>(store: &S, prompter: &mut P) -> Result<Credentials>
where
    S: CredentialStore,
    P: Prompter,
{
    match store.load() {
        Ok(Some(credentials)) => {
            info!("Using existing credentials");
            return Ok(credentials);
        }
        Ok(None) => {}
        // An unreadable file is treated as absent, it gets rewritten below
        Err(e) => warn!("Error reading saved credentials: {e}"),
    }

    prompter.show(SETUP_INSTRUCTIONS);
    let client_id = prompt_non_empty(prompter, "Client ID")?;
    let client_secret = prompt_non_empty(prompter, "Client Secret")?;

    let credentials = Credentials::new(client_id, client_secret);
    store.save(&credentials)?;
    info!("Credentials saved");
    Ok(credentials)
}
