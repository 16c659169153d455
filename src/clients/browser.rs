//! Liked songs scraped from the Spotify web client.
//!
//! A real Chromium-family browser is launched on the user's existing profile so
//! the logged-in session is reused. The liked songs list is virtualized, so the
//! page is scrolled until its scroll position stops moving before rows are read.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};

use crate::{
    clients::{
        entities::{Song, SongCollection},
        errors::{Error, Result},
    },
    export::SongSource,
};

/// The liked songs collection in the web client
pub const LIKED_SONGS_URL: &str = "https://open.spotify.com/collection/tracks";

/// Profile directories tried inside a user data dir, in order
pub const PROFILE_NAMES: &[&str] = &["Default", "Profile 1", "Profile 2"];

// Scroll node enclosing the track list, not the sidebar's; fall back to the document scroller
const SCROLL_CONTAINER_JS: &str = "(document.querySelector('[data-testid=\"tracklist-row\"]')\
    ?.closest('[data-overlayscrollbars-viewport]') || document.scrollingElement)";

// Stock launch flags that swap the OS keychain for a fake one. The profile's
// cookies are encrypted with the real keychain key, so the session would be lost.
const KEYCHAIN_OVERRIDE_ARGS: &[&str] = &["--password-store=basic", "--use-mock-keychain"];

const ROW_CELLS_JS: &str = r#"JSON.stringify(
    Array.from(document.querySelectorAll('[data-testid="tracklist-row"]')).map(row =>
        Array.from(row.querySelectorAll('[data-testid="cell-inner-text"]')).map(c => c.innerText || '')
    )
)"#;

/// Timing and bounds for the scroll-until-stable loop
#[derive(Debug, Clone)]
pub struct ScrollSettings {
    /// Pixels scrolled per step
    pub step: i64,
    /// Pause after each scroll before reading the position
    pub delay: Duration,
    /// Pause after navigation to let the first rows render
    pub settle_delay: Duration,
    /// Safety bound on scroll steps
    pub max_iterations: usize,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        ScrollSettings {
            step: 10_000,
            delay: Duration::from_secs(1),
            settle_delay: Duration::from_secs(5),
            max_iterations: 500,
        }
    }
}

/// The few page operations the extractor needs
pub trait ScrollablePage {
    /// Scroll the list container down by `dy` pixels
    fn scroll_by(&self, dy: i64) -> Result<()>;
    /// Current scroll offset of the list container
    fn scroll_position(&self) -> Result<i64>;
    /// Text of each cell for every rendered row, in DOM order
    fn row_cells(&self) -> Result<Vec<Vec<String>>>;
}

/// How a scroll-until-stable run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    /// Scroll steps performed
    pub iterations: usize,
    /// True when two consecutive reads matched
    pub stabilized: bool,
}

/// Scroll until two consecutive position reads are equal, at most
/// `max_iterations` times. Page errors stop the loop without failing.
pub fn scroll_until_stable<P: ScrollablePage>(page: &P, settings: &ScrollSettings) -> ScrollOutcome {
    let mut previous = 0;

    for iteration in 1..=settings.max_iterations {
        if let Err(e) = page.scroll_by(settings.step) {
            warn!("Scrolling failed, keeping rows rendered so far: {e}");
            return ScrollOutcome {
                iterations: iteration,
                stabilized: false,
            };
        }
        thread::sleep(settings.delay);

        let current = match page.scroll_position() {
            Ok(position) => position,
            Err(e) => {
                warn!("Reading scroll position failed, keeping rows rendered so far: {e}");
                return ScrollOutcome {
                    iterations: iteration,
                    stabilized: false,
                };
            }
        };
        debug!("Scroll step {iteration}: position {current}");

        if current == previous {
            return ScrollOutcome {
                iterations: iteration,
                stabilized: true,
            };
        }
        previous = current;
    }

    warn!(
        "Scroll position still moving after {} steps, giving up",
        settings.max_iterations
    );
    ScrollOutcome {
        iterations: settings.max_iterations,
        stabilized: false,
    }
}

/// One song per row: first cell is the title, then artist, then album.
/// Missing cells become empty strings.
pub fn rows_to_songs(rows: Vec<Vec<String>>) -> Vec<Song> {
    rows.into_iter()
        .map(|row| {
            let mut cells = row.into_iter();
            let title = cells.next().unwrap_or_default();
            let artist = cells.next().unwrap_or_default();
            let album = cells.next().unwrap_or_default();
            Song::new(title, artist, album)
        })
        .collect()
}

/// Load the whole list and read every rendered row
pub fn collect_songs<P: ScrollablePage>(page: &P, settings: &ScrollSettings) -> SongCollection {
    let outcome = scroll_until_stable(page, settings);
    debug!("Scrolling finished: {outcome:?}");

    let rows = match page.row_cells() {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Could not read rows: {e}");
            return SongCollection::partial(Vec::new());
        }
    };

    let songs = rows_to_songs(rows);
    if outcome.stabilized {
        SongCollection::complete(songs)
    } else {
        SongCollection::partial(songs)
    }
}

/// A browser installation and the user data directory it writes to
#[derive(Debug, Clone)]
pub struct Installation {
    /// Browser executable
    pub executable: PathBuf,
    /// Directory holding the browser's profiles
    pub user_data_dir: PathBuf,
}

impl Installation {
    fn new(executable: impl Into<PathBuf>, user_data_dir: PathBuf) -> Self {
        Installation {
            executable: executable.into(),
            user_data_dir,
        }
    }
}

/// An existing profile and the executable that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserProfile {
    /// User data directory passed to the browser
    pub user_data_dir: PathBuf,
    /// Profile directory name inside `user_data_dir`
    pub profile_name: String,
    /// Browser executable
    pub executable: PathBuf,
}

/// Well-known Chrome, Chromium and Brave install locations for this platform
pub fn known_installations() -> Vec<Installation> {
    let Some(config) = dirs::config_dir() else {
        return Vec::new();
    };

    if cfg!(target_os = "macos") {
        vec![
            Installation::new(
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                config.join("Google/Chrome"),
            ),
            Installation::new(
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
                config.join("Chromium"),
            ),
            Installation::new(
                "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
                config.join("BraveSoftware/Brave-Browser"),
            ),
        ]
    } else if cfg!(target_os = "windows") {
        let local = dirs::data_local_dir().unwrap_or(config);
        vec![
            Installation::new(
                r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                local.join(r"Google\Chrome\User Data"),
            ),
            Installation::new(
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                local.join(r"Google\Chrome\User Data"),
            ),
            Installation::new(
                r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
                local.join(r"BraveSoftware\Brave-Browser\User Data"),
            ),
        ]
    } else {
        vec![
            Installation::new("/usr/bin/google-chrome", config.join("google-chrome")),
            Installation::new("/usr/bin/google-chrome-stable", config.join("google-chrome")),
            Installation::new("/usr/bin/chromium", config.join("chromium")),
            Installation::new("/usr/bin/chromium-browser", config.join("chromium")),
            Installation::new("/usr/bin/brave-browser", config.join("BraveSoftware/Brave-Browser")),
        ]
    }
}

/// First installation whose executable exists and whose user data dir holds
/// one of `profile_names`, trying names in order for each installation.
pub fn find_profile_in(
    installations: &[Installation],
    profile_names: &[&str],
) -> Result<BrowserProfile> {
    let installed: Vec<&Installation> = installations
        .iter()
        .filter(|i| i.executable.is_file())
        .collect();

    if installed.is_empty() {
        return Err(Error::NoUsableBrowser(
            "no supported browser installation found".into(),
        ));
    }

    for installation in installed {
        for name in profile_names {
            if installation.user_data_dir.join(name).is_dir() {
                debug!(
                    "Using profile {name:?} in {:?} with {:?}",
                    installation.user_data_dir, installation.executable
                );
                return Ok(BrowserProfile {
                    user_data_dir: installation.user_data_dir.clone(),
                    profile_name: (*name).to_string(),
                    executable: installation.executable.clone(),
                });
            }
        }
    }

    Err(Error::NoUsableBrowser(
        "browser installed but no user profile found".into(),
    ))
}

/// Locate a local browser profile to reuse the logged-in session
pub fn locate_profile() -> Result<BrowserProfile> {
    find_profile_in(&known_installations(), PROFILE_NAMES)
}

fn browser_error(e: impl std::fmt::Display) -> Error {
    Error::BrowserError(e.to_string())
}

/// A tab driven through the Chrome DevTools protocol
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    /// Wrap an open tab
    pub fn new(tab: Arc<Tab>) -> Self {
        ChromePage { tab }
    }

    fn evaluate(&self, expression: &str) -> Result<Option<serde_json::Value>> {
        let object = self.tab.evaluate(expression, false).map_err(browser_error)?;
        Ok(object.value)
    }
}

impl ScrollablePage for ChromePage {
    fn scroll_by(&self, dy: i64) -> Result<()> {
        self.evaluate(&format!("{SCROLL_CONTAINER_JS}.scrollBy(0, {dy})"))?;
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn scroll_position(&self) -> Result<i64> {
        let value = self.evaluate(&format!("{SCROLL_CONTAINER_JS}.scrollTop"))?;
        value
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .map(|top| top.round() as i64)
            .ok_or_else(|| Error::BrowserError(format!("unexpected scrollTop value: {value:?}")))
    }

    fn row_cells(&self) -> Result<Vec<Vec<String>>> {
        let value = self.evaluate(ROW_CELLS_JS)?;
        match value {
            Some(serde_json::Value::String(json)) => Ok(serde_json::from_str(&json)?),
            other => Err(Error::BrowserError(format!(
                "unexpected row data: {other:?}"
            ))),
        }
    }
}

fn launch_options<'a>(profile: &BrowserProfile, profile_arg: &'a OsStr) -> Result<LaunchOptions<'a>> {
    LaunchOptions::default_builder()
        .headless(false)
        .path(Some(profile.executable.clone()))
        .user_data_dir(Some(profile.user_data_dir.clone()))
        .window_size(Some((1280, 800)))
        .idle_browser_timeout(Duration::from_secs(600))
        .args(vec![profile_arg])
        .ignore_default_args(KEYCHAIN_OVERRIDE_ARGS.iter().map(OsStr::new).collect())
        .build()
        .map_err(browser_error)
}

/// Open the liked songs page in a browser using `profile` and read every row.
///
/// Only launch failures are errors; a failed navigation yields an empty
/// collection. The browser process is killed when `browser` is dropped, on
/// every return path.
pub fn extract_liked_songs(profile: &BrowserProfile, settings: &ScrollSettings) -> Result<SongCollection> {
    let profile_arg = OsString::from(format!("--profile-directory={}", profile.profile_name));
    let options = launch_options(profile, &profile_arg)?;

    // Chrome 136+ refuses remote debugging on its own default data directory
    let browser = Browser::new(options).map_err(|e| {
        Error::BrowserError(format!(
            "{e}. Close every window of the browser first; recent Chrome versions also refuse \
             automation of their default profile directory {:?}",
            profile.user_data_dir
        ))
    })?;
    let tab = browser.new_tab().map_err(browser_error)?;

    info!("Opening {LIKED_SONGS_URL} ...");
    if let Err(e) = tab
        .navigate_to(LIKED_SONGS_URL)
        .and_then(|t| t.wait_until_navigated())
    {
        warn!("Navigation failed: {e}");
        return Ok(SongCollection::partial(Vec::new()));
    }
    thread::sleep(settings.settle_delay);

    let page = ChromePage::new(tab);
    let collection = collect_songs(&page, settings);
    info!("Found {} rows in the liked songs list", collection.len());
    Ok(collection)
}

/// Browser-driven song source
pub struct BrowserClient {
    profile: BrowserProfile,
    settings: ScrollSettings,
}

impl BrowserClient {
    /// Source that will launch the browser owning `profile`
    pub fn new(profile: BrowserProfile, settings: ScrollSettings) -> Self {
        BrowserClient { profile, settings }
    }

    /// User data directory the browser is launched with
    pub fn user_data_dir(&self) -> &Path {
        &self.profile.user_data_dir
    }
}

impl SongSource for BrowserClient {
    fn name(&self) -> &str {
        "Spotify web client"
    }

    async fn fetch(&self) -> Result<SongCollection> {
        let profile = self.profile.clone();
        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || extract_liked_songs(&profile, &settings))
            .await
            .map_err(browser_error)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FakePage {
        positions: Vec<i64>,
        reads: Cell<usize>,
        scrolls: Cell<usize>,
        rows: RefCell<Option<Vec<Vec<String>>>>,
    }

    impl FakePage {
        fn new(positions: &[i64]) -> Self {
            FakePage {
                positions: positions.to_vec(),
                reads: Cell::new(0),
                scrolls: Cell::new(0),
                rows: RefCell::new(Some(Vec::new())),
            }
        }
    }

    impl ScrollablePage for FakePage {
        fn scroll_by(&self, _dy: i64) -> Result<()> {
            self.scrolls.set(self.scrolls.get() + 1);
            Ok(())
        }

        fn scroll_position(&self) -> Result<i64> {
            let i = self.reads.get();
            self.reads.set(i + 1);
            self.positions
                .get(i)
                .copied()
                .ok_or_else(|| Error::BrowserError("page closed".into()))
        }

        fn row_cells(&self) -> Result<Vec<Vec<String>>> {
            self.rows
                .borrow_mut()
                .take()
                .ok_or_else(|| Error::BrowserError("no rows".into()))
        }
    }

    fn instant(max_iterations: usize) -> ScrollSettings {
        ScrollSettings {
            step: 10_000,
            delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            max_iterations,
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn test_scroll_stops_when_position_repeats() {
        let positions = [800, 1600, 2400, 2400];
        for k in positions.len()..positions.len() + 3 {
            let page = FakePage::new(&positions);
            let outcome = scroll_until_stable(&page, &instant(k));
            assert!(outcome.stabilized);
            assert!(outcome.iterations <= k);
            assert_eq!(outcome.iterations, 4);
            assert_eq!(page.scrolls.get(), 4);
        }
    }

    #[test]
    fn test_scroll_unscrollable_page_stops_at_once() {
        let page = FakePage::new(&[0]);
        let outcome = scroll_until_stable(&page, &instant(10));
        assert_eq!(
            outcome,
            ScrollOutcome {
                iterations: 1,
                stabilized: true
            }
        );
    }

    #[test]
    fn test_scroll_is_bounded() {
        let positions: Vec<i64> = (1..=100).map(|i| i * 1000).collect();
        let page = FakePage::new(&positions);
        let outcome = scroll_until_stable(&page, &instant(5));
        assert_eq!(
            outcome,
            ScrollOutcome {
                iterations: 5,
                stabilized: false
            }
        );
        assert_eq!(page.scrolls.get(), 5);
    }

    #[test]
    fn test_scroll_read_failure_stops_loop() {
        let page = FakePage::new(&[500]);
        let outcome = scroll_until_stable(&page, &instant(10));
        assert_eq!(outcome.iterations, 2);
        assert!(!outcome.stabilized);
    }

    #[test]
    fn test_rows_to_songs_fills_missing_cells() {
        let songs = rows_to_songs(vec![
            row(&["Title 1", "Artist 1", "Album 1"]),
            row(&["Title 2"]),
            row(&[]),
            row(&["Title 4", "A, B", "Album 4", "3:12"]),
        ]);

        assert_eq!(songs.len(), 4);
        assert_eq!(songs[0], Song::new("Title 1", "Artist 1", "Album 1"));
        assert_eq!(songs[1], Song::new("Title 2", "", ""));
        assert_eq!(songs[2], Song::new("", "", ""));
        assert_eq!(songs[3], Song::new("Title 4", "A, B", "Album 4"));
    }

    #[test]
    fn test_collect_songs_keeps_dom_order() {
        let page = FakePage::new(&[100, 100]);
        *page.rows.borrow_mut() = Some(vec![row(&["B", "x", "y"]), row(&["A", "x", "y"])]);

        let collection = collect_songs(&page, &instant(10));

        assert!(collection.complete);
        let titles: Vec<_> = collection.songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn test_collect_songs_row_failure_is_empty() {
        let page = FakePage::new(&[0]);
        *page.rows.borrow_mut() = None;

        let collection = collect_songs(&page, &instant(10));

        assert!(collection.is_empty());
        assert!(!collection.complete);
    }

    fn profile() -> BrowserProfile {
        BrowserProfile {
            user_data_dir: PathBuf::from("/home/me/.config/google-chrome"),
            profile_name: "Default".into(),
            executable: PathBuf::from("/usr/bin/google-chrome"),
        }
    }

    #[test]
    fn test_launch_keeps_real_keychain() {
        let arg = OsString::from("--profile-directory=Default");
        let options = launch_options(&profile(), &arg).unwrap();

        assert!(
            options
                .ignore_default_args
                .contains(&OsStr::new("--password-store=basic"))
        );
        assert!(
            options
                .ignore_default_args
                .contains(&OsStr::new("--use-mock-keychain"))
        );
        assert_eq!(options.args, vec![arg.as_os_str()]);
        assert_eq!(options.user_data_dir, Some(profile().user_data_dir));
        assert!(!options.headless);
    }

    #[test]
    fn test_scroll_container_follows_track_list() {
        assert!(SCROLL_CONTAINER_JS.starts_with("(document.querySelector('[data-testid=\"tracklist-row\"]')"));
        assert!(SCROLL_CONTAINER_JS.contains(".closest('[data-overlayscrollbars-viewport]')"));
        assert!(SCROLL_CONTAINER_JS.ends_with("|| document.scrollingElement)"));
    }

    #[test]
    fn test_find_profile_prefers_first_name() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("chrome");
        std::fs::write(&exe, "").unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(data.join("Profile 1")).unwrap();
        std::fs::create_dir_all(data.join("Default")).unwrap();

        let profile = find_profile_in(
            &[Installation::new(&exe, data.clone())],
            PROFILE_NAMES,
        )
        .unwrap();

        assert_eq!(profile.profile_name, "Default");
        assert_eq!(profile.user_data_dir, data);
        assert_eq!(profile.executable, exe);
    }

    #[test]
    fn test_find_profile_skips_missing_installations() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("brave");
        std::fs::write(&exe, "").unwrap();
        let data = dir.path().join("brave-data");
        std::fs::create_dir_all(data.join("Profile 2")).unwrap();

        let profile = find_profile_in(
            &[
                Installation::new(dir.path().join("missing-chrome"), dir.path().join("chrome-data")),
                Installation::new(&exe, data),
            ],
            PROFILE_NAMES,
        )
        .unwrap();

        assert_eq!(profile.profile_name, "Profile 2");
        assert_eq!(profile.executable, exe);
    }

    #[test]
    fn test_find_profile_without_browser() {
        let dir = tempfile::tempdir().unwrap();
        let result = find_profile_in(
            &[Installation::new(dir.path().join("chrome"), dir.path().to_path_buf())],
            PROFILE_NAMES,
        );
        assert!(matches!(result, Err(Error::NoUsableBrowser(_))));
    }

    #[test]
    fn test_find_profile_without_profile() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("chrome");
        std::fs::write(&exe, "").unwrap();

        let result = find_profile_in(
            &[Installation::new(&exe, dir.path().join("empty"))],
            PROFILE_NAMES,
        );
        assert!(matches!(result, Err(Error::NoUsableBrowser(_))));
    }
}
