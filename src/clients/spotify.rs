use std::{future::Future, path::PathBuf};

use log::{debug, info, warn};

use crate::{
    clients::{
        credentials::Credentials,
        entities::{Song, SongCollection, SongDetails, join_artists},
        errors::Result,
    },
    export::SongSource,
};
use rspotify::{
    AuthCodeSpotify, Config, Credentials as OAuthCredentials, OAuth, model::SavedTrack,
    prelude::*,
};

/// Largest page the saved tracks endpoint accepts
pub const PAGE_SIZE: u32 = 50;

impl From<SavedTrack> for Song {
    fn from(f: SavedTrack) -> Song {
        let track = f.track;
        // Local files have no id and no external url
        let details = SongDetails {
            added_at: f.added_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            external_id: track.id.map(|id| id.id().to_string()).unwrap_or_default(),
            external_url: track
                .external_urls
                .get("spotify")
                .cloned()
                .unwrap_or_default(),
        };
        Song::new(
            track.name,
            join_artists(track.artists.iter().map(|a| a.name.as_str())),
            track.album.name,
        )
        .with_details(details)
    }
}

/// One page of the current user's saved tracks
pub trait SavedTracksApi {
    /// Fetch up to `limit` songs starting at `offset`
    fn saved_tracks_page(&self, limit: u32, offset: u32) -> impl Future<Output = Result<Vec<Song>>>;
}

/// Walk the saved tracks with offset pagination.
///
/// Stops on an empty page or on a page shorter than `page_size`. A failed
/// request ends the walk early and keeps the songs gathered so far.
pub async fn fetch_saved_songs<A: SavedTracksApi>(api: &A, page_size: u32) -> SongCollection {
    let mut songs: Vec<Song> = Vec::new();
    let mut offset = 0;

    loop {
        debug!("Fetching songs {}-{} ...", offset + 1, offset + page_size);
        let page = match api.saved_tracks_page(page_size, offset).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    "Error fetching songs at offset {offset}: {e}. Keeping {} songs fetched so far",
                    songs.len()
                );
                return SongCollection::partial(songs);
            }
        };

        if page.is_empty() {
            break;
        }

        let fetched = page.len();
        songs.extend(page);
        if fetched < page_size as usize {
            break;
        }
        offset += page_size;

        if songs.len() % 500 == 0 {
            info!("Found {} songs so far ...", songs.len());
        }
    }

    SongCollection::complete(songs)
}

/// Authorization-code client for the Spotify Web API
pub struct SpotifyClient {
    /// Underlying rspotify client
    pub spotify: AuthCodeSpotify,
    page_size: u32,
}

impl SpotifyClient {
    /// Wrap an already configured rspotify client
    pub fn new(spotify: AuthCodeSpotify) -> Self {
        SpotifyClient {
            spotify,
            page_size: PAGE_SIZE,
        }
    }

    /// Build a client from app credentials, caching the token at `cache_path`
    pub fn from_credentials(credentials: &Credentials, cache_path: PathBuf) -> Self {
        let creds = OAuthCredentials::new(&credentials.client_id, &credentials.client_secret);
        let oauth = OAuth {
            redirect_uri: credentials.redirect_uri.clone(),
            scopes: credentials
                .scope
                .split_whitespace()
                .map(str::to_owned)
                .collect(),
            ..Default::default()
        };

        let spotify = AuthCodeSpotify::with_config(
            creds,
            oauth,
            Config {
                token_cached: true,
                cache_path,
                ..Default::default()
            },
        );

        Self::new(spotify)
    }

    /// Authorize via CLI prompt and OAuth flow, then verify the token against
    /// the profile endpoint. A valid cached token skips the consent step.
    pub async fn authorize_client(&self) -> Result<()> {
        debug!("Starting Spotify authorization ...");
        let url = self.spotify.get_authorize_url(false)?;
        // This function requires the `cli` feature enabled.
        self.spotify.prompt_for_token(&url).await?;
        let user = self.spotify.me().await?;
        info!(
            "Authenticated as: {} ({})",
            user.display_name.as_deref().unwrap_or("unknown"),
            user.id.id()
        );
        Ok(())
    }
}

impl SavedTracksApi for SpotifyClient {
    async fn saved_tracks_page(&self, limit: u32, offset: u32) -> Result<Vec<Song>> {
        let page = self
            .spotify
            .current_user_saved_tracks_manual(None, Some(limit), Some(offset))
            .await?;
        Ok(page.items.into_iter().map(Song::from).collect())
    }
}

impl SongSource for SpotifyClient {
    fn name(&self) -> &str {
        "Spotify Web API"
    }

    async fn fetch(&self) -> Result<SongCollection> {
        Ok(fetch_saved_songs(self, self.page_size).await)
    }
}
