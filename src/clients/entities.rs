/// Fields only the Web API knows about a saved song
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongDetails {
    /// When the song was saved, RFC 3339 in UTC
    pub added_at: String,
    /// Spotify track id, empty for local files
    pub external_id: String,
    /// Link to the track on open.spotify.com
    pub external_url: String,
}

/// One row of the liked songs table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    /// Track title
    pub title: String,
    /// All contributing artists joined with `", "`
    pub artist: String,
    /// Album name
    pub album: String,
    /// Present only for songs fetched through the Web API
    pub details: Option<SongDetails>,
}

impl Song {
    /// Build a basic record without API details
    pub fn new(title: impl Into<String>, artist: impl Into<String>, album: impl Into<String>) -> Self {
        Song {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            details: None,
        }
    }

    /// Attach the detailed API fields
    #[must_use]
    pub fn with_details(mut self, details: SongDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// Join contributing artist names the way they appear in the CSV
pub fn join_artists<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Songs in source order. `complete` is false when extraction stopped early
/// and only the songs gathered up to that point are present.
#[derive(Debug, Default)]
pub struct SongCollection {
    /// Extracted songs, never deduplicated
    pub songs: Vec<Song>,
    /// Whether the source was read to its end
    pub complete: bool,
}

impl SongCollection {
    /// Collection read to the end of its source
    pub fn complete(songs: Vec<Song>) -> Self {
        SongCollection {
            songs,
            complete: true,
        }
    }

    /// Collection cut short by an error or a safety bound
    pub fn partial(songs: Vec<Song>) -> Self {
        SongCollection {
            songs,
            complete: false,
        }
    }

    /// Number of songs collected
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// True when nothing was collected
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_artists() {
        assert_eq!(join_artists(["Daft Punk", "Pharrell Williams"]), "Daft Punk, Pharrell Williams");
        assert_eq!(join_artists(["Solo"]), "Solo");
        assert_eq!(join_artists(Vec::<String>::new()), "");
    }

    #[test]
    fn test_with_details() {
        let song = Song::new("A", "B", "C").with_details(SongDetails {
            added_at: "2024-01-01T00:00:00Z".into(),
            external_id: "id".into(),
            external_url: "https://open.spotify.com/track/id".into(),
        });
        assert_eq!(song.details.map(|d| d.external_id), Some("id".to_string()));
    }
}
