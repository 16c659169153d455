use std::{fs::File, io::Write, path::PathBuf};

use log::debug;
use serde::Serialize;

use crate::clients::{entities::Song, errors::Result};

/// Column sets the exporter knows how to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    /// `title,artist,album`
    Basic,
    /// Basic columns plus `added_at,spotify_id,spotify_url`
    Detailed,
}

impl CsvLayout {
    /// Header row for this layout
    pub fn header(self) -> &'static [&'static str] {
        match self {
            CsvLayout::Basic => &["title", "artist", "album"],
            CsvLayout::Detailed => &[
                "title",
                "artist",
                "album",
                "added_at",
                "spotify_id",
                "spotify_url",
            ],
        }
    }
}

/// A CSV file to (over)write with a given layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTarget {
    /// Destination path, replaced if it exists
    pub path: PathBuf,
    /// Columns to write
    pub layout: CsvLayout,
}

impl CsvTarget {
    /// Target with the given path and layout
    pub fn new(path: impl Into<PathBuf>, layout: CsvLayout) -> Self {
        CsvTarget {
            path: path.into(),
            layout,
        }
    }
}

#[derive(Serialize)]
struct BasicRow<'a> {
    title: &'a str,
    artist: &'a str,
    album: &'a str,
}

#[derive(Serialize)]
struct DetailedRow<'a> {
    title: &'a str,
    artist: &'a str,
    album: &'a str,
    added_at: &'a str,
    spotify_id: &'a str,
    spotify_url: &'a str,
}

/// Write the header and one row per song into `writer`.
/// Songs without API details get empty detail columns.
pub fn write_records<W: Write>(writer: W, layout: CsvLayout, songs: &[Song]) -> Result<usize> {
    // Header is written by hand so an empty collection still yields one
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(layout.header())?;

    for song in songs {
        match layout {
            CsvLayout::Basic => csv.serialize(BasicRow {
                title: &song.title,
                artist: &song.artist,
                album: &song.album,
            })?,
            CsvLayout::Detailed => {
                let details = song.details.as_ref();
                csv.serialize(DetailedRow {
                    title: &song.title,
                    artist: &song.artist,
                    album: &song.album,
                    added_at: details.map_or("", |d| d.added_at.as_str()),
                    spotify_id: details.map_or("", |d| d.external_id.as_str()),
                    spotify_url: details.map_or("", |d| d.external_url.as_str()),
                })?;
            }
        }
    }
    csv.flush()?;
    Ok(songs.len())
}

/// Overwrite the target file with `songs`, returning the number of rows written
pub fn write_songs(target: &CsvTarget, songs: &[Song]) -> Result<usize> {
    let file = File::create(&target.path)?;
    let written = write_records(file, target.layout, songs)?;
    debug!(
        "Wrote {written} rows ({:?} layout) to {:?}",
        target.layout, target.path
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::entities::SongDetails;

    fn read_back(path: &std::path::Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_comma_in_artist_is_quoted() {
        let mut buf = Vec::new();
        write_records(&mut buf, CsvLayout::Basic, &[Song::new("A", "B, C", "D")]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "title,artist,album\nA,\"B, C\",D\n");
    }

    #[test]
    fn test_round_trip_keeps_artist_field() {
        let dir = tempfile::tempdir().unwrap();
        let target = CsvTarget::new(dir.path().join("songs.csv"), CsvLayout::Basic);

        let written = write_songs(&target, &[Song::new("A", "B, C", "D")]).unwrap();
        assert_eq!(written, 1);

        let rows = read_back(&target.path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["title", "artist", "album"]);
        assert_eq!(rows[1], vec!["A", "B, C", "D"]);
    }

    #[test]
    fn test_empty_collection_writes_header_only() {
        let mut buf = Vec::new();
        let written = write_records(&mut buf, CsvLayout::Detailed, &[]).unwrap();
        assert_eq!(written, 0);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "title,artist,album,added_at,spotify_id,spotify_url\n"
        );
    }

    #[test]
    fn test_detailed_layout() {
        let dir = tempfile::tempdir().unwrap();
        let target = CsvTarget::new(dir.path().join("detailed.csv"), CsvLayout::Detailed);
        let songs = [
            Song::new("One", "U2", "Achtung Baby").with_details(SongDetails {
                added_at: "2024-05-01T10:00:00Z".into(),
                external_id: "abc".into(),
                external_url: "https://open.spotify.com/track/abc".into(),
            }),
            Song::new("Local", "Me", ""),
        ];

        write_songs(&target, &songs).unwrap();

        let rows = read_back(&target.path);
        assert_eq!(
            rows[1],
            vec![
                "One",
                "U2",
                "Achtung Baby",
                "2024-05-01T10:00:00Z",
                "abc",
                "https://open.spotify.com/track/abc"
            ]
        );
        assert_eq!(rows[2], vec!["Local", "Me", "", "", "", ""]);
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = CsvTarget::new(dir.path().join("songs.csv"), CsvLayout::Basic);
        write_songs(&target, &[Song::new("Old", "X", "Y"), Song::new("Old2", "X", "Y")]).unwrap();
        write_songs(&target, &[Song::new("New", "X", "Y")]).unwrap();

        let rows = read_back(&target.path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "New");
    }
}
