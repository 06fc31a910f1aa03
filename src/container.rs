//! Container Access Module
//!
//! This module adapts the ZIP codec into the entry-table view the rest of
//! the crate works against: an EPUB container is an ordered set of named
//! byte entries. A [Container] is opened from a byte stream, queried and
//! mutated by exact entry name, and serialized back to a single byte stream.
//!
//! One container instance belongs to exactly one extraction or rebuild
//! operation; instances are never shared or cached across operations.

use std::io::{Cursor, Read, Write};

use indexmap::IndexMap;
use zip::{CompressionMethod, ZipArchive, ZipWriter, result::ZipError, write::FileOptions};

use crate::error::EpubError;

/// The entry name holding the container's media type declaration
pub(crate) const MIMETYPE_ENTRY: &str = "mimetype";

/// Fixed Deflate level applied to every rebuilt entry except `mimetype`
const COMPRESSION_LEVEL: i64 = 6;

/// An opened EPUB container
///
/// Holds every entry of the source archive in memory, in the archive's
/// original order. Entry names are exact strings; no path interpretation
/// happens at this layer. Directory entries (names ending in `/`) are kept
/// so a rebuilt container reproduces the original entry set.
pub struct Container {
    /// Entry name mapped to entry content, in archive order
    entries: IndexMap<String, Vec<u8>>,
}

impl Container {
    /// Opens a container from a ZIP byte stream
    ///
    /// Reads every entry of the archive into memory. The whole container is
    /// round-tripped in memory by design; there is no streaming access.
    ///
    /// ## Parameters
    /// - `data`: The raw container bytes
    ///
    /// ## Return
    /// - `Ok(Container)`: The opened container
    /// - `Err(EpubError)`: The bytes are not a readable ZIP archive
    pub fn open(data: &[u8]) -> Result<Self, EpubError> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut entries = IndexMap::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let mut buffer = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buffer)?;

            entries.insert(file.name().to_string(), buffer);
        }

        Ok(Self { entries })
    }

    /// Returns the content of the entry with the given exact name
    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Returns whether an entry with the given exact name exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates all entry names in archive order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Inserts or replaces an entry
    ///
    /// An existing entry keeps its position in the archive order; a new
    /// entry is appended at the end.
    pub fn set(&mut self, name: &str, data: Vec<u8>) {
        self.entries.insert(name.to_string(), data);
    }

    /// Serializes the container to a single ZIP byte stream
    ///
    /// The `mimetype` entry is written first and uncompressed, per the OCF
    /// convention; every other entry follows in archive order, Deflated at a
    /// fixed level so rebuilt output is reproducible. Directory entries are
    /// restored as directories.
    ///
    /// ## Return
    /// - `Ok(Vec<u8>)`: The serialized container bytes
    /// - `Err(EpubError)`: Byte production failed; no partial output exists
    pub fn serialize(&self) -> Result<Vec<u8>, EpubError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let stored = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::<()>::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL));

        if let Some(data) = self.entries.get(MIMETYPE_ENTRY) {
            zip.start_file(MIMETYPE_ENTRY, stored)
                .map_err(|source| EpubError::SerializationFailure { source })?;
            zip.write_all(data)
                .map_err(|source| EpubError::SerializationFailure {
                    source: ZipError::Io(source),
                })?;
        }

        for (name, data) in &self.entries {
            if name == MIMETYPE_ENTRY {
                continue;
            }

            if name.ends_with('/') {
                zip.add_directory(name.as_str(), deflated)
                    .map_err(|source| EpubError::SerializationFailure { source })?;
                continue;
            }

            zip.start_file(name.as_str(), deflated)
                .map_err(|source| EpubError::SerializationFailure { source })?;
            zip.write_all(data)
                .map_err(|source| EpubError::SerializationFailure {
                    source: ZipError::Io(source),
                })?;
        }

        let cursor = zip
            .finish()
            .map_err(|source| EpubError::SerializationFailure { source })?;

        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::{CompressionMethod, ZipWriter, write::FileOptions};

    use crate::container::Container;

    fn sample_archive() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);

        zip.start_file("mimetype", options).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.add_directory("META-INF/", options).unwrap();

        zip.start_file("META-INF/container.xml", options).unwrap();
        zip.write_all(b"<container/>").unwrap();

        zip.start_file("OEBPS/content.opf", options).unwrap();
        zip.write_all(b"<package/>").unwrap();

        zip.finish().unwrap().into_inner()
    }

    /// Opening exposes every entry in archive order
    #[test]
    fn test_open_preserves_entry_order() {
        let container = Container::open(&sample_archive()).unwrap();

        let names: Vec<&str> = container.names().collect();
        assert_eq!(
            names,
            vec![
                "mimetype",
                "META-INF/",
                "META-INF/container.xml",
                "OEBPS/content.opf",
            ]
        );
        assert_eq!(container.entry("mimetype"), Some(b"application/epub+zip".as_ref()));
        assert!(container.contains("OEBPS/content.opf"));
        assert!(!container.contains("OEBPS/missing.opf"));
    }

    /// Opening garbage bytes fails instead of panicking
    #[test]
    fn test_open_rejects_non_zip_data() {
        let result = Container::open(b"this is not a zip archive");
        assert!(result.is_err());
    }

    /// Replaced and inserted entries survive a serialize/reopen cycle
    #[test]
    fn test_set_and_serialize_round_trip() {
        let mut container = Container::open(&sample_archive()).unwrap();
        container.set("OEBPS/content.opf", b"<package version=\"2.0\"/>".to_vec());
        container.set("OEBPS/cover.jpg", vec![0xFF, 0xD8, 0xFF]);

        let bytes = container.serialize().unwrap();
        let reopened = Container::open(&bytes).unwrap();

        assert_eq!(
            reopened.entry("OEBPS/content.opf"),
            Some(b"<package version=\"2.0\"/>".as_ref())
        );
        assert_eq!(reopened.entry("OEBPS/cover.jpg"), Some([0xFF, 0xD8, 0xFF].as_ref()));
        assert_eq!(
            reopened.entry("META-INF/container.xml"),
            Some(b"<container/>".as_ref())
        );
        assert!(reopened.contains("META-INF/"));
    }

    /// The mimetype entry leads the serialized archive
    #[test]
    fn test_serialize_writes_mimetype_first() {
        let container = Container::open(&sample_archive()).unwrap();
        let bytes = container.serialize().unwrap();

        let reopened = Container::open(&bytes).unwrap();
        assert_eq!(reopened.names().next(), Some("mimetype"));
    }
}
