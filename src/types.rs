use indexmap::IndexMap;

use crate::error::EpubError;

/// Bibliographic metadata extracted from an EPUB package document
///
/// The `Metadata` structure is the externally visible record produced by an
/// extraction and consumed by a rebuild. Every extraction creates a fresh
/// record; the record is edited wholesale and written back wholesale, there
/// is no partial-update protocol.
///
/// Scalar fields are never absent: an element missing from the package
/// document yields an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// The publication title (`dc:title`)
    pub title: String,

    /// The primary creator (`dc:creator`)
    pub author: String,

    /// The publication description (`dc:description`)
    pub description: String,

    /// The publication language code (`dc:language`)
    pub language: String,

    /// The publisher name (`dc:publisher`)
    pub publisher: String,

    /// Identifier map keyed by canonical scheme
    ///
    /// Keys are always the canonical lowercase form produced by
    /// [crate::scheme::to_canonical], in document order. Values are never
    /// empty; when two source identifiers collapse to the same canonical
    /// key, the later one in document order wins.
    pub identifiers: IndexMap<String, String>,

    /// Subject entries (`dc:subject`) in document order
    ///
    /// Duplicates are retained; blank or whitespace-only entries are never
    /// stored.
    pub subjects: Vec<String>,

    /// The resolved cover image entry name
    ///
    /// A normalized, container-relative entry name that existed in the
    /// container at extraction time, or `None` when no cover could be
    /// resolved. An unresolvable cover is a normal state, not an error.
    pub cover_path: Option<String>,
}

/// The result of extracting a single EPUB byte stream
///
/// Bundles the metadata record with the raw cover image bytes (when a cover
/// was resolved) and the untouched source bytes. The source bytes are what a
/// later rebuild must start from; they are returned unchanged so the caller
/// can store them as the canonical copy.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The extracted metadata record
    pub metadata: Metadata,

    /// The raw bytes of the resolved cover image entry, if any
    pub cover: Option<Vec<u8>>,

    /// The original container bytes, unchanged
    pub source: Vec<u8>,
}

/// The outcome of one input within a batch extraction
///
/// Batch extraction never aborts on a corrupt input; each file's result is
/// recorded independently and in the original input order.
#[derive(Debug)]
pub struct BatchResult {
    /// The name the input was supplied under
    pub name: String,

    /// The extraction result for this input
    pub outcome: Result<Extraction, EpubError>,
}
