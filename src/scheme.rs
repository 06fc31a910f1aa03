//! Identifier Scheme Mapping Module
//!
//! Package documents in the wild spell identifier schemes dozens of ways:
//! `ISBN-10`, `isbn10`, `mobi-asin`, `calibre-id`, and so on. This module
//! collapses those historical spellings onto a small canonical key set for
//! the metadata record, and maps canonical keys back to a standard display
//! token when identifiers are written into a package document.
//!
//! The mapping is intentionally lossy: several raw spellings collapse onto
//! one canonical key, so a raw scheme is not guaranteed to survive a
//! round trip - only its normalized standard form is.

/// Maps a raw scheme string onto its canonical lowercase key
///
/// The input is ASCII-lowercased and looked up in a fixed many-to-one table
/// covering the Amazon, ISBN, Google, Goodreads, library (LCCN/OCLC/Dewey),
/// DOI, PMID, UUID, URI, Apple, Kobo, Barnes & Noble, Gutenberg, Calibre,
/// and custom identifier families. Unrecognized schemes pass through
/// lowercased, after stripping a single leftover `opf:`/`dc:`/`dcterms:`
/// namespace-prefix artifact.
///
/// ## Parameters
/// - `raw`: The scheme string as found in the source document
///
/// ## Return
/// - `String`: The canonical key
pub fn to_canonical(raw: &str) -> String {
    let key = raw.to_ascii_lowercase();

    let canonical = match key.as_str() {
        // Amazon identifiers
        "mobi-asin" | "amazon-asin" | "asin" => "asin",
        "amazon" | "amazon-id" => "amzn",

        // ISBN variants
        "isbn" | "isbn-10" | "isbn10" => "isbn",
        "isbn-13" | "isbn13" => "isbn13",

        // Google Books
        "google" | "google-books" | "googlebooks" | "goog" => "google",

        // Goodreads
        "goodreads" | "goodreads-id" | "gr" => "goodreads",

        // Library identifiers
        "lccn" | "library-of-congress" => "lccn",
        "oclc" | "worldcat" => "oclc",
        "dewey" | "ddc" => "dewey",

        // DOI and academic
        "doi" => "doi",
        "pmid" | "pubmed" => "pmid",

        // Publisher specific
        "uuid" | "guid" => "uuid",
        "uri" | "url" => "uri",

        // Apple
        "apple" | "apple-id" | "itunes" => "apple",

        // Kobo
        "kobo" | "kobo-id" => "kobo",

        // Barnes & Noble
        "bn" | "barnes-noble" | "nook" => "bn",

        // Project Gutenberg
        "gutenberg" | "pg" | "project-gutenberg" => "gutenberg",

        // Custom/Internal IDs
        "calibre" | "calibre-id" => "calibre",
        "custom" | "internal" => "custom",

        // Keep the original if no mapping was found
        _ => return strip_namespace_prefix(&key).to_string(),
    };

    canonical.to_string()
}

/// Maps a canonical key back to its standard display token
///
/// The approximate inverse of [to_canonical]: a fixed table maps each
/// canonical key to an upper-case standard token; unknown keys upper-case
/// themselves. Note that `isbn` and `isbn13` both display as `ISBN`.
///
/// ## Parameters
/// - `key`: The canonical identifier key
///
/// ## Return
/// - `String`: The display token to write into a package document
pub fn to_display(key: &str) -> String {
    let display = match key.to_ascii_lowercase().as_str() {
        "asin" => "ASIN",
        "amzn" => "AMAZON",
        "isbn" => "ISBN",
        "isbn13" => "ISBN",
        "google" => "GOOGLE",
        "goodreads" => "GOODREADS",
        "lccn" => "LCCN",
        "oclc" => "OCLC",
        "dewey" => "DEWEY",
        "doi" => "DOI",
        "pmid" => "PMID",
        "uuid" => "UUID",
        "uri" => "URI",
        "apple" => "APPLE",
        "kobo" => "KOBO",
        "bn" => "BN",
        "gutenberg" => "GUTENBERG",
        "calibre" => "CALIBRE",

        _ => return key.to_ascii_uppercase(),
    };

    display.to_string()
}

/// Strips a single leading namespace-prefix artifact from a scheme key
fn strip_namespace_prefix(key: &str) -> &str {
    key.strip_prefix("opf:")
        .or_else(|| key.strip_prefix("dc:"))
        .or_else(|| key.strip_prefix("dcterms:"))
        .unwrap_or(key)
}
