//! Epub metadata codec
//!
//! A Rust library for extracting and rewriting EPUB metadata.
//!
//! This library reads the package document of an EPUB container and turns
//! it into a structured metadata record - title, author, description,
//! language, publisher, a canonicalized identifier map, subjects, and the
//! resolved cover image entry. The same container can later be rebuilt from
//! its pristine bytes with an edited record: only the package document (and
//! optionally the cover image) changes, every other entry is carried over
//! untouched.
//!
//! ## Features
//!
//! - Parse the EPUB container structure and extract bibliographic metadata.
//! - Resolve the cover image through the manifest, with filename-scan and
//!   legacy fallbacks for non-conformant containers.
//! - Normalize the many historical identifier-scheme spellings onto a
//!   canonical key set.
//! - Rebuild a container with edited metadata, preserving the rest of the
//!   archive.
//! - Batch extraction with per-file failure isolation.
//!
//! ## Quick Start
//!
//! ```rust, ignore
//! # use epub_remeta::{extract, rebuild};
//! # fn main() -> Result<(), epub_remeta::EpubError> {
//! let bytes = std::fs::read("path/to/book.epub")?;
//!
//! // Extract the metadata record and cover image
//! let mut extraction = extract(&bytes)?;
//! println!("Title: {}", extraction.metadata.title);
//!
//! // Edit and write back
//! extraction.metadata.title = "A Better Title".to_string();
//! let rebuilt = rebuild(&extraction.source, &extraction.metadata, None)?;
//! std::fs::write("path/to/book.epub", rebuilt)?;
//! # Ok(())
//! # }
//! ```
//!
//! The codec works on whole byte streams in memory; it does not validate
//! full EPUB conformance, handle DRM, or parse reading content.

pub(crate) mod utils;

pub mod container;
pub mod epub;
pub mod error;
pub mod rebuild;
pub mod scheme;
pub mod types;

pub use epub::{extract, extract_all};
pub use error::EpubError;
pub use rebuild::rebuild;
pub use types::{BatchResult, Extraction, Metadata};
pub use utils::DecodeBytes;
