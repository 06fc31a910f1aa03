//! Error Type Definition Module
//!
//! This module defines the various error types that may be encountered while
//! extracting metadata from an EPUB container or rebuilding one with edited
//! metadata. All errors are uniformly wrapped in the [EpubError] enumeration
//! for convenient error handling by the caller.

use thiserror::Error;

/// Types of errors that can occur during EPUB processing
///
/// This enumeration defines the error cases that can be encountered when
/// opening an EPUB container, reading its package document, or producing a
/// rebuilt container. Both the extraction and the rebuild operations report
/// their failures through this type.
#[derive(Debug, Error)]
pub enum EpubError {
    /// ZIP archive related errors
    ///
    /// Errors occur when reading the ZIP structure of an EPUB file,
    /// such as file corruption, unreadability, etc.
    #[error("Archive error: {source}")]
    ArchiveError { source: zip::result::ZipError },

    /// Data decoding error - empty data
    ///
    /// This error occurs when trying to decode an empty byte stream.
    #[error("Decode error: The data is empty.")]
    EmptyDataError,

    /// IO error
    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Invalid container descriptor error
    ///
    /// Triggered when `META-INF/container.xml` is missing, cannot be parsed,
    /// contains no `rootfile` element in the OCF container namespace, or the
    /// `rootfile` element carries no usable `full-path` attribute.
    #[error("Invalid container: {reason}")]
    InvalidContainer { reason: String },

    /// Invalid EPUB error
    ///
    /// Triggered when the `mimetype` entry is missing or its trimmed content
    /// is not `application/epub+zip`.
    #[error(
        "Invalid epub: The \"mimetype\" entry is missing or does not declare \"application/epub+zip\"."
    )]
    InvalidEpub,

    /// Malformed package document error
    ///
    /// This error occurs when the package document named by the container
    /// descriptor cannot be parsed as XML.
    #[error("Malformed package document: The document at \"{path}\" could not be parsed.")]
    MalformedPackageDocument { path: String },

    /// Missing container entry error
    ///
    /// This error occurs when a strictly required entry is absent from the
    /// container, such as the package document named by `full-path`.
    #[error("Missing entry: The \"{entry}\" entry was not found in the container.")]
    MissingEntry { entry: String },

    /// QuickXml error
    ///
    /// This error occurs when parsing XML data using the QuickXml library.
    #[error("QuickXml error: {source}")]
    QuickXmlError { source: quick_xml::Error },

    /// Container serialization error
    ///
    /// This error occurs when producing the final container byte stream
    /// fails. No partial output is ever returned alongside it.
    #[error("Serialization failure: {source}")]
    SerializationFailure { source: zip::result::ZipError },

    /// UTF-8 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-8
    /// string but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf8DecodeError { source: std::string::FromUtf8Error },

    /// UTF-16 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-16
    /// string but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf16DecodeError { source: std::string::FromUtf16Error },
}

impl From<zip::result::ZipError> for EpubError {
    fn from(value: zip::result::ZipError) -> Self {
        EpubError::ArchiveError { source: value }
    }
}

impl From<quick_xml::Error> for EpubError {
    fn from(value: quick_xml::Error) -> Self {
        EpubError::QuickXmlError { source: value }
    }
}

impl From<std::io::Error> for EpubError {
    fn from(value: std::io::Error) -> Self {
        EpubError::IOError { source: value }
    }
}

impl From<std::string::FromUtf8Error> for EpubError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        EpubError::Utf8DecodeError { source: value }
    }
}

impl From<std::string::FromUtf16Error> for EpubError {
    fn from(value: std::string::FromUtf16Error) -> Self {
        EpubError::Utf16DecodeError { source: value }
    }
}

#[cfg(test)]
impl PartialEq for EpubError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::InvalidContainer { reason: l_reason },
                Self::InvalidContainer { reason: r_reason },
            ) => l_reason == r_reason,
            (
                Self::MalformedPackageDocument { path: l_path },
                Self::MalformedPackageDocument { path: r_path },
            ) => l_path == r_path,
            (Self::MissingEntry { entry: l_entry }, Self::MissingEntry { entry: r_entry }) => {
                l_entry == r_entry
            }
            (
                Self::Utf8DecodeError { source: l_source },
                Self::Utf8DecodeError { source: r_source },
            ) => l_source == r_source,

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}
