//! EPUB Rebuild Module
//!
//! This module is the write half of the codec: it takes the pristine bytes
//! an EPUB was originally extracted from, an edited [Metadata] record, and
//! optionally replacement cover bytes, and produces a new container byte
//! stream. Only the package document entry (and the cover entry, when
//! replacement bytes are supplied) changes; every other entry's content is
//! carried over untouched.
//!
//! A rebuild is all-or-nothing: any failure aborts the operation before any
//! output exists, so the caller's stored bytes are never half-updated.

use indexmap::IndexMap;

use crate::{
    container::Container,
    epub::{DC_NAMESPACE, OPF_NAMESPACE, package_document_path, parse_package_document},
    error::EpubError,
    scheme,
    types::Metadata,
    utils::{XmlElement, XmlWriter},
};

/// Rebuilds an EPUB container with edited metadata
///
/// Orchestrates the whole write path in a single pass: open the container
/// from the original bytes, locate the package document through the
/// container descriptor, mutate the document in place from the metadata
/// record, optionally swap the cover entry's bytes, and serialize the
/// container back to a byte stream.
///
/// The original bytes must be the pristine source the record was extracted
/// from; a rebuild never starts from a previously rebuilt copy.
///
/// ## Parameters
/// - `original`: The pristine container bytes the item was created from
/// - `metadata`: The edited metadata record to write
/// - `new_cover`: Replacement cover image bytes, applied only when the
///   record also carries a `cover_path`
///
/// ## Return
/// - `Ok(Vec<u8>)`: The rebuilt container bytes
/// - `Err(EpubError)`: The operation failed; nothing was produced
pub fn rebuild(
    original: &[u8],
    metadata: &Metadata,
    new_cover: Option<&[u8]>,
) -> Result<Vec<u8>, EpubError> {
    let mut container = Container::open(original)?;

    let package_path = package_document_path(&container)?;
    let mut package = parse_package_document(&container, &package_path)?;

    apply_metadata(&mut package, metadata);

    if let (Some(cover), Some(cover_path)) = (new_cover, metadata.cover_path.as_deref()) {
        container.set(cover_path, cover.to_vec());
    }

    let document = XmlWriter::serialize(&package)?;
    container.set(&package_path, document.into_bytes());

    container.serialize()
}

/// Writes a metadata record into a parsed package document, in place
///
/// Scalar fields update the first matching Dublin Core element or append a
/// new one; identifiers and subjects are replaced wholesale. When the
/// document has no `metadata` element there is nowhere to attach anything
/// and the update is silently skipped.
pub(crate) fn apply_metadata(package: &mut XmlElement, metadata: &Metadata) {
    let unique_identifier = package
        .get_attr("unique-identifier")
        .filter(|id| !id.is_empty());

    let Some(metadata_element) = package
        .children
        .iter_mut()
        .find(|child| child.name == "metadata" && child.namespace.as_deref() == Some(OPF_NAMESPACE))
    else {
        return;
    };

    update_dc_element(metadata_element, "title", &metadata.title);
    update_dc_element(metadata_element, "creator", &metadata.author);
    update_dc_element(metadata_element, "description", &metadata.description);
    update_dc_element(metadata_element, "language", &metadata.language);
    update_dc_element(metadata_element, "publisher", &metadata.publisher);

    replace_identifiers(
        metadata_element,
        &metadata.identifiers,
        unique_identifier.as_deref(),
    );
    replace_subjects(metadata_element, &metadata.subjects);
}

/// Updates the first matching Dublin Core child or appends a new one
fn update_dc_element(metadata_element: &mut XmlElement, name: &str, value: &str) {
    if let Some(existing) = metadata_element
        .children
        .iter_mut()
        .find(|child| child.name == name && child.namespace.as_deref() == Some(DC_NAMESPACE))
    {
        existing.set_text(value);
    } else {
        metadata_element.children.push(dc_element(name, value));
    }
}

/// Replaces every identifier element except the package's unique identifier
///
/// The element whose `id` attribute equals the package's declared
/// `unique-identifier` is preserved untouched, whatever its scheme or
/// value; dropping it would break the reference the package itself makes.
/// One new element is appended per map entry, carrying the scheme's display
/// token; entries with empty values are skipped.
fn replace_identifiers(
    metadata_element: &mut XmlElement,
    identifiers: &IndexMap<String, String>,
    unique_identifier: Option<&str>,
) {
    metadata_element.children.retain(|child| {
        if child.name != "identifier" || child.namespace.as_deref() != Some(DC_NAMESPACE) {
            return true;
        }

        match (unique_identifier, child.get_attr("id")) {
            (Some(unique_id), Some(id)) => id == unique_id,
            _ => false,
        }
    });

    for (key, value) in identifiers {
        if value.is_empty() {
            continue;
        }

        let mut element = dc_element("identifier", value);
        element.set_attr("opf:scheme", &scheme::to_display(key));
        metadata_element.children.push(element);
    }
}

/// Replaces every subject element with the record's subject sequence
fn replace_subjects(metadata_element: &mut XmlElement, subjects: &[String]) {
    metadata_element
        .children
        .retain(|child| child.name != "subject" || child.namespace.as_deref() != Some(DC_NAMESPACE));

    for subject in subjects {
        if subject.is_empty() {
            continue;
        }

        metadata_element.children.push(dc_element("subject", subject));
    }
}

/// Builds a new Dublin Core element with the given text content
fn dc_element(name: &str, value: &str) -> XmlElement {
    let mut element = XmlElement::new(name.to_string());
    element.prefix = Some("dc".to_string());
    element.namespace = Some(DC_NAMESPACE.to_string());
    element.set_text(value);

    element
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::{CompressionMethod, ZipWriter, write::FileOptions};

    use crate::{
        epub::extract,
        rebuild::rebuild,
        types::Metadata,
        utils::XmlReader,
    };

    fn build_epub(opf: &str, extras: &[(&str, &[u8])]) -> Vec<u8> {
        let descriptor = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<container version=\"1.0\" ",
            "xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">",
            "<rootfiles>",
            "<rootfile full-path=\"OEBPS/content.opf\" ",
            "media-type=\"application/oebps-package+xml\"/>",
            "</rootfiles>",
            "</container>"
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);

        let mut entries: Vec<(&str, &[u8])> = vec![
            ("mimetype", b"application/epub+zip"),
            ("META-INF/container.xml", descriptor.as_bytes()),
            ("OEBPS/content.opf", opf.as_bytes()),
        ];
        entries.extend_from_slice(extras);

        for (name, data) in entries {
            zip.start_file(name, options).unwrap();
            zip.write_all(data).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    fn sample_opf() -> String {
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<package xmlns=\"http://www.idpf.org/2007/opf\" ",
            "xmlns:dc=\"http://purl.org/dc/elements/1.1/\" ",
            "xmlns:opf=\"http://www.idpf.org/2007/opf\" ",
            "unique-identifier=\"pub-id\" version=\"2.0\">",
            "<metadata>",
            "<dc:title>Original Title</dc:title>",
            "<dc:creator>Original Author</dc:creator>",
            "<dc:language>en</dc:language>",
            "<dc:identifier id=\"pub-id\" opf:scheme=\"UUID\">urn:uuid:0001</dc:identifier>",
            "<dc:identifier opf:scheme=\"ISBN\">9780000000001</dc:identifier>",
            "<dc:subject>Fiction</dc:subject>",
            "<dc:subject>Travel</dc:subject>",
            "<meta name=\"cover\" content=\"cover-image\"/>",
            "</metadata>",
            "<manifest>",
            "<item id=\"cover-image\" href=\"cover.jpg\" media-type=\"image/jpeg\"/>",
            "<item id=\"text\" href=\"chapter1.xhtml\" media-type=\"application/xhtml+xml\"/>",
            "</manifest>",
            "<spine toc=\"ncx\"/>",
            "</package>"
        )
        .to_string()
    }

    fn sample_epub() -> Vec<u8> {
        build_epub(
            &sample_opf(),
            &[
                ("OEBPS/cover.jpg", b"original-cover".as_ref()),
                ("OEBPS/chapter1.xhtml", b"<html/>".as_ref()),
            ],
        )
    }

    /// Writing back an unedited record is a metadata-level no-op
    #[test]
    fn test_round_trip_without_edits() {
        let original = sample_epub();
        let first = extract(&original).unwrap();

        let rebuilt = rebuild(&original, &first.metadata, None).unwrap();
        let second = extract(&rebuilt).unwrap();

        assert_eq!(second.metadata, first.metadata);
    }

    /// Edited scalar fields land in the rebuilt document
    #[test]
    fn test_scalar_edits_apply() {
        let original = sample_epub();
        let mut metadata = extract(&original).unwrap().metadata;
        metadata.title = "Renamed Title".to_string();
        metadata.author = "Another Author".to_string();
        metadata.publisher = "New Publisher".to_string();

        let rebuilt = rebuild(&original, &metadata, None).unwrap();
        let reread = extract(&rebuilt).unwrap().metadata;

        assert_eq!(reread.title, "Renamed Title");
        assert_eq!(reread.author, "Another Author");
        // publisher did not exist in the source; it must have been appended
        assert_eq!(reread.publisher, "New Publisher");
        assert_eq!(reread.language, "en");
    }

    /// The package's declared unique identifier survives an identifier
    /// replacement that omits its scheme
    #[test]
    fn test_unique_identifier_preserved() {
        let original = sample_epub();
        let mut metadata = extract(&original).unwrap().metadata;
        metadata.identifiers.clear();
        metadata
            .identifiers
            .insert("goodreads".to_string(), "12345".to_string());

        let rebuilt = rebuild(&original, &metadata, None).unwrap();

        let container = crate::container::Container::open(&rebuilt).unwrap();
        let opf = container.entry("OEBPS/content.opf").unwrap();
        let package = XmlReader::parse(std::str::from_utf8(opf).unwrap()).unwrap();

        let identifiers: Vec<_> = package.find_elements_by_name("identifier").collect();
        assert_eq!(identifiers.len(), 2);

        let unique = identifiers
            .iter()
            .find(|element| element.get_attr("id").as_deref() == Some("pub-id"))
            .expect("unique identifier element must survive");
        assert_eq!(unique.text(), "urn:uuid:0001");
        assert_eq!(unique.get_attr("opf:scheme"), Some("UUID".to_string()));

        let added = identifiers
            .iter()
            .find(|element| element.get_attr("id").is_none())
            .expect("new identifier element must be appended");
        assert_eq!(added.text(), "12345");
        assert_eq!(added.get_attr("opf:scheme"), Some("GOODREADS".to_string()));
    }

    /// Identifier entries with empty values are never written
    #[test]
    fn test_empty_identifier_values_skipped() {
        let original = sample_epub();
        let mut metadata = extract(&original).unwrap().metadata;
        metadata.identifiers.clear();
        metadata
            .identifiers
            .insert("isbn".to_string(), String::new());

        let rebuilt = rebuild(&original, &metadata, None).unwrap();
        let reread = extract(&rebuilt).unwrap().metadata;

        assert_eq!(reread.identifiers.get("isbn"), None);
    }

    /// Subjects are replaced wholesale, in order
    #[test]
    fn test_subjects_replaced() {
        let original = sample_epub();
        let mut metadata = extract(&original).unwrap().metadata;
        metadata.subjects = vec!["History".to_string(), "Essays".to_string()];

        let rebuilt = rebuild(&original, &metadata, None).unwrap();
        let reread = extract(&rebuilt).unwrap().metadata;

        assert_eq!(reread.subjects, vec!["History", "Essays"]);
    }

    /// Replacement cover bytes land at the record's cover path
    #[test]
    fn test_cover_bytes_replaced() {
        let original = sample_epub();
        let metadata = extract(&original).unwrap().metadata;
        assert_eq!(metadata.cover_path.as_deref(), Some("OEBPS/cover.jpg"));

        let rebuilt = rebuild(&original, &metadata, Some(b"new-cover")).unwrap();
        let reread = extract(&rebuilt).unwrap();

        assert_eq!(reread.cover.as_deref(), Some(b"new-cover".as_ref()));
    }

    /// Without a cover path, replacement bytes are ignored
    #[test]
    fn test_cover_bytes_ignored_without_path() {
        let opf = sample_opf()
            .replace("<meta name=\"cover\" content=\"cover-image\"/>", "")
            .replace(
                "<item id=\"cover-image\" href=\"cover.jpg\" media-type=\"image/jpeg\"/>",
                "",
            );
        let original = build_epub(&opf, &[("OEBPS/chapter1.xhtml", b"<html/>".as_ref())]);

        let metadata = extract(&original).unwrap().metadata;
        assert_eq!(metadata.cover_path, None);

        let rebuilt = rebuild(&original, &metadata, Some(b"new-cover")).unwrap();
        let reread = extract(&rebuilt).unwrap();
        assert_eq!(reread.cover, None);
    }

    /// Entries other than the package document are carried over untouched
    #[test]
    fn test_other_entries_preserved() {
        let original = sample_epub();
        let metadata = extract(&original).unwrap().metadata;

        let rebuilt = rebuild(&original, &metadata, None).unwrap();
        let container = crate::container::Container::open(&rebuilt).unwrap();

        assert_eq!(
            container.entry("OEBPS/chapter1.xhtml"),
            Some(b"<html/>".as_ref())
        );
        assert_eq!(
            container.entry("OEBPS/cover.jpg"),
            Some(b"original-cover".as_ref())
        );
        assert_eq!(
            container.entry("mimetype"),
            Some(b"application/epub+zip".as_ref())
        );
    }

    /// A package document without a metadata element rebuilds unchanged
    #[test]
    fn test_missing_metadata_element_is_silent() {
        let opf = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<package xmlns=\"http://www.idpf.org/2007/opf\" ",
            "xmlns:dc=\"http://purl.org/dc/elements/1.1/\" version=\"2.0\">",
            "<manifest/>",
            "<spine/>",
            "</package>"
        );
        let original = build_epub(opf, &[]);

        let mut metadata = Metadata::default();
        metadata.title = "Ignored".to_string();

        let rebuilt = rebuild(&original, &metadata, None).unwrap();
        let reread = extract(&rebuilt).unwrap().metadata;

        assert_eq!(reread.title, "");
    }

    /// A rebuild from unusable bytes fails without producing output
    #[test]
    fn test_rebuild_rejects_non_zip_input() {
        let metadata = Metadata::default();
        let result = rebuild(b"not a zip archive", &metadata, None);

        assert!(result.is_err());
    }
}
