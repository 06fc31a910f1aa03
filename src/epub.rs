//! EPUB Metadata Extraction Module
//!
//! This module turns an EPUB byte stream into a [Metadata] record. It
//! verifies the container's media type declaration, locates the package
//! document through `META-INF/container.xml`, and walks the package
//! document's Dublin Core and OPF vocabulary to collect the bibliographic
//! fields, the identifier map, the subject list, and the cover image entry.
//!
//! Cover resolution is heuristic: a missing or inconsistent manifest never
//! fails the extraction, it only degrades through the fallback chain until
//! either an existing entry is found or the cover is reported absent.

use indexmap::IndexMap;
use log::warn;

use crate::{
    container::{Container, MIMETYPE_ENTRY},
    error::EpubError,
    scheme,
    types::{BatchResult, Extraction, Metadata},
    utils::{DecodeBytes, XmlElement, XmlReader, normalize_path, resolve_path},
};

pub(crate) const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
pub(crate) const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";
pub(crate) const CONTAINER_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:container";

/// The entry holding the OCF container descriptor
pub(crate) const CONTAINER_ENTRY: &str = "META-INF/container.xml";

/// The media type an EPUB container must declare
const EPUB_MEDIA_TYPE: &str = "application/epub+zip";

/// Extracts the metadata record and cover image from an EPUB byte stream
///
/// This function is the read half of the codec. It opens the container,
/// checks the `mimetype` declaration, locates and parses the package
/// document, and reads every metadata field. The source bytes are returned
/// unchanged inside the [Extraction] so the caller can retain them as the
/// canonical copy for a later rebuild.
///
/// ## Parameters
/// - `data`: The raw EPUB container bytes
///
/// ## Return
/// - `Ok(Extraction)`: The metadata record, the cover bytes if a cover was
///   resolved, and the untouched source bytes
/// - `Err(EpubError)`: The container or its package document is unusable
pub fn extract(data: &[u8]) -> Result<Extraction, EpubError> {
    let container = Container::open(data)?;
    check_mimetype(&container)?;

    let package_path = package_document_path(&container)?;
    let package = parse_package_document(&container, &package_path)?;

    let metadata = OpfReader::new(&package, &package_path, &container).read();
    let cover = metadata
        .cover_path
        .as_deref()
        .and_then(|path| container.entry(path))
        .map(<[u8]>::to_vec);

    Ok(Extraction {
        metadata,
        cover,
        source: data.to_vec(),
    })
}

/// Extracts a batch of EPUB inputs, isolating failures per file
///
/// Inputs are processed strictly sequentially and in order. Inputs whose
/// names do not end in `.epub` (case-insensitively) are skipped outright;
/// every remaining input is extracted independently, and a corrupt file is
/// recorded as a failed [BatchResult] without aborting the rest of the
/// batch.
///
/// ## Parameters
/// - `files`: `(name, bytes)` pairs to extract
pub fn extract_all<I>(files: I) -> Vec<BatchResult>
where
    I: IntoIterator<Item = (String, Vec<u8>)>,
{
    let mut results = Vec::new();

    for (name, data) in files {
        if !name.to_ascii_lowercase().ends_with(".epub") {
            warn!("skipping \"{}\": not an epub file name", name);
            continue;
        }

        let outcome = extract(&data);
        if let Err(err) = &outcome {
            warn!("failed to extract \"{}\": {}", name, err);
        }

        results.push(BatchResult { name, outcome });
    }

    results
}

/// Verifies the container's media type declaration
///
/// The `mimetype` entry must exist and its trimmed content must read
/// `application/epub+zip`; surrounding whitespace is tolerated.
fn check_mimetype(container: &Container) -> Result<(), EpubError> {
    let data = container
        .entry(MIMETYPE_ENTRY)
        .ok_or(EpubError::InvalidEpub)?;
    let declared = data.decode().map_err(|_| EpubError::InvalidEpub)?;

    if declared.trim() != EPUB_MEDIA_TYPE {
        return Err(EpubError::InvalidEpub);
    }

    Ok(())
}

/// Locates the package document through the container descriptor
///
/// Reads `META-INF/container.xml` and returns the `full-path` attribute of
/// the first `rootfile` element in the OCF container namespace.
///
/// ## Return
/// - `Ok(String)`: The container-relative package document path
/// - `Err(EpubError)`: The descriptor is missing, unparseable, or carries
///   no usable `full-path`
pub(crate) fn package_document_path(container: &Container) -> Result<String, EpubError> {
    let data = container
        .entry(CONTAINER_ENTRY)
        .ok_or_else(|| EpubError::InvalidContainer {
            reason: format!("the \"{}\" entry is missing", CONTAINER_ENTRY),
        })?;
    let content = data.decode().map_err(|_| EpubError::InvalidContainer {
        reason: "the container descriptor could not be decoded".to_string(),
    })?;

    let root = XmlReader::parse(&content).map_err(|_| EpubError::InvalidContainer {
        reason: "the container descriptor could not be parsed".to_string(),
    })?;

    let rootfile = root
        .find_elements_by_name("rootfile")
        .find(|element| element.namespace.as_deref() == Some(CONTAINER_NAMESPACE))
        .ok_or_else(|| EpubError::InvalidContainer {
            reason: "no \"rootfile\" element in the container namespace".to_string(),
        })?;

    match rootfile.get_attr("full-path") {
        Some(path) if !path.is_empty() => Ok(path),
        _ => Err(EpubError::InvalidContainer {
            reason: "the \"rootfile\" element has no usable \"full-path\" attribute".to_string(),
        }),
    }
}

/// Reads and parses the package document at the given container path
pub(crate) fn parse_package_document(
    container: &Container,
    package_path: &str,
) -> Result<XmlElement, EpubError> {
    let data = container
        .entry(package_path)
        .ok_or_else(|| EpubError::MissingEntry {
            entry: package_path.to_string(),
        })?;
    let content = data
        .decode()
        .map_err(|_| EpubError::MalformedPackageDocument {
            path: package_path.to_string(),
        })?;

    XmlReader::parse(&content).map_err(|_| EpubError::MalformedPackageDocument {
        path: package_path.to_string(),
    })
}

/// Package document reader producing a [Metadata] record
///
/// The reader is total once the document is parsed: absent elements yield
/// empty fields and an unresolvable cover yields `None`, never an error.
pub(crate) struct OpfReader<'a> {
    /// The parsed package document root
    package: &'a XmlElement,

    /// The directory of the package document inside the container
    ///
    /// Empty when the package document sits at the container root.
    base_dir: String,

    /// The container the package document was read from
    container: &'a Container,
}

impl<'a> OpfReader<'a> {
    pub fn new(package: &'a XmlElement, package_path: &str, container: &'a Container) -> Self {
        let base_dir = package_path
            .rfind('/')
            .map(|index| package_path[..index].to_string())
            .unwrap_or_default();

        Self {
            package,
            base_dir,
            container,
        }
    }

    /// Reads the complete metadata record from the package document
    pub fn read(&self) -> Metadata {
        Metadata {
            title: self.first_dc_text("title"),
            author: self.first_dc_text("creator"),
            description: self.first_dc_text("description"),
            language: self.first_dc_text("language"),
            publisher: self.first_dc_text("publisher"),
            identifiers: self.identifiers(),
            subjects: self.subjects(),
            cover_path: self.resolve_cover(),
        }
    }

    /// The trimmed text of the first matching Dublin Core element
    ///
    /// An absent element yields an empty string, never a missing field.
    fn first_dc_text(&self, name: &str) -> String {
        self.package
            .find_elements_by_name(name)
            .find(|element| element.namespace.as_deref() == Some(DC_NAMESPACE))
            .map(|element| element.text())
            .unwrap_or_default()
    }

    /// Collects the identifier map from every schemed `dc:identifier`
    ///
    /// The scheme attribute is looked up in the OPF namespace first, then as
    /// the raw `opf:scheme` name, then as a bare `scheme` attribute.
    /// Elements without a scheme or without text are skipped; when two
    /// elements collapse onto the same canonical key the later one in
    /// document order wins.
    fn identifiers(&self) -> IndexMap<String, String> {
        let mut identifiers = IndexMap::new();

        for element in self.package.find_elements_by_name("identifier") {
            if element.namespace.as_deref() != Some(DC_NAMESPACE) {
                continue;
            }

            let scheme = element
                .get_attr_ns(OPF_NAMESPACE, "scheme")
                .or_else(|| element.get_attr("opf:scheme"))
                .or_else(|| element.get_attr("scheme"));
            let value = element.text();

            if let Some(scheme) = scheme {
                if !scheme.is_empty() && !value.is_empty() {
                    identifiers.insert(scheme::to_canonical(&scheme), value);
                }
            }
        }

        identifiers
    }

    /// Collects every non-blank `dc:subject`, in document order
    fn subjects(&self) -> Vec<String> {
        self.package
            .find_elements_by_name("subject")
            .filter(|element| element.namespace.as_deref() == Some(DC_NAMESPACE))
            .map(|element| element.text())
            .filter(|subject| !subject.is_empty())
            .collect()
    }

    /// Resolves the cover image entry, first success wins
    ///
    /// 1. The manifest item named by `meta[name="cover"]`, resolved against
    ///    the package document's directory, if that entry exists.
    /// 2. Any container entry whose file name is `cover.<image ext>` and
    ///    whose normalized path starts with the package document's
    ///    directory. The containment test is a plain string prefix, so a
    ///    sibling directory sharing the prefix also matches; that looseness
    ///    is long-standing behavior callers rely on.
    /// 3. The literal concatenation of the directory and the raw cover id,
    ///    unnormalized, if it names an existing entry.
    /// 4. Absent. Never an error.
    fn resolve_cover(&self) -> Option<String> {
        let cover_id = self.cover_meta_id();

        if !cover_id.is_empty() {
            if let Some(href) = self.manifest_href(&cover_id) {
                if !href.is_empty() {
                    let resolved = resolve_path(&self.base_dir, &href);
                    if self.container.contains(&resolved) {
                        return Some(resolved);
                    }
                }
            }
        }

        for name in self.container.names() {
            if !is_cover_filename(name) {
                continue;
            }

            let resolved = normalize_path(name);
            if resolved.starts_with(&self.base_dir) {
                return Some(resolved);
            }
        }

        let literal = format!("{}/{}", self.base_dir, cover_id);
        if self.container.contains(&literal) {
            return Some(literal);
        }

        None
    }

    /// The manifest item id declared by `metadata/meta[@name="cover"]`
    fn cover_meta_id(&self) -> String {
        self.package
            .find_elements_by_name("metadata")
            .find(|element| element.namespace.as_deref() == Some(OPF_NAMESPACE))
            .and_then(|metadata| {
                metadata
                    .children()
                    .find(|child| {
                        child.name == "meta"
                            && child.namespace.as_deref() == Some(OPF_NAMESPACE)
                            && child.get_attr("name").as_deref() == Some("cover")
                    })
                    .and_then(|meta| meta.get_attr("content"))
            })
            .map(|content| content.trim().to_string())
            .unwrap_or_default()
    }

    /// The `href` of the manifest item with the given id
    fn manifest_href(&self, id: &str) -> Option<String> {
        self.package
            .find_elements_by_name("manifest")
            .find(|element| element.namespace.as_deref() == Some(OPF_NAMESPACE))
            .and_then(|manifest| {
                manifest
                    .children()
                    .find(|item| {
                        item.name == "item"
                            && item.namespace.as_deref() == Some(OPF_NAMESPACE)
                            && item.get_attr("id").as_deref() == Some(id)
                    })
                    .and_then(|item| item.get_attr("href"))
            })
            .map(|href| href.trim().to_string())
    }
}

/// Whether an entry's file name looks like a conventional cover image
fn is_cover_filename(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let file_name = lower.rsplit('/').next().unwrap_or(lower.as_str());

    matches!(
        file_name,
        "cover.jpg" | "cover.jpeg" | "cover.png" | "cover.gif" | "cover.svg"
    )
}
