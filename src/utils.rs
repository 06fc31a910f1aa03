use std::{
    collections::HashMap,
    io::Cursor,
};

use quick_xml::{
    NsReader, Writer,
    escape::unescape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::error::EpubError;

/// Normalizes a POSIX-style relative path
///
/// Splits the path on `/`, drops empty and `.` segments, and pops the
/// previous segment on `..`. A `..` with nothing left to pop is simply
/// dropped, so the function is total on all inputs and never fails. The
/// result carries no leading slash and no `.`/`..` segments, and the
/// function is idempotent.
///
/// ## Parameters
/// - `path`: The path string to normalize
///
/// ## Return
/// - `String`: The normalized path, segments joined with `/`
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    segments.join("/")
}

/// Resolves a manifest-relative reference against a base directory
///
/// Concatenates the package document's directory with an `href` value and
/// normalizes the result, turning a manifest-relative reference into a
/// container-absolute entry name.
///
/// ## Parameters
/// - `base_dir`: The directory of the referencing document, `""` for the
///   container root
/// - `href`: The relative reference to resolve
pub fn resolve_path(base_dir: &str, href: &str) -> String {
    normalize_path(&format!("{}/{}", base_dir, href))
}

/// Provides functionality to decode byte data into strings
///
/// This trait is primarily used to decode raw byte data (such as text
/// entries read from an EPUB container) into a suitable string
/// representation. It supports automatic detection of multiple encoding
/// formats, including UTF-8 (with or without BOM), UTF-16 BE, and UTF-16 LE.
///
/// ## Notes
/// - When attempting to parse a byte stream lacking a BOM (Byte Order Mark),
///   the parsing results may be unreadable; caution should be exercised when
///   using such streams.
pub trait DecodeBytes {
    fn decode(&self) -> Result<String, EpubError>;
}

impl DecodeBytes for [u8] {
    fn decode(&self) -> Result<String, EpubError> {
        if self.is_empty() || self.len() < 4 {
            return Err(EpubError::EmptyDataError);
        }

        match self[0..3] {
            // Check UTF-8 BOM (0xEF, 0xBB, 0xBF)
            [0xEF, 0xBB, 0xBF, ..] => {
                String::from_utf8(self[3..].to_vec()).map_err(EpubError::from)
            }

            // Check UTF-16 BE BOM (0xFE, 0xFF)
            [0xFE, 0xFF, ..] => {
                let utf16_units: Vec<u16> = self[2..]
                    .chunks_exact(2)
                    .map(|b| u16::from_be_bytes([b[0], b[1]]))
                    .collect();

                String::from_utf16(&utf16_units).map_err(EpubError::from)
            }

            // Check UTF-16 LE BOM (0xFF, 0xFE)
            [0xFF, 0xFE, ..] => {
                let utf16_units: Vec<u16> = self[2..]
                    .chunks_exact(2)
                    .map(|b| u16::from_le_bytes([b[0], b[1]]))
                    .collect();

                String::from_utf16(&utf16_units).map_err(EpubError::from)
            }

            // Try without BOM, falling back to a lossy read
            _ => {
                if let Ok(utf8_str) = String::from_utf8(self.to_vec()) {
                    return Ok(utf8_str);
                }

                Ok(String::from_utf8_lossy(self).to_string())
            }
        }
    }
}

/// Represents a single attribute on an XML element
///
/// The raw qualified name is kept exactly as written in the source document
/// (e.g. `opf:scheme`, `xmlns:dc`) so the element can be serialized back out
/// without losing declarations. Prefixed attributes additionally carry their
/// resolved namespace once the document has been fully parsed.
#[derive(Debug, Clone)]
pub struct XmlAttr {
    /// The raw qualified attribute name as written in the source
    pub key: String,

    /// The resolved namespace of a prefixed attribute
    ///
    /// `None` for unprefixed attributes and for namespace declarations.
    pub namespace: Option<String>,

    /// The attribute value
    pub value: String,
}

/// Represents an element node in an XML document
///
/// The tree is fully owned and mutable: the package-document writer updates
/// text, replaces children, and appends new elements in place before the
/// tree is serialized back to text.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The local name of the element (excluding namespace prefix)
    pub name: String,

    /// The namespace prefix of the element
    pub prefix: Option<String>,

    /// The resolved namespace of the element
    pub namespace: Option<String>,

    /// The attributes of the element, in source order
    pub attributes: Vec<XmlAttr>,

    /// The text content of the element
    pub text: Option<String>,

    /// The children of the element, in source order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Create a new element with no prefix, attributes, or content
    pub fn new(name: String) -> Self {
        Self {
            name,
            prefix: None,
            namespace: None,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Get the full tag name of the element
    ///
    /// If the element has a namespace prefix, return "prefix:name" format;
    /// otherwise, return only the element name.
    pub fn tag_name(&self) -> String {
        if let Some(prefix) = &self.prefix {
            format!("{}:{}", prefix, self.name)
        } else {
            self.name.clone()
        }
    }

    /// Gets the text content of the element and all its child elements
    ///
    /// Collects the text content of the current element and the text content
    /// of all its child elements, removing leading and trailing whitespace.
    pub fn text(&self) -> String {
        let mut result = String::new();

        if let Some(text_value) = &self.text {
            result.push_str(text_value);
        }

        for child in &self.children {
            result.push_str(&child.text());
        }

        result.trim().to_string()
    }

    /// Replaces the text content of the element
    ///
    /// An empty value clears the content entirely.
    pub fn set_text(&mut self, value: &str) {
        self.text = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }

    /// Returns the value of the attribute with the given raw qualified name
    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|attr| attr.key == name)
            .map(|attr| attr.value.clone())
    }

    /// Returns the value of an attribute by namespace and local name
    ///
    /// Matches attributes whose prefix resolved to the given namespace,
    /// whatever the prefix was spelled as in the source.
    pub fn get_attr_ns(&self, namespace: &str, local_name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|attr| {
                attr.namespace.as_deref() == Some(namespace)
                    && attr.key.rsplit(':').next() == Some(local_name)
            })
            .map(|attr| attr.value.clone())
    }

    /// Sets an attribute by raw qualified name, replacing any existing value
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(attr) = self.attributes.iter_mut().find(|attr| attr.key == name) {
            attr.value = value.to_string();
        } else {
            self.attributes.push(XmlAttr {
                key: name.to_string(),
                namespace: None,
                value: value.to_string(),
            });
        }
    }

    /// Find all elements with the specified local name, in document order
    pub fn find_elements_by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a XmlElement> {
        let mut found = Vec::new();
        self.collect_by_name(name, &mut found);
        found.into_iter()
    }

    fn collect_by_name<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        if self.name == name {
            found.push(self);
        }
        for child in &self.children {
            child.collect_by_name(name, found);
        }
    }

    /// Get children elements
    pub fn children(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter()
    }
}

/// XML parser used to parse XML content and build an XML element tree
pub struct XmlReader {}

impl XmlReader {
    /// Parses an XML string and builds the root element
    ///
    /// This function takes an XML string, parses its content using the
    /// `quick_xml` library, and builds an [XmlElement] tree representing the
    /// structure of the entire document. Namespace declarations are collected
    /// across the document and resolved onto elements and prefixed attributes
    /// in a second pass; the declarations themselves remain in the attribute
    /// lists so the tree serializes back out intact.
    ///
    /// ## Parameters
    /// - `content`: The XML string to be parsed
    ///
    /// ## Return
    /// - `Ok(XmlElement)`: The root element of the XML element tree
    /// - `Err(EpubError)`: An error occurred during parsing
    pub fn parse(content: &str) -> Result<XmlElement, EpubError> {
        if content.is_empty() {
            return Err(EpubError::EmptyDataError);
        }

        let mut reader = NsReader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack = Vec::<XmlElement>::new();
        let mut root = None;
        let mut namespace_map = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Eof) => break,

                Ok(Event::Start(e)) => {
                    let element = Self::build_element(&e, &mut namespace_map);
                    stack.push(element);
                }

                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        // The element closing with an empty stack is the root
                        if stack.is_empty() {
                            root = Some(element);
                        } else if let Some(parent) = stack.last_mut() {
                            parent.children.push(element);
                        }
                    }
                }

                // A self-closing element is never the root of a document
                // this crate reads, so it always has a parent on the stack
                Ok(Event::Empty(e)) => {
                    let element = Self::build_element(&e, &mut namespace_map);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }

                Ok(Event::Text(e)) => {
                    if let Some(element) = stack.last_mut() {
                        let raw = String::from_utf8_lossy(e.as_ref()).to_string();
                        let text = unescape(&raw)
                            .map(|cow| cow.to_string())
                            .unwrap_or(raw);
                        if !text.trim().is_empty() {
                            element.text = Some(text);
                        }
                    }
                }

                Ok(Event::CData(e)) => {
                    if let Some(element) = stack.last_mut() {
                        element.text = Some(String::from_utf8_lossy(e.as_ref()).to_string());
                    }
                }

                Err(err) => return Err(err.into()),

                // Ignore the following events (elements):
                // Comment, PI, Declaration, Doctype, GeneralRef
                _ => continue,
            }
        }

        if let Some(element) = root.as_mut() {
            Self::assign_namespace(element, &namespace_map);
        }

        root.ok_or(EpubError::EmptyDataError)
    }

    /// Builds an element from a start or self-closing tag
    ///
    /// Namespace declarations are recorded into the prefix map and kept in
    /// the element's attribute list.
    fn build_element(e: &BytesStart, namespace_map: &mut HashMap<String, String>) -> XmlElement {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
        let mut element = XmlElement::new(name);

        if let Some(prefix) = e.name().prefix() {
            element.prefix = Some(String::from_utf8_lossy(prefix.as_ref()).to_string());
        }

        for attr in e.attributes().flatten() {
            let attr_key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let raw_value = String::from_utf8_lossy(&attr.value).to_string();
            let attr_value = unescape(&raw_value)
                .map(|cow| cow.to_string())
                .unwrap_or(raw_value);

            if attr_key == "xmlns" {
                namespace_map.insert(attr_key.clone(), attr_value.clone());
            } else if let Some(prefix) = attr_key.strip_prefix("xmlns:") {
                namespace_map.insert(prefix.to_string(), attr_value.clone());
            }

            element.attributes.push(XmlAttr {
                key: attr_key,
                namespace: None,
                value: attr_value,
            });
        }

        element
    }

    /// Assign namespaces to elements and prefixed attributes recursively
    ///
    /// ## Parameters
    /// - `element`: The element to assign namespaces to
    /// - `namespace_map`: The prefix-namespace map collected during parsing
    fn assign_namespace(element: &mut XmlElement, namespace_map: &HashMap<String, String>) {
        if let Some(prefix) = &element.prefix {
            if let Some(namespace) = namespace_map.get(prefix) {
                element.namespace = Some(namespace.clone());
            }
        } else if let Some(namespace) = namespace_map.get("xmlns") {
            element.namespace = Some(namespace.clone());
        }

        for attr in element.attributes.iter_mut() {
            if attr.key == "xmlns" || attr.key.starts_with("xmlns:") {
                continue;
            }

            if let Some((prefix, _)) = attr.key.split_once(':') {
                if let Some(namespace) = namespace_map.get(prefix) {
                    attr.namespace = Some(namespace.clone());
                }
            }
        }

        for child in element.children.iter_mut() {
            Self::assign_namespace(child, namespace_map);
        }
    }
}

/// XML serializer producing a text document from an element tree
pub struct XmlWriter {}

impl XmlWriter {
    /// Serializes an element tree back to an XML document string
    ///
    /// Emits an XML declaration followed by the tree in document order.
    /// Attribute order and namespace declarations are written exactly as
    /// held in the tree; elements without text or children are written as
    /// self-closing tags.
    ///
    /// ## Parameters
    /// - `root`: The root element to serialize
    ///
    /// ## Return
    /// - `Ok(String)`: The serialized document
    /// - `Err(EpubError)`: An error occurred while writing events
    pub fn serialize(root: &XmlElement) -> Result<String, EpubError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Self::write_element(&mut writer, root)?;

        let data = writer.into_inner().into_inner();
        String::from_utf8(data).map_err(EpubError::from)
    }

    fn write_element(
        writer: &mut Writer<Cursor<Vec<u8>>>,
        element: &XmlElement,
    ) -> Result<(), EpubError> {
        let tag = element.tag_name();
        let mut start = BytesStart::new(tag.as_str());

        for attr in &element.attributes {
            start.push_attribute((attr.key.as_str(), attr.value.as_str()));
        }

        if element.text.is_none() && element.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;

        if let Some(text) = &element.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }

        for child in &element.children {
            Self::write_element(writer, child)?;
        }

        writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        Ok(())
    }
}
