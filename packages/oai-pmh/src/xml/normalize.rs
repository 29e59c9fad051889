//! Normalization of a node's child list into a generic record.
//!
//! OAI-PMH never mixes element children and non-whitespace text at one
//! nesting level, so every level is either a mapping from element name to the
//! elements carrying that name, or a single string. Nested content is not
//! normalized eagerly: each `RawElement` keeps its document node and callers
//! normalize it again when (and how) they need to.

use std::collections::BTreeMap;

use roxmltree::{Document, Node, NodeType, ParsingOptions};

use crate::error::StructuralError;
use crate::xml::node::{XmlElement, XmlNode};

/// Parse response text into a document.
///
/// DTDs are tolerated since some providers still send a doctype.
pub fn parse_document(xml: &str) -> Result<Document<'_>, StructuralError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(xml, options)?)
}

/// An attribute of a [`RawElement`], split into prefix and local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    pub prefix: Option<&'a str>,
    pub name: &'a str,
    pub value: &'a str,
}

impl RawAttribute<'_> {
    /// `prefix:name`, or the bare local name for an unprefixed attribute.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.to_string(),
        }
    }
}

/// An element found while normalizing, before any verb-specific interpretation.
#[derive(Debug, Clone)]
pub struct RawElement<'a, 'input> {
    pub prefix: Option<&'a str>,
    pub name: &'a str,
    /// Attributes in document order; local names may repeat across namespaces.
    pub attributes: Vec<RawAttribute<'a>>,
    node: Node<'a, 'input>,
}

impl<'a, 'input> RawElement<'a, 'input> {
    fn new(node: Node<'a, 'input>) -> Self {
        let tag = node.tag_name();
        let prefix = tag.namespace().and_then(|uri| node.lookup_prefix(uri));

        let attributes = node
            .attributes()
            .map(|attr| RawAttribute {
                prefix: attr.namespace().and_then(|uri| node.lookup_prefix(uri)),
                name: attr.name(),
                value: attr.value(),
            })
            .collect();

        Self {
            prefix,
            name: tag.name(),
            attributes,
            node,
        }
    }

    /// Whether the source element had any child nodes at all.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.node.has_children()
    }

    /// Normalize this element's children.
    ///
    /// Returns `None` when the element has no child nodes, so "absent" and
    /// "present but empty" stay distinguishable.
    pub fn normalize_children(
        &self,
        path: &str,
    ) -> Result<Option<Normalized<'a, 'input>>, StructuralError> {
        if !self.has_children() {
            return Ok(None);
        }
        normalize(self.node, path).map(Some)
    }

    /// Copy the element and its subtree out of the document.
    #[must_use]
    pub fn to_owned_element(&self) -> XmlElement {
        XmlElement::from_node(self.node)
    }

    /// Copy only the element's child nodes out of the document.
    #[must_use]
    pub fn owned_children(&self) -> Vec<XmlNode> {
        XmlNode::from_children(self.node)
    }
}

/// Element name to the elements sharing that name, in document order.
#[derive(Debug, Clone, Default)]
pub struct ElementRecord<'a, 'input> {
    entries: BTreeMap<&'a str, Vec<RawElement<'a, 'input>>>,
}

impl<'a, 'input> ElementRecord<'a, 'input> {
    fn push(&mut self, element: RawElement<'a, 'input>) {
        self.entries.entry(element.name).or_default().push(element);
    }

    /// Number of distinct element names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[RawElement<'a, 'input>]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.keys().copied()
    }
}

/// Content of one nesting level: element children or text, never both.
#[derive(Debug, Clone)]
pub enum Content<'a, 'input> {
    Record(ElementRecord<'a, 'input>),
    Text(String),
}

/// Result of normalizing a child list.
#[derive(Debug, Clone)]
pub struct Normalized<'a, 'input> {
    pub content: Content<'a, 'input>,
    /// Comments and processing instructions, re-serialized and kept aside.
    pub unparsed: Vec<String>,
}

impl<'a, 'input> Normalized<'a, 'input> {
    /// The element record, if this level holds elements (possibly none).
    #[must_use]
    pub fn as_record(&self) -> Option<&ElementRecord<'a, 'input>> {
        match &self.content {
            Content::Record(record) => Some(record),
            Content::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Record(_) => None,
        }
    }
}

/// Normalize the child nodes of `parent`.
///
/// `path` only names the location in error messages.
pub fn normalize<'a, 'input>(
    parent: Node<'a, 'input>,
    path: &str,
) -> Result<Normalized<'a, 'input>, StructuralError> {
    let mut record = ElementRecord::default();
    let mut text: Option<String> = None;
    let mut unparsed = Vec::new();

    for child in parent.children() {
        match child.node_type() {
            NodeType::Element => {
                if text.is_some() {
                    return Err(mixed_content(path));
                }
                record.push(RawElement::new(child));
            }
            NodeType::Text => {
                let value = child.text().unwrap_or_default();
                if value.trim().is_empty() {
                    continue;
                }
                if !record.is_empty() {
                    return Err(mixed_content(path));
                }
                text.get_or_insert_with(String::new).push_str(value);
            }
            NodeType::Comment | NodeType::PI => {
                if let Some(node) = XmlNode::from_node(child) {
                    unparsed.push(node.to_xml_string());
                }
            }
            NodeType::Root => {}
        }
    }

    let content = match text {
        Some(text) => Content::Text(text),
        None => Content::Record(record),
    };

    Ok(Normalized { content, unparsed })
}

fn mixed_content(path: &str) -> StructuralError {
    StructuralError::MixedContent {
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_children(xml: &str) -> Result<(usize, Option<String>), StructuralError> {
        let doc = parse_document(xml)?;
        let normalized = normalize(doc.root_element(), "root")?;
        Ok((
            normalized.as_record().map_or(0, ElementRecord::len),
            normalized.as_text().map(str::to_string),
        ))
    }

    #[test]
    fn test_groups_elements_by_name_in_document_order() {
        let doc = parse_document("<root><a>1</a><b/><a>2</a></root>").unwrap();
        let normalized = normalize(doc.root_element(), "root").unwrap();
        let record = normalized.as_record().unwrap();

        assert_eq!(record.len(), 2);
        let a = record.get("a").unwrap();
        assert_eq!(a.len(), 2);
        let texts: Vec<_> = a
            .iter()
            .map(|el| {
                el.normalize_children("root/a")
                    .unwrap()
                    .unwrap()
                    .as_text()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(texts, vec!["1", "2"]);
        assert!(!record.get("b").unwrap()[0].has_children());
    }

    #[test]
    fn test_text_only_level_is_string() {
        assert_eq!(
            root_children("<root>  value  </root>").unwrap(),
            (0, Some("  value  ".to_string()))
        );
    }

    #[test]
    fn test_cdata_is_text() {
        assert_eq!(
            root_children("<root><![CDATA[a < b]]></root>").unwrap().1,
            Some("a < b".to_string())
        );
    }

    #[test]
    fn test_whitespace_between_elements_is_ignored() {
        assert_eq!(
            root_children("<root>\n  <a/>\n  <b/>\n</root>").unwrap(),
            (2, None)
        );
    }

    #[test]
    fn test_mixed_content_is_rejected_both_orders() {
        let err = root_children("<root>text<a/></root>").unwrap_err();
        assert_eq!(
            err,
            StructuralError::MixedContent {
                path: "root".to_string()
            }
        );
        assert!(root_children("<root><a/>text</root>").is_err());
    }

    #[test]
    fn test_empty_children_yield_empty_record() {
        let doc = parse_document("<root>   </root>").unwrap();
        let normalized = normalize(doc.root_element(), "root").unwrap();
        assert!(normalized.as_record().unwrap().is_empty());

        let doc = parse_document("<root><a/></root>").unwrap();
        let normalized = normalize(doc.root_element(), "root").unwrap();
        let a = &normalized.as_record().unwrap().get("a").unwrap()[0];
        assert!(a.normalize_children("root/a").unwrap().is_none());
    }

    #[test]
    fn test_comments_are_kept_aside() {
        let doc = parse_document("<root><!-- hi --><a/><?pi data?></root>").unwrap();
        let normalized = normalize(doc.root_element(), "root").unwrap();
        assert_eq!(normalized.as_record().unwrap().len(), 1);
        assert_eq!(normalized.unparsed, vec!["<!-- hi -->", "<?pi data?>"]);
    }

    #[test]
    fn test_prefix_is_split_from_name() {
        let doc = parse_document(
            r#"<root xmlns:x="urn:x"><x:item x:kind="k" plain="p"/></root>"#,
        )
        .unwrap();
        let normalized = normalize(doc.root_element(), "root").unwrap();
        let item = &normalized.as_record().unwrap().get("item").unwrap()[0];

        assert_eq!(item.prefix, Some("x"));
        assert_eq!(item.name, "item");
        assert_eq!(
            item.attributes,
            vec![
                RawAttribute {
                    prefix: Some("x"),
                    name: "kind",
                    value: "k"
                },
                RawAttribute {
                    prefix: None,
                    name: "plain",
                    value: "p"
                },
            ]
        );
        assert_eq!(item.attributes[0].qualified_name(), "x:kind");
    }

    #[test]
    fn test_attributes_sharing_local_name_are_not_merged() {
        let doc = parse_document(
            r#"<root xmlns:p="urn:p"><item p:status="bogus" status="deleted"/></root>"#,
        )
        .unwrap();
        let normalized = normalize(doc.root_element(), "root").unwrap();
        let item = &normalized.as_record().unwrap().get("item").unwrap()[0];

        let names: Vec<_> = item.attributes.iter().map(RawAttribute::qualified_name).collect();
        assert_eq!(names, vec!["p:status", "status"]);
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            parse_document("<root>"),
            Err(StructuralError::MalformedXml(_))
        ));
    }
}
