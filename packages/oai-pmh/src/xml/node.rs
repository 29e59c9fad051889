//! Owned XML values for content that outlives the parsed document.
//!
//! Verb validators only interpret the fixed OAI-PMH fields. Everything the
//! protocol leaves open (`<description>`, `<metadata>`, `<about>`,
//! `<setDescription>`) is copied into these types so domain records can be
//! handed to callers after the response text is dropped.

use std::collections::BTreeMap;

use roxmltree::{Node, NodeType};
use serde::{Deserialize, Serialize};

/// Namespace bound to the `xml` prefix, never redeclared.
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// One attribute of an owned element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlAttribute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub value: String,
}

/// An owned XML element.
///
/// `attributes` is keyed by qualified name (`lang`, `xsi:schemaLocation`), so
/// attributes sharing a local name in different namespaces stay apart.
/// `children` is `None` for an element without child nodes (`<a/>` or `<a></a>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, XmlAttribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<XmlNode>>,
}

/// An owned XML child node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: Option<String>,
    },
}

impl XmlElement {
    /// Copy a document element, including its whole subtree.
    pub(crate) fn from_node(node: Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        let namespace = tag.namespace();

        let attributes = node
            .attributes()
            .map(|attr| {
                let namespace = attr.namespace();
                let prefix = namespace.and_then(|uri| node.lookup_prefix(uri));
                (
                    qualified_name(prefix, attr.name()),
                    XmlAttribute {
                        prefix: prefix.map(str::to_string),
                        namespace: namespace.map(str::to_string),
                        value: attr.value().to_string(),
                    },
                )
            })
            .collect();

        let children = node
            .has_children()
            .then(|| XmlNode::from_children(node));

        Self {
            prefix: namespace
                .and_then(|uri| node.lookup_prefix(uri))
                .map(str::to_string),
            name: tag.name().to_string(),
            namespace: namespace.map(str::to_string),
            attributes,
            children,
        }
    }

    /// Attribute value by qualified name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|a| a.value.as_str())
    }

    /// Child elements, skipping text, comments and processing instructions.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children
            .iter()
            .flatten()
            .filter_map(|child| match child {
                XmlNode::Element(el) => Some(el),
                _ => None,
            })
    }

    /// Concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for child in self.children.iter().flatten() {
            match child {
                XmlNode::Text(t) => text.push_str(t),
                XmlNode::Element(el) => text.push_str(&el.text_content()),
                _ => {}
            }
        }
        text
    }

    /// Serialize the element back to XML text.
    ///
    /// Namespace declarations are emitted where a prefix is first used, so the
    /// output is well-formed on its own.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out, &BTreeMap::new());
        out
    }
}

impl XmlNode {
    pub(crate) fn from_node(node: Node<'_, '_>) -> Option<Self> {
        match node.node_type() {
            NodeType::Element => Some(Self::Element(XmlElement::from_node(node))),
            NodeType::Text => Some(Self::Text(node.text().unwrap_or_default().to_string())),
            NodeType::Comment => Some(Self::Comment(
                node.text().unwrap_or_default().to_string(),
            )),
            NodeType::PI => node.pi().map(|pi| Self::ProcessingInstruction {
                target: pi.target.to_string(),
                value: pi.value.map(str::to_string),
            }),
            NodeType::Root => None,
        }
    }

    /// Copy all child nodes of a document node.
    pub(crate) fn from_children(node: Node<'_, '_>) -> Vec<Self> {
        node.children().filter_map(Self::from_node).collect()
    }

    /// Serialize the node back to XML text.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out, &BTreeMap::new());
        out
    }
}

/// In-scope prefix bindings while serializing; `None` is the default namespace.
type Scope = BTreeMap<Option<String>, String>;

fn write_node(node: &XmlNode, out: &mut String, scope: &Scope) {
    match node {
        XmlNode::Element(el) => write_element(el, out, scope),
        XmlNode::Text(text) => out.push_str(&escape_text(text)),
        XmlNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        XmlNode::ProcessingInstruction { target, value } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(value) = value {
                out.push(' ');
                out.push_str(value);
            }
            out.push_str("?>");
        }
    }
}

fn write_element(el: &XmlElement, out: &mut String, parent_scope: &Scope) {
    let mut scope = parent_scope.clone();
    let mut declarations: Vec<(Option<String>, String)> = Vec::new();

    match &el.namespace {
        Some(uri) => {
            if scope.get(&el.prefix) != Some(uri) {
                scope.insert(el.prefix.clone(), uri.clone());
                declarations.push((el.prefix.clone(), uri.clone()));
            }
        }
        None => {
            if el.prefix.is_none() && scope.remove(&None).is_some() {
                declarations.push((None, String::new()));
            }
        }
    }

    for attr in el.attributes.values() {
        if let (Some(prefix), Some(uri)) = (&attr.prefix, &attr.namespace) {
            let key = Some(prefix.clone());
            if uri != XML_NAMESPACE && scope.get(&key) != Some(uri) {
                scope.insert(key.clone(), uri.clone());
                declarations.push((key, uri.clone()));
            }
        }
    }

    let qualified = qualified_name(el.prefix.as_deref(), &el.name);
    out.push('<');
    out.push_str(&qualified);

    for (prefix, uri) in &declarations {
        match prefix {
            Some(p) => out.push_str(&format!(" xmlns:{p}=\"{}\"", escape_attribute(uri))),
            None => out.push_str(&format!(" xmlns=\"{}\"", escape_attribute(uri))),
        }
    }

    for (name, attr) in &el.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }

    match &el.children {
        None => out.push_str("/>"),
        Some(children) => {
            out.push('>');
            for child in children {
                write_node(child, out, &scope);
            }
            out.push_str("</");
            out.push_str(&qualified);
            out.push('>');
        }
    }
}

fn qualified_name(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{name}"),
        None => name.to_string(),
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
