//! XML normalization and owned XML values.

mod node;
mod normalize;

pub use node::{XmlAttribute, XmlElement, XmlNode};
pub use normalize::{
    normalize, parse_document, Content, ElementRecord, Normalized, RawAttribute, RawElement,
};
