//! Content-derived identity for elements of unordered collections
//!
//! An element's identity is the SHA-256 digest of its field values written in
//! a fixed order. Each value is prefixed with its byte length and followed by
//! `-`, so no two distinct field sequences share an encoding. Nested unordered collections
//! contribute the identity of their canonical form, so reordering at any
//! depth leaves every identity unchanged.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::enums::{EventType, Method, SslProtocol};

/// SHA-256 identity of a set element
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId([u8; 32]);

impl ContentId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short())
    }
}

/// Accumulates the field values of one element
#[derive(Debug, Default)]
pub struct IdentityWriter {
    buf: String,
}

impl IdentityWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one length-prefixed field value followed by the separator
    pub fn field(&mut self, value: impl fmt::Display) -> &mut Self {
        use fmt::Write;
        let value = value.to_string();
        // Writing into a String cannot fail
        let _ = write!(self.buf, "{}:{}-", value.len(), value);
        self
    }

    /// Absent values are written as the empty string
    pub fn opt<V: fmt::Display>(&mut self, value: Option<V>) -> &mut Self {
        match value {
            Some(v) => self.field(v),
            None => self.field(""),
        }
    }

    /// Write the identity of a nested unordered collection
    pub fn set<T: SetIdentity>(&mut self, items: &[T]) -> &mut Self {
        let id = set_id(items);
        self.field(id)
    }

    /// Write an ordered list element by element
    pub fn list<V: fmt::Display>(&mut self, items: &[V]) -> &mut Self {
        for item in items {
            self.field(item);
        }
        self
    }

    pub fn finish(&self) -> ContentId {
        let digest = Sha256::digest(self.buf.as_bytes());
        ContentId(digest.into())
    }
}

/// An element of an unordered collection
pub trait SetIdentity {
    /// Write the element's fields in their fixed order
    fn write_identity(&self, w: &mut IdentityWriter);

    fn content_id(&self) -> ContentId {
        let mut w = IdentityWriter::new();
        self.write_identity(&mut w);
        w.finish()
    }
}

macro_rules! display_identity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl SetIdentity for $ty {
                fn write_identity(&self, w: &mut IdentityWriter) {
                    w.field(self);
                }
            }
        )+
    };
}

display_identity!(String, u16, Method, SslProtocol, EventType);

/// Order elements by identity and collapse duplicates
///
/// Only equal elements collapse. Distinct elements that happen to share an
/// identity are all kept, in input order.
pub fn canonicalize<T: SetIdentity + Clone + PartialEq>(items: &[T]) -> Vec<T> {
    let mut by_id: BTreeMap<ContentId, Vec<T>> = BTreeMap::new();
    for item in items {
        let bucket = by_id.entry(item.content_id()).or_default();
        if !bucket.contains(item) {
            bucket.push(item.clone());
        }
    }
    by_id.into_values().flatten().collect()
}

/// Identity of a whole unordered collection
pub fn set_id<T: SetIdentity>(items: &[T]) -> ContentId {
    let mut ids: Vec<ContentId> = items.iter().map(SetIdentity::content_id).collect();
    ids.sort();
    ids.dedup();

    let mut w = IdentityWriter::new();
    for id in ids {
        w.field(id);
    }
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonicalize_is_order_independent() {
        let a = canonicalize(&strings(&["b.example", "a.example", "c.example"]));
        let b = canonicalize(&strings(&["c.example", "b.example", "a.example"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonicalize_collapses_duplicates() {
        let items = canonicalize(&strings(&["x", "y", "x"]));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_set_id_ignores_order_and_duplicates() {
        let a = set_id(&[Method::Get, Method::Head]);
        let b = set_id(&[Method::Head, Method::Get, Method::Get]);
        assert_eq!(a, b);
        assert_ne!(a, set_id(&[Method::Get]));
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        let mut a = IdentityWriter::new();
        a.field("ab").field("c");
        let mut b = IdentityWriter::new();
        b.field("a").field("bc");
        assert_ne!(a.finish(), b.finish());

        // values that contain the separator itself
        let mut c = IdentityWriter::new();
        c.field("X-Flag").field("-1");
        let mut d = IdentityWriter::new();
        d.field("X-Flag-").field("1");
        assert_ne!(c.finish(), d.finish());
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Colliding(&'static str);

    impl SetIdentity for Colliding {
        fn write_identity(&self, w: &mut IdentityWriter) {
            w.field("same");
        }
    }

    #[test]
    fn test_canonicalize_keeps_distinct_elements_sharing_an_identity() {
        let items = canonicalize(&[Colliding("a"), Colliding("b"), Colliding("a")]);
        assert_eq!(items, vec![Colliding("a"), Colliding("b")]);
    }

    #[test]
    fn test_identity_is_hex_sha256() {
        let id = "example".to_string().content_id();
        assert_eq!(id.to_string().len(), 64);
        assert_eq!(id.short().len(), 12);
    }
}
