//! The subset of PDF object types the writer emits.
//!
//! Everything is written as a direct object except the catalog, the page tree,
//! pages, content streams and the info dictionary, which become indirect
//! objects numbered by the assembler.

use indexmap::IndexMap;

/// Dictionary entries, written in insertion order.
pub type Dictionary = IndexMap<String, Object>;

/// A PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Integer
    Integer(i64),
    /// Real number, written without exponent
    Real(f64),
    /// String bytes, written literal or hex depending on content
    String(Vec<u8>),
    /// Name, without the leading `/`
    Name(String),
    /// Array
    Array(Vec<Object>),
    /// Dictionary
    Dictionary(Dictionary),
    /// Stream; `/Length` is always taken from `data`
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream body
        data: bytes::Bytes,
    },
    /// Reference to an indirect object
    Reference(ObjectRef),
}

/// Number and generation of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number, always 0 for freshly written files
    pub gen: u16,
}

impl ObjectRef {
    /// Reference to object `id` at generation `gen`.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<ObjectRef> for Object {
    fn from(value: ObjectRef) -> Self {
        Object::Reference(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_display() {
        assert_eq!(ObjectRef::new(12, 0).to_string(), "12 0 R");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Object::from(3), Object::Integer(3));
        assert_eq!(
            Object::from(ObjectRef::new(2, 0)),
            Object::Reference(ObjectRef { id: 2, gen: 0 })
        );
    }
}
