//! Document model: typed fields, indexing options, composite fields.

pub mod composite;
pub mod field;

pub use self::composite::CompositeField;
pub use self::field::{Field, FieldValue, IndexingOptions};

/// A document to be indexed: an external string ID plus an ordered list of
/// fields and zero or more composite virtual fields.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// The external document ID.
    pub id: String,
    /// The document's fields, in declaration order.
    pub fields: Vec<Field>,
    /// Composite fields aggregating the other fields' frequencies.
    pub composite_fields: Vec<CompositeField>,
}

impl Document {
    /// Create a new, empty document.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Document {
            id: id.into(),
            fields: Vec::new(),
            composite_fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn add_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Append a composite field.
    pub fn add_composite_field(&mut self, field: CompositeField) -> &mut Self {
        self.composite_fields.push(field);
        self
    }

    /// Look up the first field with the given name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_construction() {
        let mut doc = Document::new("doc1");
        doc.add_field(Field::text("desc", "beer", IndexingOptions::default()))
            .add_field(Field::numeric("abv", 5.2, IndexingOptions::STORED));
        doc.add_composite_field(CompositeField::all("_all", IndexingOptions::INDEXED));

        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.fields.len(), 2);
        assert_eq!(doc.composite_fields.len(), 1);
        assert!(doc.field("abv").is_some());
        assert!(doc.field("missing").is_none());
    }
}
