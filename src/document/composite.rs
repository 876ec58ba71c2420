//! Composite virtual fields aggregating sibling fields.

use ahash::AHashSet;

use crate::document::field::IndexingOptions;

/// A virtual field whose content is the aggregate of other fields' token
/// frequencies, selected by an include/exclude/default membership rule.
///
/// The canonical example is an `_all` field that indexes every other field
/// of the document. Composite fields never hold a value of their own; their
/// token frequencies are accumulated during document analysis.
#[derive(Debug, Clone)]
pub struct CompositeField {
    /// The virtual field name.
    pub name: String,
    /// Indexing options; composite fields are indexed, never stored.
    pub options: IndexingOptions,
    /// Field names explicitly included.
    include: AHashSet<String>,
    /// Field names explicitly excluded; takes precedence over the default.
    exclude: AHashSet<String>,
    /// Whether fields named by neither list are included.
    default_include: bool,
}

impl CompositeField {
    /// Create a new composite field.
    pub fn new<N: Into<String>>(
        name: N,
        include: Vec<String>,
        exclude: Vec<String>,
        default_include: bool,
        options: IndexingOptions,
    ) -> Self {
        CompositeField {
            name: name.into(),
            options,
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
            default_include,
        }
    }

    /// Create a composite field that aggregates every other field.
    pub fn all<N: Into<String>>(name: N, options: IndexingOptions) -> Self {
        CompositeField::new(name, Vec::new(), Vec::new(), true, options)
    }

    /// Evaluate the membership rule for a field name.
    pub fn includes_field(&self, field_name: &str) -> bool {
        if self.exclude.contains(field_name) {
            return false;
        }
        if self.include.contains(field_name) {
            return true;
        }
        self.default_include
    }
}
