pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A type tag is absent from the catalog, or invalid for the role it is
    /// used in (e.g. a view used as a relationship endpoint).
    #[error("Invalid concept type: {message}")]
    ConceptType { message: String },

    /// A structurally well-typed relationship request violates the metamodel
    /// source/target compatibility table.
    ///
    /// The endpoint fields carry concept type names, not ids. They avoid the
    /// `source` name, which thiserror would wire to `Error::source()`.
    #[error(
        "Invalid relationship type '{relationship}' from '{source_type}' to '{target_type}'"
    )]
    Relationship {
        relationship: String,
        source_type: String,
        target_type: String,
    },

    /// An identifier did not resolve in the registry it was expected in.
    #[error("Unknown {registry} reference '{id}'")]
    Reference { registry: &'static str, id: String },

    /// An explicitly supplied identifier is already bound to another entity.
    #[error("Identifier '{id}' is already in use")]
    Conflict { id: String },

    /// The externally supplied metamodel rule table could not be loaded.
    #[error("Invalid metamodel rule table: {message}")]
    Rules { message: String },
}

impl Error {
    pub(crate) fn concept_type(message: impl Into<String>) -> Self {
        Error::ConceptType {
            message: message.into(),
        }
    }

    pub(crate) fn reference(registry: &'static str, id: impl Into<String>) -> Self {
        Error::Reference {
            registry,
            id: id.into(),
        }
    }
}
