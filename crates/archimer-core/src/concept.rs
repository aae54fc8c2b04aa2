//! Model concepts: elements and relationships.
//!
//! Both are owned by a [`Model`](crate::Model) and cross-referenced by [`Id`];
//! the fields that carry structural invariants (identity, type, endpoints)
//! are only mutable through the model, which revalidates them.

use indexmap::IndexMap;

use crate::identity::Id;
use crate::metamodel::{AccessType, ElementType, RelationshipType};

/// A named ArchiMate element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub(crate) id: Id,
    pub(crate) ty: ElementType,
    pub name: String,
    pub description: Option<String>,
    pub(crate) folder: Option<String>,
    pub properties: IndexMap<String, String>,
}

impl Element {
    pub(crate) fn new(id: Id, ty: ElementType, name: impl Into<String>) -> Self {
        Element {
            id,
            ty,
            name: name.into(),
            description: None,
            folder: None,
            properties: IndexMap::new(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn element_type(&self) -> ElementType {
        self.ty
    }

    /// Organization folder path, if the element has been filed.
    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        self.properties.shift_remove(key)
    }
}

/// A typed, directed relationship between two concepts.
///
/// Endpoints may be elements or other relationships (nesting one level of
/// indirection per hop); views are never endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub(crate) id: Id,
    pub(crate) ty: RelationshipType,
    pub(crate) source: Id,
    pub(crate) target: Id,
    pub name: String,
    pub description: Option<String>,
    pub(crate) folder: Option<String>,
    pub properties: IndexMap<String, String>,
    pub(crate) access_type: Option<AccessType>,
    pub(crate) influence_strength: Option<String>,
    pub(crate) directed: Option<bool>,
}

impl Relationship {
    pub(crate) fn new(id: Id, ty: RelationshipType, source: Id, target: Id) -> Self {
        Relationship {
            id,
            ty,
            source,
            target,
            name: String::new(),
            description: None,
            folder: None,
            properties: IndexMap::new(),
            access_type: None,
            influence_strength: None,
            directed: None,
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn relationship_type(&self) -> RelationshipType {
        self.ty
    }

    pub fn source(&self) -> &Id {
        &self.source
    }

    pub fn target(&self) -> &Id {
        &self.target
    }

    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        self.properties.shift_remove(key)
    }

    pub fn access_type(&self) -> Option<AccessType> {
        self.access_type
    }

    /// Sets the access qualifier. Lenient: silently ignored unless this is
    /// an Access relationship, so readers can apply qualifiers uniformly.
    pub fn set_access_type(&mut self, value: Option<AccessType>) {
        if self.ty == RelationshipType::Access {
            self.access_type = value;
        }
    }

    pub fn influence_strength(&self) -> Option<&str> {
        self.influence_strength.as_deref()
    }

    /// Sets the influence strength. Lenient: silently ignored unless this is
    /// an Influence relationship.
    pub fn set_influence_strength(&mut self, value: Option<impl Into<String>>) {
        if self.ty == RelationshipType::Influence {
            self.influence_strength = value.map(Into::into);
        }
    }

    pub fn directed(&self) -> Option<bool> {
        self.directed
    }

    /// Sets the directedness flag. Lenient: silently ignored unless this is
    /// an Association relationship.
    pub fn set_directed(&mut self, value: Option<bool>) {
        if self.ty == RelationshipType::Association {
            self.directed = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(ty: RelationshipType) -> Relationship {
        Relationship::new(Id::generate(), ty, Id::generate(), Id::generate())
    }

    #[test]
    fn qualifier_setters_match_type() {
        let mut access = rel(RelationshipType::Access);
        access.set_access_type(Some(AccessType::ReadWrite));
        assert_eq!(access.access_type(), Some(AccessType::ReadWrite));

        let mut influence = rel(RelationshipType::Influence);
        influence.set_influence_strength(Some("++"));
        assert_eq!(influence.influence_strength(), Some("++"));

        let mut assoc = rel(RelationshipType::Association);
        assoc.set_directed(Some(true));
        assert_eq!(assoc.directed(), Some(true));
    }

    #[test]
    fn qualifier_setters_are_lenient_on_mismatch() {
        let mut serving = rel(RelationshipType::Serving);
        serving.set_access_type(Some(AccessType::Read));
        serving.set_influence_strength(Some("10"));
        serving.set_directed(Some(true));
        assert_eq!(serving.access_type(), None);
        assert_eq!(serving.influence_strength(), None);
        assert_eq!(serving.directed(), None);
    }

    #[test]
    fn element_properties() {
        let mut e = Element::new(Id::generate(), ElementType::BusinessActor, "Clerk");
        e.set_property("Owner", "Ops");
        assert_eq!(e.property("Owner"), Some("Ops"));
        assert_eq!(e.remove_property("Owner"), Some("Ops".to_owned()));
        assert_eq!(e.property("Owner"), None);
    }
}
