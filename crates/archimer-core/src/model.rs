//! The model aggregate: element, relationship and view registries, the
//! folder index and the property-definition registry.
//!
//! All structural mutation goes through [`Model`], which validates the
//! metamodel rules, keeps the cross-registries consistent and cascades
//! deletes so no dangling reference survives an operation.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::concept::{Element, Relationship};
use crate::error::{Error, Result};
use crate::identity::Id;
use crate::metamodel::{
    AccessType, Category, ElementType, MetamodelRules, RelationshipType,
};
use crate::property::PropertyDefinitions;
use crate::style::Style;
use crate::view::{Connection, ConnectionSpec, Node, NodeKind, NodeSpec, View};

/// Creation parameters for [`Model::add_element_with`].
#[derive(Debug, Clone)]
pub struct ElementSpec {
    pub ty: ElementType,
    pub name: String,
    pub id: Option<Id>,
    pub description: Option<String>,
    pub folder: Option<String>,
}

impl ElementSpec {
    pub fn new(ty: ElementType, name: impl Into<String>) -> Self {
        ElementSpec {
            ty,
            name: name.into(),
            id: None,
            description: None,
            folder: None,
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn in_folder(mut self, path: impl Into<String>) -> Self {
        self.folder = Some(path.into());
        self
    }
}

/// Creation parameters for [`Model::add_relationship_with`].
#[derive(Debug, Clone)]
pub struct RelationshipSpec {
    pub ty: RelationshipType,
    pub source: Id,
    pub target: Id,
    pub id: Option<Id>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub access_type: Option<AccessType>,
    pub influence_strength: Option<String>,
    pub directed: Option<bool>,
}

impl RelationshipSpec {
    pub fn new(ty: RelationshipType, source: &Id, target: &Id) -> Self {
        RelationshipSpec {
            ty,
            source: source.clone(),
            target: target.clone(),
            id: None,
            name: None,
            description: None,
            folder: None,
            access_type: None,
            influence_strength: None,
            directed: None,
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Creation parameters for [`Model::add_view_with`].
#[derive(Debug, Clone)]
pub struct ViewSpec {
    pub name: String,
    pub id: Option<Id>,
    pub description: Option<String>,
    pub folder: Option<String>,
}

impl ViewSpec {
    pub fn new(name: impl Into<String>) -> Self {
        ViewSpec {
            name: name.into(),
            id: None,
            description: None,
            folder: None,
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }
}

/// An in-memory ArchiMate model.
#[derive(Debug, Clone)]
pub struct Model {
    id: Id,
    pub name: String,
    pub description: Option<String>,
    pub properties: IndexMap<String, String>,
    rules: MetamodelRules,
    property_defs: PropertyDefinitions,
    elements: IndexMap<Id, Element>,
    relationships: IndexMap<Id, Relationship>,
    views: IndexMap<Id, View>,
    /// node id -> owning view id, model-wide.
    node_view: IndexMap<Id, Id>,
    /// connection id -> owning view id, model-wide.
    connection_view: IndexMap<Id, Id>,
    /// folder path -> filed entity ids.
    folders: IndexMap<String, Vec<Id>>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Model {
            id: Id::generate(),
            name: name.into(),
            description: None,
            properties: IndexMap::new(),
            rules: MetamodelRules::builtin().clone(),
            property_defs: PropertyDefinitions::default(),
            elements: IndexMap::new(),
            relationships: IndexMap::new(),
            views: IndexMap::new(),
            node_view: IndexMap::new(),
            connection_view: IndexMap::new(),
            folders: IndexMap::new(),
        }
    }

    /// Replaces the metamodel rule table used by this model.
    pub fn with_rules(mut self, rules: MetamodelRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn rules(&self) -> &MetamodelRules {
        &self.rules
    }

    // ---- elements ----------------------------------------------------------

    pub fn add_element(&mut self, ty: ElementType, name: impl Into<String>) -> Id {
        let id = Id::generate();
        self.elements
            .insert(id.clone(), Element::new(id.clone(), ty, name));
        id
    }

    pub fn add_element_with(&mut self, spec: ElementSpec) -> Result<Id> {
        let id = match spec.id {
            Some(id) => {
                self.require_fresh(&id)?;
                id
            }
            None => Id::generate(),
        };
        let mut element = Element::new(id.clone(), spec.ty, spec.name);
        element.description = spec.description;
        self.elements.insert(id.clone(), element);
        if let Some(folder) = spec.folder {
            self.set_folder(&id, &folder)?;
        }
        Ok(id)
    }

    pub fn element(&self, id: &Id) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn element_mut(&mut self, id: &Id) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Changes an element's type in place.
    ///
    /// Lenient: existing relationships are not revalidated against the new
    /// type; run [`Model::check_invalid_connections`] afterwards if needed.
    pub fn set_element_type(&mut self, id: &Id, ty: ElementType) -> Result<()> {
        let element = self
            .elements
            .get_mut(id)
            .ok_or_else(|| Error::reference("elements", id.as_str()))?;
        element.ty = ty;
        Ok(())
    }

    /// Deletes an element together with every node depicting it and every
    /// relationship touching it.
    pub fn delete_element(&mut self, id: &Id) -> Result<()> {
        if !self.elements.contains_key(id) {
            return Err(Error::reference("elements", id.as_str()));
        }

        // Snapshot first: cascades re-enter these registries.
        let doomed_nodes: Vec<(Id, Id)> = self
            .views
            .iter()
            .flat_map(|(vid, view)| {
                view.nodes
                    .values()
                    .filter(|n| n.element.as_ref() == Some(id))
                    .map(|n| (vid.clone(), n.id.clone()))
            })
            .collect();
        for (vid, nid) in doomed_nodes {
            if self.view_owns_node(&vid, &nid) {
                self.delete_node(&vid, &nid)?;
            }
        }

        let doomed_rels: Vec<Id> = self
            .relationships
            .values()
            .filter(|r| r.source == *id || r.target == *id)
            .map(|r| r.id.clone())
            .collect();
        for rid in doomed_rels {
            if self.relationships.contains_key(&rid) {
                self.delete_relationship(&rid)?;
            }
        }

        tracing::debug!(element = %id, "deleting element");
        let folder = self.elements.get(id).and_then(|e| e.folder.clone());
        self.unfile(id, folder);
        self.elements.shift_remove(id);
        Ok(())
    }

    /// Merges `other` into `target`: nodes and relationships pointing at
    /// `other` are re-pointed at `target`, then `other` is deleted.
    ///
    /// With `merge_props`, properties absent on `target` are copied over and
    /// differing descriptions are concatenated with a `----` separator.
    pub fn merge_elements(&mut self, target: &Id, other: &Id, merge_props: bool) -> Result<()> {
        if target == other {
            return Ok(());
        }
        let target_ty = self
            .elements
            .get(target)
            .ok_or_else(|| Error::reference("elements", target.as_str()))?
            .ty;
        let other_el = self
            .elements
            .get(other)
            .ok_or_else(|| Error::reference("elements", other.as_str()))?;
        if other_el.ty != target_ty {
            return Err(Error::concept_type(format!(
                "cannot merge a {} into a {target_ty}",
                other_el.ty
            )));
        }

        if merge_props {
            let (props, desc) = (other_el.properties.clone(), other_el.description.clone());
            if let Some(t) = self.elements.get_mut(target) {
                for (key, value) in props {
                    t.properties.entry(key).or_insert(value);
                }
                if desc.is_some() && desc != t.description {
                    t.description = match (t.description.take(), desc) {
                        (Some(mine), Some(theirs)) => Some(format!("{mine}\n----\n{theirs}")),
                        (None, theirs) => theirs,
                        (mine, None) => mine,
                    };
                }
            }
        }

        for view in self.views.values_mut() {
            for node in view.nodes.values_mut() {
                if node.element.as_ref() == Some(other) {
                    node.element = Some(target.clone());
                }
            }
        }
        for rel in self.relationships.values_mut() {
            if rel.source == *other {
                rel.source = target.clone();
            }
            if rel.target == *other {
                rel.target = target.clone();
            }
        }

        // Nothing references the merged element anymore.
        self.delete_element(other)
    }

    // ---- relationships -----------------------------------------------------

    pub fn add_relationship(
        &mut self,
        ty: RelationshipType,
        source: &Id,
        target: &Id,
    ) -> Result<Id> {
        self.add_relationship_with(RelationshipSpec::new(ty, source, target))
    }

    pub fn add_relationship_with(&mut self, spec: RelationshipSpec) -> Result<Id> {
        // Validate everything before touching any registry.
        self.validate_relationship(spec.ty, &spec.source, &spec.target)?;
        let id = match spec.id {
            Some(id) => {
                self.require_fresh(&id)?;
                id
            }
            None => Id::generate(),
        };
        let mut rel = Relationship::new(id.clone(), spec.ty, spec.source, spec.target);
        if let Some(name) = spec.name {
            rel.name = name;
        }
        rel.description = spec.description;
        rel.set_access_type(spec.access_type);
        rel.set_influence_strength(spec.influence_strength);
        rel.set_directed(spec.directed);
        self.relationships.insert(id.clone(), rel);
        if let Some(folder) = spec.folder {
            self.set_folder(&id, &folder)?;
        }
        Ok(id)
    }

    pub fn relationship(&self, id: &Id) -> Option<&Relationship> {
        self.relationships.get(id)
    }

    pub fn relationship_mut(&mut self, id: &Id) -> Option<&mut Relationship> {
        self.relationships.get_mut(id)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Changes a relationship's type, re-running the metamodel check against
    /// its current endpoints.
    pub fn set_relationship_type(&mut self, id: &Id, ty: RelationshipType) -> Result<()> {
        let (source, target) = {
            let rel = self
                .relationships
                .get(id)
                .ok_or_else(|| Error::reference("relationships", id.as_str()))?;
            (rel.source.clone(), rel.target.clone())
        };
        self.validate_relationship(ty, &source, &target)?;
        if let Some(rel) = self.relationships.get_mut(id) {
            rel.ty = ty;
        }
        Ok(())
    }

    /// Deletes a relationship, cascading over relationships that use it as an
    /// endpoint and over the connections depicting it.
    pub fn delete_relationship(&mut self, id: &Id) -> Result<()> {
        if !self.relationships.contains_key(id) {
            return Err(Error::reference("relationships", id.as_str()));
        }

        let dependents: Vec<Id> = self
            .relationships
            .values()
            .filter(|r| r.source == *id || r.target == *id)
            .map(|r| r.id.clone())
            .collect();
        for rid in dependents {
            if self.relationships.contains_key(&rid) {
                self.delete_relationship(&rid)?;
            }
        }

        let doomed_conns: Vec<(Id, Id)> = self
            .views
            .iter()
            .flat_map(|(vid, view)| {
                view.connections
                    .values()
                    .filter(|c| c.relationship == *id)
                    .map(|c| (vid.clone(), c.id.clone()))
            })
            .collect();
        for (vid, cid) in doomed_conns {
            if self.view_owns_connection(&vid, &cid) {
                self.delete_connection(&vid, &cid)?;
            }
        }

        tracing::debug!(relationship = %id, "deleting relationship");
        let folder = self.relationships.get(id).and_then(|r| r.folder.clone());
        self.unfile(id, folder);
        self.relationships.shift_remove(id);
        Ok(())
    }

    fn validate_relationship(
        &self,
        ty: RelationshipType,
        source: &Id,
        target: &Id,
    ) -> Result<()> {
        let source_cat = self.endpoint_category(source)?;
        let target_cat = self.endpoint_category(target)?;
        if !self.rules.is_allowed(ty, source_cat, target_cat) {
            return Err(Error::Relationship {
                relationship: ty.to_string(),
                source_type: self.concept_label(source),
                target_type: self.concept_label(target),
            });
        }
        Ok(())
    }

    fn endpoint_category(&self, id: &Id) -> Result<Category> {
        if let Some(e) = self.elements.get(id) {
            Ok(e.ty.category())
        } else if self.relationships.contains_key(id) {
            Ok(Category::Relationship)
        } else if self.views.contains_key(id) {
            Err(Error::concept_type(format!(
                "view '{id}' cannot be a relationship endpoint"
            )))
        } else {
            Err(Error::reference("concepts", id.as_str()))
        }
    }

    fn concept_label(&self, id: &Id) -> String {
        if let Some(e) = self.elements.get(id) {
            e.ty.to_string()
        } else if let Some(r) = self.relationships.get(id) {
            r.ty.to_string()
        } else {
            id.to_string()
        }
    }

    /// The highest-priority relationship type the rules allow between the two
    /// concepts, or `None` when nothing is allowed.
    pub fn default_relationship_type(
        &self,
        source: &Id,
        target: &Id,
    ) -> Result<Option<RelationshipType>> {
        let source_cat = self.endpoint_category(source)?;
        let target_cat = self.endpoint_category(target)?;
        Ok(self.rules.default_relationship(source_cat, target_cat))
    }

    // ---- views, nodes and connections --------------------------------------

    pub fn add_view(&mut self, name: impl Into<String>) -> Id {
        let id = Id::generate();
        self.views.insert(id.clone(), View::new(id.clone(), name));
        id
    }

    pub fn add_view_with(&mut self, spec: ViewSpec) -> Result<Id> {
        let id = match spec.id {
            Some(id) => {
                self.require_fresh(&id)?;
                id
            }
            None => Id::generate(),
        };
        let mut view = View::new(id.clone(), spec.name);
        view.description = spec.description;
        self.views.insert(id.clone(), view);
        if let Some(folder) = spec.folder {
            self.set_folder(&id, &folder)?;
        }
        Ok(id)
    }

    pub fn view(&self, id: &Id) -> Option<&View> {
        self.views.get(id)
    }

    pub fn view_mut(&mut self, id: &Id) -> Option<&mut View> {
        self.views.get_mut(id)
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Deletes a view with all its nodes and connections.
    pub fn delete_view(&mut self, id: &Id) -> Result<()> {
        let view = self
            .views
            .shift_remove(id)
            .ok_or_else(|| Error::reference("views", id.as_str()))?;
        for nid in view.nodes.keys() {
            self.node_view.shift_remove(nid);
        }
        for cid in view.connections.keys() {
            self.connection_view.shift_remove(cid);
        }
        self.unfile(id, view.folder);
        Ok(())
    }

    /// The view a node lives on.
    pub fn view_of_node(&self, node: &Id) -> Option<&Id> {
        self.node_view.get(node)
    }

    /// Adds a node to a view. Element nodes must reference an existing
    /// element; label and container nodes must not carry one.
    pub fn add_node(&mut self, view: &Id, spec: NodeSpec) -> Result<Id> {
        if !self.views.contains_key(view) {
            return Err(Error::reference("views", view.as_str()));
        }
        match spec.kind {
            NodeKind::Element => {
                let element = spec
                    .element
                    .as_ref()
                    .ok_or_else(|| {
                        Error::concept_type("an element node needs an element reference")
                    })?;
                if !self.elements.contains_key(element) {
                    return Err(Error::reference("elements", element.as_str()));
                }
            }
            NodeKind::Label | NodeKind::Container => {
                if spec.element.is_some() {
                    return Err(Error::concept_type(
                        "label and container nodes carry no element reference",
                    ));
                }
            }
        }

        let id = match spec.id {
            Some(id) => {
                self.require_fresh(&id)?;
                id
            }
            None => Id::generate(),
        };

        let default_fill = spec
            .element
            .as_ref()
            .and_then(|e| self.elements.get(e))
            .map(|e| Style::default_fill(e.ty.category()));

        let Some(view_entry) = self.views.get_mut(view) else {
            return Err(Error::reference("views", view.as_str()));
        };
        if let Some(parent) = &spec.parent {
            if !view_entry.nodes.contains_key(parent) {
                return Err(Error::reference("nodes", parent.as_str()));
            }
        }

        let mut node = Node::new(id.clone(), spec.kind, spec.element);
        node.label = spec.label;
        node.x = spec.x.max(0);
        node.y = spec.y.max(0);
        node.w = spec.w.max(0);
        node.h = spec.h.max(0);
        node.parent = spec.parent;
        node.style = spec.style.unwrap_or_default();
        if node.style.fill_color.is_none() {
            node.style.fill_color = default_fill;
        }
        view_entry.insert_node(node);
        self.node_view.insert(id.clone(), view.clone());
        Ok(id)
    }

    /// Deletes a node and, recursively, its embedded children, together with
    /// all incident connections.
    pub fn delete_node(&mut self, view: &Id, node: &Id) -> Result<()> {
        self.delete_node_with(view, node, true, false)
    }

    /// Node deletion with explicit cascade control.
    ///
    /// Without `recurse`, embedded children are re-parented to the deleted
    /// node's parent. With `delete_element`, the depicted element itself is
    /// deleted from the model (which in turn removes its other depictions).
    pub fn delete_node_with(
        &mut self,
        view: &Id,
        node: &Id,
        recurse: bool,
        delete_element: bool,
    ) -> Result<()> {
        if !self.view_owns_node(view, node) {
            return Err(Error::reference("nodes", node.as_str()));
        }

        let incident: Vec<Id> = self
            .views
            .get(view)
            .map(|v| {
                v.connections
                    .values()
                    .filter(|c| c.source == *node || c.target == *node)
                    .map(|c| c.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        for cid in incident {
            if self.view_owns_connection(view, &cid) {
                self.delete_connection(view, &cid)?;
            }
        }

        let (children, parent, element) = match self.views.get(view).and_then(|v| v.nodes.get(node))
        {
            Some(n) => (n.children.clone(), n.parent.clone(), n.element.clone()),
            None => return Ok(()),
        };

        if recurse {
            for child in children {
                if self.view_owns_node(view, &child) {
                    self.delete_node_with(view, &child, true, delete_element)?;
                }
            }
        } else if let Some(v) = self.views.get_mut(view) {
            // Children climb up to the grandparent.
            for child in &children {
                if let Some(c) = v.nodes.get_mut(child) {
                    c.parent = parent.clone();
                }
                match &parent {
                    Some(p) => {
                        if let Some(pn) = v.nodes.get_mut(p) {
                            pn.children.push(child.clone());
                        }
                    }
                    None => v.roots.push(child.clone()),
                }
            }
            if let Some(n) = v.nodes.get_mut(node) {
                n.children.clear();
            }
        }

        if let Some(v) = self.views.get_mut(view) {
            v.detach_node(node);
        }
        self.node_view.shift_remove(node);

        if delete_element {
            if let Some(element) = element {
                if self.elements.contains_key(&element) {
                    self.delete_element(&element)?;
                }
            }
        }
        Ok(())
    }

    /// Adds a connection to a view. The relationship must exist and both
    /// endpoints must be nodes or connections of the same view.
    pub fn add_connection(&mut self, view: &Id, spec: ConnectionSpec) -> Result<Id> {
        if !self.views.contains_key(view) {
            return Err(Error::reference("views", view.as_str()));
        }
        if !self.relationships.contains_key(&spec.relationship) {
            return Err(Error::reference("relationships", spec.relationship.as_str()));
        }
        {
            let Some(v) = self.views.get(view) else {
                return Err(Error::reference("views", view.as_str()));
            };
            for endpoint in [&spec.source, &spec.target] {
                if !v.nodes.contains_key(endpoint) && !v.connections.contains_key(endpoint) {
                    return Err(Error::reference("nodes", endpoint.as_str()));
                }
            }
        }
        let id = match spec.id {
            Some(id) => {
                self.require_fresh(&id)?;
                id
            }
            None => Id::generate(),
        };
        let mut conn = Connection::new(id.clone(), spec.relationship, spec.source, spec.target);
        if let Some(style) = spec.style {
            conn.style = style;
        }
        if let Some(v) = self.views.get_mut(view) {
            v.insert_connection(conn);
        }
        self.connection_view.insert(id.clone(), view.clone());
        Ok(id)
    }

    /// Deletes a connection, cascading over connections that use it as an
    /// endpoint.
    pub fn delete_connection(&mut self, view: &Id, conn: &Id) -> Result<()> {
        if !self.view_owns_connection(view, conn) {
            return Err(Error::reference("connections", conn.as_str()));
        }
        let dependents: Vec<Id> = self
            .views
            .get(view)
            .map(|v| {
                v.connections
                    .values()
                    .filter(|c| c.source == *conn || c.target == *conn)
                    .map(|c| c.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        for cid in dependents {
            if self.view_owns_connection(view, &cid) {
                self.delete_connection(view, &cid)?;
            }
        }
        if let Some(v) = self.views.get_mut(view) {
            v.detach_connection(conn);
        }
        self.connection_view.shift_remove(conn);
        Ok(())
    }

    fn view_owns_node(&self, view: &Id, node: &Id) -> bool {
        self.views
            .get(view)
            .is_some_and(|v| v.nodes.contains_key(node))
    }

    fn view_owns_connection(&self, view: &Id, conn: &Id) -> bool {
        self.views
            .get(view)
            .is_some_and(|v| v.connections.contains_key(conn))
    }

    // Identifiers are unique across the whole model, nodes and connections
    // included, not just within one registry.
    fn require_fresh(&self, id: &Id) -> Result<()> {
        if self.elements.contains_key(id)
            || self.relationships.contains_key(id)
            || self.views.contains_key(id)
            || self.node_view.contains_key(id)
            || self.connection_view.contains_key(id)
        {
            return Err(Error::Conflict { id: id.to_string() });
        }
        Ok(())
    }

    // ---- queries -----------------------------------------------------------

    pub fn filter_elements(&self, f: impl Fn(&Element) -> bool) -> Vec<&Element> {
        self.elements.values().filter(|e| f(e)).collect()
    }

    pub fn find_elements(
        &self,
        name: Option<&str>,
        ty: Option<ElementType>,
    ) -> Vec<&Element> {
        self.filter_elements(|e| {
            name.is_none_or(|n| e.name == n) && ty.is_none_or(|t| e.ty == t)
        })
    }

    pub fn filter_relationships(&self, f: impl Fn(&Relationship) -> bool) -> Vec<&Relationship> {
        self.relationships.values().filter(|r| f(r)).collect()
    }

    pub fn filter_views(&self, f: impl Fn(&View) -> bool) -> Vec<&View> {
        self.views.values().filter(|v| f(v)).collect()
    }

    pub fn find_views(&self, name: &str) -> Vec<&View> {
        self.filter_views(|v| v.name == name)
    }

    /// Inbound relationships of a concept, optionally filtered by type.
    pub fn in_relationships(
        &self,
        concept: &Id,
        ty: Option<RelationshipType>,
    ) -> Vec<&Relationship> {
        self.filter_relationships(|r| r.target == *concept && ty.is_none_or(|t| r.ty == t))
    }

    /// Outbound relationships of a concept, optionally filtered by type.
    pub fn out_relationships(
        &self,
        concept: &Id,
        ty: Option<RelationshipType>,
    ) -> Vec<&Relationship> {
        self.filter_relationships(|r| r.source == *concept && ty.is_none_or(|t| r.ty == t))
    }

    /// All relationships touching a concept, optionally filtered by type.
    pub fn relationships_of(
        &self,
        concept: &Id,
        ty: Option<RelationshipType>,
    ) -> Vec<&Relationship> {
        self.filter_relationships(|r| {
            (r.source == *concept || r.target == *concept) && ty.is_none_or(|t| r.ty == t)
        })
    }

    /// Connections incident to a node on its view, optionally filtered by
    /// relationship type.
    pub fn connections_of(
        &self,
        node: &Id,
        ty: Option<RelationshipType>,
    ) -> Vec<&Connection> {
        self.node_connections(node, ty, true, true)
    }

    pub fn in_connections(&self, node: &Id, ty: Option<RelationshipType>) -> Vec<&Connection> {
        self.node_connections(node, ty, false, true)
    }

    pub fn out_connections(&self, node: &Id, ty: Option<RelationshipType>) -> Vec<&Connection> {
        self.node_connections(node, ty, true, false)
    }

    fn node_connections(
        &self,
        node: &Id,
        ty: Option<RelationshipType>,
        outbound: bool,
        inbound: bool,
    ) -> Vec<&Connection> {
        let Some(view) = self.node_view.get(node).and_then(|v| self.views.get(v)) else {
            return Vec::new();
        };
        view.connections
            .values()
            .filter(|c| {
                ((outbound && c.source == *node) || (inbound && c.target == *node))
                    && ty.is_none_or(|t| {
                        self.relationships
                            .get(&c.relationship)
                            .is_some_and(|r| r.ty == t)
                    })
            })
            .collect()
    }

    /// Finds an element by type and name, creating it when absent.
    pub fn get_or_create_element(&mut self, ty: ElementType, name: &str) -> Id {
        if let Some(e) = self
            .elements
            .values()
            .find(|e| e.ty == ty && e.name == name)
        {
            return e.id.clone();
        }
        self.add_element(ty, name)
    }

    /// Finds a relationship by type, endpoints and (optionally) name,
    /// creating it when absent.
    pub fn get_or_create_relationship(
        &mut self,
        ty: RelationshipType,
        source: &Id,
        target: &Id,
        name: Option<&str>,
    ) -> Result<Id> {
        if let Some(r) = self.relationships.values().find(|r| {
            r.ty == ty
                && r.source == *source
                && r.target == *target
                && name.is_none_or(|n| r.name == n)
        }) {
            return Ok(r.id.clone());
        }
        let mut spec = RelationshipSpec::new(ty, source, target);
        spec.name = name.map(str::to_owned);
        self.add_relationship_with(spec)
    }

    /// Finds a view by name, creating it when absent.
    pub fn get_or_create_view(&mut self, name: &str) -> Id {
        if let Some(v) = self.views.values().find(|v| v.name == name) {
            return v.id().clone();
        }
        self.add_view(name)
    }

    /// Finds the node depicting `element` on `view`, creating one when
    /// absent.
    pub fn get_or_create_node(&mut self, view: &Id, element: &Id) -> Result<Id> {
        if let Some(n) = self
            .views
            .get(view)
            .and_then(|v| v.nodes().find(|n| n.element() == Some(element)))
        {
            return Ok(n.id().clone());
        }
        self.add_node(view, NodeSpec::element(element))
    }

    /// Finds the connection depicting `relationship` between the given
    /// endpoints on `view`, creating one when absent.
    pub fn get_or_create_connection(
        &mut self,
        view: &Id,
        relationship: &Id,
        source: &Id,
        target: &Id,
    ) -> Result<Id> {
        if let Some(c) = self.views.get(view).and_then(|v| {
            v.connections().find(|c| {
                c.relationship() == relationship
                    && c.source() == source
                    && c.target() == target
            })
        }) {
            return Ok(c.id().clone());
        }
        self.add_connection(view, ConnectionSpec::new(relationship, source, target))
    }

    // ---- folders -----------------------------------------------------------

    /// Files an element, relationship or view under a `/`-separated path.
    pub fn set_folder(&mut self, id: &Id, path: &str) -> Result<()> {
        let path = normalize_folder(path);
        let old = if let Some(e) = self.elements.get_mut(id) {
            e.folder.replace(path.clone())
        } else if let Some(r) = self.relationships.get_mut(id) {
            r.folder.replace(path.clone())
        } else if let Some(v) = self.views.get_mut(id) {
            v.folder.replace(path.clone())
        } else {
            return Err(Error::reference("concepts", id.as_str()));
        };
        self.unfile(id, old);
        self.folders.entry(path).or_default().push(id.clone());
        Ok(())
    }

    /// Removes an entity from its folder, if any.
    pub fn clear_folder(&mut self, id: &Id) -> Result<()> {
        let old = if let Some(e) = self.elements.get_mut(id) {
            e.folder.take()
        } else if let Some(r) = self.relationships.get_mut(id) {
            r.folder.take()
        } else if let Some(v) = self.views.get_mut(id) {
            v.folder.take()
        } else {
            return Err(Error::reference("concepts", id.as_str()));
        };
        self.unfile(id, old);
        Ok(())
    }

    pub fn entities_in_folder(&self, path: &str) -> &[Id] {
        self.folders
            .get(&normalize_folder(path))
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn folders(&self) -> impl Iterator<Item = (&str, &[Id])> {
        self.folders.iter().map(|(p, ids)| (p.as_str(), ids.as_slice()))
    }

    fn unfile(&mut self, id: &Id, folder: Option<String>) {
        if let Some(path) = folder {
            if let Some(ids) = self.folders.get_mut(&path) {
                ids.retain(|x| x != id);
                if ids.is_empty() {
                    self.folders.shift_remove(&path);
                }
            }
        }
    }

    // ---- property definitions ----------------------------------------------

    /// Registers a property key, returning its stable definition id.
    pub fn define_property(&mut self, key: &str) -> String {
        self.property_defs.define(key)
    }

    pub fn property_definitions(&self) -> &PropertyDefinitions {
        &self.property_defs
    }

    // ---- diagnostics -------------------------------------------------------

    /// Node ids whose element reference no longer resolves. Never repairs.
    pub fn check_invalid_nodes(&self) -> Vec<Id> {
        let mut out = Vec::new();
        for view in self.views.values() {
            for node in view.nodes.values() {
                if let Some(element) = &node.element {
                    if !self.elements.contains_key(element) {
                        out.push(node.id.clone());
                    }
                }
            }
        }
        out
    }

    /// Connection ids with a broken relationship reference, a missing
    /// endpoint, or an endpoint depicting a concept the relationship does
    /// not connect. Never repairs.
    pub fn check_invalid_connections(&self) -> Vec<Id> {
        let mut out = Vec::new();
        for view in self.views.values() {
            for conn in view.connections.values() {
                if !self.connection_is_valid(view, conn) {
                    out.push(conn.id.clone());
                }
            }
        }
        out
    }

    fn connection_is_valid(&self, view: &View, conn: &Connection) -> bool {
        let Some(rel) = self.relationships.get(&conn.relationship) else {
            return false;
        };
        self.endpoint_matches(view, &conn.source, &rel.source)
            && self.endpoint_matches(view, &conn.target, &rel.target)
    }

    // A connection endpoint must exist in the view and depict the concept at
    // the matching end of the relationship. Label and container endpoints
    // depict nothing and are accepted as-is.
    fn endpoint_matches(&self, view: &View, endpoint: &Id, concept: &Id) -> bool {
        if let Some(node) = view.nodes.get(endpoint) {
            match &node.element {
                Some(element) => element == concept,
                None => true,
            }
        } else if let Some(conn) = view.connections.get(endpoint) {
            conn.relationship == *concept
        } else {
            false
        }
    }

    // ---- property embedding ------------------------------------------------

    /// Moves every property map (model, views, elements, relationships) into
    /// a `#properties` JSON block at the end of the owner's description.
    pub fn embed_properties(&mut self) {
        embed_into(&mut self.description, &mut self.properties);
        for view in self.views.values_mut() {
            embed_into(&mut view.description, &mut view.properties);
        }
        for element in self.elements.values_mut() {
            embed_into(&mut element.description, &mut element.properties);
        }
        for rel in self.relationships.values_mut() {
            embed_into(&mut rel.description, &mut rel.properties);
        }
    }

    /// Exact inverse of [`Model::embed_properties`]: parses trailing
    /// `#properties` blocks back into property maps and restores the
    /// descriptions byte for byte. Malformed blocks are left in place.
    pub fn expand_properties(&mut self) {
        expand_from(&mut self.description, &mut self.properties);
        for view in self.views.values_mut() {
            expand_from(&mut view.description, &mut view.properties);
        }
        for element in self.elements.values_mut() {
            expand_from(&mut element.description, &mut element.properties);
        }
        for rel in self.relationships.values_mut() {
            expand_from(&mut rel.description, &mut rel.properties);
        }
    }

    // ---- model merge -------------------------------------------------------

    /// Merges another model into this one.
    ///
    /// Property-definition id collisions are remapped before anything is
    /// inserted; entities with colliding ids merge attribute-wise (property
    /// union, descriptions concatenated with a `----` separator); views with
    /// colliding ids replace the existing view. Merging a model into a copy
    /// of itself changes no entity counts.
    pub fn merge_from(&mut self, other: &Model) {
        // Phase 1: resolve property-definition bindings.
        for (id, key) in other.property_defs.iter() {
            match self.property_defs.key_of(id) {
                Some(existing) if existing == key => {}
                Some(_) => {
                    let fresh = self.property_defs.define(key);
                    tracing::debug!(
                        old = id,
                        new = %fresh,
                        key,
                        "remapped colliding property definition"
                    );
                }
                None => {
                    if self.property_defs.id_of(key).is_none() {
                        self.property_defs.try_register(id, key);
                    }
                }
            }
        }

        // Phase 2: model attributes.
        for (key, value) in &other.properties {
            self.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        if other.description.is_some() && other.description != self.description {
            self.description = match (self.description.take(), other.description.clone()) {
                (Some(mine), Some(theirs)) => Some(format!("{mine}\n----\n{theirs}")),
                (None, theirs) => theirs,
                (mine, None) => mine,
            };
        }

        // Phase 3: concepts.
        for (id, element) in &other.elements {
            match self.elements.get_mut(id) {
                Some(mine) => merge_attrs(
                    &mut mine.properties,
                    &mut mine.description,
                    &element.properties,
                    &element.description,
                ),
                None => {
                    self.elements.insert(id.clone(), element.clone());
                    if let Some(folder) = element.folder.clone() {
                        self.folders.entry(folder).or_default().push(id.clone());
                    }
                }
            }
        }
        for (id, rel) in &other.relationships {
            match self.relationships.get_mut(id) {
                Some(mine) => merge_attrs(
                    &mut mine.properties,
                    &mut mine.description,
                    &rel.properties,
                    &rel.description,
                ),
                None => {
                    // `other` already upheld the metamodel rules for these.
                    self.relationships.insert(id.clone(), rel.clone());
                    if let Some(folder) = rel.folder.clone() {
                        self.folders.entry(folder).or_default().push(id.clone());
                    }
                }
            }
        }

        // Phase 4: views. Colliding view ids replace; node and connection
        // ids clashing with other views' content get fresh ids.
        for (vid, view) in &other.views {
            if self.views.contains_key(vid) {
                tracing::debug!(view = %vid, "replacing view on merge");
                let _ = self.delete_view(vid);
            }
            let mut incoming = view.clone();
            let clashes: Vec<Id> = incoming
                .nodes
                .keys()
                .filter(|n| self.node_view.contains_key(*n) || self.connection_view.contains_key(*n))
                .chain(incoming.connections.keys().filter(|c| {
                    self.node_view.contains_key(*c) || self.connection_view.contains_key(*c)
                }))
                .cloned()
                .collect();
            for old in clashes {
                let fresh = Id::generate();
                rename_view_entry(&mut incoming, &old, &fresh);
            }
            for nid in incoming.nodes.keys() {
                self.node_view.insert(nid.clone(), vid.clone());
            }
            for cid in incoming.connections.keys() {
                self.connection_view.insert(cid.clone(), vid.clone());
            }
            if let Some(folder) = incoming.folder.clone() {
                self.folders.entry(folder).or_default().push(vid.clone());
            }
            self.views.insert(vid.clone(), incoming);
        }
    }
}

fn normalize_folder(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

fn merge_attrs(
    properties: &mut IndexMap<String, String>,
    description: &mut Option<String>,
    other_properties: &IndexMap<String, String>,
    other_description: &Option<String>,
) {
    for (key, value) in other_properties {
        properties
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    if other_description.is_some() && other_description != description {
        *description = match (description.take(), other_description.clone()) {
            (Some(mine), Some(theirs)) => Some(format!("{mine}\n----\n{theirs}")),
            (None, theirs) => theirs,
            (mine, None) => mine,
        };
    }
}

fn rename_view_entry(view: &mut View, old: &Id, fresh: &Id) {
    if let Some(mut node) = view.nodes.shift_remove(old) {
        node.id = fresh.clone();
        view.nodes.insert(fresh.clone(), node);
        for root in &mut view.roots {
            if root == old {
                *root = fresh.clone();
            }
        }
        for node in view.nodes.values_mut() {
            if node.parent.as_ref() == Some(old) {
                node.parent = Some(fresh.clone());
            }
            for child in &mut node.children {
                if child == old {
                    *child = fresh.clone();
                }
            }
        }
    } else if let Some(mut conn) = view.connections.shift_remove(old) {
        conn.id = fresh.clone();
        view.connections.insert(fresh.clone(), conn);
    }
    for conn in view.connections.values_mut() {
        if conn.source == *old {
            conn.source = fresh.clone();
        }
        if conn.target == *old {
            conn.target = fresh.clone();
        }
    }
}

fn block_regex() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| Regex::new(r"(?:\A|\n\n)#properties = \{").expect("valid regex"))
}

fn embed_into(description: &mut Option<String>, properties: &mut IndexMap<String, String>) {
    if properties.is_empty() {
        return;
    }
    let json =
        serde_json::to_string_pretty(properties).unwrap_or_else(|_| "{}".to_owned());
    let block = format!("#properties = {json}");
    *description = match description.take() {
        Some(d) if !d.is_empty() => Some(format!("{d}\n\n{block}")),
        _ => Some(block),
    };
    properties.clear();
}

fn expand_from(description: &mut Option<String>, properties: &mut IndexMap<String, String>) {
    let extracted = description.as_deref().and_then(|d| {
        // The embedded block runs to the end of the description and its JSON
        // never contains a blank line, so only the last candidate can be the
        // block; any earlier marker is ordinary description text.
        let m = block_regex().find_iter(d).last()?;
        let parsed: IndexMap<String, String> =
            serde_json::from_str(&d[m.end() - 1..]).ok()?;
        Some((m.start(), parsed))
    });
    let Some((start, parsed)) = extracted else {
        return;
    };
    properties.extend(parsed);
    *description = match start {
        0 => None,
        _ => description.as_deref().map(|d| d[..start].to_owned()),
    };
}
