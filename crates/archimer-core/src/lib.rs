//! In-memory ArchiMate model engine.
//!
//! An [`Model`] owns three registries (elements, relationships, views) plus
//! the folder and property-definition indexes, and validates every structural
//! mutation against a metamodel rule table. Views carry the diagram layer:
//! nodes with pixel geometry, connections with bendpoints, and the headless
//! layout operations (resize, distribute, L/S routing).
//!
//! ```
//! use archimer_core::{ElementType, Model, NodeSpec, RelationshipType};
//!
//! let mut model = Model::new("demo");
//! let app = model.add_element(ElementType::ApplicationComponent, "CRM");
//! let svc = model.add_element(ElementType::ApplicationService, "Customer data");
//! let rel = model
//!     .add_relationship(RelationshipType::Serving, &app, &svc)
//!     .unwrap();
//! let view = model.add_view("Landscape");
//! let node = model.add_node(&view, NodeSpec::element(&app)).unwrap();
//! assert_eq!(model.relationship(&rel).unwrap().source(), &app);
//! assert_eq!(model.view_of_node(&node), Some(&view));
//! ```

#![forbid(unsafe_code)]

mod concept;
mod error;
pub mod geom;
mod identity;
mod metamodel;
mod model;
mod property;
mod style;
mod view;

pub use concept::{Element, Relationship};
pub use error::{Error, Result};
pub use identity::Id;
pub use metamodel::{
    AccessType, Category, ConceptType, ElementType, MetamodelRules, RelationshipType,
};
pub use model::{ElementSpec, Model, RelationshipSpec, ViewSpec};
pub use property::PropertyDefinitions;
pub use style::{Font, Rgba, Style};
pub use view::{
    Connection, ConnectionSpec, Justify, Node, NodeKind, NodeSpec, ResizeOptions, SortChildren,
    View,
};
