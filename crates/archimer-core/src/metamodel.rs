//! The ArchiMate type catalog and the relationship compatibility rules.
//!
//! Types are closed enums: a concept carrying an unknown type tag cannot be
//! constructed, so catalog checks happen once at the deserialization boundary
//! (`FromStr`) instead of on every operation.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Coarse grouping of element types, used by the relationship rule table and
/// for default styling.
///
/// `Junction` covers all junction subtypes; `Relationship` is the
/// pseudo-category of a relationship used as a relationship endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Category {
    Strategy,
    Business,
    Application,
    Technology,
    Physical,
    Motivation,
    Implementation,
    Other,
    Junction,
    Relationship,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Strategy => "Strategy",
            Category::Business => "Business",
            Category::Application => "Application",
            Category::Technology => "Technology",
            Category::Physical => "Physical",
            Category::Motivation => "Motivation",
            Category::Implementation => "Implementation",
            Category::Other => "Other",
            Category::Junction => "Junction",
            Category::Relationship => "Relationship",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! element_types {
    ($($variant:ident => $category:ident),+ $(,)?) => {
        /// Every concrete ArchiMate element type, including junction subtypes.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub enum ElementType {
            $($variant,)+
        }

        impl ElementType {
            /// All element types in catalog order.
            pub const ALL: &'static [ElementType] = &[$(ElementType::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ElementType::$variant => stringify!($variant),)+
                }
            }

            pub fn category(&self) -> Category {
                match self {
                    $(ElementType::$variant => Category::$category,)+
                }
            }
        }
    };
}

element_types! {
    // Business layer
    BusinessActor => Business,
    BusinessRole => Business,
    BusinessCollaboration => Business,
    BusinessInterface => Business,
    BusinessProcess => Business,
    BusinessFunction => Business,
    BusinessInteraction => Business,
    BusinessEvent => Business,
    BusinessService => Business,
    BusinessObject => Business,
    Contract => Business,
    Representation => Business,
    Product => Business,
    // Application layer
    ApplicationComponent => Application,
    ApplicationInterface => Application,
    ApplicationCollaboration => Application,
    ApplicationFunction => Application,
    ApplicationProcess => Application,
    ApplicationEvent => Application,
    ApplicationService => Application,
    DataObject => Application,
    // Technology layer
    Node => Technology,
    Device => Technology,
    Path => Technology,
    CommunicationNetwork => Technology,
    SystemSoftware => Technology,
    TechnologyCollaboration => Technology,
    TechnologyInterface => Technology,
    TechnologyFunction => Technology,
    TechnologyProcess => Technology,
    TechnologyInteraction => Technology,
    TechnologyEvent => Technology,
    TechnologyService => Technology,
    Artifact => Technology,
    // Physical elements
    Equipment => Physical,
    Facility => Physical,
    DistributionNetwork => Physical,
    Material => Physical,
    // Motivation
    Stakeholder => Motivation,
    Driver => Motivation,
    Assessment => Motivation,
    Goal => Motivation,
    Outcome => Motivation,
    Principle => Motivation,
    Requirement => Motivation,
    Constraint => Motivation,
    Meaning => Motivation,
    Value => Motivation,
    // Strategy
    Resource => Strategy,
    Capability => Strategy,
    CourseOfAction => Strategy,
    // Implementation & migration
    WorkPackage => Implementation,
    Deliverable => Implementation,
    ImplementationEvent => Implementation,
    Plateau => Implementation,
    Gap => Implementation,
    // Other
    Grouping => Other,
    Location => Other,
    // Junctions
    Junction => Junction,
    OrJunction => Junction,
    AndJunction => Junction,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::concept_type(format!("unknown element type '{s}'")))
    }
}

/// Every ArchiMate relationship type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RelationshipType {
    Association,
    Assignment,
    Realization,
    Serving,
    Composition,
    Aggregation,
    Access,
    Influence,
    Triggering,
    Flow,
    Specialization,
}

impl RelationshipType {
    /// All relationship types in catalog order.
    pub const ALL: &'static [RelationshipType] = &[
        RelationshipType::Association,
        RelationshipType::Assignment,
        RelationshipType::Realization,
        RelationshipType::Serving,
        RelationshipType::Composition,
        RelationshipType::Aggregation,
        RelationshipType::Access,
        RelationshipType::Influence,
        RelationshipType::Triggering,
        RelationshipType::Flow,
        RelationshipType::Specialization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Association => "Association",
            RelationshipType::Assignment => "Assignment",
            RelationshipType::Realization => "Realization",
            RelationshipType::Serving => "Serving",
            RelationshipType::Composition => "Composition",
            RelationshipType::Aggregation => "Aggregation",
            RelationshipType::Access => "Access",
            RelationshipType::Influence => "Influence",
            RelationshipType::Triggering => "Triggering",
            RelationshipType::Flow => "Flow",
            RelationshipType::Specialization => "Specialization",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RelationshipType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::concept_type(format!("unknown relationship type '{s}'")))
    }
}

/// Access relationship qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    Access,
    Read,
    Write,
    ReadWrite,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Access => "Access",
            AccessType::Read => "Read",
            AccessType::Write => "Write",
            AccessType::ReadWrite => "ReadWrite",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The whole catalog in one tag, for format-reader boundaries that see
/// elements, relationships and views through a single type attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConceptType {
    Element(ElementType),
    Relationship(RelationshipType),
    View,
}

impl ConceptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConceptType::Element(t) => t.as_str(),
            ConceptType::Relationship(t) => t.as_str(),
            ConceptType::View => "View",
        }
    }
}

impl fmt::Display for ConceptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConceptType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(t) = ElementType::from_str(s) {
            return Ok(ConceptType::Element(t));
        }
        if let Ok(t) = RelationshipType::from_str(s) {
            return Ok(ConceptType::Relationship(t));
        }
        if s == "View" {
            return Ok(ConceptType::View);
        }
        Err(Error::concept_type(format!("unknown concept type '{s}'")))
    }
}

/// Priority order for picking a default relationship between two categories.
const DEFAULT_PRIORITY: &[RelationshipType] = &[
    RelationshipType::Realization,
    RelationshipType::Specialization,
    RelationshipType::Assignment,
    RelationshipType::Composition,
    RelationshipType::Association,
    RelationshipType::Serving,
    RelationshipType::Aggregation,
    RelationshipType::Access,
    RelationshipType::Influence,
    RelationshipType::Triggering,
    RelationshipType::Flow,
];

/// Relationship compatibility table: which relationship types are allowed
/// between which source/target categories.
#[derive(Debug, Clone)]
pub struct MetamodelRules {
    allowed: FxHashSet<(RelationshipType, Category, Category)>,
}

impl MetamodelRules {
    /// The built-in table embedded in the crate, parsed once per process.
    pub fn builtin() -> &'static MetamodelRules {
        static BUILTIN: OnceLock<MetamodelRules> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            MetamodelRules::from_yaml(include_str!("metamodel/rules.yaml"))
                .expect("embedded rule table parses")
        })
    }

    /// Loads a custom table from YAML shaped as
    /// `relationship -> source category -> [target categories]`.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let raw: IndexMap<RelationshipType, IndexMap<Category, Vec<Category>>> =
            serde_yaml::from_str(yaml).map_err(|e| Error::Rules {
                message: e.to_string(),
            })?;
        let mut allowed = FxHashSet::default();
        for (rel, by_source) in raw {
            for (source, targets) in by_source {
                for target in targets {
                    allowed.insert((rel, source, target));
                }
            }
        }
        if allowed.is_empty() {
            return Err(Error::Rules {
                message: "rule table allows no relationship at all".to_owned(),
            });
        }
        Ok(MetamodelRules { allowed })
    }

    pub fn is_allowed(
        &self,
        relationship: RelationshipType,
        source: Category,
        target: Category,
    ) -> bool {
        self.allowed.contains(&(relationship, source, target))
    }

    /// Picks the most specific relationship type allowed between the two
    /// categories, or `None` when the table allows nothing for the pair.
    pub fn default_relationship(
        &self,
        source: Category,
        target: Category,
    ) -> Option<RelationshipType> {
        DEFAULT_PRIORITY
            .iter()
            .copied()
            .find(|rel| self.is_allowed(*rel, source, target))
    }
}
