use archimer_core::{
    ConnectionSpec, ElementType, Error, Id, Model, NodeSpec, RelationshipType, ViewSpec,
};

/// A small application landscape used by several scenarios.
fn landscape() -> (Model, Id, Id, Id, Id, Id, Id) {
    let mut m = Model::new("landscape");
    let component = m.add_element(ElementType::ApplicationComponent, "CRM");
    let service = m.add_element(ElementType::ApplicationService, "Customer data");
    let rel = m
        .add_relationship(RelationshipType::Serving, &component, &service)
        .unwrap();
    let view = m.add_view("Overview");
    let n1 = m
        .add_node(&view, NodeSpec::element(&component).at(100, 100))
        .unwrap();
    let n2 = m
        .add_node(&view, NodeSpec::element(&service).at(400, 100))
        .unwrap();
    m.add_connection(&view, ConnectionSpec::new(&rel, &n1, &n2))
        .unwrap();
    (m, component, service, rel, view, n1, n2)
}

#[test]
fn rejected_relationships_leave_no_trace() {
    let (mut m, component, service, ..) = landscape();
    let before = m.relationship_count();
    let err = m
        .add_relationship(RelationshipType::Composition, &service, &component)
        .unwrap_err();
    assert!(matches!(err, Error::Relationship { .. }));
    assert_eq!(m.relationship_count(), before);
    assert!(m
        .add_relationship(RelationshipType::Serving, &service, &component)
        .is_ok());
}

#[test]
fn deleting_an_element_cascades_through_every_registry() {
    let (mut m, _, service, rel, view, n1, _) = landscape();

    // A relationship on the relationship, depicted as a connection onto the
    // base connection, exercises both cascade chains.
    let driver = m.add_element(ElementType::Driver, "Cost");
    let meta = m
        .add_relationship(RelationshipType::Association, &driver, &rel)
        .unwrap();
    let n3 = m.add_node(&view, NodeSpec::element(&driver)).unwrap();
    let base_conn = m.connections_of(&n1, None)[0].id().clone();
    m.add_connection(&view, ConnectionSpec::new(&meta, &n3, &base_conn))
        .unwrap();

    m.delete_element(&service).unwrap();

    assert!(m.element(&service).is_none());
    assert!(m.relationship(&rel).is_none());
    assert!(m.relationship(&meta).is_none());
    assert_eq!(m.element_count(), 2);
    assert_eq!(m.relationship_count(), 0);
    let v = m.view(&view).unwrap();
    assert_eq!(v.node_count(), 2);
    assert_eq!(v.connection_count(), 0);
    assert!(m.check_invalid_nodes().is_empty());
    assert!(m.check_invalid_connections().is_empty());
}

#[test]
fn embed_then_expand_restores_descriptions_byte_for_byte() {
    let (mut m, component, _, rel, view, ..) = landscape();
    m.description = Some("Corporate model.\n\nWith two paragraphs.".to_owned());
    m.properties.insert("Version".to_owned(), "7".to_owned());
    {
        let e = m.element_mut(&component).unwrap();
        e.description = Some("Handles \"customers\" — and unicode: déjà vu".to_owned());
        e.set_property("Owner", "Ops");
        e.set_property("Tier", "1");
    }
    {
        let r = m.relationship_mut(&rel).unwrap();
        r.set_property("SLA", "99.9");
    }
    {
        let v = m.view_mut(&view).unwrap();
        v.description = Some("Main overview".to_owned());
        v.properties.insert("Layer".to_owned(), "app".to_owned());
    }

    let snapshot = (
        m.description.clone(),
        m.element(&component).unwrap().description.clone(),
        m.element(&component).unwrap().properties.clone(),
        m.relationship(&rel).unwrap().properties.clone(),
        m.view(&view).unwrap().description.clone(),
        m.view(&view).unwrap().properties.clone(),
    );

    m.embed_properties();
    assert!(m.properties.is_empty());
    assert!(m.element(&component).unwrap().properties.is_empty());
    assert!(m.relationship(&rel).unwrap().properties.is_empty());
    assert!(m.view(&view).unwrap().properties.is_empty());
    assert!(m
        .relationship(&rel)
        .unwrap()
        .description
        .as_deref()
        .unwrap()
        .starts_with("#properties = {"));

    m.expand_properties();
    assert_eq!(m.description, snapshot.0);
    assert_eq!(m.properties.get("Version").map(String::as_str), Some("7"));
    assert_eq!(m.element(&component).unwrap().description, snapshot.1);
    assert_eq!(m.element(&component).unwrap().properties, snapshot.2);
    assert_eq!(m.relationship(&rel).unwrap().properties, snapshot.3);
    assert_eq!(m.relationship(&rel).unwrap().description, None);
    assert_eq!(m.view(&view).unwrap().description, snapshot.4);
    assert_eq!(m.view(&view).unwrap().properties, snapshot.5);
}

#[test]
fn merging_a_copy_changes_no_counts() {
    let (mut m, ..) = landscape();
    m.define_property("Owner");
    let copy = m.clone();

    m.merge_from(&copy);

    assert_eq!(m.element_count(), copy.element_count());
    assert_eq!(m.relationship_count(), copy.relationship_count());
    assert_eq!(m.view_count(), copy.view_count());
    assert_eq!(m.property_definitions().len(), copy.property_definitions().len());
    for view in m.views() {
        let original = copy.view(view.id()).unwrap();
        assert_eq!(view.node_count(), original.node_count());
        assert_eq!(view.connection_count(), original.connection_count());
    }
    assert!(m.check_invalid_nodes().is_empty());
    assert!(m.check_invalid_connections().is_empty());
}

#[test]
fn merge_remaps_colliding_property_definitions() {
    let mut m1 = Model::new("a");
    assert_eq!(m1.define_property("Owner"), "propid-1");
    let mut m2 = Model::new("b");
    assert_eq!(m2.define_property("Status"), "propid-1");
    assert_eq!(m2.define_property("Owner"), "propid-2");

    m1.merge_from(&m2);

    // "Owner" keeps its binding; the colliding "Status" gets a fresh id.
    let defs = m1.property_definitions();
    assert_eq!(defs.id_of("Owner"), Some("propid-1"));
    assert_eq!(defs.id_of("Status"), Some("propid-2"));
    assert_eq!(defs.len(), 2);
}

#[test]
fn merge_freshens_colliding_node_ids() {
    let shared = Id::from("node-1");

    let mut m1 = Model::new("a");
    let e1 = m1.add_element(ElementType::BusinessActor, "Clerk");
    let v1 = m1.add_view("First");
    m1.add_node(&v1, NodeSpec::element(&e1).with_id(shared.clone()))
        .unwrap();

    let mut m2 = Model::new("b");
    let e2 = m2.add_element(ElementType::BusinessActor, "Manager");
    let v2 = m2
        .add_view_with(ViewSpec::new("Second"))
        .unwrap();
    m2.add_node(&v2, NodeSpec::element(&e2).with_id(shared.clone()))
        .unwrap();

    m1.merge_from(&m2);

    assert_eq!(m1.view_count(), 2);
    // The first view keeps its node; the merged one got a fresh id.
    assert!(m1.view(&v1).unwrap().node(&shared).is_some());
    let merged = m1.view(&v2).unwrap();
    assert_eq!(merged.node_count(), 1);
    assert!(merged.node(&shared).is_none());
    assert!(m1.check_invalid_nodes().is_empty());
}

#[test]
fn merge_unions_attributes_of_shared_concepts() {
    let (mut m1, component, ..) = landscape();
    m1.element_mut(&component).unwrap().set_property("Owner", "Ops");
    m1.element_mut(&component).unwrap().description = Some("ours".to_owned());

    let mut m2 = m1.clone();
    m2.element_mut(&component).unwrap().set_property("Owner", "Theirs");
    m2.element_mut(&component).unwrap().set_property("Tier", "1");
    m2.element_mut(&component).unwrap().description = Some("theirs".to_owned());

    m1.merge_from(&m2);
    let e = m1.element(&component).unwrap();
    assert_eq!(e.property("Owner"), Some("Ops"));
    assert_eq!(e.property("Tier"), Some("1"));
    assert_eq!(e.description.as_deref(), Some("ours\n----\ntheirs"));
}

#[test]
fn views_replace_on_id_collision() {
    let (mut m1, _, _, _, view, ..) = landscape();
    let mut m2 = m1.clone();
    m2.view_mut(&view).unwrap().name = "Replacement".to_owned();
    let extra = m2.add_element(ElementType::BusinessActor, "Clerk");
    m2.add_node(&view, NodeSpec::element(&extra)).unwrap();

    m1.merge_from(&m2);

    let v = m1.view(&view).unwrap();
    assert_eq!(v.name, "Replacement");
    assert_eq!(v.node_count(), 3);
    assert_eq!(m1.view_count(), 1);
    assert!(m1.check_invalid_nodes().is_empty());
    assert!(m1.check_invalid_connections().is_empty());
}
