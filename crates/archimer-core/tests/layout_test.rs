use archimer_core::geom::{point, Direction};
use archimer_core::{
    ConnectionSpec, ElementType, Id, Model, NodeSpec, RelationshipType, ResizeOptions,
};

fn about(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Model with one view, returning ids of the model and the view.
fn scene() -> (Model, Id) {
    let mut m = Model::new("scene");
    let view = m.add_view("Layout");
    (m, view)
}

fn add_box(m: &mut Model, view: &Id, x: i32, y: i32, w: i32, h: i32) -> Id {
    m.add_node(view, NodeSpec::container().at(x, y).sized(w, h))
        .unwrap()
}

#[test]
fn moving_a_parent_carries_embedded_nodes() {
    let mut m = Model::new("embed");
    let zone = m.add_element(ElementType::Grouping, "Zone");
    let app = m.add_element(ElementType::ApplicationComponent, "CRM");
    let view = m.add_view("Layout");
    let parent = m
        .add_node(&view, NodeSpec::element(&zone).at(100, 100).sized(200, 200))
        .unwrap();
    let child = m
        .add_node(&view, NodeSpec::element(&app).at(150, 150).under(&parent))
        .unwrap();

    let v = m.view_mut(&view).unwrap();
    v.set_node_x(&parent, 70).unwrap();
    v.set_node_y(&parent, 70).unwrap();

    let v = m.view(&view).unwrap();
    let c = v.node(&child).unwrap();
    assert_eq!((c.x(), c.y()), (120, 120));
    assert_eq!(v.node_rx(&child), Some(50));
    assert_eq!(v.node_ry(&child), Some(50));
}

#[test]
fn resize_wraps_children_into_rows() {
    let (mut m, view) = scene();
    let outer = add_box(&mut m, &view, 0, 0, 10, 10);
    let kids: Vec<Id> = (0..5)
        .map(|_| {
            m.add_node(
                &view,
                NodeSpec::container().sized(100, 50).under(&outer),
            )
            .unwrap()
        })
        .collect();

    let v = m.view_mut(&view).unwrap();
    v.resize_node(&outer, &ResizeOptions::default()).unwrap();

    let v = m.view(&view).unwrap();
    // Three per row with a 40px margin and 20px gaps.
    assert_eq!(v.node_rx(&kids[0]), Some(40));
    assert_eq!(v.node_rx(&kids[1]), Some(160));
    assert_eq!(v.node_rx(&kids[2]), Some(280));
    assert_eq!(v.node_rx(&kids[3]), Some(40));
    assert_eq!(v.node_ry(&kids[3]), Some(115));
    let o = v.node(&outer).unwrap();
    assert_eq!((o.w(), o.h()), (400, 185));
}

#[test]
fn l_shape_routes_with_one_corner() {
    let (mut m, view) = scene();
    let a = add_box(&mut m, &view, 0, 0, 100, 50);
    let b = add_box(&mut m, &view, 300, 200, 100, 50);
    let e1 = m.add_element(ElementType::ApplicationComponent, "A");
    let e2 = m.add_element(ElementType::ApplicationComponent, "B");
    let rel = m
        .add_relationship(RelationshipType::Flow, &e1, &e2)
        .unwrap();
    let conn = m
        .add_connection(&view, ConnectionSpec::new(&rel, &a, &b))
        .unwrap();

    let v = m.view_mut(&view).unwrap();
    v.route_l_shape(&conn, Direction::Horizontal, 0.5, 0.5)
        .unwrap();

    let bps = m.view(&view).unwrap().connection(&conn).unwrap().bendpoints();
    assert_eq!(bps.len(), 1);
    assert!(about(bps[0].x, 350.0));
    assert!(about(bps[0].y, 25.0));
}

#[test]
fn s_shape_routes_with_two_corners() {
    let (mut m, view) = scene();
    let a = add_box(&mut m, &view, 0, 0, 100, 50);
    let b = add_box(&mut m, &view, 400, 300, 100, 50);
    let e1 = m.add_element(ElementType::ApplicationComponent, "A");
    let e2 = m.add_element(ElementType::ApplicationComponent, "B");
    let rel = m
        .add_relationship(RelationshipType::Flow, &e1, &e2)
        .unwrap();
    let conn = m
        .add_connection(&view, ConnectionSpec::new(&rel, &a, &b))
        .unwrap();

    let v = m.view_mut(&view).unwrap();
    v.route_s_shape(&conn, Direction::Horizontal, 0.5, 0.5, 0.5)
        .unwrap();

    let bps = m.view(&view).unwrap().connection(&conn).unwrap().bendpoints();
    assert_eq!(bps.len(), 2);
    assert!(about(bps[0].x, 250.0) && about(bps[0].y, 25.0));
    assert!(about(bps[1].x, 250.0) && about(bps[1].y, 325.0));
}

#[test]
fn distribute_spreads_ten_spokes_deterministically() {
    let (mut m, view) = scene();
    // Hub centered at (450, 450); ten spokes to the right, all overlapping
    // the hub's vertical span and strictly above its centerline.
    let hub = add_box(&mut m, &view, 400, 400, 100, 100);
    let spokes: Vec<Id> = (0..10)
        .map(|k| add_box(&mut m, &view, 700, 355 + 7 * k, 100, 50))
        .collect();
    let e1 = m.add_element(ElementType::ApplicationComponent, "Hub");
    let e2 = m.add_element(ElementType::ApplicationComponent, "Spoke");
    let rel = m
        .add_relationship(RelationshipType::Flow, &e1, &e2)
        .unwrap();
    let conns: Vec<Id> = spokes
        .iter()
        .map(|s| {
            m.add_connection(&view, ConnectionSpec::new(&rel, &hub, s))
                .unwrap()
        })
        .collect();

    m.view_mut(&view).unwrap().distribute_connections(&hub).unwrap();

    let snapshot: Vec<(f64, f64)> = {
        let v = m.view(&view).unwrap();
        conns
            .iter()
            .map(|c| {
                let bps = v.connection(c).unwrap().bendpoints();
                assert_eq!(bps.len(), 1);
                (bps[0].x, bps[0].y)
            })
            .collect()
    };

    // All near bendpoints sit on the right edge's extension, spread at
    // 1/11 .. 10/11 of the hub height. Spoke k has bearing increasing with
    // its distance above the centerline, so the lowest spoke comes first.
    for (k, &(x, y)) in snapshot.iter().enumerate() {
        assert!(about(x, 600.0));
        let slot = (10 - k) as f64;
        assert!(about(y, 400.0 + 100.0 * slot / 11.0));
    }

    // A second pass reproduces the exact same layout.
    m.view_mut(&view).unwrap().distribute_connections(&hub).unwrap();
    let v = m.view(&view).unwrap();
    for (c, &(x, y)) in conns.iter().zip(&snapshot) {
        let bps = v.connection(c).unwrap().bendpoints();
        assert_eq!(bps.len(), 1);
        assert!(about(bps[0].x, x));
        assert!(about(bps[0].y, y));
    }
}

#[test]
fn distribute_buckets_all_four_edges() {
    let (mut m, view) = scene();
    let hub = add_box(&mut m, &view, 400, 400, 100, 100);
    let e1 = m.add_element(ElementType::ApplicationComponent, "Hub");
    let e2 = m.add_element(ElementType::ApplicationComponent, "Spoke");
    let rel = m
        .add_relationship(RelationshipType::Flow, &e1, &e2)
        .unwrap();
    let connect = |m: &mut Model, sx, sy, bx, by| {
        let spoke = add_box(m, &view, sx, sy, 100, 50);
        let c = m
            .add_connection(&view, ConnectionSpec::new(&rel, &hub, &spoke))
            .unwrap();
        m.view_mut(&view)
            .unwrap()
            .connection_mut(&c)
            .unwrap()
            .add_bendpoint(point(bx, by));
        c
    };

    // Hub centered at (450, 450). Spokes chosen so the preset bendpoints
    // land two per edge plus one exactly on the bottom-right corner, and
    // the bearings cross the 0/360 seam on the right and straddle 180 on
    // the left.
    let right_hi = connect(&mut m, 800, 200, 550.0, 450.0); // bearing ~29.4
    let right_lo = connect(&mut m, 800, 600, 560.0, 440.0); // bearing ~336.4
    let corner = connect(&mut m, 800, 800, 550.0, 550.0); // bearing ~316.8
    let bottom_far = connect(&mut m, 100, 800, 440.0, 560.0); // bearing ~231.3
    let bottom_near = connect(&mut m, 600, 800, 460.0, 570.0); // bearing ~298.1
    let left_hi = connect(&mut m, 100, 100, 350.0, 445.0); // bearing ~132.7
    let left_lo = connect(&mut m, 100, 700, 340.0, 460.0); // bearing ~222.5
    let top_left = connect(&mut m, 150, 50, 440.0, 350.0); // bearing ~123.7
    let top_right = connect(&mut m, 700, 50, 460.0, 340.0); // bearing ~51.3

    m.view_mut(&view).unwrap().distribute_connections(&hub).unwrap();

    let v = m.view(&view).unwrap();
    let bp = |c: &Id| {
        let bps = v.connection(c).unwrap().bendpoints();
        assert_eq!(bps.len(), 1);
        bps[0]
    };

    // Right edge holds three points, counterclockwise from the upper spoke
    // through the seam to the lower ones; only y moves.
    let p = bp(&right_hi);
    assert!(about(p.x, 550.0) && about(p.y, 425.0));
    let p = bp(&right_lo);
    assert!(about(p.x, 560.0) && about(p.y, 475.0));

    // The corner point sits in both the right and bottom buckets: the right
    // pass places its y, the bottom pass its x.
    let p = bp(&corner);
    assert!(about(p.x, 475.0) && about(p.y, 450.0));

    // Bottom edge, ordered by ascending bearing; only x moves.
    let p = bp(&bottom_far);
    assert!(about(p.x, 425.0) && about(p.y, 560.0));
    let p = bp(&bottom_near);
    assert!(about(p.x, 450.0) && about(p.y, 570.0));

    // Left edge orders by the bearing folded across 180, so the spoke above
    // the centerline comes first even though its raw bearing is smaller.
    let p = bp(&left_hi);
    assert!(about(p.x, 350.0) && about(p.y, 450.0 - 100.0 * (0.5 - 1.0 / 3.0)));
    let p = bp(&left_lo);
    assert!(about(p.x, 340.0) && about(p.y, 450.0 - 100.0 * (0.5 - 2.0 / 3.0)));

    // Top edge orders by descending bearing, left to right.
    let p = bp(&top_left);
    assert!(about(p.x, 450.0 - 100.0 * (0.5 - 1.0 / 3.0)) && about(p.y, 350.0));
    let p = bp(&top_right);
    assert!(about(p.x, 450.0 - 100.0 * (0.5 - 2.0 / 3.0)) && about(p.y, 340.0));
}

#[test]
fn distribute_skips_connections_to_embedded_nodes() {
    let (mut m, view) = scene();
    let hub = add_box(&mut m, &view, 400, 400, 200, 200);
    let inner = m
        .add_node(
            &view,
            NodeSpec::container().at(450, 450).sized(50, 50).under(&hub),
        )
        .unwrap();
    let e1 = m.add_element(ElementType::ApplicationComponent, "A");
    let e2 = m.add_element(ElementType::ApplicationComponent, "B");
    let rel = m
        .add_relationship(RelationshipType::Flow, &e1, &e2)
        .unwrap();
    let conn = m
        .add_connection(&view, ConnectionSpec::new(&rel, &hub, &inner))
        .unwrap();

    m.view_mut(&view).unwrap().distribute_connections(&hub).unwrap();
    assert!(m
        .view(&view)
        .unwrap()
        .connection(&conn)
        .unwrap()
        .bendpoints()
        .is_empty());
}
