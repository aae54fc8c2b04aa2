//! Views: node trees, visual connections and the layout operations on them.
//!
//! A view owns all of its nodes in one flat registry; embedding is a
//! parent/children link between node ids. Structural mutations (adding and
//! removing nodes or connections) go through [`Model`](crate::Model), which
//! validates references and keeps the model-wide indices; pure geometry is
//! local to the view and lives here.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::geom::{Box2, Direction, Edge, Orientation, Point, Position, point};
use crate::identity::Id;
use crate::style::Style;

/// Inner margin of a resized container, in view units.
const RESIZE_MARGIN: i32 = 40;

/// What a node depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Depicts a model element (the node's `element` reference is set).
    Element,
    /// Free-floating text label, no model concept behind it.
    Label,
    /// Visual grouping box, no model concept behind it.
    Container,
}

/// A box on a view.
///
/// Coordinates are the top-left corner in view units; `x`/`y` mutations go
/// through the view so embedded children move along.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: Id,
    pub(crate) kind: NodeKind,
    pub(crate) element: Option<Id>,
    pub label: Option<String>,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) w: i32,
    pub(crate) h: i32,
    pub(crate) parent: Option<Id>,
    pub(crate) children: Vec<Id>,
    pub style: Style,
}

impl Node {
    pub(crate) fn new(id: Id, kind: NodeKind, element: Option<Id>) -> Self {
        Node {
            id,
            kind,
            element,
            label: None,
            x: 0,
            y: 0,
            w: 120,
            h: 55,
            parent: None,
            children: Vec::new(),
            style: Style::default(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The element this node depicts, when [`NodeKind::Element`].
    pub fn element(&self) -> Option<&Id> {
        self.element.as_ref()
    }

    /// The embedding node, or `None` for a node directly on the view.
    pub fn parent(&self) -> Option<&Id> {
        self.parent.as_ref()
    }

    /// Embedded child nodes, in insertion order.
    pub fn children(&self) -> &[Id] {
        &self.children
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn w(&self) -> i32 {
        self.w
    }

    pub fn h(&self) -> i32 {
        self.h
    }

    pub fn set_w(&mut self, w: i32) {
        self.w = w.max(0);
    }

    pub fn set_h(&mut self, h: i32) {
        self.h = h.max(0);
    }

    /// Centroid x coordinate.
    pub fn cx(&self) -> f64 {
        self.x as f64 + self.w as f64 / 2.0
    }

    /// Centroid y coordinate.
    pub fn cy(&self) -> f64 {
        self.y as f64 + self.h as f64 / 2.0
    }

    pub fn bounds(&self) -> Box2 {
        Box2 {
            cx: self.cx(),
            cy: self.cy(),
            w: self.w as f64,
            h: self.h as f64,
        }
    }

    /// Strict containment check; boundary points are outside.
    pub fn is_inside(&self, p: Point) -> bool {
        self.bounds().contains(p)
    }

    /// Position of another node relative to this one.
    pub fn position_of(&self, other: &Node) -> Position {
        self.bounds().position_of(&other.bounds())
    }

    /// Position of a point relative to this node.
    pub fn position_of_point(&self, p: Point) -> Position {
        self.bounds().position_of_point(p)
    }

    fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }
}

/// A visual connection depicting a relationship between two nodes (or, for
/// relationships on relationships, between a node and another connection).
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub(crate) id: Id,
    pub(crate) relationship: Id,
    pub(crate) source: Id,
    pub(crate) target: Id,
    pub(crate) bendpoints: Vec<Point>,
    pub style: Style,
}

impl Connection {
    pub(crate) fn new(id: Id, relationship: Id, source: Id, target: Id) -> Self {
        Connection {
            id,
            relationship,
            source,
            target,
            bendpoints: Vec::new(),
            style: Style::default(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    /// The relationship this connection depicts.
    pub fn relationship(&self) -> &Id {
        &self.relationship
    }

    pub fn source(&self) -> &Id {
        &self.source
    }

    pub fn target(&self) -> &Id {
        &self.target
    }

    pub fn bendpoints(&self) -> &[Point] {
        &self.bendpoints
    }

    pub fn add_bendpoint(&mut self, p: Point) {
        self.bendpoints.push(p);
    }

    /// Replaces the bendpoint at `idx`; returns `false` when out of range.
    pub fn set_bendpoint(&mut self, idx: usize, p: Point) -> bool {
        match self.bendpoints.get_mut(idx) {
            Some(bp) => {
                *bp = p;
                true
            }
            None => false,
        }
    }

    pub fn remove_bendpoint(&mut self, idx: usize) -> Option<Point> {
        if idx < self.bendpoints.len() {
            Some(self.bendpoints.remove(idx))
        } else {
            None
        }
    }

    pub fn clear_bendpoints(&mut self) {
        self.bendpoints.clear();
    }
}

/// Creation parameters for [`Model::add_node`](crate::Model::add_node).
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub element: Option<Id>,
    pub kind: NodeKind,
    pub label: Option<String>,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub id: Option<Id>,
    pub parent: Option<Id>,
    pub style: Option<Style>,
}

impl NodeSpec {
    /// A node depicting `element`, at the default position and size.
    pub fn element(element: &Id) -> Self {
        NodeSpec {
            element: Some(element.clone()),
            kind: NodeKind::Element,
            label: None,
            x: 0,
            y: 0,
            w: 120,
            h: 55,
            id: None,
            parent: None,
            style: None,
        }
    }

    /// A free text label.
    pub fn label(text: impl Into<String>) -> Self {
        NodeSpec {
            element: None,
            kind: NodeKind::Label,
            label: Some(text.into()),
            ..NodeSpec::container()
        }
    }

    /// A plain grouping box.
    pub fn container() -> Self {
        NodeSpec {
            element: None,
            kind: NodeKind::Container,
            label: None,
            x: 0,
            y: 0,
            w: 120,
            h: 55,
            id: None,
            parent: None,
            style: None,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, w: i32, h: i32) -> Self {
        self.w = w;
        self.h = h;
        self
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    /// Embeds the node under `parent` (a node in the same view).
    pub fn under(mut self, parent: &Id) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn styled(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }
}

/// Creation parameters for [`Model::add_connection`](crate::Model::add_connection).
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    pub relationship: Id,
    pub source: Id,
    pub target: Id,
    pub id: Option<Id>,
    pub style: Option<Style>,
}

impl ConnectionSpec {
    pub fn new(relationship: &Id, source: &Id, target: &Id) -> Self {
        ConnectionSpec {
            relationship: relationship.clone(),
            source: source.clone(),
            target: target.clone(),
            id: None,
            style: None,
        }
    }

    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

/// Child ordering applied by [`View::resize_node`] before placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortChildren {
    /// Keep insertion order.
    #[default]
    Unsorted,
    AreaAscending,
    AreaDescending,
}

/// Options for [`View::resize_node`].
#[derive(Debug, Clone)]
pub struct ResizeOptions {
    /// Children per row before wrapping.
    pub max_per_row: usize,
    /// Keep each child's current size instead of forcing `child_w`/`child_h`.
    pub keep_child_size: bool,
    pub child_w: i32,
    pub child_h: i32,
    pub gap_x: i32,
    pub gap_y: i32,
    pub justify: Justify,
    /// Lay out children that embed nodes of their own first, with default
    /// options; leaf children keep their geometry until placement.
    pub recurse: bool,
    pub sort: SortChildren,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        ResizeOptions {
            max_per_row: 3,
            keep_child_size: true,
            child_w: 120,
            child_h: 55,
            gap_x: 20,
            gap_y: 20,
            justify: Justify::Left,
            recurse: true,
            sort: SortChildren::Unsorted,
        }
    }
}

///// A diagram: a tree of nodes plus the connections between them.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub(crate) id: Id,
    pub name: String,
    pub description: Option<String>,
    pub(crate) folder: Option<String>,
    pub properties: IndexMap<String, String>,
    pub(crate) nodes: IndexMap<Id, Node>,
    pub(crate) connections: IndexMap<Id, Connection>,
    pub(crate) roots: Vec<Id>,
}

impl View {
    pub(crate) fn new(id: Id, name: impl Into<String>) -> Self {
        View {
            id,
            name: name.into(),
            description: None,
            folder: None,
            properties: IndexMap::new(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
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

    pub fn node(&self, id: &Id) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &Id) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn connection(&self, id: &Id) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connection_mut(&mut self, id: &Id) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    /// All nodes of the view, embedded ones included.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Top-level nodes in draw order.
    pub fn root_nodes(&self) -> impl Iterator<Item = &Node> {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        let id = node.id.clone();
        match &node.parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.children.push(id.clone());
                }
            }
            None => self.roots.push(id.clone()),
        }
        self.nodes.insert(id, node);
    }

    /// Unlinks a node from its parent (or the root list) and removes it.
    /// The caller deals with children and incident connections first.
    pub(crate) fn detach_node(&mut self, id: &Id) -> Option<Node> {
        let node = self.nodes.shift_remove(id)?;
        match &node.parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|c| c != id),
        }
        Some(node)
    }

    pub(crate) fn insert_connection(&mut self, conn: Connection) {
        self.connections.insert(conn.id.clone(), conn);
    }

    pub(crate) fn detach_connection(&mut self, id: &Id) -> Option<Connection> {
        self.connections.shift_remove(id)
    }

    // ---- node placement ----------------------------------------------------

    /// Moves a node to absolute `x`, shifting embedded children along.
    /// Coordinates clamp at 0.
    pub fn set_node_x(&mut self, id: &Id, x: i32) -> Result<()> {
        self.require_node(id)?;
        self.put_node_x(id, x);
        Ok(())
    }

    /// Moves a node to absolute `y`, shifting embedded children along.
    pub fn set_node_y(&mut self, id: &Id, y: i32) -> Result<()> {
        self.require_node(id)?;
        self.put_node_y(id, y);
        Ok(())
    }

    pub fn set_node_pos(&mut self, id: &Id, x: i32, y: i32) -> Result<()> {
        self.require_node(id)?;
        self.put_node_x(id, x);
        self.put_node_y(id, y);
        Ok(())
    }

    /// Moves a node so its centroid x lands on `cx` (clamped at 0), rounding
    /// the sub-unit remainder half-up.
    pub fn set_node_cx(&mut self, id: &Id, cx: f64) -> Result<()> {
        let node = self.require_node(id)?;
        let w = node.w;
        let x = (cx.max(0.0) - w as f64 / 2.0 + 0.5).floor() as i32;
        self.put_node_x(id, x);
        Ok(())
    }

    /// Moves a node so its centroid y lands on `cy` (clamped at 0).
    pub fn set_node_cy(&mut self, id: &Id, cy: f64) -> Result<()> {
        let node = self.require_node(id)?;
        let h = node.h;
        let y = (cy.max(0.0) - h as f64 / 2.0 + 0.5).floor() as i32;
        self.put_node_y(id, y);
        Ok(())
    }

    /// X coordinate relative to the embedding parent (absolute for roots).
    pub fn node_rx(&self, id: &Id) -> Option<i32> {
        let node = self.nodes.get(id)?;
        let base = node
            .parent
            .as_ref()
            .and_then(|p| self.nodes.get(p))
            .map_or(0, |p| p.x);
        Some(node.x - base)
    }

    /// Y coordinate relative to the embedding parent (absolute for roots).
    pub fn node_ry(&self, id: &Id) -> Option<i32> {
        let node = self.nodes.get(id)?;
        let base = node
            .parent
            .as_ref()
            .and_then(|p| self.nodes.get(p))
            .map_or(0, |p| p.y);
        Some(node.y - base)
    }

    /// Places a node at `rx` relative to its parent (clamped at 0).
    pub fn set_node_rx(&mut self, id: &Id, rx: i32) -> Result<()> {
        self.require_node(id)?;
        self.put_node_rx(id, rx);
        Ok(())
    }

    /// Places a node at `ry` relative to its parent (clamped at 0).
    pub fn set_node_ry(&mut self, id: &Id, ry: i32) -> Result<()> {
        self.require_node(id)?;
        self.put_node_ry(id, ry);
        Ok(())
    }

    fn require_node(&self, id: &Id) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::reference("nodes", id.as_str()))
    }

    // Recursive movers over ids known to exist. Children are shifted by the
    // parent's delta and clamp at 0 individually, like the parent.
    fn put_node_x(&mut self, id: &Id, x: i32) {
        let x = x.max(0);
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let delta = x - node.x;
        let children = node.children.clone();
        for child in &children {
            if let Some(cx) = self.nodes.get(child).map(|c| c.x) {
                self.put_node_x(child, cx + delta);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.x = x;
        }
    }

    fn put_node_y(&mut self, id: &Id, y: i32) {
        let y = y.max(0);
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let delta = y - node.y;
        let children = node.children.clone();
        for child in &children {
            if let Some(cy) = self.nodes.get(child).map(|c| c.y) {
                self.put_node_y(child, cy + delta);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.y = y;
        }
    }

    fn put_node_rx(&mut self, id: &Id, rx: i32) {
        let rx = rx.max(0);
        let base = self
            .nodes
            .get(id)
            .and_then(|n| n.parent.as_ref())
            .and_then(|p| self.nodes.get(p))
            .map_or(0, |p| p.x);
        self.put_node_x(id, base + rx);
    }

    fn put_node_ry(&mut self, id: &Id, ry: i32) {
        let ry = ry.max(0);
        let base = self
            .nodes
            .get(id)
            .and_then(|n| n.parent.as_ref())
            .and_then(|p| self.nodes.get(p))
            .map_or(0, |p| p.y);
        self.put_node_y(id, base + ry);
    }

    // ---- container layout --------------------------------------------------

    /// Lays out the embedded children of a node in a wrapping grid and grows
    /// the node to fit them, children first when `recurse` is set.
    pub fn resize_node(&mut self, id: &Id, opts: &ResizeOptions) -> Result<()> {
        self.require_node(id)?;
        self.resize_inner(id, opts);
        Ok(())
    }

    fn resize_inner(&mut self, id: &Id, opts: &ResizeOptions) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let mut kids = node.children.clone();
        match opts.sort {
            SortChildren::Unsorted => {}
            SortChildren::AreaAscending => {
                kids.sort_by_key(|k| self.nodes.get(k).map_or(0, Node::area));
            }
            SortChildren::AreaDescending => {
                kids.sort_by_key(|k| {
                    std::cmp::Reverse(self.nodes.get(k).map_or(0, Node::area))
                });
            }
        }

        let per_row = opts.max_per_row.max(1);
        let mut max_w = opts.child_w;
        let mut max_h = opts.child_h;
        let mut ba_x = RESIZE_MARGIN;
        let mut ba_y = RESIZE_MARGIN;
        let mut max_row_h = opts.child_h;
        let mut row = 0;

        for (i, kid) in kids.iter().enumerate() {
            // Only containers with content of their own get laid out; a leaf
            // pass would overwrite the child's size with the defaults.
            let has_grandchildren = self
                .nodes
                .get(kid)
                .is_some_and(|c| !c.children.is_empty());
            if opts.recurse && has_grandchildren {
                self.resize_inner(kid, &ResizeOptions::default());
            }
            let Some(child) = self.nodes.get(kid) else {
                continue;
            };
            let (kw, kh) = if opts.keep_child_size {
                (child.w, child.h)
            } else {
                (opts.child_w, opts.child_h)
            };

            let rx = match opts.justify {
                Justify::Left | Justify::Center => ba_x,
                Justify::Right => ba_x.max(max_w - kw - opts.gap_x),
            };
            self.put_node_rx(kid, rx);
            self.put_node_ry(kid, ba_y);
            if let Some(child) = self.nodes.get_mut(kid) {
                child.w = kw;
                child.h = kh;
            }

            max_row_h = max_row_h.max(kh);
            ba_x += kw + opts.gap_x;
            if (i + 1) % per_row == 0 {
                row += 1;
                // Center justification staggers every other row by half a cell.
                ba_x = if opts.justify == Justify::Center && row % 2 == 1 {
                    RESIZE_MARGIN + (kw + opts.gap_x) / 2
                } else {
                    RESIZE_MARGIN
                };
                ba_y += max_row_h + opts.gap_y;
                max_row_h = opts.child_h;
            }

            let rx_now = self.node_rx(kid).unwrap_or(0);
            let ry_now = self.node_ry(kid).unwrap_or(0);
            max_w = max_w.max(rx_now + kw + opts.gap_x);
            max_h = max_h.max(ry_now + kh + opts.gap_y);
        }

        if let Some(node) = self.nodes.get_mut(id) {
            node.w = max_w;
            node.h = max_h;
        }
    }

    // ---- connection layout -------------------------------------------------

    /// Spreads the connections incident to a node evenly along its edges.
    ///
    /// Each connection's bendpoint nearest this node is bucketed by the edge
    /// it sits on (corner points enter both adjacent buckets), buckets are
    /// ordered by the bearing of the other endpoint, and each bendpoint is
    /// repositioned at the `i/(n+1)` fraction of its bucket's edge.
    /// Connections to embedded nodes and connections depicting relationships
    /// on relationships are left alone; a midpoint bendpoint is synthesized
    /// for connections that have none.
    pub fn distribute_connections(&mut self, id: &Id) -> Result<()> {
        let me = self.require_node(id)?.bounds();

        let mut synths: Vec<(Id, Point)> = Vec::new();
        let mut buckets: [(Edge, Vec<(f64, Id, usize)>); 4] = [
            (Edge::Left, Vec::new()),
            (Edge::Right, Vec::new()),
            (Edge::Top, Vec::new()),
            (Edge::Bottom, Vec::new()),
        ];

        for (cid, conn) in &self.connections {
            let incoming = conn.target == *id;
            let outgoing = conn.source == *id;
            if !incoming && !outgoing {
                continue;
            }
            let other_id = if incoming { &conn.source } else { &conn.target };
            let Some(other) = self.nodes.get(other_id) else {
                continue;
            };
            let other_box = other.bounds();
            // Connections to embedded nodes (and self-loops) stay untouched.
            if me.contains(point(other_box.cx, other_box.cy)) {
                continue;
            }
            let pos = me.position_of(&other_box);

            let (bp, bp_idx) = match conn.bendpoints.as_slice() {
                [] => {
                    let p = synth_bendpoint(&me, &other_box, &pos);
                    synths.push((cid.clone(), p));
                    (p, 0)
                }
                bps if incoming => (bps[bps.len() - 1], bps.len() - 1),
                bps => (bps[0], 0),
            };

            for edge in me.edges_near(bp) {
                let order = match edge {
                    Edge::Right | Edge::Bottom => pos.bearing,
                    Edge::Left => -((pos.bearing + 180.0) % 360.0),
                    Edge::Top => -pos.bearing,
                };
                if let Some(bucket) = buckets.iter_mut().find(|(e, _)| *e == edge) {
                    bucket.1.push((order, cid.clone(), bp_idx));
                }
            }
        }

        for (cid, p) in synths {
            if let Some(conn) = self.connections.get_mut(&cid) {
                conn.bendpoints.push(p);
            }
        }

        for (edge, mut bucket) in buckets {
            bucket.sort_by(|a, b| a.0.total_cmp(&b.0));
            let n = bucket.len() as f64;
            for (i, (_, cid, bp_idx)) in bucket.into_iter().enumerate() {
                let frac = (i as f64 + 1.0) / (n + 1.0);
                let Some(conn) = self.connections.get_mut(&cid) else {
                    continue;
                };
                let Some(bp) = conn.bendpoints.get_mut(bp_idx) else {
                    continue;
                };
                match edge {
                    Edge::Left | Edge::Right => bp.y = me.cy - me.h * (0.5 - frac),
                    Edge::Top | Edge::Bottom => bp.x = me.cx - me.w * (0.5 - frac),
                }
            }
        }
        Ok(())
    }

    /// Routes a connection orthogonally with one bendpoint.
    ///
    /// The weights slide the bendpoint along the two legs (0.5 centers it).
    /// Existing bendpoints are cleared; when the turn corner falls inside
    /// either endpoint box no bendpoint is added.
    pub fn route_l_shape(
        &mut self,
        conn_id: &Id,
        direction: Direction,
        weight_x: f64,
        weight_y: f64,
    ) -> Result<()> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or_else(|| Error::reference("connections", conn_id.as_str()))?;
        let (Some(src), Some(dst)) = (
            self.nodes.get(&conn.source).map(Node::bounds),
            self.nodes.get(&conn.target).map(Node::bounds),
        ) else {
            // Only node-to-node connections are routable.
            return Ok(());
        };

        let (corner, bp) = match direction {
            Direction::Horizontal => (
                point(dst.cx, src.cy),
                point(
                    dst.cx + dst.w * (0.5 - weight_x),
                    src.cy + src.h * (0.5 - weight_y),
                ),
            ),
            Direction::Vertical => (
                point(src.cx, dst.cy),
                point(
                    src.cx - src.w * (0.5 - weight_x),
                    dst.cy + dst.h * (0.5 - weight_y),
                ),
            ),
        };

        if let Some(conn) = self.connections.get_mut(conn_id) {
            conn.bendpoints.clear();
            if !src.contains(corner) && !dst.contains(corner) {
                conn.bendpoints.push(bp);
            }
        }
        Ok(())
    }

    /// Routes a connection orthogonally with two bendpoints.
    ///
    /// Existing bendpoints are cleared; when either bendpoint would fall
    /// inside an endpoint box the route is skipped entirely.
    pub fn route_s_shape(
        &mut self,
        conn_id: &Id,
        direction: Direction,
        weight_x: f64,
        weight_y: f64,
        weight2: f64,
    ) -> Result<()> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or_else(|| Error::reference("connections", conn_id.as_str()))?;
        let (Some(src), Some(dst)) = (
            self.nodes.get(&conn.source).map(Node::bounds),
            self.nodes.get(&conn.target).map(Node::bounds),
        ) else {
            return Ok(());
        };

        let dx = dst.cx - src.cx;
        let dy = dst.cy - src.cy;
        let (bp1, bp2) = match direction {
            Direction::Horizontal => {
                let bp1 = point(src.cx + dx * weight_x, src.cy - src.h * (0.5 - weight_y));
                let bp2 = point(bp1.x, dst.cy - dst.h * (0.5 - weight2));
                (bp1, bp2)
            }
            Direction::Vertical => {
                let bp1 = point(
                    src.cx - src.w * (0.5 - weight_x),
                    src.cy + dy / 2.0 - src.h * (0.5 - weight_y) / 2.0,
                );
                let bp2 = point(dst.cx - dst.w * (0.5 - weight2), bp1.y);
                (bp1, bp2)
            }
        };

        if let Some(conn) = self.connections.get_mut(conn_id) {
            conn.bendpoints.clear();
            if !src.contains(bp1)
                && !dst.contains(bp1)
                && !src.contains(bp2)
                && !dst.contains(bp2)
            {
                conn.bendpoints.push(bp1);
                conn.bendpoints.push(bp2);
            }
        }
        Ok(())
    }
}

/// Midpoint bendpoint for a connection without any: edge-aligned in the flush
// cases, centroid midpoint otherwise.
fn synth_bendpoint(me: &Box2, other: &Box2, pos: &Position) -> Point {
    match pos.orientation {
        Orientation {
            edge: Edge::Left,
            flush: true,
        } => point(me.left() + pos.gap_x / 2.0, me.cy),
        Orientation {
            edge: Edge::Right,
            flush: true,
        } => point(me.right() + pos.gap_x / 2.0, me.cy),
        Orientation {
            edge: Edge::Top,
            flush: true,
        } => point(me.cx, me.top() + pos.gap_y / 2.0),
        Orientation {
            edge: Edge::Bottom,
            flush: true,
        } => point(me.cx, me.bottom() + pos.gap_y / 2.0),
        _ => point((me.cx + other.cx) / 2.0, (me.cy + other.cy) / 2.0),
    }
}
