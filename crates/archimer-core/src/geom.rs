//! Geometry primitives for view layout.
//!
//! Coordinates are f64 with y growing downward. Bearings are degrees in
//! 0..360 with 0° due right and 90° up (screen-space compass).

pub type Unit = euclid::UnknownUnit;
pub type Point = euclid::Point2D<f64, Unit>;

#[inline]
pub fn point(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Compass edge of a node box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

/// Routing axis for L- and S-shaped connection routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The route leaves the source horizontally.
    Horizontal,
    /// The route leaves the source vertically.
    Vertical,
}

/// Coarse placement of one box (or point) relative to another.
///
/// `flush` marks the overlap case: the other object projects onto this edge
/// (their spans overlap on the perpendicular axis), so a connection between
/// them runs straight out of that edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub edge: Edge,
    pub flush: bool,
}

/// Relative position of another box or point, as seen from a reference box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Centroid delta along x.
    pub dx: f64,
    /// Centroid delta along y.
    pub dy: f64,
    /// Signed distance between the nearest vertical edges; zero when the
    /// horizontal spans overlap, negative when the other lies left.
    pub gap_x: f64,
    /// Signed distance between the nearest horizontal edges; zero when the
    /// vertical spans overlap, negative when the other lies above.
    pub gap_y: f64,
    /// Compass bearing of the other centroid, 0° due right.
    pub bearing: f64,
    pub orientation: Orientation,
}

impl Position {
    pub fn distance(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

/// Bearing of the vector `(dx, dy)` in screen coordinates (y down).
///
/// Degenerate zero vectors map to 0° rather than failing.
pub fn bearing(dx: f64, dy: f64) -> f64 {
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    let mut deg = dy.atan2(dx).to_degrees();
    if deg < 0.0 {
        deg += 360.0;
    }
    (360.0 - deg) % 360.0
}

/// Axis-aligned box given by centroid and extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box2 {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl Box2 {
    pub fn left(&self) -> f64 {
        self.cx - self.w / 2.0
    }

    pub fn right(&self) -> f64 {
        self.cx + self.w / 2.0
    }

    pub fn top(&self) -> f64 {
        self.cy - self.h / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.cy + self.h / 2.0
    }

    /// Strict containment: points on the boundary are outside.
    pub fn contains(&self, p: Point) -> bool {
        self.left() < p.x && p.x < self.right() && self.top() < p.y && p.y < self.bottom()
    }

    /// Position of `other` relative to `self`.
    pub fn position_of(&self, other: &Box2) -> Position {
        let dx = other.cx - self.cx;
        let dy = other.cy - self.cy;

        let mut gap_x = 0.0;
        if other.left() > self.right() {
            gap_x = other.left() - self.right();
        } else if other.right() < self.left() {
            gap_x = other.right() - self.left();
        }
        let mut gap_y = 0.0;
        if other.top() > self.bottom() {
            gap_y = other.top() - self.bottom();
        } else if other.bottom() < self.top() {
            gap_y = other.bottom() - self.top();
        }

        let b = bearing(dx, dy);
        let mut edge = edge_of_bearing(b);
        let mut flush = false;
        // Overlap on one axis pins the orientation to the other axis.
        if gap_x == 0.0 && gap_y != 0.0 {
            edge = if gap_y < 0.0 { Edge::Top } else { Edge::Bottom };
            flush = true;
        } else if gap_y == 0.0 && gap_x != 0.0 {
            edge = if gap_x < 0.0 { Edge::Left } else { Edge::Right };
            flush = true;
        }

        Position {
            dx,
            dy,
            gap_x,
            gap_y,
            bearing: b,
            orientation: Orientation { edge, flush },
        }
    }

    /// Position of a point relative to `self`, classified by the nearest
    /// edge of the box.
    pub fn position_of_point(&self, p: Point) -> Position {
        let dx = p.x - self.cx;
        let dy = p.y - self.cy;
        let gap_x = (dx.abs() - self.w / 2.0) * dx.signum();
        let gap_y = (dy.abs() - self.h / 2.0) * dy.signum();
        let b = bearing(dx, dy);

        let edges = self.edges_near(p);
        let edge = edges[0];
        let flush = match edge {
            Edge::Left | Edge::Right => self.top() < p.y && p.y < self.bottom(),
            Edge::Top | Edge::Bottom => self.left() < p.x && p.x < self.right(),
        };

        Position {
            dx,
            dy,
            gap_x,
            gap_y,
            bearing: b,
            orientation: Orientation { edge, flush },
        }
    }

    /// Edges of the box a point is nearest to, in centroid-relative terms.
    ///
    /// Exact diagonals yield both adjacent edges so callers can bucket corner
    /// bendpoints into both; the degenerate centroid case yields `Right`.
    pub fn edges_near(&self, p: Point) -> Vec<Edge> {
        let dx = p.x - self.cx;
        let dy = p.y - self.cy;
        // Cross-multiplied comparison avoids dividing by zero extents.
        let run = dx.abs() * self.h;
        let rise = dy.abs() * self.w;
        if dx == 0.0 && dy == 0.0 {
            return vec![Edge::Right];
        }
        let horizontal = if dx < 0.0 { Edge::Left } else { Edge::Right };
        let vertical = if dy < 0.0 { Edge::Top } else { Edge::Bottom };
        if run > rise {
            vec![horizontal]
        } else if rise > run {
            vec![vertical]
        } else {
            vec![horizontal, vertical]
        }
    }
}

fn edge_of_bearing(b: f64) -> Edge {
    if !(45.0..=315.0).contains(&b) {
        Edge::Right
    } else if b < 135.0 {
        Edge::Top
    } else if b < 225.0 {
        Edge::Left
    } else {
        Edge::Bottom
    }
}
