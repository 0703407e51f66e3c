use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle described by its top-left corner and size.
///
/// Containment uses closed intervals on all four edges, so a rectangle
/// contains its own boundary. The spatial index relies on this when it
/// routes entries that sit exactly on a quadrant seam.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Creates a rectangle of the given size anchored at the origin.
    pub fn from_size(size: Vec2) -> Self {
        Self {
            pos: Vec2::ZERO,
            size,
        }
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    /// Returns a copy of this rectangle moved to the given position.
    pub fn move_to(&self, pos: Vec2) -> Self {
        Self {
            pos,
            size: self.size,
        }
    }

    /// Returns a copy of this rectangle displaced by the given vector.
    pub fn translate(&self, v: Vec2) -> Self {
        self.move_to(self.pos + v)
    }

    /// Whether the given point lies inside this rectangle, edges included.
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.pos.x && p.x <= self.right() && p.y >= self.pos.y && p.y <= self.bottom()
    }

    /// Whether `other` lies fully inside this rectangle. No area of
    /// `other` may fall outside, but shared edges count as inside.
    pub fn contains(&self, other: &Rect) -> bool {
        other.pos.x >= self.pos.x
            && other.pos.y >= self.pos.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Whether the two rectangles overlap. Touching edges count as an
    /// overlap, matching the closed-interval containment rules.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.pos.x <= other.right()
            && other.pos.x <= self.right()
            && self.pos.y <= other.bottom()
            && other.pos.y <= self.bottom()
    }

    /// Whether the given line segment crosses this rectangle.
    pub fn intersects_line(&self, line: &Line) -> bool {
        if self.contains_point(line.a) || self.contains_point(line.b) {
            return true;
        }
        self.edges().iter().any(|edge| line.intersection(edge).is_some())
    }

    /// The centroid of the rectangle.
    pub fn center(&self) -> Vec2 {
        self.pos + self.size / 2.0
    }

    /// Splits this rectangle into four equal quadrants, in the order
    /// top-left, top-right, bottom-right, bottom-left:
    ///
    /// ```text
    ///    0 | 1
    ///    --+--
    ///    3 | 2
    /// ```
    pub fn split(&self) -> [Rect; 4] {
        let half = self.size / 2.0;
        [
            Rect {
                pos: self.pos,
                size: half,
            },
            Rect {
                pos: Vec2::new(self.pos.x + half.x, self.pos.y),
                size: half,
            },
            Rect {
                pos: self.pos + half,
                size: half,
            },
            Rect {
                pos: Vec2::new(self.pos.x, self.pos.y + half.y),
                size: half,
            },
        ]
    }

    /// The corner points, clockwise from the top-left.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.pos,
            Vec2::new(self.right(), self.pos.y),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.pos.x, self.bottom()),
        ]
    }

    /// The edge segments, clockwise from the top edge.
    pub fn edges(&self) -> [Line; 4] {
        let [a, b, c, d] = self.corners();
        [
            Line::new(a, b),
            Line::new(b, c),
            Line::new(c, d),
            Line::new(d, a),
        ]
    }

    /// The smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let min = self.pos.min(other.pos);
        let max = Vec2::new(self.right(), self.bottom())
            .max(Vec2::new(other.right(), other.bottom()));
        Rect {
            pos: min,
            size: max - min,
        }
    }
}

/// Line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    pub a: Vec2,
    pub b: Vec2,
}

impl Line {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// The displacement from `a` to `b`.
    pub fn to_vector(&self) -> Vec2 {
        self.b - self.a
    }

    /// Computes the intersection point of two segments, if any.
    ///
    /// Parallel and collinear segments report no intersection.
    pub fn intersection(&self, other: &Line) -> Option<Vec2> {
        let s1 = self.to_vector();
        let s2 = other.to_vector();
        let d = -s2.x * s1.y + s1.x * s2.y;

        if d.abs() <= f32::EPSILON {
            return None;
        }

        let s = (-s1.y * (self.a.x - other.a.x) + s1.x * (self.a.y - other.a.y)) / d;
        let t = (s2.x * (self.a.y - other.a.y) - s2.y * (self.a.x - other.a.x)) / d;

        if (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t) {
            Some(self.a + s1 * t)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_closed_on_the_boundary() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(outer.contains(&Rect::new(50.0, 50.0, 50.0, 50.0)));
        assert!(!outer.contains(&Rect::new(50.0, 50.0, 51.0, 50.0)));
        assert!(outer.contains_point(Vec2::new(100.0, 100.0)));
        assert!(!outer.contains_point(Vec2::new(100.1, 100.0)));
    }

    #[test]
    fn intersection_includes_touching_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(a.intersects(&Rect::new(5.0, 5.0, 1.0, 1.0)));
        assert!(!a.intersects(&Rect::new(10.5, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn split_produces_quadrants_in_order() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let quads = rect.split();
        assert_eq!(quads[0], Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(quads[1], Rect::new(50.0, 0.0, 50.0, 50.0));
        assert_eq!(quads[2], Rect::new(50.0, 50.0, 50.0, 50.0));
        assert_eq!(quads[3], Rect::new(0.0, 50.0, 50.0, 50.0));
        for quad in &quads {
            assert!(rect.contains(quad));
        }
    }

    #[test]
    fn center_is_the_midpoint() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.center(), Vec2::new(25.0, 40.0));
    }

    #[test]
    fn segments_intersect_at_the_expected_point() {
        let horizontal = Line::new(Vec2::new(0.0, 5.0), Vec2::new(10.0, 5.0));
        let vertical = Line::new(Vec2::new(3.0, 0.0), Vec2::new(3.0, 10.0));
        let point = horizontal.intersection(&vertical).expect("segments cross");
        assert_eq!(point, Vec2::new(3.0, 5.0));

        let parallel = Line::new(Vec2::new(0.0, 6.0), Vec2::new(10.0, 6.0));
        assert!(horizontal.intersection(&parallel).is_none());

        let short = Line::new(Vec2::new(20.0, 0.0), Vec2::new(20.0, 10.0));
        assert!(horizontal.intersection(&short).is_none());
    }

    #[test]
    fn line_crossing_a_rect_is_detected_without_contained_endpoints() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let through = Line::new(Vec2::new(-5.0, 5.0), Vec2::new(15.0, 5.0));
        assert!(rect.intersects_line(&through));

        let outside = Line::new(Vec2::new(-5.0, 20.0), Vec2::new(15.0, 20.0));
        assert!(!rect.intersects_line(&outside));
    }

    #[test]
    fn union_covers_both_rects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 10.0, 10.0);
        let bound = a.union(&b);
        assert!(bound.contains(&a));
        assert!(bound.contains(&b));
        assert_eq!(bound, Rect::new(0.0, 0.0, 30.0, 15.0));
    }
}
