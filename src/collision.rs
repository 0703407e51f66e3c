//! Narrow-phase collision resolution for axis-aligned rectangles.

use crate::geometry::Rect;

/// Direction of a contact reported by [`contact_side`]. Callers that
/// only need the axis of response can match `Left | Right` against
/// `Top | Bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// Determines the direction of collision between two overlapping
/// rectangles from the Minkowski sum of the pair. Returns `None` when
/// the rectangles do not overlap, which makes this the exact follow-up
/// test for broad-phase candidates from the spatial index.
pub fn contact_side(a: &Rect, b: &Rect) -> Option<ContactSide> {
    let ca = a.center();
    let cb = b.center();
    let w = (a.size.x + b.size.x) / 2.0;
    let h = (a.size.y + b.size.y) / 2.0;
    let dx = ca.x - cb.x;
    let dy = ca.y - cb.y;

    if dx.abs() > w || dy.abs() > h {
        return None;
    }

    let wy = w * dy;
    let hx = h * dx;
    Some(if wy > hx {
        if wy > -hx {
            ContactSide::Top
        } else {
            ContactSide::Left
        }
    } else if wy > -hx {
        ContactSide::Right
    } else {
        ContactSide::Bottom
    })
}
