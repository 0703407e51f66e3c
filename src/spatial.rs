//! Broad-phase spatial index used for collision culling.
//!
//! The index is a quadtree flattened into an arena of nodes. Each entry
//! is stored at the coarsest node that fully contains it; anything that
//! straddles a quadrant seam stays at the ancestor so a lookup can never
//! miss it. Queries are therefore over-inclusive by design and callers
//! must follow up with an exact geometric test.

use crate::geometry::Rect;

/// Default maximum subdivision depth.
pub const DEFAULT_MAX_LEVEL: usize = 5;
/// Default number of entries a leaf holds before it subdivides.
pub const DEFAULT_MAX_OBJECTS: usize = 10;

const ROOT: usize = 0;

/// A payload and the rectangle it was indexed under.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub payload: T,
    pub rect: Rect,
}

#[derive(Debug)]
struct Node<T> {
    rect: Rect,
    level: usize,
    entries: Vec<Entry<T>>,
    children: Option<[usize; 4]>,
}

impl<T> Node<T> {
    fn new(rect: Rect, level: usize) -> Self {
        Self {
            rect,
            level,
            entries: Vec::new(),
            children: None,
        }
    }
}

/// Quadtree over axis-aligned rectangles with arbitrary payloads.
///
/// Designed to be rebuilt once per simulation step: `clear` followed by
/// re-insertion of every live object, then one `retrieve` per object.
#[derive(Debug)]
pub struct SpatialIndex<T> {
    nodes: Vec<Node<T>>,
    max_level: usize,
    max_objects: usize,
    len: usize,
}

impl<T> SpatialIndex<T> {
    /// Creates an index over the given bounds with default limits.
    pub fn new(bounds: Rect) -> Self {
        Self::with_limits(bounds, DEFAULT_MAX_LEVEL, DEFAULT_MAX_OBJECTS)
    }

    /// Creates an index with explicit depth and occupancy limits.
    pub fn with_limits(bounds: Rect, max_level: usize, max_objects: usize) -> Self {
        Self {
            nodes: vec![Node::new(bounds, 0)],
            max_level,
            max_objects,
            len: 0,
        }
    }

    /// The bounding rectangle the index covers.
    pub fn bounds(&self) -> Rect {
        self.nodes[ROOT].rect
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes in the arena, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts a payload under the given rectangle.
    pub fn insert(&mut self, payload: T, rect: Rect) {
        self.insert_at(ROOT, Entry { payload, rect });
        self.len += 1;
    }

    /// Collects every entry that could overlap the query rectangle.
    ///
    /// Descends into each quadrant whose region overlaps the query and
    /// gathers everything stored along the way. Entry rectangles are
    /// never tested, so the result is a superset of all entries whose
    /// rectangle intersects `rect` and may contain false positives.
    pub fn retrieve(&self, rect: &Rect) -> Vec<&Entry<T>> {
        let mut found = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            found.extend(node.entries.iter());
            if let Some(children) = node.children {
                stack.extend(
                    children
                        .into_iter()
                        .filter(|&child| self.nodes[child].rect.intersects(rect)),
                );
            }
        }
        found
    }

    /// Discards all entries and children, collapsing the tree back to an
    /// empty leaf over the same bounds.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT].entries.clear();
        self.nodes[ROOT].children = None;
        self.len = 0;
    }

    /// The quadrant rectangles of the root, if it has split.
    pub fn root_quadrants(&self) -> Option<[Rect; 4]> {
        self.nodes[ROOT]
            .children
            .map(|children| children.map(|child| self.nodes[child].rect))
    }

    fn insert_at(&mut self, start: usize, entry: Entry<T>) {
        // Descend to the deepest node that fully contains the entry.
        let mut id = start;
        while let Some(children) = self.nodes[id].children {
            match self.quadrant_for(children, &entry.rect) {
                Some(child) => id = child,
                None => break,
            }
        }

        self.nodes[id].entries.push(entry);
        if self.nodes[id].children.is_none()
            && self.nodes[id].entries.len() >= self.max_objects
            && self.nodes[id].level < self.max_level
        {
            self.split(id);
        }
    }

    /// The first quadrant that fully contains `rect`, in construction
    /// order. `None` means the rectangle straddles a seam.
    fn quadrant_for(&self, children: [usize; 4], rect: &Rect) -> Option<usize> {
        children
            .into_iter()
            .find(|&child| self.nodes[child].rect.contains(rect))
    }

    fn split(&mut self, id: usize) {
        if self.nodes[id].children.is_some() {
            return;
        }

        let level = self.nodes[id].level;
        let quads = self.nodes[id].rect.split();
        let first = self.nodes.len();
        for quad in quads {
            self.nodes.push(Node::new(quad, level + 1));
        }
        self.nodes[id].children = Some([first, first + 1, first + 2, first + 3]);

        // Re-route the saved entries; straddlers land back at this node.
        let saved = std::mem::take(&mut self.nodes[id].entries);
        for entry in saved {
            self.insert_at(id, entry);
        }
    }

    #[cfg(test)]
    fn entries_at(&self, id: usize) -> &[Entry<T>] {
        &self.nodes[id].entries
    }

    #[cfg(test)]
    fn children_of(&self, id: usize) -> Option<[usize; 4]> {
        self.nodes[id].children
    }
}
