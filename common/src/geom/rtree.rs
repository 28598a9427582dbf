use super::rect::Rect;
use rstar::{AABB, RTree};

/// R-tree over layout rectangles, used to find art cells landing on
/// geometry that was already blocked before the run.
pub struct SpatialIndex {
    tree: RTree<IndexedRect>,
}

struct IndexedRect {
    rect: Rect,
    id: usize,
}

impl rstar::RTreeObject for IndexedRect {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.rect.min.x, self.rect.min.y],
            [self.rect.max.x, self.rect.max.y],
        )
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn from_rects<I: IntoIterator<Item = Rect>>(rects: I) -> Self {
        let items = rects
            .into_iter()
            .enumerate()
            .map(|(id, rect)| IndexedRect { rect, id })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn insert(&mut self, rect: Rect, id: usize) {
        self.tree.insert(IndexedRect { rect, id });
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Ids of indexed rectangles whose interior overlaps `rect`.
    pub fn query(&self, rect: Rect) -> Vec<usize> {
        let aabb = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&aabb)
            .filter(|item| item.rect.overlaps(&rect))
            .map(|item| item.id)
            .collect()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_ignores_touching_rects() {
        let index = SpatialIndex::from_rects([
            Rect::from_coords(0, 0, 10, 10),
            Rect::from_coords(20, 20, 30, 30),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.query(Rect::from_coords(5, 5, 25, 25)).len(), 2);
        assert!(index.query(Rect::from_coords(10, 0, 20, 10)).is_empty());
    }

    #[test]
    fn insert_after_build() {
        let mut index = SpatialIndex::new();
        assert!(index.is_empty());
        index.insert(Rect::from_coords(0, 0, 4, 4), 7);
        assert_eq!(index.query(Rect::from_coords(1, 1, 2, 2)), vec![7]);
    }
}
