use super::point::Point;
use std::fmt;

/// Axis-aligned rectangle in database units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub min: Point<i64>,
    pub max: Point<i64>,
}

impl Rect {
    pub fn new(min: Point<i64>, max: Point<i64>) -> Self {
        Self { min, max }
    }

    pub fn from_coords(llx: i64, lly: i64, urx: i64, ury: i64) -> Self {
        Self::new(Point::new(llx, lly), Point::new(urx, ury))
    }

    /// Smallest rectangle enclosing all `points`, or `None` for an empty set.
    pub fn bounding<I: IntoIterator<Item = Point<i64>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self::new(first, first);
        for p in iter {
            rect.min.x = rect.min.x.min(p.x);
            rect.min.y = rect.min.y.min(p.y);
            rect.max.x = rect.max.x.max(p.x);
            rect.max.y = rect.max.y.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> i64 {
        self.max.x - self.min.x
    }
    pub fn height(&self) -> i64 {
        self.max.y - self.min.y
    }
    pub fn area(&self) -> i128 {
        self.width() as i128 * self.height() as i128
    }

    pub fn center(&self) -> Point<i64> {
        Point::new(
            (self.min.x + self.max.x).div_euclid(2),
            (self.min.y + self.max.y).div_euclid(2),
        )
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_coords(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
        )
    }

    /// Interior overlap; rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains(&self, p: Point<i64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {}) ({} {})",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}
