use crate::config::constants::{QUADTREE_MIN_HALF_SIZE_KM, QUADTREE_NODE_CAPACITY};
use crate::data::poi::{Coordinate, POI};
use std::fmt;

#[derive(Clone, Debug)]
pub struct QuadTreeNode {
    boundary: Boundary,
    children: Option<Box<[QuadTreeNode; 4]>>,
    points: Vec<(Coordinate, usize)>,
}

#[derive(Clone, Debug)]
pub struct Boundary {
    center: Coordinate,
    half_width: f64,
    half_height: f64,
}

impl QuadTreeNode {
    pub fn new(center: Coordinate, half_width: f64, half_height: f64) -> Self {
        Self {
            boundary: Boundary {
                center,
                half_width,
                half_height,
            },
            children: None,
            points: Vec::new(),
        }
    }

    pub fn subdivide(&mut self) {
        let x = self.boundary.center.x;
        let y = self.boundary.center.y;
        let hw = self.boundary.half_width / 2.0;
        let hh = self.boundary.half_height / 2.0;

        let children = Box::new([
            // Northwest
            QuadTreeNode::new(Coordinate::new(x - hw, y + hh), hw, hh),
            // Northeast
            QuadTreeNode::new(Coordinate::new(x + hw, y + hh), hw, hh),
            // Southwest
            QuadTreeNode::new(Coordinate::new(x - hw, y - hh), hw, hh),
            // Southeast
            QuadTreeNode::new(Coordinate::new(x + hw, y - hh), hw, hh),
        ]);

        self.children = Some(children);

        // Push stored points down; points on a shared edge go to the first child that holds them
        let points = std::mem::take(&mut self.points);
        for (coordinate, row) in points {
            if !self.insert_into_children(coordinate, row) {
                self.points.push((coordinate, row));
            }
        }
    }

    pub fn contains_point(&self, point: &Coordinate) -> bool {
        point.x >= self.boundary.center.x - self.boundary.half_width
            && point.x <= self.boundary.center.x + self.boundary.half_width
            && point.y >= self.boundary.center.y - self.boundary.half_height
            && point.y <= self.boundary.center.y + self.boundary.half_height
    }

    /// Whether any part of this node lies within `radius` of `center`.
    pub fn intersects_circle(&self, center: &Coordinate, radius: f64) -> bool {
        let dx = ((center.x - self.boundary.center.x).abs() - self.boundary.half_width).max(0.0);
        let dy = ((center.y - self.boundary.center.y).abs() - self.boundary.half_height).max(0.0);
        dx * dx + dy * dy <= radius * radius
    }

    fn insert(&mut self, coordinate: Coordinate, row: usize) -> bool {
        if !self.contains_point(&coordinate) {
            return false;
        }

        if self.children.is_none() {
            let can_split = self.boundary.half_width > QUADTREE_MIN_HALF_SIZE_KM
                || self.boundary.half_height > QUADTREE_MIN_HALF_SIZE_KM;
            if self.points.len() < QUADTREE_NODE_CAPACITY || !can_split {
                self.points.push((coordinate, row));
                return true;
            }
            self.subdivide();
        }

        if !self.insert_into_children(coordinate, row) {
            self.points.push((coordinate, row));
        }
        true
    }

    fn insert_into_children(&mut self, coordinate: Coordinate, row: usize) -> bool {
        match &mut self.children {
            Some(children) => children.iter_mut().any(|child| child.insert(coordinate, row)),
            None => false,
        }
    }
}

/// Quadtree over settlement coordinates; answers radius queries with row indices.
#[derive(Clone)]
pub struct SpatialIndex {
    root: QuadTreeNode,
    len: usize,
}

// Debug prints the point count, not the nodes
impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("points", &self.len)
            .field("boundary", &self.root.boundary)
            .finish()
    }
}

impl SpatialIndex {
    /// Index `coordinates`, each identified by its position in the slice.
    pub fn build(coordinates: &[Coordinate]) -> Self {
        let (min_x, max_x, min_y, max_y) = coordinates.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(min_x, max_x, min_y, max_y), c| (min_x.min(c.x), max_x.max(c.x), min_y.min(c.y), max_y.max(c.y)),
        );

        let root = if coordinates.is_empty() {
            QuadTreeNode::new(Coordinate::new(0.0, 0.0), 1.0, 1.0)
        } else {
            let half_width = ((max_x - min_x) / 2.0).max(QUADTREE_MIN_HALF_SIZE_KM);
            let half_height = ((max_y - min_y) / 2.0).max(QUADTREE_MIN_HALF_SIZE_KM);
            QuadTreeNode::new(
                Coordinate::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
                half_width,
                half_height,
            )
        };

        let mut index = Self { root, len: 0 };
        for (row, coordinate) in coordinates.iter().enumerate() {
            if index.root.insert(*coordinate, row) {
                index.len += 1;
            }
        }
        index
    }

    /// Index anything with a location, by slice position.
    pub fn from_pois<P: POI>(items: &[P]) -> Self {
        let coordinates: Vec<Coordinate> = items.iter().map(|item| *item.get_coordinate()).collect();
        Self::build(&coordinates)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rows within `radius` (inclusive) of `center`, in ascending row order.
    pub fn within_radius(&self, center: &Coordinate, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        if !(radius >= 0.0) {
            return found;
        }

        let mut nodes_to_visit = vec![&self.root];
        while let Some(node) = nodes_to_visit.pop() {
            if !node.intersects_circle(center, radius) {
                continue;
            }

            found.extend(
                node.points
                    .iter()
                    .filter(|(coordinate, _)| coordinate.distance_to(center) <= radius)
                    .map(|(_, row)| *row),
            );

            if let Some(children) = &node.children {
                nodes_to_visit.extend(children.iter());
            }
        }

        found.sort_unstable();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_of_points(side: usize) -> Vec<Coordinate> {
        (0..side * side)
            .map(|i| Coordinate::new((i % side) as f64, (i / side) as f64))
            .collect()
    }

    #[test]
    fn radius_query_matches_brute_force() {
        let points = grid_of_points(20);
        let index = SpatialIndex::build(&points);
        assert_eq!(index.len(), 400);

        for (center, radius) in [
            (Coordinate::new(5.0, 5.0), 2.5),
            (Coordinate::new(0.0, 0.0), 1.0),
            (Coordinate::new(19.0, 10.0), 4.0),
            (Coordinate::new(-3.0, -3.0), 1.0),
        ] {
            let expected: Vec<usize> = points
                .iter()
                .enumerate()
                .filter(|(_, p)| p.distance_to(&center) <= radius)
                .map(|(row, _)| row)
                .collect();
            assert_eq!(index.within_radius(&center, radius), expected);
        }
    }

    #[test]
    fn coincident_points_are_all_kept() {
        let points = vec![Coordinate::new(1.0, 1.0); QUADTREE_NODE_CAPACITY * 3];
        let index = SpatialIndex::build(&points);
        assert_eq!(index.within_radius(&Coordinate::new(1.0, 1.0), 0.0).len(), points.len());
    }

    #[test]
    fn settlements_are_indexed_by_row() {
        use crate::models::settlement::{Settlement, SettlementGeography};

        let settlements: Vec<Settlement> = (0..3)
            .map(|i| Settlement::new(10 + i, SettlementGeography::at(Coordinate::new(i as f64 * 10.0, 0.0), 50.0)))
            .collect();
        let index = SpatialIndex::from_pois(&settlements);
        assert_eq!(index.within_radius(&Coordinate::new(9.0, 0.0), 2.0), vec![1]);
        assert_eq!(settlements[1].get_id(), 11);
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = SpatialIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.within_radius(&Coordinate::new(0.0, 0.0), 100.0).is_empty());
    }
}
