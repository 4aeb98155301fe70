//! Geometry records attached to elements and the pure operations over them.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

pub type Point3 = [f64; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Solid,
    Surface,
    Curve,
}

/// Axis-aligned bounds of a vertex set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    /// Degenerate box at the origin, used for empty vertex sets.
    pub const ZERO: BoundingBox = BoundingBox {
        min: [0.0; 3],
        max: [0.0; 3],
    };

    #[must_use]
    pub fn contains(&self, point: &Point3) -> bool {
        (0..3).all(|axis| self.min[axis] <= point[axis] && point[axis] <= self.max[axis])
    }

    #[must_use]
    pub fn size(&self) -> Point3 {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// Componentwise min/max over `vertices`. Empty input gives
/// [`BoundingBox::ZERO`].
#[must_use]
pub fn bounding_box(vertices: &[Point3]) -> BoundingBox {
    let Some((first, rest)) = vertices.split_first() else {
        return BoundingBox::ZERO;
    };

    rest.iter().fold(
        BoundingBox {
            min: *first,
            max: *first,
        },
        |mut bbox, vertex| {
            for axis in 0..3 {
                bbox.min[axis] = bbox.min[axis].min(vertex[axis]);
                bbox.max[axis] = bbox.max[axis].max(vertex[axis]);
            }
            bbox
        },
    )
}

/// Element geometry: a vertex list and faces indexing into it.
///
/// Curves store their segments as two-index faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub bounding_box: BoundingBox,
    pub vertices: Vec<Point3>,
    pub faces: Vec<Vec<usize>>,
}

impl Geometry {
    /// Build geometry and compute its bounding box.
    ///
    /// Every face index must be below the vertex count and every
    /// coordinate finite.
    pub fn new(
        kind: GeometryKind,
        vertices: Vec<Point3>,
        faces: Vec<Vec<usize>>,
    ) -> Result<Self, GeometryError> {
        if let Some(index) = vertices
            .iter()
            .position(|v| v.iter().any(|c| !c.is_finite()))
        {
            return Err(GeometryError::NonFiniteVertex { index });
        }

        for (face_no, face) in faces.iter().enumerate() {
            if let Some(&index) = face.iter().find(|&&i| i >= vertices.len()) {
                return Err(GeometryError::FaceIndexOutOfRange {
                    face: face_no,
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }

        Ok(Self {
            kind,
            bounding_box: bounding_box(&vertices),
            vertices,
            faces,
        })
    }

    /// Axis-aligned box with six quad faces.
    #[must_use]
    pub fn cuboid(origin: Point3, size: Point3) -> Self {
        let [x, y, z] = origin;
        let [dx, dy, dz] = size;
        let vertices = vec![
            [x, y, z],
            [x + dx, y, z],
            [x + dx, y + dy, z],
            [x, y + dy, z],
            [x, y, z + dz],
            [x + dx, y, z + dz],
            [x + dx, y + dy, z + dz],
            [x, y + dy, z + dz],
        ];
        let faces = vec![
            vec![0, 1, 2, 3],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![2, 3, 7, 6],
            vec![0, 3, 7, 4],
            vec![1, 2, 6, 5],
        ];
        Self {
            kind: GeometryKind::Solid,
            bounding_box: bounding_box(&vertices),
            vertices,
            faces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vertex_set_gives_zero_box() {
        assert_eq!(bounding_box(&[]), BoundingBox::ZERO);
    }

    #[test]
    fn box_contains_every_vertex() {
        let vertices = [
            [1.0, -2.0, 3.5],
            [-4.0, 0.5, 0.0],
            [2.5, 7.0, -1.0],
            [0.0, 0.0, 0.0],
        ];
        let bbox = bounding_box(&vertices);

        assert_eq!(bbox.min, [-4.0, -2.0, -1.0]);
        assert_eq!(bbox.max, [2.5, 7.0, 3.5]);
        assert!(vertices.iter().all(|v| bbox.contains(v)));
    }

    #[test]
    fn single_vertex_is_degenerate_box() {
        let bbox = bounding_box(&[[3.0, 4.0, 5.0]]);
        assert_eq!(bbox.min, bbox.max);
        assert_eq!(bbox.size(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_out_of_range_face_index() {
        let err = Geometry::new(
            GeometryKind::Surface,
            vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![vec![0, 1, 3]],
        )
        .unwrap_err();

        assert_eq!(
            err,
            GeometryError::FaceIndexOutOfRange {
                face: 0,
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn rejects_non_finite_vertex() {
        let err = Geometry::new(
            GeometryKind::Curve,
            vec![[0.0; 3], [f64::NAN, 0.0, 0.0]],
            vec![vec![0, 1]],
        )
        .unwrap_err();
        assert_eq!(err, GeometryError::NonFiniteVertex { index: 1 });
    }

    #[test]
    fn cuboid_bounds() {
        let cuboid = Geometry::cuboid([1.0, 2.0, 3.0], [5.0, 0.5, 3.0]);
        assert_eq!(cuboid.bounding_box.min, [1.0, 2.0, 3.0]);
        assert_eq!(cuboid.bounding_box.max, [6.0, 2.5, 6.0]);
        assert_eq!(cuboid.faces.len(), 6);
    }
}
