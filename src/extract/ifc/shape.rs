//! Explicit geometry from IFC shape representations.
//!
//! Covers the items common in coordination exports: extruded area solids
//! over rectangle, circle and closed polyline profiles, faceted B-reps,
//! triangulated face sets, polylines, boolean clipping (first operand only)
//! and mapped items. Everything is placed through the local placement
//! chain. Other items are ignored.

use std::collections::HashMap;
use tracing::debug;

use super::properties::lookup;
use crate::error::{ElementError, GeometryError};
use crate::geometry::{Geometry, GeometryKind, Point3};
use crate::parser::{IfcModel, StepEntity, StepValue};

/// Bound on placement chains and nested items.
const MAX_DEPTH: usize = 64;
const CIRCLE_SEGMENTS: usize = 16;

/// Affine frame: an origin plus the images of the unit axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point3,
    pub x: Point3,
    pub y: Point3,
    pub z: Point3,
}

impl Frame {
    pub const IDENTITY: Frame = Frame {
        origin: [0.0; 3],
        x: [1.0, 0.0, 0.0],
        y: [0.0, 1.0, 0.0],
        z: [0.0, 0.0, 1.0],
    };

    /// Right-handed frame from an optional Z axis and an optional
    /// reference X direction, as `IfcAxis2Placement3D` defines them.
    #[must_use]
    pub fn from_axes(origin: Point3, axis: Option<Point3>, ref_direction: Option<Point3>) -> Self {
        let z = axis.and_then(normalize).unwrap_or(Self::IDENTITY.z);
        let x_hint = ref_direction.unwrap_or(Self::IDENTITY.x);
        // Project the hint onto the plane normal to Z.
        let x = normalize(sub(x_hint, scale(z, dot(x_hint, z))))
            .or_else(|| normalize(cross(Self::IDENTITY.y, z)))
            .or_else(|| normalize(cross(z, Self::IDENTITY.x)))
            .unwrap_or(Self::IDENTITY.x);
        let y = cross(z, x);
        Self { origin, x, y, z }
    }

    #[must_use]
    pub fn rotate(&self, v: Point3) -> Point3 {
        add(
            add(scale(self.x, v[0]), scale(self.y, v[1])),
            scale(self.z, v[2]),
        )
    }

    #[must_use]
    pub fn apply(&self, p: Point3) -> Point3 {
        add(self.origin, self.rotate(p))
    }

    /// Compose with a frame expressed in this frame's coordinates.
    #[must_use]
    pub fn then(&self, inner: &Frame) -> Frame {
        Frame {
            origin: self.apply(inner.origin),
            x: self.rotate(inner.x),
            y: self.rotate(inner.y),
            z: self.rotate(inner.z),
        }
    }

    fn scaled(self, factor: f64) -> Frame {
        Frame {
            x: scale(self.x, factor),
            y: scale(self.y, factor),
            z: scale(self.z, factor),
            ..self
        }
    }
}

fn add(a: Point3, b: Point3) -> Point3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(v: Point3, s: f64) -> Point3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Point3, b: Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: Point3) -> Option<Point3> {
    let len = dot(v, v).sqrt();
    (len > 1e-12 && len.is_finite()).then(|| scale(v, 1.0 / len))
}

/// Geometry accumulated over all items of a representation.
#[derive(Debug, Default)]
struct Mesh {
    kind: Option<GeometryKind>,
    vertices: Vec<Point3>,
    faces: Vec<Vec<usize>>,
}

impl Mesh {
    fn add(&mut self, kind: GeometryKind, vertices: Vec<Point3>, faces: Vec<Vec<usize>>) {
        if vertices.is_empty() {
            return;
        }
        let offset = self.vertices.len();
        self.vertices.extend(vertices);
        self.faces.extend(
            faces
                .into_iter()
                .map(|face| face.into_iter().map(|i| i.saturating_add(offset)).collect()),
        );
        // A mix keeps the most complete kind.
        self.kind = Some(match (self.kind, kind) {
            (Some(GeometryKind::Solid), _) | (_, GeometryKind::Solid) => GeometryKind::Solid,
            (Some(GeometryKind::Surface), _) | (_, GeometryKind::Surface) => GeometryKind::Surface,
            _ => GeometryKind::Curve,
        });
    }

    fn into_geometry(self) -> Option<Result<Geometry, GeometryError>> {
        let kind = self.kind?;
        Some(Geometry::new(kind, self.vertices, self.faces))
    }
}

/// Geometry of a product in world coordinates.
///
/// `Ok(None)` when the element has no representation or none of its
/// items is supported. Broken references and invalid meshes are errors.
pub fn element_geometry(
    model: &IfcModel,
    element: &StepEntity,
) -> Result<Option<Geometry>, ElementError> {
    let Some(representation) = element.reference(6) else {
        return Ok(None);
    };

    let reader = ShapeReader {
        model,
        element: element.id,
    };
    let frame = match element.reference(5) {
        Some(placement) => reader.object_placement(placement, 0)?,
        None => Frame::IDENTITY,
    };

    let mut mesh = Mesh::default();
    for item in reader.representation_items(representation)? {
        reader.item(item, &frame, &mut mesh, 0)?;
    }

    mesh.into_geometry()
        .transpose()
        .map_err(|source| ElementError::Geometry {
            element: element
                .string(0)
                .map_or_else(|| format!("#{}", element.id), str::to_string),
            source,
        })
}

struct ShapeReader<'a> {
    model: &'a IfcModel,
    element: u64,
}

impl ShapeReader<'_> {
    fn entity(&self, from: u64, id: u64) -> Result<&StepEntity, ElementError> {
        lookup(self.model, from, id)
    }

    fn required<T>(value: Option<T>, entity: u64, attribute: &'static str) -> Result<T, ElementError> {
        value.ok_or(ElementError::MissingAttribute { entity, attribute })
    }

    fn coordinates(&self, from: u64, id: u64, attribute: &'static str) -> Result<Point3, ElementError> {
        let entity = self.entity(from, id)?;
        let list = Self::required(
            entity.values.first().and_then(StepValue::as_list),
            id,
            attribute,
        )?;
        Ok(to_point(list))
    }

    fn point(&self, from: u64, id: u64) -> Result<Point3, ElementError> {
        self.coordinates(from, id, "Coordinates")
    }

    fn direction(&self, from: u64, id: u64) -> Result<Point3, ElementError> {
        self.coordinates(from, id, "DirectionRatios")
    }

    /// `IfcAxis2Placement3D` or `IfcAxis2Placement2D`.
    fn placement(&self, from: u64, id: u64) -> Result<Frame, ElementError> {
        let placement = self.entity(from, id)?;
        let location = Self::required(placement.reference(0), id, "Location")?;
        let origin = self.point(id, location)?;

        if placement.is_type("IFCAXIS2PLACEMENT2D") {
            let ref_direction = placement
                .reference(1)
                .map(|d| self.direction(id, d))
                .transpose()?;
            return Ok(Frame::from_axes(origin, None, ref_direction));
        }

        let axis = placement
            .reference(1)
            .map(|d| self.direction(id, d))
            .transpose()?;
        let ref_direction = placement
            .reference(2)
            .map(|d| self.direction(id, d))
            .transpose()?;
        Ok(Frame::from_axes(origin, axis, ref_direction))
    }

    fn optional_placement(&self, from: u64, id: Option<u64>) -> Result<Frame, ElementError> {
        id.map_or(Ok(Frame::IDENTITY), |id| self.placement(from, id))
    }

    /// World frame of an `IfcLocalPlacement` chain.
    fn object_placement(&self, id: u64, depth: usize) -> Result<Frame, ElementError> {
        if depth > MAX_DEPTH {
            return Err(ElementError::PlacementDepth {
                entity: self.element,
            });
        }

        let placement = self.entity(self.element, id)?;
        if !placement.is_type("IFCLOCALPLACEMENT") {
            debug!(entity = id, kind = %placement.entity_type, "unsupported placement, using identity");
            return Ok(Frame::IDENTITY);
        }

        let parent = match placement.reference(0) {
            Some(parent) => self.object_placement(parent, depth + 1)?,
            None => Frame::IDENTITY,
        };
        let relative = self.optional_placement(id, placement.reference(1))?;
        Ok(parent.then(&relative))
    }

    /// Items of the body representation, or of every representation when
    /// none is tagged `Body`.
    fn representation_items(&self, id: u64) -> Result<Vec<u64>, ElementError> {
        let shape = self.entity(self.element, id)?;
        let mut body = Vec::new();
        let mut other = Vec::new();

        for rep_id in shape.references(2) {
            let representation = self.entity(id, rep_id)?;
            let items = representation.references(3);
            if representation
                .string(1)
                .is_some_and(|identifier| identifier.eq_ignore_ascii_case("Body"))
            {
                body.extend(items);
            } else {
                other.extend(items);
            }
        }

        Ok(if body.is_empty() { other } else { body })
    }

    fn item(&self, id: u64, frame: &Frame, mesh: &mut Mesh, depth: usize) -> Result<(), ElementError> {
        if depth > MAX_DEPTH {
            return Err(ElementError::PlacementDepth {
                entity: self.element,
            });
        }

        let item = self.entity(self.element, id)?;
        match item.entity_type.as_str() {
            "IFCEXTRUDEDAREASOLID" => self.extrusion(item, frame, mesh),
            "IFCFACETEDBREP" => self.brep(item, frame, mesh),
            "IFCTRIANGULATEDFACESET" => self.face_set(item, frame, mesh),
            "IFCPOLYLINE" => {
                let points = self.polyline(item)?;
                let segments = (1..points.len()).map(|i| vec![i - 1, i]).collect();
                let vertices = points.into_iter().map(|p| frame.apply(p)).collect();
                mesh.add(GeometryKind::Curve, vertices, segments);
                Ok(())
            }
            "IFCBOOLEANCLIPPINGRESULT" | "IFCBOOLEANRESULT" => {
                let first = Self::required(item.reference(1), id, "FirstOperand")?;
                self.item(first, frame, mesh, depth + 1)
            }
            "IFCMAPPEDITEM" => self.mapped(item, frame, mesh, depth),
            other => {
                debug!(entity = id, kind = other, "unsupported representation item");
                Ok(())
            }
        }
    }

    fn extrusion(&self, solid: &StepEntity, frame: &Frame, mesh: &mut Mesh) -> Result<(), ElementError> {
        let profile_id = Self::required(solid.reference(0), solid.id, "SweptArea")?;
        let profile = self.profile(solid.id, profile_id)?;
        if profile.len() < 3 {
            debug!(entity = profile_id, "profile has fewer than three points");
            return Ok(());
        }

        let position = self.optional_placement(solid.id, solid.reference(1))?;
        let direction_id = Self::required(solid.reference(2), solid.id, "ExtrudedDirection")?;
        let direction = normalize(self.direction(solid.id, direction_id)?).ok_or(
            ElementError::MissingAttribute {
                entity: direction_id,
                attribute: "DirectionRatios",
            },
        )?;
        let depth = Self::required(solid.real(3), solid.id, "Depth")?;

        let local = frame.then(&position);
        let offset = scale(direction, depth);
        let n = profile.len();

        let mut vertices: Vec<Point3> = profile.iter().map(|&p| local.apply(p)).collect();
        vertices.extend(profile.iter().map(|&p| local.apply(add(p, offset))));

        let mut faces = Vec::with_capacity(n + 2);
        faces.push((0..n).rev().collect());
        faces.push((n..2 * n).collect());
        for i in 0..n {
            let j = (i + 1) % n;
            faces.push(vec![i, j, n + j, n + i]);
        }

        mesh.add(GeometryKind::Solid, vertices, faces);
        Ok(())
    }

    /// Outline of a profile in the solid's local XY plane. Unsupported
    /// profile types give an empty outline.
    fn profile(&self, from: u64, id: u64) -> Result<Vec<Point3>, ElementError> {
        let profile = self.entity(from, id)?;
        match profile.entity_type.as_str() {
            "IFCRECTANGLEPROFILEDEF" => {
                let position = self.optional_placement(id, profile.reference(2))?;
                let half_x = Self::required(profile.real(3), id, "XDim")? / 2.0;
                let half_y = Self::required(profile.real(4), id, "YDim")? / 2.0;
                Ok([
                    [-half_x, -half_y, 0.0],
                    [half_x, -half_y, 0.0],
                    [half_x, half_y, 0.0],
                    [-half_x, half_y, 0.0],
                ]
                .into_iter()
                .map(|p| position.apply(p))
                .collect())
            }
            "IFCCIRCLEPROFILEDEF" => {
                let position = self.optional_placement(id, profile.reference(2))?;
                let radius = Self::required(profile.real(3), id, "Radius")?;
                Ok((0..CIRCLE_SEGMENTS)
                    .map(|i| {
                        let angle = std::f64::consts::TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                        position.apply([radius * angle.cos(), radius * angle.sin(), 0.0])
                    })
                    .collect())
            }
            "IFCARBITRARYCLOSEDPROFILEDEF" => {
                let curve_id = Self::required(profile.reference(2), id, "OuterCurve")?;
                let curve = self.entity(id, curve_id)?;
                if !curve.is_type("IFCPOLYLINE") {
                    debug!(entity = curve_id, kind = %curve.entity_type, "unsupported profile curve");
                    return Ok(Vec::new());
                }
                let mut points = self.polyline(curve)?;
                if points.len() > 1 && points.first() == points.last() {
                    points.pop();
                }
                Ok(points)
            }
            other => {
                debug!(entity = id, kind = other, "unsupported profile");
                Ok(Vec::new())
            }
        }
    }

    fn polyline(&self, polyline: &StepEntity) -> Result<Vec<Point3>, ElementError> {
        polyline
            .references(0)
            .into_iter()
            .map(|point| self.point(polyline.id, point))
            .collect()
    }

    fn brep(&self, brep: &StepEntity, frame: &Frame, mesh: &mut Mesh) -> Result<(), ElementError> {
        let shell_id = Self::required(brep.reference(0), brep.id, "Outer")?;
        let shell = self.entity(brep.id, shell_id)?;

        let mut index: HashMap<u64, usize> = HashMap::new();
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for face_id in shell.references(0) {
            let face = self.entity(shell_id, face_id)?;
            let bounds = face
                .references(0)
                .into_iter()
                .map(|bound| self.entity(face_id, bound))
                .collect::<Result<Vec<_>, _>>()?;
            let Some(bound) = bounds
                .iter()
                .find(|b| b.is_type("IFCFACEOUTERBOUND"))
                .or_else(|| bounds.first())
            else {
                continue;
            };

            let loop_id = Self::required(bound.reference(0), bound.id, "Bound")?;
            let poly_loop = self.entity(bound.id, loop_id)?;
            if !poly_loop.is_type("IFCPOLYLOOP") {
                continue;
            }

            let mut polygon = Vec::new();
            for point_id in poly_loop.references(0) {
                let vertex = match index.get(&point_id) {
                    Some(&vertex) => vertex,
                    None => {
                        vertices.push(frame.apply(self.point(loop_id, point_id)?));
                        index.insert(point_id, vertices.len() - 1);
                        vertices.len() - 1
                    }
                };
                polygon.push(vertex);
            }
            faces.push(polygon);
        }

        mesh.add(GeometryKind::Solid, vertices, faces);
        Ok(())
    }

    fn face_set(&self, set: &StepEntity, frame: &Frame, mesh: &mut Mesh) -> Result<(), ElementError> {
        let list_id = Self::required(set.reference(0), set.id, "Coordinates")?;
        let coordinates = self.entity(set.id, list_id)?;
        let points = Self::required(
            coordinates.values.first().and_then(StepValue::as_list),
            list_id,
            "CoordList",
        )?;
        let vertices = points
            .iter()
            .filter_map(StepValue::as_list)
            .map(|p| frame.apply(to_point(p)))
            .collect();

        let triangles = Self::required(
            set.values.get(3).and_then(StepValue::as_list),
            set.id,
            "CoordIndex",
        )?;
        // Indices are 1-based; 0 and negatives map past the vertex list so
        // validation reports them.
        let faces = triangles
            .iter()
            .filter_map(StepValue::as_list)
            .map(|triangle| {
                triangle
                    .iter()
                    .map(|i| match i {
                        StepValue::Integer(i) => usize::try_from(*i)
                            .ok()
                            .and_then(|i| i.checked_sub(1))
                            .unwrap_or(usize::MAX),
                        _ => usize::MAX,
                    })
                    .collect()
            })
            .collect();

        let closed = matches!(set.values.get(2), Some(StepValue::Boolean(true)));
        let kind = if closed {
            GeometryKind::Solid
        } else {
            GeometryKind::Surface
        };
        mesh.add(kind, vertices, faces);
        Ok(())
    }

    fn mapped(&self, item: &StepEntity, frame: &Frame, mesh: &mut Mesh, depth: usize) -> Result<(), ElementError> {
        let source_id = Self::required(item.reference(0), item.id, "MappingSource")?;
        let source = self.entity(item.id, source_id)?;
        let origin = self.optional_placement(source_id, source.reference(0))?;

        let target = match item.reference(1) {
            Some(target) => self.transformation(item.id, target)?,
            None => Frame::IDENTITY,
        };

        let representation_id = Self::required(source.reference(1), source_id, "MappedRepresentation")?;
        let representation = self.entity(source_id, representation_id)?;
        let mapped_frame = frame.then(&target).then(&origin);

        for child in representation.references(3) {
            self.item(child, &mapped_frame, mesh, depth + 1)?;
        }
        Ok(())
    }

    /// `IfcCartesianTransformationOperator3D` with a uniform scale.
    fn transformation(&self, from: u64, id: u64) -> Result<Frame, ElementError> {
        let operator = self.entity(from, id)?;
        let axis1 = operator.reference(0).map(|d| self.direction(id, d)).transpose()?;
        let origin_id = Self::required(operator.reference(2), id, "LocalOrigin")?;
        let origin = self.point(id, origin_id)?;
        let axis3 = operator.reference(4).map(|d| self.direction(id, d)).transpose()?;
        let factor = operator.real(3).unwrap_or(1.0);
        Ok(Frame::from_axes(origin, axis3, axis1).scaled(factor))
    }
}

/// Two or three coordinates; a missing Z is zero. Non-numeric values become
/// NaN and fail validation.
fn to_point(values: &[StepValue]) -> Point3 {
    let mut point = [0.0; 3];
    for (slot, value) in point.iter_mut().zip(values) {
        *slot = value.as_f64().unwrap_or(f64::NAN);
    }
    point
}
