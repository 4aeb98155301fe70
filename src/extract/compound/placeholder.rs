use std::path::Path;

use crate::geometry::Geometry;
use crate::model::{
    ElementCategory, FileFormat, GeometryHandle, NativeType, PropertyMap, PropertyValue,
    RawElement,
};
use crate::parser::ContainerMetadata;

/// Supplies the native elements of a compound document.
pub trait ElementSource: Send + Sync {
    fn elements(&self, path: &Path, metadata: &ContainerMetadata) -> Vec<RawElement>;

    /// True when the elements are synthesized rather than read from the
    /// file.
    fn is_placeholder(&self) -> bool {
        false
    }
}

struct Sample {
    category: ElementCategory,
    category_code: i64,
    category_name: &'static str,
    family: &'static str,
    type_name: &'static str,
    size: [f64; 3],
    extra: &'static [(&'static str, Extra)],
}

#[derive(Clone, Copy)]
enum Extra {
    Real(f64),
    Text(&'static str),
}

const SAMPLES: &[Sample] = &[
    Sample {
        category: ElementCategory::Wall,
        category_code: -2_000_011,
        category_name: "Walls",
        family: "Basic Wall",
        type_name: "Generic - 200mm",
        size: [5.0, 0.2, 3.0],
        extra: &[
            ("Length", Extra::Real(5.0)),
            ("Height", Extra::Real(3.0)),
            ("Thickness", Extra::Real(0.2)),
            ("Area", Extra::Real(15.0)),
            ("Volume", Extra::Real(3.0)),
            ("Function", Extra::Text("Exterior")),
        ],
    },
    Sample {
        category: ElementCategory::Floor,
        category_code: -2_000_032,
        category_name: "Floors",
        family: "Floor",
        type_name: "Generic - 300mm",
        size: [10.0, 10.0, 0.3],
        extra: &[
            ("Area", Extra::Real(100.0)),
            ("Thickness", Extra::Real(0.3)),
            ("Volume", Extra::Real(30.0)),
            ("Perimeter", Extra::Real(40.0)),
        ],
    },
    Sample {
        category: ElementCategory::Column,
        category_code: -2_000_100,
        category_name: "Structural Columns",
        family: "Structural Column",
        type_name: "300x300mm",
        size: [0.3, 0.3, 3.0],
        extra: &[
            ("Height", Extra::Real(3.0)),
            ("Width", Extra::Real(0.3)),
            ("Depth", Extra::Real(0.3)),
            ("Volume", Extra::Real(0.27)),
        ],
    },
    Sample {
        category: ElementCategory::Beam,
        category_code: -2_000_012,
        category_name: "Structural Framing",
        family: "Structural Framing",
        type_name: "W12x26",
        size: [5.0, 0.3, 0.5],
        extra: &[
            ("Length", Extra::Real(5.0)),
            ("Width", Extra::Real(0.3)),
            ("Height", Extra::Real(0.5)),
            ("Volume", Extra::Real(0.75)),
        ],
    },
    Sample {
        category: ElementCategory::Door,
        category_code: -2_000_023,
        category_name: "Doors",
        family: "Single Door",
        type_name: "0915 x 2134mm",
        size: [0.9, 0.1, 2.1],
        extra: &[
            ("Width", Extra::Real(0.915)),
            ("Height", Extra::Real(2.134)),
            ("Thickness", Extra::Real(0.044)),
            ("Fire Rating", Extra::Text("1 Hour")),
        ],
    },
    Sample {
        category: ElementCategory::Window,
        category_code: -2_000_014,
        category_name: "Windows",
        family: "Fixed Window",
        type_name: "1200 x 1500mm",
        size: [1.2, 0.1, 1.5],
        extra: &[
            ("Width", Extra::Real(1.2)),
            ("Height", Extra::Real(1.5)),
            ("Sill Height", Extra::Real(0.9)),
            ("Glazing Area", Extra::Real(1.8)),
        ],
    },
];

/// Fixed set of one element per common category, laid out along X.
///
/// Stands in for per-element parsing, which needs the vendor API. Only
/// the positions and names are synthetic; the elements still go through
/// classification like any other.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderElementSource;

impl PlaceholderElementSource {
    /// Categories of the generated elements, in order.
    pub fn categories() -> impl Iterator<Item = ElementCategory> {
        SAMPLES.iter().map(|sample| sample.category)
    }
}

impl ElementSource for PlaceholderElementSource {
    fn elements(&self, _path: &Path, _metadata: &ContainerMetadata) -> Vec<RawElement> {
        SAMPLES
            .iter()
            .enumerate()
            .map(|(idx, sample)| sample.raw(idx))
            .collect()
    }

    fn is_placeholder(&self) -> bool {
        true
    }
}

impl Sample {
    fn raw(&self, idx: usize) -> RawElement {
        let position = [idx as f64 * 5.0, 0.0, (idx % 3) as f64 * 3.0];
        let cuboid = Geometry::cuboid(position, self.size);

        let mut location = PropertyMap::new();
        for (axis, value) in ["X", "Y", "Z"].into_iter().zip(position) {
            location.insert(axis.to_string(), value.into());
        }

        let mut properties = PropertyMap::new();
        properties.insert("Family".into(), self.family.into());
        properties.insert("Type".into(), self.type_name.into());
        properties.insert("Location".into(), location.into());
        properties.insert("Phase Created".into(), "New Construction".into());
        properties.insert("Phase Demolished".into(), "None".into());
        properties.insert("RevitCategoryId".into(), self.category_code.into());
        properties.insert("Source".into(), "placeholder".into());
        for (key, value) in self.extra {
            let value = match *value {
                Extra::Real(r) => PropertyValue::Real(r),
                Extra::Text(t) => PropertyValue::from(t),
            };
            properties.insert((*key).to_string(), value);
        }

        RawElement {
            format: FileFormat::Revit,
            native_type: NativeType::CategoryCode(self.category_code),
            external_id: format!("element_{}", idx + 1),
            category_name: Some(self.category_name.to_string()),
            family_name: Some(self.family.to_string()),
            type_name: Some(self.type_name.to_string()),
            level: Some(format!("Level {}", (idx % 3) + 1)),
            properties,
            material_ids: Vec::new(),
            geometry: GeometryHandle::Mesh {
                kind: cuboid.kind,
                vertices: cuboid.vertices,
                faces: cuboid.faces,
            },
        }
    }
}
