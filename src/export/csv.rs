use crate::error::ExportError;
use crate::model::Element;
use std::fs::File;
use std::path::Path;

/// One row per element. Properties are written as a JSON object so
/// nested sets survive the flat format.
pub fn export_csv<P: AsRef<Path>>(elements: &[Element], path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);

    writer.write_record([
        "Element ID",
        "External ID",
        "Model ID",
        "Category",
        "Family",
        "Type",
        "Level",
        "Geometry",
        "Min X",
        "Min Y",
        "Min Z",
        "Max X",
        "Max Y",
        "Max Z",
        "Materials",
        "Properties",
    ])?;

    for element in elements {
        let bbox = &element.geometry.bounding_box;
        let coordinate = |v: f64| format!("{v:.3}");
        let materials = element
            .material_ids
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");

        writer.write_record([
            element.id.clone(),
            element.external_id.clone(),
            element.model_id.clone(),
            element.category.to_string(),
            element.family_name.clone().unwrap_or_default(),
            element.type_name.clone().unwrap_or_default(),
            element.level.clone().unwrap_or_default(),
            serde_json::to_value(element.geometry.kind)?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            coordinate(bbox.min[0]),
            coordinate(bbox.min[1]),
            coordinate(bbox.min[2]),
            coordinate(bbox.max[0]),
            coordinate(bbox.max[1]),
            coordinate(bbox.max[2]),
            materials,
            serde_json::to_string(&element.properties)?,
        ])?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::model::{ElementCategory, PropertyMap};
    use chrono::Utc;

    #[test]
    fn writes_one_row_per_element() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elements.csv");

        let mut properties = PropertyMap::new();
        properties.insert("Name".into(), "Wall, north".into());
        let element = Element {
            id: "e1".into(),
            model_id: "m1".into(),
            external_id: "g1".into(),
            category: ElementCategory::Wall,
            family_name: Some("IfcWall".into()),
            type_name: None,
            level: Some("Level 1".into()),
            geometry: Geometry::cuboid([0.0; 3], [5.0, 0.2, 3.0]),
            properties,
            material_ids: ["40".to_string()].into_iter().collect(),
            created_at: Utc::now(),
        };

        export_csv(&[element], &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][3], "wall");
        assert_eq!(&rows[0][7], "solid");
        assert_eq!(&rows[0][12], "0.200");
        assert_eq!(&rows[0][14], "40");
        assert_eq!(&rows[0][15], r#"{"Name":"Wall, north"}"#);
    }
}
