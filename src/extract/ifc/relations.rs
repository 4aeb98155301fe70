//! Lookups over the inverse relationships of an element.

use tracing::debug;

use crate::parser::{IfcModel, StepEntity};

/// Building storey containing the element: its name, long name, or
/// `Level {elevation}`. Elements contained in other spatial structures
/// have no level.
pub fn level(model: &IfcModel, element: &StepEntity) -> Option<String> {
    let structure_id = model.contained_in_structure(element.id)?;
    let Some(structure) = model.entity(structure_id) else {
        debug!(element = element.id, structure_id, "containing structure is missing");
        return None;
    };
    if !structure.is_type("IFCBUILDINGSTOREY") {
        return None;
    }

    structure
        .string(2)
        .or_else(|| structure.string(7))
        .map(str::to_string)
        .or_else(|| structure.real(9).map(|elevation| format!("Level {elevation}")))
}

/// Name of the type object assigned through `IfcRelDefinesByType`.
pub fn type_name(model: &IfcModel, element: &StepEntity) -> Option<String> {
    let type_id = model.is_typed_by(element.id)?;
    model
        .entity(type_id)
        .and_then(|type_object| type_object.string(2))
        .map(str::to_string)
}

/// Entity ids of the materials associated with the element, resolved
/// through layer set usages and material lists.
pub fn material_ids(model: &IfcModel, element: &StepEntity) -> Vec<String> {
    let mut ids = Vec::new();

    for &rel_id in model.has_associations(element.id) {
        let Some(material_id) = model.entity(rel_id).and_then(|rel| rel.reference(5)) else {
            continue;
        };
        let Some(material) = model.entity(material_id) else {
            debug!(element = element.id, material_id, "associated material is missing");
            continue;
        };

        if material.is_type("IFCMATERIAL") {
            ids.push(material.id);
        } else if material.is_type("IFCMATERIALLAYERSETUSAGE") {
            let layers = material
                .reference(0)
                .and_then(|set_id| model.entity(set_id))
                .map(|layer_set| layer_set.references(0))
                .unwrap_or_default();
            ids.extend(
                layers
                    .into_iter()
                    .filter_map(|layer_id| model.entity(layer_id))
                    .filter_map(|layer| layer.reference(0)),
            );
        } else if material.is_type("IFCMATERIALLIST") {
            ids.extend(material.references(0));
        }
    }

    ids.into_iter().map(|id| id.to_string()).collect()
}
