use tracing::warn;

use crate::error::ElementError;
use crate::model::{PropertyMap, PropertyValue};
use crate::parser::{IfcModel, StepEntity, StepValue};

/// Direct attributes recorded as top-level properties.
const DIRECT_ATTRIBUTES: &[(usize, &str)] = &[
    (2, "Name"),
    (3, "Description"),
    (4, "ObjectType"),
    (7, "Tag"),
];

/// Physical quantities read from quantity sets. All carry their measure at
/// the same index.
const QUANTITY_TYPES: &[&str] = &[
    "IFCQUANTITYLENGTH",
    "IFCQUANTITYAREA",
    "IFCQUANTITYVOLUME",
    "IFCQUANTITYCOUNT",
    "IFCQUANTITYWEIGHT",
];
const QUANTITY_VALUE: usize = 3;

/// Flat attributes plus one nested map per property or quantity set.
///
/// A relation that cannot be resolved is skipped with a warning; whatever
/// was gathered before it is kept.
pub fn element_properties(model: &IfcModel, element: &StepEntity) -> PropertyMap {
    let mut properties = PropertyMap::new();

    for (index, key) in DIRECT_ATTRIBUTES {
        if let Some(value) = element.string(*index) {
            properties.insert((*key).to_string(), value.into());
        }
    }

    for &rel_id in model.is_defined_by(element.id) {
        match property_definition(model, rel_id) {
            Ok(Some((name, set))) => {
                properties.insert(name, PropertyValue::Map(set));
            }
            Ok(None) => {}
            Err(e) => warn!(element = element.id, "skipping property relation: {e}"),
        }
    }

    properties
}

/// Resolve one `IfcRelDefinesByProperties`. `None` for definitions that
/// are neither property nor quantity sets, or that hold no values.
fn property_definition(
    model: &IfcModel,
    rel_id: u64,
) -> Result<Option<(String, PropertyMap)>, ElementError> {
    let rel = lookup(model, rel_id, rel_id)?;
    let definition_id = rel.reference(5).ok_or(ElementError::MissingAttribute {
        entity: rel_id,
        attribute: "RelatingPropertyDefinition",
    })?;
    let definition = lookup(model, rel_id, definition_id)?;

    let set = if definition.is_type("IFCPROPERTYSET") {
        property_set(model, definition)?
    } else if definition.is_type("IFCELEMENTQUANTITY") {
        quantity_set(model, definition)?
    } else {
        return Ok(None);
    };

    if set.is_empty() {
        return Ok(None);
    }
    let name = definition
        .string(2)
        .map_or_else(|| format!("#{}", definition.id), str::to_string);
    Ok(Some((name, set)))
}

fn property_set(model: &IfcModel, pset: &StepEntity) -> Result<PropertyMap, ElementError> {
    let mut set = PropertyMap::new();
    for prop_id in pset.references(4) {
        let prop = lookup(model, pset.id, prop_id)?;
        if !prop.is_type("IFCPROPERTYSINGLEVALUE") {
            continue;
        }
        let (Some(name), Some(value)) = (prop.string(0), prop.values.get(2).and_then(scalar))
        else {
            continue;
        };
        set.insert(name.to_string(), value);
    }
    Ok(set)
}

fn quantity_set(model: &IfcModel, qset: &StepEntity) -> Result<PropertyMap, ElementError> {
    let mut set = PropertyMap::new();
    for quantity_id in qset.references(5) {
        let quantity = lookup(model, qset.id, quantity_id)?;
        if !QUANTITY_TYPES.iter().any(|t| quantity.is_type(t)) {
            continue;
        }
        if let (Some(name), Some(value)) = (quantity.string(0), quantity.real(QUANTITY_VALUE)) {
            set.insert(name.to_string(), PropertyValue::Real(value));
        }
    }
    Ok(set)
}

/// Unwrapped nominal value. Nulls, references and lists carry nothing
/// useful as a scalar.
fn scalar(value: &StepValue) -> Option<PropertyValue> {
    match value {
        StepValue::String(s) | StepValue::Enum(s) => Some(PropertyValue::Text(s.clone())),
        StepValue::Real(f) => Some(PropertyValue::Real(*f)),
        StepValue::Integer(i) => Some(PropertyValue::Integer(*i)),
        StepValue::Boolean(b) => Some(PropertyValue::Bool(*b)),
        StepValue::Reference(_) | StepValue::List(_) | StepValue::Null | StepValue::Derived => {
            None
        }
    }
}

pub(super) fn lookup(model: &IfcModel, from: u64, id: u64) -> Result<&StepEntity, ElementError> {
    model.entity(id).ok_or(ElementError::DanglingReference {
        entity: from,
        reference: id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MODEL: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#10=IFCBUILDINGELEMENTPROXY('g1',$,'Proxy 1','Steel member','BEAM',$,$,'T-7',$);
#20=IFCPROPERTYSET('p1',$,'Pset_Common',$,(#21,#22,#23,#24));
#21=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#22=IFCPROPERTYSINGLEVALUE('Reference',$,IFCIDENTIFIER('HEA 200'),$);
#23=IFCPROPERTYSINGLEVALUE('Unset',$,$,$);
#24=IFCPROPERTYSINGLEVALUE('FireRating',$,IFCLABEL('REI60'),$);
#30=IFCRELDEFINESBYPROPERTIES('r1',$,$,$,(#10),#20);
#40=IFCELEMENTQUANTITY('q1',$,'Qto_BeamBaseQuantities',$,$,(#41,#42));
#41=IFCQUANTITYLENGTH('Length',$,$,6.5,$);
#42=IFCQUANTITYVOLUME('NetVolume',$,$,0.12,$);
#51=IFCRELDEFINESBYPROPERTIES('r2',$,$,$,(#10),#40);
#60=IFCPROPERTYSET('p2',$,'Pset_Broken',$,(#99));
#61=IFCRELDEFINESBYPROPERTIES('r3',$,$,$,(#10),#60);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn collects_attributes_sets_and_quantities() {
        let model = IfcModel::parse(MODEL).unwrap();
        let element = model.entity(10).unwrap();
        let properties = element_properties(&model, element);

        assert_eq!(properties["Name"], PropertyValue::from("Proxy 1"));
        assert_eq!(properties["Description"], PropertyValue::from("Steel member"));
        assert_eq!(properties["ObjectType"], PropertyValue::from("BEAM"));
        assert_eq!(properties["Tag"], PropertyValue::from("T-7"));

        let mut pset = PropertyMap::new();
        pset.insert("IsExternal".into(), true.into());
        pset.insert("Reference".into(), "HEA 200".into());
        pset.insert("FireRating".into(), "REI60".into());
        assert_eq!(properties["Pset_Common"], PropertyValue::Map(pset));

        let mut qto = PropertyMap::new();
        qto.insert("Length".into(), PropertyValue::Real(6.5));
        qto.insert("NetVolume".into(), PropertyValue::Real(0.12));
        assert_eq!(properties["Qto_BeamBaseQuantities"], PropertyValue::Map(qto));
    }

    #[test]
    fn broken_relation_is_skipped() {
        let model = IfcModel::parse(MODEL).unwrap();
        let properties = element_properties(&model, model.entity(10).unwrap());
        assert!(!properties.contains_key("Pset_Broken"));
        assert_eq!(properties.len(), 6);
    }
}
