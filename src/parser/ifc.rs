use std::collections::HashMap;
use std::path::Path;

use crate::error::ParseError;
use crate::parser::step::{StepEntity, StepFile};

/// Opened IFC model: the STEP entity graph plus the inverse relationship
/// attributes (`IsDefinedBy`, `IsTypedBy`, `ContainedInStructure`,
/// `HasAssociations`) that STEP only stores on the relationship side.
#[derive(Debug)]
pub struct IfcModel {
    step: StepFile,
    defined_by: HashMap<u64, Vec<u64>>,
    typed_by: HashMap<u64, u64>,
    contained_in: HashMap<u64, u64>,
    associations: HashMap<u64, Vec<u64>>,
}

/// Loads and indexes an IFC file.
///
/// # Errors
///
/// Returns [`ParseError::FileRead`] if the file cannot be read.
/// Returns [`ParseError::InvalidStep`] if the STEP format is malformed.
///
/// # Example
///
/// ```no_run
/// use bim_processor::parser::open_ifc;
///
/// let model = open_ifc("model.ifc")?;
/// println!("{} walls", model.by_type("IfcWall").len());
/// # Ok::<(), bim_processor::error::ParseError>(())
/// ```
pub fn open_ifc<P: AsRef<Path>>(path: P) -> Result<IfcModel, ParseError> {
    let bytes = std::fs::read(&path).map_err(|source| ParseError::FileRead {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    IfcModel::parse(&String::from_utf8_lossy(&bytes))
}

impl IfcModel {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let step = StepFile::parse(content)?;

        // RelatedObjects / RelatedElements sit at index 4 and the relating
        // side at index 5 for every IfcRelationship subtype used here.
        let mut defined_by: HashMap<u64, Vec<u64>> = HashMap::new();
        for rel in step.get_entities_by_type("IFCRELDEFINESBYPROPERTIES") {
            for object in rel.references(4) {
                defined_by.entry(object).or_default().push(rel.id);
            }
        }

        let mut typed_by = HashMap::new();
        for rel in step.get_entities_by_type("IFCRELDEFINESBYTYPE") {
            if let Some(type_id) = rel.reference(5) {
                for object in rel.references(4) {
                    typed_by.insert(object, type_id);
                }
            }
        }

        let mut contained_in = HashMap::new();
        for rel in step.get_entities_by_type("IFCRELCONTAINEDINSPATIALSTRUCTURE") {
            if let Some(structure) = rel.reference(5) {
                for element in rel.references(4) {
                    contained_in.insert(element, structure);
                }
            }
        }

        let mut associations: HashMap<u64, Vec<u64>> = HashMap::new();
        for rel in step.get_entities_by_type("IFCRELASSOCIATESMATERIAL") {
            for object in rel.references(4) {
                associations.entry(object).or_default().push(rel.id);
            }
        }

        Ok(Self {
            step,
            defined_by,
            typed_by,
            contained_in,
            associations,
        })
    }

    /// Schema identifier from the header, e.g. `IFC2X3` or `IFC4`.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.step.schema
    }

    #[must_use]
    pub fn step(&self) -> &StepFile {
        &self.step
    }

    #[must_use]
    pub fn entity(&self, id: u64) -> Option<&StepEntity> {
        self.step.get_entity(id)
    }

    /// Entities of an exact type (no subtype expansion), in id order.
    #[must_use]
    pub fn by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        self.step.get_entities_by_type(entity_type)
    }

    /// `IfcRelDefinesByProperties` relations pointing at `id`.
    #[must_use]
    pub fn is_defined_by(&self, id: u64) -> &[u64] {
        self.defined_by.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Type object assigned through `IfcRelDefinesByType`.
    #[must_use]
    pub fn is_typed_by(&self, id: u64) -> Option<u64> {
        self.typed_by.get(&id).copied()
    }

    /// Spatial structure element that directly contains `id`.
    #[must_use]
    pub fn contained_in_structure(&self, id: u64) -> Option<u64> {
        self.contained_in.get(&id).copied()
    }

    /// `IfcRelAssociatesMaterial` relations pointing at `id`.
    #[must_use]
    pub fn has_associations(&self, id: u64) -> &[u64] {
        self.associations.get(&id).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#10=IFCWALL('w1',$,'Wall A',$,$,$,$,$);
#11=IFCWALL('w2',$,'Wall B',$,$,$,$,$);
#20=IFCWALLTYPE('t1',$,'Generic 200',$,$,$,$,$,$,.STANDARD.);
#21=IFCRELDEFINESBYTYPE('r1',$,$,$,(#10,#11),#20);
#30=IFCBUILDINGSTOREY('s1',$,'Level 1',$,$,$,$,$,.ELEMENT.,0.);
#31=IFCRELCONTAINEDINSPATIALSTRUCTURE('r2',$,$,$,(#10),#30);
#40=IFCPROPERTYSET('p1',$,'Pset_WallCommon',$,());
#41=IFCRELDEFINESBYPROPERTIES('r3',$,$,$,(#10,#11),#40);
#50=IFCMATERIAL('Concrete');
#51=IFCRELASSOCIATESMATERIAL('r4',$,$,$,(#11),#50);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn indexes_inverse_relationships() {
        let model = IfcModel::parse(MODEL).unwrap();

        assert_eq!(model.schema(), "IFC2X3");
        assert_eq!(model.by_type("IfcWall").len(), 2);
        assert_eq!(model.is_typed_by(11), Some(20));
        assert_eq!(model.contained_in_structure(10), Some(30));
        assert_eq!(model.contained_in_structure(11), None);
        assert_eq!(model.is_defined_by(10), &[41]);
        assert_eq!(model.has_associations(11), &[51]);
        assert!(model.has_associations(10).is_empty());
    }
}
