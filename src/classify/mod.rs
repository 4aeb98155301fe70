//! Rule-based mapping of source element types onto [`ElementCategory`].
//!
//! Three independent strategies are tried in a fixed, format-specific
//! order: exact type/category-code lookup, keyword search over property
//! values, and keyword search over a name. The IFC cascade is
//! type, properties, family name. The Revit cascade is category code,
//! category name, properties, family name.

pub mod rules;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ElementCategory, FileFormat, PropertyMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    TypeMapping,
    PropertyBased,
    NameBased,
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: ElementCategory,
    pub confidence: f64,
    pub method: ClassificationMethod,
}

impl ClassificationResult {
    /// Fallback for inputs no table recognises. Scored at the 0.5 floor
    /// like any other non-exact result.
    const UNCLASSIFIED: Self = Self {
        category: ElementCategory::Other,
        confidence: 0.5,
        method: ClassificationMethod::Unclassified,
    };

    fn exact(category: ElementCategory) -> Self {
        Self {
            category,
            confidence: 1.0,
            method: ClassificationMethod::TypeMapping,
        }
    }

    /// Score a keyword match. Corroboration by the property text lifts
    /// confidence from the 0.5 floor to 0.7.
    fn keyword(category: ElementCategory, property_text: Option<&str>) -> Self {
        let corroborated =
            property_text.and_then(rules::match_keywords) == Some(category);
        if corroborated {
            Self {
                category,
                confidence: 0.7,
                method: ClassificationMethod::PropertyBased,
            }
        } else {
            Self {
                category,
                confidence: 0.5,
                method: ClassificationMethod::NameBased,
            }
        }
    }
}

/// Standalone classification input, independent of file processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub file_type: Option<FileFormat>,
    /// IFC entity name, or a Revit category id written as a number.
    pub element_type: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub properties: Option<PropertyMap>,
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    format: FileFormat,
    subject: String,
    category_name: Option<String>,
    family_name: Option<String>,
    property_text: Option<String>,
}

/// Element classifier with a memoization cache.
///
/// Construct one per composition root and share it behind an `Arc`; the
/// cache is safe for concurrent use. Clearing the cache never changes a
/// result because the key covers every input the result depends on.
#[derive(Debug, Default)]
pub struct ElementClassifier {
    cache: DashMap<CacheKey, ClassificationResult>,
}

impl ElementClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an IFC element by entity name, properties and type name.
    pub fn classify_ifc(
        &self,
        ifc_type: &str,
        properties: Option<&PropertyMap>,
        family_name: Option<&str>,
    ) -> ClassificationResult {
        let property_text = properties.and_then(property_text);
        let family_name = family_name.filter(|s| !s.is_empty());

        let key = CacheKey {
            format: FileFormat::Ifc,
            subject: ifc_type.to_string(),
            category_name: None,
            family_name: family_name.map(str::to_string),
            property_text: property_text.clone(),
        };
        if let Some(hit) = self.cache.get(&key) {
            return *hit;
        }

        let property_text = property_text.as_deref();
        let table_hit = rules::ifc_type(ifc_type).map(|(_, category)| category);
        let result = match table_hit {
            Some(category) if category != ElementCategory::Other => {
                ClassificationResult::exact(category)
            }
            _ => property_text
                .and_then(rules::match_keywords)
                .or_else(|| family_name.and_then(match_name))
                .map_or_else(
                    // A catalogued catch-all that stays `other` is still an
                    // exact table hit.
                    || match table_hit {
                        Some(category) => ClassificationResult::exact(category),
                        None => ClassificationResult::UNCLASSIFIED,
                    },
                    |category| ClassificationResult::keyword(category, property_text),
                ),
        };

        if result.method == ClassificationMethod::Unclassified {
            debug!(ifc_type, "could not classify IFC element");
        }
        self.cache.insert(key, result);
        result
    }

    /// Classify a Revit element by built-in category id, category name,
    /// properties and family name.
    pub fn classify_revit(
        &self,
        category_id: Option<i64>,
        category_name: Option<&str>,
        properties: Option<&PropertyMap>,
        family_name: Option<&str>,
    ) -> ClassificationResult {
        let property_text = properties.and_then(property_text);
        let category_name = category_name.filter(|s| !s.is_empty());
        let family_name = family_name.filter(|s| !s.is_empty());

        let key = CacheKey {
            format: FileFormat::Revit,
            subject: category_id.map(|id| id.to_string()).unwrap_or_default(),
            category_name: category_name.map(str::to_string),
            family_name: family_name.map(str::to_string),
            property_text: property_text.clone(),
        };
        if let Some(hit) = self.cache.get(&key) {
            return *hit;
        }

        let property_text = property_text.as_deref();
        let result = match category_id.and_then(rules::revit_category) {
            Some(category) => ClassificationResult::exact(category),
            None => category_name
                .and_then(match_name)
                .or_else(|| property_text.and_then(rules::match_keywords))
                .or_else(|| family_name.and_then(match_name))
                .map_or(ClassificationResult::UNCLASSIFIED, |category| {
                    ClassificationResult::keyword(category, property_text)
                }),
        };

        if result.method == ClassificationMethod::Unclassified {
            debug!(?category_id, ?category_name, "could not classify Revit element");
        }
        self.cache.insert(key, result);
        result
    }

    /// Dispatch a standalone request on its file type. IFC is assumed
    /// when the request names none. For Revit, `category_id` wins over a
    /// numeric `element_type`.
    pub fn classify(&self, request: &ClassificationRequest) -> ClassificationResult {
        let properties = request.properties.as_ref();
        let family_name = request.family_name.as_deref();

        match request.file_type.unwrap_or(FileFormat::Ifc) {
            FileFormat::Ifc => self.classify_ifc(&request.element_type, properties, family_name),
            FileFormat::Revit => {
                let category_id = request
                    .category_id
                    .or_else(|| request.element_type.trim().parse().ok());
                self.classify_revit(
                    category_id,
                    request.category_name.as_deref(),
                    properties,
                    family_name,
                )
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("classification cache cleared");
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn supported_categories() -> &'static [ElementCategory] {
        &ElementCategory::ALL
    }
}

fn match_name(name: &str) -> Option<ElementCategory> {
    rules::match_keywords(&name.to_lowercase())
}

/// Lowercased, space-joined rendering of every non-blank property value.
/// `None` when nothing is left to search.
fn property_text(properties: &PropertyMap) -> Option<String> {
    let text = properties
        .values()
        .filter(|value| !value.is_blank())
        .map(|value| value.to_string().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyValue;
    use pretty_assertions::assert_eq;

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), PropertyValue::from(*v)))
            .collect()
    }

    #[test]
    fn exact_ifc_type() {
        let classifier = ElementClassifier::new();
        let first = classifier.classify_ifc("IfcWall", None, None);
        assert_eq!(first, ClassificationResult::exact(ElementCategory::Wall));
        assert_eq!(classifier.classify_ifc("IfcWall", None, None), first);
        assert_eq!(classifier.cache_len(), 1);
    }

    #[test]
    fn upper_case_entity_names_hit_the_table() {
        let classifier = ElementClassifier::new();
        let result = classifier.classify_ifc("IFCSLABSTANDARDCASE", None, None);
        assert_eq!(result.category, ElementCategory::Floor);
        assert_eq!(result.method, ClassificationMethod::TypeMapping);
    }

    #[test]
    fn unknown_ifc_type_is_other() {
        let classifier = ElementClassifier::new();
        let result = classifier.classify_ifc("IfcUnknownType", None, None);
        assert_eq!(result.category, ElementCategory::Other);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.method, ClassificationMethod::Unclassified);
    }

    #[test]
    fn unmatched_catch_all_is_exact_other() {
        let classifier = ElementClassifier::new();
        for ifc_type in ["IfcBuildingElementProxy", "IfcCovering"] {
            let result = classifier.classify_ifc(ifc_type, None, None);
            assert_eq!(result, ClassificationResult::exact(ElementCategory::Other));
        }
    }

    #[test]
    fn unclassified_revit_element_scores_floor() {
        let classifier = ElementClassifier::new();
        let result = classifier.classify_revit(Some(42), None, None, Some("Generic Model"));
        assert_eq!(result, ClassificationResult::UNCLASSIFIED);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn proxy_classified_by_properties() {
        let classifier = ElementClassifier::new();
        let properties = props(&[("Type", "beam")]);
        let result = classifier.classify_ifc("IfcBuildingElementProxy", Some(&properties), None);
        assert_eq!(result.category, ElementCategory::Beam);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.method, ClassificationMethod::PropertyBased);
    }

    #[test]
    fn ifc_falls_back_to_family_name() {
        let classifier = ElementClassifier::new();
        let properties = props(&[("Material", "Oak")]);
        let result = classifier.classify_ifc(
            "IfcBuildingElementProxy",
            Some(&properties),
            Some("Main Staircase"),
        );
        assert_eq!(result.category, ElementCategory::Stair);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.method, ClassificationMethod::NameBased);
    }

    #[test]
    fn ifc_properties_take_precedence_over_name() {
        let classifier = ElementClassifier::new();
        let properties = props(&[("Description", "timber joist")]);
        let result = classifier.classify_ifc("IfcCovering", Some(&properties), Some("Door panel"));
        assert_eq!(result.category, ElementCategory::Beam);
    }

    #[test]
    fn revit_category_code() {
        let classifier = ElementClassifier::new();
        let result = classifier.classify_revit(Some(-2_000_011), None, None, None);
        assert_eq!(result, ClassificationResult::exact(ElementCategory::Wall));
    }

    #[test]
    fn revit_family_name_fallback() {
        let classifier = ElementClassifier::new();
        let result = classifier.classify_revit(None, None, None, Some("Basic Wall"));
        assert_eq!(result.category, ElementCategory::Wall);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.method, ClassificationMethod::NameBased);
    }

    #[test]
    fn revit_category_name_precedes_properties() {
        let classifier = ElementClassifier::new();
        let properties = props(&[("Comments", "next to the window")]);
        let result =
            classifier.classify_revit(Some(1), Some("Doors"), Some(&properties), Some("Beam"));
        assert_eq!(result.category, ElementCategory::Door);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn corroborating_properties_raise_confidence() {
        let classifier = ElementClassifier::new();
        let properties = props(&[("Family", "Basic Wall")]);
        let result = classifier.classify_revit(None, Some("Walls"), Some(&properties), None);
        assert_eq!(result.category, ElementCategory::Wall);
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn blank_property_values_are_ignored() {
        let classifier = ElementClassifier::new();
        let mut properties = props(&[("Name", "")]);
        properties.insert("Count".into(), PropertyValue::Integer(0));
        let result = classifier.classify_ifc("IfcUnknownType", Some(&properties), None);
        assert_eq!(result.method, ClassificationMethod::Unclassified);
    }

    #[test]
    fn clearing_cache_keeps_results() {
        let classifier = ElementClassifier::new();
        let properties = props(&[("Type", "guardrail")]);
        let before = classifier.classify_ifc("IfcBuildingElementProxy", Some(&properties), None);
        classifier.clear_cache();
        assert_eq!(classifier.cache_len(), 0);
        let after = classifier.classify_ifc("IfcBuildingElementProxy", Some(&properties), None);
        assert_eq!(before, after);
        assert_eq!(after.category, ElementCategory::Railing);
    }

    #[test]
    fn cache_distinguishes_properties() {
        let classifier = ElementClassifier::new();
        let beam = props(&[("Type", "beam")]);
        let column = props(&[("Type", "column")]);
        let a = classifier.classify_ifc("IfcBuildingElementProxy", Some(&beam), None);
        let b = classifier.classify_ifc("IfcBuildingElementProxy", Some(&column), None);
        assert_eq!(a.category, ElementCategory::Beam);
        assert_eq!(b.category, ElementCategory::Column);
    }

    #[test]
    fn request_dispatch() {
        let classifier = ElementClassifier::new();
        let request = ClassificationRequest {
            file_type: Some(FileFormat::Revit),
            element_type: "-2000014".into(),
            ..ClassificationRequest::default()
        };
        assert_eq!(classifier.classify(&request).category, ElementCategory::Window);

        let request = ClassificationRequest {
            element_type: "IfcColumn".into(),
            ..ClassificationRequest::default()
        };
        assert_eq!(classifier.classify(&request).category, ElementCategory::Column);
    }
}
