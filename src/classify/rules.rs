use crate::model::ElementCategory;

/// IFC entity class to category. Matched case-insensitively since STEP
/// files spell entity names in upper case.
pub const IFC_TYPES: &[(&str, ElementCategory)] = &[
    ("IfcWall", ElementCategory::Wall),
    ("IfcWallStandardCase", ElementCategory::Wall),
    ("IfcCurtainWall", ElementCategory::Wall),
    ("IfcSlab", ElementCategory::Floor),
    ("IfcSlabStandardCase", ElementCategory::Floor),
    ("IfcColumn", ElementCategory::Column),
    ("IfcColumnStandardCase", ElementCategory::Column),
    ("IfcBeam", ElementCategory::Beam),
    ("IfcBeamStandardCase", ElementCategory::Beam),
    ("IfcRoof", ElementCategory::Roof),
    ("IfcDoor", ElementCategory::Door),
    ("IfcDoorStandardCase", ElementCategory::Door),
    ("IfcWindow", ElementCategory::Window),
    ("IfcWindowStandardCase", ElementCategory::Window),
    ("IfcStair", ElementCategory::Stair),
    ("IfcStairFlight", ElementCategory::Stair),
    ("IfcRailing", ElementCategory::Railing),
    ("IfcRailingType", ElementCategory::Railing),
    ("IfcFooting", ElementCategory::Foundation),
    ("IfcPile", ElementCategory::Foundation),
    // Catch-alls: recognised, but classified by properties or name.
    ("IfcCovering", ElementCategory::Other),
    ("IfcBuildingElementProxy", ElementCategory::Other),
];

/// Revit built-in category ids (`BuiltInCategory`) to category.
pub const REVIT_CATEGORIES: &[(i64, ElementCategory)] = &[
    (-2_000_011, ElementCategory::Wall),
    (-2_000_032, ElementCategory::Floor),
    (-2_000_038, ElementCategory::Slab),
    (-2_000_100, ElementCategory::Column),
    (-2_000_012, ElementCategory::Beam),
    (-2_000_035, ElementCategory::Roof),
    (-2_000_023, ElementCategory::Door),
    (-2_000_014, ElementCategory::Window),
    (-2_000_120, ElementCategory::Stair),
    (-2_000_126, ElementCategory::Railing),
    (-2_000_080, ElementCategory::Foundation),
    (-2_000_175, ElementCategory::Foundation),
];

/// Keyword sets for property- and name-based matching. Order matters:
/// the first category with a hit wins.
pub const KEYWORDS: &[(ElementCategory, &[&str])] = &[
    (ElementCategory::Wall, &["wall", "partition", "curtain"]),
    (ElementCategory::Floor, &["floor", "slab", "deck"]),
    (ElementCategory::Column, &["column", "post", "pillar"]),
    (ElementCategory::Beam, &["beam", "girder", "joist", "truss"]),
    (ElementCategory::Roof, &["roof", "roofing"]),
    (ElementCategory::Door, &["door", "entry", "gate"]),
    (ElementCategory::Window, &["window", "glazing"]),
    (ElementCategory::Stair, &["stair", "step"]),
    (
        ElementCategory::Railing,
        &["railing", "handrail", "guardrail", "balustrade"],
    ),
    (
        ElementCategory::Foundation,
        &["foundation", "footing", "pile", "pier"],
    ),
];

/// Canonical table spelling and category for an IFC entity name.
#[must_use]
pub fn ifc_type(name: &str) -> Option<(&'static str, ElementCategory)> {
    IFC_TYPES
        .iter()
        .find(|(ifc, _)| ifc.eq_ignore_ascii_case(name))
        .copied()
}

#[must_use]
pub fn revit_category(code: i64) -> Option<ElementCategory> {
    REVIT_CATEGORIES
        .iter()
        .find(|(id, _)| *id == code)
        .map(|(_, category)| *category)
}

/// First category whose keyword occurs in `text`. `text` must already be
/// lowercase.
#[must_use]
pub fn match_keywords(text: &str) -> Option<ElementCategory> {
    if text.is_empty() {
        return None;
    }
    KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(category, _)| *category)
}
