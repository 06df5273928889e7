//! The slice of the IFC schema the extractor relies on.
//!
//! Only the entity types and attribute positions used for spaces, walls,
//! property sets and material layers are described here. Positions are the
//! same in IFC2X3 and IFC4 for every attribute listed.

/// Subtypes (including the type itself) recognised for a supertype.
const SUBTYPES: &[(&str, &[&str])] = &[
    (
        "IFCWALL",
        &["IFCWALL", "IFCWALLSTANDARDCASE", "IFCWALLELEMENTEDCASE"],
    ),
    (
        "IFCRELSPACEBOUNDARY",
        &[
            "IFCRELSPACEBOUNDARY",
            "IFCRELSPACEBOUNDARY1STLEVEL",
            "IFCRELSPACEBOUNDARY2NDLEVEL",
        ],
    ),
    ("IFCSPACE", &["IFCSPACE"]),
];

/// Schema spelling of the upper-case STEP keywords the extractor emits.
const CLASS_NAMES: &[&str] = &[
    "IfcSpace",
    "IfcWall",
    "IfcWallStandardCase",
    "IfcWallElementedCase",
    "IfcRelSpaceBoundary",
    "IfcRelSpaceBoundary1stLevel",
    "IfcRelSpaceBoundary2ndLevel",
    "IfcRelDefinesByProperties",
    "IfcRelAssociatesMaterial",
    "IfcPropertySet",
    "IfcPropertySingleValue",
    "IfcMaterial",
    "IfcMaterialLayer",
    "IfcMaterialLayerSet",
    "IfcMaterialLayerSetUsage",
    "IfcBoolean",
    "IfcLogical",
    "IfcLabel",
    "IfcText",
    "IfcIdentifier",
];

pub const IFCSPACE: &str = "IFCSPACE";
pub const IFCWALL: &str = "IFCWALL";
pub const IFCRELSPACEBOUNDARY: &str = "IFCRELSPACEBOUNDARY";
pub const IFCRELDEFINESBYPROPERTIES: &str = "IFCRELDEFINESBYPROPERTIES";
pub const IFCRELASSOCIATESMATERIAL: &str = "IFCRELASSOCIATESMATERIAL";
pub const IFCPROPERTYSET: &str = "IFCPROPERTYSET";
pub const IFCPROPERTYSINGLEVALUE: &str = "IFCPROPERTYSINGLEVALUE";
pub const IFCMATERIALLAYERSET: &str = "IFCMATERIALLAYERSET";
pub const IFCMATERIALLAYERSETUSAGE: &str = "IFCMATERIALLAYERSETUSAGE";

/// Attribute positions, grouped by declaring entity.
pub mod attr {
    /// IfcRoot
    pub const GLOBAL_ID: usize = 0;
    pub const NAME: usize = 2;

    /// IfcSpatialStructureElement
    pub const LONG_NAME: usize = 7;

    /// IfcRelDefinesByProperties / IfcRelAssociatesMaterial
    pub const RELATED_OBJECTS: usize = 4;
    pub const RELATING_DEFINITION: usize = 5;

    /// IfcPropertySet
    pub const HAS_PROPERTIES: usize = 4;

    /// IfcProperty
    pub const PROPERTY_NAME: usize = 0;
    /// IfcPropertySingleValue
    pub const NOMINAL_VALUE: usize = 2;

    /// IfcMaterialLayerSetUsage
    pub const FOR_LAYER_SET: usize = 0;
    pub const LAYER_DIRECTION_SENSE: usize = 2;

    /// IfcMaterialLayerSet
    pub const MATERIAL_LAYERS: usize = 0;

    /// IfcMaterialLayer
    pub const LAYER_MATERIAL: usize = 0;
    pub const LAYER_THICKNESS: usize = 1;

    /// IfcMaterial
    pub const MATERIAL_NAME: usize = 0;

    /// IfcRelSpaceBoundary
    pub const RELATING_SPACE: usize = 4;
    pub const RELATED_BUILDING_ELEMENT: usize = 5;
    pub const PHYSICAL_OR_VIRTUAL: usize = 7;
    pub const INTERNAL_OR_EXTERNAL: usize = 8;
}

/// Every STEP keyword that counts as an instance of `class`.
pub fn subtypes_of(class: &str) -> Vec<String> {
    let upper = class.to_ascii_uppercase();
    SUBTYPES
        .iter()
        .find(|(supertype, _)| *supertype == upper)
        .map(|(_, subs)| subs.iter().map(|s| s.to_string()).collect())
        .unwrap_or_else(|| vec![upper])
}

/// Subtype-aware class test on STEP keywords.
pub fn is_subtype(class: &str, supertype: &str) -> bool {
    let class = class.to_ascii_uppercase();
    subtypes_of(supertype).iter().any(|s| *s == class)
}

/// Schema spelling for a STEP keyword, e.g. `IFCWALLSTANDARDCASE` → `IfcWallStandardCase`.
pub fn class_name(keyword: &str) -> String {
    CLASS_NAMES
        .iter()
        .find(|name| name.eq_ignore_ascii_case(keyword))
        .map(|name| name.to_string())
        .unwrap_or_else(|| fallback_class_name(keyword))
}

fn fallback_class_name(keyword: &str) -> String {
    match keyword.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("IFC") && keyword.len() > 3 => {
            let rest = &keyword[3..];
            let mut chars = rest.chars();
            let first = chars.next().map(|c| c.to_ascii_uppercase());
            let tail: String = chars.as_str().to_ascii_lowercase();
            format!("Ifc{}{}", first.unwrap_or_default(), tail)
        }
        _ => keyword.to_string(),
    }
}
