//! Flat node and edge records extracted from an IFC model.

use serde::{Deserialize, Serialize};

/// Unwrapped nominal value of an `IfcPropertySingleValue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// An `IfcSpace` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceNode {
    /// IFC GlobalId.
    pub id: String,
    pub name: Option<String>,
    pub long_name: Option<String>,
    pub ifc_class: String,
}

/// An `IfcWall` node (subtypes included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallNode {
    /// IFC GlobalId.
    pub id: String,
    pub name: Option<String>,
    pub ifc_class: String,
    /// `LoadBearing` from the wall's property sets.
    pub load_bearing: Option<PropertyValue>,
    /// `IsExternal` from the wall's property sets.
    pub is_external: Option<PropertyValue>,
    /// `DirectionSense` of the wall's material layer set usage.
    pub direction_sense: Option<String>,
}

/// One `IfcMaterialLayer` of a wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerNode {
    /// `{wallId}_layer_{index}`.
    pub id: String,
    #[serde(rename = "wall_id")]
    pub wall_id: String,
    pub layer_index: i64,
    pub thickness: Option<f64>,
    pub name: String,
    pub ifc_class: String,
}

impl LayerNode {
    /// Node id for the `index`-th layer of a wall.
    pub fn layer_id(wall_id: &str, index: usize) -> String {
        format!("{}_layer_{}", wall_id, index)
    }
}

/// `IfcRelSpaceBoundary` between a space and a wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceWallEdge {
    #[serde(rename = "space_id")]
    pub space_id: String,
    #[serde(rename = "wall_id")]
    pub wall_id: String,
    pub physical_or_virtual: Option<String>,
    pub internal_or_external: Option<String>,
}

/// Everything extracted from one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedGraph {
    /// `FILE_SCHEMA` of the source model.
    pub schema: Option<String>,
    pub spaces: Vec<SpaceNode>,
    pub walls: Vec<WallNode>,
    pub layers: Vec<LayerNode>,
    pub space_wall_edges: Vec<SpaceWallEdge>,
}

impl ExtractedGraph {
    pub fn node_count(&self) -> usize {
        self.spaces.len() + self.walls.len() + self.layers.len()
    }

    /// Wall-layer plus space-wall relationships.
    pub fn edge_count(&self) -> usize {
        self.layers.len() + self.space_wall_edges.len()
    }
}
