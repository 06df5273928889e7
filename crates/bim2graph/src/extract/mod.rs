//! Extraction of spaces, walls, material layers and space boundaries.
//!
//! Each function walks the model once and produces flat records ready to be
//! upserted as graph nodes and edges. Entities with a missing GlobalId or a
//! dangling reference are skipped rather than failing the run.

mod types;

pub use types::*;

use crate::ifc::schema::{self, attr};
use crate::ifc::{Entity, IfcModel, Value};
use std::collections::HashSet;
use tracing::{debug, info};

/// Extract every node and edge kind from the model.
pub fn extract_graph(model: &IfcModel) -> ExtractedGraph {
    let spaces = extract_spaces(model);
    let walls = extract_walls(model);
    let layers = extract_layers(model, &walls);
    let space_wall_edges = extract_space_wall_edges(model);

    ExtractedGraph {
        schema: model.schema().map(str::to_string),
        spaces,
        walls,
        layers,
        space_wall_edges,
    }
}

/// Extract all `IfcSpace` instances.
pub fn extract_spaces(model: &IfcModel) -> Vec<SpaceNode> {
    let spaces: Vec<SpaceNode> = model
        .by_type(schema::IFCSPACE)
        .into_iter()
        .filter_map(|space| {
            Some(SpaceNode {
                id: global_id(space)?,
                name: string_attr(space, attr::NAME),
                long_name: string_attr(space, attr::LONG_NAME),
                ifc_class: schema::class_name(&space.class),
            })
        })
        .collect();

    info!(target: "bim2graph", "{} Space elements extracted", spaces.len());
    spaces
}

/// Extract all `IfcWall` instances with their `LoadBearing` / `IsExternal` properties.
pub fn extract_walls(model: &IfcModel) -> Vec<WallNode> {
    let walls: Vec<WallNode> = model
        .by_type(schema::IFCWALL)
        .into_iter()
        .filter_map(|wall| {
            let mut node = WallNode {
                id: global_id(wall)?,
                name: string_attr(wall, attr::NAME),
                ifc_class: schema::class_name(&wall.class),
                load_bearing: None,
                is_external: None,
                direction_sense: direction_sense(model, wall),
            };

            for prop in single_value_properties(model, wall) {
                let value = prop.attr(attr::NOMINAL_VALUE).and_then(nominal_value);
                if value.is_none() {
                    continue;
                }
                match prop.str_attr(attr::PROPERTY_NAME) {
                    Some("LoadBearing") => node.load_bearing = value,
                    Some("IsExternal") => node.is_external = value,
                    _ => {}
                }
            }

            Some(node)
        })
        .collect();

    info!(target: "bim2graph", "{} Wall elements extracted", walls.len());
    walls
}

/// Extract the material layers of the given walls.
///
/// Layers come from `IfcMaterialLayerSetUsage.ForLayerSet` or a directly
/// associated `IfcMaterialLayerSet`. Walls missing from `walls` are skipped.
pub fn extract_layers(model: &IfcModel, walls: &[WallNode]) -> Vec<LayerNode> {
    let wall_ids: HashSet<&str> = walls.iter().map(|w| w.id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut layers = Vec::new();

    for wall in model.by_type(schema::IFCWALL) {
        let Some(wall_id) = global_id(wall) else {
            continue;
        };
        if !wall_ids.contains(wall_id.as_str()) || !seen.insert(wall_id.clone()) {
            continue;
        }

        for layer_set in layer_sets(model, wall) {
            let material_layers = layer_set.refs_attr(attr::MATERIAL_LAYERS);
            for (index, layer_ref) in material_layers.into_iter().enumerate() {
                let Some(layer) = model.get(layer_ref) else {
                    debug!("Skipping dangling material layer {} of wall {}", layer_ref, wall_id);
                    continue;
                };
                let name = model
                    .resolve(layer.ref_attr(attr::LAYER_MATERIAL))
                    .and_then(|material| string_attr(material, attr::MATERIAL_NAME))
                    .unwrap_or_else(|| format!("Layer {}", index));

                layers.push(LayerNode {
                    id: LayerNode::layer_id(&wall_id, index),
                    wall_id: wall_id.clone(),
                    layer_index: index as i64,
                    thickness: layer.real_attr(attr::LAYER_THICKNESS),
                    name,
                    ifc_class: "IfcMaterialLayer".to_string(),
                });
            }
        }
    }

    info!(target: "bim2graph", "{} Wall Layer elements extracted", layers.len());
    layers
}

/// Extract space-wall boundaries.
///
/// Boundaries without a space or element, and boundaries to elements that
/// are not walls, are ignored.
pub fn extract_space_wall_edges(model: &IfcModel) -> Vec<SpaceWallEdge> {
    let edges: Vec<SpaceWallEdge> = model
        .by_type(schema::IFCRELSPACEBOUNDARY)
        .into_iter()
        .filter_map(|rel| {
            let space = model.resolve(rel.ref_attr(attr::RELATING_SPACE))?;
            let element = model.resolve(rel.ref_attr(attr::RELATED_BUILDING_ELEMENT))?;
            if !model.is_a(element, schema::IFCWALL) {
                return None;
            }

            Some(SpaceWallEdge {
                space_id: global_id(space)?,
                wall_id: global_id(element)?,
                physical_or_virtual: rel.enum_attr(attr::PHYSICAL_OR_VIRTUAL).map(str::to_string),
                internal_or_external: rel.enum_attr(attr::INTERNAL_OR_EXTERNAL).map(str::to_string),
            })
        })
        .collect();

    info!(
        target: "bim2graph",
        "{} Space-Wall edges extracted",
        edges.len()
    );
    edges
}

fn global_id(entity: &Entity) -> Option<String> {
    let id = entity.str_attr(attr::GLOBAL_ID).map(str::to_string);
    if id.is_none() {
        debug!("Skipping {} {} without GlobalId", entity.class, entity.id);
    }
    id
}

fn string_attr(entity: &Entity, index: usize) -> Option<String> {
    entity.str_attr(index).map(str::to_string)
}

/// `IfcPropertySingleValue`s of every property set defining `object`, in relationship order.
fn single_value_properties<'a>(model: &'a IfcModel, object: &Entity) -> Vec<&'a Entity> {
    model
        .is_defined_by(object.id)
        .into_iter()
        .filter_map(|rel| model.resolve(rel.ref_attr(attr::RELATING_DEFINITION)))
        .filter(|pset| pset.class == schema::IFCPROPERTYSET)
        .flat_map(|pset| pset.refs_attr(attr::HAS_PROPERTIES))
        .filter_map(|id| model.get(id))
        .filter(|prop| prop.class == schema::IFCPROPERTYSINGLEVALUE)
        .collect()
}

/// Layer sets associated with `object`, directly or through a usage.
fn layer_sets<'a>(model: &'a IfcModel, object: &Entity) -> Vec<&'a Entity> {
    model
        .has_associations(object.id)
        .into_iter()
        .filter_map(|rel| model.resolve(rel.ref_attr(attr::RELATING_DEFINITION)))
        .filter_map(|material| match material.class.as_str() {
            schema::IFCMATERIALLAYERSETUSAGE => {
                model.resolve(material.ref_attr(attr::FOR_LAYER_SET))
            }
            schema::IFCMATERIALLAYERSET => Some(material),
            _ => None,
        })
        .collect()
}

/// `DirectionSense` of the first layer set usage associated with a wall.
fn direction_sense(model: &IfcModel, wall: &Entity) -> Option<String> {
    model
        .has_associations(wall.id)
        .into_iter()
        .filter_map(|rel| model.resolve(rel.ref_attr(attr::RELATING_DEFINITION)))
        .find(|material| material.class == schema::IFCMATERIALLAYERSETUSAGE)
        .and_then(|usage| usage.enum_attr(attr::LAYER_DIRECTION_SENSE))
        .map(str::to_string)
}

/// Unwrap a measure or simple value the way IFC toolkits expose `wrappedValue`.
fn nominal_value(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::Typed { value, .. } => nominal_value(value),
        Value::Enum(e) => Some(match e.as_str() {
            "T" | "TRUE" => PropertyValue::Bool(true),
            "F" | "FALSE" => PropertyValue::Bool(false),
            "U" | "UNKNOWN" => PropertyValue::Text("UNKNOWN".to_string()),
            other => PropertyValue::Text(other.to_string()),
        }),
        Value::String(s) => Some(PropertyValue::Text(s.clone())),
        Value::Integer(i) => Some(PropertyValue::Int(*i)),
        Value::Real(r) => Some(PropertyValue::Float(*r)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/duplex_minimal.ifc");

    fn model() -> IfcModel {
        IfcModel::parse(FIXTURE).unwrap()
    }

    #[test]
    fn test_extract_spaces() {
        let spaces = extract_spaces(&model());
        assert_eq!(spaces.len(), 2);

        assert_eq!(spaces[0].id, "3cUkl32yn9qRSPvBJVyWYp");
        assert_eq!(spaces[0].name.as_deref(), Some("101"));
        assert_eq!(spaces[0].long_name.as_deref(), Some("Living Room"));
        assert_eq!(spaces[0].ifc_class, "IfcSpace");

        assert_eq!(spaces[1].name, None);
        assert_eq!(spaces[1].long_name.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn test_extract_walls_with_properties() {
        let walls = extract_walls(&model());
        assert_eq!(walls.len(), 2);

        let exterior = &walls[0];
        assert_eq!(exterior.id, "2O2Fr$t4X7Zf8NOew3FLOH");
        assert_eq!(exterior.ifc_class, "IfcWallStandardCase");
        assert_eq!(exterior.load_bearing, Some(PropertyValue::Bool(true)));
        assert_eq!(exterior.is_external, Some(PropertyValue::Bool(true)));
        assert_eq!(exterior.direction_sense.as_deref(), Some("POSITIVE"));

        let partition = &walls[1];
        assert_eq!(partition.ifc_class, "IfcWall");
        assert_eq!(partition.load_bearing, Some(PropertyValue::Bool(false)));
        assert_eq!(
            partition.is_external,
            Some(PropertyValue::Text("UNKNOWN".to_string()))
        );
        assert_eq!(partition.direction_sense, None, "plain layer set has no usage");
    }

    #[test]
    fn test_extract_layers_from_usage_and_set() {
        let model = model();
        let walls = extract_walls(&model);
        let layers = extract_layers(&model, &walls);
        assert_eq!(layers.len(), 5);

        let ids: Vec<&str> = layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "2O2Fr$t4X7Zf8NOew3FLOH_layer_0",
                "2O2Fr$t4X7Zf8NOew3FLOH_layer_1",
                "2O2Fr$t4X7Zf8NOew3FLOH_layer_2",
                "1hOSvn6df7F8_7GcBWlR72_layer_0",
                "1hOSvn6df7F8_7GcBWlR72_layer_1",
            ]
        );

        assert_eq!(layers[0].name, "Brick, Common");
        assert_eq!(layers[0].thickness, Some(0.09));
        assert_eq!(layers[1].name, "Layer 1");
        assert_eq!(layers[2].name, "Concrete Masonry Units");
        assert_eq!(layers[2].layer_index, 2);
        assert_eq!(layers[3].wall_id, "1hOSvn6df7F8_7GcBWlR72");
        assert!(layers.iter().all(|l| l.ifc_class == "IfcMaterialLayer"));
    }

    #[test]
    fn test_extract_layers_skips_unlisted_walls() {
        let model = model();
        let mut walls = extract_walls(&model);
        walls.retain(|w| w.ifc_class == "IfcWall");
        let layers = extract_layers(&model, &walls);
        assert_eq!(layers.len(), 2);
        assert!(layers.iter().all(|l| l.wall_id == "1hOSvn6df7F8_7GcBWlR72"));
    }

    #[test]
    fn test_extract_space_wall_edges() {
        let edges = extract_space_wall_edges(&model());
        assert_eq!(edges.len(), 3, "slab and virtual boundaries are ignored");

        assert_eq!(edges[0].space_id, "3cUkl32yn9qRSPvBJVyWYp");
        assert_eq!(edges[0].wall_id, "2O2Fr$t4X7Zf8NOew3FLOH");
        assert_eq!(edges[0].internal_or_external.as_deref(), Some("EXTERNAL"));

        assert_eq!(edges[1].wall_id, "1hOSvn6df7F8_7GcBWlR72");
        assert_eq!(edges[2].space_id, "0BTBFw6f90Nfh9rP1dlXr2");
        assert_eq!(edges[2].physical_or_virtual.as_deref(), Some("PHYSICAL"));
    }

    const SUBTYPES_AND_DANGLING: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCSPACE('sp1',$,'201',$,$,$,$,'Office',.ELEMENT.,.INTERNAL.,$);
#2=IFCWALLELEMENTEDCASE('we1',$,'Elemented',$,$,$,$,$,$);
#3=IFCWALL('w2',$,'Plain',$,$,$,$,$,$);
#10=IFCRELSPACEBOUNDARY2NDLEVEL('b1',$,$,$,#1,#2,$,.PHYSICAL.,.INTERNAL.,$,$);
#11=IFCRELSPACEBOUNDARY1STLEVEL('b2',$,$,$,#99,#2,$,.PHYSICAL.,.INTERNAL.,$);
#12=IFCRELSPACEBOUNDARY('b3',$,$,$,#1,#98,$,.PHYSICAL.,.EXTERNAL.);
#20=IFCMATERIALLAYERSETUSAGE(#97,.AXIS2.,.NEGATIVE.,$,$);
#21=IFCRELASSOCIATESMATERIAL('m1',$,$,$,(#3),#20);
#22=IFCRELASSOCIATESMATERIAL('m2',$,$,$,(#2),#96);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn test_elemented_case_walls_are_extracted() {
        let model = IfcModel::parse(SUBTYPES_AND_DANGLING).unwrap();
        let walls = extract_walls(&model);
        let classes: Vec<&str> = walls.iter().map(|w| w.ifc_class.as_str()).collect();
        assert_eq!(classes, vec!["IfcWallElementedCase", "IfcWall"]);
        assert_eq!(walls[0].id, "we1");
    }

    #[test]
    fn test_second_level_boundaries_and_dangling_references() {
        let model = IfcModel::parse(SUBTYPES_AND_DANGLING).unwrap();
        let edges = extract_space_wall_edges(&model);

        // b2 has a missing RelatingSpace, b3 a missing RelatedBuildingElement
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].space_id, "sp1");
        assert_eq!(edges[0].wall_id, "we1");
        assert_eq!(edges[0].internal_or_external.as_deref(), Some("INTERNAL"));
    }

    #[test]
    fn test_dangling_material_references_yield_no_layers() {
        let model = IfcModel::parse(SUBTYPES_AND_DANGLING).unwrap();
        let walls = extract_walls(&model);
        assert!(extract_layers(&model, &walls).is_empty());

        // the usage itself still resolves even though ForLayerSet does not
        assert_eq!(walls[1].direction_sense.as_deref(), Some("NEGATIVE"));
        assert_eq!(walls[0].direction_sense, None);
    }

    #[test]
    fn test_extract_graph_counts() {
        let graph = extract_graph(&model());
        assert_eq!(graph.schema.as_deref(), Some("IFC2X3"));
        assert_eq!(graph.node_count(), 9);
        assert_eq!(graph.edge_count(), 8);
    }

    #[test]
    fn test_empty_model() {
        let graph = extract_graph(&IfcModel::default());
        assert_eq!(graph, ExtractedGraph::default());
    }

    #[test]
    fn test_nominal_value_unwrapping() {
        let typed = |name: &str, v: Value| Value::Typed {
            type_name: name.to_string(),
            value: Box::new(v),
        };
        assert_eq!(
            nominal_value(&typed("IFCLABEL", Value::String("x".into()))),
            Some(PropertyValue::Text("x".into()))
        );
        assert_eq!(
            nominal_value(&typed("IFCINTEGER", Value::Integer(3))),
            Some(PropertyValue::Int(3))
        );
        assert_eq!(
            nominal_value(&typed("IFCTHERMALTRANSMITTANCEMEASURE", Value::Real(0.25))),
            Some(PropertyValue::Float(0.25))
        );
        assert_eq!(nominal_value(&Value::Null), None);
    }

    #[test]
    fn test_records_serialize_camel_case() {
        let graph = extract_graph(&model());
        let json = serde_json::to_value(&graph.walls[0]).unwrap();
        assert_eq!(json["loadBearing"], serde_json::json!(true));
        assert_eq!(json["ifcClass"], "IfcWallStandardCase");

        let layer = serde_json::to_value(&graph.layers[0]).unwrap();
        assert_eq!(layer["wall_id"], "2O2Fr$t4X7Zf8NOew3FLOH");
        assert_eq!(layer["layerIndex"], 0);
    }
}
