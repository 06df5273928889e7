//! IFC model access.
//!
//! Reads an IFC file in STEP physical file encoding (ISO 10303-21) into an
//! in-memory [`IfcModel`] with:
//!
//! - lookup by instance id,
//! - subtype-aware lookup by class ([`IfcModel::by_type`]),
//! - the inverse relationships the extractor walks
//!   ([`IfcModel::is_defined_by`], [`IfcModel::has_associations`]).

mod parser;
pub mod schema;
mod value;

pub use parser::{parse, Header, ParsedFile};
pub use value::{Entity, EntityId, Value};

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// A parsed IFC model.
#[derive(Debug, Default)]
pub struct IfcModel {
    header: Header,
    entities: BTreeMap<EntityId, Entity>,
    by_class: HashMap<String, Vec<EntityId>>,
    is_defined_by: HashMap<EntityId, Vec<EntityId>>,
    has_associations: HashMap<EntityId, Vec<EntityId>>,
    source_sha256: Option<String>,
}

impl IfcModel {
    /// Read and parse an IFC file from disk, recording its SHA-256.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let mut model = Self::parse(&text)?;
        model.source_sha256 = Some(format!("{:x}", Sha256::digest(&bytes)));
        info!(
            "Loaded IFC model {:?}: schema={}, {} entities",
            path,
            model.schema().unwrap_or("unknown"),
            model.len()
        );
        Ok(model)
    }

    /// Parse IFC text.
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = parser::parse(text)?;
        Ok(Self::from_parsed(parsed))
    }

    /// Build the model and its indices from parsed records.
    pub fn from_parsed(parsed: ParsedFile) -> Self {
        let mut model = IfcModel {
            header: parsed.header,
            ..Default::default()
        };

        for entity in parsed.entities {
            model
                .by_class
                .entry(entity.class.clone())
                .or_default()
                .push(entity.id);
            model.entities.insert(entity.id, entity);
        }
        for ids in model.by_class.values_mut() {
            ids.sort();
        }

        model.index_inverse(schema::IFCRELDEFINESBYPROPERTIES, Inverse::IsDefinedBy);
        model.index_inverse(schema::IFCRELASSOCIATESMATERIAL, Inverse::HasAssociations);

        debug!(
            "Indexed {} classes, {} objects with property definitions, {} with material associations",
            model.by_class.len(),
            model.is_defined_by.len(),
            model.has_associations.len()
        );

        model
    }

    fn index_inverse(&mut self, rel_class: &str, inverse: Inverse) {
        let rel_ids = self.by_class.get(rel_class).cloned().unwrap_or_default();
        for rel_id in rel_ids {
            let Some(rel) = self.entities.get(&rel_id) else {
                continue;
            };
            let related = rel.refs_attr(schema::attr::RELATED_OBJECTS);
            let index = match inverse {
                Inverse::IsDefinedBy => &mut self.is_defined_by,
                Inverse::HasAssociations => &mut self.has_associations,
            };
            for object in related {
                index.entry(object).or_default().push(rel_id);
            }
        }
    }

    /// Header section contents.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// First `FILE_SCHEMA` identifier, e.g. `IFC4`.
    pub fn schema(&self) -> Option<&str> {
        self.header.schema_identifiers.first().map(String::as_str)
    }

    /// SHA-256 of the file the model was opened from; `None` for parsed text.
    pub fn source_sha256(&self) -> Option<&str> {
        self.source_sha256.as_deref()
    }

    /// Number of entity instances.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Resolve an optional reference, dropping dangling ones.
    pub fn resolve(&self, id: Option<EntityId>) -> Option<&Entity> {
        id.and_then(|id| self.get(id))
    }

    /// All instances of `class` and its known subtypes, ordered by instance id.
    pub fn by_type(&self, class: &str) -> Vec<&Entity> {
        let mut ids: Vec<EntityId> = schema::subtypes_of(class)
            .iter()
            .filter_map(|keyword| self.by_class.get(keyword))
            .flatten()
            .copied()
            .collect();
        ids.sort();
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Subtype-aware class test.
    pub fn is_a(&self, entity: &Entity, class: &str) -> bool {
        schema::is_subtype(&entity.class, class)
    }

    /// `IfcRelDefinesByProperties` relationships that reference `object`.
    pub fn is_defined_by(&self, object: EntityId) -> Vec<&Entity> {
        self.inverse(&self.is_defined_by, object)
    }

    /// `IfcRelAssociatesMaterial` relationships that reference `object`.
    pub fn has_associations(&self, object: EntityId) -> Vec<&Entity> {
        self.inverse(&self.has_associations, object)
    }

    fn inverse<'a>(
        &'a self,
        index: &'a HashMap<EntityId, Vec<EntityId>>,
        object: EntityId,
    ) -> Vec<&'a Entity> {
        index
            .get(&object)
            .map(|ids| ids.iter().filter_map(|id| self.get(*id)).collect())
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy)]
enum Inverse {
    IsDefinedBy,
    HasAssociations,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#10=IFCWALLSTANDARDCASE('w2',$,'Wall B',$,$,$,$,$,$);
#5=IFCWALL('w1',$,'Wall A',$,$,$,$,$,$);
#20=IFCPROPERTYSET('ps',$,'Pset_WallCommon',$,(#21));
#21=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.F.),$);
#30=IFCRELDEFINESBYPROPERTIES('r1',$,$,$,(#5,#10),#20);
#40=IFCMATERIAL('Brick',$,$);
#41=IFCRELASSOCIATESMATERIAL('r2',$,$,$,(#10,#99),#40);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn test_schema_and_len() {
        let model = IfcModel::parse(MODEL).unwrap();
        assert_eq!(model.schema(), Some("IFC4"));
        assert_eq!(model.len(), 7);
        assert!(!model.is_empty());
    }

    #[test]
    fn test_by_type_includes_subtypes_in_id_order() {
        let model = IfcModel::parse(MODEL).unwrap();
        let walls = model.by_type("IfcWall");
        let ids: Vec<u64> = walls.iter().map(|w| w.id.0).collect();
        assert_eq!(ids, vec![5, 10]);

        assert_eq!(model.by_type("IfcWallStandardCase").len(), 1);
        assert!(model.by_type("IfcSpace").is_empty());
    }

    #[test]
    fn test_inverse_relationships() {
        let model = IfcModel::parse(MODEL).unwrap();
        assert_eq!(model.is_defined_by(EntityId(5)).len(), 1);
        assert_eq!(model.is_defined_by(EntityId(10))[0].id, EntityId(30));
        assert!(model.has_associations(EntityId(5)).is_empty());
        assert_eq!(model.has_associations(EntityId(10))[0].id, EntityId(41));
        // dangling reference is indexed but never resolved as an object
        assert!(model.get(EntityId(99)).is_none());
    }

    #[test]
    fn test_is_a() {
        let model = IfcModel::parse(MODEL).unwrap();
        let wall = model.get(EntityId(10)).unwrap();
        assert!(model.is_a(wall, "IfcWall"));
        assert!(!model.is_a(wall, "IfcSpace"));
    }

    #[test]
    fn test_open_missing_file() {
        let err = IfcModel::open("/nonexistent/model.ifc").unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_IO_ERROR);
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ifc");
        std::fs::write(&path, MODEL).unwrap();
        let model = IfcModel::open(&path).unwrap();
        assert_eq!(model.by_type("IfcWall").len(), 2);

        let digest = model.source_sha256().unwrap();
        assert_eq!(digest.len(), 64);
        assert!(IfcModel::parse(MODEL).unwrap().source_sha256().is_none());
    }
}
