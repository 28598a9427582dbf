use art_common::db::core::{ExistingBlockage, LayoutDB};
use art_common::db::indices::{BlockageId, LayerId};
use art_common::error::ArtError;
use art_common::geom::rect::Rect;

/// The layout database as seen by the art engine.
///
/// Optional features (blockage softness, maximum placement density) are
/// advertised through the `supports_*` methods so that callers never
/// probe the underlying database themselves. Creation is append-only.
pub trait LayoutSink {
    fn dbu_per_micron(&self) -> i64;
    fn die_area(&self) -> Rect;
    fn core_area(&self) -> Option<Rect>;
    fn find_layer(&self, name: &str) -> Option<LayerId>;

    /// Geometry blocked before this run.
    fn existing_obstructions(&self) -> Vec<Rect> {
        Vec::new()
    }

    fn create_placement_blockage(&mut self, rect: Rect) -> Result<BlockageId, ArtError>;

    fn supports_softness(&self) -> bool;
    fn set_soft(&mut self, id: BlockageId, soft: bool);

    fn supports_max_density(&self) -> bool;
    fn set_max_density(&mut self, id: BlockageId, density: f64);

    fn create_routing_obstruction(&mut self, layer: LayerId, rect: Rect) -> Result<(), ArtError>;
}

impl LayoutSink for LayoutDB {
    fn dbu_per_micron(&self) -> i64 {
        self.dbu_per_micron
    }

    fn die_area(&self) -> Rect {
        self.die_area
    }

    fn core_area(&self) -> Option<Rect> {
        LayoutDB::core_area(self)
    }

    fn find_layer(&self, name: &str) -> Option<LayerId> {
        LayoutDB::find_layer(self, name)
    }

    fn existing_obstructions(&self) -> Vec<Rect> {
        self.existing_blockages
            .iter()
            .map(ExistingBlockage::rect)
            .collect()
    }

    fn create_placement_blockage(&mut self, rect: Rect) -> Result<BlockageId, ArtError> {
        Ok(self.create_blockage(rect))
    }

    fn supports_softness(&self) -> bool {
        self.supports_blockage_modifiers()
    }

    fn set_soft(&mut self, id: BlockageId, soft: bool) {
        if let Some(blk) = self.blockage_mut(id) {
            blk.soft = soft;
        }
    }

    fn supports_max_density(&self) -> bool {
        self.supports_blockage_modifiers()
    }

    fn set_max_density(&mut self, id: BlockageId, density: f64) {
        if let Some(blk) = self.blockage_mut(id) {
            blk.max_density = Some(density);
        }
    }

    fn create_routing_obstruction(&mut self, layer: LayerId, rect: Rect) -> Result<(), ArtError> {
        self.create_obstruction(layer, rect)
            .map(|_| ())
            .ok_or_else(|| ArtError::ObstructionFailed {
                layer: format!("{:?}", layer),
                message: "layer is not part of this database".to_string(),
            })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedBlockage {
    pub rect: Rect,
    pub soft: Option<bool>,
    pub max_density: Option<f64>,
}

/// Sink that only records what would be created. Backs dry runs and
/// lets the engine run without a database on disk.
#[derive(Clone, Debug)]
pub struct MemorySink {
    pub dbu_per_micron: i64,
    pub die: Rect,
    pub core: Option<Rect>,
    pub layers: Vec<String>,
    pub existing: Vec<Rect>,
    pub softness: bool,
    pub max_density: bool,
    pub blockages: Vec<RecordedBlockage>,
    pub obstructions: Vec<(String, Rect)>,
}

impl MemorySink {
    pub fn new(die: Rect) -> Self {
        Self {
            dbu_per_micron: art_common::db::core::DEFAULT_DBU_PER_MICRON,
            die,
            core: None,
            layers: Vec::new(),
            existing: Vec::new(),
            softness: true,
            max_density: true,
            blockages: Vec::new(),
            obstructions: Vec::new(),
        }
    }

    /// Copies the bounding boxes, layer names and capabilities of `db`.
    pub fn mirror(db: &LayoutDB) -> Self {
        Self {
            dbu_per_micron: db.dbu_per_micron,
            die: db.die_area,
            core: db.core_area(),
            layers: db.layers.iter().map(|l| l.name.clone()).collect(),
            existing: LayoutSink::existing_obstructions(db),
            softness: db.supports_blockage_modifiers(),
            max_density: db.supports_blockage_modifiers(),
            blockages: Vec::new(),
            obstructions: Vec::new(),
        }
    }

    pub fn with_core(mut self, core: Rect) -> Self {
        self.core = Some(core);
        self
    }

    pub fn with_layers<I: IntoIterator<Item = S>, S: Into<String>>(mut self, names: I) -> Self {
        self.layers.extend(names.into_iter().map(Into::into));
        self
    }
}

impl LayoutSink for MemorySink {
    fn dbu_per_micron(&self) -> i64 {
        self.dbu_per_micron
    }

    fn die_area(&self) -> Rect {
        self.die
    }

    fn core_area(&self) -> Option<Rect> {
        self.core
    }

    fn find_layer(&self, name: &str) -> Option<LayerId> {
        self.layers.iter().position(|l| l == name).map(LayerId::new)
    }

    fn existing_obstructions(&self) -> Vec<Rect> {
        self.existing.clone()
    }

    fn create_placement_blockage(&mut self, rect: Rect) -> Result<BlockageId, ArtError> {
        let id = BlockageId::new(self.blockages.len());
        self.blockages.push(RecordedBlockage {
            rect,
            soft: None,
            max_density: None,
        });
        Ok(id)
    }

    fn supports_softness(&self) -> bool {
        self.softness
    }

    fn set_soft(&mut self, id: BlockageId, soft: bool) {
        if let Some(blk) = self.blockages.get_mut(id.index()) {
            blk.soft = Some(soft);
        }
    }

    fn supports_max_density(&self) -> bool {
        self.max_density
    }

    fn set_max_density(&mut self, id: BlockageId, density: f64) {
        if let Some(blk) = self.blockages.get_mut(id.index()) {
            blk.max_density = Some(density);
        }
    }

    fn create_routing_obstruction(&mut self, layer: LayerId, rect: Rect) -> Result<(), ArtError> {
        let name = self
            .layers
            .get(layer.index())
            .cloned()
            .ok_or_else(|| ArtError::ObstructionFailed {
                layer: format!("{:?}", layer),
                message: "unknown layer id".to_string(),
            })?;
        self.obstructions.push((name, rect));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use art_common::db::core::{LayerDirection, LayerType};

    #[test]
    fn database_adapter_follows_def_version() {
        let mut db = LayoutDB::new();
        db.def_version = Some("5.5".to_string());
        assert!(!LayoutSink::supports_softness(&db));
        assert!(!LayoutSink::supports_max_density(&db));
        db.def_version = Some("5.8".to_string());
        assert!(LayoutSink::supports_softness(&db));
    }

    #[test]
    fn database_adapter_records_blockages() {
        let mut db = LayoutDB::new();
        let rect = Rect::from_coords(0, 0, 10, 10);
        let id = db.create_placement_blockage(rect).unwrap();
        db.set_soft(id, true);
        assert!(db.blockages[0].soft);
        db.set_max_density(id, 0.0);
        assert_eq!(db.blockages[0].max_density, Some(0.0));
    }

    #[test]
    fn database_adapter_rejects_foreign_layer_ids() {
        let mut db = LayoutDB::new();
        let rect = Rect::from_coords(0, 0, 10, 10);
        let err = db
            .create_routing_obstruction(LayerId::new(9), rect)
            .unwrap_err();
        assert!(matches!(err, ArtError::ObstructionFailed { .. }));

        let met1 = db.add_layer("met1".into(), LayerType::Routing, LayerDirection::Horizontal);
        db.create_routing_obstruction(met1, rect).unwrap();
        assert_eq!(db.obstructions.len(), 1);
    }

    #[test]
    fn mirror_copies_layers_and_existing_geometry() {
        let mut db = LayoutDB::new();
        db.die_area = Rect::from_coords(0, 0, 500, 500);
        db.add_layer("met1".into(), LayerType::Routing, LayerDirection::Horizontal);
        db.add_layer("met2".into(), LayerType::Routing, LayerDirection::Vertical);
        db.existing_blockages
            .push(ExistingBlockage::Placement(Rect::from_coords(1, 1, 2, 2)));

        let sink = MemorySink::mirror(&db);
        assert_eq!(sink.die, db.die_area);
        assert_eq!(sink.find_layer("met2"), Some(LayerId::new(1)));
        assert_eq!(sink.existing, vec![Rect::from_coords(1, 1, 2, 2)]);
        assert!(sink.core.is_none());
    }
}
