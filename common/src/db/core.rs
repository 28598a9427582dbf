use crate::db::indices::*;
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use std::collections::HashMap;

pub const DEFAULT_DBU_PER_MICRON: i64 = 1000;

#[derive(Clone, Debug, PartialEq)]
pub enum LayerDirection {
    Vertical,
    Horizontal,
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayerType {
    Routing,
    Cut,
    Masterslice,
    Overlap,
    Implant,
    Other(String),
}

impl LayerType {
    pub fn from_lef(token: &str) -> Self {
        match token {
            "ROUTING" => LayerType::Routing,
            "CUT" => LayerType::Cut,
            "MASTERSLICE" => LayerType::Masterslice,
            "OVERLAP" => LayerType::Overlap,
            "IMPLANT" => LayerType::Implant,
            other => LayerType::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LayerData {
    pub name: String,
    pub index: LayerId,
    pub layer_type: LayerType,
    pub direction: LayerDirection,
}

/// Placement site from LEF, in microns.
#[derive(Clone, Debug)]
pub struct SiteData {
    pub name: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug)]
pub struct RowDef {
    pub name: String,
    pub site: String,
    pub origin: Point<i64>,
    pub num_x: i64,
    pub num_y: i64,
    pub step_x: i64,
    pub step_y: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacementBlockage {
    pub rect: Rect,
    pub soft: bool,
    pub max_density: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutingObstruction {
    pub layer: LayerId,
    pub rect: Rect,
}

/// Blockage already present in the DEF when it was read. Only the
/// geometry is kept; the original text is re-emitted verbatim.
#[derive(Clone, Debug, PartialEq)]
pub enum ExistingBlockage {
    Placement(Rect),
    Routing { layer: String, rect: Rect },
}

impl ExistingBlockage {
    pub fn rect(&self) -> Rect {
        match self {
            ExistingBlockage::Placement(r) => *r,
            ExistingBlockage::Routing { rect, .. } => *rect,
        }
    }
}

/// Raw DEF text plus the landmarks the writer needs to splice in a
/// merged BLOCKAGES section.
#[derive(Clone, Debug, Default)]
pub struct DefSource {
    pub lines: Vec<String>,
    /// Line index of the `BLOCKAGES n ;` header and of `END BLOCKAGES`.
    pub blockage_section: Option<(usize, usize)>,
    /// Number of `-` entries inside the existing section.
    pub blockage_entries: usize,
    /// Line before which a new section is inserted when none exists.
    pub insert_before: Option<usize>,
}

pub struct LayoutDB {
    pub design_name: String,
    pub def_version: Option<String>,
    pub dbu_per_micron: i64,
    pub die_area: Rect,
    pub rows: Vec<RowDef>,

    pub layers: Vec<LayerData>,
    pub layer_name_map: HashMap<String, LayerId>,
    pub sites: HashMap<String, SiteData>,

    pub existing_blockages: Vec<ExistingBlockage>,
    pub blockages: Vec<PlacementBlockage>,
    pub obstructions: Vec<RoutingObstruction>,

    pub source: Option<DefSource>,
}

impl LayoutDB {
    pub fn new() -> Self {
        Self {
            design_name: "design".to_string(),
            def_version: None,
            dbu_per_micron: DEFAULT_DBU_PER_MICRON,
            die_area: Rect::default(),
            rows: Vec::new(),
            layers: Vec::new(),
            layer_name_map: HashMap::new(),
            sites: HashMap::new(),
            existing_blockages: Vec::new(),
            blockages: Vec::new(),
            obstructions: Vec::new(),
            source: None,
        }
    }

    pub fn add_layer(
        &mut self,
        name: String,
        layer_type: LayerType,
        direction: LayerDirection,
    ) -> LayerId {
        if let Some(&id) = self.layer_name_map.get(&name) {
            return id;
        }
        let id = LayerId::new(self.layers.len());
        self.layer_name_map.insert(name.clone(), id);
        self.layers.push(LayerData {
            name,
            index: id,
            layer_type,
            direction,
        });
        id
    }

    pub fn find_layer(&self, name: &str) -> Option<LayerId> {
        self.layer_name_map.get(name).copied()
    }

    pub fn layer(&self, id: LayerId) -> Option<&LayerData> {
        self.layers.get(id.index())
    }

    pub fn add_site(&mut self, name: String, width: f64, height: f64) {
        self.sites.insert(
            name.clone(),
            SiteData {
                name,
                width,
                height,
            },
        );
    }

    pub fn microns_to_dbu(&self, value: f64) -> i64 {
        (value * self.dbu_per_micron as f64).round() as i64
    }

    pub fn dbu_to_microns(&self, value: i64) -> f64 {
        value as f64 / self.dbu_per_micron as f64
    }

    /// Bounding box of all placement rows. DEF carries no explicit core
    /// box, so the row area stands in for it.
    pub fn core_area(&self) -> Option<Rect> {
        if self.rows.is_empty() {
            return None;
        }

        // Used when the site is unknown: the smallest gap between row origins.
        let mut ys: Vec<i64> = self.rows.iter().map(|r| r.origin.y).collect();
        ys.sort_unstable();
        ys.dedup();
        let pitch_fallback = ys.windows(2).map(|w| w[1] - w[0]).min().unwrap_or(0);

        self.rows
            .iter()
            .map(|row| {
                let (site_w, site_h) = match self.sites.get(&row.site) {
                    Some(site) => (
                        self.microns_to_dbu(site.width),
                        self.microns_to_dbu(site.height),
                    ),
                    None => (row.step_x, pitch_fallback),
                };
                let width = (row.num_x - 1).max(0) * row.step_x + site_w;
                let height = (row.num_y - 1).max(0) * row.step_y + site_h;
                Rect::new(
                    row.origin,
                    Point::new(row.origin.x + width, row.origin.y + height),
                )
            })
            .reduce(|a, b| a.union(&b))
    }

    /// `SOFT` and `PARTIAL` placement blockages were introduced in DEF 5.7.
    pub fn supports_blockage_modifiers(&self) -> bool {
        let Some(version) = &self.def_version else {
            return true;
        };
        let mut parts = version.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        (major, minor) >= (5, 7)
    }

    pub fn create_blockage(&mut self, rect: Rect) -> BlockageId {
        let id = BlockageId::new(self.blockages.len());
        self.blockages.push(PlacementBlockage {
            rect,
            soft: false,
            max_density: None,
        });
        id
    }

    pub fn blockage_mut(&mut self, id: BlockageId) -> Option<&mut PlacementBlockage> {
        self.blockages.get_mut(id.index())
    }

    pub fn create_obstruction(&mut self, layer: LayerId, rect: Rect) -> Option<ObstructionId> {
        self.layer(layer)?;
        let id = ObstructionId::new(self.obstructions.len());
        self.obstructions.push(RoutingObstruction { layer, rect });
        Some(id)
    }
}

impl Default for LayoutDB {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, y: i64, num_x: i64) -> RowDef {
        RowDef {
            name: name.to_string(),
            site: "unithd".to_string(),
            origin: Point::new(5520, y),
            num_x,
            num_y: 1,
            step_x: 460,
            step_y: 0,
        }
    }

    #[test]
    fn core_area_uses_site_height() {
        let mut db = LayoutDB::new();
        db.add_site("unithd".to_string(), 0.46, 2.72);
        db.rows.push(row("ROW_0", 10880, 10));
        db.rows.push(row("ROW_1", 13600, 10));
        assert_eq!(
            db.core_area(),
            Some(Rect::from_coords(5520, 10880, 5520 + 4600, 13600 + 2720))
        );
    }

    #[test]
    fn core_area_falls_back_to_row_pitch() {
        let mut db = LayoutDB::new();
        db.rows.push(row("ROW_0", 0, 4));
        db.rows.push(row("ROW_1", 2720, 4));
        let core = db.core_area().unwrap();
        assert_eq!(core.height(), 2 * 2720);
        assert_eq!(core.width(), 4 * 460);
    }

    #[test]
    fn no_rows_means_no_core() {
        assert!(LayoutDB::new().core_area().is_none());
    }

    #[test]
    fn modifiers_depend_on_def_version() {
        let mut db = LayoutDB::new();
        assert!(db.supports_blockage_modifiers());
        db.def_version = Some("5.8".to_string());
        assert!(db.supports_blockage_modifiers());
        db.def_version = Some("5.6".to_string());
        assert!(!db.supports_blockage_modifiers());
    }

    #[test]
    fn layers_are_unique_by_name() {
        let mut db = LayoutDB::new();
        let a = db.add_layer("met1".into(), LayerType::Routing, LayerDirection::Horizontal);
        let b = db.add_layer("met1".into(), LayerType::Routing, LayerDirection::Horizontal);
        assert_eq!(a, b);
        assert_eq!(db.find_layer("met1"), Some(a));
        assert!(db.find_layer("met99").is_none());
    }

    #[test]
    fn obstruction_requires_known_layer() {
        let mut db = LayoutDB::new();
        let rect = Rect::from_coords(0, 0, 10, 10);
        assert!(db.create_obstruction(LayerId::new(3), rect).is_none());
        let met1 = db.add_layer("met1".into(), LayerType::Routing, LayerDirection::Unknown);
        assert!(db.create_obstruction(met1, rect).is_some());
        assert_eq!(db.obstructions.len(), 1);
    }
}
