use super::tokenize;
use crate::db::core::{LayerDirection, LayerType, LayoutDB};
use crate::error::ArtError;
use std::path::Path;

pub fn parse(db: &mut LayoutDB, path: &Path) -> Result<(), ArtError> {
    let text = std::fs::read_to_string(path)?;
    parse_str(db, &text, path)
}

/// Collects technology layers and placement sites. Macro, via, via rule
/// and non-default rule bodies are skipped; their `LAYER` lines describe
/// shapes, not technology layers.
pub fn parse_str(db: &mut LayoutDB, text: &str, path: &Path) -> Result<(), ArtError> {
    let mut current_layer = String::new();
    let mut current_site = String::new();
    // Name closing the block being skipped.
    let mut skipping: Option<String> = None;

    let mut in_layer = false;
    let mut in_site = false;
    let mut layer_type: Option<LayerType> = None;
    let mut layer_dir = LayerDirection::Unknown;
    let mut site_size: Option<(f64, f64)> = None;

    let layers_before = db.layers.len();

    for (idx, line) in text.lines().enumerate() {
        let parts = tokenize(line);
        if parts.is_empty() {
            continue;
        }

        if let Some(block) = &skipping {
            if parts[0] == "END" && parts.get(1) == Some(block) {
                skipping = None;
            }
            continue;
        }

        match parts[0].as_str() {
            "PROPERTYDEFINITIONS" if !in_layer && !in_site => {
                skipping = Some("PROPERTYDEFINITIONS".to_string());
            }
            "MACRO" | "VIA" | "VIARULE" | "NONDEFAULTRULE"
                if !in_layer && !in_site && parts.len() > 1 && parts[1] != ";" =>
            {
                skipping = Some(parts[1].clone());
            }
            "LAYER" => {
                // A header is the bare `LAYER name` form; `LAYER name ;`
                // only references a layer.
                if !in_layer && !in_site && parts.len() == 2 {
                    current_layer = parts[1].clone();
                    in_layer = true;
                    layer_type = None;
                    layer_dir = LayerDirection::Unknown;
                }
            }
            "TYPE" => {
                if in_layer && parts.len() > 1 {
                    layer_type = Some(LayerType::from_lef(&parts[1]));
                }
            }
            "DIRECTION" => {
                if in_layer && parts.len() > 1 {
                    layer_dir = match parts[1].as_str() {
                        "VERTICAL" => LayerDirection::Vertical,
                        "HORIZONTAL" => LayerDirection::Horizontal,
                        _ => LayerDirection::Unknown,
                    };
                }
            }
            "SITE" => {
                if !in_layer && !in_site && parts.len() == 2 {
                    current_site = parts[1].clone();
                    in_site = true;
                    site_size = None;
                }
            }
            "SIZE" => {
                if in_site {
                    // SIZE w BY h ;
                    if parts.len() < 4 || parts[2] != "BY" {
                        return Err(lef_error(path, idx, "malformed SITE SIZE"));
                    }
                    let w = parse_float(path, idx, &parts[1])?;
                    let h = parse_float(path, idx, &parts[3])?;
                    site_size = Some((w, h));
                }
            }
            "END" => {
                if parts.len() > 1 {
                    let name = parts[1].as_str();
                    if in_layer && name == current_layer {
                        let kind = layer_type
                            .take()
                            .unwrap_or_else(|| LayerType::Other(String::new()));
                        db.add_layer(current_layer.clone(), kind, layer_dir.clone());
                        in_layer = false;
                    } else if in_site && name == current_site {
                        if let Some((w, h)) = site_size.take() {
                            db.add_site(current_site.clone(), w, h);
                        }
                        in_site = false;
                    }
                }
            }
            _ => {}
        }
    }

    log::debug!(
        "LEF {}: {} layers, {} sites",
        path.display(),
        db.layers.len() - layers_before,
        db.sites.len()
    );
    Ok(())
}

fn lef_error(path: &Path, idx: usize, message: &str) -> ArtError {
    ArtError::Lef {
        path: path.to_path_buf(),
        message: format!("line {}: {}", idx + 1, message),
    }
}

fn parse_float(path: &Path, idx: usize, token: &str) -> Result<f64, ArtError> {
    token
        .parse::<f64>()
        .map_err(|_| lef_error(path, idx, &format!("expected a number, found '{}'", token)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TECH: &str = "\
VERSION 5.7 ;
UNITS
  DATABASE MICRONS 1000 ;
END UNITS
PROPERTYDEFINITIONS
  LAYER LEF58_TYPE STRING ;
END PROPERTYDEFINITIONS
SITE unithd
  SYMMETRY Y ;
  CLASS CORE ;
  SIZE 0.46 BY 2.72 ;
END unithd
LAYER li1
  TYPE ROUTING ;
  DIRECTION VERTICAL ;
END li1
LAYER mcon
  TYPE CUT ;
END mcon
LAYER met1
  TYPE ROUTING ;
  DIRECTION HORIZONTAL ;
  PITCH 0.34 ;
END met1
MACRO inv
  SIZE 1.38 BY 2.72 ;
  OBS
    LAYER met5 ;
      RECT 0 0 1 1 ;
  END
END inv
END LIBRARY
";

    #[test]
    fn collects_all_layer_types() {
        let mut db = LayoutDB::new();
        parse_str(&mut db, TECH, Path::new("tech.lef")).unwrap();
        let names: Vec<&str> = db.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["li1", "mcon", "met1"]);
        let met1 = db.find_layer("met1").unwrap();
        let data = db.layer(met1).unwrap();
        assert_eq!(data.layer_type, LayerType::Routing);
        assert_eq!(data.direction, LayerDirection::Horizontal);
        assert_eq!(db.layer(db.find_layer("mcon").unwrap()).unwrap().layer_type, LayerType::Cut);
    }

    #[test]
    fn macro_layers_are_not_tech_layers() {
        let mut db = LayoutDB::new();
        parse_str(&mut db, TECH, Path::new("tech.lef")).unwrap();
        assert!(db.find_layer("met5").is_none());
        assert!(db.find_layer("LEF58_TYPE").is_none());
    }

    #[test]
    fn reads_site_size() {
        let mut db = LayoutDB::new();
        parse_str(&mut db, TECH, Path::new("tech.lef")).unwrap();
        let site = &db.sites["unithd"];
        assert!((site.width - 0.46).abs() < 1e-9);
        assert!((site.height - 2.72).abs() < 1e-9);
        assert_eq!(db.sites.len(), 1);
    }

    #[test]
    fn malformed_site_size_is_an_error() {
        let mut db = LayoutDB::new();
        let err = parse_str(
            &mut db,
            "SITE core\n  SIZE 0.46 2.72 ;\nEND core\n",
            Path::new("bad.lef"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn via_and_rule_bodies_do_not_hide_later_layers() {
        let text = "\
LAYER met1
  TYPE ROUTING ;
  DIRECTION HORIZONTAL ;
END met1
LAYER via
  TYPE CUT ;
END via
VIA via1_def DEFAULT
  LAYER met1 ;
    RECT -0.1 -0.1 0.1 0.1 ;
  LAYER via ;
    RECT -0.05 -0.05 0.05 0.05 ;
END via1_def
VIARULE via1_gen GENERATE
  LAYER met1 ;
    ENCLOSURE 0 0.03 ;
END via1_gen
NONDEFAULTRULE wide
  LAYER met1
    WIDTH 0.3 ;
  END met1
END wide
LAYER met2
  TYPE ROUTING ;
  DIRECTION VERTICAL ;
END met2
END LIBRARY
";
        let mut db = LayoutDB::new();
        parse_str(&mut db, text, Path::new("tech.lef")).unwrap();
        let names: Vec<&str> = db.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["met1", "via", "met2"]);
        let met2 = db.layer(db.find_layer("met2").unwrap()).unwrap();
        assert_eq!(met2.direction, LayerDirection::Vertical);
    }
}
