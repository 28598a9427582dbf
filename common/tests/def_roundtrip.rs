use art_common::db::core::{ExistingBlockage, LayerDirection, LayerType, LayoutDB};
use art_common::db::parser::def;
use art_common::db::writer;
use art_common::geom::rect::Rect;
use art_common::util::generator::{FloorplanParams, generate_blank_def};
use std::path::Path;

fn load(path: &Path) -> LayoutDB {
    let mut db = LayoutDB::new();
    db.add_layer("met1".to_string(), LayerType::Routing, LayerDirection::Horizontal);
    db.add_layer("met2".to_string(), LayerType::Routing, LayerDirection::Vertical);
    def::parse(&mut db, path).unwrap();
    db
}

#[test]
fn generated_floorplan_accumulates_blockages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("design.def");
    generate_blank_def(&path, &FloorplanParams::default()).unwrap();
    let original = std::fs::read_to_string(&path).unwrap();

    // Nothing added: written back byte for byte.
    let db = load(&path);
    writer::write(&db, &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);

    let mut db = load(&path);
    let id = db.create_blockage(Rect::from_coords(10_000, 10_000, 12_000, 12_000));
    db.blockage_mut(id).unwrap().soft = true;
    let met2 = db.find_layer("met2").unwrap();
    db.create_obstruction(met2, Rect::from_coords(20_000, 20_000, 21_000, 21_000))
        .unwrap();
    writer::write(&db, &path).unwrap();

    let first = std::fs::read_to_string(&path).unwrap();
    assert!(first.contains("BLOCKAGES 2 ;"));
    assert!(first.contains("   - PLACEMENT + SOFT RECT ( 10000 10000 ) ( 12000 12000 ) ;"));
    assert!(first.contains("   - LAYER met2 RECT ( 20000 20000 ) ( 21000 21000 ) ;"));
    // The new section lands ahead of NETS.
    assert!(first.find("END BLOCKAGES").unwrap() < first.find("NETS 0 ;").unwrap());
    assert!(first.ends_with("END DESIGN\n"));

    let mut db = load(&path);
    assert_eq!(
        db.existing_blockages,
        vec![
            ExistingBlockage::Placement(Rect::from_coords(10_000, 10_000, 12_000, 12_000)),
            ExistingBlockage::Routing {
                layer: "met2".to_string(),
                rect: Rect::from_coords(20_000, 20_000, 21_000, 21_000),
            },
        ]
    );
    db.create_blockage(Rect::from_coords(10_000, 10_000, 12_000, 12_000));
    writer::write(&db, &path).unwrap();

    let second = std::fs::read_to_string(&path).unwrap();
    assert!(second.contains("BLOCKAGES 3 ;"));
    assert_eq!(second.matches("END BLOCKAGES").count(), 1);
    assert_eq!(second.matches("RECT ( 10000 10000 ) ( 12000 12000 )").count(), 2);
}

#[test]
fn layer_blockages_keep_unknown_layer_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("design.def");
    std::fs::write(
        &path,
        "VERSION 5.8 ;\n\
         DESIGN top ;\n\
         UNITS DISTANCE MICRONS 1000 ;\n\
         DIEAREA ( 0 0 ) ( 1000 1000 ) ;\n\
         BLOCKAGES 1 ;\n\
         \x20  - LAYER met5 RECT ( 0 0 ) ( 10 10 ) ;\n\
         END BLOCKAGES\n\
         END DESIGN\n",
    )
    .unwrap();

    let mut db = load(&path);
    assert_eq!(db.existing_blockages.len(), 1);
    let met1 = db.find_layer("met1").unwrap();
    db.create_obstruction(met1, Rect::from_coords(5, 5, 15, 15)).unwrap();
    writer::write(&db, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("BLOCKAGES 2 ;"));
    assert!(text.contains("   - LAYER met5 RECT ( 0 0 ) ( 10 10 ) ;"));
    assert!(text.contains("   - LAYER met1 RECT ( 5 5 ) ( 15 15 ) ;"));
}
