use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Parameters for a blank floorplan, lengths in microns.
#[derive(Clone, Debug)]
pub struct FloorplanParams {
    pub design: String,
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub site_name: String,
    pub site_width: f64,
    pub site_height: f64,
    pub dbu_per_micron: i64,
}

impl Default for FloorplanParams {
    fn default() -> Self {
        Self {
            design: "art_demo".to_string(),
            width: 161.0,
            height: 111.52,
            margin: 2.76,
            site_name: "unithd".to_string(),
            site_width: 0.46,
            site_height: 2.72,
            dbu_per_micron: 1000,
        }
    }
}

/// Writes a DEF containing only a die area, placement rows and tracks,
/// enough to try the art step without a full flow.
pub fn generate_blank_def(path: &Path, plan: &FloorplanParams) -> std::io::Result<()> {
    let mut file = File::create(path)?;

    let dbu = plan.dbu_per_micron.max(1);
    let to_dbu = |um: f64| (um * dbu as f64).round() as i64;

    let site_w = to_dbu(plan.site_width).max(1);
    let site_h = to_dbu(plan.site_height).max(1);
    let margin = to_dbu(plan.margin).max(0);
    let die_w = to_dbu(plan.width).max(2 * margin + site_w);
    let die_h = to_dbu(plan.height).max(2 * margin + site_h);

    let num_sites = ((die_w - 2 * margin) / site_w).max(1);
    let num_rows = ((die_h - 2 * margin) / site_h).max(1);

    log::info!(
        "Generating floorplan: {}x{} dbu, {} rows of {} sites",
        die_w,
        die_h,
        num_rows,
        num_sites
    );

    writeln!(file, "VERSION 5.8 ;")?;
    writeln!(file, "DIVIDERCHAR \"/\" ;")?;
    writeln!(file, "BUSBITCHARS \"[]\" ;")?;
    writeln!(file, "DESIGN {} ;", plan.design)?;
    writeln!(file, "UNITS DISTANCE MICRONS {} ;", dbu)?;
    writeln!(file, "DIEAREA ( 0 0 ) ( {} {} ) ;", die_w, die_h)?;

    for r in 0..num_rows {
        let orient = if r % 2 == 0 { "FS" } else { "N" };
        writeln!(
            file,
            "ROW ROW_{} {} {} {} {} DO {} BY 1 STEP {} 0 ;",
            r,
            plan.site_name,
            margin,
            margin + r * site_h,
            orient,
            num_sites,
            site_w
        )?;
    }

    writeln!(
        file,
        "TRACKS X {} DO {} STEP {} LAYER met1 ;",
        site_w / 2,
        die_w / site_w,
        site_w
    )?;
    writeln!(
        file,
        "TRACKS Y {} DO {} STEP {} LAYER met1 ;",
        site_w / 2,
        die_h / site_w,
        site_w
    )?;

    writeln!(file, "COMPONENTS 0 ;")?;
    writeln!(file, "END COMPONENTS")?;
    writeln!(file, "NETS 0 ;")?;
    writeln!(file, "END NETS")?;
    writeln!(file, "END DESIGN")?;
    Ok(())
}
