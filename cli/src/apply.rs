use anyhow::Context;
use art_common::db::core::LayoutDB;
use art_common::db::parser::{def, lef};
use art_common::db::writer;
use art_common::error::ArtError;
use art_raster::luminance::{self, SourceImage};
use art_raster::sink::{LayoutSink, MemorySink};
use art_raster::{ArtParams, RunSummary};
use std::path::Path;

use crate::resolve::Resolved;

/// Process exit status for a failed run: 2 for configuration problems,
/// 1 for anything else.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    let configuration = err.chain().any(|cause| {
        cause
            .downcast_ref::<ArtError>()
            .is_some_and(ArtError::is_configuration)
    });
    if configuration { 2 } else { 1 }
}

pub fn load_layout(resolved: &Resolved) -> anyhow::Result<LayoutDB> {
    let mut db = LayoutDB::new();

    for lef_path in &resolved.lef_files {
        if !lef_path.exists() {
            anyhow::bail!("Input LEF file missing: {}", lef_path.display());
        }
        log::info!("Parsing LEF: {}", lef_path.display());
        lef::parse(&mut db, lef_path)
            .with_context(|| format!("Invalid LEF syntax in '{}'", lef_path.display()))?;
    }

    let def_path = &resolved.def_file;
    if !def_path.exists() {
        anyhow::bail!("Input DEF file missing: {}", def_path.display());
    }
    log::info!("Parsing DEF: {}", def_path.display());
    def::parse(&mut db, def_path)
        .with_context(|| format!("Invalid DEF syntax in '{}'", def_path.display()))?;

    if db.layers.is_empty() && !resolved.params.route_layers.is_empty() {
        log::warn!("No technology layers loaded; pass the tech LEF to resolve route layers");
    }
    Ok(db)
}

pub fn run_apply(resolved: &Resolved, dry_run: bool) -> anyhow::Result<()> {
    run_apply_with(resolved, dry_run, luminance::load)
}

/// Loads the layout, imprints the image decoded by `load` and writes the
/// DEF back once. Nothing is written when any step before it fails.
pub fn run_apply_with<F>(resolved: &Resolved, dry_run: bool, load: F) -> anyhow::Result<()>
where
    F: FnOnce(&Path) -> Result<SourceImage, ArtError>,
{
    // Checked before the DEF parse so a missing image never costs one.
    let Some(image) = resolved.params.image.as_deref() else {
        return Err(ArtError::NoImage.into());
    };

    let mut db = load_layout(resolved)?;

    if dry_run {
        let mut sink = MemorySink::mirror(&db);
        apply_to(&resolved.params, &mut sink, || load(image))?;
        log::info!("Dry run: {} left unchanged", resolved.def_file.display());
        return Ok(());
    }

    apply_to(&resolved.params, &mut db, || load(image))?;

    log::info!("Writing DEF to {}", resolved.def_file.display());
    writer::write(&db, &resolved.def_file)
        .with_context(|| format!("Failed to write {}", resolved.def_file.display()))?;
    Ok(())
}

/// A missing image decoder is logged and tolerated so the caller still
/// writes the layout back unchanged.
fn apply_to<S, F>(params: &ArtParams, sink: &mut S, load: F) -> anyhow::Result<()>
where
    S: LayoutSink,
    F: FnOnce() -> Result<SourceImage, ArtError>,
{
    match art_raster::run_with(params, sink, load) {
        Ok(summary) => {
            report(&summary);
            Ok(())
        }
        Err(ArtError::DecoderUnavailable) => {
            log::error!("{}; layout left unchanged", ArtError::DecoderUnavailable);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn report(summary: &RunSummary) {
    log::info!(
        "Art grid {}x{}: {} cells selected, {} blockages, {} routing obstructions",
        summary.plan.cols,
        summary.plan.rows,
        summary.on_cells,
        summary.blockages,
        summary.obstructions
    );
}
