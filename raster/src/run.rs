use crate::classify::{Classification, Thresholding, classify};
use crate::emit::{EmitPolicy, Emitter, ObstructionMode};
use crate::luminance::{self, SourceImage};
use crate::plan::GridPlan;
use crate::sink::LayoutSink;
use art_common::error::ArtError;
use art_common::geom::rect::Rect;
use art_common::geom::rtree::SpatialIndex;
use std::path::{Path, PathBuf};

/// Fully resolved parameters for one run.
#[derive(Clone, Debug)]
pub struct ArtParams {
    pub image: Option<PathBuf>,
    pub grid: i64,
    pub threshold: i32,
    pub invert: bool,
    pub area_pct: f64,
    pub mode: ObstructionMode,
    pub route_layers: Vec<String>,
    pub preview_file: Option<PathBuf>,
}

impl Default for ArtParams {
    fn default() -> Self {
        Self {
            image: None,
            grid: 40,
            threshold: 128,
            invert: false,
            area_pct: 20.0,
            mode: ObstructionMode::Soft,
            route_layers: Vec::new(),
            preview_file: Some(PathBuf::from("art_preview.png")),
        }
    }
}

impl ArtParams {
    pub fn thresholding(&self) -> Thresholding {
        Thresholding {
            threshold: self.threshold,
            invert: self.invert,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub plan: GridPlan,
    pub on_cells: usize,
    /// Cells that received at least one placement blockage.
    pub placed: usize,
    pub blockages: usize,
    pub obstructions: usize,
    /// Selected cells overlapping geometry blocked before the run.
    pub overlapping: usize,
    pub preview: Option<PathBuf>,
}

/// Imprints the configured image onto `sink`.
///
/// Fails before touching the sink when no image is configured, and before
/// creating anything when a route layer is unknown. Write-back is left to
/// the caller.
pub fn run<S: LayoutSink>(params: &ArtParams, sink: &mut S) -> Result<RunSummary, ArtError> {
    let path = params.image.as_deref().ok_or(ArtError::NoImage)?;
    run_with(params, sink, || luminance::load(path))
}

/// Same as [`run`], with the image supplied by `load`.
pub fn run_with<S, F>(params: &ArtParams, sink: &mut S, load: F) -> Result<RunSummary, ArtError>
where
    S: LayoutSink,
    F: FnOnce() -> Result<SourceImage, ArtError>,
{
    let target = report_target(sink);

    let policy = EmitPolicy::new(params.mode, &params.route_layers);
    log::info!(
        "Mode={} placement={} routing_layers={:?}",
        policy.mode,
        if policy.wants_placement() { "yes" } else { "no" },
        policy.layers
    );

    let existing = SpatialIndex::from_rects(sink.existing_obstructions());
    let mut emitter = Emitter::new(sink, policy)?;

    let image = load()?;
    let (plan, classification) = sample(&image, params, target);

    let mut overlapping = 0;
    for cell in classification.on_cells() {
        let rect = plan.cell_rect(cell.row, cell.col);
        emitter.emit(rect)?;
        if !existing.query(rect).is_empty() {
            overlapping += 1;
        }
    }
    let stats = emitter.stats();

    log::info!("Placed {} placement blockages from image", stats.placed);
    if stats.obstructions > 0 {
        log::info!("Created {} routing obstructions", stats.obstructions);
    }
    if overlapping > 0 {
        log::warn!(
            "{} art cells overlap blockages that were already in the layout; \
             re-applying art adds obstructions instead of replacing them",
            overlapping
        );
    }

    let preview = params
        .preview_file
        .as_deref()
        .and_then(|p| write_preview(&classification, p));

    Ok(RunSummary {
        plan,
        on_cells: stats.cells,
        placed: stats.placed,
        blockages: stats.blockages,
        obstructions: stats.obstructions,
        overlapping,
        preview,
    })
}

/// Load, plan and classify without emitting anything.
pub fn rasterize(
    params: &ArtParams,
    target: Rect,
) -> Result<(GridPlan, Classification), ArtError> {
    let path = params.image.as_deref().ok_or(ArtError::NoImage)?;
    let image = luminance::load(path)?;
    Ok(sample(&image, params, target))
}

fn sample(image: &SourceImage, params: &ArtParams, target: Rect) -> (GridPlan, Classification) {
    let plan = GridPlan::new(
        image.width(),
        image.height(),
        params.grid,
        target,
        params.area_pct,
    );
    log::info!(
        "Rasterizing {} to grid {}x{}, threshold={}, invert={}, area={}%",
        params
            .image
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "image".to_string()),
        plan.cols,
        plan.rows,
        params.threshold,
        params.invert,
        params.area_pct
    );
    let classification = classify(image, &plan, params.thresholding());
    (plan, classification)
}

/// Logs die and core geometry and returns the art target: the core, or
/// the die when no core is known.
fn report_target<S: LayoutSink>(sink: &S) -> Rect {
    let dbu = sink.dbu_per_micron().max(1) as f64;
    let describe = |r: Rect| {
        let w = r.width() as f64 / dbu;
        let h = r.height() as f64 / dbu;
        (w, h, w * h)
    };

    let die = sink.die_area();
    let (w, h, a) = describe(die);
    log::info!("Die size: {} x {} um  area={} um^2", w, h, a);

    match sink.core_area() {
        Some(core) => {
            let (w, h, a) = describe(core);
            log::info!("Core size: {} x {} um  area={} um^2", w, h, a);
            core
        }
        None => {
            log::warn!("Core bbox not available; using die bbox as fallback");
            die
        }
    }
}

pub fn write_preview(classification: &Classification, path: &Path) -> Option<PathBuf> {
    #[cfg(feature = "decode")]
    {
        match crate::preview::save(classification, path) {
            Ok(()) => {
                log::info!("Preview saved to {}", path.display());
                Some(path.to_path_buf())
            }
            Err(e) => {
                log::warn!("Failed to save preview {}: {}", path.display(), e);
                None
            }
        }
    }
    #[cfg(not(feature = "decode"))]
    {
        let _ = classification;
        log::warn!(
            "Preview {} skipped: image support is not built in",
            path.display()
        );
        None
    }
}
