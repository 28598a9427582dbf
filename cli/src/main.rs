mod apply;
mod resolve;

use anyhow::Context;
use art_common::error::ArtError;
use art_common::geom::rect::Rect;
use art_common::util::config::{Config, TEMPLATE};
use art_common::util::generator::{self, FloorplanParams};
use art_common::util::logger;
use clap::{Parser, Subcommand};
use resolve::{ArtArgs, EnvOverlay, Resolved};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Imprint the image onto the DEF as blockages (default)
    Apply {
        #[command(flatten)]
        art: ArtArgs,
        /// Run everything but leave the DEF untouched
        #[arg(long)]
        dry_run: bool,
    },
    /// Only render the preview PNG
    Preview {
        #[command(flatten)]
        art: ArtArgs,
    },
    /// Write a commented default configuration
    Init {
        #[arg(long)]
        force: bool,
        #[arg(default_value = "config.toml")]
        output: PathBuf,
    },
    /// Write a blank floorplan DEF to try the art step on
    Generate {
        #[arg(long, default_value_t = 161.0)]
        width: f64,
        #[arg(long, default_value_t = 111.52)]
        height: f64,
        #[arg(long, default_value_t = 2.76)]
        margin: f64,
        #[arg(long, default_value = "art_demo")]
        design: String,
        #[arg(long, default_value = "inputs/design.def")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    logger::init();
    let args = Args::parse();

    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            exit_code(&e)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    ExitCode::from(apply::exit_status(err))
}

fn execute(args: Args) -> anyhow::Result<()> {
    let command = args.command.unwrap_or(Commands::Apply {
        art: ArtArgs::default(),
        dry_run: false,
    });

    match command {
        Commands::Init { force, output } => write_template(&output, force),
        Commands::Generate {
            width,
            height,
            margin,
            design,
            output,
        } => {
            prepare_output_dir(&output)?;
            let floorplan = FloorplanParams {
                design,
                width,
                height,
                margin,
                ..FloorplanParams::default()
            };
            generator::generate_blank_def(&output, &floorplan)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            log::info!("Generated: {}", output.display());
            Ok(())
        }
        Commands::Apply { art, dry_run } => {
            let config = load_config(&args.config)?;
            let resolved = resolve::resolve(&art, &EnvOverlay::from_env(), &config)?;
            apply::run_apply(&resolved, dry_run)
        }
        Commands::Preview { art } => {
            let config = load_config(&args.config)?;
            let resolved = resolve::resolve(&art, &EnvOverlay::from_env(), &config)?;
            run_preview(&resolved)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            path
        );
        return Ok(Config::default());
    }

    log::info!("Loading configuration from {:?}", path);
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = toml::from_str(&text).map_err(|e| ArtError::InvalidParameter {
        name: "config",
        value: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

fn write_template(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            output.display()
        );
    }
    prepare_output_dir(output)?;
    std::fs::write(output, TEMPLATE)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!("Wrote default configuration to {}", output.display());
    Ok(())
}

fn prepare_output_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn run_preview(resolved: &Resolved) -> anyhow::Result<()> {
    if resolved.params.image.is_none() {
        return Err(ArtError::NoImage.into());
    }

    let target = if resolved.def_file.exists() {
        let db = apply::load_layout(resolved)?;
        db.core_area().unwrap_or(db.die_area)
    } else {
        log::warn!(
            "{} not found; planning against a unit target",
            resolved.def_file.display()
        );
        Rect::from_coords(0, 0, 1, 1)
    };

    let (plan, classification) = art_raster::rasterize(&resolved.params, target)?;
    log::info!(
        "Art grid {}x{}: {} cells selected",
        plan.cols,
        plan.rows,
        classification.on_count()
    );

    let path = resolved
        .params
        .preview_file
        .as_deref()
        .unwrap_or(Path::new("art_preview.png"));
    match art_raster::run::write_preview(&classification, path) {
        Some(_) => Ok(()),
        None => anyhow::bail!("Preview was not written"),
    }
}
