use art_common::error::ArtError;
use art_common::util::config::Config;
use art_raster::ArtParams;
use art_raster::emit::{ObstructionMode, normalize_layers};
use clap::Args;
use std::path::PathBuf;

/// Art parameters accepted on the command line. Anything left unset falls
/// back to `TT_ART_*` variables, then to the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ArtArgs {
    /// DEF file to read and update in place
    #[arg(long, value_name = "FILE")]
    pub def: Option<PathBuf>,

    /// Technology LEF (repeatable)
    #[arg(long, value_name = "FILE")]
    pub lef: Vec<PathBuf>,

    /// Artwork image
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,

    /// Number of grid columns
    #[arg(long)]
    pub grid: Option<i64>,

    /// Luminance threshold (0-255)
    #[arg(long)]
    pub threshold: Option<i32>,

    /// Select dark cells instead of bright ones
    #[arg(long)]
    pub invert: bool,

    /// Artwork size as a percentage of the core area
    #[arg(long)]
    pub area_pct: Option<f64>,

    /// soft, hard or route
    #[arg(long)]
    pub mode: Option<String>,

    /// Deprecated: use --route-layers
    #[arg(long, value_name = "LAYER")]
    pub route_layer: Option<String>,

    /// Routing layers to obstruct, comma separated or repeated
    #[arg(long, value_name = "LAYERS")]
    pub route_layers: Vec<String>,

    /// Where to write the preview PNG
    #[arg(long, value_name = "FILE")]
    pub preview: Option<PathBuf>,
}

/// Raw `TT_ART_*` values. Parsing happens during resolution so that a bad
/// value is reported against its variable name.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    pub image: Option<String>,
    pub grid: Option<String>,
    pub threshold: Option<String>,
    pub invert: Option<String>,
    pub area_pct: Option<String>,
    pub mode: Option<String>,
    pub route_layer: Option<String>,
    pub route_layers: Option<String>,
}

impl EnvOverlay {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            image: get("TT_ART_IMAGE"),
            grid: get("TT_ART_GRID"),
            threshold: get("TT_ART_THRESHOLD"),
            invert: get("TT_ART_INVERT"),
            area_pct: get("TT_ART_AREA_PCT"),
            mode: get("TT_ART_MODE"),
            route_layer: get("TT_ART_ROUTE_LAYER"),
            route_layers: get("TT_ART_ROUTE_LAYERS"),
        }
    }

    fn invert(&self) -> Option<bool> {
        self.invert.as_deref().map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub def_file: PathBuf,
    pub lef_files: Vec<PathBuf>,
    pub params: ArtParams,
}

fn parse_env<T: std::str::FromStr>(
    name: &'static str,
    value: Option<&str>,
) -> Result<Option<T>, ArtError>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ArtError::InvalidParameter {
                name,
                value: v.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Merges flags, environment and config file, in that order of precedence.
pub fn resolve(args: &ArtArgs, env: &EnvOverlay, config: &Config) -> Result<Resolved, ArtError> {
    let art = &config.art;

    let grid = match args.grid {
        Some(g) => g,
        None => parse_env("TT_ART_GRID", env.grid.as_deref())?.unwrap_or(art.grid),
    };
    let threshold = match args.threshold {
        Some(t) => t,
        None => parse_env("TT_ART_THRESHOLD", env.threshold.as_deref())?.unwrap_or(art.threshold),
    };
    let area_pct = match args.area_pct {
        Some(a) => a,
        None => parse_env("TT_ART_AREA_PCT", env.area_pct.as_deref())?.unwrap_or(art.area_pct),
    };
    if !area_pct.is_finite() {
        return Err(ArtError::InvalidParameter {
            name: "area_pct",
            value: area_pct.to_string(),
            reason: "must be a finite percentage".to_string(),
        });
    }
    let invert = args.invert || env.invert().unwrap_or(art.invert);

    let mode: ObstructionMode = args
        .mode
        .as_deref()
        .or(env.mode.as_deref())
        .unwrap_or(art.mode.as_str())
        .parse()?;

    let image = args
        .image
        .clone()
        .or_else(|| env.image.as_ref().map(PathBuf::from))
        .or_else(|| art.image.as_ref().map(PathBuf::from));

    let single_layer = args
        .route_layer
        .as_deref()
        .or(env.route_layer.as_deref())
        .or(art.route_layer.as_deref());
    let route_layers = normalize_layers(
        single_layer
            .into_iter()
            .chain(args.route_layers.iter().map(String::as_str))
            .chain(env.route_layers.as_deref())
            .chain(art.route_layers.iter().map(String::as_str)),
    );

    let preview_file = args
        .preview
        .clone()
        .unwrap_or_else(|| PathBuf::from(&art.preview_file));

    let def_file = args
        .def
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.input.def_file));
    let lef_files = if args.lef.is_empty() {
        config.input.lef_files.iter().map(PathBuf::from).collect()
    } else {
        args.lef.clone()
    };

    Ok(Resolved {
        def_file,
        lef_files,
        params: ArtParams {
            image,
            grid,
            threshold,
            invert,
            area_pct,
            mode,
            route_layers,
            preview_file: Some(preview_file),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvOverlay {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvOverlay::from_lookup(|key| map.get(key).cloned())
    }

    fn config(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn defaults_without_any_source() {
        let r = resolve(&ArtArgs::default(), &EnvOverlay::default(), &Config::default()).unwrap();
        assert_eq!(r.def_file, PathBuf::from("inputs/design.def"));
        assert!(r.lef_files.is_empty());
        assert!(r.params.image.is_none());
        assert_eq!(r.params.grid, 40);
        assert_eq!(r.params.threshold, 128);
        assert!(!r.params.invert);
        assert_eq!(r.params.area_pct, 20.0);
        assert_eq!(r.params.mode, ObstructionMode::Soft);
        assert!(r.params.route_layers.is_empty());
        assert_eq!(r.params.preview_file, Some(PathBuf::from("art_preview.png")));
    }

    #[test]
    fn flags_beat_env_beat_config() {
        let cfg = config(
            r#"
            [art]
            image = "cfg.png"
            grid = 10
            threshold = 50
            mode = "hard"
            "#,
        );
        let overlay = env(&[
            ("TT_ART_IMAGE", "env.png"),
            ("TT_ART_GRID", "20"),
            ("TT_ART_MODE", "ROUTE"),
        ]);
        let args = ArtArgs {
            grid: Some(30),
            ..ArtArgs::default()
        };

        let r = resolve(&args, &overlay, &cfg).unwrap();
        assert_eq!(r.params.grid, 30);
        assert_eq!(r.params.image, Some(PathBuf::from("env.png")));
        assert_eq!(r.params.mode, ObstructionMode::Route);
        assert_eq!(r.params.threshold, 50);

        let r = resolve(&ArtArgs::default(), &EnvOverlay::default(), &cfg).unwrap();
        assert_eq!(r.params.grid, 10);
        assert_eq!(r.params.mode, ObstructionMode::Hard);
        assert_eq!(r.params.image, Some(PathBuf::from("cfg.png")));
    }

    #[test]
    fn env_invert_accepts_common_spellings() {
        for (value, expected) in [("1", true), ("yes", true), ("TRUE", true), ("0", false), ("no", false)] {
            let r = resolve(
                &ArtArgs::default(),
                &env(&[("TT_ART_INVERT", value)]),
                &Config::default(),
            )
            .unwrap();
            assert_eq!(r.params.invert, expected, "TT_ART_INVERT={}", value);
        }
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let overlay = env(&[("TT_ART_GRID", "  "), ("TT_ART_IMAGE", "")]);
        assert!(overlay.grid.is_none());
        assert!(overlay.image.is_none());
    }

    #[test]
    fn layers_are_merged_and_deduplicated() {
        let cfg = config(
            r#"
            [art]
            route_layer = "met3"
            route_layers = ["met2", "met1"]
            "#,
        );
        let overlay = env(&[("TT_ART_ROUTE_LAYERS", "met1; met4 ,,")]);
        let args = ArtArgs {
            route_layers: vec!["met1,met2".to_string()],
            ..ArtArgs::default()
        };
        let r = resolve(&args, &overlay, &cfg).unwrap();
        assert_eq!(r.params.route_layers, vec!["met3", "met1", "met2", "met4"]);
    }

    #[test]
    fn single_layer_follows_precedence() {
        let cfg = config("[art]\nroute_layer = \"met3\"\n");
        let overlay = env(&[("TT_ART_ROUTE_LAYER", "met2")]);
        let r = resolve(&ArtArgs::default(), &overlay, &cfg).unwrap();
        assert_eq!(r.params.route_layers, vec!["met2"]);
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        let err = resolve(
            &ArtArgs::default(),
            &env(&[("TT_ART_GRID", "forty")]),
            &Config::default(),
        )
        .unwrap_err();
        match &err {
            ArtError::InvalidParameter { name, value, .. } => {
                assert_eq!(*name, "TT_ART_GRID");
                assert_eq!(value, "forty");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_configuration());

        let args = ArtArgs {
            mode: Some("sparkly".to_string()),
            ..ArtArgs::default()
        };
        let err = resolve(&args, &EnvOverlay::default(), &Config::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn lef_flags_replace_config_list() {
        let cfg = config("[input]\nlef_files = [\"a.lef\", \"b.lef\"]\n");
        let r = resolve(&ArtArgs::default(), &EnvOverlay::default(), &cfg).unwrap();
        assert_eq!(r.lef_files.len(), 2);

        let args = ArtArgs {
            lef: vec![PathBuf::from("c.lef")],
            ..ArtArgs::default()
        };
        let r = resolve(&args, &EnvOverlay::default(), &cfg).unwrap();
        assert_eq!(r.lef_files, vec![PathBuf::from("c.lef")]);
    }
}
