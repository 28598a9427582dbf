use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub art: ArtConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            art: ArtConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_def_file")]
    pub def_file: String,
    #[serde(default)]
    pub lef_files: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            def_file: default_def_file(),
            lef_files: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArtConfig {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_grid")]
    pub grid: i64,
    #[serde(default = "default_threshold")]
    pub threshold: i32,
    #[serde(default)]
    pub invert: bool,
    #[serde(default = "default_area_pct")]
    pub area_pct: f64,
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Deprecated single-layer form of `route_layers`.
    #[serde(default)]
    pub route_layer: Option<String>,
    #[serde(default)]
    pub route_layers: Vec<String>,
    #[serde(default = "default_preview_file")]
    pub preview_file: String,
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            image: None,
            grid: default_grid(),
            threshold: default_threshold(),
            invert: false,
            area_pct: default_area_pct(),
            mode: default_mode(),
            route_layer: None,
            route_layers: Vec::new(),
            preview_file: default_preview_file(),
        }
    }
}

/// Starting point written by `art init`. Every value equals the default.
pub const TEMPLATE: &str = r#"# Layout art configuration.
# Command-line flags override TT_ART_* environment variables, which
# override the values below.

[input]
def_file = "inputs/design.def"
# Technology LEFs; needed to resolve routing layer names.
lef_files = []

[art]
# image = "art/logo.png"
# Grid columns; rows follow the image aspect ratio.
grid = 40
# Luminance threshold 0..255; cells at or above it are selected.
threshold = 128
invert = false
# Artwork scale as a percentage of the core area (0..100).
area_pct = 20.0
# soft | hard | route
mode = "soft"
route_layers = []
preview_file = "art_preview.png"
"#;

fn default_def_file() -> String {
    "inputs/design.def".to_string()
}

fn default_grid() -> i64 {
    40
}

fn default_threshold() -> i32 {
    128
}

fn default_area_pct() -> f64 {
    20.0
}

fn default_mode() -> String {
    "soft".to_string()
}

fn default_preview_file() -> String {
    "art_preview.png".to_string()
}
