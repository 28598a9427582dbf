pub mod classify;
pub mod emit;
pub mod luminance;
pub mod plan;
#[cfg(feature = "decode")]
pub mod preview;
pub mod run;
pub mod sink;

pub use run::{ArtParams, RunSummary, rasterize, run, run_with};
