use crate::luminance::SourceImage;
use crate::plan::GridPlan;

/// On/off decision for a cell's mean intensity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholding {
    /// Nominally 0..=255; other values are compared as-is.
    pub threshold: i32,
    pub invert: bool,
}

impl Default for Thresholding {
    fn default() -> Self {
        Self {
            threshold: 128,
            invert: false,
        }
    }
}

impl Thresholding {
    pub fn is_on(&self, mean: f64) -> bool {
        (mean >= self.threshold as f64) != self.invert
    }
}

/// Source-pixel region `[x0, x1) x [y0, y1)` covered by one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceWindow {
    pub x0: u32,
    pub x1: u32,
    pub y0: u32,
    pub y1: u32,
}

impl SourceWindow {
    pub fn for_cell(row: u32, col: u32, plan: &GridPlan, image: &SourceImage) -> Self {
        let (x0, x1) = span(col, plan.cols, image.width());
        let (y0, y1) = span(row, plan.rows, image.height());
        Self { x0, x1, y0, y1 }
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }
}

/// Proportional split of `extent` pixels into `count` parts.
pub fn span(index: u32, count: u32, extent: u32) -> (u32, u32) {
    let count = count.max(1) as u64;
    let extent = extent as u64;
    let start = index as u64 * extent / count;
    let end = (index as u64 + 1) * extent / count;
    (start as u32, end as u32)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSample {
    pub row: u32,
    pub col: u32,
    pub window: SourceWindow,
    pub mean: f64,
    pub on: bool,
}

/// Sampled grid. Cells with an empty source window are absent.
#[derive(Clone, Debug)]
pub struct Classification {
    pub cols: u32,
    pub rows: u32,
    pub cells: Vec<CellSample>,
}

impl Classification {
    /// Selected cells in row-major order.
    pub fn on_cells(&self) -> impl Iterator<Item = &CellSample> {
        self.cells.iter().filter(|c| c.on)
    }

    pub fn on_count(&self) -> usize {
        self.on_cells().count()
    }

    pub fn skipped(&self) -> usize {
        (self.cols as usize * self.rows as usize).saturating_sub(self.cells.len())
    }

    pub fn is_on(&self, row: u32, col: u32) -> bool {
        self.cells
            .iter()
            .any(|c| c.row == row && c.col == col && c.on)
    }
}

pub fn classify(image: &SourceImage, plan: &GridPlan, rule: Thresholding) -> Classification {
    let mut cells = Vec::with_capacity(plan.cols as usize * plan.rows as usize);
    for row in 0..plan.rows {
        for col in 0..plan.cols {
            let window = SourceWindow::for_cell(row, col, plan, image);
            if window.is_empty() {
                continue;
            }
            let Some(mean) = image.mean(window.x0, window.x1, window.y0, window.y1) else {
                continue;
            };
            cells.push(CellSample {
                row,
                col,
                window,
                mean,
                on: rule.is_on(mean),
            });
        }
    }

    let classification = Classification {
        cols: plan.cols,
        rows: plan.rows,
        cells,
    };
    if classification.skipped() > 0 {
        log::debug!(
            "{} grid cells map to no source pixels and were skipped",
            classification.skipped()
        );
    }
    classification
}
