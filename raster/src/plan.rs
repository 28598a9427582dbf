use art_common::geom::rect::Rect;

/// Placement of the artwork grid inside the target area, in database units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPlan {
    pub cols: u32,
    pub rows: u32,
    pub cell_w: i64,
    pub cell_h: i64,
    pub offset_x: i64,
    pub offset_y: i64,
    /// Area fraction in [0, 1].
    pub scale: f64,
    pub target: Rect,
}

/// Row count preserving the image aspect ratio. Halves round to even.
pub fn derive_rows(image_w: u32, image_h: u32, cols: u32) -> u32 {
    if image_w == 0 {
        return 1;
    }
    let rows = (image_h as f64 * cols as f64 / image_w as f64).round_ties_even();
    (rows as u32).max(1)
}

/// Clamps a percentage to [0, 100] and returns it as a fraction.
pub fn area_fraction(pct: f64) -> f64 {
    if pct.is_nan() {
        return 0.0;
    }
    pct.clamp(0.0, 100.0) / 100.0
}

impl GridPlan {
    pub fn new(image_w: u32, image_h: u32, requested_cols: i64, target: Rect, area_pct: f64) -> Self {
        let cols = requested_cols.clamp(1, u32::MAX as i64) as u32;
        let rows = derive_rows(image_w, image_h, cols);
        let scale = area_fraction(area_pct);

        let target_w = target.width() as f64;
        let target_h = target.height() as f64;
        let pad_x = (target_w * (1.0 - scale) / 2.0).floor() as i64;
        let pad_y = (target_h * (1.0 - scale) / 2.0).floor() as i64;

        Self {
            cols,
            rows,
            cell_w: ((target_w * scale / cols as f64).floor() as i64).max(1),
            cell_h: ((target_h * scale / rows as f64).floor() as i64).max(1),
            offset_x: target.min.x + pad_x,
            offset_y: target.min.y + pad_y,
            scale,
            target,
        }
    }

    pub fn scaled_width(&self) -> f64 {
        self.target.width() as f64 * self.scale
    }

    pub fn scaled_height(&self) -> f64 {
        self.target.height() as f64 * self.scale
    }

    pub fn cell_rect(&self, row: u32, col: u32) -> Rect {
        let llx = self.offset_x + col as i64 * self.cell_w;
        let lly = self.offset_y + row as i64 * self.cell_h;
        Rect::from_coords(llx, lly, llx + self.cell_w, lly + self.cell_h)
    }

    /// Union of all cell rectangles.
    pub fn extent(&self) -> Rect {
        Rect::from_coords(
            self.offset_x,
            self.offset_y,
            self.offset_x + self.cols as i64 * self.cell_w,
            self.offset_y + self.rows as i64 * self.cell_h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: i64) -> Rect {
        Rect::from_coords(0, 0, side, side)
    }

    #[test]
    fn rows_follow_aspect_ratio() {
        for cols in 1..=64u32 {
            for (w, h) in [(1, 1), (640, 480), (480, 640), (3, 1000), (1000, 3), (17, 5)] {
                let expected = ((h as f64 * cols as f64 / w as f64).round() as u32).max(1);
                let rows = derive_rows(w, h, cols);
                // Only exact halves may differ from round-half-away-from-zero.
                if rows != expected {
                    let exact = h as f64 * cols as f64 / w as f64;
                    assert_eq!(exact.fract(), 0.5, "w={} h={} cols={}", w, h, cols);
                }
                assert!(rows >= 1);
            }
        }
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(derive_rows(4, 2, 5), 2);
        assert_eq!(derive_rows(2, 3, 3), 4);
        assert_eq!(derive_rows(2, 1, 3), 2);
    }

    #[test]
    fn degenerate_image_width_yields_one_row() {
        assert_eq!(derive_rows(0, 100, 40), 1);
        assert_eq!(derive_rows(1000, 1, 40), 1);
    }

    #[test]
    fn area_percentage_is_clamped() {
        assert_eq!(area_fraction(-5.0), 0.0);
        assert_eq!(area_fraction(250.0), 1.0);
        assert_eq!(area_fraction(20.0), 0.2);
        assert_eq!(area_fraction(f64::NAN), 0.0);
    }

    #[test]
    fn columns_below_one_clamp() {
        let plan = GridPlan::new(10, 10, 0, square(100), 100.0);
        assert_eq!(plan.cols, 1);
        let plan = GridPlan::new(10, 10, -7, square(100), 100.0);
        assert_eq!(plan.cols, 1);
        assert_eq!(plan.cell_w, 100);
    }

    #[test]
    fn full_area_covers_target() {
        let plan = GridPlan::new(2, 2, 2, square(100), 100.0);
        assert_eq!((plan.cols, plan.rows), (2, 2));
        assert_eq!((plan.cell_w, plan.cell_h), (50, 50));
        assert_eq!((plan.offset_x, plan.offset_y), (0, 0));
        assert_eq!(plan.cell_rect(1, 1), Rect::from_coords(50, 50, 100, 100));
    }

    #[test]
    fn scaled_region_is_centered() {
        let target = Rect::from_coords(2760, 2720, 158_240, 108_800);
        let center = target.center();
        for pct in 0..=100 {
            let plan = GridPlan::new(100, 100, 40, target, pct as f64);
            let cx = plan.offset_x as f64 + plan.scaled_width() / 2.0;
            let cy = plan.offset_y as f64 + plan.scaled_height() / 2.0;
            assert!((cx - center.x as f64).abs() <= 1.0, "pct={} cx={}", pct, cx);
            assert!((cy - center.y as f64).abs() <= 1.0, "pct={} cy={}", pct, cy);
        }
    }

    #[test]
    fn cells_stay_inside_target() {
        let target = Rect::from_coords(-5000, 1000, 95_000, 61_000);
        for pct in [1.0, 12.5, 20.0, 50.0, 99.9, 100.0] {
            for cols in [1i64, 3, 40, 97] {
                let plan = GridPlan::new(320, 200, cols, target, pct);
                assert!(target.contains_rect(&plan.extent()), "pct={} cols={}", pct, cols);
                let last = plan.cell_rect(plan.rows - 1, plan.cols - 1);
                assert!(target.contains_rect(&last));
            }
        }
    }

    #[test]
    fn zero_area_collapses_to_center() {
        let plan = GridPlan::new(64, 64, 8, square(1000), 0.0);
        assert_eq!((plan.cell_w, plan.cell_h), (1, 1));
        assert_eq!((plan.offset_x, plan.offset_y), (500, 500));
        assert_eq!(plan.cell_rect(0, 0), Rect::from_coords(500, 500, 501, 501));
    }
}
