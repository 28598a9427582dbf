use crate::classify::Classification;
use image::{GrayImage, ImageResult, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

/// Preview pixels per grid cell.
pub const PREVIEW_SCALE: u32 = 8;

/// Selection grid as a picture: selected cells white on black, grid row 0
/// at the top of the image.
pub fn render(classification: &Classification) -> GrayImage {
    let mut img = GrayImage::new(
        classification.cols * PREVIEW_SCALE,
        classification.rows * PREVIEW_SCALE,
    );
    let on = Luma([255u8]);
    for cell in classification.on_cells() {
        let rect = ImageRect::at(
            (cell.col * PREVIEW_SCALE) as i32,
            (cell.row * PREVIEW_SCALE) as i32,
        )
        .of_size(PREVIEW_SCALE, PREVIEW_SCALE);
        draw_filled_rect_mut(&mut img, rect, on);
    }
    img
}

pub fn save(classification: &Classification, path: &Path) -> ImageResult<()> {
    render(classification).save(path)
}
