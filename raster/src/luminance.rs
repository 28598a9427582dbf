use art_common::error::ArtError;
use std::path::Path;

/// Single-channel intensity raster. Row 0 is the bottom of the picture,
/// matching layout coordinates where Y grows upward.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SourceImage {
    /// `pixels` are row-major with row 0 at the bottom.
    pub fn from_bottom_up(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ArtError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ArtError::InvalidParameter {
                name: "pixels",
                value: pixels.len().to_string(),
                reason: format!("{}x{} image needs {} values", width, height, expected),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// `pixels` are row-major in storage order (row 0 at the top) and are
    /// flipped so that row 0 becomes the bottom.
    pub fn from_top_down(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ArtError> {
        let mut image = Self::from_bottom_up(width, height, pixels)?;
        let stride = width as usize;
        if stride > 0 {
            let flipped: Vec<u8> = image.pixels.chunks(stride).rev().flatten().copied().collect();
            image.pixels = flipped;
        }
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Mean intensity over `[x0, x1) x [y0, y1)`; `None` for an empty window.
    pub fn mean(&self, x0: u32, x1: u32, y0: u32, y1: u32) -> Option<f64> {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        let stride = self.width as usize;
        let sum: u64 = (y0 as usize..y1 as usize)
            .map(|y| {
                let row = &self.pixels[y * stride + x0 as usize..y * stride + x1 as usize];
                row.iter().map(|&p| p as u64).sum::<u64>()
            })
            .sum();
        let count = (x1 - x0) as u64 * (y1 - y0) as u64;
        Some(sum as f64 / count as f64)
    }
}

/// Decodes an image file into bottom-up luminance.
#[cfg(feature = "decode")]
pub fn load(path: &Path) -> Result<SourceImage, ArtError> {
    use image::io::Reader;

    if !path.exists() {
        return Err(ArtError::ImageNotFound {
            path: path.to_path_buf(),
        });
    }

    let decode_error = |message: String| ArtError::ImageDecode {
        path: path.to_path_buf(),
        message,
    };

    let reader = Reader::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ArtError::ImageNotFound {
            path: path.to_path_buf(),
        },
        _ => decode_error(e.to_string()),
    })?;
    let decoded = reader
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .decode()
        .map_err(|e| decode_error(e.to_string()))?;

    let gray = image::imageops::flip_vertical(&decoded.to_luma8());
    let (width, height) = gray.dimensions();
    log::debug!("Decoded {} ({}x{})", path.display(), width, height);
    SourceImage::from_bottom_up(width, height, gray.into_raw())
}

#[cfg(not(feature = "decode"))]
pub fn load(_path: &Path) -> Result<SourceImage, ArtError> {
    Err(ArtError::DecoderUnavailable)
}
