//! Whitespace cropping for rendered pages.

use image::{DynamicImage, GenericImageView, GrayImage};

/// Pixels with a luminance below this value count as content.
pub const WHITE_THRESHOLD: u8 = 250;

/// Margin kept around the detected content, in pixels.
pub const PADDING: u32 = 50;

/// Pixel rectangle with exclusive `right` and `bottom` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    /// First column.
    pub left: u32,
    /// First row.
    pub top: u32,
    /// One past the last column.
    pub right: u32,
    /// One past the last row.
    pub bottom: u32,
}

impl CropBox {
    /// Box width in pixels.
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Box height in pixels.
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Grow the box by `padding` on every side, clamped to a `width` x `height` image.
    pub fn padded(&self, padding: u32, width: u32, height: u32) -> CropBox {
        CropBox {
            left: self.left.saturating_sub(padding),
            top: self.top.saturating_sub(padding),
            right: self.right.saturating_add(padding).min(width),
            bottom: self.bottom.saturating_add(padding).min(height),
        }
    }
}

/// Bounding box of all content pixels, or `None` if the image is blank.
pub fn content_box(gray: &GrayImage) -> Option<CropBox> {
    let mut rows = vec![false; gray.height() as usize];
    let mut columns = vec![false; gray.width() as usize];
    gray.enumerate_pixels().for_each(|(x, y, p)| {
        if p[0] < WHITE_THRESHOLD {
            columns[x as usize] = true;
            rows[y as usize] = true;
        }
    });

    let top = rows.iter().position(|&r| r)?;
    let bottom = rows.iter().rposition(|&r| r)?;
    let left = columns.iter().position(|&c| c)?;
    let right = columns.iter().rposition(|&c| c)?;

    Some(CropBox {
        left: left as u32,
        top: top as u32,
        right: right as u32 + 1,
        bottom: bottom as u32 + 1,
    })
}

/// Crop near-white margins, keeping [`PADDING`] pixels around the content.
///
/// Blank images are returned unchanged.
pub fn crop_white_margins(img: &DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    let Some(content) = content_box(&img.to_luma8()) else {
        return img.clone();
    };

    let bbox = content.padded(PADDING, width, height);
    img.crop_imm(bbox.left, bbox.top, bbox.width(), bbox.height())
}
