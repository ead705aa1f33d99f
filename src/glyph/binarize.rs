//! Binary ink/paper matrices.

use image::{GrayImage, ImageBuffer, Luma, RgbaImage};

/// A row-major matrix of ink (`true`) and paper (`false`) pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMatrix {
    width: u32,
    height: u32,
    ink: Vec<bool>,
}

impl BinaryMatrix {
    /// An all-paper matrix.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ink: vec![false; (width as usize) * (height as usize)],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut matrix = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                matrix.set(x, y, f(x, y));
            }
        }
        matrix
    }

    /// Parses rows of `#` (ink) and `.` (paper). Handy for fixtures.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        Self::from_fn(width, height, |x, y| {
            rows[y as usize].as_bytes().get(x as usize) == Some(&b'#')
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        self.ink[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, ink: bool) {
        let i = self.index(x, y);
        self.ink[i] = ink;
    }

    pub fn ink_count(&self) -> usize {
        self.ink.iter().filter(|&&p| p).count()
    }

    /// Renders ink black on white paper.
    pub fn to_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            if self.is_ink(x, y) {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        })
    }
}

/// Converts a crop to ink/paper by keeping only bright pixels.
///
/// Pixels where R, G and B all exceed `threshold` are ink (the score digits
/// are drawn bright on a darker backdrop); everything else is paper.
pub fn threshold_bright_pixels(img: &RgbaImage, threshold: u8) -> BinaryMatrix {
    BinaryMatrix::from_fn(img.width(), img.height(), |x, y| {
        let pixel = img.get_pixel(x, y);
        pixel[0] > threshold && pixel[1] > threshold && pixel[2] > threshold
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_threshold_bright_pixels() {
        let mut img: RgbaImage = ImageBuffer::new(3, 1);

        // Dark: paper
        img.put_pixel(0, 0, Rgba([100, 100, 100, 255]));
        // Bright white: ink
        img.put_pixel(1, 0, Rgba([250, 250, 250, 255]));
        // One channel dark: paper
        img.put_pixel(2, 0, Rgba([250, 250, 100, 255]));

        let result = threshold_bright_pixels(&img, 190);

        assert!(!result.is_ink(0, 0), "Dark pixel should be paper");
        assert!(result.is_ink(1, 0), "Bright pixel should be ink");
        assert!(!result.is_ink(2, 0), "Partially dark pixel should be paper");
    }

    #[test]
    fn test_from_rows_and_to_image() {
        let matrix = BinaryMatrix::from_rows(&["#.", ".#"]);
        assert_eq!(matrix.ink_count(), 2);

        let img = matrix.to_image();
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 255);
        assert_eq!(img.get_pixel(1, 1)[0], 0);
    }
}
