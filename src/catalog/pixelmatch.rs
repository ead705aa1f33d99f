//! Anti-aliasing aware pixel difference count.
//!
//! Two pixels differ when their YIQ color distance exceeds the threshold,
//! unless one of them sits on an anti-aliased edge in either image.

use image::RgbaImage;

/// Matching options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchOptions {
    /// Color tolerance between 0 and 1; smaller is stricter
    pub threshold: f64,
    /// Count anti-aliased pixels as differences too
    pub include_anti_aliased: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            include_anti_aliased: false,
        }
    }
}

/// Largest possible YIQ distance between two colors.
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Counts mismatching pixels between two images of the same size.
///
/// Returns `None` when the dimensions differ.
pub fn pixel_difference(a: &RgbaImage, b: &RgbaImage, options: &MatchOptions) -> Option<u64> {
    if a.dimensions() != b.dimensions() {
        return None;
    }
    if a.as_raw() == b.as_raw() {
        return Some(0);
    }

    let (width, height) = a.dimensions();
    let max_delta = MAX_YIQ_DELTA * options.threshold * options.threshold;
    let mut diff = 0;

    for y in 0..height {
        for x in 0..width {
            let delta = color_delta(a.get_pixel(x, y).0, b.get_pixel(x, y).0, false);
            if delta.abs() <= max_delta {
                continue;
            }
            if !options.include_anti_aliased
                && (anti_aliased(a, b, x, y) || anti_aliased(b, a, x, y))
            {
                continue;
            }
            diff += 1;
        }
    }

    Some(diff)
}

fn blend(channel: f64, alpha: f64) -> f64 {
    255.0 + (channel - 255.0) * alpha
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.29889531 + g * 0.58662247 + b * 0.11448223
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.59597799 - g * 0.27417610 - b * 0.32180189
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.21147017 - g * 0.52261711 + b * 0.31114694
}

/// Blends a pixel onto white according to its alpha.
fn composite(p: [u8; 4]) -> (f64, f64, f64) {
    let (r, g, b) = (p[0] as f64, p[1] as f64, p[2] as f64);
    if p[3] < 255 {
        let alpha = p[3] as f64 / 255.0;
        (blend(r, alpha), blend(g, alpha), blend(b, alpha))
    } else {
        (r, g, b)
    }
}

/// Signed perceptual distance between two pixels.
///
/// Negative when the first pixel is brighter. With `y_only` just the
/// brightness difference is returned.
fn color_delta(p1: [u8; 4], p2: [u8; 4], y_only: bool) -> f64 {
    if p1 == p2 {
        return 0.0;
    }

    let (r1, g1, b1) = composite(p1);
    let (r2, g2, b2) = composite(p2);

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;

    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 { -delta } else { delta }
}

/// 3×3 neighborhood of `(x, y)` clipped to the image, and whether the
/// pixel lies on the image border.
fn neighborhood(img: &RgbaImage, x: u32, y: u32) -> (u32, u32, u32, u32, bool) {
    let x0 = x.saturating_sub(1);
    let y0 = y.saturating_sub(1);
    let x2 = (x + 1).min(img.width() - 1);
    let y2 = (y + 1).min(img.height() - 1);
    let on_edge = x == x0 || x == x2 || y == y0 || y == y2;
    (x0, y0, x2, y2, on_edge)
}

/// Whether `(x, y)` in `img` looks like an anti-aliased edge pixel.
///
/// Such a pixel has both a darker and a brighter neighbor, and the darkest
/// or brightest neighbor sits in a flat area in both images.
fn anti_aliased(img: &RgbaImage, other: &RgbaImage, x: u32, y: u32) -> bool {
    let (x0, y0, x2, y2, on_edge) = neighborhood(img, x, y);
    let center = img.get_pixel(x, y).0;

    let mut zeroes = u32::from(on_edge);
    let (mut min, mut max) = (0.0, 0.0);
    let (mut min_at, mut max_at) = ((0, 0), (0, 0));

    for ny in y0..=y2 {
        for nx in x0..=x2 {
            if nx == x && ny == y {
                continue;
            }
            let delta = color_delta(center, img.get_pixel(nx, ny).0, true);
            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_at = (nx, ny);
            } else if delta > max {
                max = delta;
                max_at = (nx, ny);
            }
        }
    }

    if min == 0.0 || max == 0.0 {
        return false;
    }

    (has_many_siblings(img, min_at.0, min_at.1) && has_many_siblings(other, min_at.0, min_at.1))
        || (has_many_siblings(img, max_at.0, max_at.1)
            && has_many_siblings(other, max_at.0, max_at.1))
}

/// Whether at least three neighbors of `(x, y)` have exactly its color.
fn has_many_siblings(img: &RgbaImage, x: u32, y: u32) -> bool {
    let (x0, y0, x2, y2, on_edge) = neighborhood(img, x, y);
    let center = img.get_pixel(x, y);

    let mut zeroes = u32::from(on_edge);
    for ny in y0..=y2 {
        for nx in x0..=x2 {
            if nx == x && ny == y {
                continue;
            }
            if img.get_pixel(nx, ny) == center {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn solid(w: u32, h: u32, c: [u8; 4]) -> RgbaImage {
        ImageBuffer::from_pixel(w, h, Rgba(c))
    }

    #[test]
    fn test_identical_images() {
        let a = solid(8, 8, [10, 20, 30, 255]);
        assert_eq!(pixel_difference(&a, &a.clone(), &MatchOptions::default()), Some(0));
    }

    #[test]
    fn test_size_mismatch() {
        let a = solid(8, 8, [0, 0, 0, 255]);
        let b = solid(8, 7, [0, 0, 0, 255]);
        assert_eq!(pixel_difference(&a, &b, &MatchOptions::default()), None);
    }

    #[test]
    fn test_completely_different() {
        let a = solid(4, 4, [0, 0, 0, 255]);
        let b = solid(4, 4, [255, 255, 255, 255]);
        assert_eq!(pixel_difference(&a, &b, &MatchOptions::default()), Some(16));
    }

    #[test]
    fn test_small_color_change_within_tolerance() {
        let a = solid(4, 4, [100, 100, 100, 255]);
        let b = solid(4, 4, [103, 101, 99, 255]);
        assert_eq!(pixel_difference(&a, &b, &MatchOptions::default()), Some(0));
    }

    #[test]
    fn test_single_changed_pixel() {
        let a = solid(5, 5, [255, 255, 255, 255]);
        let mut b = a.clone();
        b.put_pixel(2, 2, Rgba([0, 0, 0, 255]));
        assert_eq!(pixel_difference(&a, &b, &MatchOptions::default()), Some(1));
    }

    #[test]
    fn test_anti_aliased_edge_ignored() {
        // Left half black, right half white; the second image softens the
        // boundary column to gray
        let a: RgbaImage = ImageBuffer::from_fn(8, 8, |x, _| {
            if x < 4 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        let mut b = a.clone();
        for y in 0..8 {
            b.put_pixel(4, y, Rgba([128, 128, 128, 255]));
        }

        assert_eq!(pixel_difference(&a, &b, &MatchOptions::default()), Some(0));

        let strict = MatchOptions {
            include_anti_aliased: true,
            ..MatchOptions::default()
        };
        assert_eq!(pixel_difference(&a, &b, &strict), Some(8));
    }

    #[test]
    fn test_transparent_pixels_blend_to_white() {
        let a = solid(3, 3, [0, 0, 0, 0]);
        let b = solid(3, 3, [255, 255, 255, 255]);
        assert_eq!(pixel_difference(&a, &b, &MatchOptions::default()), Some(0));
    }

    #[test]
    fn test_color_delta_sign() {
        let white = [255, 255, 255, 255];
        let black = [0, 0, 0, 255];
        assert!(color_delta(white, black, false) < 0.0);
        assert!(color_delta(black, white, false) > 0.0);
        assert_eq!(color_delta(black, black, false), 0.0);
    }
}
