//! Synthetic shadow casting
//!
//! A shadow is a random triangle intersected with the sign's mask template.
//! Pixels inside it keep their colour offsets but lose a share of their
//! luminance; the boundary is then softened with a small box blur so the
//! shadow edge looks like a physical penumbra.

use image::{Rgb, RgbImage};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::masks::{point_in_polygon, MaskTemplate};

/// Range of each triangle vertex coordinate, in pixels
pub const SHADOW_OFFSET_RANGE: (f32, f32) = (-16.0, 48.0);

/// Range of the luminance factor kept inside the shadow
pub const SHADOW_OPACITY_RANGE: (f32, f32) = (0.2, 0.7);

/// Box kernel used to soften the shadow edge
pub const EDGE_BLUR_KERNEL: u32 = 3;

/// Random draw describing one shadow
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowParams {
    /// Triangle vertices as `[x0, y0, x1, y1, x2, y2]`
    pub offsets: [f32; 6],
    /// Share of luminance kept inside the shadow
    pub opacity: f32,
}

impl ShadowParams {
    /// Draw six vertex coordinates and an opacity uniformly
    pub fn sample(rng: &mut ChaCha8Rng) -> Self {
        let (lo, hi) = SHADOW_OFFSET_RANGE;
        let mut offsets = [0.0f32; 6];
        for offset in offsets.iter_mut() {
            *offset = rng.gen_range(lo..hi);
        }
        let (min_opacity, max_opacity) = SHADOW_OPACITY_RANGE;
        Self {
            offsets,
            opacity: rng.gen_range(min_opacity..max_opacity),
        }
    }

    fn triangle(&self) -> [(f32, f32); 3] {
        let o = &self.offsets;
        [(o[0], o[1]), (o[2], o[3]), (o[4], o[5])]
    }
}

/// Pixels covered by a shadow
#[derive(Debug, Clone)]
pub struct ShadowArea {
    width: u32,
    height: u32,
    covered: Vec<bool>,
}

impl ShadowArea {
    fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            covered: vec![false; (width * height) as usize],
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.covered[(y * self.width + x) as usize]
    }

    pub fn len(&self) -> usize {
        self.covered.iter().filter(|&&c| c).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.covered.iter().any(|&c| c)
    }
}

/// Casts synthetic shadows on sign images
#[derive(Debug, Clone)]
pub struct ShadowAugmentor {
    blur_kernel: u32,
}

impl Default for ShadowAugmentor {
    fn default() -> Self {
        Self::new(EDGE_BLUR_KERNEL)
    }
}

impl ShadowAugmentor {
    pub fn new(blur_kernel: u32) -> Self {
        Self { blur_kernel }
    }

    /// Draw fresh parameters and return the shadowed copy of `image`
    pub fn cast(&self, image: &RgbImage, template: &MaskTemplate, rng: &mut ChaCha8Rng) -> RgbImage {
        let params = ShadowParams::sample(rng);
        let (shadowed, area) = self.draw_shadow(&params, image, template);
        self.shadow_edge_blur(&shadowed, &area, self.blur_kernel)
    }

    /// Darken the template positions that fall inside the shadow triangle
    pub fn draw_shadow(
        &self,
        params: &ShadowParams,
        image: &RgbImage,
        template: &MaskTemplate,
    ) -> (RgbImage, ShadowArea) {
        let (width, height) = image.dimensions();
        let triangle = params.triangle();
        let mut output = image.clone();
        let mut area = ShadowArea::empty(width, height);

        for &(x, y) in template.positions() {
            if x >= width || y >= height {
                continue;
            }
            if !point_in_polygon(&triangle, x as f32 + 0.5, y as f32 + 0.5) {
                continue;
            }
            area.covered[(y * width + x) as usize] = true;

            let pixel = image.get_pixel(x, y);
            let luma = 0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32;
            let shift = luma * (1.0 - params.opacity);
            let mut darkened = [0u8; 3];
            for c in 0..3 {
                darkened[c] = (pixel[c] as f32 - shift).round().clamp(0.0, 255.0) as u8;
            }
            output.put_pixel(x, y, Rgb(darkened));
        }

        (output, area)
    }

    /// Box-blur every pixel whose kernel window straddles the shadow boundary
    pub fn shadow_edge_blur(&self, image: &RgbImage, area: &ShadowArea, kernel: u32) -> RgbImage {
        let (width, height) = image.dimensions();
        let half_k = kernel as i32 / 2;
        let mut output = image.clone();

        if half_k == 0 || area.is_empty() {
            return output;
        }

        for y in 0..height {
            for x in 0..width {
                let mut inside = 0u32;
                let mut outside = 0u32;
                let mut sum = [0.0f32; 3];

                for ky in -half_k..=half_k {
                    for kx in -half_k..=half_k {
                        let px = x as i32 + kx;
                        let py = y as i32 + ky;
                        if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                            continue;
                        }
                        let (px, py) = (px as u32, py as u32);
                        if area.contains(px, py) {
                            inside += 1;
                        } else {
                            outside += 1;
                        }
                        let pixel = image.get_pixel(px, py);
                        for c in 0..3 {
                            sum[c] += pixel[c] as f32;
                        }
                    }
                }

                if inside > 0 && outside > 0 {
                    let count = (inside + outside) as f32;
                    let blurred = [
                        (sum[0] / count).round() as u8,
                        (sum[1] / count).round() as u8,
                        (sum[2] / count).round() as u8,
                    ];
                    output.put_pixel(x, y, Rgb(blurred));
                }
            }
        }

        output
    }
}
