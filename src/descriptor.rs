use ndarray::{Array1, ArrayView3};

use crate::bbox::BBox;

// bins per color channel; the descriptor concatenates the three channels
const BINS: usize = 8;

// crops larger than this per axis are strided down to bound sampling cost
const MAX_SAMPLES_PER_AXIS: usize = 64;

/// Compact appearance signature of a cropped region: an L1-normalized
/// per-channel color histogram. Used only for re-identification scoring,
/// never inside a single frame's association pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor(Array1<f32>);

impl Descriptor {
    /// Samples a descriptor from the region of `pixels` covered by `bbox`.
    /// `pixels` is height x width x channel (RGB). Returns `None` when the
    /// clipped crop covers no pixels.
    pub fn sample(pixels: &ArrayView3<'_, u8>, bbox: &BBox) -> Option<Self> {
        let (height, width, channels) = pixels.dim();

        if channels < 3 {
            return None;
        }

        let x1 = (bbox.x1().floor().max(0.) as usize).min(width);
        let y1 = (bbox.y1().floor().max(0.) as usize).min(height);
        let x2 = (bbox.x2().ceil().max(0.) as usize).min(width);
        let y2 = (bbox.y2().ceil().max(0.) as usize).min(height);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let step_x = ((x2 - x1) / MAX_SAMPLES_PER_AXIS).max(1);
        let step_y = ((y2 - y1) / MAX_SAMPLES_PER_AXIS).max(1);

        let mut hist = Array1::zeros(BINS * 3);
        let mut count = 0.0f32;

        let mut y = y1;
        while y < y2 {
            let mut x = x1;
            while x < x2 {
                for ch in 0..3 {
                    let bin = pixels[[y, x, ch]] as usize * BINS / 256;
                    hist[ch * BINS + bin] += 1.0;
                }

                count += 1.0;
                x += step_x;
            }
            y += step_y;
        }

        if count == 0.0 {
            return None;
        }

        // one vote per channel per pixel, so the full vector sums to 1
        hist /= count * 3.0;

        Some(Descriptor(hist))
    }

    /// Distance in [0, 1]: one minus histogram intersection. 0 = identical
    /// color signatures, 1 = fully disjoint.
    pub fn distance(&self, other: &Descriptor) -> f32 {
        let inter: f32 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.min(*b))
            .sum();

        (1.0 - inter).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn solid(height: usize, width: usize, rgb: [u8; 3]) -> Array3<u8> {
        Array3::from_shape_fn((height, width, 3), |(_, _, c)| rgb[c])
    }

    #[test]
    fn self_distance_is_zero() {
        let img = solid(32, 32, [200, 40, 40]);
        let d = Descriptor::sample(&img.view(), &BBox::new(4.0, 4.0, 28.0, 28.0)).unwrap();

        assert!(d.distance(&d) < 1e-6);
    }

    #[test]
    fn disjoint_colors_are_far() {
        let red = solid(32, 32, [250, 10, 10]);
        let cyan = solid(32, 32, [10, 240, 250]);

        let bbox = BBox::new(0.0, 0.0, 32.0, 32.0);
        let a = Descriptor::sample(&red.view(), &bbox).unwrap();
        let b = Descriptor::sample(&cyan.view(), &bbox).unwrap();

        assert!(a.distance(&b) > 0.9);
    }

    #[test]
    fn same_color_crops_are_close() {
        let img = solid(64, 64, [30, 180, 60]);
        let a = Descriptor::sample(&img.view(), &BBox::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        let b = Descriptor::sample(&img.view(), &BBox::new(40.0, 40.0, 64.0, 64.0)).unwrap();

        assert!(a.distance(&b) < 0.1);
    }

    #[test]
    fn out_of_frame_crop_yields_none() {
        let img = solid(16, 16, [0, 0, 0]);

        assert!(Descriptor::sample(&img.view(), &BBox::new(20.0, 20.0, 30.0, 30.0)).is_none());
        assert!(Descriptor::sample(&img.view(), &BBox::new(-10.0, -10.0, -1.0, -1.0)).is_none());
    }

    #[test]
    fn crop_clips_to_frame() {
        let img = solid(16, 16, [120, 120, 120]);
        let d = Descriptor::sample(&img.view(), &BBox::new(-5.0, -5.0, 40.0, 40.0));

        assert!(d.is_some());
    }
}
