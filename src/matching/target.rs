/// Target image plan
///
/// Holds the reference image as mean-centred RGB samples at full resolution
/// and at every coarser pyramid level that still carries structure, computed
/// once per load.
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};

use super::plane::{Plane, CHANNELS};
use crate::error::{EngineError, EngineResult};

/// Below this the template has no structure to correlate against.
const MIN_TEMPLATE_VARIANCE: f64 = 1e-6;

/// Levels including full resolution.
const MAX_LEVELS: usize = 4;

/// Smallest side a coarse template may have.
const MIN_LEVEL_SIDE: usize = 6;

/// Mean squared deviation per sample below which a coarse level is treated
/// as flat (fine detail averaged away by the box filter).
const MIN_LEVEL_SAMPLE_VARIANCE: f64 = 1.0;

/// One pyramid level of the target.
pub(crate) struct TemplateLevel {
    pub(crate) width: usize,
    pub(crate) height: usize,
    /// Samples minus their channel mean, packed RGB, row-major
    pub(crate) centered: Vec<f64>,
    /// Sum of squared centred samples over all channels
    pub(crate) variance: f64,
}

impl TemplateLevel {
    fn from_plane(plane: &Plane) -> Self {
        let samples = plane.samples();
        let pixels = (plane.width() * plane.height()) as f64;

        let mut means = [0.0f64; CHANNELS];
        for (i, &v) in samples.iter().enumerate() {
            means[i % CHANNELS] += f64::from(v);
        }
        for mean in &mut means {
            *mean /= pixels;
        }

        let centered: Vec<f64> = samples
            .iter()
            .enumerate()
            .map(|(i, &v)| f64::from(v) - means[i % CHANNELS])
            .collect();
        let variance = centered.iter().map(|v| v * v).sum::<f64>();

        Self {
            width: plane.width(),
            height: plane.height(),
            centered,
            variance,
        }
    }

    fn sample_variance(&self) -> f64 {
        self.variance / self.centered.len() as f64
    }
}

/// Immutable reference image. Clones share the same buffer.
#[derive(Clone)]
pub struct TargetImage {
    inner: Arc<Vec<TemplateLevel>>,
}

impl TargetImage {
    pub fn from_rgba(image: &RgbaImage) -> EngineResult<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(EngineError::invalid_target(format!(
                "zero-area image ({width}x{height})"
            )));
        }

        let mut plane = Plane::from_rgba(image);
        let base = TemplateLevel::from_plane(&plane);
        if base.variance <= MIN_TEMPLATE_VARIANCE {
            return Err(EngineError::invalid_target(
                "image is a single flat colour and cannot be correlated",
            ));
        }

        let mut levels = vec![base];
        while levels.len() < MAX_LEVELS {
            let Some(coarser) = plane.downsample() else {
                break;
            };
            if coarser.width() < MIN_LEVEL_SIDE || coarser.height() < MIN_LEVEL_SIDE {
                break;
            }
            let level = TemplateLevel::from_plane(&coarser);
            if level.sample_variance() < MIN_LEVEL_SAMPLE_VARIANCE {
                break;
            }
            levels.push(level);
            plane = coarser;
        }

        Ok(Self {
            inner: Arc::new(levels),
        })
    }

    pub fn from_dynamic(image: &DynamicImage) -> EngineResult<Self> {
        Self::from_rgba(&image.to_rgba8())
    }

    /// Decode an image file (PNG or JPEG).
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|err| {
            EngineError::invalid_target(format!("cannot decode {}: {err}", path.display()))
        })?;
        let target = Self::from_dynamic(&image)?;
        tracing::info!(
            "Loaded target image {} ({}x{}, {} pyramid levels)",
            path.display(),
            target.width(),
            target.height(),
            target.levels().len()
        );
        Ok(target)
    }

    pub fn width(&self) -> u32 {
        self.levels()[0].width as u32
    }

    pub fn height(&self) -> u32 {
        self.levels()[0].height as u32
    }

    /// Full resolution first, each following level half the size.
    pub(crate) fn levels(&self) -> &[TemplateLevel] {
        &self.inner
    }

    /// Reject targets that cannot be placed inside a frame of this extent.
    pub fn ensure_fits(&self, frame_width: u32, frame_height: u32) -> EngineResult<()> {
        if self.width() > frame_width || self.height() > frame_height {
            return Err(EngineError::invalid_target(format!(
                "{}x{} target is larger than the {}x{} capture frame",
                self.width(),
                self.height(),
                frame_width,
                frame_height
            )));
        }
        Ok(())
    }

    /// Whether two handles refer to the same loaded image.
    pub fn same_image(&self, other: &TargetImage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for TargetImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("levels", &self.levels().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    fn waves(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let (fx, fy) = (f64::from(x), f64::from(y));
            Rgba([
                (128.0 + 90.0 * (fx / 7.0).sin()) as u8,
                (128.0 + 90.0 * (fy / 5.0).cos()) as u8,
                (128.0 + 60.0 * ((fx + fy) / 9.0).sin()) as u8,
                255,
            ])
        })
    }

    #[test]
    fn test_plan_is_zero_mean_per_channel() {
        let image = RgbaImage::from_fn(4, 4, |x, y| {
            Rgba([(x * 60) as u8, 200, (y * 50) as u8, 255])
        });
        let target = TargetImage::from_rgba(&image).unwrap();
        let base = &target.levels()[0];

        for c in 0..CHANNELS {
            let sum: f64 = base.centered.iter().skip(c).step_by(CHANNELS).sum();
            assert!(sum.abs() < 1e-9, "channel {c} sums to {sum}");
        }
        assert!(base.variance > 0.0);
    }

    #[test]
    fn test_colour_only_target_is_not_flat() {
        // Identical luma everywhere would be flat in greyscale
        let image = RgbaImage::from_fn(6, 6, |x, _| {
            if x % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        assert!(TargetImage::from_rgba(&image).is_ok());
    }

    #[test]
    fn test_rejects_zero_area() {
        let err = TargetImage::from_rgba(&RgbaImage::new(0, 5)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTarget { .. }));
    }

    #[test]
    fn test_rejects_flat_image() {
        let flat = RgbaImage::from_pixel(8, 8, Rgba([40, 80, 120, 255]));
        let err = TargetImage::from_rgba(&flat).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTarget { .. }));
    }

    #[test]
    fn test_large_target_gets_coarse_levels() {
        let target = TargetImage::from_rgba(&waves(48, 32)).unwrap();
        let sizes: Vec<_> = target
            .levels()
            .iter()
            .map(|level| (level.width, level.height))
            .collect();
        assert_eq!(sizes, vec![(48, 32), (24, 16), (12, 8)]);
    }

    #[test]
    fn test_fine_detail_stops_the_pyramid() {
        // A one-pixel checker box-filters to flat grey
        let target = TargetImage::from_rgba(&checker(32, 32)).unwrap();
        assert_eq!(target.levels().len(), 1);
    }

    #[test]
    fn test_ensure_fits() {
        let target = TargetImage::from_rgba(&checker(10, 6)).unwrap();
        assert!(target.ensure_fits(10, 6).is_ok());
        assert!(target.ensure_fits(1920, 1080).is_ok());
        assert!(target.ensure_fits(9, 100).is_err());
        assert!(target.ensure_fits(100, 5).is_err());
    }

    #[test]
    fn test_clones_share_buffer() {
        let target = TargetImage::from_rgba(&checker(4, 4)).unwrap();
        let copy = target.clone();
        assert!(target.same_image(&copy));

        let other = TargetImage::from_rgba(&checker(4, 4)).unwrap();
        assert!(!target.same_image(&other));
    }

    #[test]
    fn test_open_missing_file() {
        let err = TargetImage::open("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, EngineError::InvalidTarget { .. }));
    }
}
