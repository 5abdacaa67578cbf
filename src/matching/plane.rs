/// RGB pixel planes and pyramid levels
///
/// Both the frame and the target are matched as packed 3-channel rasters, so
/// colour differences that vanish in luma still count. Coarser levels are
/// built with a 2x2 box filter: `dst = (a + b + c + d + 2) / 4` per channel.
use image::RgbaImage;

pub(crate) const CHANNELS: usize = 3;

/// Packed RGB raster, row-major, alpha dropped.
#[derive(Debug, Clone)]
pub(crate) struct Plane {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Plane {
    pub(crate) fn from_rgba(image: &RgbaImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for pixel in image.pixels() {
            data.extend_from_slice(&pixel.0[..CHANNELS]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    pub(crate) fn samples(&self) -> &[u8] {
        &self.data
    }

    /// `len` pixels of row `y` starting at column `x`, as packed samples.
    pub(crate) fn row(&self, x: usize, y: usize, len: usize) -> &[u8] {
        let start = (y * self.width + x) * CHANNELS;
        &self.data[start..start + len * CHANNELS]
    }

    /// Half-resolution copy, or `None` once a side drops below 2 pixels.
    pub(crate) fn downsample(&self) -> Option<Self> {
        if self.width < 2 || self.height < 2 {
            return None;
        }

        let width = self.width / 2;
        let height = self.height / 2;
        let src_stride = self.width * CHANNELS;
        let mut data = vec![0u8; width * height * CHANNELS];

        for y in 0..height {
            let row0 = &self.data[(y * 2) * src_stride..(y * 2 + 1) * src_stride];
            let row1 = &self.data[(y * 2 + 1) * src_stride..(y * 2 + 2) * src_stride];
            let dst = &mut data[y * width * CHANNELS..(y + 1) * width * CHANNELS];

            for x in 0..width {
                for c in 0..CHANNELS {
                    let left = x * 2 * CHANNELS + c;
                    let right = left + CHANNELS;
                    let sum = u16::from(row0[left])
                        + u16::from(row0[right])
                        + u16::from(row1[left])
                        + u16::from(row1[right]);
                    dst[x * CHANNELS + c] = ((sum + 2) / 4) as u8;
                }
            }
        }

        Some(Self {
            width,
            height,
            data,
        })
    }
}

/// Per-window sum of every channel plus the sum of squares over all
/// channels, the two quantities the correlation denominator needs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct WindowStats {
    pub(crate) sums: [u64; CHANNELS],
    pub(crate) squares: u64,
}

/// Summed-area tables of a plane, giving [`WindowStats`] for any window in
/// constant time.
pub(crate) struct IntegralPlane {
    stride: usize,
    sums: Vec<[u64; CHANNELS]>,
    squares: Vec<u64>,
}

impl IntegralPlane {
    pub(crate) fn new(plane: &Plane) -> Self {
        let stride = plane.width() + 1;
        let len = stride * (plane.height() + 1);
        let mut sums = vec![[0u64; CHANNELS]; len];
        let mut squares = vec![0u64; len];

        for y in 0..plane.height() {
            let mut row_sums = [0u64; CHANNELS];
            let mut row_squares = 0u64;
            let row = plane.row(0, y, plane.width());

            for x in 0..plane.width() {
                for c in 0..CHANNELS {
                    let v = u64::from(row[x * CHANNELS + c]);
                    row_sums[c] += v;
                    row_squares += v * v;
                }

                let above = y * stride + x + 1;
                let here = above + stride;
                for c in 0..CHANNELS {
                    sums[here][c] = sums[above][c] + row_sums[c];
                }
                squares[here] = squares[above] + row_squares;
            }
        }

        Self {
            stride,
            sums,
            squares,
        }
    }

    pub(crate) fn window(&self, x: usize, y: usize, width: usize, height: usize) -> WindowStats {
        let top_left = y * self.stride + x;
        let top_right = top_left + width;
        let bottom_left = top_left + height * self.stride;
        let bottom_right = bottom_left + width;

        let mut sums = [0u64; CHANNELS];
        for (c, sum) in sums.iter_mut().enumerate() {
            *sum = (self.sums[bottom_right][c] + self.sums[top_left][c])
                - (self.sums[top_right][c] + self.sums[bottom_left][c]);
        }
        let squares = (self.squares[bottom_right] + self.squares[top_left])
            - (self.squares[top_right] + self.squares[bottom_left]);

        WindowStats { sums, squares }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn ramp(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 10) as u8, (y * 20) as u8, ((x + y) * 3) as u8, 255])
        })
    }

    #[test]
    fn test_from_rgba_drops_alpha() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([1, 2, 3, 4]));
        let plane = Plane::from_rgba(&image);
        assert_eq!(plane.samples(), &[1, 2, 3, 1, 2, 3]);
        assert_eq!(plane.row(1, 0, 1), &[1, 2, 3]);
    }

    #[test]
    fn test_downsample_box_filter_rounds() {
        let image = RgbaImage::from_fn(2, 2, |x, y| {
            let v = [0u8, 1, 1, 1][(y * 2 + x) as usize];
            Rgba([v, 255, 10 * v, 255])
        });
        let half = Plane::from_rgba(&image).downsample().unwrap();
        assert_eq!((half.width(), half.height()), (1, 1));
        // (0 + 1 + 1 + 1 + 2) / 4 = 1, (0 + 30 + 2) / 4 = 8
        assert_eq!(half.samples(), &[1, 255, 8]);
    }

    #[test]
    fn test_downsample_odd_sizes_truncate() {
        let plane = Plane::from_rgba(&ramp(7, 5));
        let half = plane.downsample().unwrap();
        assert_eq!((half.width(), half.height()), (3, 2));
        assert!(Plane::from_rgba(&ramp(1, 9)).downsample().is_none());
    }

    #[test]
    fn test_integral_window_matches_direct_sum() {
        let plane = Plane::from_rgba(&ramp(9, 7));
        let integral = IntegralPlane::new(&plane);

        let (x, y, w, h) = (2, 3, 4, 3);
        let mut expected = WindowStats::default();
        for row in y..y + h {
            for (i, &v) in plane.row(x, row, w).iter().enumerate() {
                let v = u64::from(v);
                expected.sums[i % CHANNELS] += v;
                expected.squares += v * v;
            }
        }

        assert_eq!(integral.window(x, y, w, h), expected);
        assert_eq!(integral.window(0, 0, 9, 7).sums[0], (0..9).map(|x| x * 10).sum::<u64>() * 7);
    }
}
