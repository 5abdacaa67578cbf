use image::RgbaImage;

use crate::error::CaptureError;

/// One full-screen RGBA raster, owned by the tick that captured it.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Supplier of full-screen frames for the match loop.
///
/// Implementations are moved onto the worker thread, hence `Send`. A failed
/// grab only costs the current tick; the loop asks again on the next one.
pub trait FrameSource: Send {
    /// Capture the primary display's full pixel extent.
    fn grab_full_screen(&mut self) -> Result<Frame, CaptureError>;

    /// Pixel extent of the frames this source produces, used to validate a
    /// target before the loop starts.
    fn extent(&mut self) -> Result<(u32, u32), CaptureError> {
        self.grab_full_screen()
            .map(|frame| (frame.width(), frame.height()))
    }
}

/// Primary-monitor capture backed by `xcap`
///
/// # Platform Notes
/// - macOS: requires Screen Recording permission (System Settings > Privacy & Security)
/// - Windows: Windows.Graphics.Capture, no special permissions
/// - Linux: X11 or Wayland portal, performance varies by compositor
///
/// Monitors are enumerated on every grab so a display that was unplugged
/// and reconnected is picked up again without restarting the loop.
#[cfg(feature = "capture")]
#[derive(Debug, Default)]
pub struct ScreenCapture;

#[cfg(feature = "capture")]
impl ScreenCapture {
    pub fn new() -> Self {
        Self
    }

    fn primary_monitor() -> Result<xcap::Monitor, CaptureError> {
        let monitors =
            xcap::Monitor::all().map_err(|err| CaptureError::InitFailed(Box::new(err)))?;

        let mut fallback = None;
        for monitor in monitors {
            if monitor.is_primary().unwrap_or(false) {
                return Ok(monitor);
            }
            if fallback.is_none() {
                fallback = Some(monitor);
            }
        }
        fallback.ok_or(CaptureError::NoDisplays)
    }

    /// Capture pixels per logical pixel of the primary display.
    pub fn scale_factor(&self) -> Result<f64, CaptureError> {
        let monitor = Self::primary_monitor()?;
        let scale = monitor
            .scale_factor()
            .map_err(|err| CaptureError::InitFailed(Box::new(err)))?;
        Ok(f64::from(scale))
    }
}

#[cfg(feature = "capture")]
impl FrameSource for ScreenCapture {
    fn grab_full_screen(&mut self) -> Result<Frame, CaptureError> {
        let monitor = Self::primary_monitor()?;
        let image = monitor
            .capture_image()
            .map_err(|err| CaptureError::CaptureFailed(Box::new(err)))?;
        Ok(Frame::new(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank(u32, u32);

    impl FrameSource for Blank {
        fn grab_full_screen(&mut self) -> Result<Frame, CaptureError> {
            Ok(Frame::new(RgbaImage::new(self.0, self.1)))
        }
    }

    #[test]
    fn test_default_extent_grabs_one_frame() {
        let mut source = Blank(64, 48);
        assert_eq!(source.extent().unwrap(), (64, 48));
    }
}
