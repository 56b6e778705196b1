//! Frame acquisition from the primary display
//! Wraps the screenshots crate behind a seam so the loop can run against doubles

use std::sync::Arc;

use screenshots::Screen;

// Use the image types from screenshots crate to avoid version conflicts
use screenshots::image::RgbaImage;

/// One full-display snapshot. Pixel data is shared, so clones are cheap and
/// an accepted frame can sit in the session while consumers read it.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbaImage>,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Build a frame from raw RGBA bytes; `None` if the buffer does not match
    /// `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, rgba).map(Self::new)
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

/// Capture error types
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No screens found")]
    NoScreen,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Source of display snapshots
pub trait FrameSource: Send {
    /// Grab one snapshot of the whole display
    fn grab(&mut self) -> Result<Frame, CaptureError>;

    /// Physical size of the display being captured, in pixels
    fn screen_size(&mut self) -> Result<(u32, u32), CaptureError>;
}

/// Production source capturing the primary monitor
pub struct ScreenGrabber;

impl ScreenGrabber {
    pub fn new() -> Self {
        Self
    }

    fn primary_screen() -> Result<Screen, CaptureError> {
        let screens = Screen::all()?;
        screens.first().cloned().ok_or(CaptureError::NoScreen)
    }
}

impl Default for ScreenGrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for ScreenGrabber {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        let primary = Self::primary_screen()?;
        // Returns an ImageBuffer<Rgba<u8>, Vec<u8>>
        let image = primary.capture()?;
        Ok(Frame::new(image))
    }

    fn screen_size(&mut self) -> Result<(u32, u32), CaptureError> {
        let primary = Self::primary_screen()?;
        Ok((primary.display_info.width, primary.display_info.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_validates_length() {
        let frame = Frame::from_raw(2, 2, vec![0u8; 16]);
        assert!(frame.is_some());
        let frame = frame.unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);

        assert!(Frame::from_raw(2, 2, vec![0u8; 15]).is_none());
    }

    #[test]
    fn test_clone_shares_pixels() {
        let frame = Frame::from_raw(4, 4, vec![128u8; 64]).unwrap();
        let copy = frame.clone();
        assert!(Arc::ptr_eq(&frame.image, &copy.image));
    }
}
