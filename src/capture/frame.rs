//! Frame data structures for captured camera content

use std::time::Instant;

/// A single frame pulled from the video source
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp when the frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Create a new frame from raw RGBA data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// View the frame as an `image` RGBA buffer.
    ///
    /// Returns `None` when the byte length does not match the dimensions.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dimensions() {
        let frame = Frame::new(vec![0; 4 * 6 * 4], 4, 6);
        assert_eq!(frame.dimensions(), (4, 6));
    }

    #[test]
    fn test_to_rgba_image() {
        let frame = Frame::new(vec![128; 2 * 2 * 4], 2, 2);
        let img = frame.to_rgba_image().unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(1, 1).0, [128, 128, 128, 128]);
    }

    #[test]
    fn test_to_rgba_image_rejects_short_buffer() {
        let frame = Frame::new(vec![0; 7], 2, 2);
        assert!(frame.to_rgba_image().is_none());
    }
}
