//! Detection overlay rendering
//!
//! Draws classifier detections onto a frame for operator display and for
//! the composited evidence still. Rendering is a presentation concern: it
//! never feeds back into the decision, and a rendering problem degrades
//! the artifact instead of touching the verdict.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::error;

use crate::capture::frame::Frame;
use crate::vision::classifier::Detection;

/// Detection box color
const BOX_COLOR: Rgba<u8> = Rgba([255, 255, 255, 230]);
/// Detection box line width in pixels
const BOX_LINE_WIDTH: u32 = 3;

/// Composite a frame with boxes for each detection.
///
/// A malformed frame produces an un-annotated black canvas rather than an
/// error.
pub fn annotate(frame: &Frame, detections: &[Detection]) -> RgbaImage {
    let mut canvas = frame
        .to_rgba_image()
        .unwrap_or_else(|| RgbaImage::new(frame.width.max(1), frame.height.max(1)));
    for detection in detections {
        draw_detection(&mut canvas, detection);
    }
    canvas
}

/// Encode a canvas as a PNG artifact
pub fn encode_png(canvas: &RgbaImage) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    canvas.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Render and encode the evidence still for a flagged frame.
///
/// A positive verdict always carries a non-empty image: if PNG encoding of
/// the annotated canvas fails, the raw frame bytes stand in.
pub fn encode_evidence(frame: &Frame, detections: &[Detection]) -> Vec<u8> {
    let canvas = annotate(frame, detections);
    match encode_png(&canvas) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!("failed to encode evidence still: {err:#}");
            frame.data.clone()
        }
    }
}

/// Draw one detection box, clamped to the canvas
fn draw_detection(canvas: &mut RgbaImage, detection: &Detection) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let (bx, by, bw, bh) = detection.bbox;

    let x = (bx.max(0.0) as u32).min(canvas_w.saturating_sub(1));
    let y = (by.max(0.0) as u32).min(canvas_h.saturating_sub(1));
    let w = (bw.max(1.0) as u32).min(canvas_w - x);
    let h = (bh.max(1.0) as u32).min(canvas_h - y);

    // Nested 1px rectangles give the line its width
    for inset in 0..BOX_LINE_WIDTH {
        if w <= inset * 2 || h <= inset * 2 {
            break;
        }
        let rect = Rect::at((x + inset) as i32, (y + inset) as i32)
            .of_size(w - inset * 2, h - inset * 2);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
    }
}
