//! File-backed frame source
//!
//! Serves still images as frames so the pipeline can run without camera
//! hardware. A single image repeats for every request; a directory is
//! served in sorted order, with the final still repeating once the
//! directory is exhausted.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::capture::frame::Frame;
use crate::capture::FrameSource;
use crate::error::ScanError;

/// Image extensions accepted when scanning a directory of stills
const STILL_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Frame source backed by decoded image files
pub struct FileSource {
    frames: Vec<Frame>,
    cursor: usize,
}

impl FileSource {
    /// Open a single image or a directory of stills.
    ///
    /// All images are decoded up front so a bad file is reported before a
    /// scan starts instead of mid-window.
    pub fn open(path: &Path) -> Result<Self> {
        let paths = collect_still_paths(path)?;
        let mut frames = Vec::with_capacity(paths.len());
        for still in &paths {
            let img = image::open(still)
                .with_context(|| format!("Failed to load still: {:?}", still))?
                .to_rgba8();
            let (width, height) = img.dimensions();
            debug!("loaded still {:?} ({}x{})", still, width, height);
            frames.push(Frame::new(img.into_raw(), width, height));
        }
        info!("file source ready: {} still(s) from {:?}", frames.len(), path);
        Ok(Self { frames, cursor: 0 })
    }
}

#[async_trait]
impl FrameSource for FileSource {
    async fn next_frame(&mut self) -> Result<Frame, ScanError> {
        let Some(frame) = self.frames.get(self.cursor) else {
            return Err(ScanError::SourceUnavailable("no stills loaded".to_string()));
        };
        if self.cursor + 1 < self.frames.len() {
            self.cursor += 1;
        }
        Ok(frame.clone())
    }
}

/// Resolve the ordered list of image paths behind a source path
fn collect_still_paths(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path)
        .with_context(|| format!("Failed to read stills directory: {:?}", path))?;

    let mut stills: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| STILL_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    stills.sort();

    if stills.is_empty() {
        anyhow::bail!("No image files found in {:?}", path);
    }
    Ok(stills)
}
