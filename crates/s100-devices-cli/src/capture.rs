//! Headless capture: PNG frames.

use anyhow::{Context, Result};
use s100_devices::video::FrameBuffer;
use std::fs;
use std::path::Path;

/// Save a frame buffer as an 8-bit RGBA PNG.
pub fn save_png(frame: &FrameBuffer, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let w = std::io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, frame.width(), frame.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .context("Failed to write PNG header")?;
    writer
        .write_image_data(&frame.to_rgba8())
        .context("Failed to write PNG data")?;

    log::info!(
        "Wrote {}x{} frame to {}",
        frame.width(),
        frame.height(),
        path.display()
    );
    Ok(())
}
