//! Circular avatar cropping

use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use tracing::info;

use crate::error::Result;

/// Crop to the top-left `min(w, h)` square and clear everything outside
/// the inscribed circle.
pub fn crop_to_circle(img: &DynamicImage) -> RgbaImage {
    let (width, height) = img.dimensions();
    let size = width.min(height);
    let rgba = img.to_rgba8();

    let radius = size as f64 / 2.0;
    let mut out = RgbaImage::new(size, size);

    for y in 0..size {
        for x in 0..size {
            // Sample at the pixel centre
            let dx = x as f64 + 0.5 - radius;
            let dy = y as f64 + 0.5 - radius;
            let pixel = if dx * dx + dy * dy <= radius * radius {
                *rgba.get_pixel(x, y)
            } else {
                Rgba([0, 0, 0, 0])
            };
            out.put_pixel(x, y, pixel);
        }
    }

    out
}

/// Read `input`, crop it and write a PNG to `output`
pub fn crop_file(input: &Path, output: &Path) -> Result<()> {
    let img = image::open(input)?;
    let cropped = crop_to_circle(&img);
    cropped.save_with_format(output, ImageFormat::Png)?;
    info!("Circular cropped image saved as {}", output.display());
    Ok(())
}
