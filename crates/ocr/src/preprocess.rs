use image::{imageops::FilterType, DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Longest edge kept for OCR; larger photos are scaled down.
const MAX_EDGE: u32 = 2800;
/// Label text photographed from a distance is tiny; short edges below this get scaled up.
const MIN_EDGE: u32 = 1000;
/// Fraction of darkest/brightest pixels ignored when stretching contrast.
const CLIP_FRACTION: f32 = 0.01;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Decode a label photo (JPEG / PNG / WEBP / …) and return grayscale,
/// contrast-stretched PNG bytes ready for OCR.
pub fn prepare_label_image(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_png(DynamicImage::ImageLuma8(stretch_contrast(&rescale(img).to_luma8())))
}

fn rescale(img: DynamicImage) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return img;
    }
    if w.max(h) > MAX_EDGE {
        img.resize(MAX_EDGE, MAX_EDGE, FilterType::Lanczos3)
    } else if w.min(h) < MIN_EDGE {
        let scale = (MIN_EDGE as f32 / w.min(h) as f32).min(MAX_EDGE as f32 / w.max(h) as f32);
        if scale <= 1.0 {
            return img;
        }
        let nw = (w as f32 * scale).round() as u32;
        let nh = (h as f32 * scale).round() as u32;
        img.resize_exact(nw, nh, FilterType::CatmullRom)
    } else {
        img
    }
}

/// Linear stretch between the 1st and 99th luminance percentiles.
fn stretch_contrast(gray: &GrayImage) -> GrayImage {
    let mut histogram = [0u32; 256];
    for p in gray.pixels() {
        histogram[p[0] as usize] += 1;
    }

    let total = gray.width() as u64 * gray.height() as u64;
    let clip = (total as f32 * CLIP_FRACTION) as u64;
    let (low, high) = percentile_bounds(&histogram, clip);

    if high <= low {
        // Flat image, nothing to stretch.
        return gray.clone();
    }

    let range = (high - low) as u32;
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0].clamp(low, high);
        Luma([((p - low) as u32 * 255 / range) as u8])
    })
}

fn percentile_bounds(histogram: &[u32; 256], clip: u64) -> (u8, u8) {
    let mut seen = 0u64;
    let mut low = 0u8;
    for (value, count) in histogram.iter().enumerate() {
        seen += *count as u64;
        if seen > clip {
            low = value as u8;
            break;
        }
    }

    seen = 0;
    let mut high = 255u8;
    for (value, count) in histogram.iter().enumerate().rev() {
        seen += *count as u64;
        if seen > clip {
            high = value as u8;
            break;
        }
    }
    (low, high)
}

fn encode_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
