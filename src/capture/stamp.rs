//! Turns a raw camera frame into the stamped check-in photo.
//!
//! The webview hands the frame over exactly as the camera produced it; all
//! pixel work happens here so the persisted photo never depends on canvas
//! behavior. The frame is normalized to a standard width, mirrored back into
//! the selfie orientation the user saw, and the capture timestamp is burned
//! into a darkened label in the bottom-left corner.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

use super::glyphs;
use crate::utils::data_url;

/// Frames wider than this are downscaled before stamping.
pub const STANDARD_WIDTH: u32 = 1280;

const JPEG_QUALITY: u8 = 95;
const TEXT_SCALE: u32 = 2;

// Label geometry, anchored to the bottom-left corner: box at x=10 spanning
// the text plus 10 px padding each side, 50 px tall with its top 60 px above
// the bottom edge; glyph bottoms sit 25 px above the bottom edge.
const BOX_LEFT: u32 = 10;
const BOX_HEIGHT: u32 = 50;
const BOX_BOTTOM_OFFSET: u32 = 60;
const TEXT_LEFT: u32 = 20;
const TEXT_BASELINE_OFFSET: u32 = 25;

pub struct StampedPhoto {
    pub jpeg: Vec<u8>,
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Decode a raw frame (`data:image/...;base64,` URL), stamp it, and encode
/// the result as JPEG.
pub fn stamp_frame(frame: &str, captured_at: DateTime<Local>) -> Result<StampedPhoto> {
    let (_, bytes) = data_url::decode(frame).context("invalid frame payload")?;
    let decoded = image::load_from_memory(&bytes).context("frame is not a decodable image")?;

    let mut canvas = normalize_width(decoded).fliph().to_rgb8();
    let label = captured_at.format("%Y-%m-%d %H:%M:%S").to_string();
    darken_label_box(&mut canvas, glyphs::text_width(&label, TEXT_SCALE));
    draw_label_text(&mut canvas, &label);

    let (width, height) = canvas.dimensions();
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    encoder
        .encode_image(&canvas)
        .context("jpeg encode failed")?;

    let data_url = data_url::encode_jpeg(&jpeg);
    Ok(StampedPhoto {
        jpeg,
        data_url,
        width,
        height,
    })
}

fn normalize_width(img: DynamicImage) -> DynamicImage {
    if img.width() <= STANDARD_WIDTH {
        return img;
    }
    let height = ((img.height() as u64 * STANDARD_WIDTH as u64) / img.width() as u64).max(1) as u32;
    img.resize_exact(STANDARD_WIDTH, height, FilterType::Triangle)
}

/// 50% black overlay behind the label, clipped to the frame.
fn darken_label_box(canvas: &mut RgbImage, text_width: u32) {
    let (width, height) = canvas.dimensions();
    let top = height.saturating_sub(BOX_BOTTOM_OFFSET);
    let bottom = (top + BOX_HEIGHT).min(height);
    let left = BOX_LEFT.min(width);
    let right = (BOX_LEFT + text_width + 2 * (TEXT_LEFT - BOX_LEFT)).min(width);

    for y in top..bottom {
        for x in left..right {
            let px = canvas.get_pixel_mut(x, y);
            px.0 = [px.0[0] / 2, px.0[1] / 2, px.0[2] / 2];
        }
    }
}

fn draw_label_text(canvas: &mut RgbImage, text: &str) {
    let (width, height) = canvas.dimensions();
    let glyph_height = glyphs::GLYPH_HEIGHT * TEXT_SCALE;
    let top = height.saturating_sub(TEXT_BASELINE_OFFSET + glyph_height);

    let mut pen_x = TEXT_LEFT;
    for c in text.chars() {
        if let Some(rows) = glyphs::glyph(c) {
            for (row_idx, row) in rows.iter().enumerate() {
                for bit in 0..glyphs::GLYPH_WIDTH {
                    if row & (0x80 >> bit) == 0 {
                        continue;
                    }
                    fill_block(
                        canvas,
                        pen_x + bit * TEXT_SCALE,
                        top + row_idx as u32 * TEXT_SCALE,
                        width,
                        height,
                    );
                }
            }
        }
        pen_x += glyphs::GLYPH_WIDTH * TEXT_SCALE;
    }
}

fn fill_block(canvas: &mut RgbImage, x0: u32, y0: u32, width: u32, height: u32) {
    for dy in 0..TEXT_SCALE {
        for dx in 0..TEXT_SCALE {
            let (x, y) = (x0 + dx, y0 + dy);
            if x < width && y < height {
                canvas.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
    }
}
