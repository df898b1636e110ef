//! Video frame buffer and payload codecs
//!
//! A [`Frame`] is a fixed-size, row-major, 3-channel RGB byte buffer.
//! Frames arrive from clients as encoded images (JPEG/PNG), either raw or
//! base64-encoded, optionally wrapped in a `data:` URL as produced by
//! `canvas.toDataURL()`.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use thiserror::Error;

/// A video frame: height × width × 3 bytes, row-major RGB.
pub type Frame = RgbImage;

/// Errors from decoding or encoding frame payloads
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("empty frame payload")]
    Empty,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("decoded frame has zero size")]
    ZeroSize,
}

/// Decode a base64 (or `data:` URL) encoded image into a frame
pub fn decode_base64(data: &str) -> Result<Frame, FrameError> {
    let data = data.trim();
    // Strip "data:image/jpeg;base64," style prefixes
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    if payload.is_empty() {
        return Err(FrameError::Empty);
    }
    let bytes = STANDARD.decode(payload)?;
    decode_bytes(&bytes)
}

/// Decode an encoded image (any format the `image` crate can sniff) into a frame
pub fn decode_bytes(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::Empty);
    }
    let frame = image::load_from_memory(bytes)?.to_rgb8();
    if frame.width() == 0 || frame.height() == 0 {
        return Err(FrameError::ZeroSize);
    }
    Ok(frame)
}

/// Encode a frame as JPEG and return it base64-encoded
pub fn encode_jpeg_base64(frame: &Frame, quality: u8) -> Result<String, FrameError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality.clamp(1, 100));
    frame.write_with_encoder(encoder)?;
    Ok(STANDARD.encode(&buf))
}

/// Single-channel brightness of one RGB sample (ITU-R BT.601 luma)
#[inline]
pub fn luma_of(pixel: [u8; 3]) -> u8 {
    // 0.299 R + 0.587 G + 0.114 B in 14-bit fixed point, rounded
    let [r, g, b] = pixel;
    ((r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192) >> 14) as u8
}

/// Brightness plane of a frame, row-major, one byte per pixel
pub fn luma(frame: &Frame) -> Vec<u8> {
    frame.pixels().map(|p| luma_of(p.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn png_bytes(frame: &Frame) -> Vec<u8> {
        let mut buf = Vec::new();
        frame
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_decode_png_bytes() {
        let frame = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let decoded = decode_bytes(&png_bytes(&frame)).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(2, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_data_url() {
        let frame = RgbImage::from_pixel(2, 2, Rgb([200, 0, 0]));
        let url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(&frame)));
        let decoded = decode_base64(&url).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([200, 0, 0]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_base64(""), Err(FrameError::Empty)));
        assert!(matches!(decode_base64("@@not base64@@"), Err(FrameError::Base64(_))));
        let not_an_image = STANDARD.encode(b"definitely not an image");
        assert!(matches!(decode_base64(&not_an_image), Err(FrameError::Image(_))));
    }

    #[test]
    fn test_jpeg_encode_produces_decodable_output() {
        let frame = RgbImage::from_pixel(8, 8, Rgb([128, 128, 128]));
        let encoded = encode_jpeg_base64(&frame, 80).unwrap();
        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma_of([0, 0, 0]), 0);
        assert_eq!(luma_of([255, 255, 255]), 255);
        assert_eq!(luma_of([255, 0, 0]), 76);
        assert_eq!(luma_of([0, 255, 0]), 150);
        assert_eq!(luma_of([0, 0, 255]), 29);
    }
}
