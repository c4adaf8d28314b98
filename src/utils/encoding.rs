use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

use crate::utils::errors::ChartError;

/// First eight bytes of every PNG file
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Encode a packed RGB buffer (3 bytes per pixel, row-major) as PNG
pub fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, ChartError> {
    let expected = (width as usize) * (height as usize) * 3;
    let actual = buffer.len();
    let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        ChartError::Encoding(format!(
            "Buffer holds {} bytes, {}x{} RGB needs {}",
            actual, width, height, expected
        ))
    })?;

    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ChartError::Encoding(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// Base64 text for transport on stdout
pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Check the leading magic bytes of a PNG payload
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// Solid canvas of one color, used when nothing else can be drawn
pub fn solid_canvas(width: u32, height: u32, rgb: (u8, u8, u8)) -> Vec<u8> {
    let pixels = (width as usize) * (height as usize);
    let mut buffer = Vec::with_capacity(pixels * 3);
    for _ in 0..pixels {
        buffer.extend_from_slice(&[rgb.0, rgb.1, rgb.2]);
    }
    buffer
}
