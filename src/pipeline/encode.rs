//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! Vision APIs take images as base64 data embedded in the JSON request.
//! PNG keeps rendered text crisp; JPEG artefacts on small print confuse the
//! model.

use crate::error::RowError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64 PNG attachment.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Encode every page, consuming the bitmaps so each one is freed as soon as
/// its PNG exists.
pub fn encode_pages(images: Vec<DynamicImage>) -> Result<Vec<ImageData>, RowError> {
    let mut encoded = Vec::with_capacity(images.len());
    for (idx, img) in images.into_iter().enumerate() {
        let data = encode_page(&img).map_err(|e| RowError::EncodeFailed {
            page: idx + 1,
            detail: e.to_string(),
        })?;
        drop(img);
        encoded.push(data);
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let data = encode_page(&red_square()).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn encode_pages_keeps_order_and_count() {
        let encoded = encode_pages(vec![red_square(), red_square(), red_square()]).unwrap();
        assert_eq!(encoded.len(), 3);
    }
}
