//! Image encoding: [`RawImage`] → base64 [`EncodedImage`] for the data URI.
//!
//! Vision chat APIs accept images as base64 data-URIs embedded in the JSON
//! request body. JPEG, PNG, GIF and WebP go through byte-for-byte; anything
//! else a phone or scanner might hand us (BMP, TIFF) is decoded and
//! re-encoded as lossless PNG so the price digits stay crisp. All staging
//! happens in owned buffers, so nothing is left behind on any exit path.

use crate::error::ItemError;
use crate::pipeline::input::RawImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::io::Cursor;
use tracing::debug;

/// Media type used when neither the bytes nor the uploader say otherwise.
const FALLBACK_MIME: &str = "image/jpeg";

/// A base64 image ready to embed in a vision request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Standard base64 (with padding), no line breaks.
    pub data: String,
    pub mime_type: String,
}

impl EncodedImage {
    /// `data:<mime>;base64,<data>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Base64-encode raw bytes. Pure; an empty slice yields an empty string.
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Prepare a tag photo for the vision API.
pub fn encode_image(image: &RawImage) -> Result<EncodedImage, ItemError> {
    if image.bytes.is_empty() {
        return Err(ItemError::Encode {
            detail: format!("'{}' is empty", image.name),
        });
    }

    let encoded = match image::guess_format(&image.bytes) {
        Ok(format) if is_passthrough(format) => EncodedImage {
            data: encode_bytes(&image.bytes),
            mime_type: format.to_mime_type().to_string(),
        },
        Ok(format) => transcode_to_png(&image.bytes, format)?,
        // Unrecognised magic: trust the uploader, the API has the final word.
        Err(_) => EncodedImage {
            data: encode_bytes(&image.bytes),
            mime_type: image
                .mime_type
                .clone()
                .unwrap_or_else(|| FALLBACK_MIME.to_string()),
        },
    };

    debug!(
        "Encoded {} → {} bytes base64 ({})",
        image.name,
        encoded.data.len(),
        encoded.mime_type
    );
    Ok(encoded)
}

fn is_passthrough(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP
    )
}

fn transcode_to_png(bytes: &[u8], format: ImageFormat) -> Result<EncodedImage, ItemError> {
    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| ItemError::Encode {
        detail: format!("cannot decode {format:?}: {e}"),
    })?;

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ItemError::Encode {
            detail: format!("PNG re-encode failed: {e}"),
        })?;

    Ok(EncodedImage {
        data: encode_bytes(&buf),
        mime_type: "image/png".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn render(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 10, 10])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format)
            .expect("render test image");
        buf
    }

    #[test]
    fn empty_bytes_encode_to_empty_string() {
        assert_eq!(encode_bytes(&[]), "");
    }

    #[test]
    fn encode_bytes_is_standard_base64() {
        assert_eq!(encode_bytes(b"etiqueta"), "ZXRpcXVldGE=");
    }

    #[test]
    fn empty_image_is_an_encode_error() {
        let err = encode_image(&RawImage::new("vazia.jpg", Vec::new())).unwrap_err();
        assert_eq!(err.kind(), "EncodeError");
    }

    #[test]
    fn png_passes_through_unchanged() {
        let bytes = render(ImageFormat::Png);
        let encoded = encode_image(&RawImage::new("tag.png", bytes.clone())).unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&encoded.data).unwrap(), bytes);
    }

    #[test]
    fn jpeg_mime_comes_from_magic_not_name() {
        let bytes = render(ImageFormat::Jpeg);
        let raw = RawImage::new("tag.png", bytes).with_mime_type("image/png");
        let encoded = encode_image(&raw).unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");
        assert!(encoded.data_uri().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn bmp_is_transcoded_to_png() {
        let bytes = render(ImageFormat::Bmp);
        let encoded = encode_image(&RawImage::new("tag.bmp", bytes)).unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        let decoded = STANDARD.decode(&encoded.data).unwrap();
        assert_eq!(image::guess_format(&decoded).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn unknown_bytes_fall_back_to_declared_mime() {
        let raw = RawImage::new("mystery", b"not an image".to_vec()).with_mime_type("image/heic");
        let encoded = encode_image(&raw).unwrap();
        assert_eq!(encoded.mime_type, "image/heic");

        let raw = RawImage::new("mystery", b"not an image".to_vec());
        assert_eq!(encode_image(&raw).unwrap().mime_type, "image/jpeg");
    }
}
