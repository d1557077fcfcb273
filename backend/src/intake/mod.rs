mod fetch;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageFormat;

use crate::config::IntakeConfig;

const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Image too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: usize },
    #[error("Failed to fetch image: {0}")]
    Fetch(String),
}

/// An image re-encoded as RGB JPEG with its longest side bounded.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_format: ImageFormat,
    pub source_bytes: usize,
}

impl NormalizedImage {
    pub fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }
}

#[derive(Clone)]
pub struct ImageIntake {
    config: IntakeConfig,
    client: reqwest::Client,
}

impl ImageIntake {
    pub fn new(config: IntakeConfig) -> Result<Self, IntakeError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| IntakeError::Fetch(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn max_image_bytes(&self) -> usize {
        self.config.max_image_bytes
    }

    pub fn check_size(&self, size: u64) -> Result<(), IntakeError> {
        if size > self.config.max_image_bytes as u64 {
            return Err(IntakeError::TooLarge {
                size,
                limit: self.config.max_image_bytes,
            });
        }
        Ok(())
    }

    /// Validates an in-memory image and normalizes it for the model.
    pub fn from_bytes(
        &self,
        image_data: &[u8],
        declared_type: Option<&str>,
    ) -> Result<NormalizedImage, IntakeError> {
        self.check_size(image_data.len() as u64)?;

        if let Some(content_type) = declared_type.and_then(normalize_content_type) {
            if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
                return Err(IntakeError::UnsupportedFormat(content_type));
            }
        }

        let format = image::guess_format(image_data)
            .map_err(|_| IntakeError::UnsupportedFormat("unrecognized image data".into()))?;
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP) {
            return Err(IntakeError::UnsupportedFormat(format!("{:?}", format)));
        }

        let mut decoded = image::load_from_memory_with_format(image_data, format)
            .map_err(|e| IntakeError::UnsupportedFormat(format!("failed to decode image: {}", e)))?;
        log::debug!(
            "Image before normalization: {}x{} {:?} {:?}, {} bytes",
            decoded.width(),
            decoded.height(),
            format,
            decoded.color(),
            image_data.len()
        );

        let max = self.config.max_dimension;
        if decoded.width() > max || decoded.height() > max {
            decoded = decoded.resize(max, max, FilterType::Lanczos3);
        }
        let rgb = decoded.to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.config.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| IntakeError::UnsupportedFormat(format!("failed to encode image: {}", e)))?;

        let (width, height) = rgb.dimensions();
        log::debug!(
            "Image after normalization: {}x{} Jpeg Rgb8, {} bytes",
            width,
            height,
            jpeg.len()
        );

        Ok(NormalizedImage {
            jpeg,
            width,
            height,
            source_format: format,
            source_bytes: image_data.len(),
        })
    }
}

/// Lowercased media type without parameters. Generic binary types count as undeclared.
fn normalize_content_type(raw: &str) -> Option<String> {
    let media_type = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if media_type.is_empty() || media_type == "application/octet-stream" {
        None
    } else {
        Some(media_type)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
    use std::io::{Cursor, Read, Write};
    use std::net::{TcpListener, TcpStream};

    pub(crate) fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 255) as u8, (y % 255) as u8, 90]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    pub(crate) fn intake() -> ImageIntake {
        ImageIntake::new(IntakeConfig::default()).unwrap()
    }

    /// Accepts one connection on a local port, reads the request head and hands
    /// the stream to `respond`. Returns the URL to fetch.
    pub(crate) fn serve_once<F>(respond: F) -> String
    where
        F: FnOnce(&mut TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            respond(&mut stream);
        });
        format!("http://{}/image", addr)
    }

    pub(crate) fn http_response(
        status: &str,
        content_type: &str,
        body: &[u8],
    ) -> impl FnOnce(&mut TcpStream) + Send + 'static {
        let mut raw = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(body);
        move |stream| {
            let _ = stream.write_all(&raw);
        }
    }

    #[test]
    fn accepts_png_and_reencodes_as_jpeg() {
        let png = encoded(32, 16, ImageFormat::Png);
        let image = intake().from_bytes(&png, Some("image/png")).unwrap();
        assert_eq!((image.width, image.height), (32, 16));
        assert_eq!(image.source_format, ImageFormat::Png);
        assert_eq!(image::guess_format(&image.jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn downscales_preserving_aspect_ratio() {
        let png = encoded(2048, 1024, ImageFormat::Png);
        let image = intake().from_bytes(&png, None).unwrap();
        assert_eq!((image.width, image.height), (1024, 512));
    }

    #[test]
    fn converts_alpha_images_to_rgb() {
        let img = RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut buf, ImageFormat::Png).unwrap();
        let image = intake().from_bytes(buf.get_ref(), Some("image/png")).unwrap();
        let decoded = image::load_from_memory(&image.jpeg).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn rejects_oversized_buffers_before_decoding() {
        let intake = ImageIntake::new(IntakeConfig {
            max_image_bytes: 16,
            ..IntakeConfig::default()
        })
        .unwrap();
        let err = intake.from_bytes(&[0u8; 17], None).unwrap_err();
        assert!(matches!(err, IntakeError::TooLarge { size: 17, limit: 16 }));
    }

    #[test]
    fn rejects_disallowed_declared_type() {
        let png = encoded(4, 4, ImageFormat::Png);
        let err = intake().from_bytes(&png, Some("image/gif")).unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedFormat(t) if t == "image/gif"));
    }

    #[test]
    fn rejects_disallowed_sniffed_format() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        let err = intake().from_bytes(gif, Some("application/octet-stream")).unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_undecodable_bytes() {
        let err = intake().from_bytes(b"definitely not an image", None).unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedFormat(_)));

        let mut truncated = encoded(64, 64, ImageFormat::Png);
        truncated.truncate(40);
        let err = intake().from_bytes(&truncated, Some("image/png")).unwrap_err();
        assert!(matches!(err, IntakeError::UnsupportedFormat(_)));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            normalize_content_type("Image/JPEG; charset=binary"),
            Some("image/jpeg".to_string())
        );
        assert_eq!(normalize_content_type("application/octet-stream"), None);
        assert_eq!(normalize_content_type(""), None);
    }
}
