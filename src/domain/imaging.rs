//! Image normalization: decode, fix orientation, resize on the shorter side,
//! re-encode.
//!
//! Embedding models are sensitive to resize quality, so resizing always uses
//! Lanczos3 and the shorter side lands exactly on the target.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

use crate::domain::{DomainError, Result};

pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";
/// Longest output side a resize may produce unless configured otherwise.
pub const DEFAULT_MAX_SIDE: u32 = 4096;
const JPEG_QUALITY: u8 = 90;

/// When to resample an image towards the target shorter side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePolicy {
    /// Always land on the target, upscaling when needed.
    Always,
    /// Only resize when the shorter side is below the target.
    UpscaleOnly,
    /// Keep the decoded dimensions.
    Never,
}

/// Target shorter side, when to apply it, and how large the result may get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub target: u32,
    pub policy: ResizePolicy,
    /// Upper bound on the longer output side. Extreme aspect ratios would
    /// otherwise upscale without limit.
    pub max_side: u32,
}

impl Resize {
    /// Keep decoded dimensions.
    pub const NONE: Resize = Resize {
        target: 0,
        policy: ResizePolicy::Never,
        max_side: u32::MAX,
    };

    pub fn new(target: u32, policy: ResizePolicy) -> Self {
        Self {
            target,
            policy,
            max_side: DEFAULT_MAX_SIDE,
        }
    }

    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side;
        self
    }
}

/// Encodings the normalizer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// A decoded, orientation-corrected and possibly resized bitmap.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    image: DynamicImage,
}

impl NormalizedImage {
    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn encode(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel.
                let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
                DynamicImage::ImageRgb8(self.image.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(|e| DomainError::internal(format!("jpeg encode failed: {e}")))?;
            }
            OutputFormat::Png => {
                let encoder = PngEncoder::new(&mut buf);
                self.image
                    .write_with_encoder(encoder)
                    .map_err(|e| DomainError::internal(format!("png encode failed: {e}")))?;
            }
        }
        Ok(buf)
    }

    pub fn to_jpeg(&self) -> Result<Vec<u8>> {
        self.encode(OutputFormat::Jpeg)
    }

    /// JPEG bytes as a `data:image/jpeg;base64,` URI for JSON embedding requests.
    pub fn to_data_uri(&self) -> Result<String> {
        Ok(jpeg_data_uri(&self.to_jpeg()?))
    }
}

pub fn jpeg_data_uri(jpeg: &[u8]) -> String {
    format!("{JPEG_DATA_URI_PREFIX}{}", STANDARD.encode(jpeg))
}

/// Decodes a base64 payload, dropping any `data:<mime>;base64,` prefix.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    let input = input.trim();
    let payload = match input.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| DomainError::decode("data URI is not base64 encoded"))?,
        None => input,
    };
    Ok(STANDARD.decode(payload)?)
}

/// Decodes image bytes and applies the EXIF orientation unconditionally.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DomainError::decode(e.to_string()))?
        .into_decoder()?;
    let orientation = decoder.orientation()?;

    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);

    if image.width() == 0 || image.height() == 0 {
        return Err(DomainError::decode("image has no pixels"));
    }
    Ok(image)
}

/// Dimensions whose shorter side equals `target`, aspect ratio preserved.
pub fn target_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale = |long: u32, short: u32| -> u32 {
        let scaled = f64::from(long) * f64::from(target) / f64::from(short);
        scaled.round().max(1.0) as u32
    };

    if width <= height {
        (target, scale(height, width))
    } else {
        (scale(width, height), target)
    }
}

/// Resamples `image` per `spec`. Fails with a decode error, before any
/// pixels are allocated, when the result would exceed `spec.max_side`.
pub fn resize(image: DynamicImage, spec: Resize) -> Result<DynamicImage> {
    let shorter = image.width().min(image.height());
    let wanted = match spec.policy {
        ResizePolicy::Always => shorter != spec.target,
        ResizePolicy::UpscaleOnly => shorter < spec.target,
        ResizePolicy::Never => false,
    };
    if !wanted {
        return Ok(image);
    }

    let (width, height) = target_dimensions(image.width(), image.height(), spec.target);
    if width.max(height) > spec.max_side {
        return Err(DomainError::decode(format!(
            "{}x{} image would resize to {width}x{height}, over the {} pixel side limit",
            image.width(),
            image.height(),
            spec.max_side
        )));
    }
    Ok(image.resize_exact(width, height, FilterType::Lanczos3))
}

pub fn normalize(bytes: &[u8], spec: Resize) -> Result<NormalizedImage> {
    let image = decode(bytes)?;
    Ok(NormalizedImage {
        image: resize(image, spec)?,
    })
}

pub fn normalize_base64(input: &str, spec: Resize) -> Result<NormalizedImage> {
    normalize(&decode_base64(input)?, spec)
}


#[cfg(test)]
mod tests {
    use super::fixtures::solid_png;
    use super::*;

    #[test]
    fn test_landscape_target_dimensions() {
        assert_eq!(target_dimensions(800, 600, 224), (299, 224));
    }

    #[test]
    fn test_portrait_and_square_target_dimensions() {
        assert_eq!(target_dimensions(600, 800, 224), (224, 299));
        assert_eq!(target_dimensions(500, 500, 224), (224, 224));
        assert_eq!(target_dimensions(100, 50, 224), (448, 224));
    }

    #[test]
    fn test_resize_invariant_holds() {
        for (w, h) in [(800, 600), (333, 1000), (97, 61), (224, 224), (1280, 230)] {
            let normalized = normalize(&solid_png(w, h, [10, 20, 30]), Resize::new(224, ResizePolicy::Always))
                .unwrap();
            let (nw, nh) = (normalized.width(), normalized.height());

            assert_eq!(nw.min(nh), 224, "{w}x{h} -> {nw}x{nh}");
            let expected = f64::from(w) / f64::from(h) * f64::from(nh);
            assert!((f64::from(nw) - expected).abs() <= 1.0, "{w}x{h} -> {nw}x{nh}");
        }
    }

    #[test]
    fn test_upscale_only_keeps_large_images() {
        let normalized =
            normalize(&solid_png(800, 600, [0, 0, 0]), Resize::new(224, ResizePolicy::UpscaleOnly)).unwrap();
        assert_eq!((normalized.width(), normalized.height()), (800, 600));

        let normalized =
            normalize(&solid_png(100, 50, [0, 0, 0]), Resize::new(224, ResizePolicy::UpscaleOnly)).unwrap();
        assert_eq!((normalized.width(), normalized.height()), (448, 224));
    }

    #[test]
    fn test_extreme_aspect_ratio_is_rejected_before_resampling() {
        assert_eq!(target_dimensions(1, 3000, 224), (224, 672_000));

        let err = normalize(&solid_png(1, 3000, [9, 9, 9]), Resize::new(224, ResizePolicy::UpscaleOnly))
            .unwrap_err();
        assert!(matches!(err, DomainError::Decode(_)));

        let err = normalize(&solid_png(3000, 1, [9, 9, 9]), Resize::new(224, ResizePolicy::Always))
            .unwrap_err();
        assert!(matches!(err, DomainError::Decode(_)));
    }

    #[test]
    fn test_max_side_is_configurable() {
        let spec = Resize::new(224, ResizePolicy::UpscaleOnly).with_max_side(500);
        let normalized = normalize(&solid_png(100, 200, [1, 1, 1]), spec).unwrap();
        assert_eq!((normalized.width(), normalized.height()), (224, 448));

        let err = normalize(&solid_png(100, 300, [1, 1, 1]), spec).unwrap_err();
        assert!(matches!(err, DomainError::Decode(_)));

        // nothing to resample, so the limit does not apply
        let wide = normalize(&solid_png(1, 3000, [1, 1, 1]), Resize::NONE).unwrap();
        assert_eq!((wide.width(), wide.height()), (1, 3000));
    }

    #[test]
    fn test_never_keeps_dimensions() {
        let normalized = normalize(&solid_png(40, 30, [1, 2, 3]), Resize::new(224, ResizePolicy::Never)).unwrap();
        assert_eq!((normalized.width(), normalized.height()), (40, 30));
    }

    #[test]
    fn test_base64_with_and_without_prefix() {
        let png = solid_png(8, 4, [255, 0, 0]);
        let plain = STANDARD.encode(&png);
        let prefixed = format!("data:image/png;base64,{plain}");

        assert_eq!(decode_base64(&plain).unwrap(), png);
        assert_eq!(decode_base64(&prefixed).unwrap(), png);
    }

    #[test]
    fn test_data_uri_round_trips_through_normalizer() {
        let normalized = normalize(&solid_png(300, 300, [0, 128, 0]), Resize::new(224, ResizePolicy::Always))
            .unwrap();
        let uri = normalized.to_data_uri().unwrap();
        assert!(uri.starts_with(JPEG_DATA_URI_PREFIX));

        let again = normalize_base64(&uri, Resize::new(224, ResizePolicy::Never)).unwrap();
        assert_eq!((again.width(), again.height()), (224, 224));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let err = normalize(b"definitely not an image", Resize::new(224, ResizePolicy::Always)).unwrap_err();
        assert!(matches!(err, DomainError::Decode(_)));

        let err = normalize_base64("!!!not-base64!!!", Resize::new(224, ResizePolicy::Always)).unwrap_err();
        assert!(matches!(err, DomainError::Decode(_)));
    }

    #[test]
    fn test_png_output_keeps_format() {
        let normalized = normalize(&solid_png(10, 10, [5, 5, 5]), Resize::new(20, ResizePolicy::Always)).unwrap();
        let png = normalized.encode(OutputFormat::Png).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(OutputFormat::from_content_type("image/png"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_content_type("text/plain"), None);
    }
}
