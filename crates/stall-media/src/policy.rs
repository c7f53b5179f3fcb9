//! Acceptance rules and normalization for uploaded images.

use std::io::Cursor;

use bytes::Bytes;
use image::{
  DynamicImage, ImageDecoder as _, ImageFormat, ImageReader,
  codecs::jpeg::JpegEncoder, imageops::FilterType, metadata::Orientation,
};

use crate::{Error, MediaConfig, Result};

/// Declared content types an upload may carry.
pub const ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Content type of every normalized image.
pub const OUTPUT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaPolicy {
  pub max_bytes: usize,
  pub max_edge:  u32,
  pub quality:   u8,
}

impl Default for MediaPolicy {
  fn default() -> Self { Self::from_config(&MediaConfig::default()) }
}

/// A re-encoded image ready for upload.
#[derive(Debug, Clone)]
pub struct Normalized {
  pub bytes:        Bytes,
  pub content_type: &'static str,
  pub width:        u32,
  pub height:       u32,
}

impl MediaPolicy {
  pub fn from_config(config: &MediaConfig) -> Self {
    Self {
      max_bytes: config.max_upload_bytes,
      max_edge:  config.max_edge,
      quality:   config.quality.clamp(1, 100),
    }
  }

  /// Reject an upload by its declared type and size, before looking at the
  /// bytes.
  pub fn check(&self, mime: &str, len: usize) -> Result<()> {
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if !ALLOWED_TYPES.contains(&essence.as_str()) {
      return Err(Error::invalid("Invalid file type. Only jpg/png/webp allowed"));
    }
    if len == 0 {
      return Err(Error::invalid("Image is empty"));
    }
    if len > self.max_bytes {
      return Err(Error::invalid(format!(
        "Image too large (max {} bytes)",
        self.max_bytes
      )));
    }
    Ok(())
  }

  /// Decode `raw`, apply its orientation, cap the longest edge at
  /// `max_edge` and re-encode as JPEG at `quality`.
  ///
  /// CPU-bound; call from a blocking context.
  pub fn normalize(&self, raw: &[u8]) -> Result<Normalized> {
    let reader = ImageReader::new(Cursor::new(raw))
      .with_guessed_format()
      .map_err(|e| Error::invalid(format!("Unreadable image: {e}")))?;

    match reader.format() {
      Some(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP) => {}
      _ => return Err(Error::invalid("Image content is not jpg/png/webp")),
    }

    let mut decoder = reader.into_decoder().map_err(undecodable)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(undecodable)?;
    img.apply_orientation(orientation);

    if img.width().max(img.height()) > self.max_edge {
      img = img.resize(self.max_edge, self.max_edge, FilterType::Lanczos3);
    }

    // Encoding from raw RGB pixels carries no metadata across.
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, self.quality)
      .encode_image(&rgb)
      .map_err(|e| Error::invalid(format!("Could not encode image: {e}")))?;

    Ok(Normalized {
      bytes:        Bytes::from(out),
      content_type: OUTPUT_TYPE,
      width:        rgb.width(),
      height:       rgb.height(),
    })
  }
}

fn undecodable(e: image::ImageError) -> Error {
  Error::invalid(format!("Could not decode image: {e}"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::new_rgb8(width, height)
      .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
      .unwrap();
    buf
  }

  #[test]
  fn check_accepts_allowed_types() {
    let policy = MediaPolicy::default();
    assert!(policy.check("image/jpeg", 10).is_ok());
    assert!(policy.check("IMAGE/PNG", 10).is_ok());
    assert!(policy.check("image/webp; q=1", 10).is_ok());
  }

  #[test]
  fn check_rejects_other_types() {
    let policy = MediaPolicy::default();
    assert!(matches!(policy.check("image/gif", 10), Err(Error::InvalidMedia(_))));
    assert!(matches!(policy.check("application/pdf", 10), Err(Error::InvalidMedia(_))));
  }

  #[test]
  fn check_enforces_size_limit() {
    let policy = MediaPolicy { max_bytes: 100, ..MediaPolicy::default() };
    assert!(policy.check("image/png", 100).is_ok());
    assert!(matches!(policy.check("image/png", 101), Err(Error::InvalidMedia(_))));
    assert!(matches!(policy.check("image/png", 0), Err(Error::InvalidMedia(_))));
  }

  #[test]
  fn large_image_is_downscaled_keeping_aspect() {
    let out = MediaPolicy::default().normalize(&png(2400, 1600)).unwrap();
    assert_eq!((out.width, out.height), (1200, 800));
    assert_eq!(out.content_type, "image/jpeg");

    let decoded = image::load_from_memory(&out.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1200, 800));
    assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
  }

  #[test]
  fn portrait_is_capped_on_height() {
    let out = MediaPolicy::default().normalize(&png(600, 2400)).unwrap();
    assert_eq!((out.width, out.height), (300, 1200));
  }

  #[test]
  fn small_image_is_never_upscaled() {
    let out = MediaPolicy::default().normalize(&png(64, 48)).unwrap();
    assert_eq!((out.width, out.height), (64, 48));
  }

  #[test]
  fn garbage_bytes_are_invalid_media() {
    let err = MediaPolicy::default().normalize(b"definitely not an image").unwrap_err();
    assert!(matches!(err, Error::InvalidMedia(_)));
  }

  #[test]
  fn sniffed_format_must_be_allowed() {
    let err = MediaPolicy::default().normalize(b"GIF89a\x01\x00\x01\x00").unwrap_err();
    assert!(matches!(err, Error::InvalidMedia(_)));
  }

  #[test]
  fn truncated_png_is_invalid_media() {
    let mut bytes = png(32, 32);
    bytes.truncate(40);
    let err = MediaPolicy::default().normalize(&bytes).unwrap_err();
    assert!(matches!(err, Error::InvalidMedia(_)));
  }
}
