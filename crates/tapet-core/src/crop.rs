//! Crop rectangle computation for applying a wallpaper to a display.

use serde::{Deserialize, Serialize};

use crate::wallpaper::Resolution;

/// An integer pixel rectangle in image space. `right` and `bottom` are
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
  pub left:   u32,
  pub top:    u32,
  pub right:  u32,
  pub bottom: u32,
}

impl Rect {
  pub fn width(&self) -> u32 { self.right - self.left }

  pub fn height(&self) -> u32 { self.bottom - self.top }
}

/// A rectangle in detector space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectF {
  pub left:   f32,
  pub top:    f32,
  pub right:  f32,
  pub bottom: f32,
}

/// Output of an object detector. The detector may work on a downscaled copy
/// of the image; `scale_factor` is the factor it applied, so image-space
/// coordinates are detector coordinates divided by it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub scale_factor: f32,
  pub bounding_box: Option<RectF>,
}

/// The largest rectangle with the display's aspect ratio that fits inside
/// the image, centred on the detected subject if there is one and on the
/// image centre otherwise. Always lies within the image bounds.
pub fn compute_crop(
  image: Resolution,
  display: Resolution,
  detection: Option<&Detection>,
) -> Rect {
  let full = Rect {
    left:   0,
    top:    0,
    right:  image.width,
    bottom: image.height,
  };
  if image.width == 0 || image.height == 0 || display.height == 0 {
    return full;
  }

  let display_ratio = display.aspect_ratio();
  if display_ratio == 0.0 {
    return full;
  }

  let (crop_w, crop_h) = if image.aspect_ratio() > display_ratio {
    let w = (f64::from(image.height) * display_ratio).round() as u32;
    (w.clamp(1, image.width), image.height)
  } else {
    let h = (f64::from(image.width) / display_ratio).round() as u32;
    (image.width, h.clamp(1, image.height))
  };

  let (cx, cy) = detection
    .and_then(subject_centre)
    .unwrap_or((f64::from(image.width) / 2.0, f64::from(image.height) / 2.0));

  let left = place(cx, crop_w, image.width);
  let top = place(cy, crop_h, image.height);

  Rect {
    left,
    top,
    right: left + crop_w,
    bottom: top + crop_h,
  }
}

fn subject_centre(detection: &Detection) -> Option<(f64, f64)> {
  let bbox = detection.bounding_box?;
  let scale = f64::from(detection.scale_factor);
  if !scale.is_finite() || scale <= 0.0 {
    return None;
  }
  let cx = f64::from(bbox.left + bbox.right) / 2.0 / scale;
  let cy = f64::from(bbox.top + bbox.bottom) / 2.0 / scale;
  Some((cx, cy))
}

/// Start offset of a span of `len` centred on `centre`, clamped to
/// `[0, extent - len]`.
fn place(centre: f64, len: u32, extent: u32) -> u32 {
  let max = f64::from(extent - len);
  (centre - f64::from(len) / 2.0).round().clamp(0.0, max) as u32
}

#[cfg(test)]
mod tests {
  use super::*;

  const WIDE: Resolution = Resolution { width: 4000, height: 2000 };
  const PHONE: Resolution = Resolution { width: 1000, height: 2000 };

  #[test]
  fn centres_without_detection() {
    let rect = compute_crop(WIDE, PHONE, None);
    assert_eq!(rect, Rect { left: 1500, top: 0, right: 2500, bottom: 2000 });
  }

  #[test]
  fn centres_on_detected_subject() {
    let detection = Detection {
      scale_factor: 0.5,
      bounding_box: Some(RectF {
        left:   200.0,
        top:    100.0,
        right:  400.0,
        bottom: 300.0,
      }),
    };
    let rect = compute_crop(WIDE, PHONE, Some(&detection));
    assert_eq!(rect.left, 100);
    assert_eq!(rect.width(), 1000);
    assert_eq!(rect.height(), 2000);
  }

  #[test]
  fn subject_near_edge_is_clamped() {
    let detection = Detection {
      scale_factor: 1.0,
      bounding_box: Some(RectF {
        left:   3500.0,
        top:    0.0,
        right:  3900.0,
        bottom: 100.0,
      }),
    };
    let rect = compute_crop(WIDE, PHONE, Some(&detection));
    assert_eq!(rect.right, 4000);
    assert_eq!(rect.left, 3000);
  }

  #[test]
  fn detection_without_box_falls_back_to_centre() {
    let detection = Detection { scale_factor: 1.0, bounding_box: None };
    assert_eq!(
      compute_crop(WIDE, PHONE, Some(&detection)),
      compute_crop(WIDE, PHONE, None)
    );
  }

  #[test]
  fn tall_image_on_wide_display_crops_vertically() {
    let rect = compute_crop(
      Resolution::new(1000, 3000),
      Resolution::new(1000, 500),
      None,
    );
    assert_eq!(rect.width(), 1000);
    assert_eq!(rect.height(), 500);
    assert_eq!(rect.top, 1250);
  }

  #[test]
  fn degenerate_image_returns_full_rect() {
    let rect = compute_crop(Resolution::new(0, 0), PHONE, None);
    assert_eq!(rect, Rect { left: 0, top: 0, right: 0, bottom: 0 });
  }
}
