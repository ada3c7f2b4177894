//! Atlas metadata loading and style code resolution.
//!
//! The asset pipeline ships one sprite sheet image plus a JSON document that
//! maps every style code to a pixel rectangle inside that image:
//!
//! ```json
//! { "10033000001211000000": { "x": 0, "y": 0, "width": 32, "height": 32 } }
//! ```
//!
//! `AtlasIndex::resolve(style_code)` is the lookup used by the batch builder.
//! It returns the normalized UV rect plus pixel size for a quad, or `None` when
//! the code is not in the sheet; callers skip such sprites instead of failing.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Normalized texture rectangle plus on-screen pixel size of one style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteStyleRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
    pub width_px: f32,
    pub height_px: f32,
}

impl SpriteStyleRect {
    pub fn from_pixel_rect(rect: PixelRect, image_size: (u32, u32)) -> Self {
        let (image_w, image_h) = (image_size.0 as f64, image_size.1 as f64);
        Self {
            u0: (rect.x as f64 / image_w) as f32,
            v0: (rect.y as f64 / image_h) as f32,
            u1: ((rect.x as f64 + rect.width as f64) / image_w) as f32,
            v1: ((rect.y as f64 + rect.height as f64) / image_h) as f32,
            width_px: rect.width as f32,
            height_px: rect.height as f32,
        }
    }

    /// UV corners in quad emission order: `(u0,v0) (u0,v1) (u1,v0) (u1,v1)`.
    pub fn uv_corners(&self) -> [[f32; 2]; 4] {
        [
            [self.u0, self.v0],
            [self.u0, self.v1],
            [self.u1, self.v0],
            [self.u1, self.v1],
        ]
    }
}

/// Predicate "character at `position` equals `value`" over style codes.
///
/// Symbology codes encode attributes positionally, so eligibility for random
/// reassignment is expressed as a single character check.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct StyleFilter {
    pub position: usize,
    pub value: char,
}

impl StyleFilter {
    pub fn matches(&self, style_code: &str) -> bool {
        style_code.chars().nth(self.position) == Some(self.value)
    }
}

#[derive(Debug, Clone)]
pub struct AtlasIndex {
    image_size: (u32, u32),
    styles: HashMap<String, SpriteStyleRect>,
}

impl AtlasIndex {
    pub fn from_pixel_rects(
        image_size: (u32, u32),
        rects: &HashMap<String, PixelRect>,
    ) -> Result<Self, String> {
        validate_rects(image_size, rects)?;
        let styles = rects
            .iter()
            .map(|(code, rect)| {
                (
                    code.clone(),
                    SpriteStyleRect::from_pixel_rect(*rect, image_size),
                )
            })
            .collect();
        Ok(Self { image_size, styles })
    }

    pub fn resolve(&self, style_code: &str) -> Option<&SpriteStyleRect> {
        self.styles.get(style_code)
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Style codes accepted by `predicate`, sorted so that seeded sessions
    /// pick the same codes regardless of hash order.
    pub fn eligible_codes<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut codes: Vec<String> = self
            .styles
            .keys()
            .filter(|code| predicate(code))
            .cloned()
            .collect();
        codes.sort();
        codes
    }
}

pub fn load_atlas_metadata(path: &Path) -> Result<HashMap<String, PixelRect>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read atlas metadata {}: {e}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse atlas metadata {}: {e}", path.display()))
}

fn validate_rects(
    image_size: (u32, u32),
    rects: &HashMap<String, PixelRect>,
) -> Result<(), String> {
    if image_size.0 == 0 || image_size.1 == 0 {
        return Err("Atlas validation failed: image width/height must be > 0".to_string());
    }

    for (code, rect) in rects {
        if rect.width == 0 || rect.height == 0 {
            return Err(format!(
                "Atlas validation failed: style '{code}' has zero-sized rect"
            ));
        }
        let right = rect.x.checked_add(rect.width).ok_or_else(|| {
            format!("Atlas validation failed: style '{code}' rect overflows u32 range")
        })?;
        let bottom = rect.y.checked_add(rect.height).ok_or_else(|| {
            format!("Atlas validation failed: style '{code}' rect overflows u32 range")
        })?;
        if right > image_size.0 || bottom > image_size.1 {
            return Err(format!(
                "Atlas validation failed: style '{code}' rect exceeds atlas bounds"
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "smv_atlas_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn rects(entries: &[(&str, PixelRect)]) -> HashMap<String, PixelRect> {
        entries
            .iter()
            .map(|(code, rect)| (code.to_string(), *rect))
            .collect()
    }

    #[test]
    fn single_style_maps_to_quarter_of_sheet() {
        let index = AtlasIndex::from_pixel_rects(
            (64, 64),
            &rects(&[(
                "A",
                PixelRect {
                    x: 0,
                    y: 0,
                    width: 32,
                    height: 32,
                },
            )]),
        )
        .expect("atlas should build");

        let rect = index.resolve("A").expect("style A should resolve");
        assert_eq!(rect.u0, 0.0);
        assert_eq!(rect.v0, 0.0);
        assert_eq!(rect.u1, 0.5);
        assert_eq!(rect.v1, 0.5);
        assert_eq!(rect.width_px, 32.0);
        assert_eq!(rect.height_px, 32.0);
    }

    #[test]
    fn uv_corners_map_back_to_pixel_rect() {
        let pixel = PixelRect {
            x: 96,
            y: 40,
            width: 48,
            height: 24,
        };
        let (w, h) = (256u32, 128u32);
        let rect = SpriteStyleRect::from_pixel_rect(pixel, (w, h));

        let corners = rect.uv_corners();
        let to_px = |uv: [f32; 2]| (uv[0] * w as f32, uv[1] * h as f32);
        assert_eq!(to_px(corners[0]), (96.0, 40.0));
        assert_eq!(to_px(corners[1]), (96.0, 64.0));
        assert_eq!(to_px(corners[2]), (144.0, 40.0));
        assert_eq!(to_px(corners[3]), (144.0, 64.0));
        assert!(rect.u0 < rect.u1 && rect.v0 < rect.v1);
    }

    #[test]
    fn missing_style_is_absent() {
        let index = AtlasIndex::from_pixel_rects((64, 64), &HashMap::new()).expect("empty atlas");
        assert!(index.is_empty());
        assert!(index.resolve("missing").is_none());
    }

    #[test]
    fn rejects_rect_outside_image() {
        let err = AtlasIndex::from_pixel_rects(
            (64, 64),
            &rects(&[(
                "wide",
                PixelRect {
                    x: 40,
                    y: 0,
                    width: 32,
                    height: 8,
                },
            )]),
        )
        .expect_err("rect past the right edge should fail");
        assert!(err.contains("exceeds atlas bounds"));
    }

    #[test]
    fn rejects_overflowing_rect() {
        let err = AtlasIndex::from_pixel_rects(
            (64, 64),
            &rects(&[(
                "overflow",
                PixelRect {
                    x: u32::MAX,
                    y: 0,
                    width: 8,
                    height: 8,
                },
            )]),
        )
        .expect_err("overflowing rect should fail");
        assert!(err.contains("overflows u32 range"));
    }

    #[test]
    fn rejects_zero_sized_image_and_rect() {
        assert!(AtlasIndex::from_pixel_rects((0, 64), &HashMap::new()).is_err());
        let err = AtlasIndex::from_pixel_rects(
            (64, 64),
            &rects(&[(
                "flat",
                PixelRect {
                    x: 0,
                    y: 0,
                    width: 8,
                    height: 0,
                },
            )]),
        )
        .expect_err("zero height should fail");
        assert!(err.contains("zero-sized"));
    }

    #[test]
    fn eligible_codes_are_filtered_and_sorted() {
        let rect = PixelRect {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        };
        let index = AtlasIndex::from_pixel_rects(
            (8, 8),
            &rects(&[("1003300", rect), ("1001300", rect), ("1000300", rect), ("1002000", rect)]),
        )
        .expect("atlas should build");

        let filter = StyleFilter {
            position: 4,
            value: '3',
        };
        let codes = index.eligible_codes(|code| filter.matches(code));
        assert_eq!(codes, vec!["1000300", "1001300", "1003300"]);
        assert_eq!(index.eligible_codes(|_| true).len(), 4);
    }

    #[test]
    fn style_filter_handles_short_codes() {
        let filter = StyleFilter {
            position: 4,
            value: '3',
        };
        assert!(!filter.matches("123"));
        assert!(filter.matches("12343"));
    }

    #[test]
    fn load_atlas_metadata_ignores_extra_fields() {
        let path = temp_file_path("valid");
        let json = r#"
        {
          "10031000001211000000": { "x": 0, "y": 0, "width": 32, "height": 32, "pixelRatio": 1 },
          "10061000001211000000": { "x": 32, "y": 0, "width": 32, "height": 30, "pixelRatio": 1 }
        }
        "#;
        fs::write(&path, json).expect("failed to write temp metadata file");

        let rects = load_atlas_metadata(&path).expect("metadata should load");
        assert_eq!(rects.len(), 2);
        assert_eq!(rects["10061000001211000000"].height, 30);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_atlas_metadata_reports_missing_file() {
        let path = temp_file_path("missing");
        let err = load_atlas_metadata(&path).expect_err("missing file should fail");
        assert!(err.contains("Failed to read atlas metadata"));
    }
}
