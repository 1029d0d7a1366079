//! IIIF Image API `info.json` parsing (versions 2 and 3).

use heiv_map::{Extent, ImageSource};
use serde_json::Value;

const DEFAULT_TILE_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IiifVersion {
    V2,
    V3,
}

/// Tile source options extracted from an image information document.
#[derive(Debug, Clone, PartialEq)]
pub struct IiifInfo {
    pub version: IiifVersion,
    pub service_id: String,
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    /// Ascending, starting at 1.
    pub scale_factors: Vec<u32>,
    pub format: String,
    pub quality: String,
}

impl IiifInfo {
    /// Parse an `info.json` document. Returns `None` when it is not valid
    /// IIIF image information.
    pub fn parse(info: &Value) -> Option<Self> {
        let version = detect_version(info)?;
        let id_key = match version {
            IiifVersion::V2 => "@id",
            IiifVersion::V3 => "id",
        };
        let service_id = info
            .get(id_key)
            .or_else(|| info.get("@id"))
            .or_else(|| info.get("id"))?
            .as_str()?
            .trim_end_matches('/')
            .to_string();
        let width = dimension(info, "width")?;
        let height = dimension(info, "height")?;

        let tiles = info.get("tiles").and_then(Value::as_array).and_then(|t| t.first());
        let tile_size = tiles
            .and_then(|t| t.get("width"))
            .and_then(Value::as_u64)
            .and_then(|w| u32::try_from(w).ok())
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_TILE_SIZE);
        let mut scale_factors: Vec<u32> = tiles
            .and_then(|t| t.get("scaleFactors"))
            .and_then(Value::as_array)
            .map(|factors| {
                factors
                    .iter()
                    .filter_map(Value::as_u64)
                    .filter_map(|f| u32::try_from(f).ok())
                    .filter(|f| *f > 0)
                    .collect()
            })
            .unwrap_or_default();
        if scale_factors.is_empty() {
            scale_factors = default_scale_factors(width.max(height), tile_size);
        }
        scale_factors.sort_unstable();
        scale_factors.dedup();

        let format = info
            .get("preferredFormats")
            .and_then(Value::as_array)
            .and_then(|formats| formats.first())
            .and_then(Value::as_str)
            .unwrap_or("jpg")
            .to_string();
        let quality = "default".to_string();

        Some(Self {
            version,
            service_id,
            width,
            height,
            tile_size,
            scale_factors,
            format,
            quality,
        })
    }

    /// Number of pyramid levels, which is also the maximum zoom.
    pub fn max_zoom(&self) -> f64 {
        self.scale_factors.len() as f64
    }

    pub fn extent(&self) -> Extent {
        Extent::image(f64::from(self.width), f64::from(self.height))
    }

    pub fn source(&self) -> ImageSource {
        ImageSource::Iiif {
            service_id: self.service_id.clone(),
            tile_size: self.tile_size,
            resolutions: self.scale_factors.iter().rev().map(|f| f64::from(*f)).collect(),
            format: self.format.clone(),
            quality: self.quality.clone(),
        }
    }
}

fn detect_version(info: &Value) -> Option<IiifVersion> {
    let contexts: Vec<&str> = match info.get("@context")? {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    contexts.iter().find_map(|ctx| {
        if ctx.contains("iiif.io/api/image/3") {
            Some(IiifVersion::V3)
        } else if ctx.contains("iiif.io/api/image/2") {
            Some(IiifVersion::V2)
        } else {
            None
        }
    })
}

fn dimension(info: &Value, key: &str) -> Option<u32> {
    info.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}

/// Powers of two until one tile covers the whole image.
fn default_scale_factors(max_dimension: u32, tile_size: u32) -> Vec<u32> {
    let mut factors = vec![1];
    let mut factor = 1u32;
    while max_dimension.div_ceil(factor) > tile_size {
        factor = factor.saturating_mul(2);
        factors.push(factor);
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v2() {
        let info = serde_json::json!({
            "@context": "http://iiif.io/api/image/2/context.json",
            "@id": "https://example.org/iiif/page1/",
            "protocol": "http://iiif.io/api/image",
            "width": 4000,
            "height": 3000,
            "profile": ["http://iiif.io/api/image/2/level2.json"],
            "tiles": [{ "width": 512, "scaleFactors": [1, 2, 4, 8] }]
        });
        let parsed = IiifInfo::parse(&info).unwrap();
        assert_eq!(parsed.version, IiifVersion::V2);
        assert_eq!(parsed.service_id, "https://example.org/iiif/page1");
        assert_eq!(parsed.tile_size, 512);
        assert_eq!(parsed.max_zoom(), 4.0);
        assert_eq!(parsed.extent().to_array(), [0.0, -3000.0, 4000.0, 0.0]);
        match parsed.source() {
            ImageSource::Iiif { resolutions, quality, .. } => {
                assert_eq!(resolutions, vec![8.0, 4.0, 2.0, 1.0]);
                assert_eq!(quality, "default");
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_parse_v3_with_preferred_format() {
        let info = serde_json::json!({
            "@context": "http://iiif.io/api/image/3/context.json",
            "id": "https://example.org/iiif/3/p",
            "type": "ImageService3",
            "profile": "level1",
            "width": 1000,
            "height": 800,
            "preferredFormats": ["png"],
            "tiles": [{ "width": 256, "scaleFactors": [4, 1, 2] }]
        });
        let parsed = IiifInfo::parse(&info).unwrap();
        assert_eq!(parsed.version, IiifVersion::V3);
        assert_eq!(parsed.format, "png");
        assert_eq!(parsed.scale_factors, vec![1, 2, 4]);
    }

    #[test]
    fn test_missing_tiles_uses_powers_of_two() {
        let info = serde_json::json!({
            "@context": "http://iiif.io/api/image/2/context.json",
            "@id": "x",
            "width": 1000,
            "height": 200
        });
        let parsed = IiifInfo::parse(&info).unwrap();
        assert_eq!(parsed.scale_factors, vec![1, 2, 4]);
    }

    #[test]
    fn test_rejects_non_iiif() {
        assert!(IiifInfo::parse(&serde_json::json!({ "width": 10, "height": 10 })).is_none());
        assert!(
            IiifInfo::parse(&serde_json::json!({
                "@context": "http://iiif.io/api/image/2/context.json",
                "@id": "x",
                "width": 0,
                "height": 10
            }))
            .is_none()
        );
    }
}
