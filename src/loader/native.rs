//! Filesystem and HTTP loader for the native build.

use std::io::Read;
use std::path::{Path, PathBuf};

use super::{ResourceLoader, image_size_from_bytes};
use crate::error::LoadError;

/// Resolves `http(s)://` URLs with `ureq` and everything else as a path
/// relative to `base_dir`.
#[derive(Debug, Clone, Default)]
pub struct NativeLoader {
    base_dir: PathBuf,
}

impl NativeLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn is_remote(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn read_bytes(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        if Self::is_remote(url) {
            let response = ureq::get(url)
                .call()
                .map_err(|e| LoadError::new(url, e.to_string()))?;
            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| LoadError::new(url, e.to_string()))?;
            Ok(bytes)
        } else {
            std::fs::read(self.resolve(url)).map_err(|e| LoadError::new(url, e.to_string()))
        }
    }
}

impl ResourceLoader for NativeLoader {
    async fn fetch_text(&self, url: &str) -> Result<String, LoadError> {
        let bytes = self.read_bytes(url)?;
        String::from_utf8(bytes).map_err(|e| LoadError::new(url, e.to_string()))
    }

    async fn probe_image_size(&self, url: &str) -> Result<[u32; 2], LoadError> {
        let bytes = self.read_bytes(url)?;
        image_size_from_bytes(url, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_use_base_dir() {
        let loader = NativeLoader::new("/data/pages");
        assert_eq!(loader.resolve("p1.jpg"), PathBuf::from("/data/pages/p1.jpg"));
        assert_eq!(loader.resolve("/abs/p1.jpg"), PathBuf::from("/abs/p1.jpg"));
        assert_eq!(
            loader.resolve("file:///abs/p2.jpg"),
            PathBuf::from("/abs/p2.jpg")
        );
    }

    #[test]
    fn test_probe_local_file() {
        let dir = std::env::temp_dir().join(format!("heiv-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbImage::new(12, 5).save(dir.join("page.png")).unwrap();

        let loader = NativeLoader::new(&dir);
        let size = pollster::block_on(loader.probe_image_size("page.png")).unwrap();
        assert_eq!(size, [12, 5]);
        assert!(pollster::block_on(loader.probe_image_size("missing.png")).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
