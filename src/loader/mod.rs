//! Fetching image metadata.
//!
//! Initialization suspends at exactly two kinds of boundary: fetching a
//! IIIF `info.json` and probing the natural size of an image. Both go
//! through a [`ResourceLoader`], implemented over the filesystem and HTTP
//! natively and over `fetch` and `HtmlImageElement` in the browser.

mod iiif;
#[cfg(not(target_arch = "wasm32"))]
mod native;

pub use iiif::{IiifInfo, IiifVersion};
#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeLoader;

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::task::Poll;

use futures_lite::FutureExt;
use futures_lite::future;

use crate::error::LoadError;

/// Source of external resources. Every request resolves exactly once and
/// is never retried or cancelled.
pub trait ResourceLoader {
    /// Fetch a text document, e.g. IIIF image information.
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String, LoadError>>;

    /// Load an image far enough to learn its `[width, height]`.
    fn probe_image_size(&self, url: &str) -> impl Future<Output = Result<[u32; 2], LoadError>>;
}

/// Probe every image concurrently. Any single failure fails the whole
/// probe. Sizes come back in the order of `urls`.
pub async fn probe_all<L>(loader: &L, urls: &[String]) -> Result<Vec<[u32; 2]>, LoadError>
where
    L: ResourceLoader + ?Sized,
{
    let mut pending: Vec<Option<Pin<Box<dyn Future<Output = Result<[u32; 2], LoadError>> + '_>>>> =
        urls.iter()
            .map(|url| Some(loader.probe_image_size(url).boxed_local()))
            .collect();
    let mut sizes: Vec<Option<[u32; 2]>> = vec![None; urls.len()];

    future::poll_fn(|cx| {
        let mut done = true;
        for ((slot, size), url) in pending.iter_mut().zip(sizes.iter_mut()).zip(urls) {
            let Some(probe) = slot else {
                continue;
            };
            match probe.as_mut().poll(cx) {
                Poll::Ready(Ok(probed)) => {
                    log::debug!("Probed {}: {}x{}", url, probed[0], probed[1]);
                    *size = Some(probed);
                    *slot = None;
                }
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => done = false,
            }
        }
        if done {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    })
    .await?;

    Ok(sizes.into_iter().flatten().collect())
}

/// Read the dimensions from an encoded image header without decoding the
/// pixels.
pub fn image_size_from_bytes(url: &str, bytes: &[u8]) -> Result<[u32; 2], LoadError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LoadError::new(url, e.to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| LoadError::new(url, e.to_string()))?;
    Ok([width, height])
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::ResourceLoader;
    use crate::error::LoadError;

    /// In-memory loader for tests.
    #[derive(Debug, Default)]
    pub struct FakeLoader {
        pub texts: HashMap<String, String>,
        pub sizes: HashMap<String, [u32; 2]>,
    }

    impl FakeLoader {
        pub fn with_size(mut self, url: &str, size: [u32; 2]) -> Self {
            self.sizes.insert(url.to_string(), size);
            self
        }

        pub fn with_text(mut self, url: &str, text: &str) -> Self {
            self.texts.insert(url.to_string(), text.to_string());
            self
        }
    }

    impl ResourceLoader for FakeLoader {
        async fn fetch_text(&self, url: &str) -> Result<String, LoadError> {
            self.texts
                .get(url)
                .cloned()
                .ok_or_else(|| LoadError::new(url, "not found"))
        }

        async fn probe_image_size(&self, url: &str) -> Result<[u32; 2], LoadError> {
            self.sizes
                .get(url)
                .copied()
                .ok_or_else(|| LoadError::new(url, "image failed to load"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::testing::FakeLoader;
    use super::*;

    #[test]
    fn test_probe_all_in_order() {
        let loader = FakeLoader::default()
            .with_size("b.jpg", [200, 100])
            .with_size("a.jpg", [100, 50]);
        let urls = vec!["b.jpg".to_string(), "a.jpg".to_string()];
        let sizes = pollster::block_on(probe_all(&loader, &urls)).unwrap();
        assert_eq!(sizes, vec![[200, 100], [100, 50]]);
    }

    #[test]
    fn test_probe_all_fails_on_any_error() {
        let loader = FakeLoader::default().with_size("a.jpg", [1, 1]);
        let urls = vec!["a.jpg".to_string(), "missing.jpg".to_string()];
        let err = pollster::block_on(probe_all(&loader, &urls)).unwrap_err();
        assert_eq!(err.url, "missing.jpg");
    }

    /// Records when each probe starts and ends, yielding once in between.
    #[derive(Default)]
    struct YieldingLoader {
        trace: RefCell<Vec<String>>,
    }

    impl ResourceLoader for YieldingLoader {
        async fn fetch_text(&self, url: &str) -> Result<String, LoadError> {
            Err(LoadError::new(url, "not used"))
        }

        async fn probe_image_size(&self, url: &str) -> Result<[u32; 2], LoadError> {
            self.trace.borrow_mut().push(format!("start {}", url));
            future::yield_now().await;
            self.trace.borrow_mut().push(format!("end {}", url));
            Ok([url.len() as u32, 1])
        }
    }

    #[test]
    fn test_probe_all_runs_probes_concurrently() {
        let loader = YieldingLoader::default();
        let urls = vec!["a.jpg".to_string(), "bb.jpg".to_string()];
        let sizes = pollster::block_on(probe_all(&loader, &urls)).unwrap();
        assert_eq!(sizes, vec![[5, 1], [6, 1]]);
        assert_eq!(
            *loader.trace.borrow(),
            ["start a.jpg", "start bb.jpg", "end a.jpg", "end bb.jpg"]
        );
    }

    #[test]
    fn test_probe_all_empty() {
        let loader = FakeLoader::default();
        assert!(pollster::block_on(probe_all(&loader, &[])).unwrap().is_empty());
    }

    #[test]
    fn test_image_size_from_png_header() {
        let mut bytes = Vec::new();
        image::RgbImage::new(7, 3)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(image_size_from_bytes("x.png", &bytes).unwrap(), [7, 3]);
        assert!(image_size_from_bytes("x.png", b"not an image").is_err());
    }
}
