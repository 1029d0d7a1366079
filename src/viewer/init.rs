//! Initialization: resolving the image pyramid and building the view.

use heiv_map::{
    Color, Extent, ImageLayerSpec, ImageSource, RenderBackend, Size, View, ViewOptions,
};

use super::{ImageSet, Viewer};
use crate::config::{ConfigError, PositionPolicy, ViewerConfig, ZoomPolicy};
use crate::constants::{
    DEFAULT_DRAW_LAYER, DEFAULT_MAX_ZOOM, MAX_RESOLUTION_FACTOR, ZOOM_FACTOR,
};
use crate::error::{LoadError, ViewerError};
use crate::layer::{DisplayPolicy, Layer};
use crate::loader::{IiifInfo, ResourceLoader, probe_all};

impl<B: RenderBackend> Viewer<B> {
    /// Resolve the images and build the view.
    ///
    /// A single `info.json` URL is loaded as a IIIF image service. Otherwise
    /// every image becomes one static layer of the pyramid, probing sizes
    /// through `loader` when the configuration does not list them.
    pub async fn initialize<L>(&mut self, loader: &L) -> Result<(), ViewerError>
    where
        L: ResourceLoader + ?Sized,
    {
        let images = match self.config.iiif_info_url().map(str::to_string) {
            Some(url) => load_iiif(loader, &url).await?,
            None => load_static(loader, &self.config.images, self.config.sizes.as_deref()).await?,
        };
        self.create_viewer(images);
        Ok(())
    }

    fn create_viewer(&mut self, mut images: ImageSet) {
        if let Some(previous) = self.images.take() {
            for handle in previous.handles {
                self.backend.remove_layer(handle);
            }
        }
        images.handles = images
            .layers
            .iter()
            .map(|spec| self.backend.add_image_layer(spec))
            .collect();

        self.canvas_size = self.backend.canvas_size();
        let (view, full) = initial_view(
            &self.config,
            images.extent,
            images.max_zoom,
            self.canvas_size,
            self.config.properties.resolution,
        );
        self.full_resolution = full;

        log::info!(
            "Viewer '{}' showing {}x{} image in {} layer(s)",
            self.config.name,
            images.extent.width(),
            images.extent.height(),
            images.layers.len()
        );
        self.images = Some(images);
        self.view = Some(view);
        self.apply_overview();
        self.view_changed();

        if self.draw.is_some() {
            self.create_draw_layer();
        }
    }

    /// Push the overview map configuration for the current collapsed state.
    pub(super) fn apply_overview(&mut self) {
        if let Some(overview) = self.images.as_ref().and_then(|i| i.layers.first()) {
            let resolution =
                f64::from(overview.width.max(overview.height)) / self.config.overview_map_size;
            self.backend
                .configure_overview(overview, resolution, self.overview_collapsed);
        }
        let chrome = if self.overview_collapsed {
            self.chrome.hide()
        } else {
            self.chrome.pin()
        };
        self.apply_chrome(chrome);
    }

    pub(super) fn create_draw_layer(&mut self) {
        let layer = Layer::new(DEFAULT_DRAW_LAYER)
            .with_display(DisplayPolicy::Always)
            .with_color(Color::RED);
        if let Err(e) = self.insert_layer(layer) {
            log::error!("Could not create the draw layer: {}", e);
            return;
        }
        if let Some(draw) = self.draw.as_mut() {
            draw.set_draw_layer(DEFAULT_DRAW_LAYER);
            draw.activate_select();
        }
    }

    /// Rebuild the view after the canvas was resized, keeping the top-left
    /// corner of the visible area in place.
    pub fn reset_view(&mut self) -> Result<(), ViewerError> {
        let images = self.images.as_ref().ok_or(ViewerError::NotInitialized)?;
        let (extent, max_zoom) = (images.extent, images.max_zoom);
        let old_size = self.canvas_size;
        let new_size = self.backend.canvas_size();
        self.canvas_size = new_size;

        let current = self.view.as_ref().ok_or(ViewerError::NotInitialized)?;
        let (view, full) = if old_size.is_zero() {
            initial_view(
                &self.config,
                extent,
                max_zoom,
                new_size,
                self.config.properties.resolution,
            )
        } else {
            let old_extent = current.calculate_extent(old_size);
            let new_extent = current.calculate_extent(new_size);
            let moved = [
                old_extent.min_x - new_extent.min_x,
                old_extent.max_y - new_extent.max_y,
            ];
            let center = current.center();
            let rotation = current.rotation();
            let (mut view, full) = initial_view(
                &self.config,
                extent,
                max_zoom,
                new_size,
                Some(current.resolution()),
            );
            view.set_rotation(rotation);
            view.set_center([center[0] + moved[0], center[1] + moved[1]]);
            (view, full)
        };
        log::debug!(
            "View reset for {}x{} canvas",
            new_size.width,
            new_size.height
        );
        self.full_resolution = full;
        self.animation = None;
        self.view = Some(view);
        self.view_changed();
        Ok(())
    }
}

async fn load_iiif<L>(loader: &L, url: &str) -> Result<ImageSet, ViewerError>
where
    L: ResourceLoader + ?Sized,
{
    let text = loader.fetch_text(url).await.inspect_err(|e| {
        log::warn!("{}", e);
    })?;
    let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        let err = LoadError::new(url, e.to_string());
        log::warn!("{}", err);
        err
    })?;
    let Some(info) = IiifInfo::parse(&json) else {
        log::warn!("Data seems to be no valid IIIF image information.");
        return Err(ViewerError::InvalidIiifInfo {
            url: url.to_string(),
        });
    };
    log::debug!(
        "IIIF {:?} service {} with {} level(s)",
        info.version,
        info.service_id,
        info.scale_factors.len()
    );
    let extent = info.extent();
    let spec = ImageLayerSpec {
        source: info.source(),
        width: info.width,
        height: info.height,
        extent,
        min_zoom: None,
        z_index: 0,
    };
    Ok(ImageSet {
        extent,
        max_zoom: info.max_zoom(),
        layers: vec![spec],
        handles: Vec::new(),
    })
}

async fn load_static<L>(
    loader: &L,
    urls: &[String],
    sizes: Option<&[[u32; 2]]>,
) -> Result<ImageSet, ViewerError>
where
    L: ResourceLoader + ?Sized,
{
    let sizes = match sizes {
        Some(sizes) => sizes.to_vec(),
        None => probe_all(loader, urls).await.inspect_err(|e| {
            log::error!("{}", e);
        })?,
    };
    if sizes.len() != urls.len() {
        let err = ConfigError::SizeMismatch {
            images: urls.len(),
            sizes: sizes.len(),
        };
        log::error!("{}", err);
        return Err(err.into());
    }

    let mut pyramid: Vec<(&String, [u32; 2])> = urls.iter().zip(sizes).collect();
    pyramid.sort_by_key(|(_, size)| size[0]);
    let Some(&(_, [width, height])) = pyramid.last() else {
        return Err(ConfigError::MissingParameters(vec!["images".to_string()]).into());
    };
    let extent = Extent::image(f64::from(width), f64::from(height));

    let layers = pyramid
        .into_iter()
        .enumerate()
        .map(|(i, (url, [w, h]))| ImageLayerSpec {
            source: ImageSource::Static { url: url.clone() },
            width: w,
            height: h,
            extent,
            min_zoom: Some(i as f64 - 0.1),
            z_index: i as i32,
        })
        .collect();
    Ok(ImageSet {
        extent,
        max_zoom: DEFAULT_MAX_ZOOM,
        layers,
        handles: Vec::new(),
    })
}

/// Build the initial view for the image in `extent` on a canvas of `size`.
/// Returns the view and the full-fit resolution.
fn initial_view(
    config: &ViewerConfig,
    extent: Extent,
    max_zoom: f64,
    size: Size,
    resolution: Option<f64>,
) -> (View, f64) {
    let canvas_w = size.width.max(1.0);
    let canvas_h = size.height.max(1.0);
    let image_w = extent.width();
    let image_h = extent.height();

    let fit_w = image_w / canvas_w;
    let fit_h = image_h / canvas_h;
    let full = fit_w.max(fit_h);
    let resolution = resolution.unwrap_or(match config.zoom {
        ZoomPolicy::Cover => fit_w.min(fit_h),
        ZoomPolicy::Min => full,
    });

    let center = match config.position {
        PositionPolicy::Center => extent.center(),
        PositionPolicy::Top => [image_w / 2.0, -(canvas_h * resolution / 2.0)],
        PositionPolicy::TopLeft => [
            image_w / 2.0 + (canvas_w * resolution / 2.0 - image_w / 2.0),
            -(canvas_h * resolution / 2.0),
        ],
    };

    let reach_x = (canvas_w + image_w) * full;
    let reach_y = (canvas_h + image_h) * full;
    let view = View::new(ViewOptions {
        center,
        resolution,
        rotation: config.properties.rotation,
        max_resolution: full * MAX_RESOLUTION_FACTOR,
        max_zoom,
        zoom_factor: ZOOM_FACTOR,
        extent: Some(Extent::new(-reach_x, -reach_y, reach_x, reach_y)),
    });
    (view, full)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ViewerConfig {
        ViewerConfig::new("map", vec!["page.jpg".to_string()])
    }

    #[test]
    fn test_initial_view_min_fits_whole_image() {
        let (view, full) = initial_view(
            &config(),
            Extent::image(2000.0, 1000.0),
            8.0,
            Size::new(500.0, 500.0),
            None,
        );
        assert_eq!(full, 4.0);
        assert_eq!(view.resolution(), 4.0);
        assert_eq!(view.center(), [1000.0, -500.0]);
    }

    #[test]
    fn test_initial_view_cover_and_top() {
        let mut config = config();
        config.zoom = ZoomPolicy::Cover;
        config.position = PositionPolicy::Top;
        let (view, full) = initial_view(
            &config,
            Extent::image(2000.0, 1000.0),
            8.0,
            Size::new(500.0, 500.0),
            None,
        );
        assert_eq!(full, 4.0);
        assert_eq!(view.resolution(), 2.0);
        assert_eq!(view.center(), [1000.0, -500.0]);
    }

    #[test]
    fn test_initial_view_top_left() {
        let mut config = config();
        config.position = PositionPolicy::TopLeft;
        let (view, _) = initial_view(
            &config,
            Extent::image(1000.0, 2000.0),
            8.0,
            Size::new(400.0, 400.0),
            Some(1.0),
        );
        assert_eq!(view.center(), [200.0, -200.0]);
    }

    #[test]
    fn test_zero_canvas_is_clamped() {
        let (view, full) = initial_view(
            &config(),
            Extent::image(100.0, 50.0),
            8.0,
            Size::new(0.0, 0.0),
            None,
        );
        assert_eq!(full, 100.0);
        assert!(view.resolution() > 0.0);
    }
}
