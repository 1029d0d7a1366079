//! Native command-line front end.
//!
//! `heiv-native <config.json> [annotations.json...]` builds a viewer over
//! a [`RecordingBackend`], loads the annotation files into it and prints
//! every layer as an SVG document.

use std::path::{Path, PathBuf};

use heiv_map::{RecordingBackend, Size};

use crate::codec::AnnotationRecord;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::loader::NativeLoader;
use crate::viewer::Viewer;

/// Canvas assumed for the headless viewer.
const CANVAS_SIZE: Size = Size {
    width: 1024.0,
    height: 768.0,
};

/// Errors of the command-line front end.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Usage: heiv-native <config.json> [annotations.json...]")]
    Usage,

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid annotation file {path}: {source}")]
    Annotations {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Viewer(#[from] ViewerError),
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// An annotation file holds either one layer record or a list of them.
fn parse_annotations(path: &Path, text: &str) -> Result<Vec<AnnotationRecord>, CliError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|source| CliError::Annotations {
            path: path.to_path_buf(),
            source,
        })?;
    let records = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|record| vec![record])
    };
    records.map_err(|source| CliError::Annotations {
        path: path.to_path_buf(),
        source,
    })
}

/// Run the CLI with the process arguments.
pub fn run() -> Result<(), CliError> {
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let config_path = args.next().ok_or(CliError::Usage)?;
    let annotation_paths: Vec<PathBuf> = args.collect();

    let config = ViewerConfig::from_json(&read(&config_path)?).map_err(ViewerError::from)?;

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let loader = NativeLoader::new(base_dir);

    let mut viewer = Viewer::new(config, RecordingBackend::new(CANVAS_SIZE))?;
    pollster::block_on(viewer.initialize(&loader))?;

    for path in &annotation_paths {
        let records = parse_annotations(path, &read(path)?)?;
        log::info!("Loaded {} layer(s) from {}", records.len(), path.display());
        viewer.add_layers(&records)?;
    }

    let names: Vec<String> = viewer.layers().iter().map(|l| l.name().to_string()).collect();
    for name in names {
        println!("<!-- layer {} -->", name);
        println!("{}", viewer.get_layer_svg(&name)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_list() {
        let path = Path::new("zones.json");
        let single = parse_annotations(path, r#"{"name": "zones", "features": []}"#).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].name.as_deref(), Some("zones"));

        let list = parse_annotations(path, r#"[{"name": "a"}, {"name": "b"}]"#).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_parse_invalid_file() {
        let err = parse_annotations(Path::new("bad.json"), "{").unwrap_err();
        assert!(err.to_string().starts_with("Invalid annotation file bad.json"));
    }
}
