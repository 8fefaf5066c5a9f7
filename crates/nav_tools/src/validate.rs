//! Unit kind data loading and validation.

use std::path::Path;

use nav_core::data::UnitKindData;
use nav_core::error::NavError;
use nav_core::unit_kind::UnitKindRegistry;
use thiserror::Error;

/// Errors that can occur while loading unit kind data.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON file.
    #[error("Failed to parse RON file '{path}': {source}")]
    ParseError {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Unit kind validation failed.
    #[error("Validation failed for unit kind '{kind}' in '{path}': {errors:?}")]
    ValidationError {
        /// File the kind was read from.
        path: String,
        /// Kind that failed validation.
        kind: String,
        /// List of validation errors.
        errors: Vec<String>,
    },

    /// Two files define the same kind.
    #[error("Duplicate unit kind id: {0}")]
    DuplicateKind(String),

    /// Registry rejected the kind.
    #[error(transparent)]
    Registry(#[from] NavError),
}

/// Result type for data loading operations.
pub type DataLoadResult<T> = Result<T, DataLoadError>;

/// Load and validate a single unit kind from a RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or fails validation.
pub fn load_kind_from_file(path: &Path) -> DataLoadResult<UnitKindData> {
    let path_str = path.display().to_string();

    let contents = std::fs::read_to_string(path).map_err(|e| DataLoadError::IoError {
        path: path_str.clone(),
        source: e,
    })?;

    let data: UnitKindData = ron::from_str(&contents).map_err(|e| DataLoadError::ParseError {
        path: path_str.clone(),
        source: e,
    })?;

    let errors = data.validate();
    if !errors.is_empty() {
        return Err(DataLoadError::ValidationError {
            path: path_str,
            kind: data.id,
            errors,
        });
    }

    tracing::debug!(
        "Loaded unit kind '{}' with {} engine levels",
        data.id,
        data.speeds.len()
    );

    Ok(data)
}

/// Load every `*.ron` unit kind in a directory into a registry.
///
/// A missing directory yields an empty registry.
///
/// # Errors
///
/// Returns an error if any file fails to load, or two files share an id.
pub fn load_kinds_from_directory(dir: &Path) -> DataLoadResult<UnitKindRegistry> {
    let mut registry = UnitKindRegistry::new();

    if !dir.exists() {
        tracing::warn!("Unit data directory does not exist: {}", dir.display());
        return Ok(registry);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| DataLoadError::IoError {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DataLoadError::IoError {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            paths.push(path);
        }
    }
    // Directory order is platform dependent.
    paths.sort();

    for path in paths {
        let data = load_kind_from_file(&path)?;
        if registry.contains(&data.id) {
            return Err(DataLoadError::DuplicateKind(data.id));
        }
        registry.insert(data)?;
    }

    tracing::info!("Loaded {} unit kinds from {}", registry.len(), dir.display());
    Ok(registry)
}

/// Validate all RON unit kind files in a directory.
///
/// Returns the number of kinds found.
///
/// # Errors
///
/// Returns an error if any data file fails validation.
pub fn validate_data_directory(path: &Path) -> DataLoadResult<usize> {
    let registry = load_kinds_from_directory(path)?;
    for kind in registry.iter() {
        tracing::info!(
            "{} ({}): speeds {:?}, capacity {}, blocked by {:?}",
            kind.id,
            kind.name,
            kind.speeds.iter().map(ToString::to_string).collect::<Vec<_>>(),
            kind.capacity,
            kind.blocking_terrain
        );
    }
    Ok(registry.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CAR: &str = r#"UnitKindData(
        id: "car",
        name: "Car",
        speeds: [8.0, 5.0, 0.0],
        blocking_terrain: ["Mountain", "Water"],
        capacity: 4,
    )"#;

    const UAV: &str = r#"UnitKindData(
        id: "uav",
        name: "UAV",
        speeds: [20.0, 14.0],
        capacity: 4,
        initial_facing: SouthWest,
        arrival: ReturnHome(facing: SouthWest),
    )"#;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        write(&dir, "car.ron", CAR);
        write(&dir, "uav.ron", UAV);
        write(&dir, "notes.txt", "not a unit");

        let registry = load_kinds_from_directory(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("uav").unwrap().is_aerial());
        assert_eq!(validate_data_directory(dir.path()).unwrap(), 2);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = load_kinds_from_directory(&dir.path().join("nope")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.ron", "UnitKindData(id: ");

        let err = load_kinds_from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { ref path, .. } if path.ends_with("broken.ron")));
    }

    #[test]
    fn test_validation_error() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "bad.ron",
            r#"UnitKindData(id: "bad", name: "Bad", speeds: [], capacity: 1)"#,
        );

        let err = load_kinds_from_directory(dir.path()).unwrap_err();
        match err {
            DataLoadError::ValidationError { kind, errors, .. } => {
                assert_eq!(kind, "bad");
                assert!(!errors.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.ron", CAR);
        write(&dir, "b.ron", CAR);

        let err = load_kinds_from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::DuplicateKind(ref id) if id == "car"));
    }

    #[test]
    fn test_shipped_data_is_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/units");
        assert_eq!(validate_data_directory(&dir).unwrap(), 4);
    }
}
