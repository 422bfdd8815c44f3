//! Batch rendering: many independent backgrounds written as numbered PNGs.
//!
//! Every image gets its own [`Xorshift64`] seeded with
//! `derive_seed(config.seed, index)`, so images render in parallel without
//! sharing a generator and any single image can be regenerated later from
//! its [`Recipe`] in the manifest.

use backdrop_core::compose::{random_background_with, BackgroundParams};
use backdrop_core::error::SynthError;
use backdrop_core::prng::{derive_seed, RandomSource, Xorshift64};
use backdrop_core::recipe::Recipe;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::snapshot::write_png;

/// File name of the manifest written next to the images.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Default image side length.
pub const DEFAULT_SIZE: usize = 300;
/// Default inclusive lower bound of the per-image layer count.
pub const DEFAULT_LAYERS_MIN: usize = 2;
/// Default exclusive upper bound of the per-image layer count.
pub const DEFAULT_LAYERS_MAX: usize = 4;
/// Default file name prefix.
pub const DEFAULT_PREFIX: &str = "background";

/// What to render and where to put it.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of images to render.
    pub count: usize,
    /// Side length of every image.
    pub size: usize,
    /// Inclusive lower bound of the layer count.
    pub layers_min: usize,
    /// Exclusive upper bound of the layer count. When not above
    /// `layers_min`, every image uses exactly `layers_min` layers.
    pub layers_max: usize,
    /// Base seed every per-image seed derives from.
    pub seed: u64,
    /// Index of the first image; files are numbered from here.
    pub start_index: usize,
    /// File name prefix, followed by the image index and `.png`.
    pub prefix: String,
    /// Directory the images and manifest are written to.
    pub output_dir: PathBuf,
    /// Parameter overrides parsed by [`BackgroundParams::from_json`].
    pub params: Value,
}

impl BatchConfig {
    /// Creates a config with default size, layer range, prefix and params.
    pub fn new(output_dir: impl Into<PathBuf>, count: usize, seed: u64) -> Self {
        Self {
            count,
            size: DEFAULT_SIZE,
            layers_min: DEFAULT_LAYERS_MIN,
            layers_max: DEFAULT_LAYERS_MAX,
            seed,
            start_index: 0,
            prefix: DEFAULT_PREFIX.to_string(),
            output_dir: output_dir.into(),
            params: Value::Object(serde_json::Map::new()),
        }
    }

    /// Checks the config and returns the parsed background params.
    pub fn validate(&self) -> Result<BackgroundParams, SynthError> {
        if self.size == 0 {
            return Err(SynthError::InvalidDimensions {
                width: self.size,
                height: self.size,
            });
        }
        if self.layers_max < self.layers_min {
            return Err(SynthError::invalid_parameter(
                "layers_max",
                format!("{} < layers_min {}", self.layers_max, self.layers_min),
            ));
        }
        if self.start_index.checked_add(self.count).is_none() {
            return Err(SynthError::invalid_parameter(
                "start_index",
                format!("{} + count {} overflows", self.start_index, self.count),
            ));
        }
        if self.prefix.contains(['/', '\\']) {
            return Err(SynthError::invalid_parameter("prefix", &self.prefix));
        }
        BackgroundParams::from_json(&self.params)
    }

    /// File name of image `index`, e.g. `background7.png`.
    pub fn file_name(&self, index: usize) -> String {
        format!("{}{index}.png", self.prefix)
    }

    /// The reproducible recipe of image `index`.
    ///
    /// The layer count is drawn from its own stream so the image stream
    /// starts untouched at `seed`.
    pub fn recipe(&self, index: usize) -> Recipe {
        let seed = derive_seed(self.seed, index as u64);
        let mut layer_rng = Xorshift64::new(derive_seed(seed, 0));
        let layers = layer_rng.next_usize_range(self.layers_min, self.layers_max);
        Recipe {
            size: self.size,
            layers,
            seed,
            params: self.params.clone(),
        }
    }
}

/// One written image and how to regenerate it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    /// File name relative to the output directory.
    pub file: String,
    pub recipe: Recipe,
}

/// Outcome of [`run_batch`].
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Images written, in index order.
    pub written: Vec<ManifestEntry>,
    /// Images that failed to render or write and were skipped.
    pub failed: usize,
    /// Path of the manifest file.
    pub manifest: PathBuf,
}

/// Renders `config.count` backgrounds in parallel and writes them as PNGs.
///
/// Invalid configuration fails before anything is rendered. After that, a
/// single image that fails to write is logged and skipped; the rest of the
/// batch continues. The manifest lists only the images actually written.
pub fn run_batch(config: &BatchConfig) -> Result<BatchReport, SynthError> {
    let params = config.validate()?;
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| SynthError::Io(format!("{}: {e}", config.output_dir.display())))?;

    tracing::info!(
        count = config.count,
        size = config.size,
        seed = config.seed,
        dir = %config.output_dir.display(),
        "starting batch"
    );

    let outcomes: Vec<Option<ManifestEntry>> = (0..config.count)
        .into_par_iter()
        .map(|offset| {
            let index = config.start_index + offset;
            let recipe = config.recipe(index);
            let file = config.file_name(index);
            let path = config.output_dir.join(&file);
            match render_to(&recipe, &params, &path) {
                Ok(()) => {
                    tracing::info!(index, layers = recipe.layers, path = %path.display(), "wrote background");
                    Some(ManifestEntry { file, recipe })
                }
                Err(e) => {
                    tracing::warn!(index, path = %path.display(), error = %e, "skipping background");
                    None
                }
            }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.is_none()).count();
    let written: Vec<ManifestEntry> = outcomes.into_iter().flatten().collect();
    let manifest = config.output_dir.join(MANIFEST_FILE);
    write_manifest(&written, &manifest)?;

    tracing::info!(written = written.len(), failed, "batch complete");
    Ok(BatchReport {
        written,
        failed,
        manifest,
    })
}

/// Reads a manifest written by [`run_batch`].
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, SynthError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SynthError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| SynthError::Io(format!("{}: {e}", path.display())))
}

fn render_to(recipe: &Recipe, params: &BackgroundParams, path: &Path) -> Result<(), SynthError> {
    let mut rng = Xorshift64::new(recipe.seed);
    let image = random_background_with(recipe.layers, recipe.size, params, &mut rng)?;
    write_png(&image, path)
}

fn write_manifest(entries: &[ManifestEntry], path: &Path) -> Result<(), SynthError> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| SynthError::Io(format!("manifest encoding failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| SynthError::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::image_to_rgb8;

    fn small_config(dir: &Path, count: usize) -> BatchConfig {
        BatchConfig {
            size: 24,
            ..BatchConfig::new(dir, count, 42)
        }
    }

    #[test]
    fn run_batch_writes_numbered_pngs_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig {
            start_index: 500,
            ..small_config(dir.path(), 3)
        };
        let report = run_batch(&config).unwrap();

        assert_eq!(report.failed, 0);
        assert_eq!(report.written.len(), 3);
        for (i, entry) in report.written.iter().enumerate() {
            assert_eq!(entry.file, format!("background{}.png", 500 + i));
            let img = image::open(dir.path().join(&entry.file)).unwrap().to_rgb8();
            assert_eq!((img.width(), img.height()), (24, 24));
        }
        assert_eq!(read_manifest(&report.manifest).unwrap(), report.written);
    }

    #[test]
    fn written_images_match_their_recipes() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_batch(&small_config(dir.path(), 2)).unwrap();
        for entry in &report.written {
            let expected = image_to_rgb8(&entry.recipe.render().unwrap());
            let on_disk = image::open(dir.path().join(&entry.file))
                .unwrap()
                .to_rgb8()
                .into_raw();
            assert_eq!(on_disk, expected, "{} differs from its recipe", entry.file);
        }
    }

    #[test]
    fn recipes_use_layer_range_and_distinct_seeds() {
        let config = BatchConfig::new("unused", 0, 7);
        let recipes: Vec<Recipe> = (0..50).map(|i| config.recipe(i)).collect();
        assert!(recipes.iter().all(|r| (2..4).contains(&r.layers)));
        assert!(recipes.iter().any(|r| r.layers == 2));
        assert!(recipes.iter().any(|r| r.layers == 3));
        for (i, a) in recipes.iter().enumerate() {
            for b in &recipes[i + 1..] {
                assert_ne!(a.seed, b.seed);
            }
        }
        assert_eq!(config.recipe(3), config.recipe(3));
    }

    #[test]
    fn equal_layer_bounds_fix_the_layer_count() {
        let config = BatchConfig {
            layers_min: 5,
            layers_max: 5,
            ..BatchConfig::new("unused", 0, 7)
        };
        assert!((0..20).all(|i| config.recipe(i).layers == 5));
    }

    #[test]
    fn failed_image_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the file name makes that one write fail.
        std::fs::create_dir(dir.path().join("background1.png")).unwrap();
        let report = run_batch(&small_config(dir.path(), 3)).unwrap();

        assert_eq!(report.failed, 1);
        let files: Vec<&str> = report.written.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(files, ["background0.png", "background2.png"]);
        assert_eq!(read_manifest(&report.manifest).unwrap().len(), 2);
    }

    #[test]
    fn invalid_config_fails_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");

        let zero = BatchConfig {
            size: 0,
            ..BatchConfig::new(&out, 1, 1)
        };
        assert!(matches!(
            run_batch(&zero),
            Err(SynthError::InvalidDimensions { .. })
        ));

        let inverted = BatchConfig {
            layers_min: 4,
            layers_max: 2,
            ..BatchConfig::new(&out, 1, 1)
        };
        assert!(matches!(
            run_batch(&inverted),
            Err(SynthError::InvalidParameter {
                name: "layers_max",
                ..
            })
        ));

        let bad_params = BatchConfig {
            params: serde_json::json!({"falloff": "cubic"}),
            ..BatchConfig::new(&out, 1, 1)
        };
        assert!(run_batch(&bad_params).is_err());

        let bad_prefix = BatchConfig {
            prefix: "../escape".into(),
            ..BatchConfig::new(&out, 1, 1)
        };
        assert!(run_batch(&bad_prefix).is_err());

        let overflowing = BatchConfig {
            start_index: usize::MAX,
            ..BatchConfig::new(&out, 2, 1)
        };
        assert!(matches!(
            run_batch(&overflowing),
            Err(SynthError::InvalidParameter {
                name: "start_index",
                ..
            })
        ));

        assert!(!out.exists(), "nothing should be written for invalid configs");
    }

    #[test]
    fn empty_batch_writes_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_batch(&small_config(dir.path(), 0)).unwrap();
        assert!(report.written.is_empty());
        assert!(read_manifest(&report.manifest).unwrap().is_empty());
    }

    #[test]
    fn read_manifest_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_manifest(&dir.path().join(MANIFEST_FILE)),
            Err(SynthError::Io(_))
        ));
    }
}
