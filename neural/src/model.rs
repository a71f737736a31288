//! Frozen trunk network and its session
//!
//! A model directory holds `config.json` ([`ModelConfig`]) and the weights
//! under the `variables` prefix (`variables.cbor`, [`TrunkWeights`]).
//! [`get_model`] builds the network from the config; [`ModelSession::open`]
//! restores the weights once and keeps the network for the whole run.

use kibitz_core::BoardRecord;
use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::planes::{create_feature_planes, INPUT_PLANES};
use crate::ModelError;

/// Name of the penultimate representation consumed by the board extractor
pub const TRUNK_CHANNEL: &str = "trunk";

/// File name of the model config inside a model directory
pub const CONFIG_FILE: &str = "config.json";

/// Weights prefix inside a model directory
pub const WEIGHTS_PREFIX: &str = "variables";

/// Named model outputs, each `[rows, cols, channels]`
pub type ChannelOutputs = HashMap<String, Array3<f32>>;

/// A pretrained board network used as a black box
pub trait BoardModel {
    fn config(&self) -> &ModelConfig;

    /// Run inference on one board snapshot
    fn extract_features(&self, record: &BoardRecord) -> Result<ChannelOutputs, ModelError>;
}

/// Architecture description stored next to the weights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Board side length the network expects
    pub board_size: usize,
    /// Input planes per point
    pub input_planes: usize,
    /// Trunk channels per point
    pub trunk_channels: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "trunk-b1c32".to_string(),
            board_size: 19,
            input_planes: INPUT_PLANES,
            trunk_channels: 32,
        }
    }
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader).map_err(|e| ModelError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if config.input_planes != INPUT_PLANES {
            return Err(ModelError::Config {
                path: path.to_path_buf(),
                reason: format!(
                    "network expects {} input planes, extractor provides {}",
                    config.input_planes, INPUT_PLANES
                ),
            });
        }
        if config.board_size == 0 || config.trunk_channels == 0 {
            return Err(ModelError::Config {
                path: path.to_path_buf(),
                reason: "board_size and trunk_channels must be positive".to_string(),
            });
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ModelError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Per-point projection weights: `kernel` is `[trunk_channels, input_planes]` row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrunkWeights {
    pub kernel: Vec<f32>,
    pub bias: Vec<f32>,
}

impl TrunkWeights {
    /// Deterministic small random weights, for fixtures and smoke runs
    pub fn seeded(config: &ModelConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let kernel = (0..config.trunk_channels * config.input_planes)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        let bias = (0..config.trunk_channels)
            .map(|_| rng.gen_range(-0.1..0.1))
            .collect();
        Self { kernel, bias }
    }

    fn check(&self, config: &ModelConfig, path: &Path) -> Result<(), ModelError> {
        let expected = config.trunk_channels * config.input_planes;
        if self.kernel.len() != expected || self.bias.len() != config.trunk_channels {
            return Err(ModelError::Weights {
                path: path.to_path_buf(),
                reason: format!(
                    "kernel has {} values (expected {}), bias has {} (expected {})",
                    self.kernel.len(),
                    expected,
                    self.bias.len(),
                    config.trunk_channels
                ),
            });
        }
        Ok(())
    }

    /// Write the weights under a prefix
    pub fn save(&self, prefix: &Path) -> Result<(), ModelError> {
        let path = weights_path(prefix);
        let mut writer = BufWriter::new(File::create(&path)?);
        ciborium::ser::into_writer(self, &mut writer).map_err(|e| ModelError::Weights {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        writer.flush()?;
        Ok(())
    }
}

fn weights_path(prefix: &Path) -> PathBuf {
    prefix.with_extension("cbor")
}

/// Frozen per-point trunk: `relu(kernel · planes + bias)` at every board point
#[derive(Debug, Clone)]
pub struct TrunkNet {
    config: ModelConfig,
    kernel: Option<Array2<f32>>,
    bias: Vec<f32>,
}

impl TrunkNet {
    /// Network with no weights; call [`TrunkNet::restore`] before inference
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            kernel: None,
            bias: Vec::new(),
        }
    }

    /// Network built directly from in-memory weights
    pub fn with_weights(config: ModelConfig, weights: TrunkWeights) -> Result<Self, ModelError> {
        let mut net = Self::new(config);
        net.load_weights(weights, Path::new("<memory>"))?;
        Ok(net)
    }

    /// Restore weights from a prefix written by [`TrunkWeights::save`]
    pub fn restore(&mut self, prefix: &Path) -> Result<(), ModelError> {
        let path = weights_path(prefix);
        let reader = BufReader::new(File::open(&path).map_err(|e| ModelError::Weights {
            path: path.clone(),
            reason: e.to_string(),
        })?);
        let weights: TrunkWeights =
            ciborium::de::from_reader(reader).map_err(|e| ModelError::Weights {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        self.load_weights(weights, &path)
    }

    fn load_weights(&mut self, weights: TrunkWeights, path: &Path) -> Result<(), ModelError> {
        weights.check(&self.config, path)?;
        let kernel = Array2::from_shape_vec(
            (self.config.trunk_channels, self.config.input_planes),
            weights.kernel,
        )
        .map_err(|e| ModelError::Weights {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.kernel = Some(kernel);
        self.bias = weights.bias;
        Ok(())
    }

    pub fn is_restored(&self) -> bool {
        self.kernel.is_some()
    }
}

impl BoardModel for TrunkNet {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn extract_features(&self, record: &BoardRecord) -> Result<ChannelOutputs, ModelError> {
        let kernel = self.kernel.as_ref().ok_or(ModelError::NotRestored)?;
        let size = self.config.board_size;
        match record.square_size() {
            Some(n) if n == size => {}
            Some(n) => {
                return Err(ModelError::Shape(format!(
                    "board is {n}x{n}, network expects {size}x{size}"
                )))
            }
            None => {
                return Err(ModelError::Shape(format!(
                    "board grid is not square ({} rows)",
                    record.rows()
                )))
            }
        }

        let planes = create_feature_planes(record, size);
        let mut trunk = Array3::zeros((size, size, self.config.trunk_channels));
        for row in 0..size {
            for col in 0..size {
                let input = planes.slice(ndarray::s![row, col, ..]);
                let hidden = kernel.dot(&input);
                let mut out = trunk.slice_mut(ndarray::s![row, col, ..]);
                for ((dst, h), b) in out.iter_mut().zip(hidden.iter()).zip(&self.bias) {
                    *dst = (h + b).max(0.0);
                }
            }
        }

        debug_assert_eq!(trunk.len_of(Axis(2)), self.config.trunk_channels);
        let mut outputs = ChannelOutputs::new();
        outputs.insert(TRUNK_CHANNEL.to_string(), trunk);
        Ok(outputs)
    }
}

/// Load a model description: returns the unrestored network, the weights
/// prefix and the config.
pub fn get_model(model_dir: &Path) -> Result<(TrunkNet, PathBuf, ModelConfig), ModelError> {
    let config = ModelConfig::load(&model_dir.join(CONFIG_FILE))?;
    let prefix = model_dir.join(WEIGHTS_PREFIX);
    Ok((TrunkNet::new(config.clone()), prefix, config))
}

/// A restored model, held for the duration of a run
#[derive(Debug)]
pub struct ModelSession {
    model: TrunkNet,
    model_dir: PathBuf,
}

impl ModelSession {
    /// Load the config and restore the weights
    pub fn open(model_dir: &Path) -> Result<Self, ModelError> {
        let (mut model, prefix, config) = get_model(model_dir)?;
        model.restore(&prefix)?;
        info!(
            "Restored model {} ({}x{} board, {} trunk channels) from {}",
            config.name,
            config.board_size,
            config.board_size,
            config.trunk_channels,
            model_dir.display()
        );
        Ok(Self {
            model,
            model_dir: model_dir.to_path_buf(),
        })
    }

    /// Write a model directory with seeded weights
    pub fn create_seeded(model_dir: &Path, config: &ModelConfig, seed: u64) -> Result<(), ModelError> {
        std::fs::create_dir_all(model_dir)?;
        config.save(&model_dir.join(CONFIG_FILE))?;
        TrunkWeights::seeded(config, seed).save(&model_dir.join(WEIGHTS_PREFIX))
    }

    pub fn model(&self) -> &TrunkNet {
        &self.model
    }
}

impl Drop for ModelSession {
    fn drop(&mut self) {
        info!("Releasing model session for {}", self.model_dir.display());
    }
}
