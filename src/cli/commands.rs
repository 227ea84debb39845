// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the subcommands and all their configurable flags.
// Every flag can also come from an environment variable, so a
// container can be configured without a command line.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::{
    evaluate_use_case::EvaluateConfig,
    fetch_use_case::AcquireConfig,
    predict_use_case::PredictConfig,
    serve_use_case::ServeConfig,
    train_use_case::TrainConfig,
};
use crate::infra::acquirer::{RemoteFiles, DEFAULT_HUB_ENDPOINT, DEFAULT_REVISION};
use crate::infra::artifact_store::{CLASSES_FILE, WEIGHTS_FILE};
use crate::server::{ServerSettings, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the CNN on the lung image set and save a model version
    Train(TrainArgs),

    /// Classify one image with a saved model
    Predict(PredictArgs),

    /// Write a classification report and confusion matrix for a saved model
    Evaluate(EvaluateArgs),

    /// Make sure the serving artifacts are present locally
    Fetch(FetchArgs),

    /// Start the HTTP prediction service
    Serve(ServeArgs),
}

// ─── Shared argument groups ───────────────────────────────────────────────────

/// Where the raw images live
#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// Zip archive of the Kaggle lung and colon histopathology set
    #[arg(long, env = "RAW_ZIP_PATH",
          default_value = "data/raw/lung-and-colon-cancer-histopathological-images.zip")]
    pub raw_zip_path: PathBuf,

    /// Directory the archive is extracted into
    #[arg(long, env = "EXTRACT_DIR", default_value = "data/raw/lung_colon_image_set")]
    pub extract_dir: PathBuf,

    /// Directory with one subdirectory per class
    #[arg(long, env = "LUNG_PATH", default_value = "data/raw/lung_colon_image_set/lung_image_sets")]
    pub lung_path: PathBuf,
}

/// Versioned artifact and report locations
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Model version; artifacts go to <artifact-root>/<version>/
    #[arg(long, env = "MODEL_VERSION", default_value = "v1")]
    pub model_version: String,

    #[arg(long, env = "ARTIFACT_ROOT", default_value = "artifacts/models")]
    pub artifact_root: PathBuf,

    /// Training history, classification reports, confusion matrices
    #[arg(long, env = "REPORTS_DIR", default_value = "artifacts/reports")]
    pub reports_dir: PathBuf,
}

/// Model version to resolve, its local location and an optional model hub source
#[derive(Args, Debug)]
pub struct AcquireArgs {
    /// Version to serve; looked up in <artifact-root>/<version>/
    #[arg(long, env = "MODEL_VERSION", default_value = "v1")]
    pub model_version: String,

    #[arg(long, env = "ARTIFACT_ROOT", default_value = "artifacts/models")]
    pub artifact_root: PathBuf,

    /// Read the weights and class files from this directory instead
    #[arg(long, env = "MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Model hub repository to download missing files from
    #[arg(long, env = "HF_MODEL_REPO")]
    pub hf_model_repo: Option<String>,

    /// Weights file name inside the hub repository
    #[arg(long, env = "HF_MODEL_FILE", default_value = WEIGHTS_FILE)]
    pub hf_model_file: String,

    /// Class list file name inside the hub repository
    #[arg(long, env = "HF_CLASSES_FILE", default_value = CLASSES_FILE)]
    pub hf_classes_file: String,

    #[arg(long, env = "HF_ENDPOINT", default_value = DEFAULT_HUB_ENDPOINT)]
    pub hf_endpoint: String,

    #[arg(long, env = "HF_REVISION", default_value = DEFAULT_REVISION)]
    pub hf_revision: String,

    /// Bearer token for private repositories
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,
}

impl From<AcquireArgs> for AcquireConfig {
    fn from(a: AcquireArgs) -> Self {
        AcquireConfig {
            model_version: a.model_version,
            artifact_root: a.artifact_root,
            model_dir:     a.model_dir,
            remote:        RemoteFiles { weights: a.hf_model_file, classes: a.hf_classes_file },
            repo:          a.hf_model_repo,
            endpoint:      a.hf_endpoint,
            revision:      a.hf_revision,
            token:         a.hf_token,
        }
    }
}

// ─── train ────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Side length images are resized to (minimum 8)
    #[arg(long, env = "IMG_SIZE", default_value_t = 256)]
    pub img_size: u32,

    /// Fraction of the images held out for validation
    #[arg(long, env = "SPLIT", default_value_t = 0.2)]
    pub split: f64,

    /// Number of images processed together in one step
    #[arg(long, env = "BATCH_SIZE", default_value_t = 64)]
    pub batch_size: usize,

    /// Maximum number of full passes through the training data
    #[arg(long, env = "EPOCHS", default_value_t = 10)]
    pub epochs: usize,

    /// Seeds the train/validation split and the batch shuffle
    #[arg(long, env = "SEED", default_value_t = 2022)]
    pub seed: u64,

    /// Class directory names, in label order
    #[arg(long, env = "CLASSES", value_delimiter = ',',
          default_value = "lung_n,lung_aca,lung_scc")]
    pub classes: Vec<String>,

    /// Initial Adam learning rate
    #[arg(long, env = "LEARNING_RATE", default_value_t = 1e-3)]
    pub lr: f64,

    /// Epochs without a validation-accuracy gain before stopping
    #[arg(long, default_value_t = 3)]
    pub early_stop_patience: usize,

    /// Epochs without a validation-loss gain before halving the LR
    #[arg(long, default_value_t = 2)]
    pub lr_patience: usize,

    /// Stop as soon as validation accuracy reaches this value
    #[arg(long, env = "TARGET_VAL_ACC", default_value_t = 0.90)]
    pub target_accuracy: f64,

    /// Data loader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,
}

/// This is the boundary between Layer 1 and Layer 2 -
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            img_size:            a.img_size,
            split:               a.split,
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            seed:                a.seed,
            model_version:       a.store.model_version,
            raw_zip_path:        a.dataset.raw_zip_path,
            extract_dir:         a.dataset.extract_dir,
            lung_path:           a.dataset.lung_path,
            artifact_root:       a.store.artifact_root,
            reports_dir:         a.store.reports_dir,
            classes:             a.classes,
            learning_rate:       a.lr,
            early_stop_patience: a.early_stop_patience,
            lr_patience:         a.lr_patience,
            target_accuracy:     a.target_accuracy,
            num_workers:         a.num_workers,
        }
    }
}

// ─── predict ──────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JPG or PNG image to classify
    #[arg(long)]
    pub image: PathBuf,

    #[arg(long, default_value = "artifacts/models/v1/lung_cnn.bin")]
    pub model: PathBuf,

    #[arg(long, default_value = "artifacts/models/v1/classes.json")]
    pub classes: PathBuf,

    /// Input size, used only when the model has no metadata.json
    #[arg(long, env = "IMG_SIZE", default_value_t = 256)]
    pub img_size: u32,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig { image: a.image, model: a.model, classes: a.classes, img_size: a.img_size }
    }
}

// ─── evaluate ─────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Fallback when the model has no metadata.json
    #[arg(long, env = "IMG_SIZE", default_value_t = 256)]
    pub img_size: u32,

    /// Fallback when the model has no metadata.json
    #[arg(long, env = "SPLIT", default_value_t = 0.2)]
    pub split: f64,

    /// Fallback when the model has no metadata.json
    #[arg(long, env = "SEED", default_value_t = 2022)]
    pub seed: u64,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            model_version: a.store.model_version,
            artifact_root: a.store.artifact_root,
            reports_dir:   a.store.reports_dir,
            raw_zip_path:  a.dataset.raw_zip_path,
            extract_dir:   a.dataset.extract_dir,
            lung_path:     a.dataset.lung_path,
            img_size:      a.img_size,
            split:         a.split,
            seed:          a.seed,
        }
    }
}

// ─── fetch ────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub acquire: AcquireArgs,
}

// ─── serve ────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub acquire: AcquireArgs,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Input size, used only when the model has no metadata.json
    #[arg(long, env = "IMG_SIZE", default_value_t = 256)]
    pub img_size: u32,

    /// Comma-separated origins allowed by CORS
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',',
          default_value = "http://localhost:5173,http://127.0.0.1:5173")]
    pub allowed_origins: Vec<String>,

    /// Largest accepted /predict request body, in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Start without a model; /predict answers 503
    #[arg(long, env = "SKIP_MODEL_LOAD")]
    pub skip_model_load: bool,
}

impl From<ServeArgs> for ServeConfig {
    fn from(a: ServeArgs) -> Self {
        ServeConfig {
            server: ServerSettings {
                host:             a.host,
                port:             a.port,
                allowed_origins:  a.allowed_origins,
                max_upload_bytes: a.max_upload_bytes,
            },
            acquire:         a.acquire.into(),
            img_size:        a.img_size,
            skip_model_load: a.skip_model_load,
        }
    }
}
