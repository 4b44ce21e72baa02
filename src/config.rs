use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

#[cfg(feature = "tch-backend")]
use tch::Device;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[batch, height, width, channels]`, the layout the images are prepared in.
    Nhwc,
    /// `[batch, channels, height, width]`.
    Nchw,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub metadata_path: PathBuf,
    pub models_dir: PathBuf,
    /// Candidate artifact extensions, probed in order for every model.
    pub artifact_extensions: Vec<String>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Refuse to start when a loaded model has no preprocessing rule.
    pub strict_preprocessing: bool,
    pub tensor_layout: TensorLayout,
    #[cfg(feature = "tch-backend")]
    pub device: Device,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".into())
            .parse()
            .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));

        let metadata_path = PathBuf::from(
            env::var("METADATA_PATH").unwrap_or_else(|_| "metadata.json".to_string()),
        );
        let models_dir =
            PathBuf::from(env::var("MODELS_DIR").unwrap_or_else(|_| "models".to_string()));

        let artifact_extensions = env::var("ARTIFACT_EXTENSIONS")
            .ok()
            .map(|raw| parse_extensions(&raw))
            .filter(|exts| !exts.is_empty())
            .unwrap_or_else(default_extensions);

        let upload_dir = env::var("UPLOAD_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let strict_preprocessing = env::var("STRICT_PREPROCESSING")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(false);
        let tensor_layout = env::var("TENSOR_LAYOUT")
            .ok()
            .and_then(|v| parse_layout(&v))
            .unwrap_or(TensorLayout::Nhwc);

        #[cfg(feature = "tch-backend")]
        let device = {
            let raw = env::var("DEVICE").unwrap_or_else(|_| "cpu".into());
            parse_device(&raw)
        };

        Ok(Self {
            listen_addr,
            metadata_path,
            models_dir,
            artifact_extensions,
            upload_dir,
            max_upload_bytes,
            strict_preprocessing,
            tensor_layout,
            #[cfg(feature = "tch-backend")]
            device,
        })
    }

    /// Configuration rooted at the given directories with every other knob at its default.
    pub fn with_paths(metadata_path: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            metadata_path: metadata_path.into(),
            models_dir: models_dir.into(),
            artifact_extensions: default_extensions(),
            upload_dir: env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            strict_preprocessing: false,
            tensor_layout: TensorLayout::Nhwc,
            #[cfg(feature = "tch-backend")]
            device: Device::Cpu,
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["h5".to_string(), "keras".to_string()]
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.'))
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_layout(raw: &str) -> Option<TensorLayout> {
    match raw.trim().to_lowercase().as_str() {
        "nhwc" => Some(TensorLayout::Nhwc),
        "nchw" => Some(TensorLayout::Nchw),
        _ => None,
    }
}

#[cfg(feature = "tch-backend")]
fn parse_device(raw: &str) -> Device {
    let lower = raw.to_lowercase();
    if lower == "cpu" {
        Device::Cpu
    } else if lower.starts_with("cuda") {
        let idx = lower
            .split(':')
            .nth(1)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        if tch::Cuda::is_available() {
            Device::Cuda(idx)
        } else {
            Device::Cpu
        }
    } else {
        Device::Cpu
    }
}
