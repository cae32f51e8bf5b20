use std::env;
use std::path::PathBuf;

use crate::size_unit::SizeUnit;

/// One batch request: what to compress and how small it must get.
#[derive(Clone, Debug)]
pub struct Submission {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub target_size: f64,
    /// Size unit token (`b`, `B`, `Kb`, `KB`, `Mb`, `MB`, `Gb`, `GB`).
    pub unit: String,
    pub max_fps: Option<f64>,
}

impl Submission {
    pub fn new(inputs: Vec<PathBuf>, output_dir: PathBuf) -> Self {
        Submission {
            inputs,
            output_dir,
            target_size: 50.0,
            unit: SizeUnit::default().to_string(),
            max_fps: None,
        }
    }

    pub fn target_size(mut self, target_size: f64, unit: &str) -> Self {
        self.target_size = target_size;
        self.unit = String::from(unit);
        self
    }

    pub fn max_fps(mut self, max_fps: Option<f64>) -> Self {
        self.max_fps = max_fps;
        self
    }
}

/// Settings fixed for the lifetime of a pipeline.
///
/// `passlog` is shared by every job; two pipelines must not run against the
/// same pass-log at once.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub passlog: PathBuf,
}

impl PipelineOptions {
    pub fn new(ffmpeg: Option<PathBuf>, ffprobe: Option<PathBuf>) -> Self {
        PipelineOptions {
            ffmpeg,
            ffprobe,
            passlog: default_passlog(),
        }
    }

    pub fn passlog(mut self, passlog: PathBuf) -> Self {
        self.passlog = passlog;
        self
    }
}

pub fn default_passlog() -> PathBuf {
    env::temp_dir().join("compress-to-size").join("ffmpeg_pass-0")
}
