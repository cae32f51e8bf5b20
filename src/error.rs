use std::path::PathBuf;

use thiserror::Error;

/// A batch submission was rejected before any job was created.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("No video selected!")]
    NoInputs,

    #[error("The output folder is invalid: {0:?}")]
    InvalidOutputDir(PathBuf),

    #[error("The output folder is not writable: {0:?}")]
    ReadOnlyOutputDir(PathBuf),

    #[error("You must set a valid target size (got {0})")]
    InvalidTargetSize(f64),

    #[error("Unknown size unit {0:?}; expected one of b, B, Kb, KB, Mb, MB, Gb, GB")]
    UnknownSizeUnit(String),

    #[error("You must set a valid fps limit (got {0})")]
    InvalidMaxFrameRate(f64),

    #[error("Can't detect a valid {0} instance, check the settings to set it!")]
    ToolUnavailable(&'static str),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProbeError {
    #[error("Unable to run ffprobe on {path:?}: {msg}")]
    Launch { path: PathBuf, msg: String },

    #[error("ffprobe exited with {code:?} for {path:?}")]
    ExitStatus { path: PathBuf, code: Option<i32> },

    #[error("Error parsing ffprobe output for {path:?}: {msg}")]
    Malformed { path: PathBuf, msg: String },
}

impl ProbeError {
    pub fn malformed(path: &PathBuf, msg: &str) -> Self {
        ProbeError::Malformed {
            path: PathBuf::from(path),
            msg: String::from(msg),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    #[error("Video duration must be positive (got {0}s)")]
    NonPositiveDuration(f64),

    #[error("Audio alone ({audio_bits} bits) exceeds the target size ({target_bits} bits)")]
    AudioExceedsTarget { target_bits: f64, audio_bits: f64 },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Unable to run ffmpeg pass {pass} on {path:?}: {msg}")]
    Launch { path: PathBuf, pass: u8, msg: String },

    #[error("ffmpeg pass {pass} exited with {code:?} for {path:?}")]
    ExitStatus { path: PathBuf, pass: u8, code: Option<i32> },
}

/// Anything that halts the job at the head of the queue.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
