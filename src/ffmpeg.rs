use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

pub mod launcher;
pub mod parameter_factories;
pub mod probe;

/// The encoder and prober executables, `None` when not usable.
#[derive(Clone, Debug, PartialEq)]
pub struct Toolchain {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl Toolchain {
    /// Checks the given paths, or the bare program names looked up on PATH.
    pub fn detect(ffmpeg: Option<PathBuf>, ffprobe: Option<PathBuf>) -> Self {
        Toolchain {
            ffmpeg: resolve(ffmpeg.unwrap_or_else(|| PathBuf::from("ffmpeg"))),
            ffprobe: resolve(ffprobe.unwrap_or_else(|| PathBuf::from("ffprobe"))),
        }
    }
}

fn resolve(program: PathBuf) -> Option<PathBuf> {
    if is_installed(&program) {
        debug!(program = %program.display(), "found");
        Some(program)
    } else {
        warn!(program = %program.display(), "not usable");
        None
    }
}

pub fn is_installed(program: &PathBuf) -> bool {
    let cmd = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match cmd {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}
