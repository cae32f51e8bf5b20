use std::path::PathBuf;

use crate::video_job::VideoJob;
use super::{rate_control_parameters, ParameterFactory};

#[cfg(windows)]
const NULL_SINK: &str = "NUL";
#[cfg(not(windows))]
const NULL_SINK: &str = "/dev/null";

/// Pass 1: gathers rate-control statistics into the pass-log and discards
/// the encoded video.
pub struct AnalysisPass {
    passlog: PathBuf,
}

impl AnalysisPass {
    pub fn new(passlog: &PathBuf) -> Self {
        AnalysisPass {
            passlog: passlog.clone(),
        }
    }
}

impl ParameterFactory for AnalysisPass {
    fn pass(&self) -> u8 {
        1
    }

    fn parameters(&self, job: &VideoJob) -> Vec<PathBuf> {
        let mut params = rate_control_parameters(job, self.pass(), &self.passlog);
        params.push(PathBuf::from("-an"));
        params.push(PathBuf::from("-f"));
        params.push(PathBuf::from("null"));
        params.push(PathBuf::from(NULL_SINK));
        params
    }
}
