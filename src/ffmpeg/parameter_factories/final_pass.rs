use std::path::PathBuf;

use crate::video_job::VideoJob;
use super::{rate_control_parameters, ParameterFactory};

pub const AUDIO_CODEC: &str = "aac";

/// Pass 2: re-encodes with the pass-1 statistics and writes the job's output.
pub struct FinalPass {
    passlog: PathBuf,
}

impl FinalPass {
    pub fn new(passlog: &PathBuf) -> Self {
        FinalPass {
            passlog: passlog.clone(),
        }
    }
}

impl ParameterFactory for FinalPass {
    fn pass(&self) -> u8 {
        2
    }

    fn parameters(&self, job: &VideoJob) -> Vec<PathBuf> {
        let mut params = rate_control_parameters(job, self.pass(), &self.passlog);

        match job.video_info.audio_bitrate_kbps {
            0 => params.push(PathBuf::from("-an")),
            kbps => {
                params.push(PathBuf::from("-c:a")); params.push(PathBuf::from(AUDIO_CODEC));
                params.push(PathBuf::from("-b:a")); params.push(PathBuf::from(format!("{}k", kbps)));
            },
        }

        params.push(PathBuf::from("-preset")); params.push(PathBuf::from("slow"));
        params.push(PathBuf::from("-profile:v")); params.push(PathBuf::from("high"));
        params.push(PathBuf::from("-level")); params.push(PathBuf::from("4.2"));
        params.push(job.output_path.clone());
        params
    }
}
