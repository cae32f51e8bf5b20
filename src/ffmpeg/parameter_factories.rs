use std::path::PathBuf;

use crate::bitrate::format_frame_rate;
use crate::video_job::VideoJob;

pub mod analysis;
pub mod final_pass;

pub const VIDEO_CODEC: &str = "libx264";

/// Builds the ffmpeg argument list for one of the two encoding passes.
pub trait ParameterFactory {
    fn pass(&self) -> u8;

    fn parameters(&self, job: &VideoJob) -> Vec<PathBuf>;
}

/// Arguments both passes share: input, frame rate, codec, bitrate and pass-log.
fn rate_control_parameters(job: &VideoJob, pass: u8, passlog: &PathBuf) -> Vec<PathBuf> {
    vec![
        PathBuf::from("-y"),
        PathBuf::from("-i"), job.input_path.clone(),
        PathBuf::from("-r"), PathBuf::from(format_frame_rate(job.video_info.fps)),
        PathBuf::from("-c:v"), PathBuf::from(VIDEO_CODEC),
        PathBuf::from("-b:v"), PathBuf::from(format!("{}k", job.video_info.video_bitrate_kbps)),
        PathBuf::from("-pass"), PathBuf::from(pass.to_string()),
        PathBuf::from("-passlogfile"), passlog.clone(),
    ]
}
