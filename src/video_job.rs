use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::ffmpeg::probe::MediaInfo;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub video_info: MediaInfo,
}

impl VideoJob {
    pub fn new(input_path: PathBuf, output_path: PathBuf) -> Self {
        VideoJob {
            input_path,
            output_path,
            video_info: MediaInfo::default(),
        }
    }

    pub fn file_name(&self) -> String {
        match self.input_path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => self.input_path.display().to_string(),
        }
    }
}

/// Creates one job per input, in order, all writing into `output_dir`.
///
/// When an input's file name is already a suffix of an earlier job's output
/// path, the input's zero-based position is appended to its stem
/// (`clip.mp4` -> `clip1.mp4`). Only that one collision is avoided; a name
/// produced this way can still match a later input.
pub fn assign_output_paths(inputs: &[PathBuf], output_dir: &Path) -> Vec<VideoJob> {
    let mut jobs: Vec<VideoJob> = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let file_name = match input.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => input.display().to_string(),
        };
        let collides = jobs.iter()
            .any(|job| job.output_path.to_string_lossy().ends_with(file_name.as_str()));

        let output_path = if collides {
            output_dir.join(indexed_file_name(input, index))
        } else {
            output_dir.join(&file_name)
        };
        jobs.push(VideoJob::new(input.clone(), output_path));
    }
    jobs
}

fn indexed_file_name(input: &Path, index: usize) -> OsString {
    let mut name = OsString::new();
    if let Some(stem) = input.file_stem() {
        name.push(stem);
    }
    name.push(index.to_string());
    if let Some(extension) = input.extension() {
        name.push(".");
        name.push(extension);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_unique_names_are_kept() {
        let jobs = assign_output_paths(&paths(&["a/one.mp4", "b/two.mp4"]), Path::new("/out"));
        assert_eq!(jobs[0].output_path, PathBuf::from("/out/one.mp4"));
        assert_eq!(jobs[1].output_path, PathBuf::from("/out/two.mp4"));
        assert_eq!(jobs[1].input_path, PathBuf::from("b/two.mp4"));
    }

    #[test]
    fn test_same_name_gets_submission_index() {
        let jobs = assign_output_paths(&paths(&["a/clip.mp4", "b/clip.mp4"]), Path::new("/out"));
        assert_eq!(jobs[0].output_path, PathBuf::from("/out/clip.mp4"));
        assert_eq!(jobs[1].output_path, PathBuf::from("/out/clip1.mp4"));
        assert_ne!(jobs[0].output_path, jobs[1].output_path);
    }

    #[test]
    fn test_index_is_position_in_batch() {
        let jobs = assign_output_paths(&paths(&["x.mp4", "a/clip.mp4", "other.mp4", "b/clip.mp4"]), Path::new("out"));
        assert_eq!(jobs[3].output_path, PathBuf::from("out/clip3.mp4"));
    }

    #[test]
    fn test_suffix_match_counts_as_collision() {
        let jobs = assign_output_paths(&paths(&["myclip.mp4", "clip.mp4"]), Path::new("out"));
        assert_eq!(jobs[1].output_path, PathBuf::from("out/clip1.mp4"));
    }

    #[test]
    fn test_input_without_extension() {
        let jobs = assign_output_paths(&paths(&["a/raw", "b/raw"]), Path::new("out"));
        assert_eq!(jobs[1].output_path, PathBuf::from("out/raw1"));
    }

    #[test]
    fn test_file_name() {
        let job = VideoJob::new(PathBuf::from("/videos/holiday.mp4"), PathBuf::from("/out/holiday.mp4"));
        assert_eq!(job.file_name(), "holiday.mp4");
        assert_eq!(job.video_info, MediaInfo::default());
    }
}
