use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, info};

use crate::error::{EncodeError, ProbeError};
use crate::ffmpeg::probe::{parse_probe_output, probe_args, MediaInfo};
use crate::pipeline::PipelineEvent;

/// Starts external processes without blocking the caller. Every outcome is
/// delivered later as a [`PipelineEvent`] tagged with `generation`.
pub trait ProcessLauncher {
    fn probe(&self, ffprobe: &PathBuf, input: &PathBuf, generation: u64, events: Sender<PipelineEvent>);

    fn encode(&self, ffmpeg: &PathBuf, pass: u8, input: &PathBuf, args: Vec<PathBuf>, generation: u64, events: Sender<PipelineEvent>);
}

/// Runs each process on its own worker thread.
#[derive(Debug, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn probe(&self, ffprobe: &PathBuf, input: &PathBuf, generation: u64, events: Sender<PipelineEvent>) {
        let ffprobe = ffprobe.clone();
        let input = input.clone();
        thread::spawn(move || {
            let result = probe_file(&ffprobe, &input);
            let _ = events.send(PipelineEvent::ProbeCompleted { generation, result });
        });
    }

    fn encode(&self, ffmpeg: &PathBuf, pass: u8, input: &PathBuf, args: Vec<PathBuf>, generation: u64, events: Sender<PipelineEvent>) {
        let ffmpeg = ffmpeg.clone();
        let input = input.clone();
        thread::spawn(move || {
            let result = run_pass(&ffmpeg, pass, &input, &args, generation, &events);
            let _ = events.send(PipelineEvent::PassCompleted { generation, pass, result });
        });
    }
}

/// Runs ffprobe to completion and parses what it printed.
pub fn probe_file(ffprobe: &PathBuf, path: &PathBuf) -> Result<MediaInfo, ProbeError> {
    debug!("{} {:?}", ffprobe.display(), probe_args(path));
    let output = Command::new(ffprobe)
        .args(probe_args(path))
        .stdin(Stdio::null())
        .output()
        .map_err(|err| ProbeError::Launch { path: path.clone(), msg: err.to_string() })?;
    if output.status.success() {
        parse_probe_output(path, &output.stdout)
    } else {
        Err(ProbeError::ExitStatus { path: path.clone(), code: output.status.code() })
    }
}

fn run_pass(
    ffmpeg: &PathBuf,
    pass: u8,
    input: &PathBuf,
    args: &[PathBuf],
    generation: u64,
    events: &Sender<PipelineEvent>
) -> Result<(), EncodeError> {
    info!(pass, input = %input.display(), "starting ffmpeg");
    debug!("{} {:?}", ffmpeg.display(), args);
    let launch_error = |msg: String| EncodeError::Launch { path: input.clone(), pass, msg };

    let mut child = Command::new(ffmpeg)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| launch_error(err.to_string()))?;

    // keep draining even when nobody listens any more, or ffmpeg blocks on a full pipe
    if let Some(stderr) = child.stderr.take() {
        for_each_line(stderr, |line| {
            let _ = events.send(PipelineEvent::ProgressLine { generation, line });
        });
    }

    let status = child.wait().map_err(|err| launch_error(err.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(EncodeError::ExitStatus { path: input.clone(), pass, code: status.code() })
    }
}

/// Calls `f` for every non-empty line, treating `\r` like `\n` since ffmpeg
/// rewrites its stat line in place with carriage returns.
pub fn for_each_line<R: Read>(reader: R, mut f: impl FnMut(String)) {
    let mut reader = BufReader::new(reader);
    let mut line: Vec<u8> = Vec::new();
    loop {
        let buf = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        if buf.is_empty() {
            break;
        }

        let len = buf.len();
        for &byte in buf {
            if byte == b'\r' || byte == b'\n' {
                if !line.is_empty() {
                    f(String::from_utf8_lossy(&line).into_owned());
                    line.clear();
                }
            } else {
                line.push(byte);
            }
        }
        reader.consume(len);
    }

    if !line.is_empty() {
        f(String::from_utf8_lossy(&line).into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn collect(input: &[u8]) -> Vec<String> {
        let mut lines = vec![];
        for_each_line(input, |line| lines.push(line));
        lines
    }

    #[test]
    fn test_for_each_line_splits_on_carriage_returns() {
        let stderr = b"Input #0, mov\nframe=  10 time=00:00:01.00\rframe=  20 time=00:00:02.00\r\nframe=  30 time=00:00:03.00";
        assert_eq!(collect(stderr), vec![
            "Input #0, mov",
            "frame=  10 time=00:00:01.00",
            "frame=  20 time=00:00:02.00",
            "frame=  30 time=00:00:03.00",
        ]);
    }

    #[test]
    fn test_for_each_line_skips_blank_lines() {
        assert_eq!(collect(b"\r\n\n\r"), Vec::<String>::new());
        assert_eq!(collect(b""), Vec::<String>::new());
    }

    #[test]
    fn test_probe_reports_launch_failure() {
        let result = probe_file(&PathBuf::from("/nonexistent/ffprobe"), &PathBuf::from("clip.mp4"));
        assert!(matches!(result, Err(ProbeError::Launch { .. })));
    }

    #[test]
    fn test_encode_launch_failure_arrives_as_event() {
        let (tx, rx) = mpsc::channel();
        SystemLauncher.encode(
            &PathBuf::from("/nonexistent/ffmpeg"),
            1,
            &PathBuf::from("clip.mp4"),
            vec![],
            7,
            tx);
        match rx.recv().unwrap() {
            PipelineEvent::PassCompleted { generation, pass, result } => {
                assert_eq!(generation, 7);
                assert_eq!(pass, 1);
                assert!(matches!(result, Err(EncodeError::Launch { pass: 1, .. })));
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
