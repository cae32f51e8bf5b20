use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ProbeError;

/// Stream metadata for one input clip. `audio_bitrate_kbps == 0` means the
/// clip has no (measurable) audio track.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub audio_bitrate_kbps: u32,
    pub video_bitrate_kbps: u64,
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonOutput {
    #[serde(default)]
    pub format: Option<FFProbeJsonFormat>,
    #[serde(default)]
    pub streams: Vec<FFProbeJsonStream>,
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonFormat {
    pub duration: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonStream {
    pub codec_type: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bit_rate: Option<String>,
}

pub fn probe_args(path: &PathBuf) -> Vec<PathBuf> {
    vec![
        PathBuf::from("-v"), PathBuf::from("error"),
        PathBuf::from("-show_entries"),
        PathBuf::from("format=duration:stream=index,codec_type,avg_frame_rate,width,height,bit_rate,sample_rate,channels"),
        PathBuf::from("-of"), PathBuf::from("json"),
        path.clone(),
    ]
}

/// Builds a `MediaInfo` from ffprobe's `-of json` output.
pub fn parse_probe_output(path: &PathBuf, stdout: &[u8]) -> Result<MediaInfo, ProbeError> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|err| ProbeError::malformed(path, &format!("invalid json: {}", err)))?;
    if !value.is_object() {
        return Err(ProbeError::malformed(path, "ffprobe output is not a json object"));
    }
    let deserialized: FFProbeJsonOutput = serde_json::from_value(value)
        .map_err(|err| ProbeError::malformed(path, &err.to_string()))?;

    let mut info = MediaInfo::default();

    if let Some(duration) = deserialized.format.and_then(|f| f.duration) {
        info.duration = duration.trim().parse()
            .map_err(|_| ProbeError::malformed(path, &format!("duration '{}' is not a number.", duration)))?;
    }

    let video = deserialized.streams.iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ProbeError::malformed(path, "no video stream"))?;
    if let Some(rate) = &video.avg_frame_rate {
        info.fps = parse_frame_rate(path, rate)?;
    }
    info.width = video.width.unwrap_or(0);
    info.height = video.height.unwrap_or(0);

    if let Some(audio) = deserialized.streams.iter().find(|s| s.codec_type.as_deref() == Some("audio")) {
        info.audio_bitrate_kbps = match &audio.bit_rate {
            None => 0,
            Some(bit_rate) => match bit_rate.parse::<u64>() {
                Ok(bps) => u32::try_from(bps / 1000).unwrap_or(u32::MAX),
                Err(_) => {
                    warn!(path = %path.display(), bit_rate = %bit_rate, "unreadable audio bit_rate; treating clip as silent");
                    0
                },
            },
        };
    }

    Ok(info)
}

/// Parses an ffprobe rational such as `30000/1001`.
pub fn parse_frame_rate(path: &PathBuf, rate: &str) -> Result<f64, ProbeError> {
    let splits: Vec<&str> = rate.split('/').collect();
    match splits.len() {
        2 => {
            let num = splits[0].parse::<f64>()
                .map_err(|_| ProbeError::malformed(path, &format!("numerator '{}' from '{}' is not a number.", splits[0], rate)))?;
            let denom = splits[1].parse::<f64>()
                .map_err(|_| ProbeError::malformed(path, &format!("denominator '{}' from '{}' is not a number.", splits[1], rate)))?;
            if denom == 0.0 {
                Err(ProbeError::malformed(path, &format!("frame rate '{}' has a zero denominator.", rate)))
            } else {
                Ok(num / denom)
            }
        },
        _ => Err(ProbeError::malformed(path, &format!("Unexpected avg_frame_rate format: '{}'", rate))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "programs": [],
        "streams": [
            { "index": 0, "codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "30000/1001", "bit_rate": "8000000" },
            { "index": 1, "codec_type": "audio", "avg_frame_rate": "0/0", "sample_rate": "48000", "channels": 2, "bit_rate": "128000" },
            { "index": 2, "codec_type": "audio", "bit_rate": "64000" }
        ],
        "format": { "duration": "120.500000" }
    }"#;

    fn path() -> PathBuf {
        PathBuf::from("clip.mp4")
    }

    #[test]
    fn test_parse_probe_output() {
        let info = parse_probe_output(&path(), SAMPLE.as_bytes()).unwrap();
        assert_eq!(info.duration, 120.5);
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.audio_bitrate_kbps, 128);
        assert_eq!(info.video_bitrate_kbps, 0);
    }

    #[test]
    fn test_missing_audio_stream_leaves_zero() {
        let json = r#"{"streams":[{"codec_type":"video","width":640,"height":360,"avg_frame_rate":"25/1"}],"format":{"duration":"60.0"}}"#;
        let info = parse_probe_output(&path(), json.as_bytes()).unwrap();
        assert_eq!(info.audio_bitrate_kbps, 0);
        assert_eq!(info.fps, 25.0);
    }

    #[test]
    fn test_audio_bit_rate_not_available() {
        let json = r#"{"streams":[{"codec_type":"video","avg_frame_rate":"25/1"},{"codec_type":"audio","bit_rate":"N/A"}],"format":{"duration":"1"}}"#;
        assert_eq!(parse_probe_output(&path(), json.as_bytes()).unwrap().audio_bitrate_kbps, 0);
    }

    #[test]
    fn test_audio_kbps_uses_integer_division() {
        let json = r#"{"streams":[{"codec_type":"video","avg_frame_rate":"25/1"},{"codec_type":"audio","bit_rate":"127999"}],"format":{"duration":"1"}}"#;
        assert_eq!(parse_probe_output(&path(), json.as_bytes()).unwrap().audio_bitrate_kbps, 127);
    }

    #[test]
    fn test_malformed_output() {
        assert!(matches!(parse_probe_output(&path(), b"not json"), Err(ProbeError::Malformed { .. })));
        assert!(matches!(parse_probe_output(&path(), b"[1, 2]"), Err(ProbeError::Malformed { .. })));
        assert!(matches!(parse_probe_output(&path(), b"\"text\""), Err(ProbeError::Malformed { .. })));
        assert!(matches!(parse_probe_output(&path(), b"{}"), Err(ProbeError::Malformed { .. })));
    }

    #[test]
    fn test_zero_denominator_is_a_parse_failure() {
        let json = r#"{"streams":[{"codec_type":"video","avg_frame_rate":"0/0"}],"format":{"duration":"10"}}"#;
        assert!(matches!(parse_probe_output(&path(), json.as_bytes()), Err(ProbeError::Malformed { .. })));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate(&path(), "25/1").unwrap(), 25.0);
        assert_eq!(parse_frame_rate(&path(), "60/1").unwrap(), 60.0);
        assert!((parse_frame_rate(&path(), "24000/1001").unwrap() - 23.976).abs() < 0.001);
        assert!(parse_frame_rate(&path(), "25").is_err());
        assert!(parse_frame_rate(&path(), "x/1").is_err());
        assert!(parse_frame_rate(&path(), "1/0").is_err());
    }

    #[test]
    fn test_probe_args_end_with_input() {
        let args = probe_args(&path());
        assert_eq!(args.last(), Some(&path()));
        assert!(args.contains(&PathBuf::from("json")));
    }
}
