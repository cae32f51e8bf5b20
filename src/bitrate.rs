use crate::error::CalcError;
use crate::size_unit::SizeUnit;

/// Video bitrate (kbps) that makes `duration_secs` of video plus its audio
/// track fit into `target_size` `unit`s.
pub fn compute_target_video_bitrate_kbps(
    target_size: f64,
    unit: SizeUnit,
    duration_secs: f64,
    audio_bitrate_kbps: u32,
) -> Result<u64, CalcError> {
    if !(duration_secs > 0.0) {
        return Err(CalcError::NonPositiveDuration(duration_secs));
    }

    let target_bits = target_size * unit.bits_per_unit() as f64;
    let audio_bits = audio_bitrate_kbps as f64 * 1000.0 * duration_secs;
    let video_bits = target_bits - audio_bits;
    if video_bits < 0.0 {
        return Err(CalcError::AudioExceedsTarget { target_bits, audio_bits });
    }

    let video_bitrate_bps = video_bits / duration_secs;
    Ok((video_bitrate_bps / 1000.0).round() as u64)
}

/// Encode frame rate: the probed rate, lowered to `max_fps` when that is smaller.
pub fn clamp_frame_rate(probed_fps: f64, max_fps: Option<f64>) -> f64 {
    match max_fps {
        Some(max) if max < probed_fps => max,
        _ => probed_fps,
    }
}

/// `29.97002997` -> `29.97`, `25.0` -> `25`
pub fn format_frame_rate(fps: f64) -> String {
    let s = format!("{:.3}", fps);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    String::from(s)
}
