//! Overall batch progress from ffmpeg's per-frame stat lines.
//!
//! Each job contributes two equal steps (pass 1 and pass 2) to the batch.
//! Within a step, the position is `time=` over the clip's duration. The
//! reported value is a watermark: it never goes down until [`ProgressTracker::reset`].

/// Elapsed times at or below this many seconds are treated as noise.
pub const NOISE_FLOOR_SECS: f64 = 2.0;

/// Where in the batch the reported line comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressPosition {
    /// Zero-based index of the job in the submitted batch.
    pub job_index: usize,
    pub total_jobs: usize,
    /// 2 while the final pass runs, 1 otherwise.
    pub pass: u8,
}

impl ProgressPosition {
    fn step_width(&self) -> f64 {
        100.0 / (self.total_jobs * 2) as f64
    }

    fn step_progress(&self) -> f64 {
        let completed_steps = self.job_index * 2 + (self.pass.max(1) as usize - 1);
        completed_steps as f64 * self.step_width()
    }
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    watermark: f64,
    relative: f64,
    position: Option<ProgressPosition>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        ProgressTracker::default()
    }

    /// Folds one line (or a bare step change when `line` is `None`) into the
    /// watermark and returns the percentage to display.
    pub fn observe(&mut self, position: ProgressPosition, duration_secs: f64, line: Option<&str>) -> f64 {
        if position.total_jobs == 0 {
            return self.watermark;
        }

        if self.position != Some(position) {
            self.position = Some(position);
            self.relative = 0.0;
        }

        if let Some(elapsed) = line.and_then(parse_elapsed_seconds) {
            if elapsed > NOISE_FLOOR_SECS && duration_secs > 0.0 {
                let relative = (elapsed / duration_secs) * 100.0 / (position.total_jobs * 2) as f64;
                self.relative = relative.min(position.step_width());
            }
        }

        let computed = (position.step_progress() + self.relative).clamp(0.0, 100.0);
        if computed > self.watermark {
            self.watermark = computed;
        }
        self.watermark
    }

    pub fn percent(&self) -> f64 {
        self.watermark
    }

    pub fn complete(&mut self) {
        self.watermark = 100.0;
    }

    pub fn reset(&mut self) {
        self.watermark = 0.0;
        self.relative = 0.0;
        self.position = None;
    }
}

/// Seconds encoded so far according to a line such as
/// `frame=  123 fps= 60 q=28.0 size=    1024kB time=00:00:05.12 bitrate=1638.4kbits/s speed=1.00x`.
/// Anything that is not a per-frame stat line yields `None`.
pub fn parse_elapsed_seconds(line: &str) -> Option<f64> {
    let line = line.trim_start();
    if !line.starts_with("frame=") {
        return None;
    }
    let (_, rest) = line.split_once("time=")?;
    let value = rest.split_whitespace().next()?;
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: u64 = parts[0].parse().ok()?;
    let minutes: u64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Some(whole as f64 + seconds)
}
