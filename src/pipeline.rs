//! The compression queue and its per-job state machine.
//!
//! A [`Pipeline`] owns every piece of mutable batch state (queue, status,
//! progress watermark, cancellation latch) in a [`PipelineContext`]. External
//! processes never touch that state: they report back through
//! [`PipelineEvent`]s, and [`Pipeline::handle_event`] is the only place where
//! transitions happen. Exactly one job, and one process within it, is active
//! at a time.
//!
//! Per job: `Probing -> Pass1 -> Pass2`, then the job leaves the queue and
//! the next head starts probing. An empty queue ends in `Done`. Any process
//! failure leaves the job at the head in `Failed` and nothing advances until
//! the caller aborts or submits a new batch. Aborting clears the queue but
//! does not kill the running process; its late events are dropped.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use human_repr::HumanCount;
use tracing::{debug, error, info, warn};

use crate::bitrate::{clamp_frame_rate, compute_target_video_bitrate_kbps, format_frame_rate};
use crate::error::{EncodeError, JobError, ProbeError, ValidationError};
use crate::ffmpeg::launcher::ProcessLauncher;
use crate::ffmpeg::parameter_factories::analysis::AnalysisPass;
use crate::ffmpeg::parameter_factories::final_pass::FinalPass;
use crate::ffmpeg::parameter_factories::ParameterFactory;
use crate::ffmpeg::probe::MediaInfo;
use crate::fstools::check_output_dir;
use crate::options::{PipelineOptions, Submission};
use crate::progress::{ProgressPosition, ProgressTracker};
use crate::size_unit::SizeUnit;
use crate::status::{StatusSnapshot, Step};
use crate::video_job::{assign_output_paths, VideoJob};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, PartialEq)]
pub enum JobState {
    Idle,
    Probing,
    Pass1,
    Pass2,
    /// The queue ran empty after every job's second pass succeeded.
    Done,
    Aborted,
    /// The head job stopped on this error and is still queued.
    Failed(JobError),
}

impl JobState {
    /// An external process is (or is about to be) running for the head job.
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Probing | JobState::Pass1 | JobState::Pass2)
    }
}

/// Outcomes reported by external processes, plus the user's abort request.
/// `generation` identifies the batch the process was started for.
#[derive(Debug)]
pub enum PipelineEvent {
    ProbeCompleted { generation: u64, result: Result<MediaInfo, ProbeError> },
    ProgressLine { generation: u64, line: String },
    PassCompleted { generation: u64, pass: u8, result: Result<(), EncodeError> },
    AbortRequested,
}

/// Per-batch values that survived validation.
#[derive(Clone, Debug)]
struct Batch {
    target_size: f64,
    unit: SizeUnit,
    max_fps: Option<f64>,
    total: usize,
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

#[derive(Debug)]
pub struct PipelineContext {
    pub queue: VecDeque<VideoJob>,
    pub state: JobState,
    pub status: StatusSnapshot,
    progress: ProgressTracker,
    cancelled: bool,
    generation: u64,
    batch: Option<Batch>,
}

impl PipelineContext {
    fn new() -> Self {
        PipelineContext {
            queue: VecDeque::new(),
            state: JobState::Idle,
            status: StatusSnapshot::new(),
            progress: ProgressTracker::new(),
            cancelled: false,
            generation: 0,
            batch: None,
        }
    }
}

pub struct Pipeline<L: ProcessLauncher> {
    launcher: L,
    options: PipelineOptions,
    context: PipelineContext,
    events_tx: Sender<PipelineEvent>,
    events_rx: Receiver<PipelineEvent>,
}

impl<L: ProcessLauncher> Pipeline<L> {
    pub fn new(launcher: L, options: PipelineOptions) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Pipeline {
            launcher,
            options,
            context: PipelineContext::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &JobState {
        &self.context.state
    }

    pub fn status(&self) -> &StatusSnapshot {
        &self.context.status
    }

    pub fn queue(&self) -> &VecDeque<VideoJob> {
        &self.context.queue
    }

    pub fn is_cancelled(&self) -> bool {
        self.context.cancelled
    }

    pub fn generation(&self) -> u64 {
        self.context.generation
    }

    /// Another handle for feeding events into [`Pipeline::run`].
    pub fn sender(&self) -> Sender<PipelineEvent> {
        self.events_tx.clone()
    }

    /// Validates the batch and starts probing its first job. Nothing changes
    /// when validation fails. A batch that is still running is superseded.
    pub fn submit(&mut self, submission: Submission) -> Result<(), ValidationError> {
        let batch = validate(&submission, &self.options)?;

        if self.context.state.is_active() {
            warn!(generation = self.context.generation, "superseding the running batch");
        }
        if let Some(dir) = self.options.passlog.parent() {
            if let Err(err) = fs::create_dir_all(dir) {
                warn!(dir = %dir.display(), "unable to create pass-log directory: {}", err);
            }
        }

        let jobs = assign_output_paths(&submission.inputs, &submission.output_dir);
        let ctx = &mut self.context;
        ctx.generation += 1;
        ctx.cancelled = false;
        ctx.progress.reset();
        ctx.queue = jobs.into();
        ctx.status = StatusSnapshot {
            override_message: Some(String::from("Preparing videos...")),
            file_count: batch.total,
            target_size: format!("{}{}", batch.target_size, batch.unit),
            ..StatusSnapshot::new()
        };
        info!(generation = ctx.generation, jobs = batch.total, target = %ctx.status.target_size, "batch submitted");
        ctx.batch = Some(batch);

        self.start_next_job();
        Ok(())
    }

    /// Latches cancellation and zeroes progress. Processes already running
    /// are left to finish; whatever they report afterwards is ignored.
    pub fn request_abort(&mut self) {
        let ctx = &mut self.context;
        warn!(generation = ctx.generation, state = ?ctx.state, "abort requested");
        ctx.cancelled = true;
        ctx.progress.reset();
        ctx.queue.clear();
        ctx.state = JobState::Aborted;
        ctx.status.percent = 0.0;
        ctx.status.cancelled = true;
    }

    pub fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::AbortRequested => self.request_abort(),
            PipelineEvent::ProbeCompleted { generation, result } => {
                if self.accepts(generation) {
                    self.on_probe_completed(result);
                }
            },
            PipelineEvent::ProgressLine { generation, line } => {
                if self.accepts(generation) {
                    self.on_progress_line(line);
                }
            },
            PipelineEvent::PassCompleted { generation, pass, result } => {
                if self.accepts(generation) {
                    self.on_pass_completed(pass, result);
                }
            },
        }
    }

    /// Processes events until no process is active any more, calling
    /// `observer` after each one. Setting `interrupt` aborts the batch.
    pub fn run(&mut self, interrupt: &AtomicBool, mut observer: impl FnMut(&StatusSnapshot)) -> JobState {
        while self.context.state.is_active() {
            if interrupt.load(Ordering::SeqCst) {
                self.handle_event(PipelineEvent::AbortRequested);
                observer(&self.context.status);
                break;
            }

            match self.events_rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    self.handle_event(event);
                    observer(&self.context.status);
                },
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.context.state.clone()
    }

    fn accepts(&self, generation: u64) -> bool {
        if self.context.cancelled || generation != self.context.generation {
            debug!(generation, current = self.context.generation, cancelled = self.context.cancelled, "dropping stale event");
            return false;
        }
        true
    }

    fn start_next_job(&mut self) {
        let ctx = &mut self.context;
        let (Some(batch), Some(job)) = (&ctx.batch, ctx.queue.front()) else {
            info!(generation = ctx.generation, "all jobs finished");
            ctx.state = JobState::Done;
            ctx.status.override_message = Some(String::from("Successfully compressed all of the files!"));
            ctx.progress.complete();
            ctx.status.percent = ctx.progress.percent();
            return;
        };

        ctx.state = JobState::Probing;
        ctx.status.override_message = None;
        ctx.status.file_name = job.file_name();
        ctx.status.file_index = batch.total - ctx.queue.len() + 1;
        ctx.status.step = Some(Step::RetrievingVideoData);
        info!(job = %job.input_path.display(), index = ctx.status.file_index, "probing");
        self.launcher.probe(&batch.ffprobe, &job.input_path, ctx.generation, self.events_tx.clone());
        self.refresh_progress(None);
    }

    fn on_probe_completed(&mut self, result: Result<MediaInfo, ProbeError>) {
        if self.context.state != JobState::Probing {
            debug!(state = ?self.context.state, "ignoring probe result");
            return;
        }
        let info = match result {
            Ok(info) => info,
            Err(err) => return self.fail(err.into()),
        };

        let ctx = &mut self.context;
        let (Some(batch), Some(job)) = (&ctx.batch, ctx.queue.front_mut()) else {
            return;
        };
        job.video_info = info;
        let kbps = match compute_target_video_bitrate_kbps(
            batch.target_size,
            batch.unit,
            job.video_info.duration,
            job.video_info.audio_bitrate_kbps,
        ) {
            Ok(kbps) => kbps,
            Err(err) => return self.fail(err.into()),
        };
        job.video_info.video_bitrate_kbps = kbps;
        job.video_info.fps = clamp_frame_rate(job.video_info.fps, batch.max_fps);
        info!(
            job = %job.input_path.display(),
            duration = job.video_info.duration,
            audio_kbps = job.video_info.audio_bitrate_kbps,
            bitrate = %(kbps * 1000).human_count("b/s"),
            fps = %format_frame_rate(job.video_info.fps),
            "target bitrate computed");

        self.start_pass(1);
    }

    fn start_pass(&mut self, pass: u8) {
        let factory: Box<dyn ParameterFactory> = match pass {
            1 => Box::new(AnalysisPass::new(&self.options.passlog)),
            _ => Box::new(FinalPass::new(&self.options.passlog)),
        };
        let ctx = &mut self.context;
        let (Some(batch), Some(job)) = (&ctx.batch, ctx.queue.front()) else {
            return;
        };

        let step = if factory.pass() == 1 { Step::Pass1 } else { Step::Pass2 };
        ctx.state = if factory.pass() == 1 { JobState::Pass1 } else { JobState::Pass2 };
        ctx.status.step = Some(step);
        ctx.status.last_output.clear();
        let args = factory.parameters(job);
        self.launcher.encode(&batch.ffmpeg, factory.pass(), &job.input_path, args, ctx.generation, self.events_tx.clone());
        self.refresh_progress(None);
    }

    fn on_progress_line(&mut self, line: String) {
        if !matches!(self.context.state, JobState::Pass1 | JobState::Pass2) {
            return;
        }
        self.refresh_progress(Some(&line));
        self.context.status.last_output = line;
    }

    fn on_pass_completed(&mut self, pass: u8, result: Result<(), EncodeError>) {
        let expected = match self.context.state {
            JobState::Pass1 => 1,
            JobState::Pass2 => 2,
            _ => 0,
        };
        if pass != expected {
            debug!(pass, state = ?self.context.state, "ignoring pass result");
            return;
        }
        if let Err(err) = result {
            return self.fail(err.into());
        }

        if pass == 1 {
            self.start_pass(2);
        } else {
            if let Some(job) = self.context.queue.pop_front() {
                info!(output = %job.output_path.display(), "job finished");
            }
            self.start_next_job();
        }
    }

    fn refresh_progress(&mut self, line: Option<&str>) {
        let ctx = &mut self.context;
        let (Some(batch), Some(job)) = (&ctx.batch, ctx.queue.front()) else {
            return;
        };
        let position = ProgressPosition {
            job_index: batch.total - ctx.queue.len(),
            total_jobs: batch.total,
            pass: ctx.status.step.map(Step::pass_number).unwrap_or(1),
        };
        ctx.status.percent = ctx.progress.observe(position, job.video_info.duration, line);
    }

    fn fail(&mut self, err: JobError) {
        let ctx = &mut self.context;
        if let Some(job) = ctx.queue.front() {
            error!(job = %job.input_path.display(), state = ?ctx.state, "{}", err);
        }
        ctx.status.override_message = Some(err.to_string());
        ctx.state = JobState::Failed(err);
    }
}

fn validate(submission: &Submission, options: &PipelineOptions) -> Result<Batch, ValidationError> {
    if submission.inputs.is_empty() {
        return Err(ValidationError::NoInputs);
    }
    check_output_dir(&submission.output_dir)?;
    if !submission.target_size.is_finite() || submission.target_size <= 0.0 {
        return Err(ValidationError::InvalidTargetSize(submission.target_size));
    }
    let unit: SizeUnit = submission.unit.parse()?;
    if let Some(max_fps) = submission.max_fps {
        if !max_fps.is_finite() || max_fps <= 0.0 {
            return Err(ValidationError::InvalidMaxFrameRate(max_fps));
        }
    }
    let ffmpeg = options.ffmpeg.clone().ok_or(ValidationError::ToolUnavailable("ffmpeg"))?;
    let ffprobe = options.ffprobe.clone().ok_or(ValidationError::ToolUnavailable("ffprobe"))?;

    Ok(Batch {
        target_size: submission.target_size,
        unit,
        max_fps: submission.max_fps,
        total: submission.inputs.len(),
        ffmpeg,
        ffprobe,
    })
}
