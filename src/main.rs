pub mod bitrate;
pub mod error;
pub mod ffmpeg;
pub mod fstools;
pub mod options;
pub mod pipeline;
pub mod progress;
pub mod size_unit;
pub mod status;
pub mod video_job;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use human_repr::HumanCount;
use kdam::{term, tqdm, BarExt};
use rustop::opts;
use signal_hook::consts::SIGINT;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ffmpeg::Toolchain;
use ffmpeg::launcher::SystemLauncher;
use options::{PipelineOptions, Submission};
use pipeline::{JobState, Pipeline};
use video_job::assign_output_paths;

fn main() -> ExitCode {
    let (args, _rest) = opts! {
        synopsis "Compress videos so each one fits under a target file size";
        opt output_dir:String=String::from("."), short:'o', desc:"Directory the compressed files are written to.";
        opt size:f64=50.0, short:'s', desc:"Target size of every output file.";
        opt unit:String=String::from("MB"), short:'u', desc:"Unit of --size. [b, B, Kb, KB, Mb, MB, Gb, GB]";
        opt max_fps:Option<f64>, short:'r', desc:"Upper bound on the output frame rate.";
        opt ffmpeg:Option<String>, short:'e', desc:"Path to the ffmpeg executable.";
        opt ffprobe:Option<String>, short:'p', desc:"Path to the ffprobe executable.";
        opt passlog:Option<String>, short:'l', desc:"Prefix for the two-pass statistics files.";
        param inputs:Vec<String>, desc:"Input videos, compressed in order";
    }.parse_or_exit();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let tools = Toolchain::detect(args.ffmpeg.map(PathBuf::from), args.ffprobe.map(PathBuf::from));
    let mut options = PipelineOptions::new(tools.ffmpeg, tools.ffprobe);
    if let Some(passlog) = args.passlog {
        options = options.passlog(PathBuf::from(passlog));
    }

    let inputs: Vec<PathBuf> = args.inputs.iter().map(PathBuf::from).collect();
    let output_dir = PathBuf::from(&args.output_dir);
    let outputs: Vec<PathBuf> = assign_output_paths(&inputs, &output_dir)
        .into_iter()
        .map(|job| job.output_path)
        .collect();
    let submission = Submission::new(inputs, output_dir)
        .target_size(args.size, &args.unit)
        .max_fps(args.max_fps);

    let interrupt = Arc::new(AtomicBool::new(false));
    if let Err(err) = signal_hook::flag::register(SIGINT, Arc::clone(&interrupt)) {
        warn!("unable to catch ctrl-c: {}", err);
    }

    let mut pipeline = Pipeline::new(SystemLauncher, options);
    if let Err(err) = pipeline.submit(submission) {
        println!("{}", err);
        return ExitCode::FAILURE;
    }

    term::init(false);
    let mut pbar = tqdm!(
        total = 100,
        desc = "Preparing",
        position = 0,
        force_refresh = true
    );
    let mut last_message: Option<String> = None;
    let state = pipeline.run(&interrupt, |status| {
        if status.override_message.is_some() && status.override_message != last_message {
            if let Err(err) = pbar.write(status.render()) {
                warn!("unable to write status: {}", err);
            }
        }
        last_message = status.override_message.clone();

        if let Some(step) = status.step {
            pbar.set_description(format!("{} ({}/{})", step, status.file_index, status.file_count));
        }
        pbar.set_postfix(status.file_name.clone());
        let _ = pbar.update_to(status.progress() as usize);
    });
    eprintln!();

    match state {
        JobState::Done => {
            for output in &outputs {
                match fs::metadata(output) {
                    Ok(metadata) => println!("{} {}", output.display(), metadata.len().human_count_bytes()),
                    Err(err) => warn!(output = %output.display(), "unable to stat output: {}", err),
                }
            }
            ExitCode::SUCCESS
        },
        JobState::Aborted => {
            println!("ABORTED");
            ExitCode::FAILURE
        },
        _ => ExitCode::FAILURE,
    }
}
