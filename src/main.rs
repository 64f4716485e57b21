use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use structopt::StructOpt;

use trackedit::settings::Settings;
use trackedit::testkit::{self, MemoryMuxer, MemoryTrack};
use trackedit::{trim, EditBox, TrackView};

#[derive(StructOpt, Debug)]
#[structopt(setting = clap::AppSettings::VersionlessSubcommands)]
pub struct MainOpts {
    #[structopt(long)]
    /// Log options (like RUSTLOG; trace, debug, info etc)
    pub log: Option<String>,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
#[structopt(rename_all = "kebab-case")]
pub enum Command {
    #[structopt(display_order = 1)]
    /// Media information for a movie document.
    Mediainfo(MediainfoOpts),

    #[structopt(display_order = 2)]
    /// Extract [start_ms, start_ms + duration_ms) from a movie.
    Trim(TrimOpts),

    #[structopt(display_order = 3)]
    /// Concatenate movies end-to-end.
    Stitch(StitchOpts),
}

#[derive(StructOpt, Debug)]
pub struct MediainfoOpts {
    /// Input movie document (JSON).
    pub input: String,
}

#[derive(StructOpt, Debug)]
pub struct TrimOpts {
    #[structopt(long)]
    /// Trim start, in milliseconds.
    pub start_ms: u64,

    #[structopt(long)]
    /// Trim duration, in milliseconds.
    pub duration_ms: u64,

    #[structopt(long)]
    /// Respect the input's own edit boxes rather than the full track.
    pub respect_edit_boxes: bool,

    /// Input movie document (JSON).
    pub input: String,

    /// Output movie document (JSON).
    pub output: String,
}

#[derive(StructOpt, Debug)]
pub struct StitchOpts {
    /// Input movie documents (JSON), in concatenation order.
    #[structopt(required = true, min_values = 1)]
    pub inputs: Vec<String>,

    /// Output movie document (JSON).
    pub output: String,
}

fn main() {
    let opts = MainOpts::from_args();

    let mut builder = env_logger::Builder::new();
    if let Some(ref log_opts) = opts.log {
        builder.parse_filters(log_opts);
    } else if let Ok(ref log_opts) = std::env::var("RUST_LOG") {
        builder.parse_filters(log_opts);
    } else {
        builder.parse_filters("info");
    }
    builder.init();

    let result = match opts.cmd {
        Command::Mediainfo(opts) => mediainfo(opts),
        Command::Trim(opts) => trim_cmd(opts),
        Command::Stitch(opts) => stitch_cmd(opts),
    };

    // Surface trackedit::Error::exit_code()'s stable mapping at the process
    // boundary rather than the generic exit status anyhow would otherwise
    // give every failure.
    if let Err(err) = result {
        eprintln!("error: {:#}", err);
        let code = err.downcast_ref::<trackedit::Error>().map(|e| e.exit_code()).unwrap_or(128);
        std::process::exit(code);
    }
}

fn mediainfo(opts: MediainfoOpts) -> Result<()> {
    let json = fs::read_to_string(&opts.input)?;
    let (video, audio) = testkit::load(&json)?;
    log::debug!("loaded movie document from {}", opts.input);
    println!("video: {} samples, {}", video.count(), settings_summary(&video.settings()));
    if let Some(audio) = audio {
        println!("audio: {} samples, {}", audio.count(), settings_summary(&audio.settings()));
    } else {
        println!("audio: none");
    }
    Ok(())
}

fn settings_summary(settings: &Settings) -> String {
    match settings {
        Settings::Video(s) => format!("{} {}x{} @ timescale {}", s.codec, s.width, s.height, s.timescale),
        Settings::Audio(s) => format!("{} {}ch @ {}Hz, timescale {}", s.codec, s.channels, s.sample_rate, s.timescale),
        Settings::Caption(s) => format!("{} @ timescale {}", s.codec, s.timescale),
    }
}

fn trim_cmd(opts: TrimOpts) -> Result<()> {
    let json = fs::read_to_string(&opts.input)?;
    let (video, audio) = testkit::load(&json)?;

    let video_timescale = video.settings().timescale();
    let video_edit_boxes = if opts.respect_edit_boxes { video.edit_boxes() } else { Vec::new() };
    let video_samples = video.clone().view().vectorize()?;
    let trimmed_video = trim::trim(&video_samples, video_edit_boxes, trackedit::SampleType::Video, video_timescale, opts.start_ms, opts.duration_ms)?;

    let mut edit_boxes: Vec<EditBox> = trimmed_video.edit_boxes.clone();
    let video_track = MemoryTrack::new(video.settings(), trimmed_video.edit_boxes, trimmed_video.samples);

    let audio_track = match audio {
        Some(audio) => {
            let audio_timescale = audio.settings().timescale();
            let audio_edit_boxes = if opts.respect_edit_boxes { audio.edit_boxes() } else { Vec::new() };
            let audio_samples = audio.clone().view().vectorize()?;
            let trimmed_audio = trim::trim(&audio_samples, audio_edit_boxes, trackedit::SampleType::Audio, audio_timescale, opts.start_ms, opts.duration_ms)?;
            edit_boxes.extend(trimmed_audio.edit_boxes.clone());
            Some(MemoryTrack::new(audio.settings(), trimmed_audio.edit_boxes, trimmed_audio.samples))
        }
        None => None,
    };

    write_output(&opts.output, video_track, audio_track, &edit_boxes)
}

fn stitch_cmd(opts: StitchOpts) -> Result<()> {
    let mut inputs = Vec::with_capacity(opts.inputs.len());
    for path in &opts.inputs {
        let json = fs::read_to_string(path)?;
        let (video, audio) = testkit::load(&json)?;
        let video_settings = match video.settings() {
            Settings::Video(s) => s,
            _ => return Err(trackedit::error!(NoTrack, "{}: video track has non-video settings", path).into()),
        };
        let video_samples = video.clone().view().vectorize()?;
        let mut edit_boxes = video.edit_boxes();

        let (audio_settings, audio_samples) = match &audio {
            Some(audio) => {
                let settings = match audio.settings() {
                    Settings::Audio(s) => s,
                    _ => return Err(trackedit::error!(NoTrack, "{}: audio track has non-audio settings", path).into()),
                };
                edit_boxes.extend(audio.edit_boxes());
                (Some(settings), audio.clone().view().vectorize()?)
            }
            None => (None, Vec::new()),
        };

        inputs.push(trackedit::stitch::StitchInput {
            video_settings,
            video_samples,
            audio_settings,
            audio_samples,
            edit_boxes,
        });
    }

    let stitched = trackedit::stitch::stitch(&inputs)?;
    let mut edit_boxes = stitched.video_edit_boxes.clone();
    edit_boxes.extend(stitched.audio_edit_boxes.clone());

    let video_track = MemoryTrack::new(Settings::Video(stitched.video_settings), stitched.video_edit_boxes, stitched.video_samples);
    let audio_track = stitched
        .audio_settings
        .map(|s| MemoryTrack::new(Settings::Audio(s), stitched.audio_edit_boxes, stitched.audio_samples));

    write_output(&opts.output, video_track, audio_track, &edit_boxes)
}

fn write_output(path: &str, video_track: MemoryTrack, audio_track: Option<MemoryTrack>, edit_boxes: &[EditBox]) -> Result<()> {
    let video_view = TrackView::new(Arc::new(video_track));
    let no_audio = || MemoryTrack::new(Settings::Audio(no_audio_settings()), Vec::new(), Vec::new());
    let audio_view = match audio_track {
        Some(track) => TrackView::new(Arc::new(track)),
        None => TrackView::new(Arc::new(no_audio())),
    };

    let mut muxer = MemoryMuxer::new();
    muxer.write(&audio_view, &video_view, edit_boxes)?;
    let document = muxer.document.ok_or_else(|| anyhow!("muxer produced no output"))?;
    fs::write(path, document)?;
    Ok(())
}

fn no_audio_settings() -> trackedit::settings::AudioSettings {
    trackedit::settings::AudioSettings { codec: "none".into(), timescale: 1, sample_rate: 1, channels: 0 }
}
