//! voicesync CLI: build timed voiceovers from subtitles.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use voicesync_core::align::{NoStretcher, SignalsmithStretcher, TimeStretcher};
use voicesync_core::audio::io::{read_wav, write_wav};
use voicesync_core::config::{AppConfig, FailurePolicy, StretchPreset, DEFAULT_SAMPLE_RATE};
use voicesync_core::pipeline::{build, Collaborators};
use voicesync_core::subtitle::{cues_to_segments, read_srt, write_srt};
use voicesync_core::synth::{CachedSynthesizer, HttpSynthesizer, Synthesizer};
use voicesync_core::transcribe::{
    load_transcription, transcribe_segments, PrecomputedTranscriber, DEFAULT_MAX_SEGMENT_S,
};
use voicesync_core::types::AudioBuffer;
use voicesync_core::voice::{VoiceProfile, VoiceProfiles};

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "voicesync",
    about = "Subtitle-driven voiceover synthesis with timing reconciliation",
    version,
)]
struct Cli {
    /// Show verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize a voiceover track from an SRT file
    Build(BuildArgs),
    /// Turn Whisper word timings into an SRT file
    Transcribe(TranscribeArgs),
    /// List known voices and their speaking profiles
    Voices(VoicesArgs),
    /// Write a sample config file
    InitConfig(InitConfigArgs),
}

// ─── Build ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StretchArg {
    Off,
    Conservative,
    Loose,
}

#[derive(Parser, Debug)]
#[command(allow_negative_numbers = true)]
struct BuildArgs {
    /// Input subtitle file (.srt)
    srt: PathBuf,

    /// Output WAV file
    #[arg(short, long, default_value = "voiceover.wav")]
    output: PathBuf,

    /// Whisper-style JSON with word timings
    #[arg(long)]
    words: Option<PathBuf>,

    /// JSON config file (see `init-config`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default voice for segments without a mapped speaker
    #[arg(long)]
    voice: Option<String>,

    /// Speaker to voice mapping, e.g. Nicole=en-US-EmmaMultilingualNeural (repeatable)
    #[arg(long = "speaker-voice", value_name = "NAME=VOICE")]
    speaker_voices: Vec<String>,

    /// Rate used when no trusted word timings exist (percent)
    #[arg(long)]
    rate: Option<i32>,

    /// Duration difference left untouched (ms)
    #[arg(long)]
    tolerance_ms: Option<i64>,

    /// Output sample rate
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Borrow silence from neighbouring gaps for fast segments (needs --words)
    #[arg(long, default_value_t = false)]
    elastic: bool,

    /// Disable rate smoothing between segments
    #[arg(long, default_value_t = false)]
    no_smoothing: bool,

    /// Largest rate step between consecutive segments (percent)
    #[arg(long)]
    max_rate_change: Option<i32>,

    /// Use a flat 150 wpm baseline instead of per-voice profiles
    #[arg(long, default_value_t = false)]
    no_voice_profiles: bool,

    /// Pitch-preserving time stretch before padding/trimming
    #[arg(long, value_enum)]
    stretch: Option<StretchArg>,

    /// Stop at the first failed segment instead of inserting silence
    #[arg(long, default_value_t = false)]
    fail_fast: bool,

    /// Speech endpoint URL (OpenAI-compatible)
    #[arg(long)]
    tts_url: Option<String>,

    /// Disable the synthesis cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Write the quality report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Problematic segments shown in the printed report
    #[arg(long, default_value_t = 10)]
    max_issues: usize,

    /// Show every segment in the printed report
    #[arg(long, default_value_t = false)]
    show_all: bool,
}

// ─── Transcribe ──────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct TranscribeArgs {
    /// Whisper-style JSON with word timings
    input: PathBuf,

    /// Source audio (WAV), used to sanity-check transcript length
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Output subtitle file
    #[arg(short, long, default_value = "transcript.srt")]
    output: PathBuf,

    /// Longest subtitle segment in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_SEGMENT_S)]
    max_duration: f64,
}

// ─── Voices / config ─────────────────────────────────────────────

#[derive(Parser, Debug)]
struct VoicesArgs {
    /// Language prefix filter, e.g. en-US
    #[arg(long)]
    language: Option<String>,

    /// Config file with extra voice profiles
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InitConfigArgs {
    /// Where to write the config
    #[arg(default_value = "voicesync.json")]
    path: PathBuf,

    /// Overwrite an existing file
    #[arg(long, default_value_t = false)]
    force: bool,
}

// ─── Entry point ─────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Transcribe(args) => run_transcribe(args),
        Command::Voices(args) => run_voices(args),
        Command::InitConfig(args) => run_init_config(args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => AppConfig::load(p),
        None => Ok(AppConfig::default()),
    }
}

fn parse_speaker_voices(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for pair in pairs {
        let Some((name, voice)) = pair.split_once('=') else {
            bail!("Invalid --speaker-voice '{}': expected NAME=VOICE", pair);
        };
        let (name, voice) = (name.trim(), voice.trim());
        if name.is_empty() || voice.is_empty() {
            bail!("Invalid --speaker-voice '{}': expected NAME=VOICE", pair);
        }
        map.insert(name.to_string(), voice.to_string());
    }
    Ok(map)
}

/// Apply command-line overrides on top of the file config.
fn apply_overrides(config: &mut AppConfig, args: &BuildArgs) -> Result<()> {
    let build = &mut config.build;
    if let Some(v) = &args.voice {
        build.default_voice = v.clone();
    }
    build.speaker_voices.extend(parse_speaker_voices(&args.speaker_voices)?);
    if let Some(r) = args.rate {
        build.default_rate = r;
    }
    if let Some(t) = args.tolerance_ms {
        build.tolerance_ms = t;
    }
    if let Some(sr) = args.sample_rate {
        build.sample_rate = sr;
    }
    if args.elastic {
        build.elastic_timing = true;
    }
    if args.no_smoothing {
        build.rate_smoothing = false;
    }
    if let Some(m) = args.max_rate_change {
        build.max_rate_change = m;
    }
    if args.no_voice_profiles {
        build.use_voice_profiles = false;
    }
    match args.stretch {
        Some(StretchArg::Off) => build.stretch.enabled = false,
        Some(StretchArg::Conservative) => {
            build.stretch.enabled = true;
            build.stretch.preset = StretchPreset::Conservative;
        }
        Some(StretchArg::Loose) => {
            build.stretch.enabled = true;
            build.stretch.preset = StretchPreset::Loose;
        }
        None => {}
    }
    if args.fail_fast {
        build.failure_policy = FailurePolicy::Abort;
    }
    if let Some(url) = &args.tts_url {
        config.tts_url = url.clone();
    }
    if args.no_cache {
        config.cache = false;
    }
    Ok(())
}

fn run_build(args: BuildArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let cues = read_srt(&args.srt)?;
    if cues.is_empty() {
        bail!("No subtitle cues found in {}", args.srt.display());
    }
    let (segments, speakers) = cues_to_segments(&cues);

    let stats = speakers.statistics();
    println!("Segments: {}", stats.total_segments);
    if stats.unique_speakers.is_empty() {
        println!("Speakers: none labelled");
    } else {
        println!("Speakers: {}", stats.unique_speakers.join(", "));
        for (name, count) in &stats.speaker_counts {
            log::debug!("  {}: {} segment(s)", name, count);
        }
        if let Some(primary) = &stats.primary_speaker {
            println!("Primary speaker: {}", primary);
        }
    }

    let word_timings = match &args.words {
        Some(path) => {
            let result = load_transcription(path)?;
            if result.words.is_none() {
                log::warn!("{} has no word timings; using default rates", path.display());
            }
            result.words
        }
        None => None,
    };

    let http = HttpSynthesizer::new(config.http_config())
        .context("Failed to set up speech backend")?;
    let synthesizer: Box<dyn Synthesizer> = if config.cache {
        let cached = CachedSynthesizer::new(http);
        log::debug!("Synthesis cache: {}", cached.dir().display());
        Box::new(cached)
    } else {
        Box::new(http)
    };

    let stretcher: Box<dyn TimeStretcher> = if config.build.stretch.enabled {
        Box::new(SignalsmithStretcher)
    } else {
        Box::new(NoStretcher)
    };
    let profiles = VoiceProfiles::builtin().with_overrides(config.voice_profiles.clone());

    let (audio, report) = build(
        &segments,
        word_timings.as_deref(),
        &config.build,
        Collaborators {
            synthesizer: synthesizer.as_ref(),
            stretcher: stretcher.as_ref(),
            profiles: &profiles,
        },
    )?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    write_wav(&args.output, &audio)?;

    print!("{}", report.render(args.max_issues, args.show_all));
    if let Some(path) = &args.report {
        report.export_json(path)?;
        println!("Report: {}", path.display());
    }
    println!("Output: {}", args.output.display());
    Ok(())
}

fn run_transcribe(args: TranscribeArgs) -> Result<()> {
    if args.max_duration <= 0.0 {
        bail!("--max-duration must be positive");
    }
    let transcriber = PrecomputedTranscriber::from_json_file(&args.input)?;
    let audio = match &args.audio {
        Some(path) => read_wav(path)?,
        None => AudioBuffer::empty(DEFAULT_SAMPLE_RATE),
    };
    let segments = transcribe_segments(&transcriber, &audio, args.max_duration)?;
    if segments.is_empty() {
        bail!("Nothing to write: {} contains no speech", args.input.display());
    }
    write_srt(&args.output, &segments, false)?;
    println!("Wrote {} subtitle(s)", segments.len());
    println!("Output: {}", args.output.display());
    Ok(())
}

fn run_voices(args: VoicesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let profiles = VoiceProfiles::builtin().with_overrides(config.voice_profiles);
    let voices = match &args.language {
        Some(lang) => profiles.for_language(lang),
        None => profiles.list(),
    };
    if voices.is_empty() {
        println!("No voices found");
        return Ok(());
    }
    for (id, p) in voices {
        println!("{}", voice_line(id, p));
    }
    Ok(())
}

fn voice_line(id: &str, p: &VoiceProfile) -> String {
    format!(
        "{:<36} {:<40} {:>3} wpm  [{:+}%, {:+}%]  pause {:.2}s  {}",
        id,
        p.display_name,
        p.baseline_wpm,
        p.min_rate,
        p.max_rate,
        p.natural_pause_threshold,
        p.characteristics
    )
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", args.path.display());
    }
    AppConfig::sample().save(&args.path)?;
    println!("Config: {}", args.path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speaker_voices() {
        let map = parse_speaker_voices(&["Nicole = en-US-EmmaMultilingualNeural".to_string()]).unwrap();
        assert_eq!(map["Nicole"], "en-US-EmmaMultilingualNeural");
        assert!(parse_speaker_voices(&["Nicole".to_string()]).is_err());
        assert!(parse_speaker_voices(&["=voice".to_string()]).is_err());
    }

    #[test]
    fn test_overrides() {
        let args = BuildArgs::parse_from([
            "build",
            "in.srt",
            "--voice",
            "en-US-GuyNeural",
            "--rate",
            "-10",
            "--stretch",
            "loose",
            "--fail-fast",
            "--no-cache",
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.build.default_voice, "en-US-GuyNeural");
        assert_eq!(config.build.default_rate, -10);
        assert!(config.build.stretch.enabled);
        assert_eq!(config.build.stretch.preset, StretchPreset::Loose);
        assert_eq!(config.build.failure_policy, FailurePolicy::Abort);
        assert!(!config.cache);
    }

    #[test]
    fn test_voice_line_shows_pause() {
        let profiles = VoiceProfiles::builtin();
        let line = voice_line("en-GB-RyanNeural", profiles.lookup("en-GB-RyanNeural"));
        assert!(line.starts_with("en-GB-RyanNeural"));
        assert!(line.contains("145 wpm"));
        assert!(line.contains("[-40%, +35%]"));
        assert!(line.contains("pause 0.40s"));
    }
}
