//! Audio I/O: WAV read/write, in-memory decoding, resampling.

use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::types::AudioBuffer;

/// Average interleaved frames down to mono.
fn downmix(interleaved: &[f64], channels: usize) -> Vec<f64> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
        .collect()
}

/// Read a WAV file into a mono buffer.
///
/// Integer formats are normalized to [-1, 1]; multi-channel audio is
/// averaged to mono.
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    read_wav_from(reader).with_context(|| format!("Failed to read WAV samples: {}", path.display()))
}

fn read_wav_from<R: std::io::Read>(reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect::<std::result::Result<Vec<f64>, _>>()?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<std::result::Result<Vec<f64>, _>>()?,
    };

    Ok(AudioBuffer::new(downmix(&interleaved, channels), spec.sample_rate))
}

/// Write a buffer to a 16-bit PCM mono WAV file.
///
/// Clips to [-1, 1]. Creates parent directories if needed.
pub fn write_wav(path: &Path, audio: &AudioBuffer) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &sample in &audio.samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Resample mono samples with rubato's sinc interpolator.
pub fn resample(samples: &[f64], from_sr: u32, to_sr: u32) -> Result<Vec<f64>> {
    if from_sr == 0 || to_sr == 0 {
        anyhow::bail!("Cannot resample {} Hz -> {} Hz", from_sr, to_sr);
    }
    if from_sr == to_sr || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_sr as f64 / from_sr as f64;
    let mut resampler = SincFixedIn::<f64>::new(ratio, 2.0, params, samples.len(), 1)?;
    let output = resampler.process(&[samples.to_vec()], None)?;

    Ok(output.into_iter().next().unwrap_or_default())
}

/// Convert a buffer to `sample_rate`, passing it through when already there.
pub fn conform(audio: AudioBuffer, sample_rate: u32) -> Result<AudioBuffer> {
    if audio.sample_rate == sample_rate {
        return Ok(audio);
    }
    log::debug!("Resampling {} Hz -> {} Hz", audio.sample_rate, sample_rate);
    let samples = resample(&audio.samples, audio.sample_rate, sample_rate)?;
    Ok(AudioBuffer::new(samples, sample_rate))
}

/// Decode encoded audio (WAV, MP3) held in memory to a mono buffer.
///
/// `extension` is a format hint such as "mp3"; it may be empty.
pub fn decode_audio_bytes(bytes: &[u8], extension: &str) -> Result<AudioBuffer> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
    use symphonia::core::errors::Error as SymphError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if !extension.is_empty() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Unsupported audio format")?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(24000);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported codec")?;

    let mut samples: Vec<f64> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                let mut buf = SampleBuffer::<f64>::new(decoded.frames() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend(downmix(buf.samples(), spec.channels.count()));
            }
            Err(SymphError::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if samples.is_empty() {
        anyhow::bail!("No audio decoded ({} bytes)", bytes.len());
    }

    Ok(AudioBuffer::new(samples, sample_rate))
}
