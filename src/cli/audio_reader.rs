//! Audio file decoding and preparation utilities.
//!
//! Containers and codecs are probed with symphonia (WAV, AIFF, MP4/M4A with
//! AAC); the decoded interleaved samples are then mixed to mono and resampled
//! to 16kHz for Whisper.

use anyhow::{bail, Context, Result};
use log::debug;
use rubato::{FftFixedIn, Resampler};
use std::fs::File;
use std::io;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Sample rate Whisper expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Audio data decoded from a file.
#[derive(Debug)]
pub struct DecodedAudio {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1=mono, 2=stereo)
    pub channels: u16,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f32>,
}

/// Decode an audio file to interleaved f32 samples.
///
/// Integer PCM of any depth is normalized to [-1, 1]; float PCM passes
/// through. The file extension is only a hint, the content decides.
pub fn read_audio(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Unsupported audio format: {}", path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .with_context(|| format!("No audio track found: {}", path.display()))?;

    let codec_params = track.codec_params.clone();
    let track_id = track.id;
    let mut sample_rate = codec_params.sample_rate.unwrap_or(WHISPER_SAMPLE_RATE);
    let mut channels = codec_params.channels.map_or(1, |c| c.count()) as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .with_context(|| format!("Unsupported audio codec: {}", path.display()))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read audio packet: {}", path.display())))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to decode audio: {}", path.display())))
            }
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    let total_frames = samples.len() / channels.max(1) as usize;
    let duration_secs = total_frames as f64 / sample_rate as f64;

    Ok(DecodedAudio {
        sample_rate,
        channels,
        duration_secs,
        samples,
    })
}

/// Convert interleaved multi-channel audio to mono by averaging channels.
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let num_channels = channels as usize;
    samples
        .chunks_exact(num_channels)
        .map(|frame| frame.iter().sum::<f32>() / num_channels as f32)
        .collect()
}

/// Resample mono audio to 16kHz using rubato.
fn resample_to_16khz(samples: &[f32], input_rate: u32) -> Result<Vec<f32>> {
    if input_rate == WHISPER_SAMPLE_RATE {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        input_rate as usize,
        WHISPER_SAMPLE_RATE as usize,
        1024, // chunk size
        2,    // sub chunks
        1,    // channels
    )
    .context("Failed to create resampler")?;

    let mut output = Vec::new();
    let mut input_pos = 0;

    let frames_needed = resampler.input_frames_next();
    while input_pos + frames_needed <= samples.len() {
        let input_chunk = vec![samples[input_pos..input_pos + frames_needed].to_vec()];
        let resampled = resampler.process(&input_chunk, None).context("Resampling failed")?;
        output.extend_from_slice(&resampled[0]);
        input_pos += frames_needed;
    }

    // Tail: pad to a full chunk, keep only the share that maps to real input
    if input_pos < samples.len() {
        let remaining = &samples[input_pos..];
        let mut padded = remaining.to_vec();
        padded.resize(frames_needed, 0.0);
        let input_chunk = vec![padded];
        let resampled = resampler
            .process(&input_chunk, None)
            .context("Resampling final chunk failed")?;

        let remaining_duration = remaining.len() as f64 / input_rate as f64;
        let expected_output = (remaining_duration * WHISPER_SAMPLE_RATE as f64).ceil() as usize;
        let actual_output = expected_output.min(resampled[0].len());
        output.extend_from_slice(&resampled[0][..actual_output]);
    }

    Ok(output)
}

/// Prepare decoded audio for Whisper: mono, 16kHz.
pub fn prepare_for_whisper(audio: &DecodedAudio) -> Result<Vec<f32>> {
    if audio.samples.is_empty() {
        bail!("Audio contains no samples");
    }

    let mono = to_mono(&audio.samples, audio.channels);
    resample_to_16khz(&mono, audio.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    /// Write `frames` frames alternating full-scale positive / negative
    /// values on the first channel, zero on the others.
    fn write_wav(
        path: &Path,
        sample_rate: u32,
        channels: u16,
        frames: usize,
        bits_per_sample: u16,
        sample_format: SampleFormat,
    ) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for frame in 0..frames {
            let positive = frame % 2 == 0;
            for ch in 0..channels {
                match (sample_format, bits_per_sample) {
                    (SampleFormat::Float, _) => {
                        let v = if ch > 0 { 0.0 } else if positive { 1.0 } else { -1.0 };
                        writer.write_sample(v as f32).unwrap();
                    }
                    (SampleFormat::Int, 8) => {
                        let v = if ch > 0 { 0 } else if positive { i8::MAX } else { i8::MIN };
                        writer.write_sample(v).unwrap();
                    }
                    (SampleFormat::Int, 16) => {
                        let v = if ch > 0 { 0 } else if positive { i16::MAX } else { i16::MIN };
                        writer.write_sample(v).unwrap();
                    }
                    (SampleFormat::Int, bits) => {
                        let max = ((1i64 << (bits - 1)) - 1) as i32;
                        let v = if ch > 0 { 0 } else if positive { max } else { -max - 1 };
                        writer.write_sample(v).unwrap();
                    }
                }
            }
        }
        writer.finalize().unwrap();
    }

    /// 80-bit IEEE extended encoding of an integer sample rate, as AIFF stores it.
    fn extended_rate(rate: u32) -> [u8; 10] {
        let top_bit = 31 - rate.leading_zeros();
        let exponent = (16383 + top_bit) as u16;
        let mantissa = (rate as u64) << (63 - top_bit);
        let mut out = [0u8; 10];
        out[..2].copy_from_slice(&exponent.to_be_bytes());
        out[2..].copy_from_slice(&mantissa.to_be_bytes());
        out
    }

    /// Minimal 16-bit mono PCM AIFF file.
    fn write_aiff(path: &Path, sample_rate: u32, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;

        let mut comm = Vec::new();
        comm.extend_from_slice(&1u16.to_be_bytes());
        comm.extend_from_slice(&(samples.len() as u32).to_be_bytes());
        comm.extend_from_slice(&16u16.to_be_bytes());
        comm.extend_from_slice(&extended_rate(sample_rate));

        let mut ssnd = Vec::new();
        ssnd.extend_from_slice(&0u32.to_be_bytes()); // offset
        ssnd.extend_from_slice(&0u32.to_be_bytes()); // block size
        for s in samples {
            ssnd.extend_from_slice(&s.to_be_bytes());
        }

        let form_len = 4 + (8 + comm.len() as u32) + (8 + 8 + data_len);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"FORM");
        bytes.extend_from_slice(&form_len.to_be_bytes());
        bytes.extend_from_slice(b"AIFF");
        bytes.extend_from_slice(b"COMM");
        bytes.extend_from_slice(&(comm.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&comm);
        bytes.extend_from_slice(b"SSND");
        bytes.extend_from_slice(&(ssnd.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&ssnd);

        std::fs::write(path, bytes).unwrap();
    }

    fn assert_full_scale(audio: &DecodedAudio, channels: usize) {
        assert!(
            (audio.samples[0] - 1.0).abs() < 0.01,
            "positive full scale decoded as {}",
            audio.samples[0]
        );
        assert!(
            (audio.samples[channels] + 1.0).abs() < 0.01,
            "negative full scale decoded as {}",
            audio.samples[channels]
        );
    }

    #[test]
    fn test_to_mono_stereo() {
        let stereo = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(to_mono(&stereo, 2), vec![1.5, 3.5]);
    }

    #[test]
    fn test_to_mono_already_mono() {
        let mono = vec![1.0, 2.0, 3.0];
        assert_eq!(to_mono(&mono, 1), mono);
    }

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(resample_to_16khz(&samples, 16000).unwrap(), samples);
    }

    #[test]
    fn test_resample_44k_one_second() {
        let samples = vec![0.0; 44100];
        let out = resample_to_16khz(&samples, 44100).unwrap();
        assert!(
            (out.len() as i64 - 16000).abs() < 50,
            "expected ~16000 samples, got {}",
            out.len()
        );
    }

    #[test]
    fn test_read_wav_stereo_16bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 16000, 2, 8000, 16, SampleFormat::Int);

        let audio = read_audio(&path).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.samples.len(), 16000);
        assert!((audio.duration_secs - 0.5).abs() < 1e-9);
        assert_full_scale(&audio, 2);
        assert_eq!(audio.samples[1], 0.0);
    }

    #[test]
    fn test_read_wav_int_depths_normalize_to_unit_range() {
        for bits in [8u16, 16, 24, 32] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(format!("pcm{}.wav", bits));
            write_wav(&path, 16000, 1, 400, bits, SampleFormat::Int);

            let audio = read_audio(&path).unwrap();
            assert_eq!(audio.samples.len(), 400, "{}-bit frame count", bits);
            assert_full_scale(&audio, 1);
            assert!(
                audio.samples.iter().all(|s| (-1.0..=1.0).contains(s)),
                "{}-bit samples out of range",
                bits
            );
        }
    }

    #[test]
    fn test_read_wav_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        write_wav(&path, 22050, 1, 400, 32, SampleFormat::Float);

        let audio = read_audio(&path).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.samples.len(), 400);
        assert_full_scale(&audio, 1);
    }

    #[test]
    fn test_read_aiff_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pluck.aiff");
        let samples: Vec<i16> = (0..1600)
            .map(|i| if i % 2 == 0 { i16::MAX } else { i16::MIN })
            .collect();
        write_aiff(&path, 16000, &samples);

        let audio = read_audio(&path).unwrap();
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples.len(), 1600);
        assert!((audio.duration_secs - 0.1).abs() < 1e-9);
        assert_full_scale(&audio, 1);

        let prepared = prepare_for_whisper(&audio).unwrap();
        assert_eq!(prepared.len(), 1600);
    }

    #[test]
    fn test_prepare_stereo_mixes_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 16000, 2, 1600, 16, SampleFormat::Int);

        let audio = read_audio(&path).unwrap();
        let prepared = prepare_for_whisper(&audio).unwrap();
        assert_eq!(prepared.len(), 1600);
        assert!((prepared[0] - 0.5).abs() < 0.01);
        assert!((prepared[1] + 0.5).abs() < 0.01);
    }

    #[test]
    fn test_prepare_empty_audio_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, 16000, 1, 0, 16, SampleFormat::Int);

        let audio = read_audio(&path).unwrap();
        assert!(prepare_for_whisper(&audio).is_err());
    }

    #[test]
    fn test_read_missing_file_fails() {
        let err = format!("{:#}", read_audio(Path::new("/nonexistent/missing.wav")).unwrap_err());
        assert!(err.contains("Failed to open audio file"));
    }

    #[test]
    fn test_read_non_audio_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"this is not audio").unwrap();

        let err = format!("{:#}", read_audio(&path).unwrap_err());
        assert!(err.contains("Unsupported audio format"));
    }
}
