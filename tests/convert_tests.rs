// Tests for converting native capture streams to session PCM

use realtime_transcribe::audio::convert::{
    append_downmixed, i16_to_f32, u16_to_f32, LinearResampler, PcmConverter,
};
use realtime_transcribe::audio::AudioFormat;

fn pcm_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

#[test]
fn test_downmix_averages_frames() {
    let mut mono = Vec::new();
    append_downmixed(&mut mono, &[0.5f32, -0.5, 1.0, 0.0], 2, |s| s);
    assert_eq!(mono, vec![0.0, 0.5]);

    let mut passthrough = Vec::new();
    append_downmixed(&mut passthrough, &[0.25f32, 0.75], 1, |s| s);
    assert_eq!(passthrough, vec![0.25, 0.75]);
}

#[test]
fn test_sample_type_normalization() {
    assert_eq!(i16_to_f32(0), 0.0);
    assert_eq!(i16_to_f32(-32768), -1.0);
    assert_eq!(u16_to_f32(32768), 0.0);
    assert_eq!(u16_to_f32(0), -1.0);
}

#[test]
fn test_downsampling_halves_length_across_buffers() {
    let mut resampler = LinearResampler::new(48000, 24000);
    let mut out = Vec::new();

    // 4800 input samples (100ms at 48kHz) split into uneven callback buffers
    let input: Vec<f32> = (0..4800).map(|n| (n as f32 / 4800.0)).collect();
    for chunk in input.chunks(333) {
        resampler.process(chunk, &mut out);
    }

    // ~2400 samples at 24kHz, give or take the carried sample
    assert!((2398..=2400).contains(&out.len()), "got {}", out.len());

    // A ramp stays a monotonic ramp through chunk boundaries
    assert!(out.windows(2).all(|w| w[1] > w[0]));
    assert!((out[1] - input[2]).abs() < 1e-6);
}

#[test]
fn test_upsampling_interpolates() {
    let mut resampler = LinearResampler::new(16000, 24000);
    let mut out = Vec::new();

    resampler.process(&[0.0, 0.3, 0.6, 0.9], &mut out);

    // Read positions advance by 2/3 of an input sample
    assert!((out[0] - 0.0).abs() < 1e-6);
    assert_eq!(out.len(), 5);
    assert!((out[3] - 0.6).abs() < 1e-6);
    assert!(out.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_converter_matches_target_format() {
    let target = AudioFormat::default();
    let mut converter = PcmConverter::new(48000, 2, &target);

    // 960 stereo frames of i16 at 48kHz = 20ms
    let native: Vec<i16> = (0..960).flat_map(|_| [16384i16, 16384]).collect();
    let pcm = converter.convert(&native, i16_to_f32);
    let samples = pcm_samples(&pcm);

    // 20ms at 24kHz mono
    assert!((479..=480).contains(&samples.len()), "got {}", samples.len());
    assert!(samples.iter().all(|&s| (s - 16383).abs() <= 1));
}

#[test]
fn test_converter_passthrough_and_channel_fanout() {
    let target = AudioFormat {
        channels: 2,
        ..AudioFormat::default()
    };
    let mut converter = PcmConverter::new(24000, 1, &target);

    let pcm = converter.convert(&[1.0f32, -1.0, 2.0], |s| s);

    assert_eq!(
        pcm_samples(&pcm),
        vec![i16::MAX, i16::MAX, -i16::MAX, -i16::MAX, i16::MAX, i16::MAX],
        "Mono is duplicated per output channel and clamped"
    );
}
