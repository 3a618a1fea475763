//! Integration tests for loading content from disk

mod common;

use std::path::Path;

use common::FakeRenderer;
use forge::audio::{AudioSpec, SampleFormat, TARGET_AUDIO_SPEC};
use forge::config::TruncatedReadPolicy;
use forge::content::{CodecIo, Content, ContentError, ImageCodec, ImageDecodeError};
use image::RgbaImage;

fn write_wav<S: hound::Sample + Copy>(path: &Path, spec: hound::WavSpec, samples: &[S]) {
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn int_spec(channels: u16, sample_rate: u32, bits: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bits,
        sample_format: hound::SampleFormat::Int,
    }
}

#[test]
fn test_wav_is_converted_to_target_spec() {
    let dir = tempfile::tempdir().unwrap();
    let samples: Vec<i16> = (0..2_205).map(|i| ((i % 100) * 300) as i16).collect();
    write_wav(&dir.path().join("tone.wav"), int_spec(1, 22_050, 16), &samples);

    let content = Content::new(dir.path());
    let buffer = content.load_wav("tone.wav").unwrap();

    assert_eq!(buffer.spec(), &TARGET_AUDIO_SPEC);
    assert!(!buffer.is_empty());
    assert_eq!(buffer.size_in_bytes() % TARGET_AUDIO_SPEC.frame_size(), 0);
    // Doubling the rate doubles the frame count
    assert_eq!(buffer.frames(), 4_410);
}

#[test]
fn test_24_bit_wav_is_converted() {
    let dir = tempfile::tempdir().unwrap();
    let samples: Vec<i32> = [4_194_304, -4_194_304].repeat(441);
    write_wav(&dir.path().join("wide.wav"), int_spec(2, 44_100, 24), &samples);

    let content = Content::new(dir.path());
    let buffer = content.load_wav("wide.wav").unwrap();

    assert_eq!(buffer.spec(), &TARGET_AUDIO_SPEC);
    assert_eq!(buffer.frames(), 441);

    // 2^22 in 24 bits is half scale
    let first = f32::from_le_bytes(buffer.data()[..4].try_into().unwrap());
    let second = f32::from_le_bytes(buffer.data()[4..8].try_into().unwrap());
    assert!((first - 0.5).abs() < 1e-3, "{first}");
    assert!((second + 0.5).abs() < 1e-3, "{second}");
}

#[test]
fn test_float_wav_in_target_spec_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let samples = [0.25f32, -0.25, 0.5, -0.5, 1.0, -1.0];
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    write_wav(&dir.path().join("float.wav"), spec, &samples);

    let content = Content::new(dir.path());
    let buffer = content.load_wav("float.wav").unwrap();

    let expected: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    assert_eq!(buffer.spec(), &TARGET_AUDIO_SPEC);
    assert_eq!(buffer.data(), expected.as_slice());
}

#[test]
fn test_missing_audio_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let content = Content::new(dir.path());

    assert!(matches!(
        content.load_wav("missing.wav"),
        Err(ContentError::Io { .. })
    ));
    assert!(matches!(
        content.load_ogg("missing.ogg"),
        Err(ContentError::Io { .. })
    ));
}

#[test]
fn test_ogg_is_converted_to_target_spec() {
    // Mono 22050 Hz Vorbis stream holding 2304 frames of silence
    let content = Content::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"));
    let buffer = content.load_ogg("silence.ogg").unwrap();

    assert_eq!(buffer.spec(), &TARGET_AUDIO_SPEC);
    assert!(!buffer.is_empty());
    assert_eq!(buffer.size_in_bytes() % TARGET_AUDIO_SPEC.frame_size(), 0);
    // Doubling the rate doubles the frame count
    assert_eq!(buffer.frames(), 4_608);
    assert!(buffer.data().iter().all(|&b| b == 0));
}

#[test]
fn test_garbage_ogg_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("noise.ogg"), vec![0x5a; 512]).unwrap();

    let content = Content::new(dir.path());
    let err = content.load_ogg("noise.ogg").unwrap_err();

    assert!(matches!(err, ContentError::Decode { .. }));
    assert!(err.to_string().contains("noise.ogg"));
}

#[test]
fn test_texture_is_uploaded_and_released() {
    let dir = tempfile::tempdir().unwrap();
    RgbaImage::from_pixel(16, 8, image::Rgba([255, 0, 0, 255]))
        .save(dir.path().join("red.png"))
        .unwrap();

    let content = Content::new(dir.path());
    let mut renderer = FakeRenderer::new();
    let texture = content.load_texture(&mut renderer, "red.png").unwrap();

    let uploaded = texture.get().unwrap();
    assert_eq!((uploaded.width, uploaded.height), (16, 8));
    assert_eq!(renderer.released.get(), 0);

    drop(texture);
    assert_eq!(renderer.released.get(), 1);
}

#[test]
fn test_texture_failures_are_classified() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.png"), b"\x89PNG but truncated").unwrap();
    RgbaImage::new(4, 4).save(dir.path().join("ok.png")).unwrap();

    let content = Content::new(dir.path());
    let mut renderer = FakeRenderer::new();

    assert!(matches!(
        content.load_texture(&mut renderer, "absent.png"),
        Err(ContentError::Io { .. })
    ));
    assert!(matches!(
        content.load_texture(&mut renderer, "broken.png"),
        Err(ContentError::Decode { .. })
    ));

    renderer.fail_texture = true;
    assert!(matches!(
        content.load_texture(&mut renderer, "ok.png"),
        Err(ContentError::RenderUpload { .. })
    ));
}

/// Codec that reads through the adapter and emits a 1 pixel wide strip per byte
struct StripCodec;

impl ImageCodec for StripCodec {
    fn decode_rgba(&self, io: &mut dyn CodecIo) -> Result<RgbaImage, ImageDecodeError> {
        io.skip(2)?;
        let mut count = 0;
        let mut buf = [0u8; 3];
        while !io.at_end() {
            count += io.read(&mut buf)? as u32;
        }
        if count == 0 {
            return Err(ImageDecodeError::Empty);
        }
        Ok(RgbaImage::new(count, 1))
    }
}

#[test]
fn test_image_codec_is_pluggable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("strip.raw"), [0u8; 12]).unwrap();

    let content = Content::new(dir.path()).with_codec(Box::new(StripCodec));
    let mut renderer = FakeRenderer::new();
    let texture = content.load_texture(&mut renderer, "strip.raw").unwrap();

    assert_eq!(texture.get().unwrap().width, 10);
}

#[test]
fn test_load_binary_honors_policy_on_complete_files() {
    let dir = tempfile::tempdir().unwrap();
    let bytes: Vec<u8> = (0..=255).collect();
    std::fs::write(dir.path().join("table.bin"), &bytes).unwrap();

    for policy in [TruncatedReadPolicy::Fail, TruncatedReadPolicy::Truncate] {
        let content = Content::new(dir.path()).with_truncated_reads(policy);
        assert_eq!(content.load_binary("table.bin").unwrap(), bytes);
    }
}

#[test]
fn test_bundled_content_loads() {
    let content = Content::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("content"));
    let mut renderer = FakeRenderer::new();

    let texture = content.load_texture(&mut renderer, "bubble.png").unwrap();
    assert!(!texture.is_empty());

    let pop = content.load_wav("pop.wav").unwrap();
    assert_eq!(pop.spec(), &TARGET_AUDIO_SPEC);
    assert!(pop.duration().as_secs_f32() > 0.1);
}

#[test]
fn test_source_spec_is_never_returned() {
    let dir = tempfile::tempdir().unwrap();
    let samples: Vec<i8> = (0..800).map(|i| (i % 64) as i8).collect();
    write_wav(&dir.path().join("eight.wav"), int_spec(1, 8_000, 8), &samples);

    let content = Content::new(dir.path());
    let buffer = content.load_wav("eight.wav").unwrap();

    assert_ne!(buffer.spec(), &AudioSpec::new(SampleFormat::S8, 1, 8_000));
    assert_eq!(buffer.spec(), &TARGET_AUDIO_SPEC);
}
