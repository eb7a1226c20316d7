//! Benchmarks for the resampler
//!
//! Run with: cargo bench --package pcmflow-resampler

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pcmflow_resampler::{
    AudioFrame, ChannelLayout, ResampleQuality, Resampler, SampleFormat, TimeBase, Timestamp,
};
use std::hint::black_box;

const FRAME_SAMPLES: usize = 1024;
const FRAMES: usize = 48;

fn source_frames(rate: u32) -> Vec<AudioFrame> {
    (0..FRAMES)
        .map(|n| {
            let interleaved: Vec<f32> = (0..FRAME_SAMPLES * 2)
                .map(|i| ((n * FRAME_SAMPLES + i / 2) as f32 * 0.01).sin() * 0.5)
                .collect();
            AudioFrame::from_f32(ChannelLayout::STEREO, SampleFormat::S16, rate, &interleaved)
                .expect("Failed to build frame")
                .with_pts(Timestamp::new(
                    (n * FRAME_SAMPLES) as i64,
                    TimeBase::for_sample_rate(rate),
                ))
        })
        .collect()
}

fn convert_all(resampler: &mut Resampler, frames: &[AudioFrame]) -> usize {
    let mut produced = 0;
    for frame in frames {
        resampler.push_frame(frame).expect("Failed to push");
        while let Some(out) = resampler.pull().expect("Failed to pull") {
            produced += out.samples();
        }
    }
    resampler.flush().expect("Failed to flush");
    while let Some(out) = resampler.pull().expect("Failed to pull") {
        produced += out.samples();
    }
    produced
}

fn build(quality: ResampleQuality, source: u32, target: u32, frame: Option<usize>) -> Resampler {
    Resampler::builder()
        .source_channel_layout(ChannelLayout::STEREO)
        .source_sample_format(SampleFormat::S16)
        .source_sample_rate(source)
        .target_channel_layout(ChannelLayout::STEREO)
        .target_sample_format(SampleFormat::F32)
        .target_sample_rate(target)
        .target_frame_samples(frame)
        .quality(quality)
        .build()
        .expect("Failed to build resampler")
}

fn bench_quality(c: &mut Criterion) {
    let frames = source_frames(44_100);
    let mut group = c.benchmark_group("resample_44100_to_48000");

    for quality in [
        ResampleQuality::Fast,
        ResampleQuality::Balanced,
        ResampleQuality::Accurate,
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(quality), &frames, |b, frames| {
            b.iter(|| {
                let mut resampler = build(quality, 44_100, 48_000, None);
                black_box(convert_all(&mut resampler, frames));
            });
        });
    }

    group.finish();
}

fn bench_reblocking(c: &mut Criterion) {
    let frames = source_frames(48_000);

    c.bench_function("reblock_960_equal_rates", |b| {
        b.iter(|| {
            let mut resampler = build(ResampleQuality::Fast, 48_000, 48_000, Some(960));
            black_box(convert_all(&mut resampler, &frames));
        });
    });
}

fn bench_passthrough(c: &mut Criterion) {
    let frames = source_frames(48_000);

    c.bench_function("identity_passthrough", |b| {
        b.iter(|| {
            let mut resampler = Resampler::builder()
                .source_channel_layout(ChannelLayout::STEREO)
                .source_sample_format(SampleFormat::S16)
                .source_sample_rate(48_000)
                .target_channel_layout(ChannelLayout::STEREO)
                .target_sample_format(SampleFormat::S16)
                .target_sample_rate(48_000)
                .build()
                .expect("Failed to build resampler");
            black_box(convert_all(&mut resampler, &frames));
        });
    });
}

criterion_group!(benches, bench_quality, bench_reblocking, bench_passthrough);
criterion_main!(benches);
