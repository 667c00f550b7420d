use criterion::{black_box, criterion_group, criterion_main, Criterion};

use button_audio_streamer::audio::{fan_out_stereo, pcm32_to_pcm16};
use button_audio_streamer::wav::frame_pcm16;

fn bench_narrow(c: &mut Criterion) {
    // One default whole transfer of wide capture words.
    let wide: Vec<i32> = (0..32_768).map(|i| (i as i32).wrapping_mul(131_071)).collect();
    let mut narrow = vec![0i16; wide.len()];
    c.bench_function("pcm32_to_pcm16/32768", |b| {
        b.iter(|| pcm32_to_pcm16(black_box(&wide), black_box(&mut narrow)))
    });
}

fn bench_fan_out(c: &mut Criterion) {
    let samples: Vec<i16> = (0..32_768).map(|i| i as i16).collect();
    c.bench_function("fan_out_stereo/32768", |b| {
        b.iter_batched(
            || samples.clone(),
            |mut buf| fan_out_stereo(black_box(&mut buf)),
            criterion::BatchSize::LargeInput,
        )
    });
}

fn bench_frame(c: &mut Criterion) {
    let samples: Vec<i16> = (0..32_768).map(|i| i as i16).collect();
    c.bench_function("wav_frame_pcm16/32768", |b| {
        b.iter(|| frame_pcm16(black_box(&samples)))
    });
}

criterion_group!(benches, bench_narrow, bench_fan_out, bench_frame);
criterion_main!(benches);
