//! Benchmarks for color sampling and composite image rendering.
//!
//! Run with: cargo bench
//! Run with parallel summary loading: cargo bench --features rayon

use std::time::Duration;

use criterion::Criterion;
use framegrab::{
    Canvas, Color, GridLayout, ImageFormat, RasterCanvas, Size, StripBuilder, StripMode,
    SummaryBuilder, Video, average_color,
};
use image::{DynamicImage, Rgb, RgbImage};

fn test_frame(width: u32, height: u32, seed: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x as u8).wrapping_add(seed),
            (y as u8).wrapping_mul(3),
            seed,
        ])
    }))
}

fn palette(count: usize) -> Vec<Color> {
    (0..count)
        .map(|index| {
            let value = (index * 255 / count.max(1)) as u8;
            Color::rgb(value, 255 - value, value / 2)
        })
        .collect()
}

fn benchmark_average_color(criterion: &mut Criterion) {
    let frame = test_frame(1920, 1080, 7);
    criterion.bench_function("average color 1080p frame", |bencher| {
        bencher.iter(|| average_color(&frame));
    });
}

fn benchmark_strip_render(criterion: &mut Criterion) {
    let colors = palette(100);

    criterion.bench_function("render linear strip 1280x128", |bencher| {
        bencher.iter(|| {
            let mut canvas = RasterCanvas::create(Size::new(1280, 128));
            StripBuilder::render(&mut canvas, &colors, StripMode::Linear).unwrap();
        });
    });

    criterion.bench_function("render gradient strip 1280x128", |bencher| {
        bencher.iter(|| {
            let mut canvas = RasterCanvas::create(Size::new(1280, 128));
            StripBuilder::render(&mut canvas, &colors, StripMode::Gradient).unwrap();
        });
    });

    criterion.bench_function("encode strip as jpeg", |bencher| {
        let mut canvas = RasterCanvas::create(Size::new(1280, 128));
        StripBuilder::render(&mut canvas, &colors, StripMode::Linear).unwrap();
        bencher.iter(|| canvas.encode(ImageFormat::Jpeg, 90).unwrap());
    });
}

fn benchmark_summary(criterion: &mut Criterion) {
    criterion.bench_function("grid layout 60 cells", |bencher| {
        bencher.iter(|| {
            let layout = GridLayout::new(60, 16.0 / 9.0);
            (0..60).map(|index| layout.cell_rect(index)).count()
        });
    });

    let directory = tempfile::tempdir().unwrap();
    let frames: Vec<_> = (0..12u64)
        .map(|index| {
            let path = directory
                .path()
                .join(format!("Bench.00.00.{:02}.000.png", index * 5));
            test_frame(640, 360, index as u8).save(&path).unwrap();
            path
        })
        .collect();
    let video = Video::new("Bench.mp4", Duration::from_secs(60), Size::new(640, 360))
        .with_title("Bench")
        .with_frames(frames);
    let builder = SummaryBuilder::new();

    let mut group = criterion.benchmark_group("summary");
    group.sample_size(10);
    group.bench_function("create summary of 12 frames", |bencher| {
        bencher.iter(|| builder.create_summary_image(&video).unwrap());
    });
    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_average_color,
    benchmark_strip_render,
    benchmark_summary,
);
criterion::criterion_main!(benches);
