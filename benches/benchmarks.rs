// benches/benchmarks.rs -- CPU blur engine benchmarks.
//
//   cargo bench
//
// The GPU path is dominated by device init and transfer for single images
// and is better measured end-to-end with the demo driver, so only the CPU
// reference engine is benchmarked here.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use gridblur::blur::blur;
use gridblur::image::{Image, Rgba};
use gridblur::params::BlurParams;

/// Generate a synthetic test image with texture (rectangles + gradients).
fn make_scene(w: usize, h: usize) -> Image {
    let mut img = Image::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let base = ((x * 200 / w) + (y * 55 / h)) as u8;
            img.set(x, y, Rgba::new(base, base / 2, 255 - base, 255));
        }
    }
    for rect in 0..6 {
        let rx = (50 + rect * 100) % w;
        let ry = (40 + (rect % 3) * 120) % h;
        let bright = 180u8.wrapping_add(rect as u8 * 10);
        for y in ry..(ry + 60).min(h) {
            for x in rx..(rx + 80).min(w) {
                img.set(x, y, Rgba::new(bright, bright, bright, 255));
            }
        }
    }
    img
}

fn bench_blur_by_radius(c: &mut Criterion) {
    let img = make_scene(640, 480);

    let mut group = c.benchmark_group("blur_640x480");
    // Window work grows as (2r+1)²; sample a few points of the curve.
    for radius in [1u32, 4, 10, 20] {
        group.bench_with_input(
            BenchmarkId::from_parameter(radius),
            &radius,
            |b, &radius| {
                let params = BlurParams::new(radius, radius as f32 / 3.0 + 0.5);
                b.iter(|| blur(&img, &params).unwrap())
            },
        );
    }
    group.finish();
}

fn bench_blur_by_size(c: &mut Criterion) {
    let params = BlurParams::new(4, 1.5);

    let mut group = c.benchmark_group("blur_r4");
    for (w, h) in [(320usize, 240usize), (640, 480), (1280, 720)] {
        let img = make_scene(w, h);
        group.bench_function(format!("{w}x{h}"), |b| {
            b.iter(|| blur(&img, &params).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_blur_by_radius, bench_blur_by_size);
criterion_main!(benches);
