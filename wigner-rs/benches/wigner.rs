use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::f64::consts::PI;
use wigner_rs::grid::UniformGrid;
use wigner_rs::kernel::KernelLifecycle;
use wigner_rs::signal::traits::PseudoWigner2D;
use wigner_rs::signal::wigner::{PseudoWignerConfig, PseudoWignerKernel};

/// Linear chirp sweeping 0.5 Hz to 4 Hz over `duration` seconds.
fn chirp(duration: f64) -> impl Fn(f64) -> f64 + Sync {
    let rate = 3.5 / duration;
    move |t: f64| (2.0 * PI * (0.5 * t + 0.5 * rate * t * t)).cos()
}

/// The 600 x 2000 reference grid: `dt = 0.05`, `df = 0.01`.
fn pure_tone_reference(c: &mut Criterion) {
    let times = UniformGrid::arange(0.0, 30.0, 0.05).expect("time grid");
    let freqs = UniformGrid::arange(-10.0, 10.0, 0.01).expect("frequency grid");
    let kernel = PseudoWignerKernel::try_new(PseudoWignerConfig::new(times, freqs))
        .expect("reference grids should be compatible");
    let tone = |t: f64| (2.0 * PI * t).cos();

    c.bench_function("pwvd_tone_600x2000", |b| {
        b.iter(|| {
            black_box(
                kernel
                    .run_alloc(&tone)
                    .expect("tone is finite everywhere"),
            );
        });
    });
}

/// Scale the time axis at a fixed transform length.
fn chirp_time_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("pwvd_chirp_time_scaling");
    for duration in [5.0, 10.0, 20.0] {
        let times = UniformGrid::arange(0.0, duration, 0.05).expect("time grid");
        let freqs = UniformGrid::arange(-10.0, 10.0, 0.02).expect("frequency grid");
        let kernel = PseudoWignerKernel::try_new(PseudoWignerConfig::new(times, freqs))
            .expect("grids should be compatible");
        let signal = chirp(duration);
        group.bench_with_input(BenchmarkId::from_parameter(duration), &kernel, |b, k| {
            b.iter(|| black_box(k.run_alloc(&signal).expect("chirp is finite everywhere")));
        });
    }
    group.finish();
}

criterion_group!(benches, pure_tone_reference, chirp_time_scaling);
criterion_main!(benches);
