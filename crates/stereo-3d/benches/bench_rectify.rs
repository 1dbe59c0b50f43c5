use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use stereo_3d::camera::CameraModel;
use stereo_3d::correspondence::{split_matches, FeatureMatch};
use stereo_3d::fundamental::fundamental_8point;
use stereo_3d::linalg::{mul_mat33_vec3, rotation_from_rodrigues};
use stereo_3d::pose::RelativePose;
use stereo_3d::rectify::{hartley_rectify, stereo_rectify, StereoRectifyParams};
use stereo_image::ImageSize;
use stereo_imgproc::calibration::distortion::PolynomialDistortion;

const K: [[f64; 3]; 3] = [[800.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]];

fn pose() -> RelativePose {
    RelativePose {
        rotation: rotation_from_rodrigues(&[0.02, -0.05, 0.01]),
        translation: [-1.0, 0.05, 0.1],
    }
}

/// Project a grid of scene points into both cameras.
fn generate_matches(n: usize) -> Vec<FeatureMatch> {
    let pose = pose();
    let side = (n as f64).sqrt().ceil() as usize;
    let project = |p: [f64; 3]| {
        let q = mul_mat33_vec3(&K, &p);
        [q[0] / q[2], q[1] / q[2]]
    };
    (0..n)
        .map(|i| {
            let x = (i % side) as f64 / side as f64 * 3.0 - 1.5;
            let y = (i / side) as f64 / side as f64 * 2.0 - 1.0;
            let p1 = [x, y, 5.0 + ((i * 7) % 11) as f64 * 0.4];
            let r = mul_mat33_vec3(&pose.rotation, &p1);
            let p2 = [
                r[0] + pose.translation[0],
                r[1] + pose.translation[1],
                r[2] + pose.translation[2],
            ];
            FeatureMatch::new(project(p1), project(p2))
        })
        .collect()
}

fn bench_fundamental_8point(c: &mut Criterion) {
    let mut group = c.benchmark_group("fundamental_8point");
    for &n in &[8, 50, 200] {
        let (x1, x2) = split_matches(&generate_matches(n));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let _ = std::hint::black_box(fundamental_8point(&x1, &x2));
            });
        });
    }
    group.finish();
}

fn bench_hartley_rectify(c: &mut Criterion) {
    let mut group = c.benchmark_group("hartley_rectify");
    let size = ImageSize {
        width: 640,
        height: 480,
    };
    for &n in &[16, 100, 400] {
        let matches = generate_matches(n);
        let (x1, x2) = split_matches(&matches);
        let Ok(f) = fundamental_8point(&x1, &x2) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let _ = std::hint::black_box(hartley_rectify(&matches, &f, size, 1.0));
            });
        });
    }
    group.finish();
}

fn bench_stereo_rectify(c: &mut Criterion) {
    let camera = CameraModel::new(
        &K,
        PolynomialDistortion {
            k1: -0.1,
            k2: 0.01,
            ..Default::default()
        },
    );
    let size = ImageSize {
        width: 640,
        height: 480,
    };
    let pose = pose();
    let params = StereoRectifyParams {
        alpha: Some(0.0),
        ..Default::default()
    };
    c.bench_function("stereo_rectify", |b| {
        b.iter(|| {
            let _ = std::hint::black_box(stereo_rectify(&camera, &camera, size, &pose, &params));
        });
    });
}

criterion_group!(
    benches,
    bench_fundamental_8point,
    bench_hartley_rectify,
    bench_stereo_rectify
);
criterion_main!(benches);
