use criterion::{black_box, criterion_group, criterion_main, Criterion};
use bundlewire_version::{Version, VersionRange};

fn bench_parse_versions(c: &mut Criterion) {
    let versions = ["1", "1.2", "1.2.3", "1.2.3.qualifier", "10.20.30.v20240101-1200"];

    c.bench_function("parse_versions", |b| {
        b.iter(|| {
            for version in versions {
                black_box(Version::parse(black_box(version)).ok());
            }
        })
    });
}

fn bench_parse_ranges(c: &mut Criterion) {
    let ranges = ["[1.0,2.0)", "(1.0,2.0]", "1.5", "[1.2.3.a,1.2.3.b]"];

    c.bench_function("parse_ranges", |b| {
        b.iter(|| {
            for range in ranges {
                black_box(VersionRange::parse(black_box(range)).ok());
            }
        })
    });
}

fn bench_includes(c: &mut Criterion) {
    let range = VersionRange::parse("[1.0,2.0)").unwrap();
    let versions: Vec<Version> = ["0.9", "1.0", "1.5.2", "2.0", "2.0.0.a"]
        .iter()
        .map(|v| Version::parse(v).unwrap())
        .collect();

    c.bench_function("range_includes", |b| {
        b.iter(|| {
            for version in &versions {
                black_box(range.includes(black_box(version)));
            }
        })
    });
}

criterion_group!(benches, bench_parse_versions, bench_parse_ranges, bench_includes);
criterion_main!(benches);
