use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use shopify_theme_build::copier::copy_file;
use shopify_theme_build::order::{resolve_order_fs, ResolveOptions};
use shopify_theme_build::scanner::scan_section;
use shopify_theme_build::theme::Section;

/// Create a styles tree `depth` levels deep, each level holding an
/// ordering manifest, a few fragments and one nested directory
fn create_styles_tree(root: &Path, depth: usize) -> PathBuf {
    let scss = root.join("scss");
    let mut dir = scss.clone();

    for level in 0..depth {
        fs::create_dir_all(&dir).unwrap();
        for i in 0..4 {
            fs::write(dir.join(format!("part{i}.scss")), format!(".l{level}-{i} {{}}")).unwrap();
        }
        fs::write(
            dir.join("order.json"),
            r#"["part3.scss", "nested", "part0.scss", "part1.scss", "part2.scss"]"#,
        )
        .unwrap();
        dir = dir.join("nested");
    }

    // Leaf group
    fs::create_dir_all(&dir).unwrap();
    for i in 0..8 {
        fs::write(dir.join(format!("leaf{i}.scss")), "").unwrap();
    }

    scss
}

/// Benchmark order resolution with different tree depths
fn bench_resolve_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_order");
    let options = ResolveOptions::default();

    for depth in [1, 8, 32].iter() {
        let temp = TempDir::new().unwrap();
        let scss = create_styles_tree(temp.path(), *depth);

        group.throughput(Throughput::Elements(*depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| resolve_order_fs(black_box(&scss), black_box(&options)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark file copy operations
fn bench_copy_file(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("theme.liquid");
    let dst = temp.path().join("dist").join("theme.liquid");

    fs::write(&src, vec![b'x'; 16 * 1024]).unwrap();

    c.bench_function("copy_file_16kb", |b| {
        b.iter(|| {
            let _ = fs::remove_file(&dst);
            copy_file(black_box(&src), black_box(&dst)).unwrap()
        })
    });
}

/// Benchmark section scanning
fn bench_scan_section(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let snippets = temp.path().join("snippets");

    for i in 0..500 {
        let dir = snippets.join(format!("group{}", i % 10));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("snippet{i}.liquid")), "{{ product.title }}").unwrap();
    }

    c.bench_function("scan_section_500", |b| {
        b.iter(|| scan_section(black_box(temp.path()), black_box(Section::Snippets)))
    });
}

criterion_group!(benches, bench_resolve_order, bench_copy_file, bench_scan_section);
criterion_main!(benches);
