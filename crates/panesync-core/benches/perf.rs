use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use panesync_core::{AlignmentBuilder, DiffEngine, Granularity, ViewKind};

/// `lines` lines with every seventh rewritten and every thirteenth dropped
fn texts(lines: usize) -> (String, String) {
    let mut old = String::new();
    let mut new = String::new();
    for i in 0..lines {
        let line = format!("let value_{i} = compute({i}, {});\n", i * 3);
        old.push_str(&line);
        if i % 13 == 0 {
            continue;
        }
        if i % 7 == 0 {
            new.push_str(&format!("let value_{i} = compute_fast({i});\n"));
        } else {
            new.push_str(&line);
        }
    }
    (old, new)
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    for lines in [1_000, 10_000] {
        let (old, new) = texts(lines);
        for granularity in [Granularity::Line, Granularity::Word] {
            let engine = DiffEngine::new().with_granularity(granularity);
            group.bench_with_input(
                BenchmarkId::new(granularity.name(), lines),
                &(&old, &new),
                |b, (old, new)| b.iter(|| engine.diff(black_box(old), black_box(new))),
            );
        }
    }
    group.finish();
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align");
    for lines in [1_000, 10_000] {
        let (old, new) = texts(lines);
        for granularity in [Granularity::Line, Granularity::Char] {
            let Ok(Some(changes)) = DiffEngine::new()
                .with_granularity(granularity)
                .diff(&old, &new)
            else {
                continue;
            };
            group.bench_with_input(
                BenchmarkId::new(granularity.name(), lines),
                &changes,
                |b, changes| {
                    b.iter(|| {
                        AlignmentBuilder::build(
                            black_box(changes),
                            &old,
                            &new,
                            granularity,
                            ViewKind::Text,
                        )
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let (old, new) = texts(10_000);
    let Ok(Some(changes)) = DiffEngine::new().diff(&old, &new) else {
        return;
    };
    let Some(table) =
        AlignmentBuilder::build(&changes, &old, &new, Granularity::Line, ViewKind::Text)
    else {
        return;
    };
    let lines = table.result.lines;
    c.bench_function("line_target", |b| {
        let mut line = 0;
        b.iter(|| {
            line = (line + 97) % lines;
            table.line_target(black_box(line))
        })
    });
}

criterion_group!(benches, bench_diff, bench_align, bench_lookup);
criterion_main!(benches);
