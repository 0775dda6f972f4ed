//! Benchmarks for repage sequence maintenance.
//!
//! Run with: cargo bench
//!
//! These benchmarks exercise membership recomputation and selection over
//! synthetic workspaces at various sizes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use repage::{Modifiers, PageKey, PageStore, Position, SelectionState, Sequence};

/// Builds a store and sequence with `docs` documents of `pages` pages each.
fn build_workspace(docs: usize, pages: u32) -> (PageStore, Sequence) {
    let mut store = PageStore::new();
    let mut seq = Sequence::new();
    for d in 0..docs {
        let name = format!("scan-{d:03}.tif");
        store.open_source(&name, pages);
        seq.insert_separator(Position::End).unwrap();
        for n in 1..=pages {
            let p = store.resolve(&PageKey::new(name.clone(), n)).unwrap();
            seq.insert_page(p, Position::End).unwrap();
        }
    }
    seq.recompute_membership(&store);
    (store, seq)
}

/// Benchmark membership recomputation at various sequence sizes.
fn bench_recompute_membership(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute_membership");

    for (docs, pages) in [(10, 10), (50, 10), (100, 10)].iter() {
        let (store, mut seq) = build_workspace(*docs, *pages);

        group.bench_function(format!("{}_docs_{}_pages", docs, pages), |b| {
            b.iter(|| {
                let notes = seq.recompute_membership(black_box(&store));
                black_box(notes);
            });
        });
    }

    group.finish();
}

/// Benchmark a split followed by the merge that undoes it.
fn bench_split_merge(c: &mut Criterion) {
    let (store, mut seq) = build_workspace(20, 25);
    let mid = seq.len() / 2;

    c.bench_function("split_then_merge", |b| {
        b.iter(|| {
            let sep = seq.insert_separator(Position::At(black_box(mid))).unwrap();
            seq.recompute_membership(&store);
            seq.remove(sep).unwrap();
            seq.recompute_membership(&store);
        });
    });
}

/// Benchmark a shift-range selection spanning most of the sequence.
fn bench_range_selection(c: &mut Criterion) {
    let (_store, seq) = build_workspace(50, 10);
    let pages: Vec<_> = seq.elements().filter(|e| e.is_page()).map(|e| e.id()).collect();
    let first = pages[0];
    let last = *pages.last().unwrap();

    c.bench_function("shift_range_selection", |b| {
        b.iter(|| {
            let mut sel = SelectionState::new();
            sel.process_selection(&seq, black_box(first), &[], true, Modifiers::NONE);
            sel.process_selection(&seq, black_box(last), &[], true, Modifiers::SHIFT);
            black_box(sel.selected().len());
        });
    });
}

criterion_group!(
    benches,
    bench_recompute_membership,
    bench_split_merge,
    bench_range_selection,
);
criterion_main!(benches);
