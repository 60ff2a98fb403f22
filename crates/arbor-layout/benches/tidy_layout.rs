use arbor_core::{CandidateChild, Tree};
use arbor_layout::{LayoutConfig, Viewport, layout_tree};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// Complete `fanout`-ary tree of the given depth, grown through the merge engine.
fn complete_tree(fanout: usize, depth: usize) -> Tree {
    let mut tree = Tree::new("root");
    let mut frontier = vec!["root".to_string()];
    for level in 0..depth {
        let mut next = Vec::new();
        for parent in &frontier {
            let batch: Vec<CandidateChild> = (0..fanout)
                .map(|i| {
                    let id = format!("{parent}.{level}.{i}");
                    CandidateChild::new(id.clone(), id)
                })
                .collect();
            tree = tree.with_merged_children(parent, &batch);
            next.extend(batch.into_iter().map(|c| c.id));
        }
        frontier = next;
    }
    tree
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("tidy_layout");
    let config = LayoutConfig::default();
    for (fanout, depth) in [(3, 4), (4, 5), (8, 3)] {
        let tree = complete_tree(fanout, depth);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{fanout}x{depth}")),
            &tree,
            |b, tree| {
                b.iter(|| layout_tree(black_box(tree), Viewport::default(), &config));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
