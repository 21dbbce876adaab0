use ambit_core::{CellTextSelection, EditorState, Selection, SiteRowId};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn outline_text(sections: usize, items: usize) -> String {
    let mut out = String::with_capacity(sections * items * 32);
    out.push_str("Benchmark outline");
    for s in 0..sections {
        out.push_str(&format!("\n\tsection {s:05}"));
        for i in 0..items {
            out.push_str(&format!("\n\t\titem {s:05}-{i:03} lorem ipsum dolor"));
        }
    }
    out
}

fn bench_large_outline_open(c: &mut Criterion) {
    // 1 + 2_000 * (1 + 24) lines.
    let text = outline_text(2_000, 24);
    c.bench_function("large_outline_open/50k_lines", |b| {
        b.iter(|| {
            let state = EditorState::new("bench", black_box(&text));
            black_box(state.scene().len());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let text = outline_text(2_000, 24);
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || {
                let mut state = EditorState::new("bench", &text);
                let middle = state.doc().line(state.doc().root()).children()[1_000];
                let row = state.site().row_for_line(middle);
                let caret = CellTextSelection::caret(row, 1, 0).unwrap();
                state.set_selection(Selection::Caret(caret));
                state
            },
            |mut state| {
                for _ in 0..100 {
                    state.insert_char('x').unwrap();
                }
                black_box(state.version());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_random_fold_toggles(c: &mut Criterion) {
    let text = outline_text(2_000, 24);
    let mut state = EditorState::new("bench", &text);
    let sections: Vec<SiteRowId> = state
        .doc()
        .line(state.doc().root())
        .children()
        .iter()
        .map(|&line| state.site().row_for_line(line))
        .collect();
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("fold_toggle/random_section", |b| {
        b.iter(|| {
            let row = sections[rng.gen_range(0..sections.len())];
            black_box(state.toggle_fold(row).patches.len());
        })
    });
}

fn bench_zoom_cycle(c: &mut Criterion) {
    let text = outline_text(2_000, 24);
    let mut state = EditorState::new("bench", &text);
    let section = state.doc().line(state.doc().root()).children()[500];
    let row = state.site().row_for_line(section);

    c.bench_function("zoom_cycle/in_and_out", |b| {
        b.iter(|| {
            black_box(state.zoom_in(row).patches.len());
            black_box(state.zoom_out().patches.len());
        })
    });
}

criterion_group!(
    benches,
    bench_large_outline_open,
    bench_typing_in_middle,
    bench_random_fold_toggles,
    bench_zoom_cycle
);
criterion_main!(benches);
