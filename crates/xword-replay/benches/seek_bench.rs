//! Benchmarks for replay seek
//!
//! Measures performance of:
//! - Prefix replay from blank at different log lengths
//! - Single-action application
//! - Grid diffing

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use xword_grid::{CellCoord, GridLayout, DAILY_GRID_SIZE};
use xword_replay::{
    Action, ActionKind, CommandBuffer, EngineConfig, GridState, PuzzleMetadata, Recording, Replay,
};

/// A plausible solve: select, highlight the row, type, repeat.
fn synthetic_recording(actions: usize) -> Recording {
    // One black corner so the layout is taken as given, not inferred
    let corner = CellCoord::new(DAILY_GRID_SIZE - 1, DAILY_GRID_SIZE - 1);
    let layout = GridLayout::new(DAILY_GRID_SIZE, [corner]).unwrap();
    let mut recording = Recording::new(&layout, PuzzleMetadata::default(), Utc::now());
    let mut ms = 0.0;
    for i in 0..actions {
        let cell = CellCoord::from_index(i / 3 % layout.addressable_count(), DAILY_GRID_SIZE);
        let kind = match i % 3 {
            0 => ActionKind::select(cell),
            1 => ActionKind::highlight(
                (0..DAILY_GRID_SIZE)
                    .map(|c| CellCoord::new(cell.row, c))
                    .filter(|c| *c != corner)
                    .collect(),
            ),
            _ => ActionKind::letter(cell, (b'A' + (i % 26) as u8) as char),
        };
        ms += 120.0;
        recording.actions.push(Action::new(ms, kind));
    }
    recording.total_time = ms;
    recording
}

/// Benchmark seek at different log lengths
fn bench_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("seek");

    for &len in &[100usize, 1_000, 10_000] {
        let mut replay = Replay::new(CommandBuffer::new(), EngineConfig::default());
        replay.load(synthetic_recording(len)).unwrap();

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            let mut flip = false;
            b.iter(|| {
                // Alternate ends so every seek rebuilds
                flip = !flip;
                replay.seek(black_box(if flip { 1.0 } else { 0.1 }));
                replay.sink_mut().take();
            })
        });
    }
    group.finish();
}

/// Benchmark one action applied to a daily-size grid
fn bench_apply(c: &mut Criterion) {
    let blank = GridState::blank(&GridLayout::open(DAILY_GRID_SIZE).unwrap());
    let letter = Action::new(0.0, ActionKind::letter(CellCoord::new(7, 7), 'Q'));
    let highlight = Action::new(
        0.0,
        ActionKind::highlight((0..DAILY_GRID_SIZE).map(|c| CellCoord::new(7, c)).collect()),
    );

    c.bench_function("apply_letter", |b| b.iter(|| blank.apply(black_box(&letter))));
    c.bench_function("apply_highlight", |b| b.iter(|| blank.apply(black_box(&highlight))));
}

/// Benchmark diffing a full grid against blank
fn bench_diff(c: &mut Criterion) {
    let recording = synthetic_recording(675);
    let layout = recording.layout().unwrap();
    let blank = GridState::blank(&layout);
    let (full, _) = GridState::from_actions(&blank, &recording.actions, recording.actions.len());

    c.bench_function("changes_since_blank", |b| {
        b.iter(|| black_box(&full).changes_since(black_box(&blank), 3000))
    });
}

criterion_group!(benches, bench_seek, bench_apply, bench_diff);
criterion_main!(benches);
