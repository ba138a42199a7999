use core_actions::parser::{Parse, ParseContext, parse_action};
use core_keymap::Key;
use core_state::Mode;
use core_text::{Buffer, Point};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_parse(c: &mut Criterion) {
    let buffer = Buffer::from_str("bench", &"fn main() { println!(\"hi\"); }\n".repeat(64));
    let ctx = ParseContext {
        mode: Mode::Normal,
        buffer: &buffer,
        cursor: Point::origin(),
        visual_start: Point::origin(),
        recording: false,
    };
    let sequences: Vec<Vec<Key>> = ["dw", "2d3w", "\"ayy", "ci(", "12gg", "dt)"]
        .iter()
        .map(|s| s.chars().map(Key::Char).collect())
        .collect();
    c.bench_function("parse_action_mixed", |b| {
        b.iter(|| {
            for keys in &sequences {
                let result = parse_action(black_box(keys), &ctx);
                assert!(!matches!(result, Parse::Invalid));
            }
        });
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
