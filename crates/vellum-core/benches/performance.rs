use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use vellum_core::tokens::project_line_tokens;
use vellum_core::{DocumentBuffer, EditorApi, EditorSession, Token, Viewport};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (vellum benchmark line)\n"
        ));
    }
    // Remove the final '\n' to avoid creating an extra trailing empty line.
    out.pop();
    out
}

fn bench_large_file_open(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("large_file_open/50k_lines", |b| {
        b.iter(|| {
            let buffer = DocumentBuffer::new(black_box(&text));
            black_box(buffer.line_count());
        })
    });
}

fn bench_offset_to_position(c: &mut Criterion) {
    let buffer = DocumentBuffer::new(&large_text(50_000));
    let len = buffer.char_count();
    c.bench_function("offset_to_position/1000_lookups", |b| {
        b.iter(|| {
            for i in 0..1_000 {
                black_box(buffer.offset_to_position(i * len / 1_000));
            }
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || {
                let mut api = EditorApi::scratch(&text);
                api.set_cursor_offset(api.buffer().char_count() / 2);
                api
            },
            |mut api| {
                for _ in 0..100 {
                    api.type_text("x");
                }
                black_box(api.version());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_visible_range(c: &mut Criterion) {
    let mut viewport = Viewport::new(1_200.0, 20.0, 1_000_000);
    viewport.set_scroll_top(10_000_000.0);
    c.bench_function("visible_range/1m_lines", |b| {
        b.iter(|| black_box(viewport.visible_range()))
    });
}

fn bench_render_frame(c: &mut Criterion) {
    let text = large_text(50_000);
    let mut session = EditorSession::new(EditorApi::scratch(&text), 1_200.0, 1_000.0);
    session.edit(|api| api.set_cursor_offset(api.buffer().char_count() / 2));

    c.bench_function("render_frame/60_lines", |b| {
        b.iter(|| {
            let frame = session.render_frame();
            black_box(frame.lines.len());
        })
    });
}

fn bench_project_tokens(c: &mut Criterion) {
    let buffer = DocumentBuffer::new(&large_text(10_000));
    let tokens: Vec<Token> = (0..buffer.line_count())
        .map(|line| {
            let start = buffer.line_starts().line_start(line);
            Token::new(start, start + 6, "number")
        })
        .collect();
    let previous = project_line_tokens(&tokens, buffer.line_starts(), &[]).lines;

    c.bench_function("project_line_tokens/10k_lines_reuse", |b| {
        b.iter(|| {
            let projection = project_line_tokens(&tokens, buffer.line_starts(), &previous);
            black_box(projection.changed.len());
        })
    });
}

criterion_group!(
    benches,
    bench_large_file_open,
    bench_offset_to_position,
    bench_typing_in_middle,
    bench_visible_range,
    bench_render_frame,
    bench_project_tokens
);
criterion_main!(benches);
