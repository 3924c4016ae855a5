use convo_renderer::avatar::AvatarSource;
use convo_renderer::config::{BubbleConfig, ChainConfig, RenderConfig};
use convo_renderer::error::FetchError;
use convo_renderer::ir::Conversation;
use convo_renderer::layout::{compute_bubble_layout, compute_chain_layout, wrap_to_width};
use convo_renderer::text_metrics::{ApproxMetrics, TextMeasurer};
use convo_renderer::theme::{BubbleTheme, ChainTheme};
use convo_renderer::{MemoryAssets, render_bubbles, render_chain};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

struct NoAvatars;

impl AvatarSource for NoAvatars {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::new(uri, "offline"))
    }
}

fn fixture(name: &str) -> &'static str {
    match name {
        "bubble_small" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/benches/fixtures/bubble_small.json"
        )),
        "bubble_long" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/benches/fixtures/bubble_long.json"
        )),
        "chain_small" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/benches/fixtures/chain_small.json"
        )),
        _ => panic!("unknown fixture"),
    }
}

fn conversation(name: &str) -> Conversation {
    serde_json::from_str(fixture(name)).expect("fixture parse failed")
}

fn measurer(size: f32) -> TextMeasurer {
    TextMeasurer::new(Arc::new(ApproxMetrics::new(size)))
}

fn bench_wrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("wrap");
    let m = measurer(56.0);
    let text = "the quick brown fox jumps over the lazy dog ".repeat(50);
    for width in [240.0f32, 864.0] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, width| {
            b.iter(|| {
                let lines = wrap_to_width(black_box(&text), *width, &m);
                black_box(lines.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let bubble = BubbleConfig::default();
    for name in ["bubble_small", "bubble_long"] {
        let parsed = conversation(name);
        let m = measurer(bubble.font_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &parsed.messages,
            |b, messages| {
                b.iter(|| {
                    let layout = compute_bubble_layout(black_box(messages), &m, &bubble);
                    black_box(layout.blocks.len());
                });
            },
        );
    }
    let chain = ChainConfig::default();
    let parsed = conversation("chain_small");
    let text = measurer(chain.font_size);
    let label = measurer(chain.username_font_size);
    group.bench_with_input(
        BenchmarkId::from_parameter("chain_small"),
        &parsed.messages,
        |b, messages| {
            b.iter(|| {
                let layout = compute_chain_layout(black_box(messages), &text, &label, &chain)
                    .expect("layout failed");
                black_box(layout.blocks.len());
            });
        },
    );
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(20);
    let assets = MemoryAssets::new();
    let theme = BubbleTheme::imessage();
    let config = BubbleConfig::default();
    for name in ["bubble_small", "bubble_long"] {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, data| {
            b.iter(|| {
                let parsed: Conversation =
                    serde_json::from_str(black_box(data)).expect("parse failed");
                let image = render_bubbles(&parsed.messages, &theme, &config, &assets)
                    .expect("render failed");
                black_box(image.png.len());
            });
        });
    }
    let chain_theme = ChainTheme::reddit_dark();
    let chain = ChainConfig::default();
    let render = RenderConfig::default();
    let input = fixture("chain_small");
    group.bench_with_input(BenchmarkId::from_parameter("chain_small"), input, |b, data| {
        b.iter(|| {
            let parsed: Conversation = serde_json::from_str(black_box(data)).expect("parse failed");
            let image = render_chain(
                &parsed.messages,
                &chain_theme,
                &chain,
                &render,
                &assets,
                &NoAvatars,
            )
            .expect("render failed");
            black_box(image.png.len());
        });
    });
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_wrap, bench_layout, bench_end_to_end
);
criterion_main!(benches);
