use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vidresolve::extract::canonicalize;
use vidresolve::extract::ladder::{hosting_id, HOSTING_CONTENT_LADDER};
use vidresolve::resolver::instagram::payload::best_candidate;

fn benchmark_hosting_id(c: &mut Criterion) {
    let mut group = c.benchmark_group("Hosting ID Ladder");

    let shapes = [
        ("watch", "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
        ("shorts", "https://youtube.com/shorts/dQw4w9WgXcQ"),
        ("short-domain", "https://youtu.be/dQw4w9WgXcQ"),
        ("embed", "https://www.youtube.com/embed/dQw4w9WgXcQ"),
        ("miss", "https://vimeo.com/76979871"),
    ];

    for (name, url) in shapes {
        group.bench_with_input(BenchmarkId::new("hosting_id", name), &url, |b, url| {
            b.iter(|| hosting_id(black_box(url)))
        });
    }

    group.finish();
}

fn benchmark_canonicalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Canonicalize");

    let inputs = [
        ("clean", "https://scontent.cdninstagram.com/v/t50/clip.mp4?efg=abc&oh=00"),
        ("slashes", r"https:\/\/scontent.cdninstagram.com\/v\/t50\/clip.mp4?efg=abc"),
        ("unicode", r"https://scontent.cdninstagram.com/v/t50/clip.mp4?efg=abc\u0026oh=00\u0025"),
        ("nested-entity", "https://scontent.cdninstagram.com/v/clip.mp4?a=1&amp;amp;b=2"),
    ];

    for (name, input) in inputs {
        group.bench_with_input(BenchmarkId::new("canonicalize", name), &input, |b, input| {
            b.iter(|| canonicalize(black_box(input)))
        });
    }

    group.finish();
}

fn benchmark_payload_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("Payload Scan");
    let entry = r#"{"video_versions":[{"type":101,"url":"https:\/\/scontent.cdninstagram.com\/o1\/v\/t16\/clip.mp4"}],"video_url":"https:\/\/scontent.cdninstagram.com\/v\/t50\/clip.mp4"}"#;
    let filler = r#"{"edge":{"node":{"text":"lorem ipsum","id":"123"}}},"#;

    for kb in [1usize, 16, 128] {
        let payload = format!("[{}{}]", filler.repeat(kb * 1024 / filler.len()), entry);
        group.bench_with_input(BenchmarkId::new("best_candidate", format!("{}KB", kb)), &payload, |b, payload| {
            b.iter(|| best_candidate(black_box(payload)))
        });

        let markup = format!(
            "<html>{}<iframe src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\"></iframe></html>",
            "<div class=\"ad\">creative</div>".repeat(kb * 1024 / 32)
        );
        group.bench_with_input(BenchmarkId::new("content_scan", format!("{}KB", kb)), &markup, |b, markup| {
            b.iter(|| HOSTING_CONTENT_LADDER.scan(black_box(markup)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_hosting_id,
    benchmark_canonicalize,
    benchmark_payload_scan
);
criterion_main!(benches);
