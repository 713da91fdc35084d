use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use verbex::VerbEx;

pub fn criterion_benchmark(c: &mut Criterion) {
    {
        let url = VerbEx::new()
            .start_of_line(true)
            .then("http")
            .maybe("s")
            .then("://")
            .maybe("www.")
            .anything_but(" ")
            .end_of_line(true)
            .compile()
            .unwrap();
        c.bench_function("is_match_url", |b| {
            b.iter(|| url.is_match(black_box("https://www.google.com")))
        });
        c.bench_function("is_match_url_miss", |b| {
            b.iter(|| url.is_match(black_box("http://goo gle.com")))
        });
    }

    {
        // The literal prefix goes through the memmem prefilter.
        let needle = VerbEx::new().then("needle").maybe("s").compile().unwrap();
        let hay = format!("{}needle", "hay ".repeat(200));
        c.bench_function("find_literal_prefilter", |b| {
            b.iter(|| needle.find(black_box(hay.as_str())))
        });
    }

    {
        let words = VerbEx::new()
            .begin_capture()
            .word()
            .end_capture()
            .unwrap()
            .compile()
            .unwrap();
        let prose = "the quick brown fox jumps over the lazy dog ".repeat(20);
        c.bench_function("captures_iter_words", |b| {
            b.iter(|| words.captures_iter(black_box(prose.as_str())).count())
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
