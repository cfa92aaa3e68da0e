use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use autograde_core::parser::{parse_worksheet_str, validate_worksheet, DocumentFormat};

fn bench_toml_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("toml_parsing");

    for n in [5usize, 50, 200] {
        let toml = generate_worksheet_toml(n);
        group.bench_function(format!("{n}_questions"), |b| {
            b.iter(|| {
                parse_worksheet_str(
                    black_box(&toml),
                    DocumentFormat::Toml,
                    black_box(Path::new("bench.toml")),
                )
            })
        });
    }

    group.finish();
}

fn bench_json_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_parsing");

    let json = generate_worksheet_json(50);
    group.bench_function("50_questions", |b| {
        b.iter(|| {
            parse_worksheet_str(
                black_box(&json),
                DocumentFormat::Json,
                black_box(Path::new("bench.json")),
            )
        })
    });

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let toml = generate_worksheet_toml(200);
    let Ok(worksheet) = parse_worksheet_str(&toml, DocumentFormat::Toml, Path::new("bench.toml"))
    else {
        return;
    };

    c.bench_function("validate_200_questions", |b| {
        b.iter(|| validate_worksheet(black_box(&worksheet)))
    });
}

fn generate_worksheet_toml(n: usize) -> String {
    let mut s = String::from(
        r#"id = "bench"
title = "Benchmark"
difficulty = "beginner"
"#,
    );
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[questions]]
id = "mc_{i}"
type = "multiple-choice"
prompt = "Question {i}"
points = 2
options = ["a", "b", "c", "d"]
correctAnswer = {answer}
"#,
            answer = i % 4
        ));
    }
    s
}

fn generate_worksheet_json(n: usize) -> String {
    let questions: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            serde_json::json!({
                "id": format!("sa_{i}"),
                "type": "short-answer",
                "prompt": format!("Question {i}"),
                "points": 5,
                "correctAnswer": format!("answer {i}"),
                "caseSensitive": false,
            })
        })
        .collect();
    serde_json::json!({
        "id": "bench",
        "title": "Benchmark",
        "questions": questions,
    })
    .to_string()
}

criterion_group!(benches, bench_toml_parsing, bench_json_parsing, bench_validation);
criterion_main!(benches);
