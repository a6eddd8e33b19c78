use criterion::{black_box, criterion_group, criterion_main, Criterion};
use solcheck_core::Policy;
use solcheck_verify::{normalize, verify};

const STATEMENT: &str =
    "On considère la fonction définie ci-dessous. Répondre puis vérifier le résultat obtenu.";

fn solution(final_answer: &str, check: &str) -> String {
    format!(
        "EXERCICE:\n{STATEMENT}\n\nSOLUTION:\nCalcul détaillé.\n\nFINAL_ANSWER:\n{final_answer}\n\nCHECK:\n{check}"
    )
}

fn workload() -> Vec<(&'static str, String)> {
    vec![
        ("équation", solution("2", "Eq(2*x+1, 5)")),
        ("dérivées", solution("(1 - log(x))/x**2", "DERIVATIVE; var=x; func=log(x)/x")),
        ("limites", solution("1", "LIMIT; var=x; expr=sin(x)/x; point=0")),
        ("systèmes", solution("{x: 2, y: -1}", "SYSTEM; Eq(x+y, 1); Eq(x-y, 3)")),
        (
            "optimisation",
            solution(
                "{x_star: 2, f_star: 5}",
                "OPTIMIZE; var=x; func=-2*x**2+8*x-3; domain=[0,5]; goal=max",
            ),
        ),
    ]
}

fn bench_dispatch(c: &mut Criterion) {
    let policy = Policy::default();
    let cases = workload();
    c.bench_function("dispatch_throughput", |b| {
        b.iter(|| {
            for (topic, text) in &cases {
                black_box(verify(topic, STATEMENT, text, &policy));
            }
        });
    });
    c.bench_function("normalize_unstructured", |b| {
        b.iter(|| black_box(normalize("Résoudre 2x+1=5", "x = 2 car 2*2+1 = 5", &policy)));
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
