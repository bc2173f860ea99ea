use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use formula_workbench::builder::ExpressionBuilder;
use formula_workbench::config::FieldCatalog;
use formula_workbench::formula::CustomDataSet;
use formula_workbench::validator::{Finalizer, RuleChecker};

// 一段按键脚本：按类别回放到构建器上
#[derive(Clone, Copy)]
enum Press {
    Data(&'static str),
    Num(&'static str),
    Op(&'static str),
    LParen,
    RParen,
}

fn replay(presses: &[Press]) -> ExpressionBuilder {
    let mut builder = ExpressionBuilder::new();
    for press in presses {
        match press {
            Press::Data(field) => builder.append_data_ref(*field),
            Press::Num(n) => builder.append_number(*n),
            Press::Op(op) => builder.append_operator(*op),
            Press::LParen => builder.append_left_paren(),
            Press::RParen => builder.append_right_paren(),
        }
    }
    builder
}

fn scripts() -> Vec<(&'static str, Vec<Press>)> {
    use Press::*;
    vec![
        ("simple", vec![Data("temperature"), Op("+"), Num("5")]),
        (
            "medium",
            vec![
                LParen,
                Data("temperature"),
                Op("+"),
                Data("humidity"),
                RParen,
                Op("*"),
                Num("2"),
            ],
        ),
        (
            "complex",
            vec![
                LParen,
                LParen,
                Data("windSpeed"),
                Op("*"),
                Num("3"),
                Num("6"),
                RParen,
                Op("+"),
                LParen,
                Data("pressure"),
                Op("/"),
                Num("1"),
                Num("0"),
                RParen,
                RParen,
                Op("%"),
                Num("7"),
            ],
        ),
    ]
}

// 基准测试：按键追加性能
fn benchmark_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("builder_append");

    for (name, presses) in scripts() {
        group.bench_with_input(BenchmarkId::new("replay", name), &presses, |b, presses| {
            b.iter(|| black_box(replay(black_box(presses))))
        });
    }

    group.finish();
}

// 基准测试：渲染性能
fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("builder_render");

    for (name, presses) in scripts() {
        // 预先构建
        let builder = replay(&presses);

        group.bench_with_input(BenchmarkId::new("render", name), &builder, |b, builder| {
            b.iter(|| black_box(builder.render()))
        });
    }

    group.finish();
}

// 基准测试：删除回退性能（整段公式逐个删到空）
fn benchmark_delete_rollback(c: &mut Criterion) {
    let mut group = c.benchmark_group("builder_delete");

    for (name, presses) in scripts() {
        let builder = replay(&presses);

        group.bench_with_input(
            BenchmarkId::new("rollback", name),
            &builder,
            |b, builder| {
                b.iter(|| {
                    let mut builder = builder.clone();
                    while builder.delete_last().is_ok() {}
                    black_box(builder)
                })
            },
        );
    }

    group.finish();
}

// 基准测试：完整保存流程（本地校验器）
fn benchmark_save_flow(c: &mut Criterion) {
    let catalog = FieldCatalog::default_catalog();
    let mut group = c.benchmark_group("save_flow");

    for (name, presses) in scripts() {
        let builder = replay(&presses);

        group.bench_with_input(
            BenchmarkId::new("save_with", name),
            &builder,
            |b, builder| {
                b.iter(|| {
                    let mut builder = builder.clone();
                    let mut set = CustomDataSet::new();
                    let mut finalizer = Finalizer::new();
                    let saved = finalizer
                        .save_with(&RuleChecker, "benchFormula", &mut builder, &mut set, &catalog)
                        .unwrap();
                    black_box(saved)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_append,
    benchmark_render,
    benchmark_delete_rollback,
    benchmark_save_flow
);
criterion_main!(benches);
