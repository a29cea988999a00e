#![allow(unused)]
extern crate faultline;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use faultline::{
    analysis::{
        analyze_functions, AnalysisConfig, BasicBlock, ControlFlowGraph, Definitions, Ident, Pos,
        ReachingDefinitions, ResolutionTable, Signature, Statement,
    },
    runtime::{
        ContextId, FunctionId, FunctionStore, ProgramLayout, Recorder, RecorderConfig,
        StaticFunction,
    },
};
use std::{hint::black_box, sync::Arc};

/// Builds a function of `loops` sequential counting loops, each redefining the same
/// `vars` variables in its body.
///
/// ```text
/// b0: declare v0..vN
/// per loop k:  header(k) -> body(k), header(k+1) ; body(k) -> header(k)
/// last header exits to the return block
/// ```
fn nested_loops(name: &str, loops: usize, vars: usize) -> (ControlFlowGraph, ResolutionTable) {
    let mut oracle = ResolutionTable::new();
    let mut next_pos = 1u32;
    let mut pos = || {
        next_pos += 1;
        Pos(next_pos)
    };

    let decls: Vec<Ident> = (0..vars).map(|v| Ident::new(format!("v{v}"), pos())).collect();
    for decl in &decls {
        oracle.define(decl);
    }

    let exit = 1 + 2 * loops;
    let mut blocks = vec![BasicBlock::new(
        vec![Statement::other(decls.clone())],
        vec![],
        vec![1],
    )];
    for k in 0..loops {
        let header = 1 + 2 * k;
        let body = header + 1;
        let after = if k + 1 == loops { exit } else { header + 2 };
        let before = if k == 0 { 0 } else { header - 2 };

        let mut uses = Vec::new();
        for decl in &decls {
            let at = pos();
            oracle.use_of(at, decl.pos);
            uses.push(Ident::new(decl.name.clone(), at));
        }
        blocks.push(BasicBlock::new(
            vec![Statement::other(uses)],
            vec![before, body],
            vec![body, after],
        ));

        let mut stmts = Vec::new();
        for decl in &decls {
            let at = pos();
            oracle.use_of(at, decl.pos);
            stmts.push(Statement::assign(vec![Ident::new(decl.name.clone(), at)], vec![]));
        }
        blocks.push(BasicBlock::new(stmts, vec![header], vec![header]));
    }
    blocks.push(BasicBlock::new(
        vec![Statement::other(vec![])],
        vec![exit - 2],
        vec![],
    ));

    let cfg = ControlFlowGraph::new(name, Signature::new(), blocks).unwrap();
    (cfg, oracle)
}

fn bench_reaching_definitions(c: &mut Criterion) {
    let mut group = c.benchmark_group("reaching_definitions");
    for loops in [4, 16, 64] {
        let (cfg, oracle) = nested_loops("bench.loops", loops, 8);
        group.throughput(Throughput::Elements(cfg.block_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(loops), &loops, |b, _| {
            b.iter(|| {
                let defs = Definitions::find(black_box(&cfg), &oracle);
                let rd =
                    ReachingDefinitions::solve(&cfg, defs, &AnalysisConfig::default()).unwrap();
                black_box(rd)
            });
        });
    }
    group.finish();
}

fn bench_analyze_functions(c: &mut Criterion) {
    // Every function uses the same positions, so one oracle serves all of them
    let (_, oracle) = nested_loops("bench.f0", 8, 4);
    let cfgs: Vec<ControlFlowGraph> = (0..64)
        .map(|i| nested_loops(&format!("bench.f{i}"), 8, 4).0)
        .collect();

    let mut group = c.benchmark_group("analyze_functions");
    for (label, config) in [
        ("parallel", AnalysisConfig::default()),
        ("sequential", AnalysisConfig::sequential()),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| black_box(analyze_functions(black_box(&cfgs), &oracle, &config)));
        });
    }
    group.finish();
}

fn bench_recorder(c: &mut Criterion) {
    let mut layout = ProgramLayout::new();
    layout.insert(
        StaticFunction::from_successors(
            FunctionId::new("bench.loop", 0x1000),
            vec![vec![1], vec![2, 3], vec![1], vec![]],
        )
        .unwrap(),
    );

    c.bench_function("recorder_call_1000_iterations", |b| {
        b.iter(|| {
            let recorder = Recorder::new(
                layout.clone(),
                Arc::new(FunctionStore::new()),
                RecorderConfig::default(),
            );
            let ctx = ContextId(1);
            recorder.enter_function(ctx, "bench.loop", "").unwrap();
            for _ in 0..1000 {
                recorder.enter_block(ctx, 1, "").unwrap();
                recorder.enter_block(ctx, 2, "").unwrap();
            }
            recorder.enter_block(ctx, 1, "").unwrap();
            recorder.enter_block(ctx, 3, "").unwrap();
            recorder.exit_function(ctx, "bench.loop").unwrap();
            black_box(recorder.shutdown().unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_reaching_definitions,
    bench_analyze_functions,
    bench_recorder
);
criterion_main!(benches);
