//! Reaching definitions integration tests.
//!
//! These tests drive the static pipeline through the public API:
//! 1. Build a control flow graph from blocks and statements
//! 2. Resolve identifiers through a `ResolutionTable`
//! 3. Collect objects and references with `Definitions::find`
//! 4. Solve reaching definitions and inspect per-statement sets

use faultline::{
    analysis::{
        analyze_functions, AnalysisConfig, BasicBlock, BlockLocation, ControlFlowGraph,
        Definitions, Ident, Pos, ReachingDefinitions, ResolutionTable, Signature, Statement,
    },
    runtime::{ProgramLayout, StaticFunction},
    Error, Result,
};

fn ids(refs: Vec<&faultline::analysis::Reference>) -> Vec<Pos> {
    let mut ids: Vec<Pos> = refs.iter().map(|r| r.id).collect();
    ids.sort();
    ids
}

fn solve(cfg: &ControlFlowGraph, oracle: &ResolutionTable) -> Result<ReachingDefinitions> {
    ReachingDefinitions::solve(cfg, Definitions::find(cfg, oracle), &AnalysisConfig::default())
}

/// `f(a) { b := a + 1; return b }`
fn increment() -> Result<(ControlFlowGraph, ResolutionTable)> {
    let a = Ident::new("a", Pos(10));
    let b = Ident::new("b", Pos(20));
    let cfg = ControlFlowGraph::new(
        "main.f",
        Signature::new().with_params(vec![a.clone()]),
        vec![BasicBlock::new(
            vec![
                Statement::assign(vec![b.clone()], vec![Ident::new("a", Pos(24))]),
                Statement::other(vec![Ident::new("b", Pos(35))]),
            ],
            vec![],
            vec![],
        )],
    )?;

    let mut oracle = ResolutionTable::new();
    oracle
        .define(&a)
        .define(&b)
        .use_of(Pos(24), Pos(10))
        .use_of(Pos(35), Pos(20));
    Ok((cfg, oracle))
}

/// ```text
/// b0: x := 1        -> b1, b2
/// b1: x = 2         -> b3
/// b2: skip          -> b3
/// b3: use(x)
/// ```
fn diamond() -> Result<(ControlFlowGraph, ResolutionTable)> {
    let cfg = ControlFlowGraph::new(
        "main.pick",
        Signature::new(),
        vec![
            BasicBlock::new(
                vec![Statement::assign(vec![Ident::new("x", Pos(101))], vec![])],
                vec![],
                vec![1, 2],
            ),
            BasicBlock::new(
                vec![Statement::assign(vec![Ident::new("x", Pos(110))], vec![])],
                vec![0],
                vec![3],
            ),
            BasicBlock::new(vec![Statement::other(vec![])], vec![0], vec![3]),
            BasicBlock::new(
                vec![Statement::other(vec![Ident::new("x", Pos(130))])],
                vec![1, 2],
                vec![],
            ),
        ],
    )?;

    let mut oracle = ResolutionTable::new();
    oracle
        .define(&Ident::new("x", Pos(101)))
        .use_of(Pos(110), Pos(101))
        .use_of(Pos(130), Pos(101));
    Ok((cfg, oracle))
}

#[test]
fn test_straight_line_function() -> Result<()> {
    let (cfg, oracle) = increment()?;
    let rd = solve(&cfg, &oracle)?;

    let defs = rd.definitions();
    assert_eq!(defs.objects().len(), 2);
    assert_eq!(
        defs.object(Pos(10)).map(|o| o.location),
        Some(BlockLocation::Entry)
    );
    assert_eq!(
        defs.object(Pos(20)).map(|o| o.location),
        Some(BlockLocation::at(0, 0))
    );

    assert_eq!(ids(rd.reaching_in(BlockLocation::at(0, 0))), vec![Pos(10)]);
    assert_eq!(
        ids(rd.reaching_out(BlockLocation::at(0, 0))),
        vec![Pos(10), Pos(20)]
    );
    assert_eq!(
        ids(rd.reaching_in(BlockLocation::at(0, 1))),
        vec![Pos(10), Pos(20)]
    );
    Ok(())
}

#[test]
fn test_branches_join_definitions() -> Result<()> {
    let (cfg, oracle) = diamond()?;
    let rd = solve(&cfg, &oracle)?;

    assert_eq!(ids(rd.reaching_in(BlockLocation::at(1, 0))), vec![Pos(101)]);
    assert_eq!(ids(rd.reaching_out(BlockLocation::at(1, 0))), vec![Pos(110)]);
    assert_eq!(ids(rd.reaching_out(BlockLocation::at(2, 0))), vec![Pos(101)]);
    assert_eq!(
        ids(rd.reaching_in(BlockLocation::at(3, 0))),
        vec![Pos(101), Pos(110)]
    );
    Ok(())
}

#[test]
fn test_locations_outside_function_are_empty() -> Result<()> {
    let (cfg, oracle) = diamond()?;
    let rd = solve(&cfg, &oracle)?;

    assert!(rd.reaching_in(BlockLocation::at(9, 0)).is_empty());
    assert!(rd.gen_kill(BlockLocation::at(9, 0)).gens.is_empty());
    Ok(())
}

#[test]
fn test_iteration_budget() -> Result<()> {
    let (cfg, oracle) = diamond()?;
    let result = ReachingDefinitions::solve(
        &cfg,
        Definitions::find(&cfg, &oracle),
        &AnalysisConfig::default().with_max_iterations(1),
    );
    match result {
        Err(Error::FixpointNotReached { function, .. }) => assert_eq!(function, "main.pick"),
        other => panic!("expected FixpointNotReached, got {other:?}"),
    }

    let rd = ReachingDefinitions::solve(
        &cfg,
        Definitions::find(&cfg, &oracle),
        &AnalysisConfig::bounded(),
    )?;
    assert!(rd.iterations() > 0);

    // Lifting the budget again reaches the same fixpoint
    let unbounded = ReachingDefinitions::solve(
        &cfg,
        Definitions::find(&cfg, &oracle),
        &AnalysisConfig::default().with_max_iterations(1).unbounded(),
    )?;
    assert_eq!(unbounded.iterations(), rd.iterations());
    Ok(())
}

#[test]
fn test_batch_matches_single_function() -> Result<()> {
    let (f, f_oracle) = increment()?;
    let (g, _) = diamond()?;

    let mut oracle = f_oracle;
    oracle
        .define(&Ident::new("x", Pos(101)))
        .use_of(Pos(110), Pos(101))
        .use_of(Pos(130), Pos(101));

    let cfgs = vec![
        f,
        ControlFlowGraph::declaration("os.Exit", Signature::new()),
        g,
    ];
    for config in [
        AnalysisConfig::default(),
        AnalysisConfig::sequential(),
        AnalysisConfig::bounded().with_parallel(false),
    ] {
        let results = analyze_functions(&cfgs, &oracle, &config);
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["main.f", "main.pick"]);

        let pick = results[1].result.as_ref().map_err(|e| e.to_string());
        let pick = pick.expect("diamond analysis failed");
        assert_eq!(
            ids(pick.reaching_in(BlockLocation::at(3, 0))),
            vec![Pos(101), Pos(110)]
        );
    }
    Ok(())
}

#[test]
fn test_layouts_from_analyzed_graphs() -> Result<()> {
    let (cfg, _) = diamond()?;
    let layout = ProgramLayout::from_cfgs([&cfg], |_| 0x4000);
    let pick = layout.get("main.pick").expect("layout registered");

    assert_eq!(pick.ipdoms(), &[Some(3), Some(3), Some(3), None]);
    assert_eq!(**pick, StaticFunction::from_cfg(0x4000, &cfg));
    Ok(())
}
