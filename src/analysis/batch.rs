//! Whole-program driver: reaching definitions for many functions at once.
//!
//! Functions are independent, so the driver fans them out over the rayon thread pool
//! when [`AnalysisConfig::parallel`] is set. Results come back in input order. A failure
//! in one function never affects the others.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    analysis::{
        cfg::ControlFlowGraph,
        config::AnalysisConfig,
        dataflow::ReachingDefinitions,
        defuse::{Definitions, SymbolOracle},
    },
    Result,
};

/// Outcome of analyzing one function.
#[derive(Debug)]
pub struct FunctionAnalysis {
    /// Name of the analyzed function
    pub name: String,
    /// The solved analysis, or the reason it was aborted
    pub result: Result<ReachingDefinitions>,
}

/// Runs the def/use registry and reaching definitions for every function with a body.
///
/// Declarations without blocks are skipped and produce no entry.
///
/// # Example
///
/// ```rust
/// use faultline::analysis::{
///     analyze_functions, AnalysisConfig, BasicBlock, ControlFlowGraph, ResolutionTable,
///     Signature,
/// };
///
/// let cfgs = vec![
///     ControlFlowGraph::declaration("runtime.nanotime", Signature::new()),
///     ControlFlowGraph::new(
///         "main.main",
///         Signature::new(),
///         vec![BasicBlock::new(vec![], vec![], vec![])],
///     )?,
/// ];
/// let results = analyze_functions(&cfgs, &ResolutionTable::new(), &AnalysisConfig::default());
/// assert_eq!(results.len(), 1);
/// assert_eq!(results[0].name, "main.main");
/// # Ok::<(), faultline::Error>(())
/// ```
pub fn analyze_functions<O>(
    cfgs: &[ControlFlowGraph],
    oracle: &O,
    config: &AnalysisConfig,
) -> Vec<FunctionAnalysis>
where
    O: SymbolOracle + Sync + ?Sized,
{
    let bodies: Vec<&ControlFlowGraph> = cfgs.iter().filter(|cfg| !cfg.is_declaration()).collect();
    debug!(
        functions = bodies.len(),
        skipped = cfgs.len() - bodies.len(),
        parallel = config.parallel,
        "analyzing functions"
    );

    let analyze = |cfg: &&ControlFlowGraph| {
        let cfg: &ControlFlowGraph = cfg;
        let defs = Definitions::find(cfg, oracle);
        let result = ReachingDefinitions::solve(cfg, defs, config);
        if let Err(error) = &result {
            warn!(function = cfg.name(), %error, "analysis aborted");
        }
        FunctionAnalysis {
            name: cfg.name().to_string(),
            result,
        }
    };

    if config.parallel {
        bodies.par_iter().map(analyze).collect()
    } else {
        bodies.iter().map(analyze).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            cfg::{BasicBlock, BlockLocation},
            defuse::ResolutionTable,
            stmt::{Ident, Pos, Signature, Statement},
        },
        Error,
    };

    fn function(name: &str, base: u32) -> ControlFlowGraph {
        ControlFlowGraph::new(
            name,
            Signature::new().with_params(vec![Ident::new("p", Pos(base))]),
            vec![BasicBlock::new(
                vec![Statement::assign(
                    vec![Ident::new("q", Pos(base + 1))],
                    vec![Ident::new("p", Pos(base + 2))],
                )],
                vec![],
                vec![],
            )],
        )
        .unwrap()
    }

    fn oracle_for(bases: &[u32]) -> ResolutionTable {
        let mut oracle = ResolutionTable::new();
        for &base in bases {
            oracle
                .define(&Ident::new("p", Pos(base)))
                .define(&Ident::new("q", Pos(base + 1)))
                .use_of(Pos(base + 2), Pos(base));
        }
        oracle
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let cfgs: Vec<_> = (0..16).map(|i| function(&format!("f{i}"), i * 10)).collect();
        let oracle = oracle_for(&(0..16).map(|i| i * 10).collect::<Vec<_>>());

        let parallel = analyze_functions(&cfgs, &oracle, &AnalysisConfig::default());
        let sequential = analyze_functions(&cfgs, &oracle, &AnalysisConfig::sequential());

        assert_eq!(parallel.len(), 16);
        for (p, s) in parallel.iter().zip(&sequential) {
            assert_eq!(p.name, s.name);
            let p = p.result.as_ref().unwrap();
            let s = s.result.as_ref().unwrap();
            let loc = BlockLocation::at(0, 0);
            assert_eq!(p.reaching_out(loc), s.reaching_out(loc));
            assert_eq!(p.reaching_out(loc).len(), 2);
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let cfgs = vec![
            function("small", 0),
            ControlFlowGraph::new(
                "large",
                Signature::new(),
                (0..40)
                    .map(|i| {
                        let prev = if i == 0 { vec![] } else { vec![i - 1] };
                        let next = if i == 39 { vec![] } else { vec![i + 1] };
                        BasicBlock::new(vec![], prev, next)
                    })
                    .collect(),
            )
            .unwrap(),
        ];
        let config = AnalysisConfig::sequential().with_max_iterations(10);
        let results = analyze_functions(&cfgs, &oracle_for(&[0]), &config);

        assert!(results[0].result.is_ok());
        assert!(matches!(
            results[1].result,
            Err(Error::FixpointNotReached { .. })
        ));
    }
}
