//! Per-call dynamic control-dependence tracking.
//!
//! A [`FuncCall`] lives from function entry to function exit. It observes the sequence of
//! basic blocks the call executes and records, for every block, which branch blocks it was
//! dynamically control dependent on.
//!
//! # Control-Dependence Stack
//!
//! Every executed branch opens a region that lasts until execution reaches the branch's
//! immediate postdominator. Open regions form a stack of contexts. On each block entrance:
//!
//! 1. Contexts whose region ends at the entered block are closed, together with every
//!    context opened inside them.
//! 2. If a context remains open, the entered block depends on that context's branch.
//! 3. If the entered block is itself a branch, any older context of the same branch is
//!    discarded (loop iterations reopen the same region) and a fresh context is pushed.
//!
//! The stack depth after each entrance is remembered per block so that resuming in the
//! middle of a block (after a nested construct returned control to it) restores the
//! block's own regions.

use std::{sync::Arc, time::Instant};

use tracing::trace;

use crate::{
    runtime::layout::{FunctionId, StaticFunction},
    utils::BitSet,
    Error, Result,
};

/// One block entrance event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntrance {
    /// Entered block
    pub block: usize,
    /// Statement index execution resumed at; `0` for a plain entrance
    pub at: usize,
    /// Source position reported by the probe
    pub position: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CdContext {
    branch: usize,
    ipdom: Option<usize>,
}

/// Working state of one function call.
#[derive(Debug, Clone)]
pub struct FuncCall {
    layout: Arc<StaticFunction>,
    cd_stack: Vec<CdContext>,
    dyn_cdp: Vec<BitSet>,
    resume_depth: Vec<Option<usize>>,
    last: Option<BlockEntrance>,
    last_time: Instant,
    position: String,
}

impl FuncCall {
    /// Starts a call and enters the entry block.
    pub fn new(layout: Arc<StaticFunction>, position: impl Into<String>) -> Self {
        let nodes = layout.node_count();
        let position = position.into();
        let mut call = Self {
            cd_stack: Vec::new(),
            dyn_cdp: vec![BitSet::new(nodes); nodes],
            resume_depth: vec![None; nodes],
            last: None,
            last_time: Instant::now(),
            position: position.clone(),
            layout,
        };
        if nodes > 0 {
            call.enter(0, 0, position);
        }
        call
    }

    /// Records a plain entrance of `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockOutOfRange`] if the function has no such block.
    pub fn enter_block(&mut self, block: usize, position: impl Into<String>) -> Result<()> {
        self.check(block)?;
        self.enter(block, 0, position.into());
        Ok(())
    }

    /// Records execution resuming inside `block` at statement `at`.
    ///
    /// Resuming at statement `0` is a plain entrance. Otherwise no dependence is recorded
    /// and the control-dependence stack is restored to the depth it had after the block
    /// was last entered in this call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockOutOfRange`] if the function has no such block.
    pub fn re_enter_block(
        &mut self,
        block: usize,
        at: usize,
        position: impl Into<String>,
    ) -> Result<()> {
        self.check(block)?;
        let position = position.into();
        if at == 0 {
            self.enter(block, 0, position);
            return Ok(());
        }

        match self.resume_depth[block] {
            Some(depth) => self.cd_stack.truncate(depth),
            None => self.close_regions(block),
        }
        trace!(function = self.layout.name(), block, at, depth = self.cd_stack.len(), "resume");
        self.touch(block, at, position);
        Ok(())
    }

    fn enter(&mut self, block: usize, at: usize, position: String) {
        self.close_regions(block);

        if let Some(top) = self.cd_stack.last() {
            self.dyn_cdp[block].insert(top.branch);
        }

        if self.layout.is_branch(block) {
            if let Some(stale) = self.cd_stack.iter().position(|c| c.branch == block) {
                self.cd_stack.truncate(stale);
            }
            self.cd_stack.push(CdContext {
                branch: block,
                ipdom: self.layout.ipdom(block),
            });
        }

        self.resume_depth[block] = Some(self.cd_stack.len());
        trace!(
            function = self.layout.name(),
            block,
            depth = self.cd_stack.len(),
            "enter"
        );
        self.touch(block, at, position);
    }

    /// Closes every region ending at `block` and the regions nested inside them.
    fn close_regions(&mut self, block: usize) {
        if let Some(end) = self
            .cd_stack
            .iter()
            .position(|c| c.ipdom == Some(block))
        {
            self.cd_stack.truncate(end);
        }
    }

    fn touch(&mut self, block: usize, at: usize, position: String) {
        self.last = Some(BlockEntrance {
            block,
            at,
            position,
        });
        self.last_time = Instant::now();
    }

    fn check(&self, block: usize) -> Result<()> {
        let count = self.layout.node_count();
        if block >= count {
            return Err(Error::BlockOutOfRange {
                function: self.layout.name().to_string(),
                block,
                count,
            });
        }
        Ok(())
    }

    /// Returns the identity of the called function.
    #[must_use]
    pub fn id(&self) -> &FunctionId {
        self.layout.id()
    }

    /// Returns the static layout shared by all calls of the function.
    #[must_use]
    pub fn layout(&self) -> &Arc<StaticFunction> {
        &self.layout
    }

    /// Returns the observed control-dependence predecessors of every block.
    #[must_use]
    pub fn dyn_cdp(&self) -> &[BitSet] {
        &self.dyn_cdp
    }

    /// Returns the number of open control-dependence regions.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.cd_stack.len()
    }

    /// Returns the most recent block entrance.
    #[must_use]
    pub fn last(&self) -> Option<&BlockEntrance> {
        self.last.as_ref()
    }

    /// Returns when the most recent block entrance happened.
    #[must_use]
    pub fn last_time(&self) -> Instant {
        self.last_time
    }

    /// Returns the call-site position reported on entry.
    #[must_use]
    pub fn position(&self) -> &str {
        &self.position
    }
}
