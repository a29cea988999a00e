//! The runtime recording API called by instrumentation probes.
//!
//! Probes inserted into the target program report four kinds of events:
//!
//! - [`enter_function`](Recorder::enter_function) at the top of every function body
//! - [`exit_function`](Recorder::exit_function) when the function returns
//! - [`enter_block`](Recorder::enter_block) at the top of every basic block but the first
//! - [`re_enter_block`](Recorder::re_enter_block) where execution resumes inside a block
//!   after a nested construct
//!
//! Plus a final [`shutdown`](Recorder::shutdown) when the program terminates, possibly
//! while calls are still in flight.
//!
//! # Execution Contexts
//!
//! Every event carries a [`ContextId`] naming the thread of execution it happened on. Each
//! context owns its own stack of calls; only folding a finished call into the
//! [`FunctionStore`] touches shared state.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use faultline::runtime::{
//!     ContextId, FunctionId, FunctionStore, ProgramLayout, Recorder, RecorderConfig,
//!     StaticFunction,
//! };
//!
//! let mut layout = ProgramLayout::new();
//! layout.insert(StaticFunction::from_successors(
//!     FunctionId::new("main.abs", 0x1000),
//!     vec![vec![1, 2], vec![2], vec![]],
//! )?);
//!
//! let recorder = Recorder::new(layout, Arc::new(FunctionStore::new()), RecorderConfig::default());
//! let ctx = ContextId(1);
//! recorder.enter_function(ctx, "main.abs", "abs.go:3")?;
//! recorder.enter_block(ctx, 1, "abs.go:4")?;
//! recorder.enter_block(ctx, 2, "abs.go:6")?;
//! recorder.exit_function(ctx, "main.abs")?;
//!
//! let profile = recorder.shutdown()?;
//! assert_eq!(profile.get("main.abs").unwrap().dyn_cdp, vec![vec![], vec![0], vec![]]);
//! # Ok::<(), faultline::Error>(())
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::{debug, trace, warn};

use crate::{
    runtime::{
        call::FuncCall,
        config::{RecorderConfig, UnknownFunctionBehavior},
        layout::ProgramLayout,
        profile::Profile,
        store::FunctionStore,
    },
    Error, Result,
};

/// Identifies one thread of execution in the target program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// A call on a context stack.
#[derive(Debug)]
enum Frame {
    Tracked(FuncCall),
    /// A function without a layout, kept for exit matching
    Untracked(String),
}

impl Frame {
    fn name(&self) -> &str {
        match self {
            Frame::Tracked(call) => call.layout().name(),
            Frame::Untracked(name) => name,
        }
    }
}

/// Receives probe events and maintains per-context call stacks.
///
/// # Thread Safety
///
/// `Recorder` is [`Send`] and [`Sync`]. Context stacks live in a [`DashMap`]; events of
/// one context must be delivered in program order, events of different contexts may
/// arrive concurrently.
pub struct Recorder {
    layout: ProgramLayout,
    store: Arc<FunctionStore>,
    config: RecorderConfig,
    contexts: DashMap<ContextId, Vec<Frame>>,
    closed: AtomicBool,
}

impl Recorder {
    /// Creates a recorder folding finished calls into `store`.
    #[must_use]
    pub fn new(layout: ProgramLayout, store: Arc<FunctionStore>, config: RecorderConfig) -> Self {
        Self {
            layout,
            store,
            config,
            contexts: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Starts a call of `name` on `ctx`. The entry block is entered implicitly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`] after [`shutdown`](Self::shutdown), and
    /// [`Error::UnknownFunction`] for functions without a layout when configured to fail.
    pub fn enter_function(&self, ctx: ContextId, name: &str, position: &str) -> Result<()> {
        self.ensure_open()?;
        let frame = match self.layout.get(name) {
            Some(layout) => Frame::Tracked(FuncCall::new(Arc::clone(layout), position)),
            None => match self.config.unknown_function {
                UnknownFunctionBehavior::Ignore => {
                    debug!(%ctx, function = name, "no layout, call not recorded");
                    Frame::Untracked(name.to_string())
                }
                UnknownFunctionBehavior::Fail => {
                    return Err(Error::UnknownFunction(name.to_string()));
                }
            },
        };

        // Rechecked under the shard lock shutdown drains
        match self.contexts.entry(ctx) {
            Entry::Occupied(mut entry) => {
                self.ensure_open()?;
                entry.get_mut().push(frame);
            }
            Entry::Vacant(entry) => {
                self.ensure_open()?;
                entry.insert(vec![frame]);
            }
        }
        trace!(%ctx, function = name, position, "enter function");
        Ok(())
    }

    /// Finishes the active call on `ctx` and folds it into the store.
    ///
    /// The fold completes before the context is released, so a concurrent
    /// [`shutdown`](Self::shutdown) either sees the call in the store or flushes it itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`] after [`shutdown`](Self::shutdown),
    /// [`Error::NoActiveCall`] if `ctx` has no call in progress,
    /// [`Error::UnbalancedExit`] if the active call is not `name`, and the fold errors of
    /// [`FunctionStore::fold`]. All but the first are fatal.
    pub fn exit_function(&self, ctx: ContextId, name: &str) -> Result<()> {
        let mut entry = match self.contexts.entry(ctx) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(_) => {
                self.ensure_open()?;
                return Err(Error::NoActiveCall(ctx.0));
            }
        };
        self.ensure_open()?;

        let stack = entry.get_mut();
        let top = stack.last().ok_or(Error::NoActiveCall(ctx.0))?;
        if top.name() != name {
            return Err(Error::UnbalancedExit {
                expected: top.name().to_string(),
                found: name.to_string(),
            });
        }
        let frame = stack.pop();

        trace!(%ctx, function = name, "exit function");
        let folded = match frame {
            Some(Frame::Tracked(call)) => self.store.fold(&call),
            Some(Frame::Untracked(_)) | None => Ok(()),
        };
        if entry.get().is_empty() {
            entry.remove();
        }
        folded
    }

    /// Records an entrance of `block` in the active call on `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`] after [`shutdown`](Self::shutdown),
    /// [`Error::NoActiveCall`] if `ctx` has no call in progress and
    /// [`Error::BlockOutOfRange`] if the active function has no such block.
    pub fn enter_block(&self, ctx: ContextId, block: usize, position: &str) -> Result<()> {
        self.with_active(ctx, |call| call.enter_block(block, position))
    }

    /// Records execution resuming at statement `at` of `block` in the active call on `ctx`.
    ///
    /// # Errors
    ///
    /// Same as [`enter_block`](Self::enter_block).
    pub fn re_enter_block(
        &self,
        ctx: ContextId,
        block: usize,
        at: usize,
        position: &str,
    ) -> Result<()> {
        self.with_active(ctx, |call| call.re_enter_block(block, at, position))
    }

    fn with_active(
        &self,
        ctx: ContextId,
        event: impl FnOnce(&mut FuncCall) -> Result<()>,
    ) -> Result<()> {
        let Some(mut stack) = self.contexts.get_mut(&ctx) else {
            self.ensure_open()?;
            return Err(Error::NoActiveCall(ctx.0));
        };
        self.ensure_open()?;
        match stack.last_mut() {
            Some(Frame::Tracked(call)) => event(call),
            Some(Frame::Untracked(_)) => Ok(()),
            None => Err(Error::NoActiveCall(ctx.0)),
        }
    }

    /// Finalizes every in-flight call of every context and returns the profile.
    ///
    /// Calls are folded innermost first. Events racing with shutdown either complete
    /// before the profile is exported or fail with [`Error::ShutDown`]; none is lost and
    /// none is counted twice. The recorder rejects all events afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`] if called twice, and the fold errors of
    /// [`FunctionStore::fold`]. Folding continues past a failed call; the first error is
    /// returned.
    pub fn shutdown(&self) -> Result<Profile> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::ShutDown);
        }

        // Visiting every shard waits out events that passed the open check
        let contexts: Vec<ContextId> = self.contexts.iter().map(|entry| *entry.key()).collect();
        let mut flushed = 0usize;
        let mut first_error = None;
        for ctx in contexts {
            let Some((_, mut stack)) = self.contexts.remove(&ctx) else {
                continue;
            };
            while let Some(frame) = stack.pop() {
                if let Frame::Tracked(call) = frame {
                    flushed += 1;
                    trace!(
                        %ctx,
                        function = call.layout().name(),
                        idle_us = call.last_time().elapsed().as_micros() as u64,
                        "flush in-flight call"
                    );
                    if let Err(error) = self.store.fold(&call) {
                        warn!(%ctx, function = call.layout().name(), %error, "flush failed");
                        first_error.get_or_insert(error);
                    }
                }
            }
        }

        debug!(flushed, functions = self.store.len(), "recorder shut down");
        match first_error {
            Some(error) => Err(error),
            None => Ok(self.store.export()),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ShutDown);
        }
        Ok(())
    }

    /// Returns the number of calls in progress on `ctx`.
    #[must_use]
    pub fn active_calls(&self, ctx: ContextId) -> usize {
        self.contexts.get(&ctx).map_or(0, |stack| stack.len())
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the store finished calls are folded into.
    #[must_use]
    pub fn store(&self) -> &Arc<FunctionStore> {
        &self.store
    }

    /// Returns the static layouts.
    #[must_use]
    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }
}
