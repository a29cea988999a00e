//! Definition sites and identifier references of a single function.
//!
//! [`Definitions::find`] scans a [`ControlFlowGraph`] once and builds two tables:
//!
//! - **Objects**: one per definition site (a declared variable, parameter, receiver or
//!   named result), keyed by the position of its declaration.
//! - **References**: one per identifier occurrence that resolves to a declaration, keyed
//!   by the position of the occurrence. Each reference also receives a dense index that
//!   the reaching-definitions lattice uses as its bit position.
//!
//! Every object tracks the set of references that (re)define it, its `redefs`. The set
//! always contains the reference that introduced the object, and is extended by every
//! assignment or increment/decrement whose target is a plain identifier bound to it.
//!
//! Name resolution is delegated to a [`SymbolOracle`]. Front ends implement it on top of
//! their own type checker; [`ResolutionTable`] is a ready-made map-backed implementation.
//!
//! # Basic Usage
//!
//! ```rust
//! use faultline::analysis::{
//!     BasicBlock, ControlFlowGraph, Definitions, Ident, Pos, ResolutionTable, Signature,
//!     Statement,
//! };
//!
//! // x := 1; x = 2
//! let cfg = ControlFlowGraph::new(
//!     "main.f",
//!     Signature::new(),
//!     vec![BasicBlock::new(
//!         vec![
//!             Statement::assign(vec![Ident::new("x", Pos(1))], vec![]),
//!             Statement::assign(vec![Ident::new("x", Pos(8))], vec![]),
//!         ],
//!         vec![],
//!         vec![],
//!     )],
//! )?;
//!
//! let mut oracle = ResolutionTable::new();
//! oracle.define(&Ident::new("x", Pos(1))).use_of(Pos(8), Pos(1));
//!
//! let defs = Definitions::find(&cfg, &oracle);
//! let x = defs.object(Pos(1)).unwrap();
//! assert_eq!(x.redefs.iter().copied().collect::<Vec<_>>(), vec![Pos(1), Pos(8)]);
//! # Ok::<(), faultline::Error>(())
//! ```

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::analysis::{
    cfg::{BlockLocation, ControlFlowGraph},
    stmt::{Ident, Pos},
};

/// A resolved program symbol: the name it was declared with and where.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    /// Declared name
    pub name: String,
    /// Position of the declaration
    pub decl: Pos,
}

impl Symbol {
    /// Creates a symbol.
    pub fn new(name: impl Into<String>, decl: Pos) -> Self {
        Self {
            name: name.into(),
            decl,
        }
    }
}

/// What an identifier occurrence resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The occurrence declares a new symbol
    Definition(Symbol),
    /// The occurrence refers to a symbol declared elsewhere (possibly outside the function)
    Use(Symbol),
    /// Blank identifiers, package names, labels and anything else without a variable
    Unresolved,
}

/// Source of def/use facts for identifier occurrences.
///
/// Implementations must be deterministic: resolving the same occurrence twice yields
/// the same answer.
pub trait SymbolOracle {
    /// Resolves one identifier occurrence.
    fn resolve(&self, ident: &Ident) -> Resolution;
}

#[derive(Debug, Clone, Copy)]
enum Occurrence {
    Def,
    Use(Pos),
}

/// A [`SymbolOracle`] backed by explicit position tables.
///
/// Definitions are registered with [`define`](Self::define) and uses with
/// [`use_of`](Self::use_of). A use whose declaration was never registered resolves to a
/// symbol that is not local to any analyzed function, which is how globals and
/// captured variables appear to the registry.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTable {
    /// Declared symbols keyed by declaration position
    symbols: HashMap<Pos, Symbol>,
    /// Occurrence kind keyed by occurrence position
    occurrences: HashMap<Pos, Occurrence>,
}

impl ResolutionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `ident` as the declaration of a new symbol.
    pub fn define(&mut self, ident: &Ident) -> &mut Self {
        self.symbols
            .insert(ident.pos, Symbol::new(ident.name.clone(), ident.pos));
        self.occurrences.insert(ident.pos, Occurrence::Def);
        self
    }

    /// Registers the occurrence at `at` as a use of the symbol declared at `decl`.
    pub fn use_of(&mut self, at: Pos, decl: Pos) -> &mut Self {
        self.occurrences.insert(at, Occurrence::Use(decl));
        self
    }

    /// Returns the number of registered occurrences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

impl SymbolOracle for ResolutionTable {
    fn resolve(&self, ident: &Ident) -> Resolution {
        match self.occurrences.get(&ident.pos) {
            Some(Occurrence::Def) => match self.symbols.get(&ident.pos) {
                Some(symbol) => Resolution::Definition(symbol.clone()),
                None => Resolution::Unresolved,
            },
            Some(Occurrence::Use(decl)) => Resolution::Use(
                self.symbols
                    .get(decl)
                    .cloned()
                    .unwrap_or_else(|| Symbol::new(ident.name.clone(), *decl)),
            ),
            None => Resolution::Unresolved,
        }
    }
}

/// A definition site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Position of the declaration; identifies the object
    pub id: Pos,
    /// The declaring identifier occurrence
    pub ident: Ident,
    /// The resolved symbol
    pub symbol: Symbol,
    /// Where the object is introduced; [`BlockLocation::Entry`] for signature bindings
    pub location: BlockLocation,
    /// Ids of every reference that (re)defines this object, its own introduction included
    pub redefs: BTreeSet<Pos>,
}

/// One identifier occurrence bound to a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Position of the occurrence; identifies the reference
    pub id: Pos,
    /// Dense per-function index, the bit position in reaching sets
    pub index: usize,
    /// The identifier occurrence
    pub ident: Ident,
    /// Declaration position of the referenced symbol
    pub oid: Pos,
    /// Id of the referenced object, `None` if the symbol is not declared in this function
    pub object: Option<Pos>,
}

/// Object and reference tables of one function.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    objects: Vec<Object>,
    object_ids: HashMap<Pos, usize>,
    references: Vec<Reference>,
    reference_ids: HashMap<Pos, usize>,
}

impl Definitions {
    /// Builds the object and reference tables of `cfg`.
    ///
    /// Signature bindings are registered first, at the entry location. Then every
    /// identifier occurrence of every statement is resolved through `oracle`. Finally
    /// assignment and increment/decrement targets are recorded as redefinitions of the
    /// objects they are bound to. Occurrences the oracle cannot resolve are skipped.
    pub fn find<O: SymbolOracle + ?Sized>(cfg: &ControlFlowGraph, oracle: &O) -> Self {
        let mut defs = Self::default();

        for ident in cfg.signature().bindings() {
            defs.record(cfg.name(), BlockLocation::Entry, ident, oracle);
        }

        for (block_id, block) in cfg.blocks().iter().enumerate() {
            for (stmt_id, stmt) in block.stmts.iter().enumerate() {
                for ident in &stmt.idents {
                    defs.record(cfg.name(), BlockLocation::at(block_id, stmt_id), ident, oracle);
                }
            }
        }

        // Objects are all known now; bind references to the local ones
        for reference in &mut defs.references {
            if defs.object_ids.contains_key(&reference.oid) {
                reference.object = Some(reference.oid);
            }
        }

        for block in cfg.blocks() {
            for stmt in &block.stmts {
                for target in stmt.redefined() {
                    defs.add_redefinition(target, oracle);
                }
            }
        }

        trace!(
            function = cfg.name(),
            objects = defs.objects.len(),
            references = defs.references.len(),
            "definitions collected"
        );
        defs
    }

    fn record<O: SymbolOracle + ?Sized>(
        &mut self,
        function: &str,
        location: BlockLocation,
        ident: &Ident,
        oracle: &O,
    ) {
        match oracle.resolve(ident) {
            Resolution::Definition(symbol) => {
                trace!(function, %ident, decl = %symbol.decl, %location, "def");
                self.declare(location, ident, symbol);
            }
            Resolution::Use(symbol) => {
                trace!(function, %ident, decl = %symbol.decl, %location, "use");
                self.insert_reference(ident, symbol.decl);
            }
            Resolution::Unresolved => {}
        }
    }

    fn declare(&mut self, location: BlockLocation, ident: &Ident, symbol: Symbol) {
        let id = symbol.decl;
        self.insert_reference(ident, id);
        if let Some(&slot) = self.object_ids.get(&id) {
            self.objects[slot].redefs.insert(ident.pos);
            return;
        }
        self.object_ids.insert(id, self.objects.len());
        self.objects.push(Object {
            id,
            ident: ident.clone(),
            symbol,
            location,
            redefs: BTreeSet::from([ident.pos]),
        });
    }

    fn insert_reference(&mut self, ident: &Ident, oid: Pos) -> usize {
        if let Some(&index) = self.reference_ids.get(&ident.pos) {
            return index;
        }
        let index = self.references.len();
        self.reference_ids.insert(ident.pos, index);
        self.references.push(Reference {
            id: ident.pos,
            index,
            ident: ident.clone(),
            oid,
            object: self.object_ids.contains_key(&oid).then_some(oid),
        });
        index
    }

    fn add_redefinition<O: SymbolOracle + ?Sized>(&mut self, target: &Ident, oracle: &O) {
        let index = match self.reference_ids.get(&target.pos) {
            Some(&index) => index,
            None => {
                // Target was not visited as an occurrence of its statement
                let oid = match oracle.resolve(target) {
                    Resolution::Definition(symbol) | Resolution::Use(symbol) => symbol.decl,
                    Resolution::Unresolved => return,
                };
                self.insert_reference(target, oid)
            }
        };
        let reference = &self.references[index];
        if let Some(slot) = reference.object.and_then(|oid| self.object_ids.get(&oid)) {
            self.objects[*slot].redefs.insert(reference.id);
        }
    }

    /// Returns all objects in discovery order.
    #[must_use]
    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    /// Returns all references, ordered by their dense index.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Looks up an object by its declaration position.
    #[must_use]
    pub fn object(&self, id: Pos) -> Option<&Object> {
        self.object_ids.get(&id).map(|&slot| &self.objects[slot])
    }

    /// Looks up a reference by its occurrence position.
    #[must_use]
    pub fn reference(&self, id: Pos) -> Option<&Reference> {
        self.reference_ids
            .get(&id)
            .map(|&index| &self.references[index])
    }

    /// Looks up a reference by its dense index.
    #[must_use]
    pub fn reference_by_index(&self, index: usize) -> Option<&Reference> {
        self.references.get(index)
    }

    /// Returns the object a reference is bound to, if it is local.
    #[must_use]
    pub fn object_of(&self, reference: &Reference) -> Option<&Object> {
        reference.object.and_then(|id| self.object(id))
    }

    /// Number of references, the width of the reaching-definitions lattice.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }
}
