//! Language-neutral statement model.
//!
//! The analyses never look inside expressions. All they need from a statement is:
//!
//! - which identifier occurrences it contains, in source order ([`Statement::idents`]), and
//! - whether it is one of the two constructs that redefine an existing variable: an
//!   assignment (including short variable declarations) or an increment/decrement, and
//!   which of its targets are plain identifiers ([`StmtKind`]).
//!
//! Front ends lower their AST into this shape when building a
//! [`ControlFlowGraph`](crate::analysis::ControlFlowGraph).

use std::fmt;

/// A source position, unique within a program. Identifies both definition sites and
/// individual identifier occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos(pub u32);

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// One identifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    /// The identifier as written
    pub name: String,
    /// Position of this occurrence
    pub pos: Pos,
}

impl Ident {
    /// Creates an identifier occurrence.
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.pos)
    }
}

/// The left-hand side of an assignment or the operand of an increment/decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A plain identifier; the only kind of target that redefines a variable.
    Ident(Ident),
    /// An index, field, dereference or blank target. Ignored by the analyses.
    Other,
}

impl Target {
    /// Returns the identifier if this is an identifier target.
    #[must_use]
    pub fn ident(&self) -> Option<&Ident> {
        match self {
            Target::Ident(ident) => Some(ident),
            Target::Other => None,
        }
    }
}

/// What a statement does, as far as redefinitions are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    /// `a, b = ...`, `a := ...`, `a += ...`
    Assign(Vec<Target>),
    /// `a++` / `a--`
    IncDec(Target),
    /// Anything else: expressions, returns, branches, declarations without assignment.
    Other,
}

/// A statement inside a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// The redefinition-relevant shape of the statement
    pub kind: StmtKind,
    /// Every identifier occurrence in the statement, targets included, in source order
    pub idents: Vec<Ident>,
}

impl Statement {
    /// Creates a statement from its kind and identifier occurrences.
    #[must_use]
    pub fn new(kind: StmtKind, idents: Vec<Ident>) -> Self {
        Self { kind, idents }
    }

    /// Creates an assignment whose targets are all identifiers. `operands` are the
    /// identifiers read on the right-hand side.
    #[must_use]
    pub fn assign(targets: Vec<Ident>, operands: Vec<Ident>) -> Self {
        let mut idents = targets.clone();
        idents.extend(operands);
        Self {
            kind: StmtKind::Assign(targets.into_iter().map(Target::Ident).collect()),
            idents,
        }
    }

    /// Creates an increment or decrement of `target`.
    #[must_use]
    pub fn inc_dec(target: Ident) -> Self {
        Self {
            kind: StmtKind::IncDec(Target::Ident(target.clone())),
            idents: vec![target],
        }
    }

    /// Creates a statement that redefines nothing but mentions `idents`.
    #[must_use]
    pub fn other(idents: Vec<Ident>) -> Self {
        Self {
            kind: StmtKind::Other,
            idents,
        }
    }

    /// Returns the identifier targets that this statement redefines.
    pub fn redefined(&self) -> impl Iterator<Item = &Ident> + '_ {
        let targets: &[Target] = match &self.kind {
            StmtKind::Assign(targets) => targets,
            StmtKind::IncDec(target) => std::slice::from_ref(target),
            StmtKind::Other => &[],
        };
        targets.iter().filter_map(Target::ident)
    }
}

/// Receiver, parameters and named results of a function. These are bound at the
/// synthetic entry location before the first block executes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    /// Method receiver, if any
    pub receiver: Vec<Ident>,
    /// Named parameters
    pub params: Vec<Ident>,
    /// Named results
    pub results: Vec<Ident>,
}

impl Signature {
    /// Creates an empty signature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the receiver.
    #[must_use]
    pub fn with_receiver(mut self, receiver: Ident) -> Self {
        self.receiver = vec![receiver];
        self
    }

    /// Sets the named parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<Ident>) -> Self {
        self.params = params;
        self
    }

    /// Sets the named results.
    #[must_use]
    pub fn with_results(mut self, results: Vec<Ident>) -> Self {
        self.results = results;
        self
    }

    /// Iterates receiver, parameters and results in binding order.
    pub fn bindings(&self) -> impl Iterator<Item = &Ident> + '_ {
        self.receiver
            .iter()
            .chain(&self.params)
            .chain(&self.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redefined_targets() {
        let x = Ident::new("x", Pos(1));
        let stmt = Statement::new(
            StmtKind::Assign(vec![Target::Ident(x.clone()), Target::Other]),
            vec![x.clone(), Ident::new("y", Pos(5))],
        );
        assert_eq!(stmt.redefined().collect::<Vec<_>>(), vec![&x]);

        let inc = Statement::inc_dec(Ident::new("i", Pos(9)));
        assert_eq!(inc.redefined().map(|i| i.pos).collect::<Vec<_>>(), vec![Pos(9)]);

        let other = Statement::other(vec![x]);
        assert_eq!(other.redefined().count(), 0);
    }

    #[test]
    fn test_signature_binding_order() {
        let sig = Signature::new()
            .with_receiver(Ident::new("r", Pos(1)))
            .with_params(vec![Ident::new("a", Pos(2))])
            .with_results(vec![Ident::new("err", Pos(3))]);
        let names: Vec<_> = sig.bindings().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["r", "a", "err"]);
    }
}
