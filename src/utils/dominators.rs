//! Dominator and postdominator computation over adjacency-list graphs.
//!
//! A node `d` **dominates** `n` if every path from the root to `n` passes through `d`.
//! Postdominance is dominance on the reversed graph rooted at the exit: `p` postdominates
//! `n` if every path from `n` to an exit passes through `p`. The immediate postdominator
//! of a branch node is where its two arms rejoin, which is exactly where the dynamic
//! control-dependence region opened by the branch ends.
//!
//! # Algorithm
//!
//! This module uses the iterative algorithm of Cooper, Harvey and Kennedy ("A Simple,
//! Fast Dominance Algorithm"): nodes are processed in reverse postorder and each node's
//! immediate dominator is the intersection, in the dominator tree built so far, of its
//! processed predecessors. It converges in a handful of passes on reducible graphs.
//!
//! Graphs with several exits are handled by a virtual exit node that every exit block
//! flows into; a node whose immediate postdominator is that virtual node reports `None`.

/// Result of a dominator computation.
///
/// Nodes unreachable from the root have no immediate dominator and are dominated by
/// nothing but themselves.
///
/// # Examples
///
/// ```rust
/// use faultline::utils::compute_dominators;
///
/// // Diamond: 0 -> {1, 2} -> 3
/// let succs = vec![vec![1, 2], vec![3], vec![3], vec![]];
/// let tree = compute_dominators(&succs, 0);
///
/// assert_eq!(tree.immediate_dominator(3), Some(0));
/// assert!(tree.dominates(0, 3));
/// assert!(!tree.dominates(1, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominatorTree {
    /// The root of the tree
    root: usize,
    /// Immediate dominator for each node; the root maps to itself, unreachable nodes to `None`
    idom: Vec<Option<usize>>,
}

impl DominatorTree {
    /// Returns the root node of the tree.
    #[must_use]
    pub fn root(&self) -> usize {
        self.root
    }

    /// Returns the number of nodes covered by the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }

    /// Returns the immediate dominator of `node`, or `None` for the root and for nodes
    /// unreachable from the root.
    #[must_use]
    pub fn immediate_dominator(&self, node: usize) -> Option<usize> {
        if node == self.root {
            return None;
        }
        self.idom.get(node).copied().flatten()
    }

    /// Returns `true` if `node` is reachable from the root.
    #[must_use]
    pub fn is_reachable(&self, node: usize) -> bool {
        self.idom.get(node).is_some_and(Option::is_some)
    }

    /// Checks if node `a` dominates node `b`. Every node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: usize, b: usize) -> bool {
        if a == b {
            return true;
        }
        let mut current = b;
        while let Some(idom) = self.immediate_dominator(current) {
            if idom == a {
                return true;
            }
            current = idom;
        }
        false
    }
}

/// Computes the dominator tree of the graph given by `successors`, rooted at `root`.
///
/// `successors[n]` lists the successors of node `n`. Edges to nodes outside the graph are
/// ignored.
#[must_use]
pub fn compute_dominators(successors: &[Vec<usize>], root: usize) -> DominatorTree {
    let n = successors.len();
    if root >= n {
        return DominatorTree {
            root,
            idom: vec![None; n],
        };
    }

    let mut predecessors = vec![Vec::new(); n];
    for (node, succs) in successors.iter().enumerate() {
        for &succ in succs.iter().filter(|&&s| s < n) {
            predecessors[succ].push(node);
        }
    }

    let postorder = postorder(successors, root);
    let mut po_number = vec![usize::MAX; n];
    for (number, &node) in postorder.iter().enumerate() {
        po_number[node] = number;
    }

    let mut idom: Vec<Option<usize>> = vec![None; n];
    idom[root] = Some(root);

    let mut changed = true;
    while changed {
        changed = false;
        for &node in postorder.iter().rev() {
            if node == root {
                continue;
            }
            let mut new_idom: Option<usize> = None;
            for &pred in &predecessors[node] {
                if idom[pred].is_none() {
                    continue;
                }
                new_idom = Some(match new_idom {
                    None => pred,
                    Some(current) => intersect(&idom, &po_number, pred, current),
                });
            }
            if new_idom.is_some() && idom[node] != new_idom {
                idom[node] = new_idom;
                changed = true;
            }
        }
    }

    DominatorTree { root, idom }
}

/// Computes immediate postdominators for the graph given by `successors`.
///
/// Every node without successors is treated as an exit. The result has one entry per
/// node: `Some(p)` for a real immediate postdominator, `None` when the node is only
/// postdominated by the virtual exit or cannot reach any exit.
///
/// # Examples
///
/// ```rust
/// use faultline::utils::compute_postdominators;
///
/// // 0 branches to 1 and 2, both rejoin at 3
/// let succs = vec![vec![1, 2], vec![3], vec![3], vec![]];
/// assert_eq!(compute_postdominators(&succs), vec![Some(3), Some(3), Some(3), None]);
/// ```
#[must_use]
pub fn compute_postdominators(successors: &[Vec<usize>]) -> Vec<Option<usize>> {
    let n = successors.len();
    let exit = n;

    // Reversed graph plus a virtual exit that flows into every real exit.
    let mut reversed = vec![Vec::new(); n + 1];
    for (node, succs) in successors.iter().enumerate() {
        let succs: Vec<usize> = succs.iter().copied().filter(|&s| s < n).collect();
        if succs.is_empty() {
            reversed[exit].push(node);
        }
        for succ in succs {
            reversed[succ].push(node);
        }
    }

    let tree = compute_dominators(&reversed, exit);
    (0..n)
        .map(|node| tree.immediate_dominator(node).filter(|&p| p != exit))
        .collect()
}

/// Walks both fingers up the partial tree until they meet.
fn intersect(idom: &[Option<usize>], po_number: &[usize], a: usize, b: usize) -> usize {
    let mut f1 = a;
    let mut f2 = b;
    while f1 != f2 {
        while po_number[f1] < po_number[f2] {
            f1 = idom[f1].unwrap_or(f1);
        }
        while po_number[f2] < po_number[f1] {
            f2 = idom[f2].unwrap_or(f2);
        }
    }
    f1
}

/// Iterative depth-first postorder from `root`.
fn postorder(successors: &[Vec<usize>], root: usize) -> Vec<usize> {
    let n = successors.len();
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut stack = vec![(root, 0usize)];
    visited[root] = true;

    while let Some(frame) = stack.last_mut() {
        let (node, next) = *frame;
        if let Some(&succ) = successors[node].get(next) {
            frame.1 += 1;
            if succ < n && !visited[succ] {
                visited[succ] = true;
                stack.push((succ, 0));
            }
        } else {
            order.push(node);
            stack.pop();
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominator_single_node() {
        let tree = compute_dominators(&[vec![]], 0);
        assert_eq!(tree.root(), 0);
        assert_eq!(tree.immediate_dominator(0), None);
        assert!(tree.dominates(0, 0));
        assert!(tree.is_reachable(0));
    }

    #[test]
    fn test_dominator_linear_chain() {
        let succs = vec![vec![1], vec![2], vec![3], vec![]];
        let tree = compute_dominators(&succs, 0);

        assert_eq!(tree.immediate_dominator(1), Some(0));
        assert_eq!(tree.immediate_dominator(2), Some(1));
        assert_eq!(tree.immediate_dominator(3), Some(2));
        assert!(tree.dominates(1, 3));
        assert!(!tree.dominates(3, 1));
    }

    #[test]
    fn test_dominator_loop() {
        // 0 -> 1 (header) -> 2 (body) -> 1, 1 -> 3 (exit)
        let succs = vec![vec![1], vec![2, 3], vec![1], vec![]];
        let tree = compute_dominators(&succs, 0);

        assert_eq!(tree.immediate_dominator(2), Some(1));
        assert_eq!(tree.immediate_dominator(3), Some(1));
        assert!(tree.dominates(1, 2));
    }

    #[test]
    fn test_dominator_unreachable() {
        let succs = vec![vec![1], vec![], vec![1]];
        let tree = compute_dominators(&succs, 0);

        assert!(!tree.is_reachable(2));
        assert_eq!(tree.immediate_dominator(2), None);
        assert!(!tree.dominates(0, 2));
    }

    #[test]
    fn test_postdominators_linear() {
        let succs = vec![vec![1], vec![2], vec![]];
        assert_eq!(compute_postdominators(&succs), vec![Some(1), Some(2), None]);
    }

    #[test]
    fn test_postdominators_loop() {
        // 0 -> 1 (header) -> 2 (body) -> 3 (post) -> 1, 1 -> 4 (exit)
        let succs = vec![vec![1], vec![2, 4], vec![3], vec![1], vec![]];
        let ipdom = compute_postdominators(&succs);

        assert_eq!(ipdom[0], Some(1));
        assert_eq!(ipdom[1], Some(4));
        assert_eq!(ipdom[2], Some(3));
        assert_eq!(ipdom[3], Some(1));
        assert_eq!(ipdom[4], None);
    }

    #[test]
    fn test_postdominators_multiple_exits() {
        // 0 -> {1, 2}, both return
        let succs = vec![vec![1, 2], vec![], vec![]];
        assert_eq!(compute_postdominators(&succs), vec![None, None, None]);
    }

    #[test]
    fn test_postdominators_infinite_loop() {
        // 0 -> 1 -> 1 never reaches an exit
        let succs = vec![vec![1], vec![1]];
        assert_eq!(compute_postdominators(&succs), vec![None, None]);
    }
}
