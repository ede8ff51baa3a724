//! Pure Chain Algorithms
//!
//! The ordering core of the notebook document model. A scope's members
//! (sections and results sharing one container) form a singly linked list
//! through their `next` pointers. The functions in this module are pure
//! transformations over already-fetched members, so the algorithms are
//! unit-testable without any store.
//!
//! # Invariants checked here
//!
//! For a non-empty scope there must be exactly one head (a member nothing
//! points at), exactly one tail (`next == None`), no cycles, no dangling
//! pointers out of the scope, and no member pointed at twice. Any
//! violation is a [`ChainError`]; corruption is always surfaced, never
//! silently repaired.

use crate::models::{AnalysisResult, NodeRef, Section};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// One member of a scope chain: either node kind, with uniform access to
/// its id and successor.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainNode {
    Section(Section),
    Result(AnalysisResult),
}

impl ChainNode {
    /// The node's id
    pub fn id(&self) -> &str {
        match self {
            ChainNode::Section(s) => &s.id,
            ChainNode::Result(r) => &r.id,
        }
    }

    /// The node's chain successor
    pub fn next(&self) -> &Option<NodeRef> {
        match self {
            ChainNode::Section(s) => &s.next,
            ChainNode::Result(r) => &r.next,
        }
    }

    /// Typed reference to this node
    pub fn node_ref(&self) -> NodeRef {
        match self {
            ChainNode::Section(s) => s.node_ref(),
            ChainNode::Result(r) => r.node_ref(),
        }
    }
}

/// Structural corruption detected while interpreting a scope's chain.
///
/// Carries the offending node ids so a corrupt document can be diagnosed
/// from the error alone.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// More than one member has no predecessor
    #[error("multiple heads: {head_ids:?}")]
    MultipleHeads { head_ids: Vec<String> },

    /// Non-empty scope where every member has a predecessor (a cycle
    /// covering the whole scope)
    #[error("no head found (every member has a predecessor)")]
    NoHead,

    /// More than one member has `next == None`
    #[error("multiple tails: {tail_ids:?}")]
    MultipleTails { tail_ids: Vec<String> },

    /// Non-empty scope where no member has `next == None`
    #[error("no tail found (no member terminates the chain)")]
    NoTail,

    /// More than one member points at the same successor
    #[error("node '{target_id}' has multiple predecessors: {pointer_ids:?}")]
    MultiplePredecessors {
        target_id: String,
        pointer_ids: Vec<String>,
    },

    /// A member was reached twice while walking from the head
    #[error("cycle detected at node '{node_id}'")]
    Cycle { node_id: String },

    /// A `next` pointer targets a node that is not in the scope
    #[error("node '{from_id}' points at '{to_id}' which is not in this scope")]
    DanglingNext { from_id: String, to_id: String },

    /// Members exist that are unreachable from the head (a detached
    /// secondary chain or cycle)
    #[error("unreachable members: {unreachable_ids:?}")]
    Disconnected { unreachable_ids: Vec<String> },
}

/// Find the scope's tail: the unique member whose `next` is `None`.
///
/// Returns `Ok(None)` for an empty scope. A non-empty scope with zero or
/// several tails is corrupt.
pub fn find_tail(members: &[ChainNode]) -> Result<Option<&ChainNode>, ChainError> {
    let tails: Vec<&ChainNode> = members.iter().filter(|m| m.next().is_none()).collect();

    match tails.len() {
        0 if members.is_empty() => Ok(None),
        0 => Err(ChainError::NoTail),
        1 => Ok(Some(tails[0])),
        _ => Err(ChainError::MultipleTails {
            tail_ids: tails.iter().map(|t| t.id().to_string()).collect(),
        }),
    }
}

/// Find the member pointing at `target`, or `None` when `target` is the
/// head of its scope.
///
/// Several members pointing at the same target means the chain has merged
/// and is corrupt.
pub fn find_predecessor<'a>(
    members: &'a [ChainNode],
    target: &NodeRef,
) -> Result<Option<&'a ChainNode>, ChainError> {
    let pointers: Vec<&ChainNode> = members
        .iter()
        .filter(|m| m.next().as_ref() == Some(target))
        .collect();

    match pointers.len() {
        0 => Ok(None),
        1 => Ok(Some(pointers[0])),
        _ => Err(ChainError::MultiplePredecessors {
            target_id: target.id().to_string(),
            pointer_ids: pointers.iter().map(|p| p.id().to_string()).collect(),
        }),
    }
}

/// Materialize the ordered sequence of a scope.
///
/// The head is found by set subtraction (members minus all `next`
/// targets), then the chain is walked to the tail. The walk tracks visited
/// nodes and fails loudly on any structural violation instead of looping
/// or guessing.
pub fn order(members: Vec<ChainNode>) -> Result<Vec<ChainNode>, ChainError> {
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let mut by_ref: HashMap<NodeRef, ChainNode> = HashMap::with_capacity(members.len());
    let mut targets: HashSet<NodeRef> = HashSet::with_capacity(members.len());

    for member in members {
        if let Some(next) = member.next() {
            targets.insert(next.clone());
        }
        by_ref.insert(member.node_ref(), member);
    }

    let mut heads: Vec<NodeRef> = by_ref
        .keys()
        .filter(|r| !targets.contains(*r))
        .cloned()
        .collect();

    match heads.len() {
        0 => return Err(ChainError::NoHead),
        1 => {}
        _ => {
            let mut head_ids: Vec<String> =
                heads.iter().map(|h| h.id().to_string()).collect();
            head_ids.sort();
            return Err(ChainError::MultipleHeads { head_ids });
        }
    }

    let head = heads.remove(0);
    let mut ordered = Vec::with_capacity(by_ref.len());
    let mut visited: HashSet<NodeRef> = HashSet::with_capacity(by_ref.len());
    let mut cursor = Some(head);

    while let Some(current) = cursor {
        if !visited.insert(current.clone()) {
            return Err(ChainError::Cycle {
                node_id: current.id().to_string(),
            });
        }

        let node = match by_ref.get(&current) {
            Some(node) => node.clone(),
            None => {
                // Only reachable via a next pointer, so a predecessor is
                // known to exist in the ordered prefix.
                let from_id = ordered
                    .last()
                    .map(|n: &ChainNode| n.id().to_string())
                    .unwrap_or_default();
                return Err(ChainError::DanglingNext {
                    from_id,
                    to_id: current.id().to_string(),
                });
            }
        };

        cursor = node.next().clone();
        ordered.push(node);
    }

    if ordered.len() != by_ref.len() {
        let mut unreachable_ids: Vec<String> = by_ref
            .keys()
            .filter(|r| !visited.contains(*r))
            .map(|r| r.id().to_string())
            .collect();
        unreachable_ids.sort();
        return Err(ChainError::Disconnected { unreachable_ids });
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Section};

    fn section(id: &str, next: Option<NodeRef>) -> ChainNode {
        let mut s = Section::new("nb".to_string(), None, format!("Section {}", id), None);
        s.id = id.to_string();
        s.next = next;
        ChainNode::Section(s)
    }

    fn result(id: &str, next: Option<NodeRef>) -> ChainNode {
        let mut r = AnalysisResult::new("s-owner".to_string(), format!("Result {}", id));
        r.id = id.to_string();
        r.next = next;
        ChainNode::Result(r)
    }

    fn sref(id: &str) -> NodeRef {
        NodeRef::Section(id.to_string())
    }

    fn rref(id: &str) -> NodeRef {
        NodeRef::Result(id.to_string())
    }

    #[test]
    fn test_order_empty_scope() {
        assert_eq!(order(Vec::new()).unwrap(), Vec::new());
    }

    #[test]
    fn test_order_single_node() {
        let ordered = order(vec![section("a", None)]).unwrap();
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id(), "a");
    }

    #[test]
    fn test_order_follows_next_pointers_not_input_order() {
        // Input deliberately shuffled: chain is a -> b -> c
        let members = vec![
            section("c", None),
            section("a", Some(sref("b"))),
            section("b", Some(sref("c"))),
        ];
        let ordered = order(members).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_interleaves_sections_and_results() {
        // section a -> result r1 -> section b -> result r2
        let members = vec![
            result("r2", None),
            section("b", Some(rref("r2"))),
            result("r1", Some(sref("b"))),
            section("a", Some(rref("r1"))),
        ];
        let ordered = order(members).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["a", "r1", "b", "r2"]);
    }

    #[test]
    fn test_order_detects_cycle() {
        // a -> b -> a, plus head h -> a so a head exists
        let members = vec![
            section("h", Some(sref("a"))),
            section("a", Some(sref("b"))),
            section("b", Some(sref("a"))),
        ];
        let err = order(members).unwrap_err();
        assert!(matches!(err, ChainError::Cycle { ref node_id } if node_id == "a"));
    }

    #[test]
    fn test_order_detects_full_cycle_as_no_head() {
        let members = vec![
            section("a", Some(sref("b"))),
            section("b", Some(sref("a"))),
        ];
        assert_eq!(order(members).unwrap_err(), ChainError::NoHead);
    }

    #[test]
    fn test_order_detects_multiple_heads() {
        let members = vec![
            section("a", Some(sref("c"))),
            section("b", Some(sref("c"))),
            section("c", None),
        ];
        // Both a and b are heads; c also has two predecessors. Head
        // detection fires first and names both.
        let err = order(members).unwrap_err();
        assert_eq!(
            err,
            ChainError::MultipleHeads {
                head_ids: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_order_detects_dangling_next() {
        let members = vec![section("a", Some(sref("ghost")))];
        let err = order(members).unwrap_err();
        assert_eq!(
            err,
            ChainError::DanglingNext {
                from_id: "a".to_string(),
                to_id: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_order_detects_detached_cycle() {
        // Valid chain a -> None, plus detached cycle b -> c -> b
        let members = vec![
            section("a", None),
            section("b", Some(sref("c"))),
            section("c", Some(sref("b"))),
        ];
        let err = order(members).unwrap_err();
        assert_eq!(
            err,
            ChainError::Disconnected {
                unreachable_ids: vec!["b".to_string(), "c".to_string()]
            }
        );
    }

    #[test]
    fn test_order_distinguishes_kinds_with_same_id() {
        // A section and a result may share an id string; the tagged ref
        // keeps them distinct.
        let members = vec![section("x", Some(rref("x"))), result("x", None)];
        let ordered = order(members).unwrap();
        assert!(matches!(ordered[0], ChainNode::Section(_)));
        assert!(matches!(ordered[1], ChainNode::Result(_)));
    }

    #[test]
    fn test_find_tail_empty_and_single() {
        assert!(find_tail(&[]).unwrap().is_none());

        let members = vec![section("a", None)];
        assert_eq!(find_tail(&members).unwrap().unwrap().id(), "a");
    }

    #[test]
    fn test_find_tail_rejects_multiple_tails() {
        let members = vec![section("a", None), section("b", None)];
        let err = find_tail(&members).unwrap_err();
        assert!(matches!(err, ChainError::MultipleTails { ref tail_ids } if tail_ids.len() == 2));
    }

    #[test]
    fn test_find_tail_rejects_tailless_scope() {
        let members = vec![
            section("a", Some(sref("b"))),
            section("b", Some(sref("a"))),
        ];
        assert_eq!(find_tail(&members).unwrap_err(), ChainError::NoTail);
    }

    #[test]
    fn test_find_predecessor_head_has_none() {
        let members = vec![section("a", Some(sref("b"))), section("b", None)];
        assert!(find_predecessor(&members, &sref("a")).unwrap().is_none());
        assert_eq!(
            find_predecessor(&members, &sref("b")).unwrap().unwrap().id(),
            "a"
        );
    }

    #[test]
    fn test_find_predecessor_rejects_merge() {
        let members = vec![
            section("a", Some(sref("c"))),
            section("b", Some(sref("c"))),
            section("c", None),
        ];
        let err = find_predecessor(&members, &sref("c")).unwrap_err();
        assert!(matches!(err, ChainError::MultiplePredecessors { ref target_id, .. } if target_id == "c"));
    }
}
