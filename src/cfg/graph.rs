//! The flow graph arena and its maintained analysis sets.
//!
//! [`FlowGraph`] owns one arena slot per instruction and keeps four pieces
//! of state per live node: the instruction payload, the mutually-linked
//! predecessor and successor sets, the dominator set, and the reachability
//! set.
//!
//! # Incremental maintenance
//!
//! Structural recovery edits edges continuously, so the dominator and
//! reachability sets are repaired incrementally after each edit instead of
//! being recomputed from scratch. Both repairs work the same way: collect the
//! affected region (forward-reachable from the edited edge's head for
//! dominators, backward-reachable from its tail for reachability), re-seed
//! the region (to the full node set for dominators, to empty for
//! reachability), then run a worklist until the region stabilizes.
//! Re-seeding matters: dominators are a maximal fixed point, and iterating
//! from stale values after an edge removal can stabilize below the truth.
//!
//! Dominator sets are meaningful only for nodes reachable from the start
//! node; an unreachable node's set degenerates to the full node set.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fmt::Write as _;

use crate::cfg::{EdgeKind, NodeId};
use crate::ir::{Instruction, MethodCall, Value, VarKey};
use crate::{Error, Result};

/// The payload of a flow graph node.
///
/// Construction specializes control transfers out of the instruction stream:
/// a `JumpIf` becomes a [`FlowInstruction::Branch`] whose targets live on the
/// node's edges, and a `Switch` becomes a [`FlowInstruction::Switch`] whose
/// case values live on its [`EdgeKind::Case`] edges. Labels and gotos are
/// short-circuited away entirely, so they never appear as payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowInstruction {
    /// A non-transferring statement: assignment, call, or return.
    Statement(Instruction),

    /// A two-way conditional. The targets are the node's [`EdgeKind::BranchTrue`]
    /// and [`EdgeKind::BranchFalse`] edges.
    Branch {
        /// The branch condition.
        condition: Value,
    },

    /// A multi-way dispatch. The targets are the node's [`EdgeKind::Case`]
    /// and [`EdgeKind::Default`] edges.
    Switch {
        /// The dispatch selector.
        selector: Value,
    },
}

impl FlowInstruction {
    /// Returns the inner statement, if this node carries one.
    #[must_use]
    pub const fn as_statement(&self) -> Option<&Instruction> {
        match self {
            Self::Statement(instruction) => Some(instruction),
            _ => None,
        }
    }

    /// Returns the branch condition, if this node is a two-way conditional.
    #[must_use]
    pub const fn condition(&self) -> Option<&Value> {
        match self {
            Self::Branch { condition } => Some(condition),
            _ => None,
        }
    }

    /// Returns the dispatch selector, if this node is a switch.
    #[must_use]
    pub const fn selector(&self) -> Option<&Value> {
        match self {
            Self::Switch { selector } => Some(selector),
            _ => None,
        }
    }

    /// Returns the set of variables this node reads.
    #[must_use]
    pub fn reads(&self) -> HashSet<VarKey> {
        let mut reads = HashSet::new();
        self.collect_reads(&mut reads);
        reads
    }

    /// Adds every variable this node reads to `reads`.
    pub fn collect_reads(&self, reads: &mut HashSet<VarKey>) {
        match self {
            Self::Statement(instruction) => instruction.collect_reads(reads),
            Self::Branch { condition } => condition.collect_reads(reads),
            Self::Switch { selector } => selector.collect_reads(reads),
        }
    }

    /// Adds every method call contained in this node to `calls`.
    pub fn collect_calls<'a>(&'a self, calls: &mut Vec<&'a MethodCall>) {
        match self {
            Self::Statement(instruction) => instruction.collect_calls(calls),
            Self::Branch { condition } => condition.collect_calls(calls),
            Self::Switch { selector } => selector.collect_calls(calls),
        }
    }

    /// Visits every variable read in this node, once per occurrence.
    pub fn for_each_read(&self, visit: &mut impl FnMut(VarKey)) {
        match self {
            Self::Statement(instruction) => instruction.for_each_read(visit),
            Self::Branch { condition } => condition.for_each_read(visit),
            Self::Switch { selector } => selector.for_each_read(visit),
        }
    }

    /// Structural substitution copy, mirroring [`Instruction::map_values`].
    #[must_use]
    pub fn map_values<F>(&self, subst: &mut F) -> FlowInstruction
    where
        F: FnMut(&Value) -> Option<Value>,
    {
        match self {
            Self::Statement(instruction) => Self::Statement(instruction.map_values(subst)),
            Self::Branch { condition } => Self::Branch {
                condition: condition.map(subst),
            },
            Self::Switch { selector } => Self::Switch {
                selector: selector.map(subst),
            },
        }
    }
}

impl fmt::Display for FlowInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statement(instruction) => write!(f, "{instruction}"),
            Self::Branch { condition } => write!(f, "branch {condition}"),
            Self::Switch { selector } => write!(f, "switch {selector}"),
        }
    }
}

/// One slot in the node arena.
#[derive(Debug, Clone)]
struct FlowNode {
    instruction: FlowInstruction,
    predecessors: HashSet<NodeId>,
    /// Ordered: branch edges keep true before false, switch edges keep the
    /// front-end's case order.
    successors: Vec<(NodeId, EdgeKind)>,
    dominators: HashSet<NodeId>,
    reachable: HashSet<NodeId>,
    removed: bool,
}

impl FlowNode {
    fn new(instruction: FlowInstruction) -> Self {
        Self {
            instruction,
            predecessors: HashSet::new(),
            successors: Vec::new(),
            dominators: HashSet::new(),
            reachable: HashSet::new(),
            removed: false,
        }
    }
}

/// A per-instruction control flow graph with maintained dominator and
/// reachability sets.
///
/// Nodes live in an arena indexed by [`NodeId`]; removal marks the slot dead
/// without shifting other identifiers. Every edge edit through the public
/// mutators ([`add_edge`](Self::add_edge), [`remove_edge`](Self::remove_edge),
/// [`redirect_edge`](Self::redirect_edge), [`remove_node`](Self::remove_node))
/// leaves the predecessor/successor mutual invariant and both analysis sets
/// consistent.
///
/// # Examples
///
/// ```rust
/// use shadelift::cfg::{BasicBlock, FlowGraph, Procedure};
/// use shadelift::ir::{Instruction, TypeRef};
///
/// let block = BasicBlock::new(vec![Instruction::Return(None)], vec![]);
/// let procedure = Procedure::new("main", vec![], TypeRef::Void, vec![block]);
/// let graph = FlowGraph::from_procedure(&procedure)?;
/// assert_eq!(graph.node_count(), 1);
/// assert!(graph.dominates(graph.start(), graph.start()));
/// # Ok::<(), shadelift::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    start: NodeId,
}

impl FlowGraph {
    /// Creates an empty graph. Construction goes through
    /// [`FlowGraph::from_procedure`]; this is the builder's starting point.
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            start: NodeId::new(0),
        }
    }

    /// Returns the start node.
    #[must_use]
    pub const fn start(&self) -> NodeId {
        self.start
    }

    /// Returns `true` if `id` names a live node of this graph.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.is_live(id)
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|node| !node.removed).count()
    }

    /// Iterates the identifiers of all live nodes, in arena order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.removed)
            .map(|(index, _)| NodeId::new(index))
    }

    /// Returns the instruction payload of a node.
    #[must_use]
    pub fn instruction(&self, id: NodeId) -> &FlowInstruction {
        &self.nodes[id.index()].instruction
    }

    /// Replaces the instruction payload of a node. Edges are untouched.
    pub fn set_instruction(&mut self, id: NodeId, instruction: FlowInstruction) {
        self.nodes[id.index()].instruction = instruction;
    }

    /// Returns the predecessor set of a node.
    #[must_use]
    pub fn predecessors(&self, id: NodeId) -> &HashSet<NodeId> {
        &self.nodes[id.index()].predecessors
    }

    /// Returns the ordered successor edges of a node.
    #[must_use]
    pub fn successors(&self, id: NodeId) -> &[(NodeId, EdgeKind)] {
        &self.nodes[id.index()].successors
    }

    /// Returns the sole successor of a node, if it has exactly one out-edge.
    #[must_use]
    pub fn single_successor(&self, id: NodeId) -> Option<NodeId> {
        match self.nodes[id.index()].successors.as_slice() {
            [(target, _)] => Some(*target),
            _ => None,
        }
    }

    /// Returns the kind of the first edge from `from` to `to`, if one exists.
    #[must_use]
    pub fn edge_kind(&self, from: NodeId, to: NodeId) -> Option<EdgeKind> {
        self.nodes[from.index()]
            .successors
            .iter()
            .find(|&&(target, _)| target == to)
            .map(|&(_, kind)| kind)
    }

    /// Returns the dominator set of a node, itself included.
    ///
    /// Meaningful only for nodes reachable from the start node.
    #[must_use]
    pub fn dominators(&self, id: NodeId) -> &HashSet<NodeId> {
        &self.nodes[id.index()].dominators
    }

    /// Returns the set of nodes reachable from `id` along one or more edges.
    ///
    /// A node is in its own reachability set only when it sits on a cycle.
    #[must_use]
    pub fn reachable(&self, id: NodeId) -> &HashSet<NodeId> {
        &self.nodes[id.index()].reachable
    }

    /// Returns `true` if `dominator` dominates `node`.
    ///
    /// Every node dominates itself.
    #[must_use]
    pub fn dominates(&self, dominator: NodeId, node: NodeId) -> bool {
        self.nodes[node.index()].dominators.contains(&dominator)
    }

    /// Returns `true` if `to` is reachable from `from` along one or more edges.
    #[must_use]
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        self.nodes[from.index()].reachable.contains(&to)
    }

    /// Adds a fresh node with no edges and returns its identifier.
    ///
    /// The node starts unreachable; its analysis sets become meaningful once
    /// [`add_edge`](Self::add_edge) wires it into the graph.
    pub fn add_node(&mut self, instruction: FlowInstruction) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        let mut node = FlowNode::new(instruction);
        node.dominators.insert(id);
        self.nodes.push(node);
        id
    }

    /// Adds an edge and repairs the analysis sets.
    ///
    /// Parallel edges between the same pair are permitted; a branch whose
    /// taken and fall-through targets coincide produces one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint is not a live node.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> Result<()> {
        self.check_live(from)?;
        self.check_live(to)?;
        self.link(from, to, kind);
        self.refresh_dominators(to);
        self.refresh_reachability(from);
        Ok(())
    }

    /// Removes every edge from `from` to `to` and repairs the analysis sets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint is not a live node or
    /// no such edge exists.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.check_live(from)?;
        self.check_live(to)?;
        if self.edge_kind(from, to).is_none() {
            return Err(Error::GraphError(format!("no edge from {from} to {to}")));
        }
        self.unlink(from, to);
        self.refresh_dominators(to);
        self.refresh_reachability(from);
        Ok(())
    }

    /// Retargets every edge from `from` to `old_to` onto `new_to`, keeping
    /// each edge's kind and position, and repairs the analysis sets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if any endpoint is not a live node or no
    /// edge from `from` to `old_to` exists.
    pub fn redirect_edge(&mut self, from: NodeId, old_to: NodeId, new_to: NodeId) -> Result<()> {
        self.check_live(from)?;
        self.check_live(old_to)?;
        self.check_live(new_to)?;
        if self.edge_kind(from, old_to).is_none() {
            return Err(Error::GraphError(format!("no edge from {from} to {old_to}")));
        }
        self.retarget(from, old_to, new_to);
        self.refresh_dominators(old_to);
        self.refresh_dominators(new_to);
        self.refresh_reachability(from);
        Ok(())
    }

    /// Removes a node, unlinking all of its edges, and repairs the analysis
    /// sets. The identifier is never reused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `id` is not a live node or is the
    /// start node.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.check_live(id)?;
        if id == self.start {
            return Err(Error::GraphError(format!(
                "cannot remove the start node {id}"
            )));
        }
        let preds: Vec<NodeId> = self.nodes[id.index()].predecessors.iter().copied().collect();
        let succs: Vec<NodeId> = self.nodes[id.index()]
            .successors
            .iter()
            .map(|&(target, _)| target)
            .collect();
        for &pred in &preds {
            self.unlink(pred, id);
        }
        for &succ in &succs {
            self.unlink(id, succ);
        }
        self.mark_removed(id);
        for &succ in &succs {
            self.refresh_dominators(succ);
        }
        for &pred in &preds {
            self.refresh_reachability(pred);
        }
        Ok(())
    }

    /// Removes a single-successor node by routing every predecessor edge
    /// directly to its successor, and repairs the analysis sets. Edge kinds
    /// and positions on the rerouted edges are preserved.
    ///
    /// If the spliced node is the start node, its successor becomes the new
    /// start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if `id` is not a live node, does not
    /// have exactly one successor, or its only successor is itself.
    pub fn splice_node(&mut self, id: NodeId) -> Result<()> {
        self.check_live(id)?;
        let Some(succ) = self.single_successor(id) else {
            return Err(Error::GraphError(format!(
                "cannot splice {id}: it does not have exactly one successor"
            )));
        };
        if succ == id {
            return Err(Error::GraphError(format!(
                "cannot splice the self-loop at {id}"
            )));
        }
        let preds: Vec<NodeId> = self.nodes[id.index()].predecessors.iter().copied().collect();
        for &pred in &preds {
            self.retarget(pred, id, succ);
        }
        self.unlink(id, succ);
        self.mark_removed(id);
        if self.start == id {
            self.set_start(succ);
            self.recompute_sets();
        } else {
            self.refresh_dominators(succ);
            for &pred in &preds {
                self.refresh_reachability(pred);
            }
        }
        Ok(())
    }

    /// Computes a postorder over the nodes reachable from the start node.
    ///
    /// Successors are visited in edge order; back edges are skipped, so the
    /// traversal terminates on cyclic graphs.
    #[must_use]
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        if !self.is_live(self.start) {
            return order;
        }
        let mut visited = HashSet::new();
        visited.insert(self.start);
        let mut stack = vec![(self.start, 0usize)];
        while let Some((node, next)) = stack.pop() {
            let successors = &self.nodes[node.index()].successors;
            if next < successors.len() {
                stack.push((node, next + 1));
                let (succ, _) = successors[next];
                if self.is_live(succ) && visited.insert(succ) {
                    stack.push((succ, 0));
                }
            } else {
                order.push(node);
            }
        }
        order
    }

    /// Computes a reverse postorder over the nodes reachable from the start
    /// node. Forward dataflow sweeps visit nodes in this order.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<NodeId> {
        let mut order = self.postorder();
        order.reverse();
        order
    }

    /// Renders the graph in Graphviz dot format, for debugging.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph flow {\n");
        for id in self.node_ids() {
            let label = self.nodes[id.index()].instruction.to_string();
            let _ = writeln!(out, "    {id} [label=\"{id}: {}\"];", label.replace('"', "\\\""));
        }
        for id in self.node_ids() {
            for &(target, kind) in &self.nodes[id.index()].successors {
                let _ = writeln!(out, "    {id} -> {target} [label=\"{kind}\"];");
            }
        }
        out.push_str("}\n");
        out
    }

    // ───────────────────────────── builder interface ─────────────────────────────

    /// Wires an edge without repairing the analysis sets.
    pub(crate) fn link(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        self.nodes[from.index()].successors.push((to, kind));
        self.nodes[to.index()].predecessors.insert(from);
    }

    /// Retargets every edge from `from` aimed at `old_to` onto `new_to` in
    /// place, keeping kind and position, without repairing the analysis sets.
    pub(crate) fn retarget(&mut self, from: NodeId, old_to: NodeId, new_to: NodeId) {
        for edge in &mut self.nodes[from.index()].successors {
            if edge.0 == old_to {
                edge.0 = new_to;
            }
        }
        self.nodes[old_to.index()].predecessors.remove(&from);
        self.nodes[new_to.index()].predecessors.insert(from);
    }

    /// Severs every edge from `from` to `to` without repairing the analysis
    /// sets.
    pub(crate) fn unlink(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.index()].successors.retain(|&(target, _)| target != to);
        self.nodes[to.index()].predecessors.remove(&from);
    }

    /// Marks a node dead and clears its edges and sets. The caller must have
    /// unlinked all of its edges first.
    pub(crate) fn mark_removed(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        node.removed = true;
        node.predecessors.clear();
        node.successors.clear();
        node.dominators.clear();
        node.reachable.clear();
    }

    /// Sets the start node.
    pub(crate) fn set_start(&mut self, start: NodeId) {
        self.start = start;
    }

    /// Recomputes both analysis sets from scratch, over every live node.
    pub(crate) fn recompute_sets(&mut self) {
        let all: HashSet<NodeId> = self.node_ids().collect();
        self.reseed_and_iterate_dominators(&all);
        self.reseed_and_iterate_reachability(&all);
    }

    // ──────────────────────────── incremental repair ─────────────────────────────

    fn is_live(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len() && !self.nodes[id.index()].removed
    }

    fn check_live(&self, id: NodeId) -> Result<()> {
        if self.is_live(id) {
            Ok(())
        } else {
            Err(Error::GraphError(format!("node {id} is not in the graph")))
        }
    }

    /// Collects the live nodes reachable from `origin` along successor edges,
    /// `origin` included.
    fn forward_region(&self, origin: NodeId) -> HashSet<NodeId> {
        let mut region = HashSet::new();
        let mut stack = vec![origin];
        while let Some(node) = stack.pop() {
            if !self.is_live(node) || !region.insert(node) {
                continue;
            }
            for &(succ, _) in &self.nodes[node.index()].successors {
                stack.push(succ);
            }
        }
        region
    }

    /// Collects the live nodes that reach `origin` along successor edges,
    /// `origin` included.
    fn backward_region(&self, origin: NodeId) -> HashSet<NodeId> {
        let mut region = HashSet::new();
        let mut stack = vec![origin];
        while let Some(node) = stack.pop() {
            if !self.is_live(node) || !region.insert(node) {
                continue;
            }
            for &pred in &self.nodes[node.index()].predecessors {
                stack.push(pred);
            }
        }
        region
    }

    /// Repairs dominator sets after an edit whose effect enters the graph at
    /// `origin` (the head of an added or removed edge).
    ///
    /// Only nodes forward-reachable from `origin` can change, and that region
    /// is closed under successors, so the worklist never needs to leave it.
    fn refresh_dominators(&mut self, origin: NodeId) {
        if !self.is_live(origin) {
            return;
        }
        let region = self.forward_region(origin);
        self.reseed_and_iterate_dominators(&region);
    }

    /// Repairs reachability sets after an edit whose effect leaves the graph
    /// at `origin` (the tail of an added or removed edge).
    fn refresh_reachability(&mut self, origin: NodeId) {
        if !self.is_live(origin) {
            return;
        }
        let region = self.backward_region(origin);
        self.reseed_and_iterate_reachability(&region);
    }

    /// Re-seeds `region` to the dominator lattice top and iterates
    /// `dom(n) = {n} ∪ ⋂ dom(p)` over the region until stable. Nodes outside
    /// the region hold their (still correct) sets and feed the intersections.
    fn reseed_and_iterate_dominators(&mut self, region: &HashSet<NodeId>) {
        let all: HashSet<NodeId> = self.node_ids().collect();
        for &node in region {
            self.nodes[node.index()].dominators = if node == self.start {
                std::iter::once(node).collect()
            } else {
                all.clone()
            };
        }
        let mut worklist: VecDeque<NodeId> = region.iter().copied().collect();
        while let Some(node) = worklist.pop_front() {
            if node == self.start {
                continue;
            }
            let preds: Vec<NodeId> = self.nodes[node.index()]
                .predecessors
                .iter()
                .copied()
                .filter(|&pred| self.is_live(pred))
                .collect();
            let mut meet: Option<HashSet<NodeId>> = None;
            for pred in preds {
                let pred_doms = &self.nodes[pred.index()].dominators;
                meet = Some(match meet {
                    None => pred_doms.clone(),
                    Some(acc) => acc.intersection(pred_doms).copied().collect(),
                });
            }
            let mut new_doms = meet.unwrap_or_else(|| all.clone());
            new_doms.insert(node);
            if new_doms != self.nodes[node.index()].dominators {
                let successors: Vec<NodeId> = self.nodes[node.index()]
                    .successors
                    .iter()
                    .map(|&(succ, _)| succ)
                    .filter(|succ| region.contains(succ))
                    .collect();
                self.nodes[node.index()].dominators = new_doms;
                worklist.extend(successors);
            }
        }
    }

    /// Re-seeds `region` to empty and iterates
    /// `reach(n) = ⋃ {s} ∪ reach(s)` over the region until stable. This is a
    /// least fixed point, so growing from empty converges to the truth.
    fn reseed_and_iterate_reachability(&mut self, region: &HashSet<NodeId>) {
        for &node in region {
            self.nodes[node.index()].reachable.clear();
        }
        let mut worklist: VecDeque<NodeId> = region.iter().copied().collect();
        while let Some(node) = worklist.pop_front() {
            let successors: Vec<NodeId> = self.nodes[node.index()]
                .successors
                .iter()
                .map(|&(succ, _)| succ)
                .filter(|&succ| self.is_live(succ))
                .collect();
            let mut new_reach = HashSet::new();
            for succ in successors {
                new_reach.insert(succ);
                new_reach.extend(self.nodes[succ.index()].reachable.iter().copied());
            }
            if new_reach != self.nodes[node.index()].reachable {
                let preds: Vec<NodeId> = self.nodes[node.index()]
                    .predecessors
                    .iter()
                    .copied()
                    .filter(|pred| region.contains(pred))
                    .collect();
                self.nodes[node.index()].reachable = new_reach;
                worklist.extend(preds);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Location, TypeRef, Value, Variable};

    fn statement(n: i64) -> FlowInstruction {
        FlowInstruction::Statement(Instruction::Assign {
            target: Location::Variable(Variable::local(0, TypeRef::Int)),
            value: Value::int(n),
        })
    }

    /// Builds a graph with `count` statement nodes, the given unconditional
    /// edges, and node 0 as start.
    fn make_graph(count: usize, edges: &[(usize, usize)]) -> FlowGraph {
        let mut graph = FlowGraph::new();
        for i in 0..count {
            graph.add_node(statement(i as i64));
        }
        for &(from, to) in edges {
            graph.link(NodeId::new(from), NodeId::new(to), EdgeKind::Unconditional);
        }
        graph.set_start(NodeId::new(0));
        graph.recompute_sets();
        graph
    }

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    fn set(ids: &[usize]) -> HashSet<NodeId> {
        ids.iter().map(|&i| NodeId::new(i)).collect()
    }

    /// Reference reachability: plain BFS from the node's successors.
    fn naive_reachable(graph: &FlowGraph, from: NodeId) -> HashSet<NodeId> {
        let mut reached = HashSet::new();
        let mut stack: Vec<NodeId> = graph.successors(from).iter().map(|&(s, _)| s).collect();
        while let Some(node) = stack.pop() {
            if !reached.insert(node) {
                continue;
            }
            stack.extend(graph.successors(node).iter().map(|&(s, _)| s));
        }
        reached
    }

    /// Returns `true` if a path from `from` to `to` exists that never visits
    /// `avoid`.
    fn path_exists_avoiding(graph: &FlowGraph, from: NodeId, to: NodeId, avoid: NodeId) -> bool {
        if from == avoid {
            return false;
        }
        if from == to {
            return true;
        }
        let mut visited = HashSet::new();
        visited.insert(from);
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            for &(succ, _) in graph.successors(node) {
                if succ == avoid {
                    continue;
                }
                if succ == to {
                    return true;
                }
                if visited.insert(succ) {
                    stack.push(succ);
                }
            }
        }
        false
    }

    /// Reference dominators: `d` dominates `target` iff no start-to-target
    /// path avoids `d`.
    fn naive_dominators(graph: &FlowGraph, target: NodeId) -> HashSet<NodeId> {
        graph
            .node_ids()
            .filter(|&candidate| {
                candidate == target
                    || !path_exists_avoiding(graph, graph.start(), target, candidate)
            })
            .collect()
    }

    /// Cross-checks every maintained set against the reference computations,
    /// and the predecessor/successor mutual invariant.
    fn assert_sets_consistent(graph: &FlowGraph) {
        for node in graph.node_ids() {
            assert_eq!(
                graph.reachable(node),
                &naive_reachable(graph, node),
                "reachability of {node}"
            );
            if node == graph.start() || graph.reaches(graph.start(), node) {
                assert_eq!(
                    graph.dominators(node),
                    &naive_dominators(graph, node),
                    "dominators of {node}"
                );
            }
            for &(succ, _) in graph.successors(node) {
                assert!(
                    graph.predecessors(succ).contains(&node),
                    "edge {node} -> {succ} missing from predecessor set"
                );
            }
            for &pred in graph.predecessors(node) {
                assert!(
                    graph.successors(pred).iter().any(|&(t, _)| t == node),
                    "predecessor {pred} of {node} has no matching edge"
                );
            }
        }
    }

    #[test]
    fn test_diamond_dominators() {
        let graph = make_graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(graph.dominators(n(0)), &set(&[0]));
        assert_eq!(graph.dominators(n(1)), &set(&[0, 1]));
        assert_eq!(graph.dominators(n(2)), &set(&[0, 2]));
        assert_eq!(graph.dominators(n(3)), &set(&[0, 3]));
        assert!(graph.dominates(n(0), n(3)));
        assert!(!graph.dominates(n(1), n(3)));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_loop_reachability() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let graph = make_graph(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        assert!(graph.reaches(n(1), n(1)), "cycle member reaches itself");
        assert!(graph.reaches(n(0), n(3)));
        assert!(!graph.reaches(n(3), n(0)));
        assert!(!graph.reaches(n(0), n(0)), "start is not on the cycle");
        assert_eq!(graph.reachable(n(3)), &set(&[]));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_add_edge_shortens_dominators() {
        let mut graph = make_graph(4, &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(graph.dominators(n(3)), &set(&[0, 1, 2, 3]));
        graph.add_edge(n(0), n(3), EdgeKind::Unconditional).unwrap();
        assert_eq!(graph.dominators(n(3)), &set(&[0, 3]));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_remove_edge_grows_dominators() {
        let mut graph = make_graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        graph.remove_edge(n(2), n(3)).unwrap();
        assert_eq!(graph.dominators(n(3)), &set(&[0, 1, 3]));
        assert!(!graph.reaches(n(2), n(3)));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_remove_edge_in_cycle() {
        // 0 -> 1 -> 2 -> 3 -> 1, 1 -> 4
        let mut graph = make_graph(5, &[(0, 1), (1, 2), (2, 3), (3, 1), (1, 4)]);
        assert!(graph.reaches(n(2), n(4)));
        graph.remove_edge(n(3), n(1)).unwrap();
        assert!(!graph.reaches(n(2), n(4)));
        assert!(!graph.reaches(n(1), n(1)));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_remove_node_reroutes_dominance() {
        let mut graph = make_graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        graph.remove_node(n(2)).unwrap();
        assert!(!graph.contains(n(2)));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.dominators(n(3)), &set(&[0, 1, 3]));
        assert!(!graph.predecessors(n(3)).contains(&n(2)));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_splice_node_reroutes_predecessors() {
        // branch -> {1, 2}; 1 -> 3, 2 -> 3. Splicing 1 reroutes the
        // BranchTrue edge straight to 3 with its kind intact.
        let mut graph = FlowGraph::new();
        let start = graph.add_node(FlowInstruction::Branch {
            condition: Value::bool(true),
        });
        let then = graph.add_node(statement(1));
        let other = graph.add_node(statement(2));
        let join = graph.add_node(statement(3));
        graph.link(start, then, EdgeKind::BranchTrue);
        graph.link(start, other, EdgeKind::BranchFalse);
        graph.link(then, join, EdgeKind::Unconditional);
        graph.link(other, join, EdgeKind::Unconditional);
        graph.set_start(start);
        graph.recompute_sets();

        graph.splice_node(then).unwrap();
        assert!(!graph.contains(then));
        assert_eq!(graph.edge_kind(start, join), Some(EdgeKind::BranchTrue));
        assert_eq!(graph.dominators(join), &set(&[0, 3]));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_splice_start_node_advances_start() {
        let mut graph = make_graph(3, &[(0, 1), (1, 2)]);
        graph.splice_node(n(0)).unwrap();
        assert_eq!(graph.start(), n(1));
        assert!(!graph.contains(n(0)));
        assert_eq!(graph.dominators(n(2)), &set(&[1, 2]));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_splice_rejects_branches_and_self_loops() {
        let mut graph = make_graph(4, &[(0, 1), (0, 2), (1, 1), (2, 3)]);
        // Node 0 has two successors, node 1 only loops on itself.
        assert!(matches!(graph.splice_node(n(0)), Err(Error::GraphError(_))));
        assert!(matches!(graph.splice_node(n(1)), Err(Error::GraphError(_))));
    }

    #[test]
    fn test_remove_start_node_rejected() {
        let mut graph = make_graph(2, &[(0, 1)]);
        assert!(matches!(
            graph.remove_node(n(0)),
            Err(Error::GraphError(_))
        ));
    }

    #[test]
    fn test_edge_endpoint_validation() {
        let mut graph = make_graph(2, &[(0, 1)]);
        assert!(matches!(
            graph.add_edge(n(0), n(9), EdgeKind::Unconditional),
            Err(Error::GraphError(_))
        ));
        assert!(matches!(
            graph.remove_edge(n(1), n(0)),
            Err(Error::GraphError(_))
        ));
    }

    #[test]
    fn test_redirect_edge_keeps_kind() {
        let mut graph = FlowGraph::new();
        let start = graph.add_node(FlowInstruction::Branch {
            condition: Value::bool(true),
        });
        let then = graph.add_node(statement(1));
        let other = graph.add_node(statement(2));
        let replacement = graph.add_node(statement(3));
        graph.link(start, then, EdgeKind::BranchTrue);
        graph.link(start, other, EdgeKind::BranchFalse);
        graph.set_start(start);
        graph.recompute_sets();

        graph.redirect_edge(start, then, replacement).unwrap();
        assert_eq!(graph.edge_kind(start, replacement), Some(EdgeKind::BranchTrue));
        assert_eq!(graph.edge_kind(start, then), None);
        assert!(graph.reaches(start, replacement));
        assert!(!graph.reaches(start, then));
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_edit_sequence_stays_consistent() {
        // 0 -> 1 -> 2 -> 4, 1 -> 3 -> 4, 4 -> 1
        let mut graph = make_graph(5, &[(0, 1), (1, 2), (2, 4), (1, 3), (3, 4), (4, 1)]);
        assert_sets_consistent(&graph);

        let fresh = graph.add_node(statement(9));
        graph.add_edge(n(4), fresh, EdgeKind::Unconditional).unwrap();
        assert_sets_consistent(&graph);

        graph.remove_edge(n(4), n(1)).unwrap();
        assert_sets_consistent(&graph);

        graph.remove_node(n(3)).unwrap();
        assert_sets_consistent(&graph);

        graph.redirect_edge(n(2), n(4), fresh).unwrap();
        assert_sets_consistent(&graph);
    }

    #[test]
    fn test_postorder_visits_successors_first() {
        let graph = make_graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let order = graph.postorder();
        assert_eq!(order.len(), 4);
        assert_eq!(order.last(), Some(&n(0)));
        let position = |id: NodeId| order.iter().position(|&o| o == id).unwrap();
        assert!(position(n(3)) < position(n(1)));
        assert!(position(n(3)) < position(n(2)));

        let rpo = graph.reverse_postorder();
        assert_eq!(rpo.first(), Some(&n(0)));
    }

    #[test]
    fn test_postorder_terminates_on_cycles() {
        let graph = make_graph(3, &[(0, 1), (1, 2), (2, 0)]);
        let order = graph.postorder();
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_single_successor() {
        let graph = make_graph(4, &[(0, 1), (0, 2), (1, 3)]);
        assert_eq!(graph.single_successor(n(0)), None);
        assert_eq!(graph.single_successor(n(1)), Some(n(3)));
        assert_eq!(graph.single_successor(n(3)), None);
    }

    #[test]
    fn test_set_instruction_replaces_payload() {
        let mut graph = make_graph(2, &[(0, 1)]);
        graph.set_instruction(
            n(0),
            FlowInstruction::Switch {
                selector: Value::int(2),
            },
        );
        assert_eq!(graph.instruction(n(0)).selector(), Some(&Value::int(2)));
        assert_eq!(graph.instruction(n(0)).as_statement(), None);
    }

    #[test]
    fn test_flow_instruction_reads_and_substitution() {
        let branch = FlowInstruction::Branch {
            condition: Value::Variable(Variable::local(5, TypeRef::Bool)),
        };
        let reads = branch.reads();
        assert_eq!(reads.len(), 1);

        let rewritten = branch.map_values(&mut |value| match value {
            Value::Variable(v) if v.index == 5 => Some(Value::bool(false)),
            _ => None,
        });
        assert_eq!(
            rewritten,
            FlowInstruction::Branch {
                condition: Value::bool(false),
            }
        );
    }

    #[test]
    fn test_flow_instruction_display() {
        assert_eq!(
            FlowInstruction::Branch {
                condition: Value::bool(true),
            }
            .to_string(),
            "branch true"
        );
        assert_eq!(
            FlowInstruction::Switch {
                selector: Value::int(3),
            }
            .to_string(),
            "switch 3"
        );
    }

    #[test]
    fn test_to_dot_lists_nodes_and_edges() {
        let graph = make_graph(2, &[(0, 1)]);
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph flow {"));
        assert!(dot.contains("n0 ->"));
        assert!(dot.contains("label=\"next\""));
    }
}
