//! Lowering the structure tree to the AST.
//!
//! Each region of the tree lowers its siblings in the topological order
//! computed during labelled-block synthesis, so statements come out in
//! execution order and a sibling's fall-through edge is simply the next
//! entry of the list. Edges the [`JumpTable`] classifies become `break`
//! and `continue` nodes; a bare branch becomes an `if` around its jump; a
//! switch becomes a chain of selector comparisons whose arms either jump
//! or inline the sibling run only that case can reach.

use std::collections::HashSet;

use crate::ast::node::AstNode;
use crate::cfg::{EdgeKind, FlowGraph, FlowInstruction, NodeId};
use crate::ir::{BinaryOp, Instruction, Value};
use crate::structure::{
    sibling_graph, Jump, JumpKind, JumpTable, SetId, SetKind, Sibling, SiblingGraph,
    StructureTree,
};
use crate::{Error, Result};

/// Lowers the recovered structure of a procedure into an AST.
///
/// # Errors
///
/// Returns [`Error::UnsupportedConstruct`] when a residual edge is neither
/// fall-through nor a classified jump, and
/// [`crate::Error::StructuralInvariant`] when the tree shape contradicts
/// the graph (a branch without its condition, a conditional arm missing
/// from the partition).
pub fn build_ast(graph: &FlowGraph, tree: &StructureTree, jumps: &JumpTable) -> Result<AstNode> {
    let lowering = Lowering { graph, tree, jumps };
    let root = tree.root();
    let region = tree.node(root).sub_bodies()[0].clone();
    Ok(AstNode::Sequence(lowering.region(root, &region)?))
}

struct Lowering<'a> {
    graph: &'a FlowGraph,
    tree: &'a StructureTree,
    jumps: &'a JumpTable,
}

impl Lowering<'_> {
    fn region(&self, owner: SetId, region: &HashSet<NodeId>) -> Result<Vec<AstNode>> {
        let siblings = sibling_graph(self.graph, self.tree, owner, region);
        let mut consumed = vec![false; siblings.order.len()];
        let mut out = Vec::new();
        for position in 0..siblings.order.len() {
            if consumed[position] {
                continue;
            }
            self.position(&siblings, position, &mut consumed, &mut out)?;
        }
        Ok(out)
    }

    fn position(
        &self,
        siblings: &SiblingGraph,
        position: usize,
        consumed: &mut [bool],
        out: &mut Vec<AstNode>,
    ) -> Result<()> {
        consumed[position] = true;
        match siblings.order[position] {
            Sibling::Structure(child) => self.structure(child, out),
            Sibling::Bare(node) => self.bare(siblings, position, node, consumed, out),
        }
    }

    fn structure(&self, child: SetId, out: &mut Vec<AstNode>) -> Result<()> {
        let node = self.tree.node(child);
        match node.kind().clone() {
            SetKind::Root => Err(structural_error!("the root is not a child structure")),
            SetKind::Sequence => self.sequence(child, out),
            SetKind::If {
                branch,
                arm,
                inverted,
            } => {
                let condition = self.branch_condition(branch)?;
                let condition = if inverted { condition.negated() } else { condition };
                let arm_region = self.sub_body_containing(child, arm)?;
                let body = self.region(child, &arm_region)?;
                out.push(AstNode::If { condition, body });
                Ok(())
            }
            SetKind::IfElse {
                branch,
                then_entry,
                else_entry,
            } => {
                let condition = self.branch_condition(branch)?;
                let then_region = self.sub_body_containing(child, then_entry)?;
                let else_region = self.sub_body_containing(child, else_entry)?;
                out.push(AstNode::IfElse {
                    condition,
                    then_body: self.region(child, &then_region)?,
                    else_body: self.region(child, &else_region)?,
                });
                Ok(())
            }
            SetKind::Loop { label, .. } => {
                let body_region = self.whole_sub_body(child)?;
                let body = self.region(child, &body_region)?;
                out.push(AstNode::Loop {
                    label,
                    needs_label: true,
                    condition: Value::bool(true),
                    body,
                });
                Ok(())
            }
            SetKind::LabelledBlock { label, .. } => {
                let body_region = self.whole_sub_body(child)?;
                let body = self.region(child, &body_region)?;
                out.push(AstNode::LabelledBlock {
                    label,
                    needs_label: true,
                    body,
                });
                Ok(())
            }
        }
    }

    /// Lowers a statement chain in execution order, with a trailing jump
    /// when the chain's exit edge is classified.
    fn sequence(&self, child: SetId, out: &mut Vec<AstNode>) -> Result<()> {
        let body = self.tree.node(child).body();
        let head = body
            .iter()
            .copied()
            .filter(|&member| {
                self.graph
                    .predecessors(member)
                    .iter()
                    .all(|pred| !body.contains(pred))
            })
            .min()
            .ok_or_else(|| structural_error!("sequence {child} has no chain head"))?;

        let mut current = head;
        loop {
            self.statement(current, out)?;
            match self.graph.single_successor(current) {
                Some(next) if body.contains(&next) => current = next,
                _ => break,
            }
        }
        if let Some(jump) = self.jump_after(current) {
            out.push(jump);
        }
        Ok(())
    }

    fn bare(
        &self,
        siblings: &SiblingGraph,
        position: usize,
        node: NodeId,
        consumed: &mut [bool],
        out: &mut Vec<AstNode>,
    ) -> Result<()> {
        match self.graph.instruction(node) {
            FlowInstruction::Statement(_) => {
                self.statement(node, out)?;
                if let Some(jump) = self.jump_after(node) {
                    out.push(jump);
                }
                Ok(())
            }
            FlowInstruction::Branch { condition } => {
                let (taken, fallthrough) = self.branch_targets(node)?;
                let taken_jump = self.jumps.get(node, taken);
                let fall_jump = self.jumps.get(node, fallthrough);
                match (taken_jump, fall_jump) {
                    (Some(jump), None) => {
                        out.push(AstNode::If {
                            condition: condition.clone(),
                            body: vec![jump_node(jump)],
                        });
                        Ok(())
                    }
                    (None, Some(jump)) => {
                        out.push(AstNode::If {
                            condition: condition.negated(),
                            body: vec![jump_node(jump)],
                        });
                        Ok(())
                    }
                    (Some(taken_jump), Some(fall_jump)) => {
                        out.push(AstNode::If {
                            condition: condition.clone(),
                            body: vec![jump_node(taken_jump)],
                        });
                        out.push(jump_node(fall_jump));
                        Ok(())
                    }
                    (None, None) => Err(Error::UnsupportedConstruct {
                        message: format!(
                            "branch {node} was claimed by no structure and jumps nowhere"
                        ),
                    }),
                }
            }
            FlowInstruction::Switch { selector } => {
                let selector = selector.clone();
                self.switch(siblings, position, node, &selector, consumed, out)
            }
        }
    }

    /// Lowers a switch into a chain of selector comparisons.
    fn switch(
        &self,
        siblings: &SiblingGraph,
        position: usize,
        node: NodeId,
        selector: &Value,
        consumed: &mut [bool],
        out: &mut Vec<AstNode>,
    ) -> Result<()> {
        let mut cases: Vec<(i64, Vec<AstNode>)> = Vec::new();
        let mut default_arm: Vec<AstNode> = Vec::new();
        for &(target, kind) in self.graph.successors(node) {
            let arm = self.switch_arm(siblings, position, node, target, consumed)?;
            match kind {
                EdgeKind::Case(value) => cases.push((value, arm)),
                EdgeKind::Default => default_arm = arm,
                _ => {
                    return Err(structural_error!(
                        "switch {node} carries a {kind:?} edge"
                    ));
                }
            }
        }

        let mut chain = default_arm;
        for (value, arm) in cases.into_iter().rev() {
            let condition = Value::binary(BinaryOp::Eq, selector.clone(), Value::int(value));
            chain = vec![if chain.is_empty() {
                AstNode::If {
                    condition,
                    body: arm,
                }
            } else {
                AstNode::IfElse {
                    condition,
                    then_body: arm,
                    else_body: chain,
                }
            }];
        }
        out.extend(chain);
        Ok(())
    }

    /// Lowers one switch arm: a classified jump, or the inlined run of
    /// siblings only this case can reach.
    fn switch_arm(
        &self,
        siblings: &SiblingGraph,
        switch_position: usize,
        switch_node: NodeId,
        target: NodeId,
        consumed: &mut [bool],
    ) -> Result<Vec<AstNode>> {
        if let Some(jump) = self.jumps.get(switch_node, target) {
            return Ok(vec![jump_node(jump)]);
        }
        let Some(start) = siblings.position_of(target) else {
            return Err(Error::UnsupportedConstruct {
                message: format!("switch target {target} leaves its region without a jump"),
            });
        };

        let mut arm = Vec::new();
        let mut in_run: HashSet<usize> = HashSet::new();
        let mut current = start;
        loop {
            let shared = siblings.preds[current]
                .iter()
                .any(|pred| *pred != switch_position && !in_run.contains(pred));
            if shared || consumed[current] {
                if in_run.is_empty() {
                    return Err(Error::UnsupportedConstruct {
                        message: format!(
                            "switch target {target} is reachable from outside its case"
                        ),
                    });
                }
                break;
            }
            in_run.insert(current);
            self.position(siblings, current, consumed, &mut arm)?;
            let next = siblings.succs[current]
                .iter()
                .copied()
                .filter(|&succ| succ > current && !in_run.contains(&succ))
                .min();
            match next {
                Some(succ) => current = succ,
                None => break,
            }
        }
        Ok(arm)
    }

    fn statement(&self, node: NodeId, out: &mut Vec<AstNode>) -> Result<()> {
        let Some(instruction) = self.graph.instruction(node).as_statement() else {
            return Err(structural_error!(
                "chain member {node} is not a statement"
            ));
        };
        match instruction {
            Instruction::Return(value) => out.push(AstNode::Return(value.clone())),
            other => out.push(AstNode::Statement(other.clone())),
        }
        Ok(())
    }

    /// The jump a node's sole out-edge lowers to, if it is classified.
    fn jump_after(&self, node: NodeId) -> Option<AstNode> {
        let succ = self.graph.single_successor(node)?;
        self.jumps.get(node, succ).map(jump_node)
    }

    fn branch_condition(&self, branch: NodeId) -> Result<Value> {
        self.graph
            .instruction(branch)
            .condition()
            .cloned()
            .ok_or_else(|| structural_error!("{branch} heads a conditional but is no branch"))
    }

    fn branch_targets(&self, branch: NodeId) -> Result<(NodeId, NodeId)> {
        let find = |kind: EdgeKind| {
            self.graph
                .successors(branch)
                .iter()
                .find(|&&(_, edge)| edge == kind)
                .map(|&(target, _)| target)
                .ok_or_else(|| structural_error!("branch {branch} lacks its {kind:?} edge"))
        };
        Ok((find(EdgeKind::BranchTrue)?, find(EdgeKind::BranchFalse)?))
    }

    fn sub_body_containing(&self, owner: SetId, member: NodeId) -> Result<HashSet<NodeId>> {
        self.tree
            .node(owner)
            .sub_bodies()
            .iter()
            .find(|sub_body| sub_body.contains(&member))
            .cloned()
            .ok_or_else(|| {
                structural_error!("no sub-body of {owner} contains its arm entry {member}")
            })
    }

    fn whole_sub_body(&self, owner: SetId) -> Result<HashSet<NodeId>> {
        match self.tree.node(owner).sub_bodies() {
            [body] => Ok(body.clone()),
            parts => Err(structural_error!(
                "{owner} should own a single sub-body, found {}",
                parts.len()
            )),
        }
    }
}

fn jump_node(jump: &Jump) -> AstNode {
    match jump.kind {
        JumpKind::Break => AstNode::Break(Some(jump.label)),
        JumpKind::Continue => AstNode::Continue(Some(jump.label)),
    }
}
