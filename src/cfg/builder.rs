//! Flow graph construction from the front-end's basic blocks.
//!
//! Construction runs in four steps:
//!
//! 1. Allocate one node per instruction, specializing `JumpIf` into
//!    [`FlowInstruction::Branch`] and `Switch` into
//!    [`FlowInstruction::Switch`], and record where each label lands.
//! 2. Wire edges: sequential fall-through inside a block, the block's
//!    successor list at its end, and label-resolved edges for transfers.
//! 3. Short-circuit every label and goto node out of the graph, so each
//!    residual edge carries real control flow.
//! 4. Resolve the entry node through the short-circuit forwarding, seed the
//!    dominator and reachability sets, and verify the whole graph is
//!    reachable from the entry.

use std::collections::HashMap;

use crate::cfg::{EdgeKind, FlowGraph, FlowInstruction, NodeId, Procedure};
use crate::ir::{Instruction, LabelId};
use crate::{Error, Result};

impl FlowGraph {
    /// Builds the flow graph of a procedure.
    ///
    /// Every instruction becomes one node. Labels and gotos are removed
    /// during construction; the returned graph contains only statements,
    /// branches, and switches, and its start node is the procedure entry
    /// after label resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] when the hand-off is malformed: an
    /// empty procedure or block, a block successor index past the block
    /// list, a duplicate or undefined label, a branch at a block end with no
    /// fall-through, an empty control transfer cycle, or instructions
    /// unreachable from the entry.
    pub fn from_procedure(procedure: &Procedure) -> Result<Self> {
        if procedure.blocks.is_empty() {
            return Err(Error::GraphError(format!(
                "procedure `{}` has no blocks",
                procedure.name
            )));
        }
        let mut graph = FlowGraph::new();
        let (block_nodes, labels) = create_nodes(&mut graph, procedure)?;
        wire_edges(&mut graph, procedure, &block_nodes, &labels)?;
        let start = short_circuit_transfers(&mut graph, block_nodes[0][0])?;
        graph.set_start(start);
        graph.recompute_sets();
        ensure_fully_reachable(&graph)?;
        Ok(graph)
    }
}

/// Allocates one node per instruction and records label positions.
fn create_nodes(
    graph: &mut FlowGraph,
    procedure: &Procedure,
) -> Result<(Vec<Vec<NodeId>>, HashMap<LabelId, NodeId>)> {
    let mut block_nodes = Vec::with_capacity(procedure.blocks.len());
    let mut labels = HashMap::new();
    for (block_index, block) in procedure.blocks.iter().enumerate() {
        if block.instructions.is_empty() {
            return Err(Error::GraphError(format!("block {block_index} is empty")));
        }
        for &succ in &block.successors {
            if succ >= procedure.blocks.len() {
                return Err(Error::GraphError(format!(
                    "block {block_index} lists successor {succ}, but the procedure has {} blocks",
                    procedure.blocks.len()
                )));
            }
        }
        let mut nodes = Vec::with_capacity(block.instructions.len());
        for instruction in &block.instructions {
            let payload = match instruction {
                Instruction::JumpIf { condition, .. } => FlowInstruction::Branch {
                    condition: condition.clone(),
                },
                Instruction::Switch { selector, .. } => FlowInstruction::Switch {
                    selector: selector.clone(),
                },
                other => FlowInstruction::Statement(other.clone()),
            };
            let id = graph.add_node(payload);
            if let Instruction::Label(label) = instruction {
                if labels.insert(*label, id).is_some() {
                    return Err(Error::GraphError(format!("label {label} is defined twice")));
                }
            }
            nodes.push(id);
        }
        block_nodes.push(nodes);
    }
    Ok((block_nodes, labels))
}

/// Wires sequential, fall-through, and label-resolved edges.
fn wire_edges(
    graph: &mut FlowGraph,
    procedure: &Procedure,
    block_nodes: &[Vec<NodeId>],
    labels: &HashMap<LabelId, NodeId>,
) -> Result<()> {
    let resolve = |label: &LabelId| -> Result<NodeId> {
        labels
            .get(label)
            .copied()
            .ok_or_else(|| Error::GraphError(format!("jump to undefined label {label}")))
    };
    for (block_index, block) in procedure.blocks.iter().enumerate() {
        for (position, instruction) in block.instructions.iter().enumerate() {
            let node = block_nodes[block_index][position];
            // The next node in stream order: the following instruction, or
            // the first instruction of each successor block at the block end.
            let fall_through: Vec<NodeId> = if position + 1 < block.instructions.len() {
                vec![block_nodes[block_index][position + 1]]
            } else {
                block
                    .successors
                    .iter()
                    .map(|&succ| block_nodes[succ][0])
                    .collect()
            };
            match instruction {
                Instruction::Assign { .. } | Instruction::Call(_) | Instruction::Label(_) => {
                    for target in fall_through {
                        graph.link(node, target, EdgeKind::Unconditional);
                    }
                }
                Instruction::Goto(label) => {
                    graph.link(node, resolve(label)?, EdgeKind::Unconditional);
                }
                Instruction::JumpIf { target, .. } => {
                    graph.link(node, resolve(target)?, EdgeKind::BranchTrue);
                    if fall_through.is_empty() {
                        return Err(Error::GraphError(format!(
                            "branch at the end of block {block_index} has no fall-through"
                        )));
                    }
                    for target in fall_through {
                        graph.link(node, target, EdgeKind::BranchFalse);
                    }
                }
                Instruction::Switch { cases, default, .. } => {
                    for (value, label) in cases {
                        graph.link(node, resolve(label)?, EdgeKind::Case(*value));
                    }
                    graph.link(node, resolve(default)?, EdgeKind::Default);
                }
                Instruction::Return(_) => {}
            }
        }
    }
    Ok(())
}

fn is_transfer_marker(instruction: &FlowInstruction) -> bool {
    matches!(
        instruction.as_statement(),
        Some(Instruction::Label(_) | Instruction::Goto(_))
    )
}

/// Removes every label and goto node, redirecting predecessors to the node's
/// sole successor. Returns the procedure entry resolved through the removals.
fn short_circuit_transfers(graph: &mut FlowGraph, entry: NodeId) -> Result<NodeId> {
    let mut forward: HashMap<NodeId, NodeId> = HashMap::new();
    loop {
        let Some(node) = graph
            .node_ids()
            .find(|&id| is_transfer_marker(graph.instruction(id)))
        else {
            break;
        };
        let Some(target) = graph.single_successor(node) else {
            return Err(Error::GraphError(format!(
                "transfer node {node} has {} successors, expected one",
                graph.successors(node).len()
            )));
        };
        if target == node {
            return Err(Error::GraphError(format!(
                "control transfer cycle at {node} contains no instructions"
            )));
        }
        let preds: Vec<NodeId> = graph.predecessors(node).iter().copied().collect();
        for pred in preds {
            graph.retarget(pred, node, target);
        }
        graph.unlink(node, target);
        graph.mark_removed(node);
        forward.insert(node, target);
    }
    let mut start = entry;
    while let Some(&next) = forward.get(&start) {
        start = next;
    }
    Ok(start)
}

/// Rejects graphs with instructions the entry cannot reach.
fn ensure_fully_reachable(graph: &FlowGraph) -> Result<()> {
    let start = graph.start();
    for node in graph.node_ids() {
        if node != start && !graph.reaches(start, node) {
            return Err(Error::GraphError(format!(
                "node {node} is unreachable from the procedure entry"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::BasicBlock;
    use crate::ir::{Location, TypeRef, Value, Variable};

    fn var(index: u32) -> Variable {
        Variable::local(index, TypeRef::Int)
    }

    fn assign(index: u32, value: i64) -> Instruction {
        Instruction::Assign {
            target: Location::Variable(var(index)),
            value: Value::int(value),
        }
    }

    fn condition() -> Value {
        Value::Variable(Variable::local(9, TypeRef::Bool))
    }

    fn single_block(instructions: Vec<Instruction>) -> Procedure {
        Procedure::new(
            "test",
            vec![],
            TypeRef::Void,
            vec![BasicBlock::new(instructions, vec![])],
        )
    }

    fn statement_of(graph: &FlowGraph, id: NodeId) -> &Instruction {
        graph.instruction(id).as_statement().unwrap()
    }

    #[test]
    fn test_linear_block() {
        let graph = FlowGraph::from_procedure(&single_block(vec![
            assign(0, 1),
            assign(1, 2),
            Instruction::Return(None),
        ]))
        .unwrap();
        assert_eq!(graph.node_count(), 3);
        let start = graph.start();
        assert_eq!(statement_of(&graph, start), &assign(0, 1));
        let mid = graph.single_successor(start).unwrap();
        assert_eq!(graph.edge_kind(start, mid), Some(EdgeKind::Unconditional));
        let end = graph.single_successor(mid).unwrap();
        assert_eq!(statement_of(&graph, end), &Instruction::Return(None));
        assert!(graph.successors(end).is_empty());
    }

    #[test]
    fn test_blocks_fall_through_to_successors() {
        let procedure = Procedure::new(
            "test",
            vec![],
            TypeRef::Void,
            vec![
                BasicBlock::new(vec![assign(0, 1)], vec![1]),
                BasicBlock::new(vec![Instruction::Return(None)], vec![]),
            ],
        );
        let graph = FlowGraph::from_procedure(&procedure).unwrap();
        assert_eq!(graph.node_count(), 2);
        let end = graph.single_successor(graph.start()).unwrap();
        assert_eq!(statement_of(&graph, end), &Instruction::Return(None));
    }

    #[test]
    fn test_branch_short_circuits_labels_and_gotos() {
        let then_label = LabelId::new(0);
        let end_label = LabelId::new(1);
        let graph = FlowGraph::from_procedure(&single_block(vec![
            Instruction::JumpIf {
                condition: condition(),
                target: then_label,
            },
            assign(0, 2),
            Instruction::Goto(end_label),
            Instruction::Label(then_label),
            assign(0, 3),
            Instruction::Label(end_label),
            Instruction::Return(None),
        ]))
        .unwrap();

        // branch, both assignments, return
        assert_eq!(graph.node_count(), 4);
        for node in graph.node_ids() {
            assert!(
                !is_transfer_marker(graph.instruction(node)),
                "{node} still carries a label or goto"
            );
        }
        let start = graph.start();
        assert!(graph.instruction(start).condition().is_some());
        let successors = graph.successors(start);
        assert_eq!(successors.len(), 2);
        assert_eq!(successors[0].1, EdgeKind::BranchTrue);
        assert_eq!(successors[1].1, EdgeKind::BranchFalse);
        let taken = successors[0].0;
        let fallen = successors[1].0;
        assert_eq!(statement_of(&graph, taken), &assign(0, 3));
        assert_eq!(statement_of(&graph, fallen), &assign(0, 2));
        // Both arms rejoin at the return.
        assert_eq!(graph.single_successor(taken), graph.single_successor(fallen));
    }

    #[test]
    fn test_loop_at_entry_resolves_start() {
        let head = LabelId::new(0);
        let graph = FlowGraph::from_procedure(&single_block(vec![
            Instruction::Label(head),
            assign(0, 1),
            Instruction::JumpIf {
                condition: condition(),
                target: head,
            },
            Instruction::Return(None),
        ]))
        .unwrap();
        let start = graph.start();
        assert_eq!(statement_of(&graph, start), &assign(0, 1));
        // The back edge lands on the resolved entry.
        assert!(!graph.predecessors(start).is_empty());
        assert!(graph.reaches(start, start));
        assert!(graph.dominates(start, start));
    }

    #[test]
    fn test_switch_edges_keep_case_order() {
        let case_a = LabelId::new(0);
        let case_b = LabelId::new(1);
        let end = LabelId::new(2);
        let procedure = Procedure::new(
            "test",
            vec![],
            TypeRef::Void,
            vec![
                BasicBlock::new(
                    vec![Instruction::Switch {
                        selector: Value::Variable(var(0)),
                        cases: vec![(4, case_a), (7, case_b)],
                        default: end,
                    }],
                    vec![],
                ),
                BasicBlock::new(
                    vec![Instruction::Label(case_a), Instruction::Goto(end)],
                    vec![],
                ),
                BasicBlock::new(
                    vec![Instruction::Label(case_b), Instruction::Goto(end)],
                    vec![],
                ),
                BasicBlock::new(
                    vec![Instruction::Label(end), Instruction::Return(None)],
                    vec![],
                ),
            ],
        );
        let graph = FlowGraph::from_procedure(&procedure).unwrap();
        let start = graph.start();
        assert!(graph.instruction(start).selector().is_some());
        let kinds: Vec<EdgeKind> = graph.successors(start).iter().map(|&(_, k)| k).collect();
        assert_eq!(
            kinds,
            vec![EdgeKind::Case(4), EdgeKind::Case(7), EdgeKind::Default]
        );
        // All three arms collapse onto the return node.
        let targets: Vec<NodeId> = graph.successors(start).iter().map(|&(t, _)| t).collect();
        assert!(targets.iter().all(|&t| t == targets[0]));
        assert_eq!(statement_of(&graph, targets[0]), &Instruction::Return(None));
    }

    #[test]
    fn test_out_of_range_successor_rejected() {
        let procedure = Procedure::new(
            "test",
            vec![],
            TypeRef::Void,
            vec![BasicBlock::new(vec![Instruction::Return(None)], vec![3])],
        );
        assert!(matches!(
            FlowGraph::from_procedure(&procedure),
            Err(Error::GraphError(_))
        ));
    }

    #[test]
    fn test_undefined_label_rejected() {
        let result = FlowGraph::from_procedure(&single_block(vec![
            Instruction::Goto(LabelId::new(5)),
            Instruction::Return(None),
        ]));
        assert!(matches!(result, Err(Error::GraphError(_))));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let label = LabelId::new(0);
        let result = FlowGraph::from_procedure(&single_block(vec![
            Instruction::Label(label),
            assign(0, 1),
            Instruction::Label(label),
            Instruction::Return(None),
        ]));
        assert!(matches!(result, Err(Error::GraphError(_))));
    }

    #[test]
    fn test_unreachable_code_rejected() {
        let procedure = Procedure::new(
            "test",
            vec![],
            TypeRef::Void,
            vec![
                BasicBlock::new(vec![Instruction::Return(None)], vec![]),
                BasicBlock::new(vec![Instruction::Return(None)], vec![]),
            ],
        );
        assert!(matches!(
            FlowGraph::from_procedure(&procedure),
            Err(Error::GraphError(_))
        ));
    }

    #[test]
    fn test_empty_block_rejected() {
        let procedure = Procedure::new(
            "test",
            vec![],
            TypeRef::Void,
            vec![BasicBlock::new(vec![], vec![])],
        );
        assert!(matches!(
            FlowGraph::from_procedure(&procedure),
            Err(Error::GraphError(_))
        ));
    }

    #[test]
    fn test_empty_transfer_cycle_rejected() {
        let label = LabelId::new(0);
        let result = FlowGraph::from_procedure(&single_block(vec![
            Instruction::Label(label),
            Instruction::Goto(label),
        ]));
        assert!(matches!(result, Err(Error::GraphError(_))));
    }

    #[test]
    fn test_branch_without_fall_through_rejected() {
        let label = LabelId::new(0);
        let procedure = Procedure::new(
            "test",
            vec![],
            TypeRef::Void,
            vec![
                BasicBlock::new(
                    vec![Instruction::JumpIf {
                        condition: condition(),
                        target: label,
                    }],
                    vec![],
                ),
                BasicBlock::new(
                    vec![Instruction::Label(label), Instruction::Return(None)],
                    vec![],
                ),
            ],
        );
        assert!(matches!(
            FlowGraph::from_procedure(&procedure),
            Err(Error::GraphError(_))
        ));
    }

    #[test]
    fn test_diamond_dominators_from_procedure() {
        let then_label = LabelId::new(0);
        let end_label = LabelId::new(1);
        let graph = FlowGraph::from_procedure(&single_block(vec![
            Instruction::JumpIf {
                condition: condition(),
                target: then_label,
            },
            assign(0, 1),
            Instruction::Goto(end_label),
            Instruction::Label(then_label),
            assign(0, 2),
            Instruction::Label(end_label),
            Instruction::Return(None),
        ]))
        .unwrap();
        let start = graph.start();
        let join = graph
            .node_ids()
            .find(|&id| graph.instruction(id).as_statement() == Some(&Instruction::Return(None)))
            .unwrap();
        assert!(graph.dominates(start, join));
        for &(arm, _) in graph.successors(start) {
            assert!(!graph.dominates(arm, join));
        }
    }
}
