//! The structural recovery driver.
//!
//! Runs the recovery passes over a stabilized flow graph in their fixed
//! order: loops, conditionals, sequences, labelled blocks, then break and
//! continue discovery. Loop and conditional recovery recurse into freshly
//! created sub-bodies on their own; the driver itself runs each pass
//! exactly once. Afterwards every flow graph node belongs to exactly one
//! structure node, which the final partition check enforces.

use crate::cfg::FlowGraph;
use crate::structure::blocks::recover_blocks;
use crate::structure::breaks::{discover_jumps, JumpTable};
use crate::structure::conditionals::recover_conditionals;
use crate::structure::loops::recover_loops;
use crate::structure::sequences::recover_sequences;
use crate::structure::set::StructureTree;
use crate::Result;

/// Recovers the full structure tree of `graph`.
///
/// Dispatch synthesis for multi-entry loops adds nodes to the graph, which
/// is why the graph is taken mutably; no edges of the original program are
/// otherwise changed.
///
/// # Errors
///
/// Returns [`crate::Error::StructuralInvariant`] when a recovery pass
/// breaks the tree partition invariant or a loop keeps several entries
/// after dispatch synthesis.
pub fn recover_structure(graph: &mut FlowGraph) -> Result<(StructureTree, JumpTable)> {
    let mut tree = StructureTree::new(graph.node_ids().collect());
    recover_loops(graph, &mut tree)?;
    recover_conditionals(graph, &mut tree)?;
    recover_sequences(graph, &mut tree)?;
    recover_blocks(graph, &mut tree)?;
    let jumps = discover_jumps(graph, &tree);
    tree.check_partition()?;
    Ok((tree, jumps))
}
