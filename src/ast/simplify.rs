//! Iterative AST simplification and label resolution.
//!
//! [`simplify`] rewrites the freshly built tree until nothing changes:
//! nested one-armed conditionals fold into a conjoined condition, a loop's
//! leading break guard folds into the loop condition, redundant trailing
//! jumps disappear, and labelled blocks whose label nothing references are
//! spliced away. A final pass resolves jump labels: a break or continue
//! aimed at its innermost enclosing target loses the label, and only
//! structures still referenced by name keep theirs.

use std::collections::HashSet;

use crate::ast::node::AstNode;
use crate::ir::{BinaryOp, Literal, Value};

/// Simplifies `ast` to a fixed point and resolves jump labels.
#[must_use]
pub fn simplify(ast: AstNode) -> AstNode {
    let mut current = ast;
    loop {
        let next = simplify_node(&current);
        if next == current {
            break;
        }
        current = next;
    }
    resolve_labels(current)
}

fn simplify_node(node: &AstNode) -> AstNode {
    match node {
        AstNode::Sequence(body) => AstNode::Sequence(simplify_list(body)),
        AstNode::If { condition, body } => {
            let body = simplify_list(body);
            // One-armed conditional directly inside another folds into a
            // single conjoined guard.
            if let [AstNode::If {
                condition: inner,
                body: inner_body,
            }] = body.as_slice()
            {
                return AstNode::If {
                    condition: conjoin(condition.clone(), inner.clone()),
                    body: inner_body.clone(),
                };
            }
            AstNode::If {
                condition: condition.clone(),
                body,
            }
        }
        AstNode::IfElse {
            condition,
            then_body,
            else_body,
        } => {
            let then_body = simplify_list(then_body);
            let else_body = simplify_list(else_body);
            if else_body.is_empty() {
                return AstNode::If {
                    condition: condition.clone(),
                    body: then_body,
                };
            }
            if then_body.is_empty() {
                return AstNode::If {
                    condition: condition.negated(),
                    body: else_body,
                };
            }
            AstNode::IfElse {
                condition: condition.clone(),
                then_body,
                else_body,
            }
        }
        AstNode::Loop {
            label,
            needs_label,
            condition,
            body,
        } => {
            let mut body = simplify_list(body);
            let mut condition = condition.clone();
            // A loop that opens with "if (g) break me" is a while loop in
            // disguise; the guard's negation joins the condition.
            let guard_negation = leading_break_guard(&body, *label).map(Value::negated);
            if let Some(negation) = guard_negation {
                body.remove(0);
                condition = conjoin(condition, negation);
            }
            if matches!(body.last(), Some(AstNode::Continue(Some(target))) if target == label) {
                body.pop();
            }
            AstNode::Loop {
                label: *label,
                needs_label: *needs_label,
                condition,
                body,
            }
        }
        AstNode::LabelledBlock {
            label,
            needs_label,
            body,
        } => {
            let mut body = simplify_list(body);
            strip_tail_breaks(&mut body, *label);
            if let Some(guard) = leading_break_guard(&body, *label) {
                let rest = &body[1..];
                if !references_label(rest, *label) {
                    return AstNode::If {
                        condition: guard.negated(),
                        body: rest.to_vec(),
                    };
                }
            }
            if !references_label(&body, *label) {
                return AstNode::Sequence(body);
            }
            AstNode::LabelledBlock {
                label: *label,
                needs_label: *needs_label,
                body,
            }
        }
        leaf => leaf.clone(),
    }
}

/// Simplifies every node of a body, splicing nested sequences and
/// dropping conditionals that guard nothing.
fn simplify_list(body: &[AstNode]) -> Vec<AstNode> {
    let mut out = Vec::with_capacity(body.len());
    for node in body {
        match simplify_node(node) {
            AstNode::Sequence(inner) => out.extend(inner),
            AstNode::If { condition, body } if body.is_empty() && !has_calls(&condition) => {}
            other => out.push(other),
        }
    }
    out
}

/// Returns the guard condition when `body` opens with "if (g) break label".
fn leading_break_guard(body: &[AstNode], label: u32) -> Option<&Value> {
    let AstNode::If {
        condition,
        body: guard_body,
    } = body.first()?
    else {
        return None;
    };
    match guard_body.as_slice() {
        [AstNode::Break(Some(target))] if *target == label => Some(condition),
        _ => None,
    }
}

/// Removes breaks of `label` sitting in tail position: the last node of the
/// body, or the tails of a trailing conditional. Control reaches the same
/// point without them.
fn strip_tail_breaks(body: &mut Vec<AstNode>, label: u32) {
    match body.last_mut() {
        Some(AstNode::Break(Some(target))) if *target == label => {
            body.pop();
        }
        Some(AstNode::IfElse {
            then_body,
            else_body,
            ..
        }) => {
            strip_tail_breaks(then_body, label);
            strip_tail_breaks(else_body, label);
        }
        Some(AstNode::If { body: arm, .. }) if arm.len() > 1 => {
            strip_tail_breaks(arm, label);
        }
        _ => {}
    }
}

/// Returns `true` when any jump in `body` references `label`.
fn references_label(body: &[AstNode], label: u32) -> bool {
    body.iter().any(|node| {
        let mut found = false;
        node.for_each(&mut |child| {
            if matches!(
                child,
                AstNode::Break(Some(target)) | AstNode::Continue(Some(target)) if *target == label
            ) {
                found = true;
            }
        });
        found
    })
}

fn conjoin(left: Value, right: Value) -> Value {
    if matches!(left, Value::Literal(Literal::Bool(true))) {
        return right;
    }
    if matches!(right, Value::Literal(Literal::Bool(true))) {
        return left;
    }
    Value::binary(BinaryOp::And, left, right)
}

fn has_calls(value: &Value) -> bool {
    let mut calls = Vec::new();
    value.collect_calls(&mut calls);
    !calls.is_empty()
}

/// Resolves jump labels across the finished tree.
///
/// Jumps aimed at their innermost enclosing target drop the label; every
/// structure still referenced by name keeps `needs_label`.
fn resolve_labels(ast: AstNode) -> AstNode {
    let mut needed = HashSet::new();
    collect_needed(&ast, None, None, &mut needed);
    apply_labels(ast, None, None, &needed)
}

fn collect_needed(
    node: &AstNode,
    break_target: Option<u32>,
    continue_target: Option<u32>,
    needed: &mut HashSet<u32>,
) {
    match node {
        AstNode::Break(Some(label)) if break_target != Some(*label) => {
            needed.insert(*label);
        }
        AstNode::Continue(Some(label)) if continue_target != Some(*label) => {
            needed.insert(*label);
        }
        AstNode::Sequence(body) | AstNode::If { body, .. } => {
            for child in body {
                collect_needed(child, break_target, continue_target, needed);
            }
        }
        AstNode::IfElse {
            then_body,
            else_body,
            ..
        } => {
            for child in then_body.iter().chain(else_body) {
                collect_needed(child, break_target, continue_target, needed);
            }
        }
        AstNode::Loop { label, body, .. } => {
            for child in body {
                collect_needed(child, Some(*label), Some(*label), needed);
            }
        }
        AstNode::LabelledBlock { label, body, .. } => {
            for child in body {
                collect_needed(child, Some(*label), continue_target, needed);
            }
        }
        _ => {}
    }
}

fn apply_labels(
    node: AstNode,
    break_target: Option<u32>,
    continue_target: Option<u32>,
    needed: &HashSet<u32>,
) -> AstNode {
    match node {
        AstNode::Break(Some(label)) if break_target == Some(label) => AstNode::Break(None),
        AstNode::Continue(Some(label)) if continue_target == Some(label) => {
            AstNode::Continue(None)
        }
        AstNode::Sequence(body) => AstNode::Sequence(
            body.into_iter()
                .map(|child| apply_labels(child, break_target, continue_target, needed))
                .collect(),
        ),
        AstNode::If { condition, body } => AstNode::If {
            condition,
            body: body
                .into_iter()
                .map(|child| apply_labels(child, break_target, continue_target, needed))
                .collect(),
        },
        AstNode::IfElse {
            condition,
            then_body,
            else_body,
        } => AstNode::IfElse {
            condition,
            then_body: then_body
                .into_iter()
                .map(|child| apply_labels(child, break_target, continue_target, needed))
                .collect(),
            else_body: else_body
                .into_iter()
                .map(|child| apply_labels(child, break_target, continue_target, needed))
                .collect(),
        },
        AstNode::Loop {
            label,
            condition,
            body,
            ..
        } => AstNode::Loop {
            label,
            needs_label: needed.contains(&label),
            condition,
            body: body
                .into_iter()
                .map(|child| apply_labels(child, Some(label), Some(label), needed))
                .collect(),
        },
        AstNode::LabelledBlock { label, body, .. } => AstNode::LabelledBlock {
            label,
            needs_label: needed.contains(&label),
            body: body
                .into_iter()
                .map(|child| apply_labels(child, Some(label), continue_target, needed))
                .collect(),
        },
        leaf => leaf,
    }
}
