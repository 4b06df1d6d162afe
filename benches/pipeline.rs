use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shadelift::prelude::*;

/// A procedure with `chains` sequential counting loops, each followed by a
/// conditional store, exercising every pipeline stage: stack-temporary
/// inlining, dead-store elimination, loop and conditional recovery, and
/// simplification.
fn looping_procedure(chains: u32) -> Procedure {
    let mut blocks = Vec::new();
    for chain in 0..chains {
        let counter = Variable::local(chain, TypeRef::Int);
        let tmp = Variable::stack(chain, TypeRef::Int);
        let header = LabelId::new(chain * 2);
        let exit = LabelId::new(chain * 2 + 1);
        let next = blocks.len();

        // counter = 0
        blocks.push(BasicBlock::new(
            vec![Instruction::Assign {
                target: Location::Variable(counter.clone()),
                value: Value::int(0),
            }],
            vec![next + 1],
        ));
        // while (counter < 100) { counter = counter + 1 }
        blocks.push(BasicBlock::new(
            vec![
                Instruction::Label(header),
                Instruction::JumpIf {
                    condition: Value::binary(
                        BinaryOp::Ge,
                        Value::Variable(counter.clone()),
                        Value::int(100),
                    ),
                    target: exit,
                },
            ],
            vec![next + 2],
        ));
        blocks.push(BasicBlock::new(
            vec![
                Instruction::Assign {
                    target: Location::Variable(tmp.clone()),
                    value: Value::binary(
                        BinaryOp::Add,
                        Value::Variable(counter.clone()),
                        Value::int(1),
                    ),
                },
                Instruction::Assign {
                    target: Location::Variable(counter.clone()),
                    value: Value::Variable(tmp),
                },
                Instruction::Goto(header),
            ],
            vec![],
        ));
        // if (counter >= 100) { sink = counter }
        blocks.push(BasicBlock::new(
            vec![
                Instruction::Label(exit),
                Instruction::JumpIf {
                    condition: Value::binary(
                        BinaryOp::Lt,
                        Value::Variable(counter.clone()),
                        Value::int(100),
                    ),
                    target: LabelId::new(1000 + chain),
                },
            ],
            vec![next + 4],
        ));
        blocks.push(BasicBlock::new(
            vec![Instruction::Assign {
                target: Location::StaticField {
                    field: FieldRef::new("Globals", format!("sink{chain}"), TypeRef::Int),
                },
                value: Value::Variable(counter),
            }],
            vec![next + 5],
        ));
        blocks.push(BasicBlock::new(
            vec![Instruction::Label(LabelId::new(1000 + chain))],
            vec![next + 6],
        ));
    }
    blocks.push(BasicBlock::new(vec![Instruction::Return(None)], vec![]));
    Procedure::new("bench", vec![], TypeRef::Void, blocks)
}

fn bench_decompile(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    for chains in [1u32, 4, 16] {
        let procedure = looping_procedure(chains);
        group.bench_function(format!("decompile_{chains}_loops"), |b| {
            b.iter(|| decompile(black_box(&procedure), &NullOracle).unwrap());
        });
    }

    let batch: Vec<Procedure> = (0..32).map(|_| looping_procedure(4)).collect();
    let oracle = CachedOracle::new(NullOracle);
    group.bench_function("decompile_batch_32", |b| {
        b.iter(|| decompile_batch(black_box(&batch), &oracle));
    });
    group.finish();
}

criterion_group!(benches, bench_decompile);
criterion_main!(benches);
