use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use replisim_core::types::{TransactionId, VariableId};
use replisim_core::{Operation, TransactionManager};

/// Build a workload of `transactions` overlapping transactions, each
/// reading and writing `footprint` replicated variables, committed in
/// begin order. Every commit runs both gates against all accumulated
/// site-side footprints, which is the simulator's hot path.
fn build_workload(transactions: usize, footprint: usize) -> Vec<Operation> {
    let even: Vec<VariableId> = VariableId::all().filter(|v| v.is_replicated()).collect();
    let mut ops = Vec::new();

    for t in 0..transactions {
        ops.push(Operation::Begin {
            tx: TransactionId::new(&format!("t{t}")),
        });
    }
    for t in 0..transactions {
        let tx = TransactionId::new(&format!("t{t}"));
        for e in 0..footprint {
            let read_var = even[(t + e) % even.len()];
            let write_var = even[(t + e + 1) % even.len()];
            ops.push(Operation::Read {
                tx: tx.clone(),
                variable: read_var,
            });
            ops.push(Operation::Write {
                tx: tx.clone(),
                variable: write_var,
                value: t as i64,
            });
        }
    }
    for t in 0..transactions {
        ops.push(Operation::End {
            tx: TransactionId::new(&format!("t{t}")),
        });
    }
    ops
}

fn run(ops: &[Operation]) -> usize {
    let mut tm = TransactionManager::new();
    let mut committed = 0;
    for op in ops {
        if tm.process_operation(op.clone(), false).is_ok() {
            committed += 1;
        }
    }
    committed
}

fn bench_commit(c: &mut Criterion) {
    let small = build_workload(4, 2);
    let medium = build_workload(16, 3);
    let large = build_workload(64, 4);

    let mut group = c.benchmark_group("commit_validation");
    group.bench_function("small", |b| b.iter(|| run(black_box(&small))));
    group.bench_function("medium", |b| b.iter(|| run(black_box(&medium))));
    group.bench_function("large", |b| b.iter(|| run(black_box(&large))));
    group.finish();
}

criterion_group!(benches, bench_commit);
criterion_main!(benches);
