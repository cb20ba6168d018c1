//! Label resolution and the final peephole.
//!
//! Two sweeps over the raw buffer:
//! 1. drop every `Label` pseudo-instruction, elide strictly-adjacent
//!    `Push`/`Pop` pairs, and rewrite `Push(_)` followed by `Exchange(x)`
//!    into a bare `Push(x)`;
//! 2. map every jump target from label id to absolute offset and compact.
//!
//! A label sitting between two peephole candidates blocks the elision: the
//! second instruction is a jump target and must survive.

use std::collections::HashMap;

use tokar_bytecode::{Addr, Instr, Program};

pub(crate) fn resolve(mut buffer: Vec<Instr>) -> Program {
    let n = buffer.len();
    let mut keep = vec![true; n];

    for (i, instr) in buffer.iter().enumerate() {
        if matches!(instr, Instr::Label(_)) {
            keep[i] = false;
        }
    }

    // Peephole over strictly adjacent kept pairs.
    for i in 0..n.saturating_sub(1) {
        let j = i + 1;
        if !keep[i] || !keep[j] {
            continue;
        }
        match (&buffer[i], &buffer[j]) {
            (Instr::Push(_), Instr::Pop) => {
                keep[i] = false;
                keep[j] = false;
            }
            (Instr::Push(_), Instr::Exchange(_)) => {
                let Instr::Exchange(x) = buffer[j].clone() else {
                    unreachable!()
                };
                buffer[j] = Instr::Push(x);
                keep[i] = false;
            }
            _ => {}
        }
    }

    // Compacted offset of each original position.
    let mut new_index = vec![0u32; n + 1];
    let mut count = 0u32;
    for i in 0..n {
        new_index[i] = count;
        if keep[i] {
            count += 1;
        }
    }
    new_index[n] = count;

    // A label resolves to the first surviving instruction at or after it.
    let mut labels: HashMap<Addr, Addr> = HashMap::new();
    for (i, instr) in buffer.iter().enumerate() {
        if let Instr::Label(l) = instr {
            labels.insert(*l, new_index[i]);
        }
    }

    let mut out = Vec::with_capacity(count as usize);
    for (i, mut instr) in buffer.into_iter().enumerate() {
        if !keep[i] {
            continue;
        }
        instr.rewrite_targets(|l| *labels.get(&l).expect("jump to an unresolved label"));
        out.push(instr);
    }
    Program::new(out)
}
