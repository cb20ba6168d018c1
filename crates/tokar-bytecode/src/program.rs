//! Frozen instruction arrays.

use crate::instr::{Instr, InstrState};

/// A compiled, label-resolved instruction array.
///
/// The array itself is immutable after freezing; the only mutable spots are
/// the `RefCell` accumulators inside stateful instructions, whose positions
/// are indexed here at freeze time. Two disciplines keep those spots sound:
///
/// - [`Program::snapshot`] hands out a copy with fresh stateful
///   instructions, for overlapping runs of one compiled parser;
/// - [`Program::save_states`]/[`Program::restore_states`] drain and
///   reinstate every accumulator around a call activation, so recursive
///   entry into a loop instruction starts clean and returns to the caller's
///   state.
#[derive(Debug)]
pub struct Program {
    instrs: Box<[Instr]>,
    stateful: Box<[u32]>,
}

impl Program {
    /// Freeze an instruction array, indexing its stateful positions.
    pub fn new(instrs: Vec<Instr>) -> Program {
        let stateful = instrs
            .iter()
            .enumerate()
            .filter(|(_, instr)| instr.is_stateful())
            .map(|(i, _)| i as u32)
            .collect();
        Program {
            instrs: instrs.into_boxed_slice(),
            stateful,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    #[inline]
    pub fn instr(&self, pc: usize) -> &Instr {
        &self.instrs[pc]
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    /// Positions of the stateful instructions.
    pub fn stateful_positions(&self) -> &[u32] {
        &self.stateful
    }

    /// Copy with fresh state-bearing instructions.
    pub fn snapshot(&self) -> Program {
        let mut instrs = self.instrs.to_vec();
        for &pos in self.stateful.iter() {
            instrs[pos as usize] = instrs[pos as usize].fresh();
        }
        Program {
            instrs: instrs.into_boxed_slice(),
            stateful: self.stateful.clone(),
        }
    }

    /// Drain every stateful accumulator, returning the drained contents in
    /// position order.
    pub fn save_states(&self) -> Box<[InstrState]> {
        self.stateful
            .iter()
            .map(|&pos| self.instrs[pos as usize].save_state())
            .collect()
    }

    /// Reinstate accumulators drained by [`Program::save_states`].
    pub fn restore_states(&self, states: Box<[InstrState]>) {
        debug_assert_eq!(states.len(), self.stateful.len());
        for (&pos, state) in self.stateful.iter().zip(states.into_iter()) {
            self.instrs[pos as usize].restore_state(state);
        }
    }
}
