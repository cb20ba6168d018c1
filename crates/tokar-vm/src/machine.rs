//! The dispatch loop and its stacks.
//!
//! Failure discipline: `fail` merges the new error into the pending
//! longest-match error, pops the innermost handler, truncates the value
//! stack to the handler's saved depth, unwinds the call stack to its saved
//! depth (restoring register saves, reinstating callee instruction state,
//! undoing program switches, applying call-site relabels), and resumes at
//! the handler target in recovery status. Whether input was consumed since
//! the handler's recorded check position decides whether the recovery
//! instruction recovers or re-raises.

use std::rc::Rc;

use tokar_bytecode::{Expected, Instr, InstrState, IterStop, Program};
use tokar_core::{ParseError, Pos, REGISTER_COUNT, Reg, Value};

use crate::trace::{MachineView, NoopTracer, Tracer};

/// Successful run: the produced value, the end position, and how many code
/// points were consumed. Success does not require end of input.
#[derive(Debug)]
pub struct Parsed {
    pub value: Value,
    pub end: Pos,
    pub consumed: usize,
}

/// Recovery point pushed by `PushHandler`/`InputCheck`.
struct Handler {
    target: usize,
    /// Input position at push (or at the latest check update); recovery
    /// instructions compare against it to detect consumption.
    input_idx: usize,
    pos: Pos,
    stack_depth: usize,
    frame_depth: usize,
    handler_depth: usize,
}

enum Frame {
    Ret {
        ret_pc: usize,
        /// Program to reinstate on return; `None` for same-program calls.
        caller_code: Option<Rc<Program>>,
        /// Drained stateful-instruction contents of the callee program.
        saved: Box<[InstrState]>,
        /// Call-site expected label, applied when the callee fails at its
        /// entry position.
        label: Expected,
        entry_idx: usize,
    },
    RegSave {
        reg: Reg,
        value: Value,
    },
}

struct Failed;

/// Run a compiled program against an input.
pub fn run(program: Rc<Program>, input: &str) -> Result<Parsed, ParseError> {
    run_with_tracer(program, input, &mut NoopTracer)
}

/// Run with a tracer receiving dispatch and log-point callbacks.
pub fn run_with_tracer(
    program: Rc<Program>,
    input: &str,
    tracer: &mut dyn Tracer,
) -> Result<Parsed, ParseError> {
    Machine::new(program, input, tracer).exec_loop()
}

struct Machine<'t> {
    code: Rc<Program>,
    chars: Vec<char>,
    idx: usize,
    pos: Pos,
    pc: usize,
    stack: Vec<Value>,
    handlers: Vec<Handler>,
    frames: Vec<Frame>,
    regs: [Value; REGISTER_COUNT],
    pending: Option<ParseError>,
    recovered: Option<Handler>,
    tracer: &'t mut dyn Tracer,
}

impl<'t> Machine<'t> {
    fn new(code: Rc<Program>, input: &str, tracer: &'t mut dyn Tracer) -> Machine<'t> {
        Machine {
            code,
            chars: input.chars().collect(),
            idx: 0,
            pos: Pos::start(),
            pc: 0,
            stack: Vec::new(),
            handlers: Vec::new(),
            frames: Vec::new(),
            regs: std::array::from_fn(|_| Value::Unit),
            pending: None,
            recovered: None,
            tracer,
        }
    }

    fn exec_loop(mut self) -> Result<Parsed, ParseError> {
        loop {
            if self.pc >= self.code.len() {
                if self.frames.is_empty() {
                    let value = self
                        .stack
                        .pop()
                        .expect("value stack empty at end of program");
                    return Ok(Parsed {
                        value,
                        end: self.pos,
                        consumed: self.idx,
                    });
                }
                self.do_return();
                continue;
            }

            let code = self.code.clone();
            let instr = code.instr(self.pc);
            let pc = self.pc;
            self.pc += 1;
            self.tracer.step(pc, instr);

            let outcome = match self.recovered.take() {
                Some(entry) => self.exec_recover(instr, entry),
                None => self.exec(instr),
            };
            if outcome.is_err() {
                return Err(self
                    .pending
                    .take()
                    .unwrap_or_else(|| ParseError::at(self.idx, self.pos)));
            }
        }
    }

    // --- input ------------------------------------------------------------

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn advance(&mut self) {
        let c = self.chars[self.idx];
        self.pos = self.pos.advance(c);
        self.idx += 1;
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn input_matches(&self, s: &str) -> bool {
        let mut i = self.idx;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn unexpected_desc(&self) -> Rc<str> {
        match self.current_char() {
            Some(c) => Rc::from(format!("{c:?}")),
            None => Rc::from("end of input"),
        }
    }

    // --- failure ----------------------------------------------------------

    fn note(&mut self, err: ParseError) {
        match &mut self.pending {
            Some(pending) => pending.merge(err),
            None => self.pending = Some(err),
        }
    }

    fn fail(&mut self, err: ParseError) -> Result<(), Failed> {
        self.note(err);
        self.refail()
    }

    /// Expected-set failure at the current position.
    fn fail_expected(&mut self, label: Option<Rc<str>>) -> Result<(), Failed> {
        let mut err = ParseError::at(self.idx, self.pos).with_unexpected(self.unexpected_desc());
        if let Some(label) = label {
            err = err.expecting(label);
        }
        self.fail(err)
    }

    fn refail(&mut self) -> Result<(), Failed> {
        let Some(entry) = self.handlers.pop() else {
            return Err(Failed);
        };
        self.handlers.truncate(entry.handler_depth);
        while self.frames.len() > entry.frame_depth {
            match self.frames.pop().expect("frame depth checked") {
                Frame::RegSave { reg, value } => self.regs[reg.index()] = value,
                Frame::Ret {
                    caller_code,
                    saved,
                    label,
                    entry_idx,
                    ..
                } => {
                    self.code.restore_states(saved);
                    if let Some(prev) = caller_code {
                        self.code = prev;
                    }
                    if let Some(label) = label
                        && let Some(pending) = &mut self.pending
                        && pending.offset == entry_idx
                    {
                        pending.relabel(label);
                    }
                }
            }
        }
        self.stack.truncate(entry.stack_depth);
        self.pc = entry.target;
        self.tracer.recover(self.pc);
        self.recovered = Some(entry);
        Ok(())
    }

    // --- stacks -----------------------------------------------------------

    fn push_handler(&mut self, target: usize) {
        self.handlers.push(Handler {
            target,
            input_idx: self.idx,
            pos: self.pos,
            stack_depth: self.stack.len(),
            frame_depth: self.frames.len(),
            handler_depth: self.handlers.len(),
        });
    }

    /// Re-arm the innermost check at the current input position.
    fn update_check(&mut self) {
        let handler = self.handlers.last_mut().expect("update-check without handler");
        handler.input_idx = self.idx;
        handler.pos = self.pos;
    }

    fn pop_value(&mut self) -> Value {
        self.stack.pop().expect("value stack underflow")
    }

    fn do_return(&mut self) {
        match self.frames.pop() {
            Some(Frame::Ret {
                ret_pc,
                caller_code,
                saved,
                ..
            }) => {
                self.code.restore_states(saved);
                if let Some(prev) = caller_code {
                    self.code = prev;
                }
                self.pc = ret_pc;
            }
            Some(Frame::RegSave { .. }) => panic!("return across unbalanced register save"),
            None => panic!("return without a call frame"),
        }
    }

    fn restore_input(&mut self, entry: &Handler) {
        self.idx = entry.input_idx;
        self.pos = entry.pos;
    }

    // --- dispatch ---------------------------------------------------------

    fn exec(&mut self, instr: &Instr) -> Result<(), Failed> {
        match instr {
            Instr::Label(_) => unreachable!("label pseudo-instruction survived resolution"),

            Instr::Push(x) => {
                self.stack.push(x.clone());
                Ok(())
            }
            Instr::Pop => {
                self.pop_value();
                Ok(())
            }
            Instr::Apply => {
                let x = self.pop_value();
                let f = self.pop_value().as_func();
                self.stack.push(f.call(x));
                Ok(())
            }
            Instr::Perform(f) => {
                let x = self.pop_value();
                self.stack.push(f.call(x));
                Ok(())
            }
            Instr::Exchange(x) => {
                *self.stack.last_mut().expect("value stack underflow") = x.clone();
                Ok(())
            }
            Instr::Lift2(f) => {
                let y = self.pop_value();
                let x = self.pop_value();
                self.stack.push(f.call(x, y));
                Ok(())
            }
            Instr::Lift3(f) => {
                let z = self.pop_value();
                let y = self.pop_value();
                let x = self.pop_value();
                self.stack.push(f.call(x, y, z));
                Ok(())
            }

            Instr::CharTok { c, expected } => match self.current_char() {
                Some(cur) if cur == *c => {
                    self.advance();
                    self.stack.push(Value::Char(*c));
                    Ok(())
                }
                _ => self.fail_expected(Some(char_label(*c, expected))),
            },
            Instr::CharTokFastPerform { c, f, expected } => match self.current_char() {
                Some(cur) if cur == *c => {
                    self.advance();
                    self.stack.push(f.call(Value::Char(*c)));
                    Ok(())
                }
                _ => self.fail_expected(Some(char_label(*c, expected))),
            },
            Instr::CharTokExchange { c, x, expected } => match self.current_char() {
                Some(cur) if cur == *c => {
                    self.advance();
                    self.stack.push(x.clone());
                    Ok(())
                }
                _ => self.fail_expected(Some(char_label(*c, expected))),
            },

            Instr::StringTok { s, expected } => {
                if self.input_matches(s) {
                    self.advance_by(s.chars().count());
                    self.stack.push(Value::Str(s.clone()));
                    Ok(())
                } else {
                    self.fail_expected(Some(string_label(s, expected)))
                }
            }
            Instr::StringTokFastPerform { s, f, expected } => {
                if self.input_matches(s) {
                    self.advance_by(s.chars().count());
                    self.stack.push(f.call(Value::Str(s.clone())));
                    Ok(())
                } else {
                    self.fail_expected(Some(string_label(s, expected)))
                }
            }
            Instr::StringTokExchange { s, x, expected } => {
                if self.input_matches(s) {
                    self.advance_by(s.chars().count());
                    self.stack.push(x.clone());
                    Ok(())
                } else {
                    self.fail_expected(Some(string_label(s, expected)))
                }
            }

            Instr::Satisfies { pred, expected } => match self.current_char() {
                Some(cur) if pred.test(&Value::Char(cur)) => {
                    self.advance();
                    self.stack.push(Value::Char(cur));
                    Ok(())
                }
                _ => self.fail_expected(expected.clone()),
            },
            Instr::SatisfiesExchange { pred, x, expected } => match self.current_char() {
                Some(cur) if pred.test(&Value::Char(cur)) => {
                    self.advance();
                    self.stack.push(x.clone());
                    Ok(())
                }
                _ => self.fail_expected(expected.clone()),
            },

            Instr::Eof { expected } => {
                if self.idx == self.chars.len() {
                    self.stack.push(Value::Unit);
                    Ok(())
                } else {
                    let label = expected
                        .clone()
                        .unwrap_or_else(|| Rc::from("end of input"));
                    self.fail_expected(Some(label))
                }
            }
            Instr::Line => {
                self.stack.push(Value::Int(self.pos.line as i64));
                Ok(())
            }
            Instr::Col => {
                self.stack.push(Value::Int(self.pos.col as i64));
                Ok(())
            }

            Instr::TokenKeyword { s, expected } => {
                let len = s.chars().count();
                let follows = self.chars.get(self.idx + len).copied();
                if self.input_matches(s)
                    && !follows.is_some_and(|c| c.is_alphanumeric() || c == '_')
                {
                    self.advance_by(len);
                    self.stack.push(Value::Unit);
                    Ok(())
                } else {
                    let label = expected.clone().unwrap_or_else(|| s.clone());
                    self.fail_expected(Some(label))
                }
            }
            Instr::TokenOperator { s, expected } => {
                const OPERATOR_CHARS: &str = "+-*/%<>=!&|^~?:";
                let len = s.chars().count();
                let follows = self.chars.get(self.idx + len).copied();
                if self.input_matches(s) && !follows.is_some_and(|c| OPERATOR_CHARS.contains(c)) {
                    self.advance_by(len);
                    self.stack.push(Value::Unit);
                    Ok(())
                } else {
                    let label = expected.clone().unwrap_or_else(|| s.clone());
                    self.fail_expected(Some(label))
                }
            }
            Instr::TokenStringLiteral { raw, expected } => {
                match self.scan_string_literal(*raw) {
                    Some((content, count)) => {
                        self.advance_by(count);
                        self.stack.push(Value::str(content));
                        Ok(())
                    }
                    None => {
                        let label = expected.clone().unwrap_or_else(|| Rc::from("string"));
                        self.fail_expected(Some(label))
                    }
                }
            }

            Instr::Empty { expected } => {
                let mut err = ParseError::at(self.idx, self.pos);
                if let Some(label) = expected {
                    err = err.expecting(label.clone());
                }
                self.fail(err)
            }
            Instr::Fail { msg } => {
                let err = ParseError::at(self.idx, self.pos).with_message(msg.clone());
                self.fail(err)
            }
            Instr::Unexpected { msg } => {
                let err = ParseError::at(self.idx, self.pos).with_unexpected(msg.clone());
                self.fail(err)
            }
            Instr::FastFail { msg_of } => {
                let x = self.pop_value();
                let err =
                    ParseError::at(self.idx, self.pos).with_message(Rc::from(msg_of.render(&x)));
                self.fail(err)
            }
            Instr::FastUnexpected { msg_of } => {
                let x = self.pop_value();
                let err = ParseError::at(self.idx, self.pos)
                    .with_unexpected(Rc::from(msg_of.render(&x)));
                self.fail(err)
            }

            Instr::Ensure { pred, expected } => {
                let ok = pred.test(self.stack.last().expect("value stack underflow"));
                if ok {
                    Ok(())
                } else {
                    self.pop_value();
                    let mut err = ParseError::at(self.idx, self.pos);
                    if let Some(label) = expected {
                        err = err.expecting(label.clone());
                    }
                    self.fail(err)
                }
            }
            Instr::Guard { pred, msg } => {
                let ok = pred.test(self.stack.last().expect("value stack underflow"));
                if ok {
                    Ok(())
                } else {
                    self.pop_value();
                    let err = ParseError::at(self.idx, self.pos).with_message(msg.clone());
                    self.fail(err)
                }
            }
            Instr::FastGuard { pred, msg_of } => {
                let ok = pred.test(self.stack.last().expect("value stack underflow"));
                if ok {
                    Ok(())
                } else {
                    let x = self.pop_value();
                    let err = ParseError::at(self.idx, self.pos)
                        .with_message(Rc::from(msg_of.render(&x)));
                    self.fail(err)
                }
            }

            Instr::Jump(t) => {
                self.pc = *t as usize;
                Ok(())
            }
            Instr::JumpGood(t) => {
                self.handlers.pop().expect("jump-good without handler");
                self.pc = *t as usize;
                Ok(())
            }
            Instr::JumpGoodAttempt(t) => {
                self.handlers.pop().expect("jump-good-attempt without handler");
                self.pc = *t as usize;
                Ok(())
            }
            Instr::PushHandler(t) | Instr::InputCheck(t) => {
                self.push_handler(*t as usize);
                Ok(())
            }
            Instr::UpdateCheck => {
                self.update_check();
                Ok(())
            }
            Instr::Catch => unreachable!("catch executed outside recovery"),
            Instr::Attempt => {
                self.handlers.pop().expect("attempt without handler");
                Ok(())
            }
            Instr::LookAhead => {
                let entry = self.handlers.pop().expect("look-ahead without handler");
                self.restore_input(&entry);
                Ok(())
            }
            Instr::NotFollowedBy { expected } => {
                let entry = self.handlers.pop().expect("not-followed-by without handler");
                self.restore_input(&entry);
                let seen = self.pop_value();
                let mut err = ParseError::at(self.idx, self.pos)
                    .with_unexpected(Rc::from(format!("{seen:?}")));
                if let Some(label) = expected {
                    err = err.expecting(label.clone());
                }
                self.fail(err)
            }
            Instr::RecoverWith(_) => {
                self.handlers.pop().expect("recover without handler");
                Ok(())
            }
            Instr::AlwaysRecoverWith(_) => {
                self.handlers.pop().expect("recover without handler");
                Ok(())
            }
            Instr::If { orelse } => {
                let cond = self.pop_value().as_bool();
                if !cond {
                    self.pc = *orelse as usize;
                }
                Ok(())
            }
            Instr::JumpTable {
                table,
                default,
                catch,
                expected,
            } => {
                match self.current_char() {
                    Some(c) if table.contains_key(&c) => {
                        self.push_handler(*catch as usize);
                        self.pc = table[&c] as usize;
                    }
                    _ => {
                        let err = ParseError::at(self.idx, self.pos)
                            .expecting_all(expected.iter().cloned())
                            .with_unexpected(self.unexpected_desc());
                        self.note(err);
                        self.pc = *default as usize;
                    }
                }
                Ok(())
            }

            Instr::Many { body, acc } => {
                let x = self.pop_value();
                acc.borrow_mut().push(x);
                self.update_check();
                self.pc = *body as usize;
                Ok(())
            }
            Instr::SkipMany { body } => {
                self.pop_value();
                self.update_check();
                self.pc = *body as usize;
                Ok(())
            }
            Instr::ChainPre { body, acc } => {
                let f = self.pop_value().as_func();
                acc.borrow_mut().push(f);
                self.update_check();
                self.pc = *body as usize;
                Ok(())
            }
            Instr::ChainPost { body } => {
                let f = self.pop_value().as_func();
                let x = self.pop_value();
                self.stack.push(f.call(x));
                self.update_check();
                self.pc = *body as usize;
                Ok(())
            }
            Instr::ChainLeft { body } => {
                let y = self.pop_value();
                let f = self.pop_value().as_func();
                let x = self.pop_value();
                self.stack.push(f.call(x).as_func().call(y));
                self.update_check();
                self.pc = *body as usize;
                Ok(())
            }
            Instr::ChainRight { body, acc } => {
                let y = self.pop_value();
                let f = self.pop_value();
                acc.borrow_mut().push((f, y));
                self.update_check();
                self.pc = *body as usize;
                Ok(())
            }
            Instr::SepEndBy1 { body, acc } => {
                let x_new = self.pop_value();
                let x_prev = self.pop_value();
                acc.borrow_mut().push(x_prev);
                self.stack.push(x_new);
                self.update_check();
                self.pc = *body as usize;
                Ok(())
            }
            Instr::ManyUntil { body, acc } => {
                let x = self.pop_value();
                if x.downcast_ref::<IterStop>().is_some() {
                    let items = acc.take();
                    self.stack.push(Value::list(items));
                } else {
                    acc.borrow_mut().push(x);
                    self.pc = *body as usize;
                }
                Ok(())
            }

            Instr::Call { target, expected } => {
                let saved = self.code.save_states();
                self.frames.push(Frame::Ret {
                    ret_pc: self.pc,
                    caller_code: None,
                    saved,
                    label: expected.clone(),
                    entry_idx: self.idx,
                });
                self.pc = *target as usize;
                Ok(())
            }
            Instr::Return => {
                self.do_return();
                Ok(())
            }
            Instr::DynCall { bind } => {
                let x = self.pop_value();
                let sub = bind.produce(x);
                let saved = sub.save_states();
                self.frames.push(Frame::Ret {
                    ret_pc: self.pc,
                    caller_code: Some(self.code.clone()),
                    saved,
                    label: None,
                    entry_idx: self.idx,
                });
                self.code = sub;
                self.pc = 0;
                Ok(())
            }

            Instr::Get(reg) => {
                self.stack.push(self.regs[reg.index()].clone());
                Ok(())
            }
            Instr::Put(reg) => {
                self.regs[reg.index()] = self.pop_value();
                self.stack.push(Value::Unit);
                Ok(())
            }
            Instr::Modify { reg, f } => {
                let old = self.regs[reg.index()].clone();
                self.regs[reg.index()] = f.call(old);
                self.stack.push(Value::Unit);
                Ok(())
            }
            Instr::LocalEntry(reg) => {
                let new = self.pop_value();
                let old = std::mem::replace(&mut self.regs[reg.index()], new);
                self.frames.push(Frame::RegSave { reg: *reg, value: old });
                Ok(())
            }
            Instr::LocalExit(reg) => {
                match self.frames.pop() {
                    Some(Frame::RegSave { reg: saved_reg, value }) => {
                        debug_assert_eq!(saved_reg, *reg);
                        self.regs[reg.index()] = value;
                    }
                    _ => panic!("local-exit without matching register save"),
                }
                Ok(())
            }

            Instr::LogBegin { name, pause } => {
                let window: String = self.chars
                    [self.idx..(self.idx + 12).min(self.chars.len())]
                    .iter()
                    .collect();
                let view = MachineView {
                    pc: self.pc - 1,
                    pos: self.pos,
                    input_index: self.idx,
                    window,
                    stack: &self.stack,
                    handler_depth: self.handlers.len(),
                    call_depth: self.frames.len(),
                };
                self.tracer.log_begin(name, &view);
                if *pause {
                    self.tracer.pause(name, &view);
                }
                Ok(())
            }
            Instr::LogEnd { name, pause } => {
                let window: String = self.chars
                    [self.idx..(self.idx + 12).min(self.chars.len())]
                    .iter()
                    .collect();
                let view = MachineView {
                    pc: self.pc - 1,
                    pos: self.pos,
                    input_index: self.idx,
                    window,
                    stack: &self.stack,
                    handler_depth: self.handlers.len(),
                    call_depth: self.frames.len(),
                };
                self.tracer.log_end(name, &view);
                if *pause {
                    self.tracer.pause(name, &view);
                }
                Ok(())
            }
        }
    }

    fn exec_recover(&mut self, instr: &Instr, entry: Handler) -> Result<(), Failed> {
        let consumed = self.idx != entry.input_idx;
        match instr {
            Instr::Catch => {
                if consumed {
                    self.refail()
                } else {
                    Ok(())
                }
            }
            Instr::Attempt => {
                self.restore_input(&entry);
                self.refail()
            }
            Instr::JumpGoodAttempt(_) => {
                self.restore_input(&entry);
                Ok(())
            }
            Instr::LookAhead => self.refail(),
            Instr::NotFollowedBy { .. } => {
                self.restore_input(&entry);
                self.stack.push(Value::Unit);
                Ok(())
            }
            Instr::RecoverWith(x) => {
                if consumed {
                    self.refail()
                } else {
                    self.stack.push(x.clone());
                    Ok(())
                }
            }
            Instr::AlwaysRecoverWith(x) => {
                self.restore_input(&entry);
                self.stack.push(x.clone());
                Ok(())
            }
            Instr::Many { acc, .. } => {
                if consumed {
                    self.refail()
                } else {
                    let items = acc.take();
                    self.stack.push(Value::list(items));
                    Ok(())
                }
            }
            Instr::SkipMany { .. } => {
                if consumed {
                    self.refail()
                } else {
                    self.stack.push(Value::Unit);
                    Ok(())
                }
            }
            Instr::ChainPre { acc, .. } => {
                if consumed {
                    self.refail()
                } else {
                    let funcs = acc.take();
                    let composed = tokar_core::Func::new(move |x| {
                        funcs.iter().rev().fold(x, |v, f| f.call(v))
                    });
                    self.stack.push(Value::Func(composed));
                    Ok(())
                }
            }
            Instr::ChainPost { .. } | Instr::ChainLeft { .. } => {
                if consumed {
                    self.refail()
                } else {
                    Ok(())
                }
            }
            Instr::ChainRight { acc, .. } => {
                if consumed {
                    return self.refail();
                }
                let pairs = acc.take();
                if pairs.is_empty() {
                    return Ok(());
                }
                let first = self.pop_value();
                let mut result = pairs.last().expect("non-empty").1.clone();
                for j in (1..pairs.len()).rev() {
                    let f = pairs[j].0.as_func();
                    result = f.call(pairs[j - 1].1.clone()).as_func().call(result);
                }
                let f0 = pairs[0].0.as_func();
                result = f0.call(first).as_func().call(result);
                self.stack.push(result);
                Ok(())
            }
            Instr::SepEndBy1 { acc, .. } => {
                if consumed {
                    self.refail()
                } else {
                    let last = self.pop_value();
                    let mut items = acc.take();
                    items.push(last);
                    self.stack.push(Value::list(items));
                    Ok(())
                }
            }
            other => unreachable!("recovery at non-recovery instruction {other:?}"),
        }
    }

    fn scan_string_literal(&self, raw: bool) -> Option<(String, usize)> {
        if self.current_char() != Some('"') {
            return None;
        }
        let mut i = self.idx + 1;
        let mut out = String::new();
        loop {
            match self.chars.get(i) {
                None => return None,
                Some('"') => return Some((out, i + 1 - self.idx)),
                Some('\\') if !raw => {
                    let escaped = match self.chars.get(i + 1)? {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        '"' => '"',
                        '\'' => '\'',
                        '0' => '\0',
                        _ => return None,
                    };
                    out.push(escaped);
                    i += 2;
                }
                Some(c) => {
                    out.push(*c);
                    i += 1;
                }
            }
        }
    }
}

fn char_label(c: char, expected: &Expected) -> Rc<str> {
    expected
        .clone()
        .unwrap_or_else(|| Rc::from(format!("{c:?}")))
}

fn string_label(s: &Rc<str>, expected: &Expected) -> Rc<str> {
    expected
        .clone()
        .unwrap_or_else(|| Rc::from(format!("\"{s}\"")))
}
