//! Human-readable program dump for tests and debugging.

use std::fmt::Write as _;

use crate::instr::Instr;
use crate::program::Program;

/// One line per instruction, offsets left-aligned.
pub fn dump(program: &Program) -> String {
    let width = width_for_count(program.len());
    let mut out = String::new();
    for (i, instr) in program.instrs().iter().enumerate() {
        writeln!(out, "{i:>width$}  {}", mnemonic(instr)).unwrap();
    }
    out
}

fn width_for_count(count: usize) -> usize {
    count.saturating_sub(1).max(1).to_string().len()
}

fn mnemonic(instr: &Instr) -> String {
    match instr {
        Instr::Label(l) => format!("label @{l}"),

        Instr::Push(v) => format!("push {v:?}"),
        Instr::Pop => "pop".into(),
        Instr::Apply => "apply".into(),
        Instr::Perform(_) => "perform".into(),
        Instr::Exchange(v) => format!("exchange {v:?}"),
        Instr::Lift2(_) => "lift2".into(),
        Instr::Lift3(_) => "lift3".into(),

        Instr::CharTok { c, .. } => format!("char {c:?}"),
        Instr::StringTok { s, .. } => format!("string {s:?}"),
        Instr::Satisfies { .. } => "satisfy".into(),
        Instr::Eof { .. } => "eof".into(),
        Instr::Line => "line".into(),
        Instr::Col => "col".into(),

        Instr::CharTokFastPerform { c, .. } => format!("char-perform {c:?}"),
        Instr::StringTokFastPerform { s, .. } => format!("string-perform {s:?}"),
        Instr::CharTokExchange { c, x, .. } => format!("char-exchange {c:?} {x:?}"),
        Instr::StringTokExchange { s, x, .. } => format!("string-exchange {s:?} {x:?}"),
        Instr::SatisfiesExchange { x, .. } => format!("satisfy-exchange {x:?}"),

        Instr::TokenKeyword { s, .. } => format!("keyword {s:?}"),
        Instr::TokenOperator { s, .. } => format!("operator {s:?}"),
        Instr::TokenStringLiteral { raw: false, .. } => "string-literal".into(),
        Instr::TokenStringLiteral { raw: true, .. } => "raw-string-literal".into(),

        Instr::Empty { expected: None } => "empty".into(),
        Instr::Empty {
            expected: Some(label),
        } => format!("empty [{label}]"),
        Instr::Fail { msg } => format!("fail {msg:?}"),
        Instr::Unexpected { msg } => format!("unexpected {msg:?}"),
        Instr::FastFail { .. } => "fail!".into(),
        Instr::FastUnexpected { .. } => "unexpected!".into(),

        Instr::Ensure { .. } => "ensure".into(),
        Instr::Guard { msg, .. } => format!("guard {msg:?}"),
        Instr::FastGuard { .. } => "guard!".into(),

        Instr::Jump(t) => format!("jump @{t}"),
        Instr::JumpGood(t) => format!("jump-good @{t}"),
        Instr::JumpGoodAttempt(t) => format!("jump-good-attempt @{t}"),
        Instr::PushHandler(t) => format!("push-handler @{t}"),
        Instr::InputCheck(t) => format!("input-check @{t}"),
        Instr::UpdateCheck => "update-check".into(),
        Instr::Catch => "catch".into(),
        Instr::Attempt => "attempt".into(),
        Instr::LookAhead => "look-ahead".into(),
        Instr::NotFollowedBy { .. } => "not-followed-by".into(),
        Instr::RecoverWith(v) => format!("recover {v:?}"),
        Instr::AlwaysRecoverWith(v) => format!("recover! {v:?}"),
        Instr::If { orelse } => format!("if-else @{orelse}"),
        Instr::JumpTable { table, default, .. } => {
            let mut out = String::from("table {");
            for (i, (c, target)) in table.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write!(out, "{c:?} -> @{target}").unwrap();
            }
            write!(out, "}} default @{default}").unwrap();
            out
        }

        Instr::Many { body, .. } => format!("many @{body}"),
        Instr::SkipMany { body } => format!("skip-many @{body}"),
        Instr::ChainPre { body, .. } => format!("chain-pre @{body}"),
        Instr::ChainPost { body } => format!("chain-post @{body}"),
        Instr::ChainLeft { body } => format!("chain-left @{body}"),
        Instr::ChainRight { body, .. } => format!("chain-right @{body}"),
        Instr::SepEndBy1 { body, .. } => format!("sep-end-by1 @{body}"),
        Instr::ManyUntil { body, .. } => format!("many-until @{body}"),

        Instr::Call { target, .. } => format!("call @{target}"),
        Instr::Return => "return".into(),
        Instr::DynCall { .. } => "dyn-call".into(),

        Instr::Get(reg) => format!("get {reg}"),
        Instr::Put(reg) => format!("put {reg}"),
        Instr::Modify { reg, .. } => format!("modify {reg}"),
        Instr::LocalEntry(reg) => format!("local-enter {reg}"),
        Instr::LocalExit(reg) => format!("local-exit {reg}"),

        Instr::LogBegin { name, .. } => format!("log-begin {name:?}"),
        Instr::LogEnd { name, .. } => format!("log-end {name:?}"),
    }
}
