use tokar_bytecode::Instr;

use crate::{Breakpoint, MachineView, ParserExt, Tracer, Value, ch, run_with_tracer};

#[derive(Default)]
struct Recording {
    events: Vec<String>,
    steps: usize,
}

impl Tracer for Recording {
    fn step(&mut self, _pc: usize, _instr: &Instr) {
        self.steps += 1;
    }

    fn log_begin(&mut self, name: &str, view: &MachineView<'_>) {
        self.events.push(format!("begin {name} @{}", view.input_index));
    }

    fn log_end(&mut self, name: &str, view: &MachineView<'_>) {
        self.events.push(format!("end {name} @{}", view.input_index));
    }

    fn pause(&mut self, name: &str, _view: &MachineView<'_>) {
        self.events.push(format!("pause {name}"));
    }
}

#[test]
fn log_points_bracket_the_body() {
    let p = ch('a').debug("probe", Breakpoint::None).then(ch('b'));
    let mut tracer = Recording::default();

    let parsed = run_with_tracer(&p, "ab", &mut tracer).expect("parse failed");

    assert_eq!(parsed.value, Value::Char('b'));
    assert_eq!(tracer.events, vec!["begin probe @0", "end probe @1"]);
    assert!(tracer.steps >= 4);
}

#[test]
fn breakpoints_fire_at_the_selected_edges() {
    let p = ch('a').debug("probe", Breakpoint::Both);
    let mut tracer = Recording::default();

    run_with_tracer(&p, "a", &mut tracer).expect("parse failed");

    assert_eq!(
        tracer.events,
        vec![
            "begin probe @0",
            "pause probe",
            "end probe @1",
            "pause probe",
        ],
    );
}

#[test]
fn entry_breakpoint_only() {
    let p = ch('a').debug("probe", Breakpoint::Entry);
    let mut tracer = Recording::default();

    run_with_tracer(&p, "a", &mut tracer).expect("parse failed");

    assert_eq!(
        tracer.events,
        vec!["begin probe @0", "pause probe", "end probe @1"],
    );
}
