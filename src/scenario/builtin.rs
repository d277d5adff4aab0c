//! Built-in scenarios.
//!
//! `demo1` to `demo4` race a primed ticker against a foreground program
//! that announces tokens around a sleep. The `task-*` scenarios are
//! unprimed and contrast awaiting a lazily started program with spawning
//! a task.

use crate::dsl::ProgramBuilder;
use crate::task::Program;

use super::Scenario;

/// Every built-in scenario, in run order.
pub fn all() -> Vec<Scenario> {
    vec![
        demo1(),
        demo2(),
        demo3(),
        demo4(),
        task_stall(),
        task_yield(),
        task_noeager(),
    ]
}

pub fn demo1() -> Scenario {
    let program = ProgramBuilder::new("demo1")
        .announce("a")
        .announce("b")
        .sleep(100)
        .announce("c")
        .announce("d")
        .build();
    Scenario::new("demo1", program)
        .describe("announce a b, sleep 100, announce c d")
        .documented("a b in! c d")
}

pub fn demo2() -> Scenario {
    let helper = ProgramBuilder::new("demo2bc")
        .announce("b")
        .sleep(100)
        .announce("c")
        .build();
    let program = ProgramBuilder::new("demo2")
        .announce("a")
        .call(helper)
        .announce("d")
        .build();
    Scenario::new("demo2", program)
        .describe("demo1 with b, sleep 100, c moved into an awaited helper")
        .documented("a b in! c d")
}

pub fn demo3() -> Scenario {
    let program = ProgramBuilder::new("demo3")
        .announce("a")
        .announce("b")
        .sleep(0)
        .announce("c")
        .announce("d")
        .build();
    Scenario::new("demo3", program)
        .describe("demo1 with a zero-delay sleep")
        .documented("a b in! c d")
        .documented("a b c d")
        .documented("a b in! c d in!")
}

pub fn demo4() -> Scenario {
    let program = ProgramBuilder::new("demo4")
        .announce("a")
        .call(demo4bc())
        .announce("d")
        .build();
    Scenario::new("demo4", program)
        .describe("demo3 with b, sleep 0, c moved into an awaited helper")
        .documented("a b in! c d")
        .documented("a b c d")
        .documented("a b in! c in! d in!")
}

fn demo4bc() -> Program {
    ProgramBuilder::new("demo4bc")
        .announce("b")
        .sleep(0)
        .announce("c")
        .build()
}

/// The helper shared by the `task-*` scenarios: emits `b`, returns `c`.
fn f() -> Program {
    ProgramBuilder::new("f").emit("b").returns("c").build()
}

pub fn task_stall() -> Scenario {
    let program = ProgramBuilder::new("task-stall")
        .sleep(100)
        .emit("a")
        .sleep(100)
        .call(f())
        .emit_result()
        .build();
    Scenario::new("task-stall", program)
        .describe("an un-awaited program does not run until it is awaited")
        .unprimed()
        .documented("a b c")
}

pub fn task_yield() -> Scenario {
    let program = ProgramBuilder::new("task-yield")
        .spawn(f())
        .yield_now()
        .emit("a")
        .join(0)
        .emit_result()
        .build();
    Scenario::new("task-yield", program)
        .describe("a spawned task runs once the spawner yields")
        .unprimed()
        .documented("b a c")
}

pub fn task_noeager() -> Scenario {
    let program = ProgramBuilder::new("task-noeager")
        .spawn(f())
        .emit("a")
        .join(0)
        .emit_result()
        .build();
    Scenario::new("task-noeager", program)
        .describe("a spawned task does not start eagerly")
        .unprimed()
        .documented("a b c")
}
