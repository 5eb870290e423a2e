//! Built-in scenarios exercising the runtime

use std::cell::RefCell;

use anyhow::{Result, bail};
use tracing::info;
use trycatch_core::context::{depth, reset_stats, stats};
use trycatch_core::{
    EXCEPTION, ExceptionType, Flow, Region, check_balanced, define_exception, exit_region,
    instance_of, rethrow, throw,
};

define_exception! {
    /// Input/output failure
    pub static IO_ERROR: IOError extends EXCEPTION;
    /// A path did not resolve
    pub static FILE_NOT_FOUND: FileNotFoundError extends IO_ERROR;
    /// Access to a path was refused
    pub static PERMISSION_DENIED: PermissionDenied extends IO_ERROR;
    /// Malformed input
    pub static PARSE_ERROR: ParseError extends EXCEPTION;
}

/// Every kind the CLI knows by name
pub static KINDS: &[&ExceptionType] = &[
    &EXCEPTION,
    &IO_ERROR,
    &FILE_NOT_FOUND,
    &PERMISSION_DENIED,
    &PARSE_ERROR,
];

/// Look up a demo kind by its declared name
pub fn kind_by_name(name: &str) -> Option<&'static ExceptionType> {
    KINDS.iter().copied().find(|kind| kind.name() == name)
}

/// Lines produced by a scenario
#[derive(Default)]
pub struct Transcript {
    lines: RefCell<Vec<String>>,
}

impl Transcript {
    fn note(&self, line: impl Into<String>) {
        self.lines.borrow_mut().push(line.into());
    }

    /// Recorded lines
    pub fn into_lines(self) -> Vec<String> {
        self.lines.into_inner()
    }
}

/// A named, self-contained demonstration
pub struct Scenario {
    /// Name used on the command line
    pub name: &'static str,
    /// One-line summary
    pub description: &'static str,
    run: fn(&Transcript),
}

/// All scenarios in presentation order
pub static SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "hierarchy",
        description: "a clause for an ancestor catches a descendant",
        run: hierarchy,
    },
    Scenario {
        name: "nested",
        description: "an exception skips a non-matching inner region",
        run: nested,
    },
    Scenario {
        name: "rethrow",
        description: "a rethrow is matched by the enclosing region",
        run: rethrow_outward,
    },
    Scenario {
        name: "early-return",
        description: "returning from a guarded body still finalizes",
        run: early_return,
    },
    Scenario {
        name: "loop",
        description: "break and continue out of a guarded loop body",
        run: loop_control,
    },
    Scenario {
        name: "ownership",
        description: "owned messages are released once, at region exit",
        run: ownership,
    },
];

/// Run the named scenarios (all of them if `names` is empty)
pub fn run(names: &[String]) -> Result<Vec<(&'static Scenario, Vec<String>)>> {
    let selected: Vec<&Scenario> = if names.is_empty() {
        SCENARIOS.iter().collect()
    } else {
        names
            .iter()
            .map(|name| match SCENARIOS.iter().find(|s| s.name == name.as_str()) {
                Some(scenario) => Ok(scenario),
                None => bail!("unknown scenario: {name}"),
            })
            .collect::<Result<_>>()?
    };

    let mut results = Vec::with_capacity(selected.len());
    for scenario in selected {
        info!(scenario = scenario.name, "running scenario");
        let transcript = Transcript::default();
        (scenario.run)(&transcript);
        check_balanced()?;
        results.push((scenario, transcript.into_lines()));
    }
    Ok(results)
}

fn hierarchy(out: &Transcript) {
    Region::<()>::new(|| {
        out.note("throwing FileNotFoundError(\"missing\")");
        throw!(FILE_NOT_FOUND, "missing")
    })
    .catch(&IO_ERROR, |e| {
        out.note(format!("caught by IOError clause: {e}"));
        out.note(format!("instance of Exception: {}", instance_of(e, &EXCEPTION)));
        out.note(format!("instance of ParseError: {}", instance_of(e, &PARSE_ERROR)));
        Flow::Normal
    })
    .run();
}

fn nested(out: &Transcript) {
    Region::<()>::new(|| {
        Region::new(|| throw!(PERMISSION_DENIED, "/etc/shadow"))
            .catch(&PARSE_ERROR, |_| {
                out.note("inner ParseError clause (not expected)");
                Flow::Normal
            })
            .finally(|| {
                out.note(format!("inner finalizer at depth {}", depth()));
                Flow::Normal
            })
            .run()
    })
    .catch(&IO_ERROR, |e| {
        out.note(format!("outer IOError clause at depth {}: {e}", depth()));
        Flow::Normal
    })
    .finally(|| {
        out.note(format!("outer finalizer at depth {}", depth()));
        Flow::Normal
    })
    .run();
}

fn rethrow_outward(out: &Transcript) {
    Region::<()>::new(|| {
        Region::new(|| throw!(PARSE_ERROR, "unexpected token"))
            .catch(&PARSE_ERROR, |e| {
                out.note("inner clause logs and rethrows");
                rethrow(e)
            })
            .catch(&EXCEPTION, |_| {
                out.note("inner catch-all (not expected)");
                Flow::Normal
            })
            .run()
    })
    .catch(&EXCEPTION, |e| {
        out.note(format!("outer catch-all received: {e}"));
        Flow::Normal
    })
    .run();
}

fn find_first_even(values: &[u32], out: &Transcript) -> Option<u32> {
    for &value in values {
        let flow = Region::new(|| {
            if value % 2 == 0 {
                Flow::Return(Some(value))
            } else {
                Flow::Normal
            }
        })
        .finally(|| {
            out.note(format!("finalizer for {value}"));
            Flow::Normal
        })
        .run();
        exit_region!(flow);
    }
    None
}

fn early_return(out: &Transcript) {
    let found = find_first_even(&[3, 5, 8, 9], out);
    out.note(format!("returned {found:?}, active regions {}", depth()));
}

fn loop_control(out: &Transcript) {
    let mut kept = Vec::new();
    for i in 0..8 {
        let flow = Region::<()>::new(|| match i {
            _ if i % 3 == 0 => Flow::Continue,
            6.. => Flow::Break,
            _ => Flow::Normal,
        })
        .run();
        exit_region!(flow, loop);
        kept.push(i);
    }
    out.note(format!("kept {kept:?}"));
}

fn ownership(out: &Transcript) {
    reset_stats();
    let path = String::from("config.toml");
    Region::<()>::new(|| throw!(FILE_NOT_FOUND, "missing {}", path))
        .catch(&FILE_NOT_FOUND, |e| {
            out.note(format!(
                "owns message: {}, released so far: {}",
                e.owns_message(),
                stats().messages_released
            ));
            Flow::Normal
        })
        .run();
    out.note(format!("released after exit: {}", stats().messages_released));
}
