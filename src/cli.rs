//! Shared driver for the experiment binaries.

use std::io::{self, BufRead, Write};

use anyhow::Context;

use crate::mode::{parse_mode, Mode};
use crate::runner::Echo;

/// Log filter comes from `ORDLAB_LOG`, e.g. `ORDLAB_LOG=debug`.
pub fn init_logging() {
    let env = env_logger::Env::new()
        .filter("ORDLAB_LOG")
        .write_style("ORDLAB_LOG_STYLE");
    // A second init (e.g. from tests) is harmless.
    let _ = env_logger::try_init_from_env(env);
}

/// Prints the menu of `M` and reads the selection from `input`.
pub fn prompt_mode<M: Mode>(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> anyhow::Result<M> {
    for (i, entry) in M::MENU.iter().enumerate() {
        writeln!(output, "{i}: {entry}")?;
    }
    write!(output, "Select one of the run mode: ")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read the mode from stdin")?;
    writeln!(output)?;

    Ok(parse_mode::<M>(&line)?)
}

/// Runs one experiment program end to end with its default configuration.
pub fn run<M: Mode>() -> anyhow::Result<()> {
    init_logging();

    let mut stdout = io::stdout();
    let mode: M = prompt_mode(&mut io::stdin().lock(), &mut stdout)
        .with_context(|| format!("{}: invalid mode selection", M::FAMILY))?;
    log::info!("{}: running {mode:?}", M::FAMILY);

    let report = mode
        .run(&M::Config::default(), Echo::Stdout)
        .with_context(|| format!("{} experiment failed", M::FAMILY))?;
    print!("{report}");
    Ok(())
}

#[test]
fn prompt_prints_the_menu_and_parses_the_answer() {
    use crate::mode::PublishMode;
    let mut input = io::Cursor::new("1\n");
    let mut output = Vec::new();
    let mode: PublishMode = prompt_mode(&mut input, &mut output).unwrap();
    assert_eq!(mode, PublishMode::ReleaseAcquire);
    let printed = String::from_utf8(output).unwrap();
    assert!(printed.starts_with(
        "0: w/o release/acquire fences\n1: with release/acquire fences\n"
    ));
    assert!(printed.contains("Select one of the run mode: "));
}

#[test]
fn prompt_rejects_a_bad_answer() {
    use crate::mode::CounterMode;
    let mut input = io::Cursor::new("9\n");
    let mut output = Vec::new();
    let err = prompt_mode::<CounterMode>(&mut input, &mut output).unwrap_err();
    assert!(err.to_string().contains("there is no mode 9"));
}
