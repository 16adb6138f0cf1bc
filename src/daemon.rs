use crate::sensors::{SensorError, SensorRegistry};
use anyhow::Result;
use std::io::{BufRead, Write};

const PROMPT: &str = "ksysguardd> ";

/// Session banner. The protocol version line is what the console keys
/// on; the rest is free-form.
const HEADER: &str = "ksysguardd 4\n\
mdsensord - Linux MD-RAID status backend\n\
This program is not affiliated with the KDE Project.";

/// Run the ksysguardd command loop until `quit` or EOF.
///
/// stdout carries protocol output only; diagnostics go to the logger
/// on stderr. One command is answered in full before the next line is
/// read, and every sensor query re-reads the status source.
pub fn run(registry: &SensorRegistry, mut input: impl BufRead, mut output: impl Write) -> Result<()> {
    writeln!(output, "{}", HEADER)?;

    let mut line = String::new();
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        match normalize(&line) {
            "" => {}
            "quit" => break,
            "monitors" => {
                for def in registry.list() {
                    writeln!(output, "{}\tinteger", def.name)?;
                }
            }
            info if info.ends_with('?') => {
                respond(&mut output, describe(registry, &info[..info.len() - 1]))?;
            }
            sensor => respond(&mut output, read_value(registry, sensor))?,
        }
    }
    Ok(())
}

/// ksysguardd quirks: trailing whitespace is ignored, a command that
/// starts with whitespace yields empty output, and only the first
/// whitespace-separated token of a line is interpreted.
fn normalize(line: &str) -> &str {
    let line = line.trim_end();
    if line.starts_with(char::is_whitespace) {
        return "";
    }
    line.split_whitespace().next().unwrap_or("")
}

fn read_value(registry: &SensorRegistry, name: &str) -> Result<String, SensorError> {
    registry.value(name).map(|v| v.to_string())
}

/// Info reply: description, min, max, then the unit when there is one.
fn describe(registry: &SensorRegistry, name: &str) -> Result<String, SensorError> {
    let def = registry.describe(name)?;
    Ok(match def.unit {
        Some(unit) => format!("{}\t{}\t{}\t{}", def.description, def.min, def.max, unit),
        None => format!("{}\t{}\t{}", def.description, def.min, def.max),
    })
}

fn respond(output: &mut impl Write, result: Result<String, SensorError>) -> Result<()> {
    match result {
        Ok(reply) => writeln!(output, "{}", reply)?,
        Err(SensorError::UnknownSensor(_)) => writeln!(output, "UNKNOWN COMMAND")?,
        Err(err @ SensorError::SourceUnavailable { .. }) => {
            // Transient by definition: the very next query retries the read.
            log::error!("{}", err);
            writeln!(output, "UNAVAILABLE!")?;
        }
    }
    Ok(())
}
