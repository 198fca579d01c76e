//! Interactive shell that drives the command buffer in-process.
//!
//! Commands:
//! - `write <lba> <value>` - buffer a write, `value` is `0x` followed by up to 8 hex digits
//! - `read <lba>` - print the value of one block
//! - `erase <lba> <size>` - erase `size` blocks, split into device sized chunks
//! - `erase_range <start> <end>` - erase blocks `start` through `end` inclusive
//! - `fullwrite <value>` - write the same value to every block
//! - `fullread` - print every block
//! - `flush` - push buffered commands to storage
//! - `help` - show usage
//! - `exit` - leave the shell

use std::io::{self, BufRead, Write};

use log::debug;
use vssd::{
    parse_lba, parse_size, Command, CommandBuffer, ErrorKind, Storage, Value, ERROR_SENTINEL,
    NUM_LBA,
};

const PROMPT: &str = "Shell > ";
const INVALID: &str = "INVALID COMMAND";

const HELP: &str = "\
Available commands:
  write <LBA> <Value>         : write a value to one LBA
  read <LBA>                  : read one LBA
  erase <LBA> <Size>          : erase Size LBAs starting at LBA
  erase_range <Start> <End>   : erase LBAs Start through End
  fullwrite <Value>           : write a value to every LBA
  fullread                    : read every LBA
  flush                       : write buffered commands to the device
  help                        : show this text
  exit                        : leave the shell";

#[derive(Debug, PartialEq)]
pub(crate) enum ShellCommand {
    Write(usize, Value),
    Read(usize),
    Erase(Vec<Command>),
    FullWrite(Value),
    FullRead,
    Flush,
    Help,
    Exit,
}

/// Parse one input line. `None` means the line is not a valid command.
pub(crate) fn parse_line(line: &str) -> Option<ShellCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (name, args) = parts.split_first()?;
    let cmd = match (*name, args) {
        ("write", [lba, value]) => {
            ShellCommand::Write(parse_lba(lba).ok()?, Value::parse_loose(value).ok()?)
        }
        ("read", [lba]) => ShellCommand::Read(parse_lba(lba).ok()?),
        ("erase", [lba, size]) => {
            let lba = parse_lba(lba).ok()?;
            let end = (lba + parse_size(size).ok()?).min(NUM_LBA);
            ShellCommand::Erase(Command::erase_range(lba, end).ok()?)
        }
        ("erase_range", [start, end]) => {
            let start = parse_lba(start).ok()?;
            let end = parse_lba(end).ok()?;
            if end < start {
                return None;
            }
            ShellCommand::Erase(Command::erase_range(start, end + 1).ok()?)
        }
        ("fullwrite", [value]) => ShellCommand::FullWrite(Value::parse_loose(value).ok()?),
        ("fullread", []) => ShellCommand::FullRead,
        ("flush", []) => ShellCommand::Flush,
        ("help", []) => ShellCommand::Help,
        ("exit", []) => ShellCommand::Exit,
        _ => return None,
    };
    Some(cmd)
}

/// Run one parsed command. Returns `false` once the shell should stop.
pub(crate) fn execute<T: Storage, W: Write>(
    buffer: &mut CommandBuffer<T>,
    cmd: ShellCommand,
    out: &mut W,
) -> io::Result<bool> {
    debug!("shell {:?}", cmd);
    let result: Result<String, ErrorKind> = match cmd {
        ShellCommand::Write(lba, value) => Command::write(lba, value)
            .and_then(|c| buffer.submit(c))
            .map(|_| "[Write] Done".to_string()),
        ShellCommand::Read(lba) => buffer
            .read(lba)
            .map(|value| format!("[Read] LBA {:02} : {}", lba, value)),
        ShellCommand::Erase(cmds) => cmds
            .into_iter()
            .try_for_each(|c| buffer.submit(c))
            .map(|_| "[Erase] Done".to_string()),
        ShellCommand::FullWrite(value) => (0..NUM_LBA)
            .try_for_each(|lba| buffer.submit(Command::write(lba, value)?))
            .map(|_| "[Full Write] Done".to_string()),
        ShellCommand::FullRead => Ok((0..NUM_LBA)
            .map(|lba| match buffer.read(lba) {
                Ok(value) => format!("[Full Read] LBA {:02} : {}", lba, value),
                Err(_) => format!("[Full Read] LBA {:02} : {}", lba, ERROR_SENTINEL),
            })
            .collect::<Vec<_>>()
            .join("\n")),
        ShellCommand::Flush => buffer.flush().map(|_| "[Flush] Done".to_string()),
        ShellCommand::Help => Ok(HELP.to_string()),
        ShellCommand::Exit => return Ok(false),
    };

    match result {
        Ok(text) => writeln!(out, "{}", text)?,
        Err(kind) => {
            debug!("shell command failed: {}", kind);
            writeln!(out, "{}", INVALID)?;
        }
    }
    Ok(true)
}

pub(crate) fn run<T: Storage, R: BufRead, W: Write>(
    buffer: &mut CommandBuffer<T>,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    write!(out, "{}", PROMPT)?;
    out.flush()?;
    for line in input.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            match parse_line(&line) {
                Some(cmd) => {
                    if !execute(buffer, cmd, out)? {
                        return Ok(());
                    }
                }
                None => writeln!(out, "{}", INVALID)?,
            }
        }
        write!(out, "{}", PROMPT)?;
        out.flush()?;
    }
    Ok(())
}
