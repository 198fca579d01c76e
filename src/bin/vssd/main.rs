use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use log::LevelFilter;
use log::{debug, error, info, warn};
use structopt::StructOpt;
use vssd::{
    parse_lba, parse_size, BufferImage, Command, CommandBuffer, ErrorKind, Ssd, Storage,
};

mod file_storage;
mod shell;

use file_storage::FileStorage;

#[derive(StructOpt)]
#[structopt(name = "vssd", about = "Virtual SSD with a write-back command buffer")]
struct Opt {
    /// File holding one value per logical block.
    #[structopt(long, default_value = "ssd_nand.txt", parse(from_os_str))]
    nand: PathBuf,

    /// File receiving the result of the last read, or ERROR.
    #[structopt(long, default_value = "ssd_output.txt", parse(from_os_str))]
    output: PathBuf,

    /// File persisting buffered commands between runs.
    #[structopt(long, default_value = "ssd_buffer.bin", parse(from_os_str))]
    buffer: PathBuf,

    /// Log more, repeat for more detail.
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(StructOpt)]
enum Cmd {
    /// Read one block.
    #[structopt(name = "R", alias = "read")]
    Read {
        #[structopt(allow_hyphen_values = true)]
        lba: String,
    },
    /// Write a 0xHHHHHHHH value to one block.
    #[structopt(name = "W", alias = "write")]
    Write {
        #[structopt(allow_hyphen_values = true)]
        lba: String,
        value: String,
    },
    /// Erase up to 10 blocks.
    #[structopt(name = "E", alias = "erase")]
    Erase {
        #[structopt(allow_hyphen_values = true)]
        lba: String,
        #[structopt(allow_hyphen_values = true)]
        size: String,
    },
    /// Push every buffered command to the device.
    #[structopt(name = "F", alias = "flush")]
    Flush,
    /// Interactive shell.
    #[structopt(name = "shell")]
    Shell,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Submit a command built from user input, or report why it could not be built.
fn submit<T: Storage>(buffer: &mut CommandBuffer<T>, command: Result<Command, ErrorKind>) {
    match command {
        Ok(command) => {
            if let Err(kind) = buffer.submit(command) {
                warn!("{:?} failed: {}", command, kind);
            }
        }
        Err(kind) => buffer.ssd_mut().report_error(kind),
    }
}

fn load_buffer<T: Storage>(buffer: &mut CommandBuffer<T>, path: &Path) {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no buffer image at {}", path.display());
            return;
        }
        Err(e) => {
            warn!("cannot read {}: {}, starting with an empty buffer", path.display(), e);
            return;
        }
    };
    let restored = BufferImage::try_from(&bytes[..]).and_then(|image| buffer.restore(&image));
    if let Err(kind) = restored {
        warn!("discarding buffer image {}: {}", path.display(), kind);
    }
}

fn save_buffer<T: Storage>(buffer: &CommandBuffer<T>, path: &Path) -> io::Result<()> {
    let image = buffer
        .snapshot()
        .map_err(|kind| io::Error::new(io::ErrorKind::Other, kind.to_string()))?;
    fs::write(path, image.bytes())
}

fn run(opt: Opt) -> io::Result<()> {
    let storage = FileStorage::open(&opt.nand, &opt.output)?;
    let fresh = storage.is_fresh();
    let mut ssd = Ssd::new(storage);
    if fresh {
        info!("formatting {}", opt.nand.display());
        ssd.format();
    }

    let mut buffer = CommandBuffer::new(ssd);
    load_buffer(&mut buffer, &opt.buffer);

    match &opt.cmd {
        Cmd::Read { lba } => submit(&mut buffer, parse_lba(lba).and_then(Command::read)),
        Cmd::Write { lba, value } => submit(
            &mut buffer,
            parse_lba(lba).and_then(|lba| Command::write_str(lba, value)),
        ),
        Cmd::Erase { lba, size } => submit(
            &mut buffer,
            parse_lba(lba).and_then(|lba| Command::erase(lba, parse_size(size)?)),
        ),
        Cmd::Flush => {
            if let Err(kind) = buffer.flush() {
                warn!("flush finished with errors: {}", kind);
            }
        }
        Cmd::Shell => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            shell::run(&mut buffer, stdin.lock(), &mut stdout.lock())?;
        }
    }

    save_buffer(&buffer, &opt.buffer)?;
    buffer.ssd_mut().storage_mut().sync()
}

fn main() {
    let opt = Opt::from_args();

    env_logger::builder()
        .format_timestamp_nanos()
        .filter_level(level(opt.verbose))
        .init();

    if let Err(e) = run(opt) {
        error!("{}", e);
        process::exit(1);
    }
}
