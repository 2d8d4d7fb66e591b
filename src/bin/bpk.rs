//! List, extract, or create pak files.
//!
//! ```text
//! bpk [-v] <magic> list <file>
//! bpk [-v] <magic> cat <file> <entry>
//! bpk [-v] <magic> pack <out> <file>...
//! ```

use bpk::Pak;
use std::error;
use std::fs;
use std::io::{self, Write};
use tracing::{info, Level};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [-v] <magic> list <file>", program);
    eprintln!("       {} [-v] <magic> cat <file> <entry>", program);
    eprintln!("       {} [-v] <magic> pack <out> <file>...", program);
    std::process::exit(1);
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let mut args: Vec<String> = std::env::args().collect();
    let program = args.remove(0);

    let verbose = args.first().map_or(false, |x| x == "-v");
    if verbose {
        args.remove(0);
    }

    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(io::stderr)
        .init();

    if args.len() < 3 {
        usage(&program);
    }

    let magic = &args[0];
    let command = &args[1];
    let path = &args[2];

    match (command.as_str(), &args[3..]) {
        ("list", []) => {
            let pak = Pak::from_slice(magic.as_str(), &fs::read(path)?)?;
            let mut stdout = io::stdout().lock();
            for name in pak.list_entries() {
                writeln!(stdout, "{}", name)?;
            }
        }
        ("cat", [entry]) => {
            let pak = Pak::from_slice(magic.as_str(), &fs::read(path)?)?;
            io::stdout().lock().write_all(pak.read(entry)?)?;
        }
        ("pack", files) if !files.is_empty() => {
            let mut pak = Pak::new(magic.as_str());
            for file in files {
                pak.write(file.as_str(), fs::read(file)?);
            }

            let out = fs::File::create(path)?;
            let mut writer = io::BufWriter::new(out);
            pak.export_to(&mut writer)?;
            writer.flush()?;
            info!(entries = pak.len(), out = %path, "packed");
        }
        _ => usage(&program),
    }

    Ok(())
}
