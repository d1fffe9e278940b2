use colored::*;
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    error::Error,
    fs::File,
    io::{stdout, BufWriter},
    path::{Path, PathBuf},
};
use vdisk::{DiskDump, VfsError, VirtualDisk, MAX_NAME};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Ls,
    Dump,
    CopyIn(PathBuf, Option<String>),
    CopyOut(String, Option<PathBuf>),
    Rm { name: String, force: bool },
    Cat(String),
    Clear,
    Exit,
}

pub fn execute_command(cmd: &Command, disk: &mut VirtualDisk) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Ls => print_listing(disk),
        Command::Dump => print_dump(&disk.dump()),
        Command::CopyIn(src, dest) => {
            let name = match dest {
                Some(name) => name.clone(),
                None => default_name(src)?,
            };
            copy_in(disk, src, &name)?;
            println!("📝 Copied {} -> {}", src.display(), name.green());
        }
        Command::CopyOut(src, dest) => {
            let dest = dest.clone().unwrap_or_else(|| PathBuf::from(src));
            let size = copy_out(disk, src, &dest)?;
            println!("📤 Copied {} -> {} ({}B)", src, dest.display().to_string().cyan(), size);
        }
        Command::Rm { name, force } => {
            if disk.file(name).is_none() {
                return Err(VfsError::FileNotFound(name.clone()).into());
            }
            if !force
                && !Confirm::new()
                    .with_prompt(format!("Remove {name}?"))
                    .default(false)
                    .interact()?
            {
                println!("{}", "Cancelled".bright_black());
                return Ok(());
            }
            disk.remove(name)?;
            println!("❌ Deleted file: {}", name.red());
        }
        Command::Cat(name) => {
            let bytes = disk.read(name)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        Command::Clear => {
            execute!(stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        }
        Command::Exit => println!("{}", "👋 Exiting vdisk shell...".yellow().bold()),
    }

    Ok(())
}

/// Name a host file gets on the disk when none is given: its last path component.
fn default_name(src: &Path) -> Result<String, VfsError> {
    src.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| VfsError::InvalidName(src.display().to_string()))
}

fn progress_bar(len: u64, msg: &'static str) -> ProgressBar {
    let style = ProgressStyle::with_template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(len).with_style(style).with_message(msg)
}

/// Stream a host file into the disk, showing progress on stderr.
///
/// Only the file's length is looked at before the disk accepts the name
/// and size; the contents are then read one block at a time.
fn copy_in(disk: &mut VirtualDisk, src: &Path, name: &str) -> Result<(), VfsError> {
    let label = src.display().to_string();
    let unreadable = |source| VfsError::SourceFileUnreadable {
        target: label.clone(),
        source,
    };

    let file = File::open(src).map_err(unreadable)?;
    let len = file.metadata().map_err(unreadable)?.len();
    disk.check_add(name, len)?;

    let pb = progress_bar(len, "reading");
    disk.add_from(name, len, pb.wrap_read(file), &label)?;
    pb.finish_and_clear();
    Ok(())
}

fn copy_out(disk: &mut VirtualDisk, src: &str, dest: &Path) -> Result<u64, VfsError> {
    let size = disk
        .file(src)
        .ok_or_else(|| VfsError::FileNotFound(src.to_string()))?
        .size;
    let target = dest.display().to_string();
    let out = File::create(dest).map_err(|source| VfsError::DestinationUnwritable {
        target: target.clone(),
        source,
    })?;

    let pb = progress_bar(size, "writing");
    let written = disk.extract(src, pb.wrap_write(BufWriter::new(out)), &target)?;
    pb.finish_and_clear();
    Ok(written)
}

pub fn format_listing<'a>(
    files: impl Iterator<Item = (&'a str, u64)>,
    free: u64,
    total: u64,
) -> String {
    let mut out = String::new();
    let mut empty = true;
    for (name, size) in files {
        empty = false;
        out.push_str(&format!("{:<width$}{}B\n", name, size, width = MAX_NAME + 5));
    }
    if empty {
        out.push_str("no files\n");
    }
    out.push_str(&format!("\nfree: {}/{}KB", free >> 10, total >> 10));
    out
}

fn print_listing(disk: &VirtualDisk) {
    let listing = format_listing(disk.list(), disk.free_space(), disk.total_bytes());
    for line in listing.lines() {
        if line.starts_with("free:") {
            println!("{}", line.bright_blue());
        } else {
            println!("{line}");
        }
    }
}

pub fn format_dump(dump: &DiskDump<'_>) -> String {
    let mut out = String::from("map [bytes]\n");
    for region in &dump.regions {
        if region.is_empty() {
            out.push_str(&format!("{}- - {}\n", region.start, region.name));
        } else {
            out.push_str(&format!(
                "{}-{} - {}\n",
                region.start,
                region.end - 1,
                region.name
            ));
        }
    }
    out.push_str(&format!("\n{:<10}{:<10}{:<10}\n", "index", "IN_USE", "next_block"));
    for (index, status) in dump.blocks.iter().enumerate() {
        let next = status
            .next_block
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        out.push_str(&format!(
            "{:<10}{:<10}{:<10}\n",
            index,
            u8::from(status.in_use),
            next
        ));
    }
    out
}

fn print_dump(dump: &DiskDump<'_>) {
    let report = format_dump(dump);
    let table_start = dump.regions.len() + 3;
    for (i, line) in report.lines().enumerate() {
        let used = i >= table_start && dump.blocks[i - table_start].in_use;
        if i == 0 {
            println!("{}", line.bright_yellow().bold());
        } else if used {
            println!("{}", line.green());
        } else {
            println!("{line}");
        }
    }
}

fn print_help() {
    println!("{}", "📘 vdisk Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls                   List files on the disk
  dump                 Show image layout and data block usage
  cpto <src> [dest]    Copy host file <src> into the disk
  cpfrom <src> [dest]  Copy disk file <src> out to the host
  rm [-f] <file>       Remove file (-f skips confirmation)
  cat <file>           Print file content
  clear                Clear the screen
  help                 Show this help message
  exit                 Quit the shell
"
        .bright_black()
    );
}
