use std::{error::Error, path::PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use vdisk::VirtualDisk;

use crate::shell::{
    command::{execute_command, Command},
    start_shell,
};

#[derive(Parser, Debug)]
#[command(name = "vdisk", version)]
#[command(about = "Manage a filesystem stored in a single disk image")]
pub struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the disk image
    pub disk: PathBuf,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CliCommand {
    /// Create a virtual disk with the given size in kilobytes
    Create { size_kb: u64 },
    /// Remove the virtual disk
    Remove,
    /// Copy a host file into the disk, optionally under another name
    Cpto { src: PathBuf, dest: Option<String> },
    /// Copy a file out of the disk, optionally to another path
    Cpfrom { src: String, dest: Option<PathBuf> },
    /// Remove a file from the disk
    Rm { name: String },
    /// List files on the disk
    Ls,
    /// Show the image layout and data block usage
    Dump,
    /// Open an interactive shell on the disk
    Shell,
}

impl CliCommand {
    /// The shell command equivalent to a one-shot command that needs an open disk.
    fn as_command(&self) -> Option<Command> {
        match self {
            Self::Cpto { src, dest } => Some(Command::CopyIn(src.clone(), dest.clone())),
            Self::Cpfrom { src, dest } => Some(Command::CopyOut(src.clone(), dest.clone())),
            Self::Rm { name } => Some(Command::Rm {
                name: name.clone(),
                force: true,
            }),
            Self::Ls => Some(Command::Ls),
            Self::Dump => Some(Command::Dump),
            Self::Create { .. } | Self::Remove | Self::Shell => None,
        }
    }
}

pub fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        CliCommand::Create { size_kb } => {
            let disk = VirtualDisk::create(&cli.disk, size_kb)?;
            println!(
                "💾 Created disk {} ({} blocks)",
                cli.disk.display().to_string().green(),
                disk.header().block_count
            );
        }
        CliCommand::Remove => {
            VirtualDisk::destroy(&cli.disk)?;
            println!("🗑️ Removed disk {}", cli.disk.display().to_string().red());
        }
        CliCommand::Shell => start_shell(&cli.disk)?,
        ref other => {
            if let Some(cmd) = other.as_command() {
                let mut disk = VirtualDisk::open(&cli.disk)?;
                execute_command(&cmd, &mut disk)?;
            }
        }
    }
    Ok(())
}
