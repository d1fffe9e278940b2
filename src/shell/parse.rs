use std::path::PathBuf;

use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls),
        "dump" => Some(Command::Dump),
        "cpto" => args.first().map(|&src| {
            Command::CopyIn(PathBuf::from(src), args.get(1).map(|s| s.to_string()))
        }),
        "cpfrom" => args
            .first()
            .map(|&src| Command::CopyOut(src.to_string(), args.get(1).map(PathBuf::from))),
        "rm" => match args {
            ["-f", name] => Some(Command::Rm {
                name: name.to_string(),
                force: true,
            }),
            [name] => Some(Command::Rm {
                name: name.to_string(),
                force: false,
            }),
            _ => None,
        },
        "cat" => args.first().map(|&name| Command::Cat(name.to_string())),
        "clear" => Some(Command::Clear),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}
