//! Command-table resolution. Case-insensitivity is a contract: callers
//! lower-case the line, and [`resolve`] normalizes again defensively.

/// Console commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliCommand {
    Unknown,
    Vip,
    Depart,
    Stop,
    Help,
    Exit,
}

/// Resolves a trimmed input line against the fixed command table.
pub fn resolve(line: &str) -> CliCommand {
    match line.trim().to_ascii_lowercase().as_str() {
        "vip" => CliCommand::Vip,
        "depart" => CliCommand::Depart,
        "stop" => CliCommand::Stop,
        "help" => CliCommand::Help,
        "exit" | "quit" => CliCommand::Exit,
        _ => CliCommand::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_commands_resolve() {
        assert_eq!(resolve("vip"), CliCommand::Vip);
        assert_eq!(resolve("depart"), CliCommand::Depart);
        assert_eq!(resolve("stop"), CliCommand::Stop);
        assert_eq!(resolve("help"), CliCommand::Help);
        assert_eq!(resolve("exit"), CliCommand::Exit);
        assert_eq!(resolve("quit"), CliCommand::Exit);
    }

    #[test]
    fn resolution_is_case_insensitive_and_trimmed() {
        assert_eq!(resolve("VIP"), CliCommand::Vip);
        assert_eq!(resolve("  Depart \n"), CliCommand::Depart);
        assert_eq!(resolve("QUIT"), CliCommand::Exit);
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert_eq!(resolve("launch"), CliCommand::Unknown);
        assert_eq!(resolve(""), CliCommand::Unknown);
        assert_eq!(resolve("vip now"), CliCommand::Unknown);
    }
}
