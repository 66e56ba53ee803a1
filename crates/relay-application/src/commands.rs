//! Builtin chat commands provided by the system.
//!
//! These commands are always available and cannot be modified by users.
//! They are loaded once at startup and cached for the lifetime of the process.

use std::sync::OnceLock;

/// A builtin chat command.
#[derive(Debug, Clone)]
pub struct BuiltinCommand {
    /// Command name (with the leading /)
    pub name: &'static str,
    /// Usage format (e.g., "/update [task] [note]")
    pub usage: &'static str,
    /// Human-readable description
    pub description: &'static str,
}

impl BuiltinCommand {
    /// Creates a new builtin command.
    pub const fn new(name: &'static str, usage: &'static str, description: &'static str) -> Self {
        Self {
            name,
            usage,
            description,
        }
    }
}

/// Static storage for builtin commands (initialized once).
static BUILTIN_COMMANDS: OnceLock<Vec<BuiltinCommand>> = OnceLock::new();

/// Returns a reference to all builtin commands.
///
/// The commands are initialized on first access and cached for subsequent
/// calls.
pub fn builtin_commands() -> &'static [BuiltinCommand] {
    BUILTIN_COMMANDS.get_or_init(|| {
        vec![
            BuiltinCommand::new("/help", "/help", "Show available commands and their usage"),
            BuiltinCommand::new(
                "/assigned",
                "/assigned",
                "List your open tasks with their reference codes",
            ),
            BuiltinCommand::new(
                "/update",
                "/update [task] [note]",
                "Record progress on a task; with no arguments, pick from a list",
            ),
            BuiltinCommand::new(
                "/complete",
                "/complete [task] [note]",
                "Mark a task as resolved; with no arguments, pick from a list",
            ),
            BuiltinCommand::new("/status", "/status", "Summarize your reported and assigned work"),
        ]
    })
}

/// Find a builtin command by name (exact match, including the slash).
pub fn find_builtin_command(name: &str) -> Option<&'static BuiltinCommand> {
    builtin_commands().iter().find(|cmd| cmd.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_commands_initialized() {
        let commands = builtin_commands();
        assert!(!commands.is_empty());
        assert!(commands.iter().any(|c| c.name == "/help"));
        assert!(commands.iter().any(|c| c.name == "/complete"));
    }

    #[test]
    fn test_find_builtin_command() {
        assert!(find_builtin_command("/help").is_some());
        assert!(find_builtin_command("/nonexistent").is_none());
        assert!(find_builtin_command("help").is_none());
    }
}
