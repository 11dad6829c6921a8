//! Line commands read from the driver's terminal.

use std::str::FromStr;

use bustrack_types::{BusStatus, UnknownStatus};

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin tracking.
    Start,
    /// Stop tracking.
    Stop,
    /// Start or stop.
    Toggle,
    /// Send one report now.
    Manual,
    /// Select a route.
    Route(String),
    /// Select a bus.
    Bus(String),
    /// Change the reported status.
    Status(BusStatus),
    /// Print the activity log.
    Log,
    /// Print routes and buses from the catalog.
    Help,
    /// Exit.
    Quit,
}

/// A line that is not a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Unrecognized verb.
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),

    /// A verb that needs an argument got none.
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    /// `status` with an unknown value.
    #[error(transparent)]
    Status(#[from] UnknownStatus),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();

        let command = match verb.as_str() {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "toggle" => Self::Toggle,
            "manual" => Self::Manual,
            "log" => Self::Log,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "route" => Self::Route(arg.ok_or(CommandError::MissingArgument("route"))?.to_owned()),
            "bus" => Self::Bus(arg.ok_or(CommandError::MissingArgument("bus"))?.to_owned()),
            "status" => Self::Status(arg.ok_or(CommandError::MissingArgument("status"))?.parse()?),
            _ => return Err(CommandError::Unknown(line.trim().to_owned())),
        };
        Ok(command)
    }
}
