//! Operator actions and the console command grammar.
//!
//! A line is either a JSON action (`{"action": "toggle", "control": "pwr-1"}`)
//! or a short text command (`toggle pwr-1`). Host-only commands such as
//! `status` never reach the panel's dispatch.

use crate::error::ActionParseError;
use crate::subsystems::NumericField;
use serde::{Deserialize, Serialize};

pub const MAX_COMMAND_SIZE: usize = 512;

/// One state transition request. Control keys stay as strings; an unknown
/// key is a no-op at dispatch, never a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Toggle { control: String },
    SetValue { control: String, value: f64 },
    SetSystemValue { field: NumericField, value: f64 },
    StartEngine,
    StopEngine,
    NavigationCommand { text: String },
    PrimeShip,
    KillSwitch,
    NextConsole,
    PreviousConsole,
    Transmit,
    Receive,
    ClearLogs,
    Save,
}

impl Action {
    pub fn toggle(control: impl Into<String>) -> Self {
        Action::Toggle {
            control: control.into(),
        }
    }

    pub fn set_value(control: impl Into<String>, value: f64) -> Self {
        Action::SetValue {
            control: control.into(),
            value,
        }
    }

    pub fn navigation(text: impl Into<String>) -> Self {
        Action::NavigationCommand { text: text.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Toggle { .. } => "toggle",
            Action::SetValue { .. } => "set_value",
            Action::SetSystemValue { .. } => "set_system_value",
            Action::StartEngine => "start_engine",
            Action::StopEngine => "stop_engine",
            Action::NavigationCommand { .. } => "navigation_command",
            Action::PrimeShip => "prime_ship",
            Action::KillSwitch => "kill_switch",
            Action::NextConsole => "next_console",
            Action::PreviousConsole => "previous_console",
            Action::Transmit => "transmit",
            Action::Receive => "receive",
            Action::ClearLogs => "clear_logs",
            Action::Save => "save",
        }
    }
}

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Dispatch(Action),
    Status,
    Logs,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  toggle <control>            flip a switch (e.g. toggle pwr-1)
  set <control> <value>       move a dial (e.g. set out-1 50)
  system <field> <value>      write a ship reading (e.g. system hull-integrity 40)
  engine start|stop           run or stop the ignition sequence
  nav <text>                  navigation console input (start, quit)
  prime | kill                SAFE/ARM/LOCK on, or all footer keys off
  console next|prev           cycle the navigation console
  transmit | receive          outernet link actions
  status | logs | clear-logs  panel readouts
  save | quit";

pub fn parse_command(line: &str) -> Result<ConsoleCommand, ActionParseError> {
    let line = line.trim();
    if line.len() > MAX_COMMAND_SIZE {
        return Err(ActionParseError::TooLong(MAX_COMMAND_SIZE));
    }
    if line.is_empty() {
        return Err(ActionParseError::Empty);
    }

    if line.starts_with('{') {
        return parse_json_action(line).map(ConsoleCommand::Dispatch);
    }

    let mut words = line.split_whitespace();
    let verb = words.next().ok_or(ActionParseError::Empty)?;

    let command = match verb.to_ascii_lowercase().as_str() {
        "toggle" | "t" => {
            let control = words.next().ok_or(ActionParseError::MissingArgument("control"))?;
            ConsoleCommand::Dispatch(Action::toggle(control))
        }
        "set" => {
            let control = words.next().ok_or(ActionParseError::MissingArgument("control"))?;
            let value = parse_number(words.next())?;
            ConsoleCommand::Dispatch(Action::set_value(control, value))
        }
        "system" => {
            let field = words
                .next()
                .ok_or(ActionParseError::MissingArgument("field"))?
                .parse::<NumericField>()?;
            let value = parse_number(words.next())?;
            ConsoleCommand::Dispatch(Action::SetSystemValue { field, value })
        }
        "engine" => match words.next() {
            Some("start") => ConsoleCommand::Dispatch(Action::StartEngine),
            Some("stop") => ConsoleCommand::Dispatch(Action::StopEngine),
            Some(other) => return Err(ActionParseError::UnknownCommand(format!("engine {}", other))),
            None => return Err(ActionParseError::MissingArgument("start|stop")),
        },
        "nav" => {
            let text = line[verb.len()..].trim();
            if text.is_empty() {
                return Err(ActionParseError::MissingArgument("text"));
            }
            ConsoleCommand::Dispatch(Action::navigation(text))
        }
        "console" => match words.next() {
            Some("next") => ConsoleCommand::Dispatch(Action::NextConsole),
            Some("prev") | Some("previous") => ConsoleCommand::Dispatch(Action::PreviousConsole),
            Some(other) => return Err(ActionParseError::UnknownCommand(format!("console {}", other))),
            None => return Err(ActionParseError::MissingArgument("next|prev")),
        },
        "prime" => ConsoleCommand::Dispatch(Action::PrimeShip),
        "kill" => ConsoleCommand::Dispatch(Action::KillSwitch),
        "transmit" => ConsoleCommand::Dispatch(Action::Transmit),
        "receive" => ConsoleCommand::Dispatch(Action::Receive),
        "clear-logs" => ConsoleCommand::Dispatch(Action::ClearLogs),
        "save" => ConsoleCommand::Dispatch(Action::Save),
        "status" => ConsoleCommand::Status,
        "logs" => ConsoleCommand::Logs,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ActionParseError::UnknownCommand(other.to_string())),
    };

    Ok(command)
}

pub fn parse_json_action(json_str: &str) -> Result<Action, ActionParseError> {
    if json_str.len() > MAX_COMMAND_SIZE {
        return Err(ActionParseError::TooLong(MAX_COMMAND_SIZE));
    }
    serde_json::from_str::<Action>(json_str).map_err(|e| ActionParseError::Json(e.to_string()))
}

fn parse_number(word: Option<&str>) -> Result<f64, ActionParseError> {
    let word = word.ok_or(ActionParseError::MissingArgument("value"))?;
    word.parse::<f64>()
        .map_err(|_| ActionParseError::InvalidNumber(word.to_string()))
}
