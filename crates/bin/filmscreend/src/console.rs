//! Line-oriented operator console.
//!
//! Each line read from stdin is one instruction:
//!
//! | Line | Effect |
//! |------|--------|
//! | `open <motor>` / `close <motor>` / `stop <motor>` | cover service on motor `A`..`D` |
//! | `recall <n>` / `store <n>` | preset service on the whole device |
//! | `status` | print every cover's state |
//! | `quit` | shut down |

use std::str::FromStr;

use filmscreen_app::services::preset_service::{RECALL_PRESET, STORE_PRESET};
use filmscreen_domain::protocol::{Motor, UnknownMotor};
use serde_json::{Value, json};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Invoke a platform service.
    Service {
        /// Unique id of the addressed cover, if the service needs one.
        target: Option<String>,
        service: &'static str,
        data: Value,
    },
    Status,
    Quit,
}

/// Why a console line could not be understood.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("unknown instruction {0:?}")]
    UnknownInstruction(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error(transparent)]
    Motor(#[from] UnknownMotor),
    #[error("cover services address a single motor, not {0}")]
    NotAPhysicalMotor(Motor),
}

/// Parse one line. Blank lines yield `Ok(None)`.
///
/// Cover targets are resolved to `{device_id}_{motor}`.
///
/// # Errors
///
/// Returns a [`ConsoleError`] for anything that is not a known instruction.
pub fn parse(line: &str, device_id: &str) -> Result<Option<Instruction>, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();

    let instruction = match verb.to_ascii_lowercase().as_str() {
        "open" => cover(device_id, "open_cover", argument)?,
        "close" => cover(device_id, "close_cover", argument)?,
        "stop" => cover(device_id, "stop_cover", argument)?,
        "recall" => preset(RECALL_PRESET, argument)?,
        "store" => preset(STORE_PRESET, argument)?,
        "status" => Instruction::Status,
        "quit" | "exit" => Instruction::Quit,
        other => return Err(ConsoleError::UnknownInstruction(other.to_string())),
    };
    Ok(Some(instruction))
}

fn cover(
    device_id: &str,
    service: &'static str,
    argument: Option<&str>,
) -> Result<Instruction, ConsoleError> {
    let motor = Motor::from_str(argument.ok_or(ConsoleError::MissingArgument(service))?)?;
    if motor == Motor::All {
        return Err(ConsoleError::NotAPhysicalMotor(motor));
    }
    Ok(Instruction::Service {
        target: Some(format!("{device_id}_{motor}")),
        service,
        data: json!({}),
    })
}

// The number is passed through as text; the preset service validates it.
fn preset(service: &'static str, argument: Option<&str>) -> Result<Instruction, ConsoleError> {
    let number = argument.ok_or(ConsoleError::MissingArgument(service))?;
    Ok(Instruction::Service {
        target: None,
        service,
        data: json!({ "preset_number": number }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_skip_blank_lines() {
        assert_eq!(parse("   ", "cvm"), Ok(None));
    }

    #[test]
    fn should_target_cover_by_motor() {
        assert_eq!(
            parse("open b", "cvm").unwrap(),
            Some(Instruction::Service {
                target: Some("cvm_B".to_string()),
                service: "open_cover",
                data: json!({}),
            })
        );
    }

    #[test]
    fn should_parse_stop_and_close() {
        let Some(Instruction::Service { service, .. }) = parse("STOP D", "cvm").unwrap() else {
            panic!("expected a service call");
        };
        assert_eq!(service, "stop_cover");

        let Some(Instruction::Service { service, .. }) = parse("close a", "cvm").unwrap() else {
            panic!("expected a service call");
        };
        assert_eq!(service, "close_cover");
    }

    #[test]
    fn should_send_presets_without_target() {
        assert_eq!(
            parse("recall 3", "cvm").unwrap(),
            Some(Instruction::Service {
                target: None,
                service: "recall_preset",
                data: json!({"preset_number": "3"}),
            })
        );
    }

    #[test]
    fn should_require_an_argument() {
        assert_eq!(
            parse("store", "cvm"),
            Err(ConsoleError::MissingArgument("store_preset"))
        );
        assert_eq!(
            parse("open", "cvm"),
            Err(ConsoleError::MissingArgument("open_cover"))
        );
    }

    #[test]
    fn should_reject_broadcast_cover_target() {
        assert_eq!(
            parse("open all", "cvm"),
            Err(ConsoleError::NotAPhysicalMotor(Motor::All))
        );
    }

    #[test]
    fn should_reject_unknown_motor() {
        assert!(matches!(
            parse("open E", "cvm"),
            Err(ConsoleError::Motor(_))
        ));
    }

    #[test]
    fn should_parse_status_and_quit() {
        assert_eq!(parse("status", "cvm"), Ok(Some(Instruction::Status)));
        assert_eq!(parse("quit", "cvm"), Ok(Some(Instruction::Quit)));
        assert_eq!(parse("exit", "cvm"), Ok(Some(Instruction::Quit)));
    }

    #[test]
    fn should_reject_unknown_instruction() {
        assert_eq!(
            parse("toggle A", "cvm"),
            Err(ConsoleError::UnknownInstruction("toggle".to_string()))
        );
    }
}
