//! Line commands read from stdin.

use std::str::FromStr;

use ringfall_core::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Reset,
    /// Move the first zone to `(x, z)`, keeping its height.
    Ring { x: f32, z: f32 },
    /// Drop one entity at a fixed point.
    Drop { kind: EntityKind, position: [f32; 3] },
    Status,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected} argument(s)")]
    Arity {
        command: &'static str,
        expected: usize,
    },
    #[error("`{0}` is not a number")]
    Number(String),
    #[error("unknown entity kind `{0}`")]
    Kind(String),
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ParseCommandError::Empty)?;
        let args: Vec<&str> = words.collect();

        match name.to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "reset" => Ok(Self::Reset),
            "status" => Ok(Self::Status),
            "quit" | "exit" => Ok(Self::Quit),
            "ring" => {
                let [x, z] = numbers::<2>("ring", &args)?;
                Ok(Self::Ring { x, z })
            }
            "drop" => {
                let Some((kind, rest)) = args.split_first() else {
                    return Err(ParseCommandError::Arity {
                        command: "drop",
                        expected: 4,
                    });
                };
                let kind = match *kind {
                    "normal" => EntityKind::Normal,
                    "special" => EntityKind::Special,
                    other => return Err(ParseCommandError::Kind(other.to_owned())),
                };
                let position = numbers::<3>("drop", rest).map_err(|e| match e {
                    ParseCommandError::Arity { command, .. } => {
                        ParseCommandError::Arity { command, expected: 4 }
                    }
                    other => other,
                })?;
                Ok(Self::Drop { kind, position })
            }
            other => Err(ParseCommandError::Unknown(other.to_owned())),
        }
    }
}

fn numbers<const N: usize>(
    command: &'static str,
    args: &[&str],
) -> Result<[f32; N], ParseCommandError> {
    if args.len() != N {
        return Err(ParseCommandError::Arity {
            command,
            expected: N,
        });
    }
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg
            .parse()
            .map_err(|_| ParseCommandError::Number((*arg).to_owned()))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!("start".parse::<Command>(), Ok(Command::Start));
        assert_eq!("  STOP ".parse::<Command>(), Ok(Command::Stop));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_ring() {
        assert_eq!("ring 1.5 -2".parse::<Command>(), Ok(Command::Ring { x: 1.5, z: -2.0 }));
        assert_eq!(
            "ring 1".parse::<Command>(),
            Err(ParseCommandError::Arity {
                command: "ring",
                expected: 2
            })
        );
        assert_eq!(
            "ring a 1".parse::<Command>(),
            Err(ParseCommandError::Number("a".to_owned()))
        );
    }

    #[test]
    fn test_drop() {
        assert_eq!(
            "drop special 0 10 0".parse::<Command>(),
            Ok(Command::Drop {
                kind: EntityKind::Special,
                position: [0.0, 10.0, 0.0]
            })
        );
        assert_eq!(
            "drop gold 0 10 0".parse::<Command>(),
            Err(ParseCommandError::Kind("gold".to_owned()))
        );
        assert!(matches!(
            "drop normal 1".parse::<Command>(),
            Err(ParseCommandError::Arity { expected: 4, .. })
        ));
    }

    #[test]
    fn test_errors() {
        assert_eq!("".parse::<Command>(), Err(ParseCommandError::Empty));
        assert_eq!(
            "jump".parse::<Command>(),
            Err(ParseCommandError::Unknown("jump".to_owned()))
        );
    }
}
