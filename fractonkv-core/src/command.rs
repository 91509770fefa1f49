//! Decoded-frame to tagged-command translation (§4.D).

use std::str::FromStr;

use bytes::Bytes;
use strum::{Display, EnumString};

use crate::codec::RequestFrame;
use crate::errors::ParseError;

/// The twelve command verbs this server understands, plus the wire names
/// they're matched against (ASCII uppercase, per §6.1).
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Verb {
    Set,
    Get,
    Del,
    Add,
    Addn,
    Lpush,
    Getl,
    Has,
    Dell,
    Deleleml,
    Delall,
    Hello,
}

/// A fully parsed request, ready for dispatch (§3 "Command value").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: Bytes, val: Bytes, ind: i64 },
    Get { key: Bytes, ind: i64 },
    Delete { key: Bytes, ind: i64 },
    Add { key: Bytes, ind: i64 },
    AddN { key: Bytes, val: Bytes, ind: i64 },
    LPush { key: Bytes, val: Bytes, ind: i64 },
    GetL { key: Bytes, ind: i64 },
    Has { key: Bytes, ind: i64 },
    DeleteL { key: Bytes, ind: i64 },
    DelElemL { key: Bytes, val: Bytes, ind: i64 },
    DelAll { key: Bytes, val: Bytes, ind: i64 },
    Hello { payload: Bytes },
    /// Sentinel only ever produced internally by the recovery log replay
    /// stream (§4.E) to signal its end; never parsed off the wire.
    Stop,
}

impl Command {
    /// Commands whose successful execution must be appended to the
    /// recovery log (§4.E, §6.2 "Mutating" column).
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::Set { .. }
                | Command::Delete { .. }
                | Command::Add { .. }
                | Command::AddN { .. }
                | Command::LPush { .. }
                | Command::DeleteL { .. }
                | Command::DelElemL { .. }
                | Command::DelAll { .. }
        )
    }
}

/// Turn a decoded array of bulk strings into a `Command`.
///
/// Arity is checked as an exact match, not an upper bound. The shard index
/// is always the final element and is parsed as a signed decimal integer;
/// a non-integer index fails `BadArgs` rather than `BadIndex` (`BadIndex`
/// is reserved for an in-range-syntax, out-of-range-value index, which is
/// reported by the shard bank, not the parser).
pub fn parse_command(frame: &RequestFrame) -> Result<Command, ParseError> {
    let elements = &frame.elements;
    let verb_bytes = elements.first().ok_or(ParseError::BadArgs)?;
    let verb_str = std::str::from_utf8(verb_bytes).map_err(|_| ParseError::UnknownCommand)?;
    let verb = Verb::from_str(verb_str).map_err(|_| ParseError::UnknownCommand)?;

    let args = &elements[1..];

    let parse_ind = |b: &Bytes| -> Result<i64, ParseError> {
        std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(ParseError::BadArgs)
    };

    match verb {
        Verb::Set => match args {
            [key, val, ind] => Ok(Command::Set { key: key.clone(), val: val.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Get => match args {
            [key, ind] => Ok(Command::Get { key: key.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Del => match args {
            [key, ind] => Ok(Command::Delete { key: key.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Add => match args {
            [key, ind] => Ok(Command::Add { key: key.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Addn => match args {
            [key, val, ind] => Ok(Command::AddN { key: key.clone(), val: val.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Lpush => match args {
            [key, val, ind] => Ok(Command::LPush { key: key.clone(), val: val.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Getl => match args {
            [key, ind] => Ok(Command::GetL { key: key.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Has => match args {
            [key, ind] => Ok(Command::Has { key: key.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Dell => match args {
            [key, ind] => Ok(Command::DeleteL { key: key.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Deleleml => match args {
            [key, val, ind] => Ok(Command::DelElemL { key: key.clone(), val: val.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Delall => match args {
            [key, val, ind] => Ok(Command::DelAll { key: key.clone(), val: val.clone(), ind: parse_ind(ind)? }),
            _ => Err(ParseError::BadArgs),
        },
        Verb::Hello => match args {
            [payload] => Ok(Command::Hello { payload: payload.clone() }),
            _ => Err(ParseError::BadArgs),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(parts: &[&[u8]]) -> RequestFrame {
        RequestFrame { elements: parts.iter().map(|p| Bytes::copy_from_slice(p)).collect() }
    }

    #[test]
    fn parses_set() {
        let cmd = parse_command(&frame(&[b"SET", b"foo", b"bar", b"3"])).unwrap();
        assert_eq!(cmd, Command::Set { key: Bytes::from_static(b"foo"), val: Bytes::from_static(b"bar"), ind: 3 });
        assert!(cmd.is_mutating());
    }

    #[test]
    fn parses_hello_with_no_index() {
        let cmd = parse_command(&frame(&[b"HELLO", b"ping"])).unwrap();
        assert_eq!(cmd, Command::Hello { payload: Bytes::from_static(b"ping") });
        assert!(!cmd.is_mutating());
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(parse_command(&frame(&[b"SET", b"foo"])), Err(ParseError::BadArgs));
    }

    #[test]
    fn rejects_unknown_verb() {
        assert_eq!(parse_command(&frame(&[b"NOPE", b"foo", b"0"])), Err(ParseError::UnknownCommand));
    }

    #[test]
    fn rejects_non_integer_index() {
        assert_eq!(parse_command(&frame(&[b"GET", b"foo", b"abc"])), Err(ParseError::BadArgs));
    }

    #[test]
    fn negative_index_parses_but_is_out_of_range_downstream() {
        let cmd = parse_command(&frame(&[b"GET", b"foo", b"-1"])).unwrap();
        assert_eq!(cmd, Command::Get { key: Bytes::from_static(b"foo"), ind: -1 });
    }
}
