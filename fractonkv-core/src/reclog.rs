//! Append-only recovery log (§4.E, §6.4).
//!
//! Records are `OP#IND#ARG1#ARG2#\n`, one per accepted mutation. Unlike
//! the reference format, `#`, `\\`, and `\n` inside a field are
//! backslash-escaped on the way in and reversed on the way out, so a key
//! or value containing the separator byte cannot corrupt replay (§9
//! Design Notes: "the on-disk format MAY diverge from the reference as
//! long as the replay output matches").

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::command::Command;
use crate::errors::ReclogError;

pub struct Reclog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Reclog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record for `cmd` if it is mutating; a no-op otherwise.
    /// Failures are logged, never propagated — the mutation already took
    /// visible effect in memory and the client has already been
    /// acknowledged (§4.E, §7 "Recovery append failures").
    pub fn append(&self, cmd: &Command) {
        let Some(record) = build_record(cmd) else { return };
        let _guard = self.write_lock.lock().unwrap();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(&record));
        if let Err(err) = result {
            tracing::error!(error = %err, path = %self.path.display(), "failed to append recovery log record");
        }
    }

    /// Streams every record in the log, in order, to `tx`, terminated by
    /// a `Command::Stop` sentinel. A malformed record aborts replay with
    /// an error; the caller treats this as bootstrap-fatal.
    pub async fn replay(&self, tx: mpsc::Sender<Command>) -> Result<(), ReclogError> {
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut lines = tokio::io::BufReader::new(file).lines();
        while let Some(line) = lines.next_line().await? {
            let cmd = parse_record(line.as_bytes())?;
            let _ = tx.send(cmd).await;
        }
        let _ = tx.send(Command::Stop).await;
        Ok(())
    }
}

fn escape_field(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for &b in input {
        match b {
            b'#' => out.extend_from_slice(b"\\#"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out
}

fn unescape_field(input: &[u8]) -> Result<Vec<u8>, ReclogError> {
    let mut out = Vec::with_capacity(input.len());
    let mut iter = input.iter().copied();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next() {
            Some(b'#') => out.push(b'#'),
            Some(b'\\') => out.push(b'\\'),
            Some(b'n') => out.push(b'\n'),
            _ => return Err(ReclogError::Malformed("dangling or unknown escape sequence".into())),
        }
    }
    Ok(out)
}

/// Splits a record line on unescaped `#` bytes, keeping escape sequences
/// intact for `unescape_field` to resolve afterward.
fn split_fields(line: &[u8]) -> Vec<Vec<u8>> {
    let mut fields = Vec::new();
    let mut current = Vec::new();
    let mut i = 0;
    while i < line.len() {
        match line[i] {
            b'\\' if i + 1 < line.len() => {
                current.push(line[i]);
                current.push(line[i + 1]);
                i += 2;
            }
            b'#' => {
                fields.push(std::mem::take(&mut current));
                i += 1;
            }
            b => {
                current.push(b);
                i += 1;
            }
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }
    fields
}

fn build_record(cmd: &Command) -> Option<Vec<u8>> {
    let (op, ind, args): (&str, i64, Vec<&Bytes>) = match cmd {
        Command::Set { key, val, ind } => ("SET", *ind, vec![key, val]),
        Command::Delete { key, ind } => ("DEL", *ind, vec![key]),
        Command::Add { key, ind } => ("ADD", *ind, vec![key]),
        Command::AddN { key, val, ind } => ("ADDN", *ind, vec![key, val]),
        Command::LPush { key, val, ind } => ("LPUSH", *ind, vec![key, val]),
        Command::DeleteL { key, ind } => ("DELL", *ind, vec![key]),
        Command::DelElemL { key, val, ind } => ("DELELEML", *ind, vec![key, val]),
        Command::DelAll { key, val, ind } => ("DELALL", *ind, vec![key, val]),
        Command::Get { .. } | Command::GetL { .. } | Command::Has { .. } | Command::Hello { .. } | Command::Stop => {
            return None;
        }
    };

    let mut line = Vec::new();
    line.extend_from_slice(op.as_bytes());
    line.push(b'#');
    line.extend_from_slice(ind.to_string().as_bytes());
    line.push(b'#');
    for arg in args {
        line.extend_from_slice(&escape_field(arg));
        line.push(b'#');
    }
    line.push(b'\n');
    Some(line)
}

fn parse_record(line: &[u8]) -> Result<Command, ReclogError> {
    let raw_fields = split_fields(line);
    let fields = raw_fields
        .iter()
        .map(|f| unescape_field(f))
        .collect::<Result<Vec<_>, _>>()?;

    let op = fields.first().ok_or_else(|| ReclogError::Malformed("empty record".into()))?;
    let op = std::str::from_utf8(op).map_err(|_| ReclogError::Malformed("non-utf8 op".into()))?;
    let ind_bytes = fields.get(1).ok_or_else(|| ReclogError::Malformed("missing shard index".into()))?;
    let ind: i64 = std::str::from_utf8(ind_bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ReclogError::Malformed("non-integer shard index".into()))?;
    let args = &fields[2..];

    let one = || -> Result<Bytes, ReclogError> {
        match args {
            [key] => Ok(Bytes::copy_from_slice(key)),
            _ => Err(ReclogError::Malformed(format!("{op} expects one argument"))),
        }
    };
    let two = || -> Result<(Bytes, Bytes), ReclogError> {
        match args {
            [key, val] => Ok((Bytes::copy_from_slice(key), Bytes::copy_from_slice(val))),
            _ => Err(ReclogError::Malformed(format!("{op} expects two arguments"))),
        }
    };

    match op {
        "SET" => { let (key, val) = two()?; Ok(Command::Set { key, val, ind }) }
        "DEL" => Ok(Command::Delete { key: one()?, ind }),
        "ADD" => Ok(Command::Add { key: one()?, ind }),
        "ADDN" => { let (key, val) = two()?; Ok(Command::AddN { key, val, ind }) }
        "LPUSH" => { let (key, val) = two()?; Ok(Command::LPush { key, val, ind }) }
        "DELL" => Ok(Command::DeleteL { key: one()?, ind }),
        "DELELEML" => { let (key, val) = two()?; Ok(Command::DelElemL { key, val, ind }) }
        "DELALL" => { let (key, val) = two()?; Ok(Command::DelAll { key, val, ind }) }
        other => Err(ReclogError::Malformed(format!("unknown logged op '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn escapes_and_unescapes_separator_bytes() {
        let escaped = escape_field(b"a#b\\c\nd");
        assert_eq!(unescape_field(&escaped).unwrap(), b"a#b\\c\nd".to_vec());
    }

    #[test]
    fn builds_and_parses_a_set_record_round_trip() {
        let cmd = Command::Set { key: Bytes::from_static(b"foo"), val: Bytes::from_static(b"bar"), ind: 3 };
        let record = build_record(&cmd).unwrap();
        assert_eq!(std::str::from_utf8(&record).unwrap(), "SET#3#foo#bar#\n");
        let parsed = parse_record(&record[..record.len() - 1]).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn round_trips_a_value_containing_the_separator() {
        let cmd = Command::Set { key: Bytes::from_static(b"k"), val: Bytes::from_static(b"a#b\nc"), ind: 0 };
        let record = build_record(&cmd).unwrap();
        let parsed = parse_record(&record[..record.len() - 1]).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn read_only_commands_are_not_logged() {
        assert!(build_record(&Command::Get { key: Bytes::from_static(b"k"), ind: 0 }).is_none());
        assert!(build_record(&Command::GetL { key: Bytes::from_static(b"k"), ind: 0 }).is_none());
        assert!(build_record(&Command::Has { key: Bytes::from_static(b"k"), ind: 0 }).is_none());
        assert!(build_record(&Command::Hello { payload: Bytes::from_static(b"x") }).is_none());
    }

    #[tokio::test]
    async fn replay_emits_appended_records_then_stop() {
        let file = NamedTempFile::new().unwrap();
        let log = Reclog::new(file.path());
        log.append(&Command::Set { key: Bytes::from_static(b"foo"), val: Bytes::from_static(b"bar"), ind: 0 });
        log.append(&Command::Get { key: Bytes::from_static(b"foo"), ind: 0 });
        log.append(&Command::Add { key: Bytes::from_static(b"foo"), ind: 0 });

        let (tx, mut rx) = mpsc::channel(8);
        log.replay(tx).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first, Command::Set { key: Bytes::from_static(b"foo"), val: Bytes::from_static(b"bar"), ind: 0 });
        let second = rx.recv().await.unwrap();
        assert_eq!(second, Command::Add { key: Bytes::from_static(b"foo"), ind: 0 });
        let third = rx.recv().await.unwrap();
        assert_eq!(third, Command::Stop);
    }

    #[tokio::test]
    async fn replay_on_absent_file_creates_it_and_yields_only_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.reclog");
        let log = Reclog::new(&path);

        let (tx, mut rx) = mpsc::channel(8);
        log.replay(tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), Command::Stop);
        assert!(path.exists());
    }
}
