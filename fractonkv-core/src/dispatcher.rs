//! The core loop (§4.G): the single serialization point for mutation,
//! reply-writing, log-writing, and peer bookkeeping.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

use crate::command::{parse_command, Command};
use crate::peer::DispatchEvent;
use crate::reclog::Reclog;
use crate::reply::{self, Reply};
use crate::shard::ShardBank;

/// Runs the live dispatch loop until a `Shutdown` event or the event
/// channel closes. This is meant to run on exactly one Tokio task — the
/// "single-threaded dispatcher" of §5 realized as "single task", not a
/// pinned OS thread.
pub async fn run(mut events: mpsc::Receiver<DispatchEvent>, bank: Arc<ShardBank>, reclog: Arc<Reclog>) {
    let mut peers: HashMap<SocketAddr, OwnedWriteHalf> = HashMap::new();

    while let Some(event) = events.recv().await {
        match event {
            DispatchEvent::Shutdown => break,
            DispatchEvent::NewPeer { addr, writer } => {
                peers.insert(addr, writer);
            }
            DispatchEvent::DropPeer { addr } => {
                peers.remove(&addr);
            }
            DispatchEvent::Frame { addr, frame } => {
                let cmd = match parse_command(&frame) {
                    Ok(cmd) => cmd,
                    Err(err) => {
                        tracing::warn!(%addr, %err, "dropping unparseable frame");
                        continue;
                    }
                };

                // A peer that disconnected between emitting this frame
                // and the dispatcher reaching it is dropped silently.
                let Some(writer) = peers.get_mut(&addr) else {
                    continue;
                };

                let reply = execute(&bank, &cmd);

                if let Err(err) = reply::write_reply(writer, &reply).await {
                    tracing::warn!(%addr, %err, "reply write failed; awaiting peer drop from reader");
                }

                if cmd.is_mutating() && matches!(reply, Reply::Ok(true)) {
                    reclog.append(&cmd);
                }
            }
        }
    }
}

/// Applies every command from a replay stream (terminated by
/// `Command::Stop`) directly to `bank`, writing no reply and appending no
/// log record — the "silent mode" §9 Design Notes calls for. Runs before
/// the live dispatch loop starts, with no peers registered yet.
pub async fn apply_replayed(bank: &ShardBank, mut commands: mpsc::Receiver<Command>) {
    while let Some(cmd) = commands.recv().await {
        if matches!(cmd, Command::Stop) {
            break;
        }
        let _ = execute(bank, &cmd);
    }
}

/// Executes one command against the shard bank and returns the reply that
/// would be written to the originating peer. Out-of-range shard indices
/// and shard-level failures both collapse to the boolean-failure reply
/// shape (§7 "Propagation policy").
fn execute(bank: &ShardBank, cmd: &Command) -> Reply {
    match cmd {
        Command::Set { key, val, ind } => match bank.get(*ind) {
            Ok(shard) => {
                shard.kv.set(key.clone(), val.clone());
                Reply::Ok(true)
            }
            Err(_) => Reply::Ok(false),
        },
        Command::Get { key, ind } => match bank.get(*ind) {
            Ok(shard) => Reply::Value(shard.kv.get(key)),
            Err(_) => Reply::Value(None),
        },
        Command::Delete { key, ind } => match bank.get(*ind) {
            Ok(shard) => {
                shard.kv.delete(key);
                Reply::Ok(true)
            }
            Err(_) => Reply::Ok(false),
        },
        Command::Add { key, ind } => match bank.get(*ind) {
            Ok(shard) => Reply::Ok(shard.kv.add(key, 1).is_ok()),
            Err(_) => Reply::Ok(false),
        },
        Command::AddN { key, val, ind } => match bank.get(*ind) {
            Ok(shard) => match parse_i64(val) {
                Some(n) => Reply::Ok(shard.kv.add(key, n).is_ok()),
                None => Reply::Ok(false),
            },
            Err(_) => Reply::Ok(false),
        },
        Command::LPush { key, val, ind } => match bank.get(*ind) {
            Ok(shard) => {
                shard.list.push(key.clone(), val.clone());
                Reply::Ok(true)
            }
            Err(_) => Reply::Ok(false),
        },
        Command::GetL { key, ind } => match bank.get(*ind) {
            Ok(shard) => Reply::List(shard.list.get(key).ok()),
            Err(_) => Reply::List(None),
        },
        Command::Has { key, ind } => match bank.get(*ind) {
            Ok(shard) => Reply::Ok(shard.list.has(key)),
            Err(_) => Reply::Ok(false),
        },
        Command::DeleteL { key, ind } => match bank.get(*ind) {
            Ok(shard) => {
                shard.list.delete(key);
                Reply::Ok(true)
            }
            Err(_) => Reply::Ok(false),
        },
        Command::DelElemL { key, val, ind } => match bank.get(*ind) {
            Ok(shard) => Reply::Ok(shard.list.del_elem(key, val).is_ok()),
            Err(_) => Reply::Ok(false),
        },
        Command::DelAll { key, val, ind } => match bank.get(*ind) {
            Ok(shard) => Reply::Ok(shard.list.del_all(key, val).is_ok()),
            Err(_) => Reply::Ok(false),
        },
        Command::Hello { .. } => Reply::None,
        Command::Stop => Reply::None,
    }
}

fn parse_i64(bytes: &Bytes) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
