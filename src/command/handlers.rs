//! Built-in command handlers

use bytes::Bytes;

use crate::protocol::Value;
use crate::store::Store;
use super::{arity_error, Arity, CommandHandler};

/// `PING [message]`
///
/// Replies `PONG`, or echoes the first argument. Extra arguments are ignored.
/// The echo is a simple string when it is printable on one line, otherwise a
/// bulk string carrying the exact bytes.
pub struct Ping;

impl CommandHandler for Ping {
    fn name(&self) -> &'static str {
        "PING"
    }

    fn arity(&self) -> Arity {
        Arity::Any
    }

    fn call(&self, _store: &Store, args: &[Bytes]) -> Value {
        match args.first() {
            None => Value::simple("PONG"),
            Some(message) => match std::str::from_utf8(message) {
                Ok(text) if !text.contains(['\r', '\n']) => Value::simple(text),
                _ => Value::Bulk(message.clone()),
            },
        }
    }
}

/// `SET key value`
pub struct Set;

impl CommandHandler for Set {
    fn name(&self) -> &'static str {
        "SET"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn is_write(&self) -> bool {
        true
    }

    fn call(&self, store: &Store, args: &[Bytes]) -> Value {
        let [key, value] = args else {
            return arity_error(self.name());
        };
        store.strings().set(key.clone(), value.clone());
        Value::ok()
    }
}

/// `GET key`
pub struct Get;

impl CommandHandler for Get {
    fn name(&self) -> &'static str {
        "GET"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call(&self, store: &Store, args: &[Bytes]) -> Value {
        let [key] = args else {
            return arity_error(self.name());
        };
        store.strings().get(key).into()
    }
}

/// `HSET hash field value`
pub struct HSet;

impl CommandHandler for HSet {
    fn name(&self) -> &'static str {
        "HSET"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(3)
    }

    fn is_write(&self) -> bool {
        true
    }

    fn call(&self, store: &Store, args: &[Bytes]) -> Value {
        let [hash, field, value] = args else {
            return arity_error(self.name());
        };
        store
            .hashes()
            .set(hash.clone(), field.clone(), value.clone());
        Value::ok()
    }
}

/// `HGET hash field`
pub struct HGet;

impl CommandHandler for HGet {
    fn name(&self) -> &'static str {
        "HGET"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(2)
    }

    fn call(&self, store: &Store, args: &[Bytes]) -> Value {
        let [hash, field] = args else {
            return arity_error(self.name());
        };
        store.hashes().get(hash, field).into()
    }
}

/// `HGETALL hash`
///
/// Flattens the hash into `field, value, field, value, ...`. Pair order is
/// whatever the map yields; callers must not rely on it.
pub struct HGetAll;

impl CommandHandler for HGetAll {
    fn name(&self) -> &'static str {
        "HGETALL"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(1)
    }

    fn call(&self, store: &Store, args: &[Bytes]) -> Value {
        let [hash] = args else {
            return arity_error(self.name());
        };
        match store.hashes().get_all(hash) {
            None => Value::Null,
            Some(pairs) => Value::Array(
                pairs
                    .into_iter()
                    .flat_map(|(field, value)| [Value::Bulk(field), Value::Bulk(value)])
                    .collect(),
            ),
        }
    }
}
