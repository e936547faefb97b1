//! Command Module
//!
//! Maps command names to handlers.
//!
//! ## Responsibilities
//! - Case-insensitive lookup of a handler by name
//! - Arity validation before a handler runs
//! - Knowing which commands mutate state (and must reach the AOF)
//!
//! Unknown names are reported back to the caller as [`Resolved::Unknown`];
//! building the client-visible reply for them is the caller's job.

mod handlers;

use std::collections::HashMap;

use bytes::Bytes;

use crate::protocol::Value;
use crate::store::Store;

pub use handlers::{Get, HGet, HGetAll, HSet, Ping, Set};

/// Number of arguments a command takes, excluding its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range { min: usize, max: usize },
    Any,
}

impl Arity {
    pub fn accepts(&self, argc: usize) -> bool {
        match *self {
            Arity::Exact(n) => argc == n,
            Arity::Range { min, max } => (min..=max).contains(&argc),
            Arity::Any => true,
        }
    }
}

/// A command implementation
pub trait CommandHandler: Send + Sync {
    /// Upper-case command name
    fn name(&self) -> &'static str;

    fn arity(&self) -> Arity;

    /// Whether the command mutates the store
    fn is_write(&self) -> bool {
        false
    }

    /// Run the command. `args` has already passed the arity check.
    fn call(&self, store: &Store, args: &[Bytes]) -> Value;
}

/// Outcome of looking up a command for a given argument count
pub enum Resolved<'a> {
    /// Name not registered
    Unknown,
    /// Registered, but called with the wrong number of arguments
    WrongArity(Value),
    Ready(&'a dyn CommandHandler),
}

/// Command name → handler table
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with PING, SET, GET, HSET, HGET and HGETALL
    pub fn with_default_commands() -> Self {
        let mut registry = Self::new();
        registry.register(Ping);
        registry.register(Set);
        registry.register(Get);
        registry.register(HSet);
        registry.register(HGet);
        registry.register(HGetAll);
        registry
    }

    /// Add a handler, replacing any handler with the same name
    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    /// Find a handler by (case-insensitive) name
    pub fn lookup(&self, name: &[u8]) -> Option<&dyn CommandHandler> {
        let name = std::str::from_utf8(name).ok()?.to_ascii_uppercase();
        self.handlers.get(name.as_str()).map(|handler| handler.as_ref())
    }

    /// Look up a handler and check the argument count
    pub fn resolve(&self, name: &[u8], argc: usize) -> Resolved<'_> {
        match self.lookup(name) {
            None => Resolved::Unknown,
            Some(handler) if !handler.arity().accepts(argc) => {
                Resolved::WrongArity(arity_error(handler.name()))
            }
            Some(handler) => Resolved::Ready(handler),
        }
    }

    /// Resolve and run a command. `None` if the name is unknown.
    pub fn dispatch(&self, store: &Store, name: &[u8], args: &[Bytes]) -> Option<Value> {
        match self.resolve(name, args.len()) {
            Resolved::Unknown => None,
            Resolved::WrongArity(reply) => Some(reply),
            Resolved::Ready(handler) => Some(handler.call(store, args)),
        }
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// The reply for a known command called with the wrong number of arguments
pub fn arity_error(name: &str) -> Value {
    Value::error(format!(
        "ERR wrong number of arguments for '{}' command",
        name.to_ascii_lowercase()
    ))
}
