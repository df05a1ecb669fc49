//! Context-scoped session registry.
//!
//! Every concurrent unit of execution (async task, thread, process) gets its own
//! stack of sessions, so nested scopes in one thread never clobber the scopes of
//! another. Code that does not carry a session explicitly resolves the top of
//! its own stack, falling back to a process-wide default.

use std::collections::HashMap;
use std::process;
use std::sync::LazyLock;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::Session;
use crate::error::{Error, Result};

static REGISTRY: LazyLock<SessionRegistry> = LazyLock::new(SessionRegistry::new);

/// The process-wide registry used by ambient session resolution.
pub fn registry() -> &'static SessionRegistry {
    &REGISTRY
}

/// Identity of the running unit of execution.
///
/// Two contexts are equal iff task, thread and process all match. Only used as
/// a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    task: Option<tokio::task::Id>,
    thread: ThreadId,
    process: u32,
}

impl ExecutionContext {
    /// The context of the caller.
    ///
    /// Outside of a Tokio task the task component is `None`. A task on a
    /// multi-threaded runtime can move between threads at `.await` points, which
    /// is why a [`SessionScope`](super::SessionScope) is not `Send`.
    pub fn current() -> Self {
        Self {
            task: tokio::task::try_id(),
            thread: thread::current().id(),
            process: process::id(),
        }
    }
}

/// Resolves the session that ambient code should use.
///
/// [`SessionRegistry`] resolves per-context stacks with a default fallback; a
/// [`Session`] resolves to itself, which pins a call to one session without
/// touching any shared state.
pub trait SessionResolver: Send + Sync {
    fn current(&self) -> Result<Session>;
}

/// Maps execution contexts to LIFO stacks of sessions.
#[derive(Default)]
pub struct SessionRegistry {
    stacks: Mutex<HashMap<ExecutionContext, Vec<Session>>>,
    default: RwLock<Option<Session>>,
}

impl SessionRegistry {
    /// Creates an empty registry, independent from [`registry()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `session` onto the current context's stack.
    pub fn push(&self, session: Session) {
        self.push_for(ExecutionContext::current(), session);
    }

    /// Pops the top of the current context's stack.
    ///
    /// # Errors
    ///
    /// [`Error::StackUnderflow`] if the stack is empty.
    pub fn pop(&self) -> Result<Session> {
        self.pop_for(ExecutionContext::current())
    }

    fn push_for(&self, context: ExecutionContext, session: Session) {
        let mut stacks = self.stacks.lock();
        let stack = stacks.entry(context).or_default();
        stack.push(session);
        trace!(target: "tbg.session", ?context, depth = stack.len(), "pushed session");
    }

    fn pop_for(&self, context: ExecutionContext) -> Result<Session> {
        let mut stacks = self.stacks.lock();
        let stack = stacks.get_mut(&context).ok_or(Error::StackUnderflow)?;
        let popped = stack.pop().ok_or(Error::StackUnderflow)?;
        let depth = stack.len();
        if depth == 0 {
            // A drained stack means the context is done with sessions.
            stacks.remove(&context);
        }
        trace!(target: "tbg.session", ?context, depth, "popped session");
        Ok(popped)
    }

    /// Top of the current context's stack, without the default fallback.
    pub fn scoped(&self) -> Option<Session> {
        self.stacks
            .lock()
            .get(&ExecutionContext::current())
            .and_then(|stack| stack.last().cloned())
    }

    /// Number of sessions pushed in the current context.
    pub fn depth(&self) -> usize {
        self.stacks
            .lock()
            .get(&ExecutionContext::current())
            .map_or(0, Vec::len)
    }

    /// Number of contexts that currently have a non-empty stack.
    pub fn active_contexts(&self) -> usize {
        self.stacks.lock().len()
    }

    /// Sets the fallback used when a context has no scoped session.
    ///
    /// Last writer wins. Meant to be called once at startup.
    pub fn set_default(&self, session: Session) {
        *self.default.write() = Some(session);
    }

    /// Removes the fallback session, returning it.
    pub fn clear_default(&self) -> Option<Session> {
        self.default.write().take()
    }

    pub fn default_session(&self) -> Option<Session> {
        self.default.read().clone()
    }
}

impl SessionResolver for SessionRegistry {
    /// The scoped session of this context, or the default one.
    ///
    /// # Errors
    ///
    /// [`Error::NoSessionConfigured`] when neither exists.
    fn current(&self) -> Result<Session> {
        self.scoped()
            .or_else(|| self.default_session())
            .ok_or(Error::NoSessionConfigured)
    }
}

impl SessionResolver for Session {
    fn current(&self) -> Result<Session> {
        Ok(self.clone())
    }
}
