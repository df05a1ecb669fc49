//! Binding a chain of calls to one session.

use std::fmt;
use std::ops::Deref;

use super::{Session, SessionResolver, registry};
use crate::error::Result;

/// Values that resolve their session from the ambient registry.
///
/// Entities never hold a session; every network call asks
/// [`session`](Self::session) at call time.
pub trait UsesSession: Sized {
    /// The session ambient code would use right now.
    fn session(&self) -> Result<Session> {
        registry().current()
    }

    /// Binds this value to `session` for a chain of calls.
    fn using(self, session: &Session) -> SessionContext<Self> {
        SessionContext::new(session.clone(), self)
    }
}

/// A value whose calls all run under one fixed session.
///
/// Each step of the chain enters the bound session on the global registry for
/// the duration of the closure, so entity methods that resolve their session
/// ambiently pick it up. The scope is left even if the closure fails.
///
/// [`then`](Self::then) continues the chain with a result that also uses a
/// session; [`run`](Self::run) returns a plain result and ends it. Only
/// [`UsesSession`] values can be bound at all.
///
/// ```ignore
/// let first_page = Topic::new(5)
///     .using(&session)
///     .then(|topic| topic.update(None, Kwargs::new()))?
///     .run(|topic| topic.get_page(1))?;
/// ```
pub struct SessionContext<T: UsesSession> {
    session: Session,
    value: T,
}

impl<T: UsesSession> SessionContext<T> {
    pub fn new(session: Session, value: T) -> Self {
        Self { session, value }
    }

    /// The bound session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable access to the wrapped value, for setting fields.
    ///
    /// Calls made through this reference do not enter the bound session.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Runs `f` under the bound session and keeps the chain going with its
    /// result.
    pub fn then<U, F>(mut self, f: F) -> Result<SessionContext<U>>
    where
        U: UsesSession,
        F: FnOnce(&mut T) -> Result<U>,
    {
        let value = {
            let _scope = self.session.enter();
            f(&mut self.value)
        }?;
        Ok(SessionContext {
            session: self.session,
            value,
        })
    }

    /// Runs `f` under the bound session and hands back its raw result.
    pub fn run<R, F>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let _scope = self.session.enter();
        f(&mut self.value)
    }

    /// A new wrapper over a copy of the value, bound to `session`.
    pub fn using(&self, session: &Session) -> SessionContext<T>
    where
        T: Clone,
    {
        SessionContext::new(session.clone(), self.value.clone())
    }

    /// Moves the value to another session.
    pub fn rebind(self, session: &Session) -> SessionContext<T> {
        SessionContext::new(session.clone(), self.value)
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: UsesSession> Deref for SessionContext<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: UsesSession> SessionResolver for SessionContext<T>
where
    T: Send + Sync,
{
    fn current(&self) -> Result<Session> {
        Ok(self.session.clone())
    }
}

impl<T: UsesSession + fmt::Debug> fmt::Debug for SessionContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("session", &self.session.id())
            .field("value", &self.value)
            .finish()
    }
}
