//! Sessions and ambient session resolution.
//!
//! A [`Session`] is one identity against the forum: a cookie jar, the logged-in
//! user and the transport that carries its requests. Entities never store the
//! session that fetched them; they resolve one at call time through a
//! [`SessionResolver`], by default the process-wide [`registry()`].
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new()?;
//! session.login("user", "hunter2")?;
//!
//! // Everything in this scope uses `session`.
//! {
//!     let _scope = session.enter();
//!     let topic = Topic::new(5).update(None, Kwargs::new())?;
//! }
//!
//! // Or pin a chain of calls to it.
//! let page = Topic::new(5)
//!     .using(&session)
//!     .then(|topic| topic.update(None, Kwargs::new()))?
//!     .run(|topic| topic.get_page(1))?;
//! ```

mod context;
mod registry;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

pub use context::{SessionContext, UsesSession};
pub use registry::{ExecutionContext, SessionRegistry, SessionResolver, registry};

use crate::api;
use crate::config::ForumConfig;
use crate::error::Result;
use crate::forum::{Indexed, Kwargs, Message, Topic};
use crate::transport::{Cookies, HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Name of PHP's session cookie.
pub const SESSION_COOKIE: &str = "PHPSESSID";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// The user a session is logged in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub uid: u64,
    pub name: String,
}

/// One identity against the forum.
///
/// Cloning a `Session` yields another handle to the same identity; equality
/// is identity. The cookie jar is locked per request, but requests from two
/// threads through one session interleave their cookie updates, so share a
/// session across threads only with external ordering.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: u64,
    config: Arc<ForumConfig>,
    transport: Box<dyn Transport>,
    cookies: Mutex<Cookies>,
    user: Mutex<Option<SessionUser>>,
}

impl Session {
    /// Creates an anonymous session for the default forum.
    pub fn new() -> Result<Self> {
        Self::with_config(ForumConfig::default())
    }

    /// Creates an anonymous session over the network transport.
    pub fn with_config(config: ForumConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Creates an anonymous session over a custom transport.
    pub fn with_transport(config: ForumConfig, transport: impl Transport + 'static) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(target: "tbg.session", session = id, forum = %config.forum_url, "session created");
        Self {
            inner: Arc::new(SessionInner {
                id,
                config: Arc::new(config),
                transport: Box::new(transport),
                cookies: Mutex::new(Cookies::new()),
                user: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ForumConfig {
        &self.inner.config
    }

    /// Process-unique number of this session, for logs.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns `true` if both handles refer to the same session.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Snapshot of the cookie jar.
    pub fn cookies(&self) -> Cookies {
        self.inner.cookies.lock().clone()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.inner.cookies.lock().get(name).cloned()
    }

    /// Sets or replaces one cookie.
    pub fn set_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.cookies.lock().insert(name.into(), value.into());
    }

    /// The user this session is logged in as.
    pub fn user(&self) -> Option<SessionUser> {
        self.inner.user.lock().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.user.lock().is_some()
    }

    /// Performs one exchange with this session's cookies.
    ///
    /// Cookies given on `request` are sent too, with the jar taking precedence
    /// for names present in both. Whatever the server sets is merged back into
    /// the jar afterwards, on every call.
    pub fn request(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        request.cookies.extend(self.cookies());
        if request.timeout.is_none() {
            request.timeout = self.inner.config.timeout;
        }

        let response = self.inner.transport.send(&request)?;
        self.merge_cookies(&response.cookies);
        Ok(response)
    }

    fn merge_cookies(&self, cookies: &Cookies) {
        if cookies.is_empty() {
            return;
        }
        let mut jar = self.inner.cookies.lock();
        for (name, value) in cookies {
            if value.is_empty() {
                jar.remove(name);
            } else {
                jar.insert(name.clone(), value.clone());
            }
        }
        trace!(target: "tbg.session", session = self.inner.id, merged = cookies.len(), "merged response cookies");
    }

    /// Visits the forum index to obtain a PHP session cookie.
    pub fn prime(&self) -> Result<()> {
        let request = HttpRequest::get(self.inner.config.forum_url.clone()).no_redirects();
        self.request(request)?;
        Ok(())
    }

    /// Logs in, storing the session cookies and the user identity.
    ///
    /// The user ID is read from the redirect the forum answers a successful
    /// login with.
    ///
    /// # Errors
    ///
    /// [`Error::Request`](crate::Error::Request) if the server rejects the
    /// credentials or does not identify the member.
    pub fn login(&self, username: &str, password: &str) -> Result<SessionUser> {
        let uid = api::login(self, username, password)?;
        let user = SessionUser {
            uid,
            name: username.to_string(),
        };
        *self.inner.user.lock() = Some(user.clone());
        info!(target: "tbg.session", session = self.inner.id, uid, name = username, "logged in");
        Ok(user)
    }

    /// Logs out and forgets the identity and cookies.
    pub fn logout(&self) -> Result<()> {
        api::logout(self)?;
        self.inner.user.lock().take();
        self.inner.cookies.lock().clear();
        info!(target: "tbg.session", session = self.inner.id, "logged out");
        Ok(())
    }

    /// Makes this session current for the caller's context until the scope is
    /// dropped.
    pub fn enter(&self) -> SessionScope<'static> {
        self.enter_in(registry())
    }

    /// Like [`enter`](Self::enter), on a specific registry.
    pub fn enter_in<'r>(&self, registry: &'r SessionRegistry) -> SessionScope<'r> {
        registry.push(self.clone());
        SessionScope {
            registry,
            session: self.clone(),
            _not_send: PhantomData,
        }
    }

    /// Installs this session as the process-wide fallback.
    pub fn make_default(&self) {
        registry().set_default(self.clone());
    }

    /// Fetches a message, keeping the chain bound to this session.
    pub fn get_message(&self, mid: u64, method: Option<&str>) -> Result<SessionContext<Message>> {
        Message::with_mid(mid)
            .using(self)
            .then(|message| message.update(method, Kwargs::new()))
    }

    /// Fetches a topic, keeping the chain bound to this session.
    pub fn get_topic(&self, tid: u64, method: Option<&str>) -> Result<SessionContext<Topic>> {
        Topic::new(tid)
            .using(self)
            .then(|topic| topic.update(method, Kwargs::new()))
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("user", &*self.inner.user.lock())
            .finish()
    }
}

/// Guard keeping a session on its registry stack.
///
/// Dropping the guard pops the stack, also when unwinding. A popped session
/// that is not the one this guard pushed means the stack was corrupted, which
/// is a bug and panics.
///
/// The guard is not `Send`: it must be dropped in the execution context that
/// created it. A future holding one across `.await` cannot be given to
/// `tokio::spawn`; use `spawn_local` for such tasks.
///
/// ```compile_fail
/// # use tbgclient::Session;
/// # let session: Session = unimplemented!();
/// let scope = session.enter();
/// std::thread::spawn(move || drop(scope));
/// ```
#[must_use = "the session is popped as soon as the scope is dropped"]
pub struct SessionScope<'r> {
    registry: &'r SessionRegistry,
    session: Session,
    _not_send: PhantomData<*const ()>,
}

impl SessionScope<'_> {
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Drop for SessionScope<'_> {
    fn drop(&mut self) {
        let matched = matches!(self.registry.pop(), Ok(popped) if popped.ptr_eq(&self.session));
        if matched {
            return;
        }
        if thread::panicking() {
            error!(target: "tbg.session", session = self.session.id(), "session stack mismatch while unwinding");
        } else {
            panic!("session stack mismatch for session {}, did something tamper with it?", self.session.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::{FakeTransportBuilder, FakeTransportController};

    fn fake_session() -> (Session, FakeTransportController) {
        let (transport, controller) = FakeTransportBuilder::new().build();
        (Session::with_transport(ForumConfig::default(), transport), controller)
    }

    #[test]
    fn request_sends_jar_and_merges_response_cookies() {
        let (session, controller) = fake_session();
        session.set_cookie("PHPSESSID", "old");
        session.set_cookie("SMFCookie", "remember");
        controller.push(HttpResponse::ok("", "").with_cookie("PHPSESSID", "new").with_cookie("SMFCookie", ""));

        let mut explicit = Cookies::new();
        explicit.insert("PHPSESSID".to_string(), "ignored".to_string());
        explicit.insert("extra".to_string(), "1".to_string());
        session.request(HttpRequest::get("http://forum/").with_cookies(explicit)).unwrap();

        let sent = controller.take_sent();
        assert_eq!(sent[0].cookies.get("PHPSESSID").map(String::as_str), Some("old"));
        assert_eq!(sent[0].cookies.get("extra").map(String::as_str), Some("1"));
        assert_eq!(session.cookie("PHPSESSID").as_deref(), Some("new"));
        assert_eq!(session.cookie("SMFCookie"), None);
    }

    #[test]
    fn request_applies_configured_timeout() {
        let (session, controller) = fake_session();
        controller.push_html("");
        session.request(HttpRequest::get("http://forum/")).unwrap();
        assert_eq!(controller.take_sent()[0].timeout, session.config().timeout);
    }

    #[test]
    fn nested_scopes_resolve_innermost_then_restore() {
        let registry = SessionRegistry::new();
        let (outer, _) = fake_session();
        let (inner, _) = fake_session();

        assert!(matches!(registry.current(), Err(Error::NoSessionConfigured)));
        {
            let _outer = outer.enter_in(&registry);
            assert!(registry.current().unwrap().ptr_eq(&outer));
            {
                let _inner = inner.enter_in(&registry);
                assert!(registry.current().unwrap().ptr_eq(&inner));
            }
            assert!(registry.current().unwrap().ptr_eq(&outer));
        }
        assert!(matches!(registry.current(), Err(Error::NoSessionConfigured)));
        assert_eq!(registry.active_contexts(), 0);
    }

    #[test]
    fn scope_is_released_when_the_body_fails() {
        let registry = SessionRegistry::new();
        let (session, _) = fake_session();

        let outcome: Result<()> = (|| {
            let _scope = session.enter_in(&registry);
            Err(Error::Transport("boom".to_string()))
        })();

        assert!(outcome.is_err());
        assert_eq!(registry.depth(), 0);
    }

    #[test]
    fn scope_is_released_when_the_body_panics() {
        let registry = SessionRegistry::new();
        let (session, _) = fake_session();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = session.enter_in(&registry);
            panic!("inside scope");
        }));

        assert!(result.is_err());
        assert_eq!(registry.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "session stack mismatch")]
    fn tampered_stack_panics_on_scope_exit() {
        let registry = SessionRegistry::new();
        let (session, _) = fake_session();
        let (intruder, _) = fake_session();

        let scope = session.enter_in(&registry);
        registry.push(intruder);
        drop(scope);
    }

    #[test]
    fn scopes_are_not_send() {
        // Inference picks the `()` impl only while `SessionScope` is not `Send`;
        // a `Send` scope makes the call ambiguous and this stops compiling.
        trait AmbiguousIfSend<A> {
            fn check() {}
        }
        impl<T: ?Sized> AmbiguousIfSend<()> for T {}
        impl<T: ?Sized + Send> AmbiguousIfSend<u8> for T {}
        <SessionScope<'static> as AmbiguousIfSend<_>>::check();
    }

    #[test]
    fn sessions_compare_by_identity() {
        let (a, _) = fake_session();
        let (b, _) = fake_session();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
