//! Forum actions over a [`Session`].
//!
//! SMF selects features with an `action` query parameter whose value carries
//! its own `;key=value` parameters. Form submissions first load the form to
//! echo back its hidden inputs (the anti-forgery nonce), then post with
//! redirects disabled; the redirect target carries nothing the client needs,
//! except after login.
//!
//! Entities in [`forum`](crate::forum) are the usual way in; these functions
//! are for pages the entities do not cover.

use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tbg_protocol::PostIcon;
use tracing::debug;
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::parser;
use crate::session::{SESSION_COOKIE, Session};
use crate::transport::{HttpRequest, HttpResponse, Method};

static MEMBER_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"member=(\d+)").expect("MEMBER_ID regex should compile"));

/// Lifetime of the login cookie, in minutes. Effectively forever.
const COOKIE_LENGTH: &str = "3153600";

/// Sends `request` through `session`.
///
/// # Errors
///
/// [`Error::Request`] for a status of 400 or above, unless the session's
/// configuration disables that check.
pub fn request(session: &Session, request: HttpRequest) -> Result<HttpResponse> {
    let method = request.method;
    debug!(target: "tbg.api", %method, url = %request.url, "request");
    let response = session.request(request)?;
    if session.config().raise_on_error_status && response.is_error() {
        let message = format!("{method} {} returns {}", response.url, response.status);
        return Err(Error::request(message, response));
    }
    Ok(response)
}

/// One forum action.
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    params: Vec<(String, Option<String>)>,
    queries: Vec<(String, String)>,
    no_percents: bool,
    form: Option<Vec<(String, String)>>,
    follow_redirects: bool,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            queries: Vec::new(),
            no_percents: false,
            form: None,
            follow_redirects: true,
        }
    }

    /// Adds `;key=value` to the action.
    pub fn param(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.params.push((key.into(), Some(value.to_string())));
        self
    }

    /// Adds a bare `;key` to the action.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.params.push((key.into(), None));
        self
    }

    /// Adds a regular query parameter next to `action`.
    pub fn query(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.queries.push((key.into(), value.to_string()));
        self
    }

    /// Keeps the `;` and `=` of the action parameters literal.
    ///
    /// SMF only splits action parameters on a literal `;`, so actions that
    /// read their parameters need this.
    pub fn no_percents(mut self) -> Self {
        self.no_percents = true;
        self
    }

    /// Turns the action into a POST of `form`.
    pub fn post(mut self, form: Vec<(String, String)>) -> Self {
        self.form = Some(form);
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    /// Full URL of this action on the forum at `forum_url`.
    pub fn url(&self, forum_url: &str) -> String {
        let mut action = self.name.clone();
        for (key, value) in &self.params {
            action.push(';');
            action.push_str(&encode(key));
            if let Some(value) = value {
                action.push('=');
                action.push_str(&encode(value));
            }
        }
        let action = if self.no_percents { action } else { encode(&action) };

        let mut query: Vec<String> = self
            .queries
            .iter()
            .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
            .collect();
        query.push(format!("action={action}"));
        with_query(forum_url, &query.join("&"))
    }

    fn into_request(self, forum_url: &str) -> HttpRequest {
        let url = self.url(forum_url);
        let mut request = match self.form {
            Some(form) => HttpRequest::new(Method::Post, url).with_form(form),
            None => HttpRequest::new(Method::Get, url),
        };
        request.follow_redirects = self.follow_redirects;
        request
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn with_query(base: &str, query: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

/// Performs a forum action.
pub fn do_action(session: &Session, action: Action) -> Result<HttpResponse> {
    let request = action.into_request(&session.config().forum_url);
    self::request(session, request)
}

/// GETs the topic page that starts at message offset `start`.
///
/// `start` may also be `"new"` for the first unread message.
pub fn get_topic_page(session: &Session, tid: u64, start: impl Display) -> Result<HttpResponse> {
    let url = with_query(&session.config().forum_url, &format!("topic={tid}.{start}"));
    request(session, HttpRequest::get(url))
}

/// GETs the topic page containing message `mid`.
///
/// The forum only resolves message links for visitors with a PHP session, so
/// one is obtained first if the jar has none.
pub fn get_message_page(session: &Session, mid: u64) -> Result<HttpResponse> {
    if session.cookie(SESSION_COOKIE).is_none() {
        session.prime()?;
    }
    let url = with_query(&session.config().forum_url, &format!("msg={mid}"));
    request(session, HttpRequest::get(url))
}

/// GETs the profile summary of `uid`, or of the logged-in user.
pub fn profile(session: &Session, uid: Option<u64>) -> Result<HttpResponse> {
    let mut action = Action::new("profile").no_percents();
    if let Some(uid) = uid {
        action = action.param("u", uid);
    }
    do_action(session, action)
}

/// GETs the raw source of message `mid` as XML.
///
/// `modify` lets the forum answer for messages in locked topics too.
pub fn quote_fast(session: &Session, mid: u64) -> Result<HttpResponse> {
    let action = Action::new("quotefast")
        .param("quote", mid)
        .flag("xml")
        .flag("modify")
        .no_percents();
    do_action(session, action)
}

/// GETs a page of the alert list, starting at alert offset `start`.
pub fn alerts(session: &Session, start: u64) -> Result<HttpResponse> {
    let action = Action::new("profile")
        .param("area", "showalerts")
        .param("start", start)
        .no_percents();
    do_action(session, action)
}

/// Runs a search with encoded `params`, starting at result offset `start`.
pub fn search(session: &Session, params: &str, start: u64) -> Result<HttpResponse> {
    let action = Action::new("search2")
        .param("params", params)
        .param("start", start)
        .no_percents();
    do_action(session, action)
}

/// Fields of the post form.
#[derive(Debug, Clone, PartialEq)]
pub struct PostForm {
    /// Body in BBC.
    pub message: String,
    pub subject: String,
    pub icon: PostIcon,
}

/// Posts a reply to topic `tid`.
pub fn post_message(session: &Session, tid: u64, post: &PostForm) -> Result<HttpResponse> {
    let form_page = do_action(session, Action::new("post2").query("topic", tid))?;
    let hidden = parser::hidden_inputs(&form_page.body)?;

    let form = with_hidden(
        vec![
            field("message", &post.message),
            field("subject", &post.subject),
            field("icon", post.icon.as_str()),
            field("post", "Post"),
            field("goback", "0"),
        ],
        hidden,
    );
    do_action(session, Action::new("post2").post(form).no_redirects())
}

/// Replaces message `mid` of topic `tid`.
pub fn edit_message(session: &Session, mid: u64, tid: u64, post: &PostForm, reason: &str) -> Result<HttpResponse> {
    let form_page = do_action(session, Action::new("post").query("msg", mid).query("topic", tid))?;
    let hidden = parser::hidden_inputs(&form_page.body)?;

    let form = with_hidden(
        vec![
            field("topic", tid.to_string()),
            field("message", &post.message),
            field("subject", &post.subject),
            field("icon", post.icon.as_str()),
            field("post", "Save"),
            field("goback", "0"),
            field("modify_reason", reason),
        ],
        hidden,
    );
    do_action(session, Action::new("post").query("msg", mid).post(form).no_redirects())
}

/// Fields of the forum profile form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    /// External avatar URL. `None` removes the avatar.
    pub avatar: Option<String>,
    pub blurb: String,
    /// `None` keeps the stored birthday.
    pub birthday: Option<NaiveDate>,
    /// Signature in BBC.
    pub signature: String,
    pub website_title: String,
    pub website_url: String,
    /// Custom profile fields by name, e.g. `cust_loca`.
    pub custom_fields: Vec<(String, String)>,
}

/// Saves the forum profile of `uid`.
pub fn edit_profile(session: &Session, uid: u64, profile: &ProfileForm) -> Result<HttpResponse> {
    let form_action = || {
        Action::new("profile")
            .param("area", "forumprofile")
            .param("u", uid)
            .no_percents()
    };
    let form_page = do_action(session, form_action())?;
    let hidden = parser::hidden_inputs(&form_page.body)?;

    let (day, month, year) = match profile.birthday {
        Some(date) => (date.day().to_string(), date.month().to_string(), date.year().to_string()),
        // Not known to the client; send back what the form holds.
        None => (
            parser::input_value(&form_page.body, "bday1").unwrap_or_default(),
            parser::input_value(&form_page.body, "bday2").unwrap_or_default(),
            parser::input_value(&form_page.body, "bday3").unwrap_or_default(),
        ),
    };

    let mut form = vec![
        field("avatar_choice", if profile.avatar.is_some() { "external" } else { "none" }),
        field("userpicpersonal", profile.avatar.as_deref().unwrap_or_default()),
        field("personal_text", &profile.blurb),
        field("bday1", day),
        field("bday2", month),
        field("bday3", year),
        field("signature", &profile.signature),
        field("website_title", &profile.website_title),
        field("website_url", &profile.website_url),
        field("save", "Change profile"),
    ];
    form.extend(
        profile
            .custom_fields
            .iter()
            .map(|(name, value)| (format!("customfield[{name}]"), value.clone())),
    );
    do_action(session, form_action().post(with_hidden(form, hidden)).no_redirects())
}

/// Logs `session` in and returns the member ID.
///
/// # Errors
///
/// [`Error::Request`] if the forum rejects the credentials or its answer
/// does not name the member.
pub fn login(session: &Session, username: &str, password: &str) -> Result<u64> {
    let form_page = do_action(session, Action::new("login"))?;
    let hidden = parser::hidden_inputs(&form_page.body)?;

    let form = with_hidden(
        vec![
            field("user", username),
            field("passwrd", password),
            field("cookielength", COOKIE_LENGTH),
        ],
        hidden,
    );
    let response = do_action(session, Action::new("login2").post(form).no_redirects())?;

    let uid = response
        .location()
        .and_then(|location| MEMBER_ID.captures(location))
        .and_then(|captures| captures[1].parse().ok());
    if let Some(uid) = uid {
        return Ok(uid);
    }
    parser::check_errors(&response)?;
    Err(Error::request("login was not accepted", response))
}

/// Follows the logout link of the forum index.
pub fn logout(session: &Session) -> Result<()> {
    let index = request(session, HttpRequest::get(session.config().forum_url.clone()))?;
    let url = parser::logout_url(&index.body).ok_or_else(|| Error::parse("logout link", "not found, is the session logged in?"))?;
    request(session, HttpRequest::get(url).no_redirects())?;
    Ok(())
}

fn field(name: &str, value: impl Into<String>) -> (String, String) {
    (name.to_string(), value.into())
}

/// Adds hidden inputs to `form`; a hidden input wins over a field of the
/// same name.
fn with_hidden(mut form: Vec<(String, String)>, hidden: Vec<(String, String)>) -> Vec<(String, String)> {
    for (name, value) in hidden {
        match form.iter_mut().find(|(key, _)| *key == name) {
            Some(existing) => existing.1 = value,
            None => form.push((name, value)),
        }
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORUM: &str = "https://forum.test/index.php";

    #[test]
    fn action_parameters_follow_the_action_name() {
        let url = Action::new("profile")
            .param("area", "forumprofile")
            .param("u", 5)
            .no_percents()
            .url(FORUM);
        assert_eq!(url, "https://forum.test/index.php?action=profile;area=forumprofile;u=5");
    }

    #[test]
    fn flags_have_no_value() {
        let url = Action::new("quotefast")
            .param("quote", 9)
            .flag("xml")
            .no_percents()
            .url(FORUM);
        assert_eq!(url, "https://forum.test/index.php?action=quotefast;quote=9;xml");
    }

    #[test]
    fn queries_come_before_the_action() {
        let url = Action::new("post2").query("topic", 12).url(FORUM);
        assert_eq!(url, "https://forum.test/index.php?topic=12&action=post2");
    }

    #[test]
    fn separators_are_escaped_unless_no_percents() {
        let url = Action::new("search2").param("q", "a b;c").url(FORUM);
        assert_eq!(url, "https://forum.test/index.php?action=search2%3Bq%3Da%2Bb%253Bc");

        let url = Action::new("search2").param("q", "a b;c").no_percents().url(FORUM);
        assert_eq!(url, "https://forum.test/index.php?action=search2;q=a+b%3Bc");
    }

    #[test]
    fn hidden_inputs_override_fields() {
        let form = with_hidden(
            vec![field("topic", "1"), field("message", "hi")],
            vec![field("topic", "2"), field("seqnum", "7")],
        );
        assert_eq!(form, vec![field("topic", "2"), field("message", "hi"), field("seqnum", "7")]);
    }
}
