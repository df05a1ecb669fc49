// A small SMF look-alike served over real HTTP for the transport tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axum::Router;
use axum::extract::{Form, Query, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tbgclient::ForumConfig;
use tokio::sync::oneshot;

pub const USERNAME: &str = "gilbert";
pub const PASSWORD: &str = "hunter2";
pub const MEMBER_ID: u64 = 7;

const LOGIN_FORM: &str = r#"<form action="index.php?action=login2" method="post" id="frmLogin">
<input type="text" name="user"><input type="password" name="passwrd">
<input type="hidden" name="hash_passwrd" value=""><input type="hidden" name="f00d" value="cafe">
</form>"#;

const LOGIN_ERRORS: &str = r#"<div class="errorbox" id="errors"><dl><dt>The following errors occurred:</dt><dd>Password incorrect.</dd></dl></div>
<form action="index.php?action=login2" method="post"><input type="hidden" name="f00d" value="cafe"></form>"#;

const MEMBERS_ONLY: &str = r#"<div id="fatal_error"><div class="windowbg"><div class="padding" id="members_only">Only members may view this topic.</div></div></div>"#;

#[derive(Clone, Default)]
struct ForumState {
    chat: Arc<Mutex<Vec<String>>>,
}

/// Local forum server running on its own thread and runtime.
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
        listener.set_nonblocking(true).expect("Failed to configure listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let (shutdown, signal) = oneshot::channel::<()>();

        let handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("Failed to adopt listener");
                axum::serve(listener, app())
                    .with_graceful_shutdown(async {
                        let _ = signal.await;
                    })
                    .await
                    .expect("Test server failed");
            });
        });

        Self {
            addr,
            shutdown: Some(shutdown),
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> ForumConfig {
        ForumConfig::default()
            .with_forum_url(format!("{}/index.php", self.url()))
            .with_chat_url(format!("{}/chat/", self.url()))
            .with_timeout(Some(Duration::from_secs(5)))
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn app() -> Router {
    Router::new()
        .route("/index.php", get(index).post(submit))
        .route("/chat/", get(chat_poll).post(chat_send))
        .with_state(ForumState::default())
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}/index.php")
}

fn has_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .any(|pair| pair.trim().split_once('=').is_some_and(|(key, value)| key == name && !value.is_empty()))
}

fn page(base: &str, title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>{title}</title></head><body>
<form id="search_form" action="{base}?action=search2" method="post"><input type="hidden" name="advanced" value="0"></form>
<div class="navigate_section"><ul>
<li><a href="{base}"><span>TBG Forums</span></a></li>
<li class="last"><span class="dividers"> &#9658; </span><a href="{base}?topic=5.0"><span>{title}</span></a></li>
</ul></div>
<div id="content_section">{content}</div>
<a href="{base}?action=logout;c0ffee=beef">Log out</a>
</body></html>"#
    )
}

fn topic_posts(base: &str) -> String {
    format!(
        r#"<div class="pagelinks"><span class="pages">Pages</span><span class="current_page">1</span> <a class="nav_page" href="{base}?topic=5.25">2</a></div>
<div id="forumposts"><div class="windowbg" id="msg101"><div class="post_wrapper">
<div class="poster"><h4><a href="{base}?action=profile;u=7">Gilbert</a></h4></div>
<div class="postinfo"><a href="{base}?topic=5.msg101#msg101" title="Counting" class="smalltext">Jan 02, 2024, 09:41:07 PM</a></div>
<div class="post"><div class="inner" id="msg_101">1</div></div>
</div></div></div>"#
    )
}

async fn index(RawQuery(query): RawQuery, headers: HeaderMap) -> Response {
    let base = base_url(&headers);
    let query = query.unwrap_or_default();
    let logged_in = has_cookie(&headers, "SMFCookie");
    match query.as_str() {
        "" => (
            [(header::SET_COOKIE, "PHPSESSID=s3ss10n; Path=/".to_string())],
            Html(page(&base, "TBG Forums", "")),
        )
            .into_response(),
        "action=login" => Html(page(&base, "Login", LOGIN_FORM)).into_response(),
        "topic=5.0" if logged_in => Html(page(&base, "Counting", &topic_posts(&base))).into_response(),
        "topic=5.0" => Html(page(&base, "An Error Has Occurred!", MEMBERS_ONLY)).into_response(),
        logout if logout.starts_with("action=logout") => (
            StatusCode::FOUND,
            [
                (header::LOCATION, base.clone()),
                (header::SET_COOKIE, "SMFCookie=deleted; Path=/; Max-Age=0".to_string()),
            ],
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn submit(RawQuery(query): RawQuery, headers: HeaderMap, Form(form): Form<Vec<(String, String)>>) -> Response {
    let base = base_url(&headers);
    let field = |name: &str| form.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str());
    if query.as_deref() != Some("action=login2") {
        return StatusCode::NOT_FOUND.into_response();
    }
    let accepted = field("user") == Some(USERNAME) && field("passwrd") == Some(PASSWORD) && field("f00d") == Some("cafe");
    if !accepted {
        return Html(page(&base, "Login", LOGIN_ERRORS)).into_response();
    }
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, format!("{base}?action=login3;member={MEMBER_ID};sa=check")),
            (header::SET_COOKIE, format!("SMFCookie=member{MEMBER_ID}; Path=/")),
        ],
    )
        .into_response()
}

async fn chat_poll(State(state): State<ForumState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let last: usize = params.get("lastID").and_then(|id| id.parse().ok()).unwrap_or(0);
    let lines = state.chat.lock().unwrap();
    let messages: String = lines
        .iter()
        .enumerate()
        .skip(last)
        .map(|(index, text)| {
            format!(
                r#"<message id="{}" dateTime="Tue, 02 Jan 2024 21:41:07 +0000" userID="{MEMBER_ID}" userRole="1" channelID="0"><username><![CDATA[Gilbert]]></username><text><![CDATA[{text}]]></text></message>"#,
                index + 1
            )
        })
        .collect();
    let infos = if last == 0 {
        r#"<info type="channelID">0</info>"#
    } else {
        ""
    };
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><root><infos>{infos}</infos><users><user userID="{MEMBER_ID}" userRole="1" channelID="0"><![CDATA[Gilbert]]></user></users><messages>{messages}</messages></root>"#
    );
    ([(header::CONTENT_TYPE, "text/xml; charset=UTF-8")], body).into_response()
}

async fn chat_send(State(state): State<ForumState>, Form(form): Form<HashMap<String, String>>) -> StatusCode {
    match form.get("ajax") {
        Some(text) => {
            state.chat.lock().unwrap().push(text.clone());
            StatusCode::OK
        }
        None => StatusCode::BAD_REQUEST,
    }
}
