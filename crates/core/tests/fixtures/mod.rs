// Forum pages and sessions shared by the integration tests.
#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use tbgclient::{FakeTransportBuilder, FakeTransportController, ForumConfig, Session};

pub const FORUM_URL: &str = "https://forum.test/index.php";

pub fn config() -> ForumConfig {
    ForumConfig::default()
        .with_forum_url(FORUM_URL)
        .with_chat_url("https://forum.test/chat/")
}

/// A session over a scripted transport.
pub fn fake_session() -> (Session, FakeTransportController) {
    let (transport, controller) = FakeTransportBuilder::new().build();
    (Session::with_transport(config(), transport), controller)
}

fn page_links(current: u32, total: u32) -> String {
    if total <= 1 {
        return String::new();
    }
    let links: String = (1..=total)
        .map(|page| {
            if page == current {
                format!(r#"<span class="current_page">{page}</span> "#)
            } else {
                format!(r#"<a class="nav_page" href="{FORUM_URL}?page={page}">{page}</a> "#)
            }
        })
        .collect();
    format!(r#"<div class="pagelinks floatleft"><span class="pages">Pages</span>{links}</div>"#)
}

/// Wraps `content` in the forum layout: search form, link tree and
/// content section.
pub fn layout(title: &str, current: u32, total: u32, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><title>{title}</title></head><body>
<form id="search_form" action="{FORUM_URL}?action=search2" method="post"><input type="search" name="search" value=""><input type="hidden" name="advanced" value="0"></form>
<div class="navigate_section"><ul>
  <li><a href="{FORUM_URL}"><span>TBG Forums</span></a></li>
  <li class="last"><span class="dividers"> &#9658; </span><a href="{FORUM_URL}?here"><span>{title}</span></a></li>
</ul></div>
<div id="content_section">
{links}
{content}
</div>
<a href="{FORUM_URL}?action=logout;c0ffee=beef">Log out</a>
</body></html>"#,
        links = page_links(current, total),
    )
}

fn post(tid: u64, mid: u64, content: &str) -> String {
    format!(
        r#"<div class="windowbg" id="msg{mid}"><div class="post_wrapper">
  <div class="poster"><h4><a href="{FORUM_URL}?action=profile;u=7">Gilbert</a></h4></div>
  <div class="postarea"><div class="keyinfo"><div class="postinfo">
    <a href="{FORUM_URL}?topic={tid}.msg{mid}#msg{mid}" title="Re: Counting" class="smalltext">Jan 02, 2024, 09:41:07 PM</a>
  </div></div>
  <div class="post"><div class="inner" id="msg_{mid}">{content}</div></div></div>
</div></div>"#
    )
}

/// Page `current` of topic `tid` showing `posts` as `(mid, content)`.
pub fn topic_page(tid: u64, title: &str, current: u32, total: u32, posts: &[(u64, &str)]) -> String {
    let posts: String = posts.iter().map(|(mid, content)| post(tid, *mid, content)).collect();
    layout(title, current, total, &format!(r#"<div id="forumposts">{posts}</div>"#))
}

/// A page holding one form besides the search box.
pub fn form_page(hidden: &[(&str, &str)]) -> String {
    let inputs: String = hidden
        .iter()
        .map(|(name, value)| format!(r#"<input type="hidden" name="{name}" value="{value}">"#))
        .collect();
    layout("Form", 1, 1, &format!(r#"<form method="post">{inputs}<input type="submit"></form>"#))
}

/// Collects formatted tracing output.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Runs `f` with a subscriber writing into this buffer.
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
