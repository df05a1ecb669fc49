//! Scrapers for topic pages, search results, profiles and alerts.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tbg_protocol::{PostIcon, UserGroup};

use super::html::{Element, elements, find_by_id, html_to_text};
use super::{parse_date, parse_integer};
use crate::error::{Error, Result};
use crate::forum::{Alert, Message, Topic, User};

static MESSAGE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^msg(\d+)$").expect("MESSAGE_ID regex should compile"));
static MEMBER_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[;?&]u=(\d+)").expect("MEMBER_LINK regex should compile"));
static TOPIC_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"topic=(\d+)").expect("TOPIC_LINK regex should compile"));
static MESSAGE_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"msg=?(\d+)").expect("MESSAGE_LINK regex should compile"));
static ALERT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[;?&]aid=|mark\[|alert_)(\d+)").expect("ALERT_ID regex should compile"));
static PROFILE_OWNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"action=profile;(?:[^"'<>\s]*?;)?u=(\d+)"#).expect("PROFILE_OWNER regex should compile")
});

/// Profile entries that are shown but not kept.
const IGNORED_PROFILE_ENTRIES: &[&str] = &[
    "age",
    "birth date",
    "custom title",
    "date registered",
    "language",
    "last active",
    "local time",
    "position",
    "signature",
    "website",
];

fn capture_u64(regex: &Regex, text: &str) -> Option<u64> {
    regex.captures(text)?.get(1)?.as_str().parse().ok()
}

fn href(element: Element<'_>) -> Option<String> {
    element.attr("href")
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Messages of a topic page's content section.
pub fn parse_topic_content(section: &str) -> Result<Vec<Message>> {
    let posts = find_by_id(section, "div", "forumposts").ok_or_else(|| Error::parse("topic", "no #forumposts"))?;
    posts
        .children("div")
        .filter(|div| div.id().is_some_and(|id| MESSAGE_ID.is_match(&id)))
        .map(parse_message)
        .collect()
}

/// One `div#msgNNN` block.
fn parse_message(element: Element<'_>) -> Result<Message> {
    let mid = element
        .id()
        .and_then(|id| capture_u64(&MESSAGE_ID, &id))
        .ok_or_else(|| Error::parse("message", "no message id"))?;
    let wrapper = element.find_class("div", "post_wrapper").unwrap_or(element);

    let info = wrapper
        .find_class("div", "postinfo")
        .or_else(|| wrapper.find_class("div", "keyinfo"))
        .unwrap_or(wrapper);
    let icon = info
        .find_class("span", "messageicon")
        .and_then(|span| span.first("img"))
        .and_then(|img| img.attr("src"))
        .map(|src| icon_name(&src));
    let title = info.find("a", |link| link.has_class("smalltext") || link.attr("title").is_some());
    let subject = title.and_then(|link| link.attr("title")).or_else(|| info.first("h5").map(|h5| h5.text()));
    let date = title.and_then(|link| parse_date(&link.text())).or_else(|| parse_date(&info.text()));
    let tid = info.children("a").filter_map(href).find_map(|link| capture_u64(&TOPIC_LINK, &link));

    let edited = wrapper
        .find("span", |span| span.has_class("modified"))
        .map(|span| span.text())
        .map(|text| text.trim_start_matches("Last Edit:").trim().to_string())
        .and_then(non_empty);

    let content = wrapper.find_class("div", "post").map(|post| post.first("div").unwrap_or(post).html().to_string());

    let user = wrapper.find_class("div", "poster").map(|poster| User {
        signature: wrapper
            .find_class("div", "signature")
            .map(|signature| signature.html().to_string())
            .and_then(non_empty),
        ..parse_poster(poster)
    });

    Ok(Message {
        tid,
        mid: Some(mid),
        subject,
        date,
        edited,
        content,
        user,
        icon,
    })
}

/// `.../Smileys/default/xx.png` to the icon name.
fn icon_name(src: &str) -> PostIcon {
    let file = src.rsplit('/').next().unwrap_or(src);
    PostIcon::from(file.split('.').next().unwrap_or(file))
}

/// The poster column of a message.
fn parse_poster(poster: Element<'_>) -> User {
    let mut user = User::default();
    if let Some(heading) = poster.first("h4") {
        match heading.first("a") {
            Some(link) => {
                user.uid = href(link).and_then(|link| capture_u64(&MEMBER_LINK, &link));
                user.name = non_empty(link.text());
            }
            None => user.name = non_empty(heading.text()),
        }
    }

    let Some(info) = poster.find_class("ul", "user_info") else {
        return user;
    };
    user.avatar = info
        .find_class("li", "avatar")
        .and_then(|li| li.first("img"))
        .and_then(|img| img.attr("src"));
    user.group = info
        .find_class("li", "postgroup")
        .and_then(|li| non_empty(li.text()))
        .map(|group| UserGroup::from(group.as_str()));
    user.posts = info.find_class("li", "postcount").and_then(|li| parse_integer(&li.text()));
    user.blurb = info.find_class("li", "blurb").and_then(|li| non_empty(li.text()));
    user.gender = info
        .find("li", |li| li.class_contains("cust_gender"))
        .and_then(|li| li.children("span").chain(li.children("img")).find_map(|icon| icon.attr("title")))
        .and_then(non_empty);
    user.location = info
        .find("li", |li| li.class_contains("cust_loca"))
        .map(|li| strip_label(&li.text()))
        .and_then(non_empty);
    user.website = info
        .find_class("li", "profile")
        .and_then(|li| li.find("a", |link| link.class_contains("www") || link.inner.contains("www")))
        .and_then(href);
    user
}

fn strip_label(text: &str) -> String {
    match text.split_once(':') {
        Some((_, value)) => value.trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Results of a search page.
///
/// Each result is a `.topic_details` header followed by the post body.
pub fn parse_search_content(section: &str) -> Result<Vec<Message>> {
    let headers: Vec<Element<'_>> = elements(section, "div").filter(|div| div.has_class("topic_details")).collect();
    let mut messages = Vec::with_capacity(headers.len());
    for (index, header) in headers.iter().enumerate() {
        let next = headers.get(index + 1).map_or(section.len(), |next| next.start);
        let tail = &section[header.end..next.max(header.end)];

        let links: Vec<Element<'_>> = header.children("a").collect();
        let Some((topic_link, link)) = links
            .iter()
            .rev()
            .find_map(|link| href(*link).filter(|target| target.contains("topic=")).map(|target| (*link, target)))
        else {
            return Err(Error::parse("search result", "no topic link"));
        };
        let mid = capture_u64(&MESSAGE_LINK, &link);
        let tid = capture_u64(&TOPIC_LINK, &link);

        let member = header
            .children("a")
            .chain(elements(tail, "a"))
            .find(|link| href(*link).is_some_and(|target| MEMBER_LINK.is_match(&target) && target.contains("action=profile")));
        let user = member.map(|link| User {
            uid: href(link).and_then(|target| capture_u64(&MEMBER_LINK, &target)),
            name: non_empty(link.text()),
            ..User::default()
        });

        let body = elements(tail, "div").find(|div| div.has_class("list_posts"));

        messages.push(Message {
            tid,
            mid,
            subject: non_empty(topic_link.text()),
            date: parse_date(&header.text()).or_else(|| parse_date(&html_to_text(tail))),
            content: body.map(|body| body.html().to_string()),
            user,
            ..Message::default()
        });
    }
    Ok(messages)
}

/// The member shown on a profile summary page.
pub fn parse_profile(document: &str) -> Result<User> {
    let mut user = User {
        uid: capture_u64(&PROFILE_OWNER, document),
        ..User::default()
    };

    let basic = find_by_id(document, "div", "basicinfo").ok_or_else(|| Error::parse("profile", "no #basicinfo"))?;
    if let Some(heading) = basic.first("h4") {
        let position = heading.find_class("span", "position");
        let name_html = match position {
            Some(position) => format!("{}{}", &heading.inner[..position.start], &heading.inner[position.end..]),
            None => heading.inner.to_string(),
        };
        user.name = non_empty(html_to_text(&name_html));
        user.group = position
            .and_then(|position| non_empty(position.text()))
            .map(|group| UserGroup::from(group.as_str()));
    }
    user.avatar = basic
        .find("img", |img| img.has_class("avatar"))
        .and_then(|img| img.attr("src"));
    user.website = basic
        .find("a", |link| link.inner.contains("www") || link.class_contains("www"))
        .and_then(href);

    let details = find_by_id(document, "div", "detailedinfo");
    let mut social = BTreeMap::new();
    if let Some(details) = details {
        for (term, value) in details.children("dt").zip(details.children("dd")) {
            let label = term.text().trim_end_matches(':').trim().to_string();
            let text = value.text();
            match label.to_lowercase().as_str() {
                "posts" => user.posts = parse_integer(text.split('(').next().unwrap_or_default()),
                "email" => user.email = non_empty(text),
                "personal text" => user.blurb = non_empty(text),
                "location" => user.location = non_empty(text),
                "real name" => user.real_name = non_empty(text),
                "gender" => {
                    user.gender = non_empty(text).or_else(|| {
                        value
                            .children("span")
                            .chain(value.children("img"))
                            .find_map(|icon| icon.attr("title"))
                    })
                }
                ignored if IGNORED_PROFILE_ENTRIES.contains(&ignored) => {}
                _ => {
                    if !label.is_empty() && !text.is_empty() {
                        social.insert(label, text);
                    }
                }
            }
        }

        user.signature = details.find_class("div", "signature").and_then(|signature| {
            let inner = signature.inner;
            let body = match signature.first("h5") {
                Some(heading) => format!("{}{}", &inner[..heading.start], &inner[heading.end..]),
                None => inner.to_string(),
            };
            non_empty(body.trim().to_string())
        });
    }
    if !social.is_empty() {
        user.social = Some(social);
    }
    Ok(user)
}

/// Alerts of an alerts page, one table row each.
pub fn parse_alerts_content(section: &str) -> Result<Vec<Alert>> {
    Ok(elements(section, "tr").filter_map(parse_alert).collect())
}

fn parse_alert(row: Element<'_>) -> Option<Alert> {
    let aid = capture_u64(&ALERT_ID, row.open).or_else(|| capture_u64(&ALERT_ID, row.inner))?;
    let cell = row.first("td").unwrap_or(row);
    let description = cell.text();
    let date = parse_date(&row.text());

    let links: Vec<(Element<'_>, String)> = cell.children("a").filter_map(|link| Some((link, href(link)?))).collect();
    let user = links
        .iter()
        .find(|(_, target)| target.contains("action=profile") && MEMBER_LINK.is_match(target))
        .map(|(link, target)| User {
            uid: capture_u64(&MEMBER_LINK, target),
            name: non_empty(link.text()),
            ..User::default()
        });
    let message = links
        .iter()
        .find(|(_, target)| MESSAGE_LINK.is_match(target))
        .map(|(link, target)| Message {
            tid: capture_u64(&TOPIC_LINK, target),
            mid: capture_u64(&MESSAGE_LINK, target),
            subject: non_empty(link.text()),
            ..Message::default()
        });
    let topic = links
        .iter()
        .find(|(_, target)| TOPIC_LINK.is_match(target))
        .map(|(link, target)| Topic {
            tid: capture_u64(&TOPIC_LINK, target),
            topic_name: non_empty(link.text()),
            ..Topic::default()
        });

    let lowered = description.to_lowercase();
    Some(match (user, message, topic) {
        (Some(user), Some(msg), _) if lowered.contains("quoted") => Alert::Quoted { aid, date, user, msg },
        (Some(user), Some(msg), _) if lowered.contains("mentioned") => Alert::Mentioned { aid, date, user, msg },
        (Some(user), _, Some(topic)) if lowered.contains("new topic") => Alert::NewTopic { aid, date, user, topic },
        _ => Alert::Unknown {
            aid,
            date,
            data: description,
        },
    })
}
