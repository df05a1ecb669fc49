//! Turning forum responses into records.
//!
//! Everything here is a pure function of the response text. The HTML side is
//! written against SMF 2.1 markup as the TBG forum renders it; quote sources
//! and the chat are XML.

mod chat;
mod forum;
mod html;
mod xml;

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tbg_protocol::{Crumb, PageData};

pub use chat::parse_chat_response;
pub use forum::{parse_alerts_content, parse_profile, parse_search_content, parse_topic_content};
pub use xml::parse_quotefast;

use crate::error::{Error, Result};
use crate::transport::HttpResponse;
use html::{Element, elements, find_by_class, find_by_id};

/// Post timestamps, e.g. `Jan 02, 2024, 09:41:07 PM`.
pub const DATE_FORMAT: &str = "%b %d, %Y, %I:%M:%S %p";

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][a-z]{2} \d{1,2}, \d{4}, \d{1,2}:\d{2}:\d{2} [AP]M").expect("DATE regex should compile")
});

/// Digits of `text` as a number, ignoring everything else.
pub fn parse_integer(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// The first forum timestamp found in `text`.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let found = DATE.find(text)?;
    NaiveDateTime::parse_from_str(found.as_str(), DATE_FORMAT).ok()
}

/// Fails with [`Error::Request`] if the response renders a forum error.
///
/// Both the fatal error page and the error box of forms are recognized.
pub fn check_errors(response: &HttpResponse) -> Result<()> {
    match error_message(&response.body) {
        Some(message) => Err(Error::request(message, response.clone())),
        None => Ok(()),
    }
}

/// The error a document reports, if any.
pub fn error_message(document: &str) -> Option<String> {
    if let Some(fatal) = find_by_id(document, "div", "fatal_error") {
        let body = fatal.find_class("div", "windowbg").unwrap_or(fatal);
        let detail = body.first("div").unwrap_or(body);
        let mut text = detail.text();
        if text.is_empty() {
            text = fatal.text();
        }
        return Some(match detail.id() {
            Some(id) => format!("An error has occurred: {text} ({id})"),
            None => format!("An error has occurred: {text}"),
        });
    }

    // The form error box is always rendered, hidden while empty.
    let errors = find_by_id(document, "div", "errors")?;
    let lines: Vec<String> = errors
        .first("dd")
        .map(|dd| dd.text().lines().map(str::to_string).filter(|line| !line.is_empty()).collect())
        .unwrap_or_default();
    if lines.is_empty() {
        return None;
    }
    let heading = errors
        .first("dt")
        .map(|dt| dt.text().trim_end_matches(':').to_string())
        .unwrap_or_else(|| "The following errors occurred".to_string());
    Some(format!("{heading}: {}", lines.join("; ")))
}

/// Hidden inputs of the one form on a page besides the search box.
///
/// # Errors
///
/// [`Error::Parse`] unless there is exactly one such form.
pub fn hidden_inputs(document: &str) -> Result<Vec<(String, String)>> {
    let forms: Vec<Element<'_>> = elements(document, "form").skip(1).collect();
    let [form] = forms.as_slice() else {
        return Err(Error::parse(
            "form",
            format!("expected one form besides the search box, found {}", forms.len()),
        ));
    };
    Ok(form
        .children("input")
        .filter(|input| input.attr("type").is_some_and(|kind| kind.eq_ignore_ascii_case("hidden")))
        .filter_map(|input| Some((input.attr("name")?, input.attr("value").unwrap_or_default())))
        .collect())
}

/// Non-empty value of the input named `name`.
pub fn input_value(document: &str, name: &str) -> Option<String> {
    elements(document, "input")
        .find(|input| input.attr("name").as_deref() == Some(name))
        .and_then(|input| input.attr("value"))
        .filter(|value| !value.is_empty())
}

/// Target of the logout link, which carries the session check token.
pub fn logout_url(document: &str) -> Option<String> {
    elements(document, "a")
        .filter_map(|link| link.attr("href"))
        .find(|href| href.contains("action=logout"))
}

/// Parses a paginated page, delegating `#content_section` to `content`.
///
/// A page without page links counts as page 1 of 1.
pub fn parse_page<T>(document: &str, content: impl FnOnce(&str) -> Result<Vec<T>>) -> Result<PageData<T>> {
    let hierarchy = find_by_class(document, "div", "navigate_section")
        .map(|nav| nav.children("li").map(crumb).collect())
        .unwrap_or_default();

    let section =
        find_by_id(document, "div", "content_section").ok_or_else(|| Error::parse("page", "no #content_section"))?;

    let (current_page, total_pages) = match section.find("div", |div| div.class_contains("pagelinks")) {
        Some(links) => {
            let current = links
                .find_class("span", "current_page")
                .and_then(|span| parse_integer(&span.text()))
                .unwrap_or(1);
            let highest = links
                .children("a")
                .chain(links.children("span"))
                .filter_map(|element| parse_integer(&element.text()))
                .max()
                .unwrap_or(current);
            (current as u32, highest.max(current) as u32)
        }
        None => (1, 1),
    };

    Ok(PageData {
        hierarchy,
        current_page,
        total_pages,
        contents: content(section.inner)?,
    })
}

fn crumb(item: Element<'_>) -> Crumb {
    let label = item
        .text()
        .trim_matches(|c: char| c == '\u{25ba}' || c.is_whitespace())
        .to_string();
    let link = item
        .children("a")
        .last()
        .and_then(|link| link.attr("href"))
        .unwrap_or_default();
    (label, link)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
<html><body>
<form id="search_form"><input type="hidden" name="advanced" value="0"></form>
<div class="navigate_section"><ul>
  <li><a href="https://forum.test/index.php"><span>TBG Forums</span></a></li>
  <li><span class="dividers"> &#9658; </span><a href="https://forum.test/index.php?board=2.0"><span>Games</span></a></li>
  <li class="last"><span class="dividers"> &#9658; </span><a href="https://forum.test/index.php?topic=5.0"><span>Forum Game</span></a></li>
</ul></div>
<div id="content_section">
  <div class="pagelinks floatleft">
    <a href="#bot" class="button">Go Down</a>
    <span class="pages">Pages</span><a class="nav_page" href="?topic=5.0">1</a>
    <span class="current_page">2</span>
    <a class="nav_page" href="?topic=5.50">3</a>
    <span class="expand_pages">...</span>
    <a class="nav_page" href="?topic=5.250">11</a>
    <a class="nav_page" href="?topic=5.50">&#187;</a>
  </div>
  <p>body</p>
</div>
</body></html>"##;

    #[test]
    fn page_metadata_is_read_from_navigation_and_page_links() {
        let page = parse_page(PAGE, |section| Ok(vec![section.contains("<p>body</p>")])).unwrap();
        assert_eq!(page.hierarchy.len(), 3);
        assert_eq!(page.hierarchy[1], ("Games".to_string(), "https://forum.test/index.php?board=2.0".to_string()));
        assert_eq!(page.hierarchy[2].0, "Forum Game");
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 11);
        assert_eq!(page.contents, vec![true]);
    }

    #[test]
    fn page_without_links_is_single() {
        let page = parse_page(r#"<div id="content_section"></div>"#, |_| Ok(Vec::<u8>::new())).unwrap();
        assert_eq!((page.current_page, page.total_pages), (1, 1));
        assert!(page.hierarchy.is_empty());
    }

    #[test]
    fn missing_content_section_is_a_parse_error() {
        let err = parse_page("<html></html>", |_| Ok(Vec::<u8>::new())).unwrap_err();
        assert!(matches!(err, Error::Parse { what: "page", .. }));
    }

    #[test]
    fn fatal_error_is_reported_with_its_id() {
        let document = r#"<div id="fatal_error"><div class="cat_bar"><h3 class="catbg">An Error Has Occurred!</h3></div>
            <div class="windowbg"><div class="padding" id="not_a_topic">The topic is missing.</div></div></div>"#;
        assert_eq!(
            error_message(document).as_deref(),
            Some("An error has occurred: The topic is missing. (not_a_topic)")
        );
    }

    #[test]
    fn form_errors_are_listed() {
        let document = r#"<div class="errorbox" id="errors"><dl><dt><strong id="error_serious">The following error or errors occurred while posting this message:</strong></dt>
            <dd class="error" id="error_list">The message body was left empty.<br>No subject was filled in.</dd></dl></div>"#;
        assert_eq!(
            error_message(document).as_deref(),
            Some(
                "The following error or errors occurred while posting this message: \
                 The message body was left empty.; No subject was filled in."
            )
        );
    }

    #[test]
    fn empty_error_box_is_not_an_error() {
        let document = r#"<div class="errorbox" style="display: none" id="errors"><dl><dt></dt><dd class="error" id="error_list"></dd></dl></div>"#;
        assert_eq!(error_message(document), None);
    }

    #[test]
    fn check_errors_keeps_the_response() {
        let response = HttpResponse::ok("https://forum.test/", r#"<div id="fatal_error"><div class="windowbg"><div>Nope</div></div></div>"#);
        let err = check_errors(&response).unwrap_err();
        assert_eq!(err.response().map(|r| r.url.as_str()), Some("https://forum.test/"));
    }

    #[test]
    fn hidden_inputs_come_from_the_second_form() {
        let document = r#"<form id="search"><input type="hidden" name="advanced" value="0"></form>
            <form id="frmLogin"><input type="text" name="user"><input type="hidden" name="hash_passwrd" value="">
            <input type="hidden" name="a1b2c3" value="d4e5f6"></form>"#;
        assert_eq!(
            hidden_inputs(document).unwrap(),
            vec![
                ("hash_passwrd".to_string(), String::new()),
                ("a1b2c3".to_string(), "d4e5f6".to_string()),
            ]
        );
    }

    #[test]
    fn hidden_inputs_need_exactly_one_form() {
        let err = hidden_inputs("<form></form>").unwrap_err();
        assert!(matches!(err, Error::Parse { what: "form", .. }));
        assert!(hidden_inputs("<form></form><form></form><form></form>").is_err());
    }

    #[test]
    fn integers_and_dates_are_extracted_from_noise() {
        assert_eq!(parse_integer("Posts: 1,234"), Some(1234));
        assert_eq!(parse_integer("Go Down"), None);
        let date = parse_date("« Reply #3 on: Jan 02, 2024, 09:41:07 PM »").unwrap();
        assert_eq!(date.to_string(), "2024-01-02 21:41:07");
    }

    #[test]
    fn logout_link_and_input_values_are_found() {
        let document = r#"<a href="https://forum.test/index.php?action=logout;abc=123">Log out</a>
            <input type="text" name="bday1" value="7"><input name="bday2" value="">"#;
        assert_eq!(logout_url(document).as_deref(), Some("https://forum.test/index.php?action=logout;abc=123"));
        assert_eq!(input_value(document, "bday1").as_deref(), Some("7"));
        assert_eq!(input_value(document, "bday2"), None);
    }
}
