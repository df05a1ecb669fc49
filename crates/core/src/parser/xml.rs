//! The XML reply of `action=quotefast` in modify mode.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::forum::Message;

#[derive(Debug, Deserialize)]
struct ModifyFast {
    subject: Option<String>,
    message: Option<Text>,
    reason: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "$text", default)]
    value: String,
}

/// The raw BBC source of a message.
///
/// ```text
/// <smf>
///   <subject><![CDATA[Re: Counting]]></subject>
///   <message id="msg_101"><![CDATA[[b]102[/b]]]></message>
///   <reason time="..." name="..."><![CDATA[typo]]></reason>
/// </smf>
/// ```
pub fn parse_quotefast(document: &str) -> Result<Message> {
    let reply: ModifyFast = quick_xml::de::from_str(document).map_err(|err| Error::parse("quotefast", err.to_string()))?;
    let body = reply.message.ok_or_else(|| Error::parse("quotefast", "no message element"))?;
    let mid = body
        .id
        .as_deref()
        .and_then(|id| id.strip_prefix("msg_"))
        .and_then(|mid| mid.parse().ok());

    Ok(Message {
        mid,
        subject: reply.subject.filter(|subject| !subject.is_empty()),
        edited: reply.reason.map(|reason| reason.value).filter(|reason| !reason.is_empty()),
        content: Some(body.value),
        ..Message::default()
    })
}
