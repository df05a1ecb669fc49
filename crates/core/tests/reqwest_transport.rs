// End-to-end tests of the reqwest transport against a local forum.

mod test_server;

use tbgclient::{ChatConnection, Error, HttpRequest, Indexed, Kwargs, Session, Topic, api};
use test_server::{MEMBER_ID, PASSWORD, TestServer, USERNAME};

#[test]
fn login_then_read_a_members_only_topic() {
    let server = TestServer::start();
    let session = Session::with_config(server.config()).expect("Failed to build session");

    let user = session.login(USERNAME, PASSWORD).expect("Failed to log in");
    assert_eq!(user.uid, MEMBER_ID);
    assert!(session.is_logged_in());
    assert_eq!(session.cookie("SMFCookie").as_deref(), Some("member7"));

    let topic = session.get_topic(5, None).expect("Failed to read topic");
    assert_eq!(topic.topic_name.as_deref(), Some("Counting"));
    assert_eq!(topic.pages, Some(2));

    session.logout().expect("Failed to log out");
    assert!(!session.is_logged_in());
    assert!(session.cookies().is_empty());

    server.shutdown();
}

#[test]
fn rejected_login_reports_the_forum_message() {
    let server = TestServer::start();
    let session = Session::with_config(server.config()).unwrap();

    let err = session.login(USERNAME, "wrong").unwrap_err();
    assert!(err.is_request(), "{err:?}");
    assert!(err.to_string().contains("Password incorrect."));
    assert!(!session.is_logged_in());
}

#[test]
fn forum_error_page_is_a_request_error() {
    let server = TestServer::start();
    let session = Session::with_config(server.config()).unwrap();

    let mut topic = Topic::new(5);
    let err = topic.update_in(&session, None, Kwargs::new()).unwrap_err();
    assert!(err.to_string().contains("Only members may view this topic. (members_only)"));
}

#[test]
fn error_status_keeps_the_response() {
    let server = TestServer::start();
    let session = Session::with_config(server.config()).unwrap();

    let url = format!("{}/index.php?nothing=here", server.url());
    match api::request(&session, HttpRequest::get(url)) {
        Err(Error::Request { response, .. }) => assert_eq!(response.status, 404),
        other => panic!("Expected a request error, got {other:?}"),
    }
}

#[test]
fn priming_stores_the_php_session() {
    let server = TestServer::start();
    let session = Session::with_config(server.config()).unwrap();

    session.prime().unwrap();
    assert_eq!(session.cookie(tbgclient::SESSION_COOKIE).as_deref(), Some("s3ss10n"));
}

#[test]
fn chat_messages_round_trip() {
    let server = TestServer::start();
    let session = Session::with_config(server.config()).unwrap();
    let mut chat = ChatConnection::new(session);

    let infos = chat.poll().unwrap();
    assert_eq!(infos.get("channelID").map(String::as_str), Some("0"));
    assert_eq!(chat.messages().count(), 0);

    chat.send("hello").unwrap();
    chat.send("<b>there</b>").unwrap();
    chat.poll().unwrap();
    let texts: Vec<String> = chat.messages().map(|message| message.content).collect();
    assert_eq!(texts, vec!["hello", "<b>there</b>"]);
    assert_eq!(chat.last_mid(), Some(2));
    assert_eq!(chat.users()[0].uid, MEMBER_ID);

    let again = chat.poll().unwrap();
    assert!(again.is_empty());
    assert_eq!(chat.messages().count(), 0);
}
