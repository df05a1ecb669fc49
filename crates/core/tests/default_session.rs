// The process-wide default session. Kept in its own test binary since the
// default is global state.

mod fixtures;

use std::thread;

use fixtures::{fake_session, topic_page};
use tbgclient::{Indexed, Kwargs, SessionResolver, Topic, registry};

#[test]
fn default_session_backs_unscoped_contexts() {
    let (default, default_controller) = fake_session();
    let (scoped, _) = fake_session();
    default_controller.push_html(topic_page(5, "Counting", 1, 4, &[]));
    default.make_default();

    // Another thread never entered a scope and falls back to the default.
    let topic = thread::spawn(|| Topic::new(5).update(None, Kwargs::new()))
        .join()
        .unwrap()
        .unwrap();
    assert_eq!(topic.pages, Some(4));
    assert_eq!(default_controller.sent_count(), 1);

    // A scope wins over the default while it lasts.
    {
        let _scope = scoped.enter();
        assert_eq!(registry().current().unwrap(), scoped);
    }
    assert_eq!(registry().current().unwrap(), default);

    // Last writer wins.
    scoped.make_default();
    assert_eq!(registry().current().unwrap(), scoped);

    assert_eq!(registry().clear_default(), Some(scoped));
    assert!(registry().current().is_err());
}
