mod common;

use common::{FAR_FUTURE, TestEnvironment, bearer_token, directory_user};

use uadm::api::auth::{is_logged_in, log_out};
use uadm::api::model::Role;
use uadm::directory::DirectoryView;
use uadm::session::SessionRepository;

#[test]
fn login_session_survives_reopening_the_store() {
    let env = TestEnvironment::new().unwrap();
    let token = bearer_token("alice", FAR_FUTURE);

    // What a successful login persists
    {
        let mut store = env.session_store();
        store.save_token(&token).unwrap();
        store
            .cache_user(&directory_user("Alice", "Smith", "alice", Role::Admin))
            .unwrap();
    }

    // A later invocation rehydrates the same session from disk
    let mut store = env.session_store();
    assert!(is_logged_in(&mut store).unwrap());

    let user = store.cached_user().unwrap().unwrap();
    assert_eq!(user.username, "alice");
    assert!(user.role.is_admin());
}

#[test]
fn admin_login_grants_admin_visibility() {
    let env = TestEnvironment::new().unwrap();
    let mut store = env.session_store();

    store
        .save_token(&bearer_token("alice", FAR_FUTURE))
        .unwrap();
    store
        .cache_user(&directory_user("Alice", "Smith", "alice", Role::Admin))
        .unwrap();

    assert!(is_logged_in(&mut store).unwrap());

    let view = DirectoryView::new(store).unwrap();
    assert!(view.is_admin().unwrap());
    assert!(view.is_manager().unwrap());
    assert!(view.is_user().unwrap());
}

#[test]
fn expired_token_purges_the_whole_session_file() {
    let env = TestEnvironment::new().unwrap();
    let mut store = env.session_store();

    store.save_token(&bearer_token("alice", 1000)).unwrap();
    store
        .cache_user(&directory_user("Alice", "Smith", "alice", Role::User))
        .unwrap();
    store
        .cache_user_list(&[directory_user("Bob", "Jones", "bob", Role::User)])
        .unwrap();

    assert!(!is_logged_in(&mut store).unwrap());

    // The clear-on-stale side effect removed everything, not just the token
    assert_eq!(store.token().unwrap(), None);
    assert_eq!(store.cached_user().unwrap(), None);
    assert_eq!(store.cached_user_list().unwrap(), None);

    // And the check stays stable when repeated
    assert!(!is_logged_in(&mut store).unwrap());
}

#[test]
fn logout_then_login_check_reports_anonymous() {
    let env = TestEnvironment::new().unwrap();
    let mut store = env.session_store();

    store
        .save_token(&bearer_token("alice", FAR_FUTURE))
        .unwrap();
    assert!(is_logged_in(&mut store).unwrap());

    log_out(&mut store).unwrap();
    assert!(!is_logged_in(&mut store).unwrap());
    assert_eq!(store.token().unwrap(), None);
}

#[test]
fn user_list_round_trips_through_the_session_file() {
    let env = TestEnvironment::new().unwrap();
    let mut store = env.session_store();

    let listing = vec![
        directory_user("Alice", "Smith", "alice", Role::Admin),
        directory_user("Bob", "Jones", "bob", Role::User),
    ];
    store.cache_user_list(&listing).unwrap();

    let reread = env.session_store().cached_user_list().unwrap().unwrap();
    assert_eq!(reread, listing);
}
