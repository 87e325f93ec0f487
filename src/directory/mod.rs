pub mod cli;
pub mod commands;

use anyhow::Result;
use chrono::Utc;

use crate::api::auth;
use crate::api::model::{Capabilities, User, capabilities_for};
use crate::session::SessionRepository;

/// What has to happen after the backend confirmed a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The session owner deleted themselves; the session is closed
    LoggedOut,
    /// Another account was deleted; the listing needs a refresh
    NeedsRefresh,
}

/// Progress of the current profile-image upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Progress { loaded: u64, total: u64 },
    Done,
}

/// Orchestrates the session repository and the directory gateway for one
/// invocation: cached listing, refresh bookkeeping, role-based visibility
/// and upload state.
pub struct DirectoryView<S: SessionRepository> {
    store: S,
    users: Vec<User>,
    refreshing: bool,
    refresh_generation: u64,
    upload_status: UploadStatus,
}

impl<S: SessionRepository> DirectoryView<S> {
    /// Hydrate from the session repository; no network call happens here
    pub fn new(store: S) -> Result<Self> {
        let users = store.cached_user_list()?.unwrap_or_default();
        Ok(Self {
            store,
            users,
            refreshing: false,
            refresh_generation: 0,
            upload_status: UploadStatus::Idle,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn upload_status(&self) -> UploadStatus {
        self.upload_status
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        self.store.cached_user()
    }

    /// Capabilities of whoever is logged in; absent user means no access
    pub fn capabilities(&self) -> Result<Capabilities> {
        Ok(match self.current_user()? {
            Some(user) => capabilities_for(user.role),
            None => Capabilities {
                can_read: false,
                can_create: false,
                can_update: false,
                can_delete: false,
            },
        })
    }

    pub fn is_admin(&self) -> Result<bool> {
        Ok(self.capabilities()?.can_create)
    }

    pub fn is_manager(&self) -> Result<bool> {
        Ok(self.capabilities()?.can_update)
    }

    pub fn is_user(&self) -> Result<bool> {
        Ok(self.capabilities()?.can_read)
    }

    /// Start a listing refresh. The returned generation tags the eventual
    /// response; a response from a superseded refresh is discarded.
    pub fn begin_refresh(&mut self) -> u64 {
        self.refresh_generation += 1;
        self.refreshing = true;
        self.refresh_generation
    }

    /// Apply a fetched listing. Returns false (and changes nothing) when a
    /// newer refresh was started after this one.
    pub fn apply_refresh(&mut self, generation: u64, users: Vec<User>) -> Result<bool> {
        if generation != self.refresh_generation {
            return Ok(false);
        }
        self.store.cache_user_list(&users)?;
        self.users = users;
        self.refreshing = false;
        Ok(true)
    }

    /// Clear the refreshing flag after a failed fetch, unless a newer
    /// refresh is already in flight
    pub fn fail_refresh(&mut self, generation: u64) {
        if generation == self.refresh_generation {
            self.refreshing = false;
        }
    }

    pub fn search(&self, term: &str) -> Vec<User> {
        filter_users(&self.users, term)
    }

    /// Whether a delete target refers to the authenticated user's own
    /// account, by id or by username
    pub fn is_self(&self, id_or_username: &str) -> Result<bool> {
        Ok(match self.current_user()? {
            Some(me) => me.username == id_or_username || me.id.to_string() == id_or_username,
            None => false,
        })
    }

    /// Bookkeeping after a confirmed delete: deleting the authenticated
    /// user's own account closes the session instead of asking for a
    /// listing refresh.
    pub fn conclude_delete(&mut self, target: &str) -> Result<DeleteOutcome> {
        if self.is_self(target)? {
            auth::log_out(&mut self.store)?;
            return Ok(DeleteOutcome::LoggedOut);
        }
        Ok(DeleteOutcome::NeedsRefresh)
    }

    pub fn record_upload_progress(&mut self, loaded: u64, total: u64) {
        self.upload_status = UploadStatus::Progress { loaded, total };
    }

    /// Terminal upload step: mark done and re-cache the affected records
    /// with a cache-busting image URL so stale avatars are not served.
    pub fn complete_upload(&mut self, updated: &User) -> Result<()> {
        self.upload_status = UploadStatus::Done;

        let mut refreshed = updated.clone();
        refreshed.profile_image_url = updated.profile_image_url.as_deref().map(cache_busted);

        if let Some(me) = self.store.cached_user()? {
            if me.username == refreshed.username {
                self.store.cache_user(&refreshed)?;
            }
        }

        if let Some(entry) = self
            .users
            .iter_mut()
            .find(|u| u.username == refreshed.username)
        {
            *entry = refreshed;
            self.store.cache_user_list(&self.users)?;
        }

        Ok(())
    }
}

/// Case-insensitive substring filter over first name, last name and
/// username. An empty term returns the full cached list unchanged.
pub fn filter_users(users: &[User], term: &str) -> Vec<User> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return users.to_vec();
    }

    users
        .iter()
        .filter(|user| {
            user.first_name.to_lowercase().contains(&needle)
                || user.last_name.to_lowercase().contains(&needle)
                || user.username.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Append a timestamp query so browsers and proxies refetch the image
pub fn cache_busted(url: &str) -> String {
    format!("{}?v={}", url, Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::model::Role;
    use crate::session::MemorySessionStore;

    fn user(first: &str, last: &str, username: &str) -> User {
        User {
            first_name: first.to_string(),
            last_name: last.to_string(),
            username: username.to_string(),
            ..Default::default()
        }
    }

    fn view_with_users(users: Vec<User>) -> DirectoryView<MemorySessionStore> {
        let mut store = MemorySessionStore::new();
        store.cache_user_list(&users).unwrap();
        DirectoryView::new(store).unwrap()
    }

    #[test]
    fn filter_matches_all_three_fields_case_insensitively() {
        let users = vec![
            user("Alice", "Smith", "asmith"),
            user("Bob", "Jones", "bjones"),
            user("Carol", "Albright", "carol"),
        ];

        let by_first = filter_users(&users, "ali");
        assert_eq!(by_first.len(), 1);
        assert_eq!(by_first[0].username, "asmith");

        let by_last = filter_users(&users, "ALBRIGHT");
        assert_eq!(by_last.len(), 1);
        assert_eq!(by_last[0].username, "carol");

        let by_username = filter_users(&users, "bjon");
        assert_eq!(by_username.len(), 1);
        assert_eq!(by_username[0].username, "bjones");

        assert!(filter_users(&users, "zzz").is_empty());
    }

    #[test]
    fn empty_term_restores_the_full_list() {
        let users = vec![user("Alice", "Smith", "asmith"), user("Bob", "Jones", "b")];
        assert_eq!(filter_users(&users, ""), users);
        assert_eq!(filter_users(&users, "   "), users);
    }

    #[test]
    fn view_hydrates_from_cached_list() {
        let view = view_with_users(vec![user("Alice", "Smith", "asmith")]);
        assert_eq!(view.users().len(), 1);
        assert!(!view.is_refreshing());
        assert_eq!(view.upload_status(), UploadStatus::Idle);
    }

    #[test]
    fn stale_refresh_does_not_overwrite_newer_listing() {
        let mut view = view_with_users(vec![]);

        let first = view.begin_refresh();
        let second = view.begin_refresh();

        // The newer refresh lands first
        assert!(
            view.apply_refresh(second, vec![user("New", "Est", "newest")])
                .unwrap()
        );
        // The superseded one must be discarded
        assert!(
            !view
                .apply_refresh(first, vec![user("Old", "Er", "older")])
                .unwrap()
        );

        assert_eq!(view.users().len(), 1);
        assert_eq!(view.users()[0].username, "newest");
        assert!(!view.is_refreshing());
    }

    #[test]
    fn refresh_toggles_the_refreshing_flag() {
        let mut view = view_with_users(vec![]);
        let generation = view.begin_refresh();
        assert!(view.is_refreshing());

        view.apply_refresh(generation, vec![]).unwrap();
        assert!(!view.is_refreshing());

        let generation = view.begin_refresh();
        view.fail_refresh(generation);
        assert!(!view.is_refreshing());
    }

    #[test]
    fn applied_refresh_updates_the_cache() {
        let mut view = view_with_users(vec![]);
        let generation = view.begin_refresh();
        view.apply_refresh(generation, vec![user("Alice", "Smith", "asmith")])
            .unwrap();

        let cached = view.store().cached_user_list().unwrap().unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].username, "asmith");
    }

    #[test]
    fn role_visibility_comes_from_the_cached_user() {
        let mut store = MemorySessionStore::new();
        store
            .cache_user(&User {
                username: "alice".to_string(),
                role: Role::Admin,
                ..Default::default()
            })
            .unwrap();
        let view = DirectoryView::new(store).unwrap();

        assert!(view.is_admin().unwrap());
        assert!(view.is_manager().unwrap());
        assert!(view.is_user().unwrap());
    }

    #[test]
    fn no_cached_user_means_no_visibility() {
        let view = view_with_users(vec![]);
        assert!(!view.is_admin().unwrap());
        assert!(!view.is_user().unwrap());
    }

    #[test]
    fn self_delete_detection_matches_id_and_username() {
        let mut store = MemorySessionStore::new();
        store
            .cache_user(&User {
                id: 42,
                username: "alice".to_string(),
                ..Default::default()
            })
            .unwrap();
        let view = DirectoryView::new(store).unwrap();

        assert!(view.is_self("alice").unwrap());
        assert!(view.is_self("42").unwrap());
        assert!(!view.is_self("bob").unwrap());
    }

    #[test]
    fn concluding_a_self_delete_closes_the_session() {
        let mut store = MemorySessionStore::new();
        store.save_token("header.payload.sig").unwrap();
        store
            .cache_user(&User {
                id: 42,
                username: "alice".to_string(),
                ..Default::default()
            })
            .unwrap();
        let mut view = DirectoryView::new(store).unwrap();

        assert_eq!(
            view.conclude_delete("bob").unwrap(),
            DeleteOutcome::NeedsRefresh
        );
        assert!(view.store().cached_user().unwrap().is_some());

        assert_eq!(
            view.conclude_delete("42").unwrap(),
            DeleteOutcome::LoggedOut
        );
        assert_eq!(view.store().token().unwrap(), None);
        assert_eq!(view.store().cached_user().unwrap(), None);
    }

    #[test]
    fn upload_status_runs_idle_progress_done() {
        let mut store = MemorySessionStore::new();
        store
            .cache_user(&User {
                username: "alice".to_string(),
                ..Default::default()
            })
            .unwrap();
        let mut view = DirectoryView::new(store).unwrap();
        assert_eq!(view.upload_status(), UploadStatus::Idle);

        view.record_upload_progress(50, 100);
        assert_eq!(
            view.upload_status(),
            UploadStatus::Progress {
                loaded: 50,
                total: 100
            }
        );

        let updated = User {
            username: "alice".to_string(),
            profile_image_url: Some("http://host/img/alice".to_string()),
            ..Default::default()
        };
        view.complete_upload(&updated).unwrap();
        assert_eq!(view.upload_status(), UploadStatus::Done);
    }

    #[test]
    fn completed_upload_busts_the_cached_image_url() {
        let mut store = MemorySessionStore::new();
        store
            .cache_user(&User {
                username: "alice".to_string(),
                ..Default::default()
            })
            .unwrap();
        let mut view = DirectoryView::new(store).unwrap();

        let updated = User {
            username: "alice".to_string(),
            profile_image_url: Some("http://host/img/alice".to_string()),
            ..Default::default()
        };
        view.complete_upload(&updated).unwrap();

        let cached = view.store().cached_user().unwrap().unwrap();
        let url = cached.profile_image_url.unwrap();
        assert!(url.starts_with("http://host/img/alice?v="));
        assert!(url.len() > "http://host/img/alice?v=".len());
    }
}
