//! Per-site policy engine: cached settings + live route -> DOM markers and redirects
use crate::error::Result;
use crate::motivation::{Quote, pick_quote};
use crate::policy::PolicyState;
use crate::settings::Settings;
use crate::sites::{Marker, ScrubRule, SiteProfile};
use crate::storage::{StorageChanges, StorageSnapshot};

/// The DOM collaborator a policy engine drives
pub trait Page {
    fn href(&self) -> String;
    /// Assert (`active`) or retract a marker; must be idempotent
    fn set_marker(&mut self, marker: &Marker, active: bool);
    fn has_quote(&self) -> bool;
    fn insert_quote(&mut self, quote: &Quote, anchor: &str);
    fn remove_quote(&mut self);
    /// Hide every element matching `rule`; returns how many were hidden
    fn scrub(&mut self, rule: &ScrubRule) -> usize;
    /// Show again whatever `scrub` hid for `rule`; returns how many
    fn unscrub(&mut self, rule: &ScrubRule) -> usize;
    fn replace_location(&mut self, url: &str) -> Result<()>;
}

pub struct PolicyEngine<P> {
    profile: &'static SiteProfile,
    settings: Settings,
    page: P,
    redirect_latched: bool,
    last_href: Option<String>,
    /// Scrub rules applied by the previous pass
    scrubbing: Vec<&'static ScrubRule>,
}

impl<P: Page> PolicyEngine<P> {
    pub fn new(profile: &'static SiteProfile, page: P) -> Self {
        PolicyEngine {
            profile,
            settings: profile.default_settings(),
            page,
            redirect_latched: false,
            last_href: None,
            scrubbing: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    /// Load the cached settings and apply once. `None` means the store could
    /// not be read and the site defaults stay in force.
    pub fn initialize(&mut self, snapshot: Option<&StorageSnapshot>) {
        match snapshot {
            Some(snapshot) => {
                self.settings = snapshot.settings_or(self.profile.default_settings(), &self.profile.keys());
            }
            None => {
                log::warn!("{}: settings unavailable, using built-in defaults", self.profile.name);
                self.settings = self.profile.default_settings();
            }
        }
        self.reconcile();
    }

    /// Merge a store change notification. Returns true when a pass ran.
    pub fn on_settings_changed(&mut self, changes: &StorageChanges) -> bool {
        let mut changed = false;
        for (key, value) in changes.flag_changes() {
            if !self.profile.reads(key) {
                continue;
            }
            let value = value.unwrap_or_else(|| self.profile.default_for(key));
            changed |= self.settings.set(key, value);
        }

        if changed {
            log::debug!("{}: settings changed to {:?}", self.profile.name, self.settings);
            self.reconcile();
        }
        changed
    }

    pub fn on_dom_mutated(&mut self) {
        self.reconcile();
    }

    /// An SPA navigation event. The latch only re-opens if the location
    /// actually moved; a mutation pass may already have seen the new href.
    pub fn on_navigated(&mut self) {
        self.reconcile();
    }

    /// Recompute the full policy and apply every part of it.
    ///
    /// A change of `href` since the previous pass is a new navigation and
    /// re-opens the redirect latch.
    pub fn reconcile(&mut self) -> PolicyState {
        let href = self.page.href();
        if self.last_href.as_deref() != Some(href.as_str()) {
            self.redirect_latched = false;
            self.last_href = Some(href.clone());
        }

        let route = self.profile.routes.classify(&href);
        let state = PolicyState::derive(self.profile, &self.settings, &route);

        for (marker, active) in &state.markers {
            self.page.set_marker(marker, *active);
        }

        self.apply_quote(state.show_quote);

        self.apply_scrubs(&state.scrubs);

        if let Some(target) = state.redirect {
            self.redirect(target);
        }

        state
    }

    fn apply_quote(&mut self, show: bool) {
        let Some(rule) = self.profile.quote else {
            return;
        };

        match (show, self.page.has_quote()) {
            (true, false) => self.page.insert_quote(pick_quote(), rule.anchor),
            (false, true) => self.page.remove_quote(),
            _ => {}
        }
    }

    fn apply_scrubs(&mut self, scrubs: &[&'static ScrubRule]) {
        for rule in std::mem::take(&mut self.scrubbing) {
            if !scrubs.contains(&rule) {
                let shown = self.page.unscrub(rule);
                log::debug!("{}: restored {shown} element(s) for {}", self.profile.name, rule.selector());
            }
        }

        for rule in scrubs {
            let hidden = self.page.scrub(rule);
            if hidden > 0 {
                log::debug!("{}: hid {hidden} element(s) for {}", self.profile.name, rule.selector());
            }
        }
        self.scrubbing = scrubs.to_vec();
    }

    fn redirect(&mut self, target: &str) {
        if self.redirect_latched {
            return;
        }
        // latched until href changes, whatever the outcome
        self.redirect_latched = true;

        log::info!("{}: short-form route blocked, redirecting to {target}", self.profile.name);
        if let Err(err) = self.page.replace_location(target) {
            log::warn!("{}: redirect failed: {err}", self.profile.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingKey;
    use crate::sites::{FACEBOOK, INSTAGRAM, YOUTUBE};
    use crate::storage::{SettingsPatch, StorageChange};
    use crate::test_support::{MemoryPage, MemoryStore};
    use serde_json::json;

    fn engine(profile: &'static SiteProfile, href: &str) -> PolicyEngine<MemoryPage> {
        PolicyEngine::new(profile, MemoryPage::at(href))
    }

    fn flag_change(key: SettingKey, value: bool) -> StorageChanges {
        let mut changes = StorageChanges::default();
        changes.insert(
            key.storage_key(),
            StorageChange {
                old_value: Some(json!(!value)),
                new_value: Some(json!(value)),
            },
        );
        changes
    }

    #[test]
    fn test_initialize_without_store_uses_site_defaults() {
        let mut engine = engine(&FACEBOOK, "https://www.facebook.com/");

        engine.initialize(None);

        assert!(engine.page().has("data-block-reels"));
        assert!(engine.page().has("data-hide-home-feed"));
        assert!(engine.page().has("data-hide-notifications"));
        assert!(engine.page().redirects.is_empty());
    }

    #[test]
    fn test_initialize_reads_stored_values() {
        let mut store = MemoryStore::new();
        store.set(
            &SettingsPatch::new()
                .flag(SettingKey::BlockShorts, false)
                .flag(SettingKey::BlockFeed, true),
        );
        let mut engine = engine(&INSTAGRAM, "https://www.instagram.com/");

        engine.initialize(Some(&store.snapshot()));

        assert!(!engine.page().has("data-block-reels"));
        assert!(engine.page().has("data-hide-home-feed"));
    }

    #[test]
    fn test_applying_twice_is_idempotent() {
        let mut engine = engine(&YOUTUBE, "https://www.youtube.com/");
        engine.initialize(None);
        engine.on_settings_changed(&flag_change(SettingKey::MotivationMode, true));

        let attributes = engine.page().attributes.clone();
        let classes = engine.page().classes.clone();
        engine.on_dom_mutated();
        engine.on_dom_mutated();

        assert_eq!(engine.page().attributes, attributes);
        assert_eq!(engine.page().classes, classes);
        assert_eq!(engine.page().quotes.len(), 1);
        assert_eq!(engine.page().quotes[0].1, "#primary");
    }

    #[test]
    fn test_quote_removed_when_leaving_home() {
        let mut engine = engine(&YOUTUBE, "https://www.youtube.com/");
        engine.initialize(None);
        engine.on_settings_changed(&flag_change(SettingKey::MotivationMode, true));
        assert!(engine.page().has("motivation-mode-enabled"));

        engine.page_mut().href = "https://www.youtube.com/watch?v=abc".to_string();
        engine.on_navigated();

        assert!(engine.page().quotes.is_empty());
        assert!(!engine.page().has("motivation-mode-enabled"));
    }

    #[test]
    fn test_markers_retract_when_setting_turns_off() {
        let mut engine = engine(&FACEBOOK, "https://www.facebook.com/");
        engine.initialize(None);

        let ran = engine.on_settings_changed(&flag_change(SettingKey::BlockNotifications, false));

        assert!(ran);
        assert!(!engine.page().has("data-hide-notifications"));
        assert!(engine.page().has("data-hide-home-feed"));
    }

    #[test]
    fn test_unchanged_or_foreign_keys_skip_the_pass() {
        let mut engine = engine(&INSTAGRAM, "https://www.instagram.com/");
        engine.initialize(None);

        assert!(!engine.on_settings_changed(&flag_change(SettingKey::BlockShorts, true)));
        assert!(!engine.on_settings_changed(&flag_change(SettingKey::BlockComments, true)));
        assert!(!engine.settings().block_comments);
    }

    #[test]
    fn test_removed_key_falls_back_to_site_default() {
        let mut engine = engine(&FACEBOOK, "https://www.facebook.com/");
        engine.initialize(None);
        engine.on_settings_changed(&flag_change(SettingKey::BlockFeed, false));
        assert!(!engine.settings().block_feed);

        let mut removed = StorageChanges::default();
        removed.insert(
            "global_blockFeed",
            StorageChange {
                old_value: Some(json!(false)),
                new_value: None,
            },
        );
        engine.on_settings_changed(&removed);

        assert!(engine.settings().block_feed);
    }

    #[test]
    fn test_redirects_once_per_navigation() {
        let mut engine = engine(&YOUTUBE, "https://www.youtube.com/shorts/abc");
        engine.initialize(None);

        for _ in 0..10 {
            engine.on_dom_mutated();
        }
        assert_eq!(engine.page().redirects, vec!["https://www.youtube.com/".to_string()]);

        // navigation event for the location already handled
        engine.on_navigated();
        assert_eq!(engine.page().redirects.len(), 1);

        engine.page_mut().href = "https://www.youtube.com/".to_string();
        engine.on_navigated();
        engine.page_mut().href = "https://www.youtube.com/shorts/def".to_string();
        engine.on_navigated();
        assert_eq!(engine.page().redirects.len(), 2);
    }

    #[test]
    fn test_mutation_then_navigation_event_redirects_once() {
        let mut engine = engine(&YOUTUBE, "https://www.youtube.com/");
        engine.initialize(None);

        engine.page_mut().href = "https://www.youtube.com/shorts/abc".to_string();
        engine.on_dom_mutated();
        engine.on_navigated();

        assert_eq!(engine.page().redirects, vec!["https://www.youtube.com/".to_string()]);
    }

    #[test]
    fn test_scrubbed_elements_restored_when_setting_turns_off() {
        let mut engine = engine(&FACEBOOK, "https://www.facebook.com/");
        engine.initialize(None);
        assert!(engine.page().unscrub_passes.is_empty());

        engine.on_settings_changed(&flag_change(SettingKey::BlockNotifications, false));
        assert_eq!(engine.page().unscrub_passes.len(), 1);

        engine.on_dom_mutated();
        assert_eq!(engine.page().unscrub_passes.len(), 1);

        let passes = engine.page().scrub_passes.len();
        engine.on_settings_changed(&flag_change(SettingKey::BlockNotifications, true));
        assert_eq!(engine.page().scrub_passes.len(), passes + 1);
    }

    #[test]
    fn test_href_change_counts_as_navigation() {
        let mut engine = engine(&INSTAGRAM, "https://www.instagram.com/reel/abc/");
        engine.initialize(None);
        engine.on_dom_mutated();
        assert_eq!(engine.page().redirects.len(), 1);

        engine.page_mut().href = "https://www.instagram.com/reels/".to_string();
        engine.on_dom_mutated();
        engine.on_dom_mutated();

        assert_eq!(engine.page().redirects.len(), 2);
    }

    #[test]
    fn test_followed_redirect_settles_on_home() {
        let mut engine = engine(&FACEBOOK, "https://www.facebook.com/reel/123");
        engine.page_mut().follow_redirects = true;

        engine.initialize(None);
        engine.on_dom_mutated();

        assert_eq!(engine.page().redirects.len(), 1);
        assert!(engine.page().has("data-hide-home-feed"));
    }

    #[test]
    fn test_reenabling_shorts_on_short_route_redirects() {
        let mut store = MemoryStore::new();
        store.set(&SettingsPatch::new().flag(SettingKey::BlockShorts, false));
        let mut engine = engine(&YOUTUBE, "https://www.youtube.com/shorts/abc");
        engine.initialize(Some(&store.snapshot()));
        assert!(engine.page().redirects.is_empty());

        let changes = store.set(&SettingsPatch::reenable_shorts());
        engine.on_settings_changed(&changes);

        assert_eq!(engine.page().redirects.len(), 1);
    }

    #[test]
    fn test_scrubs_only_run_for_enabled_settings() {
        let mut engine = engine(&YOUTUBE, "https://www.youtube.com/");
        engine.initialize(None);
        assert_eq!(engine.page().scrub_passes.len(), 2);

        engine.on_settings_changed(&flag_change(SettingKey::BlockShorts, false));
        let passes = engine.page().scrub_passes.len();
        engine.on_dom_mutated();

        assert_eq!(engine.page().scrub_passes.len(), passes);
    }
}
