//! Declarative block state derived from (settings, route)
use crate::routes::Route;
use crate::settings::{SettingKey, Settings};
use crate::sites::{Marker, ScrubRule, SiteProfile};

/// Everything one application pass must make true on the page.
///
/// `markers` lists every marker the profile knows about, each exactly once,
/// so applying it both asserts and retracts.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyState {
    pub markers: Vec<(Marker, bool)>,
    pub show_quote: bool,
    pub scrubs: Vec<&'static ScrubRule>,
    pub redirect: Option<&'static str>,
}

impl PolicyState {
    pub fn derive(profile: &'static SiteProfile, settings: &Settings, route: &Route) -> Self {
        let markers = profile
            .all_markers()
            .into_iter()
            .map(|marker| {
                let active = profile.markers.iter().any(|rule| {
                    rule.markers.contains(&marker)
                        && settings.get(rule.setting)
                        && rule.gate.admits(route)
                });
                (marker, active)
            })
            .collect();

        let show_quote = profile
            .quote
            .is_some_and(|rule| settings.get(rule.setting) && rule.gate.admits(route));

        let scrubs = profile
            .scrubs
            .iter()
            .filter(|rule| settings.get(rule.setting))
            .collect();

        let redirect = (settings.get(SettingKey::BlockShorts) && route.is_short_form())
            .then_some(profile.home_url);

        PolicyState {
            markers,
            show_quote,
            scrubs,
            redirect,
        }
    }
}

#[cfg(test)]
impl PolicyState {
    fn is_asserted(&self, name: &str) -> bool {
        self.markers
            .iter()
            .any(|(marker, active)| *active && marker.name == name)
    }

    fn asserted(&self) -> impl Iterator<Item = &Marker> {
        self.markers
            .iter()
            .filter(|(_, active)| *active)
            .map(|(marker, _)| marker)
    }
}
