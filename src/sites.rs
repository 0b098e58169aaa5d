//! Per-site policy configuration: route shapes, markers, scrubbers and defaults
//!
//! Each supported site family is one `SiteProfile`. The policy engine is
//! generic over these tables; nothing else is site-specific.
use crate::routes::{Route, RouteKind, RoutePattern, RouteTable, host_matches, host_of};
use crate::settings::{SettingKey, Settings};
use std::sync::LazyLock;

/// Where a marker lives in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerTarget {
    /// `data-*="true"` attribute on `<html>`
    RootAttribute,
    /// Class on `<body>`
    BodyClass,
}

/// A named DOM marker that stylesheet rules key off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Marker {
    pub name: &'static str,
    pub target: MarkerTarget,
}

const fn attr(name: &'static str) -> Marker {
    Marker { name, target: MarkerTarget::RootAttribute }
}

const fn class(name: &'static str) -> Marker {
    Marker { name, target: MarkerTarget::BodyClass }
}

/// Route restriction attached to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGate {
    Anywhere,
    Only(RouteKind),
    Except(RouteKind),
}

impl RouteGate {
    pub fn admits(self, route: &Route) -> bool {
        match self {
            RouteGate::Anywhere => true,
            RouteGate::Only(kind) => route.is(kind),
            RouteGate::Except(kind) => !route.is(kind),
        }
    }
}

/// Assert `markers` while `setting` is on and the route passes `gate`
#[derive(Debug, Clone, Copy)]
pub struct MarkerRule {
    pub setting: SettingKey,
    pub gate: RouteGate,
    pub markers: &'static [Marker],
}

/// Motivation quote placement
#[derive(Debug, Clone, Copy)]
pub struct QuoteRule {
    pub setting: SettingKey,
    pub gate: RouteGate,
    /// Container the quote is prepended to; falls back to `<body>`
    pub anchor: &'static str,
}

/// What a scrubbed element has to look like to be hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubMatch {
    TextHasDigit,
    TextContains(&'static str),
    LabelContains(&'static str),
    HasDescendant(&'static str),
}

/// Read-only view of a candidate element
pub trait ElementProbe {
    fn text(&self) -> String;
    fn aria_label(&self) -> Option<String>;
    fn has_descendant(&self, selector: &str) -> bool;
}

/// Set on every element a scrub pass hid
pub const SCRUBBED_ATTR: &str = "data-social-sentry-scrubbed";

/// Heuristic, best-effort hiding of elements the stylesheet cannot target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubRule {
    pub setting: SettingKey,
    pub selectors: &'static [&'static str],
    /// Hidden when any of these hold
    pub matches_any: &'static [ScrubMatch],
}

impl ScrubRule {
    pub fn selector(&self) -> String {
        self.selectors.join(", ")
    }

    /// Elements this rule hid earlier
    pub fn scrubbed_selector(&self) -> String {
        self.selectors
            .iter()
            .map(|selector| format!("{selector}[{SCRUBBED_ATTR}]"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn matches(&self, probe: &dyn ElementProbe) -> bool {
        self.matches_any.iter().any(|condition| match *condition {
            ScrubMatch::TextHasDigit => probe.text().chars().any(|c| c.is_ascii_digit()),
            ScrubMatch::TextContains(needle) => probe.text().contains(needle),
            ScrubMatch::LabelContains(needle) => probe
                .aria_label()
                .is_some_and(|label| label.contains(needle)),
            ScrubMatch::HasDescendant(selector) => probe.has_descendant(selector),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Facebook,
    Instagram,
    YouTube,
}

#[derive(Debug)]
pub struct SiteProfile {
    pub site: Site,
    pub name: &'static str,
    pub domains: &'static [&'static str],
    /// Redirect target when a short-form route is blocked
    pub home_url: &'static str,
    /// Settings this site reads, with the values used when the store is unreachable
    pub defaults: &'static [(SettingKey, bool)],
    pub routes: RouteTable,
    pub markers: &'static [MarkerRule],
    pub quote: Option<QuoteRule>,
    pub scrubs: &'static [ScrubRule],
    /// Window events signalling an in-page navigation
    pub navigation_events: &'static [&'static str],
}

impl SiteProfile {
    pub fn keys(&self) -> Vec<SettingKey> {
        self.defaults.iter().map(|&(key, _)| key).collect()
    }

    pub fn storage_keys(&self) -> Vec<&'static str> {
        self.defaults.iter().map(|(key, _)| key.storage_key()).collect()
    }

    pub fn default_settings(&self) -> Settings {
        Settings::from_defaults(self.defaults)
    }

    pub fn default_for(&self, key: SettingKey) -> bool {
        self.defaults
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .is_some_and(|&(_, value)| value)
    }

    pub fn reads(&self, key: SettingKey) -> bool {
        self.defaults.iter().any(|(candidate, _)| *candidate == key)
    }

    pub fn owns_host(&self, host: &str) -> bool {
        self.domains.iter().any(|domain| host_matches(host, domain))
    }

    /// Every marker this profile may assert, each listed once
    pub fn all_markers(&self) -> Vec<Marker> {
        let mut markers: Vec<Marker> = self
            .markers
            .iter()
            .flat_map(|rule| rule.markers.iter().copied())
            .collect();
        markers.sort();
        markers.dedup();
        markers
    }
}

const FACEBOOK_DEFAULTS: &[(SettingKey, bool)] = &[
    (SettingKey::BlockShorts, true),
    (SettingKey::BlockFeed, true),
    (SettingKey::BlockNotifications, true),
];

const FACEBOOK_MARKERS: &[MarkerRule] = &[
    MarkerRule {
        setting: SettingKey::BlockShorts,
        gate: RouteGate::Except(RouteKind::ShortCollection),
        markers: &[attr("data-block-reels"), attr("data-block-stories")],
    },
    MarkerRule {
        setting: SettingKey::BlockFeed,
        gate: RouteGate::Only(RouteKind::Home),
        markers: &[attr("data-hide-home-feed"), attr("data-hide-sidebars")],
    },
    MarkerRule {
        setting: SettingKey::BlockNotifications,
        gate: RouteGate::Anywhere,
        markers: &[attr("data-hide-notifications")],
    },
];

const FACEBOOK_SCRUBS: &[ScrubRule] = &[ScrubRule {
    setting: SettingKey::BlockNotifications,
    selectors: &[
        r#"[aria-label*="Notifications" i] span"#,
        r#"[aria-label*="Messenger" i] span"#,
        r#"a[href*="notifications"] span"#,
        r#"div[aria-label*="unread"]"#,
    ],
    matches_any: &[ScrubMatch::TextHasDigit],
}];

const INSTAGRAM_DEFAULTS: &[(SettingKey, bool)] = &[
    (SettingKey::BlockShorts, true),
    (SettingKey::BlockFeed, false),
];

const INSTAGRAM_MARKERS: &[MarkerRule] = &[
    MarkerRule {
        setting: SettingKey::BlockShorts,
        gate: RouteGate::Anywhere,
        markers: &[attr("data-block-reels")],
    },
    MarkerRule {
        setting: SettingKey::BlockFeed,
        gate: RouteGate::Only(RouteKind::Home),
        markers: &[attr("data-hide-home-feed")],
    },
];

const YOUTUBE_DEFAULTS: &[(SettingKey, bool)] = &[
    (SettingKey::BlockShorts, true),
    (SettingKey::BlockFeed, false),
    (SettingKey::BlockComments, false),
    (SettingKey::MotivationMode, false),
];

const YOUTUBE_MARKERS: &[MarkerRule] = &[
    MarkerRule {
        setting: SettingKey::BlockShorts,
        gate: RouteGate::Anywhere,
        markers: &[class("hide-shorts-enabled")],
    },
    MarkerRule {
        setting: SettingKey::BlockFeed,
        gate: RouteGate::Only(RouteKind::Home),
        markers: &[class("hide-feed-enabled")],
    },
    MarkerRule {
        setting: SettingKey::BlockFeed,
        gate: RouteGate::Anywhere,
        markers: &[class("hide-recommendations-enabled")],
    },
    MarkerRule {
        setting: SettingKey::BlockComments,
        gate: RouteGate::Anywhere,
        markers: &[class("hide-comments-enabled")],
    },
    MarkerRule {
        setting: SettingKey::MotivationMode,
        gate: RouteGate::Only(RouteKind::Home),
        markers: &[class("motivation-mode-enabled")],
    },
];

const YOUTUBE_SCRUBS: &[ScrubRule] = &[
    ScrubRule {
        setting: SettingKey::BlockShorts,
        selectors: &["ytd-rich-section-renderer", "ytd-reel-shelf-renderer"],
        matches_any: &[
            ScrubMatch::TextContains("Shorts"),
            ScrubMatch::HasDescendant("ytd-reel-shelf-renderer"),
        ],
    },
    ScrubRule {
        setting: SettingKey::BlockShorts,
        selectors: &["ytd-mini-guide-entry-renderer", "ytd-guide-entry-renderer"],
        matches_any: &[
            ScrubMatch::LabelContains("Shorts"),
            ScrubMatch::TextContains("Shorts"),
        ],
    },
];

pub static FACEBOOK: LazyLock<SiteProfile> = LazyLock::new(|| SiteProfile {
    site: Site::Facebook,
    name: "Facebook",
    domains: &["facebook.com"],
    home_url: "https://www.facebook.com/?ref=social_sentry_redirect",
    defaults: FACEBOOK_DEFAULTS,
    routes: RouteTable::new()
        .with(RouteKind::ShortCollection, RoutePattern::path(r"^/reels(/|$)"))
        .with(RouteKind::ShortItem, RoutePattern::path(r"^/reel(/|$)"))
        .with(RouteKind::Home, RoutePattern::PathIn(&["", "/", "/home.php"]))
        .with(
            RouteKind::Home,
            RoutePattern::Query {
                name: "sk",
                value_prefix: Some("h_"),
            },
        )
        .with(
            RouteKind::Home,
            RoutePattern::Query {
                name: "home",
                value_prefix: None,
            },
        ),
    markers: FACEBOOK_MARKERS,
    quote: None,
    scrubs: FACEBOOK_SCRUBS,
    navigation_events: &["popstate"],
});

pub static INSTAGRAM: LazyLock<SiteProfile> = LazyLock::new(|| SiteProfile {
    site: Site::Instagram,
    name: "Instagram",
    domains: &["instagram.com"],
    home_url: "https://www.instagram.com/",
    defaults: INSTAGRAM_DEFAULTS,
    routes: RouteTable::new()
        .with(RouteKind::ShortItem, RoutePattern::path(r"^/reel(/|$)"))
        .with(RouteKind::ShortCollection, RoutePattern::path(r"^/reels(/|$)"))
        .with(RouteKind::Home, RoutePattern::PathIn(&["", "/"])),
    markers: INSTAGRAM_MARKERS,
    quote: None,
    scrubs: &[],
    navigation_events: &["popstate"],
});

pub static YOUTUBE: LazyLock<SiteProfile> = LazyLock::new(|| SiteProfile {
    site: Site::YouTube,
    name: "YouTube",
    domains: &["youtube.com"],
    home_url: "https://www.youtube.com/",
    defaults: YOUTUBE_DEFAULTS,
    routes: RouteTable::new()
        .with(RouteKind::ShortItem, RoutePattern::path(r"/shorts/"))
        .with(
            RouteKind::ShortCollection,
            RoutePattern::path(r"^/(@[^/]+|c/[^/]+|channel/[^/]+)/shorts/?$"),
        )
        .with(RouteKind::Home, RoutePattern::PathIn(&["/"])),
    markers: YOUTUBE_MARKERS,
    quote: Some(QuoteRule {
        setting: SettingKey::MotivationMode,
        gate: RouteGate::Only(RouteKind::Home),
        anchor: "#primary",
    }),
    scrubs: YOUTUBE_SCRUBS,
    navigation_events: &["popstate", "yt-navigate-finish"],
});

pub fn profiles() -> [&'static SiteProfile; 3] {
    [&*FACEBOOK, &*INSTAGRAM, &*YOUTUBE]
}

/// Profile responsible for the host of `href`
pub fn profile_for_url(href: &str) -> Option<&'static SiteProfile> {
    let host = host_of(href)?;
    profiles().into_iter().find(|profile| profile.owns_host(&host))
}
