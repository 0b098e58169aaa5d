//! URL-shape classification of the current navigation target
use regex::Regex;
use url::Url;

/// The route shapes a site profile can recognise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// The landing page / main feed
    Home,
    /// A single short-form video (a Short, a Reel)
    ShortItem,
    /// A browsable collection of short-form videos
    ShortCollection,
}

/// Result of classifying one URL. More than one kind may hold at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Route {
    pub home: bool,
    pub short_item: bool,
    pub short_collection: bool,
}

impl Route {
    pub fn is(&self, kind: RouteKind) -> bool {
        match kind {
            RouteKind::Home => self.home,
            RouteKind::ShortItem => self.short_item,
            RouteKind::ShortCollection => self.short_collection,
        }
    }

    pub fn is_short_form(&self) -> bool {
        self.short_item || self.short_collection
    }

    fn mark(&mut self, kind: RouteKind) {
        match kind {
            RouteKind::Home => self.home = true,
            RouteKind::ShortItem => self.short_item = true,
            RouteKind::ShortCollection => self.short_collection = true,
        }
    }
}

/// A single URL predicate
#[derive(Debug)]
pub enum RoutePattern {
    /// Regex tested against the path component
    Path(Regex),
    /// Path equal to one of the listed values
    PathIn(&'static [&'static str]),
    /// Query parameter present, optionally with a case-insensitive value prefix
    Query {
        name: &'static str,
        value_prefix: Option<&'static str>,
    },
}

impl RoutePattern {
    /// Compile a path pattern. The patterns are literals owned by the site
    /// tables, so a bad one is a programming error caught by the tests.
    pub fn path(pattern: &str) -> RoutePattern {
        match Regex::new(pattern) {
            Ok(regex) => RoutePattern::Path(regex),
            Err(err) => {
                log::error!("Invalid route pattern {pattern:?}: {err}");
                RoutePattern::PathIn(&[])
            }
        }
    }

    fn matches(&self, url: &Url) -> bool {
        match self {
            RoutePattern::Path(regex) => regex.is_match(url.path()),
            RoutePattern::PathIn(paths) => paths.iter().any(|path| *path == url.path()),
            RoutePattern::Query { name, value_prefix } => url.query_pairs().any(|(key, value)| {
                key == *name
                    && value_prefix.is_none_or(|prefix| {
                        value.to_ascii_lowercase().starts_with(&prefix.to_ascii_lowercase())
                    })
            }),
        }
    }
}

/// The route predicates of one site family
#[derive(Debug, Default)]
pub struct RouteTable {
    patterns: Vec<(RouteKind, RoutePattern)>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable::default()
    }

    pub fn with(mut self, kind: RouteKind, pattern: RoutePattern) -> Self {
        self.patterns.push((kind, pattern));
        self
    }

    /// Classify `href`. Anything that does not parse as a URL matches nothing.
    pub fn classify(&self, href: &str) -> Route {
        let mut route = Route::default();
        let Ok(url) = Url::parse(href) else {
            return route;
        };

        for (kind, pattern) in &self.patterns {
            if !route.is(*kind) && pattern.matches(&url) {
                route.mark(*kind);
            }
        }
        // short-form routes are never treated as home, even with home-like query params
        if route.is_short_form() {
            route.home = false;
        }
        route
    }
}

/// Lowercased host of `href`, if it has one
pub fn host_of(href: &str) -> Option<String> {
    Url::parse(href)
        .ok()?
        .host_str()
        .map(|host| host.to_ascii_lowercase())
}

/// True when `host` is `domain` or one of its subdomains
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
