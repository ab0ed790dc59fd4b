//! Fragment routing.
//!
//! A `Router` owns a route table and the current location fragment. It is
//! handed to the view that defines the routes instead of living as a global,
//! so navigation events can be fed to it directly.

use regex::Regex;

#[derive(Debug, Clone)]
pub enum RoutePattern {
    /// Exact path; a trailing `?query` is ignored.
    Literal(String),
    Regex(Regex),
}

impl RoutePattern {
    pub fn literal(path: &str) -> Self {
        Self::Literal(path.to_string())
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    /// Capture groups on a match; unmatched optional groups come back empty.
    fn matches(&self, fragment: &str) -> Option<Vec<String>> {
        match self {
            Self::Literal(path) => {
                let bare = fragment.split_once('?').map_or(fragment, |(p, _)| p);
                (bare == path).then(Vec::new)
            }
            Self::Regex(re) => re.captures(fragment).map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<A> {
    pub action: A,
    pub params: Vec<String>,
}

#[derive(Debug)]
pub struct Router<A> {
    routes: Vec<(RoutePattern, A)>,
    fragment: Option<String>,
    started: bool,
}

impl<A> Default for Router<A> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            fragment: None,
            started: false,
        }
    }
}

impl<A: Clone> Router<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Routes registered later are tried first.
    pub fn route(&mut self, pattern: RoutePattern, action: A) -> &mut Self {
        self.routes.insert(0, (pattern, action));
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Begin observing navigation and dispatch the initial location.
    /// Starting twice is a no-op.
    pub fn start(&mut self, location: &str) -> Option<RouteMatch<A>> {
        if self.started {
            tracing::warn!("router already started; ignoring start({location:?})");
            return None;
        }
        self.started = true;
        let fragment = normalize_fragment(location).to_string();
        let matched = self.dispatch(&fragment);
        self.fragment = Some(fragment);
        matched
    }

    /// Move to `fragment`. Routes fire only when `trigger` is set and the
    /// fragment actually changed. Before `start` nothing happens.
    pub fn navigate(&mut self, fragment: &str, trigger: bool) -> Option<RouteMatch<A>> {
        if !self.started {
            tracing::debug!("navigate({fragment:?}) before router start");
            return None;
        }
        let fragment = normalize_fragment(fragment);
        if self.fragment.as_deref() == Some(fragment) {
            return None;
        }
        self.fragment = Some(fragment.to_string());
        if trigger {
            self.dispatch(fragment)
        } else {
            None
        }
    }

    fn dispatch(&self, fragment: &str) -> Option<RouteMatch<A>> {
        let matched = self.routes.iter().find_map(|(pattern, action)| {
            pattern.matches(fragment).map(|params| RouteMatch {
                action: action.clone(),
                params,
            })
        });
        if matched.is_none() {
            tracing::debug!("no route for fragment {fragment:?}");
        }
        matched
    }
}

/// Strip leading `#`/`/` and trailing whitespace.
pub fn normalize_fragment(raw: &str) -> &str {
    raw.trim_start_matches(['#', '/']).trim_end()
}
