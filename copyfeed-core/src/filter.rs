//! Feed filters: direction chips plus subscription/follow scope.
//!
//! Direction tags are mutually exclusive with `All`: selecting `All` clears
//! the specific directions, selecting a specific direction clears `All`, and a
//! set left without any direction falls back to `All`. Scope tags are
//! independent of the direction tags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One selectable filter chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterTag {
    All,
    Long,
    Short,
    Subscribed,
    Followed,
}

impl FilterTag {
    pub const ALL_TAGS: [FilterTag; 5] = [
        FilterTag::All,
        FilterTag::Long,
        FilterTag::Short,
        FilterTag::Subscribed,
        FilterTag::Followed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FilterTag::All => "all",
            FilterTag::Long => "long",
            FilterTag::Short => "short",
            FilterTag::Subscribed => "subscribed",
            FilterTag::Followed => "followed",
        }
    }

    /// True for the tags that pick a direction (`All`, `Long`, `Short`).
    pub fn is_direction(self) -> bool {
        matches!(self, FilterTag::All | FilterTag::Long | FilterTag::Short)
    }
}

impl fmt::Display for FilterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterTag::All),
            "long" => Ok(FilterTag::Long),
            "short" => Ok(FilterTag::Short),
            "subscribed" => Ok(FilterTag::Subscribed),
            "followed" => Ok(FilterTag::Followed),
            other => Err(format!(
                "unknown filter '{other}'. Valid: all, long, short, subscribed, followed"
            )),
        }
    }
}

/// Which signal query a filter set maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionQuery {
    /// Every active signal.
    All,
    Long,
    Short,
    /// Long and short fetched separately and merged.
    Both,
}

/// Scope narrowing requested by the filter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScopeFilter {
    pub subscribed: bool,
    pub followed: bool,
}

impl ScopeFilter {
    pub fn is_active(self) -> bool {
        self.subscribed || self.followed
    }
}

/// Normalized set of active filter tags. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    tags: BTreeSet<FilterTag>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            tags: BTreeSet::from([FilterTag::All]),
        }
    }
}

impl FilterSet {
    /// Build a set from raw tags, normalized against the default `{all}`.
    pub fn from_tags(tags: impl IntoIterator<Item = FilterTag>) -> Self {
        let requested: BTreeSet<FilterTag> = tags.into_iter().collect();
        Self::normalize(&FilterSet::default(), &requested)
    }

    /// Normalize a requested selection given the previously active set.
    ///
    /// Which of `All` / a specific direction wins depends on which one was
    /// just selected, so the previous set is needed to break the tie.
    pub fn normalize(previous: &FilterSet, requested: &BTreeSet<FilterTag>) -> FilterSet {
        let mut tags = requested.clone();
        let has_specific = tags.contains(&FilterTag::Long) || tags.contains(&FilterTag::Short);

        if tags.contains(&FilterTag::All) && has_specific {
            if previous.contains(FilterTag::All) {
                tags.remove(&FilterTag::All);
            } else {
                tags.remove(&FilterTag::Long);
                tags.remove(&FilterTag::Short);
            }
        }

        if !tags.iter().any(|t| t.is_direction()) {
            tags.insert(FilterTag::All);
        }

        FilterSet { tags }
    }

    /// Flip one chip and renormalize.
    pub fn toggle(&self, tag: FilterTag) -> FilterSet {
        let mut requested = self.tags.clone();
        if !requested.remove(&tag) {
            requested.insert(tag);
        }
        Self::normalize(self, &requested)
    }

    pub fn contains(&self, tag: FilterTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = FilterTag> + '_ {
        self.tags.iter().copied()
    }

    pub fn direction_query(&self) -> DirectionQuery {
        match (self.contains(FilterTag::Long), self.contains(FilterTag::Short)) {
            (true, true) => DirectionQuery::Both,
            (true, false) => DirectionQuery::Long,
            (false, true) => DirectionQuery::Short,
            (false, false) => DirectionQuery::All,
        }
    }

    pub fn scope(&self) -> ScopeFilter {
        ScopeFilter {
            subscribed: self.contains(FilterTag::Subscribed),
            followed: self.contains(FilterTag::Followed),
        }
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.tags.iter().map(|t| t.label()).collect();
        f.write_str(&labels.join("+"))
    }
}
