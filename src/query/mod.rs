//! Read-only filtering, search and sorting over reflections.
//!
//! A [`ReflectionFilter`] is a conjunction of optional predicates; an unset
//! predicate imposes no constraint. Sorting is a separate step driven by a
//! [`SortSpec`].

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Category, Reflection};

/// Composable reflection filter. All set predicates must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectionFilter {
    /// Category set membership.
    #[serde(default)]
    pub categories: BTreeSet<Category>,
    /// Inclusive mood range; reflections without a mood never match.
    pub mood: Option<RangeInclusive<u8>>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring match; any tag may match.
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_private: Option<bool>,
    /// Case-insensitive overlap with the reflection's emotional states.
    #[serde(default)]
    pub emotional_states: Vec<String>,
    pub therapeutic_value: Option<RangeInclusive<u8>>,
    pub crisis_safe: Option<bool>,
    /// Case-insensitive search over title, content, prompt and tags.
    pub search: Option<String>,
}

impl ReflectionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given categories
    pub fn with_categories<I: IntoIterator<Item = Category>>(mut self, categories: I) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    /// Restrict to an inclusive mood range
    pub fn with_mood(mut self, range: RangeInclusive<u8>) -> Self {
        self.mood = Some(range);
        self
    }

    /// Restrict to an inclusive timestamp range
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Match any of these tag fragments
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Match on the privacy flag
    pub fn private(mut self, is_private: bool) -> Self {
        self.is_private = Some(is_private);
        self
    }

    /// Match any of these emotional states
    pub fn with_emotional_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emotional_states = states.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to an inclusive therapeutic-value range
    pub fn with_therapeutic_value(mut self, range: RangeInclusive<u8>) -> Self {
        self.therapeutic_value = Some(range);
        self
    }

    /// Match on the crisis-safety flag
    pub fn crisis_safe(mut self, crisis_safe: bool) -> Self {
        self.crisis_safe = Some(crisis_safe);
        self
    }

    /// Free-text search
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate every set predicate against one reflection.
    pub fn matches(&self, reflection: &Reflection) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&reflection.category) {
            return false;
        }

        if let Some(range) = &self.mood {
            match reflection.mood {
                Some(mood) if range.contains(&mood) => {}
                _ => return false,
            }
        }

        if let Some(from) = self.from {
            if reflection.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if reflection.created_at > to {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let wanted: Vec<String> = self.tags.iter().map(|t| t.to_lowercase()).collect();
            let hit = reflection.tags.iter().any(|tag| {
                let tag = tag.to_lowercase();
                wanted.iter().any(|w| tag.contains(w.as_str()))
            });
            if !hit {
                return false;
            }
        }

        if let Some(is_private) = self.is_private {
            if reflection.is_private != is_private {
                return false;
            }
        }

        if !self.emotional_states.is_empty() {
            let overlap = reflection.metadata.emotional_state.iter().any(|state| {
                self.emotional_states
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(state))
            });
            if !overlap {
                return false;
            }
        }

        if let Some(range) = &self.therapeutic_value {
            if !range.contains(&reflection.metadata.therapeutic_value) {
                return false;
            }
        }

        if let Some(crisis_safe) = self.crisis_safe {
            if reflection.metadata.crisis_safe != crisis_safe {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => matches_search(reflection, &text.to_lowercase()),
            _ => true,
        }
    }
}

fn matches_search(reflection: &Reflection, needle: &str) -> bool {
    reflection.title.to_lowercase().contains(needle)
        || reflection.content.to_lowercase().contains(needle)
        || reflection
            .prompt
            .as_deref()
            .map(|p| p.to_lowercase().contains(needle))
            .unwrap_or(false)
        || reflection
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(needle))
}

/// Field to sort reflections by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Timestamp,
    Mood,
    Category,
    WordCount,
    TherapeuticValue,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "timestamp" | "date" => Ok(SortKey::Timestamp),
            "mood" => Ok(SortKey::Mood),
            "category" => Ok(SortKey::Category),
            "word_count" | "words" => Ok(SortKey::WordCount),
            "therapeutic_value" => Ok(SortKey::TherapeuticValue),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Sort key plus direction. Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn ascending(key: SortKey) -> Self {
        Self::new(key, SortDirection::Ascending)
    }

    pub fn descending(key: SortKey) -> Self {
        Self::new(key, SortDirection::Descending)
    }

    fn compare(&self, a: &Reflection, b: &Reflection) -> Ordering {
        let primary = match self.key {
            SortKey::Timestamp => a.created_at.cmp(&b.created_at),
            // Reflections without a mood sort below any recorded mood.
            SortKey::Mood => a.mood.cmp(&b.mood),
            SortKey::Category => a.category.as_str().cmp(b.category.as_str()),
            SortKey::WordCount => a.word_count.cmp(&b.word_count),
            SortKey::TherapeuticValue => a
                .metadata
                .therapeutic_value
                .cmp(&b.metadata.therapeutic_value),
        };
        let ordering = primary
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Keep the reflections that match the filter, in input order.
pub fn filter_reflections<'a, I>(reflections: I, filter: &ReflectionFilter) -> Vec<&'a Reflection>
where
    I: IntoIterator<Item = &'a Reflection>,
{
    reflections
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect()
}

/// Sort in place by the given `SortSpec`.
pub fn sort_reflections(reflections: &mut [&Reflection], spec: &SortSpec) {
    reflections.sort_by(|a, b| spec.compare(a, b));
}

/// Filter, then sort.
pub fn query_reflections<'a, I>(
    reflections: I,
    filter: &ReflectionFilter,
    spec: &SortSpec,
) -> Vec<&'a Reflection>
where
    I: IntoIterator<Item = &'a Reflection>,
{
    let mut selected = filter_reflections(reflections, filter);
    sort_reflections(&mut selected, spec);
    selected
}
