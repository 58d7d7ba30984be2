use std::cmp::Ordering;

use bundlewire_version::Version;

use crate::config::ResolverConfig;
use crate::generation::GenerationId;

/// Order in which equally valid candidates are tried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    prefer_lowest: bool,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new().prefer_lowest(config.prefer_lowest)
    }

    pub fn prefer_lowest(mut self, prefer_lowest: bool) -> Self {
        self.prefer_lowest = prefer_lowest;
        self
    }

    pub fn is_prefer_lowest(&self) -> bool {
        self.prefer_lowest
    }

    /// Highest version first (lowest with `prefer_lowest`), ties broken by
    /// the older generation id
    pub fn compare(&self, a: (&Version, GenerationId), b: (&Version, GenerationId)) -> Ordering {
        let by_version = if self.prefer_lowest {
            a.0.cmp(b.0)
        } else {
            b.0.cmp(a.0)
        };
        by_version.then_with(|| a.1.cmp(&b.1))
    }

    pub fn sort<T, F>(&self, items: &mut [T], key: F)
    where
        F: Fn(&T) -> (&Version, GenerationId),
    {
        items.sort_by(|a, b| self.compare(key(a), key(b)));
    }
}
