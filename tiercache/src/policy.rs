//! Per-call read policy
//!
//! Controls which layers a read consults and whether a failing layer is
//! treated as a miss. A policy is built fresh for each call and dropped
//! when the call returns.

use std::collections::HashSet;
use std::fmt;

use crate::core::{CacheError, LevelInfo};

type SkipFn = Box<dyn Fn(&LevelInfo) -> bool + Send + Sync>;
type FallbackFn = Box<dyn Fn(&LevelInfo, &CacheError) -> bool + Send + Sync>;

/// Options for a single `get`/`batch_get` call.
///
/// With no predicates set, every layer is consulted and every layer error
/// falls back to the next layer.
///
/// # Example
/// ```
/// use tiercache::ReadOptions;
///
/// // Bypass the in-process layer and fail fast on remote errors
/// let options = ReadOptions::new()
///     .skip_layer(|info| info.level() == 1)
///     .fallback_on_error(|info, _err| info.name() != "redis");
/// ```
#[derive(Default)]
pub struct ReadOptions {
    skip_layer: Option<SkipFn>,
    fallback_on_error: Option<FallbackFn>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip every layer the predicate returns true for.
    ///
    /// A skipped layer is neither read nor back-populated. Repeated calls
    /// add up: a layer is skipped when any predicate matches.
    pub fn skip_layer<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&LevelInfo) -> bool + Send + Sync + 'static,
    {
        let combined: SkipFn = match self.skip_layer.take() {
            Some(earlier) => {
                Box::new(move |info: &LevelInfo| earlier(info) || predicate(info))
            }
            None => Box::new(predicate),
        };
        self.skip_layer = Some(combined);
        self
    }

    /// Decide whether a layer error falls back to the next layer.
    ///
    /// Returning false aborts the whole read with that error. Only the last
    /// predicate set is used.
    pub fn fallback_on_error<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&LevelInfo, &CacheError) -> bool + Send + Sync + 'static,
    {
        self.fallback_on_error = Some(Box::new(predicate));
        self
    }

    /// Skip the given 1-based levels
    pub fn skip_levels(self, levels: impl IntoIterator<Item = usize>) -> Self {
        let levels: HashSet<usize> = levels.into_iter().collect();
        self.skip_layer(move |info| levels.contains(&info.level()))
    }

    /// Skip every layer whose store carries this name
    pub fn skip_named(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.skip_layer(move |info| info.name() == name)
    }

    /// Never fall back; the first layer error aborts the read
    pub fn fail_fast(self) -> Self {
        self.fallback_on_error(|_, _| false)
    }

    pub(crate) fn should_skip(&self, info: &LevelInfo) -> bool {
        self.skip_layer
            .as_ref()
            .is_some_and(|predicate| predicate(info))
    }

    pub(crate) fn should_fall_back(&self, info: &LevelInfo, err: &CacheError) -> bool {
        self.fallback_on_error
            .as_ref()
            .is_none_or(|predicate| predicate(info, err))
    }
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("skip_layer", &self.skip_layer.is_some())
            .field("fallback_on_error", &self.fallback_on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_never_skip_always_fall_back() {
        let options = ReadOptions::default();
        let info = LevelInfo::new(1, "memory");

        assert!(!options.should_skip(&info));
        assert!(options.should_fall_back(&info, &CacheError::layer("timeout")));
    }

    #[test]
    fn test_skip_predicates_combine() {
        let options = ReadOptions::new().skip_levels([1]).skip_named("redis");

        assert!(options.should_skip(&LevelInfo::new(1, "memory")));
        assert!(options.should_skip(&LevelInfo::new(2, "redis")));
        assert!(!options.should_skip(&LevelInfo::new(3, "db")));
    }

    #[test]
    fn test_skip_levels_and_names() {
        let by_level = ReadOptions::new().skip_levels([1, 3]);
        assert!(by_level.should_skip(&LevelInfo::new(1, "a")));
        assert!(!by_level.should_skip(&LevelInfo::new(2, "b")));
        assert!(by_level.should_skip(&LevelInfo::new(3, "c")));

        let by_name = ReadOptions::new().skip_named("redis");
        assert!(by_name.should_skip(&LevelInfo::new(2, "redis")));
        assert!(!by_name.should_skip(&LevelInfo::new(1, "memory")));
    }

    #[test]
    fn test_fallback_predicate_sees_error() {
        let options =
            ReadOptions::new().fallback_on_error(|_, err| err.to_string() != "l1 error");
        let info = LevelInfo::new(1, "l1");

        assert!(!options.should_fall_back(&info, &CacheError::layer("l1 error")));
        assert!(options.should_fall_back(&info, &CacheError::layer("other")));
        assert!(!ReadOptions::new().fail_fast().should_fall_back(&info, &CacheError::layer("timeout")));
    }
}
