//! Input length policy applied to the memo body before it reaches a record.

use crate::models::{LimitType, Settings};

/// Measures text against a [`Settings`] limit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimiter {
    limit_type: LimitType,
    limit_value: u32,
}

impl InputLimiter {
    #[must_use]
    pub const fn new(limit_type: LimitType, limit_value: u32) -> Self {
        Self {
            limit_type,
            limit_value,
        }
    }

    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.limit_type, settings.limit_value)
    }

    #[must_use]
    pub const fn limit_type(&self) -> LimitType {
        self.limit_type
    }

    #[must_use]
    pub const fn limit_value(&self) -> u32 {
        self.limit_value
    }

    /// Current usage of `text` in the configured unit.
    #[must_use]
    pub fn usage(&self, text: &str) -> usize {
        match self.limit_type {
            LimitType::Char => text.chars().count(),
            LimitType::Byte => text.len(),
        }
    }

    #[must_use]
    pub fn is_exceeded(&self, text: &str) -> bool {
        self.usage(text) > self.limit()
    }

    /// Units left before the limit; negative once exceeded.
    #[must_use]
    pub fn remainder(&self, text: &str) -> i64 {
        let limit = i64::from(self.limit_value);
        let usage = i64::try_from(self.usage(text)).unwrap_or(i64::MAX);
        limit.saturating_sub(usage)
    }

    /// Usage as a fraction of the limit (0.0 when the limit is zero).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn usage_rate(&self, text: &str) -> f64 {
        if self.limit_value == 0 {
            return 0.0;
        }
        self.usage(text) as f64 / f64::from(self.limit_value)
    }

    /// Longest prefix of `text` that fits the limit. Never splits a character.
    #[must_use]
    pub fn truncate<'a>(&self, text: &'a str) -> &'a str {
        if !self.is_exceeded(text) {
            return text;
        }

        let limit = self.limit();
        let end = match self.limit_type {
            LimitType::Char => text
                .char_indices()
                .nth(limit)
                .map_or(text.len(), |(index, _)| index),
            LimitType::Byte => {
                let mut end = limit.min(text.len());
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                end
            }
        };
        &text[..end]
    }

    fn limit(&self) -> usize {
        usize::try_from(self.limit_value).unwrap_or(usize::MAX)
    }
}

impl Default for InputLimiter {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
