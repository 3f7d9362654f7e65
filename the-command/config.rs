//! Parser settings, loadable from TOML.
//!
//! ```toml
//! flag-prefix = "-"
//! max-suggestions = 64
//!
//! [merge]
//! enabled = true
//! open = '"'
//! close = '"'
//! escape = '\'
//! ```
//!
//! Every key is optional.

use serde::Deserialize;

use crate::{
  buffer::MergeRule,
  error::ConfigError,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
  /// First character of every flag name.
  pub flag_prefix:     char,
  pub merge:           MergeSettings,
  /// Upper bound on completion results. `0` means no limit.
  pub max_suggestions: usize,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      flag_prefix:     '-',
      merge:           MergeSettings::default(),
      max_suggestions: 64,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct MergeSettings {
  pub enabled: bool,
  pub open:    char,
  pub close:   char,
  pub escape:  char,
}

impl Default for MergeSettings {
  fn default() -> Self {
    let rule = MergeRule::default();
    Self {
      enabled: true,
      open:    rule.open,
      close:   rule.close,
      escape:  rule.escape,
    }
  }
}

impl Settings {
  pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
    let settings: Self = toml::from_str(source)?;
    settings.validate()?;
    Ok(settings)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.flag_prefix.is_whitespace() {
      return Err(ConfigError::Invalid {
        key:    "flag-prefix",
        reason: "must not be whitespace".to_string(),
      });
    }

    let merge = &self.merge;
    if !merge.enabled {
      return Ok(());
    }
    for (key, ch) in [
      ("merge.open", merge.open),
      ("merge.close", merge.close),
      ("merge.escape", merge.escape),
    ] {
      if ch.is_whitespace() {
        return Err(ConfigError::Invalid {
          key,
          reason: "must not be whitespace".to_string(),
        });
      }
    }
    if merge.escape == merge.open || merge.escape == merge.close {
      return Err(ConfigError::Invalid {
        key:    "merge.escape",
        reason: "must differ from the delimiters".to_string(),
      });
    }
    Ok(())
  }

  /// The merge rule schemas built with these settings use, if merging is on.
  pub fn merge_rule(&self) -> Option<MergeRule> {
    self.merge.enabled.then_some(MergeRule {
      open:   self.merge.open,
      close:  self.merge.close,
      escape: self.merge.escape,
    })
  }

  /// `max_suggestions` as an optional limit.
  pub fn suggestion_limit(&self) -> Option<usize> {
    (self.max_suggestions > 0).then_some(self.max_suggestions)
  }
}
