use serde::{Deserialize, Serialize};

/// Visual theme applied by the (external) theme injector. The watcher core
/// only reads and logs it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Bubblegum,
    Spark,
}

/// User preferences read from the preference store at startup and watched
/// for changes. Reporting is opt-in: nothing leaves the process while
/// `reporting_enabled` is false.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub theme: Theme,
    pub reporting_enabled: bool,
    pub history_graphs: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            reporting_enabled: false,
            history_graphs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Theme::Bubblegum).unwrap(),
            "\"bubblegum\""
        );
    }

    #[test]
    fn test_reporting_defaults_off() {
        assert!(!Preferences::default().reporting_enabled);
    }
}
