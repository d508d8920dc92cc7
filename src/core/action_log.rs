// Ordered log of raw actions, fed to automation-opportunity detection
//
// Filters out stuff like passwords and API keys before it ever reaches
// the analyzer.

use crate::error::{FlowsenseError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

// Nobody types a 10KB action by hand
const MAX_ACTION_LENGTH: usize = 10_000;

// Regex patterns for stuff we definitely shouldn't keep
const SENSITIVE_PATTERNS: &[&str] = &[
    r"password\s*=",
    r"pwd\s*=",
    r"passwd\s*=",
    r"token\s*=",
    r"api[_-]?key\s*=",
    r"secret\s*=",
    r"auth\s*=",
    r"bearer\s+",
    r"--password",
    r"--token",
    // -p only carries a password for the database clients
    r"\b(mysql|mysqldump|mysqladmin)\b.*\s-p\S*",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: Option<f64>,
}

impl RecordedAction {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            timestamp: Utc::now(),
            duration_secs: None,
        }
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

impl From<&str> for RecordedAction {
    fn from(action: &str) -> Self {
        RecordedAction::new(action)
    }
}

pub struct ActionLog {
    actions: Vec<RecordedAction>,
    sensitive_regex: Vec<Regex>,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionLog {
    pub fn new() -> Self {
        // Build all the regex patterns once so we don't recompile them every time
        let sensitive_regex = SENSITIVE_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            actions: Vec::new(),
            sensitive_regex,
        }
    }

    // Checks the action is safe, cleans it up, appends it
    pub fn record(&mut self, action: RecordedAction) -> Result<()> {
        self.validate_action(&action.action)?;

        let sanitized = RecordedAction {
            action: self.sanitize_action(&action.action),
            duration_secs: action.duration_secs.filter(|d| d.is_finite() && *d >= 0.0),
            ..action
        };
        self.actions.push(sanitized);

        Ok(())
    }

    /// Record many actions, skipping the ones that fail validation
    ///
    /// Returns how many were kept.
    pub fn record_all<I>(&mut self, actions: I) -> usize
    where
        I: IntoIterator<Item = RecordedAction>,
    {
        let mut kept = 0;

        for action in actions {
            match self.record(action) {
                Ok(()) => kept += 1,
                Err(e) => tracing::debug!("skipped action: {}", e),
            }
        }

        kept
    }

    /// Parse one action per line. Blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Self {
        let mut log = Self::new();
        let actions = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(RecordedAction::new);

        let kept = log.record_all(actions);
        tracing::debug!(kept, "parsed action log");
        log
    }

    pub fn actions(&self) -> &[RecordedAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn validate_action(&self, action: &str) -> Result<()> {
        let trimmed = action.trim();
        if trimmed.is_empty() {
            return Err(FlowsenseError::InvalidAction("empty action".to_string()));
        }

        if trimmed.len() > MAX_ACTION_LENGTH {
            return Err(FlowsenseError::ActionTooLong(MAX_ACTION_LENGTH));
        }

        if self.contains_sensitive_data(trimmed) {
            return Err(FlowsenseError::SensitiveData);
        }

        Ok(())
    }

    /// Sanitize an action string
    ///
    /// - Removes null bytes
    /// - Trims whitespace
    /// - Normalizes whitespace (multiple spaces to single)
    fn sanitize_action(&self, action: &str) -> String {
        action
            .replace('\0', "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn contains_sensitive_data(&self, action: &str) -> bool {
        let lowercase = action.to_lowercase();

        self.sensitive_regex
            .iter()
            .any(|regex| regex.is_match(&lowercase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::intelligence::PatternAnalyzer;

    #[test]
    fn test_record_valid_action() {
        let mut log = ActionLog::new();
        log.record(RecordedAction::new("npm test")).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_record_empty_action() {
        let mut log = ActionLog::new();
        let result = log.record(RecordedAction::new("   "));

        match result {
            Err(FlowsenseError::InvalidAction(_)) => {}
            _ => panic!("Expected InvalidAction error"),
        }
        assert!(log.is_empty());
    }

    #[test]
    fn test_record_sensitive_action() {
        let mut log = ActionLog::new();
        let result = log.record(RecordedAction::new("mysql -u root --password=secret123"));

        match result {
            Err(FlowsenseError::SensitiveData) => {}
            _ => panic!("Expected SensitiveData error"),
        }
    }

    #[test]
    fn test_action_too_long() {
        let mut log = ActionLog::new();
        let result = log.record(RecordedAction::new("a".repeat(MAX_ACTION_LENGTH + 1)));

        match result {
            Err(FlowsenseError::ActionTooLong(_)) => {}
            _ => panic!("Expected ActionTooLong error"),
        }
    }

    #[test]
    fn test_sanitize_action() {
        let log = ActionLog::new();

        assert_eq!(log.sanitize_action("  npm    test   "), "npm test");
        assert!(!log.sanitize_action("cmd\0with\0nulls").contains('\0'));
    }

    #[test]
    fn test_negative_duration_dropped() {
        let mut log = ActionLog::new();
        log.record(RecordedAction::new("cargo build").with_duration(-3.0))
            .unwrap();
        assert_eq!(log.actions()[0].duration_secs, None);
    }

    #[test]
    fn test_from_lines_skips_comments_and_secrets() {
        let text = "# morning\ngit pull\n\nexport API_KEY=abc123\ncargo   test\n";
        let log = ActionLog::from_lines(text);

        let actions: Vec<&str> = log.actions().iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["git pull", "cargo test"]);
    }

    #[test]
    fn test_short_p_flags_kept() {
        let text = "mkdir -p build\ncargo test -p core\ndocker run -p 8080:80 app\nssh -P 22 host\n";
        let log = ActionLog::from_lines(text);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_database_password_flag_rejected() {
        let mut log = ActionLog::new();

        for action in ["mysql -u root -psecret", "mysqldump -u admin -p shop"] {
            match log.record(RecordedAction::new(action)) {
                Err(FlowsenseError::SensitiveData) => {}
                other => panic!("Expected SensitiveData for {}, got {:?}", action, other),
            }
        }
        assert!(log.is_empty());
    }

    #[test]
    fn test_routine_with_p_flags_detected_whole() {
        let routine = ["cd repo", "mkdir -p out", "cargo test -p core", "cargo build"];
        let noise = ["ls", "git status", "htop", "make docs", "vim notes.md"];

        let mut text = String::new();
        for n in noise {
            for step in routine {
                text.push_str(step);
                text.push('\n');
            }
            text.push_str(n);
            text.push('\n');
        }

        let log = ActionLog::from_lines(&text);
        assert_eq!(log.len(), 25);

        let analyzer = PatternAnalyzer::new(&ModelConfig::default());
        let found = analyzer.detect_repeated_sequences(log.actions());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].actions, routine);
        assert_eq!(found[0].frequency, 5);
    }
}
