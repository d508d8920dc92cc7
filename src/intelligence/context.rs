/// Interaction context
///
/// The snapshot stored with every interaction and used as the query key
/// for predictions.

use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionContext {
    pub active_application: Option<String>,
    pub project_type: Option<ProjectType>,
    /// 0-23
    pub hour_of_day: u32,
    pub day_of_week: DayOfWeek,
    /// Workflow ids run most recently, newest first
    #[serde(default)]
    pub recent_workflows: Vec<String>,
}

impl InteractionContext {
    /// Context for a given hour on a Monday, nothing else known
    pub fn at_hour(hour_of_day: u32) -> Self {
        Self {
            active_application: None,
            project_type: None,
            hour_of_day: hour_of_day % 24,
            day_of_week: DayOfWeek::Monday,
            recent_workflows: Vec::new(),
        }
    }

    /// Context at a specific local time
    pub fn at_time(time: DateTime<Local>) -> Self {
        Self {
            hour_of_day: time.hour(),
            day_of_week: DayOfWeek::from(time.weekday()),
            ..Self::at_hour(0)
        }
    }

    pub fn with_day(mut self, day: DayOfWeek) -> Self {
        self.day_of_week = day;
        self
    }

    pub fn with_application(mut self, app: impl Into<String>) -> Self {
        self.active_application = Some(app.into());
        self
    }

    pub fn with_project_type(mut self, project_type: ProjectType) -> Self {
        self.project_type = Some(project_type);
        self
    }

    pub fn with_recent_workflows(mut self, recent: Vec<String>) -> Self {
        self.recent_workflows = recent;
        self
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_hour(self.hour_of_day)
    }
}

/// Time of day categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,   // 6am - 12pm
    Afternoon, // 12pm - 6pm
    Evening,   // 6pm - 10pm
    Night,     // 10pm - 6am
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour % 24 {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            18..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn is_weekend(&self) -> bool {
        matches!(self, DayOfWeek::Saturday | DayOfWeek::Sunday)
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => DayOfWeek::Monday,
            chrono::Weekday::Tue => DayOfWeek::Tuesday,
            chrono::Weekday::Wed => DayOfWeek::Wednesday,
            chrono::Weekday::Thu => DayOfWeek::Thursday,
            chrono::Weekday::Fri => DayOfWeek::Friday,
            chrono::Weekday::Sat => DayOfWeek::Saturday,
            chrono::Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Project type detected from marker files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Node,   // package.json
    Rust,   // Cargo.toml
    Python, // requirements.txt, setup.py
    Go,     // go.mod
    Java,   // pom.xml
    Ruby,   // Gemfile
    Other,
}

impl std::str::FromStr for ProjectType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "node" | "javascript" | "typescript" => ProjectType::Node,
            "rust" => ProjectType::Rust,
            "python" => ProjectType::Python,
            "go" => ProjectType::Go,
            "java" => ProjectType::Java,
            "ruby" => ProjectType::Ruby,
            _ => ProjectType::Other,
        })
    }
}

/// Builds the context for "right now"
pub struct ContextDetector;

impl ContextDetector {
    /// Current local time plus whatever the directory tells us
    pub fn detect(working_directory: &Path) -> InteractionContext {
        let mut context = InteractionContext::at_time(Local::now());
        context.project_type = Self::detect_project_type(working_directory);
        context
    }

    /// Detect project type from marker files
    pub fn detect_project_type(dir: &Path) -> Option<ProjectType> {
        if !dir.is_dir() {
            return None;
        }

        if dir.join("package.json").exists() {
            Some(ProjectType::Node)
        } else if dir.join("Cargo.toml").exists() {
            Some(ProjectType::Rust)
        } else if dir.join("requirements.txt").exists() || dir.join("setup.py").exists() {
            Some(ProjectType::Python)
        } else if dir.join("go.mod").exists() {
            Some(ProjectType::Go)
        } else if dir.join("pom.xml").exists() {
            Some(ProjectType::Java)
        } else if dir.join("Gemfile").exists() {
            Some(ProjectType::Ruby)
        } else {
            Some(ProjectType::Other)
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeOfDay::Morning => write!(f, "morning"),
            TimeOfDay::Afternoon => write!(f, "afternoon"),
            TimeOfDay::Evening => write!(f, "evening"),
            TimeOfDay::Night => write!(f, "night"),
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayOfWeek::Monday => write!(f, "Monday"),
            DayOfWeek::Tuesday => write!(f, "Tuesday"),
            DayOfWeek::Wednesday => write!(f, "Wednesday"),
            DayOfWeek::Thursday => write!(f, "Thursday"),
            DayOfWeek::Friday => write!(f, "Friday"),
            DayOfWeek::Saturday => write!(f, "Saturday"),
            DayOfWeek::Sunday => write!(f, "Sunday"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_context() {
        let temp = TempDir::new().unwrap();
        let ctx = ContextDetector::detect(temp.path());

        assert!(ctx.hour_of_day < 24);
        assert_eq!(ctx.project_type, Some(ProjectType::Other));
        assert!(ctx.recent_workflows.is_empty());
    }

    #[test]
    fn test_detect_rust_project() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Cargo.toml"), "[package]").unwrap();

        assert_eq!(
            ContextDetector::detect_project_type(temp.path()),
            Some(ProjectType::Rust)
        );
    }

    #[test]
    fn test_time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_hour(9), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(3), TimeOfDay::Night);
    }

    #[test]
    fn test_at_hour_wraps() {
        assert_eq!(InteractionContext::at_hour(27).hour_of_day, 3);
    }

    #[test]
    fn test_project_type_parsing() {
        assert_eq!("Rust".parse::<ProjectType>().unwrap(), ProjectType::Rust);
        assert_eq!("cobol".parse::<ProjectType>().unwrap(), ProjectType::Other);
    }

    #[test]
    fn test_weekend() {
        assert!(DayOfWeek::Sunday.is_weekend());
        assert!(!DayOfWeek::from(chrono::Weekday::Wed).is_weekend());
    }
}
