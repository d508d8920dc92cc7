/// Workflow catalog
///
/// Reads the list of available workflows from a JSON file. When no file
/// exists, every workflow id seen in history becomes a bare catalog entry.

use crate::db::{Database, Workflow};
use crate::error::{FlowsenseError, Result};
use std::path::Path;

pub struct WorkflowCatalog;

impl WorkflowCatalog {
    /// Load a JSON array of workflows
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Workflow>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FlowsenseError::Catalog(format!("could not read {}: {}", path.display(), e))
        })?;

        let workflows: Vec<Workflow> = serde_json::from_str(&raw)?;
        if let Some(bad) = workflows.iter().find(|w| w.id.trim().is_empty()) {
            return Err(FlowsenseError::Catalog(format!(
                "workflow '{}' has an empty id",
                bad.name
            )));
        }

        Ok(workflows)
    }

    /// Catalog file if present, otherwise workflows known from history
    pub async fn load_or_infer<P: AsRef<Path>>(path: P, db: &Database) -> Result<Vec<Workflow>> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        let inferred: Vec<Workflow> = db
            .known_workflow_ids()
            .await?
            .into_iter()
            .map(|id| Workflow::new(id.clone(), id))
            .collect();

        tracing::debug!(count = inferred.len(), "inferred workflow catalog from history");
        Ok(inferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserInteraction;
    use crate::intelligence::InteractionContext;
    use tempfile::TempDir;

    #[test]
    fn test_load_catalog() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("workflows.json");
        std::fs::write(
            &path,
            r#"[
                { "id": "ship", "name": "Ship It", "steps": ["cargo test", "git push"], "tags": ["release"] },
                { "id": "standup", "name": "Morning Standup", "category": "daily" }
            ]"#,
        )
        .unwrap();

        let workflows = WorkflowCatalog::load(&path).unwrap();
        assert_eq!(workflows.len(), 2);
        assert_eq!(workflows[0].steps.len(), 2);
        assert_eq!(workflows[1].category.as_deref(), Some("daily"));
    }

    #[test]
    fn test_empty_id_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("workflows.json");
        std::fs::write(&path, r#"[{ "id": " ", "name": "Nameless" }]"#).unwrap();

        match WorkflowCatalog::load(&path) {
            Err(FlowsenseError::Catalog(msg)) => assert!(msg.contains("Nameless")),
            other => panic!("Expected Catalog error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_infer_from_history() {
        let temp = TempDir::new().unwrap();
        let db = Database::in_memory().await.unwrap();
        db.insert_interaction(&UserInteraction::workflow_run(
            "deploy",
            InteractionContext::at_hour(10),
        ))
        .await
        .unwrap();

        let workflows = WorkflowCatalog::load_or_infer(temp.path().join("missing.json"), &db)
            .await
            .unwrap();
        assert_eq!(workflows, vec![Workflow::new("deploy", "deploy")]);
    }
}
