//! Prompt loader for built-in and workspace YAML prompt definitions.
//!
//! Built-in prompts ship inside the binary. A file
//! `.tutor/prompts/<id>.yml` in the workspace overrides the built-in prompt
//! with the same id, so the template wording can be tuned or localized
//! without touching the pipeline.

use crate::types::{PromptDefinition, PIPELINE_VARIABLES};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tutor_core::{config::STATE_DIR, AppError, AppResult};

/// Built-in prompt definitions, keyed by id.
const BUILTIN_PROMPTS: [(&str, &str); 2] = [
    ("rag.cot.en", include_str!("../prompts/rag.cot.en.yml")),
    ("rag.cot.fr", include_str!("../prompts/rag.cot.fr.yml")),
];

/// Where a listed prompt comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptSource {
    Builtin,
    Workspace,
}

/// A prompt id available to the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptListing {
    pub id: String,
    pub source: PromptSource,
}

/// Load a prompt definition by ID.
///
/// Looks for `<id>.yml` in the workspace's `.tutor/prompts/` directory first,
/// then falls back to the built-in definitions.
///
/// # Example
/// ```no_run
/// use tutor_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.cot.en")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
        tracing::info!("Loaded workspace prompt: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    let definition = builtin_prompt(prompt_id)?;
    tracing::debug!("Using built-in prompt: {}", definition.id);
    Ok(definition)
}

/// Load a built-in prompt definition by ID.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, yaml) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| {
            AppError::Prompt(format!(
                "Prompt '{}' not found. Built-in prompts: {}",
                prompt_id,
                BUILTIN_PROMPTS
                    .iter()
                    .map(|(id, _)| *id)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;

    parse_prompt(yaml, "built-in")
}

/// List all prompt IDs available to the workspace, built-ins first.
///
/// A workspace file that overrides a built-in is listed once, as `Workspace`.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<PromptListing>> {
    let mut workspace_ids = Vec::new();
    let dir = prompts_dir(workspace_path);

    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    workspace_ids.push(stem.to_string());
                }
            }
        }
    }
    workspace_ids.sort();

    let mut listings: Vec<PromptListing> = BUILTIN_PROMPTS
        .iter()
        .filter(|(id, _)| !workspace_ids.iter().any(|w| w == id))
        .map(|(id, _)| PromptListing {
            id: id.to_string(),
            source: PromptSource::Builtin,
        })
        .collect();

    listings.extend(workspace_ids.into_iter().map(|id| PromptListing {
        id,
        source: PromptSource::Workspace,
    }));

    Ok(listings)
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    for required in PIPELINE_VARIABLES {
        if !def.variables.iter().any(|v| v == required) {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' must declare variable '{}'",
                def.id, required
            )));
        }
    }

    for variable in &def.variables {
        if !def.references(variable) {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' declares '{}' but its template never uses {{{{{}}}}}",
                def.id, variable, variable
            )));
        }
    }

    Ok(())
}
