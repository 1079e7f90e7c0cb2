//! Prompt composer: renders a prompt definition with the pipeline inputs.

use crate::types::{PromptDefinition, PromptInputs};
use handlebars::Handlebars;
use tutor_core::{AppError, AppResult};

const TEMPLATE_NAME: &str = "prompt";

/// A compiled prompt template.
///
/// The template is parsed once at construction; rendering is a pure function
/// of the inputs. HTML escaping is disabled so inputs land in the prompt
/// verbatim, and strict mode turns a reference to an unknown variable into
/// an error instead of an empty string.
pub struct PromptComposer {
    registry: Handlebars<'static>,
    prompt_id: String,
}

impl PromptComposer {
    /// Compile the template of `definition`.
    pub fn new(definition: &PromptDefinition) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        registry
            .register_template_string(TEMPLATE_NAME, &definition.template)
            .map_err(|e| {
                AppError::Prompt(format!(
                    "Failed to compile template '{}': {}",
                    definition.id, e
                ))
            })?;

        tracing::debug!(prompt_id = %definition.id, "Compiled prompt template");

        Ok(Self {
            registry,
            prompt_id: definition.id.clone(),
        })
    }

    /// Id of the prompt this composer renders.
    pub fn prompt_id(&self) -> &str {
        &self.prompt_id
    }

    /// Render the prompt for one pipeline run.
    pub fn compose(&self, inputs: &PromptInputs<'_>) -> AppResult<String> {
        self.registry.render(TEMPLATE_NAME, inputs).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to render template '{}': {}",
                self.prompt_id, e
            ))
        })
    }
}

impl std::fmt::Debug for PromptComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptComposer")
            .field("prompt_id", &self.prompt_id)
            .finish()
    }
}

/// Compile and render `definition` in one step.
pub fn compose_prompt(definition: &PromptDefinition, inputs: &PromptInputs<'_>) -> AppResult<String> {
    PromptComposer::new(definition)?.compose(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::builtin_prompt;

    fn definition(template: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: String::new(),
            language: None,
            variables: Vec::new(),
            template: template.to_string(),
        }
    }

    fn sample_inputs() -> PromptInputs<'static> {
        PromptInputs {
            history: "USER: hi\nASSISTANT: hello",
            question: "What is a polity?",
            chunks: "A polity is an organized society.\n\nStates are polities.",
            external_info: "Polity: a form of government.",
        }
    }

    #[test]
    fn test_compose_snapshot() {
        let def = definition("H:{{history}}\nQ:{{question}}\nC:{{chunks}}\nE:{{external_info}}");
        let rendered = compose_prompt(&def, &sample_inputs()).unwrap();

        assert_eq!(
            rendered,
            "H:USER: hi\nASSISTANT: hello\n\
             Q:What is a polity?\n\
             C:A polity is an organized society.\n\nStates are polities.\n\
             E:Polity: a form of government."
        );
    }

    #[test]
    fn test_compose_is_deterministic() {
        let composer = PromptComposer::new(&builtin_prompt("rag.cot.en").unwrap()).unwrap();
        let first = composer.compose(&sample_inputs()).unwrap();
        let second = composer.compose(&sample_inputs()).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_inputs_are_not_escaped() {
        let def = definition("{{question}}");
        let inputs = PromptInputs {
            question: "<b>Church & State</b> \"quoted\"",
            ..Default::default()
        };
        assert_eq!(
            compose_prompt(&def, &inputs).unwrap(),
            "<b>Church & State</b> \"quoted\""
        );
    }

    #[test]
    fn test_unknown_variable_fails() {
        let def = definition("{{question}} {{context}}");
        let err = compose_prompt(&def, &sample_inputs()).unwrap_err();
        assert!(matches!(err, AppError::Prompt(_)));
    }

    #[test]
    fn test_invalid_template_fails_at_construction() {
        let def = definition("{{#if question}}unterminated");
        assert!(PromptComposer::new(&def).is_err());
    }

    #[test]
    fn test_empty_external_info_renders_empty_section() {
        let composer = PromptComposer::new(&builtin_prompt("rag.cot.en").unwrap()).unwrap();
        let inputs = PromptInputs {
            external_info: "",
            ..sample_inputs()
        };

        let rendered = composer.compose(&inputs).unwrap();
        assert!(rendered.contains("missing from the documents):\n\n\nStep-by-step reasoning:"));
        assert!(rendered.contains("Question: What is a polity?"));
    }

    #[test]
    fn test_builtin_template_lists_eight_steps() {
        let rendered = compose_prompt(&builtin_prompt("rag.cot.en").unwrap(), &sample_inputs()).unwrap();
        for step in 1..=8 {
            assert!(rendered.contains(&format!("\n{}. ", step)), "missing step {}", step);
        }
        assert!(rendered.trim_end().ends_with("Final answer:"));
    }
}
