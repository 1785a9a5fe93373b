//! External prompt templates.
//!
//! A template is an opaque text with a single named placeholder
//! (`{release-notes}`, `{correlated_info}`, ...) substituted before each
//! backend call. Template content never influences core logic beyond its
//! token overhead, which the orchestrator subtracts from the chunk budget.

use std::path::Path;

use crate::chunk::estimate_tokens;
use crate::config::ConfigError;

/// Default placeholder name used by the stock summarize template.
pub const DEFAULT_PLACEHOLDER: &str = "release-notes";

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
    /// Placeholder token including braces, e.g. `{release-notes}`.
    token: String,
}

impl PromptTemplate {
    /// Wrap `text`, verifying the placeholder is present.
    pub fn new(text: impl Into<String>, placeholder: &str) -> Result<Self, ConfigError> {
        let text = text.into();
        let token = format!("{{{placeholder}}}");
        if !text.contains(&token) {
            return Err(ConfigError::MissingPlaceholder(placeholder.to_string()));
        }
        Ok(Self { text, token })
    }

    /// Load a template file.
    pub fn from_file(path: impl AsRef<Path>, placeholder: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::UnreadableFile {
            what: "prompt template",
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::new(text, placeholder)
    }

    /// The identity template: the rendered prompt is the body itself.
    pub fn passthrough() -> Self {
        Self {
            text: format!("{{{DEFAULT_PLACEHOLDER}}}"),
            token: format!("{{{DEFAULT_PLACEHOLDER}}}"),
        }
    }

    /// Substitute the placeholder with `body`.
    pub fn render(&self, body: &str) -> String {
        self.text.replace(&self.token, body)
    }

    /// Estimated token cost of the template around an empty body.
    pub fn overhead_tokens(&self) -> usize {
        estimate_tokens(&self.text.replace(&self.token, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_body_into_placeholder() {
        let template =
            PromptTemplate::new("Summarize the following:\n{release-notes}\nBe brief.", "release-notes")
                .unwrap();
        let prompt = template.render("NODE-1 fixed");
        assert!(prompt.contains("NODE-1 fixed"));
        assert!(!prompt.contains("{release-notes}"));
    }

    #[test]
    fn missing_placeholder_is_a_config_error() {
        let result = PromptTemplate::new("no placeholder here", "release-notes");
        assert!(matches!(result, Err(ConfigError::MissingPlaceholder(_))));
    }

    #[test]
    fn passthrough_is_identity() {
        let template = PromptTemplate::passthrough();
        assert_eq!(template.render("just the body"), "just the body");
        assert_eq!(template.overhead_tokens(), 0);
    }

    #[test]
    fn overhead_excludes_the_body() {
        let template = PromptTemplate::new("AAAA{release-notes}BBBB", "release-notes").unwrap();
        assert_eq!(template.overhead_tokens(), estimate_tokens("AAAABBBB"));
    }
}
