//! Stage prompt templates.
//!
//! A template is plain text with `{name}` placeholders. `{{` and `}}` produce
//! literal braces. Templates are looked up in the prompts directory first and
//! fall back to the copies bundled into the binary.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use rust_embed::RustEmbed;

use crate::context::ProjectContext;
use crate::errors::PipelineError;

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/templates/prompts/"]
struct BundledPrompts;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([a-z_]+)\}").expect("placeholder pattern is a valid static regex")
});

/// Where a template was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    File(PathBuf),
    Bundled,
}

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts_dir: Option<PathBuf>,
}

impl PromptLibrary {
    pub fn new(prompts_dir: Option<PathBuf>) -> Self {
        Self { prompts_dir }
    }

    pub fn for_context(ctx: &ProjectContext) -> Self {
        Self::new(Some(ctx.prompts_dir()))
    }

    /// Only the bundled templates.
    pub fn bundled() -> Self {
        Self::new(None)
    }

    /// Load `<name>`, preferring the prompts directory.
    pub fn load(&self, name: &str) -> Result<(String, TemplateOrigin), PipelineError> {
        if let Some(dir) = &self.prompts_dir {
            let path = dir.join(name);
            if path.is_file() {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    PipelineError::Configuration(format!(
                        "Failed to read template {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                return Ok((text, TemplateOrigin::File(path)));
            }
        }

        let file = BundledPrompts::get(name).ok_or_else(|| {
            PipelineError::Configuration(format!("No prompt template named {}", name))
        })?;
        let text = String::from_utf8_lossy(&file.data).into_owned();
        Ok((text, TemplateOrigin::Bundled))
    }

    /// Names of the bundled templates, sorted.
    pub fn bundled_names() -> Vec<String> {
        let mut names: Vec<String> = BundledPrompts::iter().map(|n| n.into_owned()).collect();
        names.sort();
        names
    }
}

/// Substitute `{name}` placeholders from `vars`.
///
/// A placeholder with no value fails with `PipelineError::Template`.
pub fn render(
    stage: &str,
    template: &str,
    vars: &BTreeMap<&str, String>,
) -> Result<String, PipelineError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        out.push_str(&substitution(stage, &caps, vars)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn substitution(
    stage: &str,
    caps: &Captures<'_>,
    vars: &BTreeMap<&str, String>,
) -> Result<String, PipelineError> {
    let Some(name) = caps.get(1) else {
        // Escaped brace
        return Ok(caps[0][..1].to_string());
    };
    vars.get(name.as_str())
        .cloned()
        .ok_or_else(|| PipelineError::Template {
            stage: stage.to_string(),
            placeholder: name.as_str().to_string(),
        })
}
