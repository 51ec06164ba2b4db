//! Prompt templates with `{{NAME}}` placeholders.
//!
//! Template files are owned by whoever deploys the engine; the engine only
//! knows their names and the placeholders it fills in.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::{NarrativeError, Result};

pub const INIT_TEMPLATE: &str = "init_world";
pub const TICK_TEMPLATE: &str = "latent_update";
pub const COLLAPSE_TEMPLATE: &str = "collapse";
pub const DIALOG_TEMPLATE: &str = "dialog";

/// Replace ASCII double quotes in free-form player text so it cannot break
/// out of a quoted region in a template.
pub fn escape_player_input(input: &str) -> String {
    input.replace('"', "\u{201C}")
}

/// A loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute each `{{NAME}}` with its value, literally.
    ///
    /// Placeholders without a value are left untouched. Values are inserted
    /// verbatim and are not themselves scanned for placeholders.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &after[..end];
            match vars.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&rest[start..start + 2 + end + 2]),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        out
    }
}

/// Templates read from a directory of `<name>.txt` files.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read a template by name. A missing file is an error.
    pub fn load(&self, name: &str) -> Result<PromptTemplate> {
        let path = self.dir.join(format!("{name}.txt"));
        match fs::read_to_string(&path) {
            Ok(text) => Ok(PromptTemplate::new(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(NarrativeError::TemplateMissing { path })
            }
            Err(err) => Err(err.into()),
        }
    }
}
