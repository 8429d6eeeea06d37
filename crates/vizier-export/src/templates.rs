//! Output templates.
//!
//! Two templates exist: `basic` renders just the cells, `full` wraps that in
//! a standalone page with styles and scripts. Both can be replaced by
//! pointing [`TemplateSet::from_dir`] at a directory holding `basic.html`
//! and `full.html`.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use minijinja::Environment;
use serde::Serialize;
use vizier_core::Error;

use crate::error::ExportResult;

const BASIC_TEMPLATE: &str = include_str!("../templates/basic.html");
const FULL_TEMPLATE: &str = include_str!("../templates/full.html");

/// Which template to render with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Cells only, no CSS or JavaScript.
    Basic,
    /// Standalone HTML page.
    #[default]
    Full,
}

impl TemplateKind {
    /// All template kinds.
    pub const ALL: [TemplateKind; 2] = [TemplateKind::Basic, TemplateKind::Full];

    /// Name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Full => "full",
        }
    }

    /// File the template is loaded from.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Basic => "basic.html",
            Self::Full => "full.html",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TemplateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "full" => Ok(Self::Full),
            other => Err(Error::TemplateNotFound(other.to_string())),
        }
    }
}

/// A loaded pair of templates.
pub struct TemplateSet {
    env: Environment<'static>,
}

impl TemplateSet {
    /// Templates compiled into the binary.
    pub fn builtin() -> ExportResult<Self> {
        let mut env = Self::environment();
        env.add_template(TemplateKind::Basic.file_name(), BASIC_TEMPLATE)?;
        env.add_template(TemplateKind::Full.file_name(), FULL_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Load `basic.html` and `full.html` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> ExportResult<Self> {
        let dir = dir.as_ref();
        let mut env = Self::environment();

        for kind in TemplateKind::ALL {
            let path = dir.join(kind.file_name());
            let source = fs::read_to_string(&path).map_err(|e| {
                tracing::debug!("Failed to read template {}: {}", path.display(), e);
                Error::TemplateNotFound(path.display().to_string())
            })?;
            env.add_template_owned(kind.file_name(), source)?;
        }

        tracing::info!("Loaded templates from {}", dir.display());
        Ok(Self { env })
    }

    /// Render `kind` with `context`.
    pub fn render(&self, kind: TemplateKind, context: impl Serialize) -> ExportResult<String> {
        let template = self.env.get_template(kind.file_name())?;
        Ok(template.render(context)?)
    }

    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env
    }
}

impl fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSet").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_template_kind() {
        assert_eq!("basic".parse::<TemplateKind>().unwrap(), TemplateKind::Basic);
        assert_eq!("Full".parse::<TemplateKind>().unwrap(), TemplateKind::Full);
        assert_eq!(TemplateKind::default(), TemplateKind::Full);
        assert_eq!(TemplateKind::Basic.to_string(), "basic");
    }

    #[test]
    fn test_unknown_template_kind() {
        let err = "fancy".parse::<TemplateKind>().unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(ref name) if name == "fancy"));
    }

    #[test]
    fn test_builtin_renders() {
        let templates = TemplateSet::builtin().unwrap();
        let context = serde_json::json!({"title": "t", "cells": []});

        let basic = templates.render(TemplateKind::Basic, &context).unwrap();
        assert!(basic.contains("vizier-document"));
        assert!(!basic.contains("<html>"));

        let full = templates.render(TemplateKind::Full, &context).unwrap();
        assert!(full.starts_with("<!DOCTYPE html>"));
        assert!(full.contains("<style"));
        assert!(full.contains("vizier-document"));
    }

    #[test]
    fn test_from_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("basic.html"), "cells={{ cells|length }}").unwrap();
        fs::write(temp.path().join("full.html"), "<page>{% include \"basic.html\" %}</page>").unwrap();

        let templates = TemplateSet::from_dir(temp.path()).unwrap();
        let context = serde_json::json!({"cells": [1, 2]});
        assert_eq!(templates.render(TemplateKind::Full, &context).unwrap(), "<page>cells=2</page>");
    }

    #[test]
    fn test_from_dir_missing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("basic.html"), "only basic").unwrap();

        let err = TemplateSet::from_dir(temp.path()).unwrap_err();
        assert!(err.is_not_found());
    }
}
