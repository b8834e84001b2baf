//! Draft files
//!
//! A saved wizard session, in YAML or JSON. A file names either a new
//! `program` or the `program_id` of an existing one:
//!
//! ```yaml
//! program:
//!   name: Literacy 2025
//!   year: 2025
//!   status: active
//!   budget: 12000
//! activities:
//!   - name: Outreach
//!     start_date: 2025-02-01
//!     end_date: 2025-05-31
//!     budget: 3000
//!     status: not_started
//!     tasks:
//!       - name: Flyers
//! ```
//!
//! Scalars are read as text, exactly as a wizard form would hold them, so
//! `year: 2025` and `year: "2025"` are the same.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use wp_model::ProgramId;
use wp_provision::{ActivityForm, DraftTreeBuilder, ProgramForm};

/// On-disk encoding of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftFormat {
    Yaml,
    Json,
}

impl DraftFormat {
    /// Pick the format from a file extension; anything but `.json` is YAML
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Saved wizard session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftFile {
    pub program: Option<ProgramForm>,
    pub program_id: Option<ProgramId>,
    pub activities: Vec<ActivityForm>,
}

impl DraftFile {
    /// Read a draft file
    ///
    /// # Errors
    /// Fails if the file cannot be read or decoded
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading draft {}", path.display()))?;
        Self::parse(&text, DraftFormat::from_path(path))
            .with_context(|| format!("decoding draft {}", path.display()))
    }

    /// Decode draft text
    ///
    /// # Errors
    /// Fails on malformed YAML/JSON or fields of the wrong shape
    pub fn parse(text: &str, format: DraftFormat) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: Value = match format {
            DraftFormat::Yaml => serde_yaml::from_str(text)?,
            DraftFormat::Json => serde_json::from_str(text)?,
        };
        if raw.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(scalars_as_text(raw))?)
    }

    /// Start a builder session from this file
    ///
    /// # Errors
    /// Fails unless exactly one of `program` and `program_id` is present
    pub fn into_builder(self) -> anyhow::Result<DraftTreeBuilder> {
        let builder = match (self.program, self.program_id) {
            (Some(program), None) => DraftTreeBuilder::program_wizard().with_program(program),
            (None, Some(program_id)) => DraftTreeBuilder::workplan_wizard(program_id),
            (Some(_), Some(_)) => anyhow::bail!("draft names both a new program and program_id"),
            (None, None) => anyhow::bail!("draft needs either a program or a program_id"),
        };
        Ok(self
            .activities
            .into_iter()
            .fold(builder, DraftTreeBuilder::push_activity))
    }
}

/// Turn numbers and booleans into strings, leaving structure intact
fn scalars_as_text(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(scalars_as_text).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, scalars_as_text(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wp_provision::Stage;

    const YAML: &str = r"
program:
  name: Literacy 2025
  year: 2025
  status: active
  budget: 12000.5
  visibility: true
activities:
  - name: Outreach
    start_date: 2025-02-01
    end_date: 2025-05-31
    budget: 3000
    status: in progress
    progress: 40
    tasks:
      - name: Flyers
        target: 500
      - name: Visits
";

    #[test]
    fn yaml_numbers_become_form_text() {
        let file = DraftFile::parse(YAML, DraftFormat::Yaml).unwrap();
        let program = file.program.as_ref().unwrap();
        assert_eq!(program.year, "2025");
        assert_eq!(program.budget, "12000.5");
        assert_eq!(program.visibility, "true");
        assert_eq!(file.activities[0].tasks[0].target, "500");
        assert_eq!(file.activities[0].tasks.len(), 2);
    }

    #[test]
    fn parsed_file_finalizes() {
        let builder = DraftFile::parse(YAML, DraftFormat::Yaml)
            .unwrap()
            .into_builder()
            .unwrap();
        assert_eq!(builder.current_stage(), Stage::Review);
        let tree = builder.finalize().unwrap();
        assert_eq!(tree.counts().tasks, 2);
    }

    #[test]
    fn json_workplan_draft() {
        let id = ProgramId::new();
        let text = format!(
            r#"{{"program_id": "{id}", "activities": [{{"name": "Training", "start_date": "2025-06-01",
                "end_date": "2025-06-30", "budget": 800, "status": "not_started"}}]}}"#
        );
        let builder = DraftFile::parse(&text, DraftFormat::Json)
            .unwrap()
            .into_builder()
            .unwrap();
        assert!(builder.program().is_none());
        assert!(builder.is_stage_complete(Stage::Review));
    }

    #[test]
    fn draft_must_name_exactly_one_root() {
        let neither = DraftFile::default().into_builder().unwrap_err();
        assert!(neither.to_string().contains("either"));

        let both = DraftFile {
            program: Some(ProgramForm::default()),
            program_id: Some(ProgramId::new()),
            activities: Vec::new(),
        };
        assert!(both.into_builder().is_err());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(DraftFormat::from_path(Path::new("d.JSON")), DraftFormat::Json);
        assert_eq!(DraftFormat::from_path(Path::new("d.yml")), DraftFormat::Yaml);
    }

    #[test]
    fn empty_file_is_empty_draft() {
        assert_eq!(DraftFile::parse("", DraftFormat::Yaml).unwrap(), DraftFile::default());
    }
}
