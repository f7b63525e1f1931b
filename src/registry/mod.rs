//! Schema registry: the declarative description of every snapshot table.
//!
//! A single TOML file declares, per table, the typed columns the normalizer
//! should coerce plus the semantic bindings (which column carries the company
//! name, the contact email, and so on) the later stages key on. Loading
//! validates the registry up front so a typo fails the run before any data
//! is touched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::common::constants::{
    COMPANIES_TABLE, CONTACTS_TABLE, DEALS_TABLE, DEFAULT_CAD_TO_USD, PARTICIPANTS_TABLE,
};
use crate::domain::EntityKind;
use crate::error::{PipelineError, Result};

/// How hard the normalizer pushes back on bad cells.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Lenient,
    Strict,
}

/// Declared type of a snapshot column.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Bool,
}

/// What to do with cells that are textually empty after cleaning.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Collapse empty text and the recognized null spellings to absent
    #[default]
    Unify,
    /// Keep an empty string as a present value
    PreserveEmpty,
}

/// Text cleaning style applied before type coercion.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CleanStyle {
    /// Trim and collapse internal whitespace
    #[default]
    Standard,
    /// Strip a leading dash, turn inner dashes into comma separators
    DashList,
    /// Keep digits only
    Phone,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ColumnSpec {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub null_policy: NullPolicy,
    #[serde(default)]
    pub clean: CleanStyle,
    /// Marks a money column for the financial scrub pass
    #[serde(default)]
    pub financial: bool,
    /// Per-column date format override (strftime patterns, tried in order)
    #[serde(default)]
    pub formats: Option<Vec<String>>,
}

/// Per-table schema: typed columns plus the semantic bindings later
/// stages resolve through. Bindings must name declared columns.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TableSchema {
    pub name_column: Option<String>,
    pub company_column: Option<String>,
    pub kind_column: Option<String>,
    pub email_column: Option<String>,
    pub phone_column: Option<String>,
    pub event_column: Option<String>,
    #[serde(default)]
    pub columns: HashMap<String, ColumnSpec>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.get(name)
    }

    fn bindings(&self) -> impl Iterator<Item = (&'static str, &String)> {
        [
            ("name_column", self.name_column.as_ref()),
            ("company_column", self.company_column.as_ref()),
            ("kind_column", self.kind_column.as_ref()),
            ("email_column", self.email_column.as_ref()),
            ("phone_column", self.phone_column.as_ref()),
            ("event_column", self.event_column.as_ref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default = "default_cad_to_usd")]
    pub cad_to_usd: f64,
}

fn default_cad_to_usd() -> f64 {
    DEFAULT_CAD_TO_USD
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            cad_to_usd: DEFAULT_CAD_TO_USD,
        }
    }
}

/// Optional per-kind overrides for surrogate identifier minting.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default)]
pub struct IdPolicy {
    pub offset: Option<u64>,
    pub cap: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct IdOverrides {
    pub deal: Option<IdPolicy>,
    pub company: Option<IdPolicy>,
    pub contact: Option<IdPolicy>,
    pub participant: Option<IdPolicy>,
}

impl IdOverrides {
    pub fn for_kind(&self, kind: EntityKind) -> IdPolicy {
        let policy = match kind {
            EntityKind::Deal => self.deal,
            EntityKind::Company => self.company,
            EntityKind::Contact => self.contact,
            EntityKind::Participant => self.participant,
        };
        policy.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ReconcileConfig {
    /// Exact normalized-name fallback for email-less participants.
    /// Off by default: names collide too easily to trust unconditionally.
    #[serde(default)]
    pub name_fallback: bool,
}

/// The full registry for one pipeline run.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SchemaRegistry {
    #[serde(default)]
    pub run: Option<RunConfig>,
    #[serde(default)]
    pub ids: IdOverrides,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    /// Load and validate a registry from a TOML file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Registry(format!(
                "failed to read registry file {}: {}",
                path.display(),
                e
            ))
        })?;
        let registry: SchemaRegistry = toml::from_str(&content)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Structural checks beyond what deserialization enforces
    pub fn validate(&self) -> Result<()> {
        let known = [
            DEALS_TABLE,
            COMPANIES_TABLE,
            CONTACTS_TABLE,
            PARTICIPANTS_TABLE,
        ];
        for (table_name, schema) in &self.tables {
            if !known.contains(&table_name.as_str()) {
                return Err(PipelineError::Registry(format!(
                    "unknown table '{}' (expected one of: {})",
                    table_name,
                    known.join(", ")
                )));
            }
            for (label, column) in schema.bindings() {
                if !schema.columns.contains_key(column) {
                    return Err(PipelineError::Registry(format!(
                        "table '{}': {} = '{}' does not name a declared column",
                        table_name, label, column
                    )));
                }
            }
            for (column, spec) in &schema.columns {
                if let Some(formats) = &spec.formats {
                    if formats.is_empty() {
                        return Err(PipelineError::Registry(format!(
                            "table '{}' column '{}': formats list is empty",
                            table_name, column
                        )));
                    }
                    if spec.column_type != ColumnType::Date {
                        return Err(PipelineError::Registry(format!(
                            "table '{}' column '{}': formats only apply to date columns",
                            table_name, column
                        )));
                    }
                }
            }
        }
        let run = self.run_config();
        if !(run.cad_to_usd > 0.0) {
            return Err(PipelineError::Registry(format!(
                "run.cad_to_usd must be positive, got {}",
                run.cad_to_usd
            )));
        }
        Ok(())
    }

    pub fn run_config(&self) -> RunConfig {
        self.run.clone().unwrap_or_default()
    }

    pub fn is_strict(&self) -> bool {
        self.run_config().mode == RunMode::Strict
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> &'static str {
        r#"
            [run]
            mode = "strict"
            cad_to_usd = 0.75

            [ids]
            contact = { offset = 100 }

            [reconcile]
            name_fallback = true

            [tables.deals]
            name_column = "Deal Name"
            company_column = "Platform Company"
            [tables.deals.columns."Deal Name"]
            type = "text"
            [tables.deals.columns."Platform Company"]
            type = "text"
            [tables.deals.columns."Close Date"]
            type = "date"
            formats = ["%m/%d/%Y"]
            [tables.deals.columns."LTM EBITDA"]
            type = "number"
            financial = true
        "#
    }

    #[test]
    fn parses_full_registry() {
        let registry: SchemaRegistry = toml::from_str(sample_registry()).unwrap();
        registry.validate().unwrap();

        assert!(registry.is_strict());
        assert_eq!(registry.run_config().cad_to_usd, 0.75);
        assert_eq!(
            registry.ids.for_kind(EntityKind::Contact).offset,
            Some(100)
        );
        assert!(registry.reconcile.name_fallback);

        let deals = registry.table(DEALS_TABLE).unwrap();
        assert_eq!(deals.name_column.as_deref(), Some("Deal Name"));
        let spec = deals.column("LTM EBITDA").unwrap();
        assert_eq!(spec.column_type, ColumnType::Number);
        assert!(spec.financial);
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let registry: SchemaRegistry = toml::from_str("").unwrap();
        registry.validate().unwrap();

        assert!(!registry.is_strict());
        assert_eq!(registry.run_config().cad_to_usd, DEFAULT_CAD_TO_USD);
        assert!(registry.ids.for_kind(EntityKind::Deal).offset.is_none());
        assert!(!registry.reconcile.name_fallback);
    }

    #[test]
    fn rejects_unknown_table() {
        let registry: SchemaRegistry = toml::from_str(
            r#"
            [tables.daels.columns."Deal Name"]
            type = "text"
        "#,
        )
        .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("unknown table 'daels'"));
    }

    #[test]
    fn rejects_binding_to_undeclared_column() {
        let registry: SchemaRegistry = toml::from_str(
            r#"
            [tables.contacts]
            email_column = "Email"
            [tables.contacts.columns."Full Name"]
            type = "text"
        "#,
        )
        .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("email_column"));
    }

    #[test]
    fn rejects_unknown_column_type() {
        let parsed: std::result::Result<SchemaRegistry, _> = toml::from_str(
            r#"
            [tables.deals.columns."Deal Name"]
            type = "varchar"
        "#,
        );
        assert!(parsed.is_err());
    }
}
