//! End-to-end runs over a snapshot directory on disk.

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use dealbook::domain::{CellValue, ContactId, DealId};
use dealbook::pipeline::{PipelineRunner, Snapshot};
use dealbook::registry::SchemaRegistry;
use dealbook::PipelineError;

const SCHEMA: &str = r#"
[run]
mode = "lenient"
cad_to_usd = 0.73

[tables.deals]
name_column = "Deal Name"
company_column = "Company"
[tables.deals.columns."Deal Name"]
type = "text"
[tables.deals.columns."Company"]
type = "text"
[tables.deals.columns."Close Date"]
type = "date"
[tables.deals.columns."LTM EBITDA"]
type = "number"
financial = true
[tables.deals.columns."LTM Revenue"]
type = "number"
financial = true
[tables.deals.columns."EBITDA 2020"]
type = "number"
[tables.deals.columns."EBITDA 2021"]
type = "number"

[tables.companies]
name_column = "Company Name"
kind_column = "Type"
[tables.companies.columns."Company Name"]
type = "text"
[tables.companies.columns."Type"]
type = "text"

[tables.contacts]
name_column = "Name"
email_column = "Email"
phone_column = "Phone"
[tables.contacts.columns."Name"]
type = "text"
[tables.contacts.columns."Email"]
type = "text"
[tables.contacts.columns."Phone"]
type = "text"
clean = "phone"

[tables.participants]
name_column = "Name"
email_column = "Email"
event_column = "Event"
[tables.participants.columns."Name"]
type = "text"
[tables.participants.columns."Email"]
type = "text"
[tables.participants.columns."Event"]
type = "text"
"#;

fn write_snapshot(dir: &Path, table: &str, rows: serde_json::Value) {
    fs::write(dir.join(format!("{}.json", table)), rows.to_string()).unwrap();
}

fn registry() -> SchemaRegistry {
    let registry: SchemaRegistry = toml::from_str(SCHEMA).unwrap();
    registry.validate().unwrap();
    registry
}

fn full_snapshot(dir: &Path) {
    write_snapshot(
        dir,
        "deals",
        json!([
            {
                "Deal Name": "Project Alpine",
                "Company": "Borealis Industries",
                "Close Date": "2024-03-01",
                "LTM EBITDA": "1,200 LTM CAD",
                "EBITDA 2020": 100.0,
                "EBITDA 2021": "N/A"
            },
            {
                "Deal Name": " Project  Juniper ",
                "Company": "Northwind Logistics",
                "Close Date": "Jan-24",
                "EBITDA 2020": "250"
            }
        ]),
    );
    write_snapshot(
        dir,
        "companies",
        json!([
            { "Company Name": "Borealis Industries", "Type": "Target" },
            { "Company Name": "  borealis   industries", "Type": "Target" },
            { "Company Name": "Acme Capital", "Type": "PE Firm" }
        ]),
    );
    write_snapshot(
        dir,
        "contacts",
        json!([
            { "Contact_ID": 1, "Name": "Ada Fuller", "Email": "a@x.com", "Phone": "(555) 010-0100" }
        ]),
    );
    write_snapshot(
        dir,
        "participants",
        json!([
            { "Name": "A", "Email": "A@X.com", "Event": "Capital Summit" },
            { "Name": "B", "Email": "b@x.com", "Event": "Capital Summit" }
        ]),
    );
}

#[test]
fn full_snapshot_produces_linked_tables() {
    let dir = TempDir::new().unwrap();
    full_snapshot(dir.path());

    let snapshot = Snapshot::load_from_dir(dir.path()).unwrap();
    assert_eq!(snapshot.total_records(), 8);

    let output = PipelineRunner::new(registry()).run(&snapshot).unwrap();
    let tables = &output.tables;

    // Companies: the duplicate spelling collapses, the deal-only company
    // is minted after the batch
    assert_eq!(tables.companies.len(), 3);
    assert_eq!(tables.companies[0].name, "Borealis Industries");
    assert_eq!(tables.companies[2].name, "Northwind Logistics");

    // Deals link to resolved companies and keep cleaned names
    assert_eq!(tables.deals.len(), 2);
    assert_eq!(tables.deals[0].deal_id, DealId(1));
    assert_eq!(tables.deals[0].company_id, Some(tables.companies[0].company_id));
    assert_eq!(tables.deals[1].name.as_deref(), Some("Project Juniper"));
    assert_eq!(
        tables.deals[1].company_id,
        Some(tables.companies[2].company_id)
    );

    // The CAD money cell lands converted on the LTM EBITDA column
    let scrubbed = tables.deals[0]
        .attributes
        .get("LTM EBITDA")
        .and_then(CellValue::as_number)
        .unwrap();
    assert!((scrubbed - 876.0).abs() < 1e-9);

    // Sparse metric split: one row for 2020, none for the absent 2021
    let alpine_metrics: Vec<_> = tables
        .financial_metrics
        .iter()
        .filter(|m| m.deal_id == DealId(1))
        .collect();
    assert_eq!(alpine_metrics.len(), 1);
    assert_eq!(alpine_metrics[0].period, 2020);
    assert_eq!(alpine_metrics[0].metric, "EBITDA");
    assert_eq!(alpine_metrics[0].value, Some(100.0));
    assert!(tables.deals[0].attributes.get("EBITDA 2020").is_none());

    // Reconciliation: case-insensitive match reuses contact 1, the
    // unknown email mints contact 2
    assert_eq!(tables.contacts.len(), 2);
    assert_eq!(tables.participants[0].contact_id, ContactId(1));
    assert_eq!(tables.participants[1].contact_id, ContactId(2));
    assert_eq!(tables.contacts[1].email.as_deref(), Some("b@x.com"));

    // The supplied phone was cleaned to digits
    assert_eq!(tables.contacts[0].phone.as_deref(), Some("5550100100"));
}

#[test]
fn reruns_assign_identical_ids() {
    let dir = TempDir::new().unwrap();
    full_snapshot(dir.path());
    let snapshot = Snapshot::load_from_dir(dir.path()).unwrap();

    let first = PipelineRunner::new(registry()).run(&snapshot).unwrap();
    let second = PipelineRunner::new(registry()).run(&snapshot).unwrap();

    let ids = |output: &dealbook::pipeline::PipelineOutput| {
        output
            .tables
            .participants
            .iter()
            .map(|p| (p.participant_id, p.contact_id))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn strict_mode_rejects_unparsable_cells() {
    let dir = TempDir::new().unwrap();
    write_snapshot(
        dir.path(),
        "deals",
        json!([
            {
                "Deal Name": "Project Alpine",
                "Company": "Borealis Industries",
                "Close Date": "sometime next year"
            }
        ]),
    );

    let schema = SCHEMA.replace("mode = \"lenient\"", "mode = \"strict\"");
    let registry: SchemaRegistry = toml::from_str(&schema).unwrap();
    let snapshot = Snapshot::load_from_dir(dir.path()).unwrap();

    let err = PipelineRunner::new(registry).run(&snapshot).unwrap_err();
    match err {
        PipelineError::TypeCoercion { column, value, .. } => {
            assert_eq!(column, "Close Date");
            assert_eq!(value, "sometime next year");
        }
        other => panic!("expected TypeCoercion, got {:?}", other),
    }
}

#[test]
fn lenient_mode_records_the_fallback_instead() {
    let dir = TempDir::new().unwrap();
    write_snapshot(
        dir.path(),
        "deals",
        json!([
            {
                "Deal Name": "Project Alpine",
                "Company": "Borealis Industries",
                "Close Date": "sometime next year"
            }
        ]),
    );

    let snapshot = Snapshot::load_from_dir(dir.path()).unwrap();
    let output = PipelineRunner::new(registry()).run(&snapshot).unwrap();

    assert!(output.tables.deals[0]
        .attributes
        .get("Close Date")
        .is_some_and(CellValue::is_absent));
    assert_eq!(output.audit.len(), 1 + 1); // fallback + company minted from deal
}

#[test]
fn conflicting_master_identities_fail_the_run() {
    let dir = TempDir::new().unwrap();
    write_snapshot(
        dir.path(),
        "contacts",
        json!([
            { "Contact_ID": 1, "Name": "A", "Email": "a@x.com" },
            { "Contact_ID": 9, "Name": "A again", "Email": "A@X.COM" }
        ]),
    );

    let snapshot = Snapshot::load_from_dir(dir.path()).unwrap();
    let err = PipelineRunner::new(registry()).run(&snapshot).unwrap_err();

    match err {
        PipelineError::DuplicateIdentity { clusters } => {
            assert_eq!(clusters.len(), 1);
            assert_eq!(clusters[0].email, "a@x.com");
            assert_eq!(clusters[0].contact_ids, vec![ContactId(1), ContactId(9)]);
        }
        other => panic!("expected DuplicateIdentity, got {:?}", other),
    }
}

#[test]
fn missing_tables_are_tolerated_but_an_empty_snapshot_is_not() {
    let dir = TempDir::new().unwrap();
    write_snapshot(
        dir.path(),
        "contacts",
        json!([{ "Name": "A", "Email": "a@x.com" }]),
    );

    let snapshot = Snapshot::load_from_dir(dir.path()).unwrap();
    let output = PipelineRunner::new(registry()).run(&snapshot).unwrap();
    assert!(output.tables.deals.is_empty());
    assert_eq!(output.tables.contacts.len(), 1);

    let empty = TempDir::new().unwrap();
    assert!(Snapshot::load_from_dir(empty.path()).is_err());
}
