//! Form Field CLI
//!
//! Batch filling of a template PDF from a JSON list of records, plus the
//! field-adding and field-listing operations for scripted use.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use formfield_core::{
    add_fields, fill_fields, list_fields, parse_field_definitions, parse_fill_map, FieldOutcome,
    FieldReport, FillMap,
};
use serde_json::Value;
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "formfield")]
#[command(version, about = "Fill PDF form fields and add new fillable fields")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill a template once per record and write one PDF per record
    Fill {
        /// Template PDF with text fields
        #[arg(long)]
        template: PathBuf,

        /// JSON file holding an array of records (field name -> value)
        #[arg(long)]
        data: PathBuf,

        /// Directory for the filled PDFs
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Record key used to name each output file
        #[arg(long, default_value = "name")]
        name_key: String,
    },

    /// Add text fields described by a JSON array of field definitions
    AddFields {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        fields: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Print the form fields of a PDF as JSON
    ListFields {
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // stdout carries list-fields output, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Fill {
            template,
            data,
            output_dir,
            name_key,
        } => run_fill(&template, &data, &output_dir, &name_key).map(|_| ()),
        Command::AddFields {
            input,
            fields,
            output,
        } => run_add_fields(&input, &fields, &output),
        Command::ListFields { input } => run_list_fields(&input),
    }
}

/// Fill `template` once per record; returns the written paths in record order.
fn run_fill(
    template: &Path,
    data: &Path,
    output_dir: &Path,
    name_key: &str,
) -> Result<Vec<PathBuf>> {
    let template_bytes = read_file(template)?;
    let records_json = fs::read_to_string(data)
        .with_context(|| format!("Failed to read records from {}", data.display()))?;
    let records = parse_records(&records_json)
        .with_context(|| format!("Invalid records in {}", data.display()))?;

    fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    info!(
        "Filling {} with {} record(s)",
        template.display(),
        records.len()
    );

    let mut written = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let path = output_dir.join(output_file_name(record, name_key, index));
        let (filled, report) = fill_fields(&template_bytes, record)
            .with_context(|| format!("Failed to fill record {}", index + 1))?;
        warn_skips(&report);

        fs::write(&path, filled)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(
            "Wrote {} ({} field(s) filled)",
            path.display(),
            report.applied
        );
        written.push(path);
    }

    Ok(written)
}

fn run_add_fields(input: &Path, fields: &Path, output: &Path) -> Result<()> {
    let pdf_bytes = read_file(input)?;
    let fields_json = fs::read_to_string(fields)
        .with_context(|| format!("Failed to read field definitions from {}", fields.display()))?;
    let definitions = parse_field_definitions(&fields_json)?;

    let (bytes, report) = add_fields(&pdf_bytes, &definitions)
        .with_context(|| format!("Failed to add fields to {}", input.display()))?;
    warn_skips(&report);

    fs::write(output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    info!(
        "Wrote {} ({} added, {} skipped)",
        output.display(),
        report.applied,
        report.skipped
    );
    Ok(())
}

fn run_list_fields(input: &Path) -> Result<()> {
    let pdf_bytes = read_file(input)?;
    let fields = list_fields(&pdf_bytes)
        .with_context(|| format!("Failed to read fields from {}", input.display()))?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn warn_skips(report: &FieldReport) {
    for outcome in &report.outcomes {
        if let FieldOutcome::Skipped { name, reason } = outcome {
            warn!("Skipped field '{}': {}", name, reason);
        }
    }
}

/// Parse a records file: an array of objects, or a single object.
fn parse_records(json: &str) -> Result<Vec<FillMap>> {
    let value: Value = serde_json::from_str(json).context("records are not valid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => bail!("records must be a JSON array of objects"),
    };

    if items.is_empty() {
        bail!("no records provided");
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                bail!("record {} is not a JSON object", index + 1);
            }
            parse_fill_map(&item.to_string())
                .with_context(|| format!("record {} is invalid", index + 1))
        })
        .collect()
}

/// `filled_form_<name>.pdf`, falling back to the 1-based record index
fn output_file_name(record: &FillMap, name_key: &str, index: usize) -> String {
    let stem = record
        .get(name_key)
        .map(|name| sanitize_file_stem(name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| (index + 1).to_string());
    format!("filled_form_{}.pdf", stem)
}

fn sanitize_file_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use formfield_core::fixtures::{blank_pdf, form_pdf, FixtureField};
    use pretty_assertions::assert_eq;

    fn record(pairs: &[(&str, &str)]) -> FillMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_output_name_from_record() {
        let r = record(&[("name", "Hansraj")]);
        assert_eq!(output_file_name(&r, "name", 0), "filled_form_Hansraj.pdf");
    }

    #[test]
    fn test_output_name_falls_back_to_index() {
        let r = record(&[("email", "a@example.com")]);
        assert_eq!(output_file_name(&r, "name", 2), "filled_form_3.pdf");

        let blank = record(&[("name", "   ")]);
        assert_eq!(output_file_name(&blank, "name", 0), "filled_form_1.pdf");
    }

    #[test]
    fn test_output_name_is_sanitized() {
        let r = record(&[("name", "../Jane Doe")]);
        assert_eq!(output_file_name(&r, "name", 0), "filled_form____Jane_Doe.pdf");
    }

    #[test]
    fn test_custom_name_key() {
        let r = record(&[("name", "Raju"), ("id", "42")]);
        assert_eq!(output_file_name(&r, "id", 0), "filled_form_42.pdf");
    }

    #[test]
    fn test_parse_records_array() {
        let records = parse_records(r#"[{"name": "Naman"}, {"name": "Mohan", "age": 30}]"#)
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("age").map(String::as_str), Some("30"));
    }

    #[test]
    fn test_parse_records_single_object() {
        let records = parse_records(r#"{"name": "Raju"}"#).unwrap();
        assert_eq!(records, vec![record(&[("name", "Raju")])]);
    }

    #[test]
    fn test_parse_records_rejects_bad_input() {
        assert!(parse_records("not json").is_err());
        assert!(parse_records("[]").is_err());
        assert!(parse_records("[1, 2]").is_err());
        assert!(parse_records("[{}]").is_err());
        assert!(parse_records("\"name\"").is_err());
    }

    #[test]
    fn test_run_fill_writes_one_file_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("form_template.pdf");
        let data = dir.path().join("people.json");
        let out = dir.path().join("out");

        fs::write(&template, form_pdf(&[FixtureField::text("name", 0)])).unwrap();
        fs::write(&data, r#"[{"name": "Hansraj"}, {"name": "Naman"}, {"other": "x"}]"#).unwrap();

        let written = run_fill(&template, &data, &out, "name").unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "filled_form_Hansraj.pdf",
                "filled_form_Naman.pdf",
                "filled_form_3.pdf"
            ]
        );

        let fields = list_fields(&fs::read(&written[0]).unwrap()).unwrap();
        assert_eq!(fields[0].value.as_deref(), Some("Hansraj"));
    }

    #[test]
    fn test_run_fill_rejects_non_pdf_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.pdf");
        let data = dir.path().join("people.json");
        fs::write(&template, b"plain text").unwrap();
        fs::write(&data, r#"[{"name": "Raju"}]"#).unwrap();

        assert!(run_fill(&template, &data, dir.path(), "name").is_err());
    }

    #[test]
    fn test_run_add_fields_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("blank.pdf");
        let fields = dir.path().join("fields.json");
        let output = dir.path().join("with_fields.pdf");

        fs::write(&input, blank_pdf(1)).unwrap();
        fs::write(
            &fields,
            r#"[{"pageIndex": 0, "fieldName": "signature", "x": 50, "y": 60, "width": 200, "height": 24}]"#,
        )
        .unwrap();

        run_add_fields(&input, &fields, &output).unwrap();

        let listed = list_fields(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "signature");
    }
}
