use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use redcap_cli::pipeline::RunReport;
use redcap_map::{LintFinding, MappingSet};

pub fn print_run_summary(report: &RunReport) {
    println!("Export: {}", report.extraction_path.display());
    println!("Mappings: {}", report.mapping_path.display());
    if report.dry_run {
        println!("Output: none (dry run)");
    } else {
        println!("Output: {}", report.data_path.display());
    }
    if let Some(path) = &report.summary_path {
        println!("Run summary: {}", path.display());
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Emitted"),
        header_cell("NOT NULL"),
        header_cell("DROP"),
        header_cell("Empty"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for name in &report.tables {
        let stats = report.stats.tables.get(name).copied().unwrap_or_default();
        table.add_row(vec![
            Cell::new(name).fg(Color::Blue).add_attribute(Attribute::Bold),
            count_cell(stats.emitted, Color::Green),
            count_cell(stats.not_null_discarded, Color::Yellow),
            count_cell(stats.drop_discarded, Color::Yellow),
            dim_cell(stats.empty_discarded),
        ]);
    }
    let totals = report.stats.totals();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(totals.emitted).add_attribute(Attribute::Bold),
        count_cell(totals.not_null_discarded, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(totals.drop_discarded, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell(totals.empty_discarded).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    let mut run = Table::new();
    run.set_header(vec![header_cell("Run"), header_cell("Count")]);
    apply_summary_table_style(&mut run);
    align_column(&mut run, 1, CellAlignment::Right);
    let rows = [
        ("Patients", report.patients.len(), None),
        ("Failed patients", report.failures(), Some(Color::Red)),
        ("Statements", report.statements(), None),
        ("Lookup misses", report.stats.lookup_misses, Some(Color::Yellow)),
        ("LIST misses", report.stats.list_misses, Some(Color::Yellow)),
        ("Malformed expressions", report.stats.malformed_expressions, Some(Color::Red)),
        ("Skipped tables", report.stats.skipped_tables, Some(Color::Yellow)),
        ("Mapping findings", report.lint_findings, Some(Color::Yellow)),
    ];
    for (label, count, color) in rows {
        let cell = match color {
            Some(color) => count_cell(count, color),
            None => Cell::new(count),
        };
        run.add_row(vec![Cell::new(label), cell]);
    }
    println!("{run}");

    if report.has_failures() {
        eprintln!("Failed patients:");
        for patient in report.patients.iter().filter(|patient| patient.failed()) {
            eprintln!(
                "- {}: {}",
                patient.patient_id,
                patient.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

pub fn print_check(mappings: &MappingSet) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Attribute"),
        header_cell("NotNull"),
        header_cell("Form"),
        header_cell("Expression"),
        header_cell("Fields"),
        header_cell("Finding"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for compiled in mappings.tables() {
        for rule in &compiled.rules {
            let findings: Vec<&LintFinding> = mappings
                .findings()
                .iter()
                .filter(|finding| {
                    finding.table == compiled.table && finding.attribute == rule.rule.attribute
                })
                .collect();
            let form = rule
                .expr
                .as_ref()
                .map_or("-", |expr| expr.form().map_or("INVALID", |form| form.as_str()));
            let fields = rule
                .expr
                .as_ref()
                .map(|expr| expr.referenced_fields().into_iter().collect::<Vec<_>>().join(", "))
                .filter(|fields| !fields.is_empty());
            table.add_row(vec![
                Cell::new(&compiled.table).fg(Color::Blue),
                Cell::new(&rule.rule.attribute),
                if rule.rule.not_null {
                    Cell::new("✓").fg(Color::Green)
                } else {
                    dim_cell("-")
                },
                Cell::new(form),
                rule.rule
                    .expression
                    .as_deref()
                    .map_or_else(|| dim_cell("-"), Cell::new),
                fields.map_or_else(|| dim_cell("-"), Cell::new),
                finding_cell(&findings),
            ]);
        }
    }
    println!("{table}");
    println!(
        "{} tables, {} findings",
        mappings.len(),
        mappings.findings().len()
    );
}

fn finding_cell(findings: &[&LintFinding]) -> Cell {
    if findings.is_empty() {
        return dim_cell("-");
    }
    let text = findings
        .iter()
        .map(|finding| finding.problem.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Cell::new(text).fg(Color::Yellow)
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
