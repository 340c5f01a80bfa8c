use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use fieldmap_map::RunDiagnostics;
use fieldmap_model::{MappingReport, MappingRule, Strategy};

pub fn print_report(report: &MappingReport, diagnostics: &RunDiagnostics) {
    println!(
        "Source fields: {}  Target fields: {}  Mapped: {}  Accuracy: {:.1}%",
        report.total_source_fields,
        report.total_target_fields,
        report.mapped_count,
        report.accuracy * 100.0
    );
    if !diagnostics.store_available {
        println!("Rule store unavailable; built-in vocabulary only.");
    }
    if diagnostics.ai_invoked {
        println!("AI fallback accepted {} mapping(s).", diagnostics.ai_accepted);
    }

    println!("{}", strategy_table(report));

    if !report.mappings.is_empty() {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Source"),
            header_cell("Target"),
            header_cell("Strategy"),
            header_cell("Confidence"),
        ]);
        apply_table_style(&mut table);
        align_column(&mut table, 3, CellAlignment::Right);
        for mapping in &report.mappings {
            table.add_row(vec![
                Cell::new(&mapping.source_path),
                Cell::new(&mapping.target_path).fg(Color::Blue),
                strategy_cell(mapping.strategy),
                Cell::new(format!("{:.2}", mapping.confidence)),
            ]);
        }
        println!("{table}");
    }

    print_unmapped("Unmapped source fields", &report.unmapped_source);
    print_unmapped("Unfilled targets", &report.unmapped_target);
}

fn strategy_table(report: &MappingReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Strategy"), header_cell("Mappings")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for strategy in Strategy::ALL {
        let count = report.count_for(strategy);
        let cell = if count == 0 {
            dim_cell(count)
        } else {
            Cell::new(count)
        };
        table.add_row(vec![strategy_cell(strategy), cell]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(report.mapped_count).add_attribute(Attribute::Bold),
    ]);
    table
}

fn print_unmapped(label: &str, paths: &[String]) {
    if paths.is_empty() {
        return;
    }
    println!("{label} ({}):", paths.len());
    for path in paths {
        println!("  - {path}");
    }
}

pub fn print_rules(rules: &[MappingRule]) {
    if rules.is_empty() {
        println!("No rules stored.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Strategy"),
        header_cell("Source"),
        header_cell("Target"),
        header_cell("Priority"),
        header_cell("Confidence"),
        header_cell("Active"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Center);
    for rule in rules {
        let active = if rule.is_active {
            Cell::new("yes").fg(Color::Green)
        } else {
            dim_cell("no")
        };
        table.add_row(vec![
            strategy_cell(rule.strategy()),
            Cell::new(rule.kind.source()),
            Cell::new(rule.kind.target()),
            Cell::new(rule.priority),
            Cell::new(format!("{:.2}", rule.confidence)),
            active,
        ]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn strategy_cell(strategy: Strategy) -> Cell {
    let color = match strategy {
        Strategy::Exact => Color::Green,
        Strategy::Pattern => Color::Cyan,
        Strategy::Context => Color::Blue,
        Strategy::Semantic => Color::Yellow,
        Strategy::Ai => Color::Magenta,
    };
    Cell::new(strategy).fg(color)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
