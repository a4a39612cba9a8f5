//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use osup_types::{FetchReport, InstallReport};
use serde::Serialize;
use std::io;

/// What a command produced
#[derive(Debug, Default, Serialize)]
pub struct CommandOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallReport>,
}

/// Output renderer for CLI results
#[derive(Clone, Copy)]
pub struct OutputRenderer {
    json_output: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    pub fn render(&self, output: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(output).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        if let Some(report) = &output.fetch {
            println!("{}", fetch_table(report));
        }
        if let Some(report) = &output.install {
            println!("{}", install_table(report));
        }
        Ok(())
    }
}

fn new_table(header: [&str; 2]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
    table
}

fn count_cell(count: usize, bad: bool) -> Cell {
    let cell = Cell::new(count);
    if bad && count > 0 {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

fn fetch_table(report: &FetchReport) -> Table {
    let mut table = new_table(["Packs", "Count"]);
    table.add_row(vec![Cell::new("requested"), count_cell(report.requested, false)]);
    table.add_row(vec![
        Cell::new("extracted"),
        count_cell(report.extracted.len(), false),
    ]);
    table.add_row(vec![Cell::new("missing"), count_cell(report.missing.len(), false)]);
    table.add_row(vec![Cell::new("failed"), count_cell(report.failed.len(), true)]);
    if let Some(bytes) = report.total_bytes {
        table.add_row(vec![Cell::new("bytes"), Cell::new(bytes)]);
    }
    for failed in &report.failed {
        table.add_row(vec![
            Cell::new(&failed.bundle).fg(Color::Red),
            Cell::new(&failed.message),
        ]);
    }
    table
}

fn install_table(report: &InstallReport) -> Table {
    let mut table = new_table(["Files", "Count"]);
    table.add_row(vec![Cell::new("expected"), count_cell(report.expected, false)]);
    table.add_row(vec![
        Cell::new("finalized"),
        count_cell(report.finalized, false),
    ]);
    table.add_row(vec![Cell::new("skipped"), count_cell(report.skipped, false)]);
    table.add_row(vec![Cell::new("failed"), count_cell(report.failed, true)]);
    table.add_row(vec![Cell::new("deficit"), count_cell(report.deficit, true)]);
    table
}
