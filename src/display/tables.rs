//! Table formatting for match lists and index summaries.

use comfy_table::{
    Attribute, Cell, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};

use crate::analysis::{ConfidenceTier, Match};

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            table: styled_table(),
        }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        self.table.set_header(bold_cells(headers));
        self
    }

    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    pub fn build(self) -> String {
        self.table.to_string()
    }
}

fn styled_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn bold_cells(headers: Vec<&str>) -> Vec<Cell> {
    headers
        .into_iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect()
}

fn tier_color(score: f32) -> Color {
    match ConfidenceTier::from_score(score) {
        ConfidenceTier::Strong => Color::Green,
        ConfidenceTier::Moderate => Color::Yellow,
        ConfidenceTier::Possible => Color::Grey,
    }
}

/// Ranked matches with score, category, themes and explanation.
pub fn create_match_table(matches: &[Match]) -> String {
    let mut table = styled_table();
    table.set_header(bold_cells(vec![
        "#", "Profile", "Score", "Category", "Period", "Themes", "Why",
    ]));

    for (rank, m) in matches.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&m.name).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.2}", m.score)).fg(tier_color(m.score)),
            Cell::new(&m.category),
            Cell::new(&m.period),
            Cell::new(m.key_themes.join(", ")),
            Cell::new(&m.reason),
        ]);
    }

    table.to_string()
}

/// Key/value summary of an index build.
pub fn create_summary_table(rows: &[(&str, String)]) -> String {
    let mut table = styled_table();
    table.set_header(bold_cells(vec!["Metric", "Value"]));
    for (metric, value) in rows {
        table.add_row(vec![*metric, value.as_str()]);
    }
    table.to_string()
}
