//! `evidence sources` - list the effective source catalog

use anyhow::Result;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let catalog = config.catalog();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Source").fg(Color::Cyan),
            Cell::new("URL").fg(Color::Cyan),
            Cell::new("License").fg(Color::Cyan),
        ]);

    for (name, meta) in catalog.iter() {
        let name_cell = if config.sources.contains_key(name) {
            Cell::new(format!("{name} (config)")).fg(Color::Yellow)
        } else {
            Cell::new(name)
        };
        table.add_row(vec![name_cell, Cell::new(&meta.url), Cell::new(&meta.license)]);
    }

    eprintln!("\n{table}");
    eprintln!("{} sources", catalog.len());
    Ok(())
}
