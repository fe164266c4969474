//! Table rendering for `alkit cache list`.

use super::format_size;
use alkit_core::CacheEntryInfo;
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets::NOTHING};

pub fn cache_table(entries: &[CacheEntryInfo]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Version").add_attribute(Attribute::Bold),
        Cell::new("Release").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Size").add_attribute(Attribute::Bold),
        Cell::new("Completed").add_attribute(Attribute::Bold),
    ]);

    for entry in entries {
        let (release, completed) = entry.marker.as_ref().map_or_else(
            || ("-".to_string(), "-".to_string()),
            |m| {
                (
                    m.full_version.clone(),
                    m.completed_at.format("%Y-%m-%d %H:%M").to_string(),
                )
            },
        );
        table.add_row(vec![
            Cell::new(&entry.version),
            Cell::new(release),
            Cell::new(if entry.ready { "ready" } else { "incomplete" }),
            Cell::new(format_size(entry.size_bytes)),
            Cell::new(completed),
        ]);
    }

    table
}
