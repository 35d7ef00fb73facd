use chrono::{DateTime, Utc};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_BORDERS_ONLY,
};

use crate::pipeline::SymbolReport;

/// Brightness for a change relative to the top mover, floored at 0.4.
fn get_visibility_ratio(current_pct: f64, top_pct: f64) -> f64 {
    let ratio = 0.4 + 0.6 * (current_pct / top_pct);
    ratio.clamp(0.4, 1.0)
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%d-%m-%Y %H:%M:%S").to_string()
}

pub fn build_table(reports: &[SymbolReport]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Rank").add_attribute(Attribute::Bold),
            Cell::new("Symbol").add_attribute(Attribute::Bold),
            Cell::new("Change (%)")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
            Cell::new("Open")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
            Cell::new("Close")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Right),
            Cell::new("Chart").add_attribute(Attribute::Bold),
        ]);

    let top_pct = reports.first().map(|r| r.change).unwrap_or(1.0);
    let safe_top_pct = if top_pct == 0.0 { 1.0 } else { top_pct };

    for report in reports {
        let ratio = get_visibility_ratio(report.change, safe_top_pct);
        let cyan_val = (255.0 * ratio) as u8;
        let green_val = (255.0 * ratio) as u8;

        table.add_row(vec![
            Cell::new(report.rank).fg(Color::DarkGrey),
            Cell::new(&report.symbol).fg(Color::Rgb {
                r: 0,
                g: cyan_val,
                b: cyan_val,
            }),
            Cell::new(format!("{:+.2}%", report.change))
                .fg(Color::Rgb {
                    r: 0,
                    g: green_val,
                    b: 0,
                })
                .set_alignment(CellAlignment::Right),
            Cell::new(&report.open).set_alignment(CellAlignment::Right),
            Cell::new(&report.close).set_alignment(CellAlignment::Right),
            Cell::new(report.chart_path.display()).fg(Color::DarkGrey),
        ]);
    }

    table
}

pub fn print_table(reports: &[SymbolReport], at: DateTime<Utc>) {
    if reports.is_empty() {
        println!("No movers charted.");
        return;
    }
    let title = format!("(Data taken at {} UTC)", format_timestamp(at));
    println!("\n{}\n{}", title, build_table(reports));
}
