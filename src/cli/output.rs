use awsipresolver::Resolution;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::*;

/*-------------------------------------------------------------------------------------------------
  Output Functions
-------------------------------------------------------------------------------------------------*/

/*--------------------------------------------------------------------------------------
  Resolution Table
--------------------------------------------------------------------------------------*/

pub fn resolution_table(resolutions: &[(String, Resolution)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("IP Address")
            .add_attribute(Attribute::Bold)
            .fg(Color::Green),
        Cell::new("Region")
            .add_attribute(Attribute::Bold)
            .fg(Color::Green),
        Cell::new("Service")
            .add_attribute(Attribute::Bold)
            .fg(Color::Green),
    ]);

    for (address, resolution) in resolutions {
        table.add_row(vec![
            Cell::new(address).add_attribute(Attribute::Bold),
            Cell::new(&resolution.region),
            Cell::new(&resolution.service),
        ]);
    }

    // Right-align the IP Address column
    let column = table.column_mut(0).expect("The first column exists");
    column.set_cell_alignment(CellAlignment::Right);

    println!("{table}");
}
