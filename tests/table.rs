use trip_explorer::table::render_table;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn render_table_right_aligns_numeric_columns() {
    let headers = strings(&["type", "trips"]);
    let rows = vec![strings(&["yellow", "2"]), strings(&["vtc", "10"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(
        lines,
        vec!["type    trips", "------  -----", "yellow      2", "vtc        10"]
    );
}

#[test]
fn no_data_cells_keep_numeric_alignment() {
    let headers = strings(&["group", "value"]);
    let rows = vec![
        strings(&["yellow", "25.00%"]),
        strings(&["vtc", "no data"]),
    ];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[2], "yellow   25.00%");
    assert_eq!(lines[3], "vtc     no data");
}

#[test]
fn render_table_normalizes_control_characters() {
    let headers = strings(&["note"]);
    let rows = vec![strings(&["line1\nline2\tvalue"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "line1 line2 value");
}

#[test]
fn ansi_sequences_do_not_count_toward_width() {
    let headers = strings(&["type", "status"]);
    let rows = vec![strings(&["green", "\u{1b}[32mOK\u{1b}[0m"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[1], "-----  ------");
    assert_eq!(lines[2], "green  \u{1b}[32mOK\u{1b}[0m");
}
