mod common;

use std::process::Command;

use html_span_table::{
    Document, ExtractError, ExtractOptions, ExtractWarningCode, SpanMode, extract_html,
    extract_html_bytes_to_csv_string, extract_html_bytes_to_json_string, extract_html_to_csv,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("value should serialize")
}

#[test]
fn spanning_header_nests_sub_columns() {
    let html = common::table_html(
        &["<th colspan=2>Sales</th>", "<th>Jan</th><th>Feb</th>"],
        &["<td>100</td><td>200</td>"],
    );
    let records = Document::parse(&html)
        .extract_table("table", None)
        .expect("table should extract");

    assert_eq!(records.len(), 1);
    assert_eq!(to_json(&records[0]), r#"{"sales":{"jan":"100","feb":"200"}}"#);
}

#[test]
fn first_row_is_header_without_thead() {
    let html = r"
        <table>
          <tr><td>Name</td><td>Age</td></tr>
          <tr><td>Alice</td><td>30</td></tr>
          <tr><td>Bob</td><td>25</td></tr>
        </table>";
    let (records, warnings) = Document::parse(html)
        .extract_table_with("table", &ExtractOptions::default())
        .expect("table should extract");

    assert_eq!(
        to_json(&records),
        r#"[{"name":"Alice","age":"30"},{"name":"Bob","age":"25"}]"#
    );
    assert!(warnings.is_empty(), "warnings: {warnings:?}");
}

#[test]
fn body_colspan_repeats_value_across_columns() {
    let html = common::table_html(
        &["<th>Item</th><th>Q1</th><th>Q2</th><th>Q3</th>"],
        &["<td>Pen</td><td colspan=3>N/A</td>"],
    );
    let records = Document::parse(&html)
        .extract_table("table", None)
        .expect("table should extract");

    assert_eq!(
        to_json(&records[0]),
        r#"{"item":"Pen","q1":"N/A","q2":"N/A","q3":"N/A"}"#
    );
}

#[test]
fn body_rowspan_value_appears_in_following_row() {
    let html = common::table_html(
        &["<th>Region</th><th>Units</th>"],
        &["<td rowspan=2>North</td><td>1</td>", "<td>2</td>"],
    );
    let records = Document::parse(&html)
        .extract_table("table", None)
        .expect("table should extract");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].value("region"), Some("North"));
    assert_eq!(records[1].value("region"), Some("North"));
    assert_eq!(records[1].value("units"), Some("2"));
}

#[test]
fn header_rowspan_does_not_shift_columns_beneath() {
    let html = common::table_html(
        &[
            "<th rowspan=2>Name</th><th colspan=2>Score</th><th rowspan=2>Total</th>",
            "<th>Home</th><th>Away</th>",
        ],
        &["<td>Lions</td><td>1</td><td>2</td><td>3</td>"],
    );
    let records = Document::parse(&html)
        .extract_table("table", None)
        .expect("table should extract");

    assert_eq!(
        to_json(&records[0]),
        r#"{"name":"Lions","score":{"home":"1","away":"2"},"total":"3"}"#
    );
}

#[test]
fn spanning_label_without_sub_labels_gets_indexed_fields() {
    let html = common::table_html(
        &["<th>Name</th><th colspan=3>Scores</th>"],
        &["<td>Ada</td><td>7</td><td>8</td><td>9</td>"],
    );
    let document = Document::parse(&html);

    let layout = document
        .layout("table", &ExtractOptions::default())
        .expect("layout should build");
    assert_eq!(layout.placeholder_count(), 4);
    assert_eq!(
        layout.template(false).expect("template should serialize"),
        r####"{"name":"###","scores":{"scores#0":"###","scores#1":"###","scores#2":"###"}}"####
    );

    let records = document
        .extract_table("table", None)
        .expect("table should extract");
    assert_eq!(
        to_json(&records[0]),
        r#"{"name":"Ada","scores":{"scores#0":"7","scores#1":"8","scores#2":"9"}}"#
    );
}

#[test]
fn flat_table_round_trips_known_rows() {
    let labels = ["city", "country", "population"];
    let rows = vec![
        vec!["Oslo", "Norway", "709037"],
        vec!["Bergen", "Norway", "291940"],
        vec!["Lyon", "France", "522250"],
    ];
    let html = common::flat_table(&labels, &rows);

    let records = Document::parse(&html)
        .extract_table("table", None)
        .expect("table should extract");

    assert_eq!(records.len(), rows.len());
    for (record, row) in records.iter().zip(&rows) {
        let fields = record.flatten();
        let expected = labels
            .iter()
            .zip(row)
            .map(|(label, value)| ((*label).to_string(), (*value).to_string()))
            .collect::<Vec<_>>();
        assert_eq!(fields, expected);
    }
}

#[test]
fn selector_misses_and_bodyless_tables_are_errors() {
    let err = Document::parse("<p>no tables here</p>")
        .extract_table("table", None)
        .expect_err("no table should match");
    assert!(matches!(err, ExtractError::NoTableFound { .. }));
    assert_eq!(err.to_string(), "no table found matching 'table'");

    let err = Document::parse("<table></table>")
        .extract_table("table", None)
        .expect_err("table has no body");
    assert!(matches!(err, ExtractError::NoBody { .. }));
}

#[test]
fn strict_mode_rejects_short_rows_that_best_effort_pads() {
    let html = common::table_html(
        &["<th>A</th><th>B</th><th>C</th>"],
        &["<td>1</td><td>2</td><td>3</td>", "<td>4</td>"],
    );
    let document = Document::parse(&html);

    let (records, warnings) = document
        .extract_table_with("table", &ExtractOptions::default())
        .expect("best effort should extract");
    assert_eq!(to_json(&records[1]), r#"{"a":"4","b":"","c":""}"#);
    assert_eq!(warnings[0].code, ExtractWarningCode::SpanMismatch);
    assert_eq!(warnings[0].row, Some(2));

    let strict = ExtractOptions {
        span_mode: SpanMode::Strict,
        ..ExtractOptions::default()
    };
    let err = document
        .extract_table_with("table", &strict)
        .expect_err("strict mode should fail");
    assert!(matches!(
        err,
        ExtractError::SpanMismatch {
            row: 2,
            expected: 3,
            found: 1
        }
    ));
}

#[test]
fn rowspan_does_not_cross_tbody_boundaries() {
    let html = r"
        <table>
          <thead><tr><th>Group</th><th>Item</th></tr></thead>
          <tbody><tr><td rowspan=3>Fruit</td><td>Apple</td></tr></tbody>
          <tbody><tr><td>Veg</td><td>Leek</td></tr></tbody>
        </table>";
    let (records, warnings) = Document::parse(html)
        .extract_table_with("table", &ExtractOptions::default())
        .expect("table should extract");

    assert_eq!(
        to_json(&records),
        r#"[{"group":"Fruit","item":"Apple"},{"group":"Veg","item":"Leek"}]"#
    );
    assert!(warnings.is_empty(), "warnings: {warnings:?}");
}

#[test]
fn row_selection_and_skip_rows_filter_body_rows() {
    let html = common::table_html(
        &["<th>N</th>"],
        &["<td>1</td>", "<td>2</td>", "<td>3</td>", "<td>4</td>"],
    );
    let options = ExtractOptions {
        skip_rows: 1,
        rows: Some("1,3".parse().expect("selection should parse")),
        ..ExtractOptions::default()
    };
    let (records, _) = Document::parse(&html)
        .extract_table_with("table", &options)
        .expect("table should extract");

    let values = records
        .iter()
        .filter_map(|record| record.value("n"))
        .collect::<Vec<_>>();
    assert_eq!(values, vec!["2", "4"]);
}

#[test]
fn writes_merged_csv_for_all_tables() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("tables.html");
    let output = dir.path().join("tables.csv");

    let html = format!(
        "{}{}",
        common::table_html(
            &["<th colspan=2>Sales</th>", "<th>Jan</th><th>Feb</th>"],
            &["<td>100</td><td>200</td>"],
        ),
        common::flat_table(&["Region"], &[vec!["North"], vec!["South"]]),
    );
    common::write_fixture(&input, &html).expect("HTML fixture should be written");

    let options = ExtractOptions {
        all_tables: true,
        ..ExtractOptions::default()
    };
    let report =
        extract_html_to_csv(&input, &output, "table", &options).expect("extraction should succeed");

    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert_eq!(
        csv,
        "table_id,sales.jan,sales.feb,region\n1,100,200,\n2,,,North\n2,,,South\n"
    );
    assert_eq!(report.table_count, 2);
    assert_eq!(report.row_count, 3);
}

#[test]
fn csv_and_json_strings_follow_options() {
    let html = common::table_html(
        &["<th colspan=2>Sales</th>", "<th>Jan</th><th>Feb</th>"],
        &["<td>100</td><td>200</td>"],
    );

    let options = ExtractOptions {
        no_table: true,
        delimiter: b';',
        ..ExtractOptions::default()
    };
    let (csv, _) = extract_html_bytes_to_csv_string(html.as_bytes(), "table", &options)
        .expect("csv should render");
    assert_eq!(csv, "sales.jan;sales.feb\n100;200\n");

    let defaults = ExtractOptions::default();
    let (json, report) =
        extract_html_bytes_to_json_string(html.as_bytes(), "table", &defaults, false)
            .expect("json should render");
    assert_eq!(json, r#"[{"sales":{"jan":"100","feb":"200"}}]"#);
    assert_eq!(report.row_count, 1);

    let all = ExtractOptions {
        all_tables: true,
        ..ExtractOptions::default()
    };
    let (json, _) = extract_html_bytes_to_json_string(html.as_bytes(), "table", &all, false)
        .expect("json should render");
    assert_eq!(
        json,
        r#"[{"table_id":1,"records":[{"sales":{"jan":"100","feb":"200"}}]}]"#
    );
}

#[test]
fn extract_html_reports_warnings() {
    let html = common::table_html(
        &["<th>Name</th><th>Name</th>"],
        &["<td>a</td><td>b</td>"],
    );
    let (tables, report) =
        extract_html(&html, "table", &ExtractOptions::default()).expect("table should extract");

    assert_eq!(to_json(&tables[0].records[0]), r##"{"name":"a","name#1":"b"}"##);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].code, ExtractWarningCode::DuplicateLabel);
}

#[test]
fn cli_writes_csv_to_stdout() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("sales.html");
    common::write_fixture(
        &input,
        &common::table_html(
            &["<th colspan=2>Sales</th>", "<th>Jan</th><th>Feb</th>"],
            &["<td>100</td><td>200</td>"],
        ),
    )
    .expect("HTML fixture should be written");

    let output = Command::new(env!("CARGO_BIN_EXE_htmltable"))
        .args(["extract", "-i", &input.to_string_lossy(), "--format", "csv"])
        .output()
        .expect("CLI should run");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "table_id,sales.jan,sales.feb\n1,100,200\n"
    );
}

#[test]
fn cli_exits_with_code_2_when_no_rows() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("empty.html");
    let output = dir.path().join("empty.json");
    common::write_fixture(&input, &common::table_html(&["<th>A</th>"], &[]))
        .expect("HTML fixture should be written");

    let status = Command::new(env!("CARGO_BIN_EXE_htmltable"))
        .args([
            "extract",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &output.to_string_lossy(),
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(2));
    assert_eq!(
        std::fs::read_to_string(&output).expect("output should be written"),
        "[]"
    );
}

#[test]
fn cli_exits_with_code_1_on_selector_miss() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("plain.html");
    common::write_fixture(&input, "<p>nothing tabular</p>")
        .expect("HTML fixture should be written");

    let output = Command::new(env!("CARGO_BIN_EXE_htmltable"))
        .args(["extract", "-i", &input.to_string_lossy()])
        .output()
        .expect("CLI should run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no table found"));
}
