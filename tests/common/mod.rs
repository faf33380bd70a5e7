use std::path::Path;

/// Wraps header and body rows into a minimal HTML document with one table.
/// Rows are raw `<tr>` inner markup; an empty `head` leaves out `<thead>`.
pub fn table_html(head: &[&str], body: &[&str]) -> String {
    let mut html = String::from("<!DOCTYPE html><html><body><table>");
    if !head.is_empty() {
        html.push_str("<thead>");
        for row in head {
            html.push_str("<tr>");
            html.push_str(row);
            html.push_str("</tr>");
        }
        html.push_str("</thead>");
    }
    html.push_str("<tbody>");
    for row in body {
        html.push_str("<tr>");
        html.push_str(row);
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></body></html>");
    html
}

/// Builds a flat table whose first row holds `<th>` labels.
pub fn flat_table(labels: &[&str], rows: &[Vec<&str>]) -> String {
    let header = labels
        .iter()
        .map(|label| format!("<th>{label}</th>"))
        .collect::<String>();
    let body = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| format!("<td>{value}</td>"))
                .collect::<String>()
        })
        .collect::<Vec<_>>();
    let body = body.iter().map(String::as_str).collect::<Vec<_>>();
    table_html(&[&header], &body)
}

pub fn write_fixture(path: &Path, html: &str) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, html)?;
    Ok(())
}
