use std::io::{self, Write};

use crate::models::StoredLogin;

pub const HEADER: &str =
    "user_id | device_type | masked_ip | masked_device_id | locale | app_version | create_date";

/// Print `rows` as a pipe-separated table in fixed column order.
/// NULL columns are shown as `None`.
pub fn write_table<W: Write>(out: &mut W, rows: &[StoredLogin]) -> io::Result<()> {
    writeln!(out, "\nPrinting TABLE: user_logins\n")?;
    writeln!(out, "{}", HEADER)?;

    for row in rows {
        let columns = [
            &row.user_id,
            &row.device_type,
            &row.masked_ip,
            &row.masked_device_id,
            &row.locale,
            &row.app_version,
            &row.create_date,
        ];
        let line = columns
            .iter()
            .map(|c| c.as_deref().unwrap_or("None"))
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(out, "{}", line)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: &str, create_date: Option<&str>) -> StoredLogin {
        StoredLogin {
            user_id: Some(user_id.to_string()),
            device_type: Some("ios".to_string()),
            masked_ip: Some("aa".to_string()),
            masked_device_id: Some("bb".to_string()),
            locale: Some("en-US".to_string()),
            app_version: Some("9.3.1".to_string()),
            create_date: create_date.map(str::to_string),
        }
    }

    #[test]
    fn test_rows_follow_header_order() {
        let mut out = Vec::new();
        write_table(&mut out, &[row("u1", Some("2023-07-14")), row("u2", None)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();

        assert_eq!(lines[0], "Printing TABLE: user_logins");
        assert_eq!(lines[1], HEADER);
        assert_eq!(lines[2], "u1 | ios | aa | bb | en-US | 9.3.1 | 2023-07-14");
        assert_eq!(lines[3], "u2 | ios | aa | bb | en-US | 9.3.1 | None");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_empty_table_prints_header_only() {
        let mut out = Vec::new();
        write_table(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with(&format!("{}\n", HEADER)));
    }
}
