//! Drill script generation.
//!
//! The actual CSV→Parquet materialization is done by Apache Drill; all we
//! emit is the SQL it needs. Drill reads a header-less CSV as a single
//! `columns` array per row, so every projection is positional and the header
//! row has to be skipped with `OFFSET 1`.

use tracing::debug;

use crate::source::{Result, SourceError};

/// Render the Drill SQL that creates a Parquet table at `output_table` from
/// the CSV at `input_file`.
///
/// `headers` are the output column names, in CSV column order; the i-th entry
/// is projected as `columns[i]`. Both location strings are passed through
/// verbatim into Drill's `dfs.tmp.` / `dfs.` addressing; like the column
/// aliases, they sit inside backtick quotes, so a backtick in either is
/// rejected. Pure function: same inputs, byte-identical script.
pub fn render_script<S: AsRef<str>>(
    headers: &[S],
    output_table: &str,
    input_file: &str,
) -> Result<String> {
    if headers.is_empty() {
        return Err(SourceError::EmptyHeaders);
    }
    for location in [output_table, input_file] {
        if location.contains('`') {
            return Err(SourceError::UnquotableLocation {
                location: location.to_string(),
            });
        }
    }
    for header in headers {
        // Drill quotes identifiers with backticks and documents no escape for
        // a literal backtick inside one.
        if header.as_ref().contains('`') {
            return Err(SourceError::UnquotableHeader {
                header: header.as_ref().to_string(),
            });
        }
    }

    let mut script = String::with_capacity(128 + headers.len() * 32);
    script.push_str("alter session set `store.format`='parquet';\n");
    script.push_str(&format!("CREATE TABLE dfs.tmp.`{}` AS\n", output_table));
    script.push_str("SELECT\n");
    for (i, header) in headers.iter().enumerate() {
        let sep = if i + 1 < headers.len() { "," } else { "" };
        script.push_str(&format!("columns[{}] as `{}`{}\n", i, header.as_ref(), sep));
    }
    script.push_str(&format!("FROM dfs.`{}`\n", input_file));
    script.push_str("OFFSET 1\n");

    debug!(columns = headers.len(), output_table, "rendered drill script");
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const QUANDL_HEADERS: [&str; 8] = [
        "Date",
        "Open",
        "High",
        "Low",
        "Close",
        "Volume",
        "Ex-Dividend",
        "Split Ratio",
    ];

    #[test]
    fn renders_expected_script() -> Result<()> {
        let expected = "\
alter session set `store.format`='parquet';
CREATE TABLE dfs.tmp.`/path/to/parquet_output/` AS
SELECT
columns[0] as `Date`,
columns[1] as `Open`,
columns[2] as `High`,
columns[3] as `Low`,
columns[4] as `Close`,
columns[5] as `Volume`,
columns[6] as `Ex-Dividend`,
columns[7] as `Split Ratio`
FROM dfs.`/path/to/input.csv`
OFFSET 1";

        let script = render_script(
            &QUANDL_HEADERS,
            "/path/to/parquet_output/",
            "/path/to/input.csv",
        )?;
        assert_eq!(script.trim(), expected);
        Ok(())
    }

    #[test]
    fn render_is_deterministic() -> Result<()> {
        let a = render_script(&QUANDL_HEADERS, "/out/", "/in.csv")?;
        let b = render_script(&QUANDL_HEADERS, "/out/", "/in.csv")?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn one_projection_per_header_in_order() -> Result<()> {
        let script = render_script(&QUANDL_HEADERS, "/out/", "/in.csv")?;
        for (i, header) in QUANDL_HEADERS.iter().enumerate() {
            let sep = if i + 1 < QUANDL_HEADERS.len() { "," } else { "" };
            assert!(script.contains(&format!("columns[{}] as `{}`{}\n", i, header, sep)));
        }
        assert_eq!(script.matches("columns[").count(), QUANDL_HEADERS.len());
        Ok(())
    }

    #[test]
    fn empty_headers_are_rejected() {
        let headers: [&str; 0] = [];
        let err = render_script(&headers, "/out/", "/in.csv").unwrap_err();
        assert!(matches!(err, SourceError::EmptyHeaders));
    }

    #[test]
    fn backtick_in_location_is_rejected() {
        let err = render_script(&QUANDL_HEADERS, "/out`dir/", "/in.csv").unwrap_err();
        assert!(matches!(
            err,
            SourceError::UnquotableLocation { ref location } if location == "/out`dir/"
        ));

        let err = render_script(&QUANDL_HEADERS, "/out/", "/in`put.csv").unwrap_err();
        assert!(matches!(err, SourceError::UnquotableLocation { .. }));
    }

    #[test]
    fn backtick_in_header_is_rejected() {
        let err = render_script(&["Date", "we`ird"], "/out/", "/in.csv").unwrap_err();
        assert!(matches!(
            err,
            SourceError::UnquotableHeader { ref header } if header == "we`ird"
        ));
    }
}
