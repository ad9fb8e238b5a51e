use anyhow::{Context, Result};
use csv2parquet::{drill, source::CsvSource};
use std::{collections::HashMap, env, fs::File, process::exit};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    // Expect: <CSV_FILE> <OUTPUT_TABLE> [RENAME_MAP_JSON]
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: {} <CSV_FILE> <OUTPUT_TABLE> [RENAME_MAP_JSON]", args[0]);
        exit(1);
    }
    let csv_file = &args[1];
    let output_table = &args[2];

    let rename_map = match args.get(3) {
        Some(map_path) => Some(load_rename_map(map_path)?),
        None => None,
    };

    let src = CsvSource::new(csv_file, rename_map)?;
    info!(path = %src.path().display(), "resolved CSV source");

    let headers = src.output_headers()?;
    let script = drill::render_script(&headers, output_table, &src.path().to_string_lossy())?;

    // The script goes to stdout; feeding it to Drill is the caller's job.
    print!("{}", script);
    Ok(())
}

/// Load a JSON object file mapping source header → output column name.
fn load_rename_map(path: &str) -> Result<HashMap<String, String>> {
    let f = File::open(path).with_context(|| format!("opening rename map {}", path))?;
    let map: HashMap<String, String> =
        serde_json::from_reader(f).with_context(|| format!("parsing rename map {}", path))?;
    info!(entries = map.len(), "loaded rename map");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn rename_map_loads_from_json_object() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        write!(f, r#"{{"Adj. Open": "Adj Open", "Adj. Close": "Adj Close"}}"#)?;

        let map = load_rename_map(&f.path().to_string_lossy())?;
        assert_eq!(map.len(), 2);
        assert_eq!(map["Adj. Open"], "Adj Open");
        Ok(())
    }
}
