use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::error::Result;

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown rendering of the first `max_rows` rows, or `(no rows)`.
pub fn render_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    println!("{}\n", render_table_rows(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CountryRecord, RecordPreviewRow};

    fn country() -> CountryRecord {
        CountryRecord {
            iso_a2: "AA".to_string(),
            name_long: "Alfa".to_string(),
            continent: Some("Europe".to_string()),
            region_un: None,
            subregion: Some("Northern Europe".to_string()),
            kind: Some("Sovereign country".to_string()),
            area_km2: 1000.0,
            pop: 1_000_000.0,
            life_exp: Some(80.0),
            gdp_percap: None,
            pop_density: 1000.0,
            imputed: Vec::new(),
        }
    }

    #[test]
    fn clean_rows_serialize_with_source_headers() {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.serialize(country()).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("iso_a2,name_long,continent,region_un,subregion,type,area_km2,pop,lifeExp,gdpPercap,pop_density")
        );
        assert_eq!(
            lines.next(),
            Some("AA,Alfa,Europe,,Northern Europe,Sovereign country,1000.0,1000000.0,80.0,,1000.0")
        );
    }

    #[test]
    fn preview_renders_markdown_or_placeholder() {
        let rows: Vec<RecordPreviewRow> = vec![RecordPreviewRow::from(&country())];
        let table = render_table_rows(&rows, 5);
        assert!(table.contains("| iso_a2 |"));
        assert!(table.contains("1,000,000"));
        let empty: Vec<RecordPreviewRow> = Vec::new();
        assert_eq!(render_table_rows(&empty, 5), "(no rows)");
    }
}
