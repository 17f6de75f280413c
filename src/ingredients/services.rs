use std::io::Read;

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use super::repo;

/// Parses `name,measurement_unit` rows (no header), trimming both columns.
pub fn parse_csv<R: Read>(reader: R) -> anyhow::Result<Vec<(String, String)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("ingredients csv line {}", line + 1))?;
        let name = record.get(0).unwrap_or_default();
        let unit = record.get(1).unwrap_or_default();
        anyhow::ensure!(
            !name.is_empty() && !unit.is_empty(),
            "ingredients csv line {}: expected name,measurement_unit",
            line + 1
        );
        rows.push((name.to_string(), unit.to_string()));
    }
    Ok(rows)
}

/// Seeds the ingredient table from a CSV file unless it already has rows.
pub async fn import_if_empty(db: &PgPool, path: &str) -> anyhow::Result<()> {
    let existing = repo::count(db).await?;
    if existing > 0 {
        info!(existing, "ingredients already present; skipping import");
        return Ok(());
    }

    let file = std::fs::File::open(path).with_context(|| format!("open {}", path))?;
    let rows = parse_csv(file)?;
    let inserted = repo::insert_many(db, &rows).await?;
    info!(inserted, path, "ingredients imported");
    Ok(())
}
