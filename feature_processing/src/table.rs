use std::io::{Read, Write};

use csv::{ReaderBuilder, Trim, WriterBuilder};

use crate::error::FeatureError;
use crate::misc::{FEATURE_COLUMNS, FeatureRow};

/// Reads a CSV feature table. The eight feature columns are required,
/// a `date` (or unnamed index) column is optional, anything else is ignored.
pub fn read_feature_rows<R: Read>(reader: R) -> Result<Vec<FeatureRow>, FeatureError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(FeatureError::EmptyTable);
    }
    for column in FEATURE_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(FeatureError::MissingColumn(column.to_string()));
        }
    }

    let rows = rdr
        .deserialize::<FeatureRow>()
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Err(FeatureError::EmptyTable);
    }

    Ok(rows)
}

pub fn write_feature_rows<W: Write>(writer: W, rows: &[FeatureRow]) -> Result<(), FeatureError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);

    let mut header = vec!["date"];
    header.extend(FEATURE_COLUMNS);
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.date.map(|d| d.to_string()).unwrap_or_default()];
        record.extend(row.values().iter().map(f64::to_string));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
