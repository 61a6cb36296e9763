//! CSV export of the working set.

use std::io::Write;

use csv::WriterBuilder;

use crate::types::ReviewItem;

/// Write `timestamp,rating,author,content` rows for `items`, in the order
/// given.
///
/// Timestamps are rounded to whole seconds and ratings to one decimal.
/// Fields containing a comma, quote or newline are quoted with internal
/// quotes doubled.
pub fn write_csv<W: Write>(items: &[ReviewItem], writer: W) -> Result<(), csv::Error> {
    let mut out = WriterBuilder::new().from_writer(writer);
    out.write_record(["timestamp", "rating", "author", "content"])?;
    for item in items {
        out.write_record([
            format!("{}", item.timestamp.round() as i64),
            format!("{:.1}", item.rating),
            item.author.clone(),
            item.content.clone(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Render `items` as a CSV string.
pub fn to_csv_string(items: &[ReviewItem]) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_csv(items, &mut buf)?;
    String::from_utf8(buf).map_err(|e| csv::Error::from(std::io::Error::other(e)))
}
