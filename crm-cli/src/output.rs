use crm::error::CrmResult;
use crm::query::Row;
use futures::{Stream, TryStreamExt, pin_mut};
use std::io;

use crate::error::CliResult;

/// Delimiter of listed rows.
pub const DELIMITER: u8 = b';';

/// Writes `header` and then every row of `rows` as delimited text.
///
/// Rows are written as they arrive. Returns the number of rows written.
pub async fn write_rows<W, S>(writer: W, header: &[String], rows: S) -> CliResult<usize>
where
    W: io::Write,
    S: Stream<Item = CrmResult<Row>>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(writer);
    writer.write_record(header)?;

    pin_mut!(rows);
    let mut written = 0usize;
    while let Some(row) = rows.try_next().await? {
        writer.write_record(row.values())?;
        written += 1;
    }
    writer.flush()?;

    Ok(written)
}
