//! Reading duplicate groups from the output of an external matching tool.
//!
//! The file is `;` separated with a header. Rows sharing an `out_grp_id` with the row before
//! them belong to the same group; the record id is in the column named `1`.

use crm::grouping::DuplicateGroup;
use crm::types::RecordId;
use serde::Deserialize;
use std::io;
use tracing::debug;

use crate::error::CliResult;

#[derive(Debug, Deserialize)]
struct GroupingRow {
    #[serde(rename = "out_grp_id")]
    group: String,
    #[serde(rename = "1")]
    record_id: RecordId,
}

/// Reads at most `max_groups` groups of two or more records.
///
/// Groups with a single record are skipped and do not count towards the limit.
pub fn read_groups<R: io::Read>(reader: R, max_groups: usize) -> CliResult<Vec<DuplicateGroup>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut groups = Vec::new();
    let mut current: Option<(String, Vec<RecordId>)> = None;

    for row in reader.deserialize::<GroupingRow>() {
        if groups.len() >= max_groups {
            break;
        }

        let row = row?;
        if let Some((group, members)) = current.as_mut()
            && *group == row.group
        {
            members.push(row.record_id);
            continue;
        }

        if let Some((group, members)) = current.take() {
            close_group(&mut groups, group, members)?;
        }
        current = Some((row.group, vec![row.record_id]));
    }

    if let Some((group, members)) = current
        && groups.len() < max_groups
    {
        close_group(&mut groups, group, members)?;
    }

    Ok(groups)
}

fn close_group(
    groups: &mut Vec<DuplicateGroup>,
    group: String,
    members: Vec<RecordId>,
) -> CliResult<()> {
    if members.len() < 2 {
        debug!(group = %group, "skipping group with a single record");
        return Ok(());
    }

    groups.push(DuplicateGroup::new(members)?);

    Ok(())
}
