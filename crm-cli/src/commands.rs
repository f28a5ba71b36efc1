use crm::api::ApiPaths;
use crm::bulk::{BulkClient, PollPolicy};
use crm::grouping::{DuplicateGroup, GroupingEngine, RuleSelection};
use crm::query::{QueryReader, RecordQuery};
use crm::records::{DeleteReport, RecordClient};
use crm::transport::Transport;
use crm::types::DUPLICATE_RECORD_SET_OBJECT;
use crm_config::shared::CrmConfig;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::{ACCOUNT_FIELDS, Command};
use crate::error::CliResult;
use crate::grouping_file::read_groups;
use crate::output::write_rows;

/// Everything a command needs to talk to the platform.
pub struct Context<T> {
    pub transport: T,
    pub paths: ApiPaths,
    pub config: CrmConfig,
    pub cancellation: CancellationToken,
}

impl<T> Context<T>
where
    T: Transport + Clone + Sync,
{
    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.config.bulk.poll_interval(),
            deadline: self.config.bulk.poll_deadline(),
        }
    }

    fn records(&self) -> RecordClient<T> {
        RecordClient::new(self.transport.clone(), self.paths.clone())
    }

    fn bulk(&self) -> BulkClient<T> {
        BulkClient::new(self.transport.clone(), self.paths.clone())
            .with_poll_policy(self.poll_policy())
            .with_cancellation(self.cancellation.clone())
    }

    fn engine(&self) -> GroupingEngine<T> {
        let duplicates = &self.config.duplicates;
        let rule = RuleSelection {
            name: duplicates.rule_name.clone(),
            label: duplicates.rule_label.clone(),
            allow_provisional: duplicates.allow_provisional_rule,
        };

        GroupingEngine::new(self.transport.clone(), self.paths.clone(), rule)
            .with_poll_policy(self.poll_policy())
            .with_cancellation(self.cancellation.clone())
    }
}

/// Runs `command` to completion.
pub async fn run<T>(command: Command, ctx: &Context<T>) -> CliResult<()>
where
    T: Transport + Clone + Sync,
{
    match command {
        Command::List { object, fields } => list(ctx, &object, &fields).await,
        Command::Accounts => list(ctx, "Account", ACCOUNT_FIELDS).await,
        Command::Delete { object, ids } => {
            let report = ctx.records().delete(&object, &ids).await?;
            log_delete_report(&object, &report);
            Ok(())
        }
        Command::DeleteAll { object, bulk } => delete_all(ctx, &object, bulk).await,
        Command::Dedup { ids } => {
            let group = DuplicateGroup::new(ids)?;
            let group_id = ctx
                .engine()
                .group_records(&ctx.config.duplicates.record_object, &group)
                .await?;
            info!(%group_id, members = group.members().len(), "created duplicate group");
            Ok(())
        }
        Command::FileDedup { path, max_groups } => {
            let max_groups = max_groups.unwrap_or(ctx.config.duplicates.max_file_groups);
            file_dedup(ctx, &path, max_groups).await
        }
        Command::Clean => {
            let report = ctx.engine().remove_groups().await?;
            log_delete_report(DUPLICATE_RECORD_SET_OBJECT, &report);
            Ok(())
        }
    }
}

async fn list<T>(ctx: &Context<T>, object: &str, fields: &str) -> CliResult<()>
where
    T: Transport + Clone + Sync,
{
    let query = RecordQuery::parse(object, fields)?;
    let reader = QueryReader::new(ctx.transport.clone(), ctx.paths.clone());

    let written = write_rows(io::stdout().lock(), &query.header(), reader.list(&query)).await?;
    info!(object, rows = written, "listed records");

    Ok(())
}

async fn delete_all<T>(ctx: &Context<T>, object: &str, bulk: bool) -> CliResult<()>
where
    T: Transport + Clone + Sync,
{
    if !bulk {
        let report = ctx.records().delete_all(object).await?;
        log_delete_report(object, &report);
        return Ok(());
    }

    let ids = ctx.records().ids(object, None).await?;
    if ids.is_empty() {
        info!(object, "nothing to delete");
        return Ok(());
    }

    let result = ctx.bulk().delete_records(object, &ids).await?;
    let failures = result.failures()?;
    for (position, failure) in &failures {
        warn!(
            object,
            id = ids.get(*position).map(String::as_str).unwrap_or_default(),
            errors = ?failure.errors,
            "record was not deleted"
        );
    }
    info!(
        object,
        deleted = ids.len().saturating_sub(failures.len()),
        failed = failures.len(),
        "bulk delete finished"
    );

    Ok(())
}

async fn file_dedup<T>(ctx: &Context<T>, path: &Path, max_groups: usize) -> CliResult<()>
where
    T: Transport + Clone + Sync,
{
    let file = File::open(path)?;
    let groups = read_groups(BufReader::new(file), max_groups)?;
    info!(path = %path.display(), groups = groups.len(), "read duplicate groups");

    let report = ctx.engine().materialize(&groups).await?;
    info!(
        groups = report.group_ids.len(),
        memberships = report.memberships.len(),
        failed = report.failures.len(),
        "created duplicate groups"
    );

    Ok(())
}

fn log_delete_report(object: &str, report: &DeleteReport) {
    for failure in &report.failures {
        warn!(object, id = %failure.id, status = %failure.status, error = %failure.message, "record was not deleted");
    }
    info!(
        object,
        deleted = report.deleted,
        failed = report.failures.len(),
        "delete finished"
    );
}
