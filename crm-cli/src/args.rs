use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fields listed by the `accounts` command. `-` marks an empty column.
pub const ACCOUNT_FIELDS: &str =
    "Id,BillingCountry,-,Name,-,BillingStreet,-,BillingPostalCode,BillingCity,-";

/// Lists, deletes and groups duplicate records of a CRM org.
#[derive(Parser, Debug)]
#[command(name = "crm", about = "Lists, deletes and groups duplicate records of a CRM org")]
pub struct Args {
    /// Directory holding `base` and profile configuration files (default: ./configuration)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Also write JSON logs, rolled daily, to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List records as `;` separated rows with a header line
    List {
        /// Object type to list
        #[arg(long = "sf-type", short = 's')]
        object: String,

        /// Comma separated fields; `-` adds an empty column
        #[arg(long, short = 'f', default_value = "Id")]
        fields: String,
    },

    /// List accounts with their billing address
    Accounts,

    /// Delete records by id
    Delete {
        #[arg(long = "sf-type", short = 's')]
        object: String,

        /// Comma separated record ids
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<String>,
    },

    /// Delete every record of an object type
    DeleteAll {
        #[arg(long = "sf-type", short = 's')]
        object: String,

        /// Delete through a single bulk job instead of one request per record
        #[arg(long)]
        bulk: bool,
    },

    /// File the given records as one duplicate group
    Dedup {
        /// Comma separated record ids, at least two
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<String>,
    },

    /// Create duplicate groups from a `;` separated grouping file
    FileDedup {
        /// File with an `out_grp_id` column and a `1` column holding record ids
        path: PathBuf,

        /// Maximum number of groups to create (default: `duplicates.max_file_groups`)
        #[arg(long)]
        max_groups: Option<usize>,
    },

    /// Delete every duplicate group filed under the configured rule
    Clean,
}
