//! Command-line arguments for the `antigenapp` binary.

use clap::{Parser, Subcommand, ValueEnum};

/// Entity types the cache knows about.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[value(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Antigen,
    Nanobody,
    ElisaPlate,
    ElisaWell,
}

/// Inspect the lab-data API through the caching entity stores.
#[derive(Parser, Debug)]
#[command(name = "antigenapp", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List records, optionally limited to one project.
    List {
        #[arg(value_enum)]
        entity: EntityKind,
        /// Project short title.
        project: Option<String>,
    },
    /// Fetch one record by reference, e.g. `test:1` or `test:1:12`.
    /// ELISA wells are printed with their antigen and nanobody.
    Get {
        #[arg(value_enum)]
        entity: EntityKind,
        reference: String,
    },
    /// Load a project's antigens, nanobodies, plates and wells.
    Prefetch {
        /// Project short title.
        project: String,
    },
}
