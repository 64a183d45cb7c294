//! `antigenapp` -- command-line front end for the lab-data entity cache.
//!
//! Lists or fetches projects, antigens, nanobodies, ELISA plates and
//! ELISA wells through the caching stores and prints them as JSON.
//! Notifications raised by failed requests are written to stderr.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default                 | Description                   |
//! |------------------------|----------|-------------------------|-------------------------------|
//! | `API_BASE_URL`         | no       | `http://127.0.0.1:8000` | Origin serving `/api/...`     |
//! | `REQUEST_TIMEOUT_SECS` | no       | `30`                    | Per-request timeout           |
//! | `LOG_FORMAT`           | no       | `fmt`                   | `json` for structured logs    |
//! | `RUST_LOG`             | no       | `antigenapp=info`       | Log filter                    |

mod command;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use antigenapp_client::ClientConfig;
use antigenapp_core::entities::{
    ElisaWellFilter, ElisaWellRef, ProjectFilter, ProjectItemFilter, ProjectItemRef, ProjectRef,
};
use antigenapp_core::Entity;
use antigenapp_store::{EntityStore, GetOptions, Stores};

use command::{Args, Command, EntityKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let Args { command } = Args::parse();
    init_tracing();

    let config = ClientConfig::from_env()?;
    tracing::info!(base_url = %config.base_url, ?command, "Starting antigenapp");

    let stores = Stores::from_config(&config).context("building HTTP client")?;
    let outcome = run(&stores, command).await;

    for notification in stores.notifications().take_undisplayed() {
        eprintln!("{}", notification.message.trim_end());
    }
    outcome
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "antigenapp=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(stores: &Stores, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { entity, project } => match entity {
            EntityKind::Project => {
                let filter = ProjectFilter {
                    short_title: project,
                };
                print_json(&stores.projects.list_records(filter).await?)
            }
            EntityKind::Antigen => print_json(&list_items(&stores.antigens, project).await?),
            EntityKind::Nanobody => print_json(&list_items(&stores.nanobodies, project).await?),
            EntityKind::ElisaPlate => {
                print_json(&list_items(&stores.elisa_plates, project).await?)
            }
            EntityKind::ElisaWell => {
                let filter = ElisaWellFilter {
                    project,
                    ..ElisaWellFilter::default()
                };
                print_json(&stores.elisa_wells.list_records(filter).await?)
            }
        },
        Command::Get { entity, reference } => match entity {
            EntityKind::Project => {
                let key: ProjectRef = reference.parse()?;
                print_found(&stores.projects, &key).await
            }
            EntityKind::Antigen => {
                let key: ProjectItemRef = reference.parse()?;
                print_found(&stores.antigens, &key).await
            }
            EntityKind::Nanobody => {
                let key: ProjectItemRef = reference.parse()?;
                print_found(&stores.nanobodies, &key).await
            }
            EntityKind::ElisaPlate => {
                let key: ProjectItemRef = reference.parse()?;
                print_found(&stores.elisa_plates, &key).await
            }
            EntityKind::ElisaWell => {
                let key: ElisaWellRef = reference.parse()?;
                match stores.resolve_elisa_well(&key).await? {
                    Some(resolved) => print_json(&serde_json::json!({
                        "well": resolved.well,
                        "antigen": resolved.antigen,
                        "nanobody": resolved.nanobody,
                    })),
                    None => anyhow::bail!("ELISA well {key} not found"),
                }
            }
        },
        Command::Prefetch { project } => {
            let project: ProjectRef = project.parse()?;
            stores.switch_project(project.clone()).await;
            stores.prefetch_project(&project).await?;
            let filter = ProjectItemFilter::project(project.short_title.clone());
            print_json(&serde_json::json!({
                "project": project.short_title,
                "antigens": stores.antigens.filtered(&filter).await.len(),
                "nanobodies": stores.nanobodies.filtered(&filter).await.len(),
                "elisa_plates": stores.elisa_plates.filtered(&filter).await.len(),
                "elisa_wells": stores
                    .elisa_wells
                    .filtered(&ElisaWellFilter::project(project.short_title.clone()))
                    .await
                    .len(),
            }))
        }
    }
}

async fn list_items<E>(store: &EntityStore<E>, project: Option<String>) -> anyhow::Result<Vec<E>>
where
    E: Entity<Filter = ProjectItemFilter>,
{
    let filter = ProjectItemFilter {
        project,
        number: None,
    };
    Ok(store.list_records(filter).await?)
}

async fn print_found<E: Entity>(store: &EntityStore<E>, key: &E::Ref) -> anyhow::Result<()> {
    match store.get_record(key, GetOptions::default()).await? {
        Some(record) => print_json(&record),
        None => anyhow::bail!("{} {key} not found", E::LABEL),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
