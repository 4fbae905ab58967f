use std::{io, path::Path};

use anyhow::Result;
use chrono::Local;
use clap::Subcommand;
use tracing::info;

use crate::{
    daemon::storage::usage_storage::{JsonUsageStorage, UsageStorage},
    tracking::store::UsageStore,
};

use super::{
    output::Printer,
    process::{spawn_server, stop_servers_for},
    report::load_live_state,
};

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    #[command(about = "List categories with their totals")]
    List,
    #[command(about = "Create an empty category")]
    Create { name: String },
    #[command(about = "Rename a category. Past reports follow the new name")]
    Rename { old: String, new: String },
    #[command(about = "Delete a category, its applications move to Uncategorized")]
    Delete { name: String },
    #[command(about = "Move an application into a category")]
    Assign {
        app: String,
        category: String,
        #[arg(long, help = "Create the category if it doesn't exist yet")]
        create: bool,
    },
}

/// Applies one category edit to stored usage. A daemon tracking into `dir` keeps its own copy of
/// the state, so it's stopped first (it saves on the way out) and started again with the same
/// interval once the edit is saved.
pub async fn process_category_command(command: CategoryCommand, dir: &Path) -> Result<()> {
    if let CategoryCommand::List = command {
        let state = load_live_state(dir, &Local::now()).await?;
        Printer::for_stdout().print_categories(&mut io::stdout().lock(), &state)?;
        return Ok(());
    }

    let stopped = stop_servers_for(dir)?;
    let result = edit_categories(command, dir).await;
    if let Some(launch) = stopped.first() {
        info!("Restarting daemon with interval {}s", launch.interval);
        spawn_server(dir, launch.interval)?;
    }
    result
}

async fn edit_categories(command: CategoryCommand, dir: &Path) -> Result<()> {
    let storage = JsonUsageStorage::new(dir.to_path_buf())?;
    let store = UsageStore::new(storage.load().await?);
    apply(&store, command)?;
    storage.save(&store.snapshot()).await?;
    Ok(())
}

fn apply(store: &UsageStore, command: CategoryCommand) -> Result<()> {
    let now = Local::now();
    match command {
        CategoryCommand::List => {}
        CategoryCommand::Create { name } => store.create_category(&name)?,
        CategoryCommand::Rename { old, new } => store.rename_category(&old, &new)?,
        CategoryCommand::Delete { name } => store.delete_category(&name)?,
        CategoryCommand::Assign {
            app,
            category,
            create,
        } => {
            if create && store.snapshot().state.category_total(&category).is_none() {
                store.create_and_assign(&app, &category, &now)?
            } else {
                store.reassign_category(&app, &category, &now)?
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Duration;
    use tempfile::tempdir;

    use crate::{
        daemon::storage::usage_storage::{JsonUsageStorage, UsageStorage},
        tracking::{error::TrackingError, state::UNCATEGORIZED},
    };

    use super::{edit_categories, CategoryCommand};

    #[tokio::test]
    async fn test_edits_are_saved() -> Result<()> {
        let dir = tempdir()?;

        edit_categories(
            CategoryCommand::Assign {
                app: "code.exe".into(),
                category: "Work".into(),
                create: true,
            },
            dir.path(),
        )
        .await?;
        edit_categories(
            CategoryCommand::Rename {
                old: "Work".into(),
                new: "Coding".into(),
            },
            dir.path(),
        )
        .await?;

        let state = JsonUsageStorage::new(dir.path().to_path_buf())?.load().await?;
        assert_eq!(state.category_of("code.exe"), "Coding");
        assert_eq!(state.category_total("Coding"), Some(Duration::zero()));
        assert_eq!(state.category_total("Work"), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_edit_changes_nothing() -> Result<()> {
        let dir = tempdir()?;

        let result = edit_categories(
            CategoryCommand::Delete {
                name: UNCATEGORIZED.into(),
            },
            dir.path(),
        )
        .await;

        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<TrackingError>(),
            Some(TrackingError::ProtectedCategory(_))
        ));
        let storage = JsonUsageStorage::new(dir.path().to_path_buf())?;
        assert_eq!(storage.load().await?.categories().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_to_missing_category_fails() -> Result<()> {
        let dir = tempdir()?;

        let result = edit_categories(
            CategoryCommand::Assign {
                app: "code.exe".into(),
                category: "Work".into(),
                create: false,
            },
            dir.path(),
        )
        .await;

        assert!(matches!(
            result.unwrap_err().downcast_ref::<TrackingError>(),
            Some(TrackingError::UnknownCategory(_))
        ));
        Ok(())
    }
}
