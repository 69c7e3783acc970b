//! `paineel manage`: edits the tracked process list.

use crate::cli::ManageAction;
use paineel_monitor::RecordReconciler;

pub async fn run(reconciler: &RecordReconciler, action: &ManageAction) -> anyhow::Result<()> {
    match action {
        ManageAction::Add { number } => {
            if reconciler.add(number).await? {
                println!("Added {number}.");
            } else {
                println!("{number} is already tracked.");
            }
        }
        ManageAction::Remove { number } => {
            if reconciler.remove(number).await? {
                println!("Removed {number}.");
            } else {
                println!("{number} not found.");
            }
        }
        ManageAction::Rename { old, new } => {
            if reconciler.rename(old, new).await? {
                println!("Renamed {old} to {new}.");
            } else {
                println!("{old} not found.");
            }
        }
    }
    Ok(())
}
