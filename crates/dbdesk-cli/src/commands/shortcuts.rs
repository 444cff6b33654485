use anyhow::{Result, bail};
use dbdesk_shortcuts::{KeyCombo, ShortcutDispatcher, ShortcutMap};
use dbdesk_storage::FileStore;
use std::sync::Arc;

use crate::cli::ShortcutCommands;

pub fn handle(cmd: ShortcutCommands) -> Result<()> {
    let store = FileStore::open_default()?;
    let dispatcher = ShortcutDispatcher::new(Arc::new(store));
    run(&dispatcher, cmd)
}

fn run(dispatcher: &ShortcutDispatcher, cmd: ShortcutCommands) -> Result<()> {
    match cmd {
        ShortcutCommands::List => {
            let map = dispatcher.shortcuts();
            let width = map.iter().map(|(action, _)| action.len()).max().unwrap_or(0);
            for (action, combos) in map.iter() {
                let labels: Vec<String> = combos
                    .iter()
                    .map(|combo| combo.label(dispatcher.os()))
                    .collect();
                let shown = if labels.is_empty() {
                    "(unassigned)".to_string()
                } else {
                    labels.join(", ")
                };
                println!("{:width$}  {}", action, shown, width = width);
            }
        }
        ShortcutCommands::Set { action, combo } => {
            if ShortcutMap::defaults().get(&action).is_none()
                && dispatcher.shortcuts().get(&action).is_none()
            {
                bail!("Unknown action '{}'", action);
            }
            let combo: KeyCombo = combo.parse()?;
            let rebind = dispatcher.rebind(&action, combo)?;

            println!(
                "{} -> {}",
                rebind.action,
                rebind.combo.label(dispatcher.os())
            );
            if !rebind.conflicts.is_empty() {
                println!("Also bound to: {}", rebind.conflicts.join(", "));
            }
        }
        ShortcutCommands::Reset => {
            dispatcher.reset_shortcuts();
            println!("Shortcuts restored to defaults");
        }
    }
    Ok(())
}
