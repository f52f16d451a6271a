//! actions command - List registered actions by category

use anyhow::{bail, Result};

use super::Session;
use crate::ui::output::{self, Verbosity};

/// List actions, grouped by category in display order.
pub fn actions(session: &Session, category: Option<&str>) -> Result<()> {
    let registry = &session.catalog.actions;
    let categories = match category {
        Some(c) if registry.in_category(c).is_empty() => {
            bail!(
                "Unknown category '{c}'. Known categories: {}",
                registry.categories().join(", ")
            )
        }
        Some(c) => vec![c.to_string()],
        None => registry.categories(),
    };

    let width = registry
        .list()
        .iter()
        .map(|a| a.name.len())
        .max()
        .unwrap_or(0);

    for (i, category) in categories.iter().enumerate() {
        let actions = registry.in_category(category);
        if session.verbosity == Verbosity::Quiet {
            for action in actions {
                output::result(&action.name);
            }
            continue;
        }
        if i > 0 {
            output::print("", session.verbosity);
        }
        output::print(format!("{category}:"), session.verbosity);
        for action in actions {
            let mut row = output::format_row(&action.name, width, &action.help);
            if session.catalog.combos.get(&action.name).is_some() {
                row.push_str(" [form]");
            }
            output::print(format!("  {row}"), session.verbosity);
        }
    }
    Ok(())
}
