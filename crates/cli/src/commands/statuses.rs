//! Status registry inspection.
//!
//! # Usage
//!
//! ```bash
//! # Built-in registry, or the one named by ORDER_STATUSES_FILE
//! storekeep statuses
//!
//! # Check a custom statuses file before deploying it
//! storekeep statuses --file statuses.yaml
//! ```

use std::fmt::Write as _;
use std::path::PathBuf;

use storekeep_orders::config::OrdersConfig;
use storekeep_orders::state::load_registry;
use storekeep_orders::{OrderError, StatusRegistry};

/// Print every state with its statuses and default.
///
/// # Errors
///
/// Returns `OrderError::Configuration` if the statuses file is invalid.
pub fn run(config: &OrdersConfig, file: Option<PathBuf>) -> Result<(), OrderError> {
    let config = OrdersConfig {
        statuses_file: file.or_else(|| config.statuses_file.clone()),
        ..config.clone()
    };
    let registry = load_registry(&config)?;

    #[allow(clippy::print_stdout)]
    {
        print!("{}", render(&registry));
    }
    Ok(())
}

fn render(registry: &StatusRegistry) -> String {
    let mut out = String::new();
    for state in registry.states() {
        let default = registry
            .default_status(&state.id)
            .map_or_else(|_| "(none)".to_string(), |status| status.id.to_string());
        let pinned = if registry.is_pinned(&state.id) { ", pinned" } else { "" };
        let _ = writeln!(out, "{} ({}) default: {default}{pinned}", state.title, state.id);
        for status in registry.statuses_for_state(&state.id) {
            let locked = if status.locked { " [locked]" } else { "" };
            let _ = writeln!(out, "  {:>4}  {:<20} {}{locked}", status.weight, status.id.as_str(), status.name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_builtin() {
        let out = render(&StatusRegistry::builtin());
        assert!(out.contains("Post checkout (post_checkout) default: pending\n"));
        assert!(out.contains("     5  processing           Processing [locked]\n"));
    }
}
