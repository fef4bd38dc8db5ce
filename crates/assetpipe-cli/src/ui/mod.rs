//! Terminal output helpers.
//!
//! Status lines go to stderr so that commands printing data (`tags`,
//! `render`) keep a clean stdout.
//!
//! ```no_run
//! use assetpipe_cli::ui;
//!
//! ui::init_colors();
//! ui::success("Assets built");
//! ui::warning("No bundles declared");
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

mod format;
mod messages;

pub use format::{format_duration, print_mapping_summary};
pub use messages::{error, info, success, warning};

/// Check if color output should be enabled.
///
/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise colors follow whether
/// stderr is attended.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::user_attended_stderr()
}

static COLORS: AtomicBool = AtomicBool::new(true);

/// Decide once whether status lines are colored.
pub fn init_colors() {
    COLORS.store(should_use_color(), Ordering::Relaxed);
}

/// Disable colors regardless of the environment (`--no-color`).
pub fn disable_colors() {
    COLORS.store(false, Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}
