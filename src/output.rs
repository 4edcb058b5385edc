//! # Output Configuration
//!
//! This module controls how the CLI reports build stages: whether colour is
//! used, and the exact text of each stage line.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use monobuild::output::{stage_line, OutputConfig};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{}", stage_line(&config, module, BuildStage::BeforeBuild));
//! ```

use std::env;

use console::style;

use crate::build::BuildStage;
use crate::manifest::{Module, Selection};

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The line printed when `module` reaches `stage`.
///
/// `BUILD <name> in <path> for <version>` or `SKIP <name> in <path> for <version>`.
pub fn stage_line(config: &OutputConfig, module: &Module, stage: BuildStage) -> String {
    let verb = match stage {
        BuildStage::BeforeBuild => style("BUILD").green().bold(),
        BuildStage::SkipBuild => style("SKIP").yellow(),
    }
    .force_styling(config.use_color);

    format!(
        "{} {} in {} for {}",
        verb,
        style(module.name()).bold().force_styling(config.use_color),
        display_path(module.path()),
        module.version()
    )
}

/// One line of `describe` output: name, path, version and selection.
pub fn describe_line(config: &OutputConfig, module: &Module) -> String {
    let selection = style(module.selection().to_string()).force_styling(config.use_color);
    let selection = match module.selection() {
        Selection::Changed | Selection::All => selection.cyan(),
        Selection::Dependent => selection.magenta(),
        Selection::Carried => selection.dim(),
        Selection::Removed => selection.red(),
    };
    format!(
        "{:<24} {:<32} {} {}",
        module.name(),
        display_path(module.path()),
        module.version(),
        selection
    )
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}
