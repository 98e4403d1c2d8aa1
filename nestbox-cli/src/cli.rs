use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nestbox::{InitPolicy, NestboxOptions, NestboxRuntime};

use crate::commands;

#[derive(Parser, Debug)]
#[command(name = "nestbox", version, about = "Component lifecycle demonstrations")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Static, dynamic and mixed allocation side by side
    Classical(commands::classical::ClassicalArgs),

    /// Allocate, init, configure and release through the component API
    #[command(name = "three-step")]
    ThreeStep(commands::three_step::ThreeStepArgs),

    /// Configure a composite before initializing it
    Premature(commands::premature::PrematureArgs),
}

#[derive(Args, Debug)]
pub struct GlobalFlags {
    /// Report configuration before init as an error
    #[arg(long, global = true)]
    pub strict: bool,

    /// Refuse allocations beyond N live ones
    #[arg(long, global = true, value_name = "N")]
    pub allocation_budget: Option<usize>,

    /// JSON options file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print status lines as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn", value_name = "LEVEL")]
    pub log_level: String,
}

impl GlobalFlags {
    /// Options from the config file, then the environment, then flags.
    pub fn options(&self) -> anyhow::Result<NestboxOptions> {
        let options = match &self.config {
            Some(path) => NestboxOptions::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => NestboxOptions::default(),
        };
        let mut options = options.with_env()?;

        if self.strict {
            options.init_policy = InitPolicy::Strict;
        }
        if let Some(budget) = self.allocation_budget {
            options.allocation_budget = Some(budget);
        }
        Ok(options)
    }

    pub fn create_runtime(&self) -> anyhow::Result<NestboxRuntime> {
        let options = self.options()?;
        tracing::debug!(?options, "Creating runtime");
        Ok(NestboxRuntime::new(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "nestbox",
            "--strict",
            "--allocation-budget",
            "5",
            "classical",
        ])
        .unwrap();
        assert!(cli.global.strict);
        assert_eq!(cli.global.allocation_budget, Some(5));
        assert!(matches!(cli.command, Commands::Classical(_)));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["nestbox", "three-step", "--json"]).unwrap();
        assert!(cli.global.json);
        assert_eq!(cli.global.log_level, "warn");
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(Cli::try_parse_from(["nestbox", "modern"]).is_err());
    }
}
