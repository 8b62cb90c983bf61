//! # Harbor Configuration Check
//!
//! Loads the reconciler configuration for the detected environment (or the
//! one given as the first argument), validates it and prints the result.
//!
//! ```text
//! harbor-config-check [environment] [config-dir]
//! ```

use anyhow::Context;
use harbor_reconciler::config::ConfigManager;
use harbor_reconciler::logging::init_structured_logging_with;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let environment = args
        .next()
        .unwrap_or_else(ConfigManager::detect_environment);
    let config_dir = args.next().map(PathBuf::from);

    let manager = ConfigManager::load_from_directory_with_env(config_dir, &environment)
        .with_context(|| format!("configuration for environment '{environment}' is invalid"))?;

    init_structured_logging_with(&manager.config().logging);

    println!("✅ Configuration valid");
    println!("   - Environment: {}", manager.environment());
    println!(
        "   - Directory: {}",
        manager.config_directory().display()
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&manager.debug_config())
            .context("failed to render configuration")?
    );
    Ok(())
}
