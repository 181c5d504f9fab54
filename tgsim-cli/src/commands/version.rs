//! Version command - show version information.

use anyhow::Result;

/// Version information.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command.
pub fn run() -> Result<()> {
    println!("tgsim - admin client for the Telegram chat-simulation backend");
    println!();
    println!("Version:     {}", VERSION);
    println!(
        "Platform:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!();
    println!("Components:");
    println!("  tgsim-core    Providers, session, preferences, config, tracing");
    println!("  tgsim-client  REST client, realtime stream, metrics feed");
    println!("  tgsim-cli     Command-line interface");

    Ok(())
}
