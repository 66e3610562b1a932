use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 16] = [
        "RUST_LOG",
        "SPG_HOST",
        "SPG_PORT",
        "SPG_DATABASE_URL",
        "SPG_MAX_DB_CONNECTIONS",
        "SPG_TX_TIMEOUT_SECS",
        "SPG_SHIPPING_FEE_CENTS",
        "SPG_TAX_RATE_BPS",
        "SPG_REAPER_ENABLED",
        "SPG_REAPER_INTERVAL_MINS",
        "SPG_STALE_ORDER_THRESHOLD_MINS",
        "SPG_JWT_ISSUER",
        "SPG_JWT_AUDIENCE",
        "SPG_STRIPE_API_BASE",
        "SPG_STRIPE_CURRENCY",
        "SPG_STRIPE_WEBHOOK_TOLERANCE_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
