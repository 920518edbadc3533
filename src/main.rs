use std::path::PathBuf;
use std::process::ExitCode;

use aclgate::authz::{load_policies, Authorizer};
use aclgate::settings::Settings;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "aclgate",
    version,
    about = "Role/resource access control decisions"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Policy file or directory, overriding `policy.path` from the settings
    #[arg(short, long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the access control list and report what it contains
    Validate,
    /// Decide whether a role may access a resource
    Check {
        role: String,
        #[arg(short, long)]
        resource: Option<String>,
        #[arg(short = 'P', long)]
        privilege: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // load settings
    let mut settings = Settings::load(&cli.config)?;
    if let Some(policy) = cli.policy {
        settings.policy.path = policy;
    }

    // logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    tracing::debug!(?settings, "Loaded configuration");

    let store = load_policies(&settings.policy.path)?;

    match cli.command {
        Command::Validate => {
            println!(
                "ok: {} roles, {} resources, {} rules",
                store.roles().count(),
                store.resources().count(),
                store.rule_count()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            role,
            resource,
            privilege,
        } => {
            let authz = Authorizer::new(store);
            if authz.is_granted(Some(role.as_str()), resource.as_deref(), privilege.as_deref()) {
                println!("allowed");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("denied");
                Ok(ExitCode::from(1))
            }
        }
    }
}
