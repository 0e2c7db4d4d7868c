use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser as ClapParser, Subcommand};
use envgate::config::registry::split_origins;
use envgate::config::{
    platform_hints, suggest_fixes, validate, ConfigItem, ConfigStatus, EnvSnapshot, Profile, SettingsLoader,
    ToolSettings,
};
use envgate::diagnostics::{DiagnosticsRunner, HttpProber, ProbeOptions};
use envgate::gate::BuildGate;
use envgate::http_server::{AppState, HealthServer};
use envgate::resolver::EndpointResolver;
use envgate::status::{render_diagnostics, render_preflight, render_report};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Origin sent with `validate --check-cors` when none is configured
const DEFAULT_PREFLIGHT_ORIGIN: &str = "http://localhost:5173";

#[derive(ClapParser, Debug)]
#[command(name = "envgate")]
#[command(version)]
#[command(about = "Validate deployment configuration and find the backend")]
struct Args {
    /// Settings file (overrides ./envgate.toml and the user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (to stderr)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug, Default)]
struct EnvArgs {
    /// Deployment side to check
    #[arg(short, long, value_enum)]
    profile: Option<Profile>,

    /// Read settings from a dotenv file instead of the process environment
    #[arg(short, long)]
    env_file: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Default)]
struct ContextArgs {
    /// Public origin of the current service, e.g. https://frontend-shop.example.app
    #[arg(short, long)]
    origin: Option<String>,

    /// Treat the deployment as production (enables hostname conventions)
    #[arg(long)]
    production: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the environment and print a report
    Validate {
        #[command(flatten)]
        env: EnvArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Suggest values for common problems (a fresh SECRET_KEY, default CORS_ORIGINS)
        #[arg(long)]
        fix: bool,

        /// Send a CORS preflight to URL and report the allow headers, then exit
        #[arg(long, value_name = "URL")]
        check_cors: Option<String>,

        /// Only print errors
        #[arg(short, long)]
        quiet: bool,
    },

    /// Fail the build when required settings are missing or invalid
    Gate {
        #[command(flatten)]
        env: EnvArgs,

        /// Directory the audit report is written to
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the backend URL the frontend would use
    Resolve {
        #[command(flatten)]
        env: EnvArgs,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Probe the resolved backend and candidate URLs
    Diagnose {
        #[command(flatten)]
        env: EnvArgs,

        #[command(flatten)]
        context: ContextArgs,

        /// Per-probe timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve /health and /config endpoints
    Serve {
        #[command(flatten)]
        env: EnvArgs,

        #[command(flatten)]
        context: ContextArgs,

        /// HTTP port
        #[arg(long)]
        port: Option<u16>,
    },
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    // stdout carries reports, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_snapshot(env: &EnvArgs) -> Result<EnvSnapshot> {
    match &env.env_file {
        Some(path) => {
            info!("Reading environment from {:?}", path);
            EnvSnapshot::from_env_file(path)
        }
        None => Ok(EnvSnapshot::from_process_env()),
    }
}

fn context_origin(context: &ContextArgs, settings: &ToolSettings) -> String {
    context
        .origin
        .clone()
        .or_else(|| settings.origin.clone())
        .unwrap_or_default()
}

/// Preflight `url` as the configured origin and compare with CORS_ORIGINS
async fn check_cors_preflight(url: &str, snapshot: &EnvSnapshot, settings: &ToolSettings) -> Result<ExitCode> {
    let origin = settings
        .origin
        .clone()
        .unwrap_or_else(|| DEFAULT_PREFLIGHT_ORIGIN.to_string());
    let prober = HttpProber::new(&settings.diagnostics.health_path, Some(origin.clone()))?;
    let timeout = Duration::from_millis(settings.diagnostics.timeout_ms);

    let preflight = match prober.preflight(url, &origin, timeout).await {
        Ok(preflight) => preflight,
        Err(e) => {
            error!("CORS check failed");
            eprintln!("{:#}", e);
            eprintln!("Check that the URL is correct and the service is running");
            return Ok(ExitCode::FAILURE);
        }
    };

    let configured = snapshot
        .get("CORS_ORIGINS")
        .map(split_origins)
        .unwrap_or_default();
    print!("{}", render_preflight(&preflight, &configured));

    Ok(if preflight.allows_origin() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    // Tool settings see the real process environment even when the checked
    // environment comes from a file.
    let settings = SettingsLoader::new()
        .with_explicit_config(args.config.clone())
        .load(&EnvSnapshot::from_process_env())
        .context("Failed to load envgate settings")?;

    match args.command {
        Command::Validate {
            env,
            json,
            fix,
            check_cors,
            quiet,
        } => {
            let profile = env.profile.unwrap_or(settings.profile);
            let snapshot = load_snapshot(&env)?;
            let registry = profile.registry();

            if fix {
                let suggestions = suggest_fixes(registry, &snapshot)?;
                if suggestions.is_empty() {
                    println!("No common problems to fix");
                } else {
                    println!("Suggested fixes:");
                    for suggestion in &suggestions {
                        println!("  - {}", suggestion);
                    }
                }
            }

            if let Some(url) = check_cors {
                return check_cors_preflight(&url, &snapshot, &settings).await;
            }

            let report = validate(registry, &snapshot);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if !quiet {
                print!("{}", render_report(&report));
                if report.overall_status != ConfigStatus::Valid {
                    println!();
                    println!("Recommendations:");
                    for (i, rec) in report.recommendations().iter().enumerate() {
                        println!("  {}. {}", i + 1, rec);
                    }
                }

                let hints = platform_hints(&snapshot);
                if !hints.is_empty() {
                    println!();
                    println!("Deployment platform:");
                    for hint in hints {
                        println!("  - {}", hint);
                    }
                }
            }

            if report.is_invalid() {
                if quiet {
                    for failure in report.failures().filter_map(ConfigItem::error) {
                        eprintln!("{}", failure);
                    }
                }
                return Ok(ExitCode::FAILURE);
            }

            if !quiet && !json {
                println!();
                match report.overall_status {
                    ConfigStatus::Warning => println!("Configuration has warnings but is usable"),
                    _ => println!("Configuration check passed"),
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Gate { env, out_dir } => {
            let profile = env.profile.unwrap_or(settings.profile);
            let snapshot = load_snapshot(&env)?;
            let out_dir = out_dir.unwrap_or(settings.gate.out_dir);

            match BuildGate::new(profile, out_dir).run(&snapshot) {
                Ok(outcome) => {
                    println!(
                        "Configuration {} ({}), audit written to {}",
                        outcome.report.overall_status,
                        outcome.report.summary,
                        outcome.audit_path.display()
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!("Build gate failed");
                    eprintln!("{}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Command::Resolve { env, context } => {
            let snapshot = load_snapshot(&env)?;
            let production = context.production || settings.production;
            let origin = context_origin(&context, &settings);

            let resolution = EndpointResolver::default().resolve(&snapshot, &origin, production);
            info!("Resolved via {}", resolution.source);
            println!("{}", resolution.url);
            Ok(ExitCode::SUCCESS)
        }

        Command::Diagnose {
            env,
            context,
            timeout_ms,
            json,
        } => {
            let snapshot = load_snapshot(&env)?;
            let production = context.production || settings.production;
            let origin = context_origin(&context, &settings);

            let report = validate(Profile::Frontend.registry(), &snapshot);
            let mut options = ProbeOptions::from_report(&report, &settings.diagnostics);
            if let Some(ms) = timeout_ms {
                options.timeout = Duration::from_millis(ms);
            }

            let origin_header = (!origin.is_empty()).then(|| origin.clone());
            let prober = Arc::new(HttpProber::new(&options.health_path, origin_header)?);
            let runner = DiagnosticsRunner::new(prober, snapshot, origin, production)
                .with_timeout(options.timeout);
            let result = runner.run().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_diagnostics(&result));
            }

            Ok(if result.configured.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Serve { env, context, port } => {
            let profile = env.profile.unwrap_or(settings.profile);
            let snapshot = load_snapshot(&env)?;
            let state = AppState {
                snapshot,
                profile,
                origin: context_origin(&context, &settings),
                production: context.production || settings.production,
            };

            let report = state.report();
            print!("{}", render_report(&report));

            HealthServer::new(state, port.unwrap_or(settings.server.port))
                .run()
                .await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
