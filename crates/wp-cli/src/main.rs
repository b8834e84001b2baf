use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use wp_cli::{commands, logging, CliConfig, DraftFile, GatewayKind};
use wp_provision::Provisioner;

const TOKEN_ENV: &str = "WP_API_TOKEN";

fn cli() -> Command {
    let draft = Arg::new("draft")
        .long("draft")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Draft file (.yaml, .yml or .json)");
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON");

    Command::new("wp")
        .version(wp_cli::VERSION)
        .about("Validate and provision Program/Activity/Task workplans")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a draft stage by stage and print the plan")
                .arg(draft.clone())
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("provision")
                .about("Create the draft's records through a gateway and verify them")
                .arg(draft)
                .arg(
                    Arg::new("gateway")
                        .long("gateway")
                        .value_parser(["memory", "rest"])
                        .help("Backend to provision into"),
                )
                .arg(
                    Arg::new("base-url")
                        .long("base-url")
                        .help("REST backend base URL"),
                )
                .arg(json),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<CliConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => CliConfig::load(path),
        None => Ok(CliConfig::default()),
    }
}

fn load_draft(args: &ArgMatches) -> anyhow::Result<DraftFile> {
    let path = args
        .get_one::<PathBuf>("draft")
        .context("--draft is required")?;
    DraftFile::load(Path::new(path))
}

fn emit<T: Serialize + Display>(report: &T, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

async fn run(matches: ArgMatches) -> anyhow::Result<bool> {
    let mut config = load_config(&matches)?;
    logging::init(&config.log);

    match matches.subcommand() {
        Some(("validate", args)) => {
            let builder = load_draft(args)?.into_builder()?;
            let report = commands::validate(&builder);
            emit(&report, args.get_flag("json"))?;
            Ok(report.is_complete())
        }
        Some(("provision", args)) => {
            let builder = load_draft(args)?.into_builder()?;
            if let Some(kind) = args.get_one::<String>("gateway") {
                config.gateway = kind.parse::<GatewayKind>()?;
            }
            if let Some(url) = args.get_one::<String>("base-url") {
                config.rest.base_url.clone_from(url);
            }
            if let Ok(token) = std::env::var(TOKEN_ENV) {
                config.rest.api_token = Some(token);
            }
            tracing::info!(gateway = ?config.gateway, "provisioning draft");

            let gateway = commands::gateway_for(&config)?;
            let provisioner = Provisioner::with_config(gateway, config.provision)?;
            let report = commands::provision(&builder, &provisioner).await;
            emit(&report, args.get_flag("json"))?;
            Ok(report.is_success())
        }
        _ => Ok(false),
    }
}

#[tokio::main]
async fn main() {
    match run(cli().get_matches()).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(2);
        }
    }
}
