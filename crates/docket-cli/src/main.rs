//! `docket` command line
//!
//! Works on a catalog JSON file: validate it, list its products, render a
//! product for a month, or publish the next version of a document.

#![warn(unreachable_pub)]

mod commands;
mod render;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use commands::{Publication, Workspace};
use docket_model::MonthScope;
use docket_store::{DocketConfig, Role};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn product_arg() -> Arg {
    Arg::new("product")
        .long("product")
        .short('p')
        .required(true)
        .help("Product id")
}

fn period_args() -> [Arg; 2] {
    [
        Arg::new("month")
            .long("month")
            .value_parser(value_parser!(u8).range(1..=12))
            .help("Month 1-12 (default: current month)"),
        Arg::new("year")
            .long("year")
            .value_parser(value_parser!(i32))
            .help("Year (default: current year)"),
    ]
}

fn cli() -> Command {
    Command::new("docket")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Versioned product documents: roadmaps, release goals, plans, metrics and notes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .short('c')
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Catalog JSON file holding { portfolios, products }"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(Command::new("check").about("Validate the catalog"))
        .subcommand(Command::new("list").about("List portfolios and their products"))
        .subcommand(
            Command::new("view")
                .about("Show the latest documents of a product for a month")
                .arg(product_arg())
                .args(period_args())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("publish")
                .about("Publish the next version of a document")
                .arg(
                    Arg::new("kind")
                        .required(true)
                        .value_parser(["roadmap", "release-goal", "release-plan", "release-note"])
                        .help("Document kind"),
                )
                .arg(product_arg())
                .args(period_args())
                .arg(
                    Arg::new("link")
                        .long("link")
                        .help("Document link (roadmap, release-note)"),
                )
                .arg(
                    Arg::new("items")
                        .long("items")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of goal or plan items (release-goal, release-plan)"),
                )
                .arg(
                    Arg::new("role")
                        .long("role")
                        .default_value("editor")
                        .value_parser(["viewer", "editor", "admin"])
                        .help("Role to write as"),
                ),
        )
}

fn init_tracing(config: &DocketConfig, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn period(args: &ArgMatches) -> Result<MonthScope> {
    let today = Utc::now().date_naive();
    let year = args.get_one::<i32>("year").copied().unwrap_or(today.year());
    let month = match args.get_one::<u8>("month") {
        Some(month) => *month,
        None => MonthScope::containing(today).month(),
    };
    Ok(MonthScope::new(month, year)?)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("--{name} is required"))
}

fn publication(args: &ArgMatches) -> Result<Publication> {
    let items = args.get_one::<PathBuf>("items").map(PathBuf::as_path);
    Ok(match required(args, "kind")? {
        "roadmap" => Publication::Roadmap {
            link: required(args, "link")?.to_string(),
        },
        "release-note" => Publication::ReleaseNote {
            link: required(args, "link")?.to_string(),
        },
        "release-goal" => Publication::ReleaseGoal {
            goals: commands::read_items(items)?,
        },
        "release-plan" => Publication::ReleasePlan {
            items: commands::read_items(items)?,
        },
        other => bail!("unknown document kind {other}"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => DocketConfig::load(path)?,
        None => DocketConfig::default(),
    };
    init_tracing(&config, matches.get_flag("log-json"));

    let catalog = matches
        .get_one::<PathBuf>("catalog")
        .context("--catalog is required")?;
    let workspace = Workspace::open(catalog, config).await?;

    let output = match matches.subcommand() {
        Some(("check", _)) => commands::check(&workspace).await?,
        Some(("list", _)) => commands::list(&workspace).await?,
        Some(("view", args)) => {
            commands::view(
                &workspace,
                required(args, "product")?,
                period(args)?,
                args.get_flag("json"),
            )
            .await?
        }
        Some(("publish", args)) => {
            let role: Role = required(args, "role")?.parse()?;
            commands::publish(
                &workspace,
                role,
                required(args, "product")?,
                period(args)?,
                publication(args)?,
            )
            .await?
        }
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("no command given"),
    };

    println!("{}", output.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn view_arguments_parse() {
        let matches = cli()
            .try_get_matches_from([
                "docket", "--catalog", "catalog.json", "view", "-p", "p-atlas", "--month", "4",
                "--year", "2025",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "view");
        assert_eq!(required(args, "product").unwrap(), "p-atlas");
        assert_eq!(period(args).unwrap(), MonthScope::new(4, 2025).unwrap());
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        let result = cli().try_get_matches_from([
            "docket", "-c", "catalog.json", "view", "-p", "p-atlas", "--month", "13",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn publish_needs_link_for_notes() {
        let matches = cli()
            .try_get_matches_from([
                "docket", "-c", "catalog.json", "publish", "release-note", "-p", "p-atlas",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert!(publication(args).is_err());
        assert_eq!(required(args, "role").unwrap(), "editor");
    }
}
