//! `pbx`: inspect, check and normalize Xcode project files

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use pbx_graph::{FileReference, ReferenceError, ValidationReport};
use pbx_project::{ProjectConfig, ReferenceCheck, XcProjectFile};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const CONFIG_FILE_NAME: &str = "pbx.toml";

fn project_arg() -> Arg {
    Arg::new("project")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Path to the .xcodeproj package")
}

fn cli() -> Command {
    Command::new("pbx")
        .version(pbx_project::VERSION)
        .about("Typed object graph tools for Xcode project files")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: pbx.toml next to the project, if present)"),
        )
        .arg(
            Arg::new("reference-check")
                .long("reference-check")
                .global(true)
                .value_parser(["strict", "report", "ignore"])
                .help("Handling of dangling references and orphans while loading"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output; RUST_LOG overrides"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write logs as JSON lines"),
        )
        .subcommand(
            Command::new("validate")
                .about("Report dead references and orphaned objects")
                .arg(project_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("paths")
                .about("Print the derived path of every file reference")
                .arg(project_arg())
                .arg(
                    Arg::new("full")
                        .long("full")
                        .action(ArgAction::SetTrue)
                        .help("Resolve to filesystem paths"),
                ),
        )
        .subcommand(
            Command::new("targets")
                .about("List targets with their phases and configurations")
                .arg(project_arg()),
        )
        .subcommand(
            Command::new("normalize")
                .about("Load and write the project back")
                .arg(project_arg())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write to another .xcodeproj instead of in place"),
                )
                .arg(
                    Arg::new("sort-groups")
                        .long("sort-groups")
                        .action(ArgAction::SetTrue)
                        .help("Sort group children before writing"),
                ),
        )
}

fn init_tracing(matches: &ArgMatches) {
    let default = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if matches.get_flag("log-json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_check(value: &str) -> Result<ReferenceCheck> {
    Ok(match value {
        "strict" => ReferenceCheck::Strict,
        "report" => ReferenceCheck::Report,
        "ignore" => ReferenceCheck::Ignore,
        other => bail!("unknown reference check: {other}"),
    })
}

fn load_config(args: &ArgMatches, project: &Path) -> Result<ProjectConfig> {
    if let Some(path) = args.get_one::<PathBuf>("config") {
        return ProjectConfig::load(path).with_context(|| format!("cannot load {}", path.display()));
    }
    let discovered = project
        .parent()
        .map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), |dir| dir.join(CONFIG_FILE_NAME));
    if discovered.is_file() {
        tracing::debug!(path = %discovered.display(), "using discovered configuration");
        ProjectConfig::load(&discovered)
            .with_context(|| format!("cannot load {}", discovered.display()))
    } else {
        Ok(ProjectConfig::new())
    }
}

/// Open the project named by `args`; `fallback` applies when no check mode
/// was given on the command line
fn open(args: &ArgMatches, fallback: Option<ReferenceCheck>) -> Result<XcProjectFile> {
    let project = args
        .get_one::<PathBuf>("project")
        .context("missing project path")?;
    let mut config = load_config(args, project)?;
    match args.get_one::<String>("reference-check") {
        Some(value) => config.load.reference_check = parse_check(value)?,
        None => {
            if let Some(check) = fallback {
                config.load.reference_check = check;
            }
        }
    }
    XcProjectFile::open_with_config(project, config)
        .with_context(|| format!("cannot open {}", project.display()))
}

fn report_json(report: &ValidationReport) -> serde_json::Value {
    let errors: Vec<_> = report
        .errors()
        .iter()
        .map(|error| match error {
            ReferenceError::DeadReference {
                isa,
                id,
                key_path,
                target,
            } => json!({
                "kind": "dead_reference",
                "isa": isa.as_str(),
                "id": id.as_str(),
                "key_path": key_path,
                "target": target.as_str(),
            }),
            ReferenceError::OrphanObject { isa, id } => json!({
                "kind": "orphan",
                "isa": isa.as_str(),
                "id": id.as_str(),
            }),
        })
        .collect();
    json!({ "valid": report.is_empty(), "errors": errors })
}

fn validate(args: &ArgMatches) -> Result<bool> {
    let mut file = open(args, Some(ReferenceCheck::Report))?;
    let report = file.validate();
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else if report.is_empty() {
        println!("ok: {} objects", file.store().len());
    } else {
        println!("{report}");
    }
    Ok(report.is_empty())
}

fn paths(args: &ArgMatches) -> Result<bool> {
    let mut file = open(args, None)?;
    file.refresh_paths().context("project has no main group")?;
    let full = args.get_flag("full");
    for handle in file.store().handles_of::<FileReference>() {
        let id = handle.id();
        if full {
            match file.full_path(id) {
                Some(path) => println!("{id}  {}", path.display()),
                None => println!("{id}  -"),
            }
        } else {
            match file.element_path(id) {
                Some(path) => println!("{id}  {path}"),
                None => println!("{id}  -"),
            }
        }
    }
    Ok(true)
}

fn targets(args: &ArgMatches) -> Result<bool> {
    let file = open(args, None)?;
    let store = file.store();
    for handle in file.targets() {
        let Some(target) = store.get(&handle) else {
            continue;
        };
        println!("{} ({})", target.name, target.kind.isa());
        if let Some(product_type) = &target.product_type {
            println!("  product: {product_type}");
        }
        for phase in &target.build_phases {
            match store.get(phase) {
                Some(resolved) => println!(
                    "  phase: {} [{} files]",
                    resolved.name().unwrap_or_else(|| resolved.phase_type().isa().as_str()),
                    resolved.files.len()
                ),
                None => println!("  phase: {phase} (missing)"),
            }
        }
        if let Some(list) = store.get(&target.build_configuration_list) {
            let names: Vec<&str> = list
                .build_configurations
                .iter()
                .filter_map(|c| store.get(c))
                .map(|c| c.name.as_str())
                .collect();
            println!(
                "  configurations: {} (default {})",
                names.join(", "),
                list.default_configuration_name.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(true)
}

fn normalize(args: &ArgMatches) -> Result<bool> {
    let mut file = open(args, None)?;
    if args.get_flag("sort-groups") {
        file.sort_groups();
    }
    match args.get_one::<PathBuf>("output") {
        Some(output) => {
            file.write_to(output)
                .with_context(|| format!("cannot write {}", output.display()))?;
            println!("wrote {}", output.display());
        }
        None => {
            file.save().context("cannot write project")?;
            if let Some(location) = file.location() {
                println!("wrote {}", location.display());
            }
        }
    }
    Ok(true)
}

fn run(matches: &ArgMatches) -> Result<bool> {
    match matches.subcommand() {
        Some(("validate", args)) => validate(args),
        Some(("paths", args)) => paths(args),
        Some(("targets", args)) => targets(args),
        Some(("normalize", args)) => normalize(args),
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("no command given"),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(&matches);

    match run(&matches) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
