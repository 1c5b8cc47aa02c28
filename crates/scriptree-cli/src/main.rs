//! `scriptree` - compile and check stored element trees from fixture files

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indexmap::IndexMap;
use scriptree_compiler::{inject_variables, CompileOptions, TreeCompiler, VariableRegistry};
use scriptree_engine::ElementReader;
use scriptree_model::NodeId;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod fixture;

fn fixture_arg() -> Arg {
    Arg::new("fixture")
        .long("fixture")
        .short('f')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Table snapshot (.json, .yaml or .yml)")
}

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_parser(value_parser!(NodeId))
        .help(help)
}

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

fn cli() -> Command {
    Command::new("scriptree")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compile and check stored test-script trees")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines (filter with RUST_LOG)"),
        )
        .subcommand(
            Command::new("compile")
                .about("Compile a tree into an execution document")
                .arg(fixture_arg())
                .arg(id_arg("root", "Root node to compile").required(true))
                .arg(id_arg("group", "Only this group (plus setup/teardown)"))
                .arg(id_arg("sampler", "Only up to this sampler"))
                .arg(flag("self-only", "Drop setup/teardown or sibling samplers too"))
                .arg(flag("no-sampler", "Drop every sampler"))
                .arg(flag("no-scaffolding", "Drop setup and teardown groups"))
                .arg(
                    Arg::new("datasets")
                        .long("datasets")
                        .value_parser(value_parser!(PathBuf))
                        .help("Variable dataset file"),
                )
                .arg(
                    Arg::new("dataset")
                        .long("dataset")
                        .action(ArgAction::Append)
                        .help("Dataset id to apply; repeatable"),
                )
                .arg(flag("use-current", "Prefer current variable values"))
                .arg(
                    Arg::new("var")
                        .long("var")
                        .action(ArgAction::Append)
                        .help("Extra variable NAME=VALUE; VALUE may be ${other}"),
                ),
        )
        .subcommand(
            Command::new("compile-snippet")
                .about("Compile a snippet collection on its own")
                .arg(fixture_arg())
                .arg(id_arg("snippet", "Snippet collection").required(true)),
        )
        .subcommand(
            Command::new("tree")
                .about("Print the ordered listing of a tree")
                .arg(fixture_arg())
                .arg(id_arg("root", "Root node").required(true))
                .arg(flag("shallow", "Direct children only")),
        )
        .subcommand(
            Command::new("check")
                .about("Verify sibling order, roots and acyclicity")
                .arg(fixture_arg())
                .arg(flag("json", "Print violations as JSON")),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn path(args: &ArgMatches) -> Result<&PathBuf> {
    args.get_one::<PathBuf>("fixture")
        .context("--fixture is required")
}

fn node(args: &ArgMatches, name: &str) -> Option<NodeId> {
    args.get_one::<NodeId>(name).copied()
}

fn parse_vars(args: &ArgMatches) -> Result<IndexMap<String, String>> {
    let mut vars = IndexMap::new();
    for raw in args.get_many::<String>("var").into_iter().flatten() {
        let Some((name, value)) = raw.split_once('=') else {
            bail!("--var expects NAME=VALUE, got {raw}");
        };
        vars.insert(name.to_string(), value.to_string());
    }
    Ok(vars)
}

fn compile(args: &ArgMatches) -> Result<()> {
    let tables = fixture::load_tables(path(args)?)?;
    let root = node(args, "root").context("--root is required")?;
    let options = CompileOptions {
        group: node(args, "group"),
        sampler: node(args, "sampler"),
        self_only: args.get_flag("self-only"),
        no_sampler: args.get_flag("no-sampler"),
        no_scaffolding: args.get_flag("no-scaffolding"),
    };

    let compiler = TreeCompiler::new(Arc::new(tables));
    let mut document = compiler.compile(root, &options)?;

    let datasets: Vec<String> = args
        .get_many::<String>("dataset")
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    let registry = match args.get_one::<PathBuf>("datasets") {
        Some(path) => fixture::load_datasets(path)?,
        None => VariableRegistry::new(),
    };
    inject_variables(
        &mut document,
        &registry,
        &datasets,
        args.get_flag("use-current"),
        &parse_vars(args)?,
    )?;

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn compile_snippet(args: &ArgMatches) -> Result<()> {
    let tables = fixture::load_tables(path(args)?)?;
    let snippet = node(args, "snippet").context("--snippet is required")?;
    let document = TreeCompiler::new(Arc::new(tables)).compile_snippet(snippet)?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn tree(args: &ArgMatches) -> Result<()> {
    let tables = fixture::load_tables(path(args)?)?;
    let root = node(args, "root").context("--root is required")?;
    let listing = ElementReader::new(&tables).tree(root, !args.get_flag("shallow"))?;
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

/// Returns whether the fixture is consistent
fn check(args: &ArgMatches) -> Result<bool> {
    let fixture = path(args)?;
    let tables = fixture::load_tables(fixture)?;
    let violations = tables.verify();
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&violations)?);
    } else if violations.is_empty() {
        println!("{}: {} nodes, consistent", fixture.display(), tables.len());
    } else {
        println!("{}: {} violation(s)", fixture.display(), violations.len());
        for violation in &violations {
            println!("  {violation}");
        }
    }
    info!(nodes = tables.len(), violations = violations.len(), "check finished");
    Ok(violations.is_empty())
}

fn run(matches: &ArgMatches) -> Result<bool> {
    match matches.subcommand() {
        Some(("compile", args)) => compile(args).map(|()| true),
        Some(("compile-snippet", args)) => compile_snippet(args).map(|()| true),
        Some(("tree", args)) => tree(args).map(|()| true),
        Some(("check", args)) => check(args),
        _ => bail!("unknown command"),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
