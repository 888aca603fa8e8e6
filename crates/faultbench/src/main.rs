use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use faultbench::logging::init_tracing;
use faultbench::prelude::*;
use faultbench::{resolve_agent_url, resolve_prompt, HarnessError};
use faultbench_catalog::{filter_failures, parse_duration};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Exit status of `run --strict` when any failure did not pass
const EXIT_NOT_ALL_PASSED: i32 = 2;
/// Exit status when a run was interrupted
const EXIT_CANCELLED: i32 = 130;

fn cli() -> Command {
    Command::new("faultbench")
        .version(faultbench::VERSION)
        .about("Inject failures, ask diagnostic agents, score their answers")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .global(true)
                .env("FAULTBENCH_CATALOG")
                .default_value("catalog/failures.yaml")
                .value_parser(value_parser!(PathBuf))
                .help("Failure catalog (YAML)"),
        )
        .arg(
            Arg::new("category")
                .long("category")
                .global(true)
                .action(ArgAction::Append)
                .value_delimiter(',')
                .help("Only failures in these categories"),
        )
        .arg(
            Arg::new("id")
                .long("id")
                .global(true)
                .action(ArgAction::Append)
                .value_delimiter(',')
                .help("Only these failure ids (union with --category)"),
        )
        .arg(
            Arg::new("conn-str")
                .long("conn-str")
                .global(true)
                .env("FAULTBENCH_CONN_STR")
                .hide_env_values(true)
                .help("Primary database connection string"),
        )
        .arg(
            Arg::new("replica-conn-str")
                .long("replica-conn-str")
                .global(true)
                .env("FAULTBENCH_REPLICA_CONN_STR")
                .hide_env_values(true)
                .help("Replica database connection string"),
        )
        .arg(
            Arg::new("db-agent-url")
                .long("db-agent-url")
                .global(true)
                .env("FAULTBENCH_DB_AGENT_URL")
                .help("Database agent endpoint"),
        )
        .arg(
            Arg::new("k8s-agent-url")
                .long("k8s-agent-url")
                .global(true)
                .env("FAULTBENCH_K8S_AGENT_URL")
                .help("Kubernetes agent endpoint"),
        )
        .arg(
            Arg::new("orchestrator-url")
                .long("orchestrator-url")
                .global(true)
                .env("FAULTBENCH_ORCHESTRATOR_URL")
                .help("Orchestrator endpoint for compound failures"),
        )
        .arg(
            Arg::new("kube-context")
                .long("kube-context")
                .global(true)
                .env("FAULTBENCH_KUBE_CONTEXT")
                .help("kubectl context"),
        )
        .arg(
            Arg::new("scripts-root")
                .long("scripts-root")
                .global(true)
                .default_value("scripts")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding SQL and shell scripts"),
        )
        .arg(
            Arg::new("overlays-root")
                .long("overlays-root")
                .global(true)
                .default_value("overlays")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding kustomize overlays"),
        )
        .arg(
            Arg::new("compose-file")
                .long("compose-file")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Use `docker compose -f <file>` for service control"),
        )
        .arg(
            Arg::new("container")
                .long("container")
                .global(true)
                .default_value("postgres")
                .help("Container for script injections that name none"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
        .subcommand(Command::new("list").about("List catalog failures"))
        .subcommand(
            Command::new("run")
                .about("Run the selected failures and report")
                .arg(
                    Arg::new("results-dir")
                        .long("results-dir")
                        .default_value("results")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for JSON reports"),
                )
                .arg(
                    Arg::new("run-id")
                        .long("run-id")
                        .help("Run identifier (default: run-<ulid>)"),
                )
                .arg(
                    Arg::new("deadline")
                        .long("deadline")
                        .value_parser(parse_duration)
                        .help("Stop the run after this long, e.g. 15m"),
                )
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Exit 2 unless every failure passed"),
                ),
        )
        .subcommand(Command::new("inject").about("Inject one failure (--id) and leave it in place"))
        .subcommand(Command::new("teardown").about("Tear down one failure (--id)"))
}

fn string_arg(args: &ArgMatches, name: &str) -> String {
    args.get_one::<String>(name).cloned().unwrap_or_default()
}

fn list_arg(args: &ArgMatches, name: &str) -> Vec<String> {
    args.get_many::<String>(name)
        .map(|values| {
            values
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn build_config(args: &ArgMatches) -> HarnessConfig {
    let optional = |name: &str| Some(string_arg(args, name)).filter(|v| !v.is_empty());
    let categories = list_arg(args, "category")
        .into_iter()
        .map(Category::from)
        .collect();

    let mut config = HarnessConfig::new()
        .with_conn_str(string_arg(args, "conn-str"))
        .with_replica_conn_str(string_arg(args, "replica-conn-str"))
        .with_kube_context(string_arg(args, "kube-context"))
        .with_agents(AgentEndpoints {
            db: optional("db-agent-url"),
            k8s: optional("k8s-agent-url"),
            orchestrator: optional("orchestrator-url"),
        })
        .with_filters(categories, list_arg(args, "id"));

    if let Some(scripts) = args.get_one::<PathBuf>("scripts-root") {
        config.scripts_root.clone_from(scripts);
    }
    if let Some(overlays) = args.get_one::<PathBuf>("overlays-root") {
        config.overlays_root.clone_from(overlays);
    }
    if let Some(container) = args.get_one::<String>("container") {
        config.default_container.clone_from(container);
    }
    config.compose_file = args.get_one::<PathBuf>("compose-file").cloned();
    config
}

fn load(args: &ArgMatches) -> anyhow::Result<Catalog> {
    let path = args
        .get_one::<PathBuf>("catalog")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("catalog/failures.yaml"));
    let catalog = load_catalog(&path)
        .with_context(|| format!("loading catalog {}", path.display()))?;
    tracing::debug!(path = %path.display(), failures = catalog.len(), "catalog loaded");
    Ok(catalog)
}

fn harness(config: HarnessConfig) -> Harness {
    Harness::new(config, Arc::new(ProcessExecutor), Arc::new(HttpAgentClient::new()))
}

async fn shutdown_signal(deadline: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::warn!("interrupted");
    };

    match deadline {
        Some(deadline) => tokio::select! {
            () = ctrl_c => {}
            () = tokio::time::sleep(deadline) => {
                tracing::warn!(deadline_secs = deadline.as_secs(), "run deadline reached");
            }
        },
        None => ctrl_c.await,
    }
}

fn cmd_list(args: &ArgMatches) -> anyhow::Result<i32> {
    let catalog = load(args)?;
    let config = build_config(args);
    if catalog.is_empty() {
        println!("catalog {} has no failures", catalog.version);
        return Ok(0);
    }
    let selected = filter_failures(&catalog, &config.categories, &config.ids);

    println!("{:<32} {:<12} {:<10} NAME", "ID", "CATEGORY", "SEVERITY");
    for f in &selected {
        println!("{:<32} {:<12} {:<10} {}", f.id, f.category, f.severity, f.name);
    }
    println!();
    println!("{} of {} failures", selected.len(), catalog.len());
    Ok(0)
}

async fn cmd_run(args: &ArgMatches) -> anyhow::Result<i32> {
    let catalog = load(args)?;
    let mut config = build_config(args);
    if let Some(dir) = args.get_one::<PathBuf>("results-dir") {
        config.results_dir.clone_from(dir);
    }
    let selected = select_failures(&catalog, &config)?;

    let run_id = args
        .get_one::<String>("run-id")
        .cloned()
        .unwrap_or_else(new_run_id);
    let results_dir = config.results_dir.clone();
    let deadline = args.get_one::<Duration>("deadline").copied();

    tracing::info!(run_id = %run_id, failures = selected.len(), "starting run");
    let outcome = harness(config)
        .run_all(&selected, shutdown_signal(deadline))
        .await;

    let report = build_report(run_id, outcome.results);
    print!("{}", report.generate_text());

    let path = report
        .write_json(&results_dir)
        .context("writing JSON report")?;
    tracing::info!(path = %path.display(), "report written");

    if outcome.cancelled {
        return Ok(EXIT_CANCELLED);
    }
    if args.get_flag("strict") && !report.all_passed() {
        return Ok(EXIT_NOT_ALL_PASSED);
    }
    Ok(0)
}

fn single_failure<'a>(catalog: &'a Catalog, config: &HarnessConfig) -> anyhow::Result<&'a Failure> {
    let [id] = config.ids.as_slice() else {
        anyhow::bail!(HarnessError::MissingFlag("--id"));
    };
    catalog
        .find(id)
        .ok_or_else(|| HarnessError::UnknownFailure(id.clone()).into())
}

async fn cmd_inject(args: &ArgMatches) -> anyhow::Result<i32> {
    let catalog = load(args)?;
    let config = build_config(args);
    let failure = single_failure(&catalog, &config)?;

    let effective = harness(config)
        .inject_only(failure)
        .await
        .with_context(|| format!("injecting {}", failure.id))?;

    println!("Injected {} ({})", failure.id, failure.inject.kind());
    if let Ok(url) = resolve_agent_url(&failure.category, &effective) {
        println!("Agent:  {url}");
    }
    println!("Prompt: {}", resolve_prompt(&failure.prompt, &effective));
    Ok(0)
}

async fn cmd_teardown(args: &ArgMatches) -> anyhow::Result<i32> {
    let catalog = load(args)?;
    let config = build_config(args);
    let failure = single_failure(&catalog, &config)?;

    harness(config)
        .teardown_only(failure)
        .await
        .with_context(|| format!("tearing down {}", failure.id))?;

    println!("Tore down {}", failure.id);
    Ok(0)
}

async fn dispatch(matches: &ArgMatches) -> anyhow::Result<i32> {
    match matches.subcommand() {
        Some(("list", args)) => cmd_list(args),
        Some(("run", args)) => cmd_run(args).await,
        Some(("inject", args)) => cmd_inject(args).await,
        Some(("teardown", args)) => cmd_teardown(args).await,
        _ => {
            cli().print_help()?;
            Ok(1)
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let json_logs = matches
        .subcommand()
        .is_some_and(|(_, args)| args.get_flag("log-json"));
    init_tracing(json_logs);

    match dispatch(&matches).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn comma_lists_and_repeats_merge() {
        let matches = cli()
            .try_get_matches_from([
                "faultbench",
                "list",
                "--category",
                "database,Kubernetes",
                "--id",
                "a",
                "--id",
                "b",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let config = build_config(args);
        assert_eq!(config.categories, vec![Category::Database, Category::Kubernetes]);
        assert_eq!(config.ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn deadline_uses_duration_syntax() {
        let matches = cli()
            .try_get_matches_from(["faultbench", "run", "--deadline", "1m30s", "--strict"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(
            args.get_one::<Duration>("deadline").copied(),
            Some(Duration::from_secs(90))
        );
        assert!(args.get_flag("strict"));

        assert!(cli()
            .try_get_matches_from(["faultbench", "run", "--deadline", "soon"])
            .is_err());
    }
}
