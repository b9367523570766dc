//! `photofit` command-line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use photofit_cli::{logging, plan_text, CompressionReport, ConfigError, Overrides, PhotofitConfig};
use photofit_core::{plan, ResourceRef};
use photofit_image::filesystem_compressor;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn cli() -> Command {
    Command::new("photofit")
        .version(photofit_cli::VERSION)
        .about("Compress captured photos to fit an upload budget")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("compress")
                .about("Compress one image")
                .arg(
                    Arg::new("source")
                        .required(true)
                        .help("Path or file:// URI of the image"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .value_parser(value_parser!(PathBuf))
                        .help("Copy the result here instead of leaving it in the scratch directory"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("max-bytes")
                        .long("max-bytes")
                        .value_parser(value_parser!(u64))
                        .help("Size budget in bytes"),
                )
                .arg(
                    Arg::new("scratch-dir")
                        .long("scratch-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for encoded outputs"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_parser(value_parser!(u64))
                        .help("Abort after this many seconds"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("plan")
                .about("Print the worst-case decay schedule")
                .arg(config_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration")
                .arg(config_arg()),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();

    let outcome = match matches.subcommand() {
        Some(("compress", args)) => compress(args).await,
        Some(("plan", args)) => show_plan(args),
        Some(("config", args)) => show_config(args),
        _ => Ok(()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<ConfigError>().is_some() {
                ExitCode::from(EXIT_CONFIG)
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}

fn resolve_config(args: &ArgMatches, overrides: &Overrides) -> Result<PhotofitConfig, ConfigError> {
    let path = args.get_one::<PathBuf>("config").map(PathBuf::as_path);
    PhotofitConfig::resolve(path, overrides)
}

async fn compress(args: &ArgMatches) -> anyhow::Result<()> {
    let overrides = Overrides {
        max_bytes: args.get_one::<u64>("max-bytes").copied(),
        scratch_dir: args.get_one::<PathBuf>("scratch-dir").cloned(),
    };
    let config = resolve_config(args, &overrides)?;
    logging::init(&config.logging).context("cannot initialise logging")?;

    let source = args
        .get_one::<String>("source")
        .context("missing source argument")?;
    let compressor = filesystem_compressor(config.codec.clone(), config.budget.clone())
        .map_err(ConfigError::from)?;

    let mut result = match args.get_one::<u64>("timeout") {
        Some(secs) => {
            compressor
                .compress_with_timeout(source, Duration::from_secs(*secs))
                .await
        }
        None => compressor.compress_detailed(source).await,
    }?;

    let output = match args.get_one::<PathBuf>("out") {
        Some(out) => {
            deliver(&result.resource.to_path(), out)?;
            result.resource = ResourceRef::from_path(out);
            out.display().to_string()
        }
        None => result.resource.to_string(),
    };

    let report = CompressionReport {
        source: source.clone(),
        output,
        max_bytes: config.budget.max_bytes,
        result,
    };
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.generate_text());
    }
    Ok(())
}

/// Copy the scratch result to its destination, then drop the scratch copy
fn deliver(scratch: &Path, out: &Path) -> anyhow::Result<()> {
    std::fs::copy(scratch, out)
        .with_context(|| format!("cannot write {}", out.display()))?;
    if let Err(e) = std::fs::remove_file(scratch) {
        tracing::warn!(path = %scratch.display(), error = %e, "scratch output not removed");
    }
    Ok(())
}

fn show_plan(args: &ArgMatches) -> anyhow::Result<()> {
    let config = resolve_config(args, &Overrides::default())?;
    let steps = plan(&config.budget);

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&steps)?);
    } else {
        print!("{}", plan_text(config.budget.max_bytes, &steps));
    }
    Ok(())
}

fn show_config(args: &ArgMatches) -> anyhow::Result<()> {
    let config = resolve_config(args, &Overrides::default())?;
    print!("{}", config.to_toml()?);
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
    fn compress_flags_parse() {
        let matches = cli()
            .try_get_matches_from([
                "photofit",
                "compress",
                "in.png",
                "--max-bytes",
                "1024",
                "--scratch-dir",
                "/tmp/pf",
                "--json",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "compress");
        assert_eq!(args.get_one::<u64>("max-bytes"), Some(&1024));
        assert_eq!(
            args.get_one::<PathBuf>("scratch-dir"),
            Some(&PathBuf::from("/tmp/pf"))
        );
        assert!(args.get_flag("json"));
    }

    #[test]
    fn compress_requires_source() {
        assert!(cli().try_get_matches_from(["photofit", "compress"]).is_err());
    }

    #[test]
    fn deliver_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("photofit-1.jpg");
        let out = dir.path().join("final.jpg");
        std::fs::write(&scratch, b"jpeg").unwrap();

        deliver(&scratch, &out).unwrap();

        assert!(!scratch.exists());
        assert_eq!(std::fs::read(&out).unwrap(), b"jpeg");
    }
}
