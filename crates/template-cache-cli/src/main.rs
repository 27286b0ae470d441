//! template-cache - render templates from the command line.
//!
//! Builds a cache from layered configuration, loads the requested files and
//! patterns, renders one target and prints the result.
//!
//! ```text
//! template-cache --cwd templates --cache '*.tmpl' --set name=World a.tmpl
//! template-cache --delims '{%' '%}' --set n=3 '{%= n %} items'
//! template-cache --cwd templates --cache '**/*.tmpl' --list
//! ```
//!
//! Configuration layers, later wins: defaults, `--config FILE` (YAML or JSON),
//! `--cwd` / `--delims` / `--no-escape-delims`, `--context JSON`, `--set`.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use serde_json::Value;
use template_cache::{Overrides, TemplateCache};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Render a template file or template text through a compiled-template cache.
#[derive(Parser, Debug)]
#[command(name = "template-cache", version)]
struct Cli {
    /// Template file (relative to --cwd) or template text to render
    target: Option<String>,

    /// Working directory for relative paths and glob patterns
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Delimiter pair
    #[arg(long, num_args = 2, value_names = ["OPEN", "CLOSE"])]
    delims: Option<Vec<String>>,

    /// Treat the delimiters as regular expressions
    #[arg(long)]
    no_escape_delims: bool,

    /// Options file (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Load files matching PATTERN into the cache (repeatable, `!` excludes)
    #[arg(long = "cache", value_name = "PATTERN")]
    patterns: Vec<String>,

    /// Compile a file into the cache; failure to read it is fatal
    #[arg(long = "compile-file", value_name = "PATH")]
    compile_files: Vec<PathBuf>,

    /// Context object as JSON
    #[arg(long, value_name = "JSON")]
    context: Option<String>,

    /// Set one context value; VALUE is parsed as JSON, else taken as a string
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    assignments: Vec<(String, Value)>,

    /// Print the cache keys
    #[arg(long)]
    list: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in {:?}", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_overrides(cli: &Cli) -> Result<Overrides> {
    let mut overrides = Overrides::new();

    if let Some(path) = &cli.config {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let file = Overrides::from_yaml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        overrides = overrides.extend(file);
    }

    let mut flags = Overrides::new();
    if let Some(cwd) = &cli.cwd {
        flags = flags.cwd(cwd);
    }
    if let Some([open, close]) = cli.delims.as_deref() {
        flags = flags.delims(open, close);
    }
    if cli.no_escape_delims {
        flags = flags.escape(false);
    }
    overrides = overrides.extend(flags);

    if let Some(context) = &cli.context {
        let value: Value = serde_json::from_str(context).context("parsing --context")?;
        overrides = overrides.extend(Overrides::from_json(value).context("parsing --context")?);
    }

    for (key, value) in &cli.assignments {
        overrides = overrides.set(key.clone(), value.clone());
    }

    Ok(overrides)
}

fn run(cli: &Cli) -> Result<String> {
    if cli.target.is_none() && !cli.list {
        bail!("nothing to do: pass a TARGET to render or --list");
    }

    let overrides = build_overrides(cli)?;
    let mut cache = TemplateCache::with_overrides(&overrides);
    debug!(cwd = %cache.options().cwd.display(), "cache configured");

    for path in &cli.compile_files {
        cache
            .compile_file(path, &Overrides::new())
            .with_context(|| format!("compiling {}", path.display()))?;
    }

    if !cli.patterns.is_empty() {
        cache
            .populate(cli.patterns.clone(), &Overrides::new())
            .context("populating cache")?;
    }

    let mut output = String::new();
    if let Some(target) = &cli.target {
        output = cache
            .render(target, &Overrides::new())
            .with_context(|| format!("rendering {:?}", target))?;
    }
    if cli.list {
        for key in cache.keys() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&key.display().to_string());
        }
    }
    Ok(output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            if output.ends_with('\n') {
                print!("{}", output);
            } else {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixtures() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tmpl"), "<%= name %>").unwrap();
        fs::write(dir.path().join("b.custom.tmpl"), "{%= name %}").unwrap();
        dir
    }

    fn cli(dir: &tempfile::TempDir, args: &[&str]) -> Cli {
        let cwd = dir.path().to_string_lossy().into_owned();
        let mut argv = vec!["template-cache", "--cwd", cwd.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("n=3").unwrap(),
            ("n".to_string(), json!(3))
        );
        assert_eq!(
            parse_assignment("name=World").unwrap(),
            ("name".to_string(), json!("World"))
        );
        assert_eq!(
            parse_assignment("eq=a=b").unwrap(),
            ("eq".to_string(), json!("a=b"))
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_render_cached_file() {
        let dir = fixtures();
        let cli = cli(&dir, &["--cache", "*.tmpl", "--set", "name=A", "a.tmpl"]);
        assert_eq!(run(&cli).unwrap(), "A");
    }

    #[test]
    fn test_render_inline_text() {
        let dir = fixtures();
        let cli = cli(&dir, &["--set", "n=3", "<%= n %> items"]);
        assert_eq!(run(&cli).unwrap(), "3 items");
    }

    #[test]
    fn test_custom_delims_flag() {
        let dir = fixtures();
        let cli = cli(
            &dir,
            &["--delims", "{%", "%}", "--context", r#"{"name": "C"}"#, "b.custom.tmpl"],
        );
        assert_eq!(run(&cli).unwrap(), "C");
    }

    #[test]
    fn test_config_file() {
        let dir = fixtures();
        let config = dir.path().join("options.yaml");
        fs::write(&config, "delims: ['{%', '%}']\nname: Y\n").unwrap();
        let config = config.to_string_lossy().into_owned();

        let cli = cli(&dir, &["--config", config.as_str(), "b.custom.tmpl"]);
        assert_eq!(run(&cli).unwrap(), "Y");
    }

    #[test]
    fn test_set_overrides_context() {
        let dir = fixtures();
        let cli = cli(
            &dir,
            &["--context", r#"{"name": "ctx"}"#, "--set", "name=set", "a.tmpl"],
        );
        assert_eq!(run(&cli).unwrap(), "set");
    }

    #[test]
    fn test_list_keys() {
        let dir = fixtures();
        let cli = cli(&dir, &["--cache", "*.tmpl", "--cache", "!*.custom.tmpl", "--list"]);
        let output = run(&cli).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.ends_with("a.tmpl"));
    }

    #[test]
    fn test_compile_file_missing_fails() {
        let dir = fixtures();
        let cli = cli(&dir, &["--compile-file", "missing.tmpl", "a.tmpl"]);
        let err = run(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.tmpl"));
    }

    #[test]
    fn test_nothing_to_do() {
        let dir = fixtures();
        assert!(run(&cli(&dir, &[])).is_err());
    }
}
