//! # Pod configuration CLI
//!
//! Command line tool to inspect how pod metadata translates into a
//! container configuration.

use std::ffi::OsString;
use std::io::{BufReader, Read, Write};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use fn_error_context::context;

use crate::k8sapitypes::Pod;
use crate::keys::{annotation, REGISTRY};

/// Translate a pod manifest into its container configuration
#[derive(Debug, Parser)]
pub(crate) struct TranslateOpts {
    /// Path to a pod in YAML or JSON; `-` or no argument reads stdin
    pub(crate) file: Option<Utf8PathBuf>,

    /// Exit successfully even if some keys failed to translate.
    ///
    /// The partial configuration is printed either way; errors go to stderr.
    #[clap(long)]
    pub(crate) allow_errors: bool,
}

/// Print the schema version a pod was created with
#[derive(Debug, Parser)]
pub(crate) struct SchemaVersionOpts {
    /// Path to a pod in YAML or JSON; `-` or no argument reads stdin
    pub(crate) file: Option<Utf8PathBuf>,
}

/// Translate Kubernetes pod annotations and labels into a typed container
/// configuration.
///
/// Every recognized key is parsed into its type or reported; one bad key
/// never hides the others.
#[derive(Debug, Parser)]
#[clap(name = "podconfig")]
#[clap(rename_all = "kebab-case")]
#[clap(version)]
pub(crate) enum Opt {
    /// Translate a pod and print the configuration as JSON.
    Translate(TranslateOpts),
    /// List the recognized annotation and label keys.
    Keys,
    /// Print the pod schema version, `0` if unset.
    SchemaVersion(SchemaVersionOpts),
}

/// Load a pod from `path`, or stdin.
#[context("Reading pod")]
fn read_pod(path: Option<&Utf8Path>) -> Result<Pod> {
    let r: Box<dyn Read> = match path {
        None => Box::new(std::io::stdin().lock()),
        Some(p) if p.as_str() == "-" => Box::new(std::io::stdin().lock()),
        Some(p) => Box::new(std::fs::File::open(p).with_context(|| format!("Opening {p}"))?),
    };
    let pod = serde_yaml::from_reader(BufReader::new(r)).context("Parsing pod")?;
    Ok(pod)
}

/// Write the translation of `pod` to `out`; errors become the result
/// unless `allow_errors` is set.
#[context("Translating")]
fn translate_to(pod: &Pod, allow_errors: bool, mut out: impl Write) -> Result<()> {
    let t = crate::translate_pod(pod);
    serde_json::to_writer_pretty(&mut out, &t.config).context("Writing to stdout")?;
    writeln!(out)?;
    out.flush()?;
    if t.errors.is_empty() {
        return Ok(());
    }
    if allow_errors {
        eprint!("{}", t.errors);
        return Ok(());
    }
    Err(t.errors.into())
}

/// Implementation of `podconfig translate`
fn translate(opts: TranslateOpts) -> Result<()> {
    let pod = read_pod(opts.file.as_deref())?;
    translate_to(&pod, opts.allow_errors, std::io::stdout().lock())
}

/// Write one `<source>\t<kind>\t<key>` line per recognized key.
fn print_keys(mut out: impl Write) -> Result<()> {
    for spec in REGISTRY {
        if spec.container_scoped {
            writeln!(out, "{}\t{}\t{}/<container>", spec.source, spec.kind, spec.key)?;
        } else {
            writeln!(out, "{}\t{}\t{}", spec.source, spec.kind, spec.key)?;
        }
    }
    writeln!(
        out,
        "annotation\tservice\t{}/<name>.v<version>.<enabled|image>",
        annotation::SERVICE_PREFIX
    )?;
    Ok(())
}

/// Implementation of `podconfig schema-version`
#[context("Querying schema version")]
fn schema_version(opts: SchemaVersionOpts) -> Result<()> {
    let pod = read_pod(opts.file.as_deref())?;
    let v = crate::pod_schema_version(&pod.metadata)?;
    println!("{v}");
    Ok(())
}

/// Parse the provided arguments and execute.
/// Calls [`clap::Error::exit`] on failure, printing the error message and aborting the program.
pub fn run_from_iter<I>(args: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    run_from_opt(Opt::parse_from(args))
}

/// Internal (non-generic/monomorphized) primary CLI entrypoint
fn run_from_opt(opt: Opt) -> Result<()> {
    match opt {
        Opt::Translate(opts) => translate(opts),
        Opt::Keys => print_keys(std::io::stdout().lock()),
        Opt::SchemaVersion(opts) => schema_version(opts),
    }
}
