use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docstore_sqlite::DocStore;
use legacy_sqlite::LegacyDb;
use std::io::Write;
use std::path::PathBuf;
use upgrade::{Relocation, UpgradeOptions, UpgradeReport, UpgradeStatus};

mod config;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json }

impl OutputFormat {
    fn from_config(s: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| anyhow!("unknown format {s:?} in config (expected text or json)"))
    }
}

#[derive(Debug, Parser)]
#[command(name = "upgrader", version, about = "Upgrade legacy SQLite document stores")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./upgrader.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version
    Version,
    /// Import a legacy store into a new document store
    Upgrade {
        /// Legacy store file
        source: PathBuf,
        /// Destination store file (created if missing)
        dest: PathBuf,
        /// Leave the legacy attachment directory where it is
        #[arg(long)]
        no_relocate_attachments: bool,
        /// Delete the legacy file after a fully successful upgrade
        #[arg(long)]
        delete_source: bool,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Summarise a legacy store without modifying it
    Inspect {
        source: PathBuf,
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print documents of a destination store as JSON lines
    Dump {
        dest: PathBuf,
        /// Only this document
        #[arg(long)]
        doc: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let cfg_format = cfg.format.as_deref().map(OutputFormat::from_config).transpose()?;
    match cli.command {
        Commands::Version => {
            println!("upgrader {} (core {})", env!("CARGO_PKG_VERSION"), upgrade_core::version());
        }
        Commands::Upgrade { source, dest, no_relocate_attachments, delete_source, format } => {
            let defaults = UpgradeOptions::default();
            let options = UpgradeOptions {
                relocate_attachments: !no_relocate_attachments
                    && cfg.relocate_attachments.unwrap_or(defaults.relocate_attachments),
                delete_source: delete_source || cfg.delete_source.unwrap_or(defaults.delete_source),
            };
            let report = upgrade::upgrade(&source, options, || DocStore::open_or_create(&dest));
            match format.or(cfg_format).unwrap_or(OutputFormat::Text) {
                OutputFormat::Text => print_report(&report),
                OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
            }
            if let UpgradeStatus::Failed { message, .. } = &report.status {
                bail!("upgrade failed: {message}");
            }
        }
        Commands::Inspect { source, format } => {
            let legacy = LegacyDb::open_read_only(&source)?;
            let stats = legacy.stats()?;
            match format.or(cfg_format).unwrap_or(OutputFormat::Text) {
                OutputFormat::Json => println!("{}", serde_json::to_string(&stats)?),
                OutputFormat::Text => {
                    println!("{} (schema version {})", source.display(), stats.schema_version);
                    println!("  documents:        {}", stats.documents);
                    println!("  revisions:        {} ({} leaves)", stats.revisions, stats.leaf_revisions);
                    println!("  conflicted docs:  {}", stats.conflicted_documents);
                    println!("  attachments:      {}", stats.attachments);
                    println!("  local documents:  {}", stats.local_documents);
                    println!("  info keys:        {}", stats.info_keys);
                    println!("  attachment dir:   {}", if stats.attachment_dir_present { "present" } else { "absent" });
                }
            }
        }
        Commands::Dump { dest, doc } => {
            let store = DocStore::open_existing(&dest)?;
            let ids = match doc {
                Some(id) => vec![id],
                None => store.document_ids()?,
            };
            for id in ids {
                let leaves = store.leaf_revisions(&id)?;
                if leaves.is_empty() {
                    log::warn!("document {id:?} not found");
                    continue;
                }
                let mut revs = Vec::with_capacity(leaves.len());
                for leaf in &leaves {
                    let depth = store.history(&id, &leaf.rev_id)?.len();
                    revs.push(serde_json::json!({
                        "rev": leaf.rev_id,
                        "deleted": leaf.deleted,
                        "history_depth": depth,
                        "body": leaf.body_json(),
                    }));
                }
                let obj = serde_json::json!({ "id": id, "conflicted": leaves.len() > 1, "leaves": revs });
                println!("{}", serde_json::to_string(&obj)?);
            }
        }
    }
    Ok(())
}

fn print_report(report: &UpgradeReport) {
    let mut out = std::io::stdout().lock();
    if let Err(e) = write_report(&mut out, report) {
        log::warn!("could not print report: {e}");
    }
}

fn write_report(out: &mut impl Write, report: &UpgradeReport) -> std::io::Result<()> {
    match &report.status {
        UpgradeStatus::Success => writeln!(
            out,
            "upgraded {} document(s), {} revision(s) in {} ms",
            report.imported.documents, report.imported.revisions, report.elapsed_ms
        )?,
        UpgradeStatus::Failed { kind, phase, message } => {
            writeln!(out, "upgrade failed during {phase:?} ({kind:?}): {message}")?
        }
    }
    writeln!(
        out,
        "local documents: {} imported, {} skipped; info keys: {}",
        report.local_documents.imported, report.local_documents.skipped, report.info_keys
    )?;
    match &report.attachments {
        Relocation::Moved { from, to } => writeln!(out, "attachments: moved {} -> {}", from.display(), to.display())?,
        Relocation::NotPresent => writeln!(out, "attachments: none")?,
        Relocation::Disabled => writeln!(out, "attachments: left in place")?,
        Relocation::Pending => writeln!(out, "attachments: not relocated, upgrade stopped before that step")?,
        Relocation::Failed { .. } => writeln!(out, "attachments: still at the legacy location")?,
    }
    for w in report.warnings() {
        writeln!(out, "warning: {w}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_open_report() -> UpgradeReport {
        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("out.docstore");
        upgrade::upgrade(&dir.path().join("missing.cblite"), UpgradeOptions::default(), || DocStore::open_or_create(&dest))
    }

    fn render(report: &UpgradeReport) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, report).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_report_mentions_skipped_relocation() {
        let report = failed_open_report();
        assert_eq!(report.attachments, Relocation::Pending);
        let text = render(&report);
        assert!(text.starts_with("upgrade failed during OpeningStores (StoreOpen)"), "{text}");
        assert!(text.contains("attachments: not relocated, upgrade stopped before that step"), "{text}");
    }

    #[test]
    fn text_report_mentions_failed_relocation() {
        let mut report = failed_open_report();
        report.status = UpgradeStatus::Success;
        report.attachments = Relocation::Failed { message: "destination not empty".into() };
        let text = render(&report);
        assert!(text.contains("attachments: still at the legacy location"), "{text}");
        assert!(text.contains("warning: attachments not relocated: destination not empty"), "{text}");
    }
}
