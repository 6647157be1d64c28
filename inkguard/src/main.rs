// inkguard/src/main.rs
//
// inkguard — manuscript leak investigation CLI.
//
// Wraps the library for operators chasing a suspected leak:
//   fingerprint  — content digest of a manuscript file
//   watermark    — embed a partner-specific watermark, print the record
//   detect       — score leaked text against one or more candidate ids
//   strip        — remove all covert channels (pristine-compare aid)
//   token        — issue / verify partner access tokens
//   sessions     — run the anomaly detector over a JSONL session log
//
// Signing key comes from --key or INKGUARD_SIGNING_KEY.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use inkguard::{
    default_permissions, detect_suspicious_activity, detect_watermark, document_fingerprint,
    full_access_permissions, strip_watermarks, watermark_manuscript, AccessClaims, AccessSession,
    DetectorConfig, ManuscriptFormat, TokenSigner, WatermarkContext,
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "inkguard",
    about   = "Manuscript leak protection — watermarking, access tokens, session forensics",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the content fingerprint of a manuscript file.
    Fingerprint { file: PathBuf },

    /// Embed a partner-specific watermark; prints the watermark record as JSON.
    Watermark {
        file: PathBuf,
        #[arg(long)]
        submission: String,
        #[arg(long)]
        partner: String,
        #[arg(long)]
        user: String,
        #[arg(long, value_enum, default_value = "plain")]
        format: FormatArg,
        #[arg(long, help = "Write watermarked copy here (default: stdout)")]
        out: Option<PathBuf>,
    },

    /// Score leaked text against one or more candidate watermark ids.
    Detect {
        file: PathBuf,
        #[arg(long = "watermark-id", required = true)]
        watermark_ids: Vec<String>,
    },

    /// Remove all covert channels from a file (pristine-compare aid).
    Strip {
        file: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Issue or verify partner access tokens.
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },

    /// Run the anomaly detector over a JSONL session log.
    Sessions {
        file: PathBuf,
        #[arg(long, help = "Override the copy-attempt threshold")]
        copy_threshold: Option<usize>,
        #[arg(long, help = "Override the download-attempt threshold")]
        download_threshold: Option<usize>,
        #[arg(long, help = "Override the max session length (seconds)")]
        max_session_secs: Option<i64>,
    },
}

#[derive(Subcommand)]
enum TokenCommand {
    Issue {
        #[arg(long)]
        submission: String,
        #[arg(long)]
        partner: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        watermark_id: String,
        #[arg(long, default_value = "90.0")]
        expiry_days: f64,
        #[arg(long, help = "Grant view_full in addition to the view-only set")]
        full_access: bool,
        #[arg(long)]
        key: Option<String>,
    },
    Verify {
        token: String,
        #[arg(long)]
        key: Option<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum FormatArg {
    Plain,
    Markdown,
}

impl From<FormatArg> for ManuscriptFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Plain => Self::Plain,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}

fn signing_key(flag: Option<String>) -> Result<Vec<u8>> {
    if let Some(k) = flag {
        return Ok(k.into_bytes());
    }
    match std::env::var("INKGUARD_SIGNING_KEY") {
        Ok(k) if !k.is_empty() => Ok(k.into_bytes()),
        _ => bail!("no signing key: pass --key or set INKGUARD_SIGNING_KEY"),
    }
}

fn read(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write_or_print(out: Option<PathBuf>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("inkguard=info".parse()?),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Fingerprint { file } => {
            println!("{}", document_fingerprint(&read(&file)?));
        }

        Command::Watermark { file, submission, partner, user, format, out } => {
            let content = read(&file)?;
            let output = watermark_manuscript(
                &content,
                &WatermarkContext {
                    submission_id: submission,
                    partner_id: partner,
                    user_id: user,
                    timestamp: Utc::now(),
                    format: format.into(),
                },
            );
            eprintln!("{}", serde_json::to_string_pretty(&output.record)?);
            write_or_print(out, &output.watermarked_content)?;
        }

        Command::Detect { file, watermark_ids } => {
            let content = read(&file)?;
            let mut results: Vec<_> = watermark_ids
                .iter()
                .map(|id| (id.clone(), detect_watermark(&content, id)))
                .collect();
            results.sort_by(|a, b| {
                b.1.confidence.partial_cmp(&a.1.confidence).unwrap_or(std::cmp::Ordering::Equal)
            });
            for (id, det) in results {
                let verdict = if det.detected { "DETECTED" } else { "no match" };
                let techniques: Vec<String> =
                    det.techniques.iter().map(|t| t.to_string()).collect();
                println!(
                    "{id}  {verdict}  confidence={:.4}  channels=[{}]",
                    det.confidence,
                    techniques.join(",")
                );
            }
        }

        Command::Strip { file, out } => {
            let stripped = strip_watermarks(&read(&file)?);
            write_or_print(out, &stripped)?;
        }

        Command::Token { command } => match command {
            TokenCommand::Issue {
                submission,
                partner,
                user,
                watermark_id,
                expiry_days,
                full_access,
                key,
            } => {
                let signer = TokenSigner::new(&signing_key(key)?)?;
                let permissions = if full_access {
                    full_access_permissions()
                } else {
                    default_permissions()
                };
                let issued = signer.generate_access_token(
                    AccessClaims {
                        submission_id: submission,
                        partner_id: partner,
                        user_id: user,
                        watermark_id,
                        permissions,
                    },
                    expiry_days,
                    Utc::now(),
                );
                println!("{}", issued.token);
                info!("expires {}", issued.expires_at);
            }
            TokenCommand::Verify { token, key } => {
                let signer = TokenSigner::new(&signing_key(key)?)?;
                match signer.verify_access_token(&token, Utc::now()) {
                    Ok(payload) => {
                        println!("valid");
                        println!("{}", serde_json::to_string_pretty(&payload)?);
                    }
                    Err(e) => {
                        println!("invalid: {e}");
                        std::process::exit(1);
                    }
                }
            }
        },

        Command::Sessions { file, copy_threshold, download_threshold, max_session_secs } => {
            let mut config = DetectorConfig::default();
            if let Some(t) = copy_threshold {
                config.copy_attempt_threshold = t;
            }
            if let Some(t) = download_threshold {
                config.download_attempt_threshold = t;
            }
            if let Some(t) = max_session_secs {
                config.max_session_secs = t;
            }

            let mut flagged = 0usize;
            let mut total = 0usize;
            let mut parse_errors = 0usize;
            let mut by_partner: HashMap<String, usize> = HashMap::new();

            for line in read(&file)?.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let session: AccessSession = match serde_json::from_str(line) {
                    Ok(s) => s,
                    Err(_) => {
                        parse_errors += 1;
                        continue;
                    }
                };
                total += 1;
                let report = detect_suspicious_activity(&session, &config);
                if report.suspicious {
                    flagged += 1;
                    *by_partner.entry(session.partner_id.clone()).or_default() += 1;
                    let reasons: Vec<String> =
                        report.reasons.iter().map(|r| r.to_string()).collect();
                    println!(
                        "{}  partner={}  submission={}  [{}]",
                        session.session_id,
                        session.partner_id,
                        session.submission_id,
                        reasons.join(" | ")
                    );
                }
            }

            println!("\n{flagged}/{total} sessions flagged ({parse_errors} unparseable lines)");
            let mut partners: Vec<_> = by_partner.into_iter().collect();
            partners.sort_by(|a, b| b.1.cmp(&a.1));
            for (partner, n) in partners {
                println!("  {partner}: {n}");
            }
        }
    }

    Ok(())
}
