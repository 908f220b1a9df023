use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use lab_companion_core::ingest::{IngestRequest, Ingestor, ReportExtractor, UploadedFile};
use lab_companion_core::insight::InsightService;
use lab_companion_core::models::{Demographics, Gender, ReportSummary, User};
use lab_companion_core::{Config, Database};
use lab_companion_llm::MockExtractor;

#[derive(Parser)]
#[command(name = "lab-companion")]
#[command(about = "Track blood test results with personalised ranges and guidance")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Database path (overrides configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PatientArgs {
    /// Patient gender (M or F)
    #[arg(short, long)]
    gender: Option<Gender>,
    /// Patient age in years
    #[arg(short, long)]
    age: Option<u32>,
}

impl PatientArgs {
    fn demographics(&self) -> Demographics {
        Demographics::new(self.gender, self.age)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load the reference panels, tests and aliases
    Seed,
    /// Create a user
    AddUser {
        email: String,
    },
    /// Ingest a report image or PDF
    Ingest {
        /// User id or e-mail
        #[arg(short, long)]
        user: String,
        /// Report file
        file: PathBuf,
        /// Content type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
        /// Use already-extracted text instead of an AI extractor
        #[arg(long)]
        extracted_text: Option<PathBuf>,
        /// Report date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        patient: PatientArgs,
    },
    /// Ingest report text (use "-" for stdin)
    IngestText {
        #[arg(short, long)]
        user: String,
        file: PathBuf,
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        patient: PatientArgs,
    },
    /// List panels
    Panels,
    /// List test types, optionally for one panel
    Tests {
        panel: Option<String>,
    },
    /// List a user's reports, newest first
    Reports {
        #[arg(short, long)]
        user: String,
        #[arg(long, default_value = "0")]
        skip: usize,
        #[arg(long, default_value = "100")]
        limit: usize,
    },
    /// Chart data for one test
    History {
        #[arg(short, long)]
        user: String,
        test: String,
    },
    /// Latest result with trend and guidance
    Insight {
        #[arg(short, long)]
        user: String,
        test: String,
    },
    /// Classify a value without storing it
    Classify {
        test: String,
        value: f64,
        #[command(flatten)]
        patient: PatientArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.db {
        config = config.with_database_path(path);
    }
    debug!(db = %config.database_path.display(), "opening database");

    let db = Database::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let seeded = db.seed_reference_data()?;

    match cli.command {
        Commands::Seed => {
            info!(panels = seeded.panels, tests = seeded.test_types, "reference data loaded");
            print_json(&seeded)?;
        }
        Commands::AddUser { email } => {
            if email.trim().is_empty() {
                bail!("email cannot be empty");
            }
            let user = User::new(email);
            db.insert_user(&user)?;
            print_json(&user)?;
        }
        Commands::Ingest {
            user,
            file,
            content_type,
            extracted_text,
            date,
            patient,
        } => {
            let user = find_user(&db, &user)?;
            let request = ingest_request(&user, &patient, date.as_deref())?;
            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let content_type = content_type.unwrap_or_else(|| guess_content_type(&file).to_string());
            let upload = UploadedFile::new(file_name(&file), content_type, bytes);

            let extractor = build_extractor(&config, extracted_text.as_deref())?;
            let summary =
                Ingestor::new(&db, &config).ingest_upload(&request, &upload, extractor.as_ref())?;
            print_json(&summary)?;
        }
        Commands::IngestText {
            user,
            file,
            date,
            patient,
        } => {
            let user = find_user(&db, &user)?;
            let request = ingest_request(&user, &patient, date.as_deref())?;
            let text = read_text(&file)?;
            let summary = Ingestor::new(&db, &config).ingest_text(&request, &file_name(&file), &text)?;
            print_json(&summary)?;
        }
        Commands::Panels => print_json(&db.list_panels()?)?,
        Commands::Tests { panel } => {
            let tests = match panel {
                Some(panel) => db.panel_tests(&panel)?,
                None => db.list_test_types()?,
            };
            print_json(&tests)?;
        }
        Commands::Reports { user, skip, limit } => {
            let user = find_user(&db, &user)?;
            let mut summaries: Vec<ReportSummary> = Vec::new();
            for report in db.list_reports_for_user(&user.id, skip, limit)? {
                let count = db.count_results_for_report(&report.id)?;
                summaries.push(report.summary(count));
            }
            print_json(&summaries)?;
        }
        Commands::History { user, test } => {
            let user = find_user(&db, &user)?;
            print_json(&InsightService::new(&db).test_history(&user.id, &test)?)?;
        }
        Commands::Insight { user, test } => {
            let user = find_user(&db, &user)?;
            print_json(&InsightService::new(&db).latest_insight(&user.id, &test)?)?;
        }
        Commands::Classify {
            test,
            value,
            patient,
        } => {
            let classification =
                InsightService::new(&db).classify(&test, value, patient.demographics())?;
            print_json(&classification)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Look a user up by e-mail (when the argument contains `@`) or by id.
fn find_user(db: &Database, user: &str) -> Result<User> {
    let found = if user.contains('@') {
        db.get_user_by_email(user)?
    } else {
        db.get_user(user)?
    };
    found.ok_or_else(|| anyhow!("user '{user}' not found"))
}

fn ingest_request(user: &User, patient: &PatientArgs, date: Option<&str>) -> Result<IngestRequest> {
    let mut request = IngestRequest::new(&user.id).with_demographics(patient.demographics());
    if let Some(date) = date {
        request = request.reported_at(parse_date(date)?);
    }
    Ok(request)
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}' (expected YYYY-MM-DD or RFC 3339)"))?;
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("invalid date '{raw}'"))
}

fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_text(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn build_extractor(config: &Config, extracted_text: Option<&Path>) -> Result<Box<dyn ReportExtractor>> {
    if let Some(path) = extracted_text {
        return Ok(Box::new(MockExtractor::with_text(read_text(path)?)));
    }

    #[cfg(feature = "gemini")]
    {
        let extractor = lab_companion_llm::GeminiExtractor::from_settings(&config.gemini)?;
        Ok(Box::new(extractor))
    }

    #[cfg(not(feature = "gemini"))]
    {
        let _ = config;
        bail!("no extractor available: pass --extracted-text or build with the `gemini` feature")
    }
}
