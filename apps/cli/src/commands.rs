//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::info;

use vendorrisk_core::{PipelineEvent, PipelineState, ProgressReporter, RiskEngine};
use vendorrisk_shared::{AppConfig, Criticality, RiskReport, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// VendorRisk: should we sign with this vendor?
#[derive(Parser)]
#[command(
    name = "vendorrisk",
    version,
    about = "Gather web evidence about a company and score the risk of contracting with it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Serve the REST API.
    Serve {
        /// Interface to bind (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a full risk analysis for a company.
    Analyze {
        /// Company to assess.
        company: String,

        /// How critical the vendor is: high, medium, or low.
        #[arg(short, long, default_value = "medium")]
        criticality: Criticality,

        /// Print the full pipeline state as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Send one chat message through the assistant.
    Chat {
        /// The message, e.g. "Analyze Tesla with high criticality".
        message: String,

        /// Conversation owner.
        #[arg(long, default_value = "cli")]
        user_id: String,
    },

    /// Show raw search findings for a company.
    Search {
        /// Company to search for.
        company: String,
    },

    /// List saved reports for a company.
    Reports {
        /// Company name (case-insensitive).
        company: String,

        /// Maximum number of reports.
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "vendorrisk=info",
        1 => "vendorrisk=debug",
        _ => "vendorrisk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { host, port } => cmd_serve(host, port).await,
        Command::Analyze {
            company,
            criticality,
            json,
        } => cmd_analyze(&company, criticality, json).await,
        Command::Chat { message, user_id } => cmd_chat(&message, &user_id).await,
        Command::Search { company } => cmd_search(&company).await,
        Command::Reports { company, limit } => cmd_reports(&company, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn engine(config: &AppConfig) -> Result<Arc<RiskEngine>> {
    Ok(Arc::new(RiskEngine::from_config(config).await?))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let engine = engine(&config).await?;
    vendorrisk_api::serve(engine, &config.server.host, config.server.port).await?;
    Ok(())
}

async fn cmd_analyze(company: &str, criticality: Criticality, json: bool) -> Result<()> {
    let config = load_config()?;
    let engine = engine(&config).await?;
    info!(company, %criticality, "starting risk analysis");

    let reporter = CliProgress::new();
    let state = engine.analyze_company(company, criticality, &reporter).await;
    reporter.finish();
    let state = state?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_analysis(&state);
    }
    Ok(())
}

async fn cmd_chat(message: &str, user_id: &str) -> Result<()> {
    let config = load_config()?;
    let engine = engine(&config).await?;

    let reporter = CliProgress::new();
    let state = engine.handle_message(user_id, message, &reporter).await;
    reporter.finish();
    let state = state?;

    if state.risk_report.is_some() {
        print_analysis(&state);
    } else {
        println!();
        println!("  {}", state.assistant_reply);
        println!();
    }
    Ok(())
}

async fn cmd_search(company: &str) -> Result<()> {
    let config = load_config()?;
    let engine = engine(&config).await?;
    let findings = engine.search(company).await?;

    if findings.is_empty() {
        println!("No findings for {company}.");
        return Ok(());
    }

    println!();
    for (i, finding) in findings.iter().enumerate() {
        println!("  {}. {}", i + 1, finding.title);
        println!("     {}", finding.url);
        if !finding.snippet.is_empty() {
            println!("     {}", finding.snippet);
        }
    }
    println!();
    Ok(())
}

async fn cmd_reports(company: &str, limit: usize) -> Result<()> {
    let config = load_config()?;
    let engine = engine(&config).await?;
    let reports = engine.reports(company, limit).await?;

    if reports.is_empty() {
        println!("No saved reports for {company}.");
        return Ok(());
    }

    println!();
    for stored in &reports {
        let recommendation = match &stored.report {
            RiskReport::Assessed { assessment, .. } => assessment
                .get("overall_recommendation")
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string(),
            RiskReport::Failed { error } => format!("failed: {error}"),
        };
        println!(
            "  {}  {:<6}  {}",
            stored.created_at.format("%Y-%m-%d %H:%M"),
            stored.criticality.as_str(),
            recommendation
        );
    }
    println!();
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_analysis(state: &PipelineState) {
    println!();
    println!("  Company:     {}", state.company());
    if let Some(criticality) = state.criticality {
        println!("  Criticality: {criticality}");
    }
    println!(
        "  Sources:     {} verified, {} lower-trust (confidence {:.0}%)",
        state.verified_findings.len(),
        state.unverified_findings.len(),
        state.data_confidence() * 100.0
    );

    match &state.risk_report {
        Some(RiskReport::Assessed { assessment, .. }) => print_assessment(assessment),
        Some(RiskReport::Failed { error }) => println!("  Report:      {error}"),
        None => println!("  {}", state.assistant_reply),
    }
    println!();
}

fn print_assessment(assessment: &Value) {
    let field = |key: &str| match assessment.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    };

    println!("  Financial:   {}", field("financial_risk"));
    println!("  Security:    {}", field("security_risk"));
    println!("  Reputation:  {}", field("reputation_risk"));
    println!("  Resilience:  {}", field("resilience_strength"));
    println!("  Decision:    {}", field("overall_recommendation"));

    match assessment.get("rationale_with_citations") {
        Some(Value::Array(points)) => {
            println!("  Rationale:");
            for point in points {
                match point {
                    Value::String(s) => println!("    - {s}"),
                    other => println!("    - {other}"),
                }
            }
        }
        Some(Value::String(text)) => println!("  Rationale:   {text}"),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn report(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageStart { message, .. } => self.spinner.set_message(message),
            PipelineEvent::StageComplete { message, .. } => {
                self.spinner.println(format!("  ✓ {message}"));
            }
            PipelineEvent::Error { message } => {
                self.spinner.println(format!("  ✗ {message}"));
            }
            PipelineEvent::Final { .. } | PipelineEvent::Done => self.spinner.finish_and_clear(),
        }
    }
}
