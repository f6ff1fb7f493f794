use chrono::{DateTime, Datelike, Utc};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use rentcycle::config::{
    config_dir, load_config, load_roster, load_state, Config, Roster, CONFIG_TEMPLATE,
    RATES_TEMPLATE, TENANTS_TEMPLATE,
};
use rentcycle::cycle::dates::parse_instant;
use rentcycle::cycle::penalty::accrue;
use rentcycle::store::format_bill_number;
use rentcycle::{
    Bill, BillFilter, BillStore, BillingEngine, BillingError, BillingKind, Directory,
    DisplayStatus, FileStore, GenerationOutcome, HttpGateway, MeterReading, Result,
};

type Engine = BillingEngine<FileStore, Roster>;

#[derive(Parser)]
#[command(name = "rentcycle")]
#[command(version, about = "Rent and utility billing-cycle engine", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.rentcycle or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Evaluate as of this instant instead of the current time (YYYY-MM-DD or RFC 3339)
    #[arg(long, global = true, value_name = "WHEN")]
    now: Option<String>,

    /// Log more to stderr (-v info, -vv debug). RENTCYCLE_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// List configured tenants
    Tenants,

    /// List utility rates by building
    Rates,

    /// Generate the next bill for a tenant
    Generate {
        /// Tenant identifier from tenants.toml
        #[arg(short, long)]
        tenant: String,

        /// rent, electricity, water or generator
        #[arg(short, long)]
        kind: String,

        /// Current meter reading (utilities only)
        #[arg(short, long)]
        reading: Option<f64>,

        /// Previous meter reading (default: the last bill's current reading)
        #[arg(short, long)]
        previous: Option<f64>,
    },

    /// Generate rent bills whose renewal window is open
    Renew,

    /// Recompute penalties on every outstanding bill
    Sweep,

    /// List bills, newest first
    List {
        /// Only bills for this tenant
        #[arg(short, long)]
        tenant: Option<String>,

        /// Only bills of this kind
        #[arg(short, long)]
        kind: Option<String>,

        /// Only bills that are not paid
        #[arg(long)]
        outstanding: bool,

        /// Number of bills to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one bill in detail
    Show {
        /// Bill id or index from 'list' (e.g., 1 or BILL-2026-0001)
        bill: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Attach payment proof to a bill
    SubmitProof {
        /// Bill id or index from 'list'
        #[arg(short, long, conflicts_with_all = ["tenant", "kind"])]
        bill: Option<String>,

        /// Tenant whose current bill receives the proof (with --kind)
        #[arg(short, long, requires = "kind")]
        tenant: Option<String>,

        /// Kind of the tenant's current bill (with --tenant)
        #[arg(short, long, requires = "tenant")]
        kind: Option<String>,

        /// Proof reference, e.g. a receipt URL
        #[arg(long)]
        proof: String,
    },

    /// Approve a submitted bill
    Approve {
        /// Bill id or index from 'list'
        bill: String,
    },

    /// Reject a submitted utility bill
    Reject {
        /// Bill id or index from 'list'
        bill: String,

        /// Why the proof was not accepted
        #[arg(short, long)]
        reason: String,
    },

    /// Start a gateway checkout for a bill
    Pay {
        /// Bill id or index from 'list'
        bill: String,
    },

    /// Verify a bill's gateway checkout and approve it on success
    Verify {
        /// Bill id or index from 'list'
        bill: String,
    },

    /// Show ledger status and upcoming due dates
    Status,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    let now = match cli.now.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Tenants => cmd_tenants(&cfg_dir),
        Commands::Rates => cmd_rates(&cfg_dir),
        Commands::Generate {
            tenant,
            kind,
            reading,
            previous,
        } => cmd_generate(&cfg_dir, &tenant, &kind, reading, previous, now),
        Commands::Renew => cmd_renew(&cfg_dir, now),
        Commands::Sweep => cmd_sweep(&cfg_dir, now),
        Commands::List {
            tenant,
            kind,
            outstanding,
            limit,
            json,
        } => cmd_list(&cfg_dir, tenant, kind, outstanding, limit, json, now),
        Commands::Show { bill, json } => cmd_show(&cfg_dir, &bill, json, now),
        Commands::SubmitProof {
            bill,
            tenant,
            kind,
            proof,
        } => cmd_submit_proof(&cfg_dir, bill, tenant, kind, &proof, now),
        Commands::Approve { bill } => cmd_approve(&cfg_dir, &bill, now),
        Commands::Reject { bill, reason } => cmd_reject(&cfg_dir, &bill, &reason),
        Commands::Pay { bill } => cmd_pay(&cfg_dir, &bill, now),
        Commands::Verify { bill } => cmd_verify(&cfg_dir, &bill, now),
        Commands::Status => cmd_status(&cfg_dir, now),
    }
}

/// Log to stderr so stdout carries only command output.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env("RENTCYCLE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Load config, roster and ledger for a command.
fn open_engine(cfg_dir: &Path) -> Result<(Config, Engine)> {
    if !cfg_dir.exists() {
        return Err(BillingError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    let config = load_config(cfg_dir)?;
    let roster = load_roster(cfg_dir)?;
    let store = FileStore::open(cfg_dir, &config.billing.number_format);
    let engine = BillingEngine::new(store, roster, config.billing.policy());
    Ok((config, engine))
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(BillingError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("tenants.toml"), TENANTS_TEMPLATE)?;
    fs::write(cfg_dir.join("rates.toml"), RATES_TEMPLATE)?;

    println!("Initialized rentcycle config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Review billing settings:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Add your tenants:         $EDITOR {}/tenants.toml",
        cfg_dir.display()
    );
    println!(
        "  3. Set utility rates:        $EDITOR {}/rates.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then generate the first rent bill:");
    println!("  rentcycle generate --tenant <tenant-id> --kind rent");

    Ok(())
}

#[derive(Tabled)]
struct TenantRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "BUILDING")]
    building: String,
    #[tabled(rename = "TERM")]
    term: String,
    #[tabled(rename = "RENT")]
    rent: String,
    #[tabled(rename = "START")]
    start: String,
    #[tabled(rename = "UTILITIES")]
    utilities: String,
}

#[derive(Tabled)]
struct RateRow {
    #[tabled(rename = "BUILDING")]
    building: String,
    #[tabled(rename = "ELECTRICITY")]
    electricity: String,
    #[tabled(rename = "WATER")]
    water: String,
    #[tabled(rename = "GENERATOR")]
    generator: String,
    #[tabled(rename = "SINCE")]
    since: String,
}

#[derive(Tabled)]
struct BillRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TENANT")]
    tenant: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "BILLED")]
    billed: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

fn format_money(value: f64, currency_symbol: &str) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{}{}{}.{:02}",
        sign,
        currency_symbol,
        format_grouped_int(cents / 100),
        cents % 100
    )
}

fn format_grouped_int(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

fn format_day(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// List configured tenants
fn cmd_tenants(cfg_dir: &Path) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let tenants = engine.directory().tenants()?;

    if tenants.is_empty() {
        println!("No tenants configured.");
        println!("Add tenants to: {}/tenants.toml", cfg_dir.display());
        return Ok(());
    }

    let rows: Vec<TenantRow> = tenants
        .iter()
        .map(|tenant| {
            let utilities: Vec<&str> = BillingKind::ALL
                .iter()
                .filter(|kind| kind.is_utility() && tenant.is_responsible_for(**kind))
                .map(|kind| kind.as_str())
                .collect();
            let mut name = tenant.name.clone();
            if !tenant.active {
                name.push_str(" (inactive)");
            }
            TenantRow {
                id: tenant.id.clone(),
                name,
                building: tenant.building_id.clone(),
                term: match tenant.term() {
                    Ok(term) => format!("{} days", term.days()),
                    Err(_) => format!("invalid ({})", tenant.payment_term),
                },
                rent: format_money(tenant.monthly_rent, &config.billing.currency_symbol),
                start: tenant.rent_start_date.to_string(),
                utilities: if utilities.is_empty() {
                    "-".to_string()
                } else {
                    utilities.join(", ")
                },
            }
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// List utility rates
fn cmd_rates(cfg_dir: &Path) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let mut rates: Vec<_> = engine.directory().rates().rates.iter().collect();

    if rates.is_empty() {
        println!("No utility rates configured.");
        println!("Add rates to: {}/rates.toml", cfg_dir.display());
        return Ok(());
    }

    rates.sort_by(|a, b| {
        a.building_id
            .cmp(&b.building_id)
            .then(b.created_at.cmp(&a.created_at))
    });

    let symbol = &config.billing.currency_symbol;
    let rows: Vec<RateRow> = rates
        .iter()
        .map(|rate| RateRow {
            building: rate.building_id.clone(),
            electricity: format!("{}{:.2}", symbol, rate.electricity),
            water: format!("{}{:.2}", symbol, rate.water),
            generator: format!("{}{:.2}", symbol, rate.generator),
            since: format_day(rate.created_at),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!("The newest entry per building applies to new utility bills.");

    Ok(())
}

/// Resolve a bill reference to a bill id.
/// Accepts either an index (1-based, newest first) from 'list' or the full bill id.
fn resolve_bill_id(engine: &Engine, reference: &str) -> Result<String> {
    let bills = engine.store().bills(&BillFilter::default())?;

    if let Ok(idx) = reference.parse::<usize>() {
        return bills
            .iter()
            .rev()
            .nth(idx.wrapping_sub(1))
            .map(|bill| bill.id.clone())
            .ok_or_else(|| BillingError::BillNotFound(reference.to_string()));
    }

    if bills.iter().any(|bill| bill.id == reference) {
        Ok(reference.to_string())
    } else {
        Err(BillingError::BillNotFound(reference.to_string()))
    }
}

fn print_bill_summary(bill: &Bill, config: &Config) {
    let symbol = &config.billing.currency_symbol;
    println!("  Tenant:   {}", bill.tenant_id);
    println!("  Kind:     {} (cycle {})", bill.kind, bill.cycle);
    println!("  Billed:   {}", format_day(bill.bill_date));
    println!("  Due:      {}", format_instant(bill.due_date));
    println!("  Amount:   {}", format_money(bill.amount, symbol));
    if let Some(usage) = bill.usage {
        println!(
            "  Usage:    {} -> {} ({} units at {}{:.2})",
            usage.previous_reading,
            usage.current_reading,
            usage.consumption(),
            symbol,
            usage.rate
        );
    }
}

/// Generate the next bill for a tenant
fn cmd_generate(
    cfg_dir: &Path,
    tenant_id: &str,
    kind: &str,
    reading: Option<f64>,
    previous: Option<f64>,
    now: DateTime<Utc>,
) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let kind: BillingKind = kind.parse()?;

    if previous.is_some() && reading.is_none() {
        return Err(BillingError::MissingField("reading"));
    }
    let reading = reading.map(|current| MeterReading { current, previous });

    match engine.generate(tenant_id, kind, reading, now)? {
        GenerationOutcome::Generated { bill } => {
            println!("Generated {}", bill.id);
            print_bill_summary(&bill, &config);
        }
        GenerationOutcome::AlreadyCurrent { bill } => {
            println!(
                "Tenant '{}' already has a current {} bill: {} (due {}, {})",
                tenant_id,
                kind,
                bill.id,
                format_day(bill.due_date),
                bill.payment_status
            );
        }
        GenerationOutcome::LeaseNotStarted { starts_at } => {
            println!(
                "Lease for '{}' starts {}; nothing to generate yet.",
                tenant_id,
                format_day(starts_at)
            );
        }
        GenerationOutcome::LeaseEnded { ended_on } => {
            println!("Lease for '{tenant_id}' ended on {ended_on}; nothing generated.");
        }
        GenerationOutcome::TenantInactive => {
            println!("Tenant '{tenant_id}' is inactive; nothing generated.");
        }
        GenerationOutcome::NotResponsible => {
            println!("Tenant '{tenant_id}' does not pay {kind} directly; nothing generated.");
        }
        GenerationOutcome::InFlight => {
            println!("A {kind} bill for '{tenant_id}' is already being generated.");
        }
    }

    Ok(())
}

/// Generate rent bills whose renewal window has opened
fn cmd_renew(cfg_dir: &Path, now: DateTime<Utc>) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let report = engine.renew_all(now)?;

    for bill in &report.generated {
        println!(
            "Generated {} for {} (due {}, {})",
            bill.id,
            bill.tenant_id,
            format_day(bill.due_date),
            format_money(bill.amount, &config.billing.currency_symbol)
        );
    }
    for failure in &report.failures {
        println!("Failed {}: {}", failure.id, failure.error);
    }
    println!(
        "Renewal: {} generated, {} not due yet, {} failed",
        report.generated.len(),
        report.waiting,
        report.failures.len()
    );

    Ok(())
}

/// Recompute penalties
fn cmd_sweep(cfg_dir: &Path, now: DateTime<Utc>) -> Result<()> {
    let (_, engine) = open_engine(cfg_dir)?;
    let report = engine.sweep(now)?;

    for failure in &report.failures {
        println!("Failed {}: {}", failure.id, failure.error);
    }
    println!(
        "Swept {} outstanding bill(s): {} updated, {} failed",
        report.scanned,
        report.updated,
        report.failures.len()
    );

    Ok(())
}

/// List bills, newest first
fn cmd_list(
    cfg_dir: &Path,
    tenant: Option<String>,
    kind: Option<String>,
    outstanding: bool,
    limit: Option<usize>,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let kind = kind.map(|k| k.parse::<BillingKind>()).transpose()?;
    let filter = BillFilter {
        tenant_id: tenant,
        kind,
        outstanding_only: outstanding,
    };

    // Index positions come from the whole ledger so they stay valid for other commands.
    let all = engine.store().bills(&BillFilter::default())?;
    let mut matching = engine.store().bills(&filter)?;
    matching.reverse();
    if let Some(n) = limit {
        matching.truncate(n);
    }

    if json {
        let out = serde_json::to_string_pretty(&matching).map_err(|e| {
            BillingError::Io(std::io::Error::other(e))
        })?;
        println!("{out}");
        return Ok(());
    }

    if matching.is_empty() {
        println!("No bills found.");
        return Ok(());
    }

    let rows: Vec<BillRow> = matching
        .iter()
        .map(|bill| BillRow {
            index: all.len() - all.iter().position(|b| b.id == bill.id).unwrap_or(0),
            id: bill.id.clone(),
            tenant: bill.tenant_id.clone(),
            kind: bill.kind.to_string(),
            billed: format_day(bill.bill_date),
            due: format_day(bill.due_date),
            total: format_money(bill.total_due, &config.billing.currency_symbol),
            status: bill.display_status(now).to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Showing {} of {} bills", matching.len(), all.len());
    println!("Use the index number with show/approve/reject/pay (e.g., 'rentcycle show 1')");

    Ok(())
}

/// Show one bill
fn cmd_show(cfg_dir: &Path, reference: &str, json: bool, now: DateTime<Utc>) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let bill_id = resolve_bill_id(&engine, reference)?;
    let bill = engine.store().get_bill(&bill_id)?;

    if json {
        let out = serde_json::to_string_pretty(&bill).map_err(|e| {
            BillingError::Io(std::io::Error::other(e))
        })?;
        println!("{out}");
        return Ok(());
    }

    let symbol = &config.billing.currency_symbol;
    println!("Bill {}", bill.id);
    println!("{}", "-".repeat(50));
    print_bill_summary(&bill, &config);
    if bill.original_due_date != bill.due_date {
        println!("  Originally due: {}", format_instant(bill.original_due_date));
    }
    println!("  Status:   {}", bill.display_status(now));
    println!("  Penalty:  {}", format_money(bill.penalty, symbol));
    println!("  Total:    {}", format_money(bill.total_due, symbol));

    if bill.is_current() {
        let accrual = accrue(&bill, now, engine.policy());
        if accrual.days_overdue > 0 {
            println!(
                "  As of {}: {} day(s) overdue, {} owed",
                format_day(now),
                accrual.days_overdue,
                format_money(accrual.total_due.max(bill.total_due), symbol)
            );
        }
    }
    if let Some(proof) = &bill.payment_proof_url {
        println!("  Proof:    {proof}");
    }
    if let Some(submitted_at) = bill.submitted_at {
        println!("  Submitted: {}", format_instant(submitted_at));
    }
    if let Some(reason) = &bill.rejection_reason {
        println!("  Rejected: {reason}");
    }
    if let Some(tx_ref) = &bill.checkout_ref {
        println!("  Checkout: {tx_ref}");
    }
    if let (Some(paid_at), Some(amount_paid)) = (bill.paid_at, bill.amount_paid) {
        println!(
            "  Paid:     {} on {}",
            format_money(amount_paid, symbol),
            format_instant(paid_at)
        );
    }
    if let Some(next) = bill.next_cycle {
        println!(
            "  Next cycle: billed {}, due {}",
            format_day(next.bill_date),
            format_day(next.due_date)
        );
    }

    Ok(())
}

/// Attach payment proof
fn cmd_submit_proof(
    cfg_dir: &Path,
    bill: Option<String>,
    tenant: Option<String>,
    kind: Option<String>,
    proof: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let (_, engine) = open_engine(cfg_dir)?;

    let bill = match (bill, tenant, kind) {
        (Some(reference), _, _) => {
            let bill_id = resolve_bill_id(&engine, &reference)?;
            engine.submit_proof(&bill_id, proof, now)?
        }
        (None, Some(tenant), Some(kind)) => {
            engine.submit_current_proof(&tenant, kind.parse()?, proof, now)?
        }
        _ => return Err(BillingError::MissingField("bill")),
    };

    println!("Submitted proof for {}", bill.id);
    println!("  Status: {}", bill.payment_status);

    Ok(())
}

/// Approve a submitted bill
fn cmd_approve(cfg_dir: &Path, reference: &str, now: DateTime<Utc>) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let bill_id = resolve_bill_id(&engine, reference)?;
    let bill = engine.approve(&bill_id, now)?;

    println!("Approved {}", bill.id);
    if let Some(amount_paid) = bill.amount_paid {
        println!(
            "  Paid:       {}",
            format_money(amount_paid, &config.billing.currency_symbol)
        );
    }
    if let Some(next) = bill.next_cycle {
        println!(
            "  Next cycle: billed {}, due {}",
            format_day(next.bill_date),
            format_day(next.due_date)
        );
    }

    Ok(())
}

/// Reject a submitted utility bill
fn cmd_reject(cfg_dir: &Path, reference: &str, reason: &str) -> Result<()> {
    let (_, engine) = open_engine(cfg_dir)?;
    let bill_id = resolve_bill_id(&engine, reference)?;
    let bill = engine.reject(&bill_id, reason)?;

    println!("Rejected {}", bill.id);
    println!("  Reason: {}", reason.trim());

    Ok(())
}

fn gateway(config: &Config) -> Result<HttpGateway> {
    let settings = config
        .gateway
        .as_ref()
        .ok_or(BillingError::GatewayNotConfigured)?;
    HttpGateway::from_settings(settings)
}

/// Start a gateway checkout
fn cmd_pay(cfg_dir: &Path, reference: &str, now: DateTime<Utc>) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let gateway = gateway(&config)?;
    let bill_id = resolve_bill_id(&engine, reference)?;
    let checkout = engine.start_checkout(&bill_id, &config.billing.currency, &gateway, now)?;

    println!("Checkout started for {}", checkout.bill_id);
    println!(
        "  Amount:      {}",
        format_money(checkout.amount, &config.billing.currency_symbol)
    );
    println!("  Reference:   {}", checkout.tx_ref);
    println!("  Pay at:      {}", checkout.checkout_url);
    println!();
    println!("After payment run: rentcycle verify {}", checkout.bill_id);

    Ok(())
}

/// Verify a gateway checkout
fn cmd_verify(cfg_dir: &Path, reference: &str, now: DateTime<Utc>) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let gateway = gateway(&config)?;
    let bill_id = resolve_bill_id(&engine, reference)?;
    let bill = engine.settle(&bill_id, &gateway, now)?;

    println!("Payment verified; approved {}", bill.id);
    if let Some(next) = bill.next_cycle {
        println!(
            "  Next cycle: billed {}, due {}",
            format_day(next.bill_date),
            format_day(next.due_date)
        );
    }

    Ok(())
}

/// Show ledger status
fn cmd_status(cfg_dir: &Path, now: DateTime<Utc>) -> Result<()> {
    let (config, engine) = open_engine(cfg_dir)?;
    let state = load_state(cfg_dir)?;
    let tenants = engine.directory().tenants()?;

    let outstanding: Vec<&Bill> = state.bills.iter().filter(|b| b.is_current()).collect();
    let overdue = outstanding
        .iter()
        .filter(|b| b.display_status(now) == DisplayStatus::Overdue)
        .count();
    let owed: f64 = outstanding.iter().map(|b| b.total_due).sum();

    let active: Vec<_> = tenants.iter().filter(|t| t.active).collect();
    let upcoming: Vec<_> = active
        .iter()
        .map(|tenant| (tenant, engine.preview(&tenant.id, BillingKind::Rent)))
        .collect();
    // Ids take their year from the bill date, so use the earliest unbilled rent cycle.
    let next_year = upcoming
        .iter()
        .filter(|(tenant, _)| {
            !outstanding
                .iter()
                .any(|b| b.tenant_id == tenant.id && b.kind == BillingKind::Rent)
        })
        .filter_map(|(_, next)| next.as_ref().ok())
        .map(|next| next.bill_date)
        .min()
        .unwrap_or(now)
        .year();
    let next_number = format_bill_number(
        &config.billing.number_format,
        next_year,
        state.counter.last_number + 1,
    );

    println!("Billing Status ({})", format_instant(now));
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Tenants:          {}", tenants.len());
    println!("Bills:            {}", state.bills.len());
    println!(
        "Outstanding:      {} ({} overdue, {} owed)",
        outstanding.len(),
        overdue,
        format_money(owed, &config.billing.currency_symbol)
    );
    println!("Next bill id:     {}", next_number);
    println!(
        "Gateway:          {}",
        if config.gateway.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );

    if !upcoming.is_empty() {
        println!();
        println!("Upcoming rent:");
        for (tenant, next) in &upcoming {
            match next {
                Ok(next) => println!("  {} - due {}", tenant.id, format_day(next.due_date)),
                Err(e) => println!("  {} - {}", tenant.id, e),
            }
        }
    }

    Ok(())
}
