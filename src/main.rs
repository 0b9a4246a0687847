//! hydrocycle command-line front end.
//!
//! Wires the library's adapters into the verification service, the record
//! book and the reminder scheduler.  Command output goes to stdout; the
//! `log` stream (stderr, `RUST_LOG` aware) carries the runtime detail.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use hydrocycle::adapters::clock::SystemClock;
use hydrocycle::adapters::feedback::BellFeedback;
use hydrocycle::adapters::file_store::FileStore;
use hydrocycle::adapters::gemini::UnavailableConfirmer;
#[cfg(feature = "gemini")]
use hydrocycle::adapters::gemini::{GeminiConfig, GeminiConfirmer};
use hydrocycle::adapters::log_sink::{LogEventSink, LogNotifier};
use hydrocycle::adapters::trace::TraceSource;
use hydrocycle::app::commands::AppCommand;
use hydrocycle::app::ports::{
    ConfigPort, ConfirmationOutcome, ConfirmationPort, FramePort, NotifierPort,
};
use hydrocycle::app::service::VerificationService;
use hydrocycle::calendar::CalendarData;
use hydrocycle::config::AppConfig;
use hydrocycle::cycle::{self, CycleStatus};
use hydrocycle::error::ConfirmError;
use hydrocycle::events::{Event, EventQueue};
use hydrocycle::frame::FrameImage;
use hydrocycle::notify::Notification;
use hydrocycle::prefs;
use hydrocycle::records::{self, RecordBook};
use hydrocycle::scheduler::{
    ExistingPolicy, HYDRATION_WORK, QuietHours, Schedule, Scheduler,
};

/// Longest pause between replayed frames in `--realtime` mode.
const MAX_REPLAY_GAP_MS: u64 = 2_000;
/// Frames between `StatusTick` summaries during verification.
const STATUS_EVERY_FRAMES: u64 = 30;
/// Poll interval while waiting on an outstanding confirmation.
const CONFIRM_POLL_MS: u64 = 50;

// ── CLI ───────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hydrocycle", version, about = "Camera-verified water intake and cycle tracking")]
struct Cli {
    /// Data directory for config and records
    #[arg(long, env = "HYDROCYCLE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify a drink by replaying a detection trace
    Verify(VerifyArgs),
    /// Log a glass of water without verification
    Drink,
    /// Period tracking
    Period {
        #[command(subcommand)]
        action: PeriodAction,
    },
    /// Today's intake and cycle summary
    Status,
    /// List logged records, newest first
    History {
        /// Maximum records per list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Month calendar of intake and period days
    Calendar {
        /// Month to show (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<String>,
        /// Show the records for one day (YYYY-MM-DD)
        #[arg(long)]
        day: Option<String>,
    },
    /// Hydration reminders
    Reminders {
        #[command(subcommand)]
        action: ReminderAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct VerifyArgs {
    /// JSON-lines detection trace
    #[arg(long)]
    trace: PathBuf,
    /// Ring the terminal bell until the drink is verified
    #[arg(long)]
    alarm: bool,
    /// Pace frames by their recorded timestamps
    #[arg(long)]
    realtime: bool,
    /// Skip the remote confirmation check
    #[arg(long)]
    offline: bool,
    /// Log per-frame detector diagnostics
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum PeriodAction {
    /// Record a period start (today unless --date is given)
    Log {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Next expected start and days until or late
    Status,
}

#[derive(Subcommand)]
enum ReminderAction {
    /// Enable the half-hourly hydration reminder
    On,
    /// Disable the hydration reminder
    Off,
    /// Run the reminder scheduler in the foreground
    Run {
        /// Seconds per scheduler tick
        #[arg(long, default_value_t = 60)]
        tick_secs: u32,
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration as JSON
    Show,
    /// Validate and store a JSON configuration file
    Import { file: PathBuf },
    /// Restore the defaults
    Reset,
}

// ── Confirmation backend ──────────────────────────────────────

/// Remote model when configured, otherwise the unavailable stand-in.
enum Confirmer {
    #[cfg(feature = "gemini")]
    Gemini(GeminiConfirmer),
    Unavailable(UnavailableConfirmer),
}

impl Confirmer {
    fn build(config: &AppConfig, offline: bool) -> Self {
        if offline {
            info!("Confirmation: offline");
            return Self::Unavailable(UnavailableConfirmer);
        }
        #[cfg(feature = "gemini")]
        {
            match GeminiConfig::from_env(config).and_then(GeminiConfirmer::new) {
                Ok(c) => return Self::Gemini(c),
                Err(e) => warn!("Confirmation: {}", e),
            }
        }
        #[cfg(not(feature = "gemini"))]
        let _ = config;
        Self::Unavailable(UnavailableConfirmer)
    }
}

impl ConfirmationPort for Confirmer {
    fn request(&mut self, image: &FrameImage) -> Result<(), ConfirmError> {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini(c) => c.request(image),
            Self::Unavailable(c) => c.request(image),
        }
    }

    fn poll(&mut self) -> Option<ConfirmationOutcome> {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini(c) => c.poll(),
            Self::Unavailable(c) => c.poll(),
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let store = FileStore::open(&data_dir)
        .with_context(|| format!("opening data directory {}", data_dir.display()))?;
    let config = match store.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            AppConfig::default()
        }
    };

    match cli.command {
        Command::Verify(args) => run_verify(store, config, &args),
        Command::Drink => {
            let clock = SystemClock::new();
            let mut book = RecordBook::new(store);
            let record = book.log_intake(clock.now_epoch_ms())?;
            println!("Water intake logged (#{}).", record.id);
            Ok(())
        }
        Command::Period { action } => run_period(store, &config, action),
        Command::Status => run_status(store, &config),
        Command::History { limit } => run_history(store, limit),
        Command::Calendar { month, day } => {
            run_calendar(store, &config, month.as_deref(), day.as_deref())
        }
        Command::Reminders { action } => run_reminders(store, &config, action),
        Command::Config { action } => run_config(&store, &config, action),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hydrocycle"))
        .unwrap_or_else(|| PathBuf::from(".hydrocycle"))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{text}', expected YYYY-MM-DD"))
}

// ── verify ────────────────────────────────────────────────────

fn run_verify(store: FileStore, config: AppConfig, args: &VerifyArgs) -> Result<()> {
    let clock = SystemClock::new();
    let mut book = RecordBook::new(store);
    let mut frames = TraceSource::open(&args.trace)
        .with_context(|| format!("opening trace {}", args.trace.display()))?;
    let mut confirmer = Confirmer::build(&config, args.offline);
    let mut feedback = BellFeedback::new();
    let mut sink = if args.verbose {
        LogEventSink::verbose()
    } else {
        LogEventSink::new()
    };
    let confirm_timeout_ms = u64::from(config.confirmation_timeout_secs) * 1000;

    let mut service = VerificationService::new(config);
    service.start(&mut sink);
    if args.alarm {
        service.handle_command(AppCommand::SetAlarm(true), &mut sink);
    }

    let mut events = EventQueue::new();
    let mut last_ts: Option<u64> = None;
    let mut trace_done = false;

    while !trace_done && !service.is_verified() {
        events.push(Event::FrameTick);
        while let Some(event) = events.pop() {
            match event {
                Event::FrameTick => {
                    let Some(result) = frames.next_frame() else {
                        trace_done = true;
                        continue;
                    };
                    if let Ok(frame) = &result {
                        if args.realtime {
                            if let Some(prev) = last_ts {
                                let gap = frame.timestamp_ms.saturating_sub(prev);
                                thread::sleep(Duration::from_millis(gap.min(MAX_REPLAY_GAP_MS)));
                            }
                        }
                        last_ts = Some(frame.timestamp_ms);
                    }
                    service.handle_frame_result(result, &mut confirmer, &mut feedback, &mut sink);
                    if result_counted(&service) {
                        events.push(Event::StatusTick);
                    }
                }
                Event::StatusTick => {
                    info!(
                        "Verify: {} frames, state {:?}, confirmation pending: {}",
                        service.frames_processed(),
                        service.state(),
                        service.confirmation_pending()
                    );
                }
                Event::HydrationReminder | Event::PeriodCheck => {}
            }
        }
        record_verification(&mut service, &mut book, &clock)?;
    }

    // The trace may end while the remote check is still out.
    let base_ms = last_ts.unwrap_or(0);
    let wait_start = clock.uptime_ms();
    while service.confirmation_pending() && !service.is_verified() {
        let waited = clock.uptime_ms().saturating_sub(wait_start);
        if waited > confirm_timeout_ms {
            warn!("Verify: confirmation timed out after {}ms", waited);
            break;
        }
        thread::sleep(Duration::from_millis(CONFIRM_POLL_MS));
        service.poll(base_ms + waited, &mut confirmer, &mut feedback, &mut sink);
        record_verification(&mut service, &mut book, &clock)?;
    }

    if service.is_verified() {
        println!("Verified! Water intake logged.");
    } else {
        println!(
            "Not verified after {} frames ({}).",
            service.frames_processed(),
            service.state().status_line()
        );
    }
    Ok(())
}

fn result_counted(service: &VerificationService) -> bool {
    let n = service.frames_processed();
    n > 0 && n % STATUS_EVERY_FRAMES == 0
}

fn record_verification(
    service: &mut VerificationService,
    book: &mut RecordBook<FileStore>,
    clock: &SystemClock,
) -> Result<()> {
    if let Some(at_ms) = service.take_verified() {
        let record = book.log_intake(clock.now_epoch_ms())?;
        info!("Verify: drink at {}ms logged as intake #{}", at_ms, record.id);
    }
    Ok(())
}

// ── period / status / history ─────────────────────────────────

fn run_period(store: FileStore, config: &AppConfig, action: PeriodAction) -> Result<()> {
    let clock = SystemClock::new();
    let mut book = RecordBook::new(store);
    match action {
        PeriodAction::Log { date } => {
            let timestamp_ms = match date {
                Some(text) => {
                    let date = parse_date(&text)?;
                    records::start_of_day_ms(date, &Local)
                        .ok_or_else(|| anyhow!("{date} has no local midnight"))?
                }
                None => clock.now_epoch_ms(),
            };
            let record = book.log_period_start(timestamp_ms)?;
            println!("Period start logged (#{}).", record.id);
        }
        PeriodAction::Status => {
            print_cycle(&book, config, clock.today())?;
        }
    }
    Ok(())
}

fn print_cycle(book: &RecordBook<FileStore>, config: &AppConfig, today: NaiveDate) -> Result<()> {
    let last = book.last_period()?.map(|r| r.timestamp_ms);
    let cycle_days = u32::from(config.cycle_length_days);
    let next = last.and_then(|ms| cycle::next_expected(ms, &Local, cycle_days));
    println!("Next period: {}", cycle::format_next(next));
    let status = cycle::cycle_status(last, today, &Local, cycle_days);
    if status != CycleStatus::NoData {
        println!("{status}");
    }
    Ok(())
}

fn run_status(store: FileStore, config: &AppConfig) -> Result<()> {
    let clock = SystemClock::new();
    let reminders = prefs::reminder_enabled(&store).context("reading reminder preference")?;
    let book = RecordBook::new(store);
    let today = clock.today();

    println!("Water today: {}", book.intake_today(today, &Local)?);
    print_cycle(&book, config, today)?;
    println!("Reminders: {}", if reminders { "on" } else { "off" });
    Ok(())
}

fn run_history(store: FileStore, limit: usize) -> Result<()> {
    let book = RecordBook::new(store);
    let fmt = |ms: u64| {
        i64::try_from(ms)
            .ok()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %I:%M %p").to_string())
            .unwrap_or_else(|| "?".to_string())
    };

    println!("Water intake:");
    let intake = book.intake_records()?;
    if intake.is_empty() {
        println!("  (none)");
    }
    for r in intake.iter().take(limit) {
        println!("  #{:<4} {}", r.id, fmt(r.timestamp_ms));
    }

    println!("Period starts:");
    let periods = book.period_records()?;
    if periods.is_empty() {
        println!("  (none)");
    }
    for r in periods.iter().take(limit) {
        println!("  #{:<4} {}", r.id, fmt(r.timestamp_ms));
    }
    Ok(())
}

// ── calendar ──────────────────────────────────────────────────

fn run_calendar(
    store: FileStore,
    config: &AppConfig,
    month: Option<&str>,
    day: Option<&str>,
) -> Result<()> {
    let clock = SystemClock::new();
    let book = RecordBook::new(store);
    let data = CalendarData::load(&book, &Local, u32::from(config.cycle_length_days))?;

    if let Some(day) = day {
        let detail = data.day_detail(parse_date(day)?, &Local);
        println!("{}", detail.date.format("%A, %B %-d %Y"));
        for line in detail.lines() {
            println!("  {line}");
        }
        return Ok(());
    }

    let first = match month {
        Some(text) => parse_date(&format!("{text}-01"))
            .with_context(|| format!("invalid month '{text}', expected YYYY-MM"))?,
        None => clock.today().with_day(1).unwrap_or_else(|| clock.today()),
    };
    let view = data
        .month_view(first.year(), first.month())
        .ok_or_else(|| anyhow!("no such month"))?;

    println!("{:^35}", first.format("%B %Y").to_string());
    println!(" Sun  Mon  Tue  Wed  Thu  Fri  Sat");
    let mut line = "     ".repeat(view.leading_blanks as usize);
    let mut column = view.leading_blanks;
    for cell in &view.days {
        let mark = if cell.period_start {
            'P'
        } else if cell.predicted_start {
            '?'
        } else if cell.intake_count > 0 {
            '*'
        } else {
            ' '
        };
        line.push_str(&format!(" {:>2}{} ", cell.date.day(), mark));
        column += 1;
        if column == 7 {
            println!("{}", line.trim_end());
            line.clear();
            column = 0;
        }
    }
    if !line.is_empty() {
        println!("{}", line.trim_end());
    }
    println!("P period start   ? predicted start   * water logged");
    match data.predicted_start() {
        Some(date) => println!("Predicted next start: {}", date.format("%b %d")),
        None => println!("Predicted next start: No Data"),
    }
    Ok(())
}

// ── reminders ─────────────────────────────────────────────────

fn run_reminders(mut store: FileStore, config: &AppConfig, action: ReminderAction) -> Result<()> {
    match action {
        ReminderAction::On => {
            prefs::set_reminder_enabled(&mut store, true).context("saving reminder preference")?;
            println!(
                "Hydration reminders on: every {} min between {:02}:00 and {:02}:00.",
                config.hydration_interval_secs / 60,
                config.quiet_end_hour,
                config.quiet_start_hour
            );
            Ok(())
        }
        ReminderAction::Off => {
            prefs::set_reminder_enabled(&mut store, false).context("saving reminder preference")?;
            println!("Hydration reminders off.");
            Ok(())
        }
        ReminderAction::Run { tick_secs, ticks } => {
            run_reminder_loop(store, config, tick_secs.max(1), ticks)
        }
    }
}

fn run_reminder_loop(
    store: FileStore,
    config: &AppConfig,
    tick_secs: u32,
    max_ticks: Option<u64>,
) -> Result<()> {
    let clock = SystemClock::new();
    let mut notifier = LogNotifier::new();
    let mut events = EventQueue::new();
    let book = RecordBook::new(store);
    let cycle_days = u32::from(config.cycle_length_days);

    let mut sched = Scheduler::new();
    sched.set_quiet_hours(QuietHours::from_config(config));
    sched.add(Schedule::period_check(config), ExistingPolicy::Keep);

    info!("Reminders: scheduler running, tick {}s", tick_secs);
    let mut tick: u64 = 0;
    loop {
        // ── 1. Follow the stored preference ───────────────────
        let wanted = match prefs::reminder_enabled(book.storage()) {
            Ok(on) => on,
            Err(e) => {
                warn!("Reminders: preference unreadable ({}), keeping current state", e);
                sched.contains(HYDRATION_WORK)
            }
        };
        match (wanted, sched.contains(HYDRATION_WORK)) {
            (true, false) => {
                sched.add(Schedule::hydration(config), ExistingPolicy::Replace);
            }
            (false, true) => {
                sched.cancel(HYDRATION_WORK);
            }
            _ => {}
        }

        // ── 2. Fire whatever is due ───────────────────────────
        let elapsed = if tick == 0 { 0 } else { tick_secs };
        sched.tick(clock.current_hour(), elapsed, &mut events);

        // ── 3. Drain ──────────────────────────────────────────
        while let Some(event) = events.pop() {
            match event {
                Event::HydrationReminder => notifier.notify(&Notification::hydration_reminder()),
                Event::PeriodCheck => {
                    if let Some(last) = book.last_period()? {
                        if cycle::period_check_due(last.timestamp_ms, clock.now_epoch_ms(), cycle_days) {
                            notifier.notify(&Notification::cycle_reminder());
                        }
                    }
                }
                Event::StatusTick => {
                    info!(
                        "Reminders: {} schedules, {} notifications posted",
                        sched.active_count(),
                        notifier.posted()
                    );
                }
                Event::FrameTick => {}
            }
        }

        tick += 1;
        if max_ticks.is_some_and(|max| tick >= max) {
            break;
        }
        if tick % 60 == 0 {
            events.push(Event::StatusTick);
        }
        thread::sleep(Duration::from_secs(u64::from(tick_secs)));
    }
    Ok(())
}

// ── config ────────────────────────────────────────────────────

fn run_config(store: &FileStore, config: &AppConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Import { file } => {
            let cfg = read_config_file(&file)?;
            store.save(&cfg).context("saving configuration")?;
            println!("Configuration imported from {}.", file.display());
        }
        ConfigAction::Reset => {
            store
                .save(&AppConfig::default())
                .context("saving configuration")?;
            println!("Configuration reset to defaults.");
        }
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: AppConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    if let Err(reason) = cfg.validate() {
        bail!("invalid configuration: {reason}");
    }
    Ok(cfg)
}
