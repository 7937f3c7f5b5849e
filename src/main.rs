//! nudge - Deferred reminders for tasks with due dates.
//!
//! Usage:
//!   nudge run <config>       Create the configured tasks and deliver their reminders
//!   nudge validate <config>  Validate a configuration file without running
//!   nudge plan <config>      Show when each configured task would be reminded

use chrono::Utc;
use clap::{Parser, Subcommand};
use nudge::{
    Event, EventBus, EventHandler, FirePlan, InMemoryTaskStore, ReminderScheduler, ReminderState,
    TaskService, YamlLoader,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// nudge - Deferred reminders for tasks with due dates
#[derive(Parser)]
#[command(name = "nudge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configured tasks and deliver their reminders
    Run {
        /// Path to the configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Exit once every armed reminder has been delivered
        #[arg(long)]
        until_idle: bool,
    },

    /// Validate a configuration file without running
    Validate {
        /// Path to the configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Show when each configured task would be reminded
    Plan {
        /// Path to the configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}

/// Simple logging event handler that reports reminder events.
struct LoggingHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::ReminderArmed {
                subject_id,
                fire_at,
                ..
            } => {
                info!("Reminder for task '{}' armed for {}", subject_id, fire_at);
            }
            Event::ReminderSkipped {
                subject_id,
                event_time,
                ..
            } => {
                warn!(
                    "Task '{}' was due at {}, no reminder sent",
                    subject_id, event_time
                );
            }
            Event::ReminderDelivered {
                subject_id,
                recipient,
                duration,
                ..
            } => {
                info!(
                    "Reminder for task '{}' delivered to {} in {:?}",
                    subject_id, recipient, duration
                );
            }
            Event::DeliveryFailed {
                subject_id,
                recipient,
                error,
                ..
            } => {
                error!(
                    "Reminder for task '{}' could not be delivered to {}: {}",
                    subject_id, recipient, error
                );
            }
            Event::ReminderCancelled { subject_id, .. } => {
                info!("Reminder for task '{}' cancelled", subject_id);
            }
            _ => {}
        }
    }
}

/// Event handler that counts finished deliveries, successful or not.
struct DeliveryWatcher {
    finished: AtomicUsize,
    notify: Notify,
}

#[async_trait::async_trait]
impl EventHandler for DeliveryWatcher {
    async fn handle(&self, event: &Event) {
        if matches!(
            event,
            Event::ReminderDelivered { .. } | Event::DeliveryFailed { .. }
        ) {
            self.finished.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_one();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, until_idle } => {
            run(config, until_idle).await?;
        }
        Commands::Validate { config } => {
            validate(config)?;
        }
        Commands::Plan { config } => {
            plan(config)?;
        }
    }

    Ok(())
}

/// Create the configured tasks and wait for their reminders.
async fn run(config_path: PathBuf, until_idle: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Loading configuration from: {}", config_path.display());

    let config = YamlLoader::load(&config_path)?;
    let timezone = config.timezone()?;

    // Create event bus with logging and delivery watching handlers
    let watcher = Arc::new(DeliveryWatcher {
        finished: AtomicUsize::new(0),
        notify: Notify::new(),
    });
    let event_bus = EventBus::new();
    event_bus.register(Arc::new(LoggingHandler)).await;
    event_bus.register(watcher.clone()).await;

    let sink = config.sink.build();
    info!("Delivering notifications through the '{}' sink", sink.name());

    let scheduler = ReminderScheduler::new(sink).with_event_bus(event_bus);
    let service = TaskService::new(Arc::new(InMemoryTaskStore::new()), scheduler)
        .with_lead_time(config.lead_time())
        .with_timezone(timezone)
        .with_notify_on_create(config.notify_on_create);

    let user = config.user();
    let now = Utc::now();
    let mut expected = 0;

    info!("Creating {} task(s) for {}:", config.tasks.len(), user.email);
    for seed in &config.tasks {
        let task = service.create(&user, seed.to_new_task(now)).await?;
        let reminder = service.reminder_state(&task.id);
        if matches!(reminder, Some(ReminderState::Armed | ReminderState::Fired)) {
            expected += 1;
        }
        info!(
            "  - {} ({}): reminder {}",
            task.title,
            task.priority,
            reminder.map_or("none".to_string(), |s| s.to_string())
        );
    }

    if until_idle {
        info!("Waiting for {} reminder(s), press Ctrl+C to stop early", expected);
        while watcher.finished.load(Ordering::SeqCst) < expected {
            tokio::select! {
                _ = watcher.notify.notified() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }
    } else {
        info!("Press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
    }

    info!("Shutting down...");
    let cancelled = service.shutdown();
    if cancelled > 0 {
        warn!("{} pending reminder(s) were cancelled", cancelled);
    }

    info!("Goodbye!");
    Ok(())
}

/// Validate a configuration file without running.
fn validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating configuration: {}", config_path.display());

    match YamlLoader::load(&config_path) {
        Ok(config) => {
            info!(
                "Configuration is valid: {} task(s), lead time {}s, timezone {}",
                config.tasks.len(),
                config.lead_time_secs,
                config.timezone
            );
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Show when each configured task would be reminded.
fn plan(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = YamlLoader::load(&config_path)?;
    let timezone = config.timezone()?;
    let lead_time = config.lead_time();
    let now = Utc::now();

    if config.tasks.is_empty() {
        println!("No tasks in {}", config_path.display());
        return Ok(());
    }

    println!("Reminder plan (now: {}):", now.with_timezone(&timezone));
    println!();

    for seed in &config.tasks {
        println!("Task: {}", seed.title);
        match seed.due_time(now) {
            Some(due) => {
                println!("  Due: {}", due.with_timezone(&timezone));
                let decision = FirePlan::compute(due, lead_time, now);
                match &decision {
                    FirePlan::Schedule { fire_at, delay } => println!(
                        "  Reminder: {} at {} (in {}s)",
                        decision.label(),
                        fire_at.with_timezone(&timezone),
                        delay.as_secs()
                    ),
                    _ => println!("  Reminder: {}", decision.label()),
                }
            }
            None => println!("  Due: never\n  Reminder: none"),
        }
        println!();
    }

    Ok(())
}
