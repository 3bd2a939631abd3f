use chrono::Local;
use std::sync::Arc;

use planner::config::PlannerConfig;
use planner::core::{AgendaItem, DayItem, ItemState};
use planner::planner::Planner;
use planner::state::{FileStore, KeyValueStore};
use planner::sync::{HttpGateway, Session};

struct Args {
    user: Option<String>,
    password: Option<String>,
    refresh: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        user: None,
        password: None,
        refresh: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--user" => args.user = iter.next(),
            "--password" => args.password = iter.next(),
            "--refresh" => args.refresh = true,
            other => eprintln!("Ignoring unknown argument {}", other),
        }
    }
    args
}

/// Journal logger: planner targets at info (debug when toggled), the rest at warn.
fn init_logging(config: &PlannerConfig) {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("planner") {
                let max = if planner::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    planner::set_debug_logging(config.debug_logging);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("planner".to_string()),
        Err(e) => {
            eprintln!("Journal unavailable, logging disabled: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so planner debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn mark(state: ItemState) -> &'static str {
    match state {
        ItemState::Todo => "[ ]",
        ItemState::Completed => "[x]",
        ItemState::Snoozed => "[>]",
        ItemState::Dropped => "[-]",
    }
}

fn print_day(title: &str, items: &[DayItem]) {
    println!("{}", title);
    if items.is_empty() {
        println!("  (nothing planned)");
    }
    for item in items {
        println!("  {} {}", mark(item.state), item.text);
    }
}

fn print_agenda(title: &str, collapsed: bool, items: &[AgendaItem]) {
    if collapsed {
        println!("{} (collapsed, {} items)", title, items.len());
        return;
    }
    println!("{}", title);
    for item in items {
        println!("  {} {}", mark(item.state), item.text);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PlannerConfig::load();
    init_logging(&config);
    let args = parse_args();

    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.storage_path()));
    let session = Arc::new(Session::new(&config, Arc::clone(&storage))?);

    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        session.signin(user, password).await?;
    }
    if !session.is_authenticated() {
        println!("Not signed in. Run with --user <name> --password <secret>.");
        return Ok(());
    }

    let gateway = Arc::new(HttpGateway::new(&config, session)?);
    let planner = Planner::new(gateway, storage, &config);
    let date = planner.open(Local::now().date_naive()).await;

    if args.refresh {
        planner.refresh();
        planner.pump_refresh().await;
    }

    let buckets = planner.day_buckets();
    print_day(&format!("Today ({})", date.format("%a %e %b %Y")), &buckets.today);
    print_day("Tomorrow", &buckets.tomorrow);
    println!();

    let groups = planner.agenda_groups();
    let current = groups.current_month.as_ref().map(|c| c.id);
    let agendas = groups
        .current_month
        .iter()
        .chain(groups.next_month.iter().filter(|next| Some(next.id) != current))
        .chain(groups.custom.iter());
    for agenda in agendas {
        let items = planner.agendas.items(agenda.id);
        print_agenda(&agenda.name, planner.is_collapsed(agenda.id), &items);
    }

    for error in planner.toasts().errors() {
        eprintln!("error: {}", error);
    }
    Ok(())
}
