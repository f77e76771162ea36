//! Interactive stopwatch.
//!
//! Enter clicks the button, `q` quits. The counter redraws every 10 ms;
//! remote changes are picked up on the same beat.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use cravingstop_core::timer::{Stopwatch, TimerState, TICK_QUANTUM_MS};
use cravingstop_core::{now_ms, Event, SyncNotice};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};

use crate::session::{self, format_duration};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_loop())
}

async fn run_loop() -> Result<(), Box<dyn std::error::Error>> {
    let mut session = session::open()?;
    let mut stopwatch = Stopwatch::new();

    // Report degraded sync once per distinct notice.
    let last_notice: Rc<RefCell<Option<SyncNotice>>> = Rc::new(RefCell::new(None));
    let seen = Rc::clone(&last_notice);
    let watcher = session.sync.subscribe(move |view| {
        let current = view.notice.cloned();
        let mut last = seen.borrow_mut();
        if current != *last {
            if let Some(notice) = &current {
                eprintln!("\nwarning: {notice}");
            }
            *last = current;
        }
    });

    eprintln!(
        "{} records ({:?}). Enter = click, q = quit.",
        session.sync.records().len(),
        session.sync.authority()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(Duration::from_millis(TICK_QUANTUM_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    break;
                }
                for event in stopwatch.click(now_ms(), &mut session.sync) {
                    report(&event);
                }
            }
            _ = ticker.tick() => {
                if let Some(event) = stopwatch.tick(now_ms()) {
                    report(&event);
                }
                session.sync.pump();
                if stopwatch.state() == TimerState::Running {
                    print!("\r{}", format_duration(stopwatch.elapsed_ms()));
                    std::io::stdout().flush()?;
                }
            }
        }
    }

    stopwatch.cancel();
    watcher.unsubscribe();
    session.sync.shutdown();
    println!();
    Ok(())
}

fn report(event: &Event) {
    match event {
        Event::StopwatchArmed { .. } => {}
        Event::StopwatchReset { .. } => println!("\rreset"),
        Event::StopwatchStarted { .. } => println!("\rstarted"),
        Event::StopwatchStopped {
            elapsed_ms, logged, ..
        } => {
            let suffix = if *logged { "logged" } else { "not logged" };
            println!("\r{} ({suffix})", format_duration(*elapsed_ms));
        }
        Event::StopwatchSnapshot { .. } => {}
    }
}
