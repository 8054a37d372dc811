pub mod guard;

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::{error, info, warn};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::daemon::guard::{BUSY, RunGuard};
use crate::digest::job::DigestJob;
use crate::domain::email::ScanWindow;
use crate::ipc::{Request, Response};

pub struct DaemonConfig {
    pub run_at: NaiveTime,
}

impl DaemonConfig {
    pub fn from_run_at(run_at: &str) -> Result<Self> {
        let run_at = NaiveTime::parse_from_str(run_at.trim(), "%H:%M")
            .map_err(|e| anyhow!("invalid schedule.run_at {run_at:?} (want HH:MM): {e}"))?;
        Ok(Self { run_at })
    }
}

/// The first `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

pub fn run_daemon(job: DigestJob, cfg: DaemonConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;

    let job = Arc::new(job);
    let guard = Arc::new(RunGuard::default());

    #[cfg(unix)]
    {
        let job = job.clone();
        let guard = guard.clone();
        thread::spawn(move || {
            if let Err(e) = crate::ipc::serve(|req| handle_request(&job, &guard, req)) {
                error!("IPC listener stopped: {e}");
            }
        });
    }

    while running.load(Ordering::SeqCst) {
        let next = next_run_after(Local::now().naive_local(), cfg.run_at);
        info!("next digest at {next}");

        while running.load(Ordering::SeqCst) && Local::now().naive_local() < next {
            thread::sleep(Duration::from_secs(1));
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let window = ScanWindow::single_day(Local::now().date_naive());
        match guard.try_run(|| job.run(&window)) {
            Some(Ok(_)) => {}
            Some(Err(e)) => error!("scheduled digest failed: {e:#}"),
            None => warn!("skipping scheduled digest: {}", BUSY),
        }
    }

    info!("daemon shutting down");
    Ok(())
}

pub fn handle_request(job: &DigestJob, guard: &RunGuard, req: Request) -> Response {
    match req {
        Request::Ping => Response::ok("pong"),
        Request::RunDigest { date } => {
            let day = match date {
                Some(d) => match NaiveDate::parse_from_str(&d, "%Y-%m-%d") {
                    Ok(day) => day,
                    Err(e) => return Response::err(format!("invalid date {d:?}: {e}")),
                },
                None => Local::now().date_naive(),
            };
            match guard.try_run(|| job.run(&ScanWindow::single_day(day))) {
                Some(Ok(text)) => Response::ok(text),
                Some(Err(e)) => Response::err(format!("digest failed: {e:#}")),
                None => Response::err(BUSY),
            }
        }
    }
}
