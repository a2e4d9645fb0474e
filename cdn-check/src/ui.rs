//! Terminal output for the cdn-check CLI.
//!
//! The warning and prompt, the single overwritten progress line, and the
//! final report. Everything except the report itself goes to stderr so stdout
//! stays clean for piping.

use cdn_check_lib::{ProgressSink, Report};
use console::{style, Term};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

// ── Warning and prompt ───────────────────────────────────────────────────────

/// Print the traffic warning shown before every run.
pub fn print_warning() {
    eprintln!(
        "{}",
        style("This tool is not meant to be run on your local machine.")
            .yellow()
            .bold()
    );
    eprintln!("It performs one DNS lookup per domain in the list (often 100k or more),");
    eprintln!("which may leave your Internet connection unusable for a while.");
    eprintln!("It is recommended to run it on a server or a cloud instance.");
    eprintln!();
}

/// Ask a yes/no question on stderr and read the answer from stdin.
///
/// Only `y` (any case) counts as yes; anything else, including EOF, is no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    confirm_from(prompt, &mut io::stdin().lock())
}

fn confirm_from<R: BufRead>(prompt: &str, input: &mut R) -> io::Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

// ── Progress line ────────────────────────────────────────────────────────────

/// Single overwritten stderr line fed by worker 0.
///
/// The worker only stores the latest counts in a watch channel; a separate
/// renderer task owns the terminal, so a slow terminal never stalls a lookup.
pub struct ProgressLine {
    tx: Arc<watch::Sender<(usize, usize)>>,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ProgressLine {
    /// Start the renderer. Returns `None` if stderr isn't a TTY.
    pub fn start() -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let (tx, mut rx) = watch::channel((0usize, 0usize));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let (completed, total) = *rx.borrow_and_update();
                        let _ = term.clear_line();
                        let _ = term.write_str(&format_progress(completed, total));
                    }
                    _ = &mut stop_rx => break,
                }
            }
            let _ = term.clear_line();
        });

        Some(Self {
            tx: Arc::new(tx),
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Sink to hand to the worker pool.
    pub fn sink(&self) -> Arc<dyn ProgressSink> {
        Arc::new(WatchSink(Arc::clone(&self.tx)))
    }

    /// Stop the renderer and clear the line.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

struct WatchSink(Arc<watch::Sender<(usize, usize)>>);

impl ProgressSink for WatchSink {
    fn update(&self, completed: usize, total: usize) {
        self.0.send_replace((completed, total));
    }
}

/// Text of the progress line.
pub fn format_progress(completed: usize, total: usize) -> String {
    let fraction = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    };
    format!("Approximately {:.2}% done", fraction * 100.0)
}

// ── Report ───────────────────────────────────────────────────────────────────

/// Print the final report: the three totals, then anything that went wrong.
pub fn print_report(report: &Report, provider: &str) {
    println!("Total {} domains: {}", provider, report.member);
    println!("Total non-{} domains: {}", provider, report.non_member);
    println!("Total unresolved domains: {}", report.unresolved);

    if report.errors > 0 {
        println!(
            "Total failed lookups: {} {}",
            report.errors,
            style(format!("({})", format_domain_list(&report.failed_domains, 5))).dim(),
        );
    }

    if report.skipped > 0 {
        println!("Skipped after cancellation: {}", report.skipped);
    }

    for failure in &report.worker_failures {
        println!(
            "{} worker {} crashed, {} domain{} not counted: {}",
            style("•").red(),
            failure.worker,
            failure.batch_len,
            if failure.batch_len == 1 { "" } else { "s" },
            failure.message,
        );
    }

    eprintln!(
        "{}",
        style(format!(
            "{} domains with {} workers in {:.1}s",
            report.classified() + report.errors + report.skipped + report.lost(),
            report.workers,
            report.duration.as_secs_f64()
        ))
        .dim()
    );
}

/// Join domain names, showing at most `max_show` and a count of the rest.
pub fn format_domain_list(domains: &[String], max_show: usize) -> String {
    if domains.len() <= max_show {
        domains.join(", ")
    } else {
        let shown = &domains[..max_show];
        let remaining = domains.len() - max_show;
        format!("{}, ... and {} more", shown.join(", "), remaining)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
