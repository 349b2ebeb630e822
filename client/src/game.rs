use crate::api::{HttpProgressApi, ProgressApi};
use crate::coalescer::ClientState;
use crate::config::SaveConfig;
use crate::logger::Logger;
use crate::session::{Session, SessionEvent};
use anyhow::{Context, Result};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tapgame_core::{Progress, TapOutcome};
use tokio::sync::mpsc;

/// Prints the saved progress.
pub async fn show(api: &HttpProgressApi) -> Result<()> {
    let progress = api.load().await.context("Could not load progress")?;
    print_progress(progress);
    Ok(())
}

/// Interactive game loop on the terminal.
///
/// Enter taps, `p` stands in for the app going to the background, `q` (or EOF, or
/// Ctrl-C) closes the game. Closing flushes unsaved taps before exiting.
pub async fn play(api: HttpProgressApi, save: &SaveConfig) -> Result<()> {
    // Bail out if loading fails. Starting from zero would overwrite the real
    // progress with the first save.
    let initial = api.load().await.context("Could not load progress")?;

    Logger::banner();
    print_progress(initial);
    Logger::info(Logger::dim("Enter = tap, p = background, q = quit"));

    let session = Session::new(Arc::new(api), initial, save.coalescer(), save.force_timeout());
    let (tx, rx) = mpsc::channel(64);

    // Stdin is read on a plain thread: a blocked read must not keep the runtime alive
    // once the session is over.
    let input = tx.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let event = match line.trim() {
                "q" | "quit" => SessionEvent::Close,
                "p" => SessionEvent::Hide,
                _ => SessionEvent::Tap,
            };
            if input.blocking_send(event).is_err() || event == SessionEvent::Close {
                return;
            }
        }
        let _ = input.blocking_send(SessionEvent::Close);
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(SessionEvent::Close).await;
        }
    });

    let state = session
        .run(rx, |outcome| {
            render_tap(outcome);
            Logger::info(format!(
                "Score {}  Level {}",
                Logger::highlight(outcome.progress.score),
                Logger::highlight(outcome.progress.level)
            ));
        })
        .await;

    report(state);
    Ok(())
}

/// Taps `count` times, then closes the session.
pub async fn tap(api: HttpProgressApi, save: &SaveConfig, count: u32, delay: Duration) -> Result<()> {
    let initial = api.load().await.context("Could not load progress")?;

    let session = Session::new(Arc::new(api), initial, save.coalescer(), save.force_timeout());
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        for _ in 0..count {
            if tx.send(SessionEvent::Tap).await.is_err() {
                return;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        let _ = tx.send(SessionEvent::Close).await;
    });

    let state = session.run(rx, render_tap).await;

    report(state);
    Ok(())
}

fn render_tap(outcome: &TapOutcome) {
    if outcome.leveled_up {
        Logger::level_up(outcome.progress.level);
    }
}

fn print_progress(progress: Progress) {
    Logger::info(format!(
        "Score: {}  Level: {}",
        Logger::highlight(progress.score),
        Logger::highlight(progress.level)
    ));
}

fn report(state: ClientState) {
    print_progress(state.progress);
    if state.pending_save {
        Logger::warn("Last taps could not be saved; they will be lost.");
    } else {
        Logger::success("Progress saved.");
    }
}
