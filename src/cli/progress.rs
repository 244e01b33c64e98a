//! Terminal progress display for a running transfer
//!
//! Renders the session event stream with a single indicatif bar: a spinner
//! while probing, a percentage bar while bytes move, and status messages for
//! post-processing passes. Session log lines are printed above the bar so
//! they survive redraws.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::models::{PostProcessPhase, ProgressPhase, SessionEvent};

const BAR_SCALE: u64 = 1000;

/// Single-transfer progress renderer
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    /// Create a display; `quiet` renders nothing
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(BAR_SCALE)
        };
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {msg:30!} [{wide_bar:.cyan/blue}] {percent:>3}%",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message("Starting");
        Self { bar }
    }

    /// Consume the event stream on a background task
    pub fn spawn(self, events: mpsc::Receiver<SessionEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    async fn run(self, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.render(&event);
        }
        self.bar.finish_and_clear();
    }

    fn render(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Progress(progress) => match progress.phase {
                ProgressPhase::Probing => {
                    self.bar.set_message("Fetching media info");
                }
                ProgressPhase::Downloading => {
                    if let Some(percent) = progress.percent {
                        self.bar.set_position((percent as f64 * BAR_SCALE as f64) as u64);
                    }
                    let mut status = String::from("Downloading");
                    if let Some(speed) = &progress.speed {
                        status = speed.clone();
                        if let Some(eta) = &progress.eta {
                            status.push_str(" ETA ");
                            status.push_str(eta);
                        }
                    }
                    self.bar.set_message(status);
                }
                ProgressPhase::Finished => {
                    self.bar.set_position(BAR_SCALE);
                    self.bar.set_message("Download complete");
                }
            },
            SessionEvent::PostProcess(post) => {
                let status = match post.phase {
                    PostProcessPhase::Started => format!("{} started", post.processor),
                    PostProcessPhase::Processing => match &post.file_name {
                        Some(name) => format!("{}: {}", post.processor, name),
                        None => format!("{} working", post.processor),
                    },
                    PostProcessPhase::Finished => format!("{} done", post.processor),
                };
                self.bar.set_message(status);
            }
            SessionEvent::Log(line) => {
                self.bar.println(line);
            }
        }
    }
}
