use chrono::{Local, NaiveDateTime};
use notify_rust::Notification;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, Write};

use crate::constants::TICK_INTERVAL_MS;
use crate::countdown::countdown_mode::CountdownMode;
use crate::countdown::time_calculator;
use crate::prefs::preference_store::PreferenceStore;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// One redraw worth of content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub title: String,
    pub text: String,
    pub mode: CountdownMode,
    #[serde(skip)]
    pub target: NaiveDateTime,
    #[serde(skip)]
    pub now: NaiveDateTime,
}

pub struct WallpaperEngine<'a> {
    prefs: &'a PreferenceStore,
    log_file: Option<String>,
    previous: Option<(CountdownMode, NaiveDateTime, NaiveDateTime)>, // (mode, target, now)
}

impl<'a> WallpaperEngine<'a> {
    pub fn new(prefs: &'a PreferenceStore, log_file: Option<String>) -> Self {
        let engine = Self {
            prefs,
            log_file,
            previous: None,
        };
        engine.log(&format!(
            "=== Session started at {} ===",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        engine
    }

    fn log_to_file(path: &str, message: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", message)?;
        Ok(())
    }

    fn log(&self, message: &str) {
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::log_to_file(path, message) {
                log::debug!("Could not append to {}: {}", path, e);
            }
        }
    }

    /// Reads the current preferences and computes the text for `now`.
    pub fn frame(&self, now: NaiveDateTime) -> Frame {
        let mode = self.prefs.mode();
        let target = self.prefs.target_date(now);
        Frame {
            title: self.prefs.title(),
            text: time_calculator::calculate(mode, target, now),
            mode,
            target,
            now,
        }
    }

    /// True when the target fell between the previous frame and this one,
    /// with the mode and target unchanged in between. Changing either starts
    /// tracking over, so a target that is already past never fires.
    fn just_reached(&mut self, frame: &Frame) -> bool {
        let crossed = match self.previous {
            Some((mode, target, prev_now)) => {
                mode == CountdownMode::FullCountdown
                    && mode == frame.mode
                    && target == frame.target
                    && prev_now < target
                    && target <= frame.now
            }
            None => false,
        };
        self.previous = Some((frame.mode, frame.target, frame.now));
        crossed
    }

    fn on_reached(&self, frame: &Frame) {
        let msg = format!(
            "[{}] Countdown reached: {}",
            Local::now().format("%H:%M:%S"),
            frame.title
        );
        println!("\n🔔 {}", msg);
        self.log(&format!("🔔 {}", msg));
        log::info!("Target reached for {:?}", frame.title);

        if let Err(e) = send_notification(&frame.title) {
            log::error!("Failed to send notification: {}", e);
        }
    }

    fn draw(frame: &Frame) -> io::Result<()> {
        let mut out = io::stdout().lock();
        write!(out, "\r\x1b[2K{}  {}", frame.title, frame.text)?;
        out.flush()
    }

    /// Redraws once per tick until Ctrl+C.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut ticker = interval(Duration::from_millis(TICK_INTERVAL_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut ctrl_c => {
                    println!();
                    self.log(&format!(
                        "=== Session ended at {} ===",
                        Local::now().format("%Y-%m-%d %H:%M:%S")
                    ));
                    return Ok(());
                }
            }

            if let Err(e) = self.prefs.reload() {
                log::debug!("Keeping cached preferences: {:#}", e);
            }

            let frame = self.frame(Local::now().naive_local());
            if self.just_reached(&frame) {
                self.on_reached(&frame);
            }
            Self::draw(&frame)?;
        }
    }
}

fn send_notification(title: &str) -> Result<(), Box<dyn std::error::Error>> {
    Notification::new()
        .summary("Countdown Wallpaper")
        .body(&format!("{} is here!", title))
        .timeout(0) // No auto-dismiss
        .show()?;
    Ok(())
}
