// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Main loop: one task owns the session, draining engine events and
//! keystrokes between frames so the peer mirror is never mutated while a
//! render is reading it.

use std::io::Stdout;
use std::time::Duration;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{self, Event as CrosstermEvent};
use ratatui::Terminal;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{error, info};

use crate::config::Settings;
use crate::engine::{Engine, EngineEvent};
use crate::errors::MonitorError;
use crate::session::DownloadSession;
use crate::tui;

pub struct App<E: Engine> {
    session: DownloadSession<E>,
    engine_event_rx: mpsc::UnboundedReceiver<EngineEvent>,
    key_event_rx: mpsc::Receiver<CrosstermEvent>,
    settings: Settings,
    should_quit: bool,
}

impl<E: Engine> App<E> {
    pub fn new(engine: E, settings: Settings) -> Result<Self, MonitorError> {
        let (session, engine_event_rx) = DownloadSession::new(engine)?;

        // Crossterm reads are blocking; park them on their own task and
        // forward over a channel (the sole suspension point stays here).
        let (key_event_tx, key_event_rx) = mpsc::channel(100);
        tokio::spawn(async move {
            loop {
                match tokio::task::spawn_blocking(event::read).await {
                    Ok(Ok(ev)) => {
                        if key_event_tx.send(ev).await.is_err() {
                            break;
                        }
                    }
                    Ok(Err(e)) => {
                        error!("crossterm event read failed: {e}");
                        break;
                    }
                    Err(e) => {
                        error!("input task panicked: {e}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            session,
            engine_event_rx,
            key_event_rx,
            settings,
            should_quit: false,
        })
    }

    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<(), MonitorError> {
        let mut draw_interval =
            time::interval(Duration::from_millis(self.settings.draw_interval_ms.max(17)));

        while !self.should_quit {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    self.should_quit = true;
                }
                Some(event) = self.key_event_rx.recv() => {
                    if let CrosstermEvent::Key(key) = event {
                        if !tui::events::handle_key(key, &mut self.session, &self.settings)? {
                            info!("operator left the view");
                            self.should_quit = true;
                        }
                    }
                    // Resizes need no bookkeeping: dimensions are queried
                    // fresh on every draw.
                }
                Some(event) = self.engine_event_rx.recv() => {
                    self.session.on_event(event)?;
                }
                _ = draw_interval.tick() => {
                    self.session.guard()?;
                    terminal.draw(|f| tui::view::draw(f, &mut self.session))?;
                }
            }
        }

        self.session.close();
        Ok(())
    }
}
