//! Connection state machine.
//!
//! The controller owns all dashboard state and handles one [`Event`] at a
//! time. Backend calls run as separate tasks and report back through the
//! same event channel, so operator actions and poll ticks keep flowing while
//! a request is outstanding. Results are applied in the order they arrive;
//! there is no request generation, so a status response that lands after the
//! session ended is still applied.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    backend::{Ack, Backend, BackendFailure, BackendResult},
    config::{DashboardConfig, DEFAULT_TIMEOUT_MS},
    task::Task,
    telemetry::{self, TelemetryDisplay, TelemetrySample},
    timer::PollTimer,
    trail::TrailTracker,
    view::{Dashboard, StatusKind, StatusLine},
};

mod state;

pub use state::{Affordances, ConnectionState};

#[derive(Debug, Clone)]
pub enum Event {
    Connect,
    Disconnect,
    CheckStatus,
    Ping,
    ShowTelemetry,
    ShowTrail,

    PollTick,

    ConnectFinished(BackendResult<Ack>),
    DisconnectFinished(BackendResult<Ack>),
    StatusFinished(BackendResult<TelemetrySample>),
    PingFinished(BackendResult<String>),
}

pub struct Controller<D> {
    backend: Arc<dyn Backend>,
    dashboard: D,
    trail: TrailTracker,
    timer: PollTimer,
    /// Longest wait for the backend to acknowledge a disconnect
    disconnect_timeout: Duration,
    state: ConnectionState,
    last_sample: Option<TelemetrySample>,
    evt_tx: flume::Sender<Event>,
    evt_rx: flume::Receiver<Event>,
}

pub fn create_task<D: Dashboard>(
    config: &DashboardConfig,
    backend: Arc<dyn Backend>,
    dashboard: D,
) -> Controller<D> {
    let (evt_tx, evt_rx) = flume::unbounded();

    Controller {
        backend,
        dashboard,
        trail: TrailTracker::new(&config.map),
        timer: PollTimer::new(Duration::from_millis(config.poll.interval_ms)),
        disconnect_timeout: Duration::from_millis(
            config.backend.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        ),
        state: ConnectionState::Disconnected,
        last_sample: None,
        evt_tx,
        evt_rx,
    }
}

impl<D: Dashboard> Controller<D> {
    /// Sender for operator actions.
    pub fn actions(&self) -> flume::Sender<Event> {
        self.evt_tx.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn affordances(&self) -> Affordances {
        Affordances::for_state(self.state)
    }

    pub fn trail(&self) -> &TrailTracker {
        &self.trail
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_active()
    }

    /// Draws the idle dashboard.
    pub fn present(&mut self) {
        self.dashboard
            .show_status(&StatusLine::new(StatusKind::Disconnected, "Disconnected"));
        self.dashboard.show_telemetry(&TelemetryDisplay::Disconnected);
        self.trail.reset(&mut self.dashboard);
        self.refresh_affordances();
    }

    pub fn handle(&mut self, event: Event) {
        trace!("handling {:?}", event);

        match event {
            Event::Connect => self.connect(),
            Event::Disconnect => self.disconnect(),
            Event::CheckStatus => {
                if !self.affordances().status {
                    warn!("status check is unavailable while disconnected");
                    return;
                }

                self.fetch_status();
            }
            Event::Ping => {
                self.spawn_call(|backend| async move { Event::PingFinished(backend.ping().await) })
            }
            Event::ShowTelemetry => {
                let display = telemetry::format(self.last_sample.as_ref());
                self.dashboard.show_details(&display);
            }
            Event::ShowTrail => {
                let summary = self.trail.summary();
                self.dashboard.show_note(&format!("trail: {}", summary));
            }

            Event::PollTick => {
                // a tick can still be queued after the timer was stopped
                if !self.timer.is_active() {
                    trace!("dropping tick from stopped poll timer");
                    return;
                }

                self.fetch_status();
            }

            Event::ConnectFinished(result) => self.on_connect_result(result),
            Event::DisconnectFinished(result) => self.on_disconnect_result(result),
            Event::StatusFinished(Ok(sample)) => self.on_poll_result(sample),
            Event::StatusFinished(Err(err)) => {
                warn!("status request failed: {}", err);
                self.end_session();
                self.set_status(StatusKind::Error, format!("Status Error: {}", err));
            }
            Event::PingFinished(Ok(message)) => {
                self.dashboard.show_note(&format!("backend: {}", message))
            }
            Event::PingFinished(Err(err)) => {
                warn!("backend health check failed: {}", err);
                self.dashboard
                    .show_note(&format!("backend unreachable: {}", err));
            }
        }
    }

    fn connect(&mut self) {
        if !self.affordances().connect {
            warn!("already connected");
            return;
        }

        info!("connecting to vehicle");
        self.set_status(StatusKind::Pending, "Connecting...");
        self.spawn_call(|backend| async move { Event::ConnectFinished(backend.connect().await) });
    }

    fn disconnect(&mut self) {
        if !self.affordances().disconnect {
            warn!("not connected");
            return;
        }

        info!("disconnecting from vehicle");

        // no tick may fire once the operator asked to disconnect
        self.timer.stop();

        self.set_status(StatusKind::Pending, "Disconnecting...");

        // the session ends even if the backend never answers
        let deadline = self.disconnect_timeout;
        self.spawn_call(move |backend| async move {
            let result = match tokio::time::timeout(deadline, backend.disconnect()).await {
                Ok(result) => result,
                Err(_) => Err(BackendFailure::Network(format!(
                    "no answer within {} ms",
                    deadline.as_millis()
                ))),
            };

            Event::DisconnectFinished(result)
        });
    }

    fn on_connect_result(&mut self, result: BackendResult<Ack>) {
        match result {
            Ok(ack) => {
                info!("connected: {:?}", ack.message);

                self.state = ConnectionState::Connected;
                self.trail.begin_session(&mut self.dashboard);

                let text = match ack.message {
                    Some(message) => format!("Connected: {}", message),
                    None => "Connected".to_owned(),
                };
                self.set_status(StatusKind::Connected, text);
                self.refresh_affordances();

                self.fetch_status();
                self.timer.start(self.evt_tx.clone(), Event::PollTick);
            }
            Err(err) => {
                warn!("connection failed: {}", err);

                self.state = ConnectionState::Disconnected;
                self.timer.stop();
                self.set_status(StatusKind::Error, format!("Connection Failed: {}", err));
                self.refresh_affordances();
            }
        }
    }

    fn on_disconnect_result(&mut self, result: BackendResult<Ack>) {
        self.end_session();

        match result {
            Ok(_) => {
                info!("disconnected");
                self.set_status(StatusKind::Disconnected, "Disconnected");
            }
            Err(err) => {
                warn!("backend failed to disconnect, marking as disconnected anyway: {}", err);
                self.set_status(
                    StatusKind::Disconnected,
                    format!("Disconnected (backend error: {})", err),
                );
            }
        }
    }

    fn on_poll_result(&mut self, sample: TelemetrySample) {
        if !sample.is_connected {
            warn!("backend reports the vehicle connection was lost");
            self.end_session();
            self.set_status(StatusKind::Error, "Connection lost");
            return;
        }

        self.dashboard
            .show_telemetry(&telemetry::format(Some(&sample)));
        self.trail.update(&sample, &mut self.dashboard);
        self.last_sample = Some(sample);
    }

    /// Tears down the session: polling, trail and telemetry.
    fn end_session(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.timer.stop();
        self.trail.reset(&mut self.dashboard);
        self.last_sample = None;
        self.dashboard.show_telemetry(&TelemetryDisplay::Disconnected);
        self.refresh_affordances();
    }

    fn refresh_affordances(&mut self) {
        let affordances = self.affordances();
        self.dashboard.show_affordances(affordances);
    }

    fn fetch_status(&self) {
        self.spawn_call(|backend| async move { Event::StatusFinished(backend.status().await) });
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.dashboard.show_status(&StatusLine::new(kind, text));
    }

    fn spawn_call<F, Fut>(&self, call: F)
    where
        F: FnOnce(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = Event> + Send + 'static,
    {
        let fut = call(self.backend.clone());
        let evt_tx = self.evt_tx.clone();

        tokio::spawn(async move {
            let _ = evt_tx.send_async(fut.await).await;
        });
    }
}

#[async_trait]
impl<D: Dashboard> Task for Controller<D> {
    fn name(&self) -> &'static str {
        "controller"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut this = *self;
        let evt_rx = this.evt_rx.clone();

        this.present();

        loop {
            select! {
                _ = cancel.cancelled() => break,
                evt = evt_rx.recv_async() => match evt {
                    Ok(evt) => this.handle(evt),
                    Err(_) => break,
                },
            }
        }

        this.timer.stop();

        Ok(())
    }
}
