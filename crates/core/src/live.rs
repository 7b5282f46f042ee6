//! The live map event loop.
//!
//! [`LiveMap`] owns the map surface and every component that draws on it.
//! One task runs [`LiveMap::run`], which selects over the vehicle poll
//! timer, the theme timer, user commands and finished fetches. Fetches run
//! on their own tasks and report back through a channel, so a slow network
//! never blocks the loop, and every surface mutation happens on the loop
//! task.

use std::sync::Arc;
use std::time::Duration;

use mpk_transit::api_types::{LineSummary, RouteResponse, VehicleRecord};
use mpk_transit::{LineIdentifier, TransitError, TransitSource};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

use crate::config::{ConfigError, ViewerConfig};
use crate::lines::LineCatalog;
use crate::map::{MapSurface, RoutePalette};
use crate::panel::{PanelSnapshot, RoutePanel};
use crate::session::{OpenOutcome, OpenTicket, RouteSelection};
use crate::theme::{ThemeSelector, local_hour};
use crate::vehicles::{PollTicket, ReconcileOutcome, VehicleReconciler};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("live map has stopped")]
    Stopped,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Filter vehicles to a line and render its routes
    SelectLine(LineIdentifier),
    /// Clear the filter and close the route session
    Reset,
    ToggleGroup(usize),
    SetGroupVisible { index: usize, visible: bool },
    ShowSatellite,
    ShowStreet,
    RefreshVehicles,
}

enum Completion {
    Lines(Result<Vec<LineSummary>, TransitError>),
    Vehicles(PollTicket, Result<Vec<VehicleRecord>, TransitError>),
    Route(OpenTicket, Result<RouteResponse, TransitError>),
}

/// Source of the local hour, replaceable in tests
pub type HourClock = Box<dyn Fn() -> u32 + Send + Sync>;

/// Cloneable remote control for a running [`LiveMap`]
#[derive(Clone, Debug)]
pub struct LiveMapHandle {
    commands: mpsc::Sender<Command>,
    panel: watch::Receiver<PanelSnapshot>,
}

impl LiveMapHandle {
    pub async fn send(&self, command: Command) -> Result<(), ViewerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ViewerError::Stopped)
    }

    pub async fn select_line(&self, line: impl Into<LineIdentifier>) -> Result<(), ViewerError> {
        self.send(Command::SelectLine(line.into())).await
    }

    pub async fn reset(&self) -> Result<(), ViewerError> {
        self.send(Command::Reset).await
    }

    pub async fn toggle_group(&self, index: usize) -> Result<(), ViewerError> {
        self.send(Command::ToggleGroup(index)).await
    }

    pub async fn set_group_visible(&self, index: usize, visible: bool) -> Result<(), ViewerError> {
        self.send(Command::SetGroupVisible { index, visible }).await
    }

    pub async fn show_satellite(&self) -> Result<(), ViewerError> {
        self.send(Command::ShowSatellite).await
    }

    pub async fn show_street(&self) -> Result<(), ViewerError> {
        self.send(Command::ShowStreet).await
    }

    pub async fn refresh_vehicles(&self) -> Result<(), ViewerError> {
        self.send(Command::RefreshVehicles).await
    }

    /// Latest published panel state
    pub fn panel(&self) -> PanelSnapshot {
        self.panel.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.panel.clone()
    }
}

pub struct LiveMap<S> {
    surface: S,
    source: Arc<dyn TransitSource>,
    palette: RoutePalette,
    poll_interval: Duration,
    theme_interval: Duration,
    clock: HourClock,

    theme: ThemeSelector,
    vehicles: VehicleReconciler,
    routes: RouteSelection,
    lines: LineCatalog,

    commands: mpsc::Receiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    panel: watch::Sender<PanelSnapshot>,
}

impl<S: MapSurface + Send + 'static> LiveMap<S> {
    pub fn new(
        surface: S,
        source: Arc<dyn TransitSource>,
        config: &ViewerConfig,
    ) -> Result<(Self, LiveMapHandle), ViewerError> {
        config.validate()?;

        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (panel, panel_rx) = watch::channel(PanelSnapshot::default());

        let live = Self {
            surface,
            source,
            palette: config.palette()?,
            poll_interval: config.poll_interval(),
            theme_interval: config.theme_interval(),
            clock: Box::new(local_hour),
            theme: ThemeSelector::new(),
            vehicles: VehicleReconciler::new(),
            routes: RouteSelection::new(),
            lines: LineCatalog::default(),
            commands,
            completions_tx,
            completions,
            panel,
        };
        let handle = LiveMapHandle {
            commands: command_tx,
            panel: panel_rx,
        };
        Ok((live, handle))
    }

    pub fn with_clock(mut self, clock: impl Fn() -> u32 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Run until every [`LiveMapHandle`] is dropped, then hand the surface
    /// back with whatever is still drawn on it.
    pub async fn run(mut self) -> S {
        self.refresh_theme();
        self.spawn_lines_fetch();
        self.publish();

        // The first poll tick fires immediately.
        let mut poll = time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut theme = time::interval_at(time::Instant::now() + self.theme_interval, self.theme_interval);
        theme.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval = ?self.poll_interval,
            theme_interval = ?self.theme_interval,
            "Live map started"
        );

        loop {
            tokio::select! {
                _ = poll.tick() => self.spawn_vehicle_poll(),
                _ = theme.tick() => self.refresh_theme(),
                Some(completion) = self.completions.recv() => self.on_completion(completion),
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }
            self.publish();
        }

        tracing::info!("Live map stopped");
        self.surface
    }

    fn on_command(&mut self, command: Command) {
        tracing::debug!(?command, "Handling command");
        match command {
            Command::SelectLine(line) => {
                match self.lines.kind_of(line.as_str()) {
                    Some(kind) => tracing::info!(%line, %kind, "Selecting line"),
                    None if !self.lines.is_empty() => {
                        tracing::warn!(%line, "Selecting a line missing from the line list")
                    }
                    None => tracing::info!(%line, "Selecting line"),
                }
                if self.vehicles.set_filter(Some(line.clone())) {
                    self.spawn_vehicle_poll();
                }
                let ticket = self.routes.begin_open(line);
                self.spawn_route_fetch(ticket);
            }
            Command::Reset => {
                self.vehicles.set_filter(None);
                self.routes.reset(&mut self.surface);
                self.spawn_vehicle_poll();
            }
            Command::ToggleGroup(index) => {
                if let Some(session) = self.routes.active_mut() {
                    if let Err(error) = session.toggle_group(&mut self.surface, index) {
                        tracing::warn!(%error, index, "Cannot toggle route group");
                    }
                }
            }
            Command::SetGroupVisible { index, visible } => {
                if let Some(session) = self.routes.active_mut() {
                    if let Err(error) = session.set_group_visible(&mut self.surface, index, visible) {
                        tracing::warn!(%error, index, "Cannot change route group visibility");
                    }
                }
            }
            Command::ShowSatellite => self.theme.show_satellite(&mut self.surface),
            Command::ShowStreet => {
                let hour = (self.clock)();
                self.theme.show_street(&mut self.surface, hour);
            }
            Command::RefreshVehicles => self.spawn_vehicle_poll(),
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Lines(Ok(lines)) => {
                self.lines = LineCatalog::from_summaries(lines);
                tracing::info!(
                    total = self.lines.len(),
                    buses = self.lines.buses.len(),
                    trams = self.lines.trams.len(),
                    "Loaded line list"
                );
            }
            Completion::Lines(Err(error)) => {
                tracing::warn!(%error, "Failed to load line list");
            }
            Completion::Vehicles(ticket, result) => {
                if let ReconcileOutcome::Applied { drawn, .. } =
                    self.vehicles.apply(&mut self.surface, ticket, result)
                {
                    tracing::trace!(drawn, "Vehicle markers updated");
                }
            }
            Completion::Route(ticket, result) => {
                match self.routes.complete(&mut self.surface, &self.palette, ticket, result) {
                    OpenOutcome::Unavailable(unavailable) => tracing::info!(
                        line = %unavailable.line,
                        error = %unavailable.error,
                        source = ?unavailable.source,
                        "Route unavailable"
                    ),
                    OpenOutcome::Rendered { .. } | OpenOutcome::Stale => {}
                }
            }
        }
    }

    fn refresh_theme(&mut self) {
        let hour = (self.clock)();
        if self.theme.refresh(&mut self.surface, hour) {
            tracing::info!(hour, layer = ?self.theme.active_layer(), "Base layer changed");
        }
    }

    fn spawn_lines_fetch(&self) {
        let source = Arc::clone(&self.source);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.lines().await;
            let _ = tx.send(Completion::Lines(result));
        });
    }

    fn spawn_vehicle_poll(&mut self) {
        let ticket = self.vehicles.begin_poll();
        let source = Arc::clone(&self.source);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.vehicles().await;
            let _ = tx.send(Completion::Vehicles(ticket, result));
        });
    }

    fn spawn_route_fetch(&self, ticket: OpenTicket) {
        let source = Arc::clone(&self.source);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = source.route(ticket.line()).await;
            let _ = tx.send(Completion::Route(ticket, result));
        });
    }

    fn publish(&self) {
        let snapshot = PanelSnapshot {
            lines: self.lines.clone(),
            selected_line: self.vehicles.filter().map(|line| line.to_string()),
            route: RoutePanel::capture(&self.routes),
            vehicles_drawn: self.vehicles.marker_count(),
            base_layer: self.theme.active_layer(),
        };
        self.panel.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use geo::Point;
    use mpk_transit::StaticTransitProvider;
    use mpk_transit::api_types::{
        Direction, RouteDetail, RouteUnavailable, Stop, VehicleKind,
    };
    use tokio::task::JoinHandle;

    use super::*;
    use crate::map::LayerStore;
    use crate::theme::BaseLayer;

    fn vehicle(line: &str, kind: VehicleKind) -> VehicleRecord {
        VehicleRecord {
            id: None,
            lat: 51.1,
            lon: 17.03,
            line: line.into(),
            kind,
        }
    }

    fn provider() -> StaticTransitProvider {
        let round_trip = RouteDetail {
            line: "4".into(),
            directions: vec![
                Direction {
                    direction_name: "A→B".into(),
                    stops: vec![Stop::at("A", 51.0, 17.0), Stop::at("B", 51.1, 17.1)],
                },
                Direction {
                    direction_name: "B→A".into(),
                    stops: vec![Stop::at("B", 51.1, 17.1), Stop::at("A", 51.0, 17.0)],
                },
            ],
        };
        let unavailable = RouteUnavailable {
            line: Some("9".into()),
            error: "no data".into(),
            source: Some("GTFS".into()),
        };
        let provider = StaticTransitProvider::from_data(
            vec![
                LineSummary { line: "4".into(), kind: VehicleKind::Tram },
                LineSummary { line: "145".into(), kind: VehicleKind::Bus },
                LineSummary { line: "9".into(), kind: VehicleKind::Tram },
            ],
            vec![
                ("4".into(), RouteResponse::Detail(round_trip)),
                ("9".into(), RouteResponse::Unavailable(unavailable)),
            ],
        );
        provider.set_vehicles(vec![
            vehicle("4", VehicleKind::Tram),
            vehicle("4", VehicleKind::Tram),
            vehicle("145", VehicleKind::Bus),
        ]);
        provider
    }

    fn start(
        provider: &StaticTransitProvider,
        hour: Arc<AtomicU32>,
    ) -> (LiveMapHandle, JoinHandle<LayerStore>) {
        let surface = LayerStore::new(Point::new(17.0385, 51.1079), 13);
        let (live, handle) =
            LiveMap::new(surface, Arc::new(provider.clone()), &ViewerConfig::default()).unwrap();
        let live = live.with_clock(move || hour.load(Ordering::SeqCst));
        (handle, tokio::spawn(live.run()))
    }

    async fn wait_for(
        handle: &LiveMapHandle,
        predicate: impl Fn(&PanelSnapshot) -> bool,
    ) -> PanelSnapshot {
        let mut panel = handle.subscribe();
        let wait = async {
            loop {
                {
                    let current = panel.borrow_and_update();
                    if predicate(&current) {
                        return current.clone();
                    }
                }
                panel.changed().await.expect("live map stopped");
            }
        };
        time::timeout(Duration::from_secs(3600), wait)
            .await
            .expect("panel never reached the expected state")
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_loads_lines_and_vehicles() {
        let (handle, task) = start(&provider(), Arc::new(AtomicU32::new(12)));

        let snapshot = wait_for(&handle, |p| p.vehicles_drawn == 3 && !p.lines.is_empty()).await;
        assert_eq!(snapshot.lines.trams, vec!["4", "9"]);
        assert_eq!(snapshot.lines.buses, vec!["145"]);
        assert_eq!(snapshot.base_layer, Some(BaseLayer::Street));
        assert_eq!(snapshot.route, RoutePanel::Closed);

        drop(handle);
        let surface = task.await.unwrap();
        assert_eq!(surface.tile_layers(), vec![BaseLayer::Street]);
        assert_eq!(surface.markers().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_polls_without_waiting_for_the_interval() {
        let (handle, task) = start(&provider(), Arc::new(AtomicU32::new(12)));
        wait_for(&handle, |p| p.vehicles_drawn == 3).await;
        let poll_interval = ViewerConfig::default().poll_interval();

        let selected = time::Instant::now();
        handle.select_line("145").await.unwrap();
        wait_for(&handle, |p| p.vehicles_drawn == 1).await;
        assert!(selected.elapsed() < poll_interval);

        let reset = time::Instant::now();
        handle.reset().await.unwrap();
        wait_for(&handle, |p| p.vehicles_drawn == 3).await;
        assert!(reset.elapsed() < poll_interval);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_toggle_and_reset() {
        let (handle, task) = start(&provider(), Arc::new(AtomicU32::new(12)));
        wait_for(&handle, |p| p.vehicles_drawn == 3).await;

        handle.select_line("4").await.unwrap();
        let snapshot = wait_for(&handle, |p| {
            p.vehicles_drawn == 2 && matches!(p.route, RoutePanel::Rendered { .. })
        })
        .await;
        assert_eq!(snapshot.selected_line.as_deref(), Some("4"));
        let RoutePanel::Rendered { groups, .. } = snapshot.route else {
            unreachable!()
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "A <-> B");

        handle.toggle_group(0).await.unwrap();
        wait_for(&handle, |p| match &p.route {
            RoutePanel::Rendered { groups, .. } => !groups[0].visible,
            _ => false,
        })
        .await;

        handle.reset().await.unwrap();
        let snapshot = wait_for(&handle, |p| p.route == RoutePanel::Closed && p.vehicles_drawn == 3).await;
        assert_eq!(snapshot.selected_line, None);

        drop(handle);
        let surface = task.await.unwrap();
        assert_eq!(surface.polylines().count(), 0);
        assert_eq!(surface.markers().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_route_is_reported() {
        let (handle, task) = start(&provider(), Arc::new(AtomicU32::new(12)));

        handle.select_line("9").await.unwrap();
        let snapshot = wait_for(&handle, |p| matches!(p.route, RoutePanel::Unavailable { .. })).await;
        assert_eq!(
            snapshot.route,
            RoutePanel::Unavailable {
                line: "9".into(),
                error: "no data".into(),
                source: Some("GTFS".into()),
            }
        );

        drop(handle);
        let surface = task.await.unwrap();
        assert_eq!(surface.polylines().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_theme_follows_clock_unless_satellite() {
        let hour = Arc::new(AtomicU32::new(12));
        let (handle, task) = start(&provider(), Arc::clone(&hour));
        wait_for(&handle, |p| p.base_layer == Some(BaseLayer::Street)).await;

        hour.store(22, Ordering::SeqCst);
        wait_for(&handle, |p| p.base_layer == Some(BaseLayer::Dark)).await;

        handle.show_satellite().await.unwrap();
        wait_for(&handle, |p| p.base_layer == Some(BaseLayer::Satellite)).await;

        hour.store(10, Ordering::SeqCst);
        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(handle.panel().base_layer, Some(BaseLayer::Satellite));

        handle.show_street().await.unwrap();
        wait_for(&handle, |p| p.base_layer == Some(BaseLayer::Street)).await;

        drop(handle);
        let surface = task.await.unwrap();
        assert_eq!(surface.tile_layers(), vec![BaseLayer::Street]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_keeps_markers_until_next_success() {
        let provider = provider();
        let (handle, task) = start(&provider, Arc::new(AtomicU32::new(12)));
        wait_for(&handle, |p| p.vehicles_drawn == 3).await;

        provider.fail_vehicles("upstream timeout");
        handle.refresh_vehicles().await.unwrap();
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(handle.panel().vehicles_drawn, 3);

        provider.set_vehicles(vec![]);
        wait_for(&handle, |p| p.vehicles_drawn == 0).await;

        drop(handle);
        let surface = task.await.unwrap();
        assert_eq!(surface.markers().count(), 0);
    }
}
