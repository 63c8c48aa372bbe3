use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use eframe::egui;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::panels::{self, LoadStatus};
use super::theme::dashboard_style;
use crate::config::DashboardConfig;
use crate::data_api::data_retriever::{load_dashboard, refresh_scores, DashboardData, DataRetriever};
use crate::data_api::error::LoadError;
use crate::data_api::source::source_for;
use crate::map::hex_layer::HexLayer;
use crate::map::map::{Map, MapState};
use crate::vibe::color_scale::MetricMode;
use crate::vibe::dataset::DatasetSummary;
use crate::vibe::popup::Popup;
use crate::vibe::pulse::{data_age, PulseTicker};

const MAP_ID: &str = "vibe_map";
const FOCUS_ZOOM: f32 = 4.0;
/// Delay before retrying when nothing has loaded yet.
const RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    /// Metadata, grid, scores and sample.
    Full,
    /// Scores and sample only.
    Refresh,
}

type LoadMessage = (LoadKind, Result<DashboardData, LoadError>);

#[derive(Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardApp {
    mode: MetricMode,
    search: String,
    #[serde(skip)]
    config: DashboardConfig,
    #[serde(skip)]
    retriever: Option<Arc<DataRetriever>>,
    #[serde(skip)]
    data: Option<Arc<DashboardData>>,
    #[serde(skip)]
    summary: DatasetSummary,
    #[serde(skip)]
    layer: HexLayer,
    #[serde(skip)]
    ticker: PulseTicker,
    #[serde(skip)]
    selected: Option<String>,
    #[serde(skip)]
    status: LoadStatus,
    #[serde(skip)]
    loading: bool,
    #[serde(skip)]
    last_loaded: Option<Instant>,
    #[serde(skip)]
    started: Instant,
    #[serde(skip)]
    receiver: Option<mpsc::UnboundedReceiver<LoadMessage>>,
    #[serde(skip)]
    sender: Option<mpsc::UnboundedSender<LoadMessage>>,
    #[serde(skip)]
    runtime: Option<tokio::runtime::Runtime>,
}

impl Default for DashboardApp {
    fn default() -> Self {
        let config = DashboardConfig::default();
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            mode: MetricMode::default(),
            search: String::new(),
            ticker: PulseTicker::new(None, Vec::new(), config.ticker_every),
            config,
            retriever: None,
            data: None,
            summary: DatasetSummary::default(),
            layer: HexLayer::default(),
            selected: None,
            status: LoadStatus::Idle,
            loading: false,
            last_loaded: None,
            started: Instant::now(),
            receiver: Some(receiver),
            sender: Some(sender),
            runtime: None,
        }
    }
}

impl eframe::App for DashboardApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_results();
        self.schedule_refresh(ctx);
        // ticker rotation and data age
        ctx.request_repaint_after(Duration::from_secs(1));

        // Test for f11 key, to toggle fullscreen
        if let Some(new_fullscreen) = ctx.input(|i| {
            if i.key_pressed(egui::Key::F11) {
                Some(!i.viewport().fullscreen.unwrap_or(false))
            } else {
                None
            }
        }) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(new_fullscreen));
            ctx.send_viewport_cmd(egui::ViewportCommand::Decorations(!new_fullscreen));
            ctx.send_viewport_cmd(egui::ViewportCommand::Maximized(!new_fullscreen));
            ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
        }

        let data = self.data.clone();

        let mut reload = false;
        egui::TopBottomPanel::top("pulse_bar").show(ctx, |ui| {
            let age = data.as_ref().and_then(|d| data_age(&d.generated_at, Utc::now()));
            reload = panels::pulse_bar(ui, &self.ticker, self.started.elapsed(), age, &self.status);
        });
        if reload {
            self.reload(ctx);
        }

        let mut focus = None;
        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.heading("Vibe map");
                    panels::metric_selector(ui, &mut self.mode);
                    panels::legend(ui, self.mode);
                    ui.separator();

                    let Some(data) = &data else {
                        ui.label("Waiting for data…");
                        return;
                    };

                    egui::CollapsingHeader::new("Summary").default_open(true).show(ui, |ui| {
                        panels::summary(ui, &self.summary);
                        if let Some(index) = panels::extremes(ui, &data.dataset) {
                            focus = Some(index);
                        }
                    });
                    egui::CollapsingHeader::new("Search").default_open(true).show(ui, |ui| {
                        if let Some(index) = panels::search(ui, data, &mut self.search) {
                            focus = Some(index);
                        }
                    });
                    egui::CollapsingHeader::new("Hotspots").default_open(true).show(ui, |ui| {
                        if let Some(index) = panels::hotspots(ui, data) {
                            focus = Some(index);
                        }
                    });
                    egui::CollapsingHeader::new("Insights").show(ui, |ui| {
                        panels::insights(ui, self.ticker.insights());
                    });
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let Some(data) = &data else {
                    ui.centered_and_justified(|ui| match &self.status {
                        LoadStatus::Failed(message) => ui.label(message),
                        _ => ui.spinner(),
                    });
                    return;
                };

                let selected = self.selected.as_deref().and_then(|index| data.dataset.position(index));
                let output = Map::new(MAP_ID, &data.dataset, &self.layer)
                    .viewport_size(ui.available_size())
                    .mode(self.mode)
                    .selected(selected)
                    .show(ui);

                if output.clicked {
                    self.selected = output
                        .hovered
                        .and_then(|slot| data.dataset.cells().get(slot))
                        .map(|cell| cell.index.clone());
                }
            });

        if let (Some(index), Some(data)) = (focus, &data) {
            match data.dataset.get(&index) {
                Some(cell) => {
                    MapState::focus(ctx, egui::Id::new(MAP_ID), cell.center, FOCUS_ZOOM);
                    self.selected = Some(index);
                }
                None => log::warn!("Cell {} is not on the map", index),
            }
        }

        self.show_popup(ctx, data.as_deref());
    }
}

impl DashboardApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let mut app = cc.storage.map(Self::from_storage).unwrap_or_default();
        cc.egui_ctx.set_style(dashboard_style(&cc.egui_ctx));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("vibe-loader")
            .enable_all()
            .build()?;
        let retriever = DataRetriever::new(source_for(&config.data_url, config.request_timeout)?);
        log::info!("Reading dashboard data from {}", retriever.describe());

        app.ticker = PulseTicker::new(None, Vec::new(), config.ticker_every);
        app.config = config;
        app.retriever = Some(Arc::new(retriever));
        app.runtime = Some(runtime);
        app.start_load(&cc.egui_ctx, LoadKind::Full);
        Ok(app)
    }

    pub fn from_storage(storage: &dyn eframe::Storage) -> Self {
        eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
    }

    fn start_load(&mut self, ctx: &egui::Context, kind: LoadKind) {
        if self.loading {
            return;
        }
        let (Some(runtime), Some(retriever), Some(sender)) = (&self.runtime, &self.retriever, &self.sender) else {
            return;
        };
        let retriever = Arc::clone(retriever);
        let sender = sender.clone();
        let requester = ctx.clone();
        let previous = self.data.clone();
        let default_resolution = self.config.default_resolution;
        // A refresh needs something to refresh.
        let kind = if previous.is_none() { LoadKind::Full } else { kind };

        log::debug!("Starting {:?} load from {}", kind, retriever.describe());
        runtime.spawn(async move {
            let result = match (kind, previous) {
                (LoadKind::Refresh, Some(previous)) => refresh_scores(&retriever, &previous).await,
                _ => load_dashboard(&retriever, default_resolution).await,
            };
            if sender.send((kind, result)).is_err() {
                log::warn!("Dashboard closed before the {:?} load finished", kind);
            }
            requester.request_repaint();
        });

        self.loading = true;
        self.status = LoadStatus::Loading;
    }

    /// Full reload, dropping the cached grid first.
    fn reload(&mut self, ctx: &egui::Context) {
        if self.loading {
            return;
        }
        if let (Some(retriever), Some(data)) = (&self.retriever, &self.data) {
            retriever.invalidate(&data.files.core_grid);
        }
        self.start_load(ctx, LoadKind::Full);
    }

    /// Which load, if any, is due now. Until something has loaded, failed
    /// attempts are retried after `RETRY_AFTER` regardless of the refresh cadence.
    fn due_load(&self) -> Option<LoadKind> {
        if self.loading {
            return None;
        }
        let since = self.last_loaded?.elapsed();
        if self.data.is_none() {
            return (since >= RETRY_AFTER).then_some(LoadKind::Full);
        }
        let every = self.config.refresh_every?;
        (since >= every).then_some(LoadKind::Refresh)
    }

    fn schedule_refresh(&mut self, ctx: &egui::Context) {
        if let Some(kind) = self.due_load() {
            log::info!("Starting scheduled {:?} load", kind);
            self.start_load(ctx, kind);
        }
    }

    fn drain_results(&mut self) {
        let mut finished = Vec::new();
        if let Some(receiver) = self.receiver.as_mut() {
            while let Ok(message) = receiver.try_recv() {
                finished.push(message);
            }
        }
        for (kind, result) in finished {
            self.apply(kind, result);
        }
    }

    fn apply(&mut self, kind: LoadKind, result: Result<DashboardData, LoadError>) {
        self.loading = false;
        self.last_loaded = Some(Instant::now());

        match result {
            Ok(data) => {
                log::info!("{:?} load finished: {} cells", kind, data.dataset.len());
                self.layer = HexLayer::build(&data.dataset);
                self.summary = data.dataset.summary();
                self.ticker = PulseTicker::new(data.pulse.clone(), data.insights.clone(), self.config.ticker_every);
                if let Some(index) = &self.selected {
                    if data.dataset.get(index).is_none() {
                        self.selected = None;
                    }
                }
                self.data = Some(Arc::new(data));
                self.status = LoadStatus::Ready;
            }
            Err(e) => {
                // Previous data stays on screen
                log::error!("{:?} load failed: {}", kind, e);
                self.status = LoadStatus::Failed(e.to_string());
            }
        }
    }

    fn show_popup(&mut self, ctx: &egui::Context, data: Option<&DashboardData>) {
        let Some(cell) = data.zip(self.selected.as_deref()).and_then(|(data, index)| data.dataset.get(index)) else {
            return;
        };
        let popup = Popup::for_cell(cell);

        let mut open = true;
        egui::Window::new(popup.title.clone())
            .id(egui::Id::new("cell_popup"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(320.0)
            .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
            .show(ctx, |ui| panels::popup_contents(ui, &popup));

        if !open {
            self.selected = None;
        }
    }
}
