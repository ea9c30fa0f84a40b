use crate::config::Config;
use crate::core::menu::TransformMenu;
use crate::core::{
    ColumnId, ColumnMetadata, DatasetContent, DatasetId, ExportType, Filter, FilterKind, PlaygroundState, PlaygroundStore,
    PreparationId, Scope, TypeDescriptor,
};
use crate::error::PrepError;
use crate::services::{
    ChannelExternalService, DatagridSizeService, ExternalEvent, OfflinePlaygroundService,
    OfflineTransformationService, PlaygroundService, RestClient, RestPlaygroundService, RestTransformationService,
    TransformationService, local_dataset,
};
use crate::tui::components::{
    ColumnDetails, ColumnInfo, Datagrid, DatagridServices, ExportDialog, FormInput, MenuContext, MenuOutcome,
    MenuState, PendingTask, Settled, TransformMenuController, TransformPanel,
};
use crate::tui::{Action, ActionCategory, Component, Focusable, KeyBindings, Theme};
use color_eyre::Result;
use crossterm::event::{KeyEvent, KeyEventKind};
use futures::future::BoxFuture;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where the grid data comes from
#[derive(Debug, Clone)]
pub enum DataSource {
    Remote {
        client: RestClient,
        dataset_id: DatasetId,
        preparation_id: Option<PreparationId>,
    },
    /// A CSV file; no transformation can be applied
    Local { path: PathBuf },
}

/// Results of background work, drained by the UI loop
#[derive(Debug)]
pub enum AppEvent {
    Loaded {
        preparation_id: Option<PreparationId>,
        result: Result<DatasetContent, PrepError>,
    },
    Refreshed(Result<DatasetContent, PrepError>),
    Menus {
        column_id: ColumnId,
        result: Result<Vec<TransformMenu>, PrepError>,
    },
    Menu(MenuOutcome),
    ExportTypes(Result<Vec<ExportType>, PrepError>),
    Types(Result<Vec<TypeDescriptor>, PrepError>),
    Exported(Result<PathBuf, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Grid,
    Transformations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Success,
    Error,
}

/// Application state
///
/// Owns the store and every panel. Background work is spawned on tokio and
/// reports back through [`AppEvent`]s so all state changes happen on the UI
/// thread.
pub struct App {
    store: PlaygroundStore,
    datagrid: Datagrid,
    menu: TransformMenuController,
    panel: TransformPanel,
    details: ColumnDetails,
    export: Option<ExportDialog>,
    source: DataSource,
    playground: Option<RestPlaygroundService>,
    transformations: Arc<dyn TransformationService>,
    events: UnboundedSender<AppEvent>,
    external: UnboundedReceiver<ExternalEvent>,
    cancel: CancellationToken,
    keybindings: KeyBindings,
    theme: Theme,
    focus: Focus,
    status: Option<(String, StatusKind)>,
    last_state: Option<Arc<PlaygroundState>>,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config, source: DataSource, events: UnboundedSender<AppEvent>) -> Self {
        let (external_tx, external) = mpsc::unbounded_channel();
        let store = PlaygroundStore::default();

        let mut datagrid = Datagrid::new(
            DatagridServices::with_external(
                Box::new(ChannelExternalService::new(external_tx)),
                DatagridSizeService::new(config.columns),
            ),
            config.debounce.clone(),
        );
        datagrid.subscribe(store.subscribe());

        let (playground, playground_service, transformations): (
            Option<RestPlaygroundService>,
            Arc<dyn PlaygroundService>,
            Arc<dyn TransformationService>,
        ) = match &source {
            DataSource::Remote { client, .. } => {
                let playground = RestPlaygroundService::new(client.clone());
                (
                    Some(playground.clone()),
                    Arc::new(playground),
                    Arc::new(RestTransformationService::new(client.clone())),
                )
            }
            DataSource::Local { .. } => (
                None,
                Arc::new(OfflinePlaygroundService),
                Arc::new(OfflineTransformationService),
            ),
        };

        Self {
            store,
            datagrid,
            menu: TransformMenuController::new(playground_service, transformations.clone()),
            panel: TransformPanel::new(),
            details: ColumnDetails::new(),
            export: None,
            source,
            playground,
            transformations,
            events,
            external,
            cancel: CancellationToken::new(),
            keybindings: config.key_bindings(),
            theme: Theme::from_name(config.theme),
            focus: Focus::Grid,
            status: None,
            last_state: None,
            should_quit: false,
        }
    }

    pub fn store(&self) -> &PlaygroundStore {
        &self.store
    }

    pub fn datagrid(&self) -> &Datagrid {
        &self.datagrid
    }

    pub fn menu(&self) -> &TransformMenuController {
        &self.menu
    }

    pub fn panel(&self) -> &TransformPanel {
        &self.panel
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(|(message, _)| message.as_str())
    }

    fn set_status(&mut self, message: impl Into<String>, kind: StatusKind) {
        let message = message.into();
        match kind {
            StatusKind::Error => error!("{message}"),
            _ => info!("{message}"),
        }
        self.status = Some((message, kind));
    }

    /// Run `task` on the runtime unless the app shuts down first
    fn spawn<T, F>(&self, task: BoxFuture<'static, T>, into_event: F)
    where
        T: Send + 'static,
        F: FnOnce(T) -> AppEvent + Send + 'static,
    {
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                output = task => {
                    let _ = events.send(into_event(output));
                }
            }
        });
    }

    fn spawn_menu_task(&self, task: Option<PendingTask>) {
        if let Some(task) = task {
            self.spawn(task, AppEvent::Menu);
        }
    }

    /// Load the data source into the store
    pub fn load(&mut self) {
        match self.source.clone() {
            DataSource::Local { path } => match local_dataset::load_csv(&path) {
                Ok((dataset, data)) => {
                    self.set_status(format!("Loaded {} rows from {}", data.records.len(), dataset.name), StatusKind::Info);
                    self.store.load(dataset, None, data);
                }
                Err(e) => self.set_status(format!("Unable to load {}: {e}", path.display()), StatusKind::Error),
            },
            DataSource::Remote {
                client,
                dataset_id,
                preparation_id,
            } => {
                self.set_status(format!("Loading {dataset_id}..."), StatusKind::Info);
                let loaded_id = preparation_id.clone();
                let types_client = client.clone();
                let task: BoxFuture<'static, Result<DatasetContent, PrepError>> = Box::pin(async move {
                    match &preparation_id {
                        Some(id) => client.preparation_content(id).await,
                        None => client.dataset_content(&dataset_id).await,
                    }
                });
                self.spawn(task, move |result| AppEvent::Loaded {
                    preparation_id: loaded_id,
                    result,
                });

                let types: BoxFuture<'static, Result<Vec<TypeDescriptor>, PrepError>> =
                    Box::pin(async move { types_client.types().await });
                self.spawn(types, AppEvent::Types);
            }
        }
    }

    /// Reload the current preparation after a step was appended
    fn refresh(&mut self) {
        let Some(client) = self.client() else {
            self.load();
            return;
        };
        let state = self.store.snapshot();
        let preparation_id = state.preparation_id.clone();
        let dataset_id = state.dataset.as_ref().map(|d| d.id.clone());
        let task: BoxFuture<'static, Result<DatasetContent, PrepError>> = Box::pin(async move {
            match (preparation_id, dataset_id) {
                (Some(id), _) => client.preparation_content(&id).await,
                (None, Some(id)) => client.dataset_content(&id).await,
                (None, None) => Err(PrepError::MissingContext("dataset")),
            }
        });
        self.spawn(task, AppEvent::Refreshed);
    }

    fn client(&self) -> Option<RestClient> {
        match &self.source {
            DataSource::Remote { client, .. } => Some(client.clone()),
            DataSource::Local { .. } => None,
        }
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Loaded { preparation_id, result } => match result {
                Ok(content) => {
                    let (dataset, data) = content.into_parts();
                    if let Some(playground) = &self.playground {
                        playground.set_dataset(dataset.clone(), preparation_id.clone());
                    }
                    self.set_status(format!("Loaded {} rows of {}", data.records.len(), dataset.name), StatusKind::Info);
                    self.store.load(dataset, preparation_id, data);
                }
                Err(e) => self.set_status(format!("Unable to load dataset: {e}"), StatusKind::Error),
            },
            AppEvent::Refreshed(result) => match result {
                Ok(content) => {
                    let (_, data) = content.into_parts();
                    self.store.set_data(data);
                }
                Err(e) => self.set_status(format!("Unable to refresh: {e}"), StatusKind::Error),
            },
            AppEvent::Menus { column_id, result } => match result {
                Ok(menus) => {
                    debug!(column = %column_id, count = menus.len(), "transformations received");
                    self.panel.set_menus(&column_id, menus);
                }
                Err(e) => {
                    warn!(column = %column_id, error = %e, "unable to fetch transformations");
                    self.panel.set_error(&column_id, e.to_string());
                }
            },
            AppEvent::Menu(outcome) => match self.menu.settle(outcome) {
                Settled::StepAppended(name) => {
                    if let Some(id) = self.playground.as_ref().and_then(RestPlaygroundService::preparation_id) {
                        self.store.set_preparation_id(id);
                    }
                    self.set_status(format!("Applied {name}"), StatusKind::Success);
                    self.refresh();
                }
                Settled::StepFailed(message) => {
                    self.set_status(format!("Transformation failed: {message}"), StatusKind::Error)
                }
                Settled::ParametersFailed(message) => {
                    self.set_status(format!("Unable to load parameters: {message}"), StatusKind::Error)
                }
                Settled::ParametersLoaded | Settled::Ignored => {}
            },
            AppEvent::ExportTypes(result) => {
                if let Some(dialog) = &mut self.export {
                    match result {
                        Ok(types) => dialog.set_types(types),
                        Err(e) => dialog.set_error(e.to_string()),
                    }
                }
            }
            AppEvent::Types(result) => match result {
                Ok(types) => self.details.set_types(types),
                Err(e) => warn!(error = %e, "unable to fetch column types"),
            },
            AppEvent::Exported(result) => match result {
                Ok(path) => self.set_status(format!("Exported to {}", path.display()), StatusKind::Success),
                Err(message) => self.set_status(format!("Export failed: {message}"), StatusKind::Error),
            },
        }
    }

    /// Pump the store, the grid timers and the grid's notifications
    pub fn tick(&mut self, now: Instant) {
        self.datagrid.poll(now);
        self.datagrid.tick(now);

        while let Ok(event) = self.external.try_recv() {
            match event {
                ExternalEvent::UpdateSuggestionPanel { column_scope } => {
                    debug!(column_scope, "suggestion panel update requested");
                    self.request_menus();
                }
            }
        }

        let state = self.store.snapshot();
        if self.last_state.as_ref().is_some_and(|last| Arc::ptr_eq(last, &state)) {
            return;
        }
        self.details.set_info(ColumnInfo::from_state(&state));
        self.menu.set_context(Self::menu_context(&state));
        self.last_state = Some(state);
    }

    fn menu_context(state: &PlaygroundState) -> Option<MenuContext> {
        let column = state.selected_column.as_ref()?;
        let dataset = state.dataset.as_ref()?;
        Some(MenuContext {
            column: ColumnMetadata::clone(column),
            dataset_id: dataset.id.clone(),
            preparation_id: state.preparation_id.clone(),
        })
    }

    fn request_menus(&mut self) {
        let state = self.store.snapshot();
        let Some(column) = state.selected_column.clone() else {
            self.panel.clear();
            return;
        };
        if self.panel.column() == Some(&column.id) && !self.panel.menus().is_empty() {
            return;
        }
        self.panel.set_loading(column.id.clone());
        let task = self.transformations.column_transformations(&column);
        let column_id = column.id.clone();
        self.spawn(task, move |result| AppEvent::Menus { column_id, result });
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.datagrid.next_deadline()
    }

    /// Handle a key event
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        // Only handle key press events, ignore release/repeat
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        if self.menu.show_modal() {
            return self.handle_modal_key(key);
        }

        if let Some(action) = self.keybindings.get_action(&key) {
            self.handle_action(action)?;
        }
        Ok(())
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Result<()> {
        let modal_open = self.menu.state() == MenuState::ModalOpen;
        let input = match self.menu.form_mut() {
            Some(form) if modal_open => form.handle_key(key),
            _ => match self.keybindings.get_action(&key) {
                Some(Action::Cancel) => FormInput::Cancel,
                Some(Action::Confirm) => FormInput::Submit,
                _ => FormInput::Consumed,
            },
        };
        match input {
            FormInput::Submit => {
                let task = self.menu.apply_form();
                self.spawn_menu_task(task);
            }
            FormInput::Cancel => self.menu.close(),
            FormInput::Consumed => {}
        }
        Ok(())
    }

    /// Handle an action
    fn handle_action(&mut self, action: Action) -> Result<()> {
        if let Some(dialog) = &mut self.export {
            match action {
                Action::Cancel => self.export = None,
                Action::Confirm => self.start_export(),
                other => {
                    dialog.handle_action(other)?;
                }
            }
            return Ok(());
        }

        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleLookup => self.store.toggle_lookup(),
            Action::ToggleTransformations => {
                let visible = !self.panel.is_visible();
                self.panel.set_visible(visible);
                if visible {
                    self.request_menus();
                } else {
                    self.set_focus(Focus::Grid);
                }
            }
            Action::NextPanel => {
                let next = match self.focus {
                    Focus::Grid if self.panel.is_visible() => Focus::Transformations,
                    _ => Focus::Grid,
                };
                self.set_focus(next);
            }
            Action::Cancel => {
                if self.panel.is_visible() {
                    self.panel.set_visible(false);
                    self.set_focus(Focus::Grid);
                }
            }
            Action::FilterOnValue => self.add_filter(FilterKind::Exact),
            Action::FilterEmpty => self.add_filter(|_| FilterKind::Empty),
            Action::FilterInvalid => self.add_filter(|_| FilterKind::Invalid),
            Action::RemoveLastFilter => {
                let count = self.store.snapshot().filters.len();
                if let Some(last) = count.checked_sub(1) {
                    self.store.remove_filter(last);
                }
            }
            Action::ClearFilters => self.store.clear_filters(),
            Action::Refresh => self.refresh(),
            Action::Export => self.open_export(),
            Action::Confirm if self.focus == Focus::Transformations => {
                if let Some(menu) = self.panel.selected().cloned() {
                    let task = self.menu.select(menu, Scope::Column);
                    self.spawn_menu_task(task);
                    if let Some(error) = self.menu.error().map(str::to_string) {
                        self.set_status(error, StatusKind::Error);
                    }
                }
            }
            other => match self.focus {
                Focus::Transformations => {
                    self.panel.handle_action(other)?;
                }
                Focus::Grid => {
                    if self.datagrid.handle_action(other)? {
                        let selection = self.datagrid.active_selection();
                        self.store.set_grid_selection(
                            selection.as_ref().map(|(column, _)| column),
                            selection.as_ref().map(|(_, tdp_id)| *tdp_id),
                        );
                    }
                }
            },
        }
        Ok(())
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.datagrid.set_focused(focus == Focus::Grid);
        self.panel.set_focused(focus == Focus::Transformations);
    }

    /// Filter the selected column; `kind` gets the selected value
    fn add_filter<F>(&mut self, kind: F)
    where
        F: FnOnce(String) -> FilterKind,
    {
        let state = self.store.snapshot();
        let Some(column) = state.selected_column.as_ref() else {
            self.set_status("Select a cell first", StatusKind::Info);
            return;
        };
        let value = state.selected_value().unwrap_or_default();
        self.store.add_filter(Filter::new(column, kind(value)));
    }

    fn open_export(&mut self) {
        let Some(client) = self.client() else {
            self.set_status("Export needs a preparation server", StatusKind::Info);
            return;
        };
        self.export = Some(ExportDialog::loading());
        let task: BoxFuture<'static, Result<Vec<ExportType>, PrepError>> =
            Box::pin(async move { client.export_types().await });
        self.spawn(task, AppEvent::ExportTypes);
    }

    fn start_export(&mut self) {
        let Some(export_type) = self.export.as_ref().and_then(|d| d.selected()).cloned() else {
            return;
        };
        self.export = None;
        let (Some(client), Some(dataset)) = (self.client(), self.store.snapshot().dataset.clone()) else {
            return;
        };
        let preparation_id = self.store.snapshot().preparation_id.clone();
        let path = PathBuf::from(format!("{}.{}", dataset.name, export_type.extension));
        self.set_status(format!("Exporting {} as {}...", dataset.name, export_type.id), StatusKind::Info);

        let task: BoxFuture<'static, Result<PathBuf, String>> = Box::pin(async move {
            let bytes = client
                .export(&export_type, &dataset.id, preparation_id.as_ref(), &export_type.default_parameters())
                .await
                .map_err(|e| e.to_string())?;
            tokio::fs::write(&path, bytes).await.map_err(|e| e.to_string())?;
            Ok(path)
        });
        self.spawn(task, AppEvent::Exported);
    }

    /// Cancel background work and tear the grid down
    pub fn shutdown(&mut self) {
        debug!("shutting down");
        self.cancel.cancel();
        self.datagrid.destroy();
    }

    /// Render the app
    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let state = self.store.snapshot();
        let mut constraints = vec![Constraint::Min(20)];
        if state.lookup_visibility {
            constraints.push(Constraint::Percentage(30));
        }
        if self.panel.is_visible() {
            constraints.push(Constraint::Length(32));
        }
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(rows[0]);

        self.datagrid.render(frame, columns[0], &self.theme);
        let mut next = 1;
        if state.lookup_visibility {
            self.details.render(frame, columns[next], &self.theme);
            next += 1;
        }
        if self.panel.is_visible() {
            self.panel.render(frame, columns[next], &self.theme);
        }

        self.render_status(frame, rows[1], &state);
        self.menu.render_modal(frame, area, &self.theme);
        if let Some(dialog) = &mut self.export {
            dialog.render(frame, area, &self.theme);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, state: &PlaygroundState) {
        let mut spans = Vec::new();
        if let Some((message, kind)) = &self.status {
            let style = match kind {
                StatusKind::Info => self.theme.info_style(),
                StatusKind::Success => self.theme.success_style(),
                StatusKind::Error => self.theme.error_style(),
            };
            spans.push(Span::styled(message.clone(), style));
            spans.push(Span::raw("  "));
        }
        if !state.filters.is_empty() {
            let labels: Vec<String> = state.filters.iter().map(Filter::label).collect();
            spans.push(Span::styled(format!("[{}]", labels.join(", ")), self.theme.warning_style()));
            spans.push(Span::raw("  "));
        }
        if state.is_preview() {
            spans.push(Span::styled("PREVIEW  ", self.theme.warning_style()));
        }
        let hint: Vec<String> = Action::all()
            .into_iter()
            .filter(|action| action.category() == ActionCategory::Panels || *action == Action::Quit)
            .filter_map(|action| {
                let keys = self.keybindings.get_keys_for_action(action);
                keys.first().map(|key| format!("{key}:{action:?}"))
            })
            .collect();
        spans.push(Span::styled(hint.join("  "), self.theme.dim_style()));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }
}
