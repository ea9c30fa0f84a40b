//! Transformation menu controller
//!
//! Applying a menu either appends a step right away or opens a modal that
//! collects parameters first. Collaborator futures are created synchronously and
//! handed back as a [`PendingTask`]; the event loop runs it and feeds the
//! outcome to [`TransformMenuController::settle`].

use crate::core::menu::{Choice, DynamicParameters, DynamicParamsRequest, MenuKind, Parameter, Params, TransformMenu};
use crate::core::{ColumnMetadata, DatasetId, PreparationId, Scope};
use crate::error::{PrepError, Result};
use crate::services::{PlaygroundService, TransformationService};
use crate::tui::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures::FutureExt;
use futures::future::BoxFuture;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Column and dataset the menus apply to
#[derive(Debug, Clone, PartialEq)]
pub struct MenuContext {
    pub column: ColumnMetadata,
    pub dataset_id: DatasetId,
    pub preparation_id: Option<PreparationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Idle,
    ModalOpen,
    /// Modal open while dynamic parameters load
    Fetching,
}

/// Result of a task started by the controller
#[derive(Debug)]
pub enum MenuOutcome {
    DynamicParameters {
        generation: u64,
        result: Result<DynamicParameters>,
    },
    Appended {
        generation: u64,
        menu: String,
        result: Result<()>,
    },
}

/// What settling an outcome did to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// Outcome of an abandoned selection
    Ignored,
    ParametersLoaded,
    ParametersFailed(String),
    StepAppended(String),
    StepFailed(String),
}

pub type PendingTask = BoxFuture<'static, MenuOutcome>;

/// A transformation waiting for its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredTransform {
    pub menu: TransformMenu,
    pub scope: Scope,
}

impl DeferredTransform {
    /// Apply the transformation with `params` plus the recorded scope
    pub fn call(self, controller: &mut TransformMenuController, mut params: Params) -> Option<PendingTask> {
        params.insert("scope".to_string(), Value::String(self.scope.as_str().to_string()));
        controller.transform(&self.menu, params)
    }
}

pub struct TransformMenuController {
    playground: Arc<dyn PlaygroundService>,
    transformations: Arc<dyn TransformationService>,
    context: Option<MenuContext>,
    show_modal: bool,
    dynamic_fetch_in_progress: bool,
    append_in_flight: bool,
    selected_menu: Option<TransformMenu>,
    selected_scope: Option<Scope>,
    dynamic_params: Option<DynamicParameters>,
    error: Option<String>,
    generation: u64,
    form: Option<ParameterForm>,
}

impl std::fmt::Debug for TransformMenuController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformMenuController")
            .field("state", &self.state())
            .field("menu", &self.selected_menu.as_ref().map(|m| &m.name))
            .field("generation", &self.generation)
            .finish()
    }
}

impl TransformMenuController {
    pub fn new(playground: Arc<dyn PlaygroundService>, transformations: Arc<dyn TransformationService>) -> Self {
        Self {
            playground,
            transformations,
            context: None,
            show_modal: false,
            dynamic_fetch_in_progress: false,
            append_in_flight: false,
            selected_menu: None,
            selected_scope: None,
            dynamic_params: None,
            error: None,
            generation: 0,
            form: None,
        }
    }

    pub fn set_context(&mut self, context: Option<MenuContext>) {
        self.context = context;
    }

    pub fn context(&self) -> Option<&MenuContext> {
        self.context.as_ref()
    }

    pub fn state(&self) -> MenuState {
        match (self.show_modal, self.dynamic_fetch_in_progress) {
            (false, _) => MenuState::Idle,
            (true, false) => MenuState::ModalOpen,
            (true, true) => MenuState::Fetching,
        }
    }

    pub fn show_modal(&self) -> bool {
        self.show_modal
    }

    pub fn dynamic_fetch_in_progress(&self) -> bool {
        self.dynamic_fetch_in_progress
    }

    /// A step of the current selection is being appended
    pub fn append_in_flight(&self) -> bool {
        self.append_in_flight
    }

    pub fn selected_menu(&self) -> Option<&TransformMenu> {
        self.selected_menu.as_ref()
    }

    pub fn selected_scope(&self) -> Option<Scope> {
        self.selected_scope
    }

    pub fn dynamic_params(&self) -> Option<&DynamicParameters> {
        self.dynamic_params.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn form(&self) -> Option<&ParameterForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ParameterForm> {
        self.form.as_mut()
    }

    /// Apply `menu` or open its parameter modal
    pub fn select(&mut self, menu: TransformMenu, scope: Scope) -> Option<PendingTask> {
        self.generation += 1;
        self.error = None;
        self.dynamic_params = None;
        self.append_in_flight = false;
        debug!(menu = %menu.name, scope = scope.as_str(), "menu selected");

        match &menu.kind {
            MenuKind::ParameterForm { parameters, choices } => {
                self.form = Some(ParameterForm::new(parameters, choices));
                self.open(menu, scope);
                None
            }
            MenuKind::ChoiceForm(choices) => {
                self.form = Some(ParameterForm::new(&[], choices));
                self.open(menu, scope);
                None
            }
            MenuKind::DynamicForm => {
                let Some(context) = &self.context else {
                    warn!(menu = %menu.name, "no column selected for dynamic parameters");
                    self.error = Some(PrepError::MissingContext("column").to_string());
                    return None;
                };
                let request = DynamicParamsRequest {
                    column_id: context.column.id.clone(),
                    dataset_id: context.dataset_id.clone(),
                    preparation_id: context.preparation_id.clone(),
                };
                let fetch = self.transformations.init_dynamic_parameters(&menu, request);
                self.form = None;
                self.open(menu, scope);
                self.dynamic_fetch_in_progress = true;
                let generation = self.generation;
                Some(
                    async move {
                        MenuOutcome::DynamicParameters {
                            generation,
                            result: fetch.await,
                        }
                    }
                    .boxed(),
                )
            }
            MenuKind::Simple => {
                self.show_modal = false;
                self.dynamic_fetch_in_progress = false;
                self.form = None;
                let mut params = Params::new();
                params.insert("scope".to_string(), Value::String(scope.as_str().to_string()));
                self.transform(&menu, params)
            }
        }
    }

    fn open(&mut self, menu: TransformMenu, scope: Scope) {
        self.selected_menu = Some(menu);
        self.selected_scope = Some(scope);
        self.show_modal = true;
        self.dynamic_fetch_in_progress = false;
    }

    /// Append `menu` as a step with `params`
    pub fn transform(&mut self, menu: &TransformMenu, params: Params) -> Option<PendingTask> {
        let Some(context) = &self.context else {
            warn!(menu = %menu.name, "no column selected for transformation");
            self.error = Some(PrepError::MissingContext("column").to_string());
            return None;
        };
        let append = self.playground.append_step(&menu.name, &context.column, params);
        self.append_in_flight = true;
        let generation = self.generation;
        let name = menu.name.clone();
        Some(
            async move {
                MenuOutcome::Appended {
                    generation,
                    menu: name,
                    result: append.await,
                }
            }
            .boxed(),
        )
    }

    /// Deferred transformation that adds `scope` to the parameters it gets
    pub fn transform_closure(&self, menu: TransformMenu, scope: Scope) -> DeferredTransform {
        DeferredTransform { menu, scope }
    }

    /// Submit the open form; ignored while parameters load or a submit is pending
    pub fn apply_form(&mut self) -> Option<PendingTask> {
        if self.dynamic_fetch_in_progress || self.append_in_flight {
            return None;
        }
        let menu = self.selected_menu.clone()?;
        let scope = self.selected_scope?;
        let params = self.form.as_ref().map(ParameterForm::to_params).unwrap_or_default();
        self.transform_closure(menu, scope).call(self, params)
    }

    /// Close the modal; results of the current selection are then ignored
    pub fn close(&mut self) {
        self.generation += 1;
        self.show_modal = false;
        self.dynamic_fetch_in_progress = false;
        self.append_in_flight = false;
        self.selected_menu = None;
        self.selected_scope = None;
        self.dynamic_params = None;
        self.form = None;
        self.error = None;
    }

    pub fn settle(&mut self, outcome: MenuOutcome) -> Settled {
        match outcome {
            MenuOutcome::DynamicParameters { generation, result } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "stale dynamic parameters dropped");
                    return Settled::Ignored;
                }
                self.dynamic_fetch_in_progress = false;
                match result {
                    Ok(params) => {
                        self.form = Some(ParameterForm::new(&params.parameters(), &[]));
                        self.dynamic_params = Some(params);
                        Settled::ParametersLoaded
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to load dynamic parameters");
                        let message = e.to_string();
                        self.error = Some(message.clone());
                        Settled::ParametersFailed(message)
                    }
                }
            }
            MenuOutcome::Appended {
                generation,
                menu,
                result,
            } => {
                if generation == self.generation {
                    self.show_modal = false;
                    self.dynamic_fetch_in_progress = false;
                    self.append_in_flight = false;
                    self.form = None;
                }
                match result {
                    Ok(()) => Settled::StepAppended(menu),
                    Err(e) => {
                        warn!(menu = %menu, error = %e, "failed to append step");
                        Settled::StepFailed(e.to_string())
                    }
                }
            }
        }
    }

    /// Draw the parameter modal when it is open
    pub fn render_modal(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if !self.show_modal {
            return;
        }
        let title = self
            .selected_menu
            .as_ref()
            .map(|m| m.label.clone())
            .unwrap_or_default();
        let popup = centered(area, 60, 16);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(theme.focused_border_style());
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let mut lines: Vec<Line> = Vec::new();
        if let Some(menu) = &self.selected_menu {
            for wrapped in textwrap::wrap(&menu.description, inner.width.max(1) as usize) {
                lines.push(Line::styled(wrapped.into_owned(), theme.dim_style()));
            }
            if !menu.description.is_empty() {
                lines.push(Line::default());
            }
        }
        if self.dynamic_fetch_in_progress {
            lines.push(Line::styled("Loading parameters...", theme.info_style()));
        } else if self.append_in_flight {
            lines.push(Line::styled("Applying...", theme.info_style()));
        } else if let Some(form) = &self.form {
            lines.extend(form.lines(theme));
        }
        if let Some(error) = &self.error {
            lines.push(Line::default());
            lines.push(Line::styled(error.clone(), theme.error_style()));
        }
        lines.push(Line::default());
        lines.push(Line::styled("Enter: apply  Esc: cancel", theme.dim_style()));
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Text { parameter: Parameter, value: String },
    Choice { choice: Choice, selected: usize },
}

impl FormField {
    fn label(&self) -> &str {
        match self {
            Self::Text { parameter, .. } => parameter.display_label(),
            Self::Choice { choice, .. } => choice.label.as_deref().unwrap_or(&choice.name),
        }
    }
}

/// Key handled by a form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormInput {
    Consumed,
    Submit,
    Cancel,
}

/// Editable parameters of the selected menu
///
/// The parameters of the selected value of a choice follow the choice and are
/// rebuilt when the value changes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterForm {
    fields: Vec<FormField>,
    hidden: Params,
    active: usize,
}

impl ParameterForm {
    pub fn new(parameters: &[Parameter], choices: &[Choice]) -> Self {
        let mut form = Self::default();
        for parameter in parameters {
            if parameter.implicit {
                form.hidden.insert(parameter.name.clone(), parameter.default.clone());
            } else {
                form.fields.push(FormField::Text {
                    parameter: parameter.clone(),
                    value: parameter.default_text(),
                });
            }
        }
        for choice in choices {
            let at = form.fields.len();
            form.fields.push(FormField::Choice {
                choice: choice.clone(),
                selected: 0,
            });
            form.rebuild_choice(at);
        }
        form
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// Replace the fields that belong to the choice at `index`
    fn rebuild_choice(&mut self, index: usize) {
        let Some(FormField::Choice { choice, selected }) = self.fields.get(index) else {
            return;
        };
        let nested = choice
            .values
            .get(*selected)
            .map(|v| v.parameters.clone())
            .unwrap_or_default();
        let all_nested: Vec<String> = choice
            .values
            .iter()
            .flat_map(|v| v.parameters.iter().map(|p| p.name.clone()))
            .collect();

        let end = self.fields[index + 1..]
            .iter()
            .position(|f| !matches!(f, FormField::Text { parameter, .. } if all_nested.contains(&parameter.name)))
            .map_or(self.fields.len(), |p| index + 1 + p);
        let added = nested.into_iter().map(|parameter| FormField::Text {
            value: parameter.default_text(),
            parameter,
        });
        self.fields.splice(index + 1..end, added);
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    pub fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Move the active choice to its next (or previous) value
    pub fn cycle_choice(&mut self, forward: bool) {
        let index = self.active;
        let Some(FormField::Choice { choice, selected }) = self.fields.get_mut(index) else {
            return;
        };
        let count = choice.values.len();
        if count == 0 {
            return;
        }
        *selected = if forward {
            (*selected + 1) % count
        } else {
            (*selected + count - 1) % count
        };
        self.rebuild_choice(index);
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(FormField::Text { value, .. }) = self.fields.get_mut(self.active) {
            value.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(FormField::Text { value, .. }) = self.fields.get_mut(self.active) {
            value.pop();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormInput {
        match key.code {
            KeyCode::Enter => return FormInput::Submit,
            KeyCode::Esc => return FormInput::Cancel,
            KeyCode::Tab | KeyCode::Down => self.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.previous_field(),
            KeyCode::Left => self.cycle_choice(false),
            KeyCode::Right => self.cycle_choice(true),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.insert_char(c),
            _ => {}
        }
        FormInput::Consumed
    }

    /// Parameters typed after their declared type
    pub fn to_params(&self) -> Params {
        let mut params = self.hidden.clone();
        for field in &self.fields {
            match field {
                FormField::Text { parameter, value } => {
                    params.insert(parameter.name.clone(), typed_value(&parameter.kind, value));
                }
                FormField::Choice { choice, selected } => {
                    if let Some(value) = choice.values.get(*selected) {
                        params.insert(choice.name.clone(), Value::String(value.name.clone()));
                    }
                }
            }
        }
        params
    }

    fn lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let active = i == self.active;
                let label_style = if active {
                    theme.header_style()
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                let value = match field {
                    FormField::Text { value, .. } if active => format!("{value}_"),
                    FormField::Text { value, .. } => value.clone(),
                    FormField::Choice { choice, selected } => {
                        let name = choice.values.get(*selected).map(|v| v.name.as_str()).unwrap_or("");
                        format!("< {name} >")
                    }
                };
                let value_style = if active {
                    theme.selected_style()
                } else {
                    theme.normal_style()
                };
                Line::from(vec![
                    Span::styled(format!("{}: ", field.label()), label_style),
                    Span::styled(value, value_style),
                ])
            })
            .collect()
    }
}

fn typed_value(kind: &str, text: &str) -> Value {
    match kind {
        "integer" => text.trim().parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::from(text)),
        "double" | "float" | "numeric" | "decimal" => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(text)),
        "boolean" => match text.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::from(text),
        },
        _ => Value::from(text),
    }
}
