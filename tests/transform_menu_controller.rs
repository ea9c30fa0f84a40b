//! Transformation menu selection, parameter modal and step appending

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use pretty_assertions::assert_eq;
use prepgrid::core::menu::{Choice, ChoiceValue, DynamicParameters, DynamicParamsRequest, Parameter};
use prepgrid::core::{ColumnMetadata, MenuKind, Params, Scope, TransformMenu};
use prepgrid::error::{PrepError, Result};
use prepgrid::services::{PlaygroundService, TransformationService};
use prepgrid::tui::components::{MenuContext, MenuState, Settled, TransformMenuController};
use prepgrid::{DatasetId, PreparationId};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
struct AppendCall {
    name: String,
    column: String,
    params: Params,
}

#[derive(Default)]
struct RecordingPlayground {
    calls: Mutex<Vec<AppendCall>>,
    fail: bool,
}

impl RecordingPlayground {
    fn calls(&self) -> Vec<AppendCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl PlaygroundService for RecordingPlayground {
    fn append_step(&self, name: &str, column: &ColumnMetadata, params: Params) -> BoxFuture<'static, Result<()>> {
        self.calls.lock().unwrap().push(AppendCall {
            name: name.to_string(),
            column: column.id.to_string(),
            params,
        });
        let result = if self.fail {
            Err(PrepError::Status {
                url: "/api/preparations".to_string(),
                status: 500,
            })
        } else {
            Ok(())
        };
        future::ready(result).boxed()
    }
}

#[derive(Default)]
struct StubTransformations {
    requests: Mutex<Vec<DynamicParamsRequest>>,
    fail: bool,
}

impl TransformationService for StubTransformations {
    fn column_transformations(&self, _column: &ColumnMetadata) -> BoxFuture<'static, Result<Vec<TransformMenu>>> {
        future::ready(Ok(vec![uppercase()])).boxed()
    }

    fn init_dynamic_parameters(
        &self,
        _menu: &TransformMenu,
        request: DynamicParamsRequest,
    ) -> BoxFuture<'static, Result<DynamicParameters>> {
        self.requests.lock().unwrap().push(request);
        let result = if self.fail {
            Err(PrepError::Status {
                url: "/api/transform/suggest/textclustering/params".to_string(),
                status: 404,
            })
        } else {
            Ok(DynamicParameters::Parameters(vec![Parameter {
                kind: "string".to_string(),
                default: json!("Paris"),
                ..Parameter::new("replace_value")
            }]))
        };
        future::ready(result).boxed()
    }
}

fn uppercase() -> TransformMenu {
    TransformMenu::simple("uppercase", "case")
}

fn cut() -> TransformMenu {
    TransformMenu::simple("cut", "repair").with_kind(MenuKind::ParameterForm {
        parameters: vec![Parameter {
            kind: "string".to_string(),
            ..Parameter::new("pattern")
        }],
        choices: Vec::new(),
    })
}

fn split() -> TransformMenu {
    TransformMenu::simple("split", "split").with_kind(MenuKind::ChoiceForm(vec![Choice {
        name: "mode".to_string(),
        label: None,
        values: vec![
            ChoiceValue {
                name: "separator".to_string(),
                parameters: Vec::new(),
            },
            ChoiceValue {
                name: "regex".to_string(),
                parameters: Vec::new(),
            },
        ],
    }]))
}

fn textclustering() -> TransformMenu {
    TransformMenu::simple("textclustering", "quickfix").with_kind(MenuKind::DynamicForm)
}

fn context() -> MenuContext {
    MenuContext {
        column: ColumnMetadata::new("0001", "city", "string"),
        dataset_id: DatasetId::new("ds-1"),
        preparation_id: Some(PreparationId::new("prep-1")),
    }
}

fn controller(
    playground: &Arc<RecordingPlayground>,
    transformations: &Arc<StubTransformations>,
) -> TransformMenuController {
    let mut controller = TransformMenuController::new(playground.clone(), transformations.clone());
    controller.set_context(Some(context()));
    controller
}

fn scope_only(scope: &str) -> Params {
    let mut params = Params::new();
    params.insert("scope".to_string(), Value::String(scope.to_string()));
    params
}

#[tokio::test]
async fn test_simple_menu_appends_with_scope() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    let task = controller.select(uppercase(), Scope::Column).unwrap();
    // recorded before the task is awaited
    assert_eq!(
        playground.calls(),
        vec![AppendCall {
            name: "uppercase".to_string(),
            column: "0001".to_string(),
            params: scope_only("column"),
        }]
    );
    assert_eq!(controller.state(), MenuState::Idle);

    let settled = controller.settle(task.await);
    assert_eq!(settled, Settled::StepAppended("uppercase".to_string()));
    assert_eq!(controller.state(), MenuState::Idle);
}

#[tokio::test]
async fn test_parameter_form_opens_modal_without_appending() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    assert!(controller.select(cut(), Scope::Column).is_none());
    assert_eq!(controller.state(), MenuState::ModalOpen);
    assert_eq!(controller.selected_menu().map(|m| m.name.as_str()), Some("cut"));
    assert_eq!(controller.selected_scope(), Some(Scope::Column));
    assert!(playground.calls().is_empty());

    let form = controller.form_mut().unwrap();
    for c in "a-z".chars() {
        form.insert_char(c);
    }
    let task = controller.apply_form().unwrap();
    let calls = playground.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].params.get("pattern"), Some(&json!("a-z")));
    assert_eq!(calls[0].params.get("scope"), Some(&json!("column")));

    assert_eq!(controller.settle(task.await), Settled::StepAppended("cut".to_string()));
    assert_eq!(controller.state(), MenuState::Idle);
}

#[test]
fn test_choice_form_opens_modal() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    assert!(controller.select(split(), Scope::Line).is_none());
    assert_eq!(controller.state(), MenuState::ModalOpen);
    assert_eq!(controller.form().map(|f| f.fields().len()), Some(1));
    assert!(playground.calls().is_empty());
    assert!(transformations.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dynamic_menu_fetches_then_opens_form() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    let task = controller.select(textclustering(), Scope::Column).unwrap();
    assert_eq!(controller.state(), MenuState::Fetching);
    assert!(controller.dynamic_fetch_in_progress());
    assert_eq!(
        transformations.requests.lock().unwrap().clone(),
        vec![DynamicParamsRequest {
            column_id: "0001".into(),
            dataset_id: DatasetId::new("ds-1"),
            preparation_id: Some(PreparationId::new("prep-1")),
        }]
    );

    // no submit while parameters load
    assert!(controller.apply_form().is_none());

    assert_eq!(controller.settle(task.await), Settled::ParametersLoaded);
    assert_eq!(controller.state(), MenuState::ModalOpen);
    assert!(!controller.dynamic_fetch_in_progress());
    assert!(controller.dynamic_params().is_some());
    assert!(playground.calls().is_empty());

    let task = controller.apply_form().unwrap();
    assert_eq!(playground.calls()[0].params.get("replace_value"), Some(&json!("Paris")));
    controller.settle(task.await);
    assert_eq!(controller.state(), MenuState::Idle);
}

#[tokio::test]
async fn test_dynamic_failure_keeps_modal_with_error() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations {
        fail: true,
        ..Default::default()
    });
    let mut controller = controller(&playground, &transformations);

    let task = controller.select(textclustering(), Scope::Column).unwrap();
    let settled = controller.settle(task.await);

    assert!(matches!(settled, Settled::ParametersFailed(ref message) if message.contains("404")));
    assert_eq!(controller.state(), MenuState::ModalOpen);
    assert!(controller.error().is_some());
    assert!(controller.dynamic_params().is_none());

    controller.close();
    assert_eq!(controller.state(), MenuState::Idle);
    assert!(controller.error().is_none());
}

#[tokio::test]
async fn test_stale_dynamic_parameters_are_ignored() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    let stale = controller.select(textclustering(), Scope::Column).unwrap();
    assert!(controller.select(cut(), Scope::Column).is_none());

    assert_eq!(controller.settle(stale.await), Settled::Ignored);
    assert_eq!(controller.selected_menu().map(|m| m.name.as_str()), Some("cut"));
    assert!(controller.dynamic_params().is_none());
    assert_eq!(controller.state(), MenuState::ModalOpen);
}

#[tokio::test]
async fn test_failed_append_is_reported() {
    let playground = Arc::new(RecordingPlayground {
        fail: true,
        ..Default::default()
    });
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    let task = controller.select(uppercase(), Scope::Column).unwrap();
    let settled = controller.settle(task.await);
    assert!(matches!(settled, Settled::StepFailed(ref message) if message.contains("500")));
}

#[tokio::test]
async fn test_form_submits_once_while_appending() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    assert!(controller.select(cut(), Scope::Column).is_none());
    let task = controller.apply_form().unwrap();
    assert!(controller.append_in_flight());
    assert!(controller.apply_form().is_none());
    assert_eq!(playground.calls().len(), 1);
    assert_eq!(controller.state(), MenuState::ModalOpen);

    assert_eq!(controller.settle(task.await), Settled::StepAppended("cut".to_string()));
    assert!(!controller.append_in_flight());
    assert_eq!(controller.state(), MenuState::Idle);
    assert_eq!(playground.calls().len(), 1);
}

#[tokio::test]
async fn test_failed_append_from_form_closes_modal() {
    let playground = Arc::new(RecordingPlayground {
        fail: true,
        ..Default::default()
    });
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    assert!(controller.select(cut(), Scope::Column).is_none());
    assert_eq!(controller.state(), MenuState::ModalOpen);
    let task = controller.apply_form().unwrap();

    let settled = controller.settle(task.await);
    assert!(matches!(settled, Settled::StepFailed(ref message) if message.contains("500")));
    assert_eq!(controller.state(), MenuState::Idle);
    assert!(!controller.append_in_flight());
    assert!(controller.form().is_none());
}

#[test]
fn test_transform_closure_adds_its_scope() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = controller(&playground, &transformations);

    let deferred = controller.transform_closure(uppercase(), Scope::Cell);
    let mut params = Params::new();
    params.insert("value".to_string(), json!("x"));
    assert!(deferred.call(&mut controller, params).is_some());

    let calls = playground.calls();
    assert_eq!(calls[0].params.get("value"), Some(&json!("x")));
    assert_eq!(calls[0].params.get("scope"), Some(&json!("cell")));
}

#[test]
fn test_nothing_is_appended_without_a_column() {
    let playground = Arc::new(RecordingPlayground::default());
    let transformations = Arc::new(StubTransformations::default());
    let mut controller = TransformMenuController::new(playground.clone(), transformations.clone());

    assert!(controller.select(uppercase(), Scope::Column).is_none());
    assert!(controller.error().is_some());
    assert!(controller.select(textclustering(), Scope::Column).is_none());
    assert_eq!(controller.state(), MenuState::Idle);
    assert!(playground.calls().is_empty());
}
