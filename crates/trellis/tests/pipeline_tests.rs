//! End-to-end wiring scenarios through the full extension pipeline.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use trellis::controls::{Button, ListView, Pane, TableColumn, TableView, TextInput};
use trellis::decl::{
    CellValueConfigDecl, ControllerDescriptor, LoadControlDataDecl, MultiSelectionDecl,
    NestedViewDecl, NodeActivationDecl, OnActionDecl, OnValueChangeDecl, TableColumnConfig,
    ValidationDecl,
};
use trellis::invocation::{ArgumentHint, HandlerMethod};
use trellis::pipeline::{ControllerHandle, Pipeline, PipelineEnv, PipelineState};
use trellis::predicate::BooleanOp;
use trellis::validation::ValidationOptions;
use trellis::view::View;
use trellis::{ConfigError, PipelineError, UiNode};
use trellis_core::BackgroundExecutor;

fn run(descriptor: ControllerDescriptor, view: &View, env: &PipelineEnv) -> ControllerHandle {
    let controller = ControllerHandle::new(descriptor);
    controller.attach_view(view.clone());
    Pipeline::with_default_extensions()
        .run(&controller, env)
        .unwrap();
    controller
}

fn run_err(descriptor: ControllerDescriptor, view: &View) -> PipelineError {
    let controller = ControllerHandle::new(descriptor);
    controller.attach_view(view.clone());
    Pipeline::with_default_extensions()
        .run(&controller, &PipelineEnv::new())
        .unwrap_err()
}

#[test]
fn disable_node_follows_control_values() {
    let view = View::new("form");
    let user = TextInput::new("user");
    let password = TextInput::new("password");
    let hint = Pane::new("hint");
    view.graph().add_root(user.clone()).unwrap();
    view.graph().add_root(password.clone()).unwrap();
    view.graph().add_root(hint.clone()).unwrap();

    // The hint pane is disabled once both fields carry user values.
    let descriptor = ControllerDescriptor::builder("ctrl")
        .disable_node(
            NodeActivationDecl::for_node("hint").when_all_have_user_values(["user", "password"]),
        )
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    assert!(!hint.base().disabled().get());
    user.set_text("ada");
    assert!(!hint.base().disabled().get());
    password.set_text("secret");
    assert!(hint.base().disabled().get());
    password.set_text("");
    assert!(!hint.base().disabled().get());
}

#[test]
fn enable_node_with_or_linked_groups() {
    let view = View::new("form");
    let email = TextInput::new("email");
    let phone = TextInput::new("phone");
    let submit = Button::new("submit");
    view.graph().add_root(email.clone()).unwrap();
    view.graph().add_root(phone.clone()).unwrap();
    view.graph().add_root(submit.clone()).unwrap();

    // Enabled when either contact field has a user value.
    let descriptor = ControllerDescriptor::builder("ctrl")
        .enable_node(
            NodeActivationDecl::for_node("submit")
                .when_at_least_one_has_user_value(["email", "phone"])
                .logical_op(BooleanOp::Or),
        )
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    assert!(submit.base().disabled().get());
    phone.set_text("555-0100");
    assert!(!submit.base().disabled().get());
}

#[test]
fn unknown_control_id_aborts_the_pipeline() {
    let view = View::new("form");
    view.graph().add_root(Pane::new("root")).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .disable_node(NodeActivationDecl::for_node("root").when_all_have_user_values(["ghost"]))
        .build();
    let err = run_err(descriptor, &view);
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn value_source_on_a_pane_is_a_capability_error() {
    let view = View::new("form");
    view.graph().add_root(Pane::new("root")).unwrap();
    view.graph().add_root(Pane::new("box")).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .disable_node(NodeActivationDecl::for_node("root").when_all_have_user_values(["box"]))
        .build();
    let err = run_err(descriptor, &view);
    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::MissingCapability { .. })
    ));
}

#[test]
fn handlers_fire_in_ascending_declared_order() {
    let view = View::new("form");
    let field = TextInput::new("field");
    view.graph().add_root(field.clone()).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut builder = ControllerDescriptor::builder("ctrl");
    for declared in [30, 10, 20] {
        let order_clone = order.clone();
        builder = builder.on_value_change(
            OnValueChangeDecl::for_text(
                "field",
                HandlerMethod::nullary(format!("handler-{declared}"), move || {
                    order_clone.lock().push(declared);
                }),
            )
            .timeout_ms(0)
            .order(declared),
        );
    }
    run(builder.build(), &view, &PipelineEnv::new());

    field.set_text("x");
    assert_eq!(*order.lock(), vec![10, 20, 30]);
}

#[test]
fn debounced_listener_fires_once_with_the_final_value() {
    let view = View::new("form");
    let field = TextInput::new("field");
    view.graph().add_root(field.clone()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let descriptor = ControllerDescriptor::builder("ctrl")
        .on_value_change(
            OnValueChangeDecl::for_text(
                "field",
                HandlerMethod::unary_hinted::<String, _>(
                    "capture",
                    ArgumentHint::NewValue,
                    move |value| {
                        seen_clone.lock().push(value);
                    },
                ),
            )
            .timeout_ms(100),
        )
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    // Five rapid edits within ~50 ms.
    for i in 1..=5 {
        field.set_text(format!("edit-{i}"));
        std::thread::sleep(Duration::from_millis(10));
    }
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(*seen.lock(), vec!["edit-5".to_string()]);
}

#[test]
fn on_action_runs_handlers_and_respects_disabled_state() {
    let view = View::new("form");
    let save = Button::new("save");
    view.graph().add_root(save.clone()).unwrap();

    let count = Arc::new(Mutex::new(0));
    let count_clone = count.clone();
    let descriptor = ControllerDescriptor::builder("ctrl")
        .on_action(OnActionDecl::new(
            "save",
            HandlerMethod::nullary("on_save", move || {
                *count_clone.lock() += 1;
            }),
        ))
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    save.fire();
    assert_eq!(*count.lock(), 1);

    save.base().disabled().set(true);
    save.fire();
    assert_eq!(*count.lock(), 1);
}

#[test]
fn async_action_snapshot_runs_off_thread() {
    let view = View::new("form");
    let load = Button::new("load");
    view.graph().add_root(load.clone()).unwrap();

    let executor = Arc::new(BackgroundExecutor::new(1));
    let env = PipelineEnv::new().with_executor(executor.clone());

    let thread_ids = Arc::new(Mutex::new(Vec::new()));
    let thread_ids_clone = thread_ids.clone();
    let descriptor = ControllerDescriptor::builder("ctrl")
        .on_action(
            OnActionDecl::new(
                "load",
                HandlerMethod::nullary("on_load", move || {
                    thread_ids_clone.lock().push(std::thread::current().id());
                }),
            )
            .run_async(),
        )
        .build();
    run(descriptor, &view, &env);

    load.fire();
    executor.shutdown(); // joins the worker

    let ids = thread_ids.lock();
    assert_eq!(ids.len(), 1);
    assert_ne!(ids[0], std::thread::current().id());
}

#[test]
fn load_control_data_populates_items() {
    let view = View::new("form");
    let colors: Arc<ListView<String>> = ListView::new("colors", vec![]);
    view.graph().add_root(colors.clone()).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .load_control_data(LoadControlDataDecl::new(
            "colors",
            "load_colors",
            || vec!["red".to_string(), "green".to_string()],
        ))
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    assert_eq!(colors.items().snapshot(), vec!["red", "green"]);
}

#[test]
fn load_control_data_item_type_mismatch_is_config_error() {
    let view = View::new("form");
    let colors: Arc<ListView<String>> = ListView::new("colors", vec![]);
    view.graph().add_root(colors).unwrap();

    // Loader produces integers for a string list.
    let descriptor = ControllerDescriptor::builder("ctrl")
        .load_control_data(LoadControlDataDecl::new("colors", "load_numbers", || {
            vec![1, 2, 3]
        }))
        .build();
    let err = run_err(descriptor, &view);
    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::MissingCapability { .. })
    ));
}

#[test]
fn async_load_control_data_applies_after_completion() {
    let view = View::new("form");
    let colors: Arc<ListView<String>> = ListView::new("colors", vec![]);
    view.graph().add_root(colors.clone()).unwrap();

    let executor = Arc::new(BackgroundExecutor::new(1));
    let env = PipelineEnv::new().with_executor(executor.clone());

    let descriptor = ControllerDescriptor::builder("ctrl")
        .load_control_data(
            LoadControlDataDecl::new("colors", "load_colors", || vec!["blue".to_string()])
                .run_async(),
        )
        .build();
    run(descriptor, &view, &env);

    executor.shutdown();
    assert_eq!(colors.items().snapshot(), vec!["blue"]);
}

#[derive(Clone, PartialEq, Debug)]
struct Person {
    name: String,
    age: u32,
}

fn people_table(columns: Vec<TableColumn<Person>>) -> Arc<TableView<Person>> {
    TableView::new(
        "people",
        columns,
        vec![
            Person { name: "ada".into(), age: 36 },
            Person { name: "grace".into(), age: 45 },
        ],
    )
}

#[test]
fn cell_value_config_installs_columns_and_edit_commit() {
    let view = View::new("form");
    let table = people_table(vec![
        TableColumn::new("name", "Name"),
        TableColumn::new("age", "Age"),
    ]);
    view.graph().add_root(table.clone()).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .cell_value_config(CellValueConfigDecl::for_table(
            "people",
            vec![
                TableColumnConfig::by_id("name", |p: &Person| p.name.clone()),
                TableColumnConfig::by_index(1, |p: &Person| p.age.to_string()).editable(
                    |p: &mut Person, text| {
                        if let Ok(age) = text.parse() {
                            p.age = age;
                        }
                    },
                ),
            ],
        ))
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    assert_eq!(table.cell_text(0, 0), Some("ada".to_string()));
    assert_eq!(table.cell_text(1, 1), Some("45".to_string()));

    // The committed edit mutates the backing row through its mutator.
    assert!(table.commit_edit(0, 1, "37"));
    assert_eq!(table.items().get(0).unwrap().age, 37);
}

#[test]
fn column_index_out_of_bounds_names_the_mismatch() {
    let view = View::new("form");
    let table = people_table(vec![TableColumn::new("name", "Name")]);
    view.graph().add_root(table).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .cell_value_config(CellValueConfigDecl::for_table(
            "people",
            vec![TableColumnConfig::by_index(1, |p: &Person| p.name.clone())],
        ))
        .build();
    let err = run_err(descriptor, &view);
    let message = err.to_string();
    assert!(message.contains("index 1"), "got: {message}");
    assert!(message.contains("1 column"), "got: {message}");
}

#[test]
fn unknown_column_id_names_the_id() {
    let view = View::new("form");
    let table = people_table(vec![TableColumn::new("name", "Name")]);
    view.graph().add_root(table).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .cell_value_config(CellValueConfigDecl::for_table(
            "people",
            vec![TableColumnConfig::by_id("salary", |p: &Person| p.name.clone())],
        ))
        .build();
    let message = run_err(descriptor, &view).to_string();
    assert!(message.contains("salary"), "got: {message}");
}

#[test]
fn untargeted_column_config_is_rejected() {
    let view = View::new("form");
    let table = people_table(vec![TableColumn::new("name", "Name")]);
    view.graph().add_root(table).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .cell_value_config(CellValueConfigDecl::for_table(
            "people",
            vec![TableColumnConfig::untargeted(|p: &Person| p.name.clone())],
        ))
        .build();
    let message = run_err(descriptor, &view).to_string();
    assert!(message.contains("neither"), "got: {message}");
}

#[test]
fn multi_selection_switch_changes_selection_behavior() {
    let view = View::new("form");
    let tags: Arc<ListView<&str>> = ListView::new("tags", vec!["a", "b", "c"]);
    view.graph().add_root(tags.clone()).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .multi_selection(MultiSelectionDecl::new("tags"))
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    tags.select("a");
    tags.select("b");
    assert_eq!(tags.selection().snapshot(), vec!["a", "b"]);
}

#[test]
fn selection_change_handler_receives_added_and_removed() {
    let view = View::new("form");
    let tags: Arc<ListView<String>> =
        ListView::new("tags", vec!["a".to_string(), "b".to_string()]);
    view.graph().add_root(tags.clone()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let descriptor = ControllerDescriptor::builder("ctrl")
        .multi_selection(MultiSelectionDecl::new("tags"))
        .on_value_change(
            OnValueChangeDecl::for_selection::<String>(
                "tags",
                HandlerMethod::binary_hinted::<Vec<String>, Vec<String>, _>(
                    "on_selection",
                    (ArgumentHint::AddedValues, ArgumentHint::RemovedValues),
                    move |added, removed| {
                        seen_clone.lock().push((added, removed));
                    },
                ),
            )
            .timeout_ms(0),
        )
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    tags.select("a".to_string());
    tags.deselect(&"a".to_string());

    let events = seen.lock();
    assert_eq!(events[0], (vec!["a".to_string()], vec![]));
    assert_eq!(events[1], (vec![], vec!["a".to_string()]));
}

#[test]
fn nested_view_attaches_child_root() {
    let parent = View::new("parent");
    let container = Pane::new("container");
    parent.graph().add_root(container).unwrap();

    let child = View::new("child");
    child.graph().add_root(Pane::new("child-root")).unwrap();

    let env = PipelineEnv::new();
    env.register_view(child);

    let descriptor = ControllerDescriptor::builder("ctrl")
        .nested_view(NestedViewDecl::new("child", "container"))
        .build();
    run(descriptor, &parent, &env);

    let attached = parent.graph().children_of("container");
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].base().id(), "child-root");
}

#[test]
fn unknown_nested_view_is_config_error() {
    let parent = View::new("parent");
    parent.graph().add_root(Pane::new("container")).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .nested_view(NestedViewDecl::new("missing-child", "container"))
        .build();
    let message = run_err(descriptor, &parent).to_string();
    assert!(message.contains("missing-child"), "got: {message}");
}

#[test]
fn validation_gates_node_activation() {
    let view = View::new("form");
    let email = TextInput::new("email");
    let save = Button::new("save");
    view.graph().add_root(email.clone()).unwrap();
    view.graph().add_root(save.clone()).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .validate(
            ValidationDecl::regexp("email", r"^[^@]+@[^@]+$", "not an email address")
                .options(ValidationOptions::default().required(true).started_after_ms(0)),
        )
        .enable_node(NodeActivationDecl::for_node("save").when_all_controls_valid(true))
        .build();
    run(descriptor, &view, &PipelineEnv::new());

    // Empty but required: invalid, so save stays disabled.
    assert!(save.base().disabled().get());

    email.set_text("ada@example.com");
    assert!(!save.base().disabled().get());

    email.set_text("not-an-address");
    assert!(save.base().disabled().get());
}

#[test]
fn repeated_declarations_are_kept_in_declaration_order() {
    let view = View::new("form");
    view.graph().add_root(TextInput::new("name")).unwrap();

    // Two rules for the same control: duplicates are not collapsed, and
    // registration keeps declaration order within each rule kind.
    let descriptor = ControllerDescriptor::builder("ctrl")
        .validate(ValidationDecl::size("name", Some(3), None, "too short"))
        .validate(ValidationDecl::size("name", None, Some(10), "too long"))
        .build();
    assert_eq!(descriptor.decls().len(), 2);

    let controller = ControllerHandle::new(descriptor);
    controller.attach_view(view.clone());
    Pipeline::with_default_extensions()
        .run(&controller, &PipelineEnv::new())
        .unwrap();
    assert_eq!(view.validator_count(), 2);
}

#[test]
fn invalid_regexp_pattern_is_config_error() {
    let view = View::new("form");
    view.graph().add_root(TextInput::new("email")).unwrap();

    let descriptor = ControllerDescriptor::builder("ctrl")
        .validate(ValidationDecl::regexp("email", "(unclosed", "bad"))
        .build();
    let err = run_err(descriptor, &view);
    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::InvalidPattern { .. })
    ));
}

#[test]
fn pipeline_rerun_guard_reports_the_controller() {
    let view = View::new("form");
    let descriptor = ControllerDescriptor::builder("my-controller").build();
    let controller = ControllerHandle::new(descriptor);
    controller.attach_view(view);

    let pipeline = Pipeline::with_default_extensions();
    pipeline.run(&controller, &PipelineEnv::new()).unwrap();
    assert_eq!(controller.state(), PipelineState::Ready);

    let message = pipeline
        .run(&controller, &PipelineEnv::new())
        .unwrap_err()
        .to_string();
    assert!(message.contains("my-controller"), "got: {message}");
}

#[test]
fn failed_extension_leaves_state_mid_pipeline() {
    let view = View::new("form");
    view.graph().add_root(Pane::new("root")).unwrap();

    // References a missing control: the disable-node extension fails.
    let descriptor = ControllerDescriptor::builder("ctrl")
        .disable_node(NodeActivationDecl::for_node("root").when_all_have_user_values(["ghost"]))
        .build();
    let controller = ControllerHandle::new(descriptor);
    controller.attach_view(view);

    let pipeline = Pipeline::with_default_extensions();
    assert!(pipeline.run(&controller, &PipelineEnv::new()).is_err());
    assert!(matches!(
        controller.state(),
        PipelineState::ExtensionsRunning(_)
    ));
}
