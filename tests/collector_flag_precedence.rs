use labbox_launcher::{
    Collector, FieldKey, LaunchRequest, LauncherError, NoAnswers, PortSpec, PromptField, Schema,
    ScriptedAnswers,
};

fn labbox_schema() -> Schema {
    Schema::new(vec![
        PromptField::select(
            FieldKey::Image,
            "Which labbox image?",
            vec![
                "magland/labbox-ephys:0.3.8".to_string(),
                "magland/labbox-ephys:0.4.0".to_string(),
            ],
        ),
        PromptField::confirm(FieldKey::Interactive, "Attach to the container?"),
        PromptField::text(FieldKey::Port, "Publish port (HOST:CONTAINER)").with_default("15310:15310"),
        PromptField::text(FieldKey::Env("LABBOX_CONFIG".into()), "Config URI").optional(),
    ])
    .expect("valid schema")
}

#[test]
fn test_flags_are_never_prompted() {
    let partial = LaunchRequest {
        image_identifier: Some("ubuntu:20.04".into()),
        interactive: Some(false),
        ports: vec![PortSpec { host: 8080, container: 80 }],
        env: [("LABBOX_CONFIG".to_string(), "x".to_string())].into_iter().collect(),
        ..LaunchRequest::default()
    };
    let mut answers = ScriptedAnswers::new(Vec::<String>::new());
    let out = Collector::new(&mut answers)
        .collect(partial.clone(), &labbox_schema())
        .expect("collect");
    assert!(answers.asked().is_empty(), "asked: {:?}", answers.asked());
    assert_eq!(out, partial);
}

#[test]
fn test_only_missing_fields_are_prompted() {
    let partial = LaunchRequest {
        image_identifier: Some("ubuntu:20.04".into()),
        ..LaunchRequest::default()
    };
    let mut answers = ScriptedAnswers::new(["no", "9000:9000", ""]);
    let out = Collector::new(&mut answers)
        .collect(partial, &labbox_schema())
        .expect("collect");
    assert_eq!(
        answers.asked(),
        &[
            FieldKey::Interactive,
            FieldKey::Port,
            FieldKey::Env("LABBOX_CONFIG".into())
        ]
    );
    assert_eq!(out.image_identifier.as_deref(), Some("ubuntu:20.04"));
    assert_eq!(out.interactive, Some(false));
    assert_eq!(out.ports, vec![PortSpec { host: 9000, container: 9000 }]);
    assert!(!out.env.contains_key("LABBOX_CONFIG"));
}

#[test]
fn test_invalid_selection_is_reprompted_then_accepted() {
    let schema = Schema::new(vec![PromptField::select(
        FieldKey::Image,
        "image",
        vec!["a:1".into(), "b:2".into()],
    )])
    .unwrap();
    let mut answers = ScriptedAnswers::new(["c:3", "b:2"]);
    let out = Collector::new(&mut answers)
        .collect(LaunchRequest::default(), &schema)
        .expect("second answer is valid");
    assert_eq!(answers.asked().len(), 2);
    assert_eq!(out.image_identifier.as_deref(), Some("b:2"));
}

#[test]
fn test_invalid_selection_exhausts_retries() {
    let schema = Schema::new(vec![PromptField::select(
        FieldKey::Image,
        "image",
        vec!["a:1".into()],
    )])
    .unwrap();
    let mut answers = ScriptedAnswers::new(["x", "y", "z", "a:1"]);
    let err = Collector::new(&mut answers)
        .with_max_attempts(3)
        .collect(LaunchRequest::default(), &schema)
        .expect_err("three invalid answers");
    assert!(matches!(err, LauncherError::Configuration(_)), "{err:?}");
    assert!(err.to_string().contains("image"), "{err}");
    assert_eq!(answers.asked().len(), 3);
}

#[test]
fn test_non_interactive_required_field_fails() {
    let err = Collector::new(&mut NoAnswers)
        .collect(LaunchRequest::default(), &Schema::builtin(&[]))
        .expect_err("no image and no way to ask");
    assert!(matches!(err, LauncherError::Configuration(_)));
    assert!(err.to_string().contains("required field 'image'"), "{err}");
}

#[test]
fn test_non_interactive_uses_defaults() {
    let schema = labbox_schema();
    let partial = LaunchRequest {
        image_identifier: Some("magland/labbox-ephys:0.3.8".into()),
        interactive: Some(true),
        ..LaunchRequest::default()
    };
    let out = Collector::new(&mut NoAnswers)
        .collect(partial, &schema)
        .expect("defaults fill the gaps");
    assert_eq!(out.ports, vec![PortSpec { host: 15310, container: 15310 }]);
    assert!(out.env.is_empty());
}
