use weft_core::prelude::*;

fn setup() {
    let _ = env_logger::Builder::from_env("WEFT_LOG").try_init();
}

fn fact(shape: &str) -> PortFact {
    PortFact::new(ElementType::F32, shape.parse::<PartialShape>().unwrap())
}

/// `input_a + input_b -> result`, both inputs [1,3,224,224].
fn add_model() -> Model {
    let mut model = Model::new("add_model");
    let a = model.add_source("input_a", fact("[1,3,224,224]")).unwrap();
    model.add_port_name(a, "input_a").unwrap();
    let b = model.add_source("input_b", fact("[1,3,224,224]")).unwrap();
    model.add_port_name(b, "input_b").unwrap();
    let sum = model.wire_node("sum", Op::Binary, &[a, b]).unwrap();
    let result = model.wire_node("result", Op::Result, &[sum]).unwrap();
    model.set_output_outlets(&[result]).unwrap();
    model
}

/// A stateful accumulator: `state = state + input`, variable id "ID1".
fn stateful_model(input_shape: &str, state_shape: &str) -> Model {
    let mut model = Model::new("stateful");
    let input = model.add_source("input", fact(input_shape)).unwrap();
    model.add_port_name(input, "input").unwrap();
    // the variable is registered once both sides exist, so the read node
    // gets its fact assigned rather than inferred
    let read_id = model
        .add_node("read", Op::ReadValue { variable: "ID1".to_string() }, tvec!(fact(state_shape)))
        .unwrap();
    let read = OutletId::new(read_id, 0);
    let sum = model.wire_node("sum", Op::Binary, &[input, read]).unwrap();
    let assign = model
        .wire_node("assign", Op::Assign { variable: "ID1".to_string() }, &[sum])
        .unwrap();
    let result = model.wire_node("result", Op::Result, &[sum]).unwrap();
    model.set_output_outlets(&[result]).unwrap();
    model
        .register_variable("ID1", fact(state_shape), read, InletId::new(assign.node, 0))
        .unwrap();
    model
}

fn output_shape(model: &Model) -> String {
    let port = model.output(0).unwrap();
    model.port_shape(&port).unwrap().to_string()
}

#[test]
fn reshape_by_index() {
    setup();
    let mut model = add_model();
    let request = ReshapeRequest::new()
        .with_shape(0i64, "[2,3,224,224]".parse().unwrap())
        .with_shape(1i64, "[2,3,224,224]".parse().unwrap());
    model.reshape(&request).unwrap();
    assert_eq!(output_shape(&model), "[2,3,224,224]");
}

#[test]
fn reshape_by_name_and_port_agree_with_index() {
    let shape: PartialShape = "[4,3,112,112]".parse().unwrap();

    let mut by_index = add_model();
    by_index
        .reshape(
            &ReshapeRequest::new()
                .with_shape(0i64, shape.clone())
                .with_shape(1i64, shape.clone()),
        )
        .unwrap();

    let mut by_name = add_model();
    by_name
        .reshape(
            &ReshapeRequest::new()
                .with_shape("input_a", shape.clone())
                .with_shape("input_b", shape.clone()),
        )
        .unwrap();

    let mut by_port = add_model();
    let ports = (by_port.input(0).unwrap(), by_port.input(1).unwrap());
    by_port
        .reshape(
            &ReshapeRequest::new()
                .with_shape(ports.0, shape.clone())
                .with_shape(ports.1, shape),
        )
        .unwrap();

    assert_eq!(by_index, by_name);
    assert_eq!(by_index, by_port);
    assert_eq!(output_shape(&by_index), "[4,3,112,112]");
}

#[test]
fn interval_shape_survives_round_trip() {
    let mut model = add_model();
    let shape: PartialShape = "[?,?,1..3,224]".parse().unwrap();
    let request = ReshapeRequest::new()
        .with_shape(0i64, shape.clone())
        .with_shape(1i64, shape);
    model.reshape(&request).unwrap();
    let input = model.input(0).unwrap();
    assert_eq!(model.port_shape(&input).unwrap().to_string(), "[?,?,1..3,224]");
    assert_eq!(output_shape(&model), "[?,?,1..3,224]");
}

#[test]
fn bare_dimension_list_parses() {
    let shape: PartialShape = "1, 4".parse().unwrap();
    assert_eq!(shape.to_string(), "[1,4]");

    let mut model = Model::new("m");
    let a = model.add_source("a", fact("[2,4]")).unwrap();
    let result = model.wire_node("result", Op::Result, &[a]).unwrap();
    model.set_output_outlets(&[result]).unwrap();
    model.reshape(&ReshapeRequest::new().with_shape(0i64, shape)).unwrap();
    assert_eq!(output_shape(&model), "[1,4]");
}

#[test]
fn reshape_flips_is_dynamic() {
    let mut model = add_model();
    assert!(!model.is_dynamic());
    let dynamic: PartialShape = "[?,3,224,224]".parse().unwrap();
    model
        .reshape(
            &ReshapeRequest::new()
                .with_shape(0i64, dynamic.clone())
                .with_shape(1i64, dynamic),
        )
        .unwrap();
    assert!(model.is_dynamic());
    let fixed: PartialShape = "[1,3,224,224]".parse().unwrap();
    model
        .reshape(
            &ReshapeRequest::new()
                .with_shape(0i64, fixed.clone())
                .with_shape(1i64, fixed),
        )
        .unwrap();
    assert!(!model.is_dynamic());
}

#[test]
fn ports_survive_reshape() {
    let mut model = add_model();
    let input = model.input(0).unwrap();
    let output = model.output(0).unwrap();
    model
        .reshape(&ReshapeRequest::new().with_shape(0i64, "[5,3,224,224]".parse().unwrap()))
        .unwrap();
    assert_eq!(model.port_shape(&input).unwrap().to_string(), "[5,3,224,224]");
    assert_eq!(model.port_shape(&output).unwrap().to_string(), "[5,3,224,224]");
}

#[test]
fn partial_request_broadcasts() {
    let mut model = add_model();
    model
        .reshape(&ReshapeRequest::new().with_shape("input_b", "[1,3,1,1]".parse().unwrap()))
        .unwrap();
    assert_eq!(output_shape(&model), "[1,3,224,224]");
}

#[test]
fn matmul_chain_repropagates() {
    let mut model = Model::new("mm");
    let a = model.add_source("a", fact("[4,5]")).unwrap();
    let b = model.add_source("b", fact("[5,6]")).unwrap();
    let mm = model.wire_node("mm", Op::MatMul, &[a, b]).unwrap();
    let result = model.wire_node("result", Op::Result, &[mm]).unwrap();
    model.set_output_outlets(&[result]).unwrap();
    assert_eq!(output_shape(&model), "[4,6]");

    model
        .reshape(
            &ReshapeRequest::new()
                .with_shape(0i64, "[8,2..7]".parse().unwrap())
                .with_shape(1i64, "[3..5,9]".parse().unwrap()),
        )
        .unwrap();
    assert_eq!(output_shape(&model), "[8,9]");
}

#[test]
fn concat_axis_sums_after_reshape() {
    let mut model = Model::new("cat");
    let a = model.add_source("a", fact("[2,3]")).unwrap();
    let b = model.add_source("b", fact("[2,5]")).unwrap();
    let cat = model.wire_node("cat", Op::Concat { axis: 1 }, &[a, b]).unwrap();
    let result = model.wire_node("result", Op::Result, &[cat]).unwrap();
    model.set_output_outlets(&[result]).unwrap();
    assert_eq!(output_shape(&model), "[2,8]");

    model
        .reshape(&ReshapeRequest::new().with_shape(0i64, "[2,1..4]".parse().unwrap()))
        .unwrap();
    assert_eq!(output_shape(&model), "[2,6..9]");
}

#[test]
fn variable_override_updates_both_sides() {
    setup();
    let mut model = stateful_model("[1,4]", "[1,4]");
    model
        .reshape(
            &ReshapeRequest::new()
                .with_shape("input", "[46,1]".parse().unwrap())
                .with_variable("ID1", "[?,?]".parse().unwrap()),
        )
        .unwrap();
    // state narrows to the broadcast result fed back through Assign
    assert_eq!(model.variable("ID1").unwrap().fact.shape.to_string(), "[46,?]");
    assert_eq!(output_shape(&model), "[46,?]");
}

#[test]
fn omitted_override_keeps_state_shape() {
    // compatible reshape: the state stays [1,4] and constrains the output
    let mut model = stateful_model("[?,4]", "[1,4]");
    model
        .reshape(&ReshapeRequest::new().with_shape("input", "[1,4]".parse().unwrap()))
        .unwrap();
    assert_eq!(model.variable("ID1").unwrap().fact.shape.to_string(), "[1,4]");

    // incompatible reshape: assign side would need [46,4], state says [1,4]
    let mut model = stateful_model("[?,4]", "[1,4]");
    let before = model.clone();
    let err = model
        .reshape(&ReshapeRequest::new().with_shape("input", "[46,4]".parse().unwrap()))
        .unwrap_err();
    assert!(matches!(err, WeftError::Shape(_)));
    assert_eq!(model, before);
}

#[test]
fn variable_only_request_is_accepted() {
    let mut model = stateful_model("[1,4]", "[1,4]");
    model
        .reshape(&ReshapeRequest::new().with_variable("ID1", "[1,1..8]".parse().unwrap()))
        .unwrap();
    assert_eq!(model.variable("ID1").unwrap().fact.shape.to_string(), "[1,4]");
}

#[test]
fn empty_request_is_rejected() {
    let mut model = add_model();
    assert!(matches!(
        model.reshape(&ReshapeRequest::new()),
        Err(WeftError::Argument(_))
    ));
}

#[test]
fn unknown_index_name_and_variable_are_rejected() {
    let mut model = add_model();
    let shape: PartialShape = "[1,3,224,224]".parse().unwrap();
    assert!(matches!(
        model.reshape(&ReshapeRequest::new().with_shape(7i64, shape.clone())),
        Err(WeftError::OutOfRange(_))
    ));
    assert!(matches!(
        model.reshape(&ReshapeRequest::new().with_shape(-1i64, shape.clone())),
        Err(WeftError::OutOfRange(_))
    ));
    assert!(matches!(
        model.reshape(&ReshapeRequest::new().with_shape("no_such_input", shape.clone())),
        Err(WeftError::NotFound(_))
    ));
    assert!(matches!(
        model.reshape(
            &ReshapeRequest::new()
                .with_shape(0i64, shape.clone())
                .with_variable("ID1", shape)
        ),
        Err(WeftError::NotFound(_))
    ));
}

#[test]
fn shared_input_name_is_ambiguous() {
    let mut model = add_model();
    let a = model.input_outlets()[0];
    let b = model.input_outlets()[1];
    model.add_port_name(a, "shared").unwrap();
    model.add_port_name(b, "shared").unwrap();
    assert!(matches!(
        model.reshape(
            &ReshapeRequest::new().with_shape("shared", "[1,3,224,224]".parse().unwrap())
        ),
        Err(WeftError::AmbiguousName(_))
    ));
}

#[test]
fn conflicting_duplicate_keys_are_rejected() {
    let mut model = add_model();
    let same: PartialShape = "[2,3,224,224]".parse().unwrap();
    // same target twice with the same shape is tolerated
    model
        .reshape(
            &ReshapeRequest::new()
                .with_shape(0i64, same.clone())
                .with_shape("input_a", same.clone()),
        )
        .unwrap();
    assert!(matches!(
        model.reshape(
            &ReshapeRequest::new()
                .with_shape(0i64, same)
                .with_shape("input_a", "[9,3,224,224]".parse().unwrap())
        ),
        Err(WeftError::ConflictingShape(_))
    ));
}

#[test]
fn foreign_and_non_input_ports_are_rejected() {
    let mut model = add_model();
    let stranger = add_model();
    let foreign = stranger.input(0).unwrap();
    let shape: PartialShape = "[1,3,224,224]".parse().unwrap();
    assert!(matches!(
        model.reshape(&ReshapeRequest::new().with_shape(foreign, shape.clone())),
        Err(WeftError::ForeignPort(_))
    ));
    let output = model.output(0).unwrap();
    assert!(matches!(
        model.reshape(&ReshapeRequest::new().with_shape(output, shape)),
        Err(WeftError::NotFound(_))
    ));
}

#[test]
fn failed_reshape_leaves_model_untouched() {
    setup();
    let mut model = Model::new("mm");
    let a = model.add_source("a", fact("[4,5]")).unwrap();
    let b = model.add_source("b", fact("[5,6]")).unwrap();
    let mm = model.wire_node("mm", Op::MatMul, &[a, b]).unwrap();
    model.set_output_outlets(&[mm]).unwrap();
    let before = model.clone();

    // inner dimensions stop agreeing, inference fails downstream
    let err = model
        .reshape(&ReshapeRequest::new().with_shape(0i64, "[4,7]".parse().unwrap()))
        .unwrap_err();
    assert!(matches!(err, WeftError::Shape(_)));
    assert_eq!(model, before);
    assert_eq!(output_shape(&model), "[4,6]");
}

#[test]
fn reshaped_clone_leaves_source_alone() {
    let model = add_model();
    let mut clone = model.clone();
    clone
        .reshape(&ReshapeRequest::new().with_shape(0i64, "[?,3,224,224]".parse().unwrap()))
        .unwrap();
    assert!(clone.is_dynamic());
    assert!(!model.is_dynamic());
}
