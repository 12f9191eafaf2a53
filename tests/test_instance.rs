//! Test the lifecycle of a model instance through the model-exchange interface.

mod common;

use assert_approx_eq::assert_approx_eq;
use rstest::rstest;

use common::{Harness, Loop, DER_X, FLAG, GUID, NOT_FLAG, X, Y, Z};
use omsi::{
    instance::{Common, GetSet, Instance, ModelExchange, ModelState},
    logger::LogCategory,
    solver::{AlgebraicSystem, ModelFunction, ModelFunctions},
    Error, EventFlags, OmsiRes, OmsiStatus,
};

#[test_log::test]
fn test_lifecycle() {
    let Harness {
        mut instance,
        allocator,
        messages: _,
    } = Harness::new(Loop::Regular);
    assert_eq!(instance.state(), ModelState::Instantiated);

    instance
        .setup_experiment(None, 0.0, None)
        .ok()
        .expect("setup_experiment");
    assert_eq!(instance.experiment().tolerance, 1e-5);
    assert_eq!(instance.experiment().stop_time, 1.0);
    assert_approx_eq!(instance.experiment().step_size, 0.002);

    instance
        .enter_initialization_mode()
        .ok()
        .expect("enter_initialization_mode");
    let res = instance
        .exit_initialization_mode()
        .ok()
        .expect("exit_initialization_mode");
    assert_eq!(res, OmsiRes::OK);
    assert_eq!(instance.state(), ModelState::EventMode);

    let mut reals = [0.0; 3];
    instance.get_real(&[Y, Z, DER_X], &mut reals).unwrap();
    assert_approx_eq!(reals[0], 1.0);
    assert_approx_eq!(reals[1], 2.0);
    assert_approx_eq!(reals[2], -1.0);

    let mut flags = EventFlags::default();
    instance.new_discrete_states(&mut flags).unwrap();
    assert!(!flags.discrete_states_need_update);
    assert_eq!(flags.next_event_time, None);

    instance.enter_continuous_time_mode().unwrap();
    instance.set_time(0.1).unwrap();
    instance.set_continuous_states(&[0.2]).unwrap();

    let mut derivatives = [0.0];
    instance.get_derivatives(&mut derivatives).unwrap();
    assert_approx_eq!(derivatives[0], -0.2);

    let mut indicators = [0.0];
    instance.get_event_indicators(&mut indicators).unwrap();
    assert_approx_eq!(indicators[0], -0.3);

    let (mut enter_event_mode, mut terminate_simulation) = (true, true);
    instance
        .completed_integrator_step(true, &mut enter_event_mode, &mut terminate_simulation)
        .unwrap();
    assert!(!enter_event_mode && !terminate_simulation);

    // the flag switched while integrating, one more event iteration is needed
    instance.enter_event_mode().unwrap();
    instance.new_discrete_states(&mut flags).unwrap();
    assert!(flags.discrete_states_need_update);
    assert!(flags.values_of_continuous_states_changed);
    instance.new_discrete_states(&mut flags).unwrap();
    assert!(!flags.discrete_states_need_update);
    assert!(instance.pre_values().bools()[0]);

    let mut bools = [false; 2];
    instance.get_boolean(&[FLAG, NOT_FLAG], &mut bools).unwrap();
    assert_eq!(bools, [true, false]);

    instance.enter_continuous_time_mode().unwrap();
    let mut states = [0.0];
    instance.get_continuous_states(&mut states).unwrap();
    assert_eq!(states, [0.2]);
    let mut nominals = [0.0];
    instance
        .get_nominals_of_continuous_states(&mut nominals)
        .unwrap();
    assert_eq!(nominals, [1.0]);

    instance.terminate().ok().expect("terminate");
    assert_eq!(instance.state(), ModelState::Terminated);
    instance.get_real(&[X], &mut reals[..1]).unwrap();
    assert_eq!(reals[0], 0.2);

    instance.free_instance();
    assert!(allocator.allocations() > 0);
    assert_eq!(allocator.live(), 0);
}

#[rstest]
#[case::exit_initialization_mode(|i: &mut Instance| i.exit_initialization_mode())]
#[case::enter_event_mode(|i: &mut Instance| i.enter_event_mode())]
#[case::new_discrete_states(|i: &mut Instance| i.new_discrete_states(&mut EventFlags::default()))]
#[case::enter_continuous_time_mode(|i: &mut Instance| i.enter_continuous_time_mode())]
#[case::set_time(|i: &mut Instance| i.set_time(1.0))]
#[case::get_real(|i: &mut Instance| i.get_real(&[X], &mut [0.0]))]
#[case::get_derivatives(|i: &mut Instance| i.get_derivatives(&mut [0.0]))]
#[case::get_continuous_states(|i: &mut Instance| i.get_continuous_states(&mut [0.0]))]
#[case::completed_integrator_step(
    |i: &mut Instance| i.completed_integrator_step(false, &mut false, &mut false)
)]
fn test_rejected_before_initialization(
    #[case] call: fn(&mut Instance) -> Result<OmsiRes, Error>,
) {
    let mut harness = Harness::new(Loop::Regular);
    let before = harness.instance.values().reals().to_vec();

    let err = call(&mut harness.instance).unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidState {
            state: ModelState::Instantiated,
            ..
        }
    ));
    assert_eq!(err.status(), OmsiStatus::Error);
    assert_eq!(harness.instance.state(), ModelState::Instantiated);
    assert_eq!(harness.instance.values().reals(), &before[..]);
    assert_eq!(harness.logged(LogCategory::StatusError), 1);
}

#[test_log::test]
fn test_singular_initialization() {
    let Harness {
        mut instance,
        allocator,
        messages,
    } = Harness::new(Loop::Singular);
    instance.setup_experiment(None, 0.0, None).unwrap();
    instance.enter_initialization_mode().unwrap();

    let err = instance.exit_initialization_mode().unwrap_err();
    assert!(matches!(err, Error::Numeric { system: 0, .. }));
    assert_eq!(err.status(), OmsiStatus::Fatal);
    assert_eq!(instance.state(), ModelState::Error);
    assert!(messages
        .lock()
        .unwrap()
        .iter()
        .any(|(status, category, _)| *status == OmsiStatus::Fatal
            && *category == LogCategory::StatusFatal));

    // the loop outputs keep their start values
    let mut yz = [f64::NAN; 2];
    instance.get_real(&[Y, Z], &mut yz).unwrap();
    assert_eq!(yz, [0.0, 0.0]);

    assert!(matches!(
        instance.enter_event_mode(),
        Err(Error::InvalidState {
            state: ModelState::Error,
            ..
        })
    ));
    assert!(instance.terminate().is_err());

    instance.reset().unwrap();
    assert_eq!(instance.state(), ModelState::Instantiated);

    instance.free_instance();
    assert_eq!(allocator.live(), 0);
}

#[test_log::test]
fn test_inaccurate_initialization() {
    let mut harness = Harness::new(Loop::Inaccurate);
    let instance = &mut harness.instance;
    instance.setup_experiment(None, 0.0, None).unwrap();
    instance.enter_initialization_mode().unwrap();

    // the regular loop of the simulation equations still succeeds
    let res = instance.exit_initialization_mode().unwrap();
    assert_eq!(res, OmsiRes::Warning);
    assert_eq!(instance.state(), ModelState::EventMode);
    assert!(harness
        .messages
        .lock()
        .unwrap()
        .iter()
        .any(|(status, category, _)| *status == OmsiStatus::Warning
            && *category == LogCategory::LinearSystems));
}

#[test_log::test]
fn test_reset_restores_start_values() {
    let mut harness = Harness::new(Loop::Regular);
    let instance = &mut harness.instance;
    instance.setup_experiment(Some(1e-6), 1.0, Some(3.0)).unwrap();
    assert_eq!(instance.values().time, 1.0);
    instance.enter_initialization_mode().unwrap();
    instance.set_real(&[X], &[5.0]).unwrap();
    instance.exit_initialization_mode().unwrap();
    instance.terminate().unwrap();

    instance.reset().unwrap();
    assert_eq!(instance.state(), ModelState::Instantiated);
    assert_eq!(instance.values().reals(), &[1.0, 0.0, 0.0, 0.0, 1.0]);
    assert_eq!(instance.values().time, 0.0);
    assert_eq!(instance.experiment().tolerance, 1e-5);

    // a new run can be started
    instance.setup_experiment(None, 0.0, None).unwrap();
    instance.enter_initialization_mode().unwrap();
    instance.exit_initialization_mode().unwrap();
}

#[test_log::test]
fn test_nonlinear_initialization_failure_is_recoverable() {
    // y = 1, with no slope left of zero
    let system = AlgebraicSystem::nonlinear(7, vec![2], |x, _, res| {
        res[0] = x[0].max(0.0) - 1.0;
        Ok(OmsiRes::OK)
    })
    .with_zerocrossing_indices(vec![0]);
    let functions = ModelFunctions {
        initialization: ModelFunction::default().with_algebraic_system(system),
        ..common::functions(Loop::Regular)
    };
    let systems = functions
        .initialization
        .algebraic_systems()
        .map(|system| (system.id(), system.is_linear(), system.zerocrossing_indices()))
        .collect::<Vec<_>>();
    assert_eq!(systems, [(7, false, &[0][..])]);

    let (callbacks, allocator, _) = common::callbacks();
    let mut instance = Instance::instantiate(
        "inst1",
        GUID,
        common::model_data(),
        functions,
        callbacks,
        true,
    )
    .expect("instantiate");
    instance.enter_initialization_mode().unwrap();
    instance.set_real(&[Y], &[-1.0]).unwrap();

    let err = instance.exit_initialization_mode().unwrap_err();
    assert!(matches!(err, Error::NoConvergence { system: 7, .. }));
    assert_eq!(err.status(), OmsiStatus::Discard);
    assert_eq!(instance.state(), ModelState::InitializationMode);
    let mut y = [0.0];
    instance.get_real(&[Y], &mut y).unwrap();
    assert_eq!(y, [-1.0]);

    // a better guess lets the initialization finish
    instance.set_real(&[Y], &[0.5]).unwrap();
    instance.exit_initialization_mode().unwrap();
    assert_eq!(instance.state(), ModelState::EventMode);

    instance.free_instance();
    assert_eq!(allocator.live(), 0);
}

#[test]
fn test_instantiate_arguments() {
    let instantiate = |name: &str, guid: &str| {
        let (callbacks, _, _) = common::callbacks();
        Instance::instantiate(
            name,
            guid,
            common::model_data(),
            common::functions(Loop::Regular),
            callbacks,
            false,
        )
    };

    assert!(matches!(
        instantiate("", GUID),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        instantiate("inst1", ""),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        instantiate("inst1", "{00000000-0000-0000-0000-000000000000}"),
        Err(Error::InvalidArgument(_))
    ));

    let mut model_data = common::model_data();
    model_data.counts.n_string_vars = 1;
    let (callbacks, allocator, _) = common::callbacks();
    let err = Instance::instantiate(
        "inst1",
        GUID,
        model_data,
        common::functions(Loop::Regular),
        callbacks,
        false,
    )
    .err()
    .expect("string variables are rejected");
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(err.status(), OmsiStatus::Fatal);
    assert_eq!(allocator.live(), 0);
}

#[test]
fn test_debug_logging() {
    let mut harness = Harness::new(Loop::Regular);
    let instance = &mut harness.instance;

    let err = instance
        .set_debug_logging(true, &["logEvents", "logNothing"])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    instance.set_debug_logging(false, &[]).unwrap();
    instance.set_debug_logging(true, &["logEvents"]).unwrap();
    assert!(instance.context().logging_on(LogCategory::Events));
    assert!(!instance.context().logging_on(LogCategory::LinearSystems));

    let logged = harness.messages.lock().unwrap().len();
    harness.instance.setup_experiment(None, 0.0, None).unwrap();
    assert_eq!(harness.messages.lock().unwrap().len(), logged);
}

#[test]
fn test_directional_derivative_is_unsupported() {
    let mut harness = Harness::new(Loop::Regular);
    let err = harness
        .instance
        .get_directional_derivative(&[DER_X], &[X], &[1.0], &mut [0.0])
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
    assert_eq!(err.status(), OmsiStatus::Error);
    assert_eq!(harness.instance.state(), ModelState::Instantiated);
}

#[test]
fn test_event_indicator_length() {
    let mut harness = Harness::new(Loop::Regular);
    let err = harness
        .instance
        .get_event_indicators(&mut [0.0, 0.0])
        .unwrap_err();
    assert!(matches!(
        err,
        Error::LengthMismatch {
            expected: 1,
            found: 2,
            ..
        }
    ));
}
