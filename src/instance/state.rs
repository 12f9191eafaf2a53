use std::fmt::Display;

/// Lifecycle state of a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelState {
    Instantiated,
    InitializationMode,
    EventMode,
    ContinuousTimeMode,
    Terminated,
    Error,
}

impl ModelState {
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelState::Instantiated => "modelInstantiated",
            ModelState::InitializationMode => "modelInitializationMode",
            ModelState::EventMode => "modelEventMode",
            ModelState::ContinuousTimeMode => "modelContinuousTimeMode",
            ModelState::Terminated => "modelTerminated",
            ModelState::Error => "modelError",
        };
        f.write_str(name)
    }
}

/// A set of [`ModelState`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSet(u8);

impl StateSet {
    pub const ALL: StateSet = StateSet::of(&[
        ModelState::Instantiated,
        ModelState::InitializationMode,
        ModelState::EventMode,
        ModelState::ContinuousTimeMode,
        ModelState::Terminated,
        ModelState::Error,
    ]);

    pub const fn of(states: &[ModelState]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < states.len() {
            bits |= states[i].bit();
            i += 1;
        }
        StateSet(bits)
    }

    pub const fn contains(self, state: ModelState) -> bool {
        self.0 & state.bit() != 0
    }
}

use ModelState::{
    ContinuousTimeMode as CT, Error as ERR, EventMode as EV, InitializationMode as INIT,
    Instantiated as INST, Terminated as TERM,
};

/// The externally visible operations of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetDebugLogging,
    SetupExperiment,
    EnterInitializationMode,
    ExitInitializationMode,
    Terminate,
    Reset,
    GetReal,
    GetInteger,
    GetBoolean,
    GetString,
    SetReal,
    SetInteger,
    SetBoolean,
    SetString,
    GetDirectionalDerivative,
    EnterEventMode,
    NewDiscreteStates,
    EnterContinuousTimeMode,
    CompletedIntegratorStep,
    SetTime,
    SetContinuousStates,
    GetDerivatives,
    GetEventIndicators,
    GetContinuousStates,
    GetNominalsOfContinuousStates,
    FreeInstance,
}

impl Operation {
    pub const fn name(self) -> &'static str {
        match self {
            Operation::SetDebugLogging => "set_debug_logging",
            Operation::SetupExperiment => "setup_experiment",
            Operation::EnterInitializationMode => "enter_initialization_mode",
            Operation::ExitInitializationMode => "exit_initialization_mode",
            Operation::Terminate => "terminate",
            Operation::Reset => "reset",
            Operation::GetReal => "get_real",
            Operation::GetInteger => "get_integer",
            Operation::GetBoolean => "get_boolean",
            Operation::GetString => "get_string",
            Operation::SetReal => "set_real",
            Operation::SetInteger => "set_integer",
            Operation::SetBoolean => "set_boolean",
            Operation::SetString => "set_string",
            Operation::GetDirectionalDerivative => "get_directional_derivative",
            Operation::EnterEventMode => "enter_event_mode",
            Operation::NewDiscreteStates => "new_discrete_states",
            Operation::EnterContinuousTimeMode => "enter_continuous_time_mode",
            Operation::CompletedIntegratorStep => "completed_integrator_step",
            Operation::SetTime => "set_time",
            Operation::SetContinuousStates => "set_continuous_states",
            Operation::GetDerivatives => "get_derivatives",
            Operation::GetEventIndicators => "get_event_indicators",
            Operation::GetContinuousStates => "get_continuous_states",
            Operation::GetNominalsOfContinuousStates => "get_nominals_of_continuous_states",
            Operation::FreeInstance => "free_instance",
        }
    }

    /// The states in which the operation may be invoked.
    pub const fn legal_states(self) -> StateSet {
        match self {
            Operation::SetDebugLogging | Operation::Reset | Operation::FreeInstance => {
                StateSet::ALL
            }
            Operation::GetEventIndicators => StateSet::ALL,
            Operation::SetupExperiment | Operation::EnterInitializationMode => {
                StateSet::of(&[INST])
            }
            Operation::ExitInitializationMode => StateSet::of(&[INIT]),
            Operation::Terminate => StateSet::of(&[INST, INIT, EV, CT, TERM]),
            Operation::GetReal
            | Operation::GetInteger
            | Operation::GetBoolean
            | Operation::GetString
            | Operation::GetContinuousStates => StateSet::of(&[INIT, EV, CT, TERM, ERR]),
            Operation::SetReal
            | Operation::SetInteger
            | Operation::SetBoolean
            | Operation::SetString
            | Operation::SetContinuousStates => StateSet::of(&[INST, INIT, EV, CT]),
            Operation::GetDirectionalDerivative => StateSet::of(&[INST, EV, CT]),
            Operation::EnterEventMode | Operation::SetTime => StateSet::of(&[EV, CT]),
            Operation::NewDiscreteStates | Operation::EnterContinuousTimeMode => {
                StateSet::of(&[EV])
            }
            Operation::CompletedIntegratorStep => StateSet::of(&[CT]),
            Operation::GetDerivatives => StateSet::of(&[EV, CT, TERM, ERR]),
            Operation::GetNominalsOfContinuousStates => StateSet::of(&[INST, EV, CT, TERM, ERR]),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
