//! The model-exchange interface of an instance, split into [`Common`], [`GetSet`] and
//! [`ModelExchange`].

use crate::{EventFlags, OmsiRes, ValueReference};

/// Lifecycle operations.
pub trait Common {
    /// Switch logging on or off. An empty `categories` slice applies `logging_on` to all
    /// categories, otherwise only the named ones are changed.
    fn set_debug_logging(
        &mut self,
        logging_on: bool,
        categories: &[&str],
    ) -> Result<OmsiRes, crate::Error>;

    /// Informs the instance to setup the experiment. This function can be called after
    /// `instantiate()` and before `enter_initialization_mode()` is called.
    ///
    /// Without a `tolerance` the default of `1e-5` is used. Without a `stop_time` the experiment
    /// is assumed to run for one time unit.
    fn setup_experiment(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> Result<OmsiRes, crate::Error>;

    /// Informs the instance to enter Initialization Mode.
    fn enter_initialization_mode(&mut self) -> Result<OmsiRes, crate::Error>;

    /// Informs the instance to exit Initialization Mode.
    ///
    /// The initialization equations are evaluated, followed by the simulation equations, and the
    /// instance enters Event Mode implicitly.
    fn exit_initialization_mode(&mut self) -> Result<OmsiRes, crate::Error>;

    /// Informs the instance that the simulation run is terminated.
    ///
    /// After calling this function, the final values of all variables can be inquired with the
    /// `get_xxx(..)` functions. It is not allowed to call this function after one of the functions
    /// returned with an `Error` or `Fatal` status: an instance in
    /// [`ModelState::Error`](super::ModelState::Error) can only be reset or freed.
    fn terminate(&mut self) -> Result<OmsiRes, crate::Error>;

    /// Reset the instance after a simulation run.
    ///
    /// The instance goes into the same state as if it was just instantiated. All variables have
    /// their start values.
    fn reset(&mut self) -> Result<OmsiRes, crate::Error>;

    /// Directional derivatives are not supported yet; the call is logged and rejected.
    fn get_directional_derivative(
        &mut self,
        unknown_vrs: &[ValueReference],
        known_vrs: &[ValueReference],
        dv_known_values: &[f64],
        dv_unknown_values: &mut [f64],
    ) -> Result<OmsiRes, crate::Error>;
}

/// Access to variable values by value reference.
///
/// A call either succeeds for every value reference or fails without touching any value: all
/// references are resolved and checked before anything is read or written.
pub trait GetSet {
    fn get_real(&mut self, vrs: &[ValueReference], values: &mut [f64])
        -> Result<OmsiRes, crate::Error>;

    fn get_integer(
        &mut self,
        vrs: &[ValueReference],
        values: &mut [i32],
    ) -> Result<OmsiRes, crate::Error>;

    fn get_boolean(
        &mut self,
        vrs: &[ValueReference],
        values: &mut [bool],
    ) -> Result<OmsiRes, crate::Error>;

    fn get_string(
        &mut self,
        vrs: &[ValueReference],
        values: &mut [String],
    ) -> Result<OmsiRes, crate::Error>;

    /// Set real values
    ///
    /// # Arguments
    /// * `vrs` - a slice of value references
    /// * `values` - a slice of values to set, written as given also through negated aliases
    fn set_real(&mut self, vrs: &[ValueReference], values: &[f64]) -> Result<OmsiRes, crate::Error>;

    fn set_integer(
        &mut self,
        vrs: &[ValueReference],
        values: &[i32],
    ) -> Result<OmsiRes, crate::Error>;

    fn set_boolean(
        &mut self,
        vrs: &[ValueReference],
        values: &[bool],
    ) -> Result<OmsiRes, crate::Error>;

    fn set_string(
        &mut self,
        vrs: &[ValueReference],
        values: &[String],
    ) -> Result<OmsiRes, crate::Error>;
}

pub trait ModelExchange: Common + GetSet {
    /// The model enters Event Mode from the Continuous-Time Mode and discrete-time equations may
    /// become active.
    fn enter_event_mode(&mut self) -> Result<OmsiRes, crate::Error>;

    /// Evaluate the model at the current event iteration.
    ///
    /// If `event_flags.discrete_states_need_update` is set on return, a discrete value changed
    /// with respect to its `pre` value and the importer has to stay in Event Mode and call this
    /// function again.
    fn new_discrete_states(&mut self, event_flags: &mut EventFlags)
        -> Result<OmsiRes, crate::Error>;

    /// The model enters Continuous-Time Mode and all discrete-time equations become inactive.
    fn enter_continuous_time_mode(&mut self) -> Result<OmsiRes, crate::Error>;

    /// Complete an integrator step.
    ///
    /// `enter_event_mode` and `terminate_simulation` are always cleared: step events are not
    /// requested by this runtime.
    fn completed_integrator_step(
        &mut self,
        no_set_fmu_state_prior_to_current_point: bool,
        enter_event_mode: &mut bool,
        terminate_simulation: &mut bool,
    ) -> Result<OmsiRes, crate::Error>;

    /// Set a new time instant and invalidate the values depending on time.
    fn set_time(&mut self, time: f64) -> Result<OmsiRes, crate::Error>;

    /// Set a new (continuous) state vector. `states` must have one element per state.
    fn set_continuous_states(&mut self, states: &[f64]) -> Result<OmsiRes, crate::Error>;

    /// Compute the state derivatives at the current time instant and for the current states.
    fn get_derivatives(&mut self, derivatives: &mut [f64]) -> Result<OmsiRes, crate::Error>;

    /// Compute the event indicators at the current time instant and for the current states. The
    /// slice must have one element per zero crossing of the model.
    fn get_event_indicators(&mut self, indicators: &mut [f64]) -> Result<OmsiRes, crate::Error>;

    /// Return the current (continuous) state vector.
    fn get_continuous_states(&mut self, states: &mut [f64]) -> Result<OmsiRes, crate::Error>;

    /// Return the nominal values of the continuous states, always `1.0`.
    fn get_nominals_of_continuous_states(
        &mut self,
        nominals: &mut [f64],
    ) -> Result<OmsiRes, crate::Error>;
}
