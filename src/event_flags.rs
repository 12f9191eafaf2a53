/// Outcome of one event iteration, filled in by
/// [`crate::instance::ModelExchange::new_discrete_states`].
#[derive(Default, Debug, Clone, PartialEq)]
pub struct EventFlags {
    /// An integer or boolean variable differs from its pre value. The importer must call
    /// `new_discrete_states` again before leaving Event Mode.
    pub discrete_states_need_update: bool,
    /// Always false: the model never requests to stop the simulation.
    pub terminate_simulation: bool,
    /// Never set: the nominals of the states are fixed at 1.0.
    pub nominals_of_continuous_states_changed: bool,
    /// Raised together with `discrete_states_need_update`, since re-evaluating the equations
    /// after a discrete change may move the states.
    pub values_of_continuous_states_changed: bool,
    /// Always `None`: time events are not scheduled, only zero crossings are reported.
    pub next_event_time: Option<f64>,
}

impl EventFlags {
    /// Clear all flags before an event iteration.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
