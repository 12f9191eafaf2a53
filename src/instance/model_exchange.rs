use super::{Instance, ModelExchange, ModelState, Operation};
use crate::{logger::LogCategory, Error, EventFlags, OmsiRes, OmsiStatus, ValueReference};

impl Instance {
    fn n_states(&self) -> usize {
        self.model_data.counts.n_states
    }

    /// Value references of the states; the derivatives follow directly.
    fn state_vrs(&self) -> std::ops::Range<ValueReference> {
        0..self.n_states() as ValueReference
    }

    fn derivative_vrs(&self) -> std::ops::Range<ValueReference> {
        let n = self.n_states() as ValueReference;
        n..n + self.model_data.counts.n_derivatives as ValueReference
    }
}

impl ModelExchange for Instance {
    fn enter_event_mode(&mut self) -> Result<OmsiRes, Error> {
        self.begin(Operation::EnterEventMode)?;
        self.state = ModelState::EventMode;
        self.context.log(
            OmsiStatus::OK,
            LogCategory::Events,
            format_args!(
                "enter_event_mode: at time {}",
                self.store.current().time
            ),
        );
        Ok(OmsiRes::OK)
    }

    fn new_discrete_states(&mut self, event_flags: &mut EventFlags) -> Result<OmsiRes, Error> {
        let operation = Operation::NewDiscreteStates;
        self.begin(operation)?;
        event_flags.reset();

        let res = self.evaluate_simulation(operation)?;

        if self.store.discrete_changed() {
            event_flags.discrete_states_need_update = true;
            event_flags.values_of_continuous_states_changed = true;
            self.context.log(
                OmsiStatus::OK,
                LogCategory::Events,
                format_args!(
                    "new_discrete_states: discrete values changed at time {}",
                    self.store.current().time
                ),
            );
        }
        self.store.store_pre_values();

        Ok(res)
    }

    fn enter_continuous_time_mode(&mut self) -> Result<OmsiRes, Error> {
        self.begin(Operation::EnterContinuousTimeMode)?;
        self.state = ModelState::ContinuousTimeMode;
        Ok(OmsiRes::OK)
    }

    fn completed_integrator_step(
        &mut self,
        _no_set_fmu_state_prior_to_current_point: bool,
        enter_event_mode: &mut bool,
        terminate_simulation: &mut bool,
    ) -> Result<OmsiRes, Error> {
        let operation = Operation::CompletedIntegratorStep;
        self.begin(operation)?;
        let res = self.update(operation)?;
        *enter_event_mode = false;
        *terminate_simulation = false;
        Ok(res)
    }

    fn set_time(&mut self, time: f64) -> Result<OmsiRes, Error> {
        self.begin(Operation::SetTime)?;
        self.store.current_mut().time = time;
        self.is_dirty_values = true;
        Ok(OmsiRes::OK)
    }

    fn set_continuous_states(&mut self, states: &[f64]) -> Result<OmsiRes, Error> {
        let operation = Operation::SetContinuousStates;
        self.begin(operation)?;
        self.check_length(operation, "states", self.n_states(), states.len())?;
        if let Err(err) = self.write(operation, self.state_vrs(), states) {
            return Err(self.reject(operation, err));
        }
        Ok(OmsiRes::OK)
    }

    fn get_derivatives(&mut self, derivatives: &mut [f64]) -> Result<OmsiRes, Error> {
        let operation = Operation::GetDerivatives;
        self.begin(operation)?;
        self.check_length(
            operation,
            "derivatives",
            self.model_data.counts.n_derivatives,
            derivatives.len(),
        )?;
        let res = self.update(operation)?;
        self.read(operation, self.derivative_vrs(), derivatives)
            .map_err(|err| self.reject(operation, err))?;
        Ok(res)
    }

    fn get_event_indicators(&mut self, indicators: &mut [f64]) -> Result<OmsiRes, Error> {
        let operation = Operation::GetEventIndicators;
        self.begin(operation)?;
        self.check_length(
            operation,
            "event indicators",
            self.model_data.counts.n_zerocrossings,
            indicators.len(),
        )?;
        let res = self.update(operation)?;

        let result = match &self.functions.zero_crossings {
            Some(zero_crossings) => zero_crossings(self.store.current(), indicators),
            None => Ok(OmsiRes::OK),
        };
        match result {
            Ok(zc_res) => Ok(res.max(zc_res)),
            Err(err) => Err(self.fail(operation, err.into())),
        }
    }

    fn get_continuous_states(&mut self, states: &mut [f64]) -> Result<OmsiRes, Error> {
        let operation = Operation::GetContinuousStates;
        self.begin(operation)?;
        self.check_length(operation, "states", self.n_states(), states.len())?;
        self.read(operation, self.state_vrs(), states)
            .map_err(|err| self.reject(operation, err))?;
        Ok(OmsiRes::OK)
    }

    fn get_nominals_of_continuous_states(
        &mut self,
        nominals: &mut [f64],
    ) -> Result<OmsiRes, Error> {
        let operation = Operation::GetNominalsOfContinuousStates;
        self.begin(operation)?;
        self.check_length(operation, "nominals", self.n_states(), nominals.len())?;
        nominals.fill(1.0);
        Ok(OmsiRes::OK)
    }
}
