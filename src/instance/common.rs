use super::{Common, Instance, ModelState, Operation};
use crate::{
    experiment::Experiment, logger::LogCategory, Error, OmsiRes, OmsiStatus, ValueReference,
};

impl Common for Instance {
    fn set_debug_logging(
        &mut self,
        logging_on: bool,
        categories: &[&str],
    ) -> Result<OmsiRes, Error> {
        self.begin(Operation::SetDebugLogging)?;
        let categories = categories
            .iter()
            .map(|category| category.parse::<LogCategory>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.reject(Operation::SetDebugLogging, err))?;
        self.context.set_debug_logging(logging_on, &categories);
        Ok(OmsiRes::OK)
    }

    fn setup_experiment(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> Result<OmsiRes, Error> {
        self.begin(Operation::SetupExperiment)?;
        self.experiment.setup(tolerance, start_time, stop_time);
        self.store.current_mut().time = start_time;
        self.context.log(
            OmsiStatus::OK,
            LogCategory::All,
            format_args!(
                "setup_experiment: tolerance = {:?}, start_time = {start_time}, stop_time = {:?}",
                tolerance, stop_time
            ),
        );
        Ok(OmsiRes::OK)
    }

    fn enter_initialization_mode(&mut self) -> Result<OmsiRes, Error> {
        self.begin(Operation::EnterInitializationMode)?;
        self.state = ModelState::InitializationMode;
        self.is_dirty_values = true;
        Ok(OmsiRes::OK)
    }

    fn exit_initialization_mode(&mut self) -> Result<OmsiRes, Error> {
        let operation = Operation::ExitInitializationMode;
        self.begin(operation)?;

        let result = self.functions.initialization.evaluate(
            self.store.current_mut(),
            &self.context,
            self.experiment.tolerance,
        );
        let res = match result {
            Ok(res) => res,
            Err(err) => return Err(self.fail(operation, err)),
        };
        let res = res.max(self.evaluate_simulation(operation)?);

        self.store.store_pre_values();
        self.state = ModelState::EventMode;
        self.context.log(
            OmsiStatus::OK,
            LogCategory::Events,
            format_args!(
                "exit_initialization_mode: entered event mode at time {}",
                self.store.current().time
            ),
        );
        Ok(res)
    }

    fn terminate(&mut self) -> Result<OmsiRes, Error> {
        self.begin(Operation::Terminate)?;
        self.state = ModelState::Terminated;
        Ok(OmsiRes::OK)
    }

    fn reset(&mut self) -> Result<OmsiRes, Error> {
        self.begin(Operation::Reset)?;
        self.experiment = Experiment::default();
        if let Err(err) = self.store.initialize(&self.model_data) {
            return Err(self.fail(Operation::Reset, err));
        }
        self.store.current_mut().time = self.experiment.start_time;
        self.store.store_pre_values();
        self.state = ModelState::Instantiated;
        self.is_dirty_values = true;
        Ok(OmsiRes::OK)
    }

    fn get_directional_derivative(
        &mut self,
        unknown_vrs: &[ValueReference],
        known_vrs: &[ValueReference],
        _dv_known_values: &[f64],
        _dv_unknown_values: &mut [f64],
    ) -> Result<OmsiRes, Error> {
        self.begin(Operation::GetDirectionalDerivative)?;
        self.context.log(
            OmsiStatus::Warning,
            LogCategory::StatusWarning,
            format_args!(
                "get_directional_derivative: not implemented ({} unknowns, {} knowns)",
                unknown_vrs.len(),
                known_vrs.len()
            ),
        );
        Err(self.reject(
            Operation::GetDirectionalDerivative,
            Error::Unsupported("get_directional_derivative"),
        ))
    }
}
