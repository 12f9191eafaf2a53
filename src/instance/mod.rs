//! A model instance: the value store, the variable directory and the generated model code behind
//! the model-exchange state machine.

mod common;
mod context;
mod get_set;
mod model_exchange;
mod state;
mod traits;

pub use context::{CallbackFunctions, ModelContext};
pub use state::{ModelState, Operation, StateSet};
pub use traits::{Common, GetSet, ModelExchange};

use crate::{
    directory::VariableDirectory,
    experiment::Experiment,
    logger::LogCategory,
    model_data::ModelData,
    solver::ModelFunctions,
    values::{ScalarValue, ValueStore, Values},
    Error, OmsiRes, OmsiStatus, ValueReference,
};

pub struct Instance {
    context: ModelContext,
    model_data: ModelData,
    directory: VariableDirectory,
    store: ValueStore,
    functions: ModelFunctions,
    experiment: Experiment,
    state: ModelState,
    /// Inputs changed since the simulation equations were last evaluated
    is_dirty_values: bool,
}

impl Instance {
    /// Create a new instance of the model described by `model_data`.
    ///
    /// `guid` must match the GUID of the model. All value arrays are allocated through the
    /// allocator in `callbacks` and filled with the start values.
    pub fn instantiate(
        instance_name: &str,
        guid: &str,
        model_data: ModelData,
        functions: ModelFunctions,
        callbacks: CallbackFunctions,
        logging_on: bool,
    ) -> Result<Self, Error> {
        let context = ModelContext::new(instance_name, logging_on, callbacks);
        context.log(
            OmsiStatus::OK,
            LogCategory::Fmi2Call,
            format_args!("instantiate: instance {instance_name}, GUID {guid}"),
        );

        let reject = |err: Error| {
            context.log_status(err.status(), format_args!("instantiate: {err}"));
            err
        };

        if instance_name.is_empty() {
            return Err(reject(Error::InvalidArgument(
                "Missing instance name".to_owned(),
            )));
        }
        if guid.is_empty() {
            return Err(reject(Error::InvalidArgument("Missing GUID".to_owned())));
        }
        if guid != model_data.guid {
            return Err(reject(Error::InvalidArgument(format!(
                "Wrong GUID {guid}, expected {}",
                model_data.guid
            ))));
        }
        model_data.validate().map_err(reject)?;
        if model_data.counts.n_zerocrossings > 0 && functions.zero_crossings.is_none() {
            return Err(reject(Error::Configuration(format!(
                "{} zero crossings without a zero-crossing function",
                model_data.counts.n_zerocrossings
            ))));
        }

        let directory = VariableDirectory::new(&model_data, context.allocator()).map_err(reject)?;
        let mut store =
            ValueStore::allocate(&model_data.counts, context.allocator()).map_err(reject)?;
        store.initialize(&model_data).map_err(reject)?;
        store.store_pre_values();

        log::debug!(
            "Instantiated '{instance_name}' of model '{}': {}",
            model_data.model_name,
            model_data.counts
        );

        Ok(Self {
            context,
            model_data,
            directory,
            store,
            functions,
            experiment: Experiment::default(),
            state: ModelState::Instantiated,
            is_dirty_values: true,
        })
    }

    /// Release the instance and all memory it owns.
    pub fn free_instance(self) {
        self.context.log(
            OmsiStatus::OK,
            LogCategory::Fmi2Call,
            format_args!("{}", Operation::FreeInstance),
        );
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    pub fn model_data(&self) -> &ModelData {
        &self.model_data
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    /// The current values.
    pub fn values(&self) -> &Values {
        self.store.current()
    }

    /// The values at the previous event.
    pub fn pre_values(&self) -> &Values {
        self.store.pre()
    }

    /// Log the call and check it against the call table. Rejected calls change nothing.
    fn begin(&self, operation: Operation) -> Result<(), Error> {
        self.context.log(
            OmsiStatus::OK,
            LogCategory::Fmi2Call,
            format_args!("{operation}"),
        );
        if operation.legal_states().contains(self.state) {
            Ok(())
        } else {
            Err(self.reject(
                operation,
                Error::InvalidState {
                    function: operation.name(),
                    state: self.state,
                },
            ))
        }
    }

    /// Log a failed call under the category of its status.
    fn reject(&self, operation: Operation, err: Error) -> Error {
        self.context
            .log_status(err.status(), format_args!("{operation}: {err}"));
        err
    }

    /// Like [`Self::reject`], and move into [`ModelState::Error`] if the computation is corrupted.
    fn fail(&mut self, operation: Operation, err: Error) -> Error {
        if err.is_computational_failure() {
            self.state = ModelState::Error;
        }
        self.reject(operation, err)
    }

    fn check_length(
        &self,
        operation: Operation,
        name: &'static str,
        expected: usize,
        found: usize,
    ) -> Result<(), Error> {
        if expected == found {
            Ok(())
        } else {
            Err(self.reject(
                operation,
                Error::LengthMismatch {
                    name,
                    expected,
                    found,
                },
            ))
        }
    }

    fn evaluate_simulation(&mut self, operation: Operation) -> Result<OmsiRes, Error> {
        let result = self.functions.simulation.evaluate(
            self.store.current_mut(),
            &self.context,
            self.experiment.tolerance,
        );
        match result {
            Ok(res) => {
                self.is_dirty_values = false;
                Ok(res)
            }
            Err(err) => Err(self.fail(operation, err)),
        }
    }

    /// Re-evaluate the simulation equations if inputs changed since the last evaluation.
    fn update(&mut self, operation: Operation) -> Result<OmsiRes, Error> {
        let active = matches!(
            self.state,
            ModelState::EventMode | ModelState::ContinuousTimeMode
        );
        if self.is_dirty_values && active {
            self.evaluate_simulation(operation)
        } else {
            Ok(OmsiRes::OK)
        }
    }

    /// Read the variables `vrs` into `values`, after checking all of them.
    fn read<T: ScalarValue>(
        &self,
        operation: Operation,
        vrs: impl Iterator<Item = ValueReference> + Clone,
        values: &mut [T],
    ) -> Result<(), Error> {
        let current = self.store.current();
        for vr in vrs.clone() {
            let slot = self.directory.resolve(T::KIND, vr)?;
            current.check::<T>(slot)?;
        }
        for (vr, value) in vrs.zip(values.iter_mut()) {
            *value = current.get(self.directory.resolve(T::KIND, vr)?)?;
            self.context.log(
                OmsiStatus::OK,
                LogCategory::All,
                format_args!("{operation}: {} {vr} = {value}", T::KIND),
            );
        }
        Ok(())
    }

    /// Write `values` into the variables `vrs`, after checking all of them.
    fn write<T: ScalarValue>(
        &mut self,
        operation: Operation,
        vrs: impl Iterator<Item = ValueReference> + Clone,
        values: &[T],
    ) -> Result<(), Error> {
        for vr in vrs.clone() {
            let slot = self.directory.resolve(T::KIND, vr)?;
            self.store.current().check::<T>(slot)?;
        }
        for (vr, &value) in vrs.zip(values) {
            let slot = self.directory.resolve(T::KIND, vr)?;
            self.store.current_mut().set(slot, value)?;
            self.context.log(
                OmsiStatus::OK,
                LogCategory::All,
                format_args!("{operation}: {} {vr} = {value}", T::KIND),
            );
        }
        self.is_dirty_values = true;
        Ok(())
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.store.free();
        log::trace!("Freed instance '{}'", self.context.instance_name());
    }
}
