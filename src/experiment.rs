/// Default relative tolerance when the importer does not define one.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Number of output intervals the default step size divides the experiment into.
pub const DEFAULT_INTERVALS: f64 = 500.0;

/// Simulation settings of an instance, see [`crate::instance::Common::setup_experiment`].
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub start_time: f64,
    pub stop_time: f64,
    pub step_size: f64,
    pub num_outputs: usize,
    pub tolerance: f64,
    pub solver_name: String,
}

impl Default for Experiment {
    fn default() -> Self {
        let mut experiment = Self {
            start_time: 0.0,
            stop_time: 0.0,
            step_size: 0.0,
            num_outputs: 0,
            tolerance: DEFAULT_TOLERANCE,
            solver_name: "dassl".to_owned(),
        };
        experiment.setup(None, 0.0, None);
        experiment
    }
}

impl Experiment {
    /// Apply the settings of a `setup_experiment` call.
    ///
    /// Without a stop time the experiment runs for one time unit, the step size always divides it
    /// into [`DEFAULT_INTERVALS`].
    pub fn setup(&mut self, tolerance: Option<f64>, start_time: f64, stop_time: Option<f64>) {
        self.start_time = start_time;
        self.stop_time = stop_time.unwrap_or(start_time + 1.0);
        self.step_size = (self.stop_time - self.start_time) / DEFAULT_INTERVALS;
        self.num_outputs = DEFAULT_INTERVALS as usize;
        self.tolerance = tolerance.unwrap_or(DEFAULT_TOLERANCE);
    }
}
