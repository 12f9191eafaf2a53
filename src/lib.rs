//! The `omsi` crate is the runtime core of an OpenModelica Simulation Unit (OMSU): a simulation
//! unit following the model-exchange flavour of the FMI standard. See <http://www.fmi-standard.org/>
//!
//! It owns the typed value arrays of a model (states, derivatives, algebraic variables and
//! parameters), resolves value references through a [`directory::VariableDirectory`] that knows
//! about (negated) aliases, guards every call with the model-exchange state machine and solves the
//! algebraic loops of the model with a dense LU solver.
//!
//! Parsing of model descriptions and the generated model code are *not* part of this crate. The
//! loader hands over a [`model_data::ModelData`] snapshot and the generated equations as closures
//! bundled in [`solver::ModelFunctions`].
//!
//! ## Example
//!
//! ```rust
//! use omsi::{
//!     instance::{CallbackFunctions, Common, GetSet, Instance, ModelExchange},
//!     model_data::ModelDataBuilder,
//!     solver::{AlgebraicSystem, ModelFunction, ModelFunctions},
//!     EventFlags, OmsiRes,
//! };
//!
//! let model = ModelDataBuilder::new("Loop", "{8c4e810f-3df3-4a00-8276-176fa3c9f000}")
//!     .real("y", 0.0)
//!     .real("z", 0.0)
//!     .build()
//!     .unwrap();
//!
//! // 2*y + 3*z = 8, 3*y + 0.5*z = 4
//! let system = AlgebraicSystem::linear(0, vec![0, 1], |x, _values, res| {
//!     res[0] = 2.0 * x[0] + 3.0 * x[1] - 8.0;
//!     res[1] = 3.0 * x[0] + 0.5 * x[1] - 4.0;
//!     Ok(OmsiRes::OK)
//! });
//! let functions = ModelFunctions {
//!     initialization: ModelFunction::default().with_algebraic_system(system),
//!     ..Default::default()
//! };
//!
//! let mut instance = Instance::instantiate(
//!     "inst1",
//!     "{8c4e810f-3df3-4a00-8276-176fa3c9f000}",
//!     model,
//!     functions,
//!     CallbackFunctions::default(),
//!     false,
//! )
//! .unwrap();
//!
//! instance.setup_experiment(None, 0.0, None).unwrap();
//! instance.enter_initialization_mode().unwrap();
//! instance.exit_initialization_mode().unwrap();
//!
//! let mut yz = [0.0; 2];
//! instance.get_real(&[0, 1], &mut yz).unwrap();
//! assert!((yz[0] - 1.0).abs() < 1e-12 && (yz[1] - 2.0).abs() < 1e-12);
//!
//! let mut flags = EventFlags::default();
//! instance.new_discrete_states(&mut flags).unwrap();
//! instance.terminate().unwrap();
//! instance.free_instance();
//! ```
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![deny(clippy::all)]

pub mod directory;
mod event_flags;
pub mod experiment;
pub mod instance;
pub mod logger;
pub mod memory;
pub mod model_data;
pub mod solver;
mod status;
pub mod values;

pub use event_flags::EventFlags;
pub use status::{OmsiError, OmsiRes, OmsiStatus};

use instance::ModelState;
use model_data::VarKind;

/// Stable external identifier of a model variable, unique within its [`VarKind`].
pub type ValueReference = u32;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model description is malformed or uses features that are not supported.
    #[error("Unsupported model configuration: {0}")]
    Configuration(String),

    /// An operation was invoked outside of the set of states it is legal in.
    #[error("{function}: Call was not allowed in state {state}")]
    InvalidState {
        function: &'static str,
        state: ModelState,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown {kind} value reference {vr}")]
    UnknownValueReference { kind: VarKind, vr: ValueReference },

    #[error("Value reference {vr} refers to a {found} variable, expected {expected}")]
    KindMismatch {
        vr: ValueReference,
        expected: VarKind,
        found: VarKind,
    },

    #[error("{kind} slot {index} is out of bounds (length {len})")]
    SlotOutOfBounds {
        kind: VarKind,
        index: usize,
        len: usize,
    },

    #[error("Invalid length of {name}: expected {expected}, got {found}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    /// The dense solver rejected the system of an algebraic loop.
    #[error("Solving algebraic system {system} failed: {source}")]
    Numeric {
        system: usize,
        #[source]
        source: omsi_lapack::LapackError,
    },

    #[error("Algebraic system {system} did not converge after {iterations} iterations")]
    NoConvergence { system: usize, iterations: usize },

    #[error("Out of memory allocating {count} x {size} bytes")]
    OutOfMemory { count: usize, size: usize },

    /// A model callback reported a non-ok status.
    #[error("Model function returned {0}")]
    Model(#[from] OmsiError),

    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

impl Error {
    /// The externally visible status code for this error.
    pub fn status(&self) -> OmsiStatus {
        match self {
            Error::Configuration(_) => OmsiStatus::Fatal,
            Error::InvalidState { .. }
            | Error::InvalidArgument(_)
            | Error::UnknownValueReference { .. }
            | Error::KindMismatch { .. }
            | Error::SlotOutOfBounds { .. }
            | Error::LengthMismatch { .. }
            | Error::Unsupported(_) => OmsiStatus::Error,
            Error::Numeric { .. } | Error::OutOfMemory { .. } => OmsiStatus::Fatal,
            Error::NoConvergence { .. } => OmsiStatus::Discard,
            Error::Model(err) => (*err).into(),
        }
    }

    /// Whether the computation of the instance is corrupted by this error, moving it into
    /// [`ModelState::Error`].
    pub fn is_computational_failure(&self) -> bool {
        matches!(
            self,
            Error::Numeric { .. }
                | Error::OutOfMemory { .. }
                | Error::Model(OmsiError::Error | OmsiError::Fatal)
        )
    }
}
