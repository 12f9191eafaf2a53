use std::fmt::Display;

/// Status returned by every externally visible operation of a simulation unit.
///
/// The discriminants match the C enumeration `omsi_status` (and `fmi2Status`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OmsiStatus {
    OK = 0,
    Warning = 1,
    Discard = 2,
    Error = 3,
    Fatal = 4,
    Pending = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OmsiRes {
    /// All well
    OK,
    /// Things are not quite right, but the computation can continue. The logger was called with a
    /// message explaining the situation.
    Warning,
    /// The computation was started but is not finished yet.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OmsiError {
    /// The computation of the last call failed, but may succeed with different inputs, for example
    /// a smaller step size because an iterative solver in the model did not converge.
    #[error("Discard")]
    Discard,
    /// The instance encountered an error. The simulation cannot be continued with this instance;
    /// it has to be reset or freed.
    #[error("Error")]
    Error,
    /// The model computations are irreparably corrupted.
    #[error("Fatal")]
    Fatal,
}

impl OmsiStatus {
    /// Convert to [`Result<OmsiRes, OmsiError>`]
    #[inline]
    pub fn ok(self) -> Result<OmsiRes, OmsiError> {
        self.into()
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, OmsiStatus::Error | OmsiStatus::Fatal)
    }
}

impl Display for OmsiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OmsiStatus::OK => "omsi_ok",
            OmsiStatus::Warning => "omsi_warning",
            OmsiStatus::Discard => "omsi_discard",
            OmsiStatus::Error => "omsi_error",
            OmsiStatus::Fatal => "omsi_fatal",
            OmsiStatus::Pending => "omsi_pending",
        };
        f.write_str(name)
    }
}

impl From<OmsiRes> for OmsiStatus {
    fn from(res: OmsiRes) -> Self {
        match res {
            OmsiRes::OK => OmsiStatus::OK,
            OmsiRes::Warning => OmsiStatus::Warning,
            OmsiRes::Pending => OmsiStatus::Pending,
        }
    }
}

impl From<OmsiError> for OmsiStatus {
    fn from(err: OmsiError) -> Self {
        match err {
            OmsiError::Discard => OmsiStatus::Discard,
            OmsiError::Error => OmsiStatus::Error,
            OmsiError::Fatal => OmsiStatus::Fatal,
        }
    }
}

impl From<OmsiStatus> for Result<OmsiRes, OmsiError> {
    fn from(status: OmsiStatus) -> Self {
        match status {
            OmsiStatus::OK => Ok(OmsiRes::OK),
            OmsiStatus::Warning => Ok(OmsiRes::Warning),
            OmsiStatus::Pending => Ok(OmsiRes::Pending),
            OmsiStatus::Discard => Err(OmsiError::Discard),
            OmsiStatus::Error => Err(OmsiError::Error),
            OmsiStatus::Fatal => Err(OmsiError::Fatal),
        }
    }
}

impl From<Result<OmsiRes, OmsiError>> for OmsiStatus {
    fn from(result: Result<OmsiRes, OmsiError>) -> Self {
        match result {
            Ok(res) => res.into(),
            Err(err) => err.into(),
        }
    }
}

impl From<Result<OmsiRes, crate::Error>> for OmsiStatus {
    fn from(result: Result<OmsiRes, crate::Error>) -> Self {
        match result {
            Ok(res) => res.into(),
            Err(err) => err.status(),
        }
    }
}
