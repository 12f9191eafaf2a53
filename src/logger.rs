//! Log categories and the host log-message callback.

use std::{fmt::Display, str::FromStr};

use crate::{Error, OmsiStatus};

/// Category of a log message. Categories are enabled individually through
/// [`crate::instance::Common::set_debug_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogCategory {
    Events,
    SingularLinearSystems,
    NonlinearSystems,
    LinearSystems,
    DynamicStateSelection,
    StatusWarning,
    StatusDiscard,
    StatusError,
    StatusFatal,
    StatusPending,
    /// Enables every other category
    All,
    /// Calls of the model-exchange interface
    Fmi2Call,
}

impl LogCategory {
    pub const ALL: [LogCategory; 12] = [
        LogCategory::Events,
        LogCategory::SingularLinearSystems,
        LogCategory::NonlinearSystems,
        LogCategory::LinearSystems,
        LogCategory::DynamicStateSelection,
        LogCategory::StatusWarning,
        LogCategory::StatusDiscard,
        LogCategory::StatusError,
        LogCategory::StatusFatal,
        LogCategory::StatusPending,
        LogCategory::All,
        LogCategory::Fmi2Call,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LogCategory::Events => "logEvents",
            LogCategory::SingularLinearSystems => "logSingularLinearSystems",
            LogCategory::NonlinearSystems => "logNonlinearSystems",
            LogCategory::LinearSystems => "logLinearSystems",
            LogCategory::DynamicStateSelection => "logDynamicStateSelection",
            LogCategory::StatusWarning => "logStatusWarning",
            LogCategory::StatusDiscard => "logStatusDiscard",
            LogCategory::StatusError => "logStatusError",
            LogCategory::StatusFatal => "logStatusFatal",
            LogCategory::StatusPending => "logStatusPending",
            LogCategory::All => "logAll",
            LogCategory::Fmi2Call => "logFmi2Call",
        }
    }

    /// The category a message with `status` is reported under.
    pub fn for_status(status: OmsiStatus) -> Self {
        match status {
            OmsiStatus::OK => LogCategory::All,
            OmsiStatus::Warning => LogCategory::StatusWarning,
            OmsiStatus::Discard => LogCategory::StatusDiscard,
            OmsiStatus::Error => LogCategory::StatusError,
            OmsiStatus::Fatal => LogCategory::StatusFatal,
            OmsiStatus::Pending => LogCategory::StatusPending,
        }
    }
}

impl Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.name() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("Unknown log category '{s}'")))
    }
}

/// Host callback receiving `(instance name, status, category, message)`.
pub type LogMessageClosure =
    Box<dyn Fn(&str, OmsiStatus, LogCategory, std::fmt::Arguments<'_>) + Send + Sync>;

/// Map a status to the [`log::Level`] it is reported with.
pub fn level(status: OmsiStatus) -> log::Level {
    match status {
        OmsiStatus::OK => log::Level::Info,
        OmsiStatus::Warning | OmsiStatus::Discard => log::Level::Warn,
        OmsiStatus::Error | OmsiStatus::Fatal => log::Level::Error,
        OmsiStatus::Pending => log::Level::Debug,
    }
}

/// A [`LogMessageClosure`] forwarding to the [`log`] facade, with the category as target.
pub fn default_logger() -> LogMessageClosure {
    Box::new(|instance_name, status, category, message| {
        log::logger().log(
            &log::Record::builder()
                .args(format_args!("{instance_name}: {message}"))
                .level(level(status))
                .module_path(Some("omsu"))
                .target(category.name())
                .build(),
        );
    })
}
