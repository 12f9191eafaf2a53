use std::collections::BTreeMap;

use crate::{
    logger::{self, LogCategory, LogMessageClosure},
    memory::{self, SharedAllocator},
    OmsiStatus,
};

/// Functions supplied by the host at instantiation.
pub struct CallbackFunctions {
    pub logger: LogMessageClosure,
    pub allocator: SharedAllocator,
}

impl Default for CallbackFunctions {
    fn default() -> Self {
        Self {
            logger: logger::default_logger(),
            allocator: memory::default_allocator(),
        }
    }
}

impl std::fmt::Debug for CallbackFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackFunctions").finish_non_exhaustive()
    }
}

/// Per-instance environment: identity, log filter, log sink and allocator.
///
/// Passed explicitly to every part of the runtime that needs to log or allocate.
pub struct ModelContext {
    instance_name: String,
    logging_on: bool,
    categories: BTreeMap<LogCategory, bool>,
    log_message: LogMessageClosure,
    allocator: SharedAllocator,
}

impl ModelContext {
    pub fn new(instance_name: &str, logging_on: bool, callbacks: CallbackFunctions) -> Self {
        Self {
            instance_name: instance_name.to_owned(),
            logging_on,
            categories: LogCategory::ALL.into_iter().map(|c| (c, true)).collect(),
            log_message: callbacks.logger,
            allocator: callbacks.allocator,
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn allocator(&self) -> &SharedAllocator {
        &self.allocator
    }

    /// Whether messages of `category` reach the log sink.
    pub fn logging_on(&self, category: LogCategory) -> bool {
        let enabled = |c| self.categories.get(&c).copied().unwrap_or(false);
        self.logging_on && (enabled(LogCategory::All) || enabled(category))
    }

    /// Switch logging on or off, for all categories when `categories` is empty.
    pub fn set_debug_logging(&mut self, logging_on: bool, categories: &[LogCategory]) {
        self.logging_on = logging_on;
        if categories.is_empty() {
            self.categories.values_mut().for_each(|on| *on = logging_on);
        } else {
            for &category in categories {
                self.categories.insert(category, logging_on);
            }
        }
    }

    /// Forward a message to the host log sink, if its category is enabled.
    pub fn log(
        &self,
        status: impl Into<OmsiStatus>,
        category: LogCategory,
        args: std::fmt::Arguments<'_>,
    ) {
        if self.logging_on(category) {
            (self.log_message)(&self.instance_name, status.into(), category, args);
        }
    }

    /// Log under the category matching `status`.
    pub fn log_status(&self, status: impl Into<OmsiStatus>, args: std::fmt::Arguments<'_>) {
        let status = status.into();
        self.log(status, LogCategory::for_status(status), args);
    }
}
