//! Shared test model: the Dahlquist test equation `der(x) = -k * x` with an algebraic loop, a
//! discrete flag and aliases of every kind.
#![allow(dead_code)]

use std::{
    ptr::NonNull,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use omsi::{
    instance::{CallbackFunctions, Instance},
    logger::LogCategory,
    memory::{Allocator, HeapAllocator},
    model_data::{ModelData, ModelDataBuilder},
    solver::{AlgebraicSystem, ModelFunction, ModelFunctions},
    OmsiRes, OmsiStatus, ValueReference,
};

pub const GUID: &str = "{5b3e7f52-2f77-4d8a-9c43-0a6f3d1e8b21}";

// Real value references
pub const X: ValueReference = 0;
pub const DER_X: ValueReference = 1;
pub const Y: ValueReference = 2;
pub const Z: ValueReference = 3;
pub const K: ValueReference = 4;
pub const MINUS_X: ValueReference = 5;

// Integer value references
pub const COUNT: ValueReference = 0;
pub const N: ValueReference = 1;

// Boolean value references
pub const FLAG: ValueReference = 0;
pub const ENABLED: ValueReference = 1;
pub const NOT_FLAG: ValueReference = 2;

pub fn model_data() -> ModelData {
    ModelDataBuilder::new("Dahlquist", GUID)
        .state("x", 1.0)
        .derivative("der(x)", 0.0)
        .real("y", 0.0)
        .real("z", 0.0)
        .real_parameter("k", 1.0)
        .real_alias("minus_x", "x", true)
        .integer("count", 0)
        .integer_parameter("n", 3)
        .boolean("flag", false)
        .boolean_parameter("enabled", true)
        .boolean_alias("not_flag", "flag", true)
        .zero_crossings(1)
        .build()
        .expect("valid model")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loop {
    /// 2*y + 3*z = 8, 3*y + 0.5*z = 4 with the solution y = 1, z = 2
    Regular,
    /// y + 2*z = 1, 2*y + 4*z = 1
    Singular,
    /// y^2 = 4 flagged as linear, the linear model is wrong
    Inaccurate,
}

pub fn loop_system(id: usize, kind: Loop) -> AlgebraicSystem {
    let outputs = match kind {
        Loop::Inaccurate => vec![2],
        _ => vec![2, 3],
    };
    AlgebraicSystem::linear(id, outputs, move |x, _, res| {
        match kind {
            Loop::Regular => {
                res[0] = 2.0 * x[0] + 3.0 * x[1] - 8.0;
                res[1] = 3.0 * x[0] + 0.5 * x[1] - 4.0;
            }
            Loop::Singular => {
                res[0] = x[0] + 2.0 * x[1] - 1.0;
                res[1] = 2.0 * x[0] + 4.0 * x[1] - 1.0;
            }
            Loop::Inaccurate => res[0] = x[0] * x[0] - 4.0,
        }
        Ok(OmsiRes::OK)
    })
}

pub fn functions(init_loop: Loop) -> ModelFunctions {
    ModelFunctions {
        initialization: ModelFunction::default().with_algebraic_system(loop_system(0, init_loop)),
        simulation: ModelFunction::default()
            .with_equations(|values| {
                let (x, k) = (values.reals()[0], values.reals()[4]);
                values.reals_mut()[1] = -k * x;
                values.bools_mut()[0] = x < 0.5;
                Ok(OmsiRes::OK)
            })
            .with_algebraic_system(loop_system(1, Loop::Regular)),
        zero_crossings: None,
    }
    .with_zero_crossings(|values, indicators| {
        indicators[0] = values.reals()[0] - 0.5;
        Ok(OmsiRes::OK)
    })
}

/// Allocator tracking the number of live blocks.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocations: AtomicUsize,
    frees: AtomicUsize,
}

impl CountingAllocator {
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.allocations() - self.frees.load(Ordering::SeqCst)
    }
}

impl Allocator for CountingAllocator {
    fn allocate(&self, count: usize, size: usize) -> Option<NonNull<u8>> {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        HeapAllocator.allocate(count, size)
    }

    unsafe fn free(&self, ptr: NonNull<u8>) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        HeapAllocator.free(ptr)
    }
}

pub type Messages = Arc<Mutex<Vec<(OmsiStatus, LogCategory, String)>>>;

/// Host callbacks capturing every log message and counting allocations.
pub fn callbacks() -> (CallbackFunctions, Arc<CountingAllocator>, Messages) {
    let allocator = Arc::new(CountingAllocator::default());
    let messages: Messages = Default::default();
    let sink = messages.clone();
    let callbacks = CallbackFunctions {
        logger: Box::new(move |_name, status, category, args| {
            log::debug!(target: category.name(), "{status}: {args}");
            sink.lock()
                .unwrap()
                .push((status, category, args.to_string()));
        }),
        allocator: allocator.clone(),
    };
    (callbacks, allocator, messages)
}

pub struct Harness {
    pub instance: Instance,
    pub allocator: Arc<CountingAllocator>,
    pub messages: Messages,
}

impl Harness {
    pub fn new(init_loop: Loop) -> Self {
        let (callbacks, allocator, messages) = callbacks();
        let instance = Instance::instantiate(
            "inst1",
            GUID,
            model_data(),
            functions(init_loop),
            callbacks,
            true,
        )
        .expect("instantiate");
        Self {
            instance,
            allocator,
            messages,
        }
    }

    /// Number of messages logged under `category`.
    pub fn logged(&self, category: LogCategory) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c, _)| *c == category)
            .count()
    }
}
