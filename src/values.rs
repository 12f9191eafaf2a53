//! Typed storage for the values of a model instance.

use crate::{
    directory::Slot,
    memory::{Buffer, SharedAllocator},
    model_data::{Counts, ModelData, VarKind, VariableAttributes},
    Error,
};

/// One set of value arrays, split by kind, plus the simulation time.
///
/// The real array is laid out as `states, derivatives, algebraic variables, parameters`.
#[derive(Debug)]
pub struct Values {
    reals: Buffer<f64>,
    ints: Buffer<i32>,
    bools: Buffer<bool>,
    pub time: f64,
}

impl Values {
    fn allocate(counts: &Counts, allocator: &SharedAllocator) -> Result<Self, Error> {
        Ok(Self {
            reals: Buffer::filled(allocator, counts.stored(VarKind::Real), 0.0)?,
            ints: Buffer::filled(allocator, counts.stored(VarKind::Integer), 0)?,
            bools: Buffer::filled(allocator, counts.stored(VarKind::Boolean), false)?,
            time: 0.0,
        })
    }

    fn empty(allocator: &SharedAllocator) -> Self {
        Self {
            reals: Buffer::empty(allocator),
            ints: Buffer::empty(allocator),
            bools: Buffer::empty(allocator),
            time: 0.0,
        }
    }

    pub fn reals(&self) -> &[f64] {
        &self.reals
    }

    pub fn reals_mut(&mut self) -> &mut [f64] {
        &mut self.reals
    }

    pub fn ints(&self) -> &[i32] {
        &self.ints
    }

    pub fn ints_mut(&mut self) -> &mut [i32] {
        &mut self.ints
    }

    pub fn bools(&self) -> &[bool] {
        &self.bools
    }

    pub fn bools_mut(&mut self) -> &mut [bool] {
        &mut self.bools
    }

    /// Check that `slot` lies within the array of `T`.
    pub fn check<T: ScalarValue>(&self, slot: Slot) -> Result<(), Error> {
        let len = T::slice(self).len();
        if slot.index() < len {
            Ok(())
        } else {
            Err(Error::SlotOutOfBounds {
                kind: T::KIND,
                index: slot.index(),
                len,
            })
        }
    }

    /// Read the value in `slot`, negated for [`Slot::NegatedAlias`].
    pub fn get<T: ScalarValue>(&self, slot: Slot) -> Result<T, Error> {
        self.check::<T>(slot)?;
        let value = T::slice(self)[slot.index()];
        Ok(if slot.is_negated() {
            value.negate()
        } else {
            value
        })
    }

    /// Write `value` into `slot`.
    ///
    /// The value is stored as given, also for [`Slot::NegatedAlias`]: only reads negate.
    pub fn set<T: ScalarValue>(&mut self, slot: Slot, value: T) -> Result<(), Error> {
        self.check::<T>(slot)?;
        T::slice_mut(self)[slot.index()] = value;
        Ok(())
    }

    fn copy_from(&mut self, other: &Values) {
        self.reals.copy_from_slice(&other.reals);
        self.ints.copy_from_slice(&other.ints);
        self.bools.copy_from_slice(&other.bools);
        self.time = other.time;
    }
}

/// A scalar type with a value array in [`Values`].
pub trait ScalarValue: Copy + PartialEq + std::fmt::Display {
    const KIND: VarKind;
    fn slice(values: &Values) -> &[Self];
    fn slice_mut(values: &mut Values) -> &mut [Self];
    fn negate(self) -> Self;
}

impl ScalarValue for f64 {
    const KIND: VarKind = VarKind::Real;

    fn slice(values: &Values) -> &[Self] {
        values.reals()
    }

    fn slice_mut(values: &mut Values) -> &mut [Self] {
        values.reals_mut()
    }

    fn negate(self) -> Self {
        -self
    }
}

impl ScalarValue for i32 {
    const KIND: VarKind = VarKind::Integer;

    fn slice(values: &Values) -> &[Self] {
        values.ints()
    }

    fn slice_mut(values: &mut Values) -> &mut [Self] {
        values.ints_mut()
    }

    fn negate(self) -> Self {
        self.wrapping_neg()
    }
}

impl ScalarValue for bool {
    const KIND: VarKind = VarKind::Boolean;

    fn slice(values: &Values) -> &[Self] {
        values.bools()
    }

    fn slice_mut(values: &mut Values) -> &mut [Self] {
        values.bools_mut()
    }

    fn negate(self) -> Self {
        !self
    }
}

/// Current values and the values at the previous event (`pre`) of a model instance.
pub struct ValueStore {
    current: Values,
    pre: Values,
    allocator: SharedAllocator,
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("current", &self.current)
            .field("pre", &self.pre)
            .finish_non_exhaustive()
    }
}

impl ValueStore {
    /// Allocate zeroed value arrays sized by `counts`.
    pub fn allocate(counts: &Counts, allocator: &SharedAllocator) -> Result<Self, Error> {
        if counts.n_strings() > 0 {
            return Err(Error::Configuration(
                "String variables and parameters are not supported".to_owned(),
            ));
        }

        let current = Values::allocate(counts, allocator)?;
        let pre = Values::allocate(counts, allocator)?;

        log::trace!(
            "Allocated value store: {} reals, {} integers, {} booleans",
            current.reals.len(),
            current.ints.len(),
            current.bools.len()
        );

        Ok(Self {
            current,
            pre,
            allocator: allocator.clone(),
        })
    }

    /// Release all value arrays. Safe to call more than once.
    pub fn free(&mut self) {
        self.current = Values::empty(&self.allocator);
        self.pre = Values::empty(&self.allocator);
    }

    /// Fill every stored slot with the start value of its variable. Aliases are skipped, they share
    /// the slot of their target.
    pub fn initialize(&mut self, model_data: &ModelData) -> Result<(), Error> {
        for var in model_data.variables.iter().filter(|var| !var.is_alias()) {
            let slot = Slot::Direct(var.index);
            match &var.attributes {
                VariableAttributes::Real(attributes) => self.current.set(slot, attributes.start)?,
                VariableAttributes::Integer(attributes) => {
                    self.current.set(slot, attributes.start)?
                }
                VariableAttributes::Boolean(attributes) => {
                    self.current.set(slot, attributes.start)?
                }
                VariableAttributes::String(_) => {
                    return Err(Error::Configuration(format!(
                        "String variable '{}' is not supported",
                        var.name
                    )))
                }
            }
        }
        Ok(())
    }

    /// Copy the current values into the `pre` values.
    pub fn store_pre_values(&mut self) {
        self.pre.copy_from(&self.current);
    }

    /// Whether a discrete (integer or boolean) value differs from its `pre` value.
    pub fn discrete_changed(&self) -> bool {
        self.current.ints() != self.pre.ints() || self.current.bools() != self.pre.bools()
    }

    pub fn current(&self) -> &Values {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Values {
        &mut self.current
    }

    pub fn pre(&self) -> &Values {
        &self.pre
    }
}
