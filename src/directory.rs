//! Resolution of value references to physical storage slots.

use crate::{
    memory::{Buffer, SharedAllocator},
    model_data::{ModelData, VarKind},
    Error, ValueReference,
};

/// Physical location of a variable in the value array of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Direct(usize),
    /// Shares the slot with its target, reads yield the negated value.
    NegatedAlias(usize),
}

impl Slot {
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Slot::Direct(index) | Slot::NegatedAlias(index) => *index,
        }
    }

    #[inline]
    pub fn is_negated(&self) -> bool {
        matches!(self, Slot::NegatedAlias(_))
    }
}

/// Lookup table from `(kind, value reference)` to [`Slot`], built once at instantiation.
///
/// The value reference of a variable is an index into the records of its kind; the records of
/// each kind start at a fixed offset of the flattened record list.
#[derive(Debug)]
pub struct VariableDirectory {
    offsets: [usize; 4],
    declared: [usize; 4],
    slots: Buffer<Slot>,
    kinds: Buffer<VarKind>,
}

impl VariableDirectory {
    pub fn new(model_data: &ModelData, allocator: &SharedAllocator) -> Result<Self, Error> {
        let counts = &model_data.counts;
        let mut offsets = [0; 4];
        let mut declared = [0; 4];
        let mut offset = 0;
        for kind in VarKind::ALL {
            offsets[kind as usize] = offset;
            declared[kind as usize] = counts.declared(kind);
            offset += counts.declared(kind);
        }

        let n = model_data.variables.len();
        let mut slots = Buffer::filled(allocator, n, Slot::Direct(0))?;
        let mut kinds = Buffer::filled(allocator, n, VarKind::Real)?;

        for (pos, var) in model_data.variables.iter().enumerate() {
            slots[pos] = match var.alias {
                Some(alias) if alias.negate => Slot::NegatedAlias(var.index),
                _ => Slot::Direct(var.index),
            };
            kinds[pos] = var.kind();
        }

        log::trace!(
            "Variable directory with {n} records, offsets {:?}",
            offsets
        );

        Ok(Self {
            offsets,
            declared,
            slots,
            kinds,
        })
    }

    /// Position of the first record of `kind` in the flattened record list.
    pub fn offset(&self, kind: VarKind) -> usize {
        self.offsets[kind as usize]
    }

    /// Number of records of `kind`, aliases included.
    pub fn declared_count(&self, kind: VarKind) -> usize {
        self.declared[kind as usize]
    }

    /// Resolve a value reference of `kind` to its slot.
    ///
    /// Fails for value references outside the declared range of the kind. Bounds against the value
    /// arrays are checked by the accessors.
    pub fn resolve(&self, kind: VarKind, vr: ValueReference) -> Result<Slot, Error> {
        let index = vr as usize;
        if index >= self.declared_count(kind) {
            return Err(Error::UnknownValueReference { kind, vr });
        }

        let pos = self.offset(kind) + index;
        match (self.slots.get(pos), self.kinds.get(pos)) {
            (Some(&slot), Some(&found)) if found == kind => Ok(slot),
            (Some(_), Some(&found)) => Err(Error::KindMismatch {
                vr,
                expected: kind,
                found,
            }),
            _ => Err(Error::UnknownValueReference { kind, vr }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{memory::HeapAllocator, model_data::ModelDataBuilder};

    fn directory() -> VariableDirectory {
        let model = ModelDataBuilder::new("Directory", "{guid}")
            .state("x", 1.0)
            .derivative("der(x)", 0.0)
            .real("y", 0.0)
            .real_alias("minus_x", "x", true)
            .real_alias("y_alias", "y", false)
            .integer("i", 0)
            .boolean("b", false)
            .boolean_alias("not_b", "b", true)
            .build()
            .unwrap();
        let allocator: SharedAllocator = Arc::new(HeapAllocator);
        VariableDirectory::new(&model, &allocator).unwrap()
    }

    #[test]
    fn offsets_follow_record_order() {
        let directory = directory();
        assert_eq!(directory.offset(VarKind::Real), 0);
        assert_eq!(directory.offset(VarKind::Integer), 5);
        assert_eq!(directory.offset(VarKind::Boolean), 6);
        assert_eq!(directory.declared_count(VarKind::Boolean), 2);
        assert_eq!(directory.declared_count(VarKind::String), 0);
    }

    #[test]
    fn resolve_aliases() {
        let directory = directory();
        assert_eq!(directory.resolve(VarKind::Real, 2).unwrap(), Slot::Direct(2));
        assert_eq!(
            directory.resolve(VarKind::Real, 3).unwrap(),
            Slot::NegatedAlias(0)
        );
        assert_eq!(directory.resolve(VarKind::Real, 4).unwrap(), Slot::Direct(2));
        assert_eq!(
            directory.resolve(VarKind::Boolean, 1).unwrap(),
            Slot::NegatedAlias(0)
        );
    }

    #[test]
    fn unknown_value_references() {
        let directory = directory();
        assert!(matches!(
            directory.resolve(VarKind::Real, 5),
            Err(Error::UnknownValueReference {
                kind: VarKind::Real,
                vr: 5
            })
        ));
        assert!(matches!(
            directory.resolve(VarKind::Integer, 1),
            Err(Error::UnknownValueReference { .. })
        ));
        assert!(matches!(
            directory.resolve(VarKind::String, 0),
            Err(Error::UnknownValueReference { .. })
        ));
    }
}
