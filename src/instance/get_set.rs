use super::{GetSet, Instance, Operation};
use crate::{model_data::VarKind, values::ScalarValue, Error, OmsiRes, ValueReference};

impl Instance {
    fn get_values<T: ScalarValue>(
        &mut self,
        operation: Operation,
        vrs: &[ValueReference],
        values: &mut [T],
    ) -> Result<OmsiRes, Error> {
        self.begin(operation)?;
        self.check_length(operation, "values", vrs.len(), values.len())?;
        let res = self.update(operation)?;
        self.read(operation, vrs.iter().copied(), values)
            .map_err(|err| self.reject(operation, err))?;
        Ok(res)
    }

    fn set_values<T: ScalarValue>(
        &mut self,
        operation: Operation,
        vrs: &[ValueReference],
        values: &[T],
    ) -> Result<OmsiRes, Error> {
        self.begin(operation)?;
        self.check_length(operation, "values", vrs.len(), values.len())?;
        if let Err(err) = self.write(operation, vrs.iter().copied(), values) {
            return Err(self.reject(operation, err));
        }
        Ok(OmsiRes::OK)
    }

    /// String variables are rejected at instantiation, so only empty requests succeed.
    fn string_values(
        &mut self,
        operation: Operation,
        vrs: &[ValueReference],
        n_values: usize,
    ) -> Result<OmsiRes, Error> {
        self.begin(operation)?;
        self.check_length(operation, "values", vrs.len(), n_values)?;
        let resolved = vrs
            .iter()
            .try_for_each(|&vr| self.directory.resolve(VarKind::String, vr).map(|_| ()));
        match resolved {
            Ok(()) if vrs.is_empty() => Ok(OmsiRes::OK),
            Ok(()) => Err(self.reject(operation, Error::Unsupported("String variables"))),
            Err(err) => Err(self.reject(operation, err)),
        }
    }
}

/// Generates the getter and setter of a scalar type
macro_rules! instance_getter_setter {
    ($name:ident, $ty:ty) => {
        paste::paste! {
            fn [<get_ $name>](
                &mut self,
                vrs: &[ValueReference],
                values: &mut [$ty],
            ) -> Result<OmsiRes, Error> {
                self.get_values(Operation::[<Get $name:camel>], vrs, values)
            }

            fn [<set_ $name>](
                &mut self,
                vrs: &[ValueReference],
                values: &[$ty],
            ) -> Result<OmsiRes, Error> {
                self.set_values(Operation::[<Set $name:camel>], vrs, values)
            }
        }
    };
}

impl GetSet for Instance {
    instance_getter_setter!(real, f64);
    instance_getter_setter!(integer, i32);
    instance_getter_setter!(boolean, bool);

    fn get_string(
        &mut self,
        vrs: &[ValueReference],
        values: &mut [String],
    ) -> Result<OmsiRes, Error> {
        self.string_values(Operation::GetString, vrs, values.len())
    }

    fn set_string(&mut self, vrs: &[ValueReference], values: &[String]) -> Result<OmsiRes, Error> {
        self.string_values(Operation::SetString, vrs, values.len())
    }
}
