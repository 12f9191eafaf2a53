//! Static description of a model: variable records, their attributes and the aggregate counts.
//!
//! The records are stored in one flattened list, ordered
//! `states, derivatives, real vars, real params, real aliases, int vars, int params, int aliases,
//! bool vars, bool params, bool aliases`. The value reference of a variable is its position within
//! the records of its [`VarKind`].

use std::{collections::HashMap, fmt::Display};

use itertools::Itertools;

use crate::{Error, ValueReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKind {
    Real,
    Integer,
    Boolean,
    String,
}

impl VarKind {
    pub const ALL: [VarKind; 4] = [
        VarKind::Real,
        VarKind::Integer,
        VarKind::Boolean,
        VarKind::String,
    ];
}

impl Display for VarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VarKind::Real => "Real",
            VarKind::Integer => "Integer",
            VarKind::Boolean => "Boolean",
            VarKind::String => "String",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealAttributes {
    pub unit: String,
    pub display_unit: String,
    pub min: f64,
    pub max: f64,
    pub fixed: bool,
    pub nominal: f64,
    pub start: f64,
}

impl Default for RealAttributes {
    fn default() -> Self {
        Self {
            unit: String::new(),
            display_unit: String::new(),
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            fixed: false,
            nominal: 1.0,
            start: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntAttributes {
    pub min: i32,
    pub max: i32,
    pub fixed: bool,
    pub start: i32,
}

impl Default for IntAttributes {
    fn default() -> Self {
        Self {
            min: i32::MIN,
            max: i32::MAX,
            fixed: false,
            start: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoolAttributes {
    pub fixed: bool,
    pub start: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringAttributes {
    pub start: String,
}

/// Kind-specific attributes of a variable record
#[derive(Debug, Clone, PartialEq)]
pub enum VariableAttributes {
    Real(RealAttributes),
    Integer(IntAttributes),
    Boolean(BoolAttributes),
    String(StringAttributes),
}

impl VariableAttributes {
    pub fn kind(&self) -> VarKind {
        match self {
            VariableAttributes::Real(_) => VarKind::Real,
            VariableAttributes::Integer(_) => VarKind::Integer,
            VariableAttributes::Boolean(_) => VarKind::Boolean,
            VariableAttributes::String(_) => VarKind::String,
        }
    }
}

/// Alias information of a variable record. The record shares the storage slot of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    /// Value reference of the aliased variable
    pub target: ValueReference,
    /// Reading the alias yields the negated value of the target
    pub negate: bool,
}

/// Location of the defining equation in the Modelica sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub filename: String,
    pub line_start: u32,
    pub column_start: u32,
    pub line_end: u32,
    pub column_end: u32,
    pub file_writable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelVariableInfo {
    pub id: ValueReference,
    pub name: String,
    pub comment: String,
    /// Physical slot in the value array of the variable kind. For aliases, the slot of the target.
    pub index: usize,
    pub attributes: VariableAttributes,
    pub alias: Option<Alias>,
    pub info: FileInfo,
}

impl ModelVariableInfo {
    pub fn kind(&self) -> VarKind {
        self.attributes.kind()
    }

    pub fn is_alias(&self) -> bool {
        self.alias.is_some()
    }
}

/// Aggregate variable counts of a model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub n_states: usize,
    pub n_derivatives: usize,
    pub n_real_vars: usize,
    pub n_real_parameters: usize,
    pub n_real_aliases: usize,
    pub n_int_vars: usize,
    pub n_int_parameters: usize,
    pub n_int_aliases: usize,
    pub n_bool_vars: usize,
    pub n_bool_parameters: usize,
    pub n_bool_aliases: usize,
    pub n_string_vars: usize,
    pub n_string_parameters: usize,
    pub n_string_aliases: usize,
    pub n_zerocrossings: usize,
}

impl Counts {
    /// Number of physically stored values of `kind`. Aliases are not stored.
    pub fn stored(&self, kind: VarKind) -> usize {
        match kind {
            VarKind::Real => {
                self.n_states + self.n_derivatives + self.n_real_vars + self.n_real_parameters
            }
            VarKind::Integer => self.n_int_vars + self.n_int_parameters,
            VarKind::Boolean => self.n_bool_vars + self.n_bool_parameters,
            VarKind::String => self.n_string_vars + self.n_string_parameters,
        }
    }

    /// Number of variable records of `kind`, including aliases.
    pub fn declared(&self, kind: VarKind) -> usize {
        self.stored(kind)
            + match kind {
                VarKind::Real => self.n_real_aliases,
                VarKind::Integer => self.n_int_aliases,
                VarKind::Boolean => self.n_bool_aliases,
                VarKind::String => self.n_string_aliases,
            }
    }

    pub fn n_strings(&self) -> usize {
        self.declared(VarKind::String)
    }

    /// Total number of variable records.
    pub fn n_variables(&self) -> usize {
        VarKind::ALL.iter().map(|&kind| self.declared(kind)).sum()
    }

    /// The segments of the flattened record list, in storage order.
    fn segments(&self) -> [(Segment, usize); 11] {
        [
            (Segment::State, self.n_states),
            (Segment::Derivative, self.n_derivatives),
            (Segment::RealVar, self.n_real_vars),
            (Segment::RealParameter, self.n_real_parameters),
            (Segment::RealAlias, self.n_real_aliases),
            (Segment::IntVar, self.n_int_vars),
            (Segment::IntParameter, self.n_int_parameters),
            (Segment::IntAlias, self.n_int_aliases),
            (Segment::BoolVar, self.n_bool_vars),
            (Segment::BoolParameter, self.n_bool_parameters),
            (Segment::BoolAlias, self.n_bool_aliases),
        ]
    }
}

impl Display for Counts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variable Counts")
            .field("States", &self.n_states)
            .field("Derivatives", &self.n_derivatives)
            .field("Real vars", &self.n_real_vars)
            .field("Real parameters", &self.n_real_parameters)
            .field("Real aliases", &self.n_real_aliases)
            .field("Integer vars", &self.n_int_vars)
            .field("Integer parameters", &self.n_int_parameters)
            .field("Integer aliases", &self.n_int_aliases)
            .field("Boolean vars", &self.n_bool_vars)
            .field("Boolean parameters", &self.n_bool_parameters)
            .field("Boolean aliases", &self.n_bool_aliases)
            .field("String vars", &self.n_string_vars)
            .field("String parameters", &self.n_string_parameters)
            .field("String aliases", &self.n_string_aliases)
            .field("Zero crossings", &self.n_zerocrossings)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    State,
    Derivative,
    RealVar,
    RealParameter,
    RealAlias,
    IntVar,
    IntParameter,
    IntAlias,
    BoolVar,
    BoolParameter,
    BoolAlias,
}

impl Segment {
    fn kind(self) -> VarKind {
        match self {
            Segment::State
            | Segment::Derivative
            | Segment::RealVar
            | Segment::RealParameter
            | Segment::RealAlias => VarKind::Real,
            Segment::IntVar | Segment::IntParameter | Segment::IntAlias => VarKind::Integer,
            Segment::BoolVar | Segment::BoolParameter | Segment::BoolAlias => VarKind::Boolean,
        }
    }

    fn is_alias(self) -> bool {
        matches!(
            self,
            Segment::RealAlias | Segment::IntAlias | Segment::BoolAlias
        )
    }
}

/// Snapshot of the static model information handed over by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub model_name: String,
    pub guid: String,
    pub counts: Counts,
    pub variables: Vec<ModelVariableInfo>,
}

impl ModelData {
    /// Check that the record list is consistent with the counts and the storage layout.
    pub fn validate(&self) -> Result<(), Error> {
        if self.counts.n_strings() > 0 {
            return Err(Error::Configuration(
                "String variables and parameters are not supported".to_owned(),
            ));
        }
        if self.counts.n_states != self.counts.n_derivatives {
            return Err(Error::Configuration(format!(
                "{} states but {} derivatives",
                self.counts.n_states, self.counts.n_derivatives
            )));
        }
        if self.variables.len() != self.counts.n_variables() {
            return Err(Error::Configuration(format!(
                "Expected {} variable records, got {}",
                self.counts.n_variables(),
                self.variables.len()
            )));
        }

        let segments = self
            .counts
            .segments()
            .into_iter()
            .flat_map(|(segment, count)| std::iter::repeat(segment).take(count));

        for (var, segment) in self.variables.iter().zip(segments) {
            let kind = segment.kind();
            if var.kind() != kind || var.is_alias() != segment.is_alias() {
                return Err(Error::Configuration(format!(
                    "Variable '{}' is out of order, expected a {kind}{}",
                    var.name,
                    if segment.is_alias() { " alias" } else { "" }
                )));
            }
            if var.index >= self.counts.stored(kind) {
                return Err(Error::Configuration(format!(
                    "Variable '{}' refers to {kind} slot {} of {}",
                    var.name,
                    var.index,
                    self.counts.stored(kind)
                )));
            }
        }

        Ok(())
    }
}

enum Definition {
    Attributes(VariableAttributes),
    Alias { target: String, negate: bool },
}

struct PendingVariable {
    segment: Segment,
    name: String,
    definition: Definition,
}

/// Assembles a [`ModelData`] from variables declared in any order.
///
/// ```rust
/// # use omsi::model_data::{ModelDataBuilder, VarKind};
/// let model = ModelDataBuilder::new("Dahlquist", "{guid}")
///     .state("x", 1.0)
///     .derivative("der(x)", -1.0)
///     .real_parameter("k", 1.0)
///     .real_alias("minus_x", "x", true)
///     .build()
///     .unwrap();
/// assert_eq!(model.counts.stored(VarKind::Real), 3);
/// assert_eq!(model.counts.declared(VarKind::Real), 4);
/// ```
pub struct ModelDataBuilder {
    model_name: String,
    guid: String,
    n_zerocrossings: usize,
    variables: Vec<PendingVariable>,
}

impl ModelDataBuilder {
    pub fn new(model_name: impl Into<String>, guid: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            guid: guid.into(),
            n_zerocrossings: 0,
            variables: Vec::new(),
        }
    }

    fn push(mut self, segment: Segment, name: &str, attributes: VariableAttributes) -> Self {
        self.variables.push(PendingVariable {
            segment,
            name: name.to_owned(),
            definition: Definition::Attributes(attributes),
        });
        self
    }

    fn push_alias(mut self, segment: Segment, name: &str, target: &str, negate: bool) -> Self {
        self.variables.push(PendingVariable {
            segment,
            name: name.to_owned(),
            definition: Definition::Alias {
                target: target.to_owned(),
                negate,
            },
        });
        self
    }

    fn real_attributes(start: f64) -> VariableAttributes {
        VariableAttributes::Real(RealAttributes {
            start,
            ..Default::default()
        })
    }

    pub fn state(self, name: &str, start: f64) -> Self {
        self.push(Segment::State, name, Self::real_attributes(start))
    }

    pub fn derivative(self, name: &str, start: f64) -> Self {
        self.push(Segment::Derivative, name, Self::real_attributes(start))
    }

    pub fn real(self, name: &str, start: f64) -> Self {
        self.push(Segment::RealVar, name, Self::real_attributes(start))
    }

    pub fn real_parameter(self, name: &str, start: f64) -> Self {
        self.push(Segment::RealParameter, name, Self::real_attributes(start))
    }

    /// Declare a real parameter with full attributes.
    pub fn real_parameter_with(self, name: &str, attributes: RealAttributes) -> Self {
        self.push(
            Segment::RealParameter,
            name,
            VariableAttributes::Real(attributes),
        )
    }

    pub fn real_alias(self, name: &str, target: &str, negate: bool) -> Self {
        self.push_alias(Segment::RealAlias, name, target, negate)
    }

    pub fn integer(self, name: &str, start: i32) -> Self {
        let attributes = IntAttributes {
            start,
            ..Default::default()
        };
        self.push(Segment::IntVar, name, VariableAttributes::Integer(attributes))
    }

    pub fn integer_parameter(self, name: &str, start: i32) -> Self {
        let attributes = IntAttributes {
            start,
            fixed: true,
            ..Default::default()
        };
        self.push(
            Segment::IntParameter,
            name,
            VariableAttributes::Integer(attributes),
        )
    }

    pub fn integer_alias(self, name: &str, target: &str, negate: bool) -> Self {
        self.push_alias(Segment::IntAlias, name, target, negate)
    }

    pub fn boolean(self, name: &str, start: bool) -> Self {
        let attributes = BoolAttributes {
            start,
            fixed: false,
        };
        self.push(Segment::BoolVar, name, VariableAttributes::Boolean(attributes))
    }

    pub fn boolean_parameter(self, name: &str, start: bool) -> Self {
        let attributes = BoolAttributes { start, fixed: true };
        self.push(
            Segment::BoolParameter,
            name,
            VariableAttributes::Boolean(attributes),
        )
    }

    pub fn boolean_alias(self, name: &str, target: &str, negate: bool) -> Self {
        self.push_alias(Segment::BoolAlias, name, target, negate)
    }

    pub fn zero_crossings(mut self, n: usize) -> Self {
        self.n_zerocrossings = n;
        self
    }

    pub fn build(self) -> Result<ModelData, Error> {
        let mut counts = Counts {
            n_zerocrossings: self.n_zerocrossings,
            ..Default::default()
        };
        let mut next_id: HashMap<VarKind, ValueReference> = HashMap::new();
        let mut next_index: HashMap<VarKind, usize> = HashMap::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut variables: Vec<ModelVariableInfo> = Vec::with_capacity(self.variables.len());

        // stable, so the declaration order is kept within a segment
        for pending in self
            .variables
            .into_iter()
            .sorted_by_key(|pending| pending.segment)
        {
            let kind = pending.segment.kind();
            *match pending.segment {
                Segment::State => &mut counts.n_states,
                Segment::Derivative => &mut counts.n_derivatives,
                Segment::RealVar => &mut counts.n_real_vars,
                Segment::RealParameter => &mut counts.n_real_parameters,
                Segment::RealAlias => &mut counts.n_real_aliases,
                Segment::IntVar => &mut counts.n_int_vars,
                Segment::IntParameter => &mut counts.n_int_parameters,
                Segment::IntAlias => &mut counts.n_int_aliases,
                Segment::BoolVar => &mut counts.n_bool_vars,
                Segment::BoolParameter => &mut counts.n_bool_parameters,
                Segment::BoolAlias => &mut counts.n_bool_aliases,
            } += 1;

            let id = next_id.entry(kind).or_insert(0);
            let vr = *id;
            *id += 1;

            let var = match pending.definition {
                Definition::Alias {
                    target: target_name,
                    negate,
                } => {
                    let target = by_name
                        .get(&target_name)
                        .map(|&pos| &variables[pos])
                        .filter(|target| target.kind() == kind && !target.is_alias())
                        .ok_or_else(|| {
                            Error::Configuration(format!(
                                "Alias '{}' refers to unknown {kind} variable '{target_name}'",
                                pending.name
                            ))
                        })?;
                    ModelVariableInfo {
                        id: vr,
                        name: pending.name,
                        comment: String::new(),
                        index: target.index,
                        attributes: target.attributes.clone(),
                        alias: Some(Alias {
                            target: target.id,
                            negate,
                        }),
                        info: FileInfo::default(),
                    }
                }
                Definition::Attributes(attributes) => {
                    let index = next_index.entry(kind).or_insert(0);
                    let var = ModelVariableInfo {
                        id: vr,
                        name: pending.name,
                        comment: String::new(),
                        index: *index,
                        attributes,
                        alias: None,
                        info: FileInfo::default(),
                    };
                    *index += 1;
                    var
                }
            };

            if by_name.insert(var.name.clone(), variables.len()).is_some() {
                return Err(Error::Configuration(format!(
                    "Variable '{}' declared twice",
                    var.name
                )));
            }
            variables.push(var);
        }

        let model_data = ModelData {
            model_name: self.model_name,
            guid: self.guid,
            counts,
            variables,
        };
        model_data.validate()?;
        Ok(model_data)
    }
}
