//! Stage kinds and their strongly-typed configuration records.
//!
//! The editor hands us one untyped JSON object per node; `StageConfig` is the
//! tagged variant keyed by stage type. Unknown stage types are rejected at the
//! boundary, unknown fields inside a known type are ignored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::types::{CompareOp, DataType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Source,
    Filter,
    Join,
    Formula,
    Aggregate,
    Pivot,
    Union,
    Output,
}

/// How many incoming edges a stage kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(k) => write!(f, "exactly {k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

impl StageKind {
    pub const ALL: [StageKind; 8] = [
        StageKind::Source,
        StageKind::Filter,
        StageKind::Join,
        StageKind::Formula,
        StageKind::Aggregate,
        StageKind::Pivot,
        StageKind::Union,
        StageKind::Output,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Source => "source",
            StageKind::Filter => "filter",
            StageKind::Join => "join",
            StageKind::Formula => "formula",
            StageKind::Aggregate => "aggregate",
            StageKind::Pivot => "pivot",
            StageKind::Union => "union",
            StageKind::Output => "output",
        }
    }

    /// Number of incoming edges this stage kind requires.
    pub fn arity(self) -> Arity {
        match self {
            StageKind::Source => Arity::Exactly(0),
            StageKind::Join => Arity::Exactly(2),
            StageKind::Union => Arity::AtLeast(2),
            _ => Arity::Exactly(1),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StageKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::Definition(format!("unknown stage type '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum StageConfig {
    Source(SourceConfig),
    Filter(FilterConfig),
    Join(JoinConfig),
    Formula(FormulaConfig),
    Aggregate(AggregateConfig),
    Pivot(PivotConfig),
    Union(UnionConfig),
    Output(OutputConfig),
}

impl StageConfig {
    pub fn kind(&self) -> StageKind {
        match self {
            StageConfig::Source(_) => StageKind::Source,
            StageConfig::Filter(_) => StageKind::Filter,
            StageConfig::Join(_) => StageKind::Join,
            StageConfig::Formula(_) => StageKind::Formula,
            StageConfig::Aggregate(_) => StageKind::Aggregate,
            StageConfig::Pivot(_) => StageKind::Pivot,
            StageConfig::Union(_) => StageKind::Union,
            StageConfig::Output(_) => StageKind::Output,
        }
    }

    /// Empty configuration for `kind`, used when the editor sent none.
    pub fn default_for(kind: StageKind) -> Self {
        match kind {
            StageKind::Source => StageConfig::Source(SourceConfig::default()),
            StageKind::Filter => StageConfig::Filter(FilterConfig::default()),
            StageKind::Join => StageConfig::Join(JoinConfig::default()),
            StageKind::Formula => StageConfig::Formula(FormulaConfig::default()),
            StageKind::Aggregate => StageConfig::Aggregate(AggregateConfig::default()),
            StageKind::Pivot => StageConfig::Pivot(PivotConfig::default()),
            StageKind::Union => StageConfig::Union(UnionConfig::default()),
            StageKind::Output => StageConfig::Output(OutputConfig::default()),
        }
    }

    /// Decode the untyped editor payload for a node of `kind`.
    ///
    /// A JSON `null` or absent config decodes as the empty config.
    pub fn from_json(kind: StageKind, config: serde_json::Value) -> Result<Self> {
        if config.is_null() {
            return Ok(Self::default_for(kind));
        }
        Ok(match kind {
            StageKind::Source => StageConfig::Source(serde_json::from_value(config)?),
            StageKind::Filter => StageConfig::Filter(serde_json::from_value(config)?),
            StageKind::Join => StageConfig::Join(serde_json::from_value(config)?),
            StageKind::Formula => StageConfig::Formula(serde_json::from_value(config)?),
            StageKind::Aggregate => StageConfig::Aggregate(serde_json::from_value(config)?),
            StageKind::Pivot => StageConfig::Pivot(serde_json::from_value(config)?),
            StageKind::Union => StageConfig::Union(serde_json::from_value(config)?),
            StageKind::Output => StageConfig::Output(serde_json::from_value(config)?),
        })
    }
}

// --- source ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    Datasets,
    Views,
    Pricelists,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Datasets => "datasets",
            EntityType::Views => "views",
            EntityType::Pricelists => "pricelists",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceConfig {
    pub entity_type: EntityType,
    pub entity_name: String,
    /// Only meaningful for price lists; other entities always read latest.
    pub pin_version: bool,
    #[serde(deserialize_with = "lenient_version")]
    pub version: Option<u32>,
    pub selected_columns: Vec<String>,
}

// --- filter ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOp {
    #[default]
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does_not_contain")]
    DoesNotContain,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,
    #[serde(rename = "is_empty")]
    IsEmpty,
    #[serde(rename = "is_non_empty")]
    IsNonEmpty,
    #[serde(rename = "between")]
    Between,
}

impl ConditionOp {
    /// The plain comparison this operator maps to, if any.
    pub fn as_compare(self) -> Option<CompareOp> {
        Some(match self {
            ConditionOp::Eq => CompareOp::Eq,
            ConditionOp::Ne => CompareOp::Ne,
            ConditionOp::Gt => CompareOp::Gt,
            ConditionOp::Lt => CompareOp::Lt,
            ConditionOp::Ge => CompareOp::Ge,
            ConditionOp::Le => CompareOp::Le,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Condition {
    pub field_id: String,
    pub operator: ConditionOp,
    #[serde(deserialize_with = "lenient_text")]
    pub value: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub value_to: Option<String>,
}

/// A flat condition group: one boolean operator across every condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub operator: BoolOp,
    pub conditions: Vec<Condition>,
}

// --- join ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    #[default]
    Left,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinPredicate {
    pub left_column: String,
    /// Kept as text so an unsupported operator is a per-node config error.
    pub operator: String,
    pub right_column: String,
}

impl Default for JoinPredicate {
    fn default() -> Self {
        Self {
            left_column: String::new(),
            operator: "==".to_string(),
            right_column: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinConfig {
    pub join_type: JoinType,
    pub predicates: Vec<JoinPredicate>,
}

// --- formula ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTypeKind {
    #[default]
    Number,
    Money,
    Percentage,
    Text,
    Date,
    #[serde(alias = "bool")]
    Boolean,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTypeProperties {
    pub currency: Option<String>,
}

/// Editor shape of a declared type: `{type: "money", properties: {currency}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTypeSpec {
    #[serde(rename = "type")]
    pub kind: DataTypeKind,
    pub properties: DataTypeProperties,
}

impl DataTypeSpec {
    pub fn to_data_type(&self) -> DataType {
        match self.kind {
            DataTypeKind::Number => DataType::Number,
            DataTypeKind::Money => DataType::Money {
                currency: self
                    .properties
                    .currency
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            },
            DataTypeKind::Percentage => DataType::Percentage,
            DataTypeKind::Text => DataType::Text,
            DataTypeKind::Date => DataType::Date,
            DataTypeKind::Boolean => DataType::Boolean,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaField {
    pub name: String,
    pub label: String,
    pub formula: String,
    pub datatype: DataTypeSpec,
}

impl FormulaField {
    /// Output column: `name`, falling back to `label`.
    pub fn column_name(&self) -> Option<&str> {
        [self.name.trim(), self.label.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaConfig {
    pub fields: Vec<FormulaField>,
}

// --- aggregate / pivot ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunction {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
    Count,
    CountDistinct,
}

impl AggFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            AggFunction::Sum => "sum",
            AggFunction::Avg => "avg",
            AggFunction::Min => "min",
            AggFunction::Max => "max",
            AggFunction::Count => "count",
            AggFunction::CountDistinct => "count_distinct",
        }
    }

    /// Whether the function needs a source column.
    pub fn needs_column(self) -> bool {
        !matches!(self, AggFunction::Count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregationSpec {
    pub function: AggFunction,
    pub column_id: String,
    pub alias: String,
    pub label: String,
}

impl AggregationSpec {
    /// Output column: `alias`, else `label`, else the column id, else the function name.
    pub fn output_name(&self) -> String {
        [self.alias.trim(), self.label.trim(), self.column_id.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or(self.function.as_str())
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregateConfig {
    pub group_by: Vec<String>,
    pub aggregations: Vec<AggregationSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PivotConfig {
    pub row_group_cols: Vec<String>,
    pub pivot_col: String,
    pub value_col: String,
    pub agg_function: AggFunction,
    pub pivot_values: Vec<String>,
}

// --- union / output ---

/// Union inputs come from edges (ordered by slot); nothing to configure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnionConfig {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    pub output_label: Option<String>,
}

// --- lenient field decoders (the editor sends numbers as text and vice versa) ---

fn lenient_text<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a scalar literal, got {other}"
            )))
        }
    })
}

fn lenient_version<'de, D>(d: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    let parsed = match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_u64().and_then(|v| u32::try_from(v).ok())),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse::<u32>().ok()),
        Some(_) => Some(None),
    };
    match parsed {
        None => Ok(None),
        Some(Some(v)) => Ok(Some(v)),
        Some(None) => Err(serde::de::Error::custom(
            "version must be a non-negative integer",
        )),
    }
}
