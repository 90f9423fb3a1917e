//! Condition tree: the declarative input of the query compiler
//!
//! A [`Condition`] is either a group of child conditions or a leaf holding
//! per-field values. Leaf values are typed per node type and validated when
//! the node is built, so compilation never has to guess at shapes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Bucket a compiled clause is placed into
///
/// Deserializes from its name (`MUST_NOT`, `must_not`, `MUSTNOT`) or from
/// the legacy numeric code: 1 SHOULD, 2 MUST, 3 MUST_NOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "Coded")]
pub enum Logic {
    Should,
    Must,
    MustNot,
}

impl TryFrom<Coded> for Logic {
    type Error = String;

    fn try_from(coded: Coded) -> std::result::Result<Self, String> {
        match coded.normalized().as_str() {
            "1" | "SHOULD" => Ok(Logic::Should),
            "2" | "MUST" => Ok(Logic::Must),
            "3" | "MUSTNOT" => Ok(Logic::MustNot),
            other => Err(format!("unknown query logic {other}")),
        }
    }
}

/// Kind of leaf clause
///
/// Deserializes from its name or from the legacy numeric code, 1 TERMS
/// through 6 EXISTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "Coded")]
pub enum NodeType {
    Terms,
    MatchPhrase,
    Range,
    Prefix,
    Wildcard,
    Exists,
}

impl TryFrom<Coded> for NodeType {
    type Error = String;

    fn try_from(coded: Coded) -> std::result::Result<Self, String> {
        match coded.normalized().as_str() {
            "1" | "TERMS" => Ok(NodeType::Terms),
            "2" | "MATCHPHRASE" => Ok(NodeType::MatchPhrase),
            "3" | "RANGE" => Ok(NodeType::Range),
            "4" | "PREFIX" => Ok(NodeType::Prefix),
            "5" | "WILDCARD" => Ok(NodeType::Wildcard),
            "6" | "EXISTS" => Ok(NodeType::Exists),
            other => Err(format!("unknown query type {other}")),
        }
    }
}

/// Enum wire value: a name in any case, or a numeric code
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coded {
    Code(u64),
    Name(String),
}

impl Coded {
    /// Upper-case name without underscores, or the code as text
    fn normalized(&self) -> String {
        match self {
            Coded::Code(code) => code.to_string(),
            Coded::Name(name) => name.replace('_', "").to_ascii_uppercase(),
        }
    }
}

/// Bounds of a RANGE leaf
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBounds {
    pub from: Option<Value>,
    pub to: Option<Value>,
    pub include_lower: bool,
    pub include_upper: bool,
}

impl RangeBounds {
    /// True when neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Value held by a RANGE field
#[derive(Debug, Clone, PartialEq)]
pub enum RangeValue {
    Bounds(RangeBounds),
    /// First value was not an object; compiles to nothing
    Ignored,
}

/// Typed per-field values of a leaf node
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Terms(BTreeMap<String, Vec<Value>>),
    MatchPhrase(BTreeMap<String, Vec<String>>),
    /// `None` when the field was given no values
    Range(BTreeMap<String, Option<RangeValue>>),
    Prefix(BTreeMap<String, String>),
    Wildcard(BTreeMap<String, String>),
    Exists(Vec<String>),
}

impl Leaf {
    /// Empty leaf of the given type
    pub fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Terms => Leaf::Terms(BTreeMap::new()),
            NodeType::MatchPhrase => Leaf::MatchPhrase(BTreeMap::new()),
            NodeType::Range => Leaf::Range(BTreeMap::new()),
            NodeType::Prefix => Leaf::Prefix(BTreeMap::new()),
            NodeType::Wildcard => Leaf::Wildcard(BTreeMap::new()),
            NodeType::Exists => Leaf::Exists(Vec::new()),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Leaf::Terms(_) => NodeType::Terms,
            Leaf::MatchPhrase(_) => NodeType::MatchPhrase,
            Leaf::Range(_) => NodeType::Range,
            Leaf::Prefix(_) => NodeType::Prefix,
            Leaf::Wildcard(_) => NodeType::Wildcard,
            Leaf::Exists(_) => NodeType::Exists,
        }
    }

    /// Validate `values` for this node type and store them under `field`
    pub fn insert(&mut self, field: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let field = field.into();
        match self {
            Leaf::Terms(map) => {
                if let Some(bad) = values.iter().find(|v| !is_scalar(v)) {
                    return Err(Error::condition(format!(
                        "TERMS value for `{field}` must be a string, number or bool, got {bad}"
                    )));
                }
                map.insert(field, values);
            }
            Leaf::MatchPhrase(map) => {
                let phrases = values
                    .into_iter()
                    .map(|v| match v {
                        Value::String(s) => Ok(s),
                        other => Err(Error::condition(format!(
                            "MATCH_PHRASE value for `{field}` must be a string, got {other}"
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                map.insert(field, phrases);
            }
            Leaf::Range(map) => {
                let value = match values.into_iter().next() {
                    None => None,
                    Some(Value::Object(params)) => {
                        Some(RangeValue::Bounds(parse_bounds(&field, &params)?))
                    }
                    Some(_) => Some(RangeValue::Ignored),
                };
                map.insert(field, value);
            }
            Leaf::Prefix(map) | Leaf::Wildcard(map) => {
                let text = first_as_text(&field, values)?;
                map.insert(field, text);
            }
            Leaf::Exists(fields) => fields.push(field),
        }
        Ok(())
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn first_as_text(field: &str, values: Vec<Value>) -> Result<String> {
    match values.into_iter().next() {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(Error::condition(format!(
            "value for `{field}` must be text, got {other}"
        ))),
    }
}

fn parse_bounds(field: &str, params: &serde_json::Map<String, Value>) -> Result<RangeBounds> {
    let flag = |key: &str, default: bool| match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(Error::condition(format!(
            "RANGE `{key}` for `{field}` must be a bool, got {other}"
        ))),
    };
    let bound = |key: &str| params.get(key).filter(|v| !v.is_null()).cloned();

    Ok(RangeBounds {
        from: bound("from"),
        to: bound("to"),
        include_lower: flag("include_lower", true)?,
        include_upper: flag("include_upper", false)?,
    })
}

/// Leaf or group payload of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    Leaf(Leaf),
    Group(Vec<Condition>),
}

/// One node of the condition tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCondition")]
pub struct Condition {
    pub logic: Logic,
    pub kind: ConditionKind,
}

impl Condition {
    /// Leaf of the given type with no fields yet
    pub fn leaf(node_type: NodeType, logic: Logic) -> Self {
        Self {
            logic,
            kind: ConditionKind::Leaf(Leaf::empty(node_type)),
        }
    }

    /// Group wrapping `children` in a nested bool query
    pub fn group(logic: Logic, children: Vec<Condition>) -> Self {
        Self {
            logic,
            kind: ConditionKind::Group(children),
        }
    }

    pub fn terms(logic: Logic) -> Self {
        Self::leaf(NodeType::Terms, logic)
    }

    pub fn match_phrase(logic: Logic) -> Self {
        Self::leaf(NodeType::MatchPhrase, logic)
    }

    pub fn range(logic: Logic) -> Self {
        Self::leaf(NodeType::Range, logic)
    }

    pub fn prefix(logic: Logic) -> Self {
        Self::leaf(NodeType::Prefix, logic)
    }

    pub fn wildcard(logic: Logic) -> Self {
        Self::leaf(NodeType::Wildcard, logic)
    }

    pub fn exists(logic: Logic) -> Self {
        Self::leaf(NodeType::Exists, logic)
    }

    /// Add values for `field`, validated against the node type
    pub fn field<I, V>(mut self, name: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        match self.kind {
            ConditionKind::Leaf(ref mut leaf) => {
                leaf.insert(name, values.into_iter().map(Into::into).collect())?;
            }
            ConditionKind::Group(_) => {
                return Err(Error::condition("group conditions carry no field values"));
            }
        }
        Ok(self)
    }

    /// Build a leaf from loosely typed values, the shape of decoded JSON input
    pub fn from_values(
        node_type: NodeType,
        logic: Logic,
        field_values: BTreeMap<String, Vec<Value>>,
    ) -> Result<Self> {
        let mut leaf = Leaf::empty(node_type);
        for (field, values) in field_values {
            leaf.insert(field, values)?;
        }
        Ok(Self {
            logic,
            kind: ConditionKind::Leaf(leaf),
        })
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ConditionKind::Group(_))
    }

    pub fn node_type(&self) -> Option<NodeType> {
        match self.kind {
            ConditionKind::Leaf(ref leaf) => Some(leaf.node_type()),
            ConditionKind::Group(_) => None,
        }
    }
}

/// Wire form of a condition before validation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCondition {
    #[serde(default, alias = "pair")]
    field_values: BTreeMap<String, Vec<Value>>,
    #[serde(alias = "queryLogic")]
    logic: Logic,
    #[serde(default, alias = "queryType")]
    node_type: Option<NodeType>,
    #[serde(default)]
    children: Vec<Condition>,
}

impl TryFrom<RawCondition> for Condition {
    type Error = Error;

    fn try_from(raw: RawCondition) -> Result<Self> {
        if !raw.children.is_empty() {
            return Ok(Condition::group(raw.logic, raw.children));
        }
        let node_type = raw
            .node_type
            .ok_or_else(|| Error::condition("leaf condition is missing its node type"))?;
        Condition::from_values(node_type, raw.logic, raw.field_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terms_rejects_objects() {
        let err = Condition::terms(Logic::Must)
            .field("status", [json!({ "a": 1 })])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCondition(_)));
    }

    #[test]
    fn test_prefix_coerces_numbers_to_text() {
        let cond = Condition::prefix(Logic::Must).field("code", [42]).unwrap();
        match cond.kind {
            ConditionKind::Leaf(Leaf::Prefix(map)) => assert_eq!(map["code"], "42"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_range_non_object_is_ignored() {
        let cond = Condition::range(Logic::Must).field("score", [0.5]).unwrap();
        match cond.kind {
            ConditionKind::Leaf(Leaf::Range(map)) => {
                assert_eq!(map["score"], Some(RangeValue::Ignored))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_range_defaults() {
        let cond = Condition::range(Logic::Should)
            .field("score", [json!({ "from": 0.6 })])
            .unwrap();
        match cond.kind {
            ConditionKind::Leaf(Leaf::Range(map)) => assert_eq!(
                map["score"],
                Some(RangeValue::Bounds(RangeBounds {
                    from: Some(json!(0.6)),
                    to: None,
                    include_lower: true,
                    include_upper: false,
                }))
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_range_rejects_non_bool_flags() {
        let err = Condition::range(Logic::Must)
            .field("score", [json!({ "from": 1, "include_upper": "yes" })])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCondition(_)));
    }

    #[test]
    fn test_group_ignores_leaf_fields() {
        let cond: Condition = serde_json::from_value(json!({
            "logic": "MUST_NOT",
            "nodeType": "TERMS",
            "fieldValues": { "ignored": [1] },
            "children": [
                { "logic": "MUST", "nodeType": "TERMS", "fieldValues": { "type": ["survey"] } }
            ]
        }))
        .unwrap();
        assert!(cond.is_group());
        assert_eq!(cond.logic, Logic::MustNot);
    }

    #[test]
    fn test_legacy_field_names() {
        let cond: Condition = serde_json::from_value(json!({
            "pair": { "text": ["hello"] },
            "queryLogic": "SHOULD",
            "queryType": "MATCHPHRASE"
        }))
        .unwrap();
        assert_eq!(cond.node_type(), Some(NodeType::MatchPhrase));
        assert_eq!(cond.logic, Logic::Should);
    }

    #[test]
    fn test_legacy_numeric_codes() {
        let cond: Condition = serde_json::from_value(json!({
            "pair": { "user.keyword": ["wubin1989"] },
            "queryLogic": 2,
            "queryType": 1
        }))
        .unwrap();
        assert_eq!(cond.logic, Logic::Must);
        assert_eq!(cond.node_type(), Some(NodeType::Terms));

        let logic: Logic = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(logic, Logic::MustNot);
        let node: NodeType = serde_json::from_value(json!(6)).unwrap();
        assert_eq!(node, NodeType::Exists);
    }

    #[test]
    fn test_unknown_codes_are_rejected() {
        assert!(serde_json::from_value::<Logic>(json!(0)).is_err());
        assert!(serde_json::from_value::<NodeType>(json!(7)).is_err());
        assert!(serde_json::from_value::<NodeType>(json!("FUZZY")).is_err());
    }

    #[test]
    fn test_names_serialize_in_upper_case() {
        assert_eq!(serde_json::to_value(Logic::MustNot).unwrap(), json!("MUST_NOT"));
        let node: NodeType = serde_json::from_value(json!("match_phrase")).unwrap();
        assert_eq!(serde_json::to_value(node).unwrap(), json!("MATCH_PHRASE"));
    }

    #[test]
    fn test_leaf_without_type_is_rejected() {
        let res: std::result::Result<Condition, _> =
            serde_json::from_value(json!({ "logic": "MUST", "fieldValues": { "a": [1] } }));
        assert!(res.is_err());
    }
}
