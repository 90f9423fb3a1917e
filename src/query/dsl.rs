//! Typed query-object model rendering the Elasticsearch query DSL
//!
//! Every query renders to exactly the JSON the engine expects through
//! [`Query::source`]. Bool buckets holding a single clause render it as an
//! object, several clauses as an array.

use super::condition::Logic;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// A single clause of the query DSL
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Bool(BoolQuery),
    Terms(TermsQuery),
    Range(RangeQuery),
    MatchPhrase(MatchPhraseQuery),
    Prefix(PrefixQuery),
    Wildcard(WildcardQuery),
    Exists(ExistsQuery),
    FunctionScore(FunctionScoreQuery),
}

impl Query {
    /// Render the clause as engine JSON
    pub fn source(&self) -> Value {
        match self {
            Query::Bool(q) => q.source(),
            Query::Terms(q) => q.source(),
            Query::Range(q) => q.source(),
            Query::MatchPhrase(q) => q.source(),
            Query::Prefix(q) => q.source(),
            Query::Wildcard(q) => q.source(),
            Query::Exists(q) => q.source(),
            Query::FunctionScore(q) => q.source(),
        }
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.source().serialize(serializer)
    }
}

macro_rules! into_query {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Query {
                fn from(q: $ty) -> Self {
                    Query::$variant(q)
                }
            }
        )*
    };
}

into_query! {
    BoolQuery => Bool,
    TermsQuery => Terms,
    RangeQuery => Range,
    MatchPhraseQuery => MatchPhrase,
    PrefixQuery => Prefix,
    WildcardQuery => Wildcard,
    ExistsQuery => Exists,
    FunctionScoreQuery => FunctionScore,
}

/// Boolean combination of must / should / must_not clauses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    pub minimum_should_match: Option<String>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, query: impl Into<Query>) -> Self {
        self.must.push(query.into());
        self
    }

    pub fn should(mut self, query: impl Into<Query>) -> Self {
        self.should.push(query.into());
        self
    }

    pub fn must_not(mut self, query: impl Into<Query>) -> Self {
        self.must_not.push(query.into());
        self
    }

    /// Append a clause to the bucket named by `logic`
    pub fn push(&mut self, logic: Logic, query: impl Into<Query>) {
        let bucket = match logic {
            Logic::Should => &mut self.should,
            Logic::Must => &mut self.must,
            Logic::MustNot => &mut self.must_not,
        };
        bucket.push(query.into());
    }

    pub fn minimum_should_match(mut self, n: u32) -> Self {
        self.minimum_should_match = Some(n.to_string());
        self
    }

    /// True when no bucket holds a clause
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    pub fn source(&self) -> Value {
        let mut body = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if let Some(rendered) = render_bucket(clauses) {
                body.insert(key.to_string(), rendered);
            }
        }
        if let Some(ref msm) = self.minimum_should_match {
            body.insert("minimum_should_match".to_string(), json!(msm));
        }
        json!({ "bool": body })
    }
}

fn render_bucket(clauses: &[Query]) -> Option<Value> {
    match clauses {
        [] => None,
        [single] => Some(single.source()),
        many => Some(Value::Array(many.iter().map(Query::source).collect())),
    }
}

/// Match documents whose field holds any of the given exact values
#[derive(Debug, Clone, PartialEq)]
pub struct TermsQuery {
    pub field: String,
    pub values: Vec<Value>,
}

impl TermsQuery {
    pub fn new(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            values,
        }
    }

    pub fn source(&self) -> Value {
        json!({ "terms": { self.field.as_str(): self.values } })
    }
}

/// Interval match on a single field
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub field: String,
    pub from: Option<Value>,
    pub to: Option<Value>,
    pub include_lower: bool,
    pub include_upper: bool,
    pub format: Option<String>,
    pub time_zone: Option<String>,
}

impl RangeQuery {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            from: None,
            to: None,
            include_lower: true,
            include_upper: false,
            format: None,
            time_zone: None,
        }
    }

    /// Inclusive lower bound
    pub fn gte(mut self, from: impl Into<Value>) -> Self {
        self.from = Some(from.into());
        self.include_lower = true;
        self
    }

    /// Exclusive upper bound
    pub fn lt(mut self, to: impl Into<Value>) -> Self {
        self.to = Some(to.into());
        self.include_upper = false;
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn time_zone(mut self, zone: impl Into<String>) -> Self {
        self.time_zone = Some(zone.into());
        self
    }

    pub fn source(&self) -> Value {
        let mut params = Map::new();
        params.insert("from".to_string(), self.from.clone().unwrap_or(Value::Null));
        params.insert("to".to_string(), self.to.clone().unwrap_or(Value::Null));
        params.insert("include_lower".to_string(), json!(self.include_lower));
        params.insert("include_upper".to_string(), json!(self.include_upper));
        if let Some(ref format) = self.format {
            params.insert("format".to_string(), json!(format));
        }
        if let Some(ref zone) = self.time_zone {
            params.insert("time_zone".to_string(), json!(zone));
        }
        json!({ "range": { self.field.as_str(): params } })
    }
}

/// Exact phrase match on an analyzed field
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPhraseQuery {
    pub field: String,
    pub query: String,
}

impl MatchPhraseQuery {
    pub fn new(field: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            query: query.into(),
        }
    }

    pub fn source(&self) -> Value {
        json!({ "match_phrase": { self.field.as_str(): { "query": self.query } } })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixQuery {
    pub field: String,
    pub prefix: String,
}

impl PrefixQuery {
    pub fn new(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn source(&self) -> Value {
        json!({ "prefix": { self.field.as_str(): self.prefix } })
    }
}

/// Pattern match with `*` and `?` evaluated by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct WildcardQuery {
    pub field: String,
    pub pattern: String,
}

impl WildcardQuery {
    pub fn new(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn source(&self) -> Value {
        json!({ "wildcard": { self.field.as_str(): { "wildcard": self.pattern } } })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExistsQuery {
    pub field: String,
}

impl ExistsQuery {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn source(&self) -> Value {
        json!({ "exists": { "field": self.field } })
    }
}

/// Rescores an inner query with a script, used for random sampling
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionScoreQuery {
    pub query: Box<Query>,
    pub script: String,
}

impl FunctionScoreQuery {
    pub fn new(query: impl Into<Query>, script: impl Into<String>) -> Self {
        Self {
            query: Box::new(query.into()),
            script: script.into(),
        }
    }

    /// Score every match with `Math.random()`
    pub fn random(query: impl Into<Query>) -> Self {
        Self::new(query, "Math.random()")
    }

    pub fn source(&self) -> Value {
        json!({
            "function_score": {
                "query": self.query.source(),
                "functions": [
                    { "script_score": { "script": { "source": self.script } } }
                ]
            }
        })
    }
}
