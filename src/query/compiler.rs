//! Compiles condition trees into a single bool query

use super::condition::{Condition, ConditionKind, Leaf, Logic, RangeValue};
use super::dsl::{
    BoolQuery, ExistsQuery, MatchPhraseQuery, PrefixQuery, RangeQuery, TermsQuery, WildcardQuery,
};
use super::zone;

/// Date formats accepted for the date range filter
pub const DEFAULT_DATE_FORMATS: &[&str] = &["yyyy-MM-dd HH:mm:ss", "yyyy-MM-dd", "epoch_millis"];

/// Compiler with a configurable date-format list
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    date_formats: Vec<String>,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self {
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl QueryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accepted date formats; an empty list keeps the defaults
    pub fn with_date_formats(mut self, formats: Vec<String>) -> Self {
        if !formats.is_empty() {
            self.date_formats = formats;
        }
        self
    }

    pub fn date_formats(&self) -> &[String] {
        &self.date_formats
    }

    /// Build the top-level bool query
    ///
    /// The date range `[start_date, end_date)` on `date_field` is AND-ed in
    /// when all three are non-empty. `minimum_should_match` is set to 1 only
    /// when one of the root conditions itself uses SHOULD; nested SHOULDs do
    /// not count.
    pub fn compile(
        &self,
        conditions: &[Condition],
        date_field: &str,
        start_date: &str,
        end_date: &str,
        zone: Option<&str>,
    ) -> BoolQuery {
        let mut query = BoolQuery::new();

        if !date_field.is_empty() && !start_date.is_empty() && !end_date.is_empty() {
            let zone = match zone.filter(|z| !z.is_empty()) {
                Some(z) => z.to_string(),
                None => zone::local_zone(),
            };
            query.push(
                Logic::Must,
                RangeQuery::new(date_field)
                    .gte(start_date)
                    .lt(end_date)
                    .format(self.date_formats.join("||"))
                    .time_zone(zone),
            );
        }

        let mut has_should = false;
        for condition in conditions {
            has_should |= condition.logic == Logic::Should;
            compile_tree(&mut query, condition);
        }
        if has_should {
            query = query.minimum_should_match(1);
        }
        query
    }
}

/// Compile with the default date formats
pub fn compile(
    conditions: &[Condition],
    date_field: &str,
    start_date: &str,
    end_date: &str,
    zone: Option<&str>,
) -> BoolQuery {
    QueryCompiler::default().compile(conditions, date_field, start_date, end_date, zone)
}

fn compile_tree(parent: &mut BoolQuery, condition: &Condition) {
    match condition.kind {
        ConditionKind::Group(ref children) if !children.is_empty() => {
            let mut nested = BoolQuery::new();
            for child in children {
                compile_tree(&mut nested, child);
            }
            parent.push(condition.logic, nested);
        }
        ConditionKind::Group(_) => {}
        ConditionKind::Leaf(ref leaf) => compile_leaf(parent, condition.logic, leaf),
    }
}

fn compile_leaf(parent: &mut BoolQuery, logic: Logic, leaf: &Leaf) {
    match leaf {
        Leaf::Terms(fields) => {
            for (field, values) in fields.iter().filter(|(_, v)| !v.is_empty()) {
                parent.push(logic, TermsQuery::new(field, values.clone()));
            }
        }
        Leaf::Range(fields) => {
            for (field, value) in fields {
                if let Some(RangeValue::Bounds(bounds)) = value {
                    if bounds.is_unbounded() {
                        continue;
                    }
                    let mut range = RangeQuery::new(field);
                    range.from = bounds.from.clone();
                    range.to = bounds.to.clone();
                    range.include_lower = bounds.include_lower;
                    range.include_upper = bounds.include_upper;
                    parent.push(logic, range);
                }
            }
        }
        Leaf::MatchPhrase(fields) => {
            for (field, phrases) in fields.iter().filter(|(_, v)| !v.is_empty()) {
                parent.push(logic, match_phrases(field, phrases));
            }
        }
        Leaf::Prefix(fields) => {
            for (field, prefix) in fields.iter().filter(|(_, v)| !v.is_empty()) {
                parent.push(logic, PrefixQuery::new(field, prefix));
            }
        }
        Leaf::Wildcard(fields) => {
            for (field, pattern) in fields.iter().filter(|(_, v)| !v.is_empty()) {
                parent.push(logic, WildcardQuery::new(field, pattern));
            }
        }
        Leaf::Exists(fields) => {
            for field in fields.iter().filter(|f| !f.is_empty()) {
                parent.push(logic, ExistsQuery::new(field));
            }
        }
    }
}

/// One bool per field whose should-clauses are the individual phrase values
///
/// `a+b` requires both phrases, `a+-b` requires `a` and excludes `b`, a lone
/// `-a` excludes `a`.
fn match_phrases(field: &str, phrases: &[String]) -> BoolQuery {
    let mut per_field = BoolQuery::new();
    for phrase in phrases {
        let words: Vec<&str> = phrase.split('+').collect();
        if words.len() > 1 {
            let mut all = BoolQuery::new();
            for word in words.iter().map(|w| w.trim()).filter(|w| !w.is_empty()) {
                match word.strip_prefix('-') {
                    Some(negated) => all.push(Logic::MustNot, MatchPhraseQuery::new(field, negated)),
                    None => all.push(Logic::Must, MatchPhraseQuery::new(field, word)),
                }
            }
            per_field.push(Logic::Should, all);
            continue;
        }

        let word = words[0];
        if word.trim().is_empty() {
            continue;
        }
        match word.strip_prefix('-') {
            Some(negated) => {
                per_field.push(
                    Logic::Should,
                    BoolQuery::new().must_not(MatchPhraseQuery::new(field, negated)),
                );
            }
            None => per_field.push(Logic::Should, MatchPhraseQuery::new(field, word)),
        }
    }
    per_field
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const FORMATS: &str = "yyyy-MM-dd HH:mm:ss||yyyy-MM-dd||epoch_millis";

    fn date_range(field: &str, from: &str, to: &str) -> Value {
        json!({ "range": { field: {
            "format": FORMATS,
            "from": from,
            "include_lower": true,
            "include_upper": false,
            "time_zone": "Asia/Shanghai",
            "to": to
        } } })
    }

    fn phrase(field: &str, query: &str) -> Value {
        json!({ "match_phrase": { field: { "query": query } } })
    }

    #[test]
    fn test_empty_conditions_without_dates() {
        let q = compile(&[], "", "", "", None);
        assert!(q.is_empty());
        assert_eq!(q.source(), json!({ "bool": {} }));
    }

    #[test]
    fn test_date_range_needs_all_three_parts() {
        let q = compile(&[], "createAt", "2020-06-01", "", Some("UTC"));
        assert!(q.is_empty());
    }

    #[test]
    fn test_should_match_phrase_with_date_range() {
        let conditions = vec![Condition::match_phrase(Logic::Should)
            .field("text", ["hello"])
            .unwrap()];
        let q = compile(
            &conditions,
            "createAt",
            "2020-06-01",
            "2020-07-10",
            Some("Asia/Shanghai"),
        );
        assert_eq!(
            q.source(),
            json!({ "bool": {
                "minimum_should_match": "1",
                "must": date_range("createAt", "2020-06-01", "2020-07-10"),
                "should": { "bool": { "should": phrase("text", "hello") } }
            } })
        );
    }

    #[test]
    fn test_match_phrase_operators() {
        let conditions = vec![Condition::match_phrase(Logic::Should)
            .field("school", ["A+B"])
            .unwrap()
            .field("address", ["A+-B"])
            .unwrap()
            .field("company", ["-A"])
            .unwrap()];
        let src = compile(&conditions, "", "", "", None).source();
        assert_eq!(
            src["bool"]["should"],
            json!([
                { "bool": { "should": { "bool": {
                    "must": phrase("address", "A"),
                    "must_not": phrase("address", "B")
                } } } },
                { "bool": { "should": { "bool": {
                    "must_not": phrase("company", "A")
                } } } },
                { "bool": { "should": { "bool": {
                    "must": [phrase("school", "A"), phrase("school", "B")]
                } } } }
            ])
        );
    }

    #[test]
    fn test_match_phrase_drops_blank_tokens() {
        let conditions = vec![Condition::match_phrase(Logic::Must)
            .field("text", ["a+ +", ""])
            .unwrap()];
        let src = compile(&conditions, "", "", "", None).source();
        assert_eq!(
            src,
            json!({ "bool": { "must": { "bool": { "should": { "bool": {
                "must": phrase("text", "a")
            } } } } } })
        );
    }

    #[test]
    fn test_minimum_should_match_only_from_root() {
        let nested = Condition::group(
            Logic::Must,
            vec![Condition::terms(Logic::Should).field("a", ["x"]).unwrap()],
        );
        let q = compile(&[nested], "", "", "", None);
        assert_eq!(q.minimum_should_match, None);
        assert!(q.source()["bool"].get("minimum_should_match").is_none());

        let root = Condition::exists(Logic::Should).field("a", Vec::<Value>::new()).unwrap();
        let q = compile(&[root], "", "", "", None);
        assert_eq!(q.minimum_should_match.as_deref(), Some("1"));
    }

    #[test]
    fn test_empty_terms_are_skipped() {
        let conditions = vec![Condition::terms(Logic::Must)
            .field("status", Vec::<Value>::new())
            .unwrap()
            .field("type", ["education"])
            .unwrap()];
        let src = compile(&conditions, "", "", "", None).source();
        assert_eq!(
            src,
            json!({ "bool": { "must": { "terms": { "type": ["education"] } } } })
        );
    }

    #[test]
    fn test_exists_fires_without_values() {
        let conditions = vec![
            Condition::exists(Logic::MustNot)
                .field("delete_at", Vec::<Value>::new())
                .unwrap(),
            Condition::exists(Logic::Must)
                .field("flag", Vec::<Value>::new())
                .unwrap(),
            Condition::exists(Logic::Should)
                .field("status", Vec::<Value>::new())
                .unwrap(),
        ];
        let src = compile(&conditions, "", "", "", None).source();
        assert_eq!(
            src,
            json!({ "bool": {
                "minimum_should_match": "1",
                "must": { "exists": { "field": "flag" } },
                "must_not": { "exists": { "field": "delete_at" } },
                "should": { "exists": { "field": "status" } }
            } })
        );
    }

    #[test]
    fn test_range_conditions() {
        let conditions = vec![
            Condition::range(Logic::Must)
                .field("senseResult", [json!({ "to": 0.4, "include_lower": true })])
                .unwrap(),
            Condition::range(Logic::Should)
                .field("visitSenseResult", [json!({ "from": 0.6 })])
                .unwrap(),
            Condition::range(Logic::MustNot)
                .field("ignored", [json!("not a map")])
                .unwrap()
                .field("unbounded", [json!({ "include_upper": true })])
                .unwrap(),
            Condition::terms(Logic::Must)
                .field("orderPhrase", [300])
                .unwrap(),
        ];
        let src = compile(
            &conditions,
            "acceptDate",
            "2020-06-01",
            "2020-07-01",
            Some("Asia/Shanghai"),
        )
        .source();
        assert_eq!(
            src,
            json!({ "bool": {
                "minimum_should_match": "1",
                "must": [
                    date_range("acceptDate", "2020-06-01", "2020-07-01"),
                    { "range": { "senseResult": {
                        "from": null, "include_lower": true, "include_upper": false, "to": 0.4
                    } } },
                    { "terms": { "orderPhrase": [300] } }
                ],
                "should": { "range": { "visitSenseResult": {
                    "from": 0.6, "include_lower": true, "include_upper": false, "to": null
                } } }
            } })
        );
    }

    #[test]
    fn test_prefix_and_wildcard() {
        let conditions = vec![
            Condition::wildcard(Logic::Should)
                .field("dept.keyword", ["unionj*"])
                .unwrap(),
            Condition::wildcard(Logic::MustNot)
                .field("city.keyword", [""])
                .unwrap(),
            Condition::prefix(Logic::Must)
                .field("book.keyword", ["go"])
                .unwrap(),
        ];
        let src = compile(&conditions, "", "", "", None).source();
        assert_eq!(
            src,
            json!({ "bool": {
                "minimum_should_match": "1",
                "must": { "prefix": { "book.keyword": "go" } },
                "should": { "wildcard": { "dept.keyword": { "wildcard": "unionj*" } } }
            } })
        );
    }

    #[test]
    fn test_must_not_group() {
        let conditions = vec![
            Condition::exists(Logic::MustNot)
                .field("delete_at", Vec::<Value>::new())
                .unwrap(),
            Condition::terms(Logic::MustNot)
                .field("status", [100, 300])
                .unwrap(),
            Condition::group(
                Logic::MustNot,
                vec![
                    Condition::terms(Logic::Must).field("type", ["survey"]).unwrap(),
                    Condition::terms(Logic::Must).field("price", [0]).unwrap(),
                ],
            ),
        ];
        let src = compile(
            &conditions,
            "acceptDate",
            "2020-06-01",
            "2020-07-01",
            Some("Asia/Shanghai"),
        )
        .source();
        assert_eq!(
            src,
            json!({ "bool": {
                "must": date_range("acceptDate", "2020-06-01", "2020-07-01"),
                "must_not": [
                    { "exists": { "field": "delete_at" } },
                    { "terms": { "status": [100, 300] } },
                    { "bool": { "must": [
                        { "terms": { "type": ["survey"] } },
                        { "terms": { "price": [0] } }
                    ] } }
                ]
            } })
        );
    }

    #[test]
    fn test_custom_date_formats() {
        let compiler = QueryCompiler::new().with_date_formats(vec!["basic_date".to_string()]);
        let src = compiler
            .compile(&[], "day", "20200601", "20200701", Some("UTC"))
            .source();
        assert_eq!(src["bool"]["must"]["range"]["day"]["format"], json!("basic_date"));
        assert_eq!(src["bool"]["must"]["range"]["day"]["time_zone"], json!("UTC"));
    }
}
