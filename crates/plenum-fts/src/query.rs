//! Query compilation.
//!
//! A raw question is turned into a compound ranked query in three layers,
//! joined as a disjunction:
//!
//! 1. the parsed question itself, boosted ×5 — exact words and quoted
//!    phrases dominate the ranking;
//! 2. a fuzzy layer — every analyzed question token as a fuzzy term with
//!    automatic distance (≤2 chars: 0, 3–5: 1, longer: 2);
//! 3. a wildcard layer — every unquoted token longer than two characters as
//!    a contains-match.
//!
//! A meeting scope (range on `meeting_id`/`meeting_ids`, owner term) and a
//! collection filter (terms on `_bleve_type`) conjoin with the whole
//! disjunction when requested.
//!
//! Alongside the query a [`TermMatcher`] is produced; the searcher uses it to
//! reconstruct which terms of a hit's fields matched.

use std::collections::{HashMap, HashSet};
use std::ops::Bound;

use log::{debug, warn};
use tantivy::query::{
    BooleanQuery, BoostQuery, FuzzyTermQuery, Query, QueryParser, RangeQuery, RegexQuery,
    TermQuery,
};
use tantivy::schema::{IndexRecordOption, Type};
use tantivy::{Index, Term};

use plenum_core::fqid;

use crate::analyzer::{AnalyzerKind, AnalyzerRegistry};
use crate::mapping::{IndexMapping, ValueKind};

/// Maximum number of hits fetched per search.
pub const RESULT_LIMIT: usize = 100;

/// A compiled search request.
pub struct CompiledQuery {
    /// The executable query.
    pub query: Box<dyn Query>,
    /// Matcher reconstructing matched terms per hit.
    pub matcher: TermMatcher,
}

/// Compile a question plus filters into a query and a term matcher.
pub fn compile(
    index: &Index,
    mapping: &IndexMapping,
    analyzers: &AnalyzerRegistry,
    question: &str,
    collections: &[String],
    meeting_id: i32,
) -> CompiledQuery {
    let question = balance_quotes(question);

    // Layer 1: the question as the parser understands it, boosted.
    let parser = QueryParser::for_index(index, mapping.query_fields());
    let parsed: Box<dyn Query> = match parser.parse_query(&question) {
        Ok(query) => query,
        Err(err) => {
            warn!("question {question:?} did not parse: {err}");
            Box::new(BooleanQuery::new(Vec::new()))
        }
    };
    let boosted: Box<dyn Query> = Box::new(BoostQuery::new(parsed, 5.0));

    // Layer 2: fuzzy terms per analyzed field.
    let mut fuzzy_clauses: Vec<Box<dyn Query>> = Vec::new();
    for (_, mapped) in mapping.query_text_fields() {
        for token in analyzers.analyze(mapped.analyzer, &question) {
            let term = Term::from_field_text(mapped.field, &token);
            let distance = auto_distance(&token);
            if distance > 0 {
                fuzzy_clauses.push(Box::new(FuzzyTermQuery::new(term, distance, true)));
            } else {
                fuzzy_clauses.push(Box::new(TermQuery::new(term, IndexRecordOption::Basic)));
            }
        }
    }

    // Layer 3: wildcard contains-matches for unquoted tokens.
    let wildcards = wildcard_tokens(&strip_exact_terms(&question));
    let mut wildcard_clauses: Vec<Box<dyn Query>> = Vec::new();
    for token in &wildcards {
        let pattern = format!(".*{}.*", escape_regex(token));
        for (_, mapped) in mapping.query_text_fields() {
            match RegexQuery::from_pattern(&pattern, mapped.field) {
                Ok(query) => wildcard_clauses.push(Box::new(query)),
                Err(err) => debug!("wildcard pattern {pattern:?} rejected: {err}"),
            }
        }
    }

    let mut query: Box<dyn Query> = Box::new(BooleanQuery::union(vec![
        boosted,
        Box::new(BooleanQuery::union(fuzzy_clauses)),
        Box::new(BooleanQuery::union(wildcard_clauses)),
    ]));

    let mut filter_terms: HashSet<String> = HashSet::new();

    if meeting_id > 0 {
        let mut scope: Vec<Box<dyn Query>> = Vec::new();
        for name in ["meeting_id", "meeting_ids"] {
            if let Some(mapped) = mapping.get(name) {
                if mapped.kind == ValueKind::Numeric {
                    let value = i64::from(meeting_id);
                    scope.push(Box::new(RangeQuery::new_term_bounds(
                        name.to_string(),
                        Type::I64,
                        &Bound::Included(Term::from_field_i64(mapped.field, value)),
                        &Bound::Included(Term::from_field_i64(mapped.field, value)),
                    )));
                }
            }
        }
        let owner = fqid::join("meeting", meeting_id);
        if let Some(mapped) = mapping.get("owner_id") {
            if mapped.kind == ValueKind::Text {
                scope.push(Box::new(TermQuery::new(
                    Term::from_field_text(mapped.field, &owner),
                    IndexRecordOption::Basic,
                )));
            }
        }
        filter_terms.insert(owner);
        query = Box::new(BooleanQuery::intersection(vec![
            Box::new(BooleanQuery::union(scope)),
            query,
        ]));
    }

    if !collections.is_empty() {
        let clauses: Vec<Box<dyn Query>> = collections
            .iter()
            .map(|collection| {
                filter_terms.insert(collection.clone());
                Box::new(TermQuery::new(
                    Term::from_field_text(mapping.doc_type, collection),
                    IndexRecordOption::Basic,
                )) as Box<dyn Query>
            })
            .collect();
        query = Box::new(BooleanQuery::intersection(vec![
            query,
            Box::new(BooleanQuery::union(clauses)),
        ]));
    }

    let matcher = TermMatcher::new(analyzers, &question, wildcards, filter_terms);

    CompiledQuery { query, matcher }
}

// ============================================================================
// Question preprocessing
// ============================================================================

/// Close an unbalanced double quote by appending one.
pub fn balance_quotes(question: &str) -> String {
    if question.chars().filter(|c| *c == '"').count() % 2 == 1 {
        let mut balanced = question.to_string();
        balanced.push('"');
        balanced
    } else {
        question.to_string()
    }
}

/// Remove all text between matched double quotes (and the quotes).
pub fn strip_exact_terms(question: &str) -> String {
    let mut out = String::with_capacity(question.len());
    let mut in_quotes = false;
    for c in question.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            out.push(c);
        }
    }
    out
}

/// Tokens eligible for wildcard expansion.
///
/// Whitespace-separated, longer than two characters, not already starred at
/// either end; lowercased.
pub fn wildcard_tokens(question: &str) -> Vec<String> {
    question
        .split_whitespace()
        .filter(|token| {
            token.chars().count() > 2 && !token.starts_with('*') && !token.ends_with('*')
        })
        .map(str::to_lowercase)
        .collect()
}

/// Automatic fuzzy distance for a term.
fn auto_distance(term: &str) -> u8 {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Escape regex metacharacters in a wildcard token.
fn escape_regex(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// Term matcher
// ============================================================================

/// Knows which index terms the compiled question can match.
///
/// Used by the searcher to rebuild the per-field matched words of a hit by
/// re-analyzing its stored values.
pub struct TermMatcher {
    exact: HashMap<AnalyzerKind, HashSet<String>>,
    fuzzy: HashMap<AnalyzerKind, Vec<(String, u8)>>,
    wildcards: Vec<String>,
    filter_terms: HashSet<String>,
}

const TEXT_KINDS: [AnalyzerKind; 3] = [
    AnalyzerKind::Language,
    AnalyzerKind::LanguageHtml,
    AnalyzerKind::Simple,
];

impl TermMatcher {
    fn new(
        analyzers: &AnalyzerRegistry,
        question: &str,
        wildcards: Vec<String>,
        filter_terms: HashSet<String>,
    ) -> Self {
        let mut exact = HashMap::new();
        let mut fuzzy = HashMap::new();
        for kind in TEXT_KINDS {
            let tokens = analyzers.analyze(kind, question);
            fuzzy.insert(
                kind,
                tokens
                    .iter()
                    .filter_map(|token| {
                        let distance = auto_distance(token);
                        (distance > 0).then(|| (token.clone(), distance))
                    })
                    .collect(),
            );
            exact.insert(kind, tokens.into_iter().collect());
        }
        Self {
            exact,
            fuzzy,
            wildcards,
            filter_terms,
        }
    }

    /// Whether an index term of an analyzed field matches the question.
    pub fn matches_term(&self, kind: AnalyzerKind, term: &str) -> bool {
        if self
            .exact
            .get(&kind)
            .is_some_and(|terms| terms.contains(term))
        {
            return true;
        }
        if self.wildcards.iter().any(|needle| term.contains(needle)) {
            return true;
        }
        self.fuzzy.get(&kind).is_some_and(|candidates| {
            candidates
                .iter()
                .any(|(token, distance)| levenshtein(term, token) <= usize::from(*distance))
        })
    }

    /// Whether a keyword field value was selected by a scope or filter term.
    pub fn matches_keyword(&self, value: &str) -> bool {
        self.filter_terms.contains(value)
    }
}

/// Levenshtein edit distance between two words.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Quote balancing
    // ------------------------------------------------------------------------

    #[test]
    fn test_balance_quotes_appends_on_odd() {
        assert_eq!(balance_quotes("a \"b"), "a \"b\"");
        assert_eq!(balance_quotes("\""), "\"\"");
    }

    #[test]
    fn test_balance_quotes_keeps_even() {
        assert_eq!(balance_quotes("a \"b\" c"), "a \"b\" c");
        assert_eq!(balance_quotes("plain"), "plain");
    }

    #[test]
    fn test_balanced_output_always_even() {
        for question in ["", "\"", "a\"b\"c\"", "\"\"\"", "x"] {
            let balanced = balance_quotes(question);
            assert_eq!(balanced.chars().filter(|c| *c == '"').count() % 2, 0);
        }
    }

    // ------------------------------------------------------------------------
    // Exact-match extraction
    // ------------------------------------------------------------------------

    #[test]
    fn test_strip_exact_terms() {
        assert_eq!(strip_exact_terms("a \"b c\" d"), "a  d");
        assert_eq!(strip_exact_terms("\"all quoted\""), "");
        assert_eq!(strip_exact_terms("none"), "none");
    }

    // ------------------------------------------------------------------------
    // Wildcard tokens
    // ------------------------------------------------------------------------

    #[test]
    fn test_wildcard_tokens_drop_short() {
        assert_eq!(wildcard_tokens("ab abc a abcd"), vec!["abc", "abcd"]);
    }

    #[test]
    fn test_wildcard_tokens_skip_prestarred() {
        assert_eq!(wildcard_tokens("*abc abc* plain"), vec!["plain"]);
    }

    #[test]
    fn test_wildcard_tokens_lowercase() {
        assert_eq!(wildcard_tokens("TestWord"), vec!["testword"]);
    }

    #[test]
    fn test_wildcard_tokens_never_emit_short_or_starred() {
        for question in ["a bb ccc", "*x* yy zzz*", "Hello World"] {
            for token in wildcard_tokens(question) {
                assert!(token.chars().count() > 2);
                assert!(!token.starts_with('*') && !token.ends_with('*'));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Distances
    // ------------------------------------------------------------------------

    #[test]
    fn test_auto_distance() {
        assert_eq!(auto_distance("ab"), 0);
        assert_eq!(auto_distance("abc"), 1);
        assert_eq!(auto_distance("tests"), 1);
        assert_eq!(auto_distance("search"), 2);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("test", "text"), 1);
        assert_eq!(levenshtein("test", "west"), 1);
        assert_eq!(levenshtein("test", "team"), 2);
        assert_eq!(levenshtein("abc", "abcd"), 1);
        assert_eq!(levenshtein("", "ab"), 2);
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("plain"), "plain");
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("x(y)"), "x\\(y\\)");
    }

    // ------------------------------------------------------------------------
    // Term matcher
    // ------------------------------------------------------------------------

    #[test]
    fn test_matcher_exact_and_fuzzy() {
        let analyzers = AnalyzerRegistry::new();
        let matcher = TermMatcher::new(&analyzers, "test", Vec::new(), HashSet::new());

        assert!(matcher.matches_term(AnalyzerKind::Language, "test"));
        // One edit away, within the automatic distance for a 4-char token.
        assert!(matcher.matches_term(AnalyzerKind::Language, "text"));
        assert!(matcher.matches_term(AnalyzerKind::Language, "west"));
        // Two edits away.
        assert!(!matcher.matches_term(AnalyzerKind::Language, "team"));
    }

    #[test]
    fn test_matcher_wildcard() {
        let analyzers = AnalyzerRegistry::new();
        let matcher = TermMatcher::new(
            &analyzers,
            "ordnung",
            vec!["ordnung".to_string()],
            HashSet::new(),
        );

        assert!(matcher.matches_term(AnalyzerKind::Simple, "tagesordnungspunkt"));
        assert!(!matcher.matches_term(AnalyzerKind::Simple, "unrelated"));
    }

    #[test]
    fn test_matcher_keyword_filter() {
        let analyzers = AnalyzerRegistry::new();
        let mut filters = HashSet::new();
        filters.insert("topic".to_string());
        let matcher = TermMatcher::new(&analyzers, "test", Vec::new(), filters);

        assert!(matcher.matches_keyword("topic"));
        assert!(!matcher.matches_keyword("meeting"));
    }
}
