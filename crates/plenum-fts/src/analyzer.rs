//! Named analyzers for the text index.
//!
//! An analyzer is a token pipeline: an optional markup-stripping stage, a
//! tokenizer, and a chain of token filters. Four pipelines exist:
//!
//! - `"de"` — Unicode word tokenizer → lowercase → German stop words →
//!   German umlaut folding → German stemmer. The default for plain text.
//! - `"de_html"` — like `"de"`, but the tokenizer first strips markup and
//!   then decodes HTML entities (in that order, so `&amp;` becomes a literal
//!   `&` and never re-forms a tag).
//! - `"simple"` — Unicode word tokenizer → lowercase. Used for the
//!   `_<field>_original` sidecars so unstemmed word forms stay searchable.
//! - keyword — Tantivy's built-in `"raw"` tokenizer; the whole value is one
//!   term. Used for document type and FQID-valued fields.
//!
//! The registry is built once, registered into the index, and shared
//! read-only afterwards; there is no hidden static initialization.

use stop_words::{get, LANGUAGE};
use tantivy::tokenizer::{
    Language, LowerCaser, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer, Token,
    TokenFilter, TokenStream, Tokenizer,
};
use tantivy::Index;

/// Tokenizer name of the default language pipeline.
pub const LANGUAGE_NAME: &str = "de";
/// Tokenizer name of the HTML-aware language pipeline.
pub const LANGUAGE_HTML_NAME: &str = "de_html";
/// Tokenizer name of the simple pipeline.
pub const SIMPLE_NAME: &str = "simple";
/// Tokenizer name of the keyword pipeline (Tantivy built-in).
pub const KEYWORD_NAME: &str = "raw";

/// Which pipeline a field is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyzerKind {
    /// The default language pipeline.
    Language,
    /// The HTML-aware language pipeline.
    LanguageHtml,
    /// Lowercase only.
    Simple,
    /// Whole value as one term.
    Keyword,
}

impl AnalyzerKind {
    /// Registered tokenizer name for this pipeline.
    pub fn name(self) -> &'static str {
        match self {
            AnalyzerKind::Language => LANGUAGE_NAME,
            AnalyzerKind::LanguageHtml => LANGUAGE_HTML_NAME,
            AnalyzerKind::Simple => SIMPLE_NAME,
            AnalyzerKind::Keyword => KEYWORD_NAME,
        }
    }
}

/// The constructed analyzer set.
///
/// Cheap to clone the contained analyzers; `analyze` works on a clone so the
/// registry itself can be shared behind an `Arc`.
pub struct AnalyzerRegistry {
    language: TextAnalyzer,
    language_html: TextAnalyzer,
    simple: TextAnalyzer,
}

impl AnalyzerRegistry {
    /// Build all pipelines.
    pub fn new() -> Self {
        let stopwords: Vec<String> = get(LANGUAGE::German);

        let language = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(stopwords.clone()))
            .filter(GermanNormalizer)
            .filter(Stemmer::new(Language::German))
            .build();

        let language_html = TextAnalyzer::builder(MarkupStripTokenizer::default())
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(stopwords))
            .filter(GermanNormalizer)
            .filter(Stemmer::new(Language::German))
            .build();

        let simple = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .build();

        Self {
            language,
            language_html,
            simple,
        }
    }

    /// Register the pipelines with an index under their stable names.
    ///
    /// Must run after creating or opening an index, before any write or
    /// query touches an analyzed field.
    pub fn register(&self, index: &Index) {
        let tokenizers = index.tokenizers();
        tokenizers.register(LANGUAGE_NAME, self.language.clone());
        tokenizers.register(LANGUAGE_HTML_NAME, self.language_html.clone());
        tokenizers.register(SIMPLE_NAME, self.simple.clone());
    }

    /// Run a pipeline over a text and collect the produced terms.
    ///
    /// The keyword pipeline yields the value unchanged as a single term.
    pub fn analyze(&self, kind: AnalyzerKind, text: &str) -> Vec<String> {
        let analyzer = match kind {
            AnalyzerKind::Language => &self.language,
            AnalyzerKind::LanguageHtml => &self.language_html,
            AnalyzerKind::Simple => &self.simple,
            AnalyzerKind::Keyword => {
                if text.is_empty() {
                    return Vec::new();
                }
                return vec![text.to_string()];
            }
        };

        let mut analyzer = analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while let Some(token) = stream.next() {
            terms.push(token.text.clone());
        }
        terms
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("pipelines", &[LANGUAGE_NAME, LANGUAGE_HTML_NAME, SIMPLE_NAME])
            .finish()
    }
}

// ============================================================================
// German umlaut folding
// ============================================================================

/// Token filter folding German umlauts and sharp s.
///
/// `ä→a, ö→o, ü→u, ß→ss`. Runs after the stop-word filter (the stop list
/// carries umlauts) and before the stemmer.
#[derive(Clone)]
pub struct GermanNormalizer;

impl TokenFilter for GermanNormalizer {
    type Tokenizer<T: Tokenizer> = GermanNormalizerFilter<T>;

    fn transform<T: Tokenizer>(self, tokenizer: T) -> Self::Tokenizer<T> {
        GermanNormalizerFilter(tokenizer)
    }
}

/// Tokenizer wrapper produced by [`GermanNormalizer`].
#[derive(Clone)]
pub struct GermanNormalizerFilter<T>(T);

impl<T: Tokenizer> Tokenizer for GermanNormalizerFilter<T> {
    type TokenStream<'a> = GermanNormalizerTokenStream<T::TokenStream<'a>>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        GermanNormalizerTokenStream {
            inner: self.0.token_stream(text),
        }
    }
}

/// Token stream produced by [`GermanNormalizerFilter`].
pub struct GermanNormalizerTokenStream<T> {
    inner: T,
}

impl<T: TokenStream> TokenStream for GermanNormalizerTokenStream<T> {
    fn advance(&mut self) -> bool {
        if !self.inner.advance() {
            return false;
        }
        let token = self.inner.token_mut();
        if token.text.contains(['ä', 'ö', 'ü', 'ß']) {
            let mut folded = String::with_capacity(token.text.len());
            for c in token.text.chars() {
                match c {
                    'ä' => folded.push('a'),
                    'ö' => folded.push('o'),
                    'ü' => folded.push('u'),
                    'ß' => folded.push_str("ss"),
                    _ => folded.push(c),
                }
            }
            token.text = folded;
        }
        true
    }

    fn token(&self) -> &Token {
        self.inner.token()
    }

    fn token_mut(&mut self) -> &mut Token {
        self.inner.token_mut()
    }
}

// ============================================================================
// Markup-stripping tokenizer
// ============================================================================

/// Word tokenizer that strips markup before tokenizing.
///
/// Tags are replaced by a space, then HTML entities are decoded. Decoding
/// runs strictly after tag removal: `&amp;` becomes `&`, and `&lt;b&gt;`
/// becomes the literal text `<b>` rather than a tag.
#[derive(Clone, Default)]
pub struct MarkupStripTokenizer {
    buffer: String,
}

impl Tokenizer for MarkupStripTokenizer {
    type TokenStream<'a> = WordTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> WordTokenStream<'a> {
        let stripped = strip_markup(text);
        self.buffer = html_escape::decode_html_entities(&stripped).into_owned();
        WordTokenStream::new(&self.buffer)
    }
}

/// Replace every `<...>` tag with a single space.
fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Token stream over alphanumeric word runs.
pub struct WordTokenStream<'a> {
    text: &'a str,
    offset: usize,
    position: usize,
    token: Token,
}

impl<'a> WordTokenStream<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            position: 0,
            token: Token::default(),
        }
    }
}

impl TokenStream for WordTokenStream<'_> {
    fn advance(&mut self) -> bool {
        let rest = &self.text[self.offset..];
        let Some(start) = rest
            .char_indices()
            .find(|(_, c)| c.is_alphanumeric())
            .map(|(i, _)| self.offset + i)
        else {
            self.offset = self.text.len();
            return false;
        };

        let run = &self.text[start..];
        let end = run
            .char_indices()
            .find(|(_, c)| !c.is_alphanumeric())
            .map(|(i, _)| start + i)
            .unwrap_or(self.text.len());

        self.token.text.clear();
        self.token.text.push_str(&self.text[start..end]);
        self.token.offset_from = start;
        self.token.offset_to = end;
        self.token.position = self.position;
        self.token.position_length = 1;

        self.position += 1;
        self.offset = end;
        true
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AnalyzerRegistry {
        AnalyzerRegistry::new()
    }

    // ------------------------------------------------------------------------
    // Language pipeline
    // ------------------------------------------------------------------------

    #[test]
    fn test_language_lowercases() {
        let terms = registry().analyze(AnalyzerKind::Language, "Protokoll");
        assert_eq!(terms, vec!["protokoll"]);
    }

    #[test]
    fn test_language_stems_plural_s() {
        let terms = registry().analyze(AnalyzerKind::Language, "teams");
        assert_eq!(terms, vec!["team"]);
    }

    #[test]
    fn test_language_keeps_short_words_intact() {
        let terms = registry().analyze(AnalyzerKind::Language, "test west text");
        assert_eq!(terms, vec!["test", "west", "text"]);
    }

    #[test]
    fn test_language_drops_stop_words() {
        let terms = registry().analyze(AnalyzerKind::Language, "der Antrag und die Sitzung");
        assert!(!terms.contains(&"der".to_string()));
        assert!(!terms.contains(&"und".to_string()));
        assert!(!terms.contains(&"die".to_string()));
        assert!(terms.iter().any(|t| t.starts_with("antrag")));
    }

    #[test]
    fn test_language_folds_umlauts() {
        let terms = registry().analyze(AnalyzerKind::Language, "Anträge");
        assert_eq!(terms.len(), 1);
        assert!(terms[0].starts_with("antrag"), "got {:?}", terms);
    }

    // ------------------------------------------------------------------------
    // HTML pipeline
    // ------------------------------------------------------------------------

    #[test]
    fn test_html_strips_tags() {
        let terms = registry().analyze(AnalyzerKind::LanguageHtml, "<p>test <b>west</b></p>");
        assert_eq!(terms, vec!["test", "west"]);
    }

    #[test]
    fn test_html_decodes_entities_after_stripping() {
        // &lt;strong&gt; decodes to literal text and must not vanish as a tag.
        let terms =
            registry().analyze(AnalyzerKind::LanguageHtml, "b&auml;ume &lt;strong&gt; wald");
        assert!(terms.contains(&"baum".to_string()) || terms.contains(&"baume".to_string()));
        assert!(terms.contains(&"strong".to_string()));
        assert!(terms.contains(&"wald".to_string()));
    }

    #[test]
    fn test_html_amp_entity() {
        let terms = registry().analyze(AnalyzerKind::LanguageHtml, "Protokolle &amp; Anlagen");
        // The entity decodes to a bare "&" and disappears at tokenization; a
        // failed decode would leave an "amp" term behind.
        assert!(!terms.contains(&"amp".to_string()));
        assert_eq!(terms.len(), 2);
        assert!(terms[0].starts_with("protokoll"));
        assert!(terms[1].starts_with("anlag"));
    }

    #[test]
    fn test_html_plain_text_unchanged() {
        let terms = registry().analyze(AnalyzerKind::LanguageHtml, "test west teams");
        assert_eq!(terms, vec!["test", "west", "team"]);
    }

    // ------------------------------------------------------------------------
    // Simple and keyword pipelines
    // ------------------------------------------------------------------------

    #[test]
    fn test_simple_no_stemming() {
        let terms = registry().analyze(AnalyzerKind::Simple, "Teams und Listen");
        assert_eq!(terms, vec!["teams", "und", "listen"]);
    }

    #[test]
    fn test_keyword_whole_value() {
        let terms = registry().analyze(AnalyzerKind::Keyword, "meeting/1");
        assert_eq!(terms, vec!["meeting/1"]);
        assert!(registry().analyze(AnalyzerKind::Keyword, "").is_empty());
    }

    // ------------------------------------------------------------------------
    // Markup stripping
    // ------------------------------------------------------------------------

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<p>a</p>"), " a ");
        assert_eq!(strip_markup("no tags"), "no tags");
        assert_eq!(strip_markup("a<br/>b"), "a b");
    }

    #[test]
    fn test_word_stream_positions() {
        let mut tokenizer = MarkupStripTokenizer::default();
        let mut stream = tokenizer.token_stream("one <i>two</i> three");
        let mut positions = Vec::new();
        while let Some(token) = stream.next() {
            positions.push((token.position, token.text.clone()));
        }
        assert_eq!(
            positions,
            vec![
                (0, "one".to_string()),
                (1, "two".to_string()),
                (2, "three".to_string())
            ]
        );
    }
}
