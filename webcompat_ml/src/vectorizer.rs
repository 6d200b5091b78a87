use std::collections::BTreeMap;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

use crate::tokenizer::{Analyzer, Tokenize};

/// Sparse bag-of-words entry: (column, count).
pub type SparseEntry = (u32, f32);

/// Bag-of-words vectorizer over a frozen vocabulary.
///
/// Fitting keeps the `max_features` most frequent terms of the corpus and
/// assigns columns in lexicographic term order. Once fitted, the vocabulary
/// only changes through another call to [`CountVectorizer::fit`]. Terms outside
/// the vocabulary contribute nothing to the encoded vector.
#[derive(Clone, Debug)]
pub struct CountVectorizer {
    max_features: usize,
    analyzer: Analyzer,
    vocabulary: Vec<String>,
    index: HashMap<String, u32>,
}

impl CountVectorizer {
    /// Creates an unfitted vectorizer.
    ///
    /// # Arguments
    ///
    /// * `max_features` - Upper bound of the vocabulary size.
    /// * `analyzer` - Tokenizer applied to lowercased documents.
    pub fn new(max_features: usize, analyzer: Analyzer) -> Self {
        Self {
            max_features,
            analyzer,
            vocabulary: vec![],
            index: HashMap::new(),
        }
    }

    fn from_vocabulary(max_features: usize, analyzer: Analyzer, vocabulary: Vec<String>) -> Self {
        let index = vocabulary
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i as u32))
            .collect();
        Self {
            max_features,
            analyzer,
            vocabulary,
            index,
        }
    }

    /// Fits the vocabulary with the configured analyzer.
    pub fn fit<S>(&mut self, docs: &[S])
    where
        S: AsRef<str>,
    {
        let analyzer = self.analyzer;
        self.fit_with(docs, &analyzer);
    }

    /// Fits the vocabulary with an arbitrary tokenizer.
    ///
    /// Any previous vocabulary is discarded.
    pub fn fit_with<S, T>(&mut self, docs: &[S], tokenizer: &T)
    where
        S: AsRef<str>,
        T: Tokenize + ?Sized,
    {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for doc in docs {
            for token in tokenizer.tokenize(&doc.as_ref().to_lowercase()) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
        let mut terms: Vec<(String, u64)> = counts.into_iter().collect();
        terms.sort_unstable_by(|(term_a, count_a), (term_b, count_b)| {
            count_b.cmp(count_a).then_with(|| term_a.cmp(term_b))
        });
        terms.truncate(self.max_features);
        let mut vocabulary: Vec<String> = terms.into_iter().map(|(term, _)| term).collect();
        vocabulary.sort_unstable();
        *self = Self::from_vocabulary(self.max_features, self.analyzer, vocabulary);
    }

    /// Encodes a document with the configured analyzer.
    ///
    /// # Returns
    ///
    /// Non-zero term counts sorted by column.
    pub fn transform(&self, doc: &str) -> Vec<SparseEntry> {
        self.transform_with(doc, &self.analyzer)
    }

    /// Encodes a document with an arbitrary tokenizer.
    pub fn transform_with<T>(&self, doc: &str, tokenizer: &T) -> Vec<SparseEntry>
    where
        T: Tokenize + ?Sized,
    {
        let mut counts = BTreeMap::new();
        for token in tokenizer.tokenize(&doc.to_lowercase()) {
            if let Some(&col) = self.index.get(token.as_str()) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }
        counts.into_iter().collect()
    }

    /// Number of columns produced by [`CountVectorizer::transform`].
    pub fn width(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn column(&self, term: &str) -> Option<u32> {
        self.index.get(term).copied()
    }

    pub fn analyzer(&self) -> Analyzer {
        self.analyzer
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }
}

impl PartialEq for CountVectorizer {
    fn eq(&self, other: &Self) -> bool {
        self.max_features == other.max_features
            && self.analyzer == other.analyzer
            && self.vocabulary == other.vocabulary
    }
}

impl Eq for CountVectorizer {}

impl Encode for CountVectorizer {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.max_features, encoder)?;
        Encode::encode(&self.analyzer, encoder)?;
        Encode::encode(&self.vocabulary, encoder)?;
        Ok(())
    }
}

impl<Context> Decode<Context> for CountVectorizer {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let max_features: usize = Decode::decode(decoder)?;
        let analyzer: Analyzer = Decode::decode(decoder)?;
        let vocabulary: Vec<String> = Decode::decode(decoder)?;
        Ok(Self::from_vocabulary(max_features, analyzer, vocabulary))
    }
}
