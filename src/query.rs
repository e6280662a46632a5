//! Translation of [`MovieQuery`] filters into tantivy queries.

use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, EmptyQuery, Occur, PhraseQuery, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, OwnedValue, TantivyDocument};
use tantivy::tokenizer::TokenStream;
use tantivy::Term;

use crate::backend::BackendError;
use crate::indexer::{MovieFields, MovieIndex};
use crate::movies::{MovieQuery, MovieRecord, MovieSearchResult};

/// Hits beyond this offset are never materialised; only the total is reported.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Builds the conjunction of every filter present in `query`.
pub fn build_query(index: &MovieIndex, query: &MovieQuery) -> Result<Box<dyn Query>, BackendError> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

    if let Some(title) = query.title_filter() {
        clauses.push((Occur::Must, title_phrase(index, title)?));
    }

    if let Some(year) = query.year {
        let term = Term::from_field_i64(index.fields.year, year);
        clauses.push((
            Occur::Must,
            Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
        ));
    }

    if clauses.is_empty() {
        return Ok(Box::new(AllQuery));
    }
    Ok(Box::new(BooleanQuery::new(clauses)))
}

/// Phrase match on the title, tokenized the same way the field was indexed.
fn title_phrase(index: &MovieIndex, title: &str) -> Result<Box<dyn Query>, BackendError> {
    let field = index.fields.title;
    let mut analyzer = index.index.tokenizer_for_field(field)?;
    let mut stream = analyzer.token_stream(title);

    let mut terms = Vec::new();
    while stream.advance() {
        terms.push(Term::from_field_text(field, &stream.token().text));
    }

    let query: Box<dyn Query> = match terms.len() {
        0 => Box::new(EmptyQuery),
        1 => Box::new(TermQuery::new(
            terms.remove(0),
            IndexRecordOption::WithFreqs,
        )),
        _ => Box::new(PhraseQuery::new(terms)),
    };
    Ok(query)
}

pub fn execute(index: &MovieIndex, query: &MovieQuery) -> Result<MovieSearchResult, BackendError> {
    let searcher = index.reader.searcher();
    let tantivy_query = build_query(index, query)?;

    if query.size == 0 || query.from_item >= MAX_RESULT_WINDOW {
        let total = searcher.search(&tantivy_query, &Count)?;
        return Ok(MovieSearchResult {
            movies: Vec::new(),
            total,
        });
    }

    let limit = query.size.min(MAX_RESULT_WINDOW - query.from_item);
    let top_docs = TopDocs::with_limit(limit).and_offset(query.from_item);
    let (total, hits) = searcher.search(&tantivy_query, &(Count, top_docs))?;

    let mut movies = Vec::with_capacity(hits.len());
    for (_score, address) in hits {
        let doc = searcher.doc::<TantivyDocument>(address)?;
        movies.push(document_to_movie(&doc, &index.fields)?);
    }

    Ok(MovieSearchResult { movies, total })
}

pub fn document_to_movie(
    doc: &TantivyDocument,
    fields: &MovieFields,
) -> Result<MovieRecord, BackendError> {
    Ok(MovieRecord {
        imdb_id: get_first_text(doc, fields.imdb_id)
            .ok_or(BackendError::MissingValue("imdb_id"))?,
        title: get_first_text(doc, fields.title).ok_or(BackendError::MissingValue("title"))?,
        year: get_first_i64(doc, fields.year).ok_or(BackendError::MissingValue("year"))?,
    })
}

fn get_first_text(doc: &TantivyDocument, field: Field) -> Option<String> {
    doc.get_first(field)
        .and_then(|value| match OwnedValue::from(value) {
            OwnedValue::Str(text) => Some(text),
            OwnedValue::PreTokStr(pre) => Some(pre.text),
            _ => None,
        })
}

fn get_first_i64(doc: &TantivyDocument, field: Field) -> Option<i64> {
    doc.get_first(field)
        .and_then(|value| match OwnedValue::from(value) {
            OwnedValue::I64(v) => Some(v),
            OwnedValue::U64(v) => i64::try_from(v).ok(),
            _ => None,
        })
}
