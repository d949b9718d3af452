//! Document source trait.

use anyhow::Result;

use crate::models::Document;

/// Yields the documents of a corpus.
///
/// Every document must carry a `source` metadata entry; `page_label` is
/// optional. Order must be stable between runs because chunk ids depend on
/// it.
pub trait DocumentSource {
    fn load(&self) -> Result<Vec<Document>>;
}
