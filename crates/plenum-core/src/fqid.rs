//! Fully qualified identifiers.
//!
//! Every indexed document is keyed by an FQID of the form
//! `"<collection>/<id>"`, where the id is a positive integer matching the
//! source row's `id` column. Split and join round-trip losslessly; anything
//! else is a domain error.

use crate::error::{Error, Result};

/// Join a collection name and row id into an FQID.
pub fn join(collection: &str, id: i32) -> String {
    format!("{collection}/{id}")
}

/// Split an FQID into its collection name and row id.
///
/// Fails on a missing separator, an empty collection part, or an id that is
/// not a positive integer.
pub fn split(fqid: &str) -> Result<(&str, i32)> {
    let (collection, id_part) = fqid
        .split_once('/')
        .ok_or_else(|| Error::InvalidFqid(fqid.to_string()))?;

    let id: i32 = id_part
        .parse()
        .map_err(|_| Error::InvalidFqid(fqid.to_string()))?;

    if collection.is_empty() || id < 1 {
        return Err(Error::InvalidFqid(fqid.to_string()));
    }

    Ok((collection, id))
}

// ============================================================================
// Tests
// ============================================================================
