/// Request filter parsing and deduplication
///
/// List endpoints accept filters as plain query-string values:
/// comma-separated id lists (`tags=1,2,3`) and a `0`/`1` flag for the
/// assigned-only views. This module turns those raw strings into typed
/// filter descriptors before any query runs.
///
/// Malformed filter input is a request-level error, never a silent
/// empty result: a client sending `tags=abc` has a bug and should hear
/// about it.
///
/// # Example
///
/// ```
/// use curio_shared::filter::{parse_id_list, CollectionFilter};
///
/// let ids = parse_id_list("3,7,11").unwrap();
/// assert_eq!(ids, vec![3, 7, 11]);
///
/// let filter = CollectionFilter::from_params(Some("1,2"), None).unwrap();
/// assert_eq!(filter.tag_ids, Some(vec![1, 2]));
/// assert!(filter.item_ids.is_none());
/// ```

use std::collections::HashSet;

/// Error type for filter parsing
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterError {
    /// A value in a comma-separated id list was not an integer
    #[error("invalid id in filter parameter: {0:?}")]
    InvalidId(String),

    /// A boolean flag parameter was not `0` or `1`
    #[error("invalid flag value: {0:?} (expected 0 or 1)")]
    InvalidFlag(String),
}

/// Parses a comma-separated list of integer ids
///
/// Surrounding whitespace around each id is tolerated. Empty segments
/// (including a fully empty string) and non-integer segments are
/// rejected.
///
/// # Errors
///
/// Returns `FilterError::InvalidId` for any segment that does not
/// parse as an `i64`.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, FilterError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| FilterError::InvalidId(part.trim().to_string()))
        })
        .collect()
}

/// Parses a `0`/`1` query flag (e.g., `assigned_only`)
///
/// A missing parameter is `false`.
///
/// # Errors
///
/// Returns `FilterError::InvalidFlag` for any other value.
pub fn parse_flag(raw: Option<&str>) -> Result<bool, FilterError> {
    match raw {
        None => Ok(false),
        Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => Err(FilterError::InvalidFlag(other.to_string())),
    }
}

/// Filter descriptor for collection listing
///
/// Semantics: OR within each id list (a collection matches a dimension
/// if it contains at least one of the listed ids), AND between the two
/// dimensions. `None` means the dimension is unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFilter {
    /// Restrict to collections containing at least one of these tags
    pub tag_ids: Option<Vec<i64>>,

    /// Restrict to collections containing at least one of these items
    pub item_ids: Option<Vec<i64>>,
}

impl CollectionFilter {
    /// Builds a filter from the raw `tags` / `items` query parameters
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidId` if either list fails to parse.
    pub fn from_params(tags: Option<&str>, items: Option<&str>) -> Result<Self, FilterError> {
        Ok(Self {
            tag_ids: tags.map(parse_id_list).transpose()?,
            item_ids: items.map(parse_id_list).transpose()?,
        })
    }
}

/// Deduplicates rows by key, preserving first-occurrence order
///
/// Join queries return one row per association, so an entity referenced
/// by N collections appears N times. The distinct step is done here, as
/// an explicit set pass over the ordered rows, rather than hidden
/// inside the SQL.
pub fn dedup_by_id<T, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> i64,
{
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(key(row)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("42").unwrap(), vec![42]);
        assert_eq!(parse_id_list(" 1 , 2 ").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_parse_id_list_rejects_garbage() {
        assert_eq!(
            parse_id_list("1,abc"),
            Err(FilterError::InvalidId("abc".to_string()))
        );
        assert_eq!(parse_id_list(""), Err(FilterError::InvalidId(String::new())));
        assert_eq!(
            parse_id_list("1,,2"),
            Err(FilterError::InvalidId(String::new()))
        );
        assert_eq!(
            parse_id_list("1.5"),
            Err(FilterError::InvalidId("1.5".to_string()))
        );
    }

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag(None).unwrap());
        assert!(!parse_flag(Some("0")).unwrap());
        assert!(parse_flag(Some("1")).unwrap());
        assert_eq!(
            parse_flag(Some("true")),
            Err(FilterError::InvalidFlag("true".to_string()))
        );
    }

    #[test]
    fn test_collection_filter_from_params() {
        let filter = CollectionFilter::from_params(Some("1,2"), Some("9")).unwrap();
        assert_eq!(filter.tag_ids, Some(vec![1, 2]));
        assert_eq!(filter.item_ids, Some(vec![9]));

        let empty = CollectionFilter::from_params(None, None).unwrap();
        assert_eq!(empty, CollectionFilter::default());
    }

    #[test]
    fn test_collection_filter_propagates_parse_errors() {
        let result = CollectionFilter::from_params(Some("1,x"), None);
        assert_eq!(result, Err(FilterError::InvalidId("x".to_string())));
    }

    #[test]
    fn test_dedup_by_id_preserves_order() {
        let rows = vec![(3, "c"), (1, "a"), (3, "c"), (2, "b"), (1, "a")];
        let deduped = dedup_by_id(rows, |row| row.0);
        assert_eq!(deduped, vec![(3, "c"), (1, "a"), (2, "b")]);
    }

    #[test]
    fn test_dedup_by_id_empty() {
        let rows: Vec<(i64, &str)> = vec![];
        assert!(dedup_by_id(rows, |row| row.0).is_empty());
    }
}
