// Selection resolution.
// Disambiguates scalar vs. collection selections by shape up front, never by
// attempting collection access and catching the failure.

use serde::Deserialize;

use crate::catalog::{LocationCatalog, LocationEntry};
use crate::error::{Result, TrackerError};

/// A raw selection from the UI: nothing, one row index, or an ordered list.
///
/// Deserializes from the UI callback value by shape (`null`, `5`, `[5, 2]`),
/// so `5` and `[5]` resolve identically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    #[default]
    None,
    One(usize),
    Many(Vec<usize>),
}

impl From<usize> for Selection {
    fn from(index: usize) -> Self {
        Selection::One(index)
    }
}

impl From<Vec<usize>> for Selection {
    fn from(indices: Vec<usize>) -> Self {
        Selection::Many(indices)
    }
}

/// Resolve a selection against the catalog.
///
/// An absent selection is a benign empty result, not an error. Selection
/// order is preserved, and so are duplicate indices: selecting a location
/// twice yields two entries. The generation check runs first, so indices
/// computed against a since-replaced catalog are rejected rather than
/// silently pointing at different rows.
pub fn resolve(
    selection: &Selection,
    catalog: &LocationCatalog,
    table_generation: u64,
) -> Result<Vec<LocationEntry>> {
    if catalog.generation() != table_generation {
        return Err(TrackerError::StaleCatalog {
            catalog: catalog.generation(),
            table: table_generation,
        });
    }

    let indices: &[usize] = match selection {
        Selection::None => return Ok(Vec::new()),
        Selection::One(index) => std::slice::from_ref(index),
        Selection::Many(indices) => indices,
    };

    indices
        .iter()
        .map(|&index| {
            catalog
                .get(index)
                .cloned()
                .ok_or(TrackerError::InvalidSelector {
                    index,
                    len: catalog.len(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::normalize;

    const SAMPLE: &str = "\
Province/State,Country/Region,1/22/20,1/23/20,1/24/20
,Italy,1,2,3
Hubei,China,5,6,7
";

    fn catalog() -> LocationCatalog {
        LocationCatalog::build(&normalize(SAMPLE).unwrap(), 0)
    }

    #[test]
    fn test_absent_selection_is_empty_not_error() {
        let resolved = resolve(&Selection::None, &catalog(), 0).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_scalar_and_singleton_list_are_equivalent() {
        let catalog = catalog();
        let scalar = resolve(&Selection::One(1), &catalog, 0).unwrap();
        let list = resolve(&Selection::Many(vec![1]), &catalog, 0).unwrap();

        assert_eq!(scalar, list);
        assert_eq!(scalar.len(), 1);
        assert_eq!(scalar[0].index, 1);
        assert_eq!(scalar[0].name, "Hubei, China");
    }

    #[test]
    fn test_selection_order_preserved() {
        let resolved = resolve(&Selection::Many(vec![1, 0]), &catalog(), 0).unwrap();
        assert_eq!(resolved[0].name, "Hubei, China");
        assert_eq!(resolved[1].name, "Italy");
    }

    #[test]
    fn test_duplicates_preserved() {
        let resolved = resolve(&Selection::Many(vec![0, 0]), &catalog(), 0).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0], resolved[1]);
    }

    #[test]
    fn test_out_of_bounds_index_fails() {
        let catalog = catalog();
        let err = resolve(&Selection::One(catalog.len()), &catalog, 0).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidSelector { index: 2, len: 2 }
        ));
    }

    #[test]
    fn test_stale_catalog_fails_before_lookup() {
        let err = resolve(&Selection::One(0), &catalog(), 1).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::StaleCatalog {
                catalog: 0,
                table: 1
            }
        ));
    }

    #[test]
    fn test_selection_deserializes_by_shape() {
        assert_eq!(
            serde_json::from_str::<Selection>("5").unwrap(),
            Selection::One(5)
        );
        assert_eq!(
            serde_json::from_str::<Selection>("[5, 2]").unwrap(),
            Selection::Many(vec![5, 2])
        );
        assert_eq!(
            serde_json::from_str::<Selection>("null").unwrap(),
            Selection::None
        );
    }
}
