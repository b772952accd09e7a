use std::path::Path;

use serde::Serialize;

use crate::engine::ComponentResults;
use crate::error::NsvbError;
use crate::models::TreeObservation;

fn validated(trees: Vec<TreeObservation>) -> Result<Vec<TreeObservation>, NsvbError> {
    for tree in &trees {
        tree.validate()?;
    }
    Ok(trees)
}

/// Read tree observations from a JSON array.
pub fn read_observations_json(path: impl AsRef<Path>) -> Result<Vec<TreeObservation>, NsvbError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    validated(serde_json::from_str(&content)?)
}

/// Read tree observations from JSON bytes.
pub fn read_observations_json_from_bytes(data: &[u8]) -> Result<Vec<TreeObservation>, NsvbError> {
    let content = std::str::from_utf8(data)
        .map_err(|e| NsvbError::ParseError(format!("Invalid UTF-8: {e}")))?;
    validated(serde_json::from_str(content)?)
}

#[derive(Debug, Serialize)]
struct ResultRecord<'a> {
    observation: &'a TreeObservation,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<&'a ComponentResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Write per-tree results as a JSON array, in input order.
pub fn write_results_json(
    trees: &[TreeObservation],
    results: &[Result<ComponentResults, NsvbError>],
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), NsvbError> {
    if trees.len() != results.len() {
        return Err(NsvbError::ValidationError(format!(
            "{} observations but {} results",
            trees.len(),
            results.len()
        )));
    }
    let records: Vec<ResultRecord> = trees
        .iter()
        .zip(results)
        .map(|(observation, result)| ResultRecord {
            observation,
            results: result.as_ref().ok(),
            error: result.as_ref().err().map(ToString::to_string),
        })
        .collect();
    let content = if pretty {
        serde_json::to_string_pretty(&records)?
    } else {
        serde_json::to_string(&records)?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_observations_json() {
        let data = br#"[
            {"spcd": 202, "dia": 20.0, "ht": 110.0, "division": "240"},
            {"spcd": 631, "dia": 11.3, "ht": 28.0, "cull": 10, "decay_class": 2}
        ]"#;
        let trees = read_observations_json_from_bytes(data).unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].division, "240");
        assert_eq!(trees[1].division, "");
        assert_eq!(trees[1].decay_class, Some(2));
    }

    #[test]
    fn test_invalid_observation_rejected() {
        let data = br#"[{"spcd": 202, "dia": 20.0, "ht": 0.0}]"#;
        assert!(matches!(
            read_observations_json_from_bytes(data),
            Err(NsvbError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            read_observations_json_from_bytes(&[0xff, 0xfe]),
            Err(NsvbError::ParseError(_))
        ));
    }

    #[test]
    fn test_write_results_json_error_entry() {
        let trees = vec![TreeObservation::new(9999, 10.0, 50.0, "")];
        let results = vec![Err(NsvbError::UnknownSpecies(9999))];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_results_json(&trees, &results, &path, true).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &value[0];
        assert_eq!(entry["observation"]["spcd"], 9999);
        assert!(entry.get("results").is_none());
        assert_eq!(entry["error"], "Unknown species code: 9999");
    }
}
