//! Structural checks run right before a SparkApplication is created

use sparkgate_common::SparkApplicationSpec;

use crate::error::{Result, SubmissionError};

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Require either a top-level image or images for both driver and executor.
pub fn validate(spec: &SparkApplicationSpec) -> Result<()> {
    if !is_set(&spec.image) && (!is_set(&spec.driver.image) || !is_set(&spec.executor.image)) {
        return Err(SubmissionError::validation(
            "image must be set, either at the top level or for both driver and executor",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(top: Option<&str>, driver: Option<&str>, executor: Option<&str>) -> SparkApplicationSpec {
        let mut spec = SparkApplicationSpec {
            image: top.map(String::from),
            ..Default::default()
        };
        spec.driver.image = driver.map(String::from);
        spec.executor.image = executor.map(String::from);
        spec
    }

    #[test]
    fn top_level_image_is_enough() {
        assert!(validate(&spec(Some("spark:3.1"), None, None)).is_ok());
    }

    #[test]
    fn both_role_images_are_enough() {
        assert!(validate(&spec(None, Some("driver:1"), Some("executor:1"))).is_ok());
    }

    #[test]
    fn missing_image_on_any_role_fails() {
        for candidate in [
            spec(None, None, None),
            spec(None, Some("driver:1"), None),
            spec(None, None, Some("executor:1")),
            spec(Some(""), Some("driver:1"), Some("")),
        ] {
            let err = validate(&candidate).unwrap_err();
            assert!(matches!(err, SubmissionError::Validation { .. }));
        }
    }
}
