//! Spec/description comparison.
//!
//! The remote API fixes a job's configuration at creation time. If the
//! declared spec stops matching the live description (the spec was edited
//! after creation), the job cannot be brought back into line and the
//! object is marked failed with a readable diff. Only creation-fixed
//! fields participate; statuses legitimately evolve and are excluded.

use std::collections::BTreeMap;

use lodestar_remote::types::JobDescription;

use crate::object::TrainingJobSpec;

/// A single mismatched field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDifference {
    /// Spec field name.
    pub field: &'static str,
    /// Value the spec declares.
    pub declared: String,
    /// Value the remote job actually has.
    pub observed: String,
}

/// Result of comparing a declared spec against a live description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecComparison {
    pub equal: bool,
    /// Differences in spec declaration order; stable across invocations
    /// so repeated drift reports are byte-identical.
    pub differences: Vec<FieldDifference>,
}

fn render_hyperparameters(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Compare the declared spec against the remote description over
/// creation-fixed fields, in declaration order.
#[must_use]
pub fn spec_matches_description(
    spec: &TrainingJobSpec,
    description: &JobDescription,
) -> SpecComparison {
    let mut differences = Vec::new();
    let mut push = |field: &'static str, declared: String, observed: String| {
        if declared != observed {
            differences.push(FieldDifference {
                field,
                declared,
                observed,
            });
        }
    };

    if let Some(job_name) = spec.job_name.as_deref() {
        push(
            "job_name",
            job_name.to_string(),
            description.training_job_name.clone(),
        );
    }
    push(
        "training_image",
        spec.training_image.clone(),
        description.training_image.clone(),
    );
    push(
        "instance_type",
        spec.instance_type.clone(),
        description.instance_type.clone(),
    );
    push(
        "instance_count",
        spec.instance_count.to_string(),
        description.instance_count.to_string(),
    );
    push(
        "max_runtime_secs",
        spec.max_runtime_secs.to_string(),
        description.max_runtime_in_seconds.to_string(),
    );
    push(
        "hyperparameters",
        render_hyperparameters(&spec.hyperparameters),
        render_hyperparameters(&description.hyper_parameters),
    );
    push(
        "output_location.base_path",
        spec.output_location.base_path.clone(),
        description.output_path.clone(),
    );

    SpecComparison {
        equal: differences.is_empty(),
        differences,
    }
}

/// Render the drift report persisted into the object's status. The text
/// is deterministic for a given diff so repeated passes write identical
/// status values.
#[must_use]
pub fn drift_failure_message(differences: &[FieldDifference]) -> String {
    let rendered = differences
        .iter()
        .map(|d| {
            format!(
                "{}: declared '{}', observed '{}'",
                d.field, d.declared, d.observed
            )
        })
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "Declared spec no longer matches the remote job, which cannot be \
         updated after creation. Differences: {rendered}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::OutputLocation;
    use lodestar_remote::types::JobStatus;

    fn spec() -> TrainingJobSpec {
        TrainingJobSpec {
            job_name: Some("mnist-abc".to_string()),
            region: "us-west-2".to_string(),
            endpoint: None,
            training_image: "registry.example.com/mnist:1".to_string(),
            instance_type: "gpu.xlarge".to_string(),
            instance_count: 2,
            max_runtime_secs: 3600,
            hyperparameters: [
                ("epochs".to_string(), "10".to_string()),
                ("lr".to_string(), "0.01".to_string()),
            ]
            .into(),
            output_location: OutputLocation {
                base_path: "s3://bucket/prefix/".to_string(),
            },
        }
    }

    fn matching_description() -> JobDescription {
        JobDescription {
            training_job_name: "mnist-abc".to_string(),
            training_job_status: JobStatus::InProgress,
            secondary_status: "Training".to_string(),
            failure_reason: None,
            training_image: "registry.example.com/mnist:1".to_string(),
            instance_type: "gpu.xlarge".to_string(),
            instance_count: 2,
            max_runtime_in_seconds: 3600,
            hyper_parameters: [
                ("epochs".to_string(), "10".to_string()),
                ("lr".to_string(), "0.01".to_string()),
            ]
            .into(),
            output_path: "s3://bucket/prefix/".to_string(),
        }
    }

    #[test]
    fn test_matching_spec_is_equal() {
        let comparison = spec_matches_description(&spec(), &matching_description());
        assert!(comparison.equal);
        assert!(comparison.differences.is_empty());
    }

    #[test]
    fn test_status_fields_are_excluded() {
        let mut description = matching_description();
        description.training_job_status = JobStatus::Completed;
        description.secondary_status = "Uploading".to_string();
        assert!(spec_matches_description(&spec(), &description).equal);
    }

    #[test]
    fn test_differences_follow_declaration_order() {
        let mut description = matching_description();
        description.output_path = "s3://other/".to_string();
        description.training_image = "registry.example.com/mnist:2".to_string();
        description.instance_count = 4;

        let comparison = spec_matches_description(&spec(), &description);
        assert!(!comparison.equal);
        let fields: Vec<_> = comparison.differences.iter().map(|d| d.field).collect();
        assert_eq!(
            fields,
            vec!["training_image", "instance_count", "output_location.base_path"]
        );
    }

    #[test]
    fn test_diff_is_deterministic() {
        let mut description = matching_description();
        description.hyper_parameters.insert("lr".to_string(), "0.1".to_string());
        description.instance_type = "cpu.large".to_string();

        let a = spec_matches_description(&spec(), &description);
        let b = spec_matches_description(&spec(), &description);
        assert_eq!(a, b);
        assert_eq!(
            drift_failure_message(&a.differences),
            drift_failure_message(&b.differences)
        );
    }

    #[test]
    fn test_drift_message_names_fields() {
        let mut description = matching_description();
        description.instance_type = "cpu.large".to_string();
        let comparison = spec_matches_description(&spec(), &description);
        let message = drift_failure_message(&comparison.differences);
        assert!(message.contains("instance_type: declared 'gpu.xlarge', observed 'cpu.large'"));
    }
}
