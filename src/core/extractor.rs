use crate::domain::model::{ExtractionResult, ImageReference, Workload};
use crate::utils::error::ExtractionError;

/// Collects the ECR images a workload runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageExtractor;

impl ImageExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Walks containers then init containers and keeps every ECR image once,
    /// in first-seen order. Non-ECR and path-less images are skipped.
    pub fn scan(&self, workload: &Workload) -> ExtractionResult {
        let mut result = ExtractionResult::default();

        for container in workload.all_containers() {
            let Some(reference) = ImageReference::parse(&container.image) else {
                tracing::trace!(image = %container.image, "skipping non-ecr image");
                continue;
            };
            tracing::trace!(
                registry = %reference.registry,
                repository = %reference.repository,
                by_digest = reference.version.is_digest(),
                "found ecr image"
            );
            if result.registry.is_empty() {
                result.registry = reference.registry.clone();
            }
            let image = reference.path();
            if !result.images.iter().any(|seen| seen == image) {
                result.images.push(image.to_string());
            }
        }

        result
    }

    /// [`Self::scan`] plus the cardinality rules of the admission workflow.
    pub fn extract(&self, workload: &Workload) -> Result<ExtractionResult, ExtractionError> {
        let result = self.scan(workload);
        match result.images.len() {
            0 => Err(ExtractionError::ImagesNotFound),
            1 => Ok(result),
            count => Err(ExtractionError::MultiImagesNotSupported { count }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Container;

    const REGISTRY: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com";
    const TAGGED: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/namespace/repo:40d6072";
    const UNTAGGED: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/namespace/repo@sha256:e5e2a3236e64483c50dd2811e46e9cd49c67e82271e60d112ca69a075fc23005";

    fn workload(images: &[&str]) -> Workload {
        Workload {
            namespace: "apps".to_string(),
            containers: images
                .iter()
                .map(|image| Container {
                    image: image.to_string(),
                })
                .collect(),
            init_containers: vec![],
        }
    }

    #[test]
    fn test_scan_cases() {
        let cases: Vec<(&str, Vec<&str>, Vec<&str>)> = vec![
            ("untagged", vec![UNTAGGED], vec![&UNTAGGED[REGISTRY.len() + 1..]]),
            ("tagged", vec![TAGGED], vec!["namespace/repo:40d6072"]),
            (
                "china",
                vec!["123456789012.dkr.ecr.cn-north-1.amazonaws.com.cn/namespace/repo:40d6072"],
                vec!["namespace/repo:40d6072"],
            ),
            (
                "fips",
                vec!["123456789012.dkr.ecr-fips.us-east-1.amazonaws.com/namespace/repo:40d6072"],
                vec!["namespace/repo:40d6072"],
            ),
            ("duplicates", vec![TAGGED, TAGGED], vec!["namespace/repo:40d6072"]),
            (
                "two images",
                vec![TAGGED, UNTAGGED],
                vec!["namespace/repo:40d6072", &UNTAGGED[REGISTRY.len() + 1..]],
            ),
            (
                "no namespace",
                vec!["123456789012.dkr.ecr.us-east-1.amazonaws.com/repo:40d6072"],
                vec!["repo:40d6072"],
            ),
            ("no images", vec![""], vec![]),
            ("bad image", vec!["elgoog/sselortsid"], vec![]),
        ];

        for (name, images, want) in cases {
            let got = ImageExtractor::new().scan(&workload(&images));
            assert_eq!(got.images, want, "case {name}");
        }
    }

    #[test]
    fn test_first_registry_wins_and_init_containers_follow() {
        let mut w = workload(&["quay.io/foo/bar:1.0", TAGGED]);
        w.init_containers.push(Container {
            image: "210987654321.dkr.ecr.eu-west-1.amazonaws.com/init-tools:1".to_string(),
        });

        let result = ImageExtractor::new().scan(&w);
        assert_eq!(result.registry, REGISTRY);
        assert_eq!(result.images, vec!["namespace/repo:40d6072", "init-tools:1"]);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let w = workload(&[UNTAGGED, TAGGED, UNTAGGED]);
        let extractor = ImageExtractor::new();
        assert_eq!(extractor.scan(&w), extractor.scan(&w));
    }

    #[test]
    fn test_extract_cardinality() {
        let extractor = ImageExtractor::new();

        let none = workload(&["quay.io/foo/bar:1.0"]);
        assert!(extractor.scan(&none).images.is_empty());
        assert_eq!(extractor.extract(&none), Err(ExtractionError::ImagesNotFound));

        assert_eq!(
            extractor.extract(&workload(&[TAGGED, UNTAGGED])),
            Err(ExtractionError::MultiImagesNotSupported { count: 2 })
        );

        let single = extractor.extract(&workload(&[TAGGED, TAGGED])).unwrap();
        assert_eq!(single.registry, REGISTRY);
        assert_eq!(single.images.len(), 1);
    }
}
