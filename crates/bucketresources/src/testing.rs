//! Fixture builders for bucket objects and wire tag sets.

use keel_core::{AccelerateConfiguration, Bucket, Tag, Tagging, VersioningConfiguration};
use keel_s3 as s3;

pub const BUCKET_NAME: &str = "test-bucket";

/// Builds a declared bucket with every facet unset unless a setter is called.
pub struct BucketBuilder {
    bucket: Bucket,
}

impl Default for BucketBuilder {
    fn default() -> Self { Self::new() }
}

impl BucketBuilder {
    pub fn new() -> Self {
        let mut bucket = Bucket::new(BUCKET_NAME);
        bucket.params_mut().acl = Some("private".into());
        bucket.params_mut().location_constraint = Some("us-east-1".into());
        Self { bucket }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.bucket.metadata.name = name.to_string();
        self
    }

    pub fn external_name(mut self, name: &str) -> Self {
        self.bucket.set_external_name(name);
        self
    }

    pub fn tagging(mut self, tagging: Tagging) -> Self {
        self.bucket.params_mut().bucket_tagging = Some(tagging);
        self
    }

    pub fn tags(self, pairs: &[(&str, &str)]) -> Self { self.tagging(Tagging::new(tags(pairs))) }

    pub fn versioning(mut self, conf: VersioningConfiguration) -> Self {
        self.bucket.params_mut().versioning_configuration = Some(conf);
        self
    }

    pub fn acceleration(mut self, conf: AccelerateConfiguration) -> Self {
        self.bucket.params_mut().accelerate_configuration = Some(conf);
        self
    }

    pub fn build(self) -> Bucket { self.bucket }
}

pub fn tags(pairs: &[(&str, &str)]) -> Vec<Tag> { pairs.iter().map(|(k, v)| Tag::new(*k, *v)).collect() }

pub fn wire_tags(pairs: &[(&str, &str)]) -> Vec<s3::Tag> { pairs.iter().map(|(k, v)| s3::Tag::new(*k, *v)).collect() }

/// Wire form of declared tags, in declared order.
pub fn copy_tags(tags: &[Tag]) -> Vec<s3::Tag> { tags.iter().map(|t| s3::Tag::new(t.key.clone(), t.value.clone())).collect() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_leave_facets_unset() {
        let b = BucketBuilder::new().build();
        assert_eq!(b.external_name(), BUCKET_NAME);
        assert!(b.params().bucket_tagging.is_none());
        assert!(b.params().versioning_configuration.is_none());
        assert!(b.params().accelerate_configuration.is_none());
        assert_eq!(b.params().acl.as_deref(), Some("private"));
    }

    #[test]
    fn copy_tags_keeps_order() {
        let declared = tags(&[("b", "2"), ("a", "1")]);
        assert_eq!(copy_tags(&declared), wire_tags(&[("b", "2"), ("a", "1")]));
    }
}
