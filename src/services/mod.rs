pub(crate) mod access_policy;
pub(crate) mod attempts;
pub(crate) mod quiz_content;
pub(crate) mod scoring;
