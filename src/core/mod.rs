pub mod export;
pub mod store;

use std::future::Future;

/// External natural-language assistant that splits a free-text block into an
/// ordered list of discrete requirement items. Requirement editors may use it
/// as an optional assist; the core store never depends on it and no
/// implementation ships with this crate.
pub trait RequirementsAssist {
    fn split_requirements(&self, text: &str)
    -> impl Future<Output = anyhow::Result<Vec<String>>>;
}
