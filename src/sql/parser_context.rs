use std::sync::Arc;

use crate::metamodel::{CollectionPersister, EntityPersister};
use crate::results::PropertyResults;

/// Alias knowledge the SQL rewriter needs to expand `{...}` placeholders.
pub trait ParserContext {
    fn entity_persister(&self, alias: &str) -> Option<Arc<dyn EntityPersister>>;

    fn collection_persister(&self, alias: &str) -> Option<Arc<dyn CollectionPersister>>;

    fn entity_suffix(&self, alias: &str) -> Option<&str>;

    fn collection_suffix(&self, alias: &str) -> Option<&str>;

    /// User-supplied column aliases registered for the alias, if any.
    fn property_results(&self, alias: &str) -> Option<&PropertyResults>;

    fn is_entity_alias(&self, alias: &str) -> bool {
        self.entity_persister(alias).is_some()
    }

    fn is_collection_alias(&self, alias: &str) -> bool {
        self.collection_persister(alias).is_some()
    }
}
