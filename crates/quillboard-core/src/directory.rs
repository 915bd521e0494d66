// Post type lookups with caching support
use crate::config::CacheConfig;
use crate::Result;
use quillboard_api::post_types::{FieldDefinition, FieldDraft, PostType, PostTypeDraft};
use quillboard_api::ApiClient;
use quillboard_cache::MemoryCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const POST_TYPES_PREFIX: &str = "post_types";
const FIELDS_PREFIX: &str = "fields";

/// Post type catalog that checks cache before hitting the API
///
/// Post types and their field definitions drive every dynamic content
/// screen, so they are requested constantly but change rarely. Reads go
/// through the cache; any mutation invalidates the affected entries.
pub struct PostTypeDirectory {
    client: ApiClient,
    cache: Arc<MemoryCache>,
    post_types_ttl: Duration,
    fields_ttl: Duration,
}

impl PostTypeDirectory {
    pub fn new(client: ApiClient, config: &CacheConfig) -> Self {
        Self {
            client,
            cache: Arc::new(MemoryCache::new()),
            post_types_ttl: config.post_types_ttl(),
            fields_ttl: config.fields_ttl(),
        }
    }

    /// List post types with cache-first strategy
    pub async fn all(&self, include_inactive: bool) -> Result<Vec<PostType>> {
        let key = MemoryCache::query_key(POST_TYPES_PREFIX, &include_inactive);

        if let Some(cached) = self.cache.get::<Vec<PostType>>(&key) {
            debug!("Cache hit for post type list");
            return Ok(cached);
        }

        info!("Fetching post types from API");
        let post_types = self.client.list_post_types(include_inactive).await?;
        self.cache.insert(&key, &post_types, self.post_types_ttl)?;

        Ok(post_types)
    }

    /// Look up one post type by slug
    pub async fn by_slug(&self, slug: &str) -> Result<PostType> {
        let key = format!("{}_slug_{}", POST_TYPES_PREFIX, slug);

        if let Some(cached) = self.cache.get::<PostType>(&key) {
            debug!("Cache hit for post type {}", slug);
            return Ok(cached);
        }

        let post_type = self.client.post_type_by_slug(slug).await?;
        self.cache.insert(&key, &post_type, self.post_types_ttl)?;

        Ok(post_type)
    }

    /// Field definitions for a post type
    pub async fn fields(&self, post_type_id: &str) -> Result<Vec<FieldDefinition>> {
        let key = format!("{}_{}", FIELDS_PREFIX, post_type_id);

        if let Some(cached) = self.cache.get::<Vec<FieldDefinition>>(&key) {
            debug!("Cache hit for fields of {}", post_type_id);
            return Ok(cached);
        }

        let fields = self.client.list_fields(post_type_id).await?;
        self.cache.insert(&key, &fields, self.fields_ttl)?;

        Ok(fields)
    }

    // Mutations pass straight through and drop the stale entries.

    pub async fn create(&self, draft: &PostTypeDraft) -> Result<PostType> {
        let created = self.client.create_post_type(draft).await?;
        self.cache.clear_matching(POST_TYPES_PREFIX);
        Ok(created)
    }

    pub async fn update(&self, id: &str, draft: &PostTypeDraft) -> Result<PostType> {
        let updated = self.client.update_post_type(id, draft).await?;
        self.cache.clear_matching(POST_TYPES_PREFIX);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete_post_type(id).await?;
        self.cache.clear_matching(POST_TYPES_PREFIX);
        self.cache.remove(&format!("{}_{}", FIELDS_PREFIX, id));
        Ok(())
    }

    pub async fn create_field(
        &self,
        post_type_id: &str,
        draft: &FieldDraft,
    ) -> Result<FieldDefinition> {
        let created = self.client.create_field(post_type_id, draft).await?;
        self.invalidate_fields(post_type_id);
        Ok(created)
    }

    pub async fn update_field(
        &self,
        post_type_id: &str,
        field_id: &str,
        draft: &FieldDraft,
    ) -> Result<FieldDefinition> {
        let updated = self.client.update_field(post_type_id, field_id, draft).await?;
        self.invalidate_fields(post_type_id);
        Ok(updated)
    }

    pub async fn reorder_fields(
        &self,
        post_type_id: &str,
        field_ids: &[String],
    ) -> Result<Vec<FieldDefinition>> {
        let reordered = self.client.reorder_fields(post_type_id, field_ids).await?;
        self.invalidate_fields(post_type_id);
        Ok(reordered)
    }

    pub async fn delete_field(&self, post_type_id: &str, field_id: &str) -> Result<()> {
        self.client.delete_field(post_type_id, field_id).await?;
        self.invalidate_fields(post_type_id);
        Ok(())
    }

    /// Drop all cached state, e.g. on logout
    pub fn clear(&self) {
        self.cache.clear();
    }

    fn invalidate_fields(&self, post_type_id: &str) {
        self.cache.remove(&format!("{}_{}", FIELDS_PREFIX, post_type_id));
        // Nested fieldDefinitions in cached post types are stale too
        self.cache.clear_matching(POST_TYPES_PREFIX);
    }
}
