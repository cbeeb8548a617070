use async_trait::async_trait;
use quarry_core::{
    api_path, build_batch, build_query, ensure_object_ids, to_records, ApiWrapper, BatchEntry,
    BatchResponse, Browser, Error, Method, OperationTag, Record, RequestOptions, Result,
    SearchResponse, TaskId, TaskPoller, TaskStatus, TaskStatusSource, WriteReceipt, OBJECT_ID,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::pages::{ObjectPages, PagedResource, SearchPages};

/// Handle on one remote index.
///
/// Cloning is cheap: clones share the same transport.
#[derive(Clone)]
pub struct Index {
    name: String,
    api: Arc<dyn ApiWrapper>,
    wait_task_retries: Option<u32>,
}

/// What `fresh_objects` did, step by step
#[derive(Debug, Clone)]
pub struct FreshObjectsOutcome {
    /// Name of the temporary index that was moved over this one
    pub tmp_index: String,
    pub copy: WriteReceipt,
    pub batch: BatchResponse,
    pub moved: WriteReceipt,
}

#[derive(Deserialize)]
struct MultipleObjects<T> {
    results: Vec<Option<T>>,
}

#[derive(Serialize)]
struct ObjectRequest<'a> {
    #[serde(rename = "indexName")]
    index_name: &'a str,
    #[serde(rename = "objectID")]
    object_id: &'a str,
    #[serde(rename = "attributesToRetrieve", skip_serializing_if = "Option::is_none")]
    attributes_to_retrieve: Option<String>,
}

fn forward_to_replicas() -> RequestOptions {
    RequestOptions::new().with_query_parameter("forwardToReplicas", true)
}

impl Index {
    pub fn new(name: impl Into<String>, api: Arc<dyn ApiWrapper>) -> Self {
        Self {
            name: name.into(),
            api,
            wait_task_retries: None,
        }
    }

    /// Override the process-wide status query budget used by `wait_task`
    pub fn with_wait_task_retries(mut self, retries: u32) -> Self {
        self.wait_task_retries = Some(retries);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle on another index sharing this one's transport and settings
    fn sibling(&self, name: impl Into<String>) -> Index {
        Index {
            name: name.into(),
            api: self.api.clone(),
            wait_task_retries: self.wait_task_retries,
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}{}", api_path("/1/indexes/{}", &[self.name.as_str()]), suffix)
    }

    fn path_with(&self, suffix: &str, segment: &str) -> String {
        format!(
            "{}{}",
            api_path("/1/indexes/{}", &[self.name.as_str()]),
            api_path(suffix, &[segment])
        )
    }

    async fn read<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        let response = self.api.read(method, path, options).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<T> {
        let response = self.api.write(method, path, body, options).await?;
        Ok(serde_json::from_value(response)?)
    }

    // ---- search & settings ----

    pub async fn search(&self, query: &str, options: &RequestOptions) -> Result<SearchResponse> {
        let options = options.clone().with_body_parameter("query", query);
        self.read(Method::Post, &self.path("/query"), &options).await
    }

    /// Remove every object, keeping settings, synonyms and rules
    pub async fn clear(&self, options: &RequestOptions) -> Result<WriteReceipt> {
        self.write(Method::Post, &self.path("/clear"), json!({}), options)
            .await
    }

    pub async fn get_settings(&self, options: &RequestOptions) -> Result<Value> {
        let defaults = RequestOptions::new().with_query_parameter("getVersion", 2);
        self.read(Method::Get, &self.path("/settings"), &options.merged_over(defaults))
            .await
    }

    pub async fn set_settings<T: Serialize + ?Sized>(
        &self,
        settings: &T,
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        let body = serde_json::to_value(settings)?;
        self.write(
            Method::Put,
            &self.path("/settings"),
            body,
            &options.merged_over(forward_to_replicas()),
        )
        .await
    }

    // ---- objects ----

    pub async fn get_object<T: DeserializeOwned>(
        &self,
        object_id: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        self.read(Method::Get, &self.path_with("/{}", object_id), options)
            .await
    }

    /// Fetch several objects at once; missing objects come back as `None`.
    ///
    /// An empty `attributes_to_retrieve` retrieves every attribute.
    pub async fn get_objects<T: DeserializeOwned>(
        &self,
        object_ids: &[&str],
        attributes_to_retrieve: &[&str],
        options: &RequestOptions,
    ) -> Result<Vec<Option<T>>> {
        let attributes =
            (!attributes_to_retrieve.is_empty()).then(|| attributes_to_retrieve.join(","));
        let requests: Vec<ObjectRequest<'_>> = object_ids
            .iter()
            .map(|id| ObjectRequest {
                index_name: &self.name,
                object_id: id,
                attributes_to_retrieve: attributes.clone(),
            })
            .collect();

        let options = options
            .clone()
            .with_body_parameter("requests", serde_json::to_value(&requests)?);
        let response: MultipleObjects<T> = self
            .read(Method::Post, &api_path("/1/indexes/*/objects", &[]), &options)
            .await?;
        Ok(response.results)
    }

    pub async fn save_object<T: Serialize>(
        &self,
        object: &T,
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        self.save_objects(std::slice::from_ref(object), options).await
    }

    /// Add or replace objects; every object needs an `objectID`
    pub async fn save_objects<T: Serialize>(
        &self,
        objects: &[T],
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        self.batch_records(objects, OperationTag::AddObject, options)
            .await
    }

    pub async fn partial_update_object<T: Serialize>(
        &self,
        object: &T,
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        self.partial_update_objects(std::slice::from_ref(object), options)
            .await
    }

    /// Update attributes of existing objects; unknown objectIDs are ignored
    pub async fn partial_update_objects<T: Serialize>(
        &self,
        objects: &[T],
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        self.batch_records(objects, OperationTag::PartialUpdateObjectNoCreate, options)
            .await
    }

    pub async fn partial_update_or_create_object<T: Serialize>(
        &self,
        object: &T,
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        self.partial_update_or_create_objects(std::slice::from_ref(object), options)
            .await
    }

    /// Update attributes, creating objects that do not exist yet
    pub async fn partial_update_or_create_objects<T: Serialize>(
        &self,
        objects: &[T],
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        self.batch_records(objects, OperationTag::PartialUpdateObject, options)
            .await
    }

    /// Replace the whole content of the index with `objects`.
    ///
    /// Runs three writes in sequence: copy this index's settings, synonyms
    /// and rules to a temporary index, save `objects` into it, then move it
    /// over this index. Nothing is rolled back: if the second or third step
    /// fails the temporary index is left behind and must be deleted by the
    /// caller. Its name is logged at `warn` level.
    pub async fn fresh_objects<T: Serialize>(
        &self,
        objects: &[T],
        options: &RequestOptions,
    ) -> Result<FreshObjectsOutcome> {
        let entries = build_batch(to_records(objects)?, OperationTag::AddObject)?;
        let tmp_index = format!("{}_tmp_{}", self.name, uuid::Uuid::new_v4().simple());

        let copy = self
            .copy_to(&tmp_index, &["settings", "synonyms", "rules"], options)
            .await?;

        let tmp = self.sibling(tmp_index.clone());
        let batch = match tmp.batch(&entries, options).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(index = %self.name, tmp_index = %tmp_index, "Saving objects into temporary index failed; temporary index left behind: {}", e);
                return Err(e);
            }
        };

        let moved = match tmp.move_to(&self.name, options).await {
            Ok(moved) => moved,
            Err(e) => {
                warn!(index = %self.name, tmp_index = %tmp_index, "Moving temporary index failed; temporary index left behind: {}", e);
                return Err(e);
            }
        };

        info!(index = %self.name, objects = entries.len(), "Replaced index content");
        Ok(FreshObjectsOutcome {
            tmp_index,
            copy,
            batch,
            moved,
        })
    }

    /// Copy this index to `destination`, limited to `scope` when non-empty
    pub async fn copy_to(
        &self,
        destination: &str,
        scope: &[&str],
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        let mut body = json!({"operation": "copy", "destination": destination});
        if !scope.is_empty() {
            body["scope"] = json!(scope);
        }
        self.write(Method::Post, &self.path("/operation"), body, options)
            .await
    }

    /// Rename this index to `destination`, replacing it if it exists
    pub async fn move_to(&self, destination: &str, options: &RequestOptions) -> Result<WriteReceipt> {
        let body = json!({"operation": "move", "destination": destination});
        self.write(Method::Post, &self.path("/operation"), body, options)
            .await
    }

    pub async fn delete_object(
        &self,
        object_id: &str,
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        self.delete_objects(&[object_id], options).await
    }

    pub async fn delete_objects(
        &self,
        object_ids: &[&str],
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        let records: Vec<Record> = object_ids
            .iter()
            .map(|id| {
                let mut record = Record::new();
                record.insert(OBJECT_ID.to_string(), Value::String(id.to_string()));
                record
            })
            .collect();
        let entries = build_batch(records, OperationTag::DeleteObject)?;
        self.batch(&entries, options).await
    }

    /// Delete every object matching the given search parameters
    pub async fn delete_by(&self, args: &Record, options: &RequestOptions) -> Result<WriteReceipt> {
        let body = json!({"params": build_query(args)});
        self.write(Method::Post, &self.path("/deleteByQuery"), body, options)
            .await
    }

    pub async fn batch(
        &self,
        entries: &[BatchEntry],
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        let body = json!({"requests": entries});
        self.write(Method::Post, &self.path("/batch"), body, options)
            .await
    }

    async fn batch_records<T: Serialize>(
        &self,
        objects: &[T],
        operation: OperationTag,
        options: &RequestOptions,
    ) -> Result<BatchResponse> {
        let entries = build_batch(to_records(objects)?, operation)?;
        self.batch(&entries, options).await
    }

    /// Browse every object of the index, one page at a time.
    ///
    /// A `cursor` body parameter in `options` resumes a previous browse from
    /// that cursor. It must be a string; an empty string starts over.
    pub fn browse(&self, options: &RequestOptions) -> Result<Browser<ObjectPages>> {
        let mut options = options.clone();
        let resume = match options.remove_body_parameter("cursor") {
            None | Some(Value::Null) => None,
            Some(Value::String(cursor)) if cursor.is_empty() => None,
            Some(Value::String(cursor)) => Some(cursor),
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "browse cursor must be a string, got {}",
                    other
                )))
            }
        };

        let browser = Browser::new(ObjectPages::new(self.api.clone(), &self.name), options);
        Ok(match resume {
            Some(cursor) => browser.resume_from(cursor),
            None => browser,
        })
    }

    // ---- synonyms ----

    pub async fn search_synonyms(
        &self,
        query: &str,
        options: &RequestOptions,
    ) -> Result<SearchResponse> {
        let options = options.clone().with_body_parameter("query", query);
        self.read(Method::Post, &self.path("/synonyms/search"), &options)
            .await
    }

    pub async fn get_synonym<T: DeserializeOwned>(
        &self,
        object_id: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        self.read(
            Method::Get,
            &self.path_with("/synonyms/{}", object_id),
            options,
        )
        .await
    }

    pub async fn save_synonym<T: Serialize>(
        &self,
        synonym: &T,
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        self.save_synonyms(std::slice::from_ref(synonym), options)
            .await
    }

    pub async fn save_synonyms<T: Serialize>(
        &self,
        synonyms: &[T],
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        self.save_resources(
            synonyms,
            "/synonyms/batch",
            "All synonyms must have an unique objectID to be valid",
            forward_to_replicas(),
            options,
        )
        .await
    }

    /// Save `synonyms`, replacing every existing synonym
    pub async fn fresh_synonyms<T: Serialize>(
        &self,
        synonyms: &[T],
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        self.save_resources(
            synonyms,
            "/synonyms/batch",
            "All synonyms must have an unique objectID to be valid",
            forward_to_replicas().with_query_parameter("replaceExistingSynonyms", true),
            options,
        )
        .await
    }

    pub async fn delete_synonym(
        &self,
        object_id: &str,
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        self.write(
            Method::Delete,
            &self.path_with("/synonyms/{}", object_id),
            json!({}),
            &options.merged_over(forward_to_replicas()),
        )
        .await
    }

    pub async fn clear_synonyms(&self, options: &RequestOptions) -> Result<WriteReceipt> {
        self.write(
            Method::Post,
            &self.path("/synonyms/clear"),
            json!({}),
            &options.merged_over(forward_to_replicas()),
        )
        .await
    }

    pub fn browse_synonyms(&self, options: &RequestOptions) -> Browser<SearchPages> {
        Browser::new(
            SearchPages::new(self.api.clone(), &self.name, PagedResource::Synonyms),
            options.clone(),
        )
    }

    // ---- rules ----

    pub async fn search_rules(&self, query: &str, options: &RequestOptions) -> Result<SearchResponse> {
        let options = options.clone().with_body_parameter("query", query);
        self.read(Method::Post, &self.path("/rules/search"), &options)
            .await
    }

    pub async fn get_rule<T: DeserializeOwned>(
        &self,
        object_id: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        self.read(Method::Get, &self.path_with("/rules/{}", object_id), options)
            .await
    }

    pub async fn save_rule<T: Serialize>(
        &self,
        rule: &T,
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        self.save_rules(std::slice::from_ref(rule), options).await
    }

    pub async fn save_rules<T: Serialize>(
        &self,
        rules: &[T],
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        self.save_resources(
            rules,
            "/rules/batch",
            "All rules must have an unique objectID to be valid",
            forward_to_replicas(),
            options,
        )
        .await
    }

    /// Save `rules`, clearing every existing rule
    pub async fn fresh_rules<T: Serialize>(
        &self,
        rules: &[T],
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        self.save_resources(
            rules,
            "/rules/batch",
            "All rules must have an unique objectID to be valid",
            forward_to_replicas().with_query_parameter("clearExistingRules", true),
            options,
        )
        .await
    }

    pub async fn delete_rule(&self, object_id: &str, options: &RequestOptions) -> Result<WriteReceipt> {
        self.write(
            Method::Delete,
            &self.path_with("/rules/{}", object_id),
            json!({}),
            &options.merged_over(forward_to_replicas()),
        )
        .await
    }

    pub async fn clear_rules(&self, options: &RequestOptions) -> Result<WriteReceipt> {
        self.write(
            Method::Post,
            &self.path("/rules/clear"),
            json!({}),
            &options.merged_over(forward_to_replicas()),
        )
        .await
    }

    pub fn browse_rules(&self, options: &RequestOptions) -> Browser<SearchPages> {
        Browser::new(
            SearchPages::new(self.api.clone(), &self.name, PagedResource::Rules),
            options.clone(),
        )
    }

    async fn save_resources<T: Serialize>(
        &self,
        items: &[T],
        suffix: &str,
        message: &str,
        defaults: RequestOptions,
        options: &RequestOptions,
    ) -> Result<WriteReceipt> {
        let records = to_records(items)?;
        ensure_object_ids(&records, message)?;

        let body = Value::Array(records.into_iter().map(Value::Object).collect());
        self.write(Method::Post, &self.path(suffix), body, &options.merged_over(defaults))
            .await
    }

    // ---- tasks ----

    pub async fn get_task(&self, task_id: TaskId, options: &RequestOptions) -> Result<TaskStatus> {
        self.read(
            Method::Get,
            &self.path_with("/task/{}", &task_id.to_string()),
            options,
        )
        .await
    }

    /// Poller configured with this index's status query budget
    pub fn task_poller(&self) -> TaskPoller {
        match self.wait_task_retries {
            Some(retries) => TaskPoller::new(retries),
            None => TaskPoller::default(),
        }
    }

    /// Block until `task_id` is published or the status query budget runs out
    pub async fn wait_task(&self, task_id: TaskId, options: &RequestOptions) -> Result<TaskStatus> {
        self.task_poller().wait(self, task_id, options).await
    }

    pub async fn wait_task_with_attempts(
        &self,
        task_id: TaskId,
        max_attempts: u32,
        options: &RequestOptions,
    ) -> Result<TaskStatus> {
        TaskPoller::new(max_attempts)
            .wait(self, task_id, options)
            .await
    }

    // ---- legacy index-scoped API keys ----

    pub async fn get_deprecated_index_api_key(
        &self,
        key: &str,
        options: &RequestOptions,
    ) -> Result<Value> {
        self.read(Method::Get, &self.path_with("/keys/{}", key), options)
            .await
    }

    pub async fn delete_deprecated_index_api_key(
        &self,
        key: &str,
        options: &RequestOptions,
    ) -> Result<Value> {
        self.write(
            Method::Delete,
            &self.path_with("/keys/{}", key),
            json!({}),
            options,
        )
        .await
    }
}

#[async_trait]
impl TaskStatusSource for Index {
    async fn task_status(&self, task_id: TaskId, options: &RequestOptions) -> Result<TaskStatus> {
        self.get_task(task_id, options).await
    }
}
