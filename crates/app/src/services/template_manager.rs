//! Template manager — owns the template catalog.

use serde_json::{Map, Value, json};

use taskqueue_domain::capability::CapabilityMask;
use taskqueue_domain::error::{NotFoundError, TaskQueueError, ValidationError};
use taskqueue_domain::task::Task;
use taskqueue_domain::template::{TaskTemplate, parse_document};

use crate::ports::{TemplateDocument, TemplateStore};

/// Version written in the user catalog file.
pub const USER_CATALOG_VERSION: &str = "1.0";

/// Catalog of system and user templates, loaded from a [`TemplateStore`].
///
/// Template ids are unique across both sets.
pub struct TemplateManager<S> {
    store: S,
    templates: Vec<TaskTemplate>,
    initialized: bool,
}

impl<S: TemplateStore> TemplateManager<S> {
    /// Create an empty catalog backed by the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            templates: Vec::new(),
            initialized: false,
        }
    }

    /// Reload the whole catalog from the store, system templates first.
    ///
    /// Invalid entries and duplicate ids are dropped with a warning.
    /// Returns the number of templates loaded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::EmptyCatalog`] when nothing could be loaded,
    /// or a storage error propagated from the store.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&mut self) -> Result<usize, TaskQueueError> {
        self.templates.clear();
        self.initialized = false;

        let system = self.store.system_documents().await?;
        let user = self.store.user_documents().await?;
        let mut loaded: Vec<TaskTemplate> = Vec::new();
        for (documents, is_system) in [(system, true), (user, false)] {
            for TemplateDocument { source, content } in documents {
                for parsed in parse_document(content) {
                    match parsed {
                        Ok(mut template) => {
                            if loaded.iter().any(|t| t.id == template.id) {
                                tracing::warn!(id = %template.id, source = %source, "duplicate template id, dropping");
                                continue;
                            }
                            template.system = is_system;
                            loaded.push(template);
                        }
                        Err(err) => {
                            tracing::warn!(source = %source, error = %err, "skipping invalid template");
                        }
                    }
                }
            }
        }

        if loaded.is_empty() {
            return Err(TaskQueueError::EmptyCatalog);
        }
        let system_count = loaded.iter().filter(|t| t.is_system()).count();
        tracing::info!(
            total = loaded.len(),
            system = system_count,
            user = loaded.len() - system_count,
            "template catalog loaded"
        );
        self.templates = loaded;
        self.initialized = true;
        Ok(self.templates.len())
    }

    /// Same as [`Self::initialize`].
    ///
    /// # Errors
    ///
    /// See [`Self::initialize`].
    pub async fn reload(&mut self) -> Result<usize, TaskQueueError> {
        self.initialize().await
    }

    /// Load the catalog unless it already is.
    ///
    /// # Errors
    ///
    /// See [`Self::initialize`].
    pub async fn ensure_initialized(&mut self) -> Result<(), TaskQueueError> {
        if !self.initialized {
            self.initialize().await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn get_template(&self, id: &str) -> Option<&TaskTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn all_templates(&self) -> &[TaskTemplate] {
        &self.templates
    }

    pub fn templates_by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a TaskTemplate> {
        self.templates.iter().filter(move |t| t.category == category)
    }

    /// Every category in use, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.templates.iter().map(|t| t.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    /// Templates applicable to a device offering `capabilities`.
    pub fn templates_for_device(&self, capabilities: CapabilityMask) -> impl Iterator<Item = &TaskTemplate> {
        self.templates
            .iter()
            .filter(move |t| t.supports_device(capabilities))
    }

    pub fn user_templates(&self) -> impl Iterator<Item = &TaskTemplate> {
        self.templates.iter().filter(|t| !t.is_system())
    }

    /// Derive a user template from a system one, overriding parameter
    /// defaults, and persist the user catalog.
    ///
    /// The new id is `user_<source>`, suffixed `_1`, `_2`… when taken.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::NotFound`] for an unknown source,
    /// [`ValidationError`] when the source is not a system template or the
    /// name is empty, or a storage error; on failure the catalog is unchanged.
    #[tracing::instrument(skip(self, overrides), fields(source = %source_id))]
    pub async fn create_user_template(
        &mut self,
        source_id: &str,
        new_name: &str,
        overrides: &Map<String, Value>,
    ) -> Result<TaskTemplate, TaskQueueError> {
        let source = self.find(source_id)?;
        if !source.is_system() {
            return Err(ValidationError::InvalidTemplate(format!(
                "{source_id} is not a system template"
            ))
            .into());
        }
        if new_name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let mut template = source.clone();
        template.id = self.unique_user_id(source_id);
        template.name = new_name.to_string();
        template.parent_id = Some(source_id.to_string());
        template.system = false;
        for parameter in &mut template.parameters {
            if let Some(value) = overrides.get(&parameter.name) {
                parameter.default = Some(value.clone());
            }
        }

        self.templates.push(template.clone());
        if let Err(err) = self.persist_user_catalog().await {
            self.templates.retain(|t| t.id != template.id);
            return Err(err);
        }
        tracing::info!(id = %template.id, "user template created");
        Ok(template)
    }

    /// Remove a user template, its own file if any, and rewrite the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SystemTemplateReadOnly`] for a system
    /// template, [`TaskQueueError::NotFound`] for an unknown id, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user_template(&mut self, id: &str) -> Result<(), TaskQueueError> {
        if self.find(id)?.is_system() {
            return Err(ValidationError::SystemTemplateReadOnly(id.to_string()).into());
        }
        let removed_file = self.store.remove_user_template(id).await?;

        let Some(position) = self.templates.iter().position(|t| t.id == id) else {
            return Ok(());
        };
        let removed = self.templates.remove(position);
        if let Err(err) = self.persist_user_catalog().await {
            self.templates.insert(position, removed);
            return Err(err);
        }
        tracing::info!(id, removed_file, "user template deleted");
        Ok(())
    }

    /// Instantiate a template, filling omitted parameters from their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::NotFound`] for an unknown template and
    /// [`TaskQueueError::Validation`] when instantiation fails.
    pub fn instantiate(
        &self,
        template_id: &str,
        device: &str,
        parameters: &Map<String, Value>,
    ) -> Result<Task, TaskQueueError> {
        let template = self.find(template_id)?;
        Task::from_template(template, device, template.parameters_with_defaults(parameters)).map_err(|err| {
            tracing::warn!(template = %template_id, device, error = %err, "instantiation failed");
            err.into()
        })
    }

    fn find(&self, id: &str) -> Result<&TaskTemplate, TaskQueueError> {
        self.get_template(id).ok_or_else(|| {
            NotFoundError {
                entity: "template",
                id: id.to_string(),
            }
            .into()
        })
    }

    fn unique_user_id(&self, source_id: &str) -> String {
        let base = format!("user_{source_id}");
        if self.get_template(&base).is_none() {
            return base;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{base}_{suffix}");
            if self.get_template(&candidate).is_none() {
                return candidate;
            }
            suffix += 1;
        }
    }

    async fn persist_user_catalog(&self) -> Result<(), TaskQueueError> {
        let templates: Vec<&TaskTemplate> = self.user_templates().collect();
        let catalog = json!({
            "templates": serde_json::to_value(templates)?,
            "version": USER_CATALOG_VERSION,
            "last_modified": chrono::Utc::now().to_rfc3339(),
        });
        self.store.write_user_catalog(&catalog).await
    }
}
