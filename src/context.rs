use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{LanguageModelService, VersionControlService};
use crate::workflow::changelog::{ChangelogGenerator, GeneratorOptions};

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub version_control: Arc<dyn VersionControlService>,
    pub language_model: Arc<dyn LanguageModelService>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        version_control: Arc<dyn VersionControlService>,
        language_model: Arc<dyn LanguageModelService>,
    ) -> Self {
        Self {
            config,
            version_control,
            language_model,
        }
    }

    pub fn changelog_generator(&self) -> ChangelogGenerator {
        ChangelogGenerator::new(
            self.language_model.clone(),
            GeneratorOptions {
                include_range_in_prompt: self.config.include_range_in_prompt,
            },
        )
    }
}
