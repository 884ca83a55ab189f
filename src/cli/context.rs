use std::sync::Arc;

use storefront_harness::config::{ConfigSource, HarnessConfig};

pub struct CliContext {
    config: Arc<HarnessConfig>,
    source: ConfigSource,
}

impl CliContext {
    pub fn new(config: HarnessConfig, source: ConfigSource) -> Self {
        Self {
            config: Arc::new(config),
            source,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        self.config.as_ref()
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }
}
