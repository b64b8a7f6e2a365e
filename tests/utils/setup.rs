use axum::Router;
use std::sync::Arc;

use stampcard::{
    build_router, reward::RewardItem, AppConfig, AppState, InMemoryStore, ScriptedDice,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub store: Arc<InMemoryStore>,
}

pub struct TestSetupBuilder {
    catalog: Option<Vec<RewardItem>>,
    script: Vec<u32>,
    fallback: u32,
    config: AppConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            catalog: None,
            script: vec![],
            // Never fires the mythical override and always lands in the normal tier
            fallback: 50,
            config: AppConfig::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: Vec<RewardItem>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Dice values consumed in order before the fallback applies
    pub fn with_script(mut self, script: Vec<u32>) -> Self {
        self.script = script;
        self
    }

    #[allow(dead_code)]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TestSetup {
        let store = Arc::new(match self.catalog {
            Some(catalog) => InMemoryStore::with_catalog(catalog),
            None => InMemoryStore::with_default_catalog(),
        });
        let dice = Arc::new(ScriptedDice::new(self.script, self.fallback));
        let state = AppState::new(store.clone(), dice, self.config);

        TestSetup {
            app: build_router(state),
            store,
        }
    }
}
