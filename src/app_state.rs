use crate::cache::DatasetCache;
use crate::cli::CommandLineArgs;
use crate::pipeline::LodConfig;
use crate::resource_manager::ResourceManager;

use std::sync::Arc;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Dataset cache.
    pub cache: DatasetCache,

    /// Resource manager.
    pub resource_manager: ResourceManager,
}

impl AppState {
    /// Create and return an [AppState].
    pub fn new(args: &CommandLineArgs) -> Self {
        let task_limit = args
            .thread_limit
            .or_else(|| Some(std::cmp::max(1, num_cpus::get() - 1)));
        Self {
            args: args.clone(),
            cache: DatasetCache::new(args.cache_capacity),
            resource_manager: ResourceManager::new(task_limit),
        }
    }

    /// Level-of-detail configuration derived from the arguments.
    pub fn lod_config(&self) -> LodConfig {
        LodConfig {
            max_adaptive_points: self.args.max_adaptive_points,
            zoom_cap_multiplier: self.args.zoom_cap_multiplier,
            viewport_buffer_ratio: self.args.viewport_buffer_ratio,
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
