//! Loading and starting plugins that depend on each other.
//!
//! `MyPlugin` subscribes a handler holding on to itself while it loads, and
//! learns from it when the core plugin has started.
//!
//! Run with `cargo run --example plugin_system --features macros`.

use eventlib::{BoxError, Event, EventExt};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Basic plugin interface of this example.
trait Plugin: Any + Send + Sync {
    fn name(&self) -> &'static str;

    fn load(self: Arc<Self>) -> Result<(), BoxError>;

    fn start(&self);

    fn as_any(&self) -> &dyn Any;
}

/// Something happened to a plugin.
#[derive(Event)]
struct PluginEvent {
    plugin: Arc<dyn Plugin>,
}

/// A plugin was loaded.
#[derive(Event)]
struct PluginLoadedEvent {
    #[event(parent)]
    base: PluginEvent,
}

/// A plugin was started.
#[derive(Event)]
struct PluginStartedEvent {
    #[event(parent)]
    base: PluginEvent,
}

impl PluginEvent {
    fn new(plugin: &Arc<dyn Plugin>) -> Self {
        Self {
            plugin: Arc::clone(plugin),
        }
    }
}

// ============================================================================
// Core package
// ============================================================================

struct CorePlugin;

impl Plugin for CorePlugin {
    fn name(&self) -> &'static str {
        "core"
    }

    fn load(self: Arc<Self>) -> Result<(), BoxError> {
        println!("Core loaded");
        Ok(())
    }

    fn start(&self) {
        println!("Core started");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Another package
// ============================================================================

#[derive(Default)]
struct MyPlugin {
    core_available: AtomicBool,
}

impl MyPlugin {
    fn on_plugin_started(&self, event: &mut PluginStartedEvent) {
        if event.base.plugin.as_any().is::<CorePlugin>() {
            self.core_available.store(true, Ordering::SeqCst);
            println!("{}: core is available", self.name());
        }
    }
}

impl Plugin for MyPlugin {
    fn name(&self) -> &'static str {
        "my-plugin"
    }

    fn load(self: Arc<Self>) -> Result<(), BoxError> {
        let plugin = Arc::clone(&self);
        PluginStartedEvent::subscribe()
            .name("MyPlugin::on_plugin_started")
            .handler(move |event: &mut PluginStartedEvent| plugin.on_plugin_started(event))?;
        println!("MyPlugin loaded");
        Ok(())
    }

    fn start(&self) {
        println!("MyPlugin started");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn main() -> Result<(), BoxError> {
    let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(MyPlugin::default()), Arc::new(CorePlugin)];

    for plugin in &plugins {
        Arc::clone(plugin).load()?;
        PluginLoadedEvent {
            base: PluginEvent::new(plugin),
        }
        .emit()?;
    }

    for plugin in &plugins {
        plugin.start();
        PluginStartedEvent {
            base: PluginEvent::new(plugin),
        }
        .emit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_plugin_sees_core_start() {
        let mine = Arc::new(MyPlugin::default());
        Arc::clone(&mine).load().unwrap();

        let other: Arc<dyn Plugin> = Arc::new(MyPlugin::default());
        PluginStartedEvent {
            base: PluginEvent::new(&other),
        }
        .emit()
        .unwrap();
        assert!(!mine.core_available.load(Ordering::SeqCst));

        let core: Arc<dyn Plugin> = Arc::new(CorePlugin);
        PluginStartedEvent {
            base: PluginEvent::new(&core),
        }
        .emit()
        .unwrap();
        assert!(mine.core_available.load(Ordering::SeqCst));
    }
}
