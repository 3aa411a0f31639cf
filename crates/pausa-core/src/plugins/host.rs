//! Plugin host: one isolated Lua interpreter per script.
//!
//! A script registers itself through the `pausa` table:
//!
//! ```lua
//! pausa.register_plugin({
//!     name = "session-log",
//!     version = "1.0.0",
//!     description = "Appends sessions to a journal",
//!     author = "someone",
//! })
//!
//! pausa.register_hook("timer_completed", function(event)
//!     pausa.log("completed: " .. event.data.session_type)
//! end)
//! ```
//!
//! `register_hook` may be called before or after `register_plugin`; both
//! registrations are buffered while the script runs and attached when the
//! load finishes, so either ordering works. A script that never registers
//! a descriptor fails to load. Duplicate declared names fail the later
//! load; the first plugin stays.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use mlua::{Function, Lua, RegistryKey, Table};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::PluginError;
use crate::events::{Event, EventValue};

/// Descriptor a script declares via `register_plugin`.
#[derive(Debug, Clone, Serialize)]
pub struct PluginMeta {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
}

/// A loaded plugin and its dispatch state.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    #[serde(flatten)]
    pub meta: PluginMeta,
    pub enabled: bool,
}

/// Registrations buffered while a script executes.
#[derive(Default)]
struct Registration {
    descriptor: Option<PluginMeta>,
    hooks: Vec<(String, RegistryKey)>,
}

struct Plugin {
    meta: PluginMeta,
    enabled: AtomicBool,
    /// Hook handles per event-type wire name. Write-once at load; the
    /// keys are only usable with this plugin's interpreter.
    hooks: HashMap<String, Vec<RegistryKey>>,
    /// The plugin's interpreter. Hook invocations serialize on it.
    lua: Mutex<Lua>,
}

/// Arena of plugin interpreters, keyed by declared plugin name.
///
/// Interpreters are exclusively owned here; nothing outside the host ever
/// touches a plugin's Lua state.
#[derive(Default)]
pub struct PluginHost {
    plugins: RwLock<HashMap<String, Arc<Plugin>>>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.lua` file in `dir` (created if missing), continuing
    /// past individual failures. Returns the number of plugins loaded.
    pub fn load_dir(&self, dir: &Path) -> Result<usize, PluginError> {
        std::fs::create_dir_all(dir).map_err(|source| PluginError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let entries = std::fs::read_dir(dir).map_err(|source| PluginError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut scripts: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file() && path.extension().is_some_and(|ext| ext == "lua")
            })
            .collect();
        scripts.sort();

        let mut loaded = 0;
        for path in scripts {
            match self.load_file(&path) {
                Ok(name) => {
                    info!(plugin = %name, path = %path.display(), "loaded plugin");
                    loaded += 1;
                }
                Err(err) => warn!(path = %path.display(), %err, "skipping plugin"),
            }
        }
        Ok(loaded)
    }

    /// Load one script file. Returns the declared plugin name.
    pub fn load_file(&self, path: &Path) -> Result<String, PluginError> {
        let source_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let code = std::fs::read_to_string(path).map_err(|source| PluginError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_script(&source_name, &code)
    }

    /// Load a script from source. `source_name` labels errors and log
    /// lines until the script declares its own name.
    pub fn load_script(&self, source_name: &str, code: &str) -> Result<String, PluginError> {
        let lua = Lua::new();
        let registration = Arc::new(Mutex::new(Registration::default()));
        install_api(&lua, source_name, &registration).map_err(|source| PluginError::Script {
            name: source_name.to_string(),
            source,
        })?;

        lua.load(code)
            .set_name(source_name)
            .exec()
            .map_err(|source| PluginError::Script {
                name: source_name.to_string(),
                source,
            })?;

        let (descriptor, pending) = {
            let mut reg = registration.lock().unwrap_or_else(PoisonError::into_inner);
            (reg.descriptor.take(), std::mem::take(&mut reg.hooks))
        };
        let meta = descriptor.ok_or_else(|| PluginError::MissingDescriptor {
            name: source_name.to_string(),
        })?;

        // Attach buffered hooks now that the descriptor is known.
        let mut hooks: HashMap<String, Vec<RegistryKey>> = HashMap::new();
        for (event_type, key) in pending {
            hooks.entry(event_type).or_default().push(key);
        }

        let mut plugins = self.write_plugins();
        if plugins.contains_key(&meta.name) {
            return Err(PluginError::Duplicate { name: meta.name });
        }
        let name = meta.name.clone();
        debug!(plugin = %name, hooks = hooks.values().map(Vec::len).sum::<usize>(), "registered plugin");
        plugins.insert(
            name.clone(),
            Arc::new(Plugin {
                meta,
                enabled: AtomicBool::new(true),
                hooks,
                lua: Mutex::new(lua),
            }),
        );
        Ok(name)
    }

    /// Fan an event out to every enabled plugin with a matching hook.
    ///
    /// Spawns one blocking task per (plugin, hook) invocation and returns
    /// immediately, so a stalled hook can only delay later invocations on
    /// its own interpreter, never delivery to other plugins. Must be
    /// called from within a tokio runtime.
    pub fn dispatch(&self, event: &Event) {
        let plugins: Vec<Arc<Plugin>> = self.read_plugins().values().cloned().collect();
        for plugin in plugins {
            if !plugin.enabled.load(Ordering::Relaxed) {
                continue;
            }
            let Some(hooks) = plugin.hooks.get(event.event_type.as_str()) else {
                continue;
            };
            for idx in 0..hooks.len() {
                let plugin = Arc::clone(&plugin);
                let event = event.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(err) = call_hook(&plugin, idx, &event) {
                        error!(
                            plugin = %plugin.meta.name,
                            event = event.event_type.as_str(),
                            %err,
                            "plugin hook failed"
                        );
                    }
                });
            }
        }
    }

    /// Toggle dispatch for a plugin without unloading it.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), PluginError> {
        let plugins = self.read_plugins();
        let plugin = plugins.get(name).ok_or_else(|| PluginError::NotFound {
            name: name.to_string(),
        })?;
        plugin.enabled.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    /// Tear down a plugin's interpreter and remove its hooks.
    pub fn unload(&self, name: &str) -> Result<(), PluginError> {
        self.write_plugins()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PluginError::NotFound {
                name: name.to_string(),
            })
    }

    /// Tear down every loaded plugin.
    pub fn shutdown(&self) {
        self.write_plugins().clear();
    }

    /// Loaded plugins, sorted by name.
    pub fn list(&self) -> Vec<PluginInfo> {
        let mut infos: Vec<PluginInfo> = self
            .read_plugins()
            .values()
            .map(|plugin| PluginInfo {
                meta: plugin.meta.clone(),
                enabled: plugin.enabled.load(Ordering::Relaxed),
            })
            .collect();
        infos.sort_by(|a, b| a.meta.name.cmp(&b.meta.name));
        infos
    }

    pub fn get(&self, name: &str) -> Option<PluginInfo> {
        self.read_plugins().get(name).map(|plugin| PluginInfo {
            meta: plugin.meta.clone(),
            enabled: plugin.enabled.load(Ordering::Relaxed),
        })
    }

    /// Number of hooks a plugin has attached for an event type.
    pub fn hook_count(&self, name: &str, event_type: &str) -> usize {
        self.read_plugins()
            .get(name)
            .and_then(|plugin| plugin.hooks.get(event_type))
            .map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.read_plugins().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_plugins().is_empty()
    }

    fn read_plugins(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Plugin>>> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_plugins(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Plugin>>> {
        self.plugins.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Install the `pausa` registration/utility table into a fresh
/// interpreter.
fn install_api(
    lua: &Lua,
    source_name: &str,
    registration: &Arc<Mutex<Registration>>,
) -> mlua::Result<()> {
    let api = lua.create_table()?;

    let reg = Arc::clone(registration);
    api.set(
        "register_plugin",
        lua.create_function(move |_, descriptor: Table| {
            let name: Option<String> = descriptor.get("name")?;
            let Some(name) = name.filter(|n| !n.is_empty()) else {
                // Treated as no descriptor; the load fails afterwards.
                return Ok(());
            };
            let meta = PluginMeta {
                name,
                version: descriptor.get::<Option<String>>("version")?.unwrap_or_default(),
                description: descriptor
                    .get::<Option<String>>("description")?
                    .unwrap_or_default(),
                author: descriptor.get::<Option<String>>("author")?.unwrap_or_default(),
            };
            reg.lock().unwrap_or_else(PoisonError::into_inner).descriptor = Some(meta);
            Ok(())
        })?,
    )?;

    let reg = Arc::clone(registration);
    api.set(
        "register_hook",
        lua.create_function(move |lua, (event_type, callback): (String, Function)| {
            let key = lua.create_registry_value(callback)?;
            reg.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .hooks
                .push((event_type, key));
            Ok(())
        })?,
    )?;

    let plugin_label = source_name.to_string();
    api.set(
        "log",
        lua.create_function(move |_, message: String| {
            debug!(plugin = %plugin_label, "{message}");
            Ok(())
        })?,
    )?;

    // TODO: route through storage::Config once per-plugin settings exist.
    api.set(
        "get_config",
        lua.create_function(|_, (_key, default): (String, Option<String>)| {
            Ok(default.unwrap_or_default())
        })?,
    )?;

    lua.globals().set("pausa", api)
}

/// Run one hook inside its plugin's interpreter. Script faults become
/// errors here and are reported by the caller, never propagated.
fn call_hook(plugin: &Plugin, idx: usize, event: &Event) -> mlua::Result<()> {
    let lua = plugin.lua.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(key) = plugin
        .hooks
        .get(event.event_type.as_str())
        .and_then(|keys| keys.get(idx))
    else {
        return Ok(());
    };
    let callback: Function = lua.registry_value(key)?;
    let table = event_table(&lua, event)?;
    callback.call::<()>(table)
}

fn event_table(lua: &Lua, event: &Event) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("type", event.event_type.as_str())?;
    table.set("timestamp", event.timestamp.timestamp())?;

    let data = lua.create_table()?;
    for (key, value) in &event.data {
        match value {
            EventValue::Str(v) => data.set(key.as_str(), v.as_str())?,
            EventValue::Int(v) => data.set(key.as_str(), *v)?,
            EventValue::Float(v) => data.set(key.as_str(), *v)?,
            EventValue::Bool(v) => data.set(key.as_str(), *v)?,
        }
    }
    table.set("data", data)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR_FIRST: &str = r#"
pausa.register_plugin({
    name = "descriptor-first",
    version = "1.0.0",
    description = "descriptor before hooks",
    author = "tests",
})
pausa.register_hook("timer_started", function(event) end)
"#;

    #[test]
    fn load_extracts_descriptor_and_hooks() {
        let host = PluginHost::new();
        let name = host.load_script("descriptor_first", DESCRIPTOR_FIRST).unwrap();
        assert_eq!(name, "descriptor-first");

        let info = host.get("descriptor-first").unwrap();
        assert_eq!(info.meta.version, "1.0.0");
        assert_eq!(info.meta.author, "tests");
        assert!(info.enabled);
        assert_eq!(host.hook_count("descriptor-first", "timer_started"), 1);
    }

    #[test]
    fn hooks_before_descriptor_are_buffered() {
        let host = PluginHost::new();
        host.load_script(
            "hook_first",
            r#"
pausa.register_hook("timer_completed", function(event) end)
pausa.register_hook("timer_completed", function(event) end)
pausa.register_plugin({ name = "hook-first", version = "0.1" })
"#,
        )
        .unwrap();
        assert_eq!(host.hook_count("hook-first", "timer_completed"), 2);
    }

    #[test]
    fn script_without_descriptor_fails() {
        let host = PluginHost::new();
        let err = host
            .load_script("anonymous", "pausa.log('hello')")
            .unwrap_err();
        assert!(matches!(err, PluginError::MissingDescriptor { .. }));
        assert!(host.is_empty());
    }

    #[test]
    fn syntax_error_fails_load() {
        let host = PluginHost::new();
        let err = host.load_script("broken", "this is not lua (").unwrap_err();
        assert!(matches!(err, PluginError::Script { .. }));
    }

    #[test]
    fn duplicate_declared_name_keeps_first() {
        let host = PluginHost::new();
        host.load_script("a", DESCRIPTOR_FIRST).unwrap();
        let err = host.load_script("b", DESCRIPTOR_FIRST).unwrap_err();
        assert!(matches!(err, PluginError::Duplicate { .. }));
        assert_eq!(host.len(), 1);
        assert_eq!(host.hook_count("descriptor-first", "timer_started"), 1);
    }

    #[test]
    fn enable_disable_and_unload() {
        let host = PluginHost::new();
        host.load_script("p", DESCRIPTOR_FIRST).unwrap();

        host.set_enabled("descriptor-first", false).unwrap();
        assert!(!host.get("descriptor-first").unwrap().enabled);
        host.set_enabled("descriptor-first", true).unwrap();
        assert!(host.get("descriptor-first").unwrap().enabled);

        host.unload("descriptor-first").unwrap();
        assert!(host.get("descriptor-first").is_none());
        assert!(matches!(
            host.set_enabled("descriptor-first", true),
            Err(PluginError::NotFound { .. })
        ));
    }

    #[test]
    fn load_dir_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.lua"), DESCRIPTOR_FIRST).unwrap();
        std::fs::write(dir.path().join("broken.lua"), "not lua (").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "not a script").unwrap();

        let host = PluginHost::new();
        let loaded = host.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 1);
        assert!(host.get("descriptor-first").is_some());
    }

    #[test]
    fn load_dir_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let plugins_dir = dir.path().join("plugins");
        let loaded = PluginHost::new().load_dir(&plugins_dir).unwrap();
        assert_eq!(loaded, 0);
        assert!(plugins_dir.is_dir());
    }

    #[test]
    fn get_config_returns_default() {
        let host = PluginHost::new();
        host.load_script(
            "cfg",
            r#"
pausa.register_plugin({ name = "cfg" })
assert(pausa.get_config("theme", "dark") == "dark")
assert(pausa.get_config("theme") == "")
"#,
        )
        .unwrap();
    }
}
