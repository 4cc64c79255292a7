use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Name of the project configuration file.
pub const CONFIG_FILENAME: &str = ".rulegate.toml";

/// Custom tag marking a descriptor that user-facing severity configuration must not touch.
pub const NOT_CONFIGURABLE_TAG: &str = "NotConfigurable";

/// Version of the plugin export ABI. Bumped whenever `PluginDeclaration` or
/// `ExportedType` change shape.
pub const PLUGIN_API_VERSION: u32 = 1;

/// Symbol emitted by `declare_plugin!` in every native plugin module.
pub const PLUGIN_DECLARATION_SYMBOL: &[u8] = b"RULEGATE_PLUGIN_DECLARATION\0";

/// Rule family key of the plugin host itself. Disabling it silences every plugin at once.
pub const PLUGIN_HOST_FAMILY: &str = "rulegate::host::HostEngine";

/// Default period of the toggle scheduler.
pub const DEFAULT_TOGGLE_INTERVAL_SECS: u64 = 10;

/// File extensions treated as native plugin modules.
pub fn get_shared_library_extensions() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut s = FxHashSet::default();
        s.insert("so");
        s.insert("dylib");
        s.insert("dll");
        s
    })
}

pub use get_shared_library_extensions as SHARED_LIBRARY_EXTENSIONS;
