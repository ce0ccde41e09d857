#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Both loaders must reject garbage with an error, never a panic.
    if let Ok(loaded) = meter_config::load_legacy(data) {
        let _ = loaded.config.validate();
    }
    if let Ok(cfg) = meter_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
