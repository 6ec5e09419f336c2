//! Fuzz target: `FeedConfig::from_json`
//!
//! Feeds arbitrary bytes to the config loader and verifies:
//! - No panics under arbitrary input
//! - Anything accepted also passes `validate()`
//! - Accepted timing constants are finite and strictly positive
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use pelletfeed::config::FeedConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = FeedConfig::from_json(text) else {
        return;
    };

    assert!(config.validate().is_ok());
    for value in [
        config.buffer_time,
        config.drain_time,
        config.off_delay_time,
        config.spool_up_time,
        config.debounce_time,
        config.tick_period,
    ] {
        assert!(value.is_finite() && value > 0.0);
    }
    assert!(config.blower_low_level > 0.0 && config.blower_low_level < 1.0);
    assert!(!config.blower_pin.trim().is_empty());
});
