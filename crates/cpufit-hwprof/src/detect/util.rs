pub fn hwprof_debug() -> bool {
    env_flag("CPUFIT_HWPROF_DEBUG")
}

pub fn disabled(name: &str) -> bool {
    env_flag(&format!(
        "CPUFIT_HWPROF_DISABLE_{}",
        name.to_ascii_uppercase()
    ))
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Size of one cache instance from its CPUID geometry.
#[cfg_attr(
    not(any(target_arch = "x86", target_arch = "x86_64")),
    allow(dead_code)
)]
pub fn cache_bytes(ways: usize, partitions: usize, line_size: usize, sets: usize) -> usize {
    ways.saturating_mul(partitions)
        .saturating_mul(line_size)
        .saturating_mul(sets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_geometry_multiplies_out() {
        // 16-way, 1 partition, 64-byte lines, 1024 sets = 1 MiB
        assert_eq!(cache_bytes(16, 1, 64, 1024), 1024 * 1024);
    }

    #[test]
    fn unset_switch_is_off() {
        assert!(!disabled("no_such_probe_for_tests"));
    }

    #[test]
    fn switch_name_is_uppercased_into_the_env_key() {
        // unique key, no other test reads it
        std::env::set_var("CPUFIT_HWPROF_DISABLE_UTIL_SWITCH_CHECK", "1");
        assert!(disabled("util_switch_check"));
        std::env::set_var("CPUFIT_HWPROF_DISABLE_UTIL_SWITCH_CHECK", "0");
        assert!(!disabled("util_switch_check"));
    }
}
