#![allow(clippy::module_name_repetitions)]
//! `-e` argument helpers for runtime invocations.

use std::collections::BTreeMap;

pub(crate) fn push_env_kv(args: &mut Vec<String>, key: &str, val: &str) {
    args.push("-e".to_string());
    args.push(format!("{key}={val}"));
}

/// Push every entry of `env` in key order (deterministic argv).
pub(crate) fn push_env_map(args: &mut Vec<String>, env: &BTreeMap<String, String>) {
    for (k, v) in env {
        push_env_kv(args, k, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_map_is_pushed_in_key_order() {
        let mut env = BTreeMap::new();
        env.insert("ZED".to_string(), "1".to_string());
        env.insert("ALPHA".to_string(), "a=b".to_string());
        let mut args = Vec::new();
        push_env_map(&mut args, &env);
        assert_eq!(args, vec!["-e", "ALPHA=a=b", "-e", "ZED=1"]);
    }
}
