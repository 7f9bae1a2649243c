// src/exec/env.rs

use std::collections::BTreeMap;
use std::ffi::OsString;

/// Host environment with `overrides` applied on top.
///
/// Every external tool and the managed application get an explicit
/// environment built this way, so per-invocation variables (`GOOS`,
/// `NODE_ENV`, ...) never leak into the orchestrator's own process.
pub fn merge_env<'a, I>(overrides: I) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut env: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
    for (key, value) in overrides {
        env.insert(OsString::from(key), OsString::from(value));
    }
    env
}
