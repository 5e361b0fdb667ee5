//! Runtime shipping — the C++ runtime sources are baked into the compiler
//! binary with `include_str!()` so the `umbrella` executable is fully
//! self-contained. Before invoking the system C++ compiler the driver
//! materializes them into a directory next to the build cache; files are
//! rewritten only when their embedded content changed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Core containers and helpers (Array, Map, String, Math, Date, JSON, File,
/// Console, HTTP, Regex, Env).
pub const RUNTIME_HEADER: &str = include_str!("../../umbrella-runtime/runtime.h");
pub const RUNTIME_IMPL: &str = include_str!("../../umbrella-runtime/runtime.cpp");

/// System services (Database, Thread, Mutex, Process, Timer).
pub const SYSTEM_HEADER: &str = include_str!("../../umbrella-runtime/system.h");
pub const SYSTEM_IMPL: &str = include_str!("../../umbrella-runtime/system.cpp");

/// All embedded runtime files, in write order.
pub fn sources() -> [(&'static str, &'static str); 4] {
    [
        ("runtime.h", RUNTIME_HEADER),
        ("runtime.cpp", RUNTIME_IMPL),
        ("system.h", SYSTEM_HEADER),
        ("system.cpp", SYSTEM_IMPL),
    ]
}

/// Names of the runtime namespaces that require the system translation unit
/// (and its extra link libraries). Emitted code is scanned for these so
/// plain programs compile without sqlite3/pthread installed.
const SYSTEM_MARKERS: [&str; 5] = ["Database", "Thread::", "Mutex", "Process::", "Timer::"];

pub fn uses_system_runtime(cpp_code: &str) -> bool {
    SYSTEM_MARKERS.iter().any(|marker| cpp_code.contains(marker))
}

/// Write the embedded runtime sources into `dir`, creating it if needed.
/// Returns the directory so callers can pass it to `-I` and pick up the
/// implementation files.
pub fn materialize(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    for (name, content) in sources() {
        let path = dir.join(name);
        let unchanged = matches!(fs::read_to_string(&path), Ok(existing) if existing == content);
        if !unchanged {
            fs::write(&path, content)?;
        }
    }
    Ok(dir.to_path_buf())
}
