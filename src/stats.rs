/// Peak resident set size of this process, in megabytes.
///
/// `ru_maxrss` is reported in kilobytes on Linux and in bytes on macOS.
///
/// # Example
/// ```rust, ignore
/// use gff2mgv::max_mem_usage_mb;
///
/// let before = max_mem_usage_mb();
/// // ... import a genome ...
/// log::info!("Memory: {:.2} MB", (max_mem_usage_mb() - before).max(0.0));
/// ```
pub fn max_mem_usage_mb() -> f64 {
    let usage = unsafe {
        let mut usage = std::mem::MaybeUninit::<libc::rusage>::uninit();
        if libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) != 0 {
            return 0.0;
        }
        usage.assume_init()
    };
    let peak = usage.ru_maxrss as f64;
    if cfg!(target_os = "macos") {
        peak / (1024.0 * 1024.0)
    } else {
        peak / 1024.0
    }
}
