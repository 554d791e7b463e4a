use std::io;
use std::time::Duration;

use runtime_diag_core::samplers::{ProcessProbe, ProcessSnapshot};
use runtime_diag_core::BoxError;

/// Reads CPU time and memory of the current process from the OS.
///
/// - Linux: `getrusage` and `/proc/self/statm`.
/// - macOS: `getrusage`; private bytes equal the peak resident size.
/// - Windows: `GetProcessTimes` and `GetProcessMemoryInfo`.
///
/// On other platforms every snapshot fails.
#[derive(Debug, Default)]
pub struct OsProcessProbe {
    _private: (),
}

impl OsProcessProbe {
    /// Creates a new probe.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl ProcessProbe for OsProcessProbe {
    fn snapshot(&self) -> Result<ProcessSnapshot, BoxError> {
        let cpu_time = cpu_time()?;
        let (working_set_bytes, private_bytes) = memory()?;
        Ok(ProcessSnapshot {
            cpu_time,
            working_set_bytes,
            private_bytes,
        })
    }
}

/// Gets the CPU time (user and system) consumed so far.
#[cfg(unix)]
fn cpu_time() -> io::Result<Duration> {
    fn to_duration(tv: libc::timeval) -> Duration {
        Duration::from_secs(tv.tv_sec as u64) + Duration::from_micros(tv.tv_usec as u64)
    }

    unsafe {
        let mut usage: libc::rusage = std::mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut usage) == 0 {
            Ok(to_duration(usage.ru_utime) + to_duration(usage.ru_stime))
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

/// Gets the CPU time (user and kernel) consumed so far.
#[cfg(windows)]
fn cpu_time() -> io::Result<Duration> {
    use windows_sys::Win32::Foundation::FILETIME;
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, GetProcessTimes};

    fn to_100ns(time: FILETIME) -> u64 {
        (u64::from(time.dwHighDateTime) << 32) | u64::from(time.dwLowDateTime)
    }

    unsafe {
        let process = GetCurrentProcess();
        let mut creation: FILETIME = std::mem::zeroed();
        let mut exit: FILETIME = std::mem::zeroed();
        let mut kernel: FILETIME = std::mem::zeroed();
        let mut user: FILETIME = std::mem::zeroed();

        if GetProcessTimes(process, &mut creation, &mut exit, &mut kernel, &mut user) != 0 {
            // FILETIME counts 100-nanosecond intervals
            Ok(Duration::from_nanos(
                (to_100ns(kernel) + to_100ns(user)).saturating_mul(100),
            ))
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn cpu_time() -> io::Result<Duration> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process CPU time is not available on this platform",
    ))
}

/// Gets the resident and private memory in bytes.
#[cfg(target_os = "linux")]
fn memory() -> io::Result<(u64, u64)> {
    // size resident shared text lib data dt, in pages
    let statm = std::fs::read_to_string("/proc/self/statm")?;
    let pages: Vec<u64> = statm
        .split_whitespace()
        .take(3)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    let [_, resident, shared] = pages[..] else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "truncated /proc/self/statm",
        ));
    };
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as u64;
    Ok((
        resident * page_size,
        resident.saturating_sub(shared) * page_size,
    ))
}

/// Gets the resident and private memory in bytes.
#[cfg(target_os = "macos")]
fn memory() -> io::Result<(u64, u64)> {
    unsafe {
        let mut info: libc::rusage = std::mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut info) == 0 {
            // ru_maxrss is in bytes on macOS
            let rss = info.ru_maxrss as u64;
            Ok((rss, rss))
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

/// Gets the working set and committed private memory in bytes.
#[cfg(windows)]
fn memory() -> io::Result<(u64, u64)> {
    use windows_sys::Win32::System::ProcessStatus::{
        GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS,
    };
    use windows_sys::Win32::System::Threading::GetCurrentProcess;

    unsafe {
        let process = GetCurrentProcess();
        let mut pmc: PROCESS_MEMORY_COUNTERS = std::mem::zeroed();
        pmc.cb = std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32;

        if GetProcessMemoryInfo(
            process,
            &mut pmc,
            std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32,
        ) != 0
        {
            Ok((pmc.WorkingSetSize as u64, pmc.PagefileUsage as u64))
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
fn memory() -> io::Result<(u64, u64)> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process memory is not available on this platform",
    ))
}
