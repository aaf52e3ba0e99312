use std::process;
use std::fs::File;
use std::io::Read;

#[cfg(not(target_os = "linux"))]
pub fn mem_used_peak() -> Option<usize> {
    None
}

#[cfg(target_os = "linux")]
pub fn mem_used_peak() -> Option<usize> {
    let mut buf = String::new();
    let mut stats = File::open(format!("/proc/{}/status", process::id())).ok()?;
    stats.read_to_string(&mut buf).ok()?;
    let line = buf.lines().find(|line| line.starts_with("VmPeak:"))?;
    let mem_kb: String = line.chars().filter(|c| c.is_ascii_digit()).collect();
    mem_kb.parse().ok()
}
