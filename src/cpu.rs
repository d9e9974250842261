/// The CPU the calling thread is running on right now, if the OS tells us.
///
/// Races and reorderings only show up when workers land on different cores,
/// so the counter report prints this next to each snapshot.
#[cfg(target_os = "linux")]
pub fn current_cpu() -> Option<usize> {
    // -1 on failure, which try_from rejects.
    let cpu = unsafe { libc::sched_getcpu() };
    usize::try_from(cpu).ok()
}

#[cfg(not(target_os = "linux"))]
pub fn current_cpu() -> Option<usize> {
    None
}

#[test]
#[cfg(target_os = "linux")]
fn linux_reports_a_cpu() {
    assert!(current_cpu().is_some());
}
