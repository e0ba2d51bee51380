use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

static STOP: AtomicBool = AtomicBool::new(false);

/// Flag raised by Ctrl+C / SIGTERM once `install` has run.
pub fn stop_flag() -> &'static AtomicBool {
    &STOP
}

/// Install a SIGINT/SIGTERM handler that raises the stop flag.
#[cfg(unix)]
pub fn install() -> Result<()> {
    extern "C" fn on_signal(_sig: libc::c_int) {
        STOP.store(true, Ordering::Release);
    }

    for sig in [libc::SIGINT, libc::SIGTERM] {
        let prev = unsafe { libc::signal(sig, on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t) };
        if prev == libc::SIG_ERR {
            anyhow::bail!("failed to install handler for signal {}", sig);
        }
    }
    Ok(())
}

/// Install a console control handler (Ctrl+C, Ctrl+Break, close) that raises the stop flag.
#[cfg(target_os = "windows")]
pub fn install() -> Result<()> {
    use anyhow::Context;
    use windows::Win32::Foundation::{BOOL, TRUE};
    use windows::Win32::System::Console::SetConsoleCtrlHandler;

    unsafe extern "system" fn on_ctrl(_ctrl_type: u32) -> BOOL {
        STOP.store(true, Ordering::Release);
        TRUE
    }

    unsafe { SetConsoleCtrlHandler(Some(on_ctrl), TRUE) }
        .context("failed to register console control handler")
}

#[cfg(not(any(unix, target_os = "windows")))]
pub fn install() -> Result<()> {
    // No interrupt source on this platform; only process termination stops the loop
    Ok(())
}
