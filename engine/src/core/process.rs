//! Cross-platform process spawning helpers.
//!
//! On Windows, spawning console binaries (ffmpeg, ffprobe) can flash a
//! console window for each invocation. Every engine subprocess goes through
//! these helpers so the creation flags are applied in one place.

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Apply platform-specific flags to a std process command.
pub fn configure_std_command(cmd: &mut std::process::Command) {
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

/// Apply platform-specific flags to a tokio process command.
///
/// Also marks the child to be killed if its handle is dropped, so an
/// abandoned encode never outlives the export that started it.
pub fn configure_tokio_command(cmd: &mut tokio::process::Command) {
    cmd.kill_on_drop(true);
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_command_can_be_configured() {
        let mut cmd = std::process::Command::new("ffmpeg");
        configure_std_command(&mut cmd);
        configure_std_command(&mut cmd);
    }

    #[tokio::test]
    async fn test_tokio_command_can_be_configured() {
        let mut cmd = tokio::process::Command::new("ffmpeg");
        configure_tokio_command(&mut cmd);
    }
}
