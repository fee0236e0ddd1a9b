//! Playback via an external mpv process.
//!
//! No decoding happens in-process: play spawns mpv against the track URL,
//! stop kills it. One child at a time.

use std::process::{Child, Command, Stdio};

use anyhow::anyhow;
use tracing::{info, warn};

use shelf_core::catalog::TrackRecord;
use shelf_core::platform;

pub struct Player {
    current: Option<(u64, Child)>,
}

impl Player {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Start playing `track`, replacing whatever was playing before.
    pub fn play(&mut self, track: &TrackRecord) -> anyhow::Result<()> {
        self.stop();

        let mpv = platform::find_mpv_binary()
            .ok_or_else(|| anyhow!("mpv not found beside the executable or on PATH"))?;

        info!("playing track {} via {}", track.id, mpv.display());
        let child = Command::new(mpv)
            .arg("--no-video")
            .arg("--really-quiet")
            .arg(&track.url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        self.current = Some((track.id, child));
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some((id, mut child)) = self.current.take() {
            info!("stopping playback of track {}", id);
            if let Err(e) = child.kill() {
                warn!("failed to kill mpv: {}", e);
            }
            let _ = child.wait();
        }
    }

    /// Id of the track currently playing. Reaps the child if it exited on
    /// its own (track finished).
    pub fn playing_id(&mut self) -> Option<u64> {
        if let Some((id, child)) = self.current.as_mut() {
            match child.try_wait() {
                Ok(None) => return Some(*id),
                Ok(Some(_)) => {
                    self.current = None;
                }
                Err(e) => {
                    warn!("mpv try_wait failed: {}", e);
                    self.current = None;
                }
            }
        }
        None
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}
