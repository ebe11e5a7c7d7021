#![forbid(unsafe_code)]

//! Video player button presets.

use std::rc::Rc;

use tracing::debug;
use xrplay_core::IconSet;

use crate::controls::ButtonDescriptor;

/// The playback surface the player buttons drive.
pub trait MediaElement: 'static {
    fn play(&self);

    fn pause(&self);

    fn is_muted(&self) -> bool;

    fn set_muted(&self, muted: bool);

    /// Jump back to the start without changing play state.
    fn restart(&self);
}

/// Play, pause, mute toggle and restart, in that order.
///
/// The mute button shows the fail mark while muted.
pub fn player_controls<M: MediaElement>(media: Rc<M>) -> Vec<ButtonDescriptor> {
    let play = Rc::clone(&media);
    let pause = Rc::clone(&media);
    let mute = Rc::clone(&media);
    let restart = media;
    vec![
        ButtonDescriptor::new(IconSet::PLAY, move |_| {
            debug!("play");
            play.play();
        }),
        ButtonDescriptor::new(IconSet::PAUSE, move |_| {
            debug!("pause");
            pause.pause();
        }),
        ButtonDescriptor::new(IconSet::MUTE, move |handle| {
            let muted = !mute.is_muted();
            debug!(muted, "mute toggled");
            mute.set_muted(muted);
            if muted {
                handle.mark_fail();
            } else {
                handle.reset();
            }
        }),
        ButtonDescriptor::new(IconSet::RESTART, move |_| {
            debug!("restart");
            restart.restart();
        }),
    ]
}
