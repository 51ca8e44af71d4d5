//! Testing utilities and in-memory hosts for Veneer

pub mod clock;
pub mod hosts;
pub mod mounts;
pub mod themes;

pub use clock::TestClock;
pub use hosts::{RecordingHost, RecordingStyler, ValueTree};
pub use mounts::TestMounts;
pub use themes::sample_theme;

pub mod prelude {
    pub use crate::clock::TestClock;
    pub use crate::hosts::{RecordingHost, RecordingStyler, ValueTree};
    pub use crate::mounts::TestMounts;
    pub use crate::themes::sample_theme;
}
