//! PC speaker output and the song player built on it.

pub mod notes;
pub mod song;
pub mod speaker;

pub use song::{Note, Song, SongPlayer};
pub use speaker::Speaker;
