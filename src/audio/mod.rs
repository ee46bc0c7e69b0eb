pub mod analysis;
pub mod decode;
pub mod device;
pub mod playback;
pub mod window;
