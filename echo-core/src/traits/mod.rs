pub mod audio_driver;
pub mod echo_delegate;
