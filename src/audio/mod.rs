pub mod capture;
pub mod convert;
pub mod device;
pub mod file;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use capture::AudioCapture;
pub use device::{AudioFormat, CaptureDevice, DeviceHandle, DeviceRead, SampleFormat};
pub use file::WavFileDevice;

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneDevice;
