//! Frame encoding: raw PCM frames to `input_audio_buffer.append` commands.

use crate::codec::ClientCommand;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Base64-encode a raw PCM frame. No framing is added.
pub fn encode_pcm(pcm: &[u8]) -> String {
    BASE64.encode(pcm)
}

/// Recover the raw PCM bytes carried in an append command
pub fn decode_pcm(audio: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(audio)
}

/// Wrap one raw PCM frame in an append command
pub fn append_command(pcm: &[u8]) -> ClientCommand {
    ClientCommand::InputAudioBufferAppend {
        audio: encode_pcm(pcm),
    }
}

/// Interleaved i16 samples to little-endian PCM bytes
pub fn samples_to_pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
