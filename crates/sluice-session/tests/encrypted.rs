//! Encrypted streams end to end: prologue detection, head remainder
//! continuation, authorization and tail decryption.

mod common;

use common::session_with;
use sluice_crypto::{Aes128ChunkCipher, CHUNK_SIZE, PROLOGUE_MAGIC, PROLOGUE_SIZE};
use sluice_session::mock::{MockEngine, RecordingSink, dual_audio_media, packet};
use sluice_session::{
    DataKind, DemuxEngine, EngineResult, MediaInfo, MediaKind, ReadOutcome, SessionConfig,
    StepOutcome, StreamIo, Whence,
};

const KEY: [u8; 16] = [0x42; 16];
const IV: [u8; 16] = [0x24; 16];

fn make_prologue() -> Vec<u8> {
    let mut buf = vec![0u8; PROLOGUE_SIZE];
    buf[..8].copy_from_slice(PROLOGUE_MAGIC);
    buf[8] = 1;
    buf[16..32].copy_from_slice(&KEY);
    buf[32..48].copy_from_slice(&IV);
    buf
}

/// Plaintext payload of `chunks` whole chunks with a recognizable pattern.
fn payload(chunks: usize) -> Vec<u8> {
    (0..chunks * CHUNK_SIZE).map(|i| (i % 251) as u8).collect()
}

fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    let mut out = plaintext.to_vec();
    let mut cipher = Aes128ChunkCipher::new(KEY, IV);
    cipher.encrypt(&mut out).expect("chunk-aligned payload");
    out
}

fn encrypted_config(total: u64) -> SessionConfig {
    SessionConfig {
        expected_size: Some(total),
        decryption_enabled: true,
        ..SessionConfig::default()
    }
}

#[test]
fn test_encrypted_stream_decrypts_across_head_boundary() {
    let plain = payload(3);
    let ciphertext = encrypt(&plain);
    let total = (PROLOGUE_SIZE + ciphertext.len()) as u64;
    let mut t = session_with(encrypted_config(total));

    // Head: prologue + one chunk + 100 unaligned bytes.
    let head_cipher_len = CHUNK_SIZE + 100;
    let mut head = make_prologue();
    head.extend_from_slice(&ciphertext[..head_cipher_len]);
    t.session.ingest(0, &head, DataKind::HeaderProbe).unwrap();

    // The aligned chunk is decrypted eagerly; the 100-byte remainder stays
    // parked until the stream continues it.
    assert_eq!(t.session.buffered_bytes(), CHUNK_SIZE);

    let engine = MockEngine::new(dual_audio_media())
        .with_packets(vec![packet(0, 0, true)])
        .with_bytes_per_packet(3 * CHUNK_SIZE);
    let drained = engine.stream_bytes();
    t.session
        .open(MediaKind::Transport, Box::new(engine))
        .unwrap();

    // Stream continues at the raw offset right after the head push.
    let stream_offset = (PROLOGUE_SIZE + head_cipher_len) as u64;
    t.session
        .ingest(
            stream_offset,
            &ciphertext[head_cipher_len..],
            DataKind::SequentialStream,
        )
        .unwrap();
    assert_eq!(t.session.buffered_bytes(), 3 * CHUNK_SIZE);

    let mut sink = RecordingSink::default();
    assert_eq!(t.session.decode_step(&mut sink).unwrap(), StepOutcome::Decoded);

    // Everything the engine drained is the original plaintext.
    assert_eq!(drained.lock().unwrap().as_slice(), plain.as_slice());
}

#[test]
fn test_head_probe_region_carries_decrypted_prefix() {
    let plain = payload(2);
    let ciphertext = encrypt(&plain);
    let total = (PROLOGUE_SIZE + ciphertext.len()) as u64;
    let mut t = session_with(encrypted_config(total));

    let mut head = make_prologue();
    head.extend_from_slice(&ciphertext[..CHUNK_SIZE]);
    t.session.ingest(0, &head, DataKind::HeaderProbe).unwrap();

    let engine = MockEngine::new(dual_audio_media());
    let probed = engine.probe_bytes();
    t.session
        .open(MediaKind::Transport, Box::new(engine))
        .unwrap();

    // The probe sees the stripped, decrypted payload addressed from zero.
    assert_eq!(probed.lock().unwrap().as_slice(), &plain[..CHUNK_SIZE]);
}

#[test]
fn test_unauthorized_ingest_is_atomic() {
    let plain = payload(2);
    let ciphertext = encrypt(&plain);
    let total = (PROLOGUE_SIZE + ciphertext.len()) as u64;
    let mut t = session_with(encrypted_config(total));

    t.session
        .ingest(0, &make_prologue(), DataKind::HeaderProbe)
        .unwrap();

    t.auth.set(false);
    let err = t
        .session
        .ingest(
            PROLOGUE_SIZE as u64,
            &ciphertext[..CHUNK_SIZE],
            DataKind::SequentialStream,
        )
        .unwrap_err();
    assert_eq!(err.code(), 100);
    assert_eq!(t.session.buffered_bytes(), 0);

    // Once authorized, the same push is accepted and decrypts cleanly.
    t.auth.set(true);
    t.session
        .ingest(PROLOGUE_SIZE as u64, &ciphertext, DataKind::SequentialStream)
        .unwrap();
    assert_eq!(t.session.buffered_bytes(), plain.len());
}

#[test]
fn test_encrypted_flush_beyond_capacity_grows_fifo() {
    // One push whose aligned flush exceeds the whole FIFO: space is secured
    // up front and every decrypted byte lands.
    let plain = payload(4);
    let ciphertext = encrypt(&plain);
    let total = (PROLOGUE_SIZE + ciphertext.len()) as u64;
    let mut config = encrypted_config(total);
    config.fifo_capacity = CHUNK_SIZE;
    let mut t = session_with(config);

    t.session
        .ingest(0, &make_prologue(), DataKind::HeaderProbe)
        .unwrap();
    t.session
        .ingest(PROLOGUE_SIZE as u64, &ciphertext, DataKind::SequentialStream)
        .unwrap();

    assert_eq!(t.session.buffered_bytes(), plain.len());
    assert!(t.session.buffer_capacity() >= plain.len());
}

#[test]
fn test_prologue_ignored_when_decryption_disabled() {
    let mut t = session_with(SessionConfig {
        expected_size: Some(100_000),
        decryption_enabled: false,
        ..SessionConfig::default()
    });

    let head = make_prologue();
    t.session.ingest(0, &head, DataKind::HeaderProbe).unwrap();
    // Raw bytes, prologue included, flow straight through.
    assert_eq!(t.session.buffered_bytes(), head.len());
}

/// Engine that seeks to a fixed offset during probe and records what it reads.
struct TailProber {
    offset: u64,
    media: MediaInfo,
    seen: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

impl DemuxEngine for TailProber {
    fn probe(&mut self, io: &mut dyn StreamIo) -> EngineResult<MediaInfo> {
        let pos = io
            .seek(self.offset as i64, Whence::Start)
            .map_err(|e| sluice_session::EngineError::Other(e.to_string()))?;
        assert_eq!(pos, self.offset);
        let mut buf = [0u8; 256];
        while let ReadOutcome::Filled(n) = io.read(&mut buf) {
            if n == 0 {
                break;
            }
            self.seen.lock().expect("lock").extend_from_slice(&buf[..n]);
        }
        Ok(self.media.clone())
    }

    fn next_packet(&mut self, _io: &mut dyn StreamIo) -> EngineResult<sluice_session::EnginePacket> {
        Err(sluice_session::EngineError::Eof)
    }

    fn decode(
        &mut self,
        _packet: &sluice_session::EnginePacket,
    ) -> EngineResult<Vec<sluice_session::DecodedFrame>> {
        Ok(vec![])
    }

    fn close(&mut self) {}
}

#[test]
fn test_tail_region_is_decrypted_for_probing() {
    let plain = payload(4);
    let ciphertext = encrypt(&plain);
    let total = (PROLOGUE_SIZE + ciphertext.len()) as u64;
    let mut t = session_with(encrypted_config(total));

    let mut head = make_prologue();
    head.extend_from_slice(&ciphertext[..CHUNK_SIZE]);
    t.session.ingest(0, &head, DataKind::HeaderProbe).unwrap();

    // Push the last chunk as tail data at its raw chunk-aligned offset.
    let tail_offset = (PROLOGUE_SIZE + 3 * CHUNK_SIZE) as u64;
    t.session
        .ingest(tail_offset, &ciphertext[3 * CHUNK_SIZE..], DataKind::TailProbe)
        .unwrap();

    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let engine = TailProber {
        offset: tail_offset,
        media: dual_audio_media(),
        seen: std::sync::Arc::clone(&seen),
    };
    t.session.open(MediaKind::Transport, Box::new(engine)).unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), &plain[3 * CHUNK_SIZE..]);
}
