#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sluice_buffer::FlowSignal;
use sluice_session::mock::{RecordingCtrl, SharedAuth};
use sluice_session::{SessionConfig, StreamSession};

pub struct TestSession {
    pub session: StreamSession,
    pub signals: Arc<Mutex<Vec<FlowSignal>>>,
    pub auth: SharedAuth,
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn session_with(config: SessionConfig) -> TestSession {
    init_tracing();
    let ctrl = RecordingCtrl::default();
    let signals = ctrl.signals();
    let auth = SharedAuth::new(true);
    let session = StreamSession::new(config, Box::new(ctrl), Box::new(auth.clone()));
    TestSession {
        session,
        signals,
        auth,
    }
}

pub fn sized_session(expected_size: u64) -> TestSession {
    session_with(SessionConfig {
        expected_size: Some(expected_size),
        ..SessionConfig::default()
    })
}
