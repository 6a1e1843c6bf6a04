use async_trait::async_trait;
use folio_voice::{
    entrypoint, prewarm, JobContext, JobProcess, LiveKitConfig, NoiseCancellation,
    RealtimeConnection, RealtimeModel, RealtimeModelMetrics, ResponseOutcome, Room,
    SessionOptions, VoiceError, VoiceService,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    options: Mutex<Option<SessionOptions>>,
    closes: AtomicUsize,
}

struct RecordingModel(Arc<Recorder>);

struct RecordingConnection(Arc<Recorder>);

#[async_trait]
impl RealtimeModel for RecordingModel {
    fn label(&self) -> &str {
        "recording"
    }

    fn validate(&self) -> Result<(), VoiceError> {
        Ok(())
    }

    async fn connect(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn RealtimeConnection>, VoiceError> {
        *self.0.options.lock().unwrap() = Some(options.clone());
        Ok(Box::new(RecordingConnection(self.0.clone())))
    }
}

#[async_trait]
impl RealtimeConnection for RecordingConnection {
    async fn generate_reply(
        &mut self,
        _user_input: Option<&str>,
        _instructions: Option<&str>,
    ) -> Result<ResponseOutcome, VoiceError> {
        Ok(ResponseOutcome {
            chat_items: vec![],
            metrics: RealtimeModelMetrics::empty("recording", "r"),
        })
    }

    async fn add_tool_output(&mut self, _call_id: &str, _output: &str) -> Result<(), VoiceError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn entrypoint_starts_live_session_then_needs_room_connection() {
    let process = Arc::new(JobProcess::new());
    prewarm(&process);
    assert!(process.vad().is_some());

    let ctx = JobContext::new(
        Room::new("portfolio-room"),
        process,
        Arc::new(VoiceService::new(LiveKitConfig::default())),
    );
    let recorder = Arc::new(Recorder::default());
    let model = Arc::new(RecordingModel(recorder.clone()));

    let result = entrypoint(&ctx, model).await;
    assert!(matches!(result, Err(VoiceError::Config(_))));

    let options = recorder.options.lock().unwrap().clone().unwrap();
    assert_eq!(options.room_name, "portfolio-room");
    assert_eq!(
        options.input.noise_cancellation,
        Some(NoiseCancellation::Bvc)
    );
    assert!(options.output.transcription_enabled);
    assert!(options.output.audio_enabled);
    assert_eq!(options.tools.len(), 1);

    // The session is released when the room cannot be joined.
    assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);

    // The usage callback is still registered and runs on shutdown.
    ctx.shutdown().await;
}
